//! Unstructured mesh representation.
//!
//! Provides the FESOM 1.4 triangular surface mesh with its 3D node columns,
//! as used to integrate FESOM output over triangular prisms.

mod fesom;

pub use fesom::{FesomElement, FesomMesh, FesomMeshError, FesomNode, MeshOptions, Prism};
