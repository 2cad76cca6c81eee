//! FESOM 1.4 unstructured mesh.
//!
//! A mesh directory holds four ASCII files, each starting with a count:
//!
//! ```text
//! nod2d.out    n2d,  then "id lon lat flag" per surface node
//! elem2d.out   ne,   then "n1 n2 n3" per surface triangle (1-based)
//! nod3d.out    n3d,  then "id lon lat z flag" per 3D node (z <= 0)
//! aux3d.out    nl,   then nl node ids per surface node, top to bottom,
//!                    padded with -999 below the sea floor
//! ```
//!
//! The first `n2d` 3D nodes are the surface nodes. Columns are linked
//! through [`FesomNode::below`], so the water under a surface triangle is a
//! stack of triangular prisms that ends where any of its three columns
//! reaches the sea floor.

use std::fs;
use std::path::Path;

use log::{debug, info};
use thiserror::Error;

use crate::grid::polar_xy;
use crate::units::{DEG2RAD, EARTH_RADIUS};

/// Padding value ending a column in `aux3d.out`.
const COLUMN_END: i64 = -999;

/// Error type for FESOM mesh reading.
#[derive(Debug, Error)]
pub enum FesomMeshError {
    /// File could not be opened.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Invalid file format.
    #[error("Parse error in {file} at line {line}: {message}")]
    ParseError {
        file: &'static str,
        line: usize,
        message: String,
    },

    /// Node reference out of range.
    #[error("{file} refers to node {id}, but the mesh has {count} nodes")]
    BadNodeReference {
        file: &'static str,
        id: i64,
        count: usize,
    },
}

/// Longitude handling for element coordinates.
#[derive(Clone, Copy, Debug, Default)]
pub struct MeshOptions {
    /// Store element coordinates in the circumpolar projection.
    pub circumpolar: bool,
    /// Shift elements that straddle the dateline to longitudes above 180.
    pub cross_180: bool,
}

/// A 3D mesh node.
#[derive(Clone, Copy, Debug)]
pub struct FesomNode {
    /// 0-based index into 3D node arrays.
    pub id: usize,
    pub lon: f64,
    pub lat: f64,
    /// Depth below the surface (m, positive down).
    pub depth: f64,
    /// The next node down the column.
    pub below: Option<usize>,
}

/// A surface triangle.
#[derive(Clone, Debug)]
pub struct FesomElement {
    /// Surface node ids.
    pub nodes: [usize; 3],
    pub lon: [f64; 3],
    pub lat: [f64; 3],
    /// Plotting coordinates (projected or longitude/latitude).
    pub x: [f64; 3],
    pub y: [f64; 3],
}

impl FesomElement {
    fn new(nodes: [usize; 3], lon: [f64; 3], lat: [f64; 3], options: MeshOptions) -> Self {
        let (x, y) = if options.circumpolar {
            let mut x = [0.0; 3];
            let mut y = [0.0; 3];
            for i in 0..3 {
                let (px, py) = polar_xy(lon[i], lat[i]);
                x[i] = px;
                y[i] = py;
            }
            (x, y)
        } else if options.cross_180 && straddles_dateline(&lon) {
            (lon.map(|l| if l < 0.0 { l + 360.0 } else { l }), lat)
        } else {
            (lon, lat)
        };
        Self {
            nodes,
            lon,
            lat,
            x,
            y,
        }
    }

    /// Horizontal area on the sphere (m²), from a local Cartesian
    /// projection about the element's mean latitude with longitudes
    /// unwrapped relative to the first node.
    pub fn area(&self) -> f64 {
        let lat_mean = (self.lat[0] + self.lat[1] + self.lat[2]) / 3.0;
        let scale = EARTH_RADIUS * (lat_mean * DEG2RAD).cos() * DEG2RAD;
        let mut x = [0.0; 3];
        let mut y = [0.0; 3];
        for i in 0..3 {
            let mut dlon = self.lon[i] - self.lon[0];
            if dlon > 180.0 {
                dlon -= 360.0;
            } else if dlon < -180.0 {
                dlon += 360.0;
            }
            x[i] = scale * dlon;
            y[i] = EARTH_RADIUS * self.lat[i] * DEG2RAD;
        }
        0.5 * ((x[1] - x[0]) * (y[2] - y[0]) - (x[2] - x[0]) * (y[1] - y[0])).abs()
    }

    /// True if every corner is south of `lat`.
    pub fn is_south_of(&self, lat: f64) -> bool {
        self.lat.iter().all(|&l| l < lat)
    }
}

fn straddles_dateline(lon: &[f64; 3]) -> bool {
    let max = lon.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let min = lon.iter().cloned().fold(f64::INFINITY, f64::min);
    max - min > 180.0
}

/// One layer of the water column under a surface triangle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Prism {
    pub top: [usize; 3],
    pub bottom: [usize; 3],
}

/// FESOM mesh with column links.
#[derive(Clone, Debug)]
pub struct FesomMesh {
    nodes: Vec<FesomNode>,
    elements: Vec<FesomElement>,
    n2d: usize,
}

impl FesomMesh {
    /// Read a mesh directory.
    pub fn read(dir: &Path, options: MeshOptions) -> Result<Self, FesomMeshError> {
        info!("Reading FESOM mesh from {}", dir.display());
        let nod2d = fs::read_to_string(dir.join("nod2d.out"))?;
        let elem2d = fs::read_to_string(dir.join("elem2d.out"))?;
        let nod3d = fs::read_to_string(dir.join("nod3d.out"))?;
        let aux3d = fs::read_to_string(dir.join("aux3d.out"))?;
        Self::parse(&nod2d, &elem2d, &nod3d, &aux3d, options)
    }

    /// Build a mesh from the contents of the four mesh files.
    pub fn parse(
        nod2d: &str,
        elem2d: &str,
        nod3d: &str,
        aux3d: &str,
        options: MeshOptions,
    ) -> Result<Self, FesomMeshError> {
        let n2d = parse_count(nod2d, "nod2d.out")?;
        let mut nodes = parse_nod3d(nod3d)?;
        if nodes.len() < n2d {
            return Err(FesomMeshError::ParseError {
                file: "nod3d.out",
                line: 1,
                message: format!("{} 3D nodes but {} surface nodes", nodes.len(), n2d),
            });
        }
        link_columns(aux3d, n2d, &mut nodes)?;
        let triangles = parse_elem2d(elem2d, n2d)?;

        let elements = triangles
            .into_iter()
            .map(|ids| {
                let lon = ids.map(|i| nodes[i].lon);
                let lat = ids.map(|i| nodes[i].lat);
                FesomElement::new(ids, lon, lat, options)
            })
            .collect::<Vec<_>>();

        debug!(
            "FESOM mesh: {} surface nodes, {} 3D nodes, {} elements",
            n2d,
            nodes.len(),
            elements.len()
        );
        Ok(Self {
            nodes,
            elements,
            n2d,
        })
    }

    pub fn nodes(&self) -> &[FesomNode] {
        &self.nodes
    }

    pub fn elements(&self) -> &[FesomElement] {
        &self.elements
    }

    pub fn n_surface_nodes(&self) -> usize {
        self.n2d
    }

    /// The prisms under an element, top to bottom.
    pub fn prisms<'a>(&'a self, element: &FesomElement) -> impl Iterator<Item = Prism> + 'a {
        let mut current = Some(element.nodes);
        std::iter::from_fn(move || {
            let top = current?;
            let below = [
                self.nodes[top[0]].below,
                self.nodes[top[1]].below,
                self.nodes[top[2]].below,
            ];
            match below {
                [Some(a), Some(b), Some(c)] => {
                    let bottom = [a, b, c];
                    current = Some(bottom);
                    Some(Prism { top, bottom })
                }
                _ => {
                    current = None;
                    None
                }
            }
        })
    }
}

fn data_lines(content: &str) -> impl Iterator<Item = (usize, &str)> {
    content
        .lines()
        .enumerate()
        .map(|(n, l)| (n + 1, l.trim()))
        .filter(|(_, l)| !l.is_empty())
}

fn parse_count(content: &str, file: &'static str) -> Result<usize, FesomMeshError> {
    let (line, text) = data_lines(content).next().ok_or(FesomMeshError::ParseError {
        file,
        line: 1,
        message: "empty file".into(),
    })?;
    text.split_whitespace()
        .next()
        .and_then(|t| t.parse().ok())
        .ok_or(FesomMeshError::ParseError {
            file,
            line,
            message: format!("expected a count, found '{}'", text),
        })
}

fn parse_field<T: std::str::FromStr>(
    token: Option<&str>,
    file: &'static str,
    line: usize,
    what: &str,
) -> Result<T, FesomMeshError> {
    token
        .and_then(|t| t.parse().ok())
        .ok_or_else(|| FesomMeshError::ParseError {
            file,
            line,
            message: format!("invalid {}", what),
        })
}

fn parse_nod3d(content: &str) -> Result<Vec<FesomNode>, FesomMeshError> {
    const FILE: &str = "nod3d.out";
    let count = parse_count(content, FILE)?;
    let mut nodes = Vec::with_capacity(count);
    for (line, text) in data_lines(content).skip(1).take(count) {
        let mut parts = text.split_whitespace();
        let _id: i64 = parse_field(parts.next(), FILE, line, "node id")?;
        let lon: f64 = parse_field(parts.next(), FILE, line, "longitude")?;
        let lat: f64 = parse_field(parts.next(), FILE, line, "latitude")?;
        let z: f64 = parse_field(parts.next(), FILE, line, "depth")?;
        nodes.push(FesomNode {
            id: nodes.len(),
            lon,
            lat,
            depth: -z,
            below: None,
        });
    }
    if nodes.len() != count {
        return Err(FesomMeshError::ParseError {
            file: FILE,
            line: nodes.len() + 2,
            message: format!("expected {} nodes, found {}", count, nodes.len()),
        });
    }
    Ok(nodes)
}

fn node_index(id: i64, count: usize, file: &'static str) -> Result<usize, FesomMeshError> {
    if id >= 1 && (id as usize) <= count {
        Ok(id as usize - 1)
    } else {
        Err(FesomMeshError::BadNodeReference { file, id, count })
    }
}

fn parse_elem2d(content: &str, n2d: usize) -> Result<Vec<[usize; 3]>, FesomMeshError> {
    const FILE: &str = "elem2d.out";
    let count = parse_count(content, FILE)?;
    let mut elements = Vec::with_capacity(count);
    for (line, text) in data_lines(content).skip(1).take(count) {
        let mut parts = text.split_whitespace();
        let mut ids = [0usize; 3];
        for id in ids.iter_mut() {
            let raw: i64 = parse_field(parts.next(), FILE, line, "node id")?;
            *id = node_index(raw, n2d, FILE)?;
        }
        elements.push(ids);
    }
    Ok(elements)
}

fn link_columns(content: &str, n2d: usize, nodes: &mut [FesomNode]) -> Result<(), FesomMeshError> {
    const FILE: &str = "aux3d.out";
    let n_layers = parse_count(content, FILE)?;
    let mut ids = data_lines(content).skip(1).flat_map(|(line, text)| {
        text.split_whitespace().map(move |t| (line, t))
    });
    let count = nodes.len();
    let mut column: Vec<usize> = Vec::with_capacity(n_layers);
    for _ in 0..n2d {
        column.clear();
        let mut ended = false;
        for _ in 0..n_layers {
            let (line, token) = ids.next().ok_or(FesomMeshError::ParseError {
                file: FILE,
                line: 0,
                message: "file ends inside the column table".into(),
            })?;
            let raw: i64 = parse_field(Some(token), FILE, line, "node id")?;
            if raw == COLUMN_END {
                ended = true;
            } else if !ended {
                column.push(node_index(raw, count, FILE)?);
            }
        }
        for pair in column.windows(2) {
            nodes[pair[0]].below = Some(pair[1]);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    // Two surface triangles sharing an edge; node 4 has a shallower column
    const NOD2D: &str = "4\n1 0.0 -70.0 0\n2 1.0 -70.0 0\n3 0.0 -69.0 0\n4 1.0 -69.0 0\n";
    const ELEM2D: &str = "2\n1 2 3\n2 4 3\n";
    const NOD3D: &str = "11
1 0.0 -70.0 0.0 0
2 1.0 -70.0 0.0 0
3 0.0 -69.0 0.0 0
4 1.0 -69.0 0.0 0
5 0.0 -70.0 -10.0 0
6 1.0 -70.0 -10.0 0
7 0.0 -69.0 -10.0 0
8 1.0 -69.0 -10.0 0
9 0.0 -70.0 -30.0 0
10 1.0 -70.0 -30.0 0
11 0.0 -69.0 -30.0 0
";
    const AUX3D: &str = "3\n1\n5\n9\n2\n6\n10\n3\n7\n11\n4\n8\n-999\n";

    fn mesh() -> FesomMesh {
        FesomMesh::parse(NOD2D, ELEM2D, NOD3D, AUX3D, MeshOptions::default()).unwrap()
    }

    #[test]
    fn test_column_links() {
        let mesh = mesh();
        assert_eq!(mesh.n_surface_nodes(), 4);
        assert_eq!(mesh.nodes()[0].below, Some(4));
        assert_eq!(mesh.nodes()[4].below, Some(8));
        assert_eq!(mesh.nodes()[8].below, None);
        assert_eq!(mesh.nodes()[3].below, Some(7));
        assert_eq!(mesh.nodes()[7].below, None);
        assert_eq!(mesh.nodes()[8].depth, 30.0);
    }

    #[test]
    fn test_prisms_stop_at_shallowest_column() {
        let mesh = mesh();
        let deep: Vec<Prism> = mesh.prisms(&mesh.elements()[0]).collect();
        assert_eq!(deep.len(), 2);
        assert_eq!(deep[0].top, [0, 1, 2]);
        assert_eq!(deep[1].bottom, [8, 9, 10]);

        let shallow: Vec<Prism> = mesh.prisms(&mesh.elements()[1]).collect();
        assert_eq!(shallow.len(), 1);
    }

    #[test]
    fn test_element_area() {
        let mesh = mesh();
        let el = &mesh.elements()[0];
        let dy = EARTH_RADIUS * DEG2RAD;
        let dx = dy * ((209.0 / 3.0) * DEG2RAD).cos();
        let expected = 0.5 * dx * dy;
        assert!((el.area() - expected).abs() / expected < 1e-12);
        assert!(el.is_south_of(-65.0));
        assert!(!el.is_south_of(-69.5));
    }

    #[test]
    fn test_area_across_dateline() {
        let a = FesomElement::new([0, 1, 2], [179.5, -179.5, 179.5], [-70.0, -70.0, -69.0], MeshOptions::default());
        let b = FesomElement::new([0, 1, 2], [0.0, 1.0, 0.0], [-70.0, -70.0, -69.0], MeshOptions::default());
        assert!((a.area() - b.area()).abs() / b.area() < 1e-6);
    }

    #[test]
    fn test_cross_180_coordinates() {
        let opts = MeshOptions {
            circumpolar: false,
            cross_180: true,
        };
        let el = FesomElement::new([0, 1, 2], [179.5, -179.5, 179.5], [-70.0, -70.0, -69.0], opts);
        assert_eq!(el.x, [179.5, 180.5, 179.5]);
    }

    #[test]
    fn test_bad_reference() {
        let bad = "1\n1 2 9\n";
        let r = FesomMesh::parse(NOD2D, bad, NOD3D, AUX3D, MeshOptions::default());
        assert!(matches!(r, Err(FesomMeshError::BadNodeReference { id: 9, .. })));
    }
}
