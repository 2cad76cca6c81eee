//! PNG figures.
//!
//! A small matplotlib-like layer: a [`Figure`] holds a grid of [`Panel`]s,
//! each panel stacks drawing layers (filled quads, filled contours, grey
//! masks, contour lines, polylines) in data coordinates and rasterises them
//! when the figure is saved. Text (titles, axis labels, colour bar ticks,
//! annotations) is not drawn into the pixels; it is written to the PNG as
//! `tEXt` chunks so the figure remains self-describing.

mod colormap;
mod figure;
mod panel;
mod raster;

use thiserror::Error;

pub use colormap::{grey, Colormap, Extend, Norm};
pub use figure::Figure;
pub use panel::{contour_segments, meshgrid, Annotation, Colorbar, Panel};
pub use raster::{Limits, LineStyle};

/// Errors that can occur while building or saving a figure.
#[derive(Debug, Error)]
pub enum PlotError {
    /// File I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// PNG encoding error
    #[error("PNG encoding error: {0}")]
    Encoding(#[from] png::EncodingError),

    /// Coordinate and data arrays disagree
    #[error("Shape mismatch for {what}: expected {expected:?}, found {found:?}")]
    ShapeMismatch {
        what: &'static str,
        expected: Vec<usize>,
        found: Vec<usize>,
    },

    /// Bad colour map definition
    #[error("Invalid colormap: {0}")]
    InvalidColormap(String),

    /// Bad contour levels or norm boundaries
    #[error("Invalid levels: {0}")]
    InvalidLevels(String),

    /// Panel index out of range
    #[error("No panel {0} in figure")]
    NoSuchPanel(usize),
}

/// Black, for contour and frame lines.
pub const BLACK: image::Rgb<u8> = image::Rgb([0, 0, 0]);

/// Default line colour.
pub const BLUE: image::Rgb<u8> = image::Rgb([31, 119, 180]);
