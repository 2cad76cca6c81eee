//! Edge trimming of ROMS fields.
//!
//! The circumpolar ROMS grid carries a northern sponge and periodic overlap
//! columns that the figures drop, e.g. `[:-15, :-3]` in slice notation.

use ndarray::{s, Array2, Array3};
use serde::Deserialize;

/// Number of rows/columns removed from the northern, eastern and western
/// edges of a `[lat, lon]` field.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Trim {
    /// Rows dropped from the end of the latitude axis
    pub north: usize,
    /// Columns dropped from the end of the longitude axis
    pub east: usize,
    /// Columns dropped from the start of the longitude axis
    pub west: usize,
}

impl Trim {
    /// Trim `north` rows and `east` columns.
    pub const fn new(north: usize, east: usize) -> Self {
        Self {
            north,
            east,
            west: 0,
        }
    }

    /// Also drop `west` leading columns.
    pub const fn with_west(mut self, west: usize) -> Self {
        self.west = west;
        self
    }

    /// Shape of a `(n_lat, n_lon)` field after trimming.
    pub fn shape(&self, (n_lat, n_lon): (usize, usize)) -> (usize, usize) {
        (
            n_lat.saturating_sub(self.north),
            n_lon.saturating_sub(self.east + self.west),
        )
    }

    fn columns(&self, n_lon: usize) -> (usize, usize) {
        let start = self.west.min(n_lon);
        (start, n_lon.saturating_sub(self.east).max(start))
    }

    /// Trimmed copy of a 2D field.
    pub fn apply<A: Clone>(&self, field: &Array2<A>) -> Array2<A> {
        let (n_lat, n_lon) = field.dim();
        let j_end = n_lat.saturating_sub(self.north);
        let (i_start, i_end) = self.columns(n_lon);
        field
            .slice(s![..j_end, i_start..i_end])
            .to_owned()
    }

    /// Trimmed copy of a `[depth, lat, lon]` field; depth is untouched.
    pub fn apply_3d<A: Clone>(&self, field: &Array3<A>) -> Array3<A> {
        let (_, n_lat, n_lon) = field.dim();
        let j_end = n_lat.saturating_sub(self.north);
        let (i_start, i_end) = self.columns(n_lon);
        field
            .slice(s![.., ..j_end, i_start..i_end])
            .to_owned()
    }
}
