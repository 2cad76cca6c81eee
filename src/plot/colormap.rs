//! Colour maps and value normalisation.
//!
//! A [`Colormap`] is three piecewise-linear channel functions on `[0, 1]`,
//! the same segment representation matplotlib uses, so `jet` and the
//! ColorBrewer maps reproduce the colours of earlier figures.

use image::Rgb;

use super::PlotError;

/// Piecewise-linear colour map on `[0, 1]`.
#[derive(Clone, Debug, PartialEq)]
pub struct Colormap {
    name: String,
    red: Vec<(f64, f64)>,
    green: Vec<(f64, f64)>,
    blue: Vec<(f64, f64)>,
}

const RD_BU: [&str; 11] = [
    "67001f", "b2182b", "d6604d", "f4a582", "fddbc7", "f7f7f7", "d1e5f0", "92c5de", "4393c3",
    "2166ac", "053061",
];

const RD_YL_BU: [&str; 11] = [
    "a50026", "d73027", "f46d43", "fdae61", "fee090", "ffffbf", "e0f3f8", "abd9e9", "74add1",
    "4575b4", "313695",
];

impl Colormap {
    /// Build from `(position, colour)` stops; positions must rise from 0 to 1.
    pub fn from_stops(name: impl Into<String>, stops: &[(f64, [f64; 3])]) -> Result<Self, PlotError> {
        let name = name.into();
        if stops.len() < 2 {
            return Err(PlotError::InvalidColormap(format!("{}: need at least 2 stops", name)));
        }
        let first = stops[0].0;
        let last = stops[stops.len() - 1].0;
        if first != 0.0 || last != 1.0 {
            return Err(PlotError::InvalidColormap(format!(
                "{}: stops must span [0, 1], got [{}, {}]",
                name, first, last
            )));
        }
        if stops.windows(2).any(|w| w[1].0 <= w[0].0) {
            return Err(PlotError::InvalidColormap(format!(
                "{}: stop positions must be strictly increasing",
                name
            )));
        }
        let channel = |c: usize| stops.iter().map(|(p, rgb)| (*p, rgb[c])).collect();
        Ok(Self {
            name,
            red: channel(0),
            green: channel(1),
            blue: channel(2),
        })
    }

    /// Evenly spaced colours.
    pub fn from_list(name: impl Into<String>, colours: &[[f64; 3]]) -> Self {
        let n = colours.len().max(2);
        let channel = |c: usize| -> Vec<(f64, f64)> {
            match colours.len() {
                0 => vec![(0.0, 0.0), (1.0, 0.0)],
                1 => vec![(0.0, colours[0][c]), (1.0, colours[0][c])],
                _ => colours
                    .iter()
                    .enumerate()
                    .map(|(i, rgb)| (i as f64 / (n - 1) as f64, rgb[c]))
                    .collect(),
            }
        };
        Self {
            name: name.into(),
            red: channel(0),
            green: channel(1),
            blue: channel(2),
        }
    }

    /// The classic rainbow map.
    pub fn jet() -> Self {
        Self {
            name: "jet".to_string(),
            red: vec![(0.0, 0.0), (0.35, 0.0), (0.66, 1.0), (0.89, 1.0), (1.0, 0.5)],
            green: vec![
                (0.0, 0.0),
                (0.125, 0.0),
                (0.375, 1.0),
                (0.64, 1.0),
                (0.91, 0.0),
                (1.0, 0.0),
            ],
            blue: vec![(0.0, 0.5), (0.11, 1.0), (0.34, 1.0), (0.65, 0.0), (1.0, 0.0)],
        }
    }

    /// Diverging blue-white-red.
    pub fn rd_bu_r() -> Self {
        Self::from_hex("RdBu", &RD_BU).reversed()
    }

    /// Diverging blue-yellow-red.
    pub fn rd_yl_bu_r() -> Self {
        Self::from_hex("RdYlBu", &RD_YL_BU).reversed()
    }

    /// Ice shelf melt/freeze map: blue for freezing, white at zero, then
    /// yellow through dark red to purple for strong melting.
    ///
    /// Stops sit at -0.1, 0, 1, 2, 5 and 8 m/y on a `[-0.1, 8]` scale.
    pub fn melt_freeze() -> Self {
        let values = [-0.1, 0.0, 1.0, 2.0, 5.0, 8.0];
        let colours = [
            [0.26, 0.45, 0.86],
            [1.0, 1.0, 1.0],
            [1.0, 0.9, 0.4],
            [0.99, 0.59, 0.18],
            [0.5, 0.0, 0.08],
            [0.96, 0.17, 0.89],
        ];
        let (lo, hi) = (values[0], values[values.len() - 1]);
        let channel = |c: usize| {
            values
                .iter()
                .zip(colours.iter())
                .map(|(v, rgb)| ((v - lo) / (hi - lo), rgb[c]))
                .collect()
        };
        Self {
            name: "melt_freeze".to_string(),
            red: channel(0),
            green: channel(1),
            blue: channel(2),
        }
    }

    /// Look up a map by its matplotlib name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "jet" => Some(Self::jet()),
            "RdBu_r" => Some(Self::rd_bu_r()),
            "RdBu" => Some(Self::rd_bu_r().reversed()),
            "RdYlBu_r" => Some(Self::rd_yl_bu_r()),
            "RdYlBu" => Some(Self::rd_yl_bu_r().reversed()),
            "melt_freeze" => Some(Self::melt_freeze()),
            _ => None,
        }
    }

    fn from_hex(name: &str, hex: &[&str]) -> Self {
        let colours: Vec<[f64; 3]> = hex.iter().map(|h| hex_to_rgb(h)).collect();
        Self::from_list(name, &colours)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The same map running the other way.
    pub fn reversed(&self) -> Self {
        let flip = |ch: &[(f64, f64)]| ch.iter().rev().map(|&(p, v)| (1.0 - p, v)).collect();
        let name = match self.name.strip_suffix("_r") {
            Some(base) => base.to_string(),
            None => format!("{}_r", self.name),
        };
        Self {
            name,
            red: flip(&self.red),
            green: flip(&self.green),
            blue: flip(&self.blue),
        }
    }

    /// Sub-range `[min, max]` of this map stretched over `[0, 1]`.
    pub fn truncate(&self, min: f64, max: f64) -> Self {
        const N: usize = 256;
        let (min, max) = (min.clamp(0.0, 1.0), max.clamp(0.0, 1.0));
        let colours: Vec<[f64; 3]> = (0..N)
            .map(|i| self.rgb(min + (max - min) * i as f64 / (N - 1) as f64))
            .collect();
        Self::from_list(
            format!("trunc({},{:.2},{:.2})", self.name, min, max),
            &colours,
        )
    }

    /// Colour at `t` as floats in `[0, 1]`; `t` is clamped.
    pub fn rgb(&self, t: f64) -> [f64; 3] {
        let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
        [
            interp_channel(&self.red, t),
            interp_channel(&self.green, t),
            interp_channel(&self.blue, t),
        ]
    }

    /// Colour at `t` as an 8-bit pixel.
    pub fn sample(&self, t: f64) -> Rgb<u8> {
        let [r, g, b] = self.rgb(t);
        Rgb([to_u8(r), to_u8(g), to_u8(b)])
    }
}

fn interp_channel(points: &[(f64, f64)], t: f64) -> f64 {
    match points {
        [] => 0.0,
        [(_, v)] => *v,
        _ => {
            for w in points.windows(2) {
                let (p0, v0) = w[0];
                let (p1, v1) = w[1];
                if t <= p1 {
                    if p1 <= p0 {
                        return v1;
                    }
                    return v0 + (t - p0) / (p1 - p0) * (v1 - v0);
                }
            }
            points[points.len() - 1].1
        }
    }
}

fn hex_to_rgb(hex: &str) -> [f64; 3] {
    let channel = |i: usize| {
        hex.get(i..i + 2)
            .and_then(|s| u8::from_str_radix(s, 16).ok())
            .map_or(0.0, |c| c as f64 / 255.0)
    };
    [channel(0), channel(2), channel(4)]
}

#[inline]
pub(crate) fn to_u8(c: f64) -> u8 {
    (c.clamp(0.0, 1.0) * 255.0).round() as u8
}

/// Grey level as a pixel, `0.6` being the land shade of every map.
pub fn grey(level: f64) -> Rgb<u8> {
    let c = to_u8(level);
    Rgb([c, c, c])
}

/// Mapping from data values to `[0, 1]`.
#[derive(Clone, Debug, PartialEq)]
pub enum Norm {
    /// Linear between `vmin` and `vmax`, clamped outside.
    Linear { vmin: f64, vmax: f64 },
    /// Discrete bins between consecutive boundaries, spread evenly over the
    /// colour map regardless of their spacing.
    Boundary(Vec<f64>),
}

impl Norm {
    pub fn linear(vmin: f64, vmax: f64) -> Self {
        Self::Linear { vmin, vmax }
    }

    /// Boundary norm; needs at least two increasing boundaries.
    pub fn boundary(bounds: Vec<f64>) -> Result<Self, PlotError> {
        if bounds.len() < 2 || bounds.windows(2).any(|w| w[1] < w[0]) {
            return Err(PlotError::InvalidLevels(
                "boundaries must be at least two increasing values".to_string(),
            ));
        }
        Ok(Self::Boundary(bounds))
    }

    /// Data range covered.
    pub fn range(&self) -> (f64, f64) {
        match self {
            Self::Linear { vmin, vmax } => (*vmin, *vmax),
            Self::Boundary(b) => (b[0], b[b.len() - 1]),
        }
    }

    /// Position of `v` on the colour map.
    pub fn normalize(&self, v: f64) -> f64 {
        match self {
            Self::Linear { vmin, vmax } => {
                if vmax <= vmin {
                    0.5
                } else {
                    ((v - vmin) / (vmax - vmin)).clamp(0.0, 1.0)
                }
            }
            Self::Boundary(b) => {
                let n_bins = b.len() - 1;
                if v < b[0] {
                    return 0.0;
                }
                if v >= b[n_bins] {
                    return 1.0;
                }
                if n_bins < 2 {
                    return 0.0;
                }
                let bin = b.partition_point(|&edge| edge <= v) - 1;
                bin as f64 / (n_bins - 1) as f64
            }
        }
    }
}

/// How filled contours treat values outside the level range.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Extend {
    /// Leave them blank
    #[default]
    Neither,
    /// Paint values below the range with the lowest colour
    Min,
    /// Paint values above the range with the highest colour
    Max,
    /// Both of the above
    Both,
}

/// Filled-contour colour of `v` for `levels`, or `None` if blank.
pub(crate) fn level_colour(v: f64, levels: &[f64], cmap: &Colormap, extend: Extend) -> Option<Rgb<u8>> {
    let n = levels.len();
    if n < 2 || !v.is_finite() {
        return None;
    }
    let (lo, hi) = (levels[0], levels[n - 1]);
    if v < lo {
        return matches!(extend, Extend::Min | Extend::Both).then(|| cmap.sample(0.0));
    }
    if v > hi {
        return matches!(extend, Extend::Max | Extend::Both).then(|| cmap.sample(1.0));
    }
    let interval = (levels.partition_point(|&l| l <= v).max(1) - 1).min(n - 2);
    let mid = 0.5 * (levels[interval] + levels[interval + 1]);
    let t = if hi > lo { (mid - lo) / (hi - lo) } else { 0.5 };
    Some(cmap.sample(t))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_jet_ends() {
        let jet = Colormap::jet();
        assert_eq!(jet.sample(0.0), Rgb([0, 0, 128]));
        assert_eq!(jet.sample(1.0), Rgb([128, 0, 0]));
        // Green in the middle
        assert_eq!(jet.sample(0.5).0[1], 255);
    }

    #[test]
    fn test_rd_bu_r_is_blue_to_red() {
        let cmap = Colormap::rd_bu_r();
        let low = cmap.sample(0.0);
        let high = cmap.sample(1.0);
        assert!(low.0[2] > low.0[0]);
        assert!(high.0[0] > high.0[2]);
        // Near-white centre
        assert_eq!(cmap.sample(0.5), Rgb([247, 247, 247]));
        assert_eq!(cmap.name(), "RdBu_r");
    }

    #[test]
    fn test_reversed_names() {
        let cmap = Colormap::rd_yl_bu_r();
        assert_eq!(cmap.name(), "RdYlBu_r");
        assert!(cmap.sample(0.0).0[2] > cmap.sample(0.0).0[0]);
        assert_eq!(cmap.reversed().name(), "RdYlBu");
        assert_eq!(Colormap::from_name("RdBu").map(|c| c.name().to_string()), Some("RdBu".to_string()));
        assert_eq!(Colormap::from_name("RdYlBu_r").map(|c| c.name().to_string()), Some("RdYlBu_r".to_string()));
    }

    #[test]
    fn test_melt_freeze_white_at_zero() {
        let cmap = Colormap::melt_freeze();
        let t_zero = 0.1 / 8.1;
        assert_eq!(cmap.sample(t_zero), Rgb([255, 255, 255]));
        assert_eq!(cmap.sample(1.0), Rgb([245, 43, 227]));
    }

    #[test]
    fn test_truncate() {
        let cmap = Colormap::rd_bu_r();
        let upper = cmap.truncate(0.5, 1.0);
        assert_eq!(upper.sample(0.0), cmap.sample(0.5));
        assert_eq!(upper.sample(1.0), cmap.sample(1.0));
    }

    #[test]
    fn test_from_stops_validation() {
        assert!(Colormap::from_stops("bad", &[(0.0, [0.0; 3])]).is_err());
        assert!(Colormap::from_stops("bad", &[(0.2, [0.0; 3]), (1.0, [1.0; 3])]).is_err());
        let ok = Colormap::from_stops("grey", &[(0.0, [0.0; 3]), (1.0, [1.0; 3])]).unwrap();
        assert_eq!(ok.sample(0.5), Rgb([128, 128, 128]));
    }

    #[test]
    fn test_from_name() {
        assert!(Colormap::from_name("jet").is_some());
        assert!(Colormap::from_name("RdYlBu_r").is_some());
        assert!(Colormap::from_name("viridis").is_none());
    }

    #[test]
    fn test_boundary_norm() {
        let norm = Norm::boundary(vec![0.0, 1.0, 10.0, 100.0]).unwrap();
        assert_eq!(norm.normalize(-5.0), 0.0);
        assert_eq!(norm.normalize(0.5), 0.0);
        assert_eq!(norm.normalize(5.0), 0.5);
        assert_eq!(norm.normalize(50.0), 1.0);
        assert_eq!(norm.normalize(500.0), 1.0);
        assert!(Norm::boundary(vec![1.0]).is_err());
    }

    #[test]
    fn test_linear_norm_clamps() {
        let norm = Norm::linear(-300.0, 300.0);
        assert_eq!(norm.normalize(0.0), 0.5);
        assert_eq!(norm.normalize(1000.0), 1.0);
        assert_eq!(norm.range(), (-300.0, 300.0));
    }

    #[test]
    fn test_level_colour_extend() {
        let cmap = Colormap::jet();
        let levels = [0.0, 1.0, 2.0];
        assert!(level_colour(-1.0, &levels, &cmap, Extend::Neither).is_none());
        assert_eq!(level_colour(-1.0, &levels, &cmap, Extend::Both), Some(cmap.sample(0.0)));
        assert_eq!(level_colour(0.5, &levels, &cmap, Extend::Neither), Some(cmap.sample(0.25)));
        assert_eq!(level_colour(2.0, &levels, &cmap, Extend::Neither), Some(cmap.sample(0.75)));
        assert!(level_colour(f64::NAN, &levels, &cmap, Extend::Both).is_none());
    }
}
