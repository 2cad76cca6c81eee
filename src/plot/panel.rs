//! Plot panels: layered drawing commands rendered at save time.

use image::{Rgb, RgbImage};
use ndarray::{Array1, Array2};

use super::colormap::{grey, level_colour, Colormap, Extend, Norm};
use super::raster::{Canvas, Limits, LineStyle};
use super::PlotError;
use crate::field::is_valid;

/// Colour bar drawn beside a panel.
#[derive(Clone, Debug)]
pub struct Colorbar {
    pub cmap: Colormap,
    pub norm: Norm,
    pub ticks: Vec<f64>,
    pub label: Option<String>,
    pub extend: Extend,
}

impl Colorbar {
    pub fn new(cmap: Colormap, norm: Norm) -> Self {
        Self {
            cmap,
            norm,
            ticks: Vec::new(),
            label: None,
            extend: Extend::Neither,
        }
    }

    pub fn with_ticks(mut self, ticks: Vec<f64>) -> Self {
        self.ticks = ticks;
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_extend(mut self, extend: Extend) -> Self {
        self.extend = extend;
        self
    }

    /// Vertical strip, high values at the top.
    pub(crate) fn render(&self, width: u32, height: u32) -> RgbImage {
        let (vmin, vmax) = self.norm.range();
        let mut strip = RgbImage::new(width.max(1), height.max(1));
        let h = strip.height();
        for py in 0..h {
            let f = 1.0 - (py as f64 + 0.5) / h as f64;
            let colour = self.cmap.sample(self.norm.normalize(vmin + f * (vmax - vmin)));
            for px in 0..strip.width() {
                strip.put_pixel(px, py, colour);
            }
        }
        strip
    }

    pub(crate) fn describe(&self) -> String {
        let (vmin, vmax) = self.norm.range();
        let ticks: Vec<String> = self.ticks.iter().map(|t| format!("{}", t)).collect();
        let mut text = format!(
            "cmap={}; range=[{}, {}]; ticks=[{}]; extend={:?}",
            self.cmap.name(),
            vmin,
            vmax,
            ticks.join(", "),
            self.extend
        );
        if let Some(label) = &self.label {
            text.push_str(&format!("; label={}", label));
        }
        text
    }
}

/// Text placed at a data position.
#[derive(Clone, Debug, PartialEq)]
pub struct Annotation {
    pub x: f64,
    pub y: f64,
    pub text: String,
    /// Rotation in degrees.
    pub rotation: f64,
}

/// Corner coordinates of a quadrilateral mesh.
#[derive(Clone, Debug)]
struct QuadMesh {
    x: Array2<f64>,
    y: Array2<f64>,
}

impl QuadMesh {
    /// Accepts corner arrays shaped like the field (the last row and column
    /// of the field are then not drawn) or one larger in each direction.
    fn for_field(x: &Array2<f64>, y: &Array2<f64>, field: &Array2<f64>) -> Result<Self, PlotError> {
        let (ny, nx) = field.dim();
        if x.dim() != y.dim() || (x.dim() != (ny, nx) && x.dim() != (ny + 1, nx + 1)) {
            return Err(PlotError::ShapeMismatch {
                what: "pcolor coordinates",
                expected: vec![ny + 1, nx + 1],
                found: vec![x.dim().0, x.dim().1],
            });
        }
        Ok(Self {
            x: x.clone(),
            y: y.clone(),
        })
    }

    fn n_quads(&self) -> (usize, usize) {
        let (ny, nx) = self.x.dim();
        (ny.saturating_sub(1), nx.saturating_sub(1))
    }

    fn corner(&self, j: usize, i: usize) -> (f64, f64) {
        (self.x[[j, i]], self.y[[j, i]])
    }
}

#[derive(Clone, Debug)]
enum Layer {
    Pcolor {
        mesh: QuadMesh,
        field: Array2<f64>,
        norm: Norm,
        cmap: Colormap,
    },
    Contourf {
        x: Array2<f64>,
        y: Array2<f64>,
        field: Array2<f64>,
        levels: Vec<f64>,
        cmap: Colormap,
        extend: Extend,
    },
    Shade {
        x: Array2<f64>,
        y: Array2<f64>,
        mask: Array2<f64>,
        colour: Rgb<u8>,
    },
    Contour {
        segments: Vec<((f64, f64), (f64, f64))>,
        colour: Rgb<u8>,
        style: LineStyle,
    },
    Line {
        xs: Vec<f64>,
        ys: Vec<f64>,
        colour: Rgb<u8>,
        style: LineStyle,
    },
}

impl Layer {
    fn data_limits(&self) -> Option<Limits> {
        match self {
            Self::Pcolor { mesh, .. } => Limits::enclosing(mesh.x.iter().zip(mesh.y.iter())),
            Self::Contourf { x, y, .. } | Self::Shade { x, y, .. } => {
                Limits::enclosing(x.iter().zip(y.iter()))
            }
            Self::Contour { segments, .. } => {
                let xs: Vec<f64> = segments.iter().flat_map(|(a, b)| [a.0, b.0]).collect();
                let ys: Vec<f64> = segments.iter().flat_map(|(a, b)| [a.1, b.1]).collect();
                Limits::enclosing(xs.iter().zip(ys.iter()))
            }
            Self::Line { xs, ys, .. } => Limits::enclosing(xs.iter().zip(ys.iter())),
        }
    }

    fn draw(&self, canvas: &mut Canvas) {
        match self {
            Self::Pcolor {
                mesh,
                field,
                norm,
                cmap,
            } => {
                let (nj, ni) = mesh.n_quads();
                for j in 0..nj {
                    for i in 0..ni {
                        let v = field[[j, i]];
                        if !is_valid(v) {
                            continue;
                        }
                        let c = [
                            mesh.corner(j, i),
                            mesh.corner(j, i + 1),
                            mesh.corner(j + 1, i + 1),
                            mesh.corner(j + 1, i),
                        ];
                        if c.iter().any(|p| !p.0.is_finite() || !p.1.is_finite()) {
                            continue;
                        }
                        let colour = cmap.sample(norm.normalize(v));
                        canvas.fill_triangle([c[0], c[1], c[2]], colour);
                        canvas.fill_triangle([c[0], c[2], c[3]], colour);
                    }
                }
            }
            Self::Contourf {
                x,
                y,
                field,
                levels,
                cmap,
                extend,
            } => {
                for_each_triangle(x, y, field, |corners, values| {
                    canvas.fill_triangle_with(corners, values, |v| {
                        level_colour(v, levels, cmap, *extend)
                    });
                });
            }
            Self::Shade { x, y, mask, colour } => {
                for_each_triangle(x, y, mask, |corners, _| {
                    canvas.fill_triangle(corners, *colour);
                });
            }
            Self::Contour {
                segments,
                colour,
                style,
            } => {
                let mut arc = 0.0;
                for (a, b) in segments {
                    canvas.draw_segment(*a, *b, *colour, *style, &mut arc);
                }
            }
            Self::Line {
                xs,
                ys,
                colour,
                style,
            } => {
                let mut arc = 0.0;
                for k in 1..xs.len().min(ys.len()) {
                    let a = (xs[k - 1], ys[k - 1]);
                    let b = (xs[k], ys[k]);
                    if a.0.is_finite() && a.1.is_finite() && b.0.is_finite() && b.1.is_finite() {
                        canvas.draw_segment(a, b, *colour, *style, &mut arc);
                    }
                }
            }
        }
    }
}

/// Visit the two triangles of every grid cell whose corners are all valid.
fn for_each_triangle<F>(x: &Array2<f64>, y: &Array2<f64>, field: &Array2<f64>, mut visit: F)
where
    F: FnMut([(f64, f64); 3], [f64; 3]),
{
    let (ny, nx) = field.dim();
    for j in 0..ny.saturating_sub(1) {
        for i in 0..nx.saturating_sub(1) {
            let idx = [(j, i), (j, i + 1), (j + 1, i + 1), (j + 1, i)];
            let v = idx.map(|(jj, ii)| field[[jj, ii]]);
            let p = idx.map(|(jj, ii)| (x[[jj, ii]], y[[jj, ii]]));
            let ok = |k: usize| is_valid(v[k]) && p[k].0.is_finite() && p[k].1.is_finite();
            if ok(0) && ok(1) && ok(2) {
                visit([p[0], p[1], p[2]], [v[0], v[1], v[2]]);
            }
            if ok(0) && ok(2) && ok(3) {
                visit([p[0], p[2], p[3]], [v[0], v[2], v[3]]);
            }
        }
    }
}

/// Marching squares for a single level; segments in data coordinates.
pub fn contour_segments(
    x: &Array2<f64>,
    y: &Array2<f64>,
    field: &Array2<f64>,
    level: f64,
) -> Vec<((f64, f64), (f64, f64))> {
    let (ny, nx) = field.dim();
    let mut segments = Vec::new();

    for j in 0..ny.saturating_sub(1) {
        for i in 0..nx.saturating_sub(1) {
            // Corners counter-clockwise from (j, i)
            let idx = [(j, i), (j, i + 1), (j + 1, i + 1), (j + 1, i)];
            let v = idx.map(|(jj, ii)| field[[jj, ii]]);
            if v.iter().any(|v| !is_valid(*v)) {
                continue;
            }
            let p = idx.map(|(jj, ii)| (x[[jj, ii]], y[[jj, ii]]));

            // Crossing on each edge k: corner k to corner k+1
            let mut crossings: [Option<(f64, f64)>; 4] = [None; 4];
            for k in 0..4 {
                let (a, b) = (v[k], v[(k + 1) % 4]);
                if (a >= level) != (b >= level) {
                    let t = (level - a) / (b - a);
                    let (pa, pb) = (p[k], p[(k + 1) % 4]);
                    crossings[k] = Some((pa.0 + t * (pb.0 - pa.0), pa.1 + t * (pb.1 - pa.1)));
                }
            }

            match crossings {
                [Some(e0), Some(e1), Some(e2), Some(e3)] => {
                    // Saddle: the centre value decides which corners connect
                    let centre = 0.25 * (v[0] + v[1] + v[2] + v[3]);
                    if (v[0] >= level) == (centre >= level) {
                        segments.push((e0, e1));
                        segments.push((e2, e3));
                    } else {
                        segments.push((e3, e0));
                        segments.push((e1, e2));
                    }
                }
                _ => {
                    let found: Vec<(f64, f64)> = crossings.iter().flatten().copied().collect();
                    if let [a, b] = found[..] {
                        segments.push((a, b));
                    }
                }
            }
        }
    }

    segments
}

/// One set of axes within a figure.
#[derive(Clone, Debug)]
pub struct Panel {
    width: u32,
    height: u32,
    limits: Option<Limits>,
    layers: Vec<Layer>,
    title: Option<String>,
    xlabel: Option<String>,
    ylabel: Option<String>,
    colorbar: Option<Colorbar>,
    annotations: Vec<Annotation>,
    axes_visible: bool,
}

impl Panel {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            limits: None,
            layers: Vec::new(),
            title: None,
            xlabel: None,
            ylabel: None,
            colorbar: None,
            annotations: Vec::new(),
            axes_visible: true,
        }
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Shade quads of a curvilinear grid by `norm` and `cmap`.
    pub fn pcolor(
        &mut self,
        x: &Array2<f64>,
        y: &Array2<f64>,
        field: &Array2<f64>,
        norm: Norm,
        cmap: &Colormap,
    ) -> Result<&mut Self, PlotError> {
        let mesh = QuadMesh::for_field(x, y, field)?;
        self.layers.push(Layer::Pcolor {
            mesh,
            field: field.clone(),
            norm,
            cmap: cmap.clone(),
        });
        Ok(self)
    }

    /// [`pcolor`](Self::pcolor) on a rectilinear grid given by 1D axes.
    /// `field` is `[y, x]`.
    pub fn pcolor_axes(
        &mut self,
        x: &Array1<f64>,
        y: &Array1<f64>,
        field: &Array2<f64>,
        norm: Norm,
        cmap: &Colormap,
    ) -> Result<&mut Self, PlotError> {
        let (xx, yy) = meshgrid(x, y);
        self.pcolor(&xx, &yy, field, norm, cmap)
    }

    /// Filled contours between `levels`.
    pub fn contourf(
        &mut self,
        x: &Array2<f64>,
        y: &Array2<f64>,
        field: &Array2<f64>,
        levels: &[f64],
        cmap: &Colormap,
        extend: Extend,
    ) -> Result<&mut Self, PlotError> {
        check_same_shape("contourf coordinates", x, y, field)?;
        if levels.len() < 2 || levels.windows(2).any(|w| w[1] < w[0]) {
            return Err(PlotError::InvalidLevels(format!(
                "{} levels, need at least 2 increasing values",
                levels.len()
            )));
        }
        self.layers.push(Layer::Contourf {
            x: x.clone(),
            y: y.clone(),
            field: field.clone(),
            levels: levels.to_vec(),
            cmap: cmap.clone(),
            extend,
        });
        Ok(self)
    }

    /// Paint every cell where `mask` holds data in a grey `level`.
    pub fn shade_mask(
        &mut self,
        x: &Array2<f64>,
        y: &Array2<f64>,
        mask: &Array2<f64>,
        level: f64,
    ) -> Result<&mut Self, PlotError> {
        check_same_shape("shaded mask coordinates", x, y, mask)?;
        self.layers.push(Layer::Shade {
            x: x.clone(),
            y: y.clone(),
            mask: mask.clone(),
            colour: grey(level),
        });
        Ok(self)
    }

    /// A single contour line.
    pub fn contour_line(
        &mut self,
        x: &Array2<f64>,
        y: &Array2<f64>,
        field: &Array2<f64>,
        level: f64,
        colour: Rgb<u8>,
        style: LineStyle,
    ) -> Result<&mut Self, PlotError> {
        check_same_shape("contour coordinates", x, y, field)?;
        let segments = contour_segments(x, y, field, level);
        self.layers.push(Layer::Contour {
            segments,
            colour,
            style,
        });
        Ok(self)
    }

    /// A polyline; non-finite points break it.
    pub fn line(&mut self, xs: &[f64], ys: &[f64], colour: Rgb<u8>, style: LineStyle) -> &mut Self {
        self.layers.push(Layer::Line {
            xs: xs.to_vec(),
            ys: ys.to_vec(),
            colour,
            style,
        });
        self
    }

    pub fn colorbar(&mut self, colorbar: Colorbar) -> &mut Self {
        self.colorbar = Some(colorbar);
        self
    }

    pub fn set_limits(&mut self, x_min: f64, x_max: f64, y_min: f64, y_max: f64) -> &mut Self {
        self.limits = Some(Limits::new(x_min, x_max, y_min, y_max));
        self
    }

    pub fn title(&mut self, title: impl Into<String>) -> &mut Self {
        self.title = Some(title.into());
        self
    }

    pub fn labels(&mut self, xlabel: impl Into<String>, ylabel: impl Into<String>) -> &mut Self {
        self.xlabel = Some(xlabel.into());
        self.ylabel = Some(ylabel.into());
        self
    }

    pub fn xlabel(&mut self, xlabel: impl Into<String>) -> &mut Self {
        self.xlabel = Some(xlabel.into());
        self
    }

    pub fn annotate(&mut self, x: f64, y: f64, text: impl Into<String>, rotation: f64) -> &mut Self {
        self.annotations.push(Annotation {
            x,
            y,
            text: text.into(),
            rotation,
        });
        self
    }

    /// Hide the frame, as for maps.
    pub fn axis_off(&mut self) -> &mut Self {
        self.axes_visible = false;
        self
    }

    pub fn get_colorbar(&self) -> Option<&Colorbar> {
        self.colorbar.as_ref()
    }

    pub fn get_title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn annotations(&self) -> &[Annotation] {
        &self.annotations
    }

    /// Data window: explicit limits, else the extent of every layer.
    pub fn limits(&self) -> Limits {
        self.limits.unwrap_or_else(|| {
            self.layers
                .iter()
                .filter_map(Layer::data_limits)
                .reduce(Limits::union)
                .unwrap_or(Limits::new(0.0, 1.0, 0.0, 1.0))
        })
    }

    /// Rasterise every layer in drawing order.
    pub fn render(&self) -> RgbImage {
        let mut canvas = Canvas::new(self.width, self.height, self.limits(), Rgb([255, 255, 255]));
        for layer in &self.layers {
            layer.draw(&mut canvas);
        }
        let mut image = canvas.into_image();
        if self.axes_visible {
            draw_frame(&mut image);
        }
        image
    }

    /// Plain-text description stored alongside the image.
    pub(crate) fn describe(&self) -> String {
        let l = self.limits();
        let mut parts = Vec::new();
        if let Some(title) = &self.title {
            parts.push(format!("title={}", title));
        }
        if let Some(xlabel) = &self.xlabel {
            parts.push(format!("xlabel={}", xlabel));
        }
        if let Some(ylabel) = &self.ylabel {
            parts.push(format!("ylabel={}", ylabel));
        }
        parts.push(format!("xlim=[{}, {}]", l.x_min, l.x_max));
        parts.push(format!("ylim=[{}, {}]", l.y_min, l.y_max));
        parts.join("; ")
    }
}

fn check_same_shape(
    what: &'static str,
    x: &Array2<f64>,
    y: &Array2<f64>,
    field: &Array2<f64>,
) -> Result<(), PlotError> {
    if x.dim() != field.dim() || y.dim() != field.dim() {
        let bad = if x.dim() != field.dim() { x.dim() } else { y.dim() };
        return Err(PlotError::ShapeMismatch {
            what,
            expected: vec![field.dim().0, field.dim().1],
            found: vec![bad.0, bad.1],
        });
    }
    Ok(())
}

/// 2D coordinate arrays from 1D axes, `[y, x]`.
pub fn meshgrid(x: &Array1<f64>, y: &Array1<f64>) -> (Array2<f64>, Array2<f64>) {
    let shape = (y.len(), x.len());
    (
        Array2::from_shape_fn(shape, |(_, i)| x[i]),
        Array2::from_shape_fn(shape, |(j, _)| y[j]),
    )
}

fn draw_frame(image: &mut RgbImage) {
    let black = Rgb([0, 0, 0]);
    let (w, h) = image.dimensions();
    for px in 0..w {
        image.put_pixel(px, 0, black);
        image.put_pixel(px, h - 1, black);
    }
    for py in 0..h {
        image.put_pixel(0, py, black);
        image.put_pixel(w - 1, py, black);
    }
}
