//! Multi-panel figures saved as PNG.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use image::{imageops, Rgb, RgbImage};

use super::panel::Panel;
use super::PlotError;

/// Fraction of the figure height kept for the overall title.
const TITLE_BAND: f64 = 0.06;
/// Fractions of a panel cell used for the panel and its colour bar.
const PANEL_WIDTH: f64 = 0.80;
const PANEL_HEIGHT: f64 = 0.88;
const COLORBAR_WIDTH: f64 = 0.04;

/// A grid of panels with an optional overall title.
#[derive(Clone, Debug)]
pub struct Figure {
    width: u32,
    height: u32,
    rows: usize,
    cols: usize,
    panels: Vec<Panel>,
    title: Option<String>,
}

impl Figure {
    /// Figure of `width` x `height` pixels split into `rows` x `cols` panels.
    pub fn new(width: u32, height: u32, rows: usize, cols: usize) -> Self {
        let rows = rows.max(1);
        let cols = cols.max(1);
        let (cell_w, cell_h) = cell_size(width, height, rows, cols);
        let panel_w = ((cell_w as f64) * PANEL_WIDTH) as u32;
        let panel_h = ((cell_h as f64) * PANEL_HEIGHT) as u32;
        Self {
            width,
            height,
            rows,
            cols,
            panels: (0..rows * cols).map(|_| Panel::new(panel_w.max(1), panel_h.max(1))).collect(),
            title: None,
        }
    }

    /// Single-panel figure.
    pub fn single(width: u32, height: u32) -> Self {
        Self::new(width, height, 1, 1)
    }

    pub fn n_panels(&self) -> usize {
        self.panels.len()
    }

    pub fn panel(&self, index: usize) -> Result<&Panel, PlotError> {
        self.panels.get(index).ok_or(PlotError::NoSuchPanel(index))
    }

    /// Panels are numbered row by row from the top left.
    pub fn panel_mut(&mut self, index: usize) -> Result<&mut Panel, PlotError> {
        self.panels.get_mut(index).ok_or(PlotError::NoSuchPanel(index))
    }

    /// Overall title above every panel.
    pub fn title(&mut self, title: impl Into<String>) -> &mut Self {
        self.title = Some(title.into());
        self
    }

    /// Compose every panel and colour bar into one image.
    pub fn render(&self) -> RgbImage {
        let mut image = RgbImage::from_pixel(self.width.max(1), self.height.max(1), Rgb([255, 255, 255]));
        let (cell_w, cell_h) = cell_size(self.width, self.height, self.rows, self.cols);
        let top = self.title_band();

        for (index, panel) in self.panels.iter().enumerate() {
            let (row, col) = (index / self.cols, index % self.cols);
            let x0 = col as u32 * cell_w;
            let y0 = top + row as u32 * cell_h;
            let (panel_w, panel_h) = panel.size();
            let margin_x = ((cell_w as f64) * 0.05) as u32;
            let margin_y = cell_h.saturating_sub(panel_h) / 2;

            let rendered = panel.render();
            imageops::replace(&mut image, &rendered, (x0 + margin_x) as i64, (y0 + margin_y) as i64);

            if let Some(colorbar) = panel.get_colorbar() {
                let bar_w = (((cell_w as f64) * COLORBAR_WIDTH) as u32).max(1);
                let strip = colorbar.render(bar_w, panel_h);
                let bar_x = x0 + margin_x + panel_w + margin_x / 2;
                imageops::replace(&mut image, &strip, bar_x as i64, (y0 + margin_y) as i64);
            }
        }
        image
    }

    /// Text stored with the image: titles, labels, limits, colour scales
    /// and annotations of every panel.
    pub fn metadata(&self) -> Vec<(String, String)> {
        let mut entries = Vec::new();
        if let Some(title) = &self.title {
            entries.push(("Title".to_string(), title.clone()));
        }
        for (index, panel) in self.panels.iter().enumerate() {
            let n = index + 1;
            entries.push((format!("Panel {}", n), panel.describe()));
            if let Some(colorbar) = panel.get_colorbar() {
                entries.push((format!("Panel {} colorbar", n), colorbar.describe()));
            }
            if !panel.annotations().is_empty() {
                let text: Vec<String> = panel
                    .annotations()
                    .iter()
                    .map(|a| format!("{} at ({}, {}) rotated {}", a.text, a.x, a.y, a.rotation))
                    .collect();
                entries.push((format!("Panel {} annotations", n), text.join("; ")));
            }
        }
        entries
    }

    /// Render and write a PNG file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), PlotError> {
        let path = path.as_ref();
        let image = self.render();
        let file = File::create(path)?;
        let mut encoder = png::Encoder::new(BufWriter::new(file), image.width(), image.height());
        encoder.set_color(png::ColorType::Rgb);
        encoder.set_depth(png::BitDepth::Eight);
        for (keyword, text) in self.metadata() {
            encoder.add_text_chunk(latin1(&keyword), latin1(&text))?;
        }
        let mut writer = encoder.write_header()?;
        writer.write_image_data(image.as_raw())?;
        writer.finish()?;
        log::info!("Saved figure {}", path.display());
        Ok(())
    }

    fn title_band(&self) -> u32 {
        if self.title.is_some() {
            ((self.height as f64) * TITLE_BAND) as u32
        } else {
            0
        }
    }
}

fn cell_size(width: u32, height: u32, rows: usize, cols: usize) -> (u32, u32) {
    let usable = ((height as f64) * (1.0 - TITLE_BAND)) as u32;
    (width / cols as u32, usable / rows as u32)
}

/// `tEXt` chunks hold Latin-1; anything outside it becomes `?`.
fn latin1(text: &str) -> String {
    text.chars()
        .map(|c| if (c as u32) < 256 && c != '\0' { c } else { '?' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plot::{Colorbar, Colormap, LineStyle, Norm};
    use tempfile::tempdir;

    #[test]
    fn test_panel_indexing() {
        let mut fig = Figure::new(200, 100, 1, 2);
        assert_eq!(fig.n_panels(), 2);
        assert!(fig.panel_mut(1).is_ok());
        assert!(matches!(fig.panel_mut(2), Err(PlotError::NoSuchPanel(2))));
    }

    #[test]
    fn test_render_size() {
        let mut fig = Figure::new(160, 120, 2, 1);
        fig.title("Two panels");
        let image = fig.render();
        assert_eq!(image.dimensions(), (160, 120));
    }

    #[test]
    fn test_latin1_replaces_wide_chars() {
        assert_eq!(latin1("65°S"), "65°S");
        assert_eq!(latin1("km²→"), "km²?");
    }

    #[test]
    fn test_metadata_lists_titles_and_colorbars() {
        let mut fig = Figure::single(100, 100);
        fig.title("Mixed layer depth");
        let panel = fig.panel_mut(0).unwrap();
        panel.title("a) U3_LIM");
        panel.colorbar(Colorbar::new(Colormap::jet(), Norm::linear(0.0, 600.0)).with_ticks(vec![0.0, 200.0]));
        let meta = fig.metadata();
        assert_eq!(meta[0], ("Title".to_string(), "Mixed layer depth".to_string()));
        assert!(meta[1].1.contains("title=a) U3_LIM"));
        assert!(meta[2].1.contains("ticks=[0, 200]"));
    }

    #[test]
    fn test_save_writes_png_with_text() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("line.png");
        let mut fig = Figure::single(64, 48);
        fig.panel_mut(0)
            .unwrap()
            .line(&[0.0, 1.0], &[0.0, 1.0], Rgb([0, 0, 255]), LineStyle::Solid)
            .title("Drake Passage Transport (Sv)");
        fig.save(&path).unwrap();

        let decoder = png::Decoder::new(File::open(&path).unwrap());
        let reader = decoder.read_info().unwrap();
        let info = reader.info();
        assert_eq!((info.width, info.height), (64, 48));
        assert!(info
            .uncompressed_latin1_text
            .iter()
            .any(|chunk| chunk.text.contains("Drake Passage Transport (Sv)")));
    }
}
