use handfont_core::{GrayImage, PixelRect, TemplateGeometry};
use serde::{Deserialize, Serialize};

use crate::bitmap_font::{can_draw, draw_text, text_size, GLYPH_H};

/// What to print in the top-left corner of each cell.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CellLabel {
    None,
    /// One-based cell number.
    #[default]
    Index,
    /// The expected letter, falling back to the index when it has no bitmap.
    Letter,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderOptions {
    pub label: CellLabel,
    pub grid_gray: u8,
    pub label_gray: u8,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            label: CellLabel::Index,
            grid_gray: 180,
            label_gray: 0,
        }
    }
}

/// Render a white page with corner markers, cell outlines and cell labels.
pub fn render_template(geom: &TemplateGeometry, letters: &str, opts: &RenderOptions) -> GrayImage {
    let mut img = GrayImage::filled(geom.raster_width_px, geom.raster_height_px, 255);

    for b in &geom.fiducial_boxes {
        img.fill_rect(b.x0, b.y0, b.x1, b.y1, 0);
    }

    let letters: Vec<char> = letters.chars().collect();
    for (idx, cell) in geom.cell_rects.iter().enumerate() {
        outline(&mut img, cell, opts.grid_gray);

        let label = match opts.label {
            CellLabel::None => continue,
            CellLabel::Index => (idx + 1).to_string(),
            CellLabel::Letter => match letters.get(idx) {
                Some(c) if can_draw(&c.to_string()) => c.to_string(),
                _ => (idx + 1).to_string(),
            },
        };
        draw_label(&mut img, cell, &label, opts.label_gray);
    }

    img
}

/// 1 px outline on the cell border, the right/bottom edge drawn on `x1`/`y1`.
fn outline(img: &mut GrayImage, cell: &PixelRect, value: u8) {
    img.fill_rect(cell.x0, cell.y0, cell.x1 + 1, cell.y0 + 1, value);
    img.fill_rect(cell.x0, cell.y1, cell.x1 + 1, cell.y1 + 1, value);
    img.fill_rect(cell.x0, cell.y0, cell.x0 + 1, cell.y1 + 1, value);
    img.fill_rect(cell.x1, cell.y0, cell.x1 + 1, cell.y1 + 1, value);
}

/// Place the label inside the corner region that segmentation ignores.
fn draw_label(img: &mut GrayImage, cell: &PixelRect, label: &str, value: u8) {
    let side = cell.width().min(cell.height());
    let border = (side / 50).max(2);
    let region = (side / 5).max(8);
    let avail = region.saturating_sub(2);

    let (w1, _) = text_size(label, 1);
    if w1 == 0 {
        return;
    }
    let scale = (avail / GLYPH_H).min(avail / w1).max(1);
    let at = border + 1;
    draw_text(img, cell.x0 + at, cell.y0 + at, label, scale, value);
}
