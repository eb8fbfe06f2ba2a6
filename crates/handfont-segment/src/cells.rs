//! Per-cell glyph extraction and normalization onto a square canvas.

use handfont_core::{GrayImage, PixelRect, RasterMask};

use crate::segmenter::CellParams;

/// Why a cell produced no glyph.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CellSkip {
    /// Ink left after trimming is below the minimum.
    TooLittleInk(usize),
}

/// Crop `rect` out of `mask`, trim grid lines and the label corner, and
/// return the glyph ink if enough remains.
pub fn extract_cell_ink(
    mask: &RasterMask,
    rect: &PixelRect,
    params: &CellParams,
) -> Result<RasterMask, CellSkip> {
    let mut cell = mask.crop(rect);

    // Trim amount follows the template cell, the slice is clipped to the crop.
    let (ch, cw) = (rect.height(), rect.width());
    let border = (ch.min(cw) / params.border_divisor.max(1)).max(params.border_min);
    if ch > 2 * border && cw > 2 * border {
        cell = cell.crop(&PixelRect::new(border, ch - border, border, cw - border));
    }

    let idx_h = (cell.height / params.index_divisor.max(1)).max(params.index_min);
    let idx_w = (cell.width / params.index_divisor.max(1)).max(params.index_min);
    cell.clear_rect(&PixelRect::new(0, idx_h, 0, idx_w));

    let ink = cell.ink_count();
    if ink < params.min_ink_px {
        return Err(CellSkip::TooLittleInk(ink));
    }
    Ok(cell)
}

/// Bounding box of the ink grown by `pad` on every side, clamped to the mask.
pub fn tight_crop(mask: &RasterMask, pad: usize) -> RasterMask {
    let Some(b) = mask.ink_bounds() else {
        return mask.clone();
    };
    let rect = PixelRect::new(
        b.y0.saturating_sub(pad),
        (b.y1 + pad).min(mask.height),
        b.x0.saturating_sub(pad),
        (b.x1 + pad).min(mask.width),
    );
    mask.crop(&rect)
}

/// Scale the glyph to fit `size - 2 * margin` on its long side with
/// nearest-neighbour sampling and center it on a white canvas.
pub fn place_on_canvas(glyph: &RasterMask, size: usize, margin: usize) -> GrayImage {
    let mut canvas = GrayImage::filled(size, size, 255);
    let (h, w) = (glyph.height, glyph.width);
    if h == 0 || w == 0 || glyph.ink_count() == 0 {
        return canvas;
    }

    let scale = size.saturating_sub(2 * margin) as f64 / h.max(w) as f64;
    let nh = ((h as f64 * scale) as usize).clamp(1, size);
    let nw = ((w as f64 * scale) as usize).clamp(1, size);
    let y0 = (size - nh) / 2;
    let x0 = (size - nw) / 2;

    let sy = h as f64 / nh as f64;
    let sx = w as f64 / nw as f64;
    for dy in 0..nh {
        let src_y = ((dy as f64 * sy) as usize).min(h - 1);
        for dx in 0..nw {
            let src_x = ((dx as f64 * sx) as usize).min(w - 1);
            if glyph.get(src_x, src_y) {
                canvas.set(x0 + dx, y0 + dy, 0);
            }
        }
    }
    canvas
}
