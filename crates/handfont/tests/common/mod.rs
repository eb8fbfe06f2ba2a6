#![allow(dead_code)]

use handfont::core::{GrayImage, TemplateGeometry, TemplateSpec};
use handfont::print::{draw_text, encode_png, render_template, text_size, RenderOptions};

pub const LETTERS: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ0123";

/// A4 6x5 grid at 100 dpi, small enough for quick tests.
pub fn template_spec() -> TemplateSpec {
    let mut spec = TemplateSpec::a4_grid(6, 5, 30.0);
    spec.paper.dpi = 100;
    spec
}

pub fn geometry() -> TemplateGeometry {
    template_spec().geometry().expect("template geometry")
}

/// Template page with every cell's letter drawn large in the middle and the
/// corner markers painted over.
pub fn filled_scan(geom: &TemplateGeometry) -> GrayImage {
    let mut page = render_template(geom, "", &RenderOptions::default());
    for (i, ch) in LETTERS.chars().enumerate() {
        let rect = geom.cell_rects[i];
        let text = ch.to_string();
        let (tw, th) = text_size(&text, 10);
        draw_text(
            &mut page,
            rect.x0 + (rect.width() - tw) / 2,
            rect.y0 + (rect.height() - th) / 2,
            &text,
            10,
            20,
        );
    }
    for b in &geom.fiducial_boxes {
        page.fill_rect(b.x0, b.y0, b.x1, b.y1, 255);
    }
    page
}

pub fn filled_scan_png(geom: &TemplateGeometry) -> Vec<u8> {
    encode_png(&filled_scan(geom), geom.dpi).expect("encode scan")
}
