//! Render the blank template page a user prints and fills in by hand.
//!
//! The page carries four solid corner markers, a light-gray cell grid and a
//! small label in the top-left corner of every cell (the region the
//! segmenter blanks out before looking for ink).
//!
//! ```no_run
//! use handfont_core::TemplateSpec;
//! use handfont_print::{render_template, write_png, RenderOptions};
//!
//! let geom = TemplateSpec::a4_grid(6, 5, 30.0).geometry()?;
//! let page = render_template(&geom, "ABCDE", &RenderOptions::default());
//! write_png(std::path::Path::new("page.png"), &page, geom.dpi)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod bitmap_font;
mod encode;
mod render;

pub use bitmap_font::{draw_text, text_size, GLYPH_H, GLYPH_W};
pub use encode::{encode_png, write_png, PrintError};
pub use render::{render_template, CellLabel, RenderOptions};
