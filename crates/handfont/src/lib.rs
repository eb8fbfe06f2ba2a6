//! High-level facade for the `handfont-*` workspace.
//!
//! This crate provides:
//! - re-exports of the underlying crates
//! - end-to-end helpers: [`segment`] a scanned template page into glyph
//!   candidates, and [`build_font`] a monochrome or layered color font from
//!   accepted glyph sources
//! - JSON configuration files ([`io`]) shared with the `handfont` binary
//!
//! ## Quickstart
//!
//! ```no_run
//! use handfont::core::TemplateSpec;
//! use handfont::font::{FontForgeCompiler, PotraceTracer};
//! use handfont::{build_font, export_candidates, segment, BuildRequest};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let geom = TemplateSpec::a4_grid(6, 5, 30.0).geometry()?;
//! let scan = std::fs::read("scan.jpg")?;
//! let candidates = segment(&scan, &geom, "ABCDEFGHIJKLMNOPQRSTUVWXYZ")?;
//! export_candidates(&candidates, "glyphs".as_ref(), geom.dpi)?;
//!
//! let sources = handfont::font::GlyphSource::scan_dir("glyphs".as_ref())?;
//! let request = BuildRequest::new(sources, "ABCDEFGHIJKLMNOPQRSTUVWXYZ", "My Hand", "MyHand.ttf");
//! let compiler = FontForgeCompiler::locate()?;
//! let tracer = PotraceTracer::locate(PotraceTracer::DEFAULT_TIMEOUT)?;
//! let font = build_font(&request, &compiler, &tracer)?;
//! println!("wrote {}", font.display());
//! # Ok(())
//! # }
//! ```
//!
//! ## API map
//! - `handfont::core`: template geometry, gray images, masks, homographies, logger.
//! - `handfont::segmentation`: binarization, fiducials, warp and cell extraction.
//! - `handfont::print`: blank template page rendering.
//! - `handfont::font`: codepoint mapping, color layers, tool ports, COLR/CPAL, inspection.

pub use handfont_core as core;
pub use handfont_font as font;
pub use handfont_print as print;
pub use handfont_segment as segmentation;

pub use handfont_core::{TemplateGeometry, TemplateSpec};
pub use handfont_font::{BuildOutcome, ColorMode, FontBuildError};
pub use handfont_segment::{GlyphCandidate, SegmentationReport, SegmenterParams};

mod error;
pub mod io;
mod pipeline;

pub use error::Error;
pub use pipeline::{
    build_font, build_font_with_outcome, candidate_file_name, export_candidates, segment,
    segment_file, segment_with_report, BuildRequest,
};
