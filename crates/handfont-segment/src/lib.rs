//! Turn a scanned, hand-filled template page into per-letter glyph images.
//!
//! The scan is binarized globally, the four printed corner markers are
//! located, and when they form a plausible quad the page is rectified into
//! template raster space. Each template cell is then cropped, cleaned of grid
//! lines and its printed label, and normalized onto a square canvas.
//!
//! ```no_run
//! use handfont_core::TemplateSpec;
//! use handfont_segment::{Segmenter, SegmenterParams};
//!
//! let geom = TemplateSpec::a4_grid(6, 5, 30.0).geometry()?;
//! let segmenter = Segmenter::new(geom, SegmenterParams::default());
//! let report = segmenter.segment_file("scan.jpg".as_ref(), "ABCDEFGHIJ")?;
//! for glyph in &report.candidates {
//!     println!("cell {} -> {}", glyph.cell_index, glyph.letter);
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod binarize;
mod cells;
mod components;
mod debug;
mod fiducials;
mod segmenter;
mod threshold;
mod warp;

pub use binarize::{binarize, blur3, open_close, Binarization, ThresholdBranch, ThresholdChoice};
pub use cells::{extract_cell_ink, place_on_canvas, tight_crop, CellSkip};
pub use components::{label_components, remove_small_components, Component, Labeling};
pub use fiducials::{check_quad, detect_fiducials, FiducialQuad, FiducialSearch, QuadRejection};
pub use segmenter::{
    BinarizeParams, CandidateSummary, CellParams, FiducialParams, GlyphCandidate, SegmentError,
    SegmentationReport, SegmentationSummary, Segmenter, SegmenterParams, WarpParams, WarpTarget,
};
pub use warp::{plan_warp, target_corners, warp_mask, WarpOutcome};
