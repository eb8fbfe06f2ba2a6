//! Page segmentation pipeline.
//!
//! decode -> binarize -> find corner markers -> optional perspective
//! correction -> per-cell extraction.

mod error;
mod params;
mod pipeline;
mod result;

pub use error::SegmentError;
pub use params::{BinarizeParams, CellParams, FiducialParams, SegmenterParams, WarpParams, WarpTarget};
pub use pipeline::Segmenter;
pub use result::{CandidateSummary, GlyphCandidate, SegmentationReport, SegmentationSummary};
