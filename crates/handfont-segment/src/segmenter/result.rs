use handfont_core::GrayImage;
use image::RgbImage;
use serde::{Deserialize, Serialize};

use crate::binarize::ThresholdChoice;
use crate::fiducials::FiducialQuad;
use crate::warp::WarpOutcome;

/// One non-empty cell, normalized onto a square white canvas with black ink.
#[derive(Clone, Debug, PartialEq)]
pub struct GlyphCandidate {
    pub cell_index: usize,
    pub letter: char,
    pub image: GrayImage,
}

/// Candidates plus everything needed to understand how they were found.
#[derive(Clone, Debug)]
pub struct SegmentationReport {
    pub candidates: Vec<GlyphCandidate>,
    pub threshold: ThresholdChoice,
    /// Ink ratio of the cleaned full-page mask.
    pub ink_ratio: f64,
    pub warp: WarpOutcome,
    pub quad: Option<FiducialQuad>,
    pub fiducial_candidates: usize,
    /// `(width, height)` of the decoded scan.
    pub scan_size: (usize, usize),
    pub cells_examined: usize,
    pub empty_cells: usize,
    /// Rectified color page, when requested and the warp was applied.
    pub warped_page: Option<RgbImage>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CandidateSummary {
    pub cell_index: usize,
    pub letter: char,
    pub ink_px: usize,
}

/// Serializable view of a [`SegmentationReport`] without pixel data.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SegmentationSummary {
    pub threshold: ThresholdChoice,
    pub ink_ratio: f64,
    pub warp: WarpOutcome,
    pub quad: Option<[[f32; 2]; 4]>,
    pub fiducial_candidates: usize,
    pub scan_size: (usize, usize),
    pub cells_examined: usize,
    pub empty_cells: usize,
    pub candidates: Vec<CandidateSummary>,
}

impl SegmentationReport {
    pub fn summary(&self) -> SegmentationSummary {
        SegmentationSummary {
            threshold: self.threshold.clone(),
            ink_ratio: self.ink_ratio,
            warp: self.warp,
            quad: self.quad.map(|q| q.map(|p| [p.x, p.y])),
            fiducial_candidates: self.fiducial_candidates,
            scan_size: self.scan_size,
            cells_examined: self.cells_examined,
            empty_cells: self.empty_cells,
            candidates: self
                .candidates
                .iter()
                .map(|c| CandidateSummary {
                    cell_index: c.cell_index,
                    letter: c.letter,
                    ink_px: c.image.data.iter().filter(|&&v| v == 0).count(),
                })
                .collect(),
        }
    }

    pub fn into_candidates(self) -> Vec<GlyphCandidate> {
        self.candidates
    }
}
