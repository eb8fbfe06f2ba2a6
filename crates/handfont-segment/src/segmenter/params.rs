use serde::{Deserialize, Serialize};

/// Global binarization and mask cleanup.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BinarizeParams {
    /// Threshold position between the dark and background percentiles.
    pub alpha: f64,
    pub dark_percentile: f64,
    pub background_percentile: f64,
    /// Ink ratios outside this band trigger the Otsu comparison.
    pub sane_ink_ratio: (f64, f64),
    /// Band the Otsu comparison tries to land in.
    pub target_ink_ratio: (f64, f64),
    /// Components below `min(cap, max(floor, frac * H * W))` pixels are noise.
    pub min_component_area_frac: f64,
    pub min_component_area_floor: usize,
    pub min_component_area_cap: usize,
}

impl Default for BinarizeParams {
    fn default() -> Self {
        Self {
            alpha: 0.4,
            dark_percentile: 2.0,
            background_percentile: 50.0,
            sane_ink_ratio: (0.005, 0.7),
            target_ink_ratio: (0.01, 0.4),
            min_component_area_frac: 1e-6,
            min_component_area_floor: 8,
            min_component_area_cap: 200,
        }
    }
}

impl BinarizeParams {
    pub fn min_component_area(&self, width: usize, height: usize) -> usize {
        let scaled = (self.min_component_area_frac * (width * height) as f64).floor() as usize;
        scaled
            .max(self.min_component_area_floor)
            .min(self.min_component_area_cap)
    }
}

/// Corner marker filters and quad sanity limits.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FiducialParams {
    /// Bounding box side limits relative to `min(H, W)`.
    pub min_side_frac: f32,
    pub max_side_frac: f32,
    /// Allowed `w / h` range of a marker's bounding box.
    pub aspect_range: (f32, f32),
    /// Shortest accepted quad side in pixels.
    pub min_quad_side: f32,
    /// Largest accepted top/bottom and left/right length ratio.
    pub max_side_ratio: f32,
    /// Largest accepted ratio between quad and template aspect.
    pub max_aspect_ratio: f32,
}

impl Default for FiducialParams {
    fn default() -> Self {
        Self {
            min_side_frac: 0.01,
            max_side_frac: 0.08,
            aspect_range: (0.6, 1.4),
            min_quad_side: 10.0,
            max_side_ratio: 2.0,
            max_aspect_ratio: 1.6,
        }
    }
}

/// Where the detected marker quad lands in the template raster.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum WarpTarget {
    /// Corners inset by `px` from each template edge.
    Inset { px: f32 },
    /// Centers of the template's printed marker boxes.
    FiducialCenters,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WarpParams {
    pub target: WarpTarget,
    /// `|det|` of the linear block must exceed this for the warp to apply.
    pub det_epsilon: f64,
}

impl Default for WarpParams {
    fn default() -> Self {
        Self {
            target: WarpTarget::Inset { px: 20.0 },
            det_epsilon: 1e-8,
        }
    }
}

/// Per-cell cleanup and glyph normalization.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CellParams {
    /// Border trimmed from each side is `max(border_min, min(h, w) / border_divisor)`.
    pub border_divisor: usize,
    pub border_min: usize,
    /// Blanked label corner is `max(index_min, dim / index_divisor)` per axis.
    pub index_divisor: usize,
    pub index_min: usize,
    /// Cells with fewer ink pixels are treated as empty.
    pub min_ink_px: usize,
    pub crop_pad: usize,
    pub canvas_size: usize,
    pub canvas_margin: usize,
}

impl Default for CellParams {
    fn default() -> Self {
        Self {
            border_divisor: 50,
            border_min: 2,
            index_divisor: 5,
            index_min: 8,
            min_ink_px: 50,
            crop_pad: 6,
            canvas_size: 1024,
            canvas_margin: 96,
        }
    }
}

/// Configuration for [`super::Segmenter`].
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmenterParams {
    pub binarize: BinarizeParams,
    pub fiducials: FiducialParams,
    pub warp: WarpParams,
    pub cells: CellParams,
    /// Keep the perspective-corrected color page in the report.
    pub build_warped_page: bool,
}
