//! Declarative page/grid description and its pixel geometry.
//!
//! A [`TemplateSpec`] describes the printed page in millimetres; a
//! [`TemplateGeometry`] is the derived pixel layout at the template DPI.

use serde::{Deserialize, Serialize};

pub const DEFAULT_DPI: u32 = 300;

const MM_PER_INCH: f64 = 25.4;

/// Half-open pixel rectangle `[y0, y1) × [x0, x1)`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PixelRect {
    pub y0: usize,
    pub y1: usize,
    pub x0: usize,
    pub x1: usize,
}

impl PixelRect {
    pub fn new(y0: usize, y1: usize, x0: usize, x1: usize) -> Self {
        Self { y0, y1, x0, x1 }
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.x1.saturating_sub(self.x0)
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.y1.saturating_sub(self.y0)
    }

    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }

    /// Intersect with `[0, height) × [0, width)`; may come back empty.
    pub fn clip(&self, width: usize, height: usize) -> PixelRect {
        let y1 = self.y1.min(height);
        let x1 = self.x1.min(width);
        PixelRect {
            y0: self.y0.min(y1),
            y1,
            x0: self.x0.min(x1),
            x1,
        }
    }

    pub fn intersects(&self, other: &PixelRect) -> bool {
        self.x0 < other.x1 && other.x0 < self.x1 && self.y0 < other.y1 && other.y0 < self.y1
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PaperSpec {
    pub width_mm: f64,
    pub height_mm: f64,
    #[serde(default = "default_dpi")]
    pub dpi: u32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GridSpec {
    pub rows: usize,
    pub cols: usize,
    pub cell_width_mm: f64,
    pub cell_height_mm: f64,
    pub margin_left_mm: f64,
    pub margin_top_mm: f64,
    #[serde(default)]
    pub gap_x_mm: f64,
    #[serde(default)]
    pub gap_y_mm: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FiducialSpec {
    #[serde(default = "default_fiducial_size")]
    pub size_mm: f64,
    #[serde(default = "default_fiducial_margin")]
    pub margin_mm: f64,
}

impl Default for FiducialSpec {
    fn default() -> Self {
        Self {
            size_mm: default_fiducial_size(),
            margin_mm: default_fiducial_margin(),
        }
    }
}

fn default_dpi() -> u32 {
    DEFAULT_DPI
}

fn default_fiducial_size() -> f64 {
    10.0
}

fn default_fiducial_margin() -> f64 {
    5.0
}

/// Printed page layout in millimetres.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TemplateSpec {
    pub paper: PaperSpec,
    pub grid: GridSpec,
    #[serde(default)]
    pub fiducials: FiducialSpec,
}

impl TemplateSpec {
    /// A4 portrait page with a `rows × cols` grid of square cells, centered
    /// horizontally and starting 30 mm from the top edge.
    pub fn a4_grid(rows: usize, cols: usize, cell_mm: f64) -> Self {
        let width_mm = 210.0;
        let margin_left_mm = ((width_mm - cols as f64 * cell_mm) / 2.0).max(0.0);
        Self {
            paper: PaperSpec {
                width_mm,
                height_mm: 297.0,
                dpi: DEFAULT_DPI,
            },
            grid: GridSpec {
                rows,
                cols,
                cell_width_mm: cell_mm,
                cell_height_mm: cell_mm,
                margin_left_mm,
                margin_top_mm: 30.0,
                gap_x_mm: 0.0,
                gap_y_mm: 0.0,
            },
            fiducials: FiducialSpec::default(),
        }
    }

    pub fn geometry(&self) -> Result<TemplateGeometry, TemplateError> {
        TemplateGeometry::from_spec(self)
    }
}

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum TemplateError {
    #[error("dpi must be positive")]
    ZeroDpi,
    #[error("{field} must be positive and finite, got {value}")]
    NonPositive { field: &'static str, value: f64 },
    #[error("{field} must not be negative, got {value}")]
    Negative { field: &'static str, value: f64 },
    #[error("grid needs at least one row and one column (got {rows}x{cols})")]
    EmptyGrid { rows: usize, cols: usize },
    #[error("grid extends past the page ({needed_w}x{needed_h} px needed, raster is {width}x{height})")]
    GridOutsidePage {
        needed_w: usize,
        needed_h: usize,
        width: usize,
        height: usize,
    },
    #[error("fiducials do not fit on a {width}x{height} px page")]
    FiducialsOutsidePage { width: usize, height: usize },
    #[error("{what} overflows at {dpi} dpi")]
    TooLarge { what: &'static str, dpi: u32 },
}

/// Convert millimetres to pixels, rounding half to even.
pub fn mm_to_px(mm: f64, dpi: u32) -> usize {
    let px = (mm * dpi as f64 / MM_PER_INCH).round_ties_even();
    if px.is_finite() && px > 0.0 {
        px as usize
    } else {
        0
    }
}

/// Pixel layout of a template at its DPI.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TemplateGeometry {
    pub dpi: u32,
    pub raster_width_px: usize,
    pub raster_height_px: usize,
    pub rows: usize,
    pub cols: usize,
    /// Row-major cell rectangles, `rows * cols` of them.
    pub cell_rects: Vec<PixelRect>,
    /// Corner marker boxes in TL, TR, BR, BL order.
    pub fiducial_boxes: [PixelRect; 4],
}

impl TemplateGeometry {
    pub fn from_spec(spec: &TemplateSpec) -> Result<Self, TemplateError> {
        validate(spec)?;

        let dpi = spec.paper.dpi;
        let width = mm_to_px(spec.paper.width_mm, dpi);
        let height = mm_to_px(spec.paper.height_mm, dpi);

        let g = &spec.grid;
        let cell_w = mm_to_px(g.cell_width_mm, dpi);
        let cell_h = mm_to_px(g.cell_height_mm, dpi);
        let m_left = mm_to_px(g.margin_left_mm, dpi);
        let m_top = mm_to_px(g.margin_top_mm, dpi);
        let gap_x = mm_to_px(g.gap_x_mm, dpi);
        let gap_y = mm_to_px(g.gap_y_mm, dpi);

        if cell_w == 0 || cell_h == 0 {
            return Err(TemplateError::NonPositive {
                field: "cell size in pixels",
                value: cell_w.min(cell_h) as f64,
            });
        }

        if width.checked_mul(height).is_none() {
            return Err(TemplateError::TooLarge { what: "page raster", dpi });
        }
        let needed_w = grid_span(m_left, g.cols, cell_w, gap_x)
            .ok_or(TemplateError::TooLarge { what: "grid width", dpi })?;
        let needed_h = grid_span(m_top, g.rows, cell_h, gap_y)
            .ok_or(TemplateError::TooLarge { what: "grid height", dpi })?;
        if needed_w > width || needed_h > height {
            return Err(TemplateError::GridOutsidePage {
                needed_w,
                needed_h,
                width,
                height,
            });
        }

        let mut cell_rects = Vec::with_capacity(g.rows * g.cols);
        for r in 0..g.rows {
            for c in 0..g.cols {
                let x0 = m_left + c * (cell_w + gap_x);
                let y0 = m_top + r * (cell_h + gap_y);
                cell_rects.push(PixelRect::new(y0, y0 + cell_h, x0, x0 + cell_w));
            }
        }

        let size = mm_to_px(spec.fiducials.size_mm, dpi);
        let margin = mm_to_px(spec.fiducials.margin_mm, dpi);
        let fiducial_span = margin
            .checked_add(size)
            .and_then(|v| v.checked_mul(2))
            .ok_or(TemplateError::TooLarge { what: "fiducial margin", dpi })?;
        if fiducial_span > width.min(height) {
            return Err(TemplateError::FiducialsOutsidePage { width, height });
        }
        let fiducial_boxes = fiducial_boxes(width, height, size, margin);

        log::debug!(
            "template geometry: {}x{} px @ {} dpi, {}x{} cells of {}x{} px",
            width,
            height,
            dpi,
            g.rows,
            g.cols,
            cell_w,
            cell_h
        );

        Ok(Self {
            dpi,
            raster_width_px: width,
            raster_height_px: height,
            rows: g.rows,
            cols: g.cols,
            cell_rects,
            fiducial_boxes,
        })
    }

    pub fn cell_count(&self) -> usize {
        self.cell_rects.len()
    }

    /// Template width / height.
    pub fn aspect(&self) -> f64 {
        self.raster_width_px as f64 / self.raster_height_px.max(1) as f64
    }
}

/// `margin + count * cell + (count - 1) * gap`, `None` on overflow.
fn grid_span(margin: usize, count: usize, cell: usize, gap: usize) -> Option<usize> {
    count
        .checked_mul(cell)?
        .checked_add(count.saturating_sub(1).checked_mul(gap)?)?
        .checked_add(margin)
}

fn fiducial_boxes(width: usize, height: usize, size: usize, margin: usize) -> [PixelRect; 4] {
    let left = margin;
    let right = width - margin - size;
    let top = margin;
    let bottom = height - margin - size;
    [
        PixelRect::new(top, top + size, left, left + size),
        PixelRect::new(top, top + size, right, right + size),
        PixelRect::new(bottom, bottom + size, right, right + size),
        PixelRect::new(bottom, bottom + size, left, left + size),
    ]
}

fn validate(spec: &TemplateSpec) -> Result<(), TemplateError> {
    if spec.paper.dpi == 0 {
        return Err(TemplateError::ZeroDpi);
    }
    let g = &spec.grid;
    if g.rows == 0 || g.cols == 0 {
        return Err(TemplateError::EmptyGrid {
            rows: g.rows,
            cols: g.cols,
        });
    }
    for (field, value) in [
        ("paper.width_mm", spec.paper.width_mm),
        ("paper.height_mm", spec.paper.height_mm),
        ("grid.cell_width_mm", g.cell_width_mm),
        ("grid.cell_height_mm", g.cell_height_mm),
        ("fiducials.size_mm", spec.fiducials.size_mm),
    ] {
        if !(value.is_finite() && value > 0.0) {
            return Err(TemplateError::NonPositive { field, value });
        }
    }
    for (field, value) in [
        ("grid.margin_left_mm", g.margin_left_mm),
        ("grid.margin_top_mm", g.margin_top_mm),
        ("grid.gap_x_mm", g.gap_x_mm),
        ("grid.gap_y_mm", g.gap_y_mm),
        ("fiducials.margin_mm", spec.fiducials.margin_mm),
    ] {
        if !value.is_finite() || value < 0.0 {
            return Err(TemplateError::Negative { field, value });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mm_conversion_at_300_dpi() {
        assert_eq!(mm_to_px(25.4, 300), 300);
        assert_eq!(mm_to_px(10.0, 300), 118);
        assert_eq!(mm_to_px(0.0, 300), 0);
        assert_eq!(mm_to_px(210.0, 300), 2480);
        assert_eq!(mm_to_px(297.0, 300), 3508);
    }

    #[test]
    fn a4_grid_geometry_tiles_without_overlap() {
        let spec = TemplateSpec::a4_grid(6, 5, 30.0);
        let geom = spec.geometry().expect("valid template");
        assert_eq!((geom.raster_width_px, geom.raster_height_px), (2480, 3508));
        assert_eq!(geom.cell_count(), 30);

        for (i, a) in geom.cell_rects.iter().enumerate() {
            assert!(a.x1 <= geom.raster_width_px && a.y1 <= geom.raster_height_px);
            for b in geom.cell_rects.iter().skip(i + 1) {
                assert!(!a.intersects(b), "{a:?} overlaps {b:?}");
            }
        }

        // row-major
        let c0 = geom.cell_rects[0];
        let c1 = geom.cell_rects[1];
        let c5 = geom.cell_rects[5];
        assert_eq!(c0.y0, c1.y0);
        assert!(c1.x0 > c0.x0);
        assert!(c5.y0 > c0.y0);
        assert_eq!(c5.x0, c0.x0);
    }

    #[test]
    fn gaps_shift_cells() {
        let mut spec = TemplateSpec::a4_grid(2, 2, 20.0);
        spec.grid.gap_x_mm = 5.0;
        spec.grid.gap_y_mm = 2.0;
        let geom = spec.geometry().unwrap();
        let cell = mm_to_px(20.0, 300);
        assert_eq!(
            geom.cell_rects[1].x0 - geom.cell_rects[0].x0,
            cell + mm_to_px(5.0, 300)
        );
        assert_eq!(
            geom.cell_rects[2].y0 - geom.cell_rects[0].y0,
            cell + mm_to_px(2.0, 300)
        );
    }

    #[test]
    fn fiducials_sit_in_the_corners() {
        let geom = TemplateSpec::a4_grid(6, 5, 30.0).geometry().unwrap();
        let size = mm_to_px(10.0, 300);
        let margin = mm_to_px(5.0, 300);
        let [tl, tr, br, bl] = geom.fiducial_boxes;
        assert_eq!((tl.x0, tl.y0), (margin, margin));
        assert_eq!(tr.x1, geom.raster_width_px - margin);
        assert_eq!(br.y1, geom.raster_height_px - margin);
        assert_eq!((bl.x0, bl.y1), (margin, geom.raster_height_px - margin));
        assert!(geom.fiducial_boxes.iter().all(|b| b.width() == size));
    }

    #[test]
    fn invalid_specs_are_rejected() {
        let mut spec = TemplateSpec::a4_grid(6, 5, 30.0);
        spec.grid.rows = 0;
        assert!(matches!(
            spec.geometry(),
            Err(TemplateError::EmptyGrid { .. })
        ));

        let mut spec = TemplateSpec::a4_grid(6, 5, 30.0);
        spec.grid.cell_width_mm = -1.0;
        assert!(matches!(
            spec.geometry(),
            Err(TemplateError::NonPositive { .. })
        ));

        let spec = TemplateSpec::a4_grid(20, 5, 30.0);
        assert!(matches!(
            spec.geometry(),
            Err(TemplateError::GridOutsidePage { .. })
        ));
    }

    #[test]
    fn absurd_sizes_are_rejected_without_overflow() {
        let mut spec = TemplateSpec::a4_grid(6, 5, 30.0);
        spec.grid.gap_x_mm = 1e300;
        assert!(matches!(
            spec.geometry(),
            Err(TemplateError::TooLarge { what: "grid width", .. })
        ));

        let mut spec = TemplateSpec::a4_grid(6, 5, 30.0);
        spec.grid.rows = usize::MAX;
        assert!(matches!(
            spec.geometry(),
            Err(TemplateError::TooLarge { what: "grid height", .. })
        ));

        let mut spec = TemplateSpec::a4_grid(6, 5, 30.0);
        spec.paper.width_mm = 1e300;
        spec.paper.height_mm = 1e300;
        assert!(matches!(
            spec.geometry(),
            Err(TemplateError::TooLarge { what: "page raster", .. })
        ));

        let mut spec = TemplateSpec::a4_grid(6, 5, 30.0);
        spec.fiducials.margin_mm = 1e300;
        assert!(matches!(
            spec.geometry(),
            Err(TemplateError::TooLarge { what: "fiducial margin", .. })
        ));
    }

    #[test]
    fn json_defaults_apply() {
        let json = r#"{
            "paper": {"width_mm": 210, "height_mm": 297},
            "grid": {"rows": 2, "cols": 3, "cell_width_mm": 20, "cell_height_mm": 25,
                     "margin_left_mm": 15, "margin_top_mm": 40}
        }"#;
        let spec: TemplateSpec = serde_json::from_str(json).unwrap();
        assert_eq!(spec.paper.dpi, 300);
        assert_eq!(spec.grid.gap_x_mm, 0.0);
        assert_eq!(spec.fiducials, FiducialSpec::default());
        assert_eq!(spec.geometry().unwrap().cell_count(), 6);
    }
}
