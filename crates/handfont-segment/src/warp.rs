//! Perspective correction of the scan into template raster space.

use handfont_core::{
    homography_from_4pt, sample_bilinear, GrayImage, Homography, RasterMask, TemplateGeometry,
};
use nalgebra::Point2;
use serde::{Deserialize, Serialize};

use crate::fiducials::{check_quad, FiducialQuad, QuadRejection};
use crate::segmenter::{FiducialParams, WarpParams, WarpTarget};

/// Whether the scan was rectified, and if not, why.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum WarpOutcome {
    Applied,
    FiducialsNotFound,
    QuadRejected { rejection: QuadRejection },
    DegenerateTransform,
}

impl WarpOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, WarpOutcome::Applied)
    }
}

/// Destination corners (TL, TR, BR, BL) in template pixels.
pub fn target_corners(geom: &TemplateGeometry, target: WarpTarget) -> FiducialQuad {
    match target {
        WarpTarget::Inset { px } => {
            let w = geom.raster_width_px as f32;
            let h = geom.raster_height_px as f32;
            [
                Point2::new(px, px),
                Point2::new(w - px, px),
                Point2::new(w - px, h - px),
                Point2::new(px, h - px),
            ]
        }
        WarpTarget::FiducialCenters => geom.fiducial_boxes.map(|b| {
            Point2::new(
                b.x0 as f32 + b.width() as f32 / 2.0,
                b.y0 as f32 + b.height() as f32 / 2.0,
            )
        }),
    }
}

/// Decide whether to warp.
///
/// Returns the outcome and, when it is `Applied`, the scan-from-template
/// mapping used for resampling.
pub fn plan_warp(
    quad: Option<&FiducialQuad>,
    geom: &TemplateGeometry,
    fiducials: &FiducialParams,
    params: &WarpParams,
) -> (WarpOutcome, Option<Homography>) {
    let Some(quad) = quad else {
        return (WarpOutcome::FiducialsNotFound, None);
    };
    if let Err(rejection) = check_quad(
        quad,
        geom.raster_width_px,
        geom.raster_height_px,
        fiducials,
    ) {
        log::info!("fiducial quad rejected: {rejection:?}");
        return (WarpOutcome::QuadRejected { rejection }, None);
    }

    let dst = target_corners(geom, params.target);
    let Some(template_from_scan) = homography_from_4pt(quad, &dst) else {
        return (WarpOutcome::DegenerateTransform, None);
    };
    let det = template_from_scan.linear_det();
    if det.abs() <= params.det_epsilon {
        log::info!("perspective transform is degenerate (det={det:e})");
        return (WarpOutcome::DegenerateTransform, None);
    }
    match template_from_scan.inverse() {
        Some(scan_from_template) => (WarpOutcome::Applied, Some(scan_from_template)),
        None => (WarpOutcome::DegenerateTransform, None),
    }
}

/// Resample a mask bilinearly; any nonzero coverage stays ink.
pub fn warp_mask(
    mask: &RasterMask,
    scan_from_template: &Homography,
    out_w: usize,
    out_h: usize,
) -> RasterMask {
    let as_gray: GrayImage = mask.to_gray(255, 0);
    let view = as_gray.view();
    let mut out = RasterMask::new(out_w, out_h);
    for y in 0..out_h {
        for x in 0..out_w {
            let p = scan_from_template.apply(Point2::new(x as f32, y as f32));
            if p.x.is_finite() && p.y.is_finite() && sample_bilinear(&view, p.x, p.y) >= 0.5 {
                out.data[y * out_w + x] = 1;
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use handfont_core::TemplateSpec;

    fn geom() -> TemplateGeometry {
        let mut spec = TemplateSpec::a4_grid(6, 5, 30.0);
        spec.paper.dpi = 100;
        spec.geometry().unwrap()
    }

    fn page_quad(g: &TemplateGeometry) -> FiducialQuad {
        target_corners(g, WarpTarget::FiducialCenters)
    }

    #[test]
    fn missing_quad_means_not_found() {
        let g = geom();
        let (outcome, h) = plan_warp(None, &g, &FiducialParams::default(), &WarpParams::default());
        assert_eq!(outcome, WarpOutcome::FiducialsNotFound);
        assert!(h.is_none());
    }

    #[test]
    fn plausible_quad_is_applied_and_maps_to_inset_corners() {
        let g = geom();
        let quad = page_quad(&g);
        let params = WarpParams::default();
        let (outcome, h) = plan_warp(Some(&quad), &g, &FiducialParams::default(), &params);
        assert!(outcome.is_applied());
        let scan_from_template = h.expect("homography");
        let back = scan_from_template.apply(Point2::new(20.0, 20.0));
        assert!((back.x - quad[0].x).abs() < 1e-2 && (back.y - quad[0].y).abs() < 1e-2);
    }

    #[test]
    fn fiducial_center_target_is_identity_for_an_unskewed_page() {
        let g = geom();
        let quad = page_quad(&g);
        let params = WarpParams {
            target: WarpTarget::FiducialCenters,
            ..WarpParams::default()
        };
        let (_, h) = plan_warp(Some(&quad), &g, &FiducialParams::default(), &params);
        let h = h.expect("homography");
        let p = h.apply(Point2::new(300.0, 500.0));
        assert!((p.x - 300.0).abs() < 1e-2 && (p.y - 500.0).abs() < 1e-2);
    }

    #[test]
    fn rejected_quad_reports_reason() {
        let g = geom();
        let quad = [
            Point2::new(0.0, 0.0),
            Point2::new(4.0, 0.0),
            Point2::new(4.0, 4.0),
            Point2::new(0.0, 4.0),
        ];
        let (outcome, _) = plan_warp(Some(&quad), &g, &FiducialParams::default(), &WarpParams::default());
        assert!(matches!(outcome, WarpOutcome::QuadRejected { .. }));
    }

    #[test]
    fn determinant_gate_blocks_the_warp() {
        let g = geom();
        let quad = page_quad(&g);
        let params = WarpParams {
            det_epsilon: 1e9,
            ..WarpParams::default()
        };
        let (outcome, h) = plan_warp(Some(&quad), &g, &FiducialParams::default(), &params);
        assert_eq!(outcome, WarpOutcome::DegenerateTransform);
        assert!(h.is_none());
    }

    #[test]
    fn identity_mask_warp_preserves_ink() {
        let mut m = RasterMask::new(30, 20);
        for x in 5..15 {
            m.set(x, 7, true);
        }
        let out = warp_mask(&m, &Homography::identity(), 30, 20);
        assert_eq!(out, m);
    }
}
