//! Corner marker detection and quad sanity checks.

use handfont_core::RasterMask;
use nalgebra::Point2;
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::components::{label_components, outer_components, Component};
use crate::segmenter::FiducialParams;

/// Marker centers ordered TL, TR, BR, BL.
pub type FiducialQuad = [Point2<f32>; 4];

#[derive(Clone, Debug)]
pub struct FiducialSearch {
    pub quad: Option<FiducialQuad>,
    pub components: usize,
    pub candidates: Vec<Component>,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "reason")]
pub enum QuadRejection {
    SideTooShort { side: f32 },
    SideRatio { width_ratio: f32, height_ratio: f32 },
    Aspect { quad: f32, template: f32 },
}

fn is_marker_like(c: &Component, min_side: f32, max_side: f32, params: &FiducialParams) -> bool {
    let (w, h) = (c.width() as f32, c.height() as f32);
    if w.min(h) < min_side || w.max(h) > max_side {
        return false;
    }
    let ratio = w / (h + 1e-6);
    let (lo, hi) = params.aspect_range;
    (lo..=hi).contains(&ratio)
}

/// Find four marker-like blobs and assign them to the page corners.
///
/// Only outer components are considered; ink inside another blob's hole
/// (a letter drawn in a box, a dot inside a ring) never becomes a marker.
///
/// Corners are visited TL, TR, BR, BL; each takes the nearest unused
/// candidate center. There is no backtracking.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "info", skip(mask, params), fields(w = mask.width, h = mask.height))
)]
pub fn detect_fiducials(mask: &RasterMask, params: &FiducialParams) -> FiducialSearch {
    let (w, h) = (mask.width as f32, mask.height as f32);
    let short = w.min(h);
    let min_side = params.min_side_frac * short;
    let max_side = params.max_side_frac * short;

    let labeling = label_components(mask);
    let outer = outer_components(mask, &labeling);
    let candidates: Vec<Component> = labeling
        .components
        .iter()
        .zip(&outer)
        .filter(|(c, &is_outer)| is_outer && is_marker_like(c, min_side, max_side, params))
        .map(|(c, _)| *c)
        .collect();
    log::debug!(
        "fiducials: {} components, {} marker-like (side {:.1}..{:.1} px)",
        labeling.components.len(),
        candidates.len(),
        min_side,
        max_side
    );

    let quad = if candidates.len() < 4 {
        None
    } else {
        let centers: Vec<(f32, f32)> = candidates.iter().map(Component::box_center).collect();
        let mut used = vec![false; centers.len()];
        let corners = [(0.0, 0.0), (w, 0.0), (w, h), (0.0, h)];
        let mut quad = [Point2::origin(); 4];
        for (slot, &(tx, ty)) in corners.iter().enumerate() {
            let best = centers
                .iter()
                .enumerate()
                .filter(|(i, _)| !used[*i])
                .min_by(|(_, a), (_, b)| {
                    let da = (a.0 - tx).powi(2) + (a.1 - ty).powi(2);
                    let db = (b.0 - tx).powi(2) + (b.1 - ty).powi(2);
                    da.total_cmp(&db)
                })
                .map(|(i, _)| i);
            let Some(i) = best else {
                return FiducialSearch {
                    quad: None,
                    components: labeling.components.len(),
                    candidates,
                };
            };
            used[i] = true;
            quad[slot] = Point2::new(centers[i].0, centers[i].1);
        }
        Some(quad)
    };

    FiducialSearch {
        quad,
        components: labeling.components.len(),
        candidates,
    }
}

/// Check that a quad is plausibly the template page seen at an angle.
pub fn check_quad(
    quad: &FiducialQuad,
    template_w: usize,
    template_h: usize,
    params: &FiducialParams,
) -> Result<(), QuadRejection> {
    let [tl, tr, br, bl] = quad;
    let width_top = (tr - tl).norm();
    let width_bottom = (br - bl).norm();
    let height_left = (bl - tl).norm();
    let height_right = (br - tr).norm();

    let shortest = width_top.min(width_bottom).min(height_left).min(height_right);
    if shortest < params.min_quad_side {
        return Err(QuadRejection::SideTooShort { side: shortest });
    }

    let eps = 1e-6_f32;
    let ratio = |a: f32, b: f32| a.max(b) / a.min(b).max(eps);
    let width_ratio = ratio(width_top, width_bottom);
    let height_ratio = ratio(height_left, height_right);
    if width_ratio > params.max_side_ratio || height_ratio > params.max_side_ratio {
        return Err(QuadRejection::SideRatio {
            width_ratio,
            height_ratio,
        });
    }

    let quad_aspect = 0.5 * (width_top + width_bottom) / (0.5 * (height_left + height_right)).max(eps);
    let template_aspect = template_w as f32 / (template_h as f32).max(eps);
    if ratio(quad_aspect, template_aspect) > params.max_aspect_ratio {
        return Err(QuadRejection::Aspect {
            quad: quad_aspect,
            template: template_aspect,
        });
    }
    Ok(())
}
