//! Global binarization of a gray scan into an ink mask.
//!
//! Percentile threshold first; when the resulting ink ratio is implausible,
//! an Otsu threshold competes and the candidate closer to the target band
//! wins. The chosen mask is opened, closed and stripped of specks.

use handfont_core::{GrayImage, RasterMask};
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::components::remove_small_components;
use crate::segmenter::BinarizeParams;
use crate::threshold::{histogram, otsu_threshold, percentile};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThresholdBranch {
    Percentile,
    Otsu,
}

/// Which threshold produced the mask and what each candidate looked like.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ThresholdChoice {
    pub branch: ThresholdBranch,
    /// Pixels at or below this intensity are ink.
    pub threshold: u8,
    pub dark: f64,
    pub background: f64,
    pub percentile_ink_ratio: f64,
    /// Only computed when the percentile ratio left the sane band.
    pub otsu_ink_ratio: Option<f64>,
}

/// Output of [`binarize`] plus the intermediates diagnostics want.
pub struct Binarization {
    pub blurred: GrayImage,
    /// Thresholded mask before morphology and speck removal.
    pub raw: RasterMask,
    pub mask: RasterMask,
    pub choice: ThresholdChoice,
    pub min_component_area: usize,
    pub kept_components: usize,
    pub removed_components: usize,
}

/// Distance of `x` to the closed interval `[lo, hi]`.
fn distance_to_band(x: f64, (lo, hi): (f64, f64)) -> f64 {
    if x < lo {
        lo - x
    } else if x > hi {
        x - hi
    } else {
        0.0
    }
}

fn ink_ratio_at(hist: &[u32; 256], t: u8) -> f64 {
    let total: u64 = hist.iter().map(|&h| h as u64).sum();
    if total == 0 {
        return 0.0;
    }
    let ink: u64 = hist[..=t as usize].iter().map(|&h| h as u64).sum();
    ink as f64 / total as f64
}

/// Pick a threshold for the blurred histogram.
///
/// | percentile ratio in sane band | Otsu closer to target band | result     |
/// |-------------------------------|----------------------------|------------|
/// | yes                           | (not computed)             | percentile |
/// | no                            | strictly                   | Otsu       |
/// | no                            | tie or farther             | percentile |
pub fn choose_threshold(hist: &[u32; 256], params: &BinarizeParams) -> ThresholdChoice {
    let dark = percentile(hist, params.dark_percentile);
    let background = percentile(hist, params.background_percentile);
    let t = (dark + params.alpha * (background - dark)).clamp(0.0, 255.0);
    let t_percentile = t.floor() as u8;
    let ratio = ink_ratio_at(hist, t_percentile);

    let mut choice = ThresholdChoice {
        branch: ThresholdBranch::Percentile,
        threshold: t_percentile,
        dark,
        background,
        percentile_ink_ratio: ratio,
        otsu_ink_ratio: None,
    };

    let (sane_lo, sane_hi) = params.sane_ink_ratio;
    if (sane_lo..=sane_hi).contains(&ratio) {
        return choice;
    }

    let t_otsu = otsu_threshold(hist);
    let ratio_otsu = ink_ratio_at(hist, t_otsu);
    choice.otsu_ink_ratio = Some(ratio_otsu);
    if distance_to_band(ratio_otsu, params.target_ink_ratio)
        < distance_to_band(ratio, params.target_ink_ratio)
    {
        choice.branch = ThresholdBranch::Otsu;
        choice.threshold = t_otsu;
    }
    choice
}

/// Reflect-101 index (`-1 -> 1`, `n -> n - 2`).
#[inline]
fn reflect101(i: isize, n: usize) -> usize {
    if n == 1 {
        return 0;
    }
    let n = n as isize;
    let mut i = i;
    if i < 0 {
        i = -i;
    }
    if i >= n {
        i = 2 * n - 2 - i;
    }
    i as usize
}

/// 3x3 binomial blur (`[1, 2, 1] / 4` in each direction), rounded.
pub fn blur3(img: &GrayImage) -> GrayImage {
    let (w, h) = (img.width, img.height);
    if w == 0 || h == 0 {
        return img.clone();
    }
    let mut tmp = vec![0u16; w * h];
    for y in 0..h {
        let row = &img.data[y * w..(y + 1) * w];
        for x in 0..w {
            let l = row[reflect101(x as isize - 1, w)] as u16;
            let r = row[reflect101(x as isize + 1, w)] as u16;
            tmp[y * w + x] = l + 2 * row[x] as u16 + r;
        }
    }
    let mut out = vec![0u8; w * h];
    for y in 0..h {
        let up = reflect101(y as isize - 1, h) * w;
        let down = reflect101(y as isize + 1, h) * w;
        let mid = y * w;
        for x in 0..w {
            let s = tmp[up + x] as u32 + 2 * tmp[mid + x] as u32 + tmp[down + x] as u32;
            out[mid + x] = ((s + 8) >> 4) as u8;
        }
    }
    GrayImage {
        width: w,
        height: h,
        data: out,
    }
}

/// Morphology with the 3x3 cross; pixels outside the mask never shrink or grow it.
fn cross_filter(mask: &RasterMask, erode: bool) -> RasterMask {
    let (w, h) = (mask.width, mask.height);
    let mut out = RasterMask::new(w, h);
    let at = |x: isize, y: isize| -> Option<bool> {
        if x < 0 || y < 0 || x >= w as isize || y >= h as isize {
            None
        } else {
            Some(mask.data[y as usize * w + x as usize] != 0)
        }
    };
    for y in 0..h as isize {
        for x in 0..w as isize {
            let nbhd = [(0, 0), (-1, 0), (1, 0), (0, -1), (0, 1)]
                .iter()
                .filter_map(|&(dx, dy)| at(x + dx, y + dy));
            let v = if erode {
                nbhd.fold(true, |acc, v| acc && v)
            } else {
                nbhd.fold(false, |acc, v| acc || v)
            };
            out.data[y as usize * w + x as usize] = u8::from(v);
        }
    }
    out
}

pub fn erode(mask: &RasterMask) -> RasterMask {
    cross_filter(mask, true)
}

pub fn dilate(mask: &RasterMask) -> RasterMask {
    cross_filter(mask, false)
}

/// Morphological open followed by close.
pub fn open_close(mask: &RasterMask) -> RasterMask {
    let opened = dilate(&erode(mask));
    erode(&dilate(&opened))
}

/// Binarize an 8-bit gray scan (ink = dark).
#[cfg_attr(
    feature = "tracing",
    instrument(level = "info", skip(gray, params), fields(w = gray.width, h = gray.height))
)]
pub fn binarize(gray: &GrayImage, params: &BinarizeParams) -> Binarization {
    let blurred = blur3(gray);
    let hist = histogram(&blurred.data);
    let choice = choose_threshold(&hist, params);
    log::debug!(
        "binarize: dark={:.2} bg={:.2} t={} branch={:?} ratio={:.4} otsu_ratio={:?}",
        choice.dark,
        choice.background,
        choice.threshold,
        choice.branch,
        choice.percentile_ink_ratio,
        choice.otsu_ink_ratio
    );

    let t = choice.threshold;
    let raw = RasterMask::from_gray(&blurred, |v| v <= t);
    let smoothed = open_close(&raw);

    let min_area = params.min_component_area(gray.width, gray.height);
    let (mask, kept, removed) = remove_small_components(&smoothed, min_area);
    log::debug!(
        "binarize: min_area={} kept={} removed={} ink_ratio={:.4}",
        min_area,
        kept,
        removed,
        mask.ink_ratio()
    );

    Binarization {
        blurred,
        raw,
        mask,
        choice,
        min_component_area: min_area,
        kept_components: kept,
        removed_components: removed,
    }
}
