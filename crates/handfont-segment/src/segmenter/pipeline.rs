use std::path::{Path, PathBuf};

use handfont_core::{warp_perspective_interleaved, GrayImage, TemplateGeometry};
use image::{DynamicImage, RgbImage};

#[cfg(feature = "tracing")]
use tracing::instrument;

use super::{GlyphCandidate, SegmentError, SegmentationReport, SegmenterParams};
use crate::binarize::binarize;
use crate::cells::{extract_cell_ink, place_on_canvas, tight_crop};
use crate::debug::DebugSink;
use crate::fiducials::detect_fiducials;
use crate::warp::{plan_warp, warp_mask, WarpOutcome};

/// Splits scanned template pages into per-letter glyph images.
pub struct Segmenter {
    geometry: TemplateGeometry,
    params: SegmenterParams,
    debug_dir: Option<PathBuf>,
}

impl Segmenter {
    pub fn new(geometry: TemplateGeometry, params: SegmenterParams) -> Self {
        Self {
            geometry,
            params,
            debug_dir: None,
        }
    }

    /// Write diagnostic PNGs into `dir` on every run.
    pub fn with_debug_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.debug_dir = Some(dir.into());
        self
    }

    #[inline]
    pub fn geometry(&self) -> &TemplateGeometry {
        &self.geometry
    }

    #[inline]
    pub fn params(&self) -> &SegmenterParams {
        &self.params
    }

    /// Read, decode and segment a scan from disk.
    pub fn segment_file(
        &self,
        path: &Path,
        letters: &str,
    ) -> Result<SegmentationReport, SegmentError> {
        if !path.exists() {
            return Err(SegmentError::InputNotFound(path.to_path_buf()));
        }
        let bytes = std::fs::read(path).map_err(|source| SegmentError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        self.segment_bytes(&bytes, letters)
    }

    /// Decode an encoded scan (PNG, JPEG, ...) and segment it.
    pub fn segment_bytes(
        &self,
        bytes: &[u8],
        letters: &str,
    ) -> Result<SegmentationReport, SegmentError> {
        let img = image::load_from_memory(bytes)?;
        Ok(self.segment_image(&img, letters))
    }

    /// Segment an already decoded scan.
    ///
    /// Never fails: missing markers or a bad quad fall back to reading the
    /// template cells straight from the unwarped mask.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "info", skip(self, img, letters), fields(w = img.width(), h = img.height()))
    )]
    pub fn segment_image(&self, img: &DynamicImage, letters: &str) -> SegmentationReport {
        let debug = DebugSink::new(self.debug_dir.as_deref());
        let geom = &self.geometry;
        let (tw, th) = (geom.raster_width_px, geom.raster_height_px);

        let rgb = img.to_rgb8();
        let gray = gray_from_rgb(&rgb);
        debug.gray("binarize_gray.png", &gray);

        let bin = binarize(&gray, &self.params.binarize);
        debug.gray("binarize_blur.png", &bin.blurred);
        debug.mask("binarize_threshold.png", &bin.raw);
        debug.mask("binarize_clean.png", &bin.mask);

        let search = detect_fiducials(&bin.mask, &self.params.fiducials);
        debug.fiducials(
            "fiducials.png",
            &bin.mask,
            &search.candidates,
            search.quad.as_ref(),
        );

        let (warp, scan_from_template) = plan_warp(
            search.quad.as_ref(),
            geom,
            &self.params.fiducials,
            &self.params.warp,
        );
        log::info!(
            "scan {}x{}: threshold {:?} at {}, warp {:?}",
            gray.width,
            gray.height,
            bin.choice.branch,
            bin.choice.threshold,
            warp
        );

        let mut warped_page = None;
        let page_mask = match (&warp, scan_from_template) {
            (WarpOutcome::Applied, Some(h)) => {
                if self.params.build_warped_page || debug.enabled() {
                    let data = warp_perspective_interleaved(
                        rgb.as_raw(),
                        rgb.width() as usize,
                        rgb.height() as usize,
                        3,
                        &h,
                        tw,
                        th,
                    );
                    if let Some(page) = RgbImage::from_raw(tw as u32, th as u32, data) {
                        debug.rgb("warp_page.png", &page);
                        if self.params.build_warped_page {
                            warped_page = Some(page);
                        }
                    }
                }
                warp_mask(&bin.mask, &h, tw, th)
            }
            _ => bin.mask.clone(),
        };
        debug.mask("page_mask.png", &page_mask);

        let cell_params = &self.params.cells;
        let mut candidates = Vec::new();
        let mut examined = 0usize;
        let mut empty = 0usize;
        for (cell_index, (rect, letter)) in geom.cell_rects.iter().zip(letters.chars()).enumerate() {
            if letter.is_whitespace() {
                continue;
            }
            examined += 1;
            match extract_cell_ink(&page_mask, rect, cell_params) {
                Ok(ink) => {
                    let glyph = tight_crop(&ink, cell_params.crop_pad);
                    let image =
                        place_on_canvas(&glyph, cell_params.canvas_size, cell_params.canvas_margin);
                    candidates.push(GlyphCandidate {
                        cell_index,
                        letter,
                        image,
                    });
                }
                Err(skip) => {
                    log::debug!("cell {cell_index} ('{letter}') skipped: {skip:?}");
                    empty += 1;
                }
            }
        }
        log::info!(
            "{} glyph candidates from {} cells ({} empty)",
            candidates.len(),
            examined,
            empty
        );

        SegmentationReport {
            candidates,
            threshold: bin.choice,
            ink_ratio: bin.mask.ink_ratio(),
            warp,
            quad: search.quad,
            fiducial_candidates: search.candidates.len(),
            scan_size: (gray.width, gray.height),
            cells_examined: examined,
            empty_cells: empty,
            warped_page,
        }
    }
}

/// BT.601 luma with 14-bit fixed-point weights.
pub(crate) fn gray_from_rgb(rgb: &RgbImage) -> GrayImage {
    let data = rgb
        .pixels()
        .map(|p| {
            let [r, g, b] = p.0;
            ((r as u32 * 4899 + g as u32 * 9617 + b as u32 * 1868 + 8192) >> 14) as u8
        })
        .collect();
    GrayImage {
        width: rgb.width() as usize,
        height: rgb.height() as usize,
        data,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn luma_matches_bt601() {
        let mut rgb = RgbImage::new(4, 1);
        rgb.put_pixel(0, 0, Rgb([255, 255, 255]));
        rgb.put_pixel(1, 0, Rgb([255, 0, 0]));
        rgb.put_pixel(2, 0, Rgb([0, 255, 0]));
        rgb.put_pixel(3, 0, Rgb([0, 0, 255]));
        let g = gray_from_rgb(&rgb);
        assert_eq!(g.data, vec![255, 76, 150, 29]);
    }
}
