//! Optional PNG artifacts for diagnosing a segmentation run.
//!
//! Write failures are logged and otherwise ignored.

use std::path::{Path, PathBuf};

use handfont_core::{GrayImage, RasterMask};
use image::{Rgb, RgbImage};

use crate::components::Component;
use crate::fiducials::FiducialQuad;

pub(crate) struct DebugSink {
    dir: Option<PathBuf>,
}

impl DebugSink {
    pub fn new(dir: Option<&Path>) -> Self {
        let dir = dir.and_then(|d| match std::fs::create_dir_all(d) {
            Ok(()) => Some(d.to_path_buf()),
            Err(e) => {
                log::warn!("debug dir {} unusable: {e}", d.display());
                None
            }
        });
        Self { dir }
    }

    pub fn enabled(&self) -> bool {
        self.dir.is_some()
    }

    fn path(&self, name: &str) -> Option<PathBuf> {
        self.dir.as_ref().map(|d| d.join(name))
    }

    pub fn gray(&self, name: &str, img: &GrayImage) {
        let Some(path) = self.path(name) else {
            return;
        };
        match image::GrayImage::from_raw(img.width as u32, img.height as u32, img.data.clone()) {
            Some(buf) => {
                if let Err(e) = buf.save(&path) {
                    log::warn!("failed to write {}: {e}", path.display());
                }
            }
            None => log::warn!("skipping {}: buffer size mismatch", path.display()),
        }
    }

    pub fn mask(&self, name: &str, mask: &RasterMask) {
        if self.enabled() {
            self.gray(name, &mask.to_gray(255, 0));
        }
    }

    pub fn rgb(&self, name: &str, img: &RgbImage) {
        let Some(path) = self.path(name) else {
            return;
        };
        if let Err(e) = img.save(&path) {
            log::warn!("failed to write {}: {e}", path.display());
        }
    }

    /// Mask in white, candidate boxes in yellow, assigned corners as colored dots.
    pub fn fiducials(
        &self,
        name: &str,
        mask: &RasterMask,
        candidates: &[Component],
        quad: Option<&FiducialQuad>,
    ) {
        if !self.enabled() {
            return;
        }
        let (w, h) = (mask.width as u32, mask.height as u32);
        let mut img = RgbImage::from_fn(w, h, |x, y| {
            let v = if mask.get(x as usize, y as usize) { 255 } else { 0 };
            Rgb([v, v, v])
        });

        let yellow = Rgb([255, 220, 0]);
        for c in candidates {
            for x in c.x_min..=c.x_max {
                img.put_pixel(x as u32, c.y_min as u32, yellow);
                img.put_pixel(x as u32, c.y_max as u32, yellow);
            }
            for y in c.y_min..=c.y_max {
                img.put_pixel(c.x_min as u32, y as u32, yellow);
                img.put_pixel(c.x_max as u32, y as u32, yellow);
            }
        }

        if let Some(quad) = quad {
            let colors = [
                Rgb([0, 200, 0]),
                Rgb([0, 80, 255]),
                Rgb([255, 0, 0]),
                Rgb([0, 220, 220]),
            ];
            for (p, color) in quad.iter().zip(colors) {
                let cx = p.x.round() as i64;
                let cy = p.y.round() as i64;
                for y in cy - 8..=cy + 8 {
                    for x in cx - 8..=cx + 8 {
                        if x >= 0 && y >= 0 && (x as u32) < w && (y as u32) < h {
                            img.put_pixel(x as u32, y as u32, color);
                        }
                    }
                }
            }
        }
        self.rgb(name, &img);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_sink_writes_nothing() {
        let sink = DebugSink::new(None);
        assert!(!sink.enabled());
        sink.gray("x.png", &GrayImage::filled(2, 2, 0));
    }

    #[test]
    fn unusable_dir_is_not_fatal() {
        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join("not-a-dir");
        std::fs::write(&file, b"x").unwrap();
        let sink = DebugSink::new(Some(&file.join("sub")));
        assert!(!sink.enabled());
    }

    #[test]
    fn writes_png_artifacts() {
        let tmp = tempfile::tempdir().unwrap();
        let sink = DebugSink::new(Some(tmp.path()));
        let mut m = RasterMask::new(16, 16);
        m.set(3, 3, true);
        sink.mask("mask.png", &m);
        sink.fiducials("fid.png", &m, &[], None);
        assert!(tmp.path().join("mask.png").is_file());
        assert!(tmp.path().join("fid.png").is_file());
    }
}
