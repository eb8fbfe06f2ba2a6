//! Binary ink masks (ink = 1, background = 0).

use crate::{GrayImage, PixelRect};

/// Row-major binary pixel grid derived from a scan.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RasterMask {
    pub width: usize,
    pub height: usize,
    pub data: Vec<u8>,
}

impl RasterMask {
    /// Empty (all background) mask.
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            data: vec![0; width * height],
        }
    }

    /// Build a mask marking every pixel for which `is_ink` returns true.
    pub fn from_gray(img: &GrayImage, mut is_ink: impl FnMut(u8) -> bool) -> Self {
        Self {
            width: img.width,
            height: img.height,
            data: img.data.iter().map(|&v| u8::from(is_ink(v))).collect(),
        }
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> bool {
        self.data[y * self.width + x] != 0
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, ink: bool) {
        self.data[y * self.width + x] = u8::from(ink);
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn ink_count(&self) -> usize {
        self.data.iter().filter(|&&v| v != 0).count()
    }

    /// Fraction of ink pixels; 0 for an empty mask.
    pub fn ink_ratio(&self) -> f64 {
        let n = self.data.len();
        if n == 0 {
            return 0.0;
        }
        self.ink_count() as f64 / n as f64
    }

    /// Copy out `rect`, clipped to the mask bounds (like slicing past the end).
    pub fn crop(&self, rect: &PixelRect) -> RasterMask {
        let clipped = rect.clip(self.width, self.height);
        let w = clipped.width();
        let h = clipped.height();
        let mut out = RasterMask::new(w, h);
        for y in 0..h {
            let src = (clipped.y0 + y) * self.width + clipped.x0;
            out.data[y * w..(y + 1) * w].copy_from_slice(&self.data[src..src + w]);
        }
        out
    }

    /// Clear the half-open rectangle, clipped to the mask bounds.
    pub fn clear_rect(&mut self, rect: &PixelRect) {
        let clipped = rect.clip(self.width, self.height);
        for y in clipped.y0..clipped.y1 {
            let row = y * self.width;
            self.data[row + clipped.x0..row + clipped.x1].fill(0);
        }
    }

    /// Bounding box of all ink pixels, or `None` for a blank mask.
    pub fn ink_bounds(&self) -> Option<PixelRect> {
        let mut bounds: Option<PixelRect> = None;
        for y in 0..self.height {
            let row = &self.data[y * self.width..(y + 1) * self.width];
            let Some(first) = row.iter().position(|&v| v != 0) else {
                continue;
            };
            let last = row.iter().rposition(|&v| v != 0).unwrap_or(first);
            bounds = Some(match bounds {
                None => PixelRect::new(y, y + 1, first, last + 1),
                Some(b) => PixelRect::new(b.y0, y + 1, b.x0.min(first), b.x1.max(last + 1)),
            });
        }
        bounds
    }

    /// Render as an 8-bit image: ink -> `ink`, background -> `background`.
    pub fn to_gray(&self, ink: u8, background: u8) -> GrayImage {
        GrayImage {
            width: self.width,
            height: self.height,
            data: self
                .data
                .iter()
                .map(|&v| if v != 0 { ink } else { background })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mask_with(width: usize, height: usize, ink: &[(usize, usize)]) -> RasterMask {
        let mut m = RasterMask::new(width, height);
        for &(x, y) in ink {
            m.set(x, y, true);
        }
        m
    }

    #[test]
    fn crop_past_the_edge_is_clipped() {
        let m = mask_with(5, 4, &[(4, 3), (3, 3)]);
        let c = m.crop(&PixelRect::new(2, 10, 3, 10));
        assert_eq!((c.width, c.height), (2, 2));
        assert_eq!(c.ink_count(), 2);
    }

    #[test]
    fn ink_bounds_cover_all_ink() {
        let m = mask_with(10, 10, &[(2, 3), (7, 5), (4, 8)]);
        let b = m.ink_bounds().expect("ink");
        assert_eq!(b, PixelRect::new(3, 9, 2, 8));
        assert!(RasterMask::new(3, 3).ink_bounds().is_none());
    }

    #[test]
    fn clear_rect_removes_ink() {
        let mut m = mask_with(6, 6, &[(0, 0), (1, 1), (5, 5)]);
        m.clear_rect(&PixelRect::new(0, 2, 0, 2));
        assert_eq!(m.ink_count(), 1);
        assert!((m.ink_ratio() - 1.0 / 36.0).abs() < 1e-12);
    }
}
