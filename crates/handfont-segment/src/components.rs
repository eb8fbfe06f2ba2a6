//! 8-connected component labeling on binary masks.

use handfont_core::RasterMask;

/// One connected blob of ink pixels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Component {
    pub area: usize,
    /// Inclusive bounding box.
    pub x_min: usize,
    pub y_min: usize,
    pub x_max: usize,
    pub y_max: usize,
}

impl Component {
    #[inline]
    pub fn width(&self) -> usize {
        self.x_max - self.x_min + 1
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.y_max - self.y_min + 1
    }

    /// Center of the bounding box in pixel-edge coordinates.
    pub fn box_center(&self) -> (f32, f32) {
        (
            self.x_min as f32 + self.width() as f32 / 2.0,
            self.y_min as f32 + self.height() as f32 / 2.0,
        )
    }
}

/// Component label per pixel (`0` = background, `k` = `components[k - 1]`).
pub struct Labeling {
    pub labels: Vec<u32>,
    pub components: Vec<Component>,
}

/// Label 8-connected ink regions, scanning in row-major order.
pub fn label_components(mask: &RasterMask) -> Labeling {
    let (w, h) = (mask.width, mask.height);
    let mut labels = vec![0u32; w * h];
    let mut components = Vec::new();
    let mut stack: Vec<usize> = Vec::new();

    for start in 0..w * h {
        if mask.data[start] == 0 || labels[start] != 0 {
            continue;
        }
        let label = components.len() as u32 + 1;
        let mut comp = Component {
            area: 0,
            x_min: usize::MAX,
            y_min: usize::MAX,
            x_max: 0,
            y_max: 0,
        };

        labels[start] = label;
        stack.push(start);
        while let Some(idx) = stack.pop() {
            let x = idx % w;
            let y = idx / w;
            comp.area += 1;
            comp.x_min = comp.x_min.min(x);
            comp.x_max = comp.x_max.max(x);
            comp.y_min = comp.y_min.min(y);
            comp.y_max = comp.y_max.max(y);

            let y_lo = y.saturating_sub(1);
            let y_hi = (y + 1).min(h - 1);
            let x_lo = x.saturating_sub(1);
            let x_hi = (x + 1).min(w - 1);
            for ny in y_lo..=y_hi {
                for nx in x_lo..=x_hi {
                    let n = ny * w + nx;
                    if mask.data[n] != 0 && labels[n] == 0 {
                        labels[n] = label;
                        stack.push(n);
                    }
                }
            }
        }
        components.push(comp);
    }

    Labeling { labels, components }
}

/// Flag the components that do not sit inside another component's hole.
///
/// Background is 4-connected (the dual of 8-connected ink). A component is
/// outer when it touches the image border or the background region that
/// reaches the border.
pub fn outer_components(mask: &RasterMask, labeling: &Labeling) -> Vec<bool> {
    let (w, h) = (mask.width, mask.height);
    let mut outer = vec![false; labeling.components.len()];
    if w == 0 || h == 0 {
        return outer;
    }

    let mut outside = vec![false; w * h];
    let mut stack: Vec<usize> = Vec::new();
    let border = (0..w)
        .flat_map(|x| [x, (h - 1) * w + x])
        .chain((0..h).flat_map(|y| [y * w, y * w + w - 1]));
    for idx in border {
        if mask.data[idx] == 0 && !outside[idx] {
            outside[idx] = true;
            stack.push(idx);
        }
    }
    while let Some(idx) = stack.pop() {
        let (x, y) = (idx % w, idx / w);
        let neighbours = [
            (x > 0).then(|| idx - 1),
            (x + 1 < w).then(|| idx + 1),
            (y > 0).then(|| idx - w),
            (y + 1 < h).then(|| idx + w),
        ];
        for n in neighbours.into_iter().flatten() {
            if mask.data[n] == 0 && !outside[n] {
                outside[n] = true;
                stack.push(n);
            }
        }
    }

    for (idx, &label) in labeling.labels.iter().enumerate() {
        if label == 0 || outer[label as usize - 1] {
            continue;
        }
        let (x, y) = (idx % w, idx / w);
        let on_border = x == 0 || y == 0 || x + 1 == w || y + 1 == h;
        if on_border
            || outside[idx - 1]
            || outside[idx + 1]
            || outside[idx - w]
            || outside[idx + w]
        {
            outer[label as usize - 1] = true;
        }
    }
    outer
}

/// Drop every component smaller than `min_area` pixels.
pub fn remove_small_components(mask: &RasterMask, min_area: usize) -> (RasterMask, usize, usize) {
    let Labeling { labels, components } = label_components(mask);
    let keep: Vec<bool> = components.iter().map(|c| c.area >= min_area).collect();

    let mut out = RasterMask::new(mask.width, mask.height);
    for (dst, &label) in out.data.iter_mut().zip(&labels) {
        if label != 0 && keep[label as usize - 1] {
            *dst = 1;
        }
    }
    let kept = keep.iter().filter(|&&k| k).count();
    (out, kept, components.len() - kept)
}
