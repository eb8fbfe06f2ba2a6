//! Histogram thresholds: Otsu and interpolated percentiles.

/// 256-bin intensity histogram.
pub(crate) fn histogram(samples: &[u8]) -> [u32; 256] {
    let mut hist = [0u32; 256];
    for &v in samples {
        hist[v as usize] += 1;
    }
    hist
}

/// Otsu threshold over a histogram; class "dark" is `v <= t`.
pub(crate) fn otsu_threshold(hist: &[u32; 256]) -> u8 {
    let total: u64 = hist.iter().map(|&h| h as u64).sum();
    if total == 0 {
        return 127;
    }

    let min_v = hist.iter().position(|&h| h > 0).unwrap_or(0);
    let max_v = hist.iter().rposition(|&h| h > 0).unwrap_or(255);
    if min_v == max_v {
        return min_v as u8;
    }
    let nonzero_bins = hist.iter().filter(|&&h| h > 0).count();
    if nonzero_bins <= 2 {
        return ((min_v + max_v) / 2) as u8;
    }

    let total = total as f64;
    let sum_total: f64 = hist
        .iter()
        .enumerate()
        .map(|(i, &h)| i as f64 * h as f64)
        .sum();

    let mut sum_b = 0f64;
    let mut w_b = 0f64;
    let mut best_var = -1f64;
    let mut best_t = 127u8;

    for (t, &h) in hist.iter().enumerate() {
        w_b += h as f64;
        if w_b < 1.0 {
            continue;
        }
        let w_f = total - w_b;
        if w_f < 1.0 {
            break;
        }

        sum_b += t as f64 * h as f64;
        let m_b = sum_b / w_b;
        let m_f = (sum_total - sum_b) / w_f;

        let var_between = w_b * w_f * (m_b - m_f) * (m_b - m_f);
        if var_between > best_var {
            best_var = var_between;
            best_t = t as u8;
        }
    }

    best_t
}

/// `p`-th percentile (0..=100) with linear interpolation between order
/// statistics, computed from a histogram.
pub(crate) fn percentile(hist: &[u32; 256], p: f64) -> f64 {
    let n: u64 = hist.iter().map(|&h| h as u64).sum();
    if n == 0 {
        return 0.0;
    }
    let rank = (p.clamp(0.0, 100.0) / 100.0) * (n - 1) as f64;
    let lo = rank.floor() as u64;
    let hi = rank.ceil() as u64;
    let v_lo = order_statistic(hist, lo) as f64;
    let v_hi = order_statistic(hist, hi) as f64;
    v_lo + (rank - lo as f64) * (v_hi - v_lo)
}

/// Value of the `k`-th smallest sample (0-based).
fn order_statistic(hist: &[u32; 256], k: u64) -> u8 {
    let mut seen = 0u64;
    for (v, &h) in hist.iter().enumerate() {
        seen += h as u64;
        if seen > k {
            return v as u8;
        }
    }
    255
}
