/// Weighted mean and (population) standard deviation.
///
/// Returns `None` for empty input or when the weights sum to zero.
pub fn weighted_mean_std(values: &[f64], weights: &[f64]) -> Option<(f64, f64)> {
    if values.is_empty() || values.len() != weights.len() {
        return None;
    }
    let total: f64 = weights.iter().sum();
    if total <= 0.0 {
        return None;
    }
    let mean = values.iter().zip(weights).map(|(v, w)| v * w).sum::<f64>() / total;
    let variance = values
        .iter()
        .zip(weights)
        .map(|(v, w)| w * (v - mean).powi(2))
        .sum::<f64>()
        / total;
    Some((mean, variance.sqrt()))
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    Some(if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    })
}

pub fn min_max(values: &[f64]) -> Option<(f64, f64)> {
    values.iter().fold(None, |acc, &v| match acc {
        None => Some((v, v)),
        Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
    })
}

/// Element-wise mean, minimum and maximum of fixed-size parameter vectors.
pub fn column_summary<const N: usize>(rows: &[[f64; N]]) -> Option<([f64; N], [f64; N], [f64; N])> {
    if rows.is_empty() {
        return None;
    }
    let mut mean = [0.0; N];
    let mut min = [f64::INFINITY; N];
    let mut max = [f64::NEG_INFINITY; N];
    for row in rows {
        for k in 0..N {
            mean[k] += row[k];
            min[k] = min[k].min(row[k]);
            max[k] = max[k].max(row[k]);
        }
    }
    for m in &mut mean {
        *m /= rows.len() as f64;
    }
    Some((mean, min, max))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-12
    }

    #[test]
    fn weighted_mean_std_matches_hand_computation() {
        let (m, s) = weighted_mean_std(&[1.0, 3.0], &[1.0, 3.0]).unwrap();
        assert!(approx_eq(m, 2.5));
        // variance = (1 * 2.25 + 3 * 0.25) / 4 = 0.75
        assert!(approx_eq(s, 0.75_f64.sqrt()));
    }

    #[test]
    fn weighted_mean_std_rejects_degenerate_input() {
        assert_eq!(weighted_mean_std(&[], &[]), None);
        assert_eq!(weighted_mean_std(&[1.0], &[0.0]), None);
        assert_eq!(weighted_mean_std(&[1.0, 2.0], &[1.0]), None);
    }

    #[test]
    fn median_handles_odd_and_even_lengths() {
        assert_eq!(median(&[3.0, 1.0, 2.0]), Some(2.0));
        assert_eq!(median(&[4.0, 1.0, 3.0, 2.0]), Some(2.5));
        assert_eq!(median(&[]), None);
    }

    #[test]
    fn column_summary_reports_mean_min_max() {
        let (mean, min, max) = column_summary(&[[1.0, 10.0], [3.0, 20.0]]).unwrap();
        assert_eq!(mean, [2.0, 15.0]);
        assert_eq!(min, [1.0, 10.0]);
        assert_eq!(max, [3.0, 20.0]);
        assert_eq!(min_max(&[2.0, -1.0, 5.0]), Some((-1.0, 5.0)));
    }
}
