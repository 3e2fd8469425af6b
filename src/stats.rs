//! Closed-form statistics shared by the descriptive module and the detectors

/// Arithmetic mean, `None` for an empty slice
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let sum: f64 = values.iter().sum();
    Some(sum / values.len() as f64)
}

/// Sample standard deviation (n - 1 denominator)
///
/// Returns 0 for fewer than two values.
pub fn sample_std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let mu = mean(values).unwrap_or(0.0);
    let sum_sq: f64 = values.iter().map(|v| (v - mu).powi(2)).sum();
    (sum_sq / (values.len() - 1) as f64).sqrt()
}

/// Median; the mean of the two middle values for even lengths
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let sorted = sorted_copy(values);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

/// Percentile `p` in [0, 100] with linear interpolation between ranks
pub fn percentile(values: &[f64], p: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let sorted = sorted_copy(values);
    let rank = (p.clamp(0.0, 100.0) / 100.0) * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let weight = rank - lower as f64;
    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * weight)
}

/// Percentile rank of each value (0-100], ties share their average rank
pub fn percentile_ranks(values: &[f64]) -> Vec<f64> {
    let n = values.len();
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));

    let mut ranks = vec![0.0; n];
    let mut i = 0;
    while i < n {
        let mut j = i;
        while j + 1 < n && values[order[j + 1]] == values[order[i]] {
            j += 1;
        }
        // 1-based positions i+1..=j+1 averaged
        let avg_rank = (i + j + 2) as f64 / 2.0;
        for &idx in &order[i..=j] {
            ranks[idx] = avg_rank / n as f64 * 100.0;
        }
        i = j + 1;
    }
    ranks
}

/// Signed deviation of `value` from `mean` in units of `std_dev`
///
/// `None` when the reference has no spread.
pub fn z_score(value: f64, mean: f64, std_dev: f64) -> Option<f64> {
    if std_dev > 0.0 && std_dev.is_finite() {
        Some((value - mean) / std_dev)
    } else {
        None
    }
}

/// Pearson correlation of two equal-length samples
///
/// `None` for fewer than two pairs, mismatched lengths, or a constant sample.
pub fn pearson(xs: &[f64], ys: &[f64]) -> Option<f64> {
    if xs.len() != ys.len() || xs.len() < 2 {
        return None;
    }
    let mx = mean(xs)?;
    let my = mean(ys)?;
    let (mut cov, mut vx, mut vy) = (0.0, 0.0, 0.0);
    for (x, y) in xs.iter().zip(ys) {
        let (dx, dy) = (x - mx, y - my);
        cov += dx * dy;
        vx += dx * dx;
        vy += dy * dy;
    }
    if vx <= 0.0 || vy <= 0.0 {
        return None;
    }
    Some((cov / (vx * vy).sqrt()).clamp(-1.0, 1.0))
}

fn sorted_copy(values: &[f64]) -> Vec<f64> {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    sorted
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean_and_std() {
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert_eq!(mean(&values), Some(5.0));
        // Sample variance = 32 / 7
        assert!((sample_std_dev(&values) - (32.0f64 / 7.0).sqrt()).abs() < 1e-12);
        assert_eq!(sample_std_dev(&[42.0]), 0.0);
        assert_eq!(mean(&[]), None);
    }

    #[test]
    fn test_median() {
        assert_eq!(median(&[3.0, 1.0, 2.0]), Some(2.0));
        assert_eq!(median(&[4.0, 1.0, 3.0, 2.0]), Some(2.5));
        assert_eq!(median(&[]), None);
    }

    #[test]
    fn test_percentile_interpolates() {
        let values = [10.0, 20.0, 30.0, 40.0, 50.0];
        assert_eq!(percentile(&values, 0.0), Some(10.0));
        assert_eq!(percentile(&values, 100.0), Some(50.0));
        assert_eq!(percentile(&values, 50.0), Some(30.0));
        assert!((percentile(&values, 95.0).unwrap() - 48.0).abs() < 1e-9);
    }

    #[test]
    fn test_percentile_ranks_average_ties() {
        let ranks = percentile_ranks(&[10.0, 20.0, 20.0, 40.0]);
        assert_eq!(ranks, vec![25.0, 62.5, 62.5, 100.0]);
    }

    #[test]
    fn test_pearson() {
        let xs = [1.0, 2.0, 3.0, 4.0];
        assert!((pearson(&xs, &[2.0, 4.0, 6.0, 8.0]).unwrap() - 1.0).abs() < 1e-12);
        assert!((pearson(&xs, &[8.0, 6.0, 4.0, 2.0]).unwrap() + 1.0).abs() < 1e-12);
        assert_eq!(pearson(&xs, &[5.0; 4]), None);
        assert_eq!(pearson(&[1.0], &[1.0]), None);
    }

    #[test]
    fn test_z_score_zero_spread() {
        assert_eq!(z_score(5.0, 5.0, 0.0), None);
        assert_eq!(z_score(7.0, 5.0, 2.0), Some(1.0));
    }
}
