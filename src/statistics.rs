use num_traits::Float;

/// Frequentist weighted mean and standard deviation of `values`.
///
/// The standard deviation is the biased (population) estimate,
/// `sqrt(sum(w * (x - mean)^2) / sum(w))`.
///
/// Both slices must have the same length and the weights must not sum to
/// zero; callers are expected to guard those cases (see
/// [`Peak::rms_above_threshold`](crate::Peak::rms_above_threshold)).
pub fn weighted_mean_and_std<F>(values: &[F], weights: &[F]) -> (F, F)
where
    F: Float,
{
    debug_assert_eq!(values.len(), weights.len());

    let total = weights.iter().fold(F::zero(), |acc, &w| acc + w);
    let mean = values
        .iter()
        .zip(weights)
        .fold(F::zero(), |acc, (&x, &w)| acc + x * w)
        / total;
    let variance = values.iter().zip(weights).fold(F::zero(), |acc, (&x, &w)| {
        let d = x - mean;
        acc + w * d * d
    }) / total;

    (mean, variance.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: f64, b: f64) {
        assert!((a - b).abs() <= 1e-12 * (1.0 + b.abs()), "{a} != {b}");
    }

    #[test]
    fn uniform_weights() {
        let (mean, std) = weighted_mean_and_std(&[1.0, 2.0, 3.0], &[1.0, 1.0, 1.0]);
        assert_close(mean, 2.0);
        assert_close(std, (2.0f64 / 3.0).sqrt());
    }

    #[test]
    fn skewed_weights() {
        let (mean, std) = weighted_mean_and_std(&[0.0, 10.0], &[1.0, 3.0]);
        assert_close(mean, 7.5);
        // var = (1 * 7.5^2 + 3 * 2.5^2) / 4
        assert_close(std, 18.75f64.sqrt());
    }

    #[test]
    fn single_value_has_zero_spread() {
        let (mean, std) = weighted_mean_and_std(&[5.0], &[2.0]);
        assert_close(mean, 5.0);
        assert_close(std, 0.0);
    }

    #[test]
    fn generic_over_float_width() {
        let (mean, std) = weighted_mean_and_std(&[1.0f32, 3.0], &[1.0, 1.0]);
        assert!((mean - 2.0).abs() < 1e-6);
        assert!((std - 1.0).abs() < 1e-6);
    }
}
