//! Activation helpers used by the grid decoder.

/// Logistic function.
#[inline]
pub(crate) fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

/// Applies a numerically stable softmax to `values` in place.
///
/// `+inf` logits share all of the mass equally; a row of `-inf` logits
/// becomes uniform.
pub(crate) fn softmax_in_place(values: &mut [f32]) {
    let max = values.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    if max == f32::INFINITY {
        let count = values.iter().filter(|&&v| v == f32::INFINITY).count() as f32;
        for v in values.iter_mut() {
            *v = if *v == f32::INFINITY { 1.0 / count } else { 0.0 };
        }
        return;
    }
    if max == f32::NEG_INFINITY {
        let uniform = 1.0 / values.len() as f32;
        values.fill(uniform);
        return;
    }
    let mut sum = 0.0f32;
    for v in values.iter_mut() {
        *v = (*v - max).exp();
        sum += *v;
    }
    for v in values.iter_mut() {
        *v /= sum;
    }
}

/// Returns `(index, value)` of the largest element; the first index wins ties.
pub(crate) fn argmax(values: &[f32]) -> Option<(usize, f32)> {
    let mut best: Option<(usize, f32)> = None;
    for (idx, &v) in values.iter().enumerate() {
        match best {
            Some((_, b)) if v <= b => {}
            _ => best = Some((idx, v)),
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::{argmax, sigmoid, softmax_in_place};

    #[test]
    fn sigmoid_is_centered_at_half() {
        assert!((sigmoid(0.0) - 0.5).abs() < 1e-7);
        assert!(sigmoid(20.0) > 0.999);
        assert!(sigmoid(-20.0) < 1e-3);
    }

    #[test]
    fn softmax_sums_to_one() {
        let mut v = [1.0f32, 2.0, 3.0];
        softmax_in_place(&mut v);
        let sum: f32 = v.iter().sum();
        assert!((sum - 1.0).abs() < 1e-6);
        assert!(v[2] > v[1] && v[1] > v[0]);
    }

    #[test]
    fn softmax_handles_large_logits() {
        let mut v = [1000.0f32, 1000.0];
        softmax_in_place(&mut v);
        assert!((v[0] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn softmax_infinite_logits_stay_normalized() {
        let mut v = [f32::INFINITY, 3.0, f32::INFINITY, f32::NEG_INFINITY];
        softmax_in_place(&mut v);
        assert_eq!(v, [0.5, 0.0, 0.5, 0.0]);

        let mut v = [f32::NEG_INFINITY; 4];
        softmax_in_place(&mut v);
        assert_eq!(v, [0.25; 4]);
    }

    #[test]
    fn argmax_prefers_first_on_ties() {
        assert_eq!(argmax(&[0.2, 0.7, 0.7]), Some((1, 0.7)));
        assert_eq!(argmax(&[]), None);
    }
}
