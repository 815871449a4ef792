/// Magnitude of the cosine similarity of `a` and `b`, in `[0, 1]`.
///
/// Computed as `|dot| / (|a| · |b|)`, so anti-correlated vectors score the same
/// as correlated ones. Sums are accumulated in `f64` so very small or very large
/// components neither underflow nor overflow. Returns `0.0` for mismatched
/// lengths, zero (or empty) vectors and non-finite input.
#[inline]
pub fn topical_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let (dot, norm_a_sq, norm_b_sq) = a
        .iter()
        .zip(b)
        .map(|(&x, &y)| (f64::from(x), f64::from(y)))
        .fold((0.0f64, 0.0f64, 0.0f64), |(dot, na, nb), (x, y)| {
            (dot + x * y, na + x * x, nb + y * y)
        });

    if norm_a_sq == 0.0 || norm_b_sq == 0.0 {
        return 0.0;
    }

    let similarity = dot.abs() / (norm_a_sq.sqrt() * norm_b_sq.sqrt());
    if similarity.is_finite() {
        similarity.min(1.0) as f32
    } else {
        0.0
    }
}
