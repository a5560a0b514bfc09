//! Dense vector helpers shared by the store, the LSH index and the scorer.

/// Euclidean norm
#[must_use]
pub fn l2_norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

/// Rescale to unit length. Zero vectors have no direction and stay as-is.
pub fn normalize_in_place(v: &mut [f32]) {
    let norm = l2_norm(v);
    if norm == 0.0 || !norm.is_finite() {
        return;
    }
    let inv = 1.0 / norm;
    for x in v.iter_mut() {
        *x *= inv;
    }
}

#[must_use]
pub fn normalized(v: &[f32]) -> Vec<f32> {
    let mut out = v.to_vec();
    normalize_in_place(&mut out);
    out
}

/// Position of the first NaN or infinite component, if any.
#[must_use]
pub fn first_non_finite(v: &[f32]) -> Option<usize> {
    v.iter().position(|x| !x.is_finite())
}

#[must_use]
pub fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

/// Cosine similarity in `[-1, 1]`; 0 for mismatched lengths or zero vectors.
#[must_use]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let norm_a = l2_norm(a);
    let norm_b = l2_norm(b);

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    (dot(a, b) / (norm_a * norm_b)).clamp(-1.0, 1.0)
}

/// Little-endian f32 bytes, bit-exact.
#[must_use]
pub fn encode_vector(vector: &[f32]) -> Vec<u8> {
    let mut out = Vec::with_capacity(vector.len() * 4);
    for v in vector {
        out.extend_from_slice(&v.to_le_bytes());
    }
    out
}

#[must_use]
pub fn decode_vector(bytes: &[u8], expected_dimension: usize) -> Option<Vec<f32>> {
    if bytes.len() != expected_dimension.saturating_mul(4) {
        return None;
    }
    bytes
        .chunks_exact(4)
        .map(|chunk| chunk.try_into().ok().map(f32::from_le_bytes))
        .collect()
}
