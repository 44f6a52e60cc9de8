//! Deterministic toy embedding: binary features derived from
//! a simple polynomial hash, dimension 8 by default. Kept pluggable behind
//! `embed` so a real model-backed embedder is a drop-in replacement.

pub const DEFAULT_DIM: usize = 8;

/// `embed(text, dim) -> vector`. Each component is 1.0 if the
/// polynomial-hash bit at that position is set, else 0.0.
pub fn embed(text: &str, dim: usize) -> Vec<f32> {
    let mut hash: u64 = 0;
    for byte in text.bytes() {
        hash = hash.wrapping_mul(31).wrapping_add(byte as u64);
    }
    (0..dim)
        .map(|i| if (hash >> (i % 64)) & 1 == 1 { 1.0 } else { 0.0 })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedding_is_deterministic() {
        assert_eq!(embed("hello", DEFAULT_DIM), embed("hello", DEFAULT_DIM));
    }

    #[test]
    fn embedding_has_requested_dimension() {
        assert_eq!(embed("x", 4).len(), 4);
        assert_eq!(embed("x", 8).len(), 8);
    }
}
