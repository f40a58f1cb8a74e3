//! Cosine similarity scoring for recall ranking.

/// Cosine similarity of two vectors, in `[-1, 1]`.
///
/// Mismatched lengths, empty vectors and zero norms all score exactly `0`,
/// so a missing or degenerate embedding never breaks ranking.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0f64;
    let mut norm_a = 0f64;
    let mut norm_b = 0f64;
    for (x, y) in a.iter().zip(b.iter()) {
        let (x, y) = (f64::from(*x), f64::from(*y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    let score = dot / (norm_a.sqrt() * norm_b.sqrt());
    if score.is_nan() {
        return 0.0;
    }
    score.clamp(-1.0, 1.0) as f32
}

/// Score against an optional embedding; absent embeddings score `0`.
pub fn score_optional(query: &[f32], candidate: Option<&[f32]>) -> f32 {
    candidate.map_or(0.0, |embedding| cosine_similarity(query, embedding))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::embeddings::HashEmbedder;

    #[test]
    fn test_identical_vectors() {
        let v = vec![0.3f32, 0.1, 0.7, 0.2];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-6);

        let e = HashEmbedder::new().embed_text("data analysis in seattle");
        assert!((cosine_similarity(&e, &e) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_symmetry() {
        let embedder = HashEmbedder::new();
        let a = embedder.embed_text("python developer");
        let b = embedder.embed_text("marketing manager in london");
        assert_eq!(cosine_similarity(&a, &b), cosine_similarity(&b, &a));
    }

    #[test]
    fn test_orthogonal_and_opposite() {
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]), 0.0);
        assert!((cosine_similarity(&[1.0, 0.0], &[-1.0, 0.0]) + 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_mismatched_lengths_score_zero() {
        assert_eq!(cosine_similarity(&[1.0, 2.0], &[1.0, 2.0, 3.0]), 0.0);
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
    }

    #[test]
    fn test_zero_norm_scores_zero() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 2.0]), 0.0);
        assert_eq!(cosine_similarity(&[1.0, 2.0], &[0.0, 0.0]), 0.0);
    }

    #[test]
    fn test_score_optional() {
        assert_eq!(score_optional(&[1.0, 0.0], None), 0.0);
        assert!((score_optional(&[1.0, 0.0], Some(&[2.0, 0.0])) - 1.0).abs() < 1e-6);
    }
}
