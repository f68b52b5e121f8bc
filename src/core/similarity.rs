use crate::domain::model::Scored;
use std::cmp::Ordering;

/// Cosine similarity of two embeddings.
///
/// Zero-magnitude vectors and vectors of different dimension score 0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let mag_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let mag_b = b.iter().map(|y| y * y).sum::<f32>().sqrt();

    if mag_a == 0.0 || mag_b == 0.0 {
        return 0.0;
    }
    dot / (mag_a * mag_b)
}

/// Score every item against `query`, best first.
pub fn rank<'a, T, I, F>(items: I, query: &[f32], embedding_of: F) -> Vec<Scored<&'a T>>
where
    I: IntoIterator<Item = &'a T>,
    F: Fn(&T) -> &[f32],
    T: 'a,
{
    let mut scored: Vec<Scored<&'a T>> = items
        .into_iter()
        .map(|item| Scored {
            item,
            score: cosine_similarity(query, embedding_of(item)),
        })
        .collect();

    // 穩定排序，同分時保留原始順序
    scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
    scored
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_vectors_score_one() {
        let v = [0.3, -0.2, 0.9];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_orthogonal_and_opposite() {
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]), 0.0);
        assert!((cosine_similarity(&[1.0, 0.0], &[-2.0, 0.0]) + 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_zero_magnitude_scores_zero() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
    }

    #[test]
    fn test_dimension_mismatch_scores_zero() {
        assert_eq!(cosine_similarity(&[1.0, 0.0, 0.0], &[1.0, 0.0]), 0.0);
    }

    #[test]
    fn test_rank_orders_best_first() {
        let items = vec![
            ("far", vec![0.0_f32, 1.0]),
            ("near", vec![1.0_f32, 0.1]),
            ("mid", vec![1.0_f32, 1.0]),
        ];

        let ranked = rank(&items, &[1.0, 0.0], |item| item.1.as_slice());
        let names: Vec<&str> = ranked.iter().map(|s| s.item.0).collect();
        assert_eq!(names, vec!["near", "mid", "far"]);
        assert!(ranked[0].score > ranked[1].score);
    }
}
