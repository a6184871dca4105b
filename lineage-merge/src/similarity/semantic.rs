//! Sentence-aligned semantic similarity
//!
//! Two texts are split into sentences and every sentence pair is scored by
//! cosine similarity. The score of the pair of texts is the best mean along a
//! full-length diagonal of that matrix: sentences must correspond in order,
//! but the longer text may carry extra leading or trailing sentences.

use unicode_segmentation::UnicodeSegmentation;

/// Trim, split into non-empty sentences, lowercase each
///
/// Splitting happens before lowercasing: sentence boundaries are not detected
/// in front of a lowercase letter.
pub fn split_sentences(text: &str) -> Vec<String> {
    text.trim()
        .unicode_sentences()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Cosine similarity; zero vectors score 0.0
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (x, y) in a.iter().zip(b.iter()) {
        let (x, y) = (*x as f64, *y as f64);
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

/// Pairwise cosine similarity matrix (`a.len()` rows × `b.len()` columns)
pub fn similarity_matrix(a: &[Vec<f32>], b: &[Vec<f32>]) -> Vec<Vec<f64>> {
    a.iter()
        .map(|row| b.iter().map(|col| cosine_similarity(row, col)).collect())
        .collect()
}

/// Best mean along a full-length diagonal
///
/// With `r` rows and `c` columns (`r <= c`, transposed otherwise) every offset
/// in `0..=c-r` is tried. Scores never drop below 0.0; an empty matrix is 0.0.
pub fn best_diagonal_mean(matrix: &[Vec<f64>]) -> f64 {
    let rows = matrix.len();
    let cols = matrix.first().map_or(0, Vec::len);
    if rows == 0 || cols == 0 {
        return 0.0;
    }

    let at = |i: usize, j: usize| -> f64 {
        if rows <= cols {
            matrix[i][j]
        } else {
            matrix[j][i]
        }
    };
    let (short, long) = if rows <= cols { (rows, cols) } else { (cols, rows) };

    let mut best = 0.0f64;
    for offset in 0..=(long - short) {
        let trace: f64 = (0..short).map(|i| at(i, i + offset)).sum();
        best = best.max(trace / short as f64);
    }
    best
}
