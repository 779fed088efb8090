use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Dissimilarity metric used for both enrollment checks and matching.
///
/// Both metrics live in `[0, 2]`, return 0 for a vector compared with itself,
/// and return the maximum 2.0 for zero vectors or mismatched dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    /// `1 - cos(a, b)`.
    #[default]
    Cosine,
    /// Euclidean distance between the L2-normalised vectors.
    Euclidean,
}

impl Metric {
    /// Largest value this metric can return.
    pub const MAX_DISTANCE: f32 = 2.0;

    pub fn distance(self, a: &[f32], b: &[f32]) -> f32 {
        match self {
            Metric::Cosine => cosine_distance(a, b),
            Metric::Euclidean => normalized_euclidean(a, b),
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Metric::Cosine => write!(f, "cosine"),
            Metric::Euclidean => write!(f, "euclidean"),
        }
    }
}

impl FromStr for Metric {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "cosine" => Ok(Metric::Cosine),
            "euclidean" | "l2" => Ok(Metric::Euclidean),
            other => Err(format!("unknown metric {other:?}")),
        }
    }
}

/// Dot product and squared norms with f64 accumulation.
fn dot_and_norms(a: &[f32], b: &[f32]) -> (f64, f64, f64) {
    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (&x, &y) in a.iter().zip(b) {
        let (x, y) = (x as f64, y as f64);
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    (dot, norm_a, norm_b)
}

/// Cosine similarity clamped to `[-1, 1]`, or `None` for degenerate input.
fn cosine_similarity(a: &[f32], b: &[f32]) -> Option<f64> {
    if a.len() != b.len() || a.is_empty() {
        return None;
    }
    let (dot, norm_a, norm_b) = dot_and_norms(a, b);
    if norm_a == 0.0 || norm_b == 0.0 {
        return None;
    }
    Some((dot / (norm_a.sqrt() * norm_b.sqrt())).clamp(-1.0, 1.0))
}

/// Cosine distance between two vectors, in `[0, 2]`.
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    match cosine_similarity(a, b) {
        Some(sim) => (1.0 - sim) as f32,
        None => Metric::MAX_DISTANCE,
    }
}

/// Euclidean distance between L2-normalised vectors, in `[0, 2]`.
///
/// Equals `sqrt(2 * cosine_distance)`, which keeps the ranking identical to
/// cosine while spreading small distances further apart.
pub fn normalized_euclidean(a: &[f32], b: &[f32]) -> f32 {
    match cosine_similarity(a, b) {
        Some(sim) => (2.0 * (1.0 - sim)).max(0.0).sqrt() as f32,
        None => Metric::MAX_DISTANCE,
    }
}

/// L2-normalises `v` in place. Zero vectors are left untouched.
pub fn l2_normalize(v: &mut [f32]) {
    let norm: f64 = v.iter().map(|&x| (x as f64) * (x as f64)).sum::<f64>().sqrt();
    if norm > 0.0 {
        let s = (1.0 / norm) as f32;
        for x in v.iter_mut() {
            *x *= s;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cosine_identical() {
        let d = cosine_distance(&[1.0, 2.0, 3.0], &[1.0, 2.0, 3.0]);
        assert!(d.abs() < 1e-6, "identical: got {d}");
    }

    #[test]
    fn cosine_ignores_magnitude() {
        let d = cosine_distance(&[1.0, 0.0], &[5.0, 0.0]);
        assert!(d.abs() < 1e-6, "scaled: got {d}");
    }

    #[test]
    fn cosine_orthogonal_and_opposite() {
        let d = cosine_distance(&[1.0, 0.0, 0.0], &[0.0, 1.0, 0.0]);
        assert!((d - 1.0).abs() < 1e-6);
        let d = cosine_distance(&[1.0, 0.0, 0.0], &[-1.0, 0.0, 0.0]);
        assert!((d - 2.0).abs() < 1e-6);
    }

    #[test]
    fn degenerate_inputs_are_maximally_distant() {
        assert_eq!(cosine_distance(&[1.0, 0.0], &[1.0, 0.0, 0.0]), 2.0);
        assert_eq!(cosine_distance(&[0.0, 0.0], &[1.0, 0.0]), 2.0);
        assert_eq!(normalized_euclidean(&[0.0, 0.0], &[1.0, 0.0]), 2.0);
        assert_eq!(cosine_distance(&[], &[]), 2.0);
    }

    #[test]
    fn euclidean_matches_geometry() {
        let d = normalized_euclidean(&[1.0, 0.0], &[0.0, 3.0]);
        assert!((d - 2.0f32.sqrt()).abs() < 1e-6, "orthogonal: got {d}");
        let d = normalized_euclidean(&[1.0, 0.0], &[-2.0, 0.0]);
        assert!((d - 2.0).abs() < 1e-6, "opposite: got {d}");
        let d = normalized_euclidean(&[0.3, 0.4], &[0.3, 0.4]);
        assert!(d.abs() < 1e-3, "identical: got {d}");
    }

    #[test]
    fn metric_parses_and_displays() {
        assert_eq!("cosine".parse::<Metric>().unwrap(), Metric::Cosine);
        assert_eq!("L2".parse::<Metric>().unwrap(), Metric::Euclidean);
        assert!("manhattan".parse::<Metric>().is_err());
        assert_eq!(Metric::Euclidean.to_string(), "euclidean");
    }

    #[test]
    fn l2_normalize_unit_length() {
        let mut v = vec![3.0, 4.0];
        l2_normalize(&mut v);
        assert!((v[0] - 0.6).abs() < 1e-6);
        assert!((v[1] - 0.8).abs() < 1e-6);

        let mut z = vec![0.0, 0.0];
        l2_normalize(&mut z);
        assert_eq!(z, vec![0.0, 0.0]);
    }
}
