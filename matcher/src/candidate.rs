use std::fmt;

use serde::Serialize;
use tracing::debug;
use vigil_stabilizer::{Ballot, Verdict};

use crate::error::MatchError;

/// An accepted match.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MatchCandidate<L> {
    pub label: L,
    /// Smallest distance between the query and the label's reference vectors.
    pub min_distance: f32,
    /// Mean distance over the same vectors.
    pub mean_distance: f32,
    /// `1 - min_distance / accept_threshold`, clamped to `[0, 1]`.
    pub confidence: f32,
}

impl<L: Eq + Clone + fmt::Debug> Ballot for MatchCandidate<L> {
    type Label = L;

    fn label(&self) -> L {
        self.label.clone()
    }

    fn distance(&self) -> f32 {
        self.min_distance
    }

    fn confidence(&self) -> f32 {
        self.confidence
    }
}

/// One label's distance aggregate, before the acceptance decision.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Ranked<L> {
    pub label: L,
    /// Labels with a display name win ties against anonymous ones.
    pub named: bool,
    pub min_distance: f32,
    pub mean_distance: f32,
    pub samples: usize,
}

/// Capability shared by every per-frame classifier.
pub trait Classifier: Send + Sync {
    type Label: Eq + Clone + fmt::Debug;

    /// Classifies one query vector.
    ///
    /// Returns `Err` only for a malformed query. Everything else, including
    /// an empty or unreachable reference set, is `Ok(Verdict::NoMatch)`.
    fn classify(
        &self,
        query: &[f32],
    ) -> Result<Verdict<MatchCandidate<Self::Label>>, MatchError>;
}

/// Acceptance parameters applied to a ranked list.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Rules {
    pub accept: f32,
    pub margin: f32,
    pub spread_limit: Option<f32>,
}

pub(crate) fn validate_query(query: &[f32], dim: usize) -> Result<(), MatchError> {
    if query.len() != dim {
        return Err(MatchError::InvalidInput(format!(
            "expected {dim} components, got {}",
            query.len()
        )));
    }
    if !query.iter().all(|x| x.is_finite()) {
        return Err(MatchError::InvalidInput(
            "query has non-finite components".into(),
        ));
    }
    if query.iter().all(|&x| x == 0.0) {
        return Err(MatchError::InvalidInput("query has zero norm".into()));
    }
    Ok(())
}

/// Sorts by minimum distance, then mean distance, then named first, then label.
///
/// Vector count never enters the order.
pub(crate) fn sort_ranked<L: Ord>(ranked: &mut [Ranked<L>]) {
    ranked.sort_by(|a, b| {
        a.min_distance
            .total_cmp(&b.min_distance)
            .then(a.mean_distance.total_cmp(&b.mean_distance))
            .then(b.named.cmp(&a.named))
            .then(a.label.cmp(&b.label))
    });
}

/// Picks the accepted label from a sorted list, if any.
///
/// Contenders are the labels within `accept` whose minimum distance is less
/// than `margin` above the best one. A single contender is accepted. Among
/// several, a lone named contender is accepted; anything else is ambiguous.
pub(crate) fn decide<L: Clone + fmt::Debug>(
    ranked: &[Ranked<L>],
    rules: &Rules,
) -> Option<MatchCandidate<L>> {
    let Some(best) = ranked.first() else {
        debug!("matcher: no candidates");
        return None;
    };
    if best.min_distance > rules.accept {
        debug!(
            label = ?best.label,
            distance = best.min_distance,
            threshold = rules.accept,
            "matcher: best candidate above threshold"
        );
        return None;
    }

    let contenders: Vec<&Ranked<L>> = ranked
        .iter()
        .take_while(|r| r.min_distance - best.min_distance < rules.margin)
        .filter(|r| r.min_distance <= rules.accept)
        .collect();

    let chosen = if contenders.len() == 1 {
        best
    } else {
        let mut named = contenders.iter().filter(|r| r.named);
        match (named.next(), named.next()) {
            (Some(only), None) => *only,
            _ => {
                debug!(
                    contenders = contenders.len(),
                    best = best.min_distance,
                    margin = rules.margin,
                    "matcher: ambiguous"
                );
                return None;
            }
        }
    };

    if let Some(limit) = rules.spread_limit {
        if chosen.mean_distance - chosen.min_distance > limit
            && chosen.mean_distance > rules.accept
        {
            debug!(
                label = ?chosen.label,
                min = chosen.min_distance,
                mean = chosen.mean_distance,
                "matcher: reference vectors too inconsistent"
            );
            return None;
        }
    }

    let confidence = (1.0 - chosen.min_distance / rules.accept).clamp(0.0, 1.0);
    debug!(
        label = ?chosen.label,
        distance = chosen.min_distance,
        confidence,
        "matcher: match"
    );
    Some(MatchCandidate {
        label: chosen.label.clone(),
        min_distance: chosen.min_distance,
        mean_distance: chosen.mean_distance,
        confidence,
    })
}
