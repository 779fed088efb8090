use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::warn;
use vigil_featstore::{FeatureStore, Snapshot, SubjectId};
use vigil_stabilizer::Verdict;

use crate::candidate::{
    Classifier, MatchCandidate, Ranked, Rules, decide, sort_ranked, validate_query,
};
use crate::error::MatchError;

/// Tunables for [`MatchResolver`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Largest minimum distance still accepted as a match (default: 0.4).
    pub accept_threshold: f32,
    /// Required gap between the best and the runner-up subject (default: 0.05).
    pub ambiguity_margin: f32,
    /// Per-vector distances above this are ignored during aggregation.
    pub prefilter: Option<f32>,
    /// Reject a subject whose mean exceeds its minimum by more than this
    /// while the mean is also above `accept_threshold`.
    pub spread_limit: Option<f32>,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            accept_threshold: 0.4,
            ambiguity_margin: 0.05,
            prefilter: None,
            spread_limit: None,
        }
    }
}

impl ResolverConfig {
    pub fn validate(&self) -> Result<(), MatchError> {
        validate_thresholds(self.accept_threshold, self.ambiguity_margin)?;
        if let Some(p) = self.prefilter {
            if !p.is_finite() || p <= 0.0 {
                return Err(MatchError::InvalidConfig(format!(
                    "prefilter must be positive, got {p}"
                )));
            }
        }
        if let Some(s) = self.spread_limit {
            if !s.is_finite() || s < 0.0 {
                return Err(MatchError::InvalidConfig(format!(
                    "spread_limit must be non-negative, got {s}"
                )));
            }
        }
        Ok(())
    }

    pub(crate) fn rules(&self) -> Rules {
        Rules {
            accept: self.accept_threshold,
            margin: self.ambiguity_margin,
            spread_limit: self.spread_limit,
        }
    }
}

pub(crate) fn validate_thresholds(accept: f32, margin: f32) -> Result<(), MatchError> {
    if !accept.is_finite() || accept <= 0.0 {
        return Err(MatchError::InvalidConfig(format!(
            "accept_threshold must be positive, got {accept}"
        )));
    }
    if !margin.is_finite() || margin < 0.0 {
        return Err(MatchError::InvalidConfig(format!(
            "ambiguity_margin must be non-negative, got {margin}"
        )));
    }
    Ok(())
}

/// Resolves a query vector to an enrolled subject.
///
/// Stateless apart from its configuration: every call reads the current
/// store snapshot, so enrollment changes take effect on the next frame. The
/// distance metric always comes from the store.
pub struct MatchResolver {
    store: Arc<dyn FeatureStore>,
    cfg: ResolverConfig,
}

impl MatchResolver {
    pub fn new(store: Arc<dyn FeatureStore>, cfg: ResolverConfig) -> Result<Self, MatchError> {
        cfg.validate()?;
        Ok(Self { store, cfg })
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.cfg
    }

    pub fn store(&self) -> &Arc<dyn FeatureStore> {
        &self.store
    }

    /// Ranked per-subject aggregates for `query`, best first.
    pub fn rank(&self, query: &[f32]) -> Result<Vec<Ranked<SubjectId>>, MatchError> {
        validate_query(query, self.store.dim())?;
        let snap = self.store.snapshot()?;
        Ok(self.rank_in(&snap, query))
    }

    /// Resolves `query` against the current store contents.
    ///
    /// A store read failure degrades to `NoMatch` for this call.
    pub fn resolve(
        &self,
        query: &[f32],
    ) -> Result<Verdict<MatchCandidate<SubjectId>>, MatchError> {
        validate_query(query, self.store.dim())?;
        let snap = match self.store.snapshot() {
            Ok(snap) => snap,
            Err(e) => {
                warn!(error = %e, "matcher: store unavailable, treating frame as no match");
                return Ok(Verdict::NoMatch);
            }
        };
        let ranked = self.rank_in(&snap, query);
        Ok(decide(&ranked, &self.cfg.rules()).into())
    }

    fn rank_in(&self, snap: &Snapshot, query: &[f32]) -> Vec<Ranked<SubjectId>> {
        let mut ranked: Vec<Ranked<SubjectId>> = snap
            .aggregate(query, self.cfg.prefilter)
            .into_iter()
            .map(|d| Ranked {
                label: d.subject,
                named: d.named,
                min_distance: d.min_distance,
                mean_distance: d.mean_distance,
                samples: d.samples,
            })
            .collect();
        sort_ranked(&mut ranked);
        ranked
    }
}

impl Classifier for MatchResolver {
    type Label = SubjectId;

    fn classify(&self, query: &[f32]) -> Result<Verdict<MatchCandidate<SubjectId>>, MatchError> {
        self.resolve(query)
    }
}
