use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use vigil_matcher::{Classifier, MatchError};
use vigil_stabilizer::{StabilizerConfig, Stabilized, TemporalStabilizer};

/// Logical signal processed by the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamId {
    Identity,
    Expression,
}

impl fmt::Display for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Identity => write!(f, "identity"),
            Self::Expression => write!(f, "expression"),
        }
    }
}

impl FromStr for StreamId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "identity" => Ok(Self::Identity),
            "expression" => Ok(Self::Expression),
            other => Err(format!("unknown stream {other:?}")),
        }
    }
}

/// One classifier paired with its own stabilizer.
///
/// Not thread-safe by design of its callers: one stream is driven by one
/// frame source at a time.
pub struct Stream<C: Classifier> {
    id: StreamId,
    classifier: C,
    stabilizer: TemporalStabilizer<C::Label>,
}

impl<C: Classifier> Stream<C> {
    pub fn new(id: StreamId, classifier: C, cfg: StabilizerConfig) -> Self {
        Self {
            id,
            classifier,
            stabilizer: TemporalStabilizer::with_config(cfg),
        }
    }

    pub fn id(&self) -> StreamId {
        self.id
    }

    pub fn classifier(&self) -> &C {
        &self.classifier
    }

    /// Current stabilized state.
    pub fn state(&self) -> Stabilized<C::Label> {
        self.stabilizer.state()
    }

    /// Classifies one vector and feeds the verdict to the stabilizer.
    ///
    /// A missing vector casts no vote. A malformed vector is rejected
    /// without touching the stabilizer.
    pub fn process(&mut self, vector: Option<&[f32]>) -> Result<Stabilized<C::Label>, MatchError> {
        let Some(vector) = vector else {
            debug!(stream = %self.id, "engine: no vector, frame skipped");
            return Ok(self.stabilizer.state());
        };

        let verdict = match self.classifier.classify(vector) {
            Ok(v) => v,
            Err(e) => {
                warn!(stream = %self.id, error = %e, "engine: frame rejected");
                return Err(e);
            }
        };
        let out = self.stabilizer.feed(&verdict);
        if out.changed {
            info!(
                stream = %self.id,
                label = ?out.stable,
                confidence = out.confidence,
                votes = out.votes,
                "engine: stable label changed"
            );
        }
        Ok(out)
    }

    /// Clears the stabilizer history and label.
    pub fn reset(&mut self) {
        self.stabilizer.reset();
    }
}
