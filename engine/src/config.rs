use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use vigil_featstore::StoreConfig;
use vigil_matcher::{ExpressionConfig, ResolverConfig};
use vigil_stabilizer::StabilizerConfig;

use crate::error::EngineError;

/// Complete engine configuration, usually loaded from YAML.
///
/// ```yaml
/// store_path: /var/lib/vigil/vigil.redb
/// store:
///   dim: 128
///   metric: cosine
/// resolver:
///   accept_threshold: 0.4
///   ambiguity_margin: 0.05
/// identity:
///   history: 8
///   quorum: 5
///   min_display: 0.5
/// expression:
///   accept_threshold: 0.5
///   prototypes:
///     - expression: happy
///       vector: [0.1, 0.9, ...]
/// ```
///
/// Every section is optional. The expression stream is enabled only when at
/// least one prototype is configured.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Durable store file. Callers pick a default when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store_path: Option<PathBuf>,
    pub store: StoreConfig,
    pub resolver: ResolverConfig,
    /// Stabilizer for the identity stream.
    pub identity: StabilizerConfig,
    pub expression: ExpressionConfig,
    /// Stabilizer for the expression stream.
    pub expression_stabilizer: StabilizerConfig,
}

impl EngineConfig {
    pub fn from_yaml(text: &str) -> Result<Self, EngineError> {
        let cfg: EngineConfig = serde_yaml::from_str(text)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, EngineError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml(&text)
    }

    pub fn to_yaml(&self) -> Result<String, EngineError> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// True when expression prototypes are configured.
    pub fn expression_enabled(&self) -> bool {
        !self.expression.prototypes.is_empty()
    }

    /// Checks values that cannot be silently corrected.
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.store.dim == 0 {
            return Err(EngineError::Config("store.dim must be positive".into()));
        }
        self.resolver.validate()?;
        if let Some(p) = self
            .expression
            .prototypes
            .iter()
            .find(|p| p.vector.len() != self.expression.prototypes[0].vector.len())
        {
            return Err(EngineError::Config(format!(
                "expression prototype for {} has {} components, others have {}",
                p.expression,
                p.vector.len(),
                self.expression.prototypes[0].vector.len()
            )));
        }
        Ok(())
    }
}
