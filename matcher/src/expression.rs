use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use vigil_featstore::{FeatureVector, Metric, l2_normalize};
use vigil_stabilizer::Verdict;

use crate::candidate::{
    Classifier, MatchCandidate, Ranked, Rules, decide, sort_ranked, validate_query,
};
use crate::error::MatchError;
use crate::resolver::validate_thresholds;

/// Facial expression category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Expression {
    Happy,
    Sad,
    Angry,
    Surprise,
    Neutral,
}

impl Expression {
    pub const ALL: [Expression; 5] = [
        Expression::Happy,
        Expression::Sad,
        Expression::Angry,
        Expression::Surprise,
        Expression::Neutral,
    ];
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Happy => write!(f, "happy"),
            Self::Sad => write!(f, "sad"),
            Self::Angry => write!(f, "angry"),
            Self::Surprise => write!(f, "surprise"),
            Self::Neutral => write!(f, "neutral"),
        }
    }
}

impl FromStr for Expression {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "happy" => Ok(Self::Happy),
            "sad" => Ok(Self::Sad),
            "angry" => Ok(Self::Angry),
            "surprise" | "surprised" => Ok(Self::Surprise),
            "neutral" => Ok(Self::Neutral),
            other => Err(format!("unknown expression {other:?}")),
        }
    }
}

/// A labelled reference vector for one expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prototype {
    pub expression: Expression,
    pub vector: Vec<f32>,
}

/// Configuration for [`PrototypeClassifier`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExpressionConfig {
    /// Largest distance to a prototype still accepted (default: 0.5).
    pub accept_threshold: f32,
    /// Required gap between the two closest expressions (default: 0.05).
    pub ambiguity_margin: f32,
    pub prototypes: Vec<Prototype>,
}

impl Default for ExpressionConfig {
    fn default() -> Self {
        Self {
            accept_threshold: 0.5,
            ambiguity_margin: 0.05,
            prototypes: Vec::new(),
        }
    }
}

/// Nearest-prototype expression classifier.
///
/// Every expression may have several prototypes. A query is aggregated per
/// expression (minimum and mean distance) and accepted with the same
/// threshold and ambiguity rules as [`crate::MatchResolver`].
pub struct PrototypeClassifier {
    dim: usize,
    metric: Metric,
    rules: Rules,
    prototypes: Vec<(Expression, FeatureVector)>,
}

impl fmt::Debug for PrototypeClassifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrototypeClassifier")
            .field("dim", &self.dim)
            .field("metric", &self.metric)
            .field("prototypes", &self.prototypes.len())
            .finish()
    }
}

impl PrototypeClassifier {
    /// Builds a classifier. Prototypes are L2-normalised; all must share one
    /// non-zero dimensionality.
    pub fn new(cfg: ExpressionConfig, metric: Metric) -> Result<Self, MatchError> {
        validate_thresholds(cfg.accept_threshold, cfg.ambiguity_margin)?;
        let Some(first) = cfg.prototypes.first() else {
            return Err(MatchError::InvalidConfig("no expression prototypes".into()));
        };
        let dim = first.vector.len();
        if dim == 0 {
            return Err(MatchError::InvalidConfig("empty prototype vector".into()));
        }

        let mut prototypes = Vec::with_capacity(cfg.prototypes.len());
        for p in cfg.prototypes {
            if p.vector.len() != dim {
                return Err(MatchError::InvalidConfig(format!(
                    "prototype for {} has {} components, expected {dim}",
                    p.expression,
                    p.vector.len()
                )));
            }
            if !p.vector.iter().all(|x| x.is_finite()) || p.vector.iter().all(|&x| x == 0.0) {
                return Err(MatchError::InvalidConfig(format!(
                    "prototype for {} is not a usable vector",
                    p.expression
                )));
            }
            let mut v = p.vector;
            l2_normalize(&mut v);
            prototypes.push((p.expression, FeatureVector::from(v)));
        }

        Ok(Self {
            dim,
            metric,
            rules: Rules {
                accept: cfg.accept_threshold,
                margin: cfg.ambiguity_margin,
                spread_limit: None,
            },
            prototypes,
        })
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Per-expression aggregates for `query`, best first.
    pub fn rank(&self, query: &[f32]) -> Result<Vec<Ranked<Expression>>, MatchError> {
        validate_query(query, self.dim)?;

        let mut ranked = Vec::new();
        for expression in Expression::ALL {
            let mut min = f32::INFINITY;
            let mut sum = 0.0f64;
            let mut samples = 0usize;
            for (_, v) in self.prototypes.iter().filter(|(e, _)| *e == expression) {
                let d = self.metric.distance(query, v);
                min = min.min(d);
                sum += d as f64;
                samples += 1;
            }
            if samples > 0 {
                ranked.push(Ranked {
                    label: expression,
                    named: false,
                    min_distance: min,
                    mean_distance: (sum / samples as f64) as f32,
                    samples,
                });
            }
        }
        sort_ranked(&mut ranked);
        Ok(ranked)
    }
}

impl Classifier for PrototypeClassifier {
    type Label = Expression;

    fn classify(&self, query: &[f32]) -> Result<Verdict<MatchCandidate<Expression>>, MatchError> {
        let ranked = self.rank(query)?;
        Ok(decide(&ranked, &self.rules).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> PrototypeClassifier {
        PrototypeClassifier::new(
            ExpressionConfig {
                accept_threshold: 0.5,
                ambiguity_margin: 0.05,
                prototypes: vec![
                    Prototype {
                        expression: Expression::Happy,
                        vector: vec![1.0, 0.0, 0.0],
                    },
                    Prototype {
                        expression: Expression::Happy,
                        vector: vec![0.9, 0.1, 0.0],
                    },
                    Prototype {
                        expression: Expression::Sad,
                        vector: vec![0.0, 1.0, 0.0],
                    },
                    Prototype {
                        expression: Expression::Neutral,
                        vector: vec![0.0, 0.0, 2.0],
                    },
                ],
            },
            Metric::Cosine,
        )
        .unwrap()
    }

    #[test]
    fn classifies_nearest_prototype() {
        let c = classifier();
        let v = c.classify(&[0.95, 0.05, 0.0]).unwrap();
        assert_eq!(v.candidate().unwrap().label, Expression::Happy);

        let v = c.classify(&[0.0, 0.0, 1.0]).unwrap();
        let m = v.candidate().unwrap();
        assert_eq!(m.label, Expression::Neutral);
        assert!(m.confidence > 0.99);
    }

    #[test]
    fn equidistant_expressions_are_ambiguous() {
        let c = classifier();
        assert_eq!(c.classify(&[0.0, 1.0, 1.0]).unwrap(), Verdict::NoMatch);
    }

    #[test]
    fn far_query_is_no_match() {
        let c = classifier();
        assert_eq!(c.classify(&[-1.0, -1.0, -1.0]).unwrap(), Verdict::NoMatch);
    }

    #[test]
    fn rank_covers_configured_expressions() {
        let c = classifier();
        let ranked = c.rank(&[1.0, 0.0, 0.0]).unwrap();
        assert_eq!(ranked.len(), 3);
        assert_eq!(ranked[0].label, Expression::Happy);
        assert_eq!(ranked[0].samples, 2);
    }

    #[test]
    fn wrong_dimension_is_invalid_input() {
        let c = classifier();
        assert!(c.classify(&[1.0, 0.0]).unwrap_err().is_invalid_input());
    }

    #[test]
    fn bad_prototypes_are_rejected() {
        let err = PrototypeClassifier::new(ExpressionConfig::default(), Metric::Cosine).unwrap_err();
        assert!(matches!(err, MatchError::InvalidConfig(_)));

        let cfg = ExpressionConfig {
            prototypes: vec![
                Prototype {
                    expression: Expression::Happy,
                    vector: vec![1.0, 0.0],
                },
                Prototype {
                    expression: Expression::Sad,
                    vector: vec![1.0],
                },
            ],
            ..Default::default()
        };
        assert!(PrototypeClassifier::new(cfg, Metric::Cosine).is_err());
    }

    #[test]
    fn expression_parses_and_displays() {
        for e in Expression::ALL {
            assert_eq!(e.to_string().parse::<Expression>().unwrap(), e);
        }
        assert_eq!("Surprised".parse::<Expression>().unwrap(), Expression::Surprise);
        assert!("bored".parse::<Expression>().is_err());
        assert_eq!(serde_json::to_string(&Expression::Angry).unwrap(), "\"angry\"");
    }
}
