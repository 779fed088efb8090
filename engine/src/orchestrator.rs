use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use vigil_featstore::{FeatureStore, SubjectId};
use vigil_matcher::{Classifier, Expression, MatchResolver, PrototypeClassifier};
use vigil_stabilizer::{StabilizerConfig, Stabilized};

use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::stream::{Stream, StreamId};

/// Feature vectors extracted from one video frame. Either may be absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Frame {
    pub identity: Option<Vec<f32>>,
    pub expression: Option<Vec<f32>>,
}

/// Stabilized output of a single stream.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "stream", rename_all = "snake_case")]
pub enum StreamLabel {
    Identity(Stabilized<SubjectId>),
    Expression(Stabilized<Expression>),
}

/// Stabilized output for a whole frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameResult {
    pub identity: Stabilized<SubjectId>,
    /// `None` when the expression stream is not configured.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expression: Option<Stabilized<Expression>>,
}

/// Sequences per-frame classification and stabilization.
///
/// Owns one identity stream and, optionally, one expression stream. Each
/// stream has its own stabilizer; calls must be serialized per orchestrator.
/// Several orchestrators may share one store.
pub struct Orchestrator {
    identity: Stream<MatchResolver>,
    expression: Option<Stream<PrototypeClassifier>>,
}

impl Orchestrator {
    /// Builds an orchestrator over `store` from a full engine config.
    pub fn new(store: Arc<dyn FeatureStore>, cfg: &EngineConfig) -> Result<Self, EngineError> {
        cfg.validate()?;
        let metric = store.metric();
        let resolver = MatchResolver::new(store, cfg.resolver)?;
        let expression = if cfg.expression_enabled() {
            let classifier = PrototypeClassifier::new(cfg.expression.clone(), metric)?;
            Some((classifier, cfg.expression_stabilizer))
        } else {
            None
        };
        Ok(Self::with_classifiers(resolver, cfg.identity, expression))
    }

    pub fn with_classifiers(
        resolver: MatchResolver,
        identity: StabilizerConfig,
        expression: Option<(PrototypeClassifier, StabilizerConfig)>,
    ) -> Self {
        info!(
            dim = resolver.store().dim(),
            metric = %resolver.store().metric(),
            expression = expression.is_some(),
            "engine: orchestrator ready"
        );
        Self {
            identity: Stream::new(StreamId::Identity, resolver, identity),
            expression: expression
                .map(|(c, cfg)| Stream::new(StreamId::Expression, c, cfg)),
        }
    }

    pub fn has_expression(&self) -> bool {
        self.expression.is_some()
    }

    pub fn resolver(&self) -> &MatchResolver {
        self.identity.classifier()
    }

    /// Processes one vector on one stream.
    ///
    /// `None` means nothing was detected: the stream's state is returned
    /// unchanged. A malformed vector fails this call only.
    pub fn process_frame(
        &mut self,
        stream: StreamId,
        vector: Option<&[f32]>,
    ) -> Result<StreamLabel, EngineError> {
        match stream {
            StreamId::Identity => Ok(StreamLabel::Identity(self.identity.process(vector)?)),
            StreamId::Expression => {
                let s = self
                    .expression
                    .as_mut()
                    .ok_or(EngineError::StreamNotConfigured(StreamId::Expression))?;
                Ok(StreamLabel::Expression(s.process(vector)?))
            }
        }
    }

    /// Processes every stream of one frame.
    ///
    /// A malformed vector is logged and treated like a missing one, so one
    /// bad frame never stops the streams.
    pub fn process(&mut self, frame: &Frame) -> FrameResult {
        let identity = process_or_keep(&mut self.identity, frame.identity.as_deref());
        let expression = self
            .expression
            .as_mut()
            .map(|s| process_or_keep(s, frame.expression.as_deref()));
        FrameResult {
            identity,
            expression,
        }
    }

    /// Current identity state.
    pub fn identity(&self) -> Stabilized<SubjectId> {
        self.identity.state()
    }

    /// Current expression state, if that stream is configured.
    pub fn expression(&self) -> Option<Stabilized<Expression>> {
        self.expression.as_ref().map(Stream::state)
    }

    /// Clears all stabilizer state, e.g. when a camera session restarts.
    pub fn reset(&mut self) {
        self.identity.reset();
        if let Some(s) = &mut self.expression {
            s.reset();
        }
        info!("engine: orchestrator reset");
    }
}

fn process_or_keep<C: Classifier>(
    stream: &mut Stream<C>,
    vector: Option<&[f32]>,
) -> Stabilized<C::Label> {
    match stream.process(vector) {
        Ok(out) => out,
        Err(e) => {
            warn!(stream = %stream.id(), error = %e, "engine: invalid vector skipped");
            stream.state()
        }
    }
}

#[cfg(test)]
mod tests {
    use vigil_featstore::{FeatureVector, KvFeatureStore, Metric, StoreConfig};
    use vigil_matcher::{ExpressionConfig, Prototype};
    use vigil_stabilizer::LabelStatus;

    use super::*;

    fn config() -> EngineConfig {
        EngineConfig {
            store: StoreConfig {
                dim: 2,
                metric: Metric::Cosine,
            },
            expression: ExpressionConfig {
                prototypes: vec![
                    Prototype {
                        expression: Expression::Happy,
                        vector: vec![1.0, 0.0],
                    },
                    Prototype {
                        expression: Expression::Neutral,
                        vector: vec![0.0, 1.0],
                    },
                ],
                ..Default::default()
            },
            ..Default::default()
        }
    }

    fn orchestrator() -> (Orchestrator, SubjectId) {
        let cfg = config();
        let store = KvFeatureStore::in_memory(cfg.store).unwrap();
        let ana = store.create_subject(Some("ana")).unwrap();
        store
            .add_reference_vector(ana.id, FeatureVector::from(vec![1.0, 0.0]), None)
            .unwrap();
        (Orchestrator::new(Arc::new(store), &cfg).unwrap(), ana.id)
    }

    #[test]
    fn frame_drives_both_streams() {
        let (mut o, ana) = orchestrator();
        let frame = Frame {
            identity: Some(vec![1.0, 0.0]),
            expression: Some(vec![0.0, 1.0]),
        };
        let mut last = None;
        for _ in 0..5 {
            last = Some(o.process(&frame));
        }
        let last = last.unwrap();
        assert_eq!(last.identity.label, Some(ana));
        assert_eq!(last.identity.status, LabelStatus::Stable);
        assert_eq!(last.expression.unwrap().label, Some(Expression::Neutral));
    }

    #[test]
    fn streams_are_independent() {
        let (mut o, _) = orchestrator();
        for _ in 0..3 {
            o.process_frame(StreamId::Expression, Some(&[1.0, 0.0])).unwrap();
        }
        assert_eq!(o.identity().filled, 0);
        assert_eq!(o.expression().unwrap().filled, 3);
    }

    #[test]
    fn invalid_vector_is_skipped_in_whole_frame() {
        let (mut o, _) = orchestrator();
        let result = o.process(&Frame {
            identity: Some(vec![1.0, 0.0, 0.0]),
            expression: None,
        });
        assert_eq!(result.identity.filled, 0);

        let err = o
            .process_frame(StreamId::Identity, Some(&[1.0]))
            .unwrap_err();
        assert!(err.is_invalid_input());
    }

    #[test]
    fn unconfigured_expression_stream_is_an_error() {
        let cfg = EngineConfig {
            store: StoreConfig {
                dim: 2,
                metric: Metric::Cosine,
            },
            ..Default::default()
        };
        let store = KvFeatureStore::in_memory(cfg.store).unwrap();
        let mut o = Orchestrator::new(Arc::new(store), &cfg).unwrap();
        assert!(!o.has_expression());
        assert!(o.expression().is_none());
        assert!(matches!(
            o.process_frame(StreamId::Expression, Some(&[1.0, 0.0])),
            Err(EngineError::StreamNotConfigured(StreamId::Expression))
        ));
        assert!(o.process(&Frame::default()).expression.is_none());
    }

    #[test]
    fn reset_clears_every_stream() {
        let (mut o, _) = orchestrator();
        let frame = Frame {
            identity: Some(vec![1.0, 0.0]),
            expression: Some(vec![1.0, 0.0]),
        };
        for _ in 0..6 {
            o.process(&frame);
        }
        o.reset();
        assert_eq!(o.identity().stable, None);
        assert_eq!(o.expression().unwrap().filled, 0);
    }

    #[test]
    fn frame_deserializes_with_nulls() {
        let frame: Frame = serde_json::from_str(r#"{"identity": null, "expression": [0.5, 0.5]}"#).unwrap();
        assert!(frame.identity.is_none());
        assert_eq!(frame.expression, Some(vec![0.5, 0.5]));
        let frame: Frame = serde_json::from_str("{}").unwrap();
        assert_eq!(frame, Frame::default());
    }
}
