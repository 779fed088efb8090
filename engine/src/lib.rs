//! Frame-by-frame identity and expression resolution.
//!
//! ```text
//! extractor ─► Frame ─► Orchestrator
//!                        ├─ identity:   MatchResolver       ─► TemporalStabilizer ─► Stabilized<SubjectId>
//!                        └─ expression: PrototypeClassifier ─► TemporalStabilizer ─► Stabilized<Expression>
//! ```
//!
//! The [`Orchestrator`] owns no decision logic of its own. It hands each
//! vector to the stream's classifier, feeds the verdict to that stream's
//! stabilizer, and returns the stabilized label. A frame without a vector
//! casts no vote; a malformed vector is rejected without disturbing the
//! stream.
//!
//! # Usage
//!
//! ```
//! use std::sync::Arc;
//!
//! use vigil_engine::{EngineConfig, Orchestrator, StreamId};
//! use vigil_featstore::{FeatureStore, FeatureVector, KvFeatureStore, StoreConfig};
//!
//! let cfg = EngineConfig {
//!     store: StoreConfig { dim: 2, ..Default::default() },
//!     ..Default::default()
//! };
//! let store = Arc::new(KvFeatureStore::in_memory(cfg.store).unwrap());
//! let ana = store.create_subject(Some("ana")).unwrap();
//! store.add_reference_vector(ana.id, FeatureVector::from(vec![1.0, 0.0]), None).unwrap();
//!
//! let mut engine = Orchestrator::new(store, &cfg).unwrap();
//! for _ in 0..5 {
//!     engine.process_frame(StreamId::Identity, Some(&[1.0, 0.0])).unwrap();
//! }
//! assert_eq!(engine.identity().label, Some(ana.id));
//! ```

mod config;
mod error;
mod orchestrator;
mod stream;

pub use config::EngineConfig;
pub use error::EngineError;
pub use orchestrator::{Frame, FrameResult, Orchestrator, StreamLabel};
pub use stream::{Stream, StreamId};
