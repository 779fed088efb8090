//! Temporal stabilization of noisy per-frame classification results.
//!
//! A classifier emits one [`Verdict`] per frame. Reporting those verdicts
//! directly flickers whenever two candidates sit near the decision boundary.
//! [`TemporalStabilizer`] keeps a bounded window of recent verdicts and only
//! switches its output once a label holds a consensus quorum.
//!
//! The stabilizer is generic over the label type through the [`Ballot`]
//! trait, so the same machinery stabilizes identity and expression streams.
//!
//! # Usage
//!
//! ```
//! use vigil_stabilizer::{Ballot, StabilizerConfig, TemporalStabilizer, Verdict};
//!
//! struct Hit(u64);
//!
//! impl Ballot for Hit {
//!     type Label = u64;
//!     fn label(&self) -> u64 { self.0 }
//!     fn distance(&self) -> f32 { 0.1 }
//!     fn confidence(&self) -> f32 { 0.8 }
//! }
//!
//! let mut s = TemporalStabilizer::with_config(StabilizerConfig::default());
//! let mut out = s.feed(&Verdict::Match(Hit(7)));
//! for _ in 0..4 {
//!     out = s.feed(&Verdict::Match(Hit(7)));
//! }
//! assert_eq!(out.label, Some(7));
//! ```

mod stabilizer;
mod verdict;

pub use stabilizer::{LabelStatus, StabilizerConfig, Stabilized, TemporalStabilizer};
pub use verdict::{Ballot, Verdict};
