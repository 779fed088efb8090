//! Per-frame classification against enrolled references.
//!
//! [`MatchResolver`] turns one query vector into a [`Verdict`] about which
//! enrolled subject it belongs to. [`PrototypeClassifier`] does the same for
//! expression categories. Both implement [`Classifier`] and share one set of
//! acceptance rules:
//!
//! 1. Aggregate distances per label: minimum and mean.
//! 2. Rank by minimum distance, then mean distance, then named first.
//!    The number of reference vectors never counts.
//! 3. Reject if the best minimum exceeds the acceptance threshold.
//! 4. Reject if another label within the threshold lies inside the ambiguity
//!    margin, unless exactly one of the contenders is named.
//! 5. Confidence is `1 - min / threshold`, clamped to `[0, 1]`.
//!
//! Ambiguity is not an error: it yields `Verdict::NoMatch`.
//!
//! [`Verdict`]: vigil_stabilizer::Verdict

mod candidate;
mod error;
mod expression;
mod resolver;

pub use candidate::{Classifier, MatchCandidate, Ranked};
pub use error::MatchError;
pub use expression::{Expression, ExpressionConfig, PrototypeClassifier, Prototype};
pub use resolver::{MatchResolver, ResolverConfig};
