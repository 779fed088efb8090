//! KV key layout.
//!
//! ```text
//! meta                              → msgpack StoreMeta
//! subj:{subject_20d}                → msgpack Subject
//! vec:{subject_20d}:{reference_20d} → msgpack ReferenceVector
//! ```
//!
//! Identifiers are zero-padded to 20 digits so that KV scans return records
//! in numeric order, and reference keys are nested under their subject so a
//! subject's vectors can be listed or removed with one prefix scan.

use crate::types::{ReferenceId, SubjectId};

pub const META_KEY: &str = "meta";
pub const SUBJECT_PREFIX: &str = "subj:";
pub const REFERENCE_PREFIX: &str = "vec:";

pub fn subject_key(id: SubjectId) -> String {
    format!("subj:{:020}", id.0)
}

pub fn reference_key(subject: SubjectId, id: ReferenceId) -> String {
    format!("vec:{:020}:{:020}", subject.0, id.0)
}

/// Prefix covering every reference vector of one subject.
pub fn subject_references_prefix(subject: SubjectId) -> String {
    format!("vec:{:020}:", subject.0)
}

/// Extracts the owning subject from a reference key.
pub fn parse_reference_key(key: &str) -> Option<(SubjectId, ReferenceId)> {
    let rest = key.strip_prefix(REFERENCE_PREFIX)?;
    let (subject, reference) = rest.split_once(':')?;
    Some((
        SubjectId(subject.parse().ok()?),
        ReferenceId(reference.parse().ok()?),
    ))
}
