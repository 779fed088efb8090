use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Stable identifier of an enrolled subject. Never reused within a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubjectId(pub u64);

impl fmt::Display for SubjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a single reference vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReferenceId(pub u64);

impl fmt::Display for ReferenceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Immutable fixed-length feature vector.
///
/// Cloning is cheap: the components live behind an `Arc`.
#[derive(Clone, PartialEq)]
pub struct FeatureVector(Arc<[f32]>);

impl FeatureVector {
    pub fn new(values: impl Into<Vec<f32>>) -> Self {
        Self(Arc::from(values.into()))
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    /// Number of components.
    pub fn dim(&self) -> usize {
        self.0.len()
    }

    /// True when every component is a finite number.
    pub fn is_finite(&self) -> bool {
        self.0.iter().all(|x| x.is_finite())
    }
}

impl Deref for FeatureVector {
    type Target = [f32];

    fn deref(&self) -> &[f32] {
        &self.0
    }
}

impl From<Vec<f32>> for FeatureVector {
    fn from(v: Vec<f32>) -> Self {
        Self(Arc::from(v))
    }
}

impl From<&[f32]> for FeatureVector {
    fn from(v: &[f32]) -> Self {
        Self(Arc::from(v))
    }
}

impl fmt::Debug for FeatureVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FeatureVector")
            .field("dim", &self.0.len())
            .finish()
    }
}

impl Serialize for FeatureVector {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.as_ref().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for FeatureVector {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Vec::<f32>::deserialize(deserializer).map(FeatureVector::from)
    }
}

/// An enrolled identity record. A subject without a name is anonymous.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subject {
    pub id: SubjectId,
    #[serde(default)]
    pub name: Option<String>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Subject {
    /// True when the subject carries a display name.
    pub fn is_named(&self) -> bool {
        self.name.is_some()
    }

    /// Display name, or a placeholder for anonymous subjects.
    pub fn display_name(&self) -> String {
        match &self.name {
            Some(n) => n.clone(),
            None => format!("anonymous#{}", self.id),
        }
    }
}

/// A feature vector enrolled against exactly one subject.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceVector {
    pub id: ReferenceId,
    pub subject: SubjectId,
    pub vector: FeatureVector,
    #[serde(default)]
    pub quality: Option<f32>,
    pub created_at: DateTime<Utc>,
}

/// A subject together with the number of reference vectors it owns.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubjectSummary {
    pub subject: Subject,
    pub references: usize,
}

/// Outcome of [`crate::FeatureStore::merge_subjects`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MergeReport {
    pub from: SubjectId,
    pub to: SubjectId,
    /// Reference vectors reassigned from `from` to `to`.
    pub moved: usize,
    /// The target adopted the source's display name.
    pub renamed: bool,
    pub source_deleted: bool,
}

/// Normalises a user-supplied display name: blank means anonymous.
pub(crate) fn normalize_name(name: Option<&str>) -> Option<String> {
    name.map(str::trim)
        .filter(|n| !n.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn feature_vector_is_cheap_to_clone() {
        let v = FeatureVector::new(vec![1.0, 2.0, 3.0]);
        let w = v.clone();
        assert_eq!(v, w);
        assert_eq!(w.dim(), 3);
        assert_eq!(&w[..], &[1.0, 2.0, 3.0]);
    }

    #[test]
    fn feature_vector_serializes_as_plain_array() {
        let v = FeatureVector::new(vec![0.5, -0.25]);
        let json = serde_json::to_string(&v).unwrap();
        assert_eq!(json, "[0.5,-0.25]");
        let back: FeatureVector = serde_json::from_str(&json).unwrap();
        assert_eq!(back, v);
    }

    #[test]
    fn non_finite_components_are_detected() {
        assert!(FeatureVector::new(vec![0.0, 1.0]).is_finite());
        assert!(!FeatureVector::new(vec![0.0, f32::NAN]).is_finite());
        assert!(!FeatureVector::new(vec![f32::INFINITY]).is_finite());
    }

    #[test]
    fn blank_names_become_anonymous() {
        assert_eq!(normalize_name(None), None);
        assert_eq!(normalize_name(Some("")), None);
        assert_eq!(normalize_name(Some("   ")), None);
        assert_eq!(normalize_name(Some(" Ana ")), Some("Ana".to_string()));
    }
}
