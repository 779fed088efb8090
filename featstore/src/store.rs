use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::metric::Metric;
use crate::snapshot::{Conflict, Snapshot};
use crate::types::{
    FeatureVector, MergeReport, ReferenceId, ReferenceVector, Subject, SubjectId, SubjectSummary,
};

/// Fixed parameters of a store. Both are persisted on creation and checked
/// on every later open.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Feature vector dimensionality (default: 128).
    pub dim: usize,
    /// Distance metric shared by enrollment tooling and matching (default: cosine).
    pub metric: Metric,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            dim: 128,
            metric: Metric::Cosine,
        }
    }
}

/// Persisted collection of enrolled subjects and their reference vectors.
///
/// Implementations must be safe for concurrent use: reads may run in
/// parallel, mutations are exclusive and durable before they return.
pub trait FeatureStore: Send + Sync {
    /// Dimensionality every vector in this store must have.
    fn dim(&self) -> usize;

    /// Metric used for all distance computations against this store.
    fn metric(&self) -> Metric;

    /// Current immutable view of the store contents.
    fn snapshot(&self) -> Result<Arc<Snapshot>, StoreError>;

    /// Creates a subject. A missing or blank name makes it anonymous.
    fn create_subject(&self, name: Option<&str>) -> Result<Subject, StoreError>;

    /// Enrolls a reference vector. Fails with [`StoreError::UnknownSubject`]
    /// if the subject does not exist or is inactive.
    fn add_reference_vector(
        &self,
        subject: SubjectId,
        vector: FeatureVector,
        quality: Option<f32>,
    ) -> Result<ReferenceId, StoreError>;

    /// Removes a subject and all of its reference vectors. Returns the
    /// number of reference vectors removed.
    fn delete_subject(&self, id: SubjectId) -> Result<usize, StoreError>;

    /// Moves every reference vector of `from` to `to`, optionally deleting `from`.
    fn merge_subjects(
        &self,
        from: SubjectId,
        to: SubjectId,
        delete_source: bool,
    ) -> Result<MergeReport, StoreError>;

    /// Sets or clears the display name.
    fn rename_subject(&self, id: SubjectId, name: Option<&str>) -> Result<Subject, StoreError>;

    /// Activates or deactivates a subject. Inactive subjects are never matched.
    fn set_active(&self, id: SubjectId, active: bool) -> Result<Subject, StoreError>;

    /// Removes the given reference vectors. Unknown ids are skipped.
    /// Returns the number actually removed.
    fn delete_reference_vectors(&self, ids: &[ReferenceId]) -> Result<usize, StoreError>;

    /// Removes all reference vectors of a subject, keeping the subject.
    fn clear_reference_vectors(&self, id: SubjectId) -> Result<usize, StoreError>;

    /// Removes reference vector records whose subject no longer exists, and
    /// records that no longer decode.
    fn purge_orphans(&self) -> Result<usize, StoreError>;

    /// Active subjects (named and anonymous) with their reference vectors.
    fn list_active_subjects_with_vectors(
        &self,
    ) -> Result<Vec<(Subject, Vec<FeatureVector>)>, StoreError> {
        Ok(self.snapshot()?.active_with_vectors())
    }

    fn subject(&self, id: SubjectId) -> Result<Option<Subject>, StoreError> {
        Ok(self.snapshot()?.get(id).map(|e| e.subject.clone()))
    }

    fn list_subjects(&self, include_inactive: bool) -> Result<Vec<SubjectSummary>, StoreError> {
        Ok(self.snapshot()?.summaries(include_inactive))
    }

    fn reference_vectors(&self, id: SubjectId) -> Result<Vec<ReferenceVector>, StoreError> {
        let snap = self.snapshot()?;
        let entry = snap.get(id).ok_or(StoreError::UnknownSubject(id))?;
        Ok(entry.references.clone())
    }

    fn find_conflicts(
        &self,
        a: SubjectId,
        b: SubjectId,
        threshold: f32,
    ) -> Result<Vec<Conflict>, StoreError> {
        self.snapshot()?.find_conflicts(a, b, threshold)
    }
}
