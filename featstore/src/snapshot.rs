use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::StoreError;
use crate::metric::Metric;
use crate::types::{FeatureVector, ReferenceId, ReferenceVector, Subject, SubjectId, SubjectSummary};

/// A subject and every reference vector it owns.
#[derive(Debug, Clone)]
pub struct SubjectEntry {
    pub subject: Subject,
    pub references: Vec<ReferenceVector>,
}

/// Per-subject distance aggregate for one query vector.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SubjectDistances {
    pub subject: SubjectId,
    /// Whether the subject has a display name.
    pub named: bool,
    /// Smallest distance over the subject's reference vectors.
    pub min_distance: f32,
    /// Arithmetic mean over the same distances.
    pub mean_distance: f32,
    /// Number of reference vectors that contributed.
    pub samples: usize,
}

/// A reference vector of one subject lying suspiciously close to another subject.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Conflict {
    pub reference: ReferenceId,
    pub owner: SubjectId,
    /// Closest reference vector of the other subject.
    pub nearest: ReferenceId,
    pub distance: f32,
}

/// Immutable point-in-time view of the store contents.
///
/// Readers hold an `Arc<Snapshot>` and never block writers; a mutation
/// produces a new snapshot instead of editing one that is being read.
#[derive(Debug, Clone)]
pub struct Snapshot {
    dim: usize,
    metric: Metric,
    entries: BTreeMap<SubjectId, SubjectEntry>,
}

impl Snapshot {
    pub(crate) fn new(dim: usize, metric: Metric) -> Self {
        Self {
            dim,
            metric,
            entries: BTreeMap::new(),
        }
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn metric(&self) -> Metric {
        self.metric
    }

    pub fn get(&self, id: SubjectId) -> Option<&SubjectEntry> {
        self.entries.get(&id)
    }

    /// All subjects in ascending id order, active or not.
    pub fn entries(&self) -> impl Iterator<Item = &SubjectEntry> {
        self.entries.values()
    }

    pub fn subject_count(&self) -> usize {
        self.entries.len()
    }

    pub fn reference_count(&self) -> usize {
        self.entries.values().map(|e| e.references.len()).sum()
    }

    /// Subjects with their reference counts.
    pub fn summaries(&self, include_inactive: bool) -> Vec<SubjectSummary> {
        self.entries
            .values()
            .filter(|e| include_inactive || e.subject.active)
            .map(|e| SubjectSummary {
                subject: e.subject.clone(),
                references: e.references.len(),
            })
            .collect()
    }

    /// Active subjects with their vectors, anonymous subjects included.
    pub fn active_with_vectors(&self) -> Vec<(Subject, Vec<FeatureVector>)> {
        self.entries
            .values()
            .filter(|e| e.subject.active)
            .map(|e| {
                let vectors = e.references.iter().map(|r| r.vector.clone()).collect();
                (e.subject.clone(), vectors)
            })
            .collect()
    }

    /// Computes per-subject minimum and mean distance to `query`.
    ///
    /// Only active subjects owning at least one reference vector take part.
    /// With a `prefilter`, distances above it are ignored, and subjects left
    /// without any distance are omitted. Results are in ascending subject id
    /// order; ranking is the caller's business.
    pub fn aggregate(&self, query: &[f32], prefilter: Option<f32>) -> Vec<SubjectDistances> {
        let mut out = Vec::new();
        for entry in self.entries.values() {
            if !entry.subject.active || entry.references.is_empty() {
                continue;
            }

            let mut min = f32::INFINITY;
            let mut sum = 0.0f64;
            let mut samples = 0usize;
            for r in &entry.references {
                let d = self.metric.distance(query, &r.vector);
                if prefilter.is_some_and(|limit| d > limit) {
                    continue;
                }
                min = min.min(d);
                sum += d as f64;
                samples += 1;
            }
            if samples == 0 {
                continue;
            }

            out.push(SubjectDistances {
                subject: entry.subject.id,
                named: entry.subject.is_named(),
                min_distance: min,
                mean_distance: (sum / samples as f64) as f32,
                samples,
            });
        }
        out
    }

    /// Lists reference vectors of `a` closer than `threshold` to some vector
    /// of `b`, and vice versa, closest first.
    pub fn find_conflicts(
        &self,
        a: SubjectId,
        b: SubjectId,
        threshold: f32,
    ) -> Result<Vec<Conflict>, StoreError> {
        let ea = self.get(a).ok_or(StoreError::UnknownSubject(a))?;
        let eb = self.get(b).ok_or(StoreError::UnknownSubject(b))?;

        let mut conflicts = Vec::new();
        for (from, to) in [(ea, eb), (eb, ea)] {
            for r in &from.references {
                let nearest = to
                    .references
                    .iter()
                    .map(|o| (o.id, self.metric.distance(&r.vector, &o.vector)))
                    .min_by(|x, y| x.1.total_cmp(&y.1));
                if let Some((nearest, distance)) = nearest {
                    if distance < threshold {
                        conflicts.push(Conflict {
                            reference: r.id,
                            owner: from.subject.id,
                            nearest,
                            distance,
                        });
                    }
                }
            }
        }
        conflicts.sort_by(|x, y| {
            x.distance
                .total_cmp(&y.distance)
                .then(x.reference.cmp(&y.reference))
        });
        Ok(conflicts)
    }

    /// Subject owning the given reference vector.
    pub fn owner_of(&self, reference: ReferenceId) -> Option<SubjectId> {
        self.entries
            .values()
            .find(|e| e.references.iter().any(|r| r.id == reference))
            .map(|e| e.subject.id)
    }

    pub(crate) fn upsert_subject(&mut self, subject: Subject) {
        match self.entries.get_mut(&subject.id) {
            Some(entry) => entry.subject = subject,
            None => {
                self.entries.insert(
                    subject.id,
                    SubjectEntry {
                        subject,
                        references: Vec::new(),
                    },
                );
            }
        }
    }

    /// Attaches a reference vector to its subject. Returns false for orphans.
    pub(crate) fn push_reference(&mut self, reference: ReferenceVector) -> bool {
        match self.entries.get_mut(&reference.subject) {
            Some(entry) => {
                entry.references.push(reference);
                true
            }
            None => false,
        }
    }

    pub(crate) fn remove_subject(&mut self, id: SubjectId) -> Option<SubjectEntry> {
        self.entries.remove(&id)
    }

    pub(crate) fn entry_mut(&mut self, id: SubjectId) -> Option<&mut SubjectEntry> {
        self.entries.get_mut(&id)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn subject(id: u64, name: Option<&str>, active: bool) -> Subject {
        let now = Utc::now();
        Subject {
            id: SubjectId(id),
            name: name.map(str::to_string),
            active,
            created_at: now,
            updated_at: now,
        }
    }

    fn reference(id: u64, subject: u64, v: &[f32]) -> ReferenceVector {
        ReferenceVector {
            id: ReferenceId(id),
            subject: SubjectId(subject),
            vector: FeatureVector::from(v),
            quality: None,
            created_at: Utc::now(),
        }
    }

    fn sample() -> Snapshot {
        let mut s = Snapshot::new(2, Metric::Cosine);
        s.upsert_subject(subject(1, Some("ana"), true));
        s.upsert_subject(subject(2, None, true));
        s.upsert_subject(subject(3, Some("off"), false));
        s.upsert_subject(subject(4, Some("empty"), true));
        s.push_reference(reference(10, 1, &[1.0, 0.0]));
        s.push_reference(reference(11, 1, &[0.0, 1.0]));
        s.push_reference(reference(20, 2, &[0.9, 0.1]));
        s.push_reference(reference(30, 3, &[1.0, 0.0]));
        s
    }

    #[test]
    fn aggregate_reports_min_and_mean() {
        let s = sample();
        let agg = s.aggregate(&[1.0, 0.0], None);

        let ana = agg.iter().find(|d| d.subject == SubjectId(1)).unwrap();
        assert!(ana.named);
        assert!(ana.min_distance.abs() < 1e-6);
        assert!((ana.mean_distance - 0.5).abs() < 1e-6);
        assert_eq!(ana.samples, 2);
    }

    #[test]
    fn aggregate_includes_anonymous_and_skips_inactive_and_empty() {
        let s = sample();
        let ids: Vec<SubjectId> = s
            .aggregate(&[1.0, 0.0], None)
            .iter()
            .map(|d| d.subject)
            .collect();
        assert_eq!(ids, vec![SubjectId(1), SubjectId(2)]);
    }

    #[test]
    fn aggregate_prefilter_drops_far_vectors() {
        let s = sample();
        let agg = s.aggregate(&[1.0, 0.0], Some(0.5));
        let ana = agg.iter().find(|d| d.subject == SubjectId(1)).unwrap();
        assert_eq!(ana.samples, 1);
        assert!(ana.mean_distance.abs() < 1e-6);

        // Nothing is close to the opposite direction.
        assert!(s.aggregate(&[-1.0, 0.0], Some(0.5)).is_empty());
    }

    #[test]
    fn active_with_vectors_lists_anonymous_subjects() {
        let s = sample();
        let listed = s.active_with_vectors();
        let ids: Vec<SubjectId> = listed.iter().map(|(s, _)| s.id).collect();
        assert_eq!(ids, vec![SubjectId(1), SubjectId(2), SubjectId(4)]);
        assert_eq!(listed[0].1.len(), 2);
        assert!(listed[2].1.is_empty());
    }

    #[test]
    fn conflicts_are_found_in_both_directions() {
        let s = sample();
        let conflicts = s.find_conflicts(SubjectId(1), SubjectId(2), 0.1).unwrap();
        assert_eq!(conflicts.len(), 2);
        assert!(conflicts[0].distance <= conflicts[1].distance);
        assert!(conflicts.iter().any(|c| c.reference == ReferenceId(10) && c.nearest == ReferenceId(20)));
        assert!(conflicts.iter().any(|c| c.reference == ReferenceId(20) && c.nearest == ReferenceId(10)));

        assert!(matches!(
            s.find_conflicts(SubjectId(1), SubjectId(99), 0.1),
            Err(StoreError::UnknownSubject(SubjectId(99)))
        ));
    }

    #[test]
    fn orphan_references_are_rejected() {
        let mut s = sample();
        assert!(!s.push_reference(reference(99, 42, &[1.0, 0.0])));
        assert_eq!(s.owner_of(ReferenceId(20)), Some(SubjectId(2)));
        assert_eq!(s.owner_of(ReferenceId(99)), None);
    }
}
