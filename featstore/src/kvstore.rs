use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use vigil_kv::{Batch, KVStore, MemoryStore, RedbStore};

use crate::error::StoreError;
use crate::keys::{
    META_KEY, REFERENCE_PREFIX, SUBJECT_PREFIX, parse_reference_key, reference_key, subject_key,
    subject_references_prefix,
};
use crate::metric::Metric;
use crate::snapshot::Snapshot;
use crate::store::{FeatureStore, StoreConfig};
use crate::types::{
    FeatureVector, MergeReport, ReferenceId, ReferenceVector, Subject, SubjectId, normalize_name,
};

/// Persisted store parameters and identifier counters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
struct StoreMeta {
    dim: usize,
    metric: Metric,
    next_subject: u64,
    next_reference: u64,
}

struct State {
    meta: StoreMeta,
    snapshot: Arc<Snapshot>,
}

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, StoreError> {
    rmp_serde::to_vec_named(value).map_err(|e| StoreError::Serialization(e.to_string()))
}

fn decode<T: DeserializeOwned>(data: &[u8]) -> Result<T, StoreError> {
    rmp_serde::from_slice(data).map_err(|e| StoreError::Serialization(e.to_string()))
}

/// [`FeatureStore`] persisted in a [`KVStore`].
///
/// The full contents are mirrored in an in-memory [`Snapshot`]. Readers
/// clone the current `Arc<Snapshot>` under a shared lock; mutations take the
/// exclusive lock, commit one atomic KV batch, and only then publish a new
/// snapshot. Identifier counters are written in the same batch as the record
/// they allocate, so identifiers are never handed out twice.
pub struct KvFeatureStore {
    kv: Box<dyn KVStore>,
    state: RwLock<State>,
}

impl KvFeatureStore {
    /// Opens a store on top of `kv`, initialising it on first use.
    ///
    /// Fails with [`StoreError::MetaMismatch`] if the persisted dimension or
    /// metric differs from `cfg`.
    pub fn open(kv: Box<dyn KVStore>, cfg: StoreConfig) -> Result<Self, StoreError> {
        if cfg.dim == 0 {
            return Err(StoreError::InvalidInput("dim must be positive".into()));
        }

        let meta = match kv.get(META_KEY)? {
            Some(data) => {
                let meta: StoreMeta = decode(&data)?;
                if meta.dim != cfg.dim {
                    return Err(StoreError::MetaMismatch(format!(
                        "store dim is {}, configured {}",
                        meta.dim, cfg.dim
                    )));
                }
                if meta.metric != cfg.metric {
                    return Err(StoreError::MetaMismatch(format!(
                        "store metric is {}, configured {}",
                        meta.metric, cfg.metric
                    )));
                }
                meta
            }
            None => {
                let meta = StoreMeta {
                    dim: cfg.dim,
                    metric: cfg.metric,
                    next_subject: 1,
                    next_reference: 1,
                };
                kv.put(META_KEY, &encode(&meta)?)?;
                meta
            }
        };

        let snapshot = load_snapshot(kv.as_ref(), &meta)?;
        info!(
            dim = meta.dim,
            metric = %meta.metric,
            subjects = snapshot.subject_count(),
            references = snapshot.reference_count(),
            "featstore: opened"
        );

        Ok(Self {
            kv,
            state: RwLock::new(State {
                meta,
                snapshot: Arc::new(snapshot),
            }),
        })
    }

    /// Opens an ephemeral in-memory store.
    pub fn in_memory(cfg: StoreConfig) -> Result<Self, StoreError> {
        Self::open(Box::new(MemoryStore::new()), cfg)
    }

    /// Opens (or creates) a durable store file.
    pub fn open_path<P: AsRef<Path>>(path: P, cfg: StoreConfig) -> Result<Self, StoreError> {
        let kv = RedbStore::open(path)?;
        Self::open(Box::new(kv), cfg)
    }

    /// Rebuilds the in-memory snapshot from the backend.
    pub fn reload(&self) -> Result<(), StoreError> {
        let mut state = self.state.write();
        let meta: StoreMeta = match self.kv.get(META_KEY)? {
            Some(data) => decode(&data)?,
            None => state.meta,
        };
        let snapshot = load_snapshot(self.kv.as_ref(), &meta)?;
        state.meta = meta;
        state.snapshot = Arc::new(snapshot);
        Ok(())
    }

    fn validate_vector(&self, vector: &FeatureVector, dim: usize) -> Result<(), StoreError> {
        if vector.dim() != dim {
            return Err(StoreError::DimensionMismatch {
                expected: dim,
                got: vector.dim(),
            });
        }
        if !vector.is_finite() {
            return Err(StoreError::InvalidInput(
                "vector has non-finite components".into(),
            ));
        }
        if vector.iter().all(|&x| x == 0.0) {
            return Err(StoreError::InvalidInput("vector has zero norm".into()));
        }
        Ok(())
    }
}

fn load_snapshot(kv: &dyn KVStore, meta: &StoreMeta) -> Result<Snapshot, StoreError> {
    let mut snapshot = Snapshot::new(meta.dim, meta.metric);
    for (_, data) in kv.scan(SUBJECT_PREFIX)? {
        let subject: Subject = decode(&data)?;
        snapshot.upsert_subject(subject);
    }

    let mut orphans = 0usize;
    for (key, data) in kv.scan(REFERENCE_PREFIX)? {
        let reference: ReferenceVector = match decode(&data) {
            Ok(r) => r,
            Err(e) => {
                warn!(key = %key, error = %e, "featstore: skipping undecodable reference");
                continue;
            }
        };
        if reference.vector.dim() != meta.dim {
            warn!(key = %key, dim = reference.vector.dim(), "featstore: skipping reference with wrong dimension");
            continue;
        }
        if !snapshot.push_reference(reference) {
            orphans += 1;
        }
    }
    if orphans > 0 {
        warn!(orphans, "featstore: reference vectors without a subject; purge_orphans removes them");
    }
    Ok(snapshot)
}

impl FeatureStore for KvFeatureStore {
    fn dim(&self) -> usize {
        self.state.read().meta.dim
    }

    fn metric(&self) -> Metric {
        self.state.read().meta.metric
    }

    fn snapshot(&self) -> Result<Arc<Snapshot>, StoreError> {
        Ok(Arc::clone(&self.state.read().snapshot))
    }

    fn create_subject(&self, name: Option<&str>) -> Result<Subject, StoreError> {
        let mut state = self.state.write();

        let now = Utc::now();
        let subject = Subject {
            id: SubjectId(state.meta.next_subject),
            name: normalize_name(name),
            active: true,
            created_at: now,
            updated_at: now,
        };
        let mut meta = state.meta;
        meta.next_subject += 1;

        let mut batch = Batch::new();
        batch
            .put(META_KEY, encode(&meta)?)
            .put(subject_key(subject.id), encode(&subject)?);
        self.kv.write(batch)?;

        state.meta = meta;
        Arc::make_mut(&mut state.snapshot).upsert_subject(subject.clone());
        info!(subject = %subject.id, name = ?subject.name, "featstore: subject created");
        Ok(subject)
    }

    fn add_reference_vector(
        &self,
        subject: SubjectId,
        vector: FeatureVector,
        quality: Option<f32>,
    ) -> Result<ReferenceId, StoreError> {
        let mut state = self.state.write();
        self.validate_vector(&vector, state.meta.dim)?;
        if let Some(q) = quality {
            if !(0.0..=1.0).contains(&q) {
                return Err(StoreError::InvalidInput(format!(
                    "quality {q} outside [0, 1]"
                )));
            }
        }
        match state.snapshot.get(subject) {
            Some(entry) if entry.subject.active => {}
            _ => return Err(StoreError::UnknownSubject(subject)),
        }

        let reference = ReferenceVector {
            id: ReferenceId(state.meta.next_reference),
            subject,
            vector,
            quality,
            created_at: Utc::now(),
        };
        let mut meta = state.meta;
        meta.next_reference += 1;

        let mut batch = Batch::new();
        batch
            .put(META_KEY, encode(&meta)?)
            .put(reference_key(subject, reference.id), encode(&reference)?);
        self.kv.write(batch)?;

        let id = reference.id;
        state.meta = meta;
        Arc::make_mut(&mut state.snapshot).push_reference(reference);
        debug!(subject = %subject, reference = %id, "featstore: reference vector added");
        Ok(id)
    }

    fn delete_subject(&self, id: SubjectId) -> Result<usize, StoreError> {
        let mut state = self.state.write();
        if state.snapshot.get(id).is_none() {
            return Err(StoreError::UnknownSubject(id));
        }

        // Scan the backend rather than the snapshot so records skipped at
        // load time are removed too.
        let references = self.kv.scan(&subject_references_prefix(id))?;
        let mut batch = Batch::new();
        batch.delete(subject_key(id));
        for (key, _) in &references {
            batch.delete(key.as_str());
        }
        self.kv.write(batch)?;

        Arc::make_mut(&mut state.snapshot).remove_subject(id);
        info!(subject = %id, references = references.len(), "featstore: subject deleted");
        Ok(references.len())
    }

    fn merge_subjects(
        &self,
        from: SubjectId,
        to: SubjectId,
        delete_source: bool,
    ) -> Result<MergeReport, StoreError> {
        if from == to {
            return Err(StoreError::InvalidInput(format!(
                "cannot merge subject {from} into itself"
            )));
        }

        let mut state = self.state.write();
        let source = state
            .snapshot
            .get(from)
            .cloned()
            .ok_or(StoreError::UnknownSubject(from))?;
        let mut target = match state.snapshot.get(to) {
            Some(entry) if entry.subject.active => entry.subject.clone(),
            _ => return Err(StoreError::UnknownSubject(to)),
        };

        let now = Utc::now();
        let mut batch = Batch::new();
        let mut moved = Vec::with_capacity(source.references.len());
        let mut rekeyed = 0usize;
        // Scan the backend so records skipped at load time move too.
        for (key, data) in self.kv.scan(&subject_references_prefix(from))? {
            batch.delete(key.as_str());
            let mut r: ReferenceVector = match decode(&data) {
                Ok(r) => r,
                Err(e) => {
                    warn!(key = %key, error = %e, "featstore: dropping undecodable reference during merge");
                    continue;
                }
            };
            r.subject = to;
            batch.put(reference_key(to, r.id), encode(&r)?);
            rekeyed += 1;
            if r.vector.dim() == state.meta.dim {
                moved.push(r);
            }
        }

        let renamed = target.name.is_none() && source.subject.name.is_some();
        if renamed {
            target.name = source.subject.name.clone();
        }
        target.updated_at = now;
        batch.put(subject_key(to), encode(&target)?);

        let mut source_subject = source.subject;
        if delete_source {
            batch.delete(subject_key(from));
        } else {
            source_subject.updated_at = now;
            batch.put(subject_key(from), encode(&source_subject)?);
        }
        self.kv.write(batch)?;

        let report = MergeReport {
            from,
            to,
            moved: rekeyed,
            renamed,
            source_deleted: delete_source,
        };

        let snap = Arc::make_mut(&mut state.snapshot);
        if delete_source {
            snap.remove_subject(from);
        } else {
            if let Some(entry) = snap.entry_mut(from) {
                entry.references.clear();
            }
            snap.upsert_subject(source_subject);
        }
        snap.upsert_subject(target);
        for r in moved {
            snap.push_reference(r);
        }

        info!(
            from = %from,
            to = %to,
            moved = report.moved,
            renamed,
            delete_source,
            "featstore: subjects merged"
        );
        Ok(report)
    }

    fn rename_subject(&self, id: SubjectId, name: Option<&str>) -> Result<Subject, StoreError> {
        let mut state = self.state.write();
        let mut subject = state
            .snapshot
            .get(id)
            .map(|e| e.subject.clone())
            .ok_or(StoreError::UnknownSubject(id))?;
        subject.name = normalize_name(name);
        subject.updated_at = Utc::now();

        self.kv.put(&subject_key(id), &encode(&subject)?)?;
        Arc::make_mut(&mut state.snapshot).upsert_subject(subject.clone());
        info!(subject = %id, name = ?subject.name, "featstore: subject renamed");
        Ok(subject)
    }

    fn set_active(&self, id: SubjectId, active: bool) -> Result<Subject, StoreError> {
        let mut state = self.state.write();
        let mut subject = state
            .snapshot
            .get(id)
            .map(|e| e.subject.clone())
            .ok_or(StoreError::UnknownSubject(id))?;
        if subject.active == active {
            return Ok(subject);
        }
        subject.active = active;
        subject.updated_at = Utc::now();

        self.kv.put(&subject_key(id), &encode(&subject)?)?;
        Arc::make_mut(&mut state.snapshot).upsert_subject(subject.clone());
        info!(subject = %id, active, "featstore: subject activation changed");
        Ok(subject)
    }

    fn delete_reference_vectors(&self, ids: &[ReferenceId]) -> Result<usize, StoreError> {
        let mut state = self.state.write();

        let mut owners: HashMap<ReferenceId, SubjectId> = state
            .snapshot
            .entries()
            .flat_map(|e| e.references.iter().map(|r| (r.id, e.subject.id)))
            .collect();

        let mut batch = Batch::new();
        let mut doomed = Vec::new();
        for id in ids {
            // Removing the entry also skips repeated ids.
            if let Some(owner) = owners.remove(id) {
                batch.delete(reference_key(owner, *id));
                doomed.push((owner, *id));
            }
        }
        if doomed.is_empty() {
            return Ok(0);
        }
        self.kv.write(batch)?;

        let snap = Arc::make_mut(&mut state.snapshot);
        for &(owner, id) in &doomed {
            if let Some(entry) = snap.entry_mut(owner) {
                entry.references.retain(|r| r.id != id);
            }
        }
        info!(removed = doomed.len(), "featstore: reference vectors deleted");
        Ok(doomed.len())
    }

    fn clear_reference_vectors(&self, id: SubjectId) -> Result<usize, StoreError> {
        let mut state = self.state.write();
        if state.snapshot.get(id).is_none() {
            return Err(StoreError::UnknownSubject(id));
        }

        let references = self.kv.scan(&subject_references_prefix(id))?;
        if references.is_empty() {
            return Ok(0);
        }
        let mut batch = Batch::new();
        for (key, _) in &references {
            batch.delete(key.as_str());
        }
        self.kv.write(batch)?;

        if let Some(entry) = Arc::make_mut(&mut state.snapshot).entry_mut(id) {
            entry.references.clear();
        }
        info!(subject = %id, removed = references.len(), "featstore: reference vectors cleared");
        Ok(references.len())
    }

    fn purge_orphans(&self) -> Result<usize, StoreError> {
        let state = self.state.write();

        let mut batch = Batch::new();
        for (key, data) in self.kv.scan(REFERENCE_PREFIX)? {
            let orphan = match parse_reference_key(&key) {
                Some((subject, _)) => {
                    state.snapshot.get(subject).is_none()
                        || decode::<ReferenceVector>(&data).is_err()
                }
                None => true,
            };
            if orphan {
                batch.delete(key);
            }
        }
        let removed = batch.len();
        if removed > 0 {
            self.kv.write(batch)?;
            info!(removed, "featstore: orphan reference vectors purged");
        }
        Ok(removed)
    }
}
