//! Persisted store of enrolled subjects and their reference vectors.
//!
//! A subject is an identity record, optionally named. Each subject owns any
//! number of fixed-dimension reference vectors. All vectors in a store share
//! one dimensionality and one [`Metric`], both fixed when the store is
//! created.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────┐
//! │            KvFeatureStore                  │
//! │  RwLock<State { meta, Arc<Snapshot> }>     │
//! ├────────────────────────────────────────────┤
//! │  vigil_kv::KVStore (redb / memory)         │
//! │  meta | subj:{id} | vec:{subject}:{id}     │
//! └────────────────────────────────────────────┘
//! ```
//!
//! Matching reads go through [`FeatureStore::snapshot`], which returns a
//! cheap `Arc` of the current contents. Every mutation is committed to the
//! backend in a single atomic batch before the new snapshot is published.
//!
//! # Example
//!
//! ```
//! use vigil_featstore::{FeatureStore, FeatureVector, KvFeatureStore, StoreConfig};
//!
//! let store = KvFeatureStore::in_memory(StoreConfig { dim: 2, ..Default::default() }).unwrap();
//! let ana = store.create_subject(Some("ana")).unwrap();
//! store
//!     .add_reference_vector(ana.id, FeatureVector::from(vec![1.0, 0.0]), None)
//!     .unwrap();
//!
//! let listed = store.list_active_subjects_with_vectors().unwrap();
//! assert_eq!(listed.len(), 1);
//! ```

mod error;
pub mod keys;
mod kvstore;
mod metric;
mod snapshot;
mod store;
mod types;

pub use error::StoreError;
pub use kvstore::KvFeatureStore;
pub use metric::{Metric, cosine_distance, l2_normalize, normalized_euclidean};
pub use snapshot::{Conflict, Snapshot, SubjectDistances, SubjectEntry};
pub use store::{FeatureStore, StoreConfig};
pub use types::{
    FeatureVector, MergeReport, ReferenceId, ReferenceVector, Subject, SubjectId, SubjectSummary,
};
