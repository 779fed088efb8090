use std::sync::Arc;

use vigil_engine::{EngineConfig, Frame, Orchestrator, StreamId, StreamLabel};
use vigil_featstore::{
    FeatureStore, FeatureVector, KvFeatureStore, Metric, StoreConfig, SubjectId,
};
use vigil_matcher::{Classifier, MatchResolver, ResolverConfig};
use vigil_stabilizer::{LabelStatus, Stabilized, Verdict};

const DIM: usize = 3;

fn store_config() -> StoreConfig {
    StoreConfig {
        dim: DIM,
        metric: Metric::Cosine,
    }
}

fn engine_config() -> EngineConfig {
    EngineConfig {
        store: store_config(),
        ..Default::default()
    }
}

/// Unit vector at cosine distance `d` from the x axis, turned towards +y.
fn at(d: f32) -> Vec<f32> {
    let cos = 1.0 - d;
    vec![cos, (1.0 - cos * cos).max(0.0).sqrt(), 0.0]
}

/// Unit vector at cosine distance `d` from the x axis, turned towards +z.
fn at_z(d: f32) -> Vec<f32> {
    let cos = 1.0 - d;
    vec![cos, 0.0, (1.0 - cos * cos).max(0.0).sqrt()]
}

const X: [f32; 3] = [1.0, 0.0, 0.0];
const Y: [f32; 3] = [0.0, 1.0, 0.0];
const Z: [f32; 3] = [0.0, 0.0, 1.0];

fn enroll(store: &dyn FeatureStore, name: Option<&str>, vectors: &[Vec<f32>]) -> SubjectId {
    let s = store.create_subject(name).unwrap();
    for v in vectors {
        store
            .add_reference_vector(s.id, FeatureVector::from(v.clone()), Some(1.0))
            .unwrap();
    }
    s.id
}

fn identity(o: &mut Orchestrator, v: &[f32]) -> Stabilized<SubjectId> {
    match o.process_frame(StreamId::Identity, Some(v)).unwrap() {
        StreamLabel::Identity(s) => s,
        other => panic!("unexpected stream output {other:?}"),
    }
}

#[test]
fn resolution_is_deterministic() {
    let store = Arc::new(KvFeatureStore::in_memory(store_config()).unwrap());
    enroll(&*store, Some("a"), &[at(0.1), at(0.2)]);
    enroll(&*store, None, &[at_z(0.15)]);
    enroll(&*store, Some("c"), &[Y.to_vec()]);

    let resolver = MatchResolver::new(store, ResolverConfig::default()).unwrap();
    let first = resolver.classify(&X).unwrap();
    for _ in 0..20 {
        assert_eq!(resolver.classify(&X).unwrap(), first);
    }
}

#[test]
fn close_candidates_are_ambiguous() {
    let store = Arc::new(KvFeatureStore::in_memory(store_config()).unwrap());
    enroll(&*store, Some("a"), &[at(0.30)]);
    enroll(&*store, Some("b"), &[at_z(0.33)]);

    let resolver = MatchResolver::new(store, ResolverConfig::default()).unwrap();
    let ranked = resolver.rank(&X).unwrap();
    assert!((ranked[0].min_distance - 0.30).abs() < 1e-4);
    assert!((ranked[1].min_distance - 0.33).abs() < 1e-4);
    assert_eq!(resolver.classify(&X).unwrap(), Verdict::NoMatch);
}

#[test]
fn vector_count_does_not_bias_the_match() {
    let store = Arc::new(KvFeatureStore::in_memory(store_config()).unwrap());
    let single = enroll(&*store, Some("single"), &[at(0.20)]);
    let many: Vec<Vec<f32>> = (0..50).map(|i| at_z(0.35 + 0.005 * i as f32)).collect();
    enroll(&*store, Some("many"), &many);

    let resolver = MatchResolver::new(store, ResolverConfig::default()).unwrap();
    let m = resolver.classify(&X).unwrap().into_candidate().unwrap();
    assert_eq!(m.label, single);
}

#[test]
fn hysteresis_needs_independent_quorum() {
    let store = Arc::new(KvFeatureStore::in_memory(store_config()).unwrap());
    let a = enroll(&*store, Some("a"), &[X.to_vec()]);
    let b = enroll(&*store, Some("b"), &[Y.to_vec()]);
    let mut o = Orchestrator::new(store, &engine_config()).unwrap();

    for _ in 0..4 {
        assert_eq!(identity(&mut o, &X).status, LabelStatus::Unset);
    }
    for _ in 0..4 {
        assert_eq!(identity(&mut o, &Y).status, LabelStatus::Unset);
    }

    // Window is now 4 A / 4 B. B needs one more vote to reach quorum.
    let out = identity(&mut o, &Y);
    assert_eq!(out.stable, Some(b));
    assert!(out.changed);

    // A needs five votes of its own before the label flips back.
    for _ in 0..4 {
        assert_eq!(identity(&mut o, &X).stable, Some(b));
    }
    let out = identity(&mut o, &X);
    assert_eq!(out.stable, Some(a));
}

#[test]
fn label_decays_without_evidence() {
    let store = Arc::new(KvFeatureStore::in_memory(store_config()).unwrap());
    let a = enroll(&*store, Some("a"), &[X.to_vec()]);
    let mut o = Orchestrator::new(store, &engine_config()).unwrap();

    for _ in 0..5 {
        identity(&mut o, &X);
    }
    assert_eq!(o.identity().label, Some(a));

    // Z is orthogonal to every reference: NoMatch each time.
    for _ in 0..8 {
        identity(&mut o, &Z);
    }
    let state = o.identity();
    assert_eq!(state.status, LabelStatus::Unset);
    assert_eq!(state.label, None);
}

#[test]
fn enrolled_vector_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("vigil.redb");
    let v = vec![0.3, -0.2, 0.9];

    let id = {
        let store = KvFeatureStore::open_path(&path, store_config()).unwrap();
        enroll(&store, Some("ana"), &[v.clone()])
    };

    let store = Arc::new(KvFeatureStore::open_path(&path, store_config()).unwrap());
    let resolver = MatchResolver::new(store, ResolverConfig::default()).unwrap();
    let m = resolver.classify(&v).unwrap().into_candidate().unwrap();
    assert_eq!(m.label, id);
    assert!(m.min_distance.abs() < 1e-5);
    assert!(m.confidence > 0.99);
}

#[test]
fn refresh_only_changes_confidence() {
    let store = Arc::new(KvFeatureStore::in_memory(store_config()).unwrap());
    let a = enroll(&*store, Some("a"), &[X.to_vec()]);
    let mut o = Orchestrator::new(store, &engine_config()).unwrap();

    for _ in 0..5 {
        identity(&mut o, &X);
    }
    let settled = o.identity();
    assert_eq!(settled.stable, Some(a));

    let mut confidences = Vec::new();
    for d in [0.05, 0.1, 0.15, 0.2, 0.1, 0.0] {
        let out = identity(&mut o, &at(d));
        assert_eq!(out.stable, Some(a));
        assert!(!out.changed);
        confidences.push(out.confidence);
    }
    assert!(confidences.iter().any(|c| (c - settled.confidence).abs() > 1e-3));
}

#[test]
fn missing_detection_is_not_a_vote() {
    let store = Arc::new(KvFeatureStore::in_memory(store_config()).unwrap());
    let a = enroll(&*store, Some("a"), &[X.to_vec()]);
    let mut o = Orchestrator::new(store, &engine_config()).unwrap();

    for _ in 0..5 {
        identity(&mut o, &X);
    }
    // Far more empty frames than the window holds: the label survives.
    for _ in 0..20 {
        let out = o.process(&Frame::default());
        assert_eq!(out.identity.stable, Some(a));
    }
    assert_eq!(o.identity().filled, 5);
}

#[test]
fn enrollment_is_visible_to_running_orchestrator() {
    let store = Arc::new(KvFeatureStore::in_memory(store_config()).unwrap());
    let shared: Arc<dyn FeatureStore> = store.clone();
    let mut o = Orchestrator::new(shared, &engine_config()).unwrap();

    for _ in 0..5 {
        identity(&mut o, &X);
    }
    assert_eq!(o.identity().status, LabelStatus::Unset);

    let late = enroll(&*store, None, &[X.to_vec()]);
    for _ in 0..5 {
        identity(&mut o, &X);
    }
    assert_eq!(o.identity().label, Some(late));
}

#[test]
fn merged_subject_keeps_matching() {
    let store = Arc::new(KvFeatureStore::in_memory(store_config()).unwrap());
    let named = enroll(&*store, Some("ana"), &[X.to_vec()]);
    let anon = enroll(&*store, None, &[at(0.02)]);

    let resolver = MatchResolver::new(store.clone(), ResolverConfig::default()).unwrap();
    // Two subjects this close are ambiguous, but only one is named.
    assert_eq!(
        resolver.classify(&X).unwrap().candidate().unwrap().label,
        named
    );

    let report = store.merge_subjects(named, anon, true).unwrap();
    assert_eq!(report.moved, 1);
    assert!(report.renamed);

    let m = resolver.classify(&X).unwrap().into_candidate().unwrap();
    assert_eq!(m.label, anon);
    assert_eq!(
        store.subject(anon).unwrap().unwrap().name.as_deref(),
        Some("ana")
    );
}
