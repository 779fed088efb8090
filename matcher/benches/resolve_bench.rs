use std::sync::Arc;

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use vigil_featstore::{FeatureStore, FeatureVector, KvFeatureStore, Metric, StoreConfig, l2_normalize};
use vigil_matcher::{MatchResolver, ResolverConfig};

fn random_unit_vec(dim: usize, seed: u64) -> Vec<f32> {
    let mut v = Vec::with_capacity(dim);
    let mut state = seed;
    for _ in 0..dim {
        state = state.wrapping_mul(6364136223846793005).wrapping_add(1);
        v.push(((state >> 33) as f32) / (u32::MAX as f32) - 0.5);
    }
    l2_normalize(&mut v);
    v
}

fn make_cluster(centroid: &[f32], n: usize, noise: f32, base_seed: u64) -> Vec<Vec<f32>> {
    (0..n)
        .map(|i| {
            let noise_vec = random_unit_vec(centroid.len(), base_seed.wrapping_add(i as u64 * 997));
            let mut v: Vec<f32> = centroid
                .iter()
                .zip(&noise_vec)
                .map(|(c, r)| c + r * noise)
                .collect();
            l2_normalize(&mut v);
            v
        })
        .collect()
}

fn populated_store(dim: usize, subjects: usize, per_subject: usize) -> Arc<KvFeatureStore> {
    let store = KvFeatureStore::in_memory(StoreConfig {
        dim,
        metric: Metric::Cosine,
    })
    .unwrap();
    for s in 0..subjects {
        let centroid = random_unit_vec(dim, s as u64 + 1);
        let name = (s % 3 != 0).then(|| format!("subject-{s}"));
        let subject = store.create_subject(name.as_deref()).unwrap();
        for v in make_cluster(&centroid, per_subject, 0.1, 1000 * s as u64) {
            store
                .add_reference_vector(subject.id, FeatureVector::from(v), None)
                .unwrap();
        }
    }
    Arc::new(store)
}

fn bench_resolve(c: &mut Criterion) {
    let dim = 128;
    for (subjects, per_subject) in [(10, 5), (100, 10)] {
        let resolver =
            MatchResolver::new(populated_store(dim, subjects, per_subject), ResolverConfig::default())
                .unwrap();
        let query = make_cluster(&random_unit_vec(dim, 1), 1, 0.1, 42).remove(0);

        c.bench_function(
            &format!("resolve_128d_{subjects}subjects_{per_subject}refs"),
            |b| {
                b.iter(|| {
                    let _ = black_box(resolver.resolve(black_box(&query)));
                });
            },
        );
    }
}

fn bench_rank_with_prefilter(c: &mut Criterion) {
    let dim = 128;
    let resolver = MatchResolver::new(
        populated_store(dim, 100, 10),
        ResolverConfig {
            prefilter: Some(0.6),
            ..Default::default()
        },
    )
    .unwrap();
    let query = random_unit_vec(dim, 7);

    c.bench_function("rank_128d_100subjects_prefilter", |b| {
        b.iter(|| {
            let _ = black_box(resolver.rank(black_box(&query)));
        });
    });
}

criterion_group!(benches, bench_resolve, bench_rank_with_prefilter);
criterion_main!(benches);
