//! Latency benchmarks for the classification cascade
//!
//! Checks the cheap tiers stay within their budgets:
//! - Pattern: <2ms
//! - Semantic (hashing embedder): <50ms
//!
//! Run with: cargo bench -p logtriage-classifiers

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::sync::Arc;
use tokio::runtime::Runtime;

use logtriage_classifiers::config::default_rules;
use logtriage_classifiers::{
    CentroidArtifact, ClassificationRouter, Classifier, Embedder, HashingEmbedder, LabelCentroid,
    PatternClassifier, Route, RoutingPolicy, SemanticClassifier, TierStage, PATTERN_TIER,
    SEMANTIC_TIER,
};

const MESSAGES: &[(&str, &str)] = &[
    ("pattern_hit", "User User4321 logged out."),
    ("pattern_late_hit", "Account with ID 5571 created by Admin."),
    ("semantic_hit", "Multiple failed login attempts detected for admin account"),
    ("miss", "Quarterly invoice batch reconciled without discrepancies"),
];

fn semantic_tier() -> SemanticClassifier {
    let embedder = Arc::new(HashingEmbedder::default());
    let centroid = |text: &str| embedder.embed(text).expect("embed");
    let artifact = CentroidArtifact {
        version: "bench".to_string(),
        dimension: HashingEmbedder::DEFAULT_DIMENSION,
        labels: vec![
            LabelCentroid {
                label: "Security Alert".to_string(),
                centroid: centroid("multiple failed login attempts detected for admin account"),
            },
            LabelCentroid {
                label: "Critical Error".to_string(),
                centroid: centroid("kernel panic disk failure on primary storage"),
            },
        ],
    };
    SemanticClassifier::new(SEMANTIC_TIER, embedder, artifact).expect("semantic tier")
}

/// Benchmark pattern tier (target: <2ms)
fn benchmark_pattern_classifier(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let classifier =
        PatternClassifier::new(PATTERN_TIER, default_rules()).expect("Failed to create pattern tier");

    let mut group = c.benchmark_group("Pattern_Tier");
    group.sample_size(100);

    for (name, text) in MESSAGES {
        group.bench_with_input(BenchmarkId::new("classify", name), text, |b, text| {
            b.iter(|| rt.block_on(async { classifier.classify(black_box(text)).await.unwrap() }));
        });
    }

    group.finish();
}

/// Benchmark semantic tier with the hashing embedder (target: <50ms)
fn benchmark_semantic_classifier(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let classifier = semantic_tier();

    let mut group = c.benchmark_group("Semantic_Tier");
    group.sample_size(50);

    for (name, text) in MESSAGES {
        group.bench_with_input(BenchmarkId::new("classify", name), text, |b, text| {
            b.iter(|| rt.block_on(async { classifier.classify(black_box(text)).await.unwrap() }));
        });
    }

    group.finish();
}

/// Benchmark the full pattern -> semantic route
fn benchmark_router(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let router = ClassificationRouter::builder()
        .tier(Arc::new(
            PatternClassifier::new(PATTERN_TIER, default_rules()).expect("pattern tier"),
        ))
        .stage(TierStage::new(Arc::new(semantic_tier())).with_min_confidence(0.5))
        .policy(RoutingPolicy::new(Route::new(
            "default",
            [PATTERN_TIER, SEMANTIC_TIER],
        )))
        .build()
        .expect("router");

    let mut group = c.benchmark_group("Router");
    group.sample_size(50);

    for (name, text) in MESSAGES {
        group.bench_with_input(BenchmarkId::new("route", name), text, |b, text| {
            b.iter(|| rt.block_on(async { router.route("ModernCRM", black_box(text)).await }));
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    benchmark_pattern_classifier,
    benchmark_semantic_classifier,
    benchmark_router,
);
criterion_main!(benches);
