//! Benchmarks for the per-request classical path
//!
//! Covers TF-IDF extraction, the schema-aligned extractor, tree ensemble
//! prediction and majority-vote aggregation. Neural inference is excluded.
//!
//! Run with: cargo bench -p provenance-classifiers

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::runtime::Runtime;

use provenance_classifiers::classical::{ClassicalClassifier, ClassicalModel, DecisionTree, TreeNode};
use provenance_classifiers::{
    aggregate, FeatureClassifier, FeatureExtractor, FeatureSchema, ModelVote, TextVectorizer,
    TfidfVectorizer,
};
use provenance_core::{ClassificationResult, Label, ModelId};

const VOCABULARY_SIZE: usize = 5_000;

fn vocabulary() -> Vec<String> {
    (0..VOCABULARY_SIZE).map(|idx| format!("term{}", idx)).collect()
}

fn vectorizer() -> Arc<TfidfVectorizer> {
    let terms: HashMap<String, usize> = vocabulary()
        .into_iter()
        .enumerate()
        .map(|(idx, term)| (term, idx))
        .collect();
    let idf = (0..VOCABULARY_SIZE).map(|idx| 1.0 + (idx % 7) as f64 * 0.1).collect();
    Arc::new(TfidfVectorizer::new(terms, idf).expect("valid vectorizer"))
}

fn text(words: usize) -> String {
    (0..words)
        .map(|idx| format!("term{}", (idx * 37) % (VOCABULARY_SIZE * 2)))
        .collect::<Vec<_>>()
        .join(" ")
}

fn stump(feature: usize, margin: f64) -> DecisionTree {
    DecisionTree {
        nodes: vec![
            TreeNode::Split {
                feature,
                threshold: 0.01,
                left: 1,
                right: 2,
            },
            TreeNode::Leaf { value: margin },
            TreeNode::Leaf { value: -margin },
        ],
    }
}

/// Benchmark TF-IDF vectorization by text length
fn benchmark_tfidf(c: &mut Criterion) {
    let vectorizer = vectorizer();

    let mut group = c.benchmark_group("TfIdf_Transform");
    for words in [50, 500, 5_000] {
        let input = text(words);
        group.bench_with_input(BenchmarkId::new("transform", words), &input, |b, input| {
            b.iter(|| vectorizer.transform(black_box(input)).unwrap())
        });
    }
    group.finish();
}

/// Benchmark the aligned extractor used once per request
fn benchmark_extractor(c: &mut Criterion) {
    let vectorizer = vectorizer();
    let names: Vec<String> = vocabulary().into_iter().rev().take(1_000).collect();
    let schema = Arc::new(FeatureSchema::named(names).expect("valid schema"));
    let extractor = FeatureExtractor::new(vectorizer, schema).expect("alignable schema");
    let input = text(500);

    c.bench_function("FeatureExtractor/transform_500_words", |b| {
        b.iter(|| extractor.transform(black_box(&input)).unwrap())
    });
}

/// Benchmark a 100-tree boosted model on an aligned vector
fn benchmark_gradient_boosting(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let names: Vec<String> = vocabulary().into_iter().take(1_000).collect();
    let schema = Arc::new(FeatureSchema::named(names.clone()).expect("valid schema"));
    let extractor = FeatureExtractor::new(vectorizer(), schema).expect("alignable schema");
    let features = extractor.transform(&text(500)).unwrap();

    let trees = (0..100).map(|idx| stump(idx * 7 % 1_000, 0.05)).collect();
    let model = ClassicalClassifier::from_parts(
        "GBM",
        names,
        ClassicalModel::GradientBoosting {
            init_score: 0.0,
            trees,
        },
        None,
        None,
    )
    .expect("valid model");

    c.bench_function("ClassicalClassifier/gradient_boosting_100_trees", |b| {
        b.iter(|| rt.block_on(async { model.predict(black_box(&features)).await.unwrap() }))
    });
}

/// Benchmark the aggregation step
fn benchmark_aggregate(c: &mut Criterion) {
    let labels = [Label::Human, Label::Ai, Label::Human, Label::Human, Label::Ai];

    c.bench_function("Ensemble/aggregate", |b| {
        b.iter(|| {
            let votes = ModelId::ALL
                .iter()
                .zip(labels)
                .map(|(&id, label)| ModelVote::new(id, ClassificationResult::new(label, 0.8)))
                .collect();
            aggregate(black_box(votes)).unwrap()
        })
    });
}

criterion_group!(
    benches,
    benchmark_tfidf,
    benchmark_extractor,
    benchmark_gradient_boosting,
    benchmark_aggregate
);
criterion_main!(benches);
