use super::*;
use crate::embeddings::HashingEmbedder;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Embedder returning hand-picked vectors and counting calls
struct LookupEmbedder {
    vectors: HashMap<String, Vec<f32>>,
    calls: AtomicUsize,
}

impl LookupEmbedder {
    fn new(entries: &[(&str, Vec<f32>)]) -> Self {
        Self {
            vectors: entries
                .iter()
                .map(|(text, vector)| ((*text).to_string(), vector.clone()))
                .collect(),
            calls: AtomicUsize::new(0),
        }
    }
}

impl Embedder for LookupEmbedder {
    fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.vectors
            .get(text)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("no vector for {text}"))
    }

    fn model(&self) -> &str {
        "lookup"
    }
}

fn grammar_corpus() -> Vec<Document> {
    vec![
        Document::new(
            0,
            "The preposition 'à' contracts with the masculine article 'le' to form 'au'.",
            Some("Contractions"),
        ),
        Document::new(
            1,
            "'avoir besoin' is followed by 'de'; in a relative clause this becomes 'dont'.",
            Some("Relative Pronouns"),
        ),
        Document::new(
            2,
            "Adjectives agree in gender and number with the noun they modify.",
            Some("Agreement"),
        ),
        Document::new(
            3,
            "The passé composé of movement verbs uses 'être' as the auxiliary.",
            Some("Auxiliaries"),
        ),
    ]
}

#[test]
fn exact_match_retrieval() {
    let embedder = HashingEmbedder::new(256);
    let index = VectorIndex::from_corpus(grammar_corpus(), &embedder).expect("should build");

    for document in grammar_corpus() {
        let hits = index
            .search(&document.content, 1, &embedder)
            .expect("should search");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].document.id, document.id);
        assert!(hits[0].distance.abs() < 1e-6);
    }
}

#[test]
fn search_is_deterministic() {
    let embedder = HashingEmbedder::new(64);
    let index = VectorIndex::from_corpus(grammar_corpus(), &embedder).expect("should build");

    let first: Vec<u32> = index
        .search("Je vais à le parc.", 4, &embedder)
        .expect("should search")
        .iter()
        .map(|hit| hit.document.id)
        .collect();
    let second: Vec<u32> = index
        .search("Je vais à le parc.", 4, &embedder)
        .expect("should search")
        .iter()
        .map(|hit| hit.document.id)
        .collect();

    assert_eq!(first, second);
    assert_eq!(first.len(), 4);
}

#[test]
fn ties_break_by_corpus_position() {
    let embedder = LookupEmbedder::new(&[
        ("a", vec![1.0, 0.0]),
        ("b", vec![0.0, 1.0]),
        ("c", vec![1.0, 0.0]),
        ("q", vec![0.5, 0.5]),
    ]);
    let corpus = vec![
        Document::new(10, "c", None),
        Document::new(11, "a", None),
        Document::new(12, "b", None),
    ];
    let index = VectorIndex::from_corpus(corpus, &embedder).expect("should build");

    // All three rows sit at the same distance from the query
    let hits = index.search("q", 3, &embedder).expect("should search");
    let ids: Vec<u32> = hits.iter().map(|hit| hit.document.id).collect();
    assert_eq!(ids, vec![10, 11, 12]);
}

#[test]
fn results_ordered_by_distance_and_capped_at_k() {
    let embedder = LookupEmbedder::new(&[
        ("far", vec![10.0, 0.0]),
        ("near", vec![1.0, 0.0]),
        ("mid", vec![3.0, 0.0]),
        ("q", vec![0.0, 0.0]),
    ]);
    let corpus = vec![
        Document::new(0, "far", None),
        Document::new(1, "near", None),
        Document::new(2, "mid", None),
    ];
    let index = VectorIndex::from_corpus(corpus, &embedder).expect("should build");

    let hits = index.search("q", 2, &embedder).expect("should search");
    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].document.content, "near");
    assert_eq!(hits[0].distance, 1.0);
    assert_eq!(hits[1].document.content, "mid");
    assert_eq!(hits[1].distance, 9.0);

    let all = index.search("q", 10, &embedder).expect("should search");
    assert_eq!(all.len(), 3, "k larger than the corpus returns every document");
}

#[test]
fn precomputed_embeddings_are_not_recomputed() {
    let embedder = LookupEmbedder::new(&[("b", vec![0.0, 1.0])]);
    let mut with_embedding = Document::new(0, "a", None);
    with_embedding.embedding = Some(vec![1.0, 0.0]);
    let corpus = vec![with_embedding, Document::new(1, "b", None)];

    let index = VectorIndex::from_corpus(corpus, &embedder).expect("should build");
    assert_eq!(embedder.calls.load(Ordering::SeqCst), 1);
    assert_eq!(
        index.embeddings().to_vec(),
        vec![vec![1.0f32, 0.0], vec![0.0, 1.0]]
    );
    assert_eq!(index.dimension(), Some(2));
    assert_eq!(index.len(), 2);
}

#[test]
fn empty_corpus_is_rejected() {
    let embedder = HashingEmbedder::new(8);
    let mut index = VectorIndex::new();
    assert!(matches!(
        index.build(Vec::new(), &embedder),
        Err(IndexError::EmptyCorpus)
    ));
    assert!(!index.is_built());
    assert!(index.is_empty());
}

#[test]
fn non_uniform_embeddings_are_rejected() {
    let embedder = LookupEmbedder::new(&[("a", vec![1.0, 0.0]), ("b", vec![1.0, 0.0, 0.0])]);
    let corpus = vec![Document::new(0, "a", None), Document::new(1, "b", None)];

    let result = VectorIndex::from_corpus(corpus, &embedder);
    assert!(matches!(
        result,
        Err(IndexError::DimensionMismatch {
            expected: 2,
            found: 3,
            position: 1
        })
    ));
}

#[test]
fn search_before_build_fails() {
    let embedder = HashingEmbedder::new(8);
    let index = VectorIndex::new();
    assert!(matches!(
        index.search("bonjour", 1, &embedder),
        Err(IndexError::NotBuilt)
    ));
    assert!(matches!(
        index.search_vector(&[0.0; 8], 1),
        Err(IndexError::NotBuilt)
    ));
}

#[test]
fn invalid_queries_are_rejected() {
    let embedder = HashingEmbedder::new(8);
    let index = VectorIndex::from_corpus(grammar_corpus(), &embedder).expect("should build");

    assert!(matches!(
        index.search("bonjour", 0, &embedder),
        Err(IndexError::InvalidK)
    ));
    assert!(matches!(
        index.search_vector(&[0.0; 3], 1),
        Err(IndexError::DimensionMismatch {
            expected: 8,
            found: 3,
            ..
        })
    ));
}

#[test]
fn embedding_failures_surface() {
    let embedder = LookupEmbedder::new(&[("a", vec![1.0])]);
    let index =
        VectorIndex::from_corpus(vec![Document::new(0, "a", None)], &embedder).expect("should build");

    assert!(matches!(
        index.search("unknown", 1, &embedder),
        Err(IndexError::Embedding(_))
    ));
}

#[test]
fn squared_euclidean_distance() {
    assert_eq!(squared_euclidean(&[1.0, 2.0], &[4.0, 6.0]), 25.0);
    assert_eq!(squared_euclidean(&[0.5], &[0.5]), 0.0);
}
