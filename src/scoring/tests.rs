use super::*;
use std::sync::Arc;

use crate::cache::EmbeddingCache;
use crate::embedding::{EmbeddingErrorKind, MockOracle, MockOracleProbe, OracleHandle};

fn animals() -> MockOracle {
    MockOracle::new(3)
        .with_embedding("cat", vec![1.0, 0.0, 0.0])
        .with_embedding("dog", vec![0.9, 0.1, 0.0])
        .with_embedding("car", vec![0.0, 0.0, 1.0])
}

fn scorer_with(oracle: MockOracle) -> (SimilarityScorer, MockOracleProbe) {
    let probe = oracle.probe();
    let handle = Arc::new(OracleHandle::new(oracle));
    let cache = Arc::new(EmbeddingCache::new(handle));
    (cache.scorer(), probe)
}

mod similarity {
    use super::*;

    #[test]
    fn test_identical_vectors_score_one() {
        let v = [0.3, -1.2, 4.0];
        assert!((topical_similarity(&v, &v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_orthogonal_vectors_score_zero() {
        assert_eq!(topical_similarity(&[1.0, 0.0], &[0.0, 1.0]), 0.0);
    }

    #[test]
    fn test_anti_correlated_scores_like_correlated() {
        let a = [1.0, 2.0, 3.0];
        let b = [2.0, 1.0, 0.5];
        let neg_b: Vec<f32> = b.iter().map(|x| -x).collect();

        let positive = topical_similarity(&a, &b);
        let negative = topical_similarity(&a, &neg_b);
        assert!((positive - negative).abs() < 1e-6);
        assert!(positive > 0.0);
    }

    #[test]
    fn test_symmetric() {
        let a = [0.5, -0.25, 0.75, 1.0];
        let b = [-1.0, 0.5, 0.0, 2.0];
        assert_eq!(topical_similarity(&a, &b), topical_similarity(&b, &a));
    }

    #[test]
    fn test_scale_invariant() {
        let a = [1.0, 2.0, 3.0];
        let b = [3.0, 1.0, 2.0];
        let scaled: Vec<f32> = b.iter().map(|x| x * 10.0).collect();
        assert!((topical_similarity(&a, &b) - topical_similarity(&a, &scaled)).abs() < 1e-6);
    }

    #[test]
    fn test_zero_vector_scores_zero() {
        assert_eq!(topical_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
        assert_eq!(topical_similarity(&[1.0, 1.0], &[0.0, 0.0]), 0.0);
    }

    #[test]
    fn test_empty_vectors_score_zero() {
        assert_eq!(topical_similarity(&[], &[]), 0.0);
    }

    #[test]
    fn test_length_mismatch_scores_zero() {
        assert_eq!(topical_similarity(&[1.0, 0.0], &[1.0, 0.0, 0.0]), 0.0);
    }

    #[test]
    fn test_result_stays_in_unit_range() {
        let vectors: [&[f32]; 8] = [
            &[1.0, -3.0, 2.5],
            &[-0.1, 0.2, -0.3],
            &[100.0, 0.0, -100.0],
            &[1e-3, 1e-3, 1e-3],
            &[1e-12, 0.0, 1e-12],
            &[1e20, 0.0, -1e20],
            &[f32::MAX, f32::MAX, 0.0],
            &[f32::MIN_POSITIVE, 0.0, 0.0],
        ];
        for a in vectors {
            for b in vectors {
                let s = topical_similarity(a, b);
                assert!((0.0..=1.0 + 1e-6).contains(&s), "{s} out of range");
            }
        }
    }

    #[test]
    fn test_tiny_vectors_do_not_underflow() {
        let v = [1e-12, 0.0];
        assert!((topical_similarity(&v, &v) - 1.0).abs() < 1e-6);

        let w = [1e-30, 1e-30];
        let s = topical_similarity(&v, &w);
        assert!((s - std::f32::consts::FRAC_1_SQRT_2).abs() < 1e-6, "got {s}");
    }

    #[test]
    fn test_huge_vectors_do_not_overflow() {
        let v = [1e20, 0.0];
        assert!((topical_similarity(&v, &v) - 1.0).abs() < 1e-6);

        let max = [f32::MAX, f32::MAX];
        assert!((topical_similarity(&max, &max) - 1.0).abs() < 1e-6);
        assert!((topical_similarity(&max, &[-1.0, -1.0]) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_non_finite_input_scores_zero() {
        assert_eq!(topical_similarity(&[f32::NAN, 1.0], &[1.0, 1.0]), 0.0);
        assert_eq!(topical_similarity(&[f32::INFINITY, 1.0], &[1.0, 1.0]), 0.0);
    }
}

#[test]
fn test_query_related_words() {
    let (scorer, _) = scorer_with(animals());
    let score = scorer.query("cat", "dog", false);
    assert!((score - 0.994).abs() < 1e-3, "got {score}");
}

#[test]
fn test_query_unrelated_words() {
    let (scorer, _) = scorer_with(animals());
    assert_eq!(scorer.query("cat", "car", false), 0.0);
}

#[test]
fn test_query_ignores_rear_flag() {
    let (scorer, _) = scorer_with(animals());
    assert_eq!(
        scorer.query("cat", "dog", true),
        scorer.query("cat", "dog", false)
    );
}

#[test]
fn test_repeated_context_is_resolved_once() {
    let (scorer, probe) = scorer_with(animals());

    scorer.query("cat", "dog", false);
    scorer.query("cat", "car", false);
    scorer.query("cat", "dog", false);

    assert_eq!(probe.embed_calls_for("cat"), 1);
    assert_eq!(probe.embed_calls_for("dog"), 1);
    assert_eq!(probe.embed_calls_for("car"), 1);
    assert_eq!(scorer.last_context().as_deref(), Some("cat"));
}

#[test]
fn test_context_slot_skips_cache_lookup() {
    let (scorer, _) = scorer_with(animals());

    scorer.query("cat", "dog", false);
    let before = scorer.cache().stats();
    scorer.query("cat", "dog", false);
    let after = scorer.cache().stats();

    // Only the word goes through the cache the second time.
    assert_eq!(after.hits - before.hits, 1);
    assert_eq!(after.misses, before.misses);
}

#[test]
fn test_context_change_replaces_slot() {
    let (scorer, _) = scorer_with(animals());

    scorer.query("cat", "dog", false);
    scorer.query("dog", "cat", false);
    assert_eq!(scorer.last_context().as_deref(), Some("dog"));
}

#[test]
fn test_failed_context_overwrites_slot() {
    let oracle = animals().with_failure("broken", EmbeddingErrorKind::Inference);
    let (scorer, probe) = scorer_with(oracle);

    scorer.query("cat", "dog", false);
    assert_eq!(scorer.query("broken", "dog", false), 0.0);
    assert_eq!(scorer.last_context().as_deref(), Some("broken"));

    // The failure is held in the slot, so the same context is not retried.
    assert_eq!(scorer.query("broken", "car", false), 0.0);
    assert_eq!(probe.embed_calls_for("broken"), 1);

    // Returning to a previous context resolves it from the cache.
    assert!(scorer.query("cat", "dog", false) > 0.9);
    assert_eq!(probe.embed_calls_for("cat"), 1);
}

#[test]
fn test_word_resolved_even_when_context_fails() {
    let oracle = animals().with_failure("broken", EmbeddingErrorKind::Tokenization);
    let (scorer, probe) = scorer_with(oracle);

    assert_eq!(scorer.query("broken", "dog", false), 0.0);
    assert_eq!(probe.embed_calls_for("dog"), 1);
    assert!(scorer.cache().contains("dog"));
}

#[test]
fn test_score_reports_context_failure_first() {
    let oracle = animals()
        .with_failure("a", EmbeddingErrorKind::Tokenization)
        .with_failure("b", EmbeddingErrorKind::Inference);
    let (scorer, _) = scorer_with(oracle);

    let err = scorer.score("a", "b").unwrap_err();
    assert_eq!(
        err.embedding_failure(),
        Some((Side::Context, EmbeddingErrorKind::Tokenization))
    );
}

#[test]
fn test_score_reports_word_failure() {
    let oracle = animals().with_failure("b", EmbeddingErrorKind::Extraction);
    let (scorer, _) = scorer_with(oracle);

    let err = scorer.score("cat", "b").unwrap_err();
    assert_eq!(
        err.embedding_failure(),
        Some((Side::Word, EmbeddingErrorKind::Extraction))
    );
    assert!(err.to_string().starts_with("no word embedding"));
}

#[test]
fn test_uninitializable_oracle_scores_zero() {
    let (scorer, probe) = scorer_with(animals().failing_initialization());

    assert_eq!(scorer.query("cat", "dog", false), 0.0);
    assert_eq!(scorer.query("dog", "cat", false), 0.0);
    assert_eq!(scorer.query("cat", "car", true), 0.0);

    assert_eq!(probe.initialize_calls(), 1);
    assert_eq!(probe.total_embed_calls(), 0);
    assert!(scorer.cache().is_empty());

    let err = scorer.score("cat", "dog").unwrap_err();
    assert_eq!(
        err.embedding_failure(),
        Some((Side::Context, EmbeddingErrorKind::Initialization))
    );
}

#[test]
fn test_empty_inputs_score_zero() {
    let oracle = MockOracle::new(3)
        .with_embedding("cat", vec![1.0, 0.0, 0.0])
        .with_embedding("", vec![0.0, 0.0, 0.0]);
    let (scorer, _) = scorer_with(oracle);

    assert_eq!(scorer.query("", "cat", false), 0.0);
    assert_eq!(scorer.query("cat", "", false), 0.0);
}

#[test]
fn test_scorers_share_cache_but_not_slot() {
    let oracle = animals();
    let probe = oracle.probe();
    let cache = Arc::new(EmbeddingCache::new(Arc::new(OracleHandle::new(oracle))));

    let first = cache.scorer();
    let second = cache.scorer();

    first.query("cat", "dog", false);
    second.query("dog", "cat", false);

    assert_eq!(first.last_context().as_deref(), Some("cat"));
    assert_eq!(second.last_context().as_deref(), Some("dog"));
    assert_eq!(probe.embed_calls_for("cat"), 1);
    assert_eq!(probe.embed_calls_for("dog"), 1);
}

#[test]
fn test_grammar_is_object_safe() {
    let (scorer, _) = scorer_with(animals());
    let grammar: Box<dyn Grammar> = Box::new(scorer);
    assert_eq!(grammar.query("cat", "car", false), 0.0);
}

#[test]
fn test_concurrent_queries() {
    let oracle = MockOracle::new(16).with_seeded_fallback();
    let probe = oracle.probe();
    let cache = Arc::new(EmbeddingCache::new(Arc::new(OracleHandle::new(oracle))));
    let scorer = Arc::new(cache.scorer());

    let handles: Vec<_> = (0..8)
        .map(|t| {
            let scorer = Arc::clone(&scorer);
            std::thread::spawn(move || {
                for i in 0..50 {
                    let score = scorer.query(&format!("ctx{}", t % 2), &format!("w{}", i % 10), false);
                    assert!((0.0..=1.0 + 1e-6).contains(&score));
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(probe.initialize_calls(), 1);
    assert_eq!(cache.len(), 12);
    assert_eq!(probe.embed_calls_for("ctx0"), 1);
    assert_eq!(probe.embed_calls_for("w3"), 1);
    assert_eq!(probe.total_embed_calls(), 12);
}

#[test]
fn test_side_display() {
    assert_eq!(Side::Context.to_string(), "context");
    assert_eq!(Side::Word.as_str(), "word");
}
