//! Topical scoring harness.
//!
//! ```text
//! topical <context> <word>...     score each word against the context
//! topical < pairs.tsv             score `context<TAB>word` lines from stdin
//! topical --check                 load the model and report its state
//! ```

use std::io::{self, BufRead, Write};
use std::sync::Arc;

use anyhow::Context;
use mimalloc::MiMalloc;
use serde::Serialize;

use topical::cache::EmbeddingCache;
use topical::config::Config;
use topical::embedding::{GgufOracle, OracleHandle};
use topical::scoring::{Grammar, SimilarityScorer};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[derive(Serialize)]
struct ScoreLine<'a> {
    context: &'a str,
    word: &'a str,
    score: f64,
}

fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    let (threads_var, threads) = config.compute_threads_var();
    // SAFETY: no other threads exist yet, and the compute pool reads this on first use.
    unsafe {
        std::env::set_var(threads_var, threads);
    }

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    if let Err(e) = config.validate() {
        tracing::warn!(error = %e, "Invalid configuration, every query will score 0");
    }

    tracing::info!(
        model_path = %config.model_path.display(),
        context_len = config.context_len,
        pooling = %config.pooling,
        threads = config.threads,
        "Topical starting"
    );

    let oracle = Arc::new(OracleHandle::new(GgufOracle::new(config.gguf_config())));
    let cache = Arc::new(EmbeddingCache::with_limit(
        Arc::clone(&oracle),
        config.cache_limit,
    ));

    let args: Vec<String> = std::env::args().skip(1).collect();

    if args.iter().any(|arg| arg == "--check") {
        std::process::exit(run_check(&oracle));
    }

    let scorer = cache.scorer();
    let stdout = io::stdout();
    let mut out = stdout.lock();

    match args.split_first() {
        Some((context, words)) if !words.is_empty() => {
            for word in words {
                emit(&mut out, &scorer, context, word)?;
            }
        }
        Some(_) => anyhow::bail!("usage: topical <context> <word>... | topical --check"),
        None => {
            for line in io::stdin().lock().lines() {
                let line = line.context("failed to read stdin")?;
                let Some((context, word)) = line.split_once('\t') else {
                    if !line.trim().is_empty() {
                        tracing::warn!(line = %line, "Skipping line without a tab");
                    }
                    continue;
                };
                emit(&mut out, &scorer, context, word)?;
            }
        }
    }

    let stats = cache.stats();
    tracing::info!(
        hits = stats.hits,
        misses = stats.misses,
        failures = stats.failures,
        clears = stats.clears,
        cached = cache.len(),
        "Topical done"
    );

    oracle.release();
    Ok(())
}

fn emit(
    out: &mut impl Write,
    scorer: &SimilarityScorer,
    context: &str,
    word: &str,
) -> anyhow::Result<()> {
    let line = ScoreLine {
        context,
        word,
        score: scorer.query(context, word, false),
    };
    serde_json::to_writer(&mut *out, &line)?;
    writeln!(out)?;
    Ok(())
}

fn run_check(oracle: &OracleHandle) -> i32 {
    let result = oracle.initialize();
    let state = oracle.state();
    let report = serde_json::json!({
        "state": state.as_str(),
        "dim": oracle.dim(),
        "detail": state.to_string(),
    });
    println!("{}", report);

    oracle.release();
    if result.is_ok() { 0 } else { 1 }
}
