//! The `ask` command: grounded question answering over one document.

use anyhow::{bail, Result};

use synapse_core::ground::{answer, GroundingOptions};
use synapse_core::prompt::{personalities, personality, DEFAULT_PERSONALITY};
use synapse_core::timestamp::format_timestamp;

use crate::completion::OpenAiCompletion;
use crate::config::Config;
use crate::db;
use crate::embedding::create_embedder;
use crate::sqlite_store::SqliteStore;

#[allow(clippy::too_many_arguments)]
pub async fn run_ask(
    config: &Config,
    document_id: &str,
    question: &str,
    session: Option<&str>,
    personality_key: Option<&str>,
    timestamps: bool,
    show_sources: bool,
) -> Result<()> {
    let key = personality_key.unwrap_or(DEFAULT_PERSONALITY);
    let Some(persona) = personality(key) else {
        let known: Vec<&str> = personalities().iter().map(|p| p.key).collect();
        bail!("unknown personality '{key}'. Available: {}", known.join(", "));
    };

    let pool = db::connect(&config.db.path).await?;
    let store = SqliteStore::new(pool);
    let embedder = create_embedder(&config.embedding)?;
    let model = OpenAiCompletion::new(&config.completion)?;

    let options = GroundingOptions {
        top_k: config.retrieval.top_k,
        history_limit: config.retrieval.history_limit,
        max_tokens: config.completion.max_tokens,
        include_timestamps: timestamps,
    };
    let out = answer(
        &store,
        embedder.as_ref(),
        &model,
        &options,
        persona,
        document_id,
        session,
        question,
    )
    .await?;

    println!("{}", out.content);

    if !out.audio_references.is_empty() {
        println!();
        println!("Audio references:");
        for r in &out.audio_references {
            println!(
                "  {} (+{}s)  …{}…",
                format_timestamp(r.timestamp),
                r.duration.round() as i64,
                r.text
            );
        }
    }

    if show_sources {
        println!();
        println!("Sources:");
        for c in &out.relevant_chunks {
            println!("  [chunk {}] score {:.3}: {}", c.index, c.score, c.preview);
        }
    }

    println!();
    println!("session: {}", out.session_id);
    Ok(())
}

pub fn run_personalities() {
    for p in personalities() {
        let marker = if p.key == DEFAULT_PERSONALITY { "*" } else { " " };
        println!("{marker} {:<11} {} (temperature {})", p.key, p.name, p.temperature);
    }
}
