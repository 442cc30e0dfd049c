//! The `get` command: print a document's extracted content and chunks.

use anyhow::{bail, Result};

use synapse_core::store::DocumentStore;
use synapse_core::timestamp::format_timestamp;

use crate::config::Config;
use crate::db;
use crate::sqlite_store::SqliteStore;

pub async fn run_get(config: &Config, id: &str, show_chunks: bool) -> Result<()> {
    let pool = db::connect(&config.db.path).await?;
    let store = SqliteStore::new(pool);

    let Some(doc) = store.get_document(id).await? else {
        bail!("document not found: {id}");
    };

    println!("# {} ({})", doc.title, doc.file_type.mime());
    println!("status: {} ({}%)", doc.status.as_str(), doc.processing_progress);
    match &doc.content {
        Some(content) => {
            println!();
            println!("{content}");
        }
        None => println!("(no extracted content yet)"),
    }

    if show_chunks {
        let chunks = store.document_chunks(id).await?;
        println!();
        println!("── {} chunks ──", chunks.len());
        for chunk in chunks {
            let range = match (chunk.metadata.start_time, chunk.metadata.end_time) {
                (Some(s), Some(e)) => {
                    format!(" [{} - {}]", format_timestamp(s), format_timestamp(e))
                }
                _ => String::new(),
            };
            println!(
                "[{}] chars {}..{}{}",
                chunk.index, chunk.metadata.start_offset, chunk.metadata.end_offset, range
            );
        }
    }
    Ok(())
}
