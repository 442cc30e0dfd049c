//! The `status` command: inspect ingestion state for one document or
//! list them all.

use anyhow::{bail, Result};

use synapse_core::models::Document;
use synapse_core::store::DocumentStore;

use crate::config::Config;
use crate::db;
use crate::sqlite_store::SqliteStore;

pub async fn run_status(config: &Config, id: Option<&str>) -> Result<()> {
    let pool = db::connect(&config.db.path).await?;
    let store = SqliteStore::new(pool);

    match id {
        Some(id) => {
            let Some(doc) = store.get_document(id).await? else {
                bail!("document not found: {id}");
            };
            print_document(&doc);
        }
        None => {
            let documents = store.list_documents().await?;
            if documents.is_empty() {
                println!("No documents.");
                return Ok(());
            }
            for doc in documents {
                println!(
                    "{}  {:<10} {:>3}%  {}",
                    doc.id,
                    doc.status.as_str(),
                    doc.processing_progress,
                    doc.title
                );
            }
        }
    }
    Ok(())
}

fn print_document(doc: &Document) {
    println!("id:       {}", doc.id);
    println!("title:    {}", doc.title);
    println!("type:     {}", doc.file_type.mime());
    println!("size:     {} bytes", doc.size_bytes);
    println!("status:   {}", doc.status.as_str());
    println!("progress: {}%", doc.processing_progress);
    if let Some(duration) = doc.audio_duration {
        println!(
            "duration: {}",
            synapse_core::timestamp::format_timestamp(duration)
        );
    }
    if let Some(error) = &doc.error {
        println!("error:    {error}");
    }
}
