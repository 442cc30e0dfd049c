//! Format-specific text extraction.
//!
//! Dispatches on the document's declared [`FileType`]: PDFs go through
//! `pdf-extract` (with `lopdf` supplying the page count), markdown is
//! stripped to prose, plain text is whitespace-normalized, and audio
//! is handed to the configured [`Transcriber`]. Every branch returns
//! normalized text plus format metadata.

use async_trait::async_trait;
use std::sync::Arc;

use synapse_core::error::PipelineError;
use synapse_core::models::{ExtractionMetadata, FileType};
use synapse_core::normalize::{normalize_whitespace, strip_markdown};
use synapse_core::services::{Extraction, Extractor, Transcriber};

pub struct SynapseExtractor {
    transcriber: Arc<dyn Transcriber>,
}

impl SynapseExtractor {
    pub fn new(transcriber: Arc<dyn Transcriber>) -> Self {
        Self { transcriber }
    }

    fn extract_pdf(bytes: &[u8]) -> Result<Extraction, PipelineError> {
        let text = pdf_extract::extract_text_from_mem(bytes)
            .map_err(|e| PipelineError::Extraction(format!("PDF text extraction failed: {e}")))?;
        let page_count = lopdf::Document::load_mem(bytes)
            .map_err(|e| PipelineError::Extraction(format!("PDF parse failed: {e}")))?
            .get_pages()
            .len();
        Ok(Extraction {
            content: normalize_whitespace(&text),
            metadata: ExtractionMetadata::Pdf { page_count },
        })
    }

    fn decode_utf8(bytes: &[u8]) -> Result<String, PipelineError> {
        String::from_utf8(bytes.to_vec())
            .map_err(|e| PipelineError::Extraction(format!("text is not valid UTF-8: {e}")))
    }

    async fn extract_audio(&self, bytes: &[u8], mime: &str) -> Result<Extraction, PipelineError> {
        let transcript = self.transcriber.transcribe(bytes, mime).await?;
        Ok(Extraction {
            content: normalize_whitespace(&transcript.text),
            metadata: ExtractionMetadata::Audio {
                duration_secs: transcript.duration_secs,
                words: transcript.words,
            },
        })
    }
}

#[async_trait]
impl Extractor for SynapseExtractor {
    async fn extract(
        &self,
        bytes: &[u8],
        file_type: &FileType,
    ) -> Result<Extraction, PipelineError> {
        match file_type {
            FileType::Pdf => Self::extract_pdf(bytes),
            FileType::Markdown => Ok(Extraction {
                content: strip_markdown(&Self::decode_utf8(bytes)?),
                metadata: ExtractionMetadata::Text,
            }),
            FileType::PlainText => Ok(Extraction {
                content: normalize_whitespace(&Self::decode_utf8(bytes)?),
                metadata: ExtractionMetadata::Text,
            }),
            FileType::Audio { mime } => self.extract_audio(bytes, mime).await,
        }
    }
}

/// Map a file extension to a supported MIME type.
pub fn mime_for_extension(ext: &str) -> Option<&'static str> {
    match ext.to_ascii_lowercase().as_str() {
        "pdf" => Some("application/pdf"),
        "md" | "markdown" => Some("text/markdown"),
        "txt" => Some("text/plain"),
        "mp3" => Some("audio/mpeg"),
        "wav" => Some("audio/wav"),
        "m4a" => Some("audio/mp4"),
        "ogg" => Some("audio/ogg"),
        "flac" => Some("audio/flac"),
        _ => None,
    }
}
