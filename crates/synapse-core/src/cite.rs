//! Citation extraction: mapping timestamp markers in generated text
//! back to source chunks.
//!
//! Grounded completions over audio documents are instructed to cite
//! positions inline as `[M:SS]` or `[H:MM:SS]`. This module scans the
//! response for those markers and resolves each one to the first
//! candidate chunk whose time window contains it, producing
//! [`AudioReference`]s the UI can turn into playable links.
//!
//! Markers that land in no chunk's window are silently dropped — the
//! model cited a time we cannot back, so there is nothing to link.

use regex::Regex;

use crate::models::{AudioReference, ContentChunk};
use crate::timestamp::parse_timestamp;

/// Window length assumed when a chunk has a start time but no end time.
const DEFAULT_WINDOW_SECS: f64 = 300.0;

/// Duration reported when a chunk has no end time.
const DEFAULT_DURATION_SECS: f64 = 30.0;

/// Characters of response text captured before and after a marker.
const EXCERPT_BEFORE: usize = 50;
const EXCERPT_AFTER: usize = 100;

/// Extract audio references from `response` against `candidates`.
///
/// References come back in the order their markers appear in the text,
/// not sorted by timestamp value. Candidates without a `start_time`
/// are never matched.
pub fn extract_audio_references(
    response: &str,
    candidates: &[ContentChunk],
) -> Vec<AudioReference> {
    // Fixed pattern; compilation cannot fail.
    let marker = Regex::new(r"\[(\d{1,2}:\d{2}(?::\d{2})?)\]").expect("valid timestamp pattern");

    let mut references = Vec::new();
    for m in marker.captures_iter(response) {
        let whole = m.get(0).expect("capture 0 always present");
        let Some(seconds) = parse_timestamp(&m[1]) else {
            continue;
        };
        let Some(chunk) = containing_chunk(candidates, seconds) else {
            continue;
        };

        let duration = match (chunk.metadata.start_time, chunk.metadata.end_time) {
            (Some(start), Some(end)) => end - start,
            _ => DEFAULT_DURATION_SECS,
        };

        references.push(AudioReference {
            timestamp: seconds,
            duration,
            text: excerpt_around(response, whole.start(), whole.end()),
            chunk_id: chunk.id.clone(),
        });
    }
    references
}

/// First candidate whose `[start, end | start+300]` window contains
/// `seconds`.
fn containing_chunk(candidates: &[ContentChunk], seconds: f64) -> Option<&ContentChunk> {
    candidates.iter().find(|chunk| {
        let Some(start) = chunk.metadata.start_time else {
            return false;
        };
        let end = chunk
            .metadata
            .end_time
            .unwrap_or(start + DEFAULT_WINDOW_SECS);
        start <= seconds && seconds <= end
    })
}

/// The marker plus up to 50 characters before and 100 after it.
fn excerpt_around(text: &str, marker_start: usize, marker_end: usize) -> String {
    let before: String = {
        let mut chars: Vec<char> = text[..marker_start]
            .chars()
            .rev()
            .take(EXCERPT_BEFORE)
            .collect();
        chars.reverse();
        chars.into_iter().collect()
    };
    let after: String = text[marker_end..].chars().take(EXCERPT_AFTER).collect();
    format!("{}{}{}", before, &text[marker_start..marker_end], after)
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ChunkMetadata;

    fn audio_chunk(id: &str, start: Option<f64>, end: Option<f64>) -> ContentChunk {
        ContentChunk {
            id: id.to_string(),
            document_id: "doc".to_string(),
            index: 0,
            content: String::new(),
            embedding: Vec::new(),
            metadata: ChunkMetadata {
                start_offset: 0,
                end_offset: 0,
                start_time: start,
                end_time: end,
                page_number: None,
            },
        }
    }

    #[test]
    fn marker_inside_window_produces_reference() {
        let chunks = vec![audio_chunk("c1", Some(100.0), Some(130.0))];
        let refs = extract_audio_references("See [2:05] for details", &chunks);
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].timestamp, 125.0);
        assert_eq!(refs[0].chunk_id, "c1");
        assert_eq!(refs[0].duration, 30.0);
        assert!(refs[0].text.contains("[2:05]"));
    }

    #[test]
    fn missing_end_time_uses_five_minute_window_and_default_duration() {
        let chunks = vec![audio_chunk("c1", Some(100.0), None)];
        let refs = extract_audio_references("around [6:40] it changes", &chunks);
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].timestamp, 400.0);
        assert_eq!(refs[0].duration, DEFAULT_DURATION_SECS);

        // 100 + 300 = 400 is the window edge; 401 falls outside.
        let refs = extract_audio_references("later at [6:41]", &chunks);
        assert!(refs.is_empty());
    }

    #[test]
    fn unmatched_markers_are_silently_dropped() {
        let chunks = vec![audio_chunk("c1", Some(100.0), Some(130.0))];
        let refs = extract_audio_references("intro at [0:10], detail at [2:10]", &chunks);
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].timestamp, 130.0);
    }

    #[test]
    fn chunks_without_start_time_are_skipped() {
        let chunks = vec![
            audio_chunk("c0", None, None),
            audio_chunk("c1", Some(0.0), Some(60.0)),
        ];
        let refs = extract_audio_references("[0:30]", &chunks);
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].chunk_id, "c1");
    }

    #[test]
    fn references_keep_marker_order_not_timestamp_order() {
        let chunks = vec![audio_chunk("c1", Some(0.0), Some(4000.0))];
        let refs =
            extract_audio_references("first [55:00], then back to [2:05]", &chunks);
        assert_eq!(refs.len(), 2);
        assert_eq!(refs[0].timestamp, 3300.0);
        assert_eq!(refs[1].timestamp, 125.0);
    }

    #[test]
    fn hour_format_markers_parse() {
        let chunks = vec![audio_chunk("c1", Some(3700.0), Some(3800.0))];
        let refs = extract_audio_references("deep in at [1:02:30]", &chunks);
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].timestamp, 3750.0);
    }

    #[test]
    fn excerpt_is_bounded_context_around_marker() {
        let chunks = vec![audio_chunk("c1", Some(0.0), Some(600.0))];
        let long_before = "b".repeat(300);
        let long_after = "a".repeat(300);
        let text = format!("{long_before} [2:05] {long_after}");
        let refs = extract_audio_references(&text, &chunks);
        assert_eq!(refs.len(), 1);
        // 50 before + marker (6) + space + 100 after, trimmed.
        assert!(refs[0].text.chars().count() <= 50 + 6 + 2 + 100);
        assert!(refs[0].text.contains("[2:05]"));
    }

    #[test]
    fn no_markers_means_no_references() {
        let chunks = vec![audio_chunk("c1", Some(0.0), Some(60.0))];
        assert!(extract_audio_references("plain prose, nothing cited", &chunks).is_empty());
    }
}
