//! Prompt and context assembly for grounded completions, plus the
//! built-in tutor personality table.
//!
//! Retrieved chunks are concatenated under `[Chunk N]` labels (or
//! `[Chunk N - Audio M:SS to M:SS]` when timestamps are requested and
//! available) so the model can cite them; the system prompt tells it
//! to do so and, for audio material, to emit inline `[M:SS]` /
//! `[H:MM:SS]` markers that the citation extractor can resolve.

use crate::models::{ChatMessage, ScoredChunk};
use crate::timestamp::format_timestamp;

/// A tutor personality: a fixed system-prompt flavor and sampling
/// temperature. The table is immutable, compiled-in configuration —
/// selected by key at request time, never mutated.
#[derive(Debug, Clone, Copy)]
pub struct Personality {
    pub key: &'static str,
    pub name: &'static str,
    /// Prompt fragment describing tone and method.
    pub style: &'static str,
    pub temperature: f32,
}

/// Key of the personality used when none is requested.
pub const DEFAULT_PERSONALITY: &str = "tutor";

const PERSONALITIES: [Personality; 4] = [
    Personality {
        key: "tutor",
        name: "Study Tutor",
        style: "You are a patient study tutor. Explain clearly and check \
                understanding with short follow-up prompts.",
        temperature: 0.7,
    },
    Personality {
        key: "socratic",
        name: "Socratic Guide",
        style: "You teach by questioning. Rather than stating answers \
                outright, lead the student toward them with pointed \
                questions, confirming or correcting their reasoning.",
        temperature: 0.8,
    },
    Personality {
        key: "concise",
        name: "Concise Explainer",
        style: "You answer in the fewest words that remain accurate. No \
                preamble, no filler.",
        temperature: 0.3,
    },
    Personality {
        key: "quizmaster",
        name: "Quiz Master",
        style: "You are an energetic quiz host. After answering, offer a \
                quick practice question on the same material.",
        temperature: 0.9,
    },
];

/// All built-in personalities, in display order.
pub fn personalities() -> &'static [Personality] {
    &PERSONALITIES
}

/// Look up a personality by key.
pub fn personality(key: &str) -> Option<&'static Personality> {
    PERSONALITIES.iter().find(|p| p.key == key)
}

/// Concatenate retrieved chunks into a labeled context block.
///
/// Labels are 1-based. A chunk is labeled with its audio range only
/// when `include_timestamps` is set and the chunk carries a start
/// time; otherwise the plain `[Chunk N]` form is used.
pub fn build_context(chunks: &[ScoredChunk], include_timestamps: bool) -> String {
    let mut out = String::new();
    for (i, scored) in chunks.iter().enumerate() {
        if i > 0 {
            out.push_str("\n\n");
        }
        let meta = &scored.chunk.metadata;
        match (include_timestamps, meta.start_time, meta.end_time) {
            (true, Some(start), Some(end)) => {
                out.push_str(&format!(
                    "[Chunk {} - Audio {} to {}]\n",
                    i + 1,
                    format_timestamp(start),
                    format_timestamp(end)
                ));
            }
            _ => {
                out.push_str(&format!("[Chunk {}]\n", i + 1));
            }
        }
        out.push_str(&scored.chunk.content);
    }
    out
}

/// System prompt for a grounded answer.
pub fn system_prompt(personality: &Personality, timestamps_relevant: bool) -> String {
    let mut prompt = format!(
        "{}\n\nAnswer using only the numbered excerpts from the student's \
         document provided in the message. Cite the excerpts you draw on \
         as [Chunk N]. If the excerpts do not contain the answer, say so \
         rather than guessing.",
        personality.style
    );
    if timestamps_relevant {
        prompt.push_str(
            "\n\nThe excerpts come from an audio recording and are labeled \
             with their time ranges. When you reference a specific moment, \
             include an inline timestamp marker formatted as [M:SS] or \
             [H:MM:SS] so it can be linked to the recording.",
        );
    }
    prompt
}

/// User prompt: recent conversation, labeled context, and the question.
pub fn build_user_prompt(history: &[ChatMessage], context: &str, question: &str) -> String {
    let mut prompt = String::new();
    if !history.is_empty() {
        prompt.push_str("Previous conversation:\n");
        for message in history {
            prompt.push_str(&format!("{}: {}\n", message.role.as_str(), message.content));
        }
        prompt.push('\n');
    }
    prompt.push_str("Document excerpts:\n");
    prompt.push_str(context);
    prompt.push_str("\n\nQuestion: ");
    prompt.push_str(question);
    prompt
}
