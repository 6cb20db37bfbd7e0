//! Chunking summarizer: drives LLM calls over a transcript, splitting long
//! transcripts into overlapping word windows and merging the partial results
//! into one coherent summary.

use std::{future::Future, sync::LazyLock};

use regex::Regex;

use crate::{error::Error, llm::LlmClient};

/// Transcripts up to this many words go to the LLM in a single call.
pub const MAX_CHUNK_WORDS: usize = 12_000;
/// Adjacent windows share this many words so claims at a boundary are not
/// cut in half.
pub const OVERLAP_WORDS: usize = 200;

const DEFAULT_MAX_TOKENS: u32 = 4000;

const CHUNK_SYSTEM_PROMPT: &str = include_str!("./llm/prompts/chunk_extract.txt");

const MERGE_USER_PREFIX: &str = "Hier sind die extrahierten Informationen aus allen Teilen \
     des Videos. Erstelle daraus eine einzige, vollständige Zusammenfassung:\n\n";

static TRANSCRIPT_MARKER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Transkript:\s*$").unwrap());

/// Optional video metadata prepended to every LLM call.
#[derive(Debug, Clone, Default)]
pub struct TranscriptContext {
    pub title: Option<String>,
    pub channel: Option<String>,
}

/// Per-call knobs resolved by the caller from the settings snapshot.
pub struct SummaryOptions<'a> {
    pub model: &'a str,
    pub prompt_template: &'a str,
    pub context: Option<&'a TranscriptContext>,
    /// Invoked before each network call with a human-readable status line.
    /// Advisory only, never awaited, never affects control flow.
    pub on_progress: Option<&'a (dyn Fn(&str) + Send + Sync)>,
}

pub trait Summarizer {
    type Error: Into<anyhow::Error> + Send;

    /// Cheap readiness check so a job can fail before its summarizing step
    /// is ever announced.
    fn ensure_ready(&self) -> Result<(), Self::Error>;

    fn summarize(
        &self,
        transcript: &str,
        opts: SummaryOptions<'_>,
    ) -> impl Future<Output = Result<String, Self::Error>> + Send;
}

pub(crate) fn count_words(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Splits into overlapping word windows of at most `max_words`. The final
/// window is clipped to the exact transcript length, never padded.
pub(crate) fn split_into_chunks(text: &str, max_words: usize) -> Vec<String> {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.len() <= max_words {
        return vec![text.to_string()];
    }

    let step = max_words.saturating_sub(OVERLAP_WORDS).max(1);
    let mut chunks = Vec::new();
    let mut start = 0;
    loop {
        let end = usize::min(start + max_words, words.len());
        chunks.push(words[start..end].join(" "));
        if end == words.len() {
            break;
        }
        start += step;
    }

    chunks
}

fn strip_transcript_marker(template: &str) -> String {
    TRANSCRIPT_MARKER_RE.replace(template, "").trim().to_string()
}

fn meta_header(context: Option<&TranscriptContext>) -> String {
    let Some(ctx) = context else {
        return String::new();
    };
    let mut lines = Vec::new();
    if let Some(title) = ctx.title.as_deref().filter(|t| !t.is_empty()) {
        lines.push(format!("Videotitel: {title}"));
    }
    if let Some(channel) = ctx.channel.as_deref().filter(|c| !c.is_empty()) {
        lines.push(format!("Kanal: {channel}"));
    }
    lines.join("\n")
}

/// `Summarizer` over any `LlmClient`: single call for short transcripts,
/// chunk-extract-merge for long ones.
pub struct ChunkSummarizer<C> {
    client: C,
    max_chunk_words: usize,
}

impl<C> ChunkSummarizer<C> {
    pub fn new(client: C) -> Self {
        Self {
            client,
            max_chunk_words: MAX_CHUNK_WORDS,
        }
    }

    /// Test hook for exercising the chunked path with small transcripts.
    pub fn with_chunk_limit(mut self, max_chunk_words: usize) -> Self {
        self.max_chunk_words = max_chunk_words;
        self
    }
}

impl<C: LlmClient + Send + Sync> Summarizer for ChunkSummarizer<C> {
    type Error = Error;

    fn ensure_ready(&self) -> Result<(), Error> {
        self.client.ensure_configured()
    }

    async fn summarize(
        &self,
        transcript: &str,
        opts: SummaryOptions<'_>,
    ) -> Result<String, Error> {
        let progress = |msg: String| {
            if let Some(cb) = opts.on_progress {
                cb(&msg);
            }
        };

        let word_count = count_words(transcript);
        let prompt_text = strip_transcript_marker(opts.prompt_template);
        let meta = meta_header(opts.context);
        let user_prefix = if meta.is_empty() {
            String::new()
        } else {
            format!("{meta}\n\nTranskript:\n")
        };

        if word_count <= self.max_chunk_words {
            progress(format!("Zusammenfassung läuft ({word_count} Wörter)..."));
            return self
                .client
                .complete(
                    opts.model,
                    &prompt_text,
                    &format!("{user_prefix}{transcript}"),
                    DEFAULT_MAX_TOKENS,
                )
                .await;
        }

        let chunks = split_into_chunks(transcript, self.max_chunk_words);
        progress(format!(
            "Transkript zu lang ({word_count} Wörter) — wird in {} Teile aufgeteilt...",
            chunks.len()
        ));

        let chunk_meta = if meta.is_empty() {
            String::new()
        } else {
            format!("{meta}\n\n")
        };

        let mut chunk_results = Vec::with_capacity(chunks.len());
        for (i, chunk) in chunks.iter().enumerate() {
            progress(format!(
                "Teil {}/{} wird analysiert ({} Wörter)...",
                i + 1,
                chunks.len(),
                count_words(chunk)
            ));
            let system = format!(
                "{CHUNK_SYSTEM_PROMPT}\n\nDies ist Teil {} von {}.",
                i + 1,
                chunks.len()
            );
            let result = self
                .client
                .complete(
                    opts.model,
                    &system,
                    &format!("{chunk_meta}{chunk}"),
                    DEFAULT_MAX_TOKENS,
                )
                .await?;
            chunk_results.push(result);
        }

        progress("Ergebnisse werden zur finalen Zusammenfassung kombiniert...".to_string());
        let merged_input = chunk_results
            .iter()
            .enumerate()
            .map(|(i, r)| format!("--- Teil {} ---\n{r}", i + 1))
            .collect::<Vec<_>>()
            .join("\n\n");
        let merge_prefix = if meta.is_empty() {
            MERGE_USER_PREFIX.to_string()
        } else {
            format!("{meta}\n\n{MERGE_USER_PREFIX}")
        };

        self.client
            .complete(
                opts.model,
                &prompt_text,
                &format!("{merge_prefix}{merged_input}"),
                DEFAULT_MAX_TOKENS,
            )
            .await
    }
}
