mod error;
mod events;
mod extractor;
mod llm;
mod pipeline;
mod summarizer;
pub mod tracing;
pub mod yt;

pub use error::Error;
pub use events::{BusMessage, EventBus, ProgressEvent, ProgressStep};
pub use extractor::{extract_summary_meta, PredictionRow, SummaryMeta};
pub use llm::{openai, LlmClient};
pub use pipeline::{builder::SummaryPipelineBuilder, SubmitRequest, SummaryPipeline};
pub use summarizer::{
    ChunkSummarizer, Summarizer, SummaryOptions, TranscriptContext, MAX_CHUNK_WORDS,
    OVERLAP_WORDS,
};
