use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Default summarization prompt shipped with the application. Ends with a
/// trailing `Transkript:` marker that the summarizer strips and re-appends.
pub const DEFAULT_SUMMARY_PROMPT: &str = include_str!("./prompts/summary_prompt.txt");

/// Lifecycle state of a summarization job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Processing,
    Done,
    Error,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Processing => "processing",
            JobStatus::Done => "done",
            JobStatus::Error => "error",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "processing" => Some(JobStatus::Processing),
            "done" => Some(JobStatus::Done),
            "error" => Some(JobStatus::Error),
            _ => None,
        }
    }
}

/// One durable record tracking the full lifecycle of summarizing a video.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: String,
    pub video_id: String,
    pub video_url: String,
    pub video_title: String,
    pub channel_name: String,
    /// The speaker making the claims, distinct from the channel owner.
    pub author: String,
    pub thumbnail_url: String,
    pub lang: String,
    pub transcript: String,
    pub summary: String,
    /// Prompt template that was active when the summary was produced.
    pub custom_prompt: String,
    pub status: JobStatus,
    pub error_message: String,
    pub created_at: DateTime<Utc>,
}

/// Fields needed to create a fresh `processing` job row.
#[derive(Debug, Clone)]
pub struct NewJob {
    pub id: String,
    pub video_id: String,
    pub video_url: String,
    pub video_title: String,
    pub channel_name: String,
    pub thumbnail_url: String,
    pub lang: String,
}

/// One extracted asset/direction/target forecast tied to a job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prediction {
    pub id: String,
    pub job_id: String,
    pub video_title: String,
    pub video_url: String,
    pub channel_name: String,
    pub author: String,
    pub asset_name: String,
    pub direction: String,
    pub if_cases: String,
    pub price_target: String,
    pub created_at: DateTime<Utc>,
}

/// A prediction row as it leaves the extractor, before an id is assigned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPrediction {
    pub job_id: String,
    pub video_title: String,
    pub video_url: String,
    pub channel_name: String,
    pub author: String,
    pub asset_name: String,
    pub direction: String,
    pub if_cases: String,
    pub price_target: String,
}

/// Process-wide behavioral settings. Seeded with defaults on first run and
/// re-read at the start of every job so edits apply to the next submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub summary_prompt: String,
    pub default_lang: String,
    pub cookie_browser: String,
    pub openai_model: String,
    pub blocked_channels: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            summary_prompt: DEFAULT_SUMMARY_PROMPT.to_string(),
            default_lang: "de".to_string(),
            cookie_browser: "brave".to_string(),
            openai_model: "gpt-4o".to_string(),
            blocked_channels: Vec::new(),
        }
    }
}
