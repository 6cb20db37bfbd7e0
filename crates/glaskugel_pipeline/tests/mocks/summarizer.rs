use std::sync::{Arc, Mutex};

use glaskugel_pipeline::{Error, Summarizer, SummaryOptions};

#[derive(Clone)]
pub struct MockSummarizer {
    pub summary: String,
    pub calls: Arc<Mutex<Vec<String>>>,
    pub fail_with: Option<String>,
    pub unconfigured: bool,
}

impl MockSummarizer {
    pub fn new(summary: &str) -> Self {
        Self {
            summary: summary.to_string(),
            calls: Arc::new(Mutex::new(Vec::new())),
            fail_with: None,
            unconfigured: false,
        }
    }

    pub fn failing(msg: &str) -> Self {
        Self {
            fail_with: Some(msg.to_string()),
            ..Self::new("")
        }
    }

    /// Simulates a missing LLM credential.
    pub fn unconfigured() -> Self {
        Self {
            unconfigured: true,
            ..Self::new("")
        }
    }
}

impl Summarizer for MockSummarizer {
    type Error = Error;

    fn ensure_ready(&self) -> Result<(), Error> {
        if self.unconfigured {
            return Err(Error::Configuration);
        }
        Ok(())
    }

    async fn summarize(
        &self,
        transcript: &str,
        _opts: SummaryOptions<'_>,
    ) -> Result<String, Error> {
        self.calls.lock().unwrap().push(transcript.to_string());
        if let Some(ref msg) = self.fail_with {
            return Err(Error::upstream(500, msg));
        }
        Ok(self.summary.clone())
    }
}
