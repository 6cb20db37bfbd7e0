#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No LLM credential is configured. Checked before any network call.
    #[error("OPENAI_API_KEY not configured")]
    Configuration,

    /// Non-success response from the LLM API. The body is truncated so the
    /// message stays readable in job records and progress events.
    #[error("OpenAI API {status}: {body}")]
    Upstream { status: u16, body: String },

    /// No caption track in any attempted language/variant combination.
    #[error("No subtitles found (tried: {})", attempted.join(", "))]
    NoSubtitles { attempted: Vec<String> },

    #[error("HTTP error: {0}")]
    Request(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    const BODY_SNIPPET_LEN: usize = 300;

    pub fn upstream(status: u16, body: &str) -> Self {
        Error::Upstream {
            status,
            body: body.chars().take(Self::BODY_SNIPPET_LEN).collect(),
        }
    }
}
