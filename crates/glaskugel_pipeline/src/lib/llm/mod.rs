use std::future::Future;

use crate::error::Error;

pub mod openai;

/// One chat-completion round trip against an LLM API.
pub trait LlmClient {
    /// Fails fast with `Error::Configuration` when no credential is set,
    /// without touching the network.
    fn ensure_configured(&self) -> Result<(), Error>;

    fn complete(
        &self,
        model: &str,
        system_prompt: &str,
        user_content: &str,
        max_tokens: u32,
    ) -> impl Future<Output = Result<String, Error>> + Send;
}
