use reqwest::Client;
use serde::Deserialize;

use crate::{error::Error, llm::LlmClient};

pub struct OpenAIClient {
    client: Client,
    api_key: Option<String>,
    base_url: String,
}

impl OpenAIClient {
    const TEMPERATURE: f32 = 0.3;

    pub fn new(api_key: Option<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.filter(|k| !k.is_empty()),
            base_url: "https://api.openai.com/v1".into(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub async fn send_completion_request(
        &self,
        model: &str,
        system_prompt: &str,
        user_content: &str,
        max_tokens: u32,
    ) -> Result<CompletionResponse, Error> {
        let api_key = self.api_key.as_deref().ok_or(Error::Configuration)?;

        let body = serde_json::json!({
            "model": model,
            "messages": [
                {
                    "role": "system",
                    "content": system_prompt
                },
                {
                    "role": "user",
                    "content": user_content
                }
            ],
            "temperature": Self::TEMPERATURE,
            "max_tokens": max_tokens,
        });

        let resp = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .inspect_err(|e| tracing::error!(error = %e, "Failed to make http request"))?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let message = resp.text().await.unwrap_or_default();
            return Err(Error::upstream(status, &message));
        }

        Ok(resp.json::<CompletionResponse>().await?)
    }
}

#[derive(Debug, Deserialize)]
pub struct CompletionResponse {
    pub choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
pub struct CompletionChoice {
    pub message: CompletionMessage,
}

#[derive(Debug, Deserialize)]
pub struct CompletionMessage {
    pub content: Option<String>,
}

impl LlmClient for OpenAIClient {
    fn ensure_configured(&self) -> Result<(), Error> {
        if self.api_key.is_none() {
            return Err(Error::Configuration);
        }
        Ok(())
    }

    async fn complete(
        &self,
        model: &str,
        system_prompt: &str,
        user_content: &str,
        max_tokens: u32,
    ) -> Result<String, Error> {
        let response = self
            .send_completion_request(model, system_prompt, user_content, max_tokens)
            .await
            .inspect_err(|e| tracing::error!(error = %e, "Completion request failed"))?;

        // An empty completion is not an error, downstream handles "".
        Ok(response
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_credential_fails_before_any_network_call() {
        let client = OpenAIClient::new(None).with_base_url("http://127.0.0.1:1");
        let result = client.complete("gpt-4o", "system", "user", 100).await;
        assert!(matches!(result, Err(Error::Configuration)));
    }

    #[test]
    fn empty_credential_counts_as_unconfigured() {
        let client = OpenAIClient::new(Some(String::new()));
        assert!(matches!(
            client.ensure_configured(),
            Err(Error::Configuration)
        ));
    }

    #[test]
    fn present_credential_passes_the_check() {
        let client = OpenAIClient::new(Some("sk-test".into()));
        assert!(client.ensure_configured().is_ok());
    }
}
