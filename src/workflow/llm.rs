//! Chat-completion HTTP client (§4.10 ambient addendum).
//!
//! Required by C8 but not enumerated as a numbered component: a thin
//! `reqwest`/`tokio` client over a chat-completion endpoint, distinguishing
//! transport failures (retried) from non-2xx application errors (surfaced
//! immediately — LLM calls are not blindly retried on 4xx).

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::LlmConfig;
use crate::error::{Result, WorkflowError};
use crate::net::{retry_with_backoff, Classified};

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

/// Talks to a chat-completion HTTP service.
pub struct LlmClient {
    client: reqwest::Client,
    base_url: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
    retry: crate::config::RetryConfig,
}

impl LlmClient {
    /// Builds a client from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(config: &LlmConfig, retry: crate::config::RetryConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.service.timeout_ms))
            .build()
            .map_err(WorkflowError::from)?;
        Ok(Self {
            client,
            base_url: config.service.base_url.clone(),
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            retry,
        })
    }

    /// Completes a chat turn with `system` and `user` messages, returning
    /// the assistant's text content.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::LlmTransport`] after retries are exhausted
    /// against timeouts/5xx, or [`WorkflowError::LlmUpstream`] immediately
    /// on a non-2xx application error.
    pub async fn complete(&self, system: &str, user: &str) -> Result<String> {
        let url = format!("{}/v1/chat/completions", self.base_url);
        let body = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage { role: "system", content: system },
                ChatMessage { role: "user", content: user },
            ],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        let outcome = retry_with_backoff(&self.retry, |_attempt| async {
            let response = match self.client.post(&url).json(&body).send().await {
                Ok(r) => r,
                Err(e) => return Err(Classified::Retry(WorkflowError::from(e))),
            };

            let status = response.status();
            if status.is_server_error() || status.as_u16() == 429 {
                let message = response.text().await.unwrap_or_default();
                return Err(Classified::Retry(WorkflowError::LlmUpstream {
                    status: status.as_u16(),
                    message,
                }));
            }
            if !status.is_success() {
                let message = response.text().await.unwrap_or_default();
                return Err(Classified::Fatal(WorkflowError::LlmUpstream {
                    status: status.as_u16(),
                    message,
                }));
            }

            match response.json::<ChatResponse>().await {
                Ok(parsed) => Ok(parsed),
                Err(e) => Err(Classified::Fatal(WorkflowError::from(e))),
            }
        })
        .await;

        let parsed = outcome.map_err(|exhausted| {
            if exhausted.attempts > 1 {
                WorkflowError::LlmTransport(format!(
                    "retries exhausted after {} attempts: {}",
                    exhausted.attempts, exhausted.error
                ))
            } else {
                exhausted.error
            }
        })?;

        Ok(parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_response_parses_first_choice() {
        let raw = serde_json::json!({
            "choices": [{"message": {"role": "assistant", "content": "hello"}}]
        });
        let parsed: ChatResponse = serde_json::from_value(raw).unwrap();
        assert_eq!(parsed.choices[0].message.content, "hello");
    }
}
