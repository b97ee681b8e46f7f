//! HTTP-backed [`Embedder`](crate::embedding::Embedder) implementation.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::{EmbeddingConfig, RetryConfig};
use crate::embedding::Embedder;
use crate::error::{EmbeddingError, Result};
use crate::io::unicode::find_char_boundary;
use crate::net::{retry_with_backoff, Classified};

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    texts: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    batch_size: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

#[derive(Debug, Deserialize)]
struct HealthResponse {
    model: String,
    dimension: usize,
}

/// Talks to a remote embedding service over HTTP.
pub struct HttpEmbedder {
    client: reqwest::Client,
    base_url: String,
    model: Option<String>,
    batch_size: usize,
    truncate_bytes: usize,
    retry: RetryConfig,
    dimension: usize,
    model_name: String,
}

impl HttpEmbedder {
    /// Connects to the embedding service, confirming its declared model
    /// and dimension via `GET /health`.
    ///
    /// # Errors
    ///
    /// Returns an error if the client cannot be built or the health check
    /// fails.
    pub async fn connect(config: &EmbeddingConfig, retry: RetryConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.service.timeout_ms))
            .build()
            .map_err(EmbeddingError::from)?;

        let health: HealthResponse = client
            .get(format!("{}/health", config.service.base_url))
            .send()
            .await
            .map_err(EmbeddingError::from)?
            .json()
            .await
            .map_err(EmbeddingError::from)?;

        Ok(Self {
            client,
            base_url: config.service.base_url.clone(),
            model: None,
            batch_size: config.batch_size.max(1),
            truncate_bytes: config.truncate_bytes,
            retry,
            dimension: health.dimension,
            model_name: health.model,
        })
    }

    async fn encode_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let url = format!("{}/embeddings", self.base_url);
        let model = self.model.as_deref();

        let outcome = retry_with_backoff(&self.retry, |_attempt| async {
            let body = EmbedRequest {
                texts,
                model,
                batch_size: Some(texts.len()),
            };
            let response = match self.client.post(&url).json(&body).send().await {
                Ok(r) => r,
                Err(e) => return Err(Classified::Retry(EmbeddingError::from(e))),
            };

            let status = response.status();
            if status.is_success() {
                match response.json::<EmbedResponse>().await {
                    Ok(parsed) => Ok(parsed.embeddings),
                    Err(e) => Err(Classified::Fatal(EmbeddingError::from(e))),
                }
            } else {
                let message = response.text().await.unwrap_or_default();
                let err = EmbeddingError::Upstream {
                    status: status.as_u16(),
                    message,
                };
                if status.as_u16() == 429 || status.is_server_error() {
                    Err(Classified::Retry(err))
                } else {
                    Err(Classified::Fatal(err))
                }
            }
        })
        .await;

        outcome.map_err(|exhausted| {
            if exhausted.attempts > 1 {
                EmbeddingError::RetriesExhausted {
                    attempts: exhausted.attempts,
                    reason: exhausted.error.to_string(),
                }
                .into()
            } else {
                exhausted.error.into()
            }
        })
    }
}

#[async_trait]
impl Embedder for HttpEmbedder {
    async fn encode(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut results = Vec::with_capacity(texts.len());

        for batch in texts.chunks(self.batch_size) {
            let truncated: Vec<String> = batch
                .iter()
                .map(|t| truncate_for_embedding(t, self.truncate_bytes))
                .collect();

            let vectors = self.encode_batch(&truncated).await?;
            if vectors.len() != truncated.len() {
                return Err(EmbeddingError::ProtocolViolation {
                    requested: truncated.len(),
                    returned: vectors.len(),
                }
                .into());
            }
            results.extend(vectors);
        }

        if results.len() != texts.len() {
            return Err(EmbeddingError::ProtocolViolation {
                requested: texts.len(),
                returned: results.len(),
            }
            .into());
        }

        Ok(results)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}

/// Byte-truncates `text` to `max_bytes`, on a codepoint boundary, before it
/// is sent to the embedding service.
fn truncate_for_embedding(text: &str, max_bytes: usize) -> String {
    if text.len() <= max_bytes {
        text.to_string()
    } else {
        let boundary = find_char_boundary(text, max_bytes);
        text[..boundary].to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_for_embedding_short_text_unchanged() {
        assert_eq!(truncate_for_embedding("hello", 1024), "hello");
    }

    #[test]
    fn test_truncate_for_embedding_codepoint_safe() {
        let text = "中".repeat(500);
        let truncated = truncate_for_embedding(&text, 7);
        assert!(truncated.len() <= 7);
        assert!(String::from_utf8(truncated.into_bytes()).is_ok());
    }
}
