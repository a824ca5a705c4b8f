//! OpenAI-compatible embedding client.
//!
//! Talks to any server exposing `POST {base_url}/embeddings` (llama.cpp
//! server, Ollama, hosted APIs). One request per text; transient failures
//! (429, 5xx, timeouts, connect errors) are retried with exponential backoff.

use std::thread;
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{Embedder, EmbeddingError};

const BACKEND: &str = "http";

/// Connection settings for [`HttpEmbedder`].
#[derive(Debug, Clone)]
pub struct HttpEmbedderConfig {
    pub base_url: String,
    pub model: String,
    pub api_key: Option<String>,
    pub timeout: Duration,
    pub max_retries: usize,
}

/// Blocking embeddings client.
#[derive(Clone)]
pub struct HttpEmbedder {
    client: Client,
    endpoint: String,
    model: String,
    max_retries: usize,
}

impl HttpEmbedder {
    /// Build a client for the configured endpoint.
    pub fn new(config: HttpEmbedderConfig) -> Result<Self, EmbeddingError> {
        if config.model.trim().is_empty() {
            return Err(EmbeddingError::Backend {
                backend: BACKEND,
                message: "missing embedding model name".to_string(),
            });
        }

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(key) = config.api_key.as_deref().filter(|k| !k.trim().is_empty()) {
            let auth = HeaderValue::from_str(&format!("Bearer {}", key.trim())).map_err(|e| {
                EmbeddingError::Backend {
                    backend: BACKEND,
                    message: format!("invalid API key header: {e}"),
                }
            })?;
            headers.insert(AUTHORIZATION, auth);
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            endpoint: format!("{}/embeddings", config.base_url.trim_end_matches('/')),
            model: config.model,
            max_retries: config.max_retries.max(1),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn should_retry(status: StatusCode) -> bool {
        status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
    }

    fn is_retryable(err: &reqwest::Error) -> bool {
        err.is_timeout() || err.is_connect() || err.is_request()
    }

    fn backoff(attempt: usize) -> Duration {
        #[allow(clippy::cast_possible_truncation)]
        let capped = attempt.min(5) as u32;
        Duration::from_millis(250 * (1 << capped))
    }
}

impl Embedder for HttpEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let request = EmbeddingRequest {
            model: &self.model,
            input: [text],
        };

        let mut attempt = 0usize;
        loop {
            match self.client.post(&self.endpoint).json(&request).send() {
                Ok(resp) => {
                    let status = resp.status();
                    if status.is_success() {
                        let mut parsed: EmbeddingResponse = resp.json()?;
                        parsed.data.sort_by_key(|entry| entry.index);
                        return parsed
                            .data
                            .into_iter()
                            .next()
                            .map(|entry| entry.embedding)
                            .ok_or(EmbeddingError::Empty);
                    }

                    let body = resp
                        .text()
                        .unwrap_or_else(|_| "<body unavailable>".to_string());
                    if Self::should_retry(status) && attempt + 1 < self.max_retries {
                        attempt += 1;
                        warn!(%status, attempt, "Embedding request failed, retrying");
                        thread::sleep(Self::backoff(attempt));
                        continue;
                    }
                    return Err(EmbeddingError::Backend {
                        backend: BACKEND,
                        message: format!("request failed ({status}): {body}"),
                    });
                }
                Err(err) => {
                    if Self::is_retryable(&err) && attempt + 1 < self.max_retries {
                        attempt += 1;
                        debug!(error = %err, attempt, "Embedding transport error, retrying");
                        thread::sleep(Self::backoff(attempt));
                        continue;
                    }
                    return Err(err.into());
                }
            }
        }
    }

    fn name(&self) -> &'static str {
        BACKEND
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: [&'a str; 1],
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    #[serde(default)]
    index: usize,
}
