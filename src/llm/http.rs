//! OpenAI-compatible chat generation over server-sent events.
//!
//! `POST {base_url}/chat/completions` with `stream: true`. The response body
//! is read line by line as the caller pulls tokens; each `data: {...}` event
//! carries a `choices[0].delta.content` fragment and `data: [DONE]` ends the
//! stream.

use std::io::{BufRead, BufReader};
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{GenerationError, Generator, TokenStream};

/// Connection and sampling settings for [`HttpGenerator`].
#[derive(Debug, Clone)]
pub struct HttpGeneratorConfig {
    pub base_url: String,
    pub model: String,
    pub api_key: Option<String>,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout: Duration,
}

/// Blocking streaming chat client.
#[derive(Clone)]
pub struct HttpGenerator {
    client: Client,
    endpoint: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl std::fmt::Debug for HttpGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpGenerator")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
    max_tokens: u32,
    stream: bool,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatChunk {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
}

#[derive(Debug, Deserialize)]
struct ChunkChoice {
    #[serde(default)]
    delta: Option<Delta>,
}

#[derive(Debug, Deserialize)]
struct Delta {
    #[serde(default)]
    content: Option<String>,
}

/// One decoded SSE line.
#[derive(Debug, PartialEq, Eq)]
pub enum SseEvent {
    /// Text fragment to emit.
    Token(String),
    /// Terminal `[DONE]` marker.
    Done,
    /// Blank line, comment, non-data field, or an event without content.
    Skip,
}

/// Decode one line of an OpenAI-style event stream.
pub fn parse_sse_line(line: &str) -> Result<SseEvent, GenerationError> {
    let trimmed = line.trim();
    let Some(payload) = trimmed.strip_prefix("data:") else {
        return Ok(SseEvent::Skip);
    };
    let payload = payload.trim_start();

    if payload.is_empty() {
        return Ok(SseEvent::Skip);
    }
    if payload == "[DONE]" {
        return Ok(SseEvent::Done);
    }

    let chunk: ChatChunk = serde_json::from_str(payload)
        .map_err(|e| GenerationError::Stream(format!("{e}: {payload}")))?;
    let content = chunk
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.delta)
        .and_then(|d| d.content)
        .filter(|s| !s.is_empty());

    Ok(content.map_or(SseEvent::Skip, SseEvent::Token))
}

/// Pull-based token iterator over any buffered SSE body.
///
/// Ends at `[DONE]`, at end of input, or after yielding the first error.
pub struct SseTokens<R> {
    reader: R,
    line: String,
    finished: bool,
}

impl<R: BufRead> SseTokens<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line: String::new(),
            finished: false,
        }
    }
}

impl<R: BufRead> Iterator for SseTokens<R> {
    type Item = Result<String, GenerationError>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.finished {
            self.line.clear();
            match self.reader.read_line(&mut self.line) {
                Ok(0) => self.finished = true,
                Ok(_) => match parse_sse_line(&self.line) {
                    Ok(SseEvent::Token(t)) => return Some(Ok(t)),
                    Ok(SseEvent::Done) => {
                        debug!("Generation stream finished");
                        self.finished = true;
                    }
                    Ok(SseEvent::Skip) => {}
                    Err(e) => {
                        self.finished = true;
                        return Some(Err(e));
                    }
                },
                Err(e) => {
                    self.finished = true;
                    return Some(Err(e.into()));
                }
            }
        }
        None
    }
}

impl HttpGenerator {
    pub fn new(config: HttpGeneratorConfig) -> Result<Self, GenerationError> {
        if config.model.trim().is_empty() {
            return Err(GenerationError::Config("missing generation model name".to_string()));
        }

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(key) = config.api_key.as_deref().filter(|k| !k.trim().is_empty()) {
            let auth = HeaderValue::from_str(&format!("Bearer {}", key.trim()))
                .map_err(|e| GenerationError::Config(format!("invalid API key header: {e}")))?;
            headers.insert(AUTHORIZATION, auth);
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .default_headers(headers)
            .build()?;

        let endpoint = format!("{}/chat/completions", config.base_url.trim_end_matches('/'));
        info!(endpoint = %endpoint, model = %config.model, "Generation backend configured");

        Ok(Self {
            client,
            endpoint,
            model: config.model,
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl Generator for HttpGenerator {
    fn generate(
        &self,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<TokenStream, GenerationError> {
        let request = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: user_prompt,
                },
            ],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            stream: true,
        };

        let resp = self.client.post(&self.endpoint).json(&request).send()?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp
                .text()
                .unwrap_or_else(|_| "<body unavailable>".to_string());
            return Err(GenerationError::Status {
                status: status.as_u16(),
                body,
            });
        }

        debug!(prompt_chars = user_prompt.len(), "Generation stream opened");
        Ok(Box::new(SseTokens::new(BufReader::new(resp))))
    }

    fn backend_name(&self) -> &'static str {
        "openai-compatible"
    }
}
