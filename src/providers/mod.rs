//! Provider adapters: request building, text extraction, error classification

use async_trait::async_trait;
use regex::Regex;
use serde_json::{json, Value};
use tracing::debug;

use crate::config::ApiKeys;
use crate::types::{ProviderFailure, ProviderId};

/// Endpoint bases, injectable so tests can point the client at a local
/// server. `googleai` is a base URL; the model name is spliced into its path.
#[derive(Debug, Clone)]
pub struct ProviderEndpoints {
    pub groq: String,
    pub googleai: String,
    pub openrouter: String,
}

impl Default for ProviderEndpoints {
    fn default() -> Self {
        Self {
            groq: "https://api.groq.com/openai/v1/chat/completions".to_string(),
            googleai: "https://generativelanguage.googleapis.com".to_string(),
            openrouter: "https://openrouter.ai/api/v1/chat/completions".to_string(),
        }
    }
}

/// Attribution headers OpenRouter asks callers to send
const OPENROUTER_REFERER: &str = "https://github.com/altgen/altgen";
const OPENROUTER_TITLE: &str = "altgen";

/// A fully prepared provider HTTP request
#[derive(Debug, Clone)]
pub struct ProviderRequest {
    pub url: String,
    pub headers: Vec<(&'static str, String)>,
    pub body: Value,
}

/// Translate a generation request into the provider's wire shape.
pub fn build_request(
    provider: ProviderId,
    endpoints: &ProviderEndpoints,
    api_key: &str,
    model: &str,
    prompt: &str,
    max_chars: usize,
) -> ProviderRequest {
    match provider {
        ProviderId::Groq => ProviderRequest {
            url: endpoints.groq.clone(),
            headers: vec![
                ("Authorization", format!("Bearer {api_key}")),
                ("Content-Type", "application/json".to_string()),
            ],
            body: json!({
                "model": model,
                "messages": [{ "role": "user", "content": prompt }],
                "max_tokens": std::cmp::min(100, max_chars + 20),
                "temperature": 0.7,
            }),
        },
        ProviderId::GoogleAi => ProviderRequest {
            url: format!(
                "{}/v1beta/models/{model}:generateContent",
                endpoints.googleai
            ),
            headers: vec![
                ("x-goog-api-key", api_key.to_string()),
                ("Content-Type", "application/json".to_string()),
            ],
            body: json!({
                "contents": [{ "parts": [{ "text": prompt }] }],
            }),
        },
        ProviderId::OpenRouter => ProviderRequest {
            url: endpoints.openrouter.clone(),
            headers: vec![
                ("Authorization", format!("Bearer {api_key}")),
                ("HTTP-Referer", OPENROUTER_REFERER.to_string()),
                ("X-Title", OPENROUTER_TITLE.to_string()),
                ("Content-Type", "application/json".to_string()),
            ],
            body: json!({
                "model": model,
                "messages": [{ "role": "user", "content": prompt }],
            }),
        },
    }
}

/// Pull the generated text out of a provider response body.
pub fn extract_text(provider: ProviderId, response: &Value) -> Option<String> {
    let text = match provider {
        ProviderId::Groq | ProviderId::OpenRouter => response
            .get("choices")?
            .get(0)?
            .get("message")?
            .get("content")?
            .as_str()?,
        ProviderId::GoogleAi => response
            .get("candidates")?
            .get(0)?
            .get("content")?
            .get("parts")?
            .get(0)?
            .get("text")?
            .as_str()?,
    };
    let text = text.trim();
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}

/// Single-operation client the retry controller dispatches through
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GenerationClient: Send + Sync {
    /// One provider call; returns the raw generated text.
    async fn generate(
        &self,
        provider: ProviderId,
        model: &str,
        prompt: &str,
        max_chars: usize,
    ) -> Result<String, ProviderFailure>;
}

/// reqwest-backed implementation of [`GenerationClient`]
pub struct HttpProviderClient {
    http: reqwest::Client,
    keys: ApiKeys,
    endpoints: ProviderEndpoints,
    retry_after_re: Regex,
}

impl HttpProviderClient {
    pub fn new(keys: ApiKeys) -> Self {
        Self::with_endpoints(keys, ProviderEndpoints::default())
    }

    pub fn with_endpoints(keys: ApiKeys, endpoints: ProviderEndpoints) -> Self {
        // Matches "try again in 3.5s" and "try again in 442ms" hints embedded
        // in free-form rate-limit messages.
        let retry_after_re = Regex::new(r"(?i)try again in (\d+(?:\.\d+)?)\s*(ms|s)")
            .expect("retry-after pattern is valid");
        Self {
            http: reqwest::Client::new(),
            keys,
            endpoints,
            retry_after_re,
        }
    }

    /// Parse a retry-after hint from a provider error message, in
    /// milliseconds. `None` when the message carries no parseable hint.
    pub fn extract_retry_after_ms(&self, message: &str) -> Option<u64> {
        let captures = self.retry_after_re.captures(message)?;
        let value: f64 = captures.get(1)?.as_str().parse().ok()?;
        let scale = match captures.get(2)?.as_str().to_lowercase().as_str() {
            "ms" => 1.0,
            _ => 1000.0,
        };
        Some((value * scale).round() as u64)
    }

    fn classify_error(&self, status: u16, error: &Value) -> ProviderFailure {
        let message = error
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let code = error.get("code").and_then(Value::as_str).unwrap_or_default();

        if status == 429 || code == "rate_limit_exceeded" {
            ProviderFailure::RateLimited {
                retry_after_ms: self.extract_retry_after_ms(&message),
            }
        } else if status == 401 {
            ProviderFailure::AuthenticationFailed
        } else if message.is_empty() {
            ProviderFailure::ServerError(format!("HTTP {status}"))
        } else {
            ProviderFailure::ServerError(message)
        }
    }
}

#[async_trait]
impl GenerationClient for HttpProviderClient {
    async fn generate(
        &self,
        provider: ProviderId,
        model: &str,
        prompt: &str,
        max_chars: usize,
    ) -> Result<String, ProviderFailure> {
        let api_key = self
            .keys
            .key_for(provider)
            .ok_or(ProviderFailure::AuthenticationFailed)?;
        let request = build_request(provider, &self.endpoints, api_key, model, prompt, max_chars);

        let mut call = self.http.post(&request.url);
        for (name, value) in &request.headers {
            call = call.header(*name, value.as_str());
        }
        let response = call
            .json(&request.body)
            .send()
            .await
            .map_err(|e| ProviderFailure::NetworkError(e.to_string()))?;

        let status = response.status();
        let raw = response
            .text()
            .await
            .map_err(|e| ProviderFailure::NetworkError(e.to_string()))?;
        debug!(%provider, model, status = status.as_u16(), "provider response");

        let body: Value = match serde_json::from_str(&raw) {
            Ok(value) => value,
            Err(_) if status.as_u16() == 429 => {
                return Err(ProviderFailure::RateLimited {
                    retry_after_ms: self.extract_retry_after_ms(&raw),
                });
            }
            Err(_) if !status.is_success() => {
                return Err(ProviderFailure::ServerError(format!("HTTP {status}")));
            }
            Err(e) => return Err(ProviderFailure::MalformedResponse(e.to_string())),
        };

        if let Some(error) = body.get("error") {
            return Err(self.classify_error(status.as_u16(), error));
        }
        if !status.is_success() {
            return Err(match status.as_u16() {
                401 => ProviderFailure::AuthenticationFailed,
                429 => ProviderFailure::RateLimited {
                    retry_after_ms: None,
                },
                _ => ProviderFailure::ServerError(format!("HTTP {status}")),
            });
        }

        extract_text(provider, &body).ok_or(ProviderFailure::EmptyResponse)
    }
}
