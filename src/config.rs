//! Static configuration: rate-limit registry, batch constants, API keys

use crate::types::{ProviderId, RateLimitPolicy};

/// Maximum attempts per slot, including the first
pub const MAX_RETRIES: u32 = 5;

/// Fixed backoff applied to transport-level failures and unparseable
/// rate-limit hints
pub const TRANSIENT_BACKOFF_MS: u64 = 2000;

/// Consecutive Rejected/Errored slots that abort the batch
pub const MAX_CONSECUTIVE_ERRORS: u32 = 3;

/// Alternative-output slots per eligible row
pub const ALTERNATIVE_SLOTS: usize = 3;

/// Length ceiling applied when the asset-type label is not recognized
pub const DEFAULT_MAX_CHARS: usize = 90;

/// Throughput policy for a model identifier.
///
/// Unregistered models get the default policy (30 rpm, 1 rps).
pub fn rate_limit_policy(model: &str) -> RateLimitPolicy {
    let (rpm, rps) = match model {
        "gemma2-9b-it" => (60, 1),
        "llama-3-70b-8192" => (30, 1),
        "llama3-8b-8192" => (60, 1),
        "llama-guard-3-8b" => (60, 1),
        "mixtral-8x7b-32768" => (60, 1),
        "gemini-1.5-flash" => (15, 1),
        "gemini-1.5-flash-8b" => (15, 1),
        "gemini-1.5-pro" => (15, 1),
        "google/gemini-2.0-flash-exp:free" => (60, 1),
        "google/gemini-2.0-flash-thinking-exp-1219:free" => (20, 1),
        "meta-llama/llama-3.1-405b-instruct:free" => (20, 1),
        "meta-llama/llama-3.2-1b-instruct:free" => (20, 1),
        "qwen/qwen-2-7b-instruct:free" => (20, 1),
        "mistralai/mistral-7b-instruct:free" => (20, 1),
        "microsoft/phi-3-mini-128k-instruct:free" => (20, 1),
        "sophosympatheia/rogue-rose-103b-v0.2:free" => (20, 1),
        _ => (30, 1),
    };
    RateLimitPolicy { rpm, rps }
}

/// API keys loaded from the environment
#[derive(Debug, Clone, Default)]
pub struct ApiKeys {
    pub groq: Option<String>,
    pub google: Option<String>,
    pub openrouter: Option<String>,
}

impl ApiKeys {
    /// Environment variable holding the key for a provider.
    pub fn env_key(provider: ProviderId) -> &'static str {
        match provider {
            ProviderId::Groq => "API_GROQ",
            ProviderId::GoogleAi => "API_GOOGLE",
            ProviderId::OpenRouter => "API_OPENROUTER",
        }
    }

    /// Read `API_GROQ`, `API_GOOGLE` and `API_OPENROUTER`. Blank values are
    /// treated as absent.
    pub fn from_env() -> Self {
        let read = |provider| {
            std::env::var(Self::env_key(provider))
                .ok()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        Self {
            groq: read(ProviderId::Groq),
            google: read(ProviderId::GoogleAi),
            openrouter: read(ProviderId::OpenRouter),
        }
    }

    pub fn key_for(&self, provider: ProviderId) -> Option<&str> {
        match provider {
            ProviderId::Groq => self.groq.as_deref(),
            ProviderId::GoogleAi => self.google.as_deref(),
            ProviderId::OpenRouter => self.openrouter.as_deref(),
        }
    }

    /// Key present and shaped like the provider's real keys (Groq keys start
    /// with `gsk`, Google AI keys with `AI`; OpenRouter has no fixed prefix).
    pub fn has_plausible_key(&self, provider: ProviderId) -> bool {
        match (provider, self.key_for(provider)) {
            (ProviderId::Groq, Some(key)) => key.starts_with("gsk"),
            (ProviderId::GoogleAi, Some(key)) => key.starts_with("AI"),
            (ProviderId::OpenRouter, Some(_)) => true,
            (_, None) => false,
        }
    }
}
