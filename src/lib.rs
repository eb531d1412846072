//! LLM-powered text alternative generation for underperforming ad assets.
//!
//! For each table row whose performance label signals LOW, the engine asks
//! the selected provider (Groq, Google AI Studio or OpenRouter) for three
//! replacement texts, under per-model rate limits, with bounded retries,
//! validation, cross-run deduplication and a consecutive-error circuit
//! breaker.

pub mod config;
pub mod core;
pub mod error;
pub mod providers;
pub mod services;
pub mod session;
pub mod types;

pub use error::{AltgenError, AltgenResult};
pub use session::{BatchOptions, Session};
pub use types::{BatchReport, ProviderId, StopReason};
