use std::time::Duration;

use thiserror::Error;

/// A single provider call that did not produce a candidate.
///
/// The aggregator recovers from these locally: the provider is left out of
/// scoring and the error is kept for diagnostics.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProviderError {
    #[error("{provider}: request failed: {message}")]
    Request { provider: String, message: String },
    #[error("{provider}: HTTP {status}: {message}")]
    Status {
        provider: String,
        status: u16,
        message: String,
    },
    #[error("{provider}: malformed response: {message}")]
    Malformed { provider: String, message: String },
    #[error("{provider}: no translation available")]
    NoTranslation { provider: String },
    #[error("{provider}: timed out after {}ms", .elapsed.as_millis())]
    Timeout { provider: String, elapsed: Duration },
    #[error("{provider}: injected fault")]
    Injected { provider: String },
}

impl ProviderError {
    pub fn provider(&self) -> &str {
        match self {
            ProviderError::Request { provider, .. }
            | ProviderError::Status { provider, .. }
            | ProviderError::Malformed { provider, .. }
            | ProviderError::NoTranslation { provider }
            | ProviderError::Timeout { provider, .. }
            | ProviderError::Injected { provider } => provider,
        }
    }
}

/// Every configured provider failed; the caller should fall back.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("all {} translation providers failed", .failures.len())]
pub struct AllProvidersFailedError {
    pub failures: Vec<ProviderError>,
}

/// Precondition failures raised before any provider is contacted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestError {
    #[error("input text is empty")]
    EmptyInput,
    #[error(
        "unsupported language code '{0}' (expected one of ar, en, fr, es, de, it, ja, ko, zh)"
    )]
    UnsupportedLanguage(String),
    #[error("cannot swap languages while the source language is auto-detected")]
    SwapWithAuto,
}
