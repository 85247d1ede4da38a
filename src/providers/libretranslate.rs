use serde::Deserialize;
use serde_json::json;
use std::time::Instant;
use tracing::debug;

use super::retry::{RetryPolicy, is_rate_limited, retry_after};
use super::{Provider, ProviderFuture, env_override, truncate_body};
use crate::error::ProviderError;
use crate::request::{TranslationCandidate, TranslationRequest};

const SOURCE: &str = "libretranslate";
const DEFAULT_BASE_URL: &str = "https://libretranslate.com";

#[derive(Debug, Clone)]
pub struct LibreTranslate {
    client: reqwest::Client,
    base_url: Option<String>,
    api_key: Option<String>,
    retry: RetryPolicy,
}

impl LibreTranslate {
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            base_url: None,
            api_key: None,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_base_url(mut self, base_url: Option<String>) -> Self {
        self.base_url = base_url.filter(|url| !url.trim().is_empty());
        self
    }

    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key.filter(|key| !key.trim().is_empty());
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn endpoint(&self) -> String {
        let base = env_override("LIBRETRANSLATE_BASE_URL")
            .or_else(|| self.base_url.clone())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        format!("{}/translate", base.trim_end_matches('/'))
    }
}

impl Provider for LibreTranslate {
    fn source(&self) -> &str {
        SOURCE
    }

    fn translate(&self, request: &TranslationRequest) -> ProviderFuture {
        let this = self.clone();
        let mut body = json!({
            "q": request.text(),
            "source": request.source().as_str(),
            "target": request.target().as_str(),
            "format": "text",
        });
        if let Some(key) = &self.api_key {
            body["api_key"] = json!(key);
        }
        Box::pin(async move {
            let url = this.endpoint();
            let mut attempt = 0usize;
            let mut delay = this.retry.base_delay;
            loop {
                attempt += 1;
                let started = Instant::now();
                let response = this
                    .client
                    .post(&url)
                    .json(&body)
                    .send()
                    .await
                    .map_err(|err| request_error(&err, started))?;

                let status = response.status();
                let retry_after = retry_after(response.headers());
                let text = response.text().await.unwrap_or_default();
                if status.is_success() {
                    debug!("{} answered in {} attempt(s)", SOURCE, attempt);
                    return extract_translation(&text);
                }
                if is_rate_limited(status, &text) && this.retry.should_retry(attempt) {
                    delay = this.retry.wait(SOURCE, attempt, delay, retry_after).await;
                    continue;
                }
                return Err(ProviderError::Status {
                    provider: SOURCE.to_string(),
                    status: status.as_u16(),
                    message: extract_error(&text).unwrap_or_else(|| truncate_body(&text)),
                });
            }
        })
    }
}

fn request_error(err: &reqwest::Error, started: Instant) -> ProviderError {
    if err.is_timeout() {
        return ProviderError::Timeout {
            provider: SOURCE.to_string(),
            elapsed: started.elapsed(),
        };
    }
    ProviderError::Request {
        provider: SOURCE.to_string(),
        message: err.to_string(),
    }
}

#[derive(Debug, Deserialize)]
struct LibreResponse {
    #[serde(rename = "translatedText")]
    translated_text: Option<String>,
    error: Option<String>,
}

/// LibreTranslate reports no quality estimate, so candidates carry none.
pub(crate) fn extract_translation(body: &str) -> Result<TranslationCandidate, ProviderError> {
    let payload: LibreResponse =
        serde_json::from_str(body).map_err(|err| ProviderError::Malformed {
            provider: SOURCE.to_string(),
            message: err.to_string(),
        })?;
    if let Some(error) = payload.error {
        return Err(ProviderError::Malformed {
            provider: SOURCE.to_string(),
            message: error,
        });
    }
    payload
        .translated_text
        .filter(|text| !text.trim().is_empty())
        .map(|text| TranslationCandidate::new(text, SOURCE))
        .ok_or_else(|| ProviderError::NoTranslation {
            provider: SOURCE.to_string(),
        })
}

fn extract_error(body: &str) -> Option<String> {
    serde_json::from_str::<LibreResponse>(body)
        .ok()
        .and_then(|payload| payload.error)
}
