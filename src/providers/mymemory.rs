use serde::Deserialize;
use serde_json::Value;
use std::time::Instant;
use tracing::debug;

use super::retry::{RetryPolicy, is_rate_limited, retry_after};
use super::{Provider, ProviderFuture, env_override, truncate_body};
use crate::error::ProviderError;
use crate::request::{TranslationCandidate, TranslationRequest};

const SOURCE: &str = "mymemory";
const DEFAULT_BASE_URL: &str = "https://api.mymemory.translated.net/get";

#[derive(Debug, Clone)]
pub struct MyMemory {
    client: reqwest::Client,
    base_url: Option<String>,
    email: Option<String>,
    retry: RetryPolicy,
}

impl MyMemory {
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            base_url: None,
            email: None,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_base_url(mut self, base_url: Option<String>) -> Self {
        self.base_url = base_url.filter(|url| !url.trim().is_empty());
        self
    }

    /// Registered e-mail raises the anonymous daily quota.
    pub fn with_email(mut self, email: Option<String>) -> Self {
        self.email = email.filter(|email| !email.trim().is_empty());
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn base_url(&self) -> String {
        env_override("MYMEMORY_BASE_URL")
            .or_else(|| self.base_url.clone())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
    }
}

impl Provider for MyMemory {
    fn source(&self) -> &str {
        SOURCE
    }

    fn translate(&self, request: &TranslationRequest) -> ProviderFuture {
        let this = self.clone();
        let text = request.text().to_string();
        let langpair = format!("{}|{}", request.source(), request.target());
        Box::pin(async move {
            let url = this.base_url();
            let mut query = vec![("q", text), ("langpair", langpair)];
            if let Some(email) = &this.email {
                query.push(("de", email.clone()));
            }

            let mut attempt = 0usize;
            let mut delay = this.retry.base_delay;
            loop {
                attempt += 1;
                let started = Instant::now();
                let response = this
                    .client
                    .get(&url)
                    .query(&query)
                    .send()
                    .await
                    .map_err(|err| request_error(&err, started))?;

                let status = response.status();
                let retry_after = retry_after(response.headers());
                let body = response.text().await.unwrap_or_default();
                if status.is_success() {
                    debug!("{} answered in {} attempt(s)", SOURCE, attempt);
                    return extract_translation(&body);
                }
                if is_rate_limited(status, &body) && this.retry.should_retry(attempt) {
                    delay = this.retry.wait(SOURCE, attempt, delay, retry_after).await;
                    continue;
                }
                return Err(ProviderError::Status {
                    provider: SOURCE.to_string(),
                    status: status.as_u16(),
                    message: truncate_body(&body),
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
struct MyMemoryResponse {
    #[serde(rename = "responseData")]
    response_data: Option<ResponseData>,
    #[serde(rename = "responseStatus")]
    response_status: Option<Value>,
    #[serde(rename = "responseDetails")]
    response_details: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct ResponseData {
    #[serde(rename = "translatedText")]
    translated_text: Option<String>,
    #[serde(rename = "match")]
    quality: Option<Value>,
}

/// The service answers 200 at the HTTP level even for quota and language
/// errors; the in-body `responseStatus` is authoritative.
pub(crate) fn extract_translation(body: &str) -> Result<TranslationCandidate, ProviderError> {
    let payload: MyMemoryResponse =
        serde_json::from_str(body).map_err(|err| ProviderError::Malformed {
            provider: SOURCE.to_string(),
            message: err.to_string(),
        })?;

    let status = payload.response_status.as_ref().and_then(as_number);
    if status != Some(200.0) {
        let details = payload
            .response_details
            .as_ref()
            .and_then(Value::as_str)
            .unwrap_or_default();
        return Err(ProviderError::Status {
            provider: SOURCE.to_string(),
            status: status.map(|code| code as u16).unwrap_or_default(),
            message: truncate_body(details),
        });
    }

    let data = payload.response_data.ok_or_else(no_translation)?;
    let text = data
        .translated_text
        .map(|text| decode_entities(&text))
        .filter(|text| !text.trim().is_empty())
        .ok_or_else(no_translation)?;

    let candidate = TranslationCandidate::new(text, SOURCE);
    Ok(match data.quality.as_ref().and_then(as_number) {
        Some(quality) => candidate.with_confidence(quality),
        None => candidate,
    })
}

fn no_translation() -> ProviderError {
    ProviderError::NoTranslation {
        provider: SOURCE.to_string(),
    }
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

fn decode_entities(text: &str) -> String {
    text.replace("&#39;", "'")
        .replace("&quot;", "\"")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}
