use std::time::Duration;

use crate::error::ProviderError;
use crate::providers::{Provider, ProviderFuture};
use crate::request::{TranslationCandidate, TranslationRequest};

pub(crate) fn with_temp_home<F, R>(func: F) -> R
where
    F: FnOnce(&std::path::Path) -> R,
{
    static HOME_MUTEX: std::sync::Mutex<()> = std::sync::Mutex::new(());
    let _guard = HOME_MUTEX
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    let dir = tempfile::tempdir().expect("tempdir");
    let old_home = std::env::var("HOME").ok();
    // SAFETY: HOME is only touched by tests holding HOME_MUTEX.
    unsafe { std::env::set_var("HOME", dir.path()) };
    let result = func(dir.path());
    match old_home {
        Some(old) => unsafe { std::env::set_var("HOME", old) },
        None => unsafe { std::env::remove_var("HOME") },
    }
    result
}

/// Accepts connections on a local port and never answers; returns the base
/// URL.
pub(crate) async fn silent_server() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });
    format!("http://{}", addr)
}

/// Canned provider for aggregator and translator tests.
#[derive(Debug, Clone)]
pub(crate) struct StubProvider {
    source: String,
    reply: Option<(String, Option<f64>)>,
    delay: Option<Duration>,
}

impl StubProvider {
    pub(crate) fn ok(source: &str, text: &str, confidence: Option<f64>) -> Self {
        Self {
            source: source.to_string(),
            reply: Some((text.to_string(), confidence)),
            delay: None,
        }
    }

    pub(crate) fn failing(source: &str) -> Self {
        Self {
            source: source.to_string(),
            reply: None,
            delay: None,
        }
    }

    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

impl Provider for StubProvider {
    fn source(&self) -> &str {
        &self.source
    }

    fn translate(&self, _request: &TranslationRequest) -> ProviderFuture {
        let this = self.clone();
        Box::pin(async move {
            if let Some(delay) = this.delay {
                tokio::time::sleep(delay).await;
            }
            match this.reply {
                Some((text, confidence)) => {
                    let candidate = TranslationCandidate::new(text, this.source);
                    Ok(match confidence {
                        Some(confidence) => candidate.with_confidence(confidence),
                        None => candidate,
                    })
                }
                None => Err(ProviderError::Status {
                    provider: this.source,
                    status: 500,
                    message: "stub failure".to_string(),
                }),
            }
        })
    }
}
