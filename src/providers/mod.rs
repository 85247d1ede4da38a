use anyhow::{Result, anyhow};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::error::ProviderError;
use crate::lexicon::Lexicon;
use crate::request::{TranslationCandidate, TranslationRequest};
use crate::settings::Settings;

mod faulty;
mod libretranslate;
mod mymemory;
mod phrasebook;
mod retry;

pub use faulty::{FaultInjecting, FaultPlan};
pub use libretranslate::LibreTranslate;
pub use mymemory::MyMemory;
pub use phrasebook::PhrasebookProvider;
pub use retry::RetryPolicy;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    MyMemory,
    LibreTranslate,
    Phrasebook,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::MyMemory => "mymemory",
            ProviderKind::LibreTranslate => "libretranslate",
            ProviderKind::Phrasebook => "phrasebook",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "mymemory" => Some(ProviderKind::MyMemory),
            "libretranslate" | "libre" => Some(ProviderKind::LibreTranslate),
            "phrasebook" | "local" => Some(ProviderKind::Phrasebook),
            _ => None,
        }
    }
}

pub type ProviderFuture =
    Pin<Box<dyn Future<Output = Result<TranslationCandidate, ProviderError>> + Send>>;

/// A translation source. Every failure, including ones detected before any
/// I/O happens, is reported through the returned future.
pub trait Provider: Clone + Send + Sync {
    /// Identifier recorded on candidates and used for reputation lookups.
    fn source(&self) -> &str;
    fn translate(&self, request: &TranslationRequest) -> ProviderFuture;
}

#[derive(Debug, Clone)]
pub enum ProviderImpl {
    MyMemory(MyMemory),
    LibreTranslate(LibreTranslate),
    Phrasebook(PhrasebookProvider),
    Faulty(Box<FaultInjecting<ProviderImpl>>),
}

impl ProviderImpl {
    pub fn with_faults(self, plan: FaultPlan) -> Self {
        ProviderImpl::Faulty(Box::new(FaultInjecting::new(self, plan)))
    }
}

impl Provider for ProviderImpl {
    fn source(&self) -> &str {
        match self {
            ProviderImpl::MyMemory(provider) => provider.source(),
            ProviderImpl::LibreTranslate(provider) => provider.source(),
            ProviderImpl::Phrasebook(provider) => provider.source(),
            ProviderImpl::Faulty(provider) => provider.source(),
        }
    }

    fn translate(&self, request: &TranslationRequest) -> ProviderFuture {
        match self {
            ProviderImpl::MyMemory(provider) => provider.translate(request),
            ProviderImpl::LibreTranslate(provider) => provider.translate(request),
            ProviderImpl::Phrasebook(provider) => provider.translate(request),
            ProviderImpl::Faulty(provider) => provider.translate(request),
        }
    }
}

pub fn build_provider(
    kind: ProviderKind,
    settings: &Settings,
    client: &reqwest::Client,
    lexicon: &Arc<Lexicon>,
) -> ProviderImpl {
    match kind {
        ProviderKind::MyMemory => ProviderImpl::MyMemory(
            MyMemory::new(client.clone())
                .with_base_url(settings.mymemory_base_url.clone())
                .with_email(settings.mymemory_email.clone())
                .with_retry(settings.retry),
        ),
        ProviderKind::LibreTranslate => ProviderImpl::LibreTranslate(
            LibreTranslate::new(client.clone())
                .with_base_url(settings.libretranslate_base_url.clone())
                .with_api_key(settings.libretranslate_api_key.clone())
                .with_retry(settings.retry),
        ),
        ProviderKind::Phrasebook => {
            ProviderImpl::Phrasebook(PhrasebookProvider::new(Arc::clone(lexicon)))
        }
    }
}

/// Providers named in `[aggregator] providers`, in configured order.
pub fn build_providers(
    settings: &Settings,
    client: &reqwest::Client,
    lexicon: &Arc<Lexicon>,
) -> Result<Vec<ProviderImpl>> {
    let mut providers = Vec::with_capacity(settings.providers.len());
    for name in &settings.providers {
        let kind = resolve_kind(name)?;
        providers.push(build_provider(kind, settings, client, lexicon));
    }
    if providers.is_empty() {
        return Err(anyhow!("no translation providers configured"));
    }
    Ok(providers)
}

pub fn resolve_kind(name: &str) -> Result<ProviderKind> {
    ProviderKind::from_name(name).ok_or_else(|| {
        anyhow!(
            "unknown provider '{}' (expected mymemory, libretranslate or phrasebook)",
            name
        )
    })
}

pub(crate) fn env_override(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .filter(|value| !value.trim().is_empty())
}

/// Keeps upstream error bodies short enough for a log line.
pub(crate) fn truncate_body(body: &str) -> String {
    const LIMIT: usize = 200;
    let trimmed = body.trim();
    if trimmed.chars().count() <= LIMIT {
        return trimmed.to_string();
    }
    let mut out = trimmed.chars().take(LIMIT).collect::<String>();
    out.push('…');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_names_resolve() {
        assert_eq!(ProviderKind::from_name("MyMemory"), Some(ProviderKind::MyMemory));
        assert_eq!(ProviderKind::from_name("libre"), Some(ProviderKind::LibreTranslate));
        assert!(resolve_kind("google").is_err());
    }

    #[test]
    fn builds_configured_providers_in_order() {
        let settings = Settings {
            providers: vec!["phrasebook".to_string(), "mymemory".to_string()],
            ..Settings::default()
        };
        let providers =
            build_providers(&settings, &reqwest::Client::new(), &Lexicon::bundled())
                .expect("providers");
        let sources = providers.iter().map(|p| p.source()).collect::<Vec<_>>();
        assert_eq!(sources, vec!["phrasebook", "mymemory"]);
    }

    #[test]
    fn empty_provider_list_is_rejected() {
        let settings = Settings {
            providers: Vec::new(),
            ..Settings::default()
        };
        assert!(build_providers(&settings, &reqwest::Client::new(), &Lexicon::bundled()).is_err());
    }

    #[test]
    fn long_bodies_are_truncated() {
        let body = "x".repeat(500);
        let out = truncate_body(&body);
        assert_eq!(out.chars().count(), 201);
        assert!(out.ends_with('…'));
    }
}
