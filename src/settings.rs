use anyhow::{Context, Result, anyhow};
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::aggregator::DEFAULT_PROVIDER_TIMEOUT;
use crate::languages::{Language, SourceLanguage};
use crate::providers::RetryPolicy;
use crate::scoring::DEFAULT_REPUTATION;

const DEFAULT_SETTINGS_TOML: &str = include_str!("../settings.toml");

#[derive(Debug, Clone)]
pub struct Settings {
    pub target_lang: Language,
    pub source_lang: SourceLanguage,
    pub providers: Vec<String>,
    pub fallback: Option<String>,
    pub timeout: Duration,
    pub reputation: HashMap<String, f64>,
    pub mymemory_base_url: Option<String>,
    pub mymemory_email: Option<String>,
    pub libretranslate_base_url: Option<String>,
    pub libretranslate_api_key: Option<String>,
    pub retry: RetryPolicy,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            target_lang: Language::En,
            source_lang: SourceLanguage::Auto,
            providers: vec![
                "mymemory".to_string(),
                "libretranslate".to_string(),
                "phrasebook".to_string(),
            ],
            fallback: Some("mymemory".to_string()),
            timeout: DEFAULT_PROVIDER_TIMEOUT,
            reputation: DEFAULT_REPUTATION
                .iter()
                .map(|(source, value)| (source.to_string(), *value))
                .collect(),
            mymemory_base_url: None,
            mymemory_email: None,
            libretranslate_base_url: None,
            libretranslate_api_key: None,
            retry: RetryPolicy::default(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct SettingsFile {
    system: Option<SystemSettings>,
    aggregator: Option<AggregatorSettings>,
    reputation: Option<HashMap<String, f64>>,
    mymemory: Option<MyMemorySettings>,
    libretranslate: Option<LibreTranslateSettings>,
    retry: Option<RetrySettings>,
}

#[derive(Debug, Default, Deserialize)]
struct SystemSettings {
    target: Option<String>,
    source: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct AggregatorSettings {
    providers: Option<Vec<String>>,
    fallback: Option<String>,
    timeout_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct MyMemorySettings {
    base_url: Option<String>,
    email: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct LibreTranslateSettings {
    base_url: Option<String>,
    api_key: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RetrySettings {
    max_attempts: Option<usize>,
    base_delay_ms: Option<u64>,
    max_delay_ms: Option<u64>,
}

pub fn load_settings(extra_path: Option<&Path>) -> Result<Settings> {
    let mut settings = Settings::default();
    ensure_home_settings_file()?;

    let mut ordered_paths = vec![
        PathBuf::from("settings.toml"),
        PathBuf::from("settings.local.toml"),
    ];
    if let Some(home) = home_dir() {
        ordered_paths.push(home.join("settings.toml"));
        ordered_paths.push(home.join("settings.local.toml"));
    }
    if let Some(extra) = extra_path {
        if !extra.exists() {
            return Err(anyhow!("settings file not found: {}", extra.display()));
        }
        ordered_paths.push(extra.to_path_buf());
    }

    for path in ordered_paths {
        if path.exists() {
            let content = fs::read_to_string(&path)
                .with_context(|| format!("failed to read settings: {}", path.display()))?;
            settings
                .merge_toml(&content)
                .with_context(|| format!("failed to load settings: {}", path.display()))?;
        }
    }

    Ok(settings)
}

impl Settings {
    pub fn merge_toml(&mut self, content: &str) -> Result<()> {
        let parsed: SettingsFile =
            toml::from_str(content).with_context(|| "invalid settings TOML")?;
        self.merge(parsed)
    }

    fn merge(&mut self, incoming: SettingsFile) -> Result<()> {
        if let Some(system) = incoming.system {
            if let Some(target) = non_empty(system.target) {
                self.target_lang = target
                    .parse()
                    .with_context(|| "invalid [system] target")?;
            }
            if let Some(source) = non_empty(system.source) {
                self.source_lang = source
                    .parse()
                    .with_context(|| "invalid [system] source")?;
            }
        }
        if let Some(aggregator) = incoming.aggregator {
            if let Some(providers) = aggregator.providers {
                self.providers = providers
                    .into_iter()
                    .map(|name| name.trim().to_string())
                    .filter(|name| !name.is_empty())
                    .collect();
            }
            if let Some(fallback) = aggregator.fallback {
                self.fallback = non_empty(Some(fallback));
            }
            if let Some(timeout_ms) = aggregator.timeout_ms
                && timeout_ms > 0
            {
                self.timeout = Duration::from_millis(timeout_ms);
            }
        }
        if let Some(reputation) = incoming.reputation {
            for (source, value) in reputation {
                self.reputation.insert(source.trim().to_lowercase(), value);
            }
        }
        if let Some(mymemory) = incoming.mymemory {
            if let Some(url) = non_empty(mymemory.base_url) {
                self.mymemory_base_url = Some(url);
            }
            if let Some(email) = non_empty(mymemory.email) {
                self.mymemory_email = Some(email);
            }
        }
        if let Some(libre) = incoming.libretranslate {
            if let Some(url) = non_empty(libre.base_url) {
                self.libretranslate_base_url = Some(url);
            }
            if let Some(key) = non_empty(libre.api_key) {
                self.libretranslate_api_key = Some(key);
            }
        }
        if let Some(retry) = incoming.retry {
            if let Some(attempts) = retry.max_attempts
                && attempts > 0
            {
                self.retry.max_attempts = attempts;
            }
            if let Some(delay) = retry.base_delay_ms {
                self.retry.base_delay = Duration::from_millis(delay);
            }
            if let Some(delay) = retry.max_delay_ms {
                self.retry.max_delay = Duration::from_millis(delay);
            }
            if self.retry.max_delay < self.retry.base_delay {
                self.retry.max_delay = self.retry.base_delay;
            }
        }
        Ok(())
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn ensure_home_settings_file() -> Result<()> {
    let Some(home) = home_dir() else {
        return Ok(());
    };
    fs::create_dir_all(&home)
        .with_context(|| format!("failed to create settings directory: {}", home.display()))?;
    let path = home.join("settings.toml");
    if !path.exists() {
        fs::write(&path, DEFAULT_SETTINGS_TOML)
            .with_context(|| format!("failed to write settings: {}", path.display()))?;
    }
    Ok(())
}

fn home_dir() -> Option<PathBuf> {
    std::env::var("HOME").ok().and_then(|home| {
        let home = home.trim();
        if home.is_empty() {
            None
        } else {
            Some(Path::new(home).join(".multi-translator-rust"))
        }
    })
}
