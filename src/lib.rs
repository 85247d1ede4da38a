use anyhow::{Context, Result, anyhow};
use std::path::Path;
use std::sync::Arc;

pub mod aggregator;
pub mod error;
pub mod generation;
pub mod languages;
pub mod lexicon;
pub mod logging;
pub mod phrasebook;
pub mod postprocess;
pub mod providers;
pub mod request;
pub mod scoring;
pub mod settings;
mod translator;

#[cfg(test)]
mod test_util;

pub use aggregator::{AggregateOutcome, Aggregator, aggregate_translate};
pub use error::{AllProvidersFailedError, ProviderError, RequestError};
pub use generation::{Generation, GenerationTracker};
pub use languages::{Language, LanguagePair, SourceLanguage};
pub use providers::{FaultPlan, Provider, ProviderImpl, ProviderKind};
pub use request::{TranslationCandidate, TranslationRequest};
pub use scoring::{QualityScorer, ScoredCandidate};
pub use translator::{ExecutionOutput, Strategy, Translator};

use lexicon::Lexicon;
use postprocess::PostProcessor;
use providers::PhrasebookProvider;

#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Target language; settings decide when absent.
    pub lang: Option<String>,
    pub source_lang: Option<String>,
    pub settings_path: Option<String>,
    pub show_enabled_languages: bool,
    pub with_scores: bool,
    pub with_strategy: bool,
    /// Probability that each aggregated provider call is failed on purpose.
    pub fault_rate: Option<f64>,
    /// Phrasebook only; no network.
    pub offline: bool,
}

/// Everything needed to translate repeatedly with one configuration.
#[derive(Debug, Clone)]
pub struct Session {
    translator: Translator<ProviderImpl>,
    lexicon: Arc<Lexicon>,
    pair: LanguagePair,
}

impl Session {
    pub fn new(config: &Config) -> Result<Self> {
        let settings_path = config.settings_path.as_deref().map(Path::new);
        let settings = settings::load_settings(settings_path)?;
        let lexicon = Lexicon::bundled();

        let target = match config.lang.as_deref() {
            Some(code) => code
                .parse::<Language>()
                .with_context(|| "invalid target language")?,
            None => settings.target_lang,
        };
        let source = match config.source_lang.as_deref() {
            Some(code) => code
                .parse::<SourceLanguage>()
                .with_context(|| "invalid source language")?,
            None => settings.source_lang,
        };

        let (mut providers, fallback) = if config.offline {
            let phrasebook = ProviderImpl::Phrasebook(PhrasebookProvider::new(Arc::clone(&lexicon)));
            (vec![phrasebook], None)
        } else {
            let client = reqwest::Client::builder()
                .timeout(settings.timeout)
                .build()
                .with_context(|| "failed to build HTTP client")?;
            let providers = providers::build_providers(&settings, &client, &lexicon)?;
            let fallback = match settings.fallback.as_deref() {
                Some(name) => {
                    let kind = providers::resolve_kind(name)
                        .with_context(|| "invalid [aggregator] fallback")?;
                    Some(providers::build_provider(kind, &settings, &client, &lexicon))
                }
                None => None,
            };
            (providers, fallback)
        };

        if let Some(rate) = config.fault_rate {
            if !(0.0..=1.0).contains(&rate) {
                return Err(anyhow!("fault rate must be between 0 and 1, got {}", rate));
            }
            providers = providers
                .into_iter()
                .map(|provider| provider.with_faults(FaultPlan::Random { rate, seed: None }))
                .collect();
        }

        let scorer =
            QualityScorer::new(Arc::clone(&lexicon)).with_reputation(settings.reputation.clone());
        let aggregator = Aggregator::new(providers, scorer, PostProcessor::new(Arc::clone(&lexicon)))
            .with_timeout(settings.timeout);
        let translator = Translator::new(aggregator, Arc::clone(&lexicon)).with_fallback(fallback);

        Ok(Self {
            translator,
            lexicon,
            pair: LanguagePair::new(source, target),
        })
    }

    pub fn pair(&self) -> LanguagePair {
        self.pair
    }

    pub fn pair_mut(&mut self) -> &mut LanguagePair {
        &mut self.pair
    }

    pub fn request(&self, text: &str) -> Result<TranslationRequest, RequestError> {
        TranslationRequest::with_lexicon(text, self.pair.source, self.pair.target, &self.lexicon)
    }

    pub async fn translate(&self, text: &str) -> Result<ExecutionOutput> {
        let request = self.request(text)?;
        Ok(self.translator.exec(&request).await)
    }
}

pub async fn run(config: Config, input: Option<String>) -> Result<String> {
    if config.show_enabled_languages {
        return Ok(format_languages(&Lexicon::bundled()));
    }

    let session = Session::new(&config)?;
    let input = input.unwrap_or_default();
    let execution = session.translate(&input).await?;

    Ok(format_execution_output(
        &execution,
        config.with_scores,
        config.with_strategy,
    ))
}

pub fn format_execution_output(
    execution: &ExecutionOutput,
    with_scores: bool,
    with_strategy: bool,
) -> String {
    let mut output = execution.text.clone();
    let mut meta_lines = Vec::new();

    if with_strategy {
        meta_lines.push(format!("strategy: {}", execution.strategy));
        meta_lines.push(format!(
            "languages: {} -> {}",
            execution.source_lang, execution.target_lang
        ));
        for diagnostic in &execution.diagnostics {
            meta_lines.push(format!("failed: {}", diagnostic));
        }
    }

    if with_scores {
        if execution.ranked.is_empty() {
            meta_lines.push("scores: unavailable".to_string());
        }
        for scored in &execution.ranked {
            meta_lines.push(format!(
                "score: {}={:.3} (raw {:.3}) {}",
                scored.candidate.source, scored.score, scored.breakdown.raw, scored.candidate.text
            ));
        }
    }

    if !meta_lines.is_empty() {
        output.push('\n');
        output.push_str(&meta_lines.join("\n"));
    }

    output
}

fn format_languages(lexicon: &Lexicon) -> String {
    Language::ALL
        .iter()
        .map(|lang| match lexicon.profile(*lang) {
            Some(profile) if profile.native != profile.name && !profile.native.is_empty() => {
                format!("{}\t{} ({})", lang, profile.name, profile.native)
            }
            Some(profile) => format!("{}\t{}", lang, profile.name),
            None => lang.to_string(),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::ScoreBreakdown;
    use crate::test_util::with_temp_home;

    fn execution() -> ExecutionOutput {
        ExecutionOutput {
            text: "Bonjour".to_string(),
            strategy: Strategy::Aggregated {
                provider: "mymemory".to_string(),
            },
            source_lang: Language::En,
            target_lang: Language::Fr,
            ranked: vec![ScoredCandidate {
                candidate: TranslationCandidate::new("Bonjour", "mymemory").with_confidence(0.9),
                score: 1.0,
                breakdown: ScoreBreakdown {
                    raw: 1.25,
                    ..ScoreBreakdown::default()
                },
            }],
            diagnostics: vec!["libretranslate: HTTP 403: forbidden".to_string()],
        }
    }

    #[test]
    fn plain_output_is_just_the_text() {
        assert_eq!(format_execution_output(&execution(), false, false), "Bonjour");
    }

    #[test]
    fn meta_lines_follow_the_text() {
        insta::assert_snapshot!(format_execution_output(&execution(), true, true), @r"
        Bonjour
        strategy: aggregated (mymemory)
        languages: en -> fr
        failed: libretranslate: HTTP 403: forbidden
        score: mymemory=1.000 (raw 1.250) Bonjour
        ");
    }

    #[test]
    fn lists_every_language() {
        let listing = format_languages(&Lexicon::bundled());
        assert_eq!(listing.lines().count(), Language::ALL.len());
        assert!(listing.contains("ar\tArabic (العربية)"));
        assert!(listing.contains("en\tEnglish"));
    }

    #[tokio::test]
    async fn offline_run_uses_the_phrasebook() {
        let output = with_temp_home(|_| {
            let config = Config {
                lang: Some("fr".to_string()),
                source_lang: Some("en".to_string()),
                offline: true,
                with_strategy: true,
                ..Config::default()
            };
            Session::new(&config).expect("session")
        })
        .translate("Good morning")
        .await
        .expect("translate");
        assert_eq!(output.text, "Bonjour");
        assert_eq!(
            output.strategy,
            Strategy::Aggregated {
                provider: "phrasebook".to_string()
            }
        );
    }

    #[tokio::test]
    async fn misspelled_arabic_input_is_corrected_first() {
        let session = with_temp_home(|_| {
            Session::new(&Config {
                lang: Some("en".to_string()),
                source_lang: Some("auto".to_string()),
                offline: true,
                ..Config::default()
            })
            .expect("session")
        });
        let output = session.translate("اين الفندق").await.expect("translate");
        assert_eq!(output.text, "Where is the hotel?");
        assert_eq!(output.source_lang, Language::Ar);
    }

    #[test]
    fn invalid_fault_rate_is_rejected() {
        with_temp_home(|_| {
            let config = Config {
                fault_rate: Some(1.5),
                offline: true,
                ..Config::default()
            };
            let err = Session::new(&config).unwrap_err();
            assert!(err.to_string().contains("fault rate"));
        });
    }

    #[tokio::test]
    async fn empty_input_is_rejected() {
        let session = with_temp_home(|_| {
            Session::new(&Config {
                offline: true,
                ..Config::default()
            })
            .expect("session")
        });
        let err = session.translate("   ").await.unwrap_err();
        assert!(err.downcast_ref::<RequestError>().is_some());
    }
}
