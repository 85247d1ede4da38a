use std::fmt;
use std::sync::Arc;
use tracing::{info, warn};

use crate::aggregator::{Aggregator, settle};
use crate::languages::Language;
use crate::lexicon::Lexicon;
use crate::phrasebook::Phrasebook;
use crate::postprocess::PostProcessor;
use crate::providers::Provider;
use crate::request::TranslationRequest;
use crate::scoring::ScoredCandidate;

/// Which step of the fallback chain produced the output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Strategy {
    Aggregated { provider: String },
    DirectFallback { provider: String },
    Phrasebook,
    Passthrough,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::Aggregated { provider } => write!(f, "aggregated ({})", provider),
            Strategy::DirectFallback { provider } => write!(f, "fallback ({})", provider),
            Strategy::Phrasebook => f.write_str("phrasebook"),
            Strategy::Passthrough => f.write_str("passthrough"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExecutionOutput {
    pub text: String,
    pub strategy: Strategy,
    pub source_lang: Language,
    pub target_lang: Language,
    /// Scored candidates from the aggregation round, best first. Empty when
    /// aggregation failed.
    pub ranked: Vec<ScoredCandidate>,
    pub diagnostics: Vec<String>,
}

/// Aggregation plus the fallback chain: direct provider call, phrasebook,
/// then the original text.
#[derive(Debug, Clone)]
pub struct Translator<P: Provider> {
    aggregator: Aggregator<P>,
    fallback: Option<P>,
    phrasebook: Phrasebook,
    post: PostProcessor,
}

impl<P: Provider> Translator<P> {
    pub fn new(aggregator: Aggregator<P>, lexicon: Arc<Lexicon>) -> Self {
        Self {
            aggregator,
            fallback: None,
            phrasebook: Phrasebook::new(Arc::clone(&lexicon)),
            post: PostProcessor::new(lexicon),
        }
    }

    pub fn with_fallback(mut self, fallback: Option<P>) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn aggregator(&self) -> &Aggregator<P> {
        &self.aggregator
    }

    /// Always produces output; failures only show up in `diagnostics`.
    pub async fn exec(&self, request: &TranslationRequest) -> ExecutionOutput {
        let mut output = ExecutionOutput {
            text: String::new(),
            strategy: Strategy::Passthrough,
            source_lang: request.source(),
            target_lang: request.target(),
            ranked: Vec::new(),
            diagnostics: Vec::new(),
        };

        match self.aggregator.aggregate(request).await {
            Ok(outcome) => {
                output.diagnostics = outcome.failures.iter().map(ToString::to_string).collect();
                output.strategy = Strategy::Aggregated {
                    provider: outcome.winner.candidate.source.clone(),
                };
                output.text = outcome.text;
                output.ranked = outcome.ranked;
                return output;
            }
            Err(err) => {
                warn!("{}", err);
                output.diagnostics.push(err.to_string());
                output
                    .diagnostics
                    .extend(err.failures.iter().map(ToString::to_string));
            }
        }

        if let Some(fallback) = &self.fallback {
            info!("trying direct fallback via {}", fallback.source());
            match settle(fallback, request, self.aggregator.timeout()).await {
                Ok(candidate) => {
                    output.text = self.post.apply(&candidate.text, request);
                    output.strategy = Strategy::DirectFallback {
                        provider: candidate.source,
                    };
                    return output;
                }
                Err(err) => {
                    warn!("direct fallback failed: {}", err);
                    output.diagnostics.push(err.to_string());
                }
            }
        }

        if let Some(hit) =
            self.phrasebook
                .lookup(request.text(), request.source(), request.target())
        {
            info!("phrasebook matched '{}'", hit.matched);
            output.text = self.post.apply(&hit.text, request);
            output.strategy = Strategy::Phrasebook;
            return output;
        }

        info!("no translation available; returning the original text");
        output.text = request.text().to_string();
        output
    }
}
