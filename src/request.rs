use tracing::debug;

use crate::error::RequestError;
use crate::languages::{Language, SourceLanguage};
use crate::lexicon::Lexicon;

/// Confidence assumed for providers that do not report one.
pub const DEFAULT_CONFIDENCE: f64 = 0.5;

/// A validated translation request. The text has known misspellings
/// corrected and the source language is always concrete: `auto` is resolved
/// before the request reaches any provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationRequest {
    text: String,
    source: Language,
    target: Language,
}

impl TranslationRequest {
    pub fn new(
        text: impl Into<String>,
        source: SourceLanguage,
        target: Language,
    ) -> Result<Self, RequestError> {
        Self::with_lexicon(text, source, target, &Lexicon::bundled())
    }

    pub fn with_lexicon(
        text: impl Into<String>,
        source: SourceLanguage,
        target: Language,
        lexicon: &Lexicon,
    ) -> Result<Self, RequestError> {
        let text = text.into();
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(RequestError::EmptyInput);
        }
        let corrected = lexicon.correct(trimmed);
        if corrected != trimmed {
            debug!("corrected input spelling: {:?} -> {:?}", trimmed, corrected);
        }
        let source = source.resolve(&corrected, lexicon);
        Ok(Self {
            text: corrected,
            source,
            target,
        })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn source(&self) -> Language {
        self.source
    }

    pub fn target(&self) -> Language {
        self.target
    }
}

/// One provider's proposed translation.
#[derive(Debug, Clone, PartialEq)]
pub struct TranslationCandidate {
    pub text: String,
    pub confidence: Option<f64>,
    pub source: String,
}

impl TranslationCandidate {
    pub fn new(text: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            confidence: None,
            source: source.into(),
        }
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = Some(confidence);
        self
    }

    /// Reported confidence clamped to [0, 1]; absent or NaN values count as
    /// the default.
    pub fn effective_confidence(&self) -> f64 {
        match self.confidence {
            Some(value) if !value.is_nan() => value.clamp(0.0, 1.0),
            _ => DEFAULT_CONFIDENCE,
        }
    }
}
