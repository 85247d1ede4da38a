use std::sync::Arc;

use super::{Provider, ProviderFuture};
use crate::error::ProviderError;
use crate::lexicon::Lexicon;
use crate::phrasebook::{MatchKind, Phrasebook};
use crate::request::{TranslationCandidate, TranslationRequest};

const SOURCE: &str = "phrasebook";

/// Offline provider answering from the bundled phrase groups. Confidence
/// reflects how much of the input the match covered.
#[derive(Debug, Clone)]
pub struct PhrasebookProvider {
    phrasebook: Phrasebook,
}

impl PhrasebookProvider {
    pub fn new(lexicon: Arc<Lexicon>) -> Self {
        Self {
            phrasebook: Phrasebook::new(lexicon),
        }
    }
}

fn confidence(kind: MatchKind) -> f64 {
    match kind {
        MatchKind::Exact => 0.6,
        MatchKind::Partial => 0.4,
        MatchKind::Word => 0.3,
    }
}

impl Provider for PhrasebookProvider {
    fn source(&self) -> &str {
        SOURCE
    }

    fn translate(&self, request: &TranslationRequest) -> ProviderFuture {
        let result = match self
            .phrasebook
            .lookup(request.text(), request.source(), request.target())
        {
            Some(hit) => Ok(TranslationCandidate::new(hit.text, SOURCE)
                .with_confidence(confidence(hit.kind))),
            None => Err(ProviderError::NoTranslation {
                provider: SOURCE.to_string(),
            }),
        };
        Box::pin(async move { result })
    }
}
