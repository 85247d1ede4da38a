use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::languages::Language;
use crate::lexicon::{Lexicon, contains_phrase, normalize_token, tokenize};
use crate::request::{TranslationCandidate, TranslationRequest};

pub const MAX_REPUTATION: f64 = 0.2;

/// Reputation used when settings do not override it.
pub const DEFAULT_REPUTATION: [(&str, f64); 3] = [
    ("mymemory", 0.15),
    ("libretranslate", 0.10),
    ("phrasebook", 0.05),
];

const KEY_TERM_LIMIT: usize = 5;
const KEY_TERM_MIN_CHARS: usize = 4;
const SENTENCE_TERMINATORS: [char; 7] = ['.', '!', '?', '؟', '。', '！', '？'];

/// Every term that went into a score, kept for `--with-scores` output and
/// for ranking ties.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScoreBreakdown {
    pub base: f64,
    pub length: f64,
    pub reputation: f64,
    pub key_terms: f64,
    pub punctuation: f64,
    pub fluency: f64,
    pub identity_penalty: f64,
    pub coherence: f64,
    /// Sum of all terms before clamping.
    pub raw: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScoredCandidate {
    pub candidate: TranslationCandidate,
    pub score: f64,
    pub breakdown: ScoreBreakdown,
}

/// Heuristic quality estimate in [0, 1]. Pure: the same candidate and
/// request always score the same.
#[derive(Debug, Clone)]
pub struct QualityScorer {
    reputation: HashMap<String, f64>,
    lexicon: Arc<Lexicon>,
}

impl Default for QualityScorer {
    fn default() -> Self {
        Self::new(Lexicon::bundled())
    }
}

impl QualityScorer {
    pub fn new(lexicon: Arc<Lexicon>) -> Self {
        let reputation = DEFAULT_REPUTATION
            .iter()
            .map(|(source, value)| (source.to_string(), *value))
            .collect();
        Self {
            reputation,
            lexicon,
        }
    }

    /// Replaces the reputation table; values are clamped to
    /// `[0, MAX_REPUTATION]`.
    pub fn with_reputation(mut self, reputation: HashMap<String, f64>) -> Self {
        self.reputation = reputation
            .into_iter()
            .map(|(source, value)| {
                let value = if value.is_nan() { 0.0 } else { value };
                (source, value.clamp(0.0, MAX_REPUTATION))
            })
            .collect();
        self
    }

    pub fn reputation(&self, source: &str) -> f64 {
        self.reputation.get(source).copied().unwrap_or(0.0)
    }

    pub fn score(
        &self,
        candidate: &TranslationCandidate,
        request: &TranslationRequest,
    ) -> ScoredCandidate {
        let text = candidate.text.trim();
        let original = request.text().trim();

        let mut breakdown = ScoreBreakdown {
            base: candidate.effective_confidence(),
            length: length_bonus(text, original),
            reputation: self.reputation(&candidate.source),
            key_terms: self.key_term_bonus(text, request),
            punctuation: punctuation_bonus(text, request.target()),
            fluency: fluency_bonus(text),
            identity_penalty: if text == original { -0.4 } else { 0.0 },
            coherence: self.coherence_bonus(text, request.target()),
            raw: 0.0,
        };
        breakdown.raw = breakdown.base
            + breakdown.length
            + breakdown.reputation
            + breakdown.key_terms
            + breakdown.punctuation
            + breakdown.fluency
            + breakdown.identity_penalty
            + breakdown.coherence;

        ScoredCandidate {
            candidate: candidate.clone(),
            score: breakdown.raw.clamp(0.0, 1.0),
            breakdown,
        }
    }

    fn key_term_bonus(&self, text: &str, request: &TranslationRequest) -> f64 {
        let source = request.source();
        let target = request.target();
        let hits = important_words(request.text(), source, &self.lexicon)
            .iter()
            .filter(|word| {
                self.lexicon
                    .term_translations(word, source, target)
                    .iter()
                    .any(|rendering| contains_phrase(text, rendering, target.script()))
            })
            .count();
        hits as f64 * 0.05
    }

    fn coherence_bonus(&self, text: &str, target: Language) -> f64 {
        let mut bonus = 0.0;
        if ends_cleanly(text) {
            bonus += 0.05;
        }
        if let Some(profile) = self.lexicon.profile(target) {
            let connectives = profile
                .connectives
                .iter()
                .filter(|connective| contains_phrase(text, connective, target.script()))
                .collect::<HashSet<_>>()
                .len()
                .min(2);
            bonus += connectives as f64 * 0.05;
        }
        bonus.min(0.15)
    }
}

/// Lowercased non-stopwords longer than three characters, first five only,
/// in order of appearance.
fn important_words(original: &str, source: Language, lexicon: &Lexicon) -> Vec<String> {
    let mut seen = HashSet::new();
    original
        .split_whitespace()
        .map(normalize_token)
        .filter(|word| word.chars().count() >= KEY_TERM_MIN_CHARS)
        .filter(|word| !lexicon.is_stopword(source, word))
        .filter(|word| seen.insert(word.clone()))
        .take(KEY_TERM_LIMIT)
        .collect()
}

fn length_bonus(text: &str, original: &str) -> f64 {
    let original_len = original.chars().count();
    if original_len == 0 {
        return 0.0;
    }
    let ratio = text.chars().count() as f64 / original_len as f64;
    if (0.7..=1.5).contains(&ratio) {
        0.3
    } else if (0.5..=2.0).contains(&ratio) {
        0.1
    } else {
        0.0
    }
}

fn punctuation_bonus(text: &str, target: Language) -> f64 {
    let foreign: &[char] = if target == Language::Ar {
        &[',', ';', '?']
    } else {
        &['،', '؛', '؟']
    };
    if text.contains(foreign) { 0.0 } else { 0.1 }
}

fn fluency_bonus(text: &str) -> f64 {
    let words = tokenize(text);
    if words.len() <= 2 {
        return 0.0;
    }
    let unique = words.iter().collect::<HashSet<_>>().len();
    if unique as f64 / words.len() as f64 > 0.7 {
        0.15
    } else {
        0.0
    }
}

fn ends_cleanly(text: &str) -> bool {
    if !text.ends_with(SENTENCE_TERMINATORS) {
        return false;
    }
    let body = text.trim_end_matches(SENTENCE_TERMINATORS);
    // Runs like "?!" close one sentence; an empty segment inside the text
    // means stray terminators.
    !body.trim().is_empty()
        && body
            .split(SENTENCE_TERMINATORS)
            .all(|segment| !segment.trim().is_empty())
}
