use tracing::debug;

use super::Language;
use crate::lexicon::{Lexicon, tokenize};

/// Outcome of resolving `auto`; `score` is the raw evidence count behind the
/// choice (0 means nothing matched and the default was used).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Detection {
    pub language: Language,
    pub score: usize,
}

const LATIN_LANGUAGES: [Language; 5] = [
    Language::En,
    Language::Fr,
    Language::De,
    Language::Es,
    Language::It,
];

#[derive(Debug, Default)]
struct ScriptCounts {
    arabic: usize,
    kana: usize,
    hangul: usize,
    han: usize,
    latin: usize,
}

impl ScriptCounts {
    fn count(text: &str) -> Self {
        let mut counts = ScriptCounts::default();
        for ch in text.chars() {
            match ch {
                '\u{0600}'..='\u{06FF}'
                | '\u{0750}'..='\u{077F}'
                | '\u{08A0}'..='\u{08FF}'
                | '\u{FB50}'..='\u{FDFF}'
                | '\u{FE70}'..='\u{FEFF}' => counts.arabic += 1,
                '\u{3040}'..='\u{309F}' | '\u{30A0}'..='\u{30FF}' => counts.kana += 1,
                '\u{AC00}'..='\u{D7AF}' | '\u{1100}'..='\u{11FF}' | '\u{3130}'..='\u{318F}' => {
                    counts.hangul += 1
                }
                '\u{4E00}'..='\u{9FFF}' => counts.han += 1,
                ch if ch.is_alphabetic() && ch <= '\u{024F}' => counts.latin += 1,
                _ => {}
            }
        }
        counts
    }
}

/// Frequency-scores character ranges, then stopwords and diacritics for
/// Latin-script text. Falls back to English when nothing matches.
pub fn detect_language(text: &str, lexicon: &Lexicon) -> Detection {
    let counts = ScriptCounts::count(text);

    // Kana marks Japanese even when most characters are shared Han ideographs.
    let (ja, zh) = if counts.kana > 0 {
        (counts.kana + counts.han, 0)
    } else {
        (0, counts.han)
    };
    let scripted = [
        (Language::Ar, counts.arabic),
        (Language::Ja, ja),
        (Language::Ko, counts.hangul),
        (Language::Zh, zh),
    ];
    let best = pick_strongest(&scripted);
    if best.score > 0 && best.score >= counts.latin {
        debug!("detected {} from script ({} chars)", best.language, best.score);
        return best;
    }

    if counts.latin == 0 {
        return Detection {
            language: Language::En,
            score: 0,
        };
    }

    let words = tokenize(text);
    let latin = LATIN_LANGUAGES.map(|lang| {
        let stopword_hits = words
            .iter()
            .filter(|word| lexicon.is_stopword(lang, word))
            .count();
        let diacritic_hits = text
            .chars()
            .filter_map(|ch| ch.to_lowercase().next())
            .filter(|ch| diacritics(lang).contains(*ch))
            .count();
        (lang, stopword_hits * 2 + diacritic_hits)
    });
    let best = pick_strongest(&latin);
    debug!("detected {} from latin evidence ({})", best.language, best.score);
    if best.score == 0 {
        return Detection {
            language: Language::En,
            score: 0,
        };
    }
    best
}

/// Highest score wins; earlier entries win ties.
fn pick_strongest(scores: &[(Language, usize)]) -> Detection {
    let mut best = Detection {
        language: Language::En,
        score: 0,
    };
    for &(language, score) in scores {
        if score > best.score {
            best = Detection { language, score };
        }
    }
    best
}

fn diacritics(lang: Language) -> &'static str {
    match lang {
        Language::Fr => "àâæçéèêëïîôœùûüÿ",
        Language::De => "äöüß",
        Language::Es => "ñáéíóúü¿¡",
        Language::It => "àèéìíîòóù",
        _ => "",
    }
}
