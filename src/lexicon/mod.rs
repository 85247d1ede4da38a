use anyhow::{Context, Result, anyhow};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, OnceLock};
use tracing::error;

use crate::languages::{Language, Script};

pub const LEXICON_VERSION: u32 = 2;

const BUNDLED_LEXICON_TOML: &str = include_str!("lexicon.toml");

static BUNDLED: OnceLock<Arc<Lexicon>> = OnceLock::new();

/// Shared lookup data for every language-aware component: per-language
/// word lists, input spelling corrections, and multilingual phrase groups
/// used by the phrasebook and by key-term scoring.
#[derive(Debug, Clone, Default)]
pub struct Lexicon {
    languages: HashMap<Language, LanguageProfile>,
    corrections: HashMap<String, String>,
    phrases: Vec<PhraseGroup>,
}

#[derive(Debug, Clone, Default)]
pub struct LanguageProfile {
    pub name: String,
    pub native: String,
    pub stopwords: HashSet<String>,
    pub connectives: Vec<String>,
    pub interrogatives: Vec<String>,
    /// Verbs that open a yes/no question when followed by a pronoun.
    pub auxiliaries: Vec<String>,
    pub pronouns: Vec<String>,
}

/// One meaning rendered in several languages. The first alias per language
/// is the canonical rendering.
#[derive(Debug, Clone)]
pub struct PhraseGroup {
    entries: HashMap<Language, Vec<String>>,
}

impl PhraseGroup {
    pub fn aliases(&self, lang: Language) -> &[String] {
        self.entries.get(&lang).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn canonical(&self, lang: Language) -> Option<&str> {
        self.aliases(lang).first().map(String::as_str)
    }
}

impl Lexicon {
    /// The lexicon compiled into the binary. A broken asset degrades to an
    /// empty lexicon so translation keeps working without lexical bonuses.
    pub fn bundled() -> Arc<Lexicon> {
        BUNDLED
            .get_or_init(|| match Lexicon::parse(BUNDLED_LEXICON_TOML) {
                Ok(lexicon) => Arc::new(lexicon),
                Err(err) => {
                    error!("bundled lexicon is unusable: {:#}", err);
                    Arc::new(Lexicon::default())
                }
            })
            .clone()
    }

    pub fn parse(raw: &str) -> Result<Self> {
        let file: LexiconFile =
            toml::from_str(raw).with_context(|| "failed to parse lexicon data")?;
        if file.version != LEXICON_VERSION {
            return Err(anyhow!(
                "unsupported lexicon version {} (expected {})",
                file.version,
                LEXICON_VERSION
            ));
        }

        let mut languages = HashMap::new();
        for (code, profile) in file.languages {
            let lang: Language = code
                .parse()
                .with_context(|| format!("invalid language section '{}' in lexicon", code))?;
            languages.insert(lang, profile.into_profile());
        }

        let corrections = file
            .corrections
            .into_iter()
            .map(|(mistake, fix)| (mistake.trim().to_lowercase(), fix.trim().to_string()))
            .filter(|(mistake, fix)| !mistake.is_empty() && !fix.is_empty() && *mistake != *fix)
            .collect();

        let mut phrases = Vec::with_capacity(file.phrases.len());
        for (index, group) in file.phrases.into_iter().enumerate() {
            let mut entries = HashMap::new();
            for (code, aliases) in group {
                let lang: Language = code
                    .parse()
                    .with_context(|| format!("invalid language '{}' in phrase {}", code, index))?;
                let aliases = aliases
                    .into_iter()
                    .map(|alias| alias.trim().to_string())
                    .filter(|alias| !alias.is_empty())
                    .collect::<Vec<_>>();
                if !aliases.is_empty() {
                    entries.insert(lang, aliases);
                }
            }
            if entries.is_empty() {
                return Err(anyhow!("phrase group {} has no entries", index));
            }
            phrases.push(PhraseGroup { entries });
        }

        Ok(Lexicon {
            languages,
            corrections,
            phrases,
        })
    }

    pub fn profile(&self, lang: Language) -> Option<&LanguageProfile> {
        self.languages.get(&lang)
    }

    pub fn is_stopword(&self, lang: Language, word: &str) -> bool {
        self.profile(lang)
            .map(|profile| profile.stopwords.contains(&word.to_lowercase()))
            .unwrap_or(false)
    }

    /// Replaces known misspellings word by word. Surrounding punctuation and
    /// whitespace are kept, and a capitalized mistake yields a capitalized fix.
    pub fn correct(&self, text: &str) -> String {
        if self.corrections.is_empty() {
            return text.to_string();
        }
        text.split_inclusive(char::is_whitespace)
            .map(|piece| {
                let word = piece.trim_end();
                let lead = word.len() - word.trim_start_matches(is_edge_punctuation).len();
                let core = word.trim_matches(is_edge_punctuation);
                let Some(fix) = self.corrections.get(&core.to_lowercase()) else {
                    return piece.to_string();
                };
                let mut out = String::with_capacity(piece.len() + fix.len());
                out.push_str(&piece[..lead]);
                if core.chars().next().is_some_and(char::is_uppercase) {
                    let mut chars = fix.chars();
                    if let Some(first) = chars.next() {
                        out.extend(first.to_uppercase());
                        out.push_str(chars.as_str());
                    }
                } else {
                    out.push_str(fix);
                }
                out.push_str(&piece[lead + core.len()..]);
                out
            })
            .collect()
    }

    pub fn phrases(&self) -> &[PhraseGroup] {
        &self.phrases
    }

    /// Target-language renderings of every phrase group in which `word` is a
    /// single-word alias on the source side.
    pub fn term_translations(&self, word: &str, source: Language, target: Language) -> Vec<&str> {
        let word = normalize_token(word);
        if word.is_empty() {
            return Vec::new();
        }
        let mut found = Vec::new();
        for group in &self.phrases {
            let matches = group
                .aliases(source)
                .iter()
                .any(|alias| tokenize(alias) == [word.as_str()]);
            if matches {
                found.extend(group.aliases(target).iter().map(String::as_str));
            }
        }
        found
    }
}

/// Lowercases and strips leading/trailing punctuation; inner apostrophes and
/// hyphens are kept.
pub fn normalize_token(token: &str) -> String {
    token
        .trim_matches(|ch: char| !ch.is_alphanumeric())
        .to_lowercase()
}

pub fn tokenize(text: &str) -> Vec<String> {
    text.split_whitespace()
        .map(normalize_token)
        .filter(|token| !token.is_empty())
        .collect()
}

fn is_edge_punctuation(ch: char) -> bool {
    ch.is_ascii_punctuation()
        || matches!(
            ch,
            '¿' | '¡' | '«' | '»' | '“' | '”' | '‘' | '’' | '…' | '؟' | '،' | '؛' | '。' | '、'
                | '！' | '？'
        )
}

/// Whether `needle` occurs in `haystack`. Scripts written with spaces are
/// matched on whole words; CJK text is matched as a substring.
pub fn contains_phrase(haystack: &str, needle: &str, script: Script) -> bool {
    if script == Script::Cjk {
        let needle = needle.trim().to_lowercase();
        return !needle.is_empty() && haystack.to_lowercase().contains(&needle);
    }
    let needle = tokenize(needle);
    if needle.is_empty() {
        return false;
    }
    let haystack = tokenize(haystack);
    haystack
        .windows(needle.len())
        .any(|window| window == needle.as_slice())
}

#[derive(Debug, Deserialize)]
struct LexiconFile {
    version: u32,
    #[serde(default)]
    languages: BTreeMap<String, LanguageProfileFile>,
    #[serde(default)]
    corrections: BTreeMap<String, String>,
    #[serde(default)]
    phrases: Vec<BTreeMap<String, Vec<String>>>,
}

#[derive(Debug, Deserialize)]
struct LanguageProfileFile {
    name: String,
    native: Option<String>,
    #[serde(default)]
    stopwords: Vec<String>,
    #[serde(default)]
    connectives: Vec<String>,
    #[serde(default)]
    interrogatives: Vec<String>,
    #[serde(default)]
    auxiliaries: Vec<String>,
    #[serde(default)]
    pronouns: Vec<String>,
}

impl LanguageProfileFile {
    fn into_profile(self) -> LanguageProfile {
        let lower = |values: Vec<String>| {
            values
                .into_iter()
                .map(|value| value.trim().to_lowercase())
                .filter(|value| !value.is_empty())
                .collect::<Vec<_>>()
        };
        LanguageProfile {
            native: self.native.unwrap_or_else(|| self.name.clone()),
            name: self.name,
            stopwords: lower(self.stopwords).into_iter().collect(),
            connectives: lower(self.connectives),
            interrogatives: lower(self.interrogatives),
            auxiliaries: lower(self.auxiliaries),
            pronouns: lower(self.pronouns),
        }
    }
}
