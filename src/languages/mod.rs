use std::fmt;
use std::str::FromStr;

use crate::error::RequestError;
use crate::lexicon::Lexicon;

mod detect;

pub use detect::{Detection, detect_language};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Language {
    Ar,
    En,
    Fr,
    Es,
    De,
    It,
    Ja,
    Ko,
    Zh,
}

/// Writing-system class; drives punctuation, casing and tokenization rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Script {
    Arabic,
    Latin,
    Cjk,
    Hangul,
}

impl Language {
    pub const ALL: [Language; 9] = [
        Language::Ar,
        Language::En,
        Language::Fr,
        Language::Es,
        Language::De,
        Language::It,
        Language::Ja,
        Language::Ko,
        Language::Zh,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Ar => "ar",
            Language::En => "en",
            Language::Fr => "fr",
            Language::Es => "es",
            Language::De => "de",
            Language::It => "it",
            Language::Ja => "ja",
            Language::Ko => "ko",
            Language::Zh => "zh",
        }
    }

    pub fn script(&self) -> Script {
        match self {
            Language::Ar => Script::Arabic,
            Language::En | Language::Fr | Language::Es | Language::De | Language::It => {
                Script::Latin
            }
            Language::Ja | Language::Zh => Script::Cjk,
            Language::Ko => Script::Hangul,
        }
    }

    pub fn question_mark(&self) -> char {
        match self.script() {
            Script::Arabic => '؟',
            Script::Cjk => '？',
            Script::Latin | Script::Hangul => '?',
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Language {
    type Err = RequestError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let base = split_region(value);
        Language::ALL
            .into_iter()
            .find(|lang| lang.as_str() == base)
            .ok_or_else(|| RequestError::UnsupportedLanguage(value.trim().to_string()))
    }
}

/// Source side of a request: a concrete language or the `auto` sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceLanguage {
    Auto,
    Known(Language),
}

impl SourceLanguage {
    /// Resolves `auto` against the text; known languages pass through.
    pub fn resolve(self, text: &str, lexicon: &Lexicon) -> Language {
        match self {
            SourceLanguage::Known(lang) => lang,
            SourceLanguage::Auto => detect_language(text, lexicon).language,
        }
    }
}

impl fmt::Display for SourceLanguage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceLanguage::Auto => f.write_str("auto"),
            SourceLanguage::Known(lang) => lang.fmt(f),
        }
    }
}

impl FromStr for SourceLanguage {
    type Err = RequestError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        if value.trim().eq_ignore_ascii_case("auto") {
            return Ok(SourceLanguage::Auto);
        }
        value.parse().map(SourceLanguage::Known)
    }
}

impl From<Language> for SourceLanguage {
    fn from(lang: Language) -> Self {
        SourceLanguage::Known(lang)
    }
}

/// The caller-owned language selection for a translation session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LanguagePair {
    pub source: SourceLanguage,
    pub target: Language,
}

impl LanguagePair {
    pub fn new(source: SourceLanguage, target: Language) -> Self {
        Self { source, target }
    }

    /// Swapping is refused while the source is auto-detected, since there is
    /// no concrete language to move to the target side.
    pub fn swap(&mut self) -> Result<(), RequestError> {
        let SourceLanguage::Known(source) = self.source else {
            return Err(RequestError::SwapWithAuto);
        };
        self.source = SourceLanguage::Known(self.target);
        self.target = source;
        Ok(())
    }
}

fn split_region(code: &str) -> String {
    let code = code.trim().to_lowercase();
    code.split(['-', '_'])
        .next()
        .unwrap_or_default()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_codes_with_region_suffix() {
        assert_eq!("zh-CN".parse::<Language>(), Ok(Language::Zh));
        assert_eq!("en_US".parse::<Language>(), Ok(Language::En));
        assert_eq!(" AR ".parse::<Language>(), Ok(Language::Ar));
        assert_eq!(
            "pt".parse::<Language>(),
            Err(RequestError::UnsupportedLanguage("pt".to_string()))
        );
    }

    #[test]
    fn auto_is_only_valid_as_source() {
        assert_eq!("auto".parse::<SourceLanguage>(), Ok(SourceLanguage::Auto));
        assert!("auto".parse::<Language>().is_err());
        assert_eq!(
            "fr".parse::<SourceLanguage>(),
            Ok(SourceLanguage::Known(Language::Fr))
        );
    }

    #[test]
    fn swap_exchanges_known_languages() {
        let mut pair = LanguagePair::new(Language::Ar.into(), Language::En);
        pair.swap().expect("swap");
        assert_eq!(pair.source, SourceLanguage::Known(Language::En));
        assert_eq!(pair.target, Language::Ar);
    }

    #[test]
    fn swap_refuses_auto_source() {
        let mut pair = LanguagePair::new(SourceLanguage::Auto, Language::En);
        assert_eq!(pair.swap(), Err(RequestError::SwapWithAuto));
        assert_eq!(pair.source, SourceLanguage::Auto);
    }

    #[test]
    fn question_marks_follow_script() {
        assert_eq!(Language::Ar.question_mark(), '؟');
        assert_eq!(Language::Zh.question_mark(), '？');
        assert_eq!(Language::Ko.question_mark(), '?');
    }
}
