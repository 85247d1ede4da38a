use std::sync::Arc;

use crate::languages::{Language, Script};
use crate::lexicon::{Lexicon, PhraseGroup, contains_phrase, tokenize};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    /// The whole input is a known phrase.
    Exact,
    /// A multi-word phrase occurs inside the input.
    Partial,
    /// Only a single non-stopword of the input is known.
    Word,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhrasebookHit {
    pub text: String,
    pub matched: String,
    pub kind: MatchKind,
}

/// Static phrase lookup over the shared lexicon; the last fallback before
/// giving the original text back.
#[derive(Debug, Clone)]
pub struct Phrasebook {
    lexicon: Arc<Lexicon>,
}

impl Phrasebook {
    pub fn new(lexicon: Arc<Lexicon>) -> Self {
        Self { lexicon }
    }

    pub fn lookup(&self, text: &str, source: Language, target: Language) -> Option<PhrasebookHit> {
        self.exact(text, source, target)
            .or_else(|| self.partial(text, source, target))
            .or_else(|| self.by_word(text, source, target))
    }

    fn exact(&self, text: &str, source: Language, target: Language) -> Option<PhrasebookHit> {
        let key = lookup_key(text, source.script());
        if key.is_empty() {
            return None;
        }
        let in_language = |lang: Language| {
            self.groups_for(target).find_map(|(group, rendering)| {
                group
                    .aliases(lang)
                    .iter()
                    .find(|alias| lookup_key(alias, lang.script()) == key)
                    .map(|alias| hit(rendering, alias, MatchKind::Exact))
            })
        };
        // Detection can mislabel short inputs, so other languages are tried
        // after the declared source.
        in_language(source).or_else(|| {
            Language::ALL
                .into_iter()
                .filter(|lang| *lang != source)
                .find_map(&in_language)
        })
    }

    fn partial(&self, text: &str, source: Language, target: Language) -> Option<PhrasebookHit> {
        let script = source.script();
        let mut best: Option<(usize, &str, &str)> = None;
        for (group, rendering) in self.groups_for(target) {
            for alias in group.aliases(source) {
                let size = alias_size(alias, script);
                if size < 2 || !contains_phrase(text, alias, script) {
                    continue;
                }
                if best.is_none_or(|(best_size, _, _)| size > best_size) {
                    best = Some((size, rendering, alias.as_str()));
                }
            }
        }
        best.map(|(_, rendering, alias)| hit(rendering, alias, MatchKind::Partial))
    }

    fn by_word(&self, text: &str, source: Language, target: Language) -> Option<PhrasebookHit> {
        let script = source.script();
        let words: Vec<String> = if script == Script::Cjk {
            text.chars()
                .filter(|ch| ch.is_alphanumeric())
                .map(|ch| ch.to_string())
                .collect()
        } else {
            tokenize(text)
        };
        words
            .iter()
            .filter(|word| !self.lexicon.is_stopword(source, word))
            .find_map(|word| {
                self.groups_for(target).find_map(|(group, rendering)| {
                    group
                        .aliases(source)
                        .iter()
                        .find(|alias| lookup_key(alias, script) == *word)
                        .map(|alias| hit(rendering, alias, MatchKind::Word))
                })
            })
    }

    fn groups_for(&self, target: Language) -> impl Iterator<Item = (&PhraseGroup, &str)> {
        self.lexicon
            .phrases()
            .iter()
            .filter_map(move |group| group.canonical(target).map(|rendering| (group, rendering)))
    }
}

fn hit(rendering: &str, alias: &str, kind: MatchKind) -> PhrasebookHit {
    PhrasebookHit {
        text: rendering.to_string(),
        matched: alias.to_string(),
        kind,
    }
}

fn lookup_key(text: &str, script: Script) -> String {
    if script == Script::Cjk {
        text.chars()
            .filter(|ch| ch.is_alphanumeric())
            .flat_map(char::to_lowercase)
            .collect()
    } else {
        tokenize(text).join(" ")
    }
}

fn alias_size(alias: &str, script: Script) -> usize {
    if script == Script::Cjk {
        alias.chars().filter(|ch| ch.is_alphanumeric()).count()
    } else {
        tokenize(alias).len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn phrasebook() -> Phrasebook {
        Phrasebook::new(Lexicon::bundled())
    }

    #[test]
    fn exact_phrase_lookup() {
        let hit = phrasebook()
            .lookup("مرحبا", Language::Ar, Language::En)
            .expect("hit");
        assert_eq!(hit.text, "Hello");
        assert_eq!(hit.kind, MatchKind::Exact);

        let hit = phrasebook()
            .lookup("  HELLO!! ", Language::En, Language::Fr)
            .expect("hit");
        assert_eq!(hit.text, "Bonjour");
    }

    #[test]
    fn exact_lookup_tolerates_misdetected_source() {
        let hit = phrasebook()
            .lookup("Bonjour", Language::En, Language::Ar)
            .expect("hit");
        assert_eq!(hit.text, "مرحبا");
        assert_eq!(hit.kind, MatchKind::Exact);
    }

    #[test]
    fn longest_contained_phrase_wins() {
        let hit = phrasebook()
            .lookup(
                "excuse me, where is the hotel please",
                Language::En,
                Language::De,
            )
            .expect("hit");
        assert_eq!(hit.text, "Wo ist das Hotel");
        assert_eq!(hit.matched, "Where is the hotel");
        assert_eq!(hit.kind, MatchKind::Partial);
    }

    #[test]
    fn contained_phrase_in_cjk_text() {
        let hit = phrasebook()
            .lookup("请给我水吧", Language::Zh, Language::En)
            .expect("hit");
        assert_eq!(hit.text, "Water please");
    }

    #[test]
    fn falls_back_to_first_known_word() {
        let hit = phrasebook()
            .lookup("the weather is hot", Language::En, Language::Ar)
            .expect("hit");
        assert_eq!(hit.text, "حار");
        assert_eq!(hit.kind, MatchKind::Word);
    }

    #[test]
    fn unknown_text_and_missing_targets_miss() {
        assert_eq!(
            phrasebook().lookup("qwerty", Language::En, Language::Fr),
            None
        );
    }

    #[test]
    fn who_maps_to_arabic_without_hijacking_from() {
        let hit = phrasebook()
            .lookup("who", Language::En, Language::Ar)
            .expect("hit");
        assert_eq!(hit.text, "من");
        assert_eq!(hit.kind, MatchKind::Exact);

        // "من" also means "from"; as a lone stopword it never decides a
        // word-level match.
        let hit = phrasebook()
            .lookup("رسالة من صديق قديم", Language::Ar, Language::En)
            .expect("hit");
        assert_eq!(hit.text, "Old");
    }
}
