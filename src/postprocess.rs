use std::sync::Arc;

use crate::languages::{Language, Script};
use crate::lexicon::{Lexicon, normalize_token};
use crate::request::TranslationRequest;

const QUESTION_MARKS: [char; 3] = ['?', '؟', '？'];
const TERMINATORS: [char; 8] = ['.', '!', '?', '؟', '。', '！', '？', '…'];
const COLLAPSIBLE: [char; 5] = ['!', '?', '؟', '！', '？'];

/// Surface normalization of the winning candidate for its target language.
#[derive(Debug, Clone)]
pub struct PostProcessor {
    lexicon: Arc<Lexicon>,
}

impl Default for PostProcessor {
    fn default() -> Self {
        Self::new(Lexicon::bundled())
    }
}

impl PostProcessor {
    pub fn new(lexicon: Arc<Lexicon>) -> Self {
        Self { lexicon }
    }

    pub fn apply(&self, text: &str, request: &TranslationRequest) -> String {
        let question = is_question(request.text(), request.source(), &self.lexicon);
        post_process(text, request.target(), question)
    }
}

/// Idempotent: applying it to its own output changes nothing.
pub fn post_process(text: &str, target: Language, is_question: bool) -> String {
    let text = collapse_whitespace(text);
    let text = map_punctuation(&text, target);
    let text = collapse_repeats(&text);
    let text = if target.script() == Script::Latin {
        capitalize_first(&text)
    } else {
        text
    };
    if is_question {
        ensure_question_mark(&text, target)
    } else {
        text
    }
}

/// A trailing question mark in any convention, a leading `¿`, a leading
/// interrogative word of the source language, or an unterminated
/// auxiliary-pronoun opening such as "do you".
pub fn is_question(text: &str, source: Language, lexicon: &Lexicon) -> bool {
    let text = text.trim();
    if text.ends_with(QUESTION_MARKS) || text.starts_with('¿') {
        return true;
    }
    let Some(profile) = lexicon.profile(source) else {
        return false;
    };
    if source.script() == Script::Cjk {
        return profile
            .interrogatives
            .iter()
            .any(|word| text.starts_with(word.as_str()));
    }

    let mut words = text.split_whitespace().map(normalize_token);
    let Some(first) = words.next() else {
        return false;
    };
    if profile.interrogatives.contains(&first) {
        return true;
    }
    if text.ends_with(TERMINATORS) || !profile.auxiliaries.contains(&first) {
        return false;
    }
    words
        .next()
        .is_some_and(|second| profile.pronouns.contains(&second))
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn map_punctuation(text: &str, target: Language) -> String {
    text.chars()
        .map(|ch| match (target, ch) {
            (Language::Ar, ',') => '،',
            (Language::Ar, ';') => '؛',
            (Language::Ar, '?') => '؟',
            (Language::Ar, _) => ch,
            (_, '،') => ',',
            (_, '؛') => ';',
            (Language::Ja | Language::Zh, '؟') => '？',
            (_, '؟') => '?',
            _ => ch,
        })
        .collect()
}

fn collapse_repeats(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut previous = None;
    for ch in text.chars() {
        if COLLAPSIBLE.contains(&ch) && previous == Some(ch) {
            continue;
        }
        out.push(ch);
        previous = Some(ch);
    }
    out
}

/// Uppercases the first letter when nothing but punctuation precedes it;
/// text opening with a digit or symbol is left alone.
fn capitalize_first(text: &str) -> String {
    let Some((index, first)) = text
        .char_indices()
        .find(|&(_, ch)| !ch.is_ascii_punctuation() && !matches!(ch, '¿' | '¡' | '«' | '“' | '‘'))
    else {
        return text.to_string();
    };
    if !first.is_alphabetic() || first.is_uppercase() {
        return text.to_string();
    }
    let mut out = String::with_capacity(text.len() + 2);
    out.push_str(&text[..index]);
    out.extend(first.to_uppercase());
    out.push_str(&text[index + first.len_utf8()..]);
    out
}

fn ensure_question_mark(text: &str, target: Language) -> String {
    let mark = target.question_mark();
    if text.ends_with(mark) {
        return text.to_string();
    }
    let mut out = text.trim_end_matches(TERMINATORS).trim_end().to_string();
    out.push(mark);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::languages::SourceLanguage;

    #[test]
    fn collapses_repeated_exclamation() {
        assert_eq!(post_process("Bonjour!!!", Language::Fr, false), "Bonjour!");
    }

    #[test]
    fn keeps_ellipsis() {
        assert_eq!(post_process("wait...", Language::En, false), "Wait...");
    }

    #[test]
    fn arabic_targets_use_arabic_marks() {
        assert_eq!(
            post_process("أين   الفندق, من فضلك?", Language::Ar, false),
            "أين الفندق، من فضلك؟"
        );
        assert_eq!(post_process("Where؟", Language::En, false), "Where?");
        assert_eq!(post_process("どこ؟؟", Language::Ja, false), "どこ？");
    }

    #[test]
    fn questions_get_the_target_mark() {
        assert_eq!(post_process("où est l'hôtel.", Language::Fr, true), "Où est l'hôtel?");
        assert_eq!(post_process("أين الفندق", Language::Ar, true), "أين الفندق؟");
        assert_eq!(post_process("酒店在哪里", Language::Zh, true), "酒店在哪里？");
        assert_eq!(post_process("Where is it ?", Language::En, true), "Where is it ?");
    }

    #[test]
    fn capitalises_only_latin_targets() {
        assert_eq!(post_process("\"hello\" there", Language::En, false), "\"Hello\" there");
        assert_eq!(post_process("éte", Language::Fr, false), "Éte");
        assert_eq!(post_process("ホテル", Language::Ja, false), "ホテル");
        assert_eq!(post_process("¿dónde?", Language::Es, false), "¿Dónde?");
    }

    #[test]
    fn leading_digits_are_not_capitalised() {
        assert_eq!(
            post_process("3 hôtels près d'ici", Language::Fr, false),
            "3 hôtels près d'ici"
        );
        assert_eq!(post_process("- ok", Language::En, false), "- ok");
    }

    #[test]
    fn idempotent_for_every_target() {
        let samples = [
            "Bonjour!!!",
            "  hello   world ?? ",
            "أين الفندق?? , شكرا",
            "what؟؟ really!!",
            "wait... what?!?!",
            "ß straße",
            "¿dónde está?",
            "",
            "!!!",
            "ホテルはどこですか？？",
            "x ؛ y ، z",
        ];
        for target in Language::ALL {
            for sample in samples {
                for question in [false, true] {
                    let once = post_process(sample, target, question);
                    let twice = post_process(&once, target, question);
                    assert_eq!(once, twice, "{sample:?} -> {target} (question: {question})");
                }
            }
        }
    }

    #[test]
    fn detects_questions() {
        let lexicon = Lexicon::bundled();
        assert!(is_question("Where is the hotel", Language::En, &lexicon));
        assert!(is_question("أين الفندق", Language::Ar, &lexicon));
        assert!(is_question("Hello?", Language::En, &lexicon));
        assert!(is_question("¿Dónde está?", Language::Es, &lexicon));
        assert!(is_question("哪里有酒店", Language::Zh, &lexicon));
        assert!(!is_question("Thank you", Language::En, &lexicon));
        assert!(!is_question("من فضلك", Language::Ar, &lexicon));
    }

    #[test]
    fn auxiliaries_need_a_pronoun_and_no_terminator() {
        let lexicon = Lexicon::bundled();
        assert!(is_question("Do you speak Arabic", Language::En, &lexicon));
        assert!(is_question("Gibt es hier ein Hotel", Language::De, &lexicon));
        assert!(!is_question("Do not disturb", Language::En, &lexicon));
        assert!(!is_question("Will you be there.", Language::En, &lexicon));
        assert!(!is_question("Is", Language::En, &lexicon));
        assert!(!is_question("Sprechen Sie langsam", Language::De, &lexicon));
    }

    #[test]
    fn imperatives_keep_their_meaning() {
        let request =
            TranslationRequest::new("Do not disturb", Language::En.into(), Language::Fr)
                .expect("request");
        let processor = PostProcessor::default();
        assert_eq!(processor.apply("ne pas déranger", &request), "Ne pas déranger");
    }

    #[test]
    fn processor_reads_the_question_from_the_request() {
        let request =
            TranslationRequest::new("Where is the station", SourceLanguage::Auto, Language::De)
                .expect("request");
        let processor = PostProcessor::default();
        assert_eq!(processor.apply("wo ist der bahnhof", &request), "Wo ist der bahnhof?");
    }
}
