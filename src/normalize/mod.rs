//! Text normalization: raw article text → model-ready text.
//!
//! Six stages always run in the order of [`Stage::ALL`]; later stages rely on
//! what earlier ones established (stopword matching expects lowercase,
//! digit-free, punctuation-free tokens). Each stage is also exposed as a plain
//! function so it can be exercised on its own.
//!
//! Re-normalizing normalizer output is stable: for `t = normalize(x)`,
//! `normalize(normalize(t)) == normalize(t)`.

pub mod lemma;
pub mod stopwords;

use crate::models::{NormalizedArticle, StoredArticle};
use itertools::Itertools;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::trace;

pub use lemma::{Lemmatizer, RuleLemmatizer};
pub use stopwords::StopwordSet;

/// A word glued to the next one by a period or comma: ` end.next `.
static GLUED_SENTENCE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\s\w+[.,])(\w+\s)").unwrap());

/// Normalization stages, in application order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    CaseFold,
    SentenceRepair,
    DigitStrip,
    PunctuationStrip,
    StopwordRemoval,
    Lemmatize,
}

impl Stage {
    pub const ALL: [Stage; 6] = [
        Stage::CaseFold,
        Stage::SentenceRepair,
        Stage::DigitStrip,
        Stage::PunctuationStrip,
        Stage::StopwordRemoval,
        Stage::Lemmatize,
    ];
}

/// Lowercase every character.
pub fn case_fold(text: &str) -> String {
    text.to_lowercase()
}

/// Insert a space between a word ending in `.`/`,` and the word glued to it.
pub fn repair_sentence_boundaries(text: &str) -> String {
    GLUED_SENTENCE.replace_all(text, "${1} ${2}").into_owned()
}

/// Drop whitespace-delimited tokens made only of numeric characters.
///
/// Tokens are rejoined with single spaces; `"abc 123 45a"` → `"abc 45a"`.
pub fn remove_numeric_tokens(text: &str) -> String {
    text.split_whitespace()
        .filter(|token| !token.chars().all(char::is_numeric))
        .join(" ")
}

/// Delete every ASCII punctuation character, leaving whitespace untouched.
pub fn remove_punctuation(text: &str) -> String {
    text.chars().filter(|c| !c.is_ascii_punctuation()).collect()
}

/// Drop stopwords and rejoin the remaining tokens with single spaces.
pub fn remove_stopwords(text: &str, stopwords: &StopwordSet) -> String {
    text.split_whitespace()
        .filter(|token| !stopwords.contains(token))
        .join(" ")
}

/// Replace tokens by their lemma, keeping the first occurrence of each lemma.
pub fn lemmatize<L: Lemmatizer + ?Sized>(text: &str, lemmatizer: &L) -> String {
    text.split_whitespace()
        .map(|token| lemmatizer.lemma(token).into_owned())
        .unique()
        .join(" ")
}

/// The full normalization pipeline with its resources loaded.
#[derive(Debug, Clone)]
pub struct Normalizer<L = RuleLemmatizer> {
    stopwords: StopwordSet,
    lemmatizer: L,
}

impl<L: Lemmatizer> Normalizer<L> {
    pub fn new(stopwords: StopwordSet, lemmatizer: L) -> Self {
        Self {
            stopwords,
            lemmatizer,
        }
    }

    /// Run one stage over `text`.
    pub fn apply(&self, stage: Stage, text: &str) -> String {
        match stage {
            Stage::CaseFold => case_fold(text),
            Stage::SentenceRepair => repair_sentence_boundaries(text),
            Stage::DigitStrip => remove_numeric_tokens(text),
            Stage::PunctuationStrip => remove_punctuation(text),
            Stage::StopwordRemoval => remove_stopwords(text, &self.stopwords),
            Stage::Lemmatize => lemmatize(text, &self.lemmatizer),
        }
    }

    /// Run every stage in order.
    pub fn normalize(&self, text: &str) -> String {
        Stage::ALL.iter().fold(text.to_string(), |current, &stage| {
            let next = self.apply(stage, &current);
            trace!(?stage, before = current.len(), after = next.len(), "Applied stage");
            next
        })
    }

    /// Normalize a stored article's text, keeping its key and title.
    pub fn normalize_article(&self, article: StoredArticle) -> NormalizedArticle {
        NormalizedArticle {
            pk: article.pk,
            text: self.normalize(&article.article),
            title: article.title,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::borrow::Cow;

    fn normalizer() -> Normalizer {
        Normalizer::new(StopwordSet::english(), RuleLemmatizer::new())
    }

    /// Lemmatizer that maps every form of "run" to "run".
    struct RunLemmatizer;

    impl Lemmatizer for RunLemmatizer {
        fn lemma<'a>(&self, token: &'a str) -> Cow<'a, str> {
            match token {
                "running" | "runs" | "ran" => Cow::Borrowed("run"),
                other => Cow::Borrowed(other),
            }
        }
    }

    #[test]
    fn test_case_fold() {
        assert_eq!(case_fold("Hello WORLD Élan"), "hello world élan");
    }

    #[test]
    fn test_sentence_repair() {
        assert_eq!(
            repair_sentence_boundaries("the end.next sentence"),
            "the end. next sentence"
        );
        assert_eq!(repair_sentence_boundaries(" one,two three"), " one, two three");
        assert_eq!(
            repair_sentence_boundaries("already. spaced words"),
            "already. spaced words"
        );
    }

    #[test]
    fn test_digit_strip_whole_tokens_only() {
        assert_eq!(remove_numeric_tokens("abc 123 45a"), "abc 45a");
        assert_eq!(remove_numeric_tokens("  2020\nelection   night "), "election night");
        assert_eq!(remove_numeric_tokens("1,000 people"), "1,000 people");
    }

    #[test]
    fn test_punctuation_strip_keeps_whitespace() {
        assert_eq!(remove_punctuation("don't stop!\n(now)"), "dont stop\nnow");
        assert_eq!(remove_punctuation("a-b  c."), "ab  c");
        assert_eq!(remove_punctuation("café’s"), "café’s");
    }

    #[test]
    fn test_stopword_removal() {
        let stopwords = StopwordSet::english();
        assert_eq!(
            remove_stopwords("the senate  voted on the  bill", &stopwords),
            "senate voted bill"
        );
    }

    #[test]
    fn test_lemmatize_deduplicates() {
        let out = lemmatize("running runs jump", &RunLemmatizer);
        let tokens: Vec<&str> = out.split(' ').collect();
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens.iter().filter(|t| **t == "run").count(), 1);
        assert_eq!(tokens.iter().filter(|t| **t == "jump").count(), 1);
    }

    #[test]
    fn test_full_pipeline() {
        let text = "\nThe Senate voted 52 to 48 on Tuesday.Lawmakers were running late, \
                    and the votes ran long.\nVoters jumped.";
        let out = normalizer().normalize(text);
        assert_eq!(out, "senate vote tuesday lawmaker run late long voter jump");
    }

    #[test]
    fn test_stage_order_is_fixed() {
        assert_eq!(Stage::ALL[0], Stage::CaseFold);
        assert_eq!(Stage::ALL[5], Stage::Lemmatize);
        // Stopwords only match once case has been folded.
        let n = normalizer();
        assert_eq!(n.apply(Stage::StopwordRemoval, "The cat"), "The cat");
        assert_eq!(n.normalize("The cat"), "cat");
    }

    #[test]
    fn test_normalizer_output_is_stable() {
        let n = normalizer();
        let samples = [
            "Officials said 3 buildings were damaged.Crews are working, residents waited.",
            "The company owned 12 stores; it closed 4 of them in 2020!",
            "",
        ];
        for sample in samples {
            let once = n.normalize(sample);
            let twice = n.normalize(&once);
            let thrice = n.normalize(&twice);
            assert_eq!(thrice, twice, "unstable for {sample:?}");
        }
        let plain = n.normalize("Crews repaired damaged bridges.");
        assert_eq!(n.normalize(&plain), plain);
    }

    #[test]
    fn test_lookup_table_keeps_output_stable() {
        let mut lemmatizer = RuleLemmatizer::new();
        lemmatizer.extend_from_tsv("us\t-PRON-\n");
        let n = Normalizer::new(StopwordSet::english(), lemmatizer);

        let once = n.normalize("Officials told us the bridge collapsed.");
        assert_eq!(once, "official tell pron bridge collapse");
        assert_eq!(n.normalize(&once), once);
    }

    #[test]
    fn test_normalize_article_matches_normalize() {
        let n = normalizer();
        let stored = StoredArticle {
            pk: 7,
            title: "Storm".to_string(),
            article: "\nStorms hit 3 towns.\nTowns flooded.".to_string(),
        };
        let expected = n.normalize(&stored.article);
        let normalized = n.normalize_article(stored);
        assert_eq!(normalized.pk, 7);
        assert_eq!(normalized.title, "Storm");
        assert_eq!(normalized.text, expected);
        assert_eq!(normalized.text, "storm hit town flood");
    }
}
