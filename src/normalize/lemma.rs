//! Lemmatization: reducing tokens to their dictionary form.
//!
//! [`Lemmatizer`] is the seam for a natural-language backend. The bundled
//! [`RuleLemmatizer`] resolves a token through, in order, a lookup table
//! loaded from disk, a table of irregular English forms, and a small set of
//! conservative suffix rules. Resolution is repeated until the word stops
//! changing, which makes `lemma(lemma(w)) == lemma(w)`.

use super::{case_fold, remove_numeric_tokens, remove_punctuation};
use crate::error::{Error, Result};
use once_cell::sync::Lazy;
use std::borrow::Cow;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use tracing::{info, warn};

/// Upper bound on resolution rounds for one token.
const MAX_ROUNDS: usize = 8;

/// Maps a lowercase token to its lemma.
pub trait Lemmatizer {
    fn lemma<'a>(&self, token: &'a str) -> Cow<'a, str>;
}

static IRREGULAR: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    [
        ("went", "go"), ("gone", "go"), ("goes", "go"), ("going", "go"),
        ("said", "say"), ("says", "say"),
        ("saw", "see"), ("seen", "see"),
        ("took", "take"), ("taken", "take"),
        ("gave", "give"), ("given", "give"),
        ("made", "make"), ("came", "come"),
        ("got", "get"), ("gotten", "get"),
        ("told", "tell"), ("thought", "think"), ("brought", "bring"),
        ("bought", "buy"), ("found", "find"), ("ran", "run"),
        ("began", "begin"), ("begun", "begin"),
        ("knew", "know"), ("known", "know"),
        ("wrote", "write"), ("written", "write"),
        ("sought", "seek"), ("held", "hold"), ("kept", "keep"), ("met", "meet"),
        ("paid", "pay"), ("sent", "send"), ("spent", "spend"), ("built", "build"),
        ("felt", "feel"), ("lost", "lose"), ("led", "lead"),
        ("ate", "eat"), ("eaten", "eat"),
        ("drove", "drive"), ("driven", "drive"),
        ("chose", "choose"), ("chosen", "choose"),
        ("fell", "fall"), ("fallen", "fall"),
        ("flew", "fly"), ("flown", "fly"),
        ("grew", "grow"), ("grown", "grow"),
        ("threw", "throw"), ("thrown", "throw"),
        ("stood", "stand"), ("understood", "understand"),
        ("spoke", "speak"), ("spoken", "speak"),
        ("broke", "break"), ("broken", "break"),
        ("risen", "rise"), ("won", "win"),
        ("used", "use"), ("died", "die"), ("lying", "lie"), ("dying", "die"),
        ("created", "create"), ("creating", "create"),
        ("changed", "change"), ("changing", "change"),
        ("focused", "focus"), ("focusing", "focus"), ("biased", "bias"),
        ("men", "man"), ("women", "woman"), ("children", "child"),
        ("mice", "mouse"), ("feet", "foot"), ("teeth", "tooth"), ("geese", "goose"),
    ]
    .into_iter()
    .collect()
});

/// Words whose suffix looks inflectional but is not.
static INVARIANT: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "news", "series", "species", "physics", "politics", "economics", "mathematics",
        "always", "perhaps", "christmas", "analysis", "crisis", "thesis", "basis", "bias",
        "morning", "evening", "nothing", "something", "anything", "everything", "ceiling",
        "wedding", "during", "hundred", "united",
    ]
    .into_iter()
    .collect()
});

/// Rule-based English lemmatizer with an optional lookup table.
#[derive(Debug, Clone, Default)]
pub struct RuleLemmatizer {
    lookup: HashMap<String, String>,
}

impl RuleLemmatizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lemmatizer backed by the lookup table at `path`, when configured.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut lemmatizer = Self::new();
        if let Some(path) = path {
            let text = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
            lemmatizer.extend_from_tsv(&text);
            info!(path = %path.display(), entries = lemmatizer.lookup.len(), "Loaded lemma lookup table");
        }
        Ok(lemmatizer)
    }

    /// Add `form<TAB>lemma` lines; blank lines and `#` comments are ignored.
    pub fn extend_from_tsv(&mut self, text: &str) {
        for (lineno, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((form, lemma)) = line.split_once('\t') else {
                warn!(line = lineno + 1, "Ignoring malformed lemma table line");
                continue;
            };
            let form = form.trim().to_lowercase();
            match clean_lemma(lemma) {
                Some(lemma) if !form.is_empty() => {
                    self.lookup.insert(form, lemma);
                }
                _ => warn!(line = lineno + 1, %lemma, "Ignoring lemma that is not a single plain word"),
            }
        }
    }

    /// One resolution round; `None` when no table or rule applies.
    fn round(&self, word: &str) -> Option<String> {
        if let Some(lemma) = self.lookup.get(word) {
            return Some(lemma.clone());
        }
        if let Some(lemma) = IRREGULAR.get(word) {
            return Some((*lemma).to_string());
        }
        if word.len() < 4 || !word.bytes().all(|b| b.is_ascii_lowercase()) || INVARIANT.contains(word) {
            return None;
        }
        strip_suffix(word)
    }
}

impl Lemmatizer for RuleLemmatizer {
    fn lemma<'a>(&self, token: &'a str) -> Cow<'a, str> {
        let mut current: Cow<'a, str> = Cow::Borrowed(token);
        for _ in 0..MAX_ROUNDS {
            match self.round(&current) {
                Some(next) if next != current.as_ref() => current = Cow::Owned(next),
                _ => break,
            }
        }
        current
    }
}

/// Put a table lemma through the stages that run before lemmatization, so
/// that lemmas like `-PRON-` come out exactly as a later pass would see them.
/// Lemmas that vanish or split into several tokens are rejected.
fn clean_lemma(lemma: &str) -> Option<String> {
    let cleaned = remove_punctuation(&remove_numeric_tokens(&case_fold(lemma)));
    let mut tokens = cleaned.split_whitespace();
    match (tokens.next(), tokens.next()) {
        (Some(word), None) => Some(word.to_string()),
        _ => None,
    }
}

fn strip_suffix(word: &str) -> Option<String> {
    let n = word.len();

    if (word.ends_with("ies") || word.ends_with("ied")) && n > 4 {
        return Some(format!("{}y", &word[..n - 3]));
    }
    if word.ends_with("sses")
        || word.ends_with("xes")
        || word.ends_with("ches")
        || word.ends_with("shes")
        || word.ends_with("zzes")
        || (word.ends_with("oes") && n > 4)
    {
        return Some(word[..n - 2].to_string());
    }
    if word.ends_with('s') && !(word.ends_with("ss") || word.ends_with("us") || word.ends_with("is")) {
        return Some(word[..n - 1].to_string());
    }
    if let Some(stem) = word.strip_suffix("ing") {
        return valid_stem(stem).then(|| restore(stem));
    }
    if let Some(stem) = word.strip_suffix("ed") {
        if !word.ends_with("eed") {
            return valid_stem(stem).then(|| restore(stem));
        }
    }
    None
}

fn is_vowel(word: &[u8], i: usize) -> bool {
    match word[i] {
        b'a' | b'e' | b'i' | b'o' | b'u' => true,
        b'y' => i > 0 && !is_vowel(word, i - 1),
        _ => false,
    }
}

/// A stem left by `-ing`/`-ed` removal must look like a word on its own.
fn valid_stem(stem: &str) -> bool {
    let bytes = stem.as_bytes();
    bytes.len() >= 3 && (0..bytes.len()).any(|i| is_vowel(bytes, i) || bytes[i] == b'y')
}

/// Number of vowel→consonant transitions.
fn measure(stem: &[u8]) -> usize {
    (1..stem.len())
        .filter(|&i| is_vowel(stem, i - 1) && !is_vowel(stem, i))
        .count()
}

/// Ends consonant-vowel-consonant, last consonant not `w`, `x` or `y`.
fn ends_cvc(stem: &[u8]) -> bool {
    let n = stem.len();
    n >= 3
        && !is_vowel(stem, n - 3)
        && is_vowel(stem, n - 2)
        && !is_vowel(stem, n - 1)
        && !matches!(stem[n - 1], b'w' | b'x' | b'y')
}

/// Repair a stem after `-ing`/`-ed` removal: `runn` → `run`, `mak` → `make`.
fn restore(stem: &str) -> String {
    let bytes = stem.as_bytes();
    let n = bytes.len();

    if stem.ends_with("bl") || stem.ends_with("iz") {
        return format!("{stem}e");
    }
    if n >= 2 && bytes[n - 1] == bytes[n - 2] && !is_vowel(bytes, n - 1) {
        let undoubled = &bytes[..n - 1];
        if !matches!(bytes[n - 1], b'l' | b's' | b'z') && ends_cvc(undoubled) {
            return stem[..n - 1].to_string();
        }
        return stem.to_string();
    }
    if lost_silent_e(bytes) || (measure(bytes) == 1 && ends_cvc(bytes)) {
        return format!("{stem}e");
    }
    stem.to_string()
}

/// Stem endings that English only writes with a trailing `e`:
/// `increas`, `produc`, `mov`, `charg`, `judg`, `locat`, `damag`.
fn lost_silent_e(stem: &[u8]) -> bool {
    let n = stem.len();
    let consonant_before = |i: usize| i < n && !is_vowel(stem, i);
    match stem[n - 1] {
        b's' | b'c' | b'v' => true,
        b'g' => matches!(stem[n - 2], b'r' | b'd') || (stem[n - 2] == b'a' && n >= 3 && consonant_before(n - 3)),
        b't' => stem[n - 2] == b'a' && n >= 3 && consonant_before(n - 3),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lemma(word: &str) -> String {
        RuleLemmatizer::new().lemma(word).into_owned()
    }

    #[test]
    fn test_regular_inflections() {
        let cases = [
            ("running", "run"),
            ("runs", "run"),
            ("jumped", "jump"),
            ("jumps", "jump"),
            ("stopped", "stop"),
            ("making", "make"),
            ("hoped", "hope"),
            ("writing", "write"),
            ("studies", "study"),
            ("studied", "study"),
            ("classes", "class"),
            ("boxes", "box"),
            ("watches", "watch"),
            ("heroes", "hero"),
            ("called", "call"),
            ("added", "add"),
            ("visited", "visit"),
            ("played", "play"),
            ("organized", "organize"),
            ("buildings", "build"),
            ("elections", "election"),
            ("increased", "increase"),
            ("increases", "increase"),
            ("increasing", "increase"),
            ("released", "release"),
            ("collapsed", "collapse"),
            ("raised", "raise"),
            ("praised", "praise"),
            ("caused", "cause"),
            ("housing", "house"),
            ("closed", "close"),
            ("passed", "pass"),
            ("produced", "produce"),
            ("moved", "move"),
            ("charged", "charge"),
            ("judged", "judge"),
            ("located", "locate"),
            ("updated", "update"),
            ("damaged", "damage"),
            ("treated", "treat"),
            ("waited", "wait"),
        ];
        for (word, expected) in cases {
            assert_eq!(lemma(word), expected, "lemma of {word}");
        }
    }

    #[test]
    fn test_irregular_forms() {
        assert_eq!(lemma("went"), "go");
        assert_eq!(lemma("children"), "child");
        assert_eq!(lemma("said"), "say");
        assert_eq!(lemma("thought"), "think");
    }

    #[test]
    fn test_words_left_alone() {
        for word in ["news", "bus", "thing", "bring", "need", "speed", "crisis", "focus", "class", "run"] {
            assert_eq!(lemma(word), word, "{word} should be unchanged");
        }
    }

    #[test]
    fn test_non_ascii_tokens_untouched_by_rules() {
        assert_eq!(lemma("cafés"), "cafés");
    }

    #[test]
    fn test_lemma_is_idempotent() {
        let lemmatizer = RuleLemmatizer::new();
        let words = [
            "running", "buildings", "studies", "hoped", "stopped", "elections", "creates",
            "children", "feelings", "meetings", "opened", "seeds", "passing", "focusing",
        ];
        for word in words {
            let once = lemmatizer.lemma(word).into_owned();
            let twice = lemmatizer.lemma(&once).into_owned();
            assert_eq!(once, twice, "lemma not stable for {word}");
        }
    }

    #[test]
    fn test_irregular_targets_are_fixed_points() {
        let lemmatizer = RuleLemmatizer::new();
        for lemma in IRREGULAR.values() {
            assert_eq!(lemmatizer.lemma(lemma), *lemma);
        }
    }

    #[test]
    fn test_lookup_table_overrides_rules() {
        let mut lemmatizer = RuleLemmatizer::new();
        lemmatizer.extend_from_tsv("# spaCy export\ncreated\tcreate\nbetter\tgood\nbroken line\n");
        assert_eq!(lemmatizer.lemma("created"), "create");
        assert_eq!(lemmatizer.lemma("better"), "good");
        assert_eq!(lemmatizer.lookup.len(), 2);
    }

    #[test]
    fn test_inflections_of_one_verb_share_a_lemma() {
        for forms in [
            ["increase", "increases", "increased", "increasing"],
            ["release", "releases", "released", "releasing"],
            ["cause", "causes", "caused", "causing"],
        ] {
            let lemmas: HashSet<String> = forms.iter().map(|w| lemma(w)).collect();
            assert_eq!(lemmas.len(), 1, "{forms:?} gave {lemmas:?}");
        }
    }

    #[test]
    fn test_table_lemmas_are_cleaned() {
        let mut lemmatizer = RuleLemmatizer::new();
        lemmatizer.extend_from_tsv("us\t-PRON-\nthem\t-PRON-\nfirst\t1st\nnumber\t42\nnyc\tnew york\n");
        assert_eq!(lemmatizer.lemma("us"), "pron");
        assert_eq!(lemmatizer.lemma("them"), "pron");
        assert_eq!(lemmatizer.lemma("first"), "1st");
        assert!(!lemmatizer.lookup.contains_key("number"));
        assert!(!lemmatizer.lookup.contains_key("nyc"));
        assert_eq!(lemmatizer.lemma("pron"), "pron");
    }

    #[test]
    fn test_load_missing_table() {
        assert!(RuleLemmatizer::load(Some(Path::new("/nonexistent/lemmas.tsv"))).is_err());
        assert!(RuleLemmatizer::load(None).is_ok());
    }
}
