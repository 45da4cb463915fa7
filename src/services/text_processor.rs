// Text Processing Service
// Normalization that keeps code delimiters and emoji intact, plus tokenization and surface features

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::sync::OnceLock;

const PLACEHOLDER_OPEN: char = '\u{E000}';
const PLACEHOLDER_CLOSE: char = '\u{E001}';

const STOP_WORDS: [&str; 29] = [
    "a", "an", "and", "are", "as", "at", "be", "by", "for", "from", "has", "he", "in", "is", "it",
    "its", "of", "on", "that", "the", "to", "was", "will", "with", "you", "your", "this", "but",
    "or",
];

const FORMAL_MARKERS: [&str; 3] = ["dear", "sincerely", "regards"];
const SLANG_MARKERS: [&str; 4] = ["lol", "omg", "btw", "brb"];

// Alternation is leftmost-first, so longer operators must come before their prefixes.
fn symbol_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"===|=>|!=|==|[{}()\[\];:]").expect("symbol regex"))
}

fn emoji_run_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(concat!(
            "[",
            r"\x{1F600}-\x{1F64F}",
            r"\x{1F300}-\x{1F5FF}",
            r"\x{1F680}-\x{1F6FF}",
            r"\x{1F1E0}-\x{1F1FF}",
            r"\x{1F900}-\x{1F9FF}",
            r"\x{2600}-\x{26FF}",
            r"\x{2702}-\x{27B0}",
            // variation selector, zero-width joiner, keycap: glue inside one sequence
            r"\x{FE0F}\x{200D}\x{20E3}",
            "]+"
        ))
        .expect("emoji regex")
    })
}

fn sentinel_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[\x{E000}\x{E001}]").expect("sentinel regex"))
}

fn placeholder_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\x{E000}(\d+)\x{E001}").expect("placeholder regex"))
}

fn whitespace_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("whitespace regex"))
}

fn word_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\w+").expect("word regex"))
}

fn face_emoji_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[\x{1F600}-\x{1F64F}]").expect("face emoji regex"))
}

fn repeated_punct_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[!?]{2,}").expect("repeated punctuation regex"))
}

/// Substrings pulled out of the text while whitespace is folded.
#[derive(Default)]
struct ProtectedVault {
    originals: Vec<String>,
}

impl ProtectedVault {
    /// Swap every match of `re` for a placeholder, padded with spaces when `padded`.
    fn protect(&mut self, text: &str, re: &Regex, padded: bool) -> String {
        re.replace_all(text, |caps: &Captures| {
            let idx = self.originals.len();
            self.originals.push(caps[0].to_string());
            if padded {
                format!(" {}{}{} ", PLACEHOLDER_OPEN, idx, PLACEHOLDER_CLOSE)
            } else {
                format!("{}{}{}", PLACEHOLDER_OPEN, idx, PLACEHOLDER_CLOSE)
            }
        })
        .into_owned()
    }

    fn restore(&self, text: &str) -> String {
        placeholder_re()
            .replace_all(text, |caps: &Captures| {
                caps[1]
                    .parse::<usize>()
                    .ok()
                    .and_then(|idx| self.originals.get(idx))
                    .cloned()
                    .unwrap_or_else(|| caps[0].to_string())
            })
            .into_owned()
    }
}

/// Lower-case and fold whitespace.
///
/// Code delimiters (`{ } ( ) [ ] ; : => === != ==`) and emoji runs are swapped for
/// placeholders before folding and put back afterwards, each separated from its
/// neighbours by a single space. Nothing else changes.
pub fn preprocess(text: &str) -> String {
    let lowered = text.to_lowercase();

    let mut vault = ProtectedVault::default();
    // Sentinel chars already in the input are vaulted first so restore never
    // mistakes them for placeholders.
    let guarded = vault.protect(&lowered, sentinel_re(), false);
    let guarded = vault.protect(&guarded, symbol_re(), true);
    let guarded = vault.protect(&guarded, emoji_run_re(), true);

    let folded = whitespace_re().replace_all(&guarded, " ");
    vault.restore(folded.trim())
}

/// Split on word boundaries into lowercase tokens, in order.
pub fn tokenize(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    word_re()
        .find_iter(&lowered)
        .map(|m| m.as_str().to_string())
        .collect()
}

pub fn is_stop_word(token: &str) -> bool {
    static SET: OnceLock<HashSet<&'static str>> = OnceLock::new();
    SET.get_or_init(|| STOP_WORDS.into_iter().collect())
        .contains(token)
}

pub fn remove_stop_words(tokens: &[String]) -> Vec<String> {
    tokens
        .iter()
        .filter(|t| !is_stop_word(t))
        .cloned()
        .collect()
}

/// Space-joined runs of `n` consecutive tokens.
pub fn ngrams(tokens: &[String], n: usize) -> Vec<String> {
    if n == 0 || tokens.len() < n {
        return vec![];
    }
    tokens.windows(n).map(|w| w.join(" ")).collect()
}

/// Surface signals of a snippet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct TextFeatures {
    pub text_length: usize,
    pub word_count: usize,
    pub digit_count: usize,
    pub upper_count: usize,
    pub special_char_count: usize,
    // code
    pub has_braces: bool,
    pub has_brackets: bool,
    pub has_parentheses: bool,
    pub has_semicolon: bool,
    pub has_arrow: bool,
    // email
    pub has_formal_greeting: bool,
    pub has_email_marker: bool,
    pub comma_count: usize,
    pub period_count: usize,
    // chat
    pub has_emoji: bool,
    pub has_slang: bool,
    pub has_repeated_punctuation: bool,
    pub exclamation_count: usize,
    pub question_count: usize,
}

impl TextFeatures {
    /// Flat name -> value view; booleans become 0.0 / 1.0.
    pub fn to_map(&self) -> BTreeMap<&'static str, f64> {
        let flag = |b: bool| if b { 1.0 } else { 0.0 };
        BTreeMap::from([
            ("text_length", self.text_length as f64),
            ("word_count", self.word_count as f64),
            ("digit_count", self.digit_count as f64),
            ("upper_count", self.upper_count as f64),
            ("special_char_count", self.special_char_count as f64),
            ("has_braces", flag(self.has_braces)),
            ("has_brackets", flag(self.has_brackets)),
            ("has_parentheses", flag(self.has_parentheses)),
            ("has_semicolon", flag(self.has_semicolon)),
            ("has_arrow", flag(self.has_arrow)),
            ("has_formal_greeting", flag(self.has_formal_greeting)),
            ("has_email_marker", flag(self.has_email_marker)),
            ("comma_count", self.comma_count as f64),
            ("period_count", self.period_count as f64),
            ("has_emoji", flag(self.has_emoji)),
            ("has_slang", flag(self.has_slang)),
            ("has_repeated_punctuation", flag(self.has_repeated_punctuation)),
            ("exclamation_count", self.exclamation_count as f64),
            ("question_count", self.question_count as f64),
        ])
    }
}

pub fn extract_features(text: &str) -> TextFeatures {
    let lower = text.to_lowercase();
    let count_char = |ch: char| text.chars().filter(|c| *c == ch).count();

    TextFeatures {
        text_length: text.chars().count(),
        word_count: text.split_whitespace().count(),
        digit_count: text.chars().filter(|c| c.is_numeric()).count(),
        upper_count: text.chars().filter(|c| c.is_uppercase()).count(),
        special_char_count: text
            .chars()
            .filter(|c| !c.is_alphanumeric() && !c.is_whitespace())
            .count(),
        has_braces: text.contains('{') || text.contains('}'),
        has_brackets: text.contains('[') || text.contains(']'),
        has_parentheses: text.contains('(') || text.contains(')'),
        has_semicolon: text.contains(';'),
        has_arrow: text.contains("=>") || text.contains("->"),
        has_formal_greeting: FORMAL_MARKERS.iter().any(|w| lower.contains(w)),
        has_email_marker: text.contains('@') || lower.contains("subject:"),
        comma_count: count_char(','),
        period_count: count_char('.'),
        has_emoji: face_emoji_re().is_match(text),
        has_slang: SLANG_MARKERS.iter().any(|w| lower.contains(w)),
        has_repeated_punctuation: repeated_punct_re().is_match(text),
        exclamation_count: count_char('!'),
        question_count: count_char('?'),
    }
}
