// Rule-Based Scorer
// Keyword, symbol and pattern heuristics over the raw snippet
//
// Each context gets an independent weighted sum; the three sums are then
// normalized into a distribution. Weights are fixed, there is nothing to train.

use regex::Regex;
use std::sync::OnceLock;

use crate::models::{Context, ContextScores};

const CODE_KEYWORDS: [&str; 14] = [
    "function", "class", "def", "const", "let", "var", "import", "return", "if", "else", "while",
    "for", "async", "await",
];
const EMAIL_KEYWORDS: [&str; 8] = [
    "dear", "sincerely", "regards", "thank you", "attached", "meeting", "please", "subject",
];
const CHAT_KEYWORDS: [&str; 8] = ["lol", "omg", "btw", "brb", "tbh", "idk", "haha", "emoji"];

const CODE_KEYWORD_WEIGHT: f64 = 3.0;
const BRACE_WEIGHT: f64 = 2.0;
const PAREN_WEIGHT: f64 = 1.0;
const SEMICOLON_WEIGHT: f64 = 2.0;
const ARROW_WEIGHT: f64 = 3.0;
const IDENTIFIER_WEIGHT: f64 = 2.0;

const EMAIL_KEYWORD_WEIGHT: f64 = 4.0;
const PUNCTUATION_WEIGHT: f64 = 0.5;
const FORMAL_BONUS: f64 = 5.0;

const CHAT_KEYWORD_WEIGHT: f64 = 5.0;
const EMOJI_WEIGHT: f64 = 6.0;
const REPEATED_PUNCT_WEIGHT: f64 = 3.0;
const SHOUTING_WEIGHT: f64 = 2.0;

fn camel_case_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b[a-z]+[A-Z][a-zA-Z]*\b").expect("camelCase regex"))
}

fn snake_case_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b[a-z]+_[a-z_]+\b").expect("snake_case regex"))
}

fn emoji_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"[\x{1F600}-\x{1F64F}\x{1F300}-\x{1F5FF}\x{1F680}-\x{1F6FF}]")
            .expect("emoji regex")
    })
}

fn repeated_punct_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[!?]{2,}").expect("repeated punctuation regex"))
}

fn all_caps_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b[A-Z]{2,}\b").expect("all caps regex"))
}

/// Unnormalized per-context scores for one snippet. Lives for one call.
pub type FeatureVector = ContextScores;

#[derive(Debug, Clone, Copy, Default)]
pub struct RuleBasedScorer;

impl RuleBasedScorer {
    pub fn new() -> Self {
        Self
    }

    /// Normalized distribution. All zeros when no signal fired at all.
    pub fn score(&self, text: &str) -> ContextScores {
        let raw = self.raw_scores(text);
        let mut total = raw.total();
        if total == 0.0 {
            total = 1.0;
        }
        ContextScores::new(raw.code / total, raw.email / total, raw.chat / total)
    }

    pub fn raw_scores(&self, text: &str) -> FeatureVector {
        let lower = text.to_lowercase();
        ContextScores::new(
            code_score(text, &lower),
            email_score(text, &lower),
            chat_score(text, &lower),
        )
    }
}

fn occurrences(haystack: &str, needle: &str) -> usize {
    haystack.matches(needle).count()
}

fn code_score(text: &str, lower: &str) -> f64 {
    let keywords: usize = CODE_KEYWORDS.iter().map(|k| occurrences(lower, k)).sum();
    let braces = occurrences(text, "{") + occurrences(text, "}");
    let parens = occurrences(text, "(") + occurrences(text, ")");

    keywords as f64 * CODE_KEYWORD_WEIGHT
        + braces as f64 * BRACE_WEIGHT
        + parens as f64 * PAREN_WEIGHT
        + occurrences(text, ";") as f64 * SEMICOLON_WEIGHT
        + occurrences(text, "=>") as f64 * ARROW_WEIGHT
        + camel_case_re().find_iter(text).count() as f64 * IDENTIFIER_WEIGHT
        + snake_case_re().find_iter(text).count() as f64 * IDENTIFIER_WEIGHT
}

fn email_score(text: &str, lower: &str) -> f64 {
    let present = EMAIL_KEYWORDS.iter().filter(|k| lower.contains(*k)).count();
    let mut score = present as f64 * EMAIL_KEYWORD_WEIGHT
        + occurrences(text, ",") as f64 * PUNCTUATION_WEIGHT
        + occurrences(text, ".") as f64 * PUNCTUATION_WEIGHT;

    if lower.contains("dear") || lower.contains("sincerely") {
        score += FORMAL_BONUS;
    }
    score
}

fn chat_score(text: &str, lower: &str) -> f64 {
    let slang: usize = CHAT_KEYWORDS.iter().map(|k| occurrences(lower, k)).sum();

    slang as f64 * CHAT_KEYWORD_WEIGHT
        + emoji_re().find_iter(text).count() as f64 * EMOJI_WEIGHT
        + repeated_punct_re().find_iter(text).count() as f64 * REPEATED_PUNCT_WEIGHT
        + all_caps_re().find_iter(text).count() as f64 * SHOUTING_WEIGHT
}

/// Highest-scoring context; exact ties go to the earlier of Code, Email, Chat.
pub fn top_context(scores: &ContextScores) -> Context {
    let mut best = Context::Code;
    for (ctx, value) in scores.iter() {
        if value > scores.get(best) {
            best = ctx;
        }
    }
    best
}
