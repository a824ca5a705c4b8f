//! Rule-based answer clean-up.
//!
//! 1. Strip confidence/score annotations the model copied from the context.
//! 2. If the answer is a refusal, replace it with the standard fallback in
//!    the question's language.
//! 3. Collapse runs of blank lines and trim.

use std::sync::OnceLock;

use regex::Regex;

use super::prompts::{FALLBACK_RESPONSE_EN, FALLBACK_RESPONSE_ZH};

const SCORE_PATTERNS: &[&str] = &[
    r"\[?信心分?數[：:]\s*[\d.]+\]?",
    r"\[?可信度分?數[：:]\s*[\d.]+\]?",
    r"\[?[Ss]core[：:]\s*[\d.]+\]?",
    r"\[?[Cc]onfidence[：:]\s*[\d.]+\]?",
];

/// Case-sensitive refusal markers in Chinese answers.
const FALLBACK_INDICATORS_ZH: &[&str] = &["抱歉", "沒有這項", "不在我", "無法提供", "沒有相關"];

/// Refusal markers matched against the lower-cased answer.
const FALLBACK_INDICATORS_EN: &[&str] =
    &["not available", "don't have", "cannot provide", "no information"];

fn score_patterns() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        SCORE_PATTERNS
            .iter()
            .filter_map(|p| Regex::new(p).ok())
            .collect()
    })
}

fn blank_runs() -> Option<&'static Regex> {
    static BLANK_RUNS: OnceLock<Option<Regex>> = OnceLock::new();
    BLANK_RUNS.get_or_init(|| Regex::new(r"\n{3,}").ok()).as_ref()
}

/// True if any character is a CJK unified ideograph.
pub fn contains_cjk(text: &str) -> bool {
    text.chars().any(|c| ('\u{4e00}'..='\u{9fff}').contains(&c))
}

fn is_fallback(answer: &str) -> bool {
    let lower = answer.to_lowercase();
    FALLBACK_INDICATORS_ZH.iter().any(|i| answer.contains(i))
        || FALLBACK_INDICATORS_EN.iter().any(|i| lower.contains(i))
}

/// Clean a finished answer to `question`.
pub fn postprocess_answer(answer: &str, question: &str) -> String {
    let mut cleaned = answer.to_string();
    for re in score_patterns() {
        cleaned = re.replace_all(&cleaned, "").into_owned();
    }

    if is_fallback(&cleaned) {
        return if contains_cjk(question) {
            FALLBACK_RESPONSE_ZH.to_string()
        } else {
            FALLBACK_RESPONSE_EN.to_string()
        };
    }

    if let Some(re) = blank_runs() {
        cleaned = re.replace_all(&cleaned, "\n\n").into_owned();
    }
    cleaned.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_patterns_compile() {
        assert_eq!(score_patterns().len(), SCORE_PATTERNS.len());
        assert!(blank_runs().is_some());
    }

    #[test]
    fn test_strips_score_annotations() {
        let out = postprocess_answer("GPU 為 RTX 5090 [信心分數: 0.87]", "GPU 是什麼？");
        assert_eq!(out, "GPU 為 RTX 5090");

        let out = postprocess_answer("It has 32GB RAM. Score: 0.91 Confidence: 0.5", "RAM?");
        assert_eq!(out, "It has 32GB RAM.");
    }

    #[test]
    fn test_refusal_uses_question_language() {
        assert_eq!(
            postprocess_answer("抱歉，我不知道價格。", "這台多少錢？"),
            FALLBACK_RESPONSE_ZH
        );
        assert_eq!(
            postprocess_answer("Sorry, I don't have pricing data.", "How much is it?"),
            FALLBACK_RESPONSE_EN
        );
        assert_eq!(
            postprocess_answer("That is Not Available here.", "price?"),
            FALLBACK_RESPONSE_EN
        );
    }

    #[test]
    fn test_collapses_blank_runs() {
        assert_eq!(postprocess_answer("\n- CPU\n\n\n\n- GPU\n", "specs"), "- CPU\n\n- GPU");
    }

    #[test]
    fn test_contains_cjk() {
        assert!(contains_cjk("BXH 的重量"));
        assert!(!contains_cjk("weight of BXH"));
    }
}
