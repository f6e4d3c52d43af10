//! Entity extraction from question text: explicit years and metric names

use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;

fn year_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b20\d{2}\b").expect("valid year pattern"))
}

fn token_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[\w%]+").expect("valid token pattern"))
}

/// Years written in the question that exist as period-groups in the data.
///
/// Returned deduplicated in order of first appearance. Empty means the
/// question does not override the period-group filter.
pub fn extract_years(question: &str, available: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    year_pattern()
        .find_iter(question)
        .map(|m| m.as_str())
        .filter(|y| available.iter().any(|a| a == y))
        .filter(|y| seen.insert(*y))
        .map(str::to_string)
        .collect()
}

/// Lowercased word-and-percent runs of the question.
pub fn tokenize(question: &str) -> Vec<String> {
    let lowered = question.to_lowercase();
    token_pattern()
        .find_iter(&lowered)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Candidate metric names the question refers to.
///
/// Whole-name mentions win: if any candidate name appears verbatim (ignoring
/// case) in the question, exactly those are returned in candidate order.
/// Otherwise every candidate containing at least one question token is
/// returned, first-seen order without duplicates. The token pass is coarse on
/// purpose: short tokens such as "de" match many names.
pub fn resolve_metrics(question: &str, candidates: &[String]) -> Vec<String> {
    let q = question.to_lowercase();

    let exact: Vec<String> = candidates
        .iter()
        .filter(|name| !name.is_empty() && q.contains(&name.to_lowercase()))
        .cloned()
        .collect();
    if !exact.is_empty() {
        tracing::debug!(?exact, "Metric named verbatim in question");
        return exact;
    }

    let tokens = tokenize(question);
    let mut seen = HashSet::new();
    let fuzzy: Vec<String> = candidates
        .iter()
        .filter(|name| {
            let lowered = name.to_lowercase();
            tokens.iter().any(|t| lowered.contains(t.as_str()))
        })
        .filter(|name| seen.insert(name.as_str()))
        .cloned()
        .collect();

    tracing::debug!(?tokens, ?fuzzy, "Metric matched by tokens");
    fuzzy
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_extract_year_against_available() {
        let available = names(&["2024", "2025"]);
        assert_eq!(
            extract_years("¿Máximo de Cost per hire en 2025?", &available),
            ["2025"]
        );
        assert_eq!(
            extract_years("compara 2025 con 2024 y 2025", &available),
            ["2025", "2024"]
        );
        assert!(extract_years("¿Máximo en 2019 o 2026?", &available).is_empty());
        assert!(extract_years("código 120245", &available).is_empty());
        assert!(extract_years("sin año", &available).is_empty());
    }

    #[test]
    fn test_tokenize_keeps_percent_and_accents() {
        assert_eq!(
            tokenize("¿Máximo de Rotación %?"),
            ["máximo", "de", "rotación", "%"]
        );
    }

    #[test]
    fn test_verbatim_mentions_win() {
        let candidates = names(&["Cost per hire", "Fluctuation Rate I", "Fluctuation Rate II"]);
        assert_eq!(
            resolve_metrics("máximo de COST PER HIRE", &candidates),
            ["Cost per hire"]
        );
        // "fluctuation rate i" is a substring of "fluctuation rate ii"
        assert_eq!(
            resolve_metrics("promedio de Fluctuation Rate II", &candidates),
            ["Fluctuation Rate I", "Fluctuation Rate II"]
        );
    }

    #[test]
    fn test_token_fallback() {
        let candidates = names(&["Cost per hire", "Overtime hours", "Training hours"]);
        assert_eq!(
            resolve_metrics("máximo overtime", &candidates),
            ["Overtime hours"]
        );
        assert_eq!(
            resolve_metrics("promedio hours", &candidates),
            ["Overtime hours", "Training hours"]
        );
        assert!(resolve_metrics("xyz", &candidates).is_empty());
    }

    #[test]
    fn test_token_fallback_is_coarse() {
        // Single letters match almost every name
        let candidates = names(&["Cost per hire", "Headcount"]);
        assert_eq!(resolve_metrics("mínimo de e", &candidates), ["Cost per hire", "Headcount"]);
    }
}
