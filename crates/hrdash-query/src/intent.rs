//! Keyword-based intent classification
//!
//! First matching rule wins, in fixed priority order:
//! summary (a summary word AND an executive word) > average > maximum > minimum.
//! There is no scoring; a question mentioning both "promedio" and "máximo" is
//! an average question.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    Summary,
    Average,
    Maximum,
    Minimum,
    Unknown,
}

/// The aggregations the query executor can run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Aggregation {
    Average,
    Maximum,
    Minimum,
}

impl Intent {
    pub fn aggregation(self) -> Option<Aggregation> {
        match self {
            Intent::Average => Some(Aggregation::Average),
            Intent::Maximum => Some(Aggregation::Maximum),
            Intent::Minimum => Some(Aggregation::Minimum),
            Intent::Summary | Intent::Unknown => None,
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Intent::Summary => "summary",
            Intent::Average => "average",
            Intent::Maximum => "maximum",
            Intent::Minimum => "minimum",
            Intent::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// Keyword table for [`IntentRules::classify`]. All keywords are lowercase
/// and matched as substrings of the lowercased question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntentRules {
    pub summary_words: Vec<String>,
    pub executive_words: Vec<String>,
    pub average: Vec<String>,
    pub maximum: Vec<String>,
    pub minimum: Vec<String>,
}

fn words(list: &[&str]) -> Vec<String> {
    list.iter().map(|w| w.to_string()).collect()
}

impl Default for IntentRules {
    fn default() -> Self {
        Self {
            summary_words: words(&["resumen", "summary"]),
            executive_words: words(&["ejecutivo", "executive"]),
            average: words(&["promedio", "media", "average", "mean"]),
            maximum: words(&[
                "máximo", "maximo", "mayor", "max", "highest", "más alto", "mas alto",
            ]),
            minimum: words(&[
                "mínimo", "minimo", "menor", "min ", "minimum", "lowest", "más bajo", "mas bajo",
            ]),
        }
    }
}

fn contains_any(text: &str, keywords: &[String]) -> bool {
    keywords.iter().any(|k| text.contains(k.as_str()))
}

impl IntentRules {
    pub fn classify(&self, question: &str) -> Intent {
        let q = question.to_lowercase();

        let intent = if contains_any(&q, &self.summary_words) && contains_any(&q, &self.executive_words) {
            Intent::Summary
        } else if contains_any(&q, &self.average) {
            Intent::Average
        } else if contains_any(&q, &self.maximum) {
            Intent::Maximum
        } else if contains_any(&q, &self.minimum) {
            Intent::Minimum
        } else {
            Intent::Unknown
        };

        tracing::debug!(%intent, question, "Classified question");
        intent
    }
}

/// Classify with the built-in keyword table.
pub fn classify_intent(question: &str) -> Intent {
    static RULES: OnceLock<IntentRules> = OnceLock::new();
    RULES.get_or_init(IntentRules::default).classify(question)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_wins_over_average() {
        assert_eq!(
            classify_intent("Dame un resumen ejecutivo con el promedio de cada indicador"),
            Intent::Summary
        );
        assert_eq!(classify_intent("Executive SUMMARY please"), Intent::Summary);
        assert_eq!(classify_intent("ejecutivo: resumen 2025"), Intent::Summary);
    }

    #[test]
    fn test_summary_needs_both_words() {
        assert_eq!(classify_intent("resumen de Cost per hire"), Intent::Unknown);
        assert_eq!(classify_intent("resumen del promedio"), Intent::Average);
    }

    #[test]
    fn test_priority_order() {
        assert_eq!(classify_intent("promedio y máximo de Overtime"), Intent::Average);
        assert_eq!(classify_intent("máximo y mínimo de Overtime"), Intent::Maximum);
        assert_eq!(classify_intent("¿Mes con MAYOR Fluctuation Rate I en 2025?"), Intent::Maximum);
        assert_eq!(classify_intent("¿Mínimo de Cost per hire?"), Intent::Minimum);
        assert_eq!(classify_intent("lowest absenteeism"), Intent::Minimum);
    }

    #[test]
    fn test_unknown() {
        assert_eq!(classify_intent("Proyecta Cost per hire para Q1 2026"), Intent::Unknown);
        assert_eq!(classify_intent(""), Intent::Unknown);
    }

    #[test]
    fn test_custom_rules() {
        let rules = IntentRules {
            maximum: words(&["pico"]),
            ..Default::default()
        };
        assert_eq!(rules.classify("pico de horas extra"), Intent::Maximum);
        assert_eq!(rules.classify("máximo de horas extra"), Intent::Unknown);
    }

    #[test]
    fn test_aggregation_mapping() {
        assert_eq!(Intent::Maximum.aggregation(), Some(Aggregation::Maximum));
        assert_eq!(Intent::Summary.aggregation(), None);
        assert_eq!(Intent::Unknown.aggregation(), None);
    }
}
