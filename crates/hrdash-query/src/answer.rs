//! Question answering over the fact table
//!
//! [`answer`] is the single entry point used by presentation layers. It never
//! fails: every [`QueryError`] is turned into the message of the interaction.

use async_trait::async_trait;
use hrdash_facts::filter::filter_period_groups;
use hrdash_facts::{distinct_sorted, FactRow, FactTable, FilterSelection};
use serde::{Deserialize, Serialize};

use crate::entities::{extract_years, resolve_metrics};
use crate::error::QueryError;
use crate::executor::{execute, Aggregate, QueryOutcome};
use crate::intent::{Aggregation, Intent, IntentRules};
use crate::summary::{summarize, ExecutiveSummary};
use crate::table::Table;

/// Reply to one question: markdown text plus supporting tables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    pub intent: Intent,
    pub message: String,
    pub tables: Vec<Table>,
    #[serde(default)]
    pub is_error: bool,
}

impl Answer {
    pub fn failure(intent: Intent, message: impl Into<String>) -> Self {
        Self {
            intent,
            message: message.into(),
            tables: Vec::new(),
            is_error: true,
        }
    }

    fn from_error(intent: Intent, err: &QueryError) -> Self {
        tracing::info!(%intent, error = %err, "Question could not be answered");
        Self::failure(intent, err.user_message())
    }
}

/// Strategy that turns a question into an [`Answer`].
#[async_trait]
pub trait Answerer: Send + Sync {
    async fn answer(&self, question: &str, filters: &FilterSelection, facts: &FactTable) -> Answer;
}

/// The rows a question operates on.
///
/// Years named in the question replace the period-group filter; every other
/// active filter still applies.
pub fn question_scope(question: &str, filters: &FilterSelection, facts: &FactTable) -> Vec<FactRow> {
    let years = extract_years(question, &facts.period_groups());
    if years.is_empty() {
        filters.apply(facts.rows())
    } else {
        tracing::debug!(?years, "Year override from question");
        filter_period_groups(filters.apply_except_period_group(facts.rows()), &years)
    }
}

/// Pick the single metric a question is about.
pub fn resolve_metric(question: &str, scope: &[FactRow], filters: &FilterSelection) -> Result<String, QueryError> {
    let candidates = distinct_sorted(scope.iter().map(|r| r.metric_name.as_str()));
    let hits = resolve_metrics(question, &candidates);
    let pinned = filters.explicit_metric();

    match hits.as_slice() {
        [only] => Ok(only.clone()),
        [] => {
            if let Some(metric) = pinned {
                Ok(metric.to_string())
            } else if let [only] = candidates.as_slice() {
                Ok(only.clone())
            } else if candidates.is_empty() {
                Err(QueryError::NoData { metric: None })
            } else {
                Err(QueryError::AmbiguousMetric { candidates: Vec::new() })
            }
        }
        _ => match pinned {
            Some(metric) if hits.iter().any(|h| h == metric) => Ok(metric.to_string()),
            _ => Err(QueryError::AmbiguousMetric { candidates: hits }),
        },
    }
}

fn aggregate_message(outcome: &QueryOutcome) -> String {
    let metric = &outcome.metric;
    let mut message = match &outcome.aggregate {
        Aggregate::Maximum(e) => format!(
            "El **máximo** de **{metric}** es **{:.2}**, registrado en **{} {}**.",
            e.value, e.period, e.period_group
        ),
        Aggregate::Minimum(e) => format!(
            "El **mínimo** de **{metric}** es **{:.2}**, registrado en **{} {}**.",
            e.value, e.period, e.period_group
        ),
        Aggregate::Average { value, count } => format!(
            "El **promedio** de **{metric}** es **{value:.2}** ({count} valores)."
        ),
    };
    if outcome.breakdown.row_count > 0 {
        message.push_str("\n\nPromedio por año:\n\n");
        message.push_str(&outcome.breakdown.to_markdown());
    }
    message
}

fn summary_message(summary: &ExecutiveSummary) -> String {
    let years = if summary.period_groups.is_empty() {
        "-".to_string()
    } else {
        summary.period_groups.join(", ")
    };
    format!(
        "**Resumen ejecutivo**\n\n\
         - Años: {years}\n\
         - Indicadores: {}\n\
         - Registros: {}\n\n\
         **Valores más altos**\n\n{}\n\
         **Indicadores con mayor promedio**\n\n{}",
        summary.metric_count,
        summary.row_count,
        summary.peaks_table().to_markdown(),
        summary.top_metrics_table().to_markdown(),
    )
}

fn respond(
    intent: Intent,
    aggregation: Option<Aggregation>,
    question: &str,
    filters: &FilterSelection,
    facts: &FactTable,
) -> Result<Answer, QueryError> {
    let scope = question_scope(question, filters, facts);

    let Some(aggregation) = aggregation else {
        let summary = summarize(&scope)?;
        return Ok(Answer {
            intent,
            message: summary_message(&summary),
            tables: vec![summary.peaks_table(), summary.top_metrics_table()],
            is_error: false,
        });
    };

    let metric = resolve_metric(question, &scope, filters)?;
    let outcome = execute(aggregation, &scope, &metric)?;
    Ok(Answer {
        intent,
        message: aggregate_message(&outcome),
        tables: vec![outcome.breakdown],
        is_error: false,
    })
}

/// Keyword-driven answerer; deterministic and offline.
#[derive(Debug, Clone, Default)]
pub struct RuleBasedAnswerer {
    pub rules: IntentRules,
}

impl RuleBasedAnswerer {
    pub fn new(rules: IntentRules) -> Self {
        Self { rules }
    }

    pub fn respond(&self, question: &str, filters: &FilterSelection, facts: &FactTable) -> Answer {
        let intent = self.rules.classify(question);
        let result = match intent {
            Intent::Unknown => Err(QueryError::UnknownIntent),
            _ => respond(intent, intent.aggregation(), question, filters, facts),
        };

        match result {
            Ok(answer) => {
                tracing::info!(%intent, tables = answer.tables.len(), "Answered question");
                answer
            }
            Err(err) => Answer::from_error(intent, &err),
        }
    }
}

#[async_trait]
impl Answerer for RuleBasedAnswerer {
    async fn answer(&self, question: &str, filters: &FilterSelection, facts: &FactTable) -> Answer {
        self.respond(question, filters, facts)
    }
}

/// Answer `question` over `facts` restricted by `filters`, with the default
/// keyword table.
pub fn answer(question: &str, filters: &FilterSelection, facts: &FactTable) -> Answer {
    RuleBasedAnswerer::default().respond(question, filters, facts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hrdash_facts::CellValue;

    fn row(metric: &str, year: &str, month: &str, value: f64) -> FactRow {
        FactRow {
            category: "Recruitment".into(),
            metric_type: "KPI".into(),
            metric_name: metric.into(),
            frequency: "Monthly".into(),
            formula: String::new(),
            period_group: year.into(),
            period: month.into(),
            value: CellValue::Number(value),
        }
    }

    fn facts() -> FactTable {
        FactTable::new(
            vec![
                row("Cost per hire", "2024", "January", 40.0),
                row("Cost per hire", "2025", "January", 10.0),
                row("Cost per hire", "2025", "February", 25.5),
                row("Fluctuation Rate I", "2025", "January", 1.0),
                row("Fluctuation Rate II", "2025", "January", 2.0),
            ],
            vec!["January".into(), "February".into()],
        )
    }

    #[test]
    fn test_resolve_single_hit() {
        let scope = facts().rows().to_vec();
        let metric = resolve_metric("máximo de cost per hire", &scope, &FilterSelection::default());
        assert_eq!(metric.unwrap(), "Cost per hire");
    }

    #[test]
    fn test_resolve_pinned_breaks_ambiguity() {
        let scope = facts().rows().to_vec();
        let question = "promedio de Fluctuation Rate II";

        let err = resolve_metric(question, &scope, &FilterSelection::default()).unwrap_err();
        assert_eq!(
            err,
            QueryError::AmbiguousMetric {
                candidates: vec!["Fluctuation Rate I".into(), "Fluctuation Rate II".into()]
            }
        );

        let filters = FilterSelection {
            metrics: vec!["Fluctuation Rate II".into()],
            ..Default::default()
        };
        assert_eq!(resolve_metric(question, &scope, &filters).unwrap(), "Fluctuation Rate II");
    }

    #[test]
    fn test_resolve_without_hits() {
        let scope = facts().rows().to_vec();
        let question = "máximo del indicador";

        assert_eq!(
            resolve_metric(question, &scope, &FilterSelection::default()).unwrap_err(),
            QueryError::AmbiguousMetric { candidates: vec![] }
        );

        let filters = FilterSelection {
            metrics: vec!["Cost per hire".into()],
            ..Default::default()
        };
        assert_eq!(resolve_metric(question, &scope, &filters).unwrap(), "Cost per hire");

        let only: Vec<FactRow> = scope.iter().filter(|r| r.metric_name == "Cost per hire").cloned().collect();
        assert_eq!(
            resolve_metric(question, &only, &FilterSelection::default()).unwrap(),
            "Cost per hire"
        );
        assert_eq!(
            resolve_metric(question, &[], &FilterSelection::default()).unwrap_err(),
            QueryError::NoData { metric: None }
        );
    }

    #[test]
    fn test_year_override_replaces_period_group_filter() {
        let filters = FilterSelection {
            period_groups: vec!["2024".into()],
            ..Default::default()
        };
        let scope = question_scope("máximo en 2025", &filters, &facts());
        assert!(scope.iter().all(|r| r.period_group == "2025"));
        assert_eq!(scope.len(), 4);

        let scope = question_scope("máximo", &filters, &facts());
        assert_eq!(scope.len(), 1);
    }

    #[test]
    fn test_answer_maximum_message() {
        let answer = answer("¿Máximo de Cost per hire en 2025?", &FilterSelection::default(), &facts());
        assert_eq!(answer.intent, Intent::Maximum);
        assert!(!answer.is_error);
        assert!(answer.message.contains("**25.50**"), "{}", answer.message);
        assert!(answer.message.contains("February 2025"));
        assert_eq!(answer.tables.len(), 1);
        assert_eq!(answer.tables[0].row_count, 1);
    }

    #[test]
    fn test_answer_unknown_is_recovered() {
        let answer = answer("Proyecta Cost per hire para Q1 2026", &FilterSelection::default(), &facts());
        assert_eq!(answer.intent, Intent::Unknown);
        assert!(answer.is_error);
        assert!(answer.tables.is_empty());
        assert_eq!(answer.message, QueryError::UnknownIntent.user_message());
    }
}
