//! HRDash query engine
//!
//! Answers simple analytic questions about a [`hrdash_facts::FactTable`]:
//! keyword intent classification, year and metric extraction, aggregate
//! queries and an executive summary. Also plans dashboard charts and keeps
//! per-session state.

mod answer;
pub mod charts;
mod entities;
mod error;
mod executor;
pub mod intent;
mod session;
mod summary;
mod table;

pub use answer::{answer, question_scope, resolve_metric, Answer, Answerer, RuleBasedAnswerer};
pub use charts::{plan_charts, ChartKind, ChartRequest, ChartSpec, Palette, MAX_CHARTS};
pub use entities::{extract_years, resolve_metrics, tokenize};
pub use error::QueryError;
pub use executor::{execute, Aggregate, Extreme, QueryOutcome};
pub use intent::{classify_intent, Aggregation, Intent, IntentRules};
pub use session::{ChatMessage, Role, Session, GREETING};
pub use summary::{summarize, ExecutiveSummary, MetricMean, Peak, TOP_N};
pub use table::{round2, Table};
