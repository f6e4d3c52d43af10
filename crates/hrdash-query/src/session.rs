//! Per-user dashboard state

use chrono::{DateTime, Utc};
use hrdash_facts::{Dimension, FactRow, FactTable, FilterOptions, FilterSelection};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

use crate::answer::{Answer, Answerer};
use crate::charts::{default_kinds, plan_charts, ChartKind, ChartRequest, ChartSpec, Palette};

pub const GREETING: &str = "Hola, soy tu asistente de análisis. Pregúntame por máximos, mínimos, \
comparaciones o proyecciones sobre los indicadores filtrados.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
    pub at: DateTime<Utc>,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            at: Utc::now(),
        }
    }
}

/// State of one dashboard session.
///
/// Holds a shared read-only snapshot of the fact table. Filters, chart
/// choices and chat history are private to the session.
#[derive(Debug, Clone)]
pub struct Session {
    facts: Arc<FactTable>,
    filters: FilterSelection,
    chart_kinds: HashMap<String, Vec<ChartKind>>,
    palette: Palette,
    history: Vec<ChatMessage>,
}

impl Session {
    pub fn new(facts: Arc<FactTable>) -> Self {
        Self {
            facts,
            filters: FilterSelection::default(),
            chart_kinds: HashMap::new(),
            palette: Palette::default(),
            history: vec![ChatMessage::new(Role::Assistant, GREETING)],
        }
    }

    pub fn facts(&self) -> &Arc<FactTable> {
        &self.facts
    }

    pub fn filters(&self) -> &FilterSelection {
        &self.filters
    }

    pub fn history(&self) -> &[ChatMessage] {
        &self.history
    }

    pub fn palette(&self) -> Palette {
        self.palette
    }

    pub fn set_palette(&mut self, palette: Palette) {
        self.palette = palette;
    }

    pub fn set_filter(&mut self, dimension: Dimension, values: Vec<String>) {
        self.filters.set(dimension, values);
    }

    pub fn select_all(&mut self, dimension: Dimension) {
        self.filters.select_all(dimension, &self.facts);
    }

    pub fn options(&self) -> FilterOptions {
        FilterOptions::cascade(&self.facts, &self.filters)
    }

    /// Fact rows under the active filters.
    pub fn scope(&self) -> Vec<FactRow> {
        self.filters.apply(self.facts.rows())
    }

    pub fn set_chart_kinds(&mut self, indicator: impl Into<String>, kinds: Vec<ChartKind>) {
        self.chart_kinds.insert(indicator.into(), kinds);
    }

    pub fn chart_kinds(&self, indicator: &str) -> Vec<ChartKind> {
        self.chart_kinds.get(indicator).cloned().unwrap_or_else(default_kinds)
    }

    /// Charts for the selected indicators, in selection order. No selected
    /// indicator means no charts.
    pub fn chart_plan(&self) -> Vec<ChartSpec> {
        let requests: Vec<ChartRequest> = self
            .filters
            .metrics
            .iter()
            .map(|indicator| ChartRequest {
                indicator: indicator.clone(),
                kinds: self.chart_kinds(indicator),
            })
            .collect();
        plan_charts(&self.scope(), self.facts.periods(), &requests, self.palette)
    }

    /// Ask a question; both the question and the answer join the history.
    pub async fn ask(&mut self, answerer: &dyn Answerer, question: &str) -> Answer {
        self.history.push(ChatMessage::new(Role::User, question));
        let answer = answerer.answer(question, &self.filters, &self.facts).await;
        self.history.push(ChatMessage::new(Role::Assistant, answer.message.clone()));
        answer
    }

    /// Swap in a freshly loaded snapshot and drop filter values it no longer offers.
    pub fn reload(&mut self, facts: Arc<FactTable>) {
        tracing::info!(rows = facts.len(), "Session reloaded fact table");
        self.facts = facts;
        self.filters.retain_available(&self.facts);
    }
}
