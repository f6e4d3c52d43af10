//! Chart planning
//!
//! Turns the filtered scope and the chart kinds picked per indicator into
//! chart specifications. Rendering is left to the client; a spec carries the
//! encodings (x, y, color, size), a palette and the data table.

use hrdash_facts::FactRow;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;

use crate::table::{round2, Table};

/// Upper bound on charts in one plan.
pub const MAX_CHARTS: usize = 12;

const MONTH: &str = "Month";
const YEAR: &str = "Year";
const VALUE: &str = "Value";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChartKind {
    Bar,
    Column,
    Line,
    Area,
    Pie,
    Scatter,
    Bubble,
    Box,
    Histogram,
    Heatmap,
    Violin,
}

impl ChartKind {
    pub const ALL: [ChartKind; 11] = [
        ChartKind::Bar,
        ChartKind::Column,
        ChartKind::Line,
        ChartKind::Area,
        ChartKind::Pie,
        ChartKind::Scatter,
        ChartKind::Bubble,
        ChartKind::Box,
        ChartKind::Histogram,
        ChartKind::Heatmap,
        ChartKind::Violin,
    ];

    pub fn label(self) -> &'static str {
        match self {
            ChartKind::Bar => "Bar Chart",
            ChartKind::Column => "Column Chart",
            ChartKind::Line => "Line Chart",
            ChartKind::Area => "Area Chart",
            ChartKind::Pie => "Donut Chart",
            ChartKind::Scatter => "Scatter Plot",
            ChartKind::Bubble => "Bubble Chart",
            ChartKind::Box => "Box Plot",
            ChartKind::Histogram => "Histogram",
            ChartKind::Heatmap => "Heatmap",
            ChartKind::Violin => "Violin Plot",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Palette {
    #[default]
    GrayYellowBlackWhite,
    BlueRedGreen,
    Pastel,
}

impl Palette {
    pub fn colors(self) -> &'static [&'static str] {
        match self {
            Palette::GrayYellowBlackWhite => &["gray", "yellow", "black", "white"],
            Palette::BlueRedGreen => &["blue", "red", "green"],
            Palette::Pastel => &[
                "rgb(102, 197, 204)",
                "rgb(246, 207, 113)",
                "rgb(248, 156, 116)",
                "rgb(220, 176, 242)",
                "rgb(135, 197, 95)",
                "rgb(158, 185, 243)",
                "rgb(254, 136, 177)",
                "rgb(201, 219, 116)",
                "rgb(139, 224, 164)",
                "rgb(180, 151, 231)",
                "rgb(179, 179, 179)",
            ],
        }
    }
}

/// Chart kinds the user picked for one indicator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChartRequest {
    pub indicator: String,
    #[serde(default = "default_kinds")]
    pub kinds: Vec<ChartKind>,
}

pub fn default_kinds() -> Vec<ChartKind> {
    vec![ChartKind::Bar]
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartSpec {
    pub indicator: String,
    pub kind: ChartKind,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
    /// Discrete color sequence; empty for continuous-scale charts
    pub palette: Vec<String>,
    pub data: Table,
}

fn numeric(row: &FactRow) -> Value {
    row.value.as_number().map_or(Value::Null, |v| json!(v))
}

fn long_table(rows: &[&FactRow]) -> Table {
    let mut table = Table::new("data", &[MONTH, YEAR, VALUE]);
    for r in rows {
        table.push(vec![json!(r.period), json!(r.period_group), numeric(r)]);
    }
    table
}

/// Sum of numeric values per period, in canonical period order.
fn pie_table(rows: &[&FactRow], periods: &[String]) -> Table {
    let mut sums: HashMap<&str, f64> = HashMap::new();
    for r in rows {
        *sums.entry(r.period.as_str()).or_insert(0.0) += r.value.as_number().unwrap_or(0.0);
    }
    let mut table = Table::new("data", &[MONTH, VALUE]);
    for period in periods {
        if let Some(sum) = sums.get(period.as_str()) {
            table.push(vec![json!(period), json!(round2(*sum))]);
        }
    }
    table
}

/// Period x period-group pivot of summed values; cells without numbers are null.
fn heatmap_table(rows: &[&FactRow], periods: &[String]) -> Table {
    let mut groups: Vec<&str> = rows.iter().map(|r| r.period_group.as_str()).collect();
    groups.sort_unstable();
    groups.dedup();

    let mut cells: HashMap<(&str, &str), f64> = HashMap::new();
    for r in rows {
        if let Some(v) = r.value.as_number() {
            *cells.entry((r.period.as_str(), r.period_group.as_str())).or_insert(0.0) += v;
        }
    }

    let mut columns = vec![MONTH];
    columns.extend(groups.iter().copied());
    let mut table = Table::new("data", &columns);
    for period in periods {
        if !rows.iter().any(|r| &r.period == period) {
            continue;
        }
        let mut row = vec![json!(period)];
        row.extend(groups.iter().map(|g| {
            cells
                .get(&(period.as_str(), *g))
                .map_or(Value::Null, |v| json!(round2(*v)))
        }));
        table.push(row);
    }
    table
}

fn spec(indicator: &str, kind: ChartKind, rows: &[&FactRow], periods: &[String], palette: Palette) -> ChartSpec {
    let field = |s: &str| Some(s.to_string());
    let (x, y, color, size, data) = match kind {
        ChartKind::Bar
        | ChartKind::Line
        | ChartKind::Area
        | ChartKind::Scatter
        | ChartKind::Box
        | ChartKind::Violin => (field(MONTH), field(VALUE), field(YEAR), None, long_table(rows)),
        ChartKind::Column => (field(YEAR), field(VALUE), field(MONTH), None, long_table(rows)),
        ChartKind::Bubble => (field(MONTH), field(VALUE), field(YEAR), field(VALUE), long_table(rows)),
        ChartKind::Histogram => (field(VALUE), None, field(YEAR), None, long_table(rows)),
        ChartKind::Pie => (field(MONTH), field(VALUE), None, None, pie_table(rows, periods)),
        ChartKind::Heatmap => (field(YEAR), field(MONTH), None, None, heatmap_table(rows, periods)),
    };

    let palette = match kind {
        ChartKind::Heatmap => Vec::new(),
        _ => palette.colors().iter().map(|c| c.to_string()).collect(),
    };

    ChartSpec {
        indicator: indicator.to_string(),
        kind,
        title: format!("{} - {}", indicator, kind.label()),
        x,
        y,
        color,
        size,
        palette,
        data,
    }
}

/// Build at most [`MAX_CHARTS`] charts, in request order.
///
/// Indicators with no rows in `scope` are skipped without consuming a slot.
pub fn plan_charts(
    scope: &[FactRow],
    periods: &[String],
    requests: &[ChartRequest],
    palette: Palette,
) -> Vec<ChartSpec> {
    let mut charts = Vec::new();

    'requests: for request in requests {
        let rows: Vec<&FactRow> = scope
            .iter()
            .filter(|r| r.metric_name == request.indicator)
            .collect();
        if rows.is_empty() {
            tracing::debug!(indicator = %request.indicator, "No rows for indicator, skipping charts");
            continue;
        }
        for kind in &request.kinds {
            if charts.len() >= MAX_CHARTS {
                break 'requests;
            }
            charts.push(spec(&request.indicator, *kind, &rows, periods, palette));
        }
    }

    tracing::debug!(charts = charts.len(), "Planned charts");
    charts
}
