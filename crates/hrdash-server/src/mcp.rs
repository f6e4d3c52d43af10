//! MCP (Model Context Protocol) server implementation

use async_trait::async_trait;
use hrdash_facts::{Dimension, FactTable};
use hrdash_query::{Answerer, ChartKind, Palette, Session};
use hrdash_source::{CachedSource, SourceError};
use rust_mcp_schema::{
    schema_utils::CallToolError, CallToolRequest, CallToolResult, ContentBlock, Implementation,
    InitializeResult, ListToolsRequest, ListToolsResult, RpcError, ServerCapabilities,
    ServerCapabilitiesTools, TextContent, Tool, ToolInputSchema, LATEST_PROTOCOL_VERSION,
};
use rust_mcp_sdk::{mcp_server::ServerHandler, McpServer};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{error, info};

const DEFAULT_SESSION: &str = "default";

/// HRDash MCP Server Handler
///
/// Owns the cached fact table and one [`Session`] per session name.
///
/// The map lock is only held to look a session up; each session has its own
/// lock, held for the whole tool call.
pub struct HrdashServerHandler {
    source: Arc<CachedSource>,
    answerer: Arc<dyn Answerer>,
    sessions: Mutex<HashMap<String, Arc<Mutex<Session>>>>,
}

#[derive(Debug, Deserialize)]
struct AskArgs {
    question: String,
    session: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct SessionArgs {
    session: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct FilterArgs {
    session: Option<String>,
    years: Option<Vec<String>>,
    months: Option<Vec<String>>,
    subprocesses: Option<Vec<String>>,
    indicators: Option<Vec<String>>,
    #[serde(default)]
    select_all: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ChartArgs {
    session: Option<String>,
    #[serde(default)]
    kinds: HashMap<String, Vec<ChartKind>>,
    palette: Option<Palette>,
}

/// Tool argument name of each filter dimension.
fn dimension_name(dimension: Dimension) -> &'static str {
    match dimension {
        Dimension::PeriodGroup => "years",
        Dimension::Period => "months",
        Dimension::Category => "subprocesses",
        Dimension::Metric => "indicators",
    }
}

fn from_map<T: DeserializeOwned>(map: Map<String, Value>) -> Result<T, CallToolError> {
    serde_json::from_value(Value::Object(map))
        .map_err(|e| CallToolError::from_message(format!("Invalid arguments: {}", e)))
}

/// Arguments of a tool whose parameters are all optional.
fn parse_args<T: DeserializeOwned + Default>(arguments: Option<Map<String, Value>>) -> Result<T, CallToolError> {
    match arguments {
        Some(map) => from_map(map),
        None => Ok(T::default()),
    }
}

fn source_error(e: SourceError) -> CallToolError {
    error!("Failed to load fact table: {}", e);
    CallToolError::from_message(format!("Failed to load fact table: {}", e))
}

fn text_result(text: String) -> CallToolResult {
    CallToolResult {
        content: vec![ContentBlock::TextContent(TextContent::new(text, None, None))],
        is_error: None,
        meta: None,
        structured_content: None,
    }
}

fn json_result(value: &Value) -> CallToolResult {
    text_result(serde_json::to_string_pretty(value).unwrap_or_default())
}

fn string_prop(description: &str) -> Map<String, Value> {
    let mut prop = Map::new();
    prop.insert("type".to_string(), Value::String("string".to_string()));
    prop.insert("description".to_string(), Value::String(description.to_string()));
    prop
}

fn string_list_prop(description: &str) -> Map<String, Value> {
    let mut prop = Map::new();
    prop.insert("type".to_string(), Value::String("array".to_string()));
    prop.insert("items".to_string(), json!({ "type": "string" }));
    prop.insert("description".to_string(), Value::String(description.to_string()));
    prop
}

fn tool(name: &str, description: &str, required: Vec<String>, properties: HashMap<String, Map<String, Value>>) -> Tool {
    Tool {
        name: name.to_string(),
        description: Some(description.to_string()),
        input_schema: ToolInputSchema::new(required, Some(properties)),
        title: None,
        annotations: None,
        meta: None,
        output_schema: None,
    }
}

impl HrdashServerHandler {
    pub fn new(source: CachedSource, answerer: Arc<dyn Answerer>) -> Self {
        Self {
            source: Arc::new(source),
            answerer,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Create server initialization details
    pub fn server_info() -> InitializeResult {
        InitializeResult {
            protocol_version: LATEST_PROTOCOL_VERSION.to_string(),
            capabilities: ServerCapabilities {
                tools: Some(ServerCapabilitiesTools { list_changed: None }),
                ..Default::default()
            },
            server_info: Implementation {
                name: "hrdash-server".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                title: Some("HRDash HR Indicators Assistant".to_string()),
            },
            instructions: Some(
                "HRDash Server - HR indicator dashboard back-end. \
                 Use 'filter' and 'options' to scope the data, 'charts' to plan charts \
                 and 'ask' to ask for maximums, minimums, averages or an executive summary."
                    .to_string(),
            ),
            meta: None,
        }
    }

    /// Define available MCP tools
    fn tools() -> Vec<Tool> {
        let session = || string_prop("Session name (defaults to \"default\")");
        let mut tools = Vec::new();

        {
            let mut properties = HashMap::new();
            properties.insert(
                "question".to_string(),
                string_prop("Question about the filtered indicators (e.g., '¿Máximo de Cost per hire en 2025?')"),
            );
            properties.insert("session".to_string(), session());
            tools.push(tool(
                "ask",
                "Answer a question about the filtered HR indicators. Returns a markdown \
                 message and the supporting tables.",
                vec!["question".to_string()],
                properties,
            ));
        }

        {
            let mut properties = HashMap::new();
            properties.insert("session".to_string(), session());
            properties.insert("years".to_string(), string_list_prop("Selected years; empty means all"));
            properties.insert("months".to_string(), string_list_prop("Selected months; empty means all"));
            properties.insert(
                "subprocesses".to_string(),
                string_list_prop("Selected subprocesses; empty means all"),
            );
            properties.insert(
                "indicators".to_string(),
                string_list_prop("Selected indicators; empty means all"),
            );
            properties.insert(
                "select_all".to_string(),
                string_list_prop("Filters to set to every offered value: years, months, subprocesses, indicators"),
            );
            tools.push(tool(
                "filter",
                "Update the session filters. Omitted filters are left unchanged. \
                 Returns the active filters and the cascaded options.",
                vec![],
                properties,
            ));
        }

        {
            let mut properties = HashMap::new();
            properties.insert("session".to_string(), session());
            tools.push(tool(
                "options",
                "List the values each filter currently offers, cascaded from the active filters.",
                vec![],
                properties,
            ));
        }

        {
            let mut properties = HashMap::new();
            properties.insert("session".to_string(), session());

            let mut kinds = Map::new();
            kinds.insert("type".to_string(), Value::String("object".to_string()));
            kinds.insert(
                "description".to_string(),
                Value::String(
                    "Chart kinds per indicator, e.g. {\"Cost per hire\": [\"Bar\", \"Pie\"]}. \
                     Kinds: Bar, Column, Line, Area, Pie, Scatter, Bubble, Box, Histogram, Heatmap, Violin"
                        .to_string(),
                ),
            );
            properties.insert("kinds".to_string(), kinds);

            let mut palette = string_prop("Color palette");
            palette.insert("enum".to_string(), json!(["GrayYellowBlackWhite", "BlueRedGreen", "Pastel"]));
            properties.insert("palette".to_string(), palette);

            tools.push(tool(
                "charts",
                "Plan charts for the selected indicators (at most 12). Returns chart \
                 specifications with encodings, palette and data.",
                vec![],
                properties,
            ));
        }

        tools.push(tool(
            "refresh",
            "Reload the indicator workbook from its source and update every session.",
            vec![],
            HashMap::new(),
        ));

        tools
    }

    /// Current snapshot. Loading reads the workbook from disk, so it runs on
    /// the blocking pool.
    async fn load_facts(&self, reload: bool) -> Result<Arc<FactTable>, CallToolError> {
        let source = Arc::clone(&self.source);
        tokio::task::spawn_blocking(move || if reload { source.refresh() } else { source.get() })
            .await
            .map_err(|e| CallToolError::from_message(format!("Fact table load task failed: {}", e)))?
            .map_err(source_error)
    }

    /// Session `key`, created on first use and locked for the caller. A
    /// session whose snapshot is older than the cached table is reloaded.
    async fn session(&self, key: &str) -> Result<OwnedMutexGuard<Session>, CallToolError> {
        let facts = self.load_facts(false).await?;
        let handle = {
            let mut sessions = self.sessions.lock().await;
            let handle = sessions.entry(key.to_string()).or_insert_with(|| {
                info!(session = key, rows = facts.len(), "Opened session");
                Arc::new(Mutex::new(Session::new(Arc::clone(&facts))))
            });
            Arc::clone(handle)
        };

        let mut session = handle.lock_owned().await;
        if !Arc::ptr_eq(session.facts(), &facts) {
            session.reload(facts);
        }
        Ok(session)
    }

    fn session_state(session: &Session) -> Value {
        json!({
            "filters": session.filters(),
            "options": session.options(),
            "rows_in_scope": session.scope().len(),
        })
    }

    async fn handle_ask_tool(&self, arguments: Option<Map<String, Value>>) -> Result<CallToolResult, CallToolError> {
        let args = arguments.ok_or_else(|| CallToolError::from_message("Missing arguments"))?;
        let args: AskArgs = from_map(args)?;
        let key = args.session.as_deref().unwrap_or(DEFAULT_SESSION);

        info!(session = key, question = %args.question, "Answering question");

        let mut session = self.session(key).await?;
        let answer = session.ask(self.answerer.as_ref(), &args.question).await;

        let mut content = vec![ContentBlock::TextContent(TextContent::new(
            answer.message.clone(),
            None,
            None,
        ))];
        if !answer.tables.is_empty() {
            let tables = serde_json::to_string_pretty(&answer.tables).unwrap_or_default();
            content.push(ContentBlock::TextContent(TextContent::new(tables, None, None)));
        }

        Ok(CallToolResult {
            content,
            is_error: None,
            meta: None,
            structured_content: None,
        })
    }

    async fn handle_filter_tool(&self, arguments: Option<Map<String, Value>>) -> Result<CallToolResult, CallToolError> {
        let args: FilterArgs = parse_args(arguments)?;
        let key = args.session.as_deref().unwrap_or(DEFAULT_SESSION);

        let mut session = self.session(key).await?;

        // Dashboard order, so later dimensions cascade from earlier ones
        let values = [
            (Dimension::PeriodGroup, args.years),
            (Dimension::Period, args.months),
            (Dimension::Category, args.subprocesses),
            (Dimension::Metric, args.indicators),
        ];
        for (dimension, selected) in values {
            if args.select_all.iter().any(|s| s == dimension_name(dimension)) {
                session.select_all(dimension);
            } else if let Some(selected) = selected {
                session.set_filter(dimension, selected);
            }
        }

        info!(session = key, filters = ?session.filters(), "Updated filters");
        Ok(json_result(&Self::session_state(&session)))
    }

    async fn handle_options_tool(&self, arguments: Option<Map<String, Value>>) -> Result<CallToolResult, CallToolError> {
        let args: SessionArgs = parse_args(arguments)?;
        let key = args.session.as_deref().unwrap_or(DEFAULT_SESSION);

        let session = self.session(key).await?;
        Ok(json_result(&Self::session_state(&session)))
    }

    async fn handle_charts_tool(&self, arguments: Option<Map<String, Value>>) -> Result<CallToolResult, CallToolError> {
        let args: ChartArgs = parse_args(arguments)?;
        let key = args.session.as_deref().unwrap_or(DEFAULT_SESSION);

        let mut session = self.session(key).await?;
        for (indicator, kinds) in args.kinds {
            session.set_chart_kinds(indicator, kinds);
        }
        if let Some(palette) = args.palette {
            session.set_palette(palette);
        }

        let charts = session.chart_plan();
        info!(session = key, charts = charts.len(), "Planned charts");
        Ok(json_result(&json!({ "charts": charts })))
    }

    async fn handle_refresh_tool(&self) -> Result<CallToolResult, CallToolError> {
        let facts = self.load_facts(true).await?;

        let handles: Vec<_> = self.sessions.lock().await.values().cloned().collect();
        for handle in &handles {
            handle.lock().await.reload(Arc::clone(&facts));
        }

        info!(rows = facts.len(), sessions = handles.len(), "Refreshed data");
        Ok(json_result(&json!({
            "rows": facts.len(),
            "years": facts.period_groups(),
            "months": facts.periods(),
            "sessions": handles.len(),
        })))
    }
}

#[async_trait]
impl ServerHandler for HrdashServerHandler {
    async fn handle_list_tools_request(
        &self,
        _request: ListToolsRequest,
        _runtime: Arc<dyn McpServer>,
    ) -> std::result::Result<ListToolsResult, RpcError> {
        info!("Listing available tools");

        Ok(ListToolsResult {
            tools: Self::tools(),
            next_cursor: None,
            meta: None,
        })
    }

    async fn handle_call_tool_request(
        &self,
        request: CallToolRequest,
        _runtime: Arc<dyn McpServer>,
    ) -> std::result::Result<CallToolResult, CallToolError> {
        info!("Tool called: {}", request.params.name);

        let arguments = request.params.arguments;
        match request.params.name.as_str() {
            "ask" => self.handle_ask_tool(arguments).await,
            "filter" => self.handle_filter_tool(arguments).await,
            "options" => self.handle_options_tool(arguments).await,
            "charts" => self.handle_charts_tool(arguments).await,
            "refresh" => self.handle_refresh_tool().await,
            _ => Err(CallToolError::unknown_tool(request.params.name.clone())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hrdash_facts::SchemaSpec;
    use hrdash_query::RuleBasedAnswerer;
    use hrdash_source::{CsvDirSource, DEFAULT_TTL};
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    const HEADER: &str = "Subprocess,Indicator Type,Indicator Name,Measurement Frequency,Formula / How it is calculated,January,February,March";

    /// Two yearly sheets; "Time to fill" only exists in 2024.
    fn workbook_dir() -> PathBuf {
        static COUNTER: AtomicUsize = AtomicUsize::new(0);
        let dir = std::env::temp_dir().join(format!(
            "hrdash-server-{}-{}",
            std::process::id(),
            COUNTER.fetch_add(1, Ordering::SeqCst)
        ));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            dir.join("2024.csv"),
            format!("{HEADER}\nRecruitment,KPI,Cost per hire,Monthly,Total cost / hires,30,31,32\nRecruitment,KPI,Time to fill,Monthly,Days to hire,40,38,35\n"),
        )
        .unwrap();
        std::fs::write(
            dir.join("2025.csv"),
            format!("{HEADER}\nRecruitment,KPI,Cost per hire,Monthly,Total cost / hires,10,25.5,20\n"),
        )
        .unwrap();
        dir
    }

    fn handler(dir: &PathBuf, ttl: Duration) -> HrdashServerHandler {
        let source = CachedSource::new(Box::new(CsvDirSource::new(dir)), SchemaSpec::default(), ttl);
        HrdashServerHandler::new(source, Arc::new(RuleBasedAnswerer::default()))
    }

    fn args(value: Value) -> Option<Map<String, Value>> {
        match value {
            Value::Object(map) => Some(map),
            _ => None,
        }
    }

    fn texts(result: &CallToolResult) -> Vec<String> {
        result
            .content
            .iter()
            .filter_map(|block| match block {
                ContentBlock::TextContent(text) => Some(text.text.clone()),
                _ => None,
            })
            .collect()
    }

    async fn metrics(handler: &HrdashServerHandler, key: &str) -> Vec<String> {
        let handle = handler.sessions.lock().await.get(key).cloned().unwrap();
        let metrics = handle.lock().await.filters().metrics.clone();
        metrics
    }

    #[test]
    fn test_tools_are_listed() {
        let names: Vec<_> = HrdashServerHandler::tools().into_iter().map(|t| t.name).collect();
        assert_eq!(names, ["ask", "filter", "options", "charts", "refresh"]);
    }

    #[test]
    fn test_filter_args() {
        let mut map = Map::new();
        map.insert("years".to_string(), json!(["2025"]));
        map.insert("select_all".to_string(), json!(["indicators"]));
        let args: FilterArgs = parse_args(Some(map)).unwrap();
        assert_eq!(args.years, Some(vec!["2025".to_string()]));
        assert_eq!(args.months, None);
        assert_eq!(args.select_all, ["indicators"]);

        let args: FilterArgs = parse_args(None).unwrap();
        assert!(args.select_all.is_empty());
    }

    #[test]
    fn test_chart_args() {
        let mut map = Map::new();
        map.insert("kinds".to_string(), json!({ "Cost per hire": ["Bar", "Heatmap"] }));
        map.insert("palette".to_string(), json!("Pastel"));
        let args: ChartArgs = parse_args(Some(map)).unwrap();
        assert_eq!(args.kinds["Cost per hire"], [ChartKind::Bar, ChartKind::Heatmap]);
        assert_eq!(args.palette, Some(Palette::Pastel));
    }

    #[test]
    fn test_dimension_names() {
        let names: Vec<_> = Dimension::ALL.iter().map(|d| dimension_name(*d)).collect();
        assert_eq!(names, ["years", "months", "subprocesses", "indicators"]);
    }

    #[test]
    fn test_ask_args_report_the_parse_error() {
        let mut map = Map::new();
        map.insert("question".to_string(), json!("máximo de Cost per hire"));
        map.insert("session".to_string(), json!(5));
        let err = from_map::<AskArgs>(map).unwrap_err();
        assert!(err.to_string().contains("Invalid arguments"), "{}", err);
        assert!(err.to_string().contains("string"), "{}", err);
    }

    #[tokio::test]
    async fn test_ask_rejects_mistyped_session() {
        let dir = workbook_dir();
        let handler = handler(&dir, DEFAULT_TTL);

        let err = handler
            .handle_ask_tool(args(json!({ "question": "máximo de Cost per hire", "session": 5 })))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Invalid arguments"), "{}", err);
        assert!(!err.to_string().contains("Missing required argument"));
    }

    #[tokio::test]
    async fn test_filter_select_all_cascades_from_years() {
        let dir = workbook_dir();
        let handler = handler(&dir, DEFAULT_TTL);

        let result = handler
            .handle_filter_tool(args(json!({ "years": ["2025"], "select_all": ["indicators"] })))
            .await
            .unwrap();
        assert_eq!(metrics(&handler, DEFAULT_SESSION).await, ["Cost per hire"]);

        let state: Value = serde_json::from_str(&texts(&result)[0]).unwrap();
        assert_eq!(state["filters"]["metrics"], json!(["Cost per hire"]));
        assert_eq!(state["rows_in_scope"], json!(3));
    }

    #[tokio::test]
    async fn test_session_adopts_reloaded_snapshot() {
        let dir = workbook_dir();
        let handler = handler(&dir, Duration::ZERO);

        handler
            .handle_filter_tool(args(json!({ "indicators": ["Time to fill"] })))
            .await
            .unwrap();
        assert_eq!(metrics(&handler, DEFAULT_SESSION).await, ["Time to fill"]);

        std::fs::remove_file(dir.join("2024.csv")).unwrap();
        handler.handle_options_tool(None).await.unwrap();

        assert!(metrics(&handler, DEFAULT_SESSION).await.is_empty());
        let handle = handler.sessions.lock().await.get(DEFAULT_SESSION).cloned().unwrap();
        assert_eq!(handle.lock().await.facts().period_groups(), ["2025"]);
    }

    #[tokio::test]
    async fn test_refresh_prunes_every_session() {
        let dir = workbook_dir();
        let handler = handler(&dir, DEFAULT_TTL);

        for key in ["a", "b"] {
            handler
                .handle_filter_tool(args(json!({ "session": key, "indicators": ["Time to fill"] })))
                .await
                .unwrap();
        }

        // The cached snapshot outlives the file until refreshed
        std::fs::remove_file(dir.join("2024.csv")).unwrap();
        handler.handle_options_tool(args(json!({ "session": "a" }))).await.unwrap();
        assert_eq!(metrics(&handler, "a").await, ["Time to fill"]);

        let result = handler.handle_refresh_tool().await.unwrap();
        let summary: Value = serde_json::from_str(&texts(&result)[0]).unwrap();
        assert_eq!(summary["sessions"], json!(2));
        assert_eq!(summary["years"], json!(["2025"]));

        assert!(metrics(&handler, "a").await.is_empty());
        assert!(metrics(&handler, "b").await.is_empty());
    }

    #[tokio::test]
    async fn test_ask_returns_tables_block() {
        let dir = workbook_dir();
        let handler = handler(&dir, DEFAULT_TTL);

        let result = handler
            .handle_ask_tool(args(json!({ "question": "máximo de Cost per hire" })))
            .await
            .unwrap();
        let blocks = texts(&result);
        assert_eq!(blocks.len(), 2);
        assert!(blocks[0].contains("**32.00**"), "{}", blocks[0]);
        let tables: Value = serde_json::from_str(&blocks[1]).unwrap();
        assert_eq!(tables.as_array().map(Vec::len), Some(1));

        let result = handler
            .handle_ask_tool(args(json!({ "question": "hola" })))
            .await
            .unwrap();
        assert_eq!(result.content.len(), 1);

        let handle = handler.sessions.lock().await.get(DEFAULT_SESSION).cloned().unwrap();
        assert_eq!(handle.lock().await.history().len(), 5);
    }
}
