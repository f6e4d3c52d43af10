//! HRDash MCP Server
//!
//! Model Context Protocol server for the HR indicators dashboard: filters,
//! chart plans and question answering over the yearly indicator sheets.

use hrdash_facts::SchemaSpec;
use hrdash_query::{Answerer, RuleBasedAnswerer};
use hrdash_source::CachedSource;
use rust_mcp_sdk::mcp_server::{hyper_server, HyperServerOptions};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

mod config;
mod llm;
mod logging;
mod mcp;

use config::Config;

fn build_answerer(config: &Config) -> Result<Arc<dyn Answerer>, config::ConfigError> {
    if !config.assistant.uses_llm() {
        info!("Using rule-based answerer");
        return Ok(Arc::new(RuleBasedAnswerer::new(config.assistant.rules.clone())));
    }

    let api_key = Config::get_openai_api_key()?;
    let mut openai_config = async_openai::config::OpenAIConfig::new().with_api_key(api_key);
    if let Some(base_url) = Config::get_openai_base_url() {
        info!("Using OpenAI-compatible endpoint: {}", base_url);
        openai_config = openai_config.with_api_base(base_url);
    }
    let client = async_openai::Client::with_config(openai_config);

    info!("Using chat model answerer: {}", config.assistant.model);
    Ok(Arc::new(llm::LlmAnswerer::new(
        client,
        config.assistant.model.clone(),
        config.assistant.max_rows,
    )))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let config_path = std::env::var("HRDASH_CONFIG").unwrap_or_else(|_| "config.yaml".to_string());
    let config = Config::load_or_default(&config_path)?;
    config.apply_logging_env();
    logging::init();

    info!("Loaded configuration from {}", config_path);

    let loader = hrdash_source::open(&config.source.path)?;
    let source = CachedSource::new(
        loader,
        SchemaSpec::default(),
        Duration::from_secs(config.source.ttl_secs),
    );
    // Sessions load lazily; a bad source is reported here and retried on use
    if let Err(e) = source.get() {
        warn!("Initial load of {} failed: {}", config.source.path, e);
    }

    let answerer = build_answerer(&config)?;
    let handler = mcp::HrdashServerHandler::new(source, answerer);
    let server_info = mcp::HrdashServerHandler::server_info();

    let host = config.server.host.clone();
    let port = config.server.port;

    info!("Starting HRDash MCP server on {}:{}", host, port);
    info!("Protocol: MCP with SSE (Server-Sent Events) support");

    let server = hyper_server::create_server(
        server_info,
        handler,
        HyperServerOptions {
            host,
            port,
            sse_support: true,
            ..Default::default()
        },
    );

    server.start().await?;

    Ok(())
}
