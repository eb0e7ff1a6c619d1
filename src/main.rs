mod application;
mod cli;
mod config;
mod domain;
mod infrastructure;

pub use application::{agent, repl, tooling};
pub use domain::types;
pub use infrastructure::{model, server};

use agent::{Agent, AgentOptions, DecisionResolver, compose_system_prompt};
use clap::Parser;
use cli::{Cli, RunMode};
use config::{AppConfig, DEFAULT_PREFS_PATH, Preferences};
use model::{GenerationOptions, OllamaClient};
use server::SessionState;
use std::error::Error;
use std::path::Path;
use std::sync::Arc;
use tooling::{McpProcess, ToolRegistry, ToolSession};
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, fmt};
use types::Transcript;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    init_tracing();
    info!("Starting weekend-wizard");
    let cli = Cli::parse();
    debug!(?cli.mode, config = ?cli.config, prefs = ?cli.prefs, "CLI arguments parsed");

    let config = AppConfig::load(cli.config.as_deref().map(Path::new))?;
    let prefs_path = cli.prefs.as_deref().unwrap_or(DEFAULT_PREFS_PATH);
    let prefs = Preferences::load(Path::new(prefs_path));

    debug!(ollama_url = %cli.ollama_url, "Creating Ollama provider");
    let provider = OllamaClient::new(cli.ollama_url.clone());
    let sampling = GenerationOptions {
        temperature: prefs.model_temperature,
        top_p: Some(prefs.model_top_p),
    };
    let resolver = DecisionResolver::new(provider, config.model.clone(), sampling);

    info!(command = %config.server.command, "Connecting to the tool server");
    let session = Arc::new(McpProcess::connect(&config.server).await?);
    let session_handle: Arc<dyn ToolSession> = session.clone();

    let tools = session.list_tools().await?;
    info!(tool_count = tools.len(), "Tool catalogue loaded");
    let instructions = session.instructions().await;
    let system_prompt = compose_system_prompt(
        &tools,
        instructions.as_deref(),
        config.system_prompt.as_deref(),
        &prefs.personalization(),
    );
    let mut transcript = Transcript::new(system_prompt);

    match cli.mode {
        RunMode::Chat => {
            let agent = Agent::new(resolver, session_handle, AgentOptions::interactive());
            let registry = ToolRegistry::from_descriptors(tools);
            println!("Connected tools: {:?}", registry.names());
            repl::run(&agent, &registry, &mut transcript).await?;
        }
        RunMode::Serve => {
            let agent = Agent::new(resolver, session_handle.clone(), AgentOptions::serving());
            let state = Arc::new(SessionState::new(agent, session_handle, transcript));
            info!(addr = %cli.addr, "Starting chat server");
            server::serve(state, cli.addr).await?;
        }
    }

    session.shutdown().await;
    info!("Client execution finished");
    Ok(())
}

fn init_tracing() {
    static INIT: std::sync::Once = std::sync::Once::new();
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_level(true)
            .init();
    });
}
