use std::net::SocketAddr;

use clap::{Parser, ValueEnum};

#[derive(Parser, Debug)]
#[command(
    name = "weekend-wizard",
    version,
    about = "ReAct weekend helper agent over MCP tools, powered by Ollama"
)]
pub struct Cli {
    /// Base URL of the Ollama server.
    #[arg(long, default_value = "http://127.0.0.1:11434")]
    pub ollama_url: String,
    /// Client configuration file (TOML).
    #[arg(long)]
    pub config: Option<String>,
    /// User preferences file (JSON).
    #[arg(long)]
    pub prefs: Option<String>,
    #[arg(long, value_enum, default_value_t = RunMode::Chat)]
    pub mode: RunMode,
    /// Bind address for serve mode.
    #[arg(long, default_value = "127.0.0.1:8000")]
    pub addr: SocketAddr,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum RunMode {
    /// Interactive prompt on the terminal.
    Chat,
    /// HTTP chat endpoint with streamed progress.
    Serve,
}
