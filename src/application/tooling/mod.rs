mod process;
mod registry;

pub use process::McpProcess;
pub use registry::ToolRegistry;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ToolInvokeError {
    #[error("failed to spawn tool server '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },
    #[error("tool server transport error: {message}")]
    Transport { message: String },
    #[error("tool server returned invalid JSON: {source}")]
    InvalidJson {
        #[source]
        source: serde_json::Error,
    },
    #[error("tool server returned JSON-RPC error {code}: {message}")]
    Rpc { code: i64, message: String },
    #[error("tool server terminated unexpectedly")]
    Terminated,
    #[error("tool call '{tool}' timed out after {seconds}s")]
    Timeout { tool: String, seconds: u64 },
}

/// Descriptor advertised by the tool server for one named tool.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: Option<String>,
    pub input_schema: Option<Value>,
}

/// Boundary to the tool-execution collaborator. The production session is
/// an MCP server subprocess; tests substitute a stub.
#[async_trait]
pub trait ToolSession: Send + Sync {
    async fn list_tools(&self) -> Result<Vec<ToolDescriptor>, ToolInvokeError>;

    async fn call_tool(&self, tool: &str, arguments: Value) -> Result<Value, ToolInvokeError>;
}
