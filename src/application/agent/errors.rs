use crate::model::ModelError;
use crate::tooling::ToolInvokeError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AgentError {
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error("failed to snapshot the tool catalogue: {0}")]
    Registry(#[source] ToolInvokeError),
    #[error("tool '{tool}' kept failing: {source}")]
    ToolFailures {
        tool: String,
        #[source]
        source: ToolInvokeError,
    },
}

impl AgentError {
    pub fn user_message(&self) -> String {
        match self {
            AgentError::Model(err) => err.user_message(),
            AgentError::Registry(_) => {
                "Could not fetch the tool catalogue from the tool server.".to_string()
            }
            AgentError::ToolFailures { tool, .. } => {
                format!("Tool \"{tool}\" failed repeatedly; giving up on this request.")
            }
        }
    }
}
