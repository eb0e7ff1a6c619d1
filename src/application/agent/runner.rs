use super::decision::Decision;
use super::errors::AgentError;
use super::models::{AgentOptions, TurnEvent, TurnOutcome};
use super::resolver::DecisionResolver;
use crate::model::ModelProvider;
use crate::tooling::{ToolRegistry, ToolSession};
use crate::types::Transcript;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

const REFLECTION_APPROVAL: &str = "looks good";
const MAX_CONSECUTIVE_TOOL_FAILURES: usize = 2;

const UNRESOLVED_OBSERVATION: &str = "(the previous response was not a usable action)";

/// The ReAct loop: resolve a decision, act on it, observe the result,
/// and repeat until a final answer or the iteration bound.
pub struct Agent<P: ModelProvider> {
    resolver: DecisionResolver<P>,
    session: Arc<dyn ToolSession>,
    options: AgentOptions,
}

impl<P: ModelProvider> Agent<P> {
    pub fn new(
        resolver: DecisionResolver<P>,
        session: Arc<dyn ToolSession>,
        options: AgentOptions,
    ) -> Self {
        Self {
            resolver,
            session,
            options,
        }
    }

    /// Runs one user turn against the shared transcript. Every branch
    /// appends at least one message; tool observations are tagged with
    /// `[tool:<name>]` so the model can tell them apart from prose.
    pub async fn run_turn(
        &self,
        transcript: &mut Transcript,
        registry: &ToolRegistry,
        user_text: impl Into<String>,
        mut on_event: impl FnMut(TurnEvent),
    ) -> Result<TurnOutcome, AgentError> {
        transcript.push_user(user_text);
        let mut consecutive_failures = 0usize;

        for iteration in 0..self.options.max_iterations {
            debug!(iteration, "Resolving next decision");
            on_event(TurnEvent::Thinking);

            match self.resolver.resolve(transcript).await? {
                Decision::Final { answer } => {
                    let answer = if self.options.reflect {
                        self.reflect(answer).await?
                    } else {
                        answer
                    };
                    transcript.push_assistant(answer.clone());
                    info!("Turn finished with a final answer");
                    return Ok(TurnOutcome::Answered(answer));
                }
                Decision::ToolCall { name, args } => match registry.get(&name) {
                    Some(descriptor) => {
                        let tool = descriptor.name.clone();
                        on_event(TurnEvent::CallingTool { name: tool.clone() });
                        info!(tool = %tool, "Agent requested tool execution");
                        match self.session.call_tool(&tool, args).await {
                            Ok(result) => {
                                consecutive_failures = 0;
                                let payload = tool_payload(&result);
                                transcript.push_assistant(format!("[tool:{tool}] {payload}"));
                            }
                            Err(source) => {
                                consecutive_failures += 1;
                                warn!(
                                    tool = %tool,
                                    %source,
                                    consecutive_failures,
                                    "Tool invocation failed"
                                );
                                if consecutive_failures >= MAX_CONSECUTIVE_TOOL_FAILURES {
                                    return Err(AgentError::ToolFailures { tool, source });
                                }
                                transcript.push_assistant(format!("[tool:{tool}] error: {source}"));
                            }
                        }
                    }
                    None => {
                        warn!(tool = %name, "Model tried to call unknown tool");
                        transcript.push_assistant(format!("(unknown tool {name})"));
                    }
                },
                Decision::Unresolved => {
                    warn!("Model produced no usable action");
                    transcript.push_assistant(UNRESOLVED_OBSERVATION);
                }
            }
        }

        warn!(
            max_iterations = self.options.max_iterations,
            "Iteration bound reached without a final answer"
        );
        Ok(TurnOutcome::Exhausted)
    }

    /// One-shot reflection on a candidate final answer. An approving
    /// `looks good` (any casing, surrounding whitespace) keeps the
    /// candidate; anything else replaces it verbatim.
    async fn reflect(&self, answer: String) -> Result<String, AgentError> {
        let review = self.resolver.review(&answer).await?;
        if review.trim().eq_ignore_ascii_case(REFLECTION_APPROVAL) {
            debug!("Reflection confirmed the candidate answer");
            Ok(answer)
        } else {
            info!("Reflection replaced the candidate answer");
            Ok(review)
        }
    }
}

/// Text payload of a tool result: the first text content item, falling
/// back to a serialization of the whole result.
fn tool_payload(result: &Value) -> String {
    if let Some(items) = result.get("content").and_then(Value::as_array) {
        for item in items {
            if let Some(text) = item.get("text").and_then(Value::as_str) {
                return text.to_string();
            }
        }
    }
    result.to_string()
}

#[cfg(test)]
mod payload_tests {
    use super::tool_payload;
    use serde_json::json;

    #[test]
    fn first_text_item_wins() {
        let result = json!({
            "content": [
                {"type": "image", "data": "..."},
                {"type": "text", "text": "Sunny, 20C"},
                {"type": "text", "text": "ignored"},
            ]
        });
        assert_eq!(tool_payload(&result), "Sunny, 20C");
    }

    #[test]
    fn empty_content_falls_back_to_serialization() {
        let result = json!({"content": [], "isError": false});
        assert_eq!(tool_payload(&result), result.to_string());
    }

    #[test]
    fn missing_content_falls_back_to_serialization() {
        let result = json!({"ok": true});
        assert_eq!(tool_payload(&result), r#"{"ok":true}"#);
    }
}
