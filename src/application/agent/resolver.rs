use super::decision::Decision;
use super::extract::extract_candidate;
use crate::model::{GenerationOptions, ModelError, ModelProvider, ModelRequest};
use crate::types::{ChatMessage, MessageRole, Transcript};
use serde_json::Value;
use tracing::{debug, warn};

const REPAIR_SYSTEM_PROMPT: &str = "Return ONLY valid JSON.";
const REFLECTION_PROMPT: &str =
    "Check for mistakes or missing tool calls. If fine, reply 'looks good'; else give corrected answer.";

/// Turns one model consultation into a structured decision, with a single
/// bounded repair attempt when the model drifts out of the JSON contract.
pub struct DecisionResolver<P> {
    provider: P,
    model: String,
    options: GenerationOptions,
}

impl<P: ModelProvider> DecisionResolver<P> {
    pub fn new(provider: P, model: impl Into<String>, options: GenerationOptions) -> Self {
        Self {
            provider,
            model: model.into(),
            options,
        }
    }

    pub async fn resolve(&self, transcript: &Transcript) -> Result<Decision, ModelError> {
        let response = self
            .provider
            .chat(ModelRequest {
                model: self.model.clone(),
                messages: transcript.messages().to_vec(),
                options: self.options,
            })
            .await?;
        let raw = response.message.content;

        if let Some(value) = parse_candidate(&raw) {
            return Ok(Decision::classify(value));
        }

        debug!("Model response was not a JSON object; issuing repair request");
        let repair = self
            .provider
            .chat(ModelRequest {
                model: self.model.clone(),
                messages: vec![
                    ChatMessage::new(MessageRole::System, REPAIR_SYSTEM_PROMPT),
                    ChatMessage::new(MessageRole::User, format!("Fix this JSON:\n{raw}")),
                ],
                options: GenerationOptions::deterministic(),
            })
            .await?;

        match parse_candidate(&repair.message.content) {
            Some(value) => Ok(Decision::classify(value)),
            None => {
                warn!(
                    original = %raw,
                    repaired = %repair.message.content,
                    "Model output unparsable even after repair"
                );
                Ok(Decision::Unresolved)
            }
        }
    }

    /// One-shot review of a candidate final answer, at temperature zero.
    /// Returns the raw reflection text; the caller decides whether it
    /// replaces the answer.
    pub async fn review(&self, answer: &str) -> Result<String, ModelError> {
        let response = self
            .provider
            .chat(ModelRequest {
                model: self.model.clone(),
                messages: vec![
                    ChatMessage::new(MessageRole::System, REFLECTION_PROMPT),
                    ChatMessage::new(MessageRole::User, answer),
                ],
                options: GenerationOptions::deterministic(),
            })
            .await?;
        Ok(response.message.content)
    }
}

fn parse_candidate(raw: &str) -> Option<Value> {
    let value: Value = serde_json::from_str(extract_candidate(raw)).ok()?;
    value.is_object().then_some(value)
}
