use serde_json::{Map, Value};

/// Parsed outcome of one model consultation.
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    Final { answer: String },
    ToolCall { name: String, args: Value },
    /// The model produced neither recognised shape, even after repair.
    Unresolved,
}

impl Decision {
    /// Classifies a parsed JSON value. An object whose `action` is the
    /// literal `"final"` carries the answer; any other string action
    /// names a tool, with `args` defaulting to an empty mapping.
    pub fn classify(value: Value) -> Self {
        let Value::Object(map) = value else {
            return Decision::Unresolved;
        };
        match map.get("action").and_then(Value::as_str) {
            Some("final") => Decision::Final {
                answer: map
                    .get("answer")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
            },
            Some(name) => Decision::ToolCall {
                name: name.to_string(),
                args: map
                    .get("args")
                    .cloned()
                    .unwrap_or_else(|| Value::Object(Map::new())),
            },
            None => Decision::Unresolved,
        }
    }
}
