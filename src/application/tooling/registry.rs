use super::{ToolDescriptor, ToolInvokeError, ToolSession};
use std::collections::HashMap;

/// Snapshot of the tools advertised by the session, keyed for lookup.
/// Rebuilt once per interactive session start or once per networked chat
/// request; it does not track registry changes made afterwards.
#[derive(Debug, Default)]
pub struct ToolRegistry {
    index: HashMap<String, ToolDescriptor>,
}

impl ToolRegistry {
    pub async fn snapshot(session: &dyn ToolSession) -> Result<Self, ToolInvokeError> {
        let tools = session.list_tools().await?;
        Ok(Self::from_descriptors(tools))
    }

    pub fn from_descriptors(tools: Vec<ToolDescriptor>) -> Self {
        let index = tools
            .into_iter()
            .map(|tool| (tool.name.to_lowercase(), tool))
            .collect();
        Self { index }
    }

    /// Lookup is case-insensitive; invocation should use the returned
    /// descriptor's canonical name.
    pub fn get(&self, name: &str) -> Option<&ToolDescriptor> {
        self.index.get(&name.to_lowercase())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.index.values().map(|tool| tool.name.as_str()).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(name: &str) -> ToolDescriptor {
        ToolDescriptor {
            name: name.to_string(),
            description: None,
            input_schema: None,
        }
    }

    #[test]
    fn lookup_is_case_insensitive_but_keeps_canonical_name() {
        let registry = ToolRegistry::from_descriptors(vec![descriptor("Get_Weather")]);
        assert!(registry.contains("get_weather"));
        assert!(registry.contains("GET_WEATHER"));
        assert_eq!(
            registry.get("get_weather").map(|tool| tool.name.as_str()),
            Some("Get_Weather")
        );
        assert!(!registry.contains("search"));
    }

    #[test]
    fn names_are_sorted() {
        let registry =
            ToolRegistry::from_descriptors(vec![descriptor("zeta"), descriptor("alpha")]);
        assert_eq!(registry.names(), vec!["alpha", "zeta"]);
        assert_eq!(registry.len(), 2);
    }
}
