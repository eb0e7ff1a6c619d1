use crate::tooling::ToolDescriptor;

/// Composes the system message seeded into the transcript: the ReAct
/// contract, the tool catalogue, optional server guidance, and the user's
/// personalization fragment.
pub fn compose_system_prompt(
    tools: &[ToolDescriptor],
    server_instructions: Option<&str>,
    custom_instruction: Option<&str>,
    personalization: &str,
) -> String {
    let mut lines = vec![
        "You are a cheerful weekend helper. You can call external tools.".to_string(),
        "Decide step-by-step (ReAct). If you need a tool, output ONLY JSON:".to_string(),
        r#"{"action":"<tool-name>","args":{...}}"#.to_string(),
        "If you can answer, output ONLY JSON:".to_string(),
        r#"{"action":"final","answer":"..."}"#.to_string(),
    ];

    if let Some(instruction) = custom_instruction {
        let instruction = instruction.trim();
        if !instruction.is_empty() {
            lines.push(instruction.to_string());
        }
    }

    if let Some(guidance) = server_instructions {
        let guidance = guidance.trim();
        if !guidance.is_empty() {
            lines.push(format!("Tool server guidance: {guidance}"));
        }
    }

    if tools.is_empty() {
        lines.push("No tools are currently available; answer from your own knowledge.".to_string());
    } else {
        lines.push("Available tools:".to_string());
        for tool in tools {
            let description = tool.description.as_deref().unwrap_or("No description.");
            lines.push(format!("- {}: {}", tool.name, description));
        }
    }

    let mut prompt = lines.join("\n");
    prompt.push_str(personalization);
    prompt
}
