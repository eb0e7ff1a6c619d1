/// Best-effort extraction of the JSON object embedded in raw model text.
/// Total: never fails, worst case it returns text that will not parse.
///
/// A fenced code block (optionally tagged as JSON) takes precedence; only
/// the first such block is considered. The candidate is then narrowed to
/// the span from the first `{` to the last `}`, discarding surrounding
/// prose.
pub fn extract_candidate(raw: &str) -> &str {
    let content = fenced_block(raw).unwrap_or(raw);
    let trimmed = content.trim();
    match (trimmed.find('{'), trimmed.rfind('}')) {
        (Some(first), Some(last)) if first < last => &trimmed[first..=last],
        _ => trimmed,
    }
}

fn fenced_block(raw: &str) -> Option<&str> {
    let start = raw.find("```")?;
    let mut body = &raw[start + 3..];
    for tag in ["json", "JSON"] {
        if let Some(rest) = body.strip_prefix(tag) {
            body = rest;
            break;
        }
    }
    let end = body.find("```")?;
    Some(&body[..end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_json_passes_through() {
        assert_eq!(
            extract_candidate(r#"{"action":"final","answer":"hi"}"#),
            r#"{"action":"final","answer":"hi"}"#
        );
    }

    #[test]
    fn fenced_block_wins_over_surrounding_prose() {
        let raw = "Sure, here you go:\n```json\n{\"action\":\"final\",\"answer\":\"hi\"}\n```\nHope that helps!";
        assert_eq!(
            extract_candidate(raw),
            r#"{"action":"final","answer":"hi"}"#
        );
    }

    #[test]
    fn untagged_fence_is_accepted() {
        let raw = "```\n{\"action\":\"search\",\"args\":{}}\n```";
        assert_eq!(extract_candidate(raw), r#"{"action":"search","args":{}}"#);
    }

    #[test]
    fn only_the_first_fenced_block_is_used() {
        let raw = "```json\n{\"a\":1}\n```\ntext\n```json\n{\"b\":2}\n```";
        assert_eq!(extract_candidate(raw), r#"{"a":1}"#);
    }

    #[test]
    fn prose_around_braces_is_discarded() {
        let raw = "The answer is {\"action\":\"final\",\"answer\":\"42\"} as requested.";
        assert_eq!(
            extract_candidate(raw),
            r#"{"action":"final","answer":"42"}"#
        );
    }

    #[test]
    fn text_without_braces_is_returned_trimmed() {
        assert_eq!(extract_candidate("  just prose  "), "just prose");
    }

    #[test]
    fn inverted_braces_do_not_panic() {
        assert_eq!(extract_candidate("} backwards {"), "} backwards {");
    }

    #[test]
    fn unterminated_fence_falls_back_to_full_text() {
        let raw = "```json\n{\"a\":1}";
        assert_eq!(extract_candidate(raw), r#"{"a":1}"#);
    }

    #[test]
    fn empty_input_is_returned_unchanged() {
        assert_eq!(extract_candidate(""), "");
    }
}
