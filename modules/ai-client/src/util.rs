/// Pull the first JSON object or array out of a model response. Handles
/// markdown fences and surrounding prose the same way: everything outside
/// the outermost braces is ignored.
pub fn extract_json(response: &str) -> Option<&str> {
    let trimmed = response.trim();
    let start = trimmed.find(['{', '['])?;
    let close = if trimmed.as_bytes()[start] == b'{' {
        '}'
    } else {
        ']'
    };
    let end = trimmed.rfind(close)?;
    if end < start {
        return None;
    }
    Some(&trimmed[start..=end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_bare_json() {
        assert_eq!(extract_json("{\"a\": 1}"), Some("{\"a\": 1}"));
        assert_eq!(extract_json("  [1, 2]  "), Some("[1, 2]"));
    }

    #[test]
    fn extracts_fenced_json() {
        assert_eq!(extract_json("```json\n{\"a\": 1}\n```"), Some("{\"a\": 1}"));
    }

    #[test]
    fn extracts_embedded_json() {
        let chatty = "Sure! Here is the result:\n```json\n{\"a\": 1}\n```\nHope it helps.";
        assert_eq!(extract_json(chatty), Some("{\"a\": 1}"));
        assert_eq!(extract_json("no json here"), None);
    }

    #[test]
    fn mismatched_brackets_are_a_miss() {
        assert_eq!(extract_json("} {"), None);
    }
}
