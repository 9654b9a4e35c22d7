//! JSON extraction and repair for LLM output.
//!
//! Model output is "nearly JSON": fenced, prefixed with commentary, and
//! structurally dented in predictable ways. Every LLM response passes
//! through [`extract_balanced`] and [`repair`] before `serde_json` sees it.

/// Extract the first balanced `open…close` substring, respecting string
/// literals and escapes. Returns `None` when no balanced region exists.
pub fn extract_balanced(input: &str, open: char, close: char) -> Option<&str> {
    let start = input.find(open)?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, c) in input[start..].char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            c if c == open => depth += 1,
            c if c == close => {
                depth -= 1;
                if depth == 0 {
                    return Some(&input[start..start + offset + c.len_utf8()]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Extract the first balanced JSON array from a response.
pub fn extract_array(input: &str) -> Option<&str> {
    extract_balanced(input, '[', ']')
}

/// Extract the first balanced JSON object from a response.
pub fn extract_object(input: &str) -> Option<&str> {
    extract_balanced(input, '{', '}')
}

/// Repair common structural defects in model JSON: markdown fences, curly
/// double quotes used as delimiters, trailing commas, missing commas
/// between adjacent values, and raw newlines inside string literals.
pub fn repair(input: &str) -> String {
    let defenced = strip_fences(input);

    // Curly double quotes are a frequent stand-in for the delimiter.
    let normalized: String = defenced
        .chars()
        .map(|c| match c {
            '\u{201C}' | '\u{201D}' | '\u{201E}' => '"',
            other => other,
        })
        .collect();

    let chars: Vec<char> = normalized.chars().collect();
    let mut out = String::with_capacity(normalized.len());
    let mut in_string = false;
    let mut escaped = false;

    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];

        if in_string {
            if escaped {
                escaped = false;
                out.push(c);
            } else if c == '\\' {
                escaped = true;
                out.push(c);
            } else if c == '"' {
                in_string = false;
                out.push(c);
            } else if c == '\n' {
                out.push_str("\\n");
            } else {
                out.push(c);
            }
            i += 1;
            continue;
        }

        match c {
            '"' => {
                in_string = true;
                out.push(c);
            }
            ',' => {
                // Drop a trailing comma when the next token closes a scope.
                match next_non_ws(&chars, i + 1) {
                    Some(']') | Some('}') => {}
                    _ => out.push(c),
                }
            }
            '}' | ']' => {
                out.push(c);
                // Insert the comma models drop between adjacent values.
                if let Some(next) = next_non_ws(&chars, i + 1) {
                    if next == '{' || next == '[' || next == '"' {
                        out.push(',');
                    }
                }
            }
            _ => out.push(c),
        }
        i += 1;
    }

    out
}

fn next_non_ws(chars: &[char], from: usize) -> Option<char> {
    chars[from..].iter().copied().find(|c| !c.is_whitespace())
}

fn strip_fences(input: &str) -> &str {
    let trimmed = input.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Skip the language tag on the opening fence line.
    let body = match rest.find('\n') {
        Some(pos) => &rest[pos + 1..],
        None => rest,
    };
    body.strip_suffix("```").unwrap_or(body).trim()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn test_extract_array_skips_commentary() {
        let response = r#"Here you go:

[{"index": 0, "text": "привет"}]

Hope that helps!"#;
        let extracted = extract_array(response).unwrap();
        let value: Value = serde_json::from_str(extracted).unwrap();
        assert_eq!(value[0]["index"], 0);
    }

    #[test]
    fn test_extract_respects_brackets_inside_strings() {
        let response = r#"[{"text": "array ] inside"}]"#;
        let extracted = extract_array(response).unwrap();
        assert_eq!(extracted, response);
    }

    #[test]
    fn test_extract_object() {
        let response = "prefix {\"a\": {\"b\": 1}} suffix";
        assert_eq!(extract_object(response).unwrap(), "{\"a\": {\"b\": 1}}");
    }

    #[test]
    fn test_repair_strips_fences() {
        let fenced = "```json\n[1, 2, 3]\n```";
        let repaired = repair(fenced);
        let value: Value = serde_json::from_str(&repaired).unwrap();
        assert_eq!(value, serde_json::json!([1, 2, 3]));
    }

    #[test]
    fn test_repair_trailing_commas() {
        let broken = r#"{"items": [1, 2, 3,], }"#;
        let repaired = repair(broken);
        assert!(serde_json::from_str::<Value>(&repaired).is_ok());
    }

    #[test]
    fn test_repair_missing_comma_between_objects() {
        let broken = r#"[{"index": 0} {"index": 1}]"#;
        let repaired = repair(broken);
        let value: Value = serde_json::from_str(&repaired).unwrap();
        assert_eq!(value.as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_repair_newline_inside_string() {
        let broken = "{\"text\": \"line one\nline two\"}";
        let repaired = repair(broken);
        let value: Value = serde_json::from_str(&repaired).unwrap();
        assert_eq!(value["text"], "line one\nline two");
    }

    #[test]
    fn test_repair_curly_quotes() {
        let broken = "{\u{201C}key\u{201D}: \u{201C}value\u{201D}}";
        let repaired = repair(broken);
        let value: Value = serde_json::from_str(&repaired).unwrap();
        assert_eq!(value["key"], "value");
    }

    #[test]
    fn test_repair_keeps_valid_json_intact() {
        let valid = r#"{"a": [1, 2], "b": "text, with] commas"}"#;
        let repaired = repair(valid);
        let before: Value = serde_json::from_str(valid).unwrap();
        let after: Value = serde_json::from_str(&repaired).unwrap();
        assert_eq!(before, after);
    }
}
