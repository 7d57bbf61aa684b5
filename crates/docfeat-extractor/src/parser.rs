//! Parse free-text LLM output into feature lists and value maps
//!
//! Every function here is total: malformed input degrades to an empty or
//! partial result tagged as [`ParseOutcome::Fallback`], never to an error.

use docfeat_domain::{FeatureMap, FeatureName, MISSING_SENTINEL};
use serde_json::Value;
use tracing::warn;

/// Result of parsing model output
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseOutcome<T> {
    /// The output had the expected shape
    Structured(T),
    /// The expected shape was not found; the value is a best-effort default
    Fallback(T),
}

impl<T> ParseOutcome<T> {
    /// Unwrap the parsed or default value
    pub fn into_inner(self) -> T {
        match self {
            ParseOutcome::Structured(value) | ParseOutcome::Fallback(value) => value,
        }
    }

    /// Borrow the parsed or default value
    pub fn value(&self) -> &T {
        match self {
            ParseOutcome::Structured(value) | ParseOutcome::Fallback(value) => value,
        }
    }

    /// Whether parsing fell back
    pub fn is_fallback(&self) -> bool {
        matches!(self, ParseOutcome::Fallback(_))
    }
}

/// Strip markdown code fences and their language tag
///
/// Text outside the first fenced block is discarded. A lone fence that
/// only trails the reply closes it instead, so the text before it is kept.
/// Unfenced input is returned trimmed.
pub fn strip_code_fences(response: &str) -> &str {
    let trimmed = response.trim();
    let Some(open) = trimmed.find("```") else {
        return trimmed;
    };

    let after_open = &trimmed[open + 3..];
    let tag_len = after_open
        .bytes()
        .take_while(|b| b.is_ascii_alphanumeric())
        .count();
    let rest = &after_open[tag_len..];
    let body = if rest.is_empty() || rest.starts_with(|c: char| c.is_whitespace() || c == '{' || c == '[') {
        rest
    } else {
        after_open
    };

    let close = body.find("```").unwrap_or(body.len());
    let fenced = body[..close].trim();
    if fenced.is_empty() {
        return trimmed[..open].trim();
    }
    fenced
}

/// Delimited-list mode: split a comma-separated reply into feature names
///
/// Items are trimmed and empty items dropped. A reply with no commas but
/// several lines is handed to [`parse_lines`].
///
/// # Examples
///
/// ```
/// use docfeat_extractor::parser::parse_list;
///
/// let names: Vec<String> = parse_list("Revenue, Expenses ,  Profit Margins")
///     .into_inner()
///     .into_iter()
///     .map(|n| n.to_string())
///     .collect();
/// assert_eq!(names, vec!["Revenue", "Expenses", "Profit Margins"]);
/// ```
pub fn parse_list(response: &str) -> ParseOutcome<Vec<FeatureName>> {
    let body = strip_brackets(strip_code_fences(response));

    if body.is_empty() {
        return ParseOutcome::Fallback(Vec::new());
    }

    if body.contains(',') {
        let items: Vec<FeatureName> = body
            .split(',')
            .filter_map(|item| FeatureName::new(strip_quotes(item.trim())))
            .collect();
        return if items.is_empty() {
            ParseOutcome::Fallback(items)
        } else {
            ParseOutcome::Structured(items)
        };
    } else if body.lines().filter(|l| !l.trim().is_empty()).count() == 1 {
        let single = FeatureName::new(strip_quotes(strip_bullet(body)));
        return ParseOutcome::Structured(single.into_iter().collect());
    }

    warn!("Feature list was not comma separated, splitting on lines");
    ParseOutcome::Fallback(parse_lines(body))
}

/// Line-fallback mode: one feature per non-blank line, bullets removed
pub fn parse_lines(response: &str) -> Vec<FeatureName> {
    response
        .lines()
        .filter_map(|line| FeatureName::new(strip_quotes(strip_bullet(line.trim()))))
        .collect()
}

/// Structured-object mode: read a JSON object into an ordered value map
///
/// Code fences are stripped first; if the reply wraps the object in prose,
/// each balanced `{...}` block is tried in turn until one is an object. String values are trimmed,
/// `null` and blank strings become "N/A", and other JSON values keep their
/// JSON text. Anything that is not an object yields an empty map.
pub fn parse_object(response: &str) -> ParseOutcome<FeatureMap> {
    let body = strip_code_fences(response);

    if let Some(map) = object_from_json(body) {
        return ParseOutcome::Structured(map);
    }
    if let Some(map) = body
        .match_indices('{')
        .filter_map(|(start, _)| braced_block_at(body, start))
        .find_map(object_from_json)
    {
        return ParseOutcome::Structured(map);
    }

    warn!("Model reply was not a JSON object ({} chars)", response.len());
    ParseOutcome::Fallback(FeatureMap::new())
}

fn object_from_json(text: &str) -> Option<FeatureMap> {
    let value: Value = serde_json::from_str(text).ok()?;
    let object = value.as_object()?;

    Some(
        object
            .iter()
            .filter_map(|(key, value)| FeatureName::new(key).map(|name| (name, cell_text(value))))
            .collect(),
    )
}

fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => MISSING_SENTINEL.to_string(),
        Value::String(s) if s.trim().is_empty() => MISSING_SENTINEL.to_string(),
        Value::String(s) => s.trim().to_string(),
        Value::Array(items) if items.is_empty() => MISSING_SENTINEL.to_string(),
        Value::Array(items) => items.iter().map(cell_text).collect::<Vec<_>>().join(", "),
        other => other.to_string(),
    }
}

/// The balanced `{...}` block opening at `start`, ignoring braces inside strings
fn braced_block_at(text: &str, start: usize) -> Option<&str> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, c) in text[start..].char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }
    None
}

fn strip_brackets(text: &str) -> &str {
    text.strip_prefix('[')
        .and_then(|t| t.strip_suffix(']'))
        .map(str::trim)
        .unwrap_or(text)
}

fn strip_quotes(item: &str) -> &str {
    item.trim_matches(|c| c == '"' || c == '\'' || c == '`')
}

fn strip_bullet(line: &str) -> &str {
    let line = line.trim();
    for marker in ["- ", "* ", "• "] {
        if let Some(rest) = line.strip_prefix(marker) {
            return rest.trim();
        }
    }

    // Numbered items: "1. Revenue" or "2) Expenses"
    let digits = line.bytes().take_while(u8::is_ascii_digit).count();
    if digits > 0 {
        let rest = &line[digits..];
        if let Some(rest) = rest.strip_prefix(". ").or_else(|| rest.strip_prefix(") ")) {
            return rest.trim();
        }
    }
    line
}
