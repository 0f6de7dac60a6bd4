//! Recovering structured verdicts from model output.
//!
//! Parsing runs in two stages: a direct parse, then a repair pass that
//! strips markdown code fences, drops any prose around the JSON and closes
//! whatever brackets and strings a truncated response left open. Neither
//! stage panics; failure is a `ParseFailure` carrying a snippet of the raw
//! text.

use serde_json::{Map, Value};

use crate::domain::models::{AuditVerdict, Priority, Recommendation, StandardCheck};
use crate::error::{AppError, Result};

/// Parses `raw` as JSON, repairing fences and truncation if needed.
pub fn parse_json(raw: &str) -> Result<Value> {
    if let Ok(value) = serde_json::from_str::<Value>(raw.trim()) {
        return Ok(value);
    }

    let unfenced = strip_code_fences(raw);
    let body = match unfenced.find(['{', '[']) {
        Some(start) => &unfenced[start..],
        None => return Err(AppError::parse("no JSON object or array found", raw)),
    };

    // Only the first value counts; anything after it is prose.
    match serde_json::Deserializer::from_str(body).into_iter::<Value>().next() {
        Some(Ok(value)) => return Ok(value),
        Some(Err(e)) if !e.is_eof() => {
            return Err(AppError::parse(format!("invalid JSON: {}", e), raw));
        }
        _ => {}
    }
    let balanced = balance_brackets(body);
    serde_json::from_str::<Value>(&balanced).map_err(|e| {
        log::debug!("[LLM] Repair failed: {}", e);
        AppError::parse(format!("unrecoverable JSON: {}", e), raw)
    })
}

/// Removes a leading ```` ``` ```` / ```` ```json ```` line and a trailing
/// fence, if present.
pub fn strip_code_fences(raw: &str) -> &str {
    let mut text = raw.trim();
    if let Some(rest) = text.strip_prefix("```") {
        text = match rest.find('\n') {
            Some(newline) => &rest[newline + 1..],
            None => rest.trim_start_matches(|c: char| c.is_ascii_alphabetic()),
        };
    }
    if let Some(rest) = text.trim_end().strip_suffix("```") {
        text = rest;
    }
    text.trim()
}

/// Closes an unterminated string, drops a dangling comma or key, and
/// appends a closer for every unmatched `{` / `[` in nesting order.
pub fn balance_brackets(text: &str) -> String {
    let mut stack = Vec::new();
    let mut in_string = false;
    let mut escaped = false;

    for c in text.chars() {
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
            '{' => stack.push('}'),
            '[' => stack.push(']'),
            '}' | ']' => {
                if stack.last() == Some(&c) {
                    stack.pop();
                }
            }
            _ => {}
        }
    }

    let mut repaired = text.trim_end().to_string();
    if in_string {
        if escaped {
            repaired.pop();
        }
        repaired.push('"');
    }

    loop {
        let trimmed = repaired.trim_end();
        if let Some(stripped) = trimmed.strip_suffix(',') {
            repaired = stripped.to_string();
        } else if trimmed.ends_with(':') {
            repaired = format!("{} null", trimmed);
            break;
        } else {
            let len = trimmed.len();
            repaired.truncate(len);
            break;
        }
    }

    repaired.extend(stack.iter().rev());
    repaired
}

/// Parses model output into the shared verdict shape.
///
/// Field handling is lenient: `score` may be a number or numeric string and
/// is clamped to 0-100; list items may be plain strings or objects; absent
/// fields take empty values.
pub fn parse_verdict(raw: &str) -> Result<AuditVerdict> {
    let value = parse_json(raw)?;
    let Value::Object(object) = value else {
        return Err(AppError::parse("expected a JSON object", raw));
    };

    Ok(AuditVerdict {
        score: score_of(object.get("score")),
        summary: text_of(object.get("summary")),
        strengths: list_of(&object, "strengths")
            .iter()
            .map(|item| match item {
                Value::Object(map) => first_text(map, &["title", "text", "description"]),
                other => text_of(Some(other)),
            })
            .filter(|s| !s.is_empty())
            .collect(),
        recommendations: list_of(&object, "recommendations")
            .iter()
            .filter_map(recommendation_of)
            .collect(),
        standards: list_of(&object, "standards")
            .iter()
            .filter_map(standard_of)
            .collect(),
    })
}

fn score_of(value: Option<&Value>) -> u8 {
    let score = match value {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.trim().trim_end_matches('%').parse::<f64>().unwrap_or(0.0),
        _ => 0.0,
    };
    if score.is_finite() {
        score.round().clamp(0.0, 100.0) as u8
    } else {
        0
    }
}

fn text_of(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

fn first_text(map: &Map<String, Value>, keys: &[&str]) -> String {
    keys.iter()
        .map(|k| text_of(map.get(*k)))
        .find(|s| !s.is_empty())
        .unwrap_or_default()
}

fn list_of<'a>(object: &'a Map<String, Value>, key: &str) -> &'a [Value] {
    object
        .get(key)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

fn priority_of(value: Option<&Value>) -> Priority {
    match text_of(value).to_ascii_lowercase().as_str() {
        "high" | "critical" => Priority::High,
        "low" => Priority::Low,
        _ => Priority::Medium,
    }
}

fn recommendation_of(item: &Value) -> Option<Recommendation> {
    let recommendation = match item {
        Value::String(s) if !s.trim().is_empty() => Recommendation {
            priority: Priority::Medium,
            title: s.trim().to_string(),
            description: String::new(),
        },
        Value::Object(map) => Recommendation {
            priority: priority_of(map.get("priority")),
            title: first_text(map, &["title", "issue", "recommendation"]),
            description: first_text(map, &["description", "details", "action"]),
        },
        _ => return None,
    };
    (!recommendation.title.is_empty() || !recommendation.description.is_empty()).then_some(recommendation)
}

fn standard_of(item: &Value) -> Option<StandardCheck> {
    match item {
        Value::String(s) if !s.trim().is_empty() => Some(StandardCheck {
            name: s.trim().to_string(),
            ..Default::default()
        }),
        Value::Object(map) => {
            let check = StandardCheck {
                name: first_text(map, &["name", "standard", "criterion"]),
                status: first_text(map, &["status", "result"]),
                notes: first_text(map, &["notes", "details"]),
            };
            (!check.name.is_empty()).then_some(check)
        }
        _ => None,
    }
}
