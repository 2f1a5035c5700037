//! JSON extraction and repair for LLM response text.
//!
//! LLM responses arrive three predictable ways broken: wrapped in prose and
//! markdown code fences, carrying trailing commas, or truncated mid-array
//! at the output-token cap. The extractor recovers all three in a fixed
//! order, strict-first:
//!
//! 1. Strip code fences, locate the first `{`.
//! 2. Slice the balanced object (brace depth, string/escape aware).
//! 3. Strict parse.
//! 4. Trailing-comma repair, reparse.
//! 5. Truncation repair: back up to the last complete element when the text
//!    ends inside a string, re-balance unclosed `{`/`[` in reverse stack
//!    order, reparse.
//! 6. Structural error carrying the parser's reason.
//!
//! Anything recovered parses strictly; the repairs never touch text inside
//! string literals except to discard a truncated trailing element.

use serde_json::Value;

pub use oemsched_utils::error::ExtractError;

/// Extract a JSON object from raw LLM response text.
///
/// # Errors
///
/// `ExtractError::NoObject` when the text contains no `{` at all;
/// `ExtractError::Unrepairable` when strict parsing still fails after the
/// trailing-comma and truncation repairs.
pub fn extract_json(raw: &str) -> Result<Value, ExtractError> {
    let cleaned = strip_code_fences(raw);
    let Some(start) = cleaned.find('{') else {
        return Err(ExtractError::NoObject);
    };
    let tail = &cleaned[start..];
    // An unbalanced scan means the response was cut off; hand the whole
    // tail to the repair chain.
    let candidate = slice_balanced(tail).unwrap_or(tail);

    if let Ok(value) = serde_json::from_str::<Value>(candidate) {
        return Ok(value);
    }

    let comma_repaired = strip_trailing_commas(candidate);
    if let Ok(value) = serde_json::from_str::<Value>(&comma_repaired) {
        return Ok(value);
    }

    let rebuilt = repair_truncation(candidate)?;
    serde_json::from_str::<Value>(&rebuilt).map_err(|e| ExtractError::Unrepairable(e.to_string()))
}

/// Remove markdown code fences (```json and bare ```).
fn strip_code_fences(text: &str) -> String {
    text.replace("```json", "").replace("```", "")
}

/// Slice the first balanced JSON object from text starting at a `{`.
///
/// Tracks brace depth only; `[`/`]` nest inside braces and cannot return
/// the outer object to depth zero on their own. String literals and their
/// escapes are skipped. Returns `None` when depth never returns to zero.
fn slice_balanced(text: &str) -> Option<&str> {
    let mut depth: usize = 0;
    let mut in_string = false;
    let mut escaped = false;
    for (idx, ch) in text.char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(&text[..idx + 1]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Remove commas immediately preceding `}` or `]`, outside string literals.
fn strip_trailing_commas(json: &str) -> String {
    let mut out = String::with_capacity(json.len());
    let mut in_string = false;
    let mut escaped = false;
    for ch in json.chars() {
        if in_string {
            out.push(ch);
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }
        match ch {
            '"' => {
                in_string = true;
                out.push(ch);
            }
            '}' | ']' => {
                let trimmed = out.trim_end().len();
                if out[..trimmed].ends_with(',') {
                    out.truncate(trimmed - 1);
                }
                out.push(ch);
            }
            _ => out.push(ch),
        }
    }
    out
}

/// Whether the text ends inside an unterminated string literal.
fn ends_inside_string(json: &str) -> bool {
    let mut in_string = false;
    let mut escaped = false;
    for ch in json.chars() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
        } else if ch == '"' {
            in_string = true;
        }
    }
    in_string
}

/// Repair a response cut off at the token cap.
///
/// When the cut landed inside a string, the current element is a loss:
/// truncate back to the last `},` (the end of the previous complete
/// element), falling back to the last `}`. Then recount unclosed `{`/`[`
/// outside strings and append the matching closers in reverse stack order.
fn repair_truncation(json: &str) -> Result<String, ExtractError> {
    let mut body = json;
    if ends_inside_string(json) {
        if let Some(pos) = json.rfind("},") {
            body = &json[..=pos];
        } else if let Some(pos) = json.rfind('}') {
            body = &json[..=pos];
        } else {
            return Err(ExtractError::Unrepairable(
                "truncated inside the first string literal".to_string(),
            ));
        }
    }

    let mut stack: Vec<char> = Vec::new();
    let mut in_string = false;
    let mut escaped = false;
    for ch in body.chars() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' | '[' => stack.push(ch),
            '}' => {
                if stack.last() == Some(&'{') {
                    stack.pop();
                }
            }
            ']' => {
                if stack.last() == Some(&'[') {
                    stack.pop();
                }
            }
            _ => {}
        }
    }

    let mut rebuilt = body.trim_end().to_string();
    if rebuilt.ends_with(',') {
        rebuilt.pop();
    }
    for opener in stack.iter().rev() {
        rebuilt.push(if *opener == '{' { '}' } else { ']' });
    }
    Ok(strip_trailing_commas(&rebuilt))
}
