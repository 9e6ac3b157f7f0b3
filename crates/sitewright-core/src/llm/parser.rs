//! Splits model output into files on `=== filename ===` marker lines

use std::collections::BTreeMap;

/// File name from a marker line, if `line` is one
fn marker_name(line: &str) -> Option<&str> {
    let inner = line.trim().strip_prefix("===")?.strip_suffix("===")?.trim();
    if inner.is_empty() || inner.contains(char::is_whitespace) || inner.contains('=') {
        return None;
    }
    Some(inner)
}

/// Trim a body and strip one surrounding code fence
fn clean_body(lines: &[&str]) -> String {
    let body = lines.join("\n");
    let mut body = body.trim();

    if body.starts_with("```") {
        body = match body.find('\n') {
            Some(newline) => &body[newline + 1..],
            None => "",
        };
    }
    if let Some(stripped) = body.trim_end().strip_suffix("```") {
        if stripped.is_empty() || stripped.ends_with('\n') {
            body = stripped;
        }
    }

    body.trim().to_string()
}

/// Parse model output into a map of file name to content.
///
/// Text before the first marker is ignored, empty bodies are dropped and a
/// repeated marker replaces the earlier body.
pub fn parse_files(content: &str) -> BTreeMap<String, String> {
    let mut files = BTreeMap::new();
    let mut current: Option<(&str, Vec<&str>)> = None;

    for line in content.lines() {
        if let Some(name) = marker_name(line) {
            if let Some((prev, body)) = current.take() {
                insert_body(&mut files, prev, &body);
            }
            current = Some((name, Vec::new()));
        } else if let Some((_, body)) = current.as_mut() {
            body.push(line);
        }
    }
    if let Some((prev, body)) = current {
        insert_body(&mut files, prev, &body);
    }

    files
}

fn insert_body(files: &mut BTreeMap<String, String>, name: &str, body: &[&str]) {
    let cleaned = clean_body(body);
    if cleaned.is_empty() {
        return;
    }
    files.insert(name.to_string(), cleaned);
}
