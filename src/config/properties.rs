//! `server.properties` reading and in-place rewriting.

use std::path::Path;

use tokio::fs;

/// Parses `key=value` pairs in file order. Comments and lines without `=`
/// are skipped.
pub fn parse(text: &str) -> Vec<(String, String)> {
    text.lines()
        .filter_map(|line| {
            let trimmed = line.trim_start();
            if trimmed.starts_with('#') {
                return None;
            }
            let (key, value) = line.split_once('=')?;
            let key = key.trim();
            if key.is_empty() {
                return None;
            }
            Some((key.to_string(), value.to_string()))
        })
        .collect()
}

/// Splits a line produced by `split_inclusive('\n')` into its content and
/// terminator.
fn split_ending(raw: &str) -> (&str, &str) {
    if let Some(line) = raw.strip_suffix("\r\n") {
        (line, "\r\n")
    } else if let Some(line) = raw.strip_suffix('\n') {
        (line, "\n")
    } else {
        (raw, "")
    }
}

/// Rewrites `text` with `updates` applied. Untouched lines are kept
/// verbatim and in order, existing keys are updated in place and unknown
/// keys are appended at the end. Line endings follow the file (CRLF if it
/// has any).
pub fn apply_updates(text: &str, updates: &[(String, String)]) -> String {
    let eol = if text.contains("\r\n") { "\r\n" } else { "\n" };
    let mut applied = vec![false; updates.len()];
    let mut out = String::with_capacity(text.len());

    for raw in text.split_inclusive('\n') {
        let (line, ending) = split_ending(raw);
        let replacement = if line.trim_start().starts_with('#') {
            None
        } else {
            line.split_once('=').and_then(|(key, _)| {
                let key = key.trim();
                updates.iter().position(|(k, _)| k == key)
            })
        };

        match replacement {
            Some(idx) => {
                let (key, value) = &updates[idx];
                applied[idx] = true;
                out.push_str(key);
                out.push('=');
                out.push_str(value);
            }
            None => out.push_str(line),
        }
        out.push_str(if ending.is_empty() { eol } else { ending });
    }

    for (idx, (key, value)) in updates.iter().enumerate() {
        if !applied[idx] {
            out.push_str(key);
            out.push('=');
            out.push_str(value);
            out.push_str(eol);
        }
    }

    out
}

pub async fn read(path: &Path) -> std::io::Result<Vec<(String, String)>> {
    match fs::read_to_string(path).await {
        Ok(text) => Ok(parse(&text)),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
        Err(err) => Err(err),
    }
}

pub async fn write(path: &Path, updates: &[(String, String)]) -> std::io::Result<()> {
    let current = match fs::read_to_string(path).await {
        Ok(text) => text,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(err) => return Err(err),
    };
    fs::write(path, apply_updates(&current, updates)).await
}
