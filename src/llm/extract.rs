//! Commit message extraction from model replies.
//!
//! Models wrap the message in markdown fences, quotes, bold markers or a
//! "Commit message:" label, and often add a sentence of commentary before or
//! after it. This module recovers the message itself.

use crate::commit::parse_header;

// Lowercased prefixes of lines that are talk about the message, not the message.
const COMMENTARY_PREFIXES: &[&str] = &[
    "here is",
    "here's",
    "sure",
    "certainly",
    "this commit message",
    "this message",
    "i hope",
    "let me know",
    "feel free",
    "note:",
    "explanation:",
    "alternatively",
    "alternative:",
    "or:",
    "or,",
    "another option",
];

const LABELS: &[&str] = &["commit message:", "commit:", "message:"];

/// Extract the commit message from a raw model reply.
///
/// Returns the first Conventional Commit header, normalized, plus the body
/// that follows it up to any commentary or a second header. Without such a
/// header the cleaned text is returned as-is.
/// Returns `None` when nothing is left.
pub fn extract_message(response: &str) -> Option<String> {
    let text = unwrap_fence(response.trim());
    let text = strip_matching_quotes(text.trim());

    let lines: Vec<String> = text.lines().map(clean_line).collect();

    let first = lines
        .iter()
        .enumerate()
        .find_map(|(i, l)| parse_header(l).map(|h| (i, h)));

    let message = match first {
        Some((start, header)) => {
            let header = header.to_string();
            let body = body_after(&text, start);
            if body.is_empty() {
                header
            } else {
                format!("{}\n\n{}", header, body)
            }
        }
        None => lines
            .iter()
            .filter(|l| !l.is_empty() && !is_commentary(l))
            .cloned()
            .collect::<Vec<_>>()
            .join("\n"),
    };

    let message = message.trim().to_string();
    if message.is_empty() {
        None
    } else {
        Some(message)
    }
}

/// Contents of the first fenced block, or the text with stray fence lines removed.
fn unwrap_fence(text: &str) -> String {
    if let Some(start) = text.find("```") {
        let after = &text[start + 3..];
        // Skip an info string such as ```text or ```git
        let after = match after.find('\n') {
            Some(nl) if !after[..nl].contains(' ') && !after[..nl].contains(':') => {
                &after[nl + 1..]
            }
            _ => after,
        };
        if let Some(end) = after.find("```") {
            return after[..end].trim().to_string();
        }
    }

    text.lines()
        .filter(|l| !l.trim_start().starts_with("```"))
        .collect::<Vec<_>>()
        .join("\n")
}

fn strip_matching_quotes(text: &str) -> String {
    for quote in ['"', '\'', '`'] {
        if text.len() >= 2 && text.starts_with(quote) && text.ends_with(quote) {
            return text[1..text.len() - 1].trim().to_string();
        }
    }
    text.to_string()
}

/// Strip bold markers, labels and surrounding quotes from one line.
fn clean_line(line: &str) -> String {
    let mut line = line.trim().replace("**", "");

    let lower = line.to_lowercase();
    if let Some(rest) = LABELS
        .iter()
        .find(|label| lower.starts_with(*label))
        .and_then(|label| line.get(label.len()..))
    {
        line = rest.trim().to_string();
    }

    line.trim_matches(|c: char| c == '"' || c == '`' || c == '\'')
        .trim()
        .to_string()
}

fn is_commentary(line: &str) -> bool {
    let lower = line.to_lowercase();
    COMMENTARY_PREFIXES.iter().any(|p| lower.starts_with(p)) || is_option_label(&lower)
}

// "Option 2:" and similar numbered alternatives
fn is_option_label(lower: &str) -> bool {
    lower
        .strip_prefix("option ")
        .and_then(|rest| rest.chars().next())
        .is_some_and(|c| c.is_ascii_digit())
}

/// Body lines after the header, up to trailing commentary or the next
/// candidate header.
fn body_after(text: &str, header_idx: usize) -> String {
    let mut body: Vec<String> = Vec::new();
    for raw in text.lines().skip(header_idx + 1) {
        let line = raw.trim_end().replace("**", "");
        if is_commentary(line.trim()) || parse_header(&clean_line(&line)).is_some() {
            break;
        }
        body.push(line);
    }

    body.join("\n").trim_matches(|c: char| c == '\n' || c == '"').trim().to_string()
}
