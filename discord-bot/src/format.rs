//! Rendering of answers, sources and errors into Discord messages.

use crate::backend_client::SourceRef;

/// Discord's hard limit for message content.
pub const DISCORD_MESSAGE_LIMIT: usize = 2000;

/// Contexts listed in the footer of an answer.
pub const MAX_FOOTER_SOURCES: usize = 3;

pub const NO_HISTORY: &str =
    "You haven't asked me anything yet. Use `/ask` first, then `/followup`.";

/// Last path segment of a source, `/` or `\` separated.
pub fn file_name(source: &str) -> &str {
    source
        .rsplit(['/', '\\'])
        .next()
        .filter(|s| !s.is_empty())
        .unwrap_or(source)
}

fn source_line(i: usize, s: &SourceRef) -> String {
    let name = if s.source.is_empty() {
        s.title.as_str()
    } else {
        file_name(&s.source)
    };
    format!("{}. {name} (score {:.2})", i + 1, s.score)
}

/// Answer followed by a "Sources" footer of up to three contexts.
pub fn format_answer(answer: &str, contexts: &[SourceRef]) -> String {
    let mut footer = String::new();
    if !contexts.is_empty() {
        footer.push_str("\n\n**Sources**");
        for (i, c) in contexts.iter().take(MAX_FOOTER_SOURCES).enumerate() {
            footer.push('\n');
            footer.push_str(&source_line(i, c));
        }
    }
    // Only the answer is cut; the footer always survives.
    let budget = DISCORD_MESSAGE_LIMIT.saturating_sub(footer.chars().count());
    let mut out = truncate_message(answer.trim(), budget);
    out.push_str(&footer);
    out
}

/// Debug listing for `/sources`, with a short preview of each chunk.
pub fn format_sources(query: &str, contexts: &[SourceRef]) -> String {
    if contexts.is_empty() {
        return format!("No matching documents for “{}”.", query.trim());
    }
    let mut out = format!("**Top {} results for** “{}”", contexts.len(), query.trim());
    for (i, c) in contexts.iter().enumerate() {
        out.push('\n');
        out.push_str(&source_line(i, c));
        if let Some(text) = c.text.as_deref() {
            let preview = truncate_message(text.trim(), 160).replace('\n', " ");
            out.push_str(&format!("\n> {preview}"));
        }
    }
    truncate_message(&out, DISCORD_MESSAGE_LIMIT)
}

/// Cuts at `limit` characters, ending with `…` when something was dropped.
pub fn truncate_message(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        return text.to_string();
    }
    let keep = limit.saturating_sub(1);
    let mut out: String = text.chars().take(keep).collect();
    out.push('…');
    out
}
