//! Grounded prompt builder and completion post-processing.

use std::sync::LazyLock;

use regex::Regex;

use crate::api_types::ContextChunk;

static THINK_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<think>.*?</think>\s*").expect("literal regex is valid")
});

/// Builds the single user message sent to the model.
///
/// Contexts are numbered `[1]..[n]` in ranking order. The context block is cut
/// at `max_context_chars`; a chunk that does not fit is truncated and later
/// chunks are dropped.
///
/// # Example
/// ```
/// use contextor::prompt::build_prompt;
/// let p = build_prompt("How do refunds work?", &[], 1000);
/// assert!(p.contains("Question: How do refunds work?"));
/// ```
pub fn build_prompt(query: &str, contexts: &[ContextChunk], max_context_chars: usize) -> String {
    let mut ctx = String::new();
    let mut budget = max_context_chars;

    for (i, c) in contexts.iter().enumerate() {
        let sep = if i == 0 { "" } else { "\n\n" };
        let entry = format!("{sep}[{}] {}", i + 1, c.text.trim());
        let len = entry.chars().count();
        if len <= budget {
            ctx.push_str(&entry);
            budget -= len;
        } else {
            ctx.extend(entry.chars().take(budget));
            break;
        }
    }

    format!(
        "You are a helpful assistant. Answer ONLY using the context. \
If the answer is not in the context, say you don't know.\n\n\
Question: {query}\n\n\
Context:\n{ctx}\n\n\
Requirements:\n\
- Be concise.\n\
- Cite sources like [1], [2] that correspond to the context indices above.",
        query = query.trim(),
    )
}

/// Removes `<think>…</think>` reasoning blocks and trims the result.
pub fn strip_think(text: &str) -> String {
    THINK_BLOCK.replace_all(text, "").trim().to_string()
}
