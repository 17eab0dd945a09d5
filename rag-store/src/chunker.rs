//! Sliding-window chunking over whitespace tokens.

use crate::config::ChunkConfig;

/// Splits `text` into windows of `max_tokens` whitespace-separated tokens,
/// each window starting `max_tokens - overlap_tokens` tokens after the previous.
///
/// Windows are re-joined with single spaces. Empty or blank text yields no chunks.
pub fn chunk_text(text: &str, cfg: ChunkConfig) -> Vec<String> {
    let toks: Vec<&str> = text.split_whitespace().collect();
    if toks.is_empty() || cfg.max_tokens == 0 {
        return Vec::new();
    }
    let step = cfg.max_tokens.saturating_sub(cfg.overlap_tokens).max(1);

    let mut out = Vec::with_capacity(toks.len() / step + 1);
    let mut i = 0;
    while i < toks.len() {
        let end = (i + cfg.max_tokens).min(toks.len());
        out.push(toks[i..end].join(" "));
        i += step;
    }
    out
}
