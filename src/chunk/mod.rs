//! Fixed-width text chunking
//!
//! Splits normalized source text into contiguous, non-overlapping windows of
//! at most `max_chars` characters. There is no sentence or paragraph
//! awareness: the cost is linear in the input and needs no lookahead, and
//! identical input always yields identical chunks.

/// Characters kept in chunk previews written to the event log
pub const PREVIEW_CHARS: usize = 160;

/// Replace carriage returns and line feeds with single spaces
pub fn normalize_line_breaks(text: &str) -> String {
    text.chars()
        .map(|c| if c == '\r' || c == '\n' { ' ' } else { c })
        .collect()
}

/// Split `text` into trimmed, non-empty windows of at most `max_chars` characters.
///
/// Windows are cut on character (not byte) boundaries. A window that is
/// blank after trimming is dropped, so a whitespace-only tail never produces
/// a chunk. `max_chars == 0` yields no chunks.
pub fn chunk_text(text: &str, max_chars: usize) -> Vec<String> {
    if max_chars == 0 || text.is_empty() {
        return Vec::new();
    }

    let normalized = normalize_line_breaks(text);
    let mut chunks = Vec::new();
    let mut window_start = 0;
    let mut window_chars = 0;

    for (byte_idx, _) in normalized.char_indices() {
        if window_chars == max_chars {
            push_window(&mut chunks, &normalized[window_start..byte_idx]);
            window_start = byte_idx;
            window_chars = 0;
        }
        window_chars += 1;
    }
    push_window(&mut chunks, &normalized[window_start..]);

    chunks
}

fn push_window(chunks: &mut Vec<String>, window: &str) {
    let trimmed = window.trim();
    if !trimmed.is_empty() {
        chunks.push(trimmed.to_string());
    }
}

/// First `PREVIEW_CHARS` characters of a chunk
pub fn preview(text: &str) -> String {
    text.chars().take(PREVIEW_CHARS).collect()
}
