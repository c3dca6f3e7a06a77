//! Contextual snippet extraction around a matched term.
//!
//! Grounded on the teacher's `SearchIndex::extract_snippet` (char-indexed
//! sliding window, ellipsis-prefixed/suffixed truncation, Unicode-safe via
//! `Vec<char>` indexing), generalized to start from a known byte offset
//! (the BM25 indexer already located the match) instead of re-searching
//! the content, and to trim to a word boundary rather than a raw character
//! cut, per spec §4.4.

/// Build a preview window of up to `max_chars` centered on the match at
/// `byte_offset` within `content`, trimmed to word boundaries and
/// ellipsis-prefixed/suffixed when truncated. Whitespace runs (including
/// newlines) are collapsed to single spaces; control characters other
/// than space/newline are stripped, per the Hit invariant in spec §3.
#[must_use]
pub fn extract_preview(content: &str, byte_offset: usize, max_chars: usize) -> String {
    let (cleaned, orig_to_cleaned) = collapse_whitespace(content);
    let chars: Vec<char> = cleaned.chars().collect();
    if chars.is_empty() {
        return String::new();
    }

    // Map the original byte offset to an original char index, then through
    // `orig_to_cleaned` to the match's position in the *cleaned* text —
    // collapsing whitespace/control characters shifts positions, so the
    // match can't be found by counting characters in the original text.
    let orig_char_idx = content
        .char_indices()
        .take_while(|(b, _)| *b < byte_offset)
        .count();
    let match_char_pos = orig_to_cleaned
        .get(orig_char_idx)
        .copied()
        .unwrap_or_else(|| chars.len().saturating_sub(1))
        .min(chars.len().saturating_sub(1));

    if chars.len() <= max_chars {
        return chars.into_iter().collect();
    }

    let ctx_each_side = max_chars / 2;
    let mut start = match_char_pos.saturating_sub(ctx_each_side);
    let mut end = (match_char_pos + ctx_each_side).min(chars.len());
    if end.saturating_sub(start) > max_chars {
        end = (start + max_chars).min(chars.len());
    }

    // Trim to word boundaries: walk outward from the raw cut points to the
    // nearest whitespace so we don't split a word in half.
    while start > 0 && !chars[start].is_whitespace() && !chars[start - 1].is_whitespace() {
        start -= 1;
    }
    while end < chars.len() && !chars[end - 1].is_whitespace() && !chars[end].is_whitespace() {
        end += 1;
    }

    let left_truncated = start > 0;
    let right_truncated = end < chars.len();

    let mut snippet = String::with_capacity(max_chars + 8);
    if left_truncated {
        snippet.push_str("...");
    }
    snippet.extend(chars[start..end].iter().copied());
    if right_truncated {
        snippet.push_str("...");
    }
    snippet
}

/// Collapse runs of whitespace (including newlines) to single spaces and
/// strip control characters other than space/newline.
///
/// Returns the cleaned text alongside a per-original-char-index map of
/// where each original character landed in the cleaned, trimmed output —
/// callers that locate a match by byte offset in the original text need
/// this to find the same match in the cleaned text, since collapsing
/// removes characters and shifts everything after them.
fn collapse_whitespace(content: &str) -> (String, Vec<usize>) {
    let mut out: Vec<char> = Vec::with_capacity(content.len());
    let mut map: Vec<usize> = Vec::with_capacity(content.chars().count());
    let mut last_was_space = false;

    for ch in content.chars() {
        if ch == '\n' || ch.is_whitespace() {
            if !last_was_space {
                out.push(' ');
                last_was_space = true;
            }
            map.push(out.len().saturating_sub(1));
        } else if ch.is_control() {
            // Dropped: preview never contains control characters other
            // than single spaces or newlines (collapsed above). Maps to
            // the position immediately following it.
            map.push(out.len());
        } else {
            out.push(ch);
            last_was_space = false;
            map.push(out.len() - 1);
        }
    }

    let leading = out.iter().take_while(|c| c.is_whitespace()).count();
    let trailing = out.iter().rev().take_while(|c| c.is_whitespace()).count();
    let end = out.len().saturating_sub(trailing).max(leading);
    let trimmed: Vec<char> = out[leading..end].to_vec();
    let last_valid = trimmed.len().saturating_sub(1);

    let adjusted_map = map
        .into_iter()
        .map(|pos| pos.saturating_sub(leading).min(last_valid))
        .collect();

    (trimmed.into_iter().collect(), adjusted_map)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_content_is_returned_whole() {
        let preview = extract_preview("grace", 0, 280);
        assert_eq!(preview, "grace");
    }

    #[test]
    fn truncates_with_ellipsis_on_both_sides() {
        let content = "a ".repeat(200) + "grace" + &" b".repeat(200);
        let offset = content.find("grace").unwrap();
        let preview = extract_preview(&content, offset, 40);
        assert!(preview.starts_with("..."));
        assert!(preview.ends_with("..."));
        assert!(preview.contains("grace"));
        assert!(preview.chars().count() <= 46);
    }

    #[test]
    fn collapses_whitespace_runs() {
        let preview = extract_preview("grace   is\n\namazing", 0, 280);
        assert_eq!(preview, "grace is amazing");
    }

    #[test]
    fn strips_control_characters() {
        let preview = extract_preview("grace\u{0007}is\u{0001}here", 0, 280);
        assert!(!preview.chars().any(|c| c.is_control() && c != ' '));
    }

    #[test]
    fn never_exceeds_max_chars_plus_ellipsis() {
        let content = "word ".repeat(500);
        let preview = extract_preview(&content, 1000, 50);
        assert!(preview.chars().count() <= 56);
    }

    #[test]
    fn match_survives_heavy_whitespace_collapse_before_it() {
        // Many double-space/blank-line runs before the match: collapsing
        // removes far more characters than `max_chars / 2`, so locating the
        // match by counting original-text characters (rather than mapping
        // through the collapse) would land the centered window well past
        // the real hit.
        let padding = "word  word\n\n".repeat(60);
        let content = format!("{padding}grace is amazing");
        let offset = content.find("grace").unwrap();
        let preview = extract_preview(&content, offset, 40);
        assert!(preview.to_lowercase().contains("grace"), "preview was: {preview}");
    }
}
