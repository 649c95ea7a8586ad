/// A live "@query" span ending at the cursor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MentionTrigger {
    /// Word characters typed after the `@` (may be empty)
    pub query: String,
    /// Byte offset of the `@`
    pub start: usize,
}

impl MentionTrigger {
    /// Byte offset one past the end of the span, i.e. where the cursor sat
    pub fn end(&self) -> usize {
        self.start + 1 + self.query.len()
    }
}

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Clamp a byte offset into `text` down to the nearest char boundary
pub fn clamp_to_boundary(text: &str, offset: usize) -> usize {
    let mut offset = offset.min(text.len());
    while !text.is_char_boundary(offset) {
        offset -= 1;
    }
    offset
}

/// Find the `@word` run that ends exactly at `cursor`.
///
/// Only the text before the cursor is scanned. Earlier `@word` runs, or a run
/// the cursor has moved past, never match.
pub fn detect_trigger(text: &str, cursor: usize) -> Option<MentionTrigger> {
    let before = &text[..clamp_to_boundary(text, cursor)];
    let query_start = before
        .char_indices()
        .rev()
        .take_while(|(_, c)| is_word_char(*c))
        .last()
        .map_or(before.len(), |(i, _)| i);

    let at = query_start.checked_sub(1)?;
    if before.as_bytes()[at] != b'@' {
        return None;
    }

    Some(MentionTrigger {
        query: before[query_start..].to_string(),
        start: at,
    })
}
