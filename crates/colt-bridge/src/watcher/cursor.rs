//! Remembers what the suffix policy has already forwarded.

/// Last processed log content, or nothing when the session is fresh.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct LogCursor {
    seen: Option<String>,
}

impl LogCursor {
    /// Returns the part of `content` not seen before and remembers `content`.
    ///
    /// Content that no longer starts with what was seen (a rewritten or
    /// truncated log) is returned whole.
    pub(crate) fn advance(&mut self, content: &str) -> String {
        let fresh = self
            .seen
            .as_deref()
            .and_then(|seen| content.strip_prefix(seen))
            .unwrap_or(content)
            .to_owned();
        self.seen = Some(content.to_owned());
        fresh
    }

    pub(crate) fn reset(&mut self) {
        self.seen = None;
    }
}
