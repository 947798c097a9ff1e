use std::fmt;

/// Prefix carried by every SSE data line.
pub const DATA_PREFIX: &str = "data: ";
/// Payload of the line that terminates a stream.
pub const DONE_SENTINEL: &str = "[DONE]";

/// Interpretation mode for JSON payload lines, set by marker lines.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Category {
    /// Progress/status messages.
    Status,
    /// Web search results attached to the answer.
    SearchResult,
    /// Model reasoning trace.
    Reasoning,
    /// Answer text.
    Text,
    /// No marker seen yet.
    #[default]
    Unset,
}

impl Category {
    /// Maps a marker literal to its category.
    pub fn from_marker(marker: &str) -> Option<Self> {
        match marker {
            "status" => Some(Self::Status),
            "search_with_text" => Some(Self::SearchResult),
            "reasoner" => Some(Self::Reasoning),
            "text" => Some(Self::Text),
            _ => None,
        }
    }

    /// Marker literal for this category; also used as the chunk content tag.
    pub fn marker(self) -> &'static str {
        match self {
            Self::Status => "status",
            Self::SearchResult => "search_with_text",
            Self::Reasoning => "reasoner",
            Self::Text => "text",
            Self::Unset => "",
        }
    }

    /// Prefixes `body` with the bracketed category tag (`[text]...`).
    pub fn tag(self, body: &str) -> String {
        let marker = self.marker();
        let mut out = String::with_capacity(marker.len() + body.len() + 2);
        out.push('[');
        out.push_str(marker);
        out.push(']');
        out.push_str(body);
        out
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unset => f.write_str("unset"),
            other => f.write_str(other.marker()),
        }
    }
}

/// Classification of one upstream line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LineKind<'a> {
    /// Sets the current category.
    CategoryMarker(Category),
    /// JSON object text, interpreted with the current category.
    JsonPayload(&'a str),
    /// End of stream.
    TerminalSentinel,
    /// Blank lines, non-data lines and unknown markers.
    Ignorable,
}

/// Classifies a raw SSE line. Pure; unknown content is `Ignorable`.
pub fn classify(line: &str) -> LineKind<'_> {
    let Some(data) = line.strip_prefix(DATA_PREFIX) else {
        return LineKind::Ignorable;
    };
    if data == DONE_SENTINEL {
        return LineKind::TerminalSentinel;
    }
    if let Some(category) = Category::from_marker(data) {
        return LineKind::CategoryMarker(category);
    }
    if data.starts_with('{') {
        return LineKind::JsonPayload(data);
    }
    LineKind::Ignorable
}
