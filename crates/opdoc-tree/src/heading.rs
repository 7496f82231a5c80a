/// Deepest section title marker (`======`, level 5).
pub const MAX_SECTION_MARKERS: usize = 6;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionTitle {
    pub markers: usize,
    pub title: String,
}

impl SectionTitle {
    /// Section level before any `leveloffset` is applied.
    pub fn level(&self) -> usize {
        self.markers - 1
    }
}

pub fn detect_section_title(line: &str) -> Option<SectionTitle> {
    let mut markers = 0usize;
    for ch in line.chars() {
        if ch == '=' {
            markers += 1;
        } else {
            break;
        }
    }

    if markers == 0 || markers > MAX_SECTION_MARKERS {
        return None;
    }

    let after_markers = &line[markers..];
    if !after_markers.starts_with(char::is_whitespace) {
        return None;
    }

    let mut content = after_markers.trim();
    let closing = "=".repeat(markers);
    if let Some(stripped) = content.strip_suffix(closing.as_str()) {
        if stripped.ends_with(char::is_whitespace) {
            content = stripped.trim_end();
        }
    }

    if content.is_empty() {
        return None;
    }

    Some(SectionTitle {
        markers,
        title: content.to_string(),
    })
}

/// Marker prefix for a section at `level`.
pub fn section_marker(level: usize) -> String {
    "=".repeat((level + 1).min(MAX_SECTION_MARKERS))
}
