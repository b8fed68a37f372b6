//! Line-record model for song.ini style files.
//!
//! Every physical line is kept with its original text (terminator included)
//! and tagged with what it looks like. Rewrites only ever insert or drop whole
//! records, so untouched lines render back byte-for-byte.

const BOM: char = '\u{feff}';

// ============================================================================
// Line Records
// ============================================================================

/// Classification of a single line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LineKind {
    Blank,
    Comment,
    /// `[name]` header. Only names made of ASCII alphanumerics and `_` count.
    Section(String),
    /// `key = value`, both sides trimmed.
    KeyValue { key: String, value: String },
    Other,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Line {
    pub raw: String,
    pub kind: LineKind,
}

impl Line {
    pub fn parse(raw: &str) -> Self {
        Self {
            raw: raw.to_string(),
            kind: classify(raw),
        }
    }

    /// Line content without terminator, BOM or surrounding whitespace.
    pub fn trimmed(&self) -> &str {
        self.raw.trim_start_matches(BOM).trim()
    }

    pub fn has_terminator(&self) -> bool {
        self.raw.ends_with('\n')
    }

    pub fn section_name(&self) -> Option<&str> {
        match &self.kind {
            LineKind::Section(name) => Some(name),
            _ => None,
        }
    }
}

fn is_section_name(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn classify(raw: &str) -> LineKind {
    let text = raw.trim_start_matches(BOM).trim();
    if text.is_empty() {
        return LineKind::Blank;
    }
    if text.starts_with(';') || text.starts_with('#') {
        return LineKind::Comment;
    }
    if let Some(inner) = text.strip_prefix('[').and_then(|t| t.strip_suffix(']')) {
        if is_section_name(inner) {
            return LineKind::Section(inner.to_string());
        }
        return LineKind::Other;
    }
    match text.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => LineKind::KeyValue {
            key: key.trim().to_string(),
            value: value.trim().to_string(),
        },
        _ => LineKind::Other,
    }
}

// ============================================================================
// Document
// ============================================================================

/// An ordered list of line records.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct IniDocument {
    pub lines: Vec<Line>,
}

impl IniDocument {
    pub fn parse(text: &str) -> Self {
        Self {
            lines: text.split_inclusive('\n').map(Line::parse).collect(),
        }
    }

    pub fn render(&self) -> String {
        self.lines.iter().map(|l| l.raw.as_str()).collect()
    }

    /// Terminator used by the document: CRLF if its first terminated line
    /// uses one, LF otherwise.
    pub fn line_ending(&self) -> &'static str {
        match self.lines.iter().find(|l| l.has_terminator()) {
            Some(line) if line.raw.ends_with("\r\n") => "\r\n",
            _ => "\n",
        }
    }

    /// Yields each line paired with the lowercased name of the section it
    /// sits in. Headers belong to the section they open.
    pub fn iter_sections(&self) -> impl Iterator<Item = (Option<String>, &Line)> {
        let mut current: Option<String> = None;
        self.lines.iter().map(move |line| {
            if let Some(name) = line.section_name() {
                current = Some(name.to_ascii_lowercase());
            }
            (current.clone(), line)
        })
    }

    pub fn has_section(&self, section: &str) -> bool {
        self.lines
            .iter()
            .filter_map(Line::section_name)
            .any(|name| name.eq_ignore_ascii_case(section))
    }

    /// Case-insensitive lookup. Repeated sections are merged, later values win.
    pub fn get(&self, section: &str, key: &str) -> Option<&str> {
        let section = section.to_ascii_lowercase();
        let mut found = None;
        for (current, line) in self.iter_sections() {
            if current.as_deref() != Some(section.as_str()) {
                continue;
            }
            if let LineKind::KeyValue { key: k, value } = &line.kind {
                if k.eq_ignore_ascii_case(key) {
                    found = Some(value.as_str());
                }
            }
        }
        found
    }

    /// Replaces every occurrence of `key` in `section`, or appends it to the
    /// last matching section. A missing section is created at the end.
    pub fn set(&mut self, section: &str, key: &str, value: &str) {
        let eol = self.line_ending();
        let wanted = section.to_ascii_lowercase();
        let mut replaced = false;
        let mut section_end = None;
        let mut current: Option<String> = None;

        for (idx, line) in self.lines.iter_mut().enumerate() {
            if let Some(name) = line.section_name() {
                current = Some(name.to_ascii_lowercase());
            }
            if current.as_deref() != Some(wanted.as_str()) {
                continue;
            }
            let same_key = matches!(
                &line.kind,
                LineKind::KeyValue { key: k, .. } if k.eq_ignore_ascii_case(key)
            );
            if same_key {
                let terminator = if line.has_terminator() { eol } else { "" };
                *line = Line::parse(&format!("{key} = {value}{terminator}"));
                replaced = true;
            } else if line.kind != LineKind::Blank {
                section_end = Some(idx + 1);
            }
        }

        if replaced {
            return;
        }

        let at = match section_end {
            Some(at) => at,
            None => {
                self.terminate_last_line();
                if !self.lines.is_empty() {
                    self.lines.push(Line::parse(eol));
                }
                self.lines.push(Line::parse(&format!("[{section}]{eol}")));
                self.lines.len()
            }
        };
        if at > 0 {
            self.terminate_line(at - 1);
        }
        self.lines
            .insert(at, Line::parse(&format!("{key} = {value}{eol}")));
    }

    /// Inserts a new line after `idx`, making sure the line at `idx` ends with
    /// a terminator first.
    pub fn insert_after(&mut self, idx: usize, text: &str) {
        let eol = self.line_ending();
        self.terminate_line(idx);
        self.lines
            .insert(idx + 1, Line::parse(&format!("{text}{eol}")));
    }

    pub fn terminate_last_line(&mut self) {
        if let Some(last) = self.lines.len().checked_sub(1) {
            self.terminate_line(last);
        }
    }

    fn terminate_line(&mut self, idx: usize) {
        let eol = self.line_ending();
        if let Some(line) = self.lines.get_mut(idx) {
            if !line.has_terminator() {
                line.raw.push_str(eol);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_lines() {
        assert_eq!(classify("\n"), LineKind::Blank);
        assert_eq!(classify("; comment\n"), LineKind::Comment);
        assert_eq!(classify("# comment"), LineKind::Comment);
        assert_eq!(classify("[Song]\r\n"), LineKind::Section("Song".to_string()));
        assert_eq!(classify("[Song Name]"), LineKind::Other);
        assert_eq!(
            classify("  Gap = 150 \n"),
            LineKind::KeyValue {
                key: "Gap".to_string(),
                value: "150".to_string()
            }
        );
        assert_eq!(classify("just text"), LineKind::Other);
        assert_eq!(classify("= orphan"), LineKind::Other);
    }

    #[test]
    fn test_bom_ignored_for_classification() {
        let doc = IniDocument::parse("\u{feff}[song]\nname = X\n");
        assert!(doc.has_section("Song"));
        assert_eq!(doc.get("song", "NAME"), Some("X"));
        assert!(doc.render().starts_with('\u{feff}'));
    }

    #[test]
    fn test_render_is_byte_identical() {
        let inputs = [
            "",
            "no newline at end",
            "[Song]\r\nname = A\r\n\r\n; c\r\n",
            "\n\n[a]\nweird line\n  key=  spaced value  \n[b]\nx=1",
        ];
        for input in inputs {
            assert_eq!(IniDocument::parse(input).render(), input);
        }
    }

    #[test]
    fn test_get_case_insensitive_last_wins() {
        let doc = IniDocument::parse("[SONG]\nArtist = One\n[other]\nartist = No\n[song]\nartist = Two\n");
        assert_eq!(doc.get("song", "artist"), Some("Two"));
        assert_eq!(doc.get("song", "name"), None);
        assert_eq!(doc.get("missing", "artist"), None);
    }

    #[test]
    fn test_set_replaces_in_place() {
        let mut doc = IniDocument::parse("; settings\n[video]\nmax_width = 1280\nmax_bitrate = 2M\n");
        doc.set("video", "max_width", "800");
        assert_eq!(
            doc.render(),
            "; settings\n[video]\nmax_width = 800\nmax_bitrate = 2M\n"
        );
    }

    #[test]
    fn test_set_appends_to_existing_section() {
        let mut doc = IniDocument::parse("[video]\nmax_width = 1280\n\n[extra]\nfoo = bar\n");
        doc.set("video", "max_bitrate", "2M");
        assert_eq!(
            doc.render(),
            "[video]\nmax_width = 1280\nmax_bitrate = 2M\n\n[extra]\nfoo = bar\n"
        );
    }

    #[test]
    fn test_set_creates_missing_section() {
        let mut doc = IniDocument::default();
        doc.set("video", "max_width", "1280");
        assert_eq!(doc.render(), "[video]\nmax_width = 1280\n");

        let mut doc = IniDocument::parse("[other]\na = 1");
        doc.set("video", "max_width", "1280");
        assert_eq!(doc.render(), "[other]\na = 1\n\n[video]\nmax_width = 1280\n");
    }

    #[test]
    fn test_line_ending_detection() {
        assert_eq!(IniDocument::parse("a\r\nb\n").line_ending(), "\r\n");
        assert_eq!(IniDocument::parse("a\nb\r\n").line_ending(), "\n");
        assert_eq!(IniDocument::parse("a").line_ending(), "\n");
    }

    #[test]
    fn test_insert_after_terminates_previous_line() {
        let mut doc = IniDocument::parse("[Song]");
        doc.insert_after(0, "video = video.webm");
        assert_eq!(doc.render(), "[Song]\nvideo = video.webm\n");
    }
}
