//! Framed text report used for the verbose start-up dump.
//!
//! Reports are assembled line by line, rendered to plain text, and emitted
//! through `tracing` one line per event so they survive any subscriber
//! format.

use tracing::info;

/// Width reserved for keys in key/value rows.
const KEY_WIDTH: usize = 25;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Line {
    Title(String),
    Rule,
    Row(String, String),
}

/// A boxed, fixed-width diagnostic report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerboseReport {
    min_width: usize,
    lines: Vec<Line>,
}

impl VerboseReport {
    /// Start an empty report at least `min_width` characters wide.
    pub const fn new(min_width: usize) -> Self {
        Self {
            min_width,
            lines: Vec::new(),
        }
    }

    /// Add a centred title line.
    #[must_use]
    pub fn title(mut self, text: impl Into<String>) -> Self {
        self.lines.push(Line::Title(text.into()));
        self
    }

    /// Add a horizontal rule.
    #[must_use]
    pub fn rule(mut self) -> Self {
        self.lines.push(Line::Rule);
        self
    }

    /// Add a `key : value` row with the key right-aligned.
    #[must_use]
    pub fn row(mut self, key: impl Into<String>, value: impl core::fmt::Display) -> Self {
        self.lines.push(Line::Row(key.into(), value.to_string()));
        self
    }

    /// Render the report body lines, framed but without trailing newlines.
    pub fn render_lines(&self) -> Vec<String> {
        let bodies: Vec<Option<String>> = self
            .lines
            .iter()
            .map(|line| match line {
                Line::Title(text) => Some(text.clone()),
                Line::Rule => None,
                Line::Row(key, value) => Some(format!("{key:>KEY_WIDTH$} : {value}")),
            })
            .collect();

        let width = bodies
            .iter()
            .flatten()
            .map(String::len)
            .fold(self.min_width, usize::max);
        let border = format!("/*{}*/", "*".repeat(width.saturating_add(2)));
        let rule = format!("/*{}*/", "-".repeat(width.saturating_add(2)));

        let mut rendered = Vec::with_capacity(bodies.len().saturating_add(2));
        rendered.push(border.clone());
        for (line, body) in self.lines.iter().zip(bodies) {
            match (line, body) {
                (Line::Title(_), Some(text)) => rendered.push(format!("/* {text:^width$} */")),
                (_, Some(text)) => rendered.push(format!("/* {text:<width$} */")),
                (_, None) => rendered.push(rule.clone()),
            }
        }
        rendered.push(border);
        rendered
    }

    /// Render the whole report as one newline-separated string.
    pub fn render(&self) -> String {
        self.render_lines().join("\n")
    }

    /// Emit every rendered line as an `info` event.
    pub fn emit(&self) {
        for line in self.render_lines() {
            info!(target: "loom::report", "{line}");
        }
    }
}
