//! Rendering diagnostics for people and for tools

use std::ops::Range;
use std::path::{Path, PathBuf};

use ariadne::{Color, Config, IndexType, Label, Report, ReportKind, Source};
use serde::Serialize;
use vyaz_ast::{Diagnostic, DiagnosticCode, Severity};

/// A diagnostic and the file it was found in.
#[derive(Debug, Clone, PartialEq)]
pub struct FileDiagnostic {
    pub path: PathBuf,
    pub diagnostic: Diagnostic,
}

impl FileDiagnostic {
    pub fn new(path: impl Into<PathBuf>, diagnostic: Diagnostic) -> Self {
        Self {
            path: path.into(),
            diagnostic,
        }
    }

    pub fn is_error(&self) -> bool {
        self.diagnostic.is_error()
    }
}

fn title(code: DiagnosticCode) -> &'static str {
    match code {
        DiagnosticCode::LexError => "Lexical error",
        DiagnosticCode::ParseError => "Parse error",
        DiagnosticCode::TypeError => "Type error",
        DiagnosticCode::ModuleNotFound => "Module not found",
        DiagnosticCode::CircularDependency => "Circular dependency",
        DiagnosticCode::UnsupportedFormat => "Unsupported format",
        DiagnosticCode::ModuleRead => "Cannot read module",
        DiagnosticCode::ExternalImport => "External import",
    }
}

/// Renders one diagnostic as an annotated source excerpt.
pub fn render(diagnostic: &Diagnostic, filename: &str, source: &str, color: bool) -> String {
    let (kind, label_color) = match diagnostic.severity {
        Severity::Error => (ReportKind::Error, Color::Red),
        Severity::Warning => (ReportKind::Warning, Color::Yellow),
    };
    let span = (filename, label_range(diagnostic.span.start, diagnostic.span.end, source));

    let mut buffer = Vec::new();
    let written = Report::build(kind, span.clone())
        .with_config(Config::default().with_color(color).with_index_type(IndexType::Byte))
        .with_code(diagnostic.code.as_str())
        .with_message(title(diagnostic.code))
        .with_label(
            Label::new(span)
                .with_message(&diagnostic.message)
                .with_color(label_color),
        )
        .finish()
        .write((filename, Source::from(source)), &mut buffer);
    match written {
        Ok(()) => String::from_utf8_lossy(&buffer).into_owned(),
        Err(_) => format!("{filename}:{diagnostic}\n"),
    }
}

/// Byte range for a label: clamped to the source, on char boundaries, and at
/// least one character wide when the source has any text after `start`.
fn label_range(start: usize, end: usize, source: &str) -> Range<usize> {
    let mut start = start.min(source.len());
    while !source.is_char_boundary(start) {
        start -= 1;
    }
    let mut end = end.clamp(start, source.len());
    while !source.is_char_boundary(end) {
        end += 1;
    }
    if end == start {
        end += source[start..].chars().next().map_or(0, char::len_utf8);
    }
    start..end
}

/// Renders diagnostics of several files. `source_of` supplies file text;
/// files it cannot supply fall back to a one-line form.
pub fn render_all<'d>(
    diagnostics: impl IntoIterator<Item = &'d FileDiagnostic>,
    mut source_of: impl FnMut(&Path) -> Option<String>,
    color: bool,
) -> String {
    let mut out = String::new();
    for item in diagnostics {
        let filename = item.path.display().to_string();
        match source_of(&item.path) {
            Some(source) => out.push_str(&render(&item.diagnostic, &filename, &source, color)),
            None => out.push_str(&format!("{filename}:{}\n", item.diagnostic)),
        }
    }
    out
}

/// Machine-readable diagnostic with 1-based position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JsonDiagnostic {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    pub severity: Severity,
    pub code: &'static str,
    pub message: String,
    pub line: u32,
    pub column: u32,
    pub start: usize,
    pub end: usize,
}

impl JsonDiagnostic {
    pub fn new(file: Option<&Path>, diagnostic: &Diagnostic) -> Self {
        Self {
            file: file.map(|path| path.display().to_string()),
            severity: diagnostic.severity,
            code: diagnostic.code.as_str(),
            message: diagnostic.message.clone(),
            line: diagnostic.span.line.max(1),
            column: diagnostic.span.column.max(1),
            start: diagnostic.span.start,
            end: diagnostic.span.end,
        }
    }
}

impl From<&FileDiagnostic> for JsonDiagnostic {
    fn from(item: &FileDiagnostic) -> Self {
        JsonDiagnostic::new(Some(&item.path), &item.diagnostic)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use vyaz_ast::Span;

    #[test]
    fn test_render_points_at_span() {
        let source = "пусть а: число = \"х\";\n";
        let start = source.find('"').unwrap();
        let diagnostic = Diagnostic::error(
            DiagnosticCode::TypeError,
            "строка не присваивается числу",
            Span::new(start, start + 4, 1, 18),
        );
        let rendered = render(&diagnostic, "main.vz", source, false);
        assert!(rendered.contains("E2000"));
        assert!(rendered.contains("Type error"));
        assert!(rendered.contains("строка не присваивается числу"));
        assert!(rendered.contains("main.vz"));
    }

    #[test]
    fn test_empty_span_on_cyrillic_source() {
        let source = "пусть а = 1;\n";
        let diagnostic = Diagnostic::error(DiagnosticCode::UnsupportedFormat, "формат esm", Span::default());
        let rendered = render(&diagnostic, "main.vz", source, false);
        assert!(rendered.contains("E3002"));
        assert!(rendered.contains("формат esm"));
    }

    #[test]
    fn test_label_range_stays_on_char_boundaries() {
        let source = "пусть";
        assert_eq!(label_range(0, 0, source), 0..2);
        assert_eq!(label_range(1, 3, source), 0..4);
        assert_eq!(label_range(40, 40, source), 10..10);
        assert_eq!(label_range(0, 0, ""), 0..0);
    }

    #[test]
    fn test_json_form() {
        let diagnostic = Diagnostic::warning(DiagnosticCode::ExternalImport, "внешний", Span::default());
        let json = serde_json::to_value(JsonDiagnostic::new(Some(Path::new("a.vz")), &diagnostic)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "file": "a.vz",
                "severity": "warning",
                "code": "W3004",
                "message": "внешний",
                "line": 1,
                "column": 1,
                "start": 0,
                "end": 0,
            })
        );
    }
}
