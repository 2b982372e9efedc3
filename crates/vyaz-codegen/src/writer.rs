//! Output buffer that tracks generated positions

use vyaz_ast::Span;

use crate::sourcemap::Mapping;

const INDENT: &str = "    ";

/// Builds output text line by line. Indentation is written lazily at the
/// first text of a line, so a mark taken at a line start points past it.
#[derive(Debug)]
pub struct JsWriter {
    buffer: String,
    line: u32,
    column: u32,
    indent: usize,
    line_start: bool,
    mappings: Option<Vec<Mapping>>,
}

impl JsWriter {
    /// A writer; with `track_positions` it records a mapping per mark.
    pub fn new(track_positions: bool) -> Self {
        Self {
            buffer: String::new(),
            line: 0,
            column: 0,
            indent: 0,
            line_start: true,
            mappings: track_positions.then(Vec::new),
        }
    }

    pub fn write(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        self.flush_indent();
        for ch in text.chars() {
            if ch == '\n' {
                self.line += 1;
                self.column = 0;
            } else {
                self.column += ch.len_utf16() as u32;
            }
        }
        self.buffer.push_str(text);
    }

    pub fn newline(&mut self) {
        self.buffer.push('\n');
        self.line += 1;
        self.column = 0;
        self.line_start = true;
    }

    pub fn indent(&mut self) {
        self.indent += 1;
    }

    pub fn dedent(&mut self) {
        self.indent = self.indent.saturating_sub(1);
    }

    /// Pairs the current output position with the start of `span`.
    pub fn mark(&mut self, span: Span) {
        if self.mappings.is_none() || span.line == 0 {
            return;
        }
        self.flush_indent();
        let mapping = Mapping {
            generated_line: self.line,
            generated_column: self.column,
            source: 0,
            source_line: span.line - 1,
            source_column: span.column.saturating_sub(1),
        };
        if let Some(mappings) = &mut self.mappings {
            let same_position = mappings.last().is_some_and(|last| {
                last.generated_line == mapping.generated_line
                    && last.generated_column == mapping.generated_column
            });
            if !same_position {
                mappings.push(mapping);
            }
        }
    }

    /// Appends everything `other` wrote, starting on a fresh line.
    pub fn append(&mut self, other: JsWriter) {
        if other.buffer.is_empty() {
            return;
        }
        if !self.line_start {
            self.newline();
        }
        let offset = self.line;
        if let (Some(mine), Some(theirs)) = (&mut self.mappings, other.mappings) {
            mine.extend(theirs.into_iter().map(|m| m.shifted(offset, 0)));
        }
        self.buffer.push_str(&other.buffer);
        self.line += other.line;
        self.column = other.column;
        self.line_start = other.line_start;
    }

    pub fn finish(self) -> (String, Option<Vec<Mapping>>) {
        (self.buffer, self.mappings)
    }

    fn flush_indent(&mut self) {
        if !self.line_start {
            return;
        }
        self.line_start = false;
        for _ in 0..self.indent {
            self.buffer.push_str(INDENT);
        }
        self.column += (self.indent * INDENT.len()) as u32;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_indentation_is_lazy() {
        let mut w = JsWriter::new(false);
        w.write("{");
        w.newline();
        w.indent();
        w.newline();
        w.write("a;");
        w.newline();
        w.dedent();
        w.write("}");
        assert_eq!(w.finish().0, "{\n\n    a;\n}");
    }

    #[test]
    fn test_mark_after_indent_and_cyrillic() {
        let mut w = JsWriter::new(true);
        w.indent();
        w.mark(Span::new(0, 1, 1, 1));
        w.write("пусть");
        w.mark(Span::new(10, 11, 2, 3));
        w.write("x");
        let (_, mappings) = w.finish();
        let mappings = mappings.unwrap();
        assert_eq!(mappings[0].generated_column, 4);
        assert_eq!(mappings[1].generated_column, 9);
        assert_eq!((mappings[1].source_line, mappings[1].source_column), (1, 2));
    }

    #[test]
    fn test_append_shifts_lines() {
        let mut head = JsWriter::new(true);
        head.write("a;");
        head.newline();
        let mut body = JsWriter::new(true);
        body.mark(Span::new(0, 1, 1, 1));
        body.write("b;");
        head.append(body);
        let (code, mappings) = head.finish();
        assert_eq!(code, "a;\nb;");
        assert_eq!(mappings.unwrap()[0].generated_line, 1);
    }
}
