use crate::Span;

/// Represents the mapping between AST positions and source code positions.
/// Useful for error reporting, so we can highlight exactly where an error occurs.
///
/// Library units load from separate files, so each unit carries its own
/// source map rather than the context owning a single one.
pub struct SourceMap<'a> {
    source_code: &'a str, // The full source code as a string slice
    file_name: &'a str,   // Name of the file containing the source code
}

impl<'a> SourceMap<'a> {
    /// Creates a new SourceMap
    ///
    /// # Arguments
    /// - `file_name`: name of the source file
    /// - `source_code`: the content of the file
    pub fn new(file_name: &'a str, source_code: &'a str) -> Self {
        Self {
            source_code,
            file_name,
        }
    }

    /// Formats an error message with source context.
    /// Highlights the part of the source code indicated by `span` and appends the `message`.
    ///
    /// Example output:
    /// ```text
    /// hi.ada --> line 3:5
    ///      |
    ///  3   | X := Y + 1;
    ///      |      ^~~ Error message
    /// ```
    pub fn format_message(&self, message: &str, span: Span) -> String {
        let line_text = self.line_text(span.start);
        let column = self.column_of(span.start);

        // Construct a marker line with (^) under the first highlighted
        // character and (~) under the rest of the span.
        let mut marker_line = String::new();
        for ch in line_text.chars().take(column.saturating_sub(1)) {
            // Preserve tab alignment
            marker_line.push(if ch == '\t' { '\t' } else { ' ' });
        }
        marker_line.push('^');
        let marker_len = (span.end.saturating_sub(span.start)).max(1);
        for _ in 1..marker_len {
            marker_line.push('~');
        }
        marker_line.push(' ');
        marker_line.push_str(message);

        format!(
            "{} --> line {}:{}\n     |\n{:>4} | {}\n     | {}\n",
            self.file_name, span.line, column, span.line, line_text, marker_line
        )
    }

    /// Returns the text of the line containing the given offset.
    fn line_text(&self, offset: usize) -> &str {
        let offset = offset.min(self.source_code.len());
        let start = self.source_code[..offset]
            .rfind('\n')
            .map_or(0, |pos| pos + 1);
        let end = self.source_code[offset..]
            .find('\n')
            .map_or(self.source_code.len(), |pos| offset + pos);

        &self.source_code[start..end]
    }

    /// Returns the column number (1-based) corresponding to the given offset in the source
    fn column_of(&self, offset: usize) -> usize {
        let offset = offset.min(self.source_code.len());
        let line_start = self.source_code[..offset]
            .rfind('\n')
            .map_or(0, |pos| pos + 1);
        self.source_code[line_start..offset].chars().count() + 1
    }

    /// Returns the file name associated with this SourceMap
    pub fn get_file_name(&self) -> &'a str {
        self.file_name
    }

    /// Returns the full source code
    pub fn get_source_code(&self) -> &'a str {
        self.source_code
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_with_caret_under_span() {
        let source = "procedure P is\nX : Integer := Y;\nbegin\n";
        let map = SourceMap::new("p.ada", source);

        // span covering the `Y` on line 2
        let offset = source.find('Y').unwrap();
        let span = Span::new(offset, offset + 1, 2);
        let formatted = map.format_message("undeclared identifier", span);

        assert!(formatted.contains("p.ada --> line 2:16"));
        assert!(formatted.contains("X : Integer := Y;"));
        assert!(formatted.contains("^ undeclared identifier"));
    }
}
