use colored::Colorize;
use std::fmt;

/// The error taxonomy of the compiler.
///
/// Lexical and syntactic errors recover locally and parsing continues;
/// semantic and elaboration errors mark the offending construct invalid
/// and analysis continues; internal errors are assertion failures and
/// abort the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Lexical,
    Syntax,
    Semantic,
    Elaboration,
    Internal,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Category::Lexical => "lexical",
            Category::Syntax => "syntax",
            Category::Semantic => "semantic",
            Category::Elaboration => "elaboration",
            Category::Internal => "internal",
        };
        write!(f, "{name}")
    }
}

/// Collects every diagnostic produced during one compilation.
///
/// The error count gates code generation: a unit that accumulated any
/// error is analyzed to the end (so one run surfaces as many problems
/// as possible) but never lowered to IR.
pub struct Diagnostics {
    reported: Vec<(Category, String)>,
    error_count: usize,
    /// When false, messages are only recorded, not printed.
    /// Tests turn printing off to keep their output clean.
    print: bool,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self {
            reported: Vec::new(),
            error_count: 0,
            print: true,
        }
    }

    /// A sink that records without printing, for tests.
    pub fn silent() -> Self {
        Self {
            reported: Vec::new(),
            error_count: 0,
            print: false,
        }
    }

    /// Record one error. `message` is already formatted against the
    /// source map by the phase that produced it.
    pub fn report(&mut self, category: Category, message: String) {
        if self.print {
            eprintln!("{} ({category}): {message}", "error".red().bold());
        }
        self.reported.push((category, message));
        self.error_count += 1;
    }

    pub fn error_count(&self) -> usize {
        self.error_count
    }

    pub fn has_errors(&self) -> bool {
        self.error_count > 0
    }

    /// All recorded diagnostics in report order.
    pub fn reported(&self) -> &[(Category, String)] {
        &self.reported
    }

    /// True if some recorded message contains `needle`.
    /// Convenience for integration tests asserting on diagnostics.
    pub fn mentions(&self, needle: &str) -> bool {
        self.reported.iter().any(|(_, msg)| msg.contains(needle))
    }
}

impl Default for Diagnostics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_and_records() {
        let mut diagnostics = Diagnostics::silent();
        assert!(!diagnostics.has_errors());

        diagnostics.report(Category::Semantic, "type mismatch".to_string());
        diagnostics.report(Category::Syntax, "expected ';'".to_string());

        assert_eq!(diagnostics.error_count(), 2);
        assert!(diagnostics.mentions("type mismatch"));
        assert_eq!(diagnostics.reported()[1].0, Category::Syntax);
    }
}
