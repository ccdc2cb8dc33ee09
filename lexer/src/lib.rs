use logos::Logos;
use shared_context::Span;

pub mod token;
pub use token::Token;

/// A token together with its matched text and source location.
#[derive(Debug, Clone, Copy)]
pub struct SpannedToken<'source> {
    token_type: Token,
    lexeme: &'source str,
    span: Span,
}

impl<'source> SpannedToken<'source> {
    pub fn get_token(&self) -> Token {
        self.token_type
    }

    pub fn get_lexeme(&self) -> &'source str {
        self.lexeme
    }

    pub fn get_span(&self) -> Span {
        self.span
    }
}

impl<'source> Default for SpannedToken<'source> {
    fn default() -> Self {
        Self {
            token_type: Token::Error,
            lexeme: "",
            span: Span::default(),
        }
    }
}

/// Streaming Ada 83 lexer.
///
/// Wraps the generated token automaton with three things it cannot do
/// alone: skipping whitespace and comments, tracking line and column
/// positions, and assembling character literals. A tick is a
/// character literal opener only when the previous token cannot end
/// the prefix of an attribute or qualified expression; this is the
/// standard disambiguation for `T'('A')` against `X'FIRST`.
pub struct Lexer<'source> {
    iter: logos::Lexer<'source, Token>,
    input: &'source str,
    line: usize,
    column: usize,
    position: usize,
    previous: Option<Token>,
}

impl<'source> Lexer<'source> {
    // initiate the lexer
    pub fn new(input: &'source str) -> Self {
        Self {
            iter: Token::lexer(input),
            input,
            line: 1,
            column: 0,
            position: 0,
            previous: None,
        }
    }

    /// Produce the next significant token, or None at end of input.
    /// Invalid text comes through as a `Token::Error` for the parser
    /// to report; the lexer itself never fails.
    pub fn next(&mut self) -> Option<SpannedToken<'source>> {
        loop {
            let mut token_type = match self.iter.next()? {
                Ok(matched) => matched,
                Err(()) => Token::Error,
            };

            if token_type == Token::Skip {
                continue;
            }

            if token_type == Token::Tick {
                token_type = self.disambiguate_tick();
            }

            // update the line and column number
            let start = self.iter.span().start;
            self.count_lines(start);

            // update the current position
            self.position = self.iter.span().end;

            // set the start and end of the token relative to the line
            self.column += self.position - start;

            let spanned_token = SpannedToken {
                token_type,
                lexeme: self.iter.slice(),
                span: Span::new(start, self.position, self.line),
            };

            self.previous = Some(token_type);
            return Some(spanned_token);
        }
    }

    /// Decide whether a matched tick opens a character literal.
    ///
    /// After an identifier or a closing parenthesis the tick belongs
    /// to an attribute or a qualified expression. Anywhere else,
    /// `'x'` is a character literal and the two following bytes are
    /// pulled into the token.
    fn disambiguate_tick(&mut self) -> Token {
        if matches!(
            self.previous,
            Some(Token::Identifier) | Some(Token::RightParenthesis)
        ) {
            return Token::Tick;
        }

        let rest = self.input[self.iter.span().end..].as_bytes();
        if rest.len() >= 2 && rest[1] == b'\'' && rest[0].is_ascii() && rest[0] != b'\n' {
            self.iter.bump(2);
            Token::ConstantChar
        } else {
            Token::Tick
        }
    }

    // count all the lines and columns from the last position
    fn count_lines(&mut self, start: usize) {
        for char in self.input[self.position..start].chars() {
            if char == '\n' {
                self.line += 1;
                self.column = 0;
            } else {
                self.column += 1;
            }
        }
    }

    // getters for private fields
    pub fn get_source_code(&self) -> &'source str {
        self.input
    }

    pub fn get_line_num(&self) -> usize {
        self.line
    }

    pub fn get_col_num(&self) -> usize {
        self.column
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(source: &str) -> Vec<(Token, String)> {
        let mut lexer = Lexer::new(source);
        let mut tokens = Vec::new();
        while let Some(tok) = lexer.next() {
            tokens.push((tok.get_token(), tok.get_lexeme().to_string()));
        }
        tokens
    }

    #[test]
    fn keywords_ignore_case() {
        let tokens = collect("BEGIN Begin begin");
        assert_eq!(
            tokens.iter().map(|(t, _)| *t).collect::<Vec<_>>(),
            vec![Token::Begin, Token::Begin, Token::Begin]
        );
    }

    #[test]
    fn compound_delimiters_win_over_simple_ones() {
        let tokens = collect("X := A /= B; R : T range 1 .. 10;");
        let kinds: Vec<Token> = tokens.iter().map(|(t, _)| *t).collect();
        assert!(kinds.contains(&Token::Assignment));
        assert!(kinds.contains(&Token::NotEqual));
        assert!(kinds.contains(&Token::DotDot));
        assert!(!kinds.contains(&Token::Error));
    }

    #[test]
    fn attribute_tick_is_not_a_character_literal() {
        let tokens = collect("X'FIRST");
        let kinds: Vec<Token> = tokens.iter().map(|(t, _)| *t).collect();
        assert_eq!(kinds, vec![Token::Identifier, Token::Tick, Token::Identifier]);
    }

    #[test]
    fn character_literal_after_delimiter() {
        let tokens = collect("C := 'A';");
        let kinds: Vec<Token> = tokens.iter().map(|(t, _)| *t).collect();
        assert_eq!(
            kinds,
            vec![
                Token::Identifier,
                Token::Assignment,
                Token::ConstantChar,
                Token::Semicolon
            ]
        );
        assert_eq!(tokens[2].1, "'A'");
    }

    #[test]
    fn qualified_expression_with_character_literal() {
        let tokens = collect("CHARACTER'('A')");
        let kinds: Vec<Token> = tokens.iter().map(|(t, _)| *t).collect();
        assert_eq!(
            kinds,
            vec![
                Token::Identifier,
                Token::Tick,
                Token::LeftParenthesis,
                Token::ConstantChar,
                Token::RightParenthesis
            ]
        );
    }

    #[test]
    fn numeric_literals() {
        let tokens = collect("255 16#FF# 1_000 3.14 1.0E-3 2#1#E8");
        let kinds: Vec<Token> = tokens.iter().map(|(t, _)| *t).collect();
        assert_eq!(
            kinds,
            vec![
                Token::ConstantInt,
                Token::ConstantInt,
                Token::ConstantInt,
                Token::ConstantReal,
                Token::ConstantReal,
                Token::ConstantInt
            ]
        );
    }

    #[test]
    fn strings_keep_doubled_quotes_in_the_lexeme() {
        let tokens = collect(r#"PUT_LINE ("SAID ""HI""");"#);
        assert_eq!(tokens[2].0, Token::ConstantString);
        assert_eq!(tokens[2].1, r#""SAID ""HI""""#);
    }

    #[test]
    fn comments_and_blanks_are_skipped() {
        let tokens = collect("A -- the rest is noise\nB");
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[1].0, Token::Identifier);
        // line numbers advance across the comment's newline
        let mut lexer = Lexer::new("A -- x\nB");
        lexer.next();
        let b = lexer.next().unwrap();
        assert_eq!(b.get_span().line, 2);
    }

    #[test]
    fn malformed_number_is_an_error_token() {
        let tokens = collect("9begin");
        assert_eq!(tokens[0].0, Token::Error);
    }
}
