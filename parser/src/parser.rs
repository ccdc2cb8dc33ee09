use crate::ast::*;
use lexer::{Lexer, SpannedToken, Token};
use parse_err::ParseErr;
use shared_context::diagnostics::Category;
use shared_context::source_map::SourceMap;
use shared_context::{CompilerContext, Ident, Span};

mod parse_declarations;
pub mod parse_err;
mod parse_expressions;
mod parse_statements;
mod parse_types;

/// Parse one source file into a compilation unit.
///
/// Syntax errors are reported through the context's diagnostics sink;
/// the parser recovers at semicolons and keeps going, so one run can
/// surface several errors. `None` means no unit could be formed at
/// all.
pub fn parse<'src, 'ctx>(
    lexer: Lexer<'src>,
    file_name: &'src str,
    ctx: &'ctx mut CompilerContext<'src>,
) -> Option<CompilationUnit> {
    let mut parser = Parser::new(lexer, file_name, ctx);
    parser.parse_compilation_unit()
}

/// Recursive-descent parser over the token stream, with one token of
/// lookahead.
pub struct Parser<'src, 'ctx> {
    lexer: Lexer<'src>,
    ctx: &'ctx mut CompilerContext<'src>,
    source_map: SourceMap<'src>,
    current_token: SpannedToken<'src>,
    peeked_token: Option<SpannedToken<'src>>,
}

impl<'src, 'ctx> Parser<'src, 'ctx> {
    /// create a new instance of parser
    pub fn new(
        lexer: Lexer<'src>,
        file_name: &'src str,
        ctx: &'ctx mut CompilerContext<'src>,
    ) -> Self {
        let source_map = SourceMap::new(file_name, lexer.get_source_code());
        Self {
            lexer,
            ctx,
            source_map,
            current_token: SpannedToken::default(),
            peeked_token: None,
        }
    }

    /// advance the parser to the next token and return it
    pub(crate) fn advance(&mut self) -> Result<SpannedToken<'src>, ParseErr> {
        match self.peeked_token.take() {
            Some(token) => {
                self.current_token = token;
                Ok(self.current_token)
            }
            None => {
                let token = self.lexer.next().ok_or_else(|| {
                    ParseErr::new(
                        "unexpected end of input".to_string(),
                        &self.current_token,
                        &self.source_map,
                    )
                })?;
                self.current_token = token;
                Ok(self.current_token)
            }
        }
    }

    /// return the peeked token without consuming it
    pub(crate) fn peek(&mut self) -> Result<SpannedToken<'src>, ParseErr> {
        if let Some(token) = self.peeked_token {
            Ok(token)
        } else {
            self.peeked_token = self.lexer.next();
            self.peeked_token.ok_or_else(|| {
                ParseErr::new(
                    "unexpected end of input".to_string(),
                    &self.current_token,
                    &self.source_map,
                )
            })
        }
    }

    /// true when the next token is `token`; end of input is false
    pub(crate) fn at(&mut self, token: Token) -> bool {
        self.peek().map(|t| t.get_token() == token).unwrap_or(false)
    }

    /// consume the next token when it is `token`
    pub(crate) fn accept(&mut self, token: Token) -> bool {
        if self.at(token) {
            let _ = self.advance();
            true
        } else {
            false
        }
    }

    /// compare the next token with the expected token type and consume
    /// it; return an error if they don't match
    pub(crate) fn expect(
        &mut self,
        token: Token,
        what: &str,
    ) -> Result<SpannedToken<'src>, ParseErr> {
        let next = self.peek()?;
        if next.get_token() == token {
            self.advance()
        } else {
            Err(ParseErr::expected(what, &next, &self.source_map))
        }
    }

    /// parse a defining or referencing identifier, interned case-folded
    pub(crate) fn parse_identifier(&mut self) -> Result<Ident, ParseErr> {
        let token = self.peek()?;
        if token.get_token() == Token::Identifier {
            self.advance()?;
            let symbol = self.ctx.interner.intern_folded(token.get_lexeme());
            Ok(Ident::new(symbol, token.get_span()))
        } else {
            Err(ParseErr::expected("identifier", &token, &self.source_map))
        }
    }

    /// report a syntax error and continue
    pub(crate) fn report(&mut self, err: ParseErr) {
        self.ctx
            .diagnostics
            .report(Category::Syntax, err.into_message());
    }

    pub(crate) fn report_lexical(&mut self, message: &str, token: &SpannedToken) {
        let formatted = self.source_map.format_message(message, token.get_span());
        self.ctx.diagnostics.report(Category::Lexical, formatted);
    }

    /// local error recovery: skip forward until just past the next
    /// semicolon, or stop short of a structural keyword that a caller
    /// will want to see
    pub(crate) fn synchronize(&mut self) {
        loop {
            let Ok(token) = self.peek() else { return };
            match token.get_token() {
                Token::Semicolon => {
                    let _ = self.advance();
                    return;
                }
                Token::End
                | Token::Begin
                | Token::Private
                | Token::Exception
                | Token::Else
                | Token::Elsif
                | Token::When => return,
                _ => {
                    let _ = self.advance();
                }
            }
        }
    }

    pub(crate) fn span_from(&self, start: Span) -> Span {
        start.to(self.current_token.get_span())
    }

    // entry point: context clauses followed by one library item
    pub fn parse_compilation_unit(&mut self) -> Option<CompilationUnit> {
        let mut context = Vec::new();
        loop {
            match self.peek() {
                Ok(token) if token.get_token() == Token::With => {
                    match self.parse_with_clause() {
                        Ok(clause) => context.push(clause),
                        Err(err) => {
                            self.report(err);
                            self.synchronize();
                        }
                    }
                }
                Ok(token) if token.get_token() == Token::Use => match self.parse_use_clause() {
                    Ok(clause) => context.push(clause),
                    Err(err) => {
                        self.report(err);
                        self.synchronize();
                    }
                },
                _ => break,
            }
        }

        let item = match self.parse_library_item() {
            Ok(item) => item,
            Err(err) => {
                self.report(err);
                return None;
            }
        };

        // a source file holds exactly one compilation unit
        if let Ok(extra) = self.peek() {
            let err = ParseErr::new(
                "one compilation unit per file".to_string(),
                &extra,
                &self.source_map,
            );
            self.report(err);
        }

        Some(CompilationUnit { context, item })
    }

    fn parse_with_clause(&mut self) -> Result<ContextClause, ParseErr> {
        let start = self.peek()?.get_span();
        self.expect(Token::With, "with")?;

        let mut names = vec![self.parse_identifier()?];
        while self.accept(Token::Comma) {
            names.push(self.parse_identifier()?);
        }
        self.expect(Token::Semicolon, ";")?;

        Ok(ContextClause::With {
            names,
            span: self.span_from(start),
        })
    }

    fn parse_use_clause(&mut self) -> Result<ContextClause, ParseErr> {
        let start = self.peek()?.get_span();
        self.expect(Token::Use, "use")?;

        let mut names = vec![self.parse_identifier()?];
        while self.accept(Token::Comma) {
            names.push(self.parse_identifier()?);
        }
        self.expect(Token::Semicolon, ";")?;

        Ok(ContextClause::Use {
            names,
            span: self.span_from(start),
        })
    }

    fn parse_library_item(&mut self) -> Result<LibraryItem, ParseErr> {
        let token = self.peek()?;
        match token.get_token() {
            Token::Package => {
                let decl = self.parse_package_declaration()?;
                match decl {
                    Declaration::Package(spec) => Ok(LibraryItem::PackageSpec(*spec)),
                    Declaration::PackageBody(body) => Ok(LibraryItem::PackageBody(*body)),
                    Declaration::GenericInstance(instance) => {
                        Ok(LibraryItem::Instance(instance))
                    }
                    _ => unreachable!("package parser returned a non-package declaration"),
                }
            }
            Token::Procedure | Token::Function => {
                let decl = self.parse_subprogram_declaration()?;
                match decl {
                    Declaration::Subprogram(body) => Ok(LibraryItem::Subprogram(*body)),
                    Declaration::SubprogramSpec(spec) => {
                        Err(ParseErr::new(
                            format!(
                                "library subprogram '{}' needs a body",
                                self.ctx.interner.lookup(spec.name.symbol)
                            ),
                            &self.current_token,
                            &self.source_map,
                        ))
                    }
                    Declaration::GenericInstance(instance) => {
                        Ok(LibraryItem::Instance(instance))
                    }
                    _ => unreachable!("subprogram parser returned a non-subprogram declaration"),
                }
            }
            Token::Generic => {
                let generic = self.parse_generic_declaration()?;
                Ok(LibraryItem::Generic(Box::new(generic)))
            }
            _ => Err(ParseErr::expected(
                "package, procedure or function",
                &token,
                &self.source_map,
            )),
        }
    }
}
