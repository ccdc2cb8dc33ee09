// Parsing of declarative parts: objects, subprograms, packages,
// tasks, generics, exceptions, use clauses and pragmas. Type and
// subtype declarations live in parse_types.

use super::Parser;
use super::parse_err::ParseErr;
use crate::ast::*;
use lexer::Token;
use shared_context::symbols::Mode;

impl<'src, 'ctx> Parser<'src, 'ctx> {
    /// Parse declarations until a structural keyword (`begin`, `end`,
    /// `private`) stops the region. Errors recover to the next
    /// semicolon so the rest of the region still parses.
    pub(crate) fn parse_declarative_part(&mut self) -> Vec<Declaration> {
        let mut declarations = Vec::new();
        loop {
            let Ok(token) = self.peek() else { break };
            match token.get_token() {
                Token::Begin | Token::End | Token::Private => break,
                _ => match self.parse_declaration() {
                    Ok(declaration) => declarations.push(declaration),
                    Err(err) => {
                        self.report(err);
                        self.synchronize();
                    }
                },
            }
        }
        declarations
    }

    fn parse_declaration(&mut self) -> Result<Declaration, ParseErr> {
        let token = self.peek()?;
        match token.get_token() {
            Token::Type => self.parse_type_declaration(),
            Token::Subtype => self.parse_subtype_declaration(),
            Token::Procedure | Token::Function => self.parse_subprogram_declaration(),
            Token::Package => self.parse_package_declaration(),
            Token::Task => self.parse_task_declaration(),
            Token::Generic => {
                let generic = self.parse_generic_declaration()?;
                Ok(Declaration::Generic(Box::new(generic)))
            }
            Token::Pragma => self.parse_pragma_declaration(),
            Token::Use => {
                let start = self.advance()?.get_span();
                let mut names = vec![self.parse_identifier()?];
                while self.accept(Token::Comma) {
                    names.push(self.parse_identifier()?);
                }
                self.expect(Token::Semicolon, ";")?;
                Ok(Declaration::UseClause {
                    names,
                    span: self.span_from(start),
                })
            }
            Token::Identifier => self.parse_object_declaration(),
            _ => Err(ParseErr::expected(
                "declaration",
                &token,
                &self.source_map,
            )),
        }
    }

    /// Identifier-led declarations: objects, named numbers, and
    /// exceptions.
    fn parse_object_declaration(&mut self) -> Result<Declaration, ParseErr> {
        let start = self.peek()?.get_span();
        let mut names = vec![self.parse_identifier()?];
        while self.accept(Token::Comma) {
            names.push(self.parse_identifier()?);
        }
        self.expect(Token::Colon, ":")?;

        if self.accept(Token::Exception) {
            self.expect(Token::Semicolon, ";")?;
            return Ok(Declaration::Exception(ExceptionDecl {
                names,
                span: self.span_from(start),
                syms: Vec::new(),
            }));
        }

        let constant = self.accept(Token::Constant);

        // a constant without a subtype indication is a named number
        if constant && self.accept(Token::Assignment) {
            let value = self.parse_expression()?;
            self.expect(Token::Semicolon, ";")?;
            return Ok(Declaration::Number(NumberDecl {
                names,
                value,
                span: self.span_from(start),
                syms: Vec::new(),
            }));
        }

        let subtype = if self.at(Token::Array) {
            ObjectSubtype::ArrayDef(Box::new(self.parse_array_definition()?))
        } else {
            ObjectSubtype::Indication(self.parse_subtype_indication()?)
        };

        let init = if self.accept(Token::Assignment) {
            Some(self.parse_expression()?)
        } else {
            None
        };
        self.expect(Token::Semicolon, ";")?;

        Ok(Declaration::Object(ObjectDecl {
            names,
            constant,
            subtype,
            init,
            span: self.span_from(start),
            syms: Vec::new(),
        }))
    }

    /// A subprogram declaration: a spec alone, a full body, or a
    /// generic instantiation.
    pub(crate) fn parse_subprogram_declaration(&mut self) -> Result<Declaration, ParseErr> {
        let spec = self.parse_subprogram_spec()?;
        let start = spec.span;

        if self.accept(Token::Semicolon) {
            return Ok(Declaration::SubprogramSpec(spec));
        }

        self.expect(Token::Is, "is")?;

        if self.accept(Token::New) {
            let generic = self.parse_expanded_name()?;
            let actuals = self.parse_optional_actuals()?;
            self.expect(Token::Semicolon, ";")?;
            return Ok(Declaration::GenericInstance(GenericInstance {
                name: spec.name,
                is_package: false,
                generic,
                actuals,
                span: self.span_from(start),
            }));
        }

        let decls = self.parse_declarative_part();
        self.expect(Token::Begin, "begin")?;
        let statements = self.parse_statement_sequence();
        let handlers = self.parse_exception_part()?;
        self.expect(Token::End, "end")?;
        if self.at(Token::Identifier) {
            self.advance()?; // closing name repetition
        }
        self.expect(Token::Semicolon, ";")?;

        Ok(Declaration::Subprogram(Box::new(SubprogramBody {
            spec,
            decls,
            statements,
            handlers,
            span: self.span_from(start),
            scope: None,
            suppress: shared_context::suppress::SuppressMask::none(),
        })))
    }

    /// `procedure NAME [(FORMALS)]` or
    /// `function NAME [(FORMALS)] return MARK`
    pub(crate) fn parse_subprogram_spec(&mut self) -> Result<SubprogramSpec, ParseErr> {
        let token = self.peek()?;
        let is_function = match token.get_token() {
            Token::Procedure => false,
            Token::Function => true,
            _ => {
                return Err(ParseErr::expected(
                    "procedure or function",
                    &token,
                    &self.source_map,
                ));
            }
        };
        let start = self.advance()?.get_span();
        let name = self.parse_identifier()?;

        let params = if self.at(Token::LeftParenthesis) {
            self.parse_formal_part()?
        } else {
            Vec::new()
        };

        let result = if is_function {
            self.expect(Token::Return, "return")?;
            Some(self.parse_expanded_name()?)
        } else {
            None
        };

        Ok(SubprogramSpec {
            name,
            is_function,
            params,
            result,
            span: self.span_from(start),
            sym: None,
        })
    }

    /// `(NAME {, NAME} : MODE MARK [:= DEFAULT] {; ...})`
    pub(crate) fn parse_formal_part(&mut self) -> Result<Vec<ParamSpec>, ParseErr> {
        self.expect(Token::LeftParenthesis, "(")?;
        let mut params = Vec::new();
        loop {
            let start = self.peek()?.get_span();
            let mut names = vec![self.parse_identifier()?];
            while self.accept(Token::Comma) {
                names.push(self.parse_identifier()?);
            }
            self.expect(Token::Colon, ":")?;
            let mode = self.parse_mode();
            let mark = self.parse_expanded_name()?;
            let default = if self.accept(Token::Assignment) {
                Some(self.parse_expression()?)
            } else {
                None
            };
            params.push(ParamSpec {
                names,
                mode,
                mark,
                default,
                span: self.span_from(start),
                syms: Vec::new(),
            });
            if !self.accept(Token::Semicolon) {
                break;
            }
        }
        self.expect(Token::RightParenthesis, ")")?;
        Ok(params)
    }

    /// `[in] | [in] out`; a bare mark means `in`.
    fn parse_mode(&mut self) -> Mode {
        if self.accept(Token::In) {
            if self.accept(Token::Out) {
                Mode::InOut
            } else {
                Mode::In
            }
        } else if self.accept(Token::Out) {
            Mode::Out
        } else {
            Mode::In
        }
    }

    /// A package spec, package body, or package instantiation.
    pub(crate) fn parse_package_declaration(&mut self) -> Result<Declaration, ParseErr> {
        let start = self.expect(Token::Package, "package")?.get_span();

        if self.accept(Token::Body) {
            let name = self.parse_identifier()?;
            self.expect(Token::Is, "is")?;
            let decls = self.parse_declarative_part();

            let (statements, handlers) = if self.accept(Token::Begin) {
                let statements = self.parse_statement_sequence();
                let handlers = self.parse_exception_part()?;
                (statements, handlers)
            } else {
                (Vec::new(), Vec::new())
            };

            self.expect(Token::End, "end")?;
            if self.at(Token::Identifier) {
                self.advance()?;
            }
            self.expect(Token::Semicolon, ";")?;

            return Ok(Declaration::PackageBody(Box::new(PackageBody {
                name,
                decls,
                statements,
                handlers,
                span: self.span_from(start),
                sym: None,
                suppress: shared_context::suppress::SuppressMask::none(),
            })));
        }

        let name = self.parse_identifier()?;
        self.expect(Token::Is, "is")?;

        if self.accept(Token::New) {
            let generic = self.parse_expanded_name()?;
            let actuals = self.parse_optional_actuals()?;
            self.expect(Token::Semicolon, ";")?;
            return Ok(Declaration::GenericInstance(GenericInstance {
                name,
                is_package: true,
                generic,
                actuals,
                span: self.span_from(start),
            }));
        }

        let visible = self.parse_declarative_part();
        let private = if self.accept(Token::Private) {
            self.parse_declarative_part()
        } else {
            Vec::new()
        };

        self.expect(Token::End, "end")?;
        if self.at(Token::Identifier) {
            self.advance()?;
        }
        self.expect(Token::Semicolon, ";")?;

        Ok(Declaration::Package(Box::new(PackageSpec {
            name,
            visible,
            private,
            span: self.span_from(start),
            sym: None,
        })))
    }

    /// `task [type] NAME [is ENTRIES end [NAME]];` or a task body.
    fn parse_task_declaration(&mut self) -> Result<Declaration, ParseErr> {
        let start = self.expect(Token::Task, "task")?.get_span();

        if self.accept(Token::Body) {
            let name = self.parse_identifier()?;
            self.expect(Token::Is, "is")?;
            let decls = self.parse_declarative_part();
            self.expect(Token::Begin, "begin")?;
            let statements = self.parse_statement_sequence();
            let handlers = self.parse_exception_part()?;
            self.expect(Token::End, "end")?;
            if self.at(Token::Identifier) {
                self.advance()?;
            }
            self.expect(Token::Semicolon, ";")?;

            return Ok(Declaration::TaskBody(Box::new(TaskBody {
                name,
                decls,
                statements,
                handlers,
                span: self.span_from(start),
            })));
        }

        let is_type = self.accept(Token::Type);
        let name = self.parse_identifier()?;

        let mut entries = Vec::new();
        if self.accept(Token::Is) {
            while self.at(Token::Entry) {
                let entry_start = self.advance()?.get_span();
                let entry_name = self.parse_identifier()?;
                let params = if self.at(Token::LeftParenthesis) {
                    self.parse_formal_part()?
                } else {
                    Vec::new()
                };
                self.expect(Token::Semicolon, ";")?;
                entries.push(SubprogramSpec {
                    name: entry_name,
                    is_function: false,
                    params,
                    result: None,
                    span: self.span_from(entry_start),
                    sym: None,
                });
            }
            self.expect(Token::End, "end")?;
            if self.at(Token::Identifier) {
                self.advance()?;
            }
        }
        self.expect(Token::Semicolon, ";")?;

        Ok(Declaration::Task(TaskDecl {
            name,
            is_type,
            entries,
            span: self.span_from(start),
            ty: shared_context::types::TypeId::INVALID,
            sym: None,
        }))
    }

    /// `generic FORMALS package|procedure|function ...`
    pub(crate) fn parse_generic_declaration(&mut self) -> Result<GenericDecl, ParseErr> {
        let start = self.expect(Token::Generic, "generic")?.get_span();

        let mut formals = Vec::new();
        loop {
            let token = self.peek()?;
            match token.get_token() {
                Token::Type => {
                    let formal_start = self.advance()?.get_span();
                    let name = self.parse_identifier()?;
                    self.expect(Token::Is, "is")?;
                    let kind = self.parse_formal_type_kind()?;
                    self.expect(Token::Semicolon, ";")?;
                    formals.push(GenericFormal::Type {
                        name,
                        kind,
                        span: self.span_from(formal_start),
                    });
                }
                Token::With => {
                    let formal_start = self.advance()?.get_span();
                    let spec = self.parse_subprogram_spec()?;
                    self.expect(Token::Semicolon, ";")?;
                    formals.push(GenericFormal::Subprogram {
                        spec,
                        span: self.span_from(formal_start),
                    });
                }
                Token::Identifier => {
                    let formal_start = token.get_span();
                    let mut names = vec![self.parse_identifier()?];
                    while self.accept(Token::Comma) {
                        names.push(self.parse_identifier()?);
                    }
                    self.expect(Token::Colon, ":")?;
                    let mode = self.parse_mode();
                    let mark = self.parse_expanded_name()?;
                    let default = if self.accept(Token::Assignment) {
                        Some(self.parse_expression()?)
                    } else {
                        None
                    };
                    self.expect(Token::Semicolon, ";")?;
                    formals.push(GenericFormal::Object {
                        names,
                        mode,
                        mark,
                        default,
                        span: self.span_from(formal_start),
                    });
                }
                Token::Package | Token::Procedure | Token::Function => break,
                _ => {
                    return Err(ParseErr::expected(
                        "generic formal or unit",
                        &token,
                        &self.source_map,
                    ));
                }
            }
        }

        let unit = if self.at(Token::Package) {
            match self.parse_package_declaration()? {
                Declaration::Package(spec) => GenericUnit::Package(*spec),
                _ => {
                    return Err(ParseErr::new(
                        "a generic unit must be a package or subprogram specification"
                            .to_string(),
                        &self.current_token,
                        &self.source_map,
                    ));
                }
            }
        } else {
            let spec = self.parse_subprogram_spec()?;
            self.expect(Token::Semicolon, ";")?;
            GenericUnit::Subprogram(spec)
        };

        Ok(GenericDecl {
            formals,
            unit,
            span: self.span_from(start),
        })
    }

    /// The restriction a generic formal type places on its actuals.
    fn parse_formal_type_kind(&mut self) -> Result<FormalTypeKind, ParseErr> {
        let token = self.peek()?;
        match token.get_token() {
            Token::LeftParenthesis => {
                self.advance()?;
                self.expect(Token::Box, "<>")?;
                self.expect(Token::RightParenthesis, ")")?;
                Ok(FormalTypeKind::Discrete)
            }
            Token::Range => {
                self.advance()?;
                self.expect(Token::Box, "<>")?;
                Ok(FormalTypeKind::Integer)
            }
            Token::Digits => {
                self.advance()?;
                self.expect(Token::Box, "<>")?;
                Ok(FormalTypeKind::Float)
            }
            Token::Limited => {
                self.advance()?;
                self.expect(Token::Private, "private")?;
                Ok(FormalTypeKind::Private { limited: true })
            }
            Token::Private => {
                self.advance()?;
                Ok(FormalTypeKind::Private { limited: false })
            }
            Token::Array => match self.parse_array_definition()? {
                TypeDef::Array {
                    indexes,
                    unconstrained,
                    component,
                } => Ok(FormalTypeKind::Array {
                    indexes,
                    unconstrained,
                    component,
                }),
                _ => unreachable!("array parser returned a non-array definition"),
            },
            Token::Access => {
                self.advance()?;
                let designated = self.parse_subtype_indication()?;
                Ok(FormalTypeKind::Access { designated })
            }
            _ => Err(ParseErr::expected(
                "generic formal type definition",
                &token,
                &self.source_map,
            )),
        }
    }

    /// `pragma NAME [(ARGS)];`
    fn parse_pragma_declaration(&mut self) -> Result<Declaration, ParseErr> {
        let start = self.expect(Token::Pragma, "pragma")?.get_span();
        let name = self.parse_identifier()?;

        let args = self.parse_optional_actuals()?;
        self.expect(Token::Semicolon, ";")?;

        Ok(Declaration::Pragma(PragmaDecl {
            name,
            args,
            span: self.span_from(start),
        }))
    }

    /// `( ARG {, ARG} )` when present.
    fn parse_optional_actuals(&mut self) -> Result<Vec<Argument>, ParseErr> {
        if !self.at(Token::LeftParenthesis) {
            return Ok(Vec::new());
        }
        self.advance()?;
        let mut args = vec![self.parse_argument()?];
        while self.accept(Token::Comma) {
            args.push(self.parse_argument()?);
        }
        self.expect(Token::RightParenthesis, ")")?;
        Ok(args)
    }
}
