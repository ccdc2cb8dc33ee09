// Statement parsing: the full Ada 83 repertoire used by this
// compiler, with local recovery so one bad statement does not take
// the rest of the sequence with it.

use super::Parser;
use super::parse_err::ParseErr;
use crate::ast::*;
use lexer::Token;

impl<'src, 'ctx> Parser<'src, 'ctx> {
    /// Parse statements until a token that closes the sequence
    /// (`end`, `elsif`, `else`, `exception`, `when`, `or`).
    pub(crate) fn parse_statement_sequence(&mut self) -> Vec<Statement> {
        let mut statements = Vec::new();
        loop {
            let Ok(token) = self.peek() else { break };
            match token.get_token() {
                Token::End
                | Token::Elsif
                | Token::Else
                | Token::Exception
                | Token::When
                | Token::Or => break,
                _ => match self.parse_statement() {
                    Ok(statement) => statements.push(statement),
                    Err(err) => {
                        self.report(err);
                        self.synchronize();
                    }
                },
            }
        }
        statements
    }

    fn parse_statement(&mut self) -> Result<Statement, ParseErr> {
        let token = self.peek()?;
        let start = token.get_span();

        match token.get_token() {
            Token::Null => {
                self.advance()?;
                self.expect(Token::Semicolon, ";")?;
                Ok(Statement::new(StatementKind::Null, self.span_from(start)))
            }
            Token::Identifier => self.parse_name_statement(),
            Token::If => self.parse_if_statement(),
            Token::Case => self.parse_case_statement(),
            Token::Loop | Token::While | Token::For => self.parse_loop_statement(None),
            Token::Exit => self.parse_exit_statement(),
            Token::Return => {
                self.advance()?;
                let value = if self.at(Token::Semicolon) {
                    None
                } else {
                    Some(self.parse_expression()?)
                };
                self.expect(Token::Semicolon, ";")?;
                Ok(Statement::new(
                    StatementKind::Return(value),
                    self.span_from(start),
                ))
            }
            Token::Declare | Token::Begin => self.parse_block_statement(),
            Token::Raise => {
                self.advance()?;
                let name = if self.at(Token::Semicolon) {
                    None
                } else {
                    Some(self.parse_expanded_name()?)
                };
                self.expect(Token::Semicolon, ";")?;
                Ok(Statement::new(
                    StatementKind::Raise(name),
                    self.span_from(start),
                ))
            }
            Token::Delay => {
                self.advance()?;
                let amount = self.parse_expression()?;
                self.expect(Token::Semicolon, ";")?;
                Ok(Statement::new(
                    StatementKind::Delay(amount),
                    self.span_from(start),
                ))
            }
            Token::Accept => self.parse_accept_statement(),
            Token::Select => self.parse_select_statement(),
            Token::Abort => {
                self.advance()?;
                let mut names = vec![self.parse_expanded_name()?];
                while self.accept(Token::Comma) {
                    names.push(self.parse_expanded_name()?);
                }
                self.expect(Token::Semicolon, ";")?;
                Ok(Statement::new(
                    StatementKind::Abort(names),
                    self.span_from(start),
                ))
            }
            _ => Err(ParseErr::expected("statement", &token, &self.source_map)),
        }
    }

    /// A statement opening with a name: an assignment, a call, or a
    /// loop/block label (`L : loop ...`).
    fn parse_name_statement(&mut self) -> Result<Statement, ParseErr> {
        let name = self.parse_name()?;
        let start = name.span;

        if self.at(Token::Colon) {
            // the name was a loop or block label; it must be simple
            let label = match &name.kind {
                ExprKind::Identifier(ident) => *ident,
                _ => {
                    return Err(ParseErr::new(
                        "a label must be a simple name".to_string(),
                        &self.current_token,
                        &self.source_map,
                    ));
                }
            };
            self.advance()?;
            let token = self.peek()?;
            return match token.get_token() {
                Token::Loop | Token::While | Token::For => {
                    self.parse_loop_statement(Some(label))
                }
                Token::Declare | Token::Begin => self.parse_block_statement(),
                _ => Err(ParseErr::expected(
                    "loop or block after label",
                    &token,
                    &self.source_map,
                )),
            };
        }

        if self.accept(Token::Assignment) {
            let value = self.parse_expression()?;
            self.expect(Token::Semicolon, ";")?;
            return Ok(Statement::new(
                StatementKind::Assignment {
                    target: name,
                    value,
                },
                self.span_from(start),
            ));
        }

        self.expect(Token::Semicolon, ";")?;
        Ok(Statement::new(
            StatementKind::Call(name),
            self.span_from(start),
        ))
    }

    /// `if COND then ... {elsif COND then ...} [else ...] end if;`
    fn parse_if_statement(&mut self) -> Result<Statement, ParseErr> {
        let start = self.expect(Token::If, "if")?.get_span();

        let mut arms = Vec::new();
        loop {
            let arm_start = self.current_token.get_span();
            let condition = self.parse_expression()?;
            self.expect(Token::Then, "then")?;
            let statements = self.parse_statement_sequence();
            arms.push(IfArm {
                condition,
                statements,
                span: self.span_from(arm_start),
            });
            if !self.accept(Token::Elsif) {
                break;
            }
        }

        let else_arm = if self.accept(Token::Else) {
            Some(self.parse_statement_sequence())
        } else {
            None
        };

        self.expect(Token::End, "end")?;
        self.expect(Token::If, "if")?;
        self.expect(Token::Semicolon, ";")?;

        Ok(Statement::new(
            StatementKind::If { arms, else_arm },
            self.span_from(start),
        ))
    }

    /// `case SELECTOR is {when CHOICES => ...} end case;`
    fn parse_case_statement(&mut self) -> Result<Statement, ParseErr> {
        let start = self.expect(Token::Case, "case")?.get_span();
        let selector = self.parse_expression()?;
        self.expect(Token::Is, "is")?;

        let mut arms = Vec::new();
        while self.at(Token::When) {
            let arm_start = self.advance()?.get_span();
            let mut choices = vec![self.parse_choice()?];
            while self.accept(Token::Bar) {
                choices.push(self.parse_choice()?);
            }
            self.expect(Token::Arrow, "=>")?;
            let statements = self.parse_statement_sequence();
            arms.push(CaseArm {
                choices,
                statements,
                span: self.span_from(arm_start),
            });
        }

        self.expect(Token::End, "end")?;
        self.expect(Token::Case, "case")?;
        self.expect(Token::Semicolon, ";")?;

        Ok(Statement::new(
            StatementKind::Case { selector, arms },
            self.span_from(start),
        ))
    }

    /// All three loop forms; `name` is the label when the loop was
    /// introduced by one.
    fn parse_loop_statement(
        &mut self,
        name: Option<shared_context::Ident>,
    ) -> Result<Statement, ParseErr> {
        let start = self.peek()?.get_span();

        let scheme = if self.accept(Token::While) {
            let condition = self.parse_expression()?;
            LoopScheme::While(condition)
        } else if self.accept(Token::For) {
            let variable = self.parse_identifier()?;
            self.expect(Token::In, "in")?;
            let reverse = self.accept(Token::Reverse);
            let range = self.parse_discrete_range()?;
            LoopScheme::For {
                variable,
                reverse,
                range,
                sym: None,
            }
        } else {
            LoopScheme::Infinite
        };

        self.expect(Token::Loop, "loop")?;
        let body = self.parse_statement_sequence();
        self.expect(Token::End, "end")?;
        self.expect(Token::Loop, "loop")?;
        if self.at(Token::Identifier) {
            self.advance()?; // closing label repetition
        }
        self.expect(Token::Semicolon, ";")?;

        Ok(Statement::new(
            StatementKind::Loop { name, scheme, body },
            self.span_from(start),
        ))
    }

    /// `exit [LOOP_NAME] [when COND];`
    fn parse_exit_statement(&mut self) -> Result<Statement, ParseErr> {
        let start = self.expect(Token::Exit, "exit")?.get_span();

        let name = if self.at(Token::Identifier) {
            Some(self.parse_identifier()?)
        } else {
            None
        };
        let condition = if self.accept(Token::When) {
            Some(self.parse_expression()?)
        } else {
            None
        };
        self.expect(Token::Semicolon, ";")?;

        Ok(Statement::new(
            StatementKind::Exit { name, condition },
            self.span_from(start),
        ))
    }

    /// `[declare DECLS] begin ... [exception ...] end;`
    fn parse_block_statement(&mut self) -> Result<Statement, ParseErr> {
        let start = self.peek()?.get_span();

        let decls = if self.accept(Token::Declare) {
            self.parse_declarative_part()
        } else {
            Vec::new()
        };
        self.expect(Token::Begin, "begin")?;
        let statements = self.parse_statement_sequence();
        let handlers = self.parse_exception_part()?;
        self.expect(Token::End, "end")?;
        if self.at(Token::Identifier) {
            self.advance()?;
        }
        self.expect(Token::Semicolon, ";")?;

        Ok(Statement::new(
            StatementKind::Block {
                decls,
                statements,
                handlers,
                suppress: shared_context::suppress::SuppressMask::none(),
            },
            self.span_from(start),
        ))
    }

    /// The `exception when ... =>` part of a body or block; empty
    /// when there is none.
    pub(crate) fn parse_exception_part(&mut self) -> Result<Vec<ExceptionHandler>, ParseErr> {
        if !self.accept(Token::Exception) {
            return Ok(Vec::new());
        }

        let mut handlers = Vec::new();
        while self.at(Token::When) {
            let start = self.advance()?.get_span();
            let mut choices = vec![self.parse_exception_choice()?];
            while self.accept(Token::Bar) {
                choices.push(self.parse_exception_choice()?);
            }
            self.expect(Token::Arrow, "=>")?;
            let statements = self.parse_statement_sequence();
            handlers.push(ExceptionHandler {
                choices,
                statements,
                span: self.span_from(start),
            });
        }
        Ok(handlers)
    }

    fn parse_exception_choice(&mut self) -> Result<ExceptionChoice, ParseErr> {
        if self.accept(Token::Others) {
            Ok(ExceptionChoice::Others)
        } else {
            Ok(ExceptionChoice::Name(self.parse_expanded_name()?))
        }
    }

    /// `accept ENTRY [(FORMALS)] [do ... end [ENTRY]];`
    fn parse_accept_statement(&mut self) -> Result<Statement, ParseErr> {
        let start = self.expect(Token::Accept, "accept")?.get_span();
        let entry = self.parse_identifier()?;

        let params = if self.at(Token::LeftParenthesis) {
            self.parse_formal_part()?
        } else {
            Vec::new()
        };

        let body = if self.accept(Token::Do) {
            let statements = self.parse_statement_sequence();
            self.expect(Token::End, "end")?;
            if self.at(Token::Identifier) {
                self.advance()?;
            }
            Some(statements)
        } else {
            None
        };
        self.expect(Token::Semicolon, ";")?;

        let span = self.span_from(start);
        Ok(Statement::new(
            StatementKind::Accept {
                entry,
                params,
                body,
                span,
                sym: None,
            },
            span,
        ))
    }

    /// `select [when G =>] ALTERNATIVE {or ...} [else ...] end
    /// select;`
    fn parse_select_statement(&mut self) -> Result<Statement, ParseErr> {
        let start = self.expect(Token::Select, "select")?.get_span();

        let mut arms = vec![self.parse_select_arm()?];
        while self.accept(Token::Or) {
            arms.push(self.parse_select_arm()?);
        }

        let else_arm = if self.accept(Token::Else) {
            Some(self.parse_statement_sequence())
        } else {
            None
        };

        self.expect(Token::End, "end")?;
        self.expect(Token::Select, "select")?;
        self.expect(Token::Semicolon, ";")?;

        Ok(Statement::new(
            StatementKind::Select { arms, else_arm },
            self.span_from(start),
        ))
    }

    fn parse_select_arm(&mut self) -> Result<SelectArm, ParseErr> {
        let start = self.peek()?.get_span();

        let guard = if self.accept(Token::When) {
            let condition = self.parse_expression()?;
            self.expect(Token::Arrow, "=>")?;
            Some(condition)
        } else {
            None
        };

        let token = self.peek()?;
        let kind = match token.get_token() {
            Token::Accept => {
                let accept = self.parse_accept_statement()?;
                let statements = self.parse_statement_sequence();
                SelectArmKind::Accept {
                    accept: Box::new(accept),
                    statements,
                }
            }
            Token::Delay => {
                self.advance()?;
                let delay = self.parse_expression()?;
                self.expect(Token::Semicolon, ";")?;
                let statements = self.parse_statement_sequence();
                SelectArmKind::Delay { delay, statements }
            }
            Token::Terminate => {
                self.advance()?;
                self.expect(Token::Semicolon, ";")?;
                SelectArmKind::Terminate
            }
            _ => {
                return Err(ParseErr::expected(
                    "accept, delay or terminate alternative",
                    &token,
                    &self.source_map,
                ));
            }
        };

        Ok(SelectArm {
            guard,
            kind,
            span: self.span_from(start),
        })
    }
}
