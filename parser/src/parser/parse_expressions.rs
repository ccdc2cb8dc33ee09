// Expression parsing.
//
// Operator precedence follows the Ada reference manual: logical,
// relational and membership, binary adding, multiplying, and the
// highest level (**, abs, not). Binary operators parse by precedence
// climbing driven by `Token::precedence`; names parse as a postfix
// chain on a simple name (selection, application, attributes,
// qualification).

use super::parse_err::ParseErr;
use super::Parser;
use crate::ast::*;
use lexer::Token;
use shared_context::univ;

impl<'src, 'ctx> Parser<'src, 'ctx> {
    /// Parse a full expression.
    pub(crate) fn parse_expression(&mut self) -> Result<Expression, ParseErr> {
        self.parse_expression_prec(1)
    }

    /// Parse a simple expression: no logical, relational or
    /// membership operators. Ranges and choices are built from
    /// these.
    pub(crate) fn parse_simple_expression(&mut self) -> Result<Expression, ParseErr> {
        self.parse_expression_prec(25)
    }

    /// Precedence-climbing loop. `min_prec` is the loosest operator
    /// level that may be consumed.
    fn parse_expression_prec(&mut self, min_prec: usize) -> Result<Expression, ParseErr> {
        let mut left = self.parse_unary()?;

        loop {
            let token = match self.peek() {
                Ok(token) => token,
                Err(_) => break,
            };
            let kind = token.get_token();

            // `not in` membership sits at relational precedence
            if kind == Token::Not && min_prec <= 20 {
                self.advance()?;
                self.expect(Token::In, "in")?;
                left = self.parse_membership(left, true)?;
                continue;
            }

            if !kind.is_binary_operator() || kind.precedence() < min_prec {
                break;
            }
            self.advance()?;

            if kind == Token::In {
                left = self.parse_membership(left, false)?;
                continue;
            }

            // short-circuit forms are spelled with a second keyword
            if kind == Token::And && self.accept(Token::Then) {
                let right = self.parse_expression_prec(11)?;
                let span = left.span.to(right.span);
                left = Expression::new(
                    ExprKind::ShortCircuit {
                        op: ShortCircuitOp::AndThen,
                        left: Box::new(left),
                        right: Box::new(right),
                    },
                    span,
                );
                continue;
            }
            if kind == Token::Or && self.accept(Token::Else) {
                let right = self.parse_expression_prec(11)?;
                let span = left.span.to(right.span);
                left = Expression::new(
                    ExprKind::ShortCircuit {
                        op: ShortCircuitOp::OrElse,
                        left: Box::new(left),
                        right: Box::new(right),
                    },
                    span,
                );
                continue;
            }

            // ** is right associative, everything else left
            let next_min = if kind == Token::StarStar {
                kind.precedence()
            } else {
                kind.precedence() + 1
            };
            let right = self.parse_expression_prec(next_min)?;
            let span = left.span.to(right.span);
            left = Expression::new(
                ExprKind::Binary {
                    op: Parser::binary_op_for(kind),
                    left: Box::new(left),
                    right: Box::new(right),
                },
                span,
            );
        }

        Ok(left)
    }

    /// `X in A .. B` or `X in MARK`; the `in`/`not in` token is
    /// already consumed.
    fn parse_membership(
        &mut self,
        operand: Expression,
        negated: bool,
    ) -> Result<Expression, ParseErr> {
        let first = self.parse_simple_expression()?;
        let target = if self.accept(Token::DotDot) {
            let high = self.parse_simple_expression()?;
            let span = first.span.to(high.span);
            MembershipTarget::Range(RangeExpr {
                low: first,
                high,
                span,
            })
        } else {
            MembershipTarget::Mark(first)
        };
        let span = self.span_from(operand.span);
        Ok(Expression::new(
            ExprKind::Membership {
                negated,
                operand: Box::new(operand),
                target: Box::new(target),
            },
            span,
        ))
    }

    fn parse_unary(&mut self) -> Result<Expression, ParseErr> {
        let token = self.peek()?;
        let (op, operand_prec) = match token.get_token() {
            // unary adding operators bind looser than multiplying ones
            Token::Add => (UnaryOp::Plus, 35),
            Token::Neg => (UnaryOp::Minus, 35),
            Token::Not => (UnaryOp::Not, 45),
            Token::Abs => (UnaryOp::Abs, 45),
            _ => return self.parse_primary(),
        };
        let start = token.get_span();
        self.advance()?;
        let operand = self.parse_expression_prec(operand_prec)?;
        let span = start.to(operand.span);
        Ok(Expression::new(
            ExprKind::Unary {
                op,
                operand: Box::new(operand),
            },
            span,
        ))
    }

    fn parse_primary(&mut self) -> Result<Expression, ParseErr> {
        let token = self.peek()?;
        match token.get_token() {
            Token::ConstantInt => {
                self.advance()?;
                let span = token.get_span();
                match univ::parse_integer_literal(token.get_lexeme()) {
                    Some(value) => Ok(Expression::new(ExprKind::IntLiteral(value), span)),
                    None => {
                        self.report_lexical("malformed integer literal", &token);
                        Ok(Expression::new(
                            ExprKind::IntLiteral(univ::UInt::from_i64(0)),
                            span,
                        ))
                    }
                }
            }
            Token::ConstantReal => {
                self.advance()?;
                let span = token.get_span();
                match univ::parse_real_literal(token.get_lexeme()) {
                    Some(value) => Ok(Expression::new(ExprKind::RealLiteral(value), span)),
                    None => {
                        self.report_lexical("malformed real literal", &token);
                        let zero = univ::parse_real_literal("0.0").unwrap();
                        Ok(Expression::new(ExprKind::RealLiteral(zero), span))
                    }
                }
            }
            Token::ConstantChar => {
                self.advance()?;
                let lexeme = token.get_lexeme();
                // lexeme shape is 'x' or '''
                let value = lexeme.chars().nth(1).unwrap_or('\'');
                Ok(Expression::new(
                    ExprKind::CharLiteral(value),
                    token.get_span(),
                ))
            }
            Token::ConstantString => {
                self.advance()?;
                let decoded = Parser::decode_string(token.get_lexeme());
                let symbol = self.ctx.interner.intern(&decoded);
                Ok(Expression::new(
                    ExprKind::StringLiteral(symbol),
                    token.get_span(),
                ))
            }
            Token::Null => {
                self.advance()?;
                Ok(Expression::new(ExprKind::NullLiteral, token.get_span()))
            }
            Token::New => self.parse_allocator(),
            Token::Identifier => self.parse_name(),
            Token::LeftParenthesis => self.parse_paren_or_aggregate(),
            _ => Err(ParseErr::expected(
                "expression",
                &token,
                &self.source_map,
            )),
        }
    }

    /// Parse a name: a simple name followed by any chain of selected
    /// components, applications, slices, attributes, and qualified
    /// expressions.
    pub(crate) fn parse_name(&mut self) -> Result<Expression, ParseErr> {
        let ident = self.parse_identifier()?;
        let mut name = Expression::new(ExprKind::Identifier(ident), ident.span);

        loop {
            let token = match self.peek() {
                Ok(token) => token,
                Err(_) => break,
            };
            match token.get_token() {
                Token::Dot => {
                    self.advance()?;
                    // `.all` is an explicit dereference, carried as a
                    // selection with the reserved word's symbol
                    let selector = if self.at(Token::All) {
                        let all = self.advance()?;
                        let symbol = self.ctx.interner.intern_folded("all");
                        shared_context::Ident::new(symbol, all.get_span())
                    } else {
                        self.parse_identifier()?
                    };
                    let span = name.span.to(selector.span);
                    name = Expression::new(
                        ExprKind::Selected {
                            prefix: Box::new(name),
                            selector,
                        },
                        span,
                    );
                }
                Token::LeftParenthesis => {
                    self.advance()?;
                    name = self.parse_application(name)?;
                }
                Token::Tick => {
                    self.advance()?;
                    if self.at(Token::LeftParenthesis) {
                        // qualified expression MARK'(X)
                        self.advance()?;
                        let operand = self.parse_paren_tail()?;
                        let span = self.span_from(name.span);
                        name = Expression::new(
                            ExprKind::Qualified {
                                mark: Box::new(name),
                                operand: Box::new(operand),
                            },
                            span,
                        );
                    } else {
                        name = self.parse_attribute(name)?;
                    }
                }
                _ => break,
            }
        }

        Ok(name)
    }

    /// A dotted name only: no application, attributes, or
    /// qualification. Used where the grammar wants a bare type mark,
    /// as in allocators.
    pub(crate) fn parse_expanded_name(&mut self) -> Result<Expression, ParseErr> {
        let ident = self.parse_identifier()?;
        let mut name = Expression::new(ExprKind::Identifier(ident), ident.span);
        while self.at(Token::Dot) {
            self.advance()?;
            let selector = self.parse_identifier()?;
            let span = name.span.to(selector.span);
            name = Expression::new(
                ExprKind::Selected {
                    prefix: Box::new(name),
                    selector,
                },
                span,
            );
        }
        Ok(name)
    }

    /// The part after `NAME(`: either a slice (single discrete range)
    /// or an argument list. The opening parenthesis is consumed.
    fn parse_application(&mut self, prefix: Expression) -> Result<Expression, ParseErr> {
        // slice detection: a single `low .. high` element
        let first = self.parse_argument()?;
        if first.name.is_none() && self.at(Token::DotDot) {
            self.advance()?;
            let high = self.parse_simple_expression()?;
            let low = first.value;
            let range_span = low.span.to(high.span);
            self.expect(Token::RightParenthesis, ")")?;
            let span = self.span_from(prefix.span);
            return Ok(Expression::new(
                ExprKind::Slice {
                    prefix: Box::new(prefix),
                    range: Box::new(RangeExpr {
                        low,
                        high,
                        span: range_span,
                    }),
                },
                span,
            ));
        }

        let mut args = vec![first];
        while self.accept(Token::Comma) {
            args.push(self.parse_argument()?);
        }
        self.expect(Token::RightParenthesis, ")")?;

        let span = self.span_from(prefix.span);
        Ok(Expression::new(
            ExprKind::ApplyUnresolved {
                prefix: Box::new(prefix),
                args,
            },
            span,
        ))
    }

    /// One actual parameter, positional or named.
    pub(crate) fn parse_argument(&mut self) -> Result<Argument, ParseErr> {
        let value = self.parse_expression()?;
        if let ExprKind::Identifier(formal) = &value.kind {
            let formal = *formal;
            if self.accept(Token::Arrow) {
                let actual = self.parse_expression()?;
                let span = value.span.to(actual.span);
                return Ok(Argument {
                    name: Some(formal),
                    value: actual,
                    span,
                });
            }
        }
        let span = value.span;
        Ok(Argument {
            name: None,
            value,
            span,
        })
    }

    /// `PREFIX'DESIGNATOR [(ARG)]`. The tick is consumed. RANGE,
    /// DIGITS and DELTA are keywords that double as attribute
    /// designators.
    fn parse_attribute(&mut self, prefix: Expression) -> Result<Expression, ParseErr> {
        let token = self.peek()?;
        let attribute = match token.get_token() {
            Token::Identifier => self.parse_identifier()?,
            Token::Range | Token::Digits | Token::Delta => {
                self.advance()?;
                let symbol = self.ctx.interner.intern_folded(token.get_lexeme());
                shared_context::Ident::new(symbol, token.get_span())
            }
            _ => {
                return Err(ParseErr::expected(
                    "attribute designator",
                    &token,
                    &self.source_map,
                ));
            }
        };

        let arg = if self.at(Token::LeftParenthesis) {
            self.advance()?;
            let arg = self.parse_expression()?;
            self.expect(Token::RightParenthesis, ")")?;
            Some(Box::new(arg))
        } else {
            None
        };

        let span = self.span_from(prefix.span);
        Ok(Expression::new(
            ExprKind::Attribute {
                prefix: Box::new(prefix),
                attribute,
                arg,
            },
            span,
        ))
    }

    /// `new MARK`, `new MARK(CONSTRAINT)`, or `new MARK'(INIT)`.
    fn parse_allocator(&mut self) -> Result<Expression, ParseErr> {
        let start = self.expect(Token::New, "new")?.get_span();
        let mark = self.parse_expanded_name()?;

        // qualified initial value
        if self.at(Token::Tick) {
            self.advance()?;
            self.expect(Token::LeftParenthesis, "(")?;
            let initial = self.parse_paren_tail()?;
            let span = self.span_from(start);
            let subtype = SubtypeIndication {
                span: mark.span,
                mark,
                constraint: None,
                ty: shared_context::types::TypeId::INVALID,
            };
            return Ok(Expression::new(
                ExprKind::Allocator {
                    subtype: Box::new(subtype),
                    initial: Some(Box::new(initial)),
                },
                span,
            ));
        }

        // optional constraint
        let constraint = if self.at(Token::LeftParenthesis) {
            self.advance()?;
            let mut elems = vec![self.parse_constraint_element()?];
            while self.accept(Token::Comma) {
                elems.push(self.parse_constraint_element()?);
            }
            self.expect(Token::RightParenthesis, ")")?;
            Some(AstConstraint::Composite(elems))
        } else {
            None
        };

        let span = self.span_from(start);
        let subtype = SubtypeIndication {
            span: mark.span,
            mark,
            constraint,
            ty: shared_context::types::TypeId::INVALID,
        };
        Ok(Expression::new(
            ExprKind::Allocator {
                subtype: Box::new(subtype),
                initial: None,
            },
            span,
        ))
    }

    /// After `(`: a parenthesized expression or an aggregate. The
    /// closing parenthesis is consumed.
    fn parse_paren_or_aggregate(&mut self) -> Result<Expression, ParseErr> {
        let start = self.expect(Token::LeftParenthesis, "(")?.get_span();
        let expr = self.parse_paren_tail()?;
        Ok(Expression { span: self.span_from(start), ..expr })
    }

    /// Body shared by parenthesized expressions, aggregates, and
    /// qualified expressions: the opening parenthesis is already
    /// consumed, the closing one is consumed here.
    pub(crate) fn parse_paren_tail(&mut self) -> Result<Expression, ParseErr> {
        let mut items: Vec<AggregateItem> = Vec::new();
        let mut plain = true; // stays true for a single positional element

        loop {
            let item = self.parse_aggregate_item()?;
            if !item.choices.is_empty() {
                plain = false;
            }
            items.push(item);
            if !self.accept(Token::Comma) {
                break;
            }
            plain = false;
        }
        let end = self.expect(Token::RightParenthesis, ")")?.get_span();

        if plain && items.len() == 1 {
            return Ok(items.pop().unwrap().value);
        }

        let span = items
            .first()
            .map(|item| item.span)
            .unwrap_or(end)
            .to(end);
        Ok(Expression::new(ExprKind::Aggregate { items }, span))
    }

    /// One aggregate element: `[choice {| choice} =>] expression`.
    fn parse_aggregate_item(&mut self) -> Result<AggregateItem, ParseErr> {
        let token = self.peek()?;
        let start = token.get_span();

        if token.get_token() == Token::Others {
            self.advance()?;
            self.expect(Token::Arrow, "=>")?;
            let value = self.parse_expression()?;
            let span = start.to(value.span);
            return Ok(AggregateItem {
                choices: vec![ChoiceNode {
                    kind: ChoiceKind::Others,
                    value: None,
                    span: start,
                }],
                value,
                field: None,
                span,
            });
        }

        let first = self.parse_expression()?;

        // `expr .. expr` or `expr | expr` or `expr =>` make this a
        // choice list; a bare expression is a positional element
        if !self.at(Token::DotDot) && !self.at(Token::Bar) && !self.at(Token::Arrow) {
            let span = first.span;
            return Ok(AggregateItem {
                choices: Vec::new(),
                value: first,
                field: None,
                span,
            });
        }

        let mut choices = vec![self.finish_choice(first)?];
        while self.accept(Token::Bar) {
            let choice = self.parse_choice()?;
            choices.push(choice);
        }
        self.expect(Token::Arrow, "=>")?;
        let value = self.parse_expression()?;
        let span = start.to(value.span);
        Ok(AggregateItem {
            choices,
            value,
            field: None,
            span,
        })
    }

    /// One choice in a case arm, variant part, or aggregate.
    pub(crate) fn parse_choice(&mut self) -> Result<ChoiceNode, ParseErr> {
        let token = self.peek()?;
        if token.get_token() == Token::Others {
            self.advance()?;
            return Ok(ChoiceNode {
                kind: ChoiceKind::Others,
                value: None,
                span: token.get_span(),
            });
        }
        let first = self.parse_simple_expression()?;
        self.finish_choice(first)
    }

    /// Complete a choice whose first expression is parsed: attach the
    /// high bound when a `..` follows.
    fn finish_choice(&mut self, first: Expression) -> Result<ChoiceNode, ParseErr> {
        if self.accept(Token::DotDot) {
            let high = self.parse_simple_expression()?;
            let span = first.span.to(high.span);
            Ok(ChoiceNode {
                kind: ChoiceKind::Range(RangeExpr {
                    low: first,
                    high,
                    span,
                }),
                value: None,
                span,
            })
        } else {
            let span = first.span;
            Ok(ChoiceNode {
                kind: ChoiceKind::Expr(first),
                value: None,
                span,
            })
        }
    }

    /// Undo the lexical escapes of a string literal: drop the outer
    /// quotes and halve doubled ones.
    fn decode_string(lexeme: &str) -> String {
        let inner = &lexeme[1..lexeme.len().saturating_sub(1)];
        inner.replace("\"\"", "\"")
    }

    fn binary_op_for(token: Token) -> BinaryOp {
        match token {
            Token::Add => BinaryOp::Add,
            Token::Neg => BinaryOp::Sub,
            Token::Mul => BinaryOp::Mul,
            Token::Div => BinaryOp::Div,
            Token::Mod => BinaryOp::Mod,
            Token::Rem => BinaryOp::Rem,
            Token::StarStar => BinaryOp::Pow,
            Token::Equal => BinaryOp::Eq,
            Token::NotEqual => BinaryOp::Neq,
            Token::LessThan => BinaryOp::Lt,
            Token::LessThanOrEq => BinaryOp::Le,
            Token::GreaterThan => BinaryOp::Gt,
            Token::GreaterThanOrEq => BinaryOp::Ge,
            Token::And => BinaryOp::And,
            Token::Or => BinaryOp::Or,
            Token::Xor => BinaryOp::Xor,
            Token::Ampersand => BinaryOp::Concat,
            _ => unreachable!("not a binary operator token"),
        }
    }
}
