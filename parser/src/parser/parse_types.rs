// Parsing of type declarations, subtype indications, and discrete
// ranges.

use super::Parser;
use super::parse_err::ParseErr;
use crate::ast::*;
use lexer::Token;
use shared_context::types::TypeId;

impl<'src, 'ctx> Parser<'src, 'ctx> {
    /// `type NAME [discriminant_part] is DEFINITION;` and the
    /// incomplete form `type NAME;`.
    pub(crate) fn parse_type_declaration(&mut self) -> Result<Declaration, ParseErr> {
        let start = self.expect(Token::Type, "type")?.get_span();
        let name = self.parse_identifier()?;

        let discriminants = if self.at(Token::LeftParenthesis) {
            self.parse_discriminant_part()?
        } else {
            Vec::new()
        };

        // incomplete type declaration, completed later in the region
        if self.accept(Token::Semicolon) {
            return Ok(Declaration::Type(TypeDecl {
                name,
                discriminants,
                def: TypeDef::Private { limited: false },
                span: self.span_from(start),
                ty: TypeId::INVALID,
            }));
        }

        self.expect(Token::Is, "is")?;
        let def = self.parse_type_definition()?;
        self.expect(Token::Semicolon, ";")?;

        Ok(Declaration::Type(TypeDecl {
            name,
            discriminants,
            def,
            span: self.span_from(start),
            ty: TypeId::INVALID,
        }))
    }

    /// `subtype NAME is SUBTYPE_INDICATION;`
    pub(crate) fn parse_subtype_declaration(&mut self) -> Result<Declaration, ParseErr> {
        let start = self.expect(Token::Subtype, "subtype")?.get_span();
        let name = self.parse_identifier()?;
        self.expect(Token::Is, "is")?;
        let subtype = self.parse_subtype_indication()?;
        self.expect(Token::Semicolon, ";")?;

        Ok(Declaration::Subtype(SubtypeDecl {
            name,
            subtype,
            span: self.span_from(start),
            ty: TypeId::INVALID,
        }))
    }

    fn parse_type_definition(&mut self) -> Result<TypeDef, ParseErr> {
        let token = self.peek()?;
        match token.get_token() {
            Token::Range => {
                self.advance()?;
                let range = self.parse_range_expr()?;
                Ok(TypeDef::Range(range))
            }
            Token::LeftParenthesis => self.parse_enumeration_definition(),
            Token::Digits => {
                self.advance()?;
                let digits = self.parse_simple_expression()?;
                let range = if self.accept(Token::Range) {
                    Some(self.parse_range_expr()?)
                } else {
                    None
                };
                Ok(TypeDef::Float { digits, range })
            }
            Token::Delta => {
                self.advance()?;
                let delta = self.parse_simple_expression()?;
                let range = if self.accept(Token::Range) {
                    Some(self.parse_range_expr()?)
                } else {
                    None
                };
                Ok(TypeDef::Fixed { delta, range })
            }
            Token::Array => self.parse_array_definition(),
            Token::Record => self.parse_record_definition(),
            Token::Access => {
                self.advance()?;
                let designated = self.parse_subtype_indication()?;
                Ok(TypeDef::Access { designated })
            }
            Token::New => {
                self.advance()?;
                let parent = self.parse_subtype_indication()?;
                Ok(TypeDef::Derived { parent })
            }
            Token::Limited => {
                self.advance()?;
                self.expect(Token::Private, "private")?;
                Ok(TypeDef::Private { limited: true })
            }
            Token::Private => {
                self.advance()?;
                Ok(TypeDef::Private { limited: false })
            }
            _ => Err(ParseErr::expected(
                "type definition",
                &token,
                &self.source_map,
            )),
        }
    }

    /// `(IDENT | 'x' {, ...})`
    fn parse_enumeration_definition(&mut self) -> Result<TypeDef, ParseErr> {
        self.expect(Token::LeftParenthesis, "(")?;
        let mut literals = Vec::new();
        loop {
            let token = self.peek()?;
            match token.get_token() {
                Token::Identifier => {
                    let name = self.parse_identifier()?;
                    literals.push(EnumLiteral {
                        name,
                        is_char: false,
                    });
                }
                Token::ConstantChar => {
                    self.advance()?;
                    let lexeme = token.get_lexeme();
                    let symbol = self.ctx.interner.intern(lexeme);
                    literals.push(EnumLiteral {
                        name: shared_context::Ident::new(symbol, token.get_span()),
                        is_char: true,
                    });
                }
                _ => {
                    return Err(ParseErr::expected(
                        "enumeration literal",
                        &token,
                        &self.source_map,
                    ));
                }
            }
            if !self.accept(Token::Comma) {
                break;
            }
        }
        self.expect(Token::RightParenthesis, ")")?;
        Ok(TypeDef::Enumeration { literals })
    }

    /// `array (INDEX {, INDEX}) of COMPONENT`; the index positions of
    /// an unconstrained array are `MARK range <>`.
    pub(crate) fn parse_array_definition(&mut self) -> Result<TypeDef, ParseErr> {
        self.expect(Token::Array, "array")?;
        self.expect(Token::LeftParenthesis, "(")?;

        let mut indexes = Vec::new();
        let mut unconstrained = false;
        loop {
            let index = self.parse_discrete_range_or_box(&mut unconstrained)?;
            indexes.push(index);
            if !self.accept(Token::Comma) {
                break;
            }
        }
        self.expect(Token::RightParenthesis, ")")?;
        self.expect(Token::Of, "of")?;
        let component = self.parse_subtype_indication()?;

        Ok(TypeDef::Array {
            indexes,
            unconstrained,
            component,
        })
    }

    /// `record COMPONENTS [variant part] end record`, or the null
    /// record form.
    fn parse_record_definition(&mut self) -> Result<TypeDef, ParseErr> {
        self.expect(Token::Record, "record")?;

        // null record
        if self.accept(Token::Null) {
            self.expect(Token::Semicolon, ";")?;
            self.expect(Token::End, "end")?;
            self.expect(Token::Record, "record")?;
            return Ok(TypeDef::Record {
                components: Vec::new(),
                variant: None,
            });
        }

        let mut components = Vec::new();
        let mut variant = None;
        loop {
            let token = self.peek()?;
            match token.get_token() {
                Token::End => break,
                Token::Case => {
                    variant = Some(self.parse_variant_part()?);
                    break;
                }
                _ => components.push(self.parse_component_declaration()?),
            }
        }

        self.expect(Token::End, "end")?;
        self.expect(Token::Record, "record")?;
        Ok(TypeDef::Record {
            components,
            variant,
        })
    }

    /// `NAME {, NAME} : SUBTYPE_INDICATION [:= INIT];`
    fn parse_component_declaration(&mut self) -> Result<ComponentDecl, ParseErr> {
        let start = self.peek()?.get_span();
        let mut names = vec![self.parse_identifier()?];
        while self.accept(Token::Comma) {
            names.push(self.parse_identifier()?);
        }
        self.expect(Token::Colon, ":")?;
        let subtype = self.parse_subtype_indication()?;
        let init = if self.accept(Token::Assignment) {
            Some(self.parse_expression()?)
        } else {
            None
        };
        self.expect(Token::Semicolon, ";")?;

        Ok(ComponentDecl {
            names,
            subtype,
            init,
            span: self.span_from(start),
        })
    }

    /// `case DISCRIMINANT is {when CHOICES => COMPONENTS} end case;`
    fn parse_variant_part(&mut self) -> Result<AstVariantPart, ParseErr> {
        let start = self.expect(Token::Case, "case")?.get_span();
        let discriminant = self.parse_identifier()?;
        self.expect(Token::Is, "is")?;

        let mut arms = Vec::new();
        while self.at(Token::When) {
            let arm_start = self.advance()?.get_span();
            let mut choices = vec![self.parse_choice()?];
            while self.accept(Token::Bar) {
                choices.push(self.parse_choice()?);
            }
            self.expect(Token::Arrow, "=>")?;

            let mut components = Vec::new();
            // a variant arm is either `null;` or component declarations
            if self.accept(Token::Null) {
                self.expect(Token::Semicolon, ";")?;
            } else {
                while !self.at(Token::When) && !self.at(Token::End) {
                    components.push(self.parse_component_declaration()?);
                }
            }

            arms.push(AstVariantArm {
                choices,
                components,
                span: self.span_from(arm_start),
            });
        }

        self.expect(Token::End, "end")?;
        self.expect(Token::Case, "case")?;
        self.expect(Token::Semicolon, ";")?;

        Ok(AstVariantPart {
            discriminant,
            arms,
            span: self.span_from(start),
        })
    }

    /// `(NAME {, NAME} : MARK [:= DEFAULT]; ...)`
    fn parse_discriminant_part(&mut self) -> Result<Vec<DiscriminantSpec>, ParseErr> {
        self.expect(Token::LeftParenthesis, "(")?;
        let mut specs = Vec::new();
        loop {
            let start = self.peek()?.get_span();
            let mut names = vec![self.parse_identifier()?];
            while self.accept(Token::Comma) {
                names.push(self.parse_identifier()?);
            }
            self.expect(Token::Colon, ":")?;
            let mark = self.parse_expanded_name()?;
            let default = if self.accept(Token::Assignment) {
                Some(self.parse_expression()?)
            } else {
                None
            };
            specs.push(DiscriminantSpec {
                names,
                mark,
                default,
                span: self.span_from(start),
            });
            if !self.accept(Token::Semicolon) {
                break;
            }
        }
        self.expect(Token::RightParenthesis, ")")?;
        Ok(specs)
    }

    /// A subtype indication: a type mark with an optional range,
    /// accuracy, index, or discriminant constraint.
    pub(crate) fn parse_subtype_indication(&mut self) -> Result<SubtypeIndication, ParseErr> {
        let mark = self.parse_expanded_name()?;
        let start = mark.span;

        let constraint = if self.accept(Token::Range) {
            Some(AstConstraint::Range(self.parse_range_expr()?))
        } else if self.at(Token::LeftParenthesis) {
            self.advance()?;
            let mut args = vec![self.parse_constraint_element()?];
            while self.accept(Token::Comma) {
                args.push(self.parse_constraint_element()?);
            }
            self.expect(Token::RightParenthesis, ")")?;
            Some(AstConstraint::Composite(args))
        } else if self.at(Token::Digits) || self.at(Token::Delta) {
            let is_digits = self.advance()?.get_token() == Token::Digits;
            let amount = self.parse_simple_expression()?;
            let range = if self.accept(Token::Range) {
                Some(self.parse_range_expr()?)
            } else {
                None
            };
            Some(AstConstraint::Accuracy {
                is_digits,
                amount: Box::new(amount),
                range,
            })
        } else {
            None
        };

        Ok(SubtypeIndication {
            mark,
            constraint,
            span: self.span_from(start),
            ty: TypeId::INVALID,
        })
    }

    /// One element of a composite constraint. Index constraints allow
    /// ranges (`A(1 .. 10)`); discriminant constraints allow named
    /// associations. The analyzer disambiguates against the base
    /// type.
    pub(crate) fn parse_constraint_element(&mut self) -> Result<ConstraintElem, ParseErr> {
        let argument = self.parse_argument()?;
        if argument.name.is_none() && self.at(Token::DotDot) {
            self.advance()?;
            let high = self.parse_simple_expression()?;
            let low = argument.value;
            let span = low.span.to(high.span);
            return Ok(ConstraintElem {
                name: None,
                kind: ConstraintElemKind::Range(RangeExpr { low, high, span }),
                span,
            });
        }
        let span = argument.span;
        Ok(ConstraintElem {
            name: argument.name,
            kind: ConstraintElemKind::Expr(argument.value),
            span,
        })
    }

    /// `LOW .. HIGH`
    pub(crate) fn parse_range_expr(&mut self) -> Result<RangeExpr, ParseErr> {
        let low = self.parse_simple_expression()?;
        self.expect(Token::DotDot, "..")?;
        let high = self.parse_simple_expression()?;
        let span = low.span.to(high.span);
        Ok(RangeExpr { low, high, span })
    }

    /// A discrete range: `L .. H`, `MARK`, or `MARK range L .. H`.
    pub(crate) fn parse_discrete_range(&mut self) -> Result<DiscreteRange, ParseErr> {
        let mut unconstrained = false;
        let range = self.parse_discrete_range_or_box(&mut unconstrained)?;
        if unconstrained {
            return Err(ParseErr::new(
                "'range <>' is only legal in an array type definition".to_string(),
                &self.current_token,
                &self.source_map,
            ));
        }
        Ok(range)
    }

    /// Discrete range that also accepts the `MARK range <>` index
    /// form; sets `unconstrained` when the box appears.
    fn parse_discrete_range_or_box(
        &mut self,
        unconstrained: &mut bool,
    ) -> Result<DiscreteRange, ParseErr> {
        let start = self.peek()?.get_span();
        let first = self.parse_simple_expression()?;

        if self.accept(Token::DotDot) {
            let high = self.parse_simple_expression()?;
            let span = first.span.to(high.span);
            return Ok(DiscreteRange {
                mark: None,
                range: Some(RangeExpr {
                    low: first,
                    high,
                    span,
                }),
                span: self.span_from(start),
                ty: TypeId::INVALID,
            });
        }

        if self.accept(Token::Range) {
            if self.accept(Token::Box) {
                *unconstrained = true;
                return Ok(DiscreteRange {
                    mark: Some(first),
                    range: None,
                    span: self.span_from(start),
                    ty: TypeId::INVALID,
                });
            }
            let range = self.parse_range_expr()?;
            return Ok(DiscreteRange {
                mark: Some(first),
                range: Some(range),
                span: self.span_from(start),
                ty: TypeId::INVALID,
            });
        }

        Ok(DiscreteRange {
            mark: Some(first),
            range: None,
            span: self.span_from(start),
            ty: TypeId::INVALID,
        })
    }
}
