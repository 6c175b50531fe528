use std::{iter::Peekable, slice::Iter};

use crate::{
    ast::{BinOp, Expr, Item, Literal, LogicalOp, Source, UnaryOp},
    error::SlayError,
    token::{Token, TokenKind},
};

#[derive(Debug)]
pub struct Parser<'a> {
    stream: Peekable<Iter<'a, Token>>,
}

impl<'a> Parser<'a> {
    pub fn new(stream: &'a [Token]) -> Self {
        Self {
            stream: stream.iter().peekable(),
        }
    }

    /// Parses the token stream into a program. One syntax error aborts
    /// the parse; there is no recovery.
    pub fn parse_all(mut self) -> Result<Source, SlayError> {
        let mut items: Vec<Item> = Vec::default();
        loop {
            self.skip_newlines();
            if self.stream.peek().is_none() {
                break;
            }
            items.push(self.parse_item()?);
        }
        Ok(Source { items })
    }

    fn parse_item(&mut self) -> Result<Item, SlayError> {
        match self.stream.peek() {
            Some(&t) => match t.kind {
                TokenKind::CONJURE | TokenKind::SUMMON => self.parse_var_decl(),
                TokenKind::CONST => self.parse_const_decl(),
                TokenKind::TRANSMUTE => self.parse_reassignment(),
                TokenKind::VANQUISH => self.parse_delete(),
                TokenKind::SPELL | TokenKind::INCANTATION => self.parse_spell_decl(),
                TokenKind::CAST => self.parse_cast(),
                TokenKind::PROPHECY => self.parse_if(),
                TokenKind::PATROL => self.parse_until(),
                TokenKind::HUNT => self.parse_hunt(),
                TokenKind::BREAK => {
                    let line = t.line;
                    self.advance();
                    Ok(Item::Break { line })
                }
                TokenKind::CONTINUE => {
                    let line = t.line;
                    self.advance();
                    Ok(Item::Continue { line })
                }
                _ => Ok(Item::ExprStmt(self.parse_expr()?)),
            },
            None => Err(Self::eof_error("expected a statement")),
        }
    }

    /// conjure/summon name as value
    fn parse_var_decl(&mut self) -> Result<Item, SlayError> {
        let line = self.advance().map_or(0, |t| t.line);
        let name = self
            .advance_or_err(TokenKind::IDENT, "expected variable name")?
            .lexeme;
        self.advance_or_err(TokenKind::AS, "expected 'as' after variable name")?;
        let init = self.parse_expr()?;
        Ok(Item::VarDecl {
            name,
            init,
            is_const: false,
            line,
        })
    }

    /// const prophecy NAME as value
    fn parse_const_decl(&mut self) -> Result<Item, SlayError> {
        let line = self.advance().map_or(0, |t| t.line);
        self.advance_or_err(TokenKind::PROPHECY, "expected 'prophecy' after 'const'")?;
        let name = self
            .advance_or_err(TokenKind::IDENT, "expected constant name")?
            .lexeme;
        self.advance_or_err(TokenKind::AS, "expected 'as' after constant name")?;
        let init = self.parse_expr()?;
        Ok(Item::VarDecl {
            name,
            init,
            is_const: true,
            line,
        })
    }

    /// transmute name as value, or transmute collection[index] as value
    fn parse_reassignment(&mut self) -> Result<Item, SlayError> {
        let line = self.advance().map_or(0, |t| t.line);
        let target = self.parse_postfix()?;
        self.advance_or_err(TokenKind::AS, "expected 'as' after assignment target")?;
        let value = self.parse_expr()?;
        match target {
            Expr::Ident { name, .. } => Ok(Item::Reassign { name, value, line }),
            Expr::Index {
                collection, index, ..
            } => Ok(Item::IndexAssign {
                collection: *collection,
                index: *index,
                value,
                line,
            }),
            _ => Err(SlayError::miscast("invalid assignment target", line)),
        }
    }

    fn parse_delete(&mut self) -> Result<Item, SlayError> {
        let line = self.advance().map_or(0, |t| t.line);
        let name = self
            .advance_or_err(TokenKind::IDENT, "expected variable name to vanquish")?
            .lexeme;
        Ok(Item::Delete { name, line })
    }

    /// spell/incantation name(params) { body }
    fn parse_spell_decl(&mut self) -> Result<Item, SlayError> {
        let (announces_result, line) = match self.advance() {
            Some(t) => (t.kind == TokenKind::INCANTATION, t.line),
            None => return Err(Self::eof_error("expected spell declaration")),
        };
        let name = self
            .advance_or_err(TokenKind::IDENT, "expected spell name")?
            .lexeme;
        self.advance_or_err(TokenKind::LPAREN, "expected '(' after spell name")?;
        let mut params = vec![];
        if !self.check(TokenKind::RPAREN) {
            loop {
                params.push(
                    self.advance_or_err(TokenKind::IDENT, "expected parameter name")?
                        .lexeme,
                );
                if self.advance_if(|t| t.kind == TokenKind::COMMA).is_none() {
                    break;
                }
            }
        }
        self.advance_or_err(TokenKind::RPAREN, "expected ')' after parameters")?;
        let Item::Block(body) = self.parse_block()? else {
            unreachable!("parsing a block must return a block item")
        };
        Ok(Item::SpellDecl {
            name,
            params,
            body,
            announces_result,
            line,
        })
    }

    /// cast [value]
    fn parse_cast(&mut self) -> Result<Item, SlayError> {
        let line = self.advance().map_or(0, |t| t.line);
        let value = match self.stream.peek() {
            None => None,
            Some(t) if matches!(t.kind, TokenKind::NEWLINE | TokenKind::RBRACE) => None,
            Some(_) => Some(self.parse_expr()?),
        };
        Ok(Item::Cast { value, line })
    }

    /// prophecy reveals cond { .. } [otherwise prophecy cond { .. }]* [fate decrees { .. }]
    fn parse_if(&mut self) -> Result<Item, SlayError> {
        let line = self.advance().map_or(0, |t| t.line);
        self.advance_or_err(TokenKind::REVEALS, "expected 'reveals' after 'prophecy'")?;
        let condition = self.parse_expr()?;
        let then_branch = Box::new(self.parse_block()?);

        let mut elif_branches = vec![];
        let mut else_branch = None;
        loop {
            self.skip_newlines();
            if self.advance_if(|t| t.kind == TokenKind::OTHERWISE).is_some() {
                self.advance_or_err(
                    TokenKind::PROPHECY,
                    "expected 'prophecy' after 'otherwise'",
                )?;
                let elif_cond = self.parse_expr()?;
                let elif_body = self.parse_block()?;
                elif_branches.push((elif_cond, elif_body));
            } else if self.advance_if(|t| t.kind == TokenKind::FATE).is_some() {
                self.advance_or_err(TokenKind::DECREES, "expected 'decrees' after 'fate'")?;
                else_branch = Some(Box::new(self.parse_block()?));
                break;
            } else {
                break;
            }
        }

        Ok(Item::If {
            condition,
            then_branch,
            elif_branches,
            else_branch,
            line,
        })
    }

    /// patrol until cond { body }
    fn parse_until(&mut self) -> Result<Item, SlayError> {
        let line = self.advance().map_or(0, |t| t.line);
        self.advance_or_err(TokenKind::UNTIL, "expected 'until' after 'patrol'")?;
        let condition = self.parse_expr()?;
        let body = Box::new(self.parse_block()?);
        Ok(Item::Until {
            condition,
            body,
            line,
        })
    }

    /// hunt each name in collection { body }
    fn parse_hunt(&mut self) -> Result<Item, SlayError> {
        let line = self.advance().map_or(0, |t| t.line);
        self.advance_or_err(TokenKind::EACH, "expected 'each' after 'hunt'")?;
        let variable = self
            .advance_or_err(TokenKind::IDENT, "expected loop variable")?
            .lexeme;
        self.advance_or_err(TokenKind::IN, "expected 'in' after loop variable")?;
        let iterable = self.parse_expr()?;
        let body = Box::new(self.parse_block()?);
        Ok(Item::Hunt {
            variable,
            iterable,
            body,
            line,
        })
    }

    fn parse_block(&mut self) -> Result<Item, SlayError> {
        self.skip_newlines();
        self.advance_or_err(TokenKind::LBRACE, "expected '{' to begin block")?;
        let mut items = Vec::default();
        loop {
            self.skip_newlines();
            match self.stream.peek() {
                Some(t) if t.kind == TokenKind::RBRACE => break,
                Some(_) => items.push(self.parse_item()?),
                None => return Err(Self::eof_error("expected '}' to end block")),
            }
        }
        // Consume the closing brace
        self.advance();
        Ok(Item::Block(items))
    }

    // Expression parsing, lowest precedence first.

    fn parse_expr(&mut self) -> Result<Expr, SlayError> {
        self.parse_logical_or()
    }

    fn parse_logical_or(&mut self) -> Result<Expr, SlayError> {
        let mut lhs = self.parse_logical_and()?;
        while let Some(op) = self.advance_if(|t| t.kind == TokenKind::OR) {
            let line = op.line;
            let rhs = self.parse_logical_and()?;
            lhs = Expr::Logical {
                lhs: Box::new(lhs),
                op: LogicalOp::Or,
                rhs: Box::new(rhs),
                line,
            };
        }
        Ok(lhs)
    }

    fn parse_logical_and(&mut self) -> Result<Expr, SlayError> {
        let mut lhs = self.parse_eq()?;
        while let Some(op) = self.advance_if(|t| t.kind == TokenKind::AND) {
            let line = op.line;
            let rhs = self.parse_eq()?;
            lhs = Expr::Logical {
                lhs: Box::new(lhs),
                op: LogicalOp::And,
                rhs: Box::new(rhs),
                line,
            };
        }
        Ok(lhs)
    }

    fn parse_eq(&mut self) -> Result<Expr, SlayError> {
        let mut lhs = self.parse_cmp()?;
        while let Some(op) =
            self.advance_if(|t| matches!(t.kind, TokenKind::IS | TokenKind::ISNT))
        {
            let line = op.line;
            // Infallible unwrap as we are ensuring the right token kind above
            let bin_op =
                BinOp::from_token(op.kind).expect("non-binary operators cannot be present here");
            let rhs = self.parse_cmp()?;
            lhs = Expr::Binary {
                lhs: Box::new(lhs),
                op: bin_op,
                rhs: Box::new(rhs),
                line,
            };
        }
        Ok(lhs)
    }

    fn parse_cmp(&mut self) -> Result<Expr, SlayError> {
        let mut lhs = self.parse_term()?;
        while let Some(op) = self.advance_if(|t| {
            matches!(
                t.kind,
                TokenKind::EXCEEDS | TokenKind::UNDER | TokenKind::ATLEAST | TokenKind::ATMOST
            )
        }) {
            let line = op.line;
            // Infallible unwrap as we are ensuring the right token kind above
            let bin_op =
                BinOp::from_token(op.kind).expect("non-binary operators cannot be present here");
            let rhs = self.parse_term()?;
            lhs = Expr::Binary {
                lhs: Box::new(lhs),
                op: bin_op,
                rhs: Box::new(rhs),
                line,
            };
        }
        Ok(lhs)
    }

    fn parse_term(&mut self) -> Result<Expr, SlayError> {
        let mut lhs = self.parse_factor()?;
        while let Some(op) =
            self.advance_if(|t| matches!(t.kind, TokenKind::PLUS | TokenKind::MINUS))
        {
            let line = op.line;
            // Infallible unwrap as we are ensuring the right token kind above
            let bin_op =
                BinOp::from_token(op.kind).expect("non-binary operators cannot be present here");
            let rhs = self.parse_factor()?;
            lhs = Expr::Binary {
                lhs: Box::new(lhs),
                op: bin_op,
                rhs: Box::new(rhs),
                line,
            };
        }
        Ok(lhs)
    }

    fn parse_factor(&mut self) -> Result<Expr, SlayError> {
        let mut lhs = self.parse_power()?;
        while let Some(op) = self.advance_if(|t| {
            matches!(
                t.kind,
                TokenKind::STAR | TokenKind::SLASH | TokenKind::PERCENT
            )
        }) {
            let line = op.line;
            // Infallible unwrap as we are ensuring the right token kind above
            let bin_op =
                BinOp::from_token(op.kind).expect("non-binary operators cannot be present here");
            let rhs = self.parse_power()?;
            lhs = Expr::Binary {
                lhs: Box::new(lhs),
                op: bin_op,
                rhs: Box::new(rhs),
                line,
            };
        }
        Ok(lhs)
    }

    fn parse_power(&mut self) -> Result<Expr, SlayError> {
        let lhs = self.parse_unary()?;
        if let Some(op) = self.advance_if(|t| t.kind == TokenKind::POWER) {
            let line = op.line;
            // Right-associative
            let rhs = self.parse_power()?;
            return Ok(Expr::Binary {
                lhs: Box::new(lhs),
                op: BinOp::Power,
                rhs: Box::new(rhs),
                line,
            });
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> Result<Expr, SlayError> {
        if let Some(op) =
            self.advance_if(|t| matches!(t.kind, TokenKind::NOT | TokenKind::MINUS))
        {
            let line = op.line;
            // Infallible unwrap as we are ensuring the right token kind above
            let unary_op =
                UnaryOp::from_token(op.kind).expect("non-unary operators cannot be present here");
            let expr = self.parse_unary()?;
            return Ok(Expr::Unary {
                op: unary_op,
                expr: Box::new(expr),
                line,
            });
        }
        self.parse_postfix()
    }

    /// Calls, index access, and member access bind tighter than any
    /// operator and chain left to right.
    fn parse_postfix(&mut self) -> Result<Expr, SlayError> {
        let mut expr = self.parse_primary()?;
        loop {
            let Some(&&Token { kind, line, .. }) = self.stream.peek() else {
                break;
            };
            match kind {
                TokenKind::LPAREN => {
                    self.advance();
                    let mut args = vec![];
                    if !self.check(TokenKind::RPAREN) {
                        loop {
                            args.push(self.parse_expr()?);
                            if self.advance_if(|t| t.kind == TokenKind::COMMA).is_none() {
                                break;
                            }
                        }
                    }
                    self.advance_or_err(TokenKind::RPAREN, "expected ')' after arguments")?;
                    expr = Expr::Call {
                        callee: Box::new(expr),
                        args,
                        line,
                    };
                }
                TokenKind::LBRACKET => {
                    self.advance();
                    let index = self.parse_expr()?;
                    self.advance_or_err(TokenKind::RBRACKET, "expected ']' after index")?;
                    expr = Expr::Index {
                        collection: Box::new(expr),
                        index: Box::new(index),
                        line,
                    };
                }
                TokenKind::DOT => {
                    self.advance();
                    let member = self
                        .advance_or_err(TokenKind::IDENT, "expected member name after '.'")?
                        .lexeme;
                    expr = Expr::Member {
                        object: Box::new(expr),
                        member,
                        line,
                    };
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    fn parse_primary(&mut self) -> Result<Expr, SlayError> {
        let Some(t) = self.advance() else {
            return Err(Self::eof_error("expected an expression"));
        };
        let line = t.line;
        let value = match t.kind {
            TokenKind::INTEGER => Literal::Int(Self::parse_int(t)?),
            TokenKind::FLOAT => Literal::Float(Self::parse_float(t)?),
            TokenKind::STRING => Literal::Str(t.lexeme.clone()),
            TokenKind::TRUE => Literal::Boolean(true),
            TokenKind::FALSE => Literal::Boolean(false),
            TokenKind::VOID => Literal::Void,
            // Type-annotated literals: scroll "x", rune 5, potion 2.5, charm true
            TokenKind::SCROLL => {
                let s = self.advance_or_err(TokenKind::STRING, "expected string after 'scroll'")?;
                Literal::Str(s.lexeme)
            }
            TokenKind::RUNE => {
                let n = self.advance_or_err(TokenKind::INTEGER, "expected integer after 'rune'")?;
                Literal::Int(Self::parse_int(&n)?)
            }
            TokenKind::POTION => {
                // A potion accepts an integer literal and promotes it
                match self.advance_if(|t| t.kind == TokenKind::FLOAT) {
                    Some(n) => Literal::Float(Self::parse_float(n)?),
                    None => {
                        let n = self
                            .advance_or_err(TokenKind::INTEGER, "expected number after 'potion'")?;
                        Literal::Float(Self::parse_int(&n)? as f64)
                    }
                }
            }
            TokenKind::CHARM => {
                if self.advance_if(|t| t.kind == TokenKind::TRUE).is_some() {
                    Literal::Boolean(true)
                } else if self.advance_if(|t| t.kind == TokenKind::FALSE).is_some() {
                    Literal::Boolean(false)
                } else {
                    return Err(SlayError::miscast(
                        "expected 'true' or 'false' after 'charm'",
                        line,
                    ));
                }
            }
            TokenKind::TOME => {
                self.advance_or_err(TokenKind::LBRACKET, "expected '[' after 'tome'")?;
                return self.parse_list_literal(line);
            }
            TokenKind::GRIMOIRE => {
                self.advance_or_err(TokenKind::LBRACE, "expected '{' after 'grimoire'")?;
                return self.parse_dict_literal(line);
            }
            TokenKind::LBRACKET => return self.parse_list_literal(line),
            TokenKind::LBRACE => return self.parse_dict_literal(line),
            TokenKind::IDENT => {
                return Ok(Expr::Ident {
                    name: t.lexeme.clone(),
                    line,
                })
            }
            TokenKind::LPAREN => {
                let expr = self.parse_expr()?;
                self.advance_or_err(TokenKind::RPAREN, "expected ')' after expression")?;
                return Ok(expr);
            }
            _ => {
                return Err(SlayError::miscast(
                    format!("unexpected token '{t}'"),
                    line,
                ))
            }
        };
        Ok(Expr::Literal { value, line })
    }

    /// Elements after the opening bracket; trailing commas are allowed.
    fn parse_list_literal(&mut self, line: usize) -> Result<Expr, SlayError> {
        let mut elements = vec![];
        if !self.check(TokenKind::RBRACKET) {
            loop {
                elements.push(self.parse_expr()?);
                if self.advance_if(|t| t.kind == TokenKind::COMMA).is_none()
                    || self.check(TokenKind::RBRACKET)
                {
                    break;
                }
            }
        }
        self.advance_or_err(TokenKind::RBRACKET, "expected ']' after list elements")?;
        Ok(Expr::Tome { elements, line })
    }

    /// Pairs after the opening brace; trailing commas are allowed.
    fn parse_dict_literal(&mut self, line: usize) -> Result<Expr, SlayError> {
        let mut pairs = vec![];
        if !self.check(TokenKind::RBRACE) {
            loop {
                let key = self.parse_expr()?;
                self.advance_or_err(TokenKind::COLON, "expected ':' after dictionary key")?;
                let value = self.parse_expr()?;
                pairs.push((key, value));
                if self.advance_if(|t| t.kind == TokenKind::COMMA).is_none()
                    || self.check(TokenKind::RBRACE)
                {
                    break;
                }
            }
        }
        self.advance_or_err(TokenKind::RBRACE, "expected '}' after dictionary")?;
        Ok(Expr::Grimoire { pairs, line })
    }

    // Helper methods

    fn parse_int(t: &Token) -> Result<i64, SlayError> {
        t.lexeme
            .parse()
            .map_err(|_| SlayError::miscast("rune literal out of range", t.line))
    }

    fn parse_float(t: &Token) -> Result<f64, SlayError> {
        t.lexeme
            .parse()
            .map_err(|_| SlayError::miscast("malformed potion literal", t.line))
    }

    fn skip_newlines(&mut self) {
        while self
            .advance_if(|t| t.kind == TokenKind::NEWLINE)
            .is_some()
        {}
    }

    fn advance(&mut self) -> Option<&'a Token> {
        self.stream.next()
    }

    fn advance_if<F>(&mut self, cond: F) -> Option<&'a Token>
    where
        F: FnOnce(&Token) -> bool,
    {
        if self.stream.peek().filter(|&&t| cond(t)).is_some() {
            self.advance()
        } else {
            None
        }
    }

    fn advance_or_err(&mut self, kind: TokenKind, msg: &str) -> Result<Token, SlayError> {
        match self.stream.peek() {
            Some(&t) => {
                if t.kind == kind {
                    self.advance();
                    Ok(t.clone())
                } else {
                    Err(SlayError::miscast(
                        format!("{msg}, found '{t}'"),
                        t.line,
                    ))
                }
            }
            None => Err(Self::eof_error(msg)),
        }
    }

    fn check(&mut self, kind: TokenKind) -> bool {
        self.stream.peek().is_some_and(|t| t.kind == kind)
    }

    fn eof_error(msg: &str) -> SlayError {
        SlayError::new(
            crate::error::ErrorKind::SpellMiscast,
            format!("{msg}, found end of stream"),
            None,
        )
    }
}
