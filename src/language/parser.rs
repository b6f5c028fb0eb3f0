use crate::language::{
    ast::*,
    errors::{SyntaxError, SyntaxErrors},
    lexer::lex,
    span::{Location, Position, Span},
    token::{Token, TokenKind},
};
use crate::runtime::value::ValueKind;
use std::rc::Rc;

const NOT_PRECEDENCE: u8 = 3;

pub fn parse(file: &str, source: &str) -> Result<Vec<Statement>, SyntaxErrors> {
    let tokens = match lex(source, file) {
        Ok(tokens) => tokens,
        Err(errors) => {
            let file: Rc<str> = Rc::from(file);
            let errs = errors
                .into_iter()
                .map(|err| {
                    let location = location_for_span(&file, source, err.span);
                    SyntaxError::new(err.message, err.span, location)
                })
                .collect();
            return Err(SyntaxErrors::new(errs));
        }
    };
    Parser::new(tokens).parse()
}

fn location_for_span(file: &Rc<str>, source: &str, span: Span) -> Location {
    let position = |offset: usize| {
        let before = &source[..offset.min(source.len())];
        let line = before.matches('\n').count() + 1;
        let column = before.rfind('\n').map(|idx| offset - idx - 1).unwrap_or(offset);
        Position::new(line, column)
    };
    Location::new(file.clone(), position(span.start), position(span.end), span)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    errors: Vec<SyntaxError>,
    anonymous_functions: usize,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            pos: 0,
            errors: Vec::new(),
            anonymous_functions: 0,
        }
    }

    fn parse(mut self) -> Result<Vec<Statement>, SyntaxErrors> {
        let mut statements = Vec::new();

        loop {
            self.skip_separators();
            if self.is_eof() {
                break;
            }
            match self.parse_statement() {
                Ok(statement) => {
                    statements.push(statement);
                    if let Err(err) = self.expect_statement_end(&[]) {
                        self.report(err);
                        self.synchronize_line();
                    }
                }
                Err(err) => {
                    self.report(err);
                    self.synchronize_line();
                }
            }
        }

        if self.errors.is_empty() {
            Ok(statements)
        } else {
            Err(SyntaxErrors::new(self.errors))
        }
    }

    fn parse_statement(&mut self) -> Result<Statement, SyntaxError> {
        match self.peek_kind() {
            TokenKind::Function | TokenKind::Sub
                if matches!(self.peek_kind_n(1), TokenKind::Identifier(_)) =>
            {
                self.parse_function_declaration()
            }
            TokenKind::If => self.parse_if(),
            TokenKind::For => self.parse_for(),
            TokenKind::ForEach => self.parse_for_each(),
            TokenKind::While => self.parse_while(),
            TokenKind::Try => self.parse_try(),
            TokenKind::Print | TokenKind::Question => self.parse_print(),
            TokenKind::Return => {
                let start = self.advance().location.clone();
                let value = if self.at_statement_end() {
                    None
                } else {
                    Some(self.parse_expression()?)
                };
                Ok(Statement::Return {
                    value,
                    location: self.location_from(&start),
                })
            }
            TokenKind::ExitFor => Ok(Statement::ExitFor(self.advance().location.clone())),
            TokenKind::ExitWhile => Ok(Statement::ExitWhile(self.advance().location.clone())),
            TokenKind::ContinueFor => Ok(Statement::ContinueFor(self.advance().location.clone())),
            TokenKind::ContinueWhile => {
                Ok(Statement::ContinueWhile(self.advance().location.clone()))
            }
            TokenKind::End => Ok(Statement::End(self.advance().location.clone())),
            TokenKind::Stop => Ok(Statement::Stop(self.advance().location.clone())),
            TokenKind::Goto => {
                let start = self.advance().location.clone();
                let label = self.expect_identifier("Expected label after goto")?;
                Ok(Statement::Goto {
                    label,
                    location: self.location_from(&start),
                })
            }
            TokenKind::Dim => self.parse_dim(),
            TokenKind::Throw => {
                let start = self.advance().location.clone();
                let value = self.parse_expression()?;
                Ok(Statement::Throw {
                    value,
                    location: self.location_from(&start),
                })
            }
            TokenKind::Library => {
                let start = self.advance().location.clone();
                let path = self.expect_string_literal("Expected library path string")?;
                Ok(Statement::Library {
                    path,
                    location: self.location_from(&start),
                })
            }
            TokenKind::Identifier(_)
                if self.peek_kind_n(1) == TokenKind::Colon
                    && matches!(self.peek_kind_n(2), TokenKind::Newline | TokenKind::Eof) =>
            {
                let label = self.expect_identifier("Expected label")?;
                self.advance();
                Ok(Statement::Label(label))
            }
            _ => self.parse_simple_statement(),
        }
    }

    /// Assignment, setters, increments and call statements.
    fn parse_simple_statement(&mut self) -> Result<Statement, SyntaxError> {
        let start = self.current_location();
        let target = self.parse_postfix()?;

        let compound = match self.peek_kind() {
            TokenKind::Eq => None,
            TokenKind::PlusEq => Some(BinaryOp::Add),
            TokenKind::MinusEq => Some(BinaryOp::Subtract),
            TokenKind::StarEq => Some(BinaryOp::Multiply),
            TokenKind::SlashEq => Some(BinaryOp::Divide),
            TokenKind::BackslashEq => Some(BinaryOp::IntDivide),
            TokenKind::LtLtEq => Some(BinaryOp::LeftShift),
            TokenKind::GtGtEq => Some(BinaryOp::RightShift),
            TokenKind::PlusPlus | TokenKind::MinusMinus => {
                let op = if self.advance().kind == TokenKind::PlusPlus {
                    IncrementOp::Increment
                } else {
                    IncrementOp::Decrement
                };
                return match target {
                    Expr::Variable(_) | Expr::DottedGet { .. } | Expr::IndexedGet { .. } => {
                        Ok(Statement::Increment {
                            target,
                            op,
                            location: self.location_from(&start),
                        })
                    }
                    _ => Err(self.error_at(&start, "Invalid increment target")),
                };
            }
            _ => {
                return match target {
                    Expr::Call { .. } => Ok(Statement::Expression(target)),
                    _ => Err(self.error_at(&start, "Expected statement")),
                };
            }
        };
        self.advance();

        let rhs = self.parse_expression()?;
        let value = match compound {
            Some(op) => Expr::Binary {
                location: target.location().union(rhs.location()),
                left: Box::new(target.clone()),
                op,
                right: Box::new(rhs),
            },
            None => rhs,
        };
        let location = self.location_from(&start);

        match target {
            Expr::Variable(name) => Ok(Statement::Assignment {
                name,
                value,
                location,
            }),
            Expr::DottedGet { object, name, .. } => Ok(Statement::DottedSet {
                object: *object,
                name,
                value,
                location,
            }),
            Expr::IndexedGet {
                object,
                indexes,
                closing,
                ..
            } => Ok(Statement::IndexedSet {
                object: *object,
                indexes,
                value,
                closing,
                location,
            }),
            _ => Err(self.error_at(&start, "Invalid assignment target")),
        }
    }

    fn parse_function_declaration(&mut self) -> Result<Statement, SyntaxError> {
        let is_sub = self.advance().kind == TokenKind::Sub;
        let name = self.expect_identifier("Expected function name")?;
        let func = self.parse_function_rest(name.name.clone(), is_sub, name.location.clone())?;
        Ok(Statement::Function {
            name,
            func: Rc::new(func),
        })
    }

    fn parse_anonymous_function(&mut self) -> Result<Expr, SyntaxError> {
        let token = self.advance().clone();
        let is_sub = token.kind == TokenKind::Sub;
        let name = format!("$anon_{}", self.anonymous_functions);
        self.anonymous_functions += 1;
        let func = self.parse_function_rest(name, is_sub, token.location)?;
        Ok(Expr::Function(Rc::new(func)))
    }

    fn parse_function_rest(
        &mut self,
        name: String,
        is_sub: bool,
        start: Location,
    ) -> Result<FunctionExpr, SyntaxError> {
        self.expect(TokenKind::LParen)?;
        let mut params = Vec::new();
        if !self.check(TokenKind::RParen) {
            loop {
                params.push(self.parse_param()?);
                if !self.matches(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(TokenKind::RParen)?;

        let returns = if self.matches(TokenKind::As) {
            self.parse_type_name()?
        } else if is_sub {
            ValueKind::Void
        } else {
            ValueKind::Dynamic
        };

        let terminator = if is_sub {
            TokenKind::EndSub
        } else {
            TokenKind::EndFunction
        };
        let body = self.parse_block(&[terminator.clone()])?;
        self.expect(terminator)?;

        Ok(FunctionExpr {
            name,
            params,
            returns,
            is_sub,
            body,
            location: self.location_from(&start),
        })
    }

    fn parse_param(&mut self) -> Result<Param, SyntaxError> {
        let name = self.expect_identifier("Expected parameter name")?;
        let default = if self.matches(TokenKind::Eq) {
            Some(self.parse_expression()?)
        } else {
            None
        };
        let kind = if self.matches(TokenKind::As) {
            self.parse_type_name()?
        } else {
            match name.designator() {
                Some(designator) => ValueKind::from_designator(designator),
                None => ValueKind::Dynamic,
            }
        };
        Ok(Param {
            name,
            kind,
            default,
        })
    }

    fn parse_type_name(&mut self) -> Result<ValueKind, SyntaxError> {
        let token = self.advance().clone();
        token
            .kind
            .member_name()
            .and_then(|name| ValueKind::from_type_name(&name))
            .ok_or_else(|| {
                SyntaxError::new("Expected a type name", token.span, token.location.clone())
            })
    }

    fn parse_if(&mut self) -> Result<Statement, SyntaxError> {
        let start = self.advance().location.clone();
        let condition = self.parse_expression()?;
        self.matches(TokenKind::Then);

        if !self.check(TokenKind::Newline) && !self.check(TokenKind::Colon) {
            return self.parse_single_line_if(start, condition);
        }

        let then_branch =
            self.parse_block(&[TokenKind::ElseIf, TokenKind::Else, TokenKind::EndIf])?;
        let mut else_ifs = Vec::new();
        let mut else_branch = None;
        loop {
            if self.matches(TokenKind::ElseIf) {
                let condition = self.parse_expression()?;
                self.matches(TokenKind::Then);
                let block =
                    self.parse_block(&[TokenKind::ElseIf, TokenKind::Else, TokenKind::EndIf])?;
                else_ifs.push(ElseIf { condition, block });
            } else if self.matches(TokenKind::Else) {
                else_branch = Some(self.parse_block(&[TokenKind::EndIf])?);
            } else {
                break;
            }
        }
        self.expect(TokenKind::EndIf)?;

        Ok(Statement::If {
            condition,
            then_branch,
            else_ifs,
            else_branch,
            location: self.location_from(&start),
        })
    }

    fn parse_single_line_if(
        &mut self,
        start: Location,
        condition: Expr,
    ) -> Result<Statement, SyntaxError> {
        let then_branch = self.parse_inline_block()?;
        let mut else_ifs = Vec::new();
        let mut else_branch = None;
        loop {
            if self.matches(TokenKind::ElseIf) {
                let condition = self.parse_expression()?;
                self.matches(TokenKind::Then);
                let block = self.parse_inline_block()?;
                else_ifs.push(ElseIf { condition, block });
            } else if self.matches(TokenKind::Else) {
                else_branch = Some(self.parse_inline_block()?);
            } else {
                break;
            }
        }
        self.matches(TokenKind::EndIf);

        Ok(Statement::If {
            condition,
            then_branch,
            else_ifs,
            else_branch,
            location: self.location_from(&start),
        })
    }

    /// Colon-separated statements up to the end of the line or an `else`.
    fn parse_inline_block(&mut self) -> Result<Block, SyntaxError> {
        let start = self.current_location();
        let mut statements = Vec::new();
        loop {
            while self.matches(TokenKind::Colon) {}
            if matches!(
                self.peek_kind(),
                TokenKind::Newline
                    | TokenKind::Eof
                    | TokenKind::Else
                    | TokenKind::ElseIf
                    | TokenKind::EndIf
            ) {
                break;
            }
            statements.push(self.parse_statement()?);
        }
        Ok(Block {
            statements,
            location: self.location_from(&start),
        })
    }

    fn parse_for(&mut self) -> Result<Statement, SyntaxError> {
        let start = self.advance().location.clone();
        let counter = self.expect_identifier("Expected loop counter")?;
        self.expect(TokenKind::Eq)?;
        let start_value = self.parse_expression()?;
        self.expect(TokenKind::To)?;
        let final_value = self.parse_expression()?;
        let step = if self.matches(TokenKind::Step) {
            Some(self.parse_expression()?)
        } else {
            None
        };
        let body = self.parse_block(&[TokenKind::Next, TokenKind::EndFor])?;
        self.finish_for_loop()?;
        Ok(Statement::For {
            counter,
            start: start_value,
            final_value,
            step,
            body,
            location: self.location_from(&start),
        })
    }

    fn parse_for_each(&mut self) -> Result<Statement, SyntaxError> {
        let start = self.advance().location.clone();
        let item = self.expect_identifier("Expected loop variable")?;
        self.expect(TokenKind::In)?;
        let target = self.parse_expression()?;
        let body = self.parse_block(&[TokenKind::Next, TokenKind::EndFor])?;
        self.finish_for_loop()?;
        Ok(Statement::ForEach {
            item,
            target,
            body,
            location: self.location_from(&start),
        })
    }

    fn finish_for_loop(&mut self) -> Result<(), SyntaxError> {
        if self.matches(TokenKind::EndFor) {
            return Ok(());
        }
        self.expect(TokenKind::Next)?;
        if matches!(self.peek_kind(), TokenKind::Identifier(_)) {
            self.advance();
        }
        Ok(())
    }

    fn parse_while(&mut self) -> Result<Statement, SyntaxError> {
        let start = self.advance().location.clone();
        let condition = self.parse_expression()?;
        let body = self.parse_block(&[TokenKind::EndWhile])?;
        self.expect(TokenKind::EndWhile)?;
        Ok(Statement::While {
            condition,
            body,
            location: self.location_from(&start),
        })
    }

    fn parse_try(&mut self) -> Result<Statement, SyntaxError> {
        let start = self.advance().location.clone();
        let try_block = self.parse_block(&[TokenKind::Catch])?;
        self.expect(TokenKind::Catch)?;
        let error_binding = self.expect_identifier("Expected exception variable after catch")?;
        let catch_block = self.parse_block(&[TokenKind::EndTry])?;
        self.expect(TokenKind::EndTry)?;
        Ok(Statement::TryCatch {
            try_block,
            error_binding,
            catch_block,
            location: self.location_from(&start),
        })
    }

    fn parse_print(&mut self) -> Result<Statement, SyntaxError> {
        let start = self.advance().location.clone();
        let mut items = Vec::new();
        while !self.at_statement_end() {
            if self.matches(TokenKind::Comma) {
                items.push(PrintItem::Comma);
            } else if self.matches(TokenKind::Semi) {
                items.push(PrintItem::Semicolon);
            } else {
                items.push(PrintItem::Expr(self.parse_expression()?));
            }
        }
        Ok(Statement::Print {
            items,
            location: self.location_from(&start),
        })
    }

    fn parse_dim(&mut self) -> Result<Statement, SyntaxError> {
        let start = self.advance().location.clone();
        let name = self.expect_identifier("Expected array name after dim")?;
        self.expect(TokenKind::LBracket)?;
        let dimensions = self.parse_expression_list(TokenKind::RBracket)?;
        self.expect(TokenKind::RBracket)?;
        Ok(Statement::Dim {
            name,
            dimensions,
            location: self.location_from(&start),
        })
    }

    /// Statements until one of `terminators` (left unconsumed).
    fn parse_block(&mut self, terminators: &[TokenKind]) -> Result<Block, SyntaxError> {
        let start = self.current_location();
        let mut statements = Vec::new();
        loop {
            self.skip_separators();
            if terminators.contains(&self.peek_kind()) {
                break;
            }
            if self.is_eof() {
                return Err(self
                    .error_here("A block (such as FOR/NEXT or IF/ENDIF) was not terminated correctly.")
                    .with_help(format!("expected {:?}", terminators)));
            }
            match self.parse_statement() {
                Ok(statement) => {
                    statements.push(statement);
                    if let Err(err) = self.expect_statement_end(terminators) {
                        self.report(err);
                        self.synchronize_line();
                    }
                }
                Err(err) => {
                    self.report(err);
                    self.synchronize_line();
                }
            }
        }
        Ok(Block {
            statements,
            location: self.location_from(&start),
        })
    }

    fn parse_expression(&mut self) -> Result<Expr, SyntaxError> {
        self.parse_binary(1)
    }

    fn parse_binary(&mut self, min_prec: u8) -> Result<Expr, SyntaxError> {
        let mut left = if self.check(TokenKind::Not) {
            let start = self.advance().location.clone();
            let operand = self.parse_binary(NOT_PRECEDENCE)?;
            Expr::Unary {
                location: start.union(operand.location()),
                op: UnaryOp::Not,
                expr: Box::new(operand),
            }
        } else {
            self.parse_unary()?
        };

        loop {
            let (op, prec) = match self.current_binary_op() {
                Some(info) => info,
                None => break,
            };
            if prec < min_prec {
                break;
            }
            self.advance();
            let right = self.parse_binary(prec + 1)?;
            let location = left.location().union(right.location());
            left = Expr::Binary {
                left: Box::new(left),
                op,
                right: Box::new(right),
                location,
            };
        }

        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr, SyntaxError> {
        let op = match self.peek_kind() {
            TokenKind::Minus => UnaryOp::Negate,
            TokenKind::Plus => UnaryOp::Plus,
            _ => return self.parse_exponent(),
        };
        let start = self.advance().location.clone();
        let expr = self.parse_unary()?;
        Ok(Expr::Unary {
            location: start.union(expr.location()),
            op,
            expr: Box::new(expr),
        })
    }

    fn parse_exponent(&mut self) -> Result<Expr, SyntaxError> {
        let mut left = self.parse_postfix()?;
        while self.matches(TokenKind::Caret) {
            let right = if self.check(TokenKind::Minus) {
                let start = self.advance().location.clone();
                let operand = self.parse_postfix()?;
                Expr::Unary {
                    location: start.union(operand.location()),
                    op: UnaryOp::Negate,
                    expr: Box::new(operand),
                }
            } else {
                self.parse_postfix()?
            };
            let location = left.location().union(right.location());
            left = Expr::Binary {
                left: Box::new(left),
                op: BinaryOp::Power,
                right: Box::new(right),
                location,
            };
        }
        Ok(left)
    }

    fn parse_postfix(&mut self) -> Result<Expr, SyntaxError> {
        let mut expr = self.parse_primary()?;

        loop {
            match self.peek_kind() {
                TokenKind::LParen | TokenKind::QuestionLParen => {
                    let optional = self.advance().kind == TokenKind::QuestionLParen;
                    let args = self.parse_expression_list(TokenKind::RParen)?;
                    let closing = self.expect(TokenKind::RParen)?.location.clone();
                    let location = expr.location().union(&closing);
                    expr = Expr::Call {
                        callee: Box::new(expr),
                        args,
                        optional,
                        closing,
                        location,
                    };
                }
                TokenKind::Dot | TokenKind::QuestionDot => {
                    let optional = self.advance().kind == TokenKind::QuestionDot;
                    let name = self.expect_member_name()?;
                    let location = expr.location().union(&name.location);
                    expr = Expr::DottedGet {
                        object: Box::new(expr),
                        name,
                        optional,
                        location,
                    };
                }
                TokenKind::LBracket | TokenKind::QuestionLBracket => {
                    let optional = self.advance().kind == TokenKind::QuestionLBracket;
                    let indexes = self.parse_expression_list(TokenKind::RBracket)?;
                    let closing = self.expect(TokenKind::RBracket)?.location.clone();
                    let location = expr.location().union(&closing);
                    expr = Expr::IndexedGet {
                        object: Box::new(expr),
                        indexes,
                        optional,
                        closing,
                        location,
                    };
                }
                TokenKind::At => {
                    self.advance();
                    let name = self.expect_member_name()?;
                    let location = expr.location().union(&name.location);
                    expr = Expr::AttributeGet {
                        object: Box::new(expr),
                        name,
                        location,
                    };
                }
                _ => break,
            }
        }

        Ok(expr)
    }

    fn parse_primary(&mut self) -> Result<Expr, SyntaxError> {
        let token = self.peek().clone();
        let literal = match token.kind {
            TokenKind::Integer(value) => Literal::Integer(value),
            TokenKind::LongInteger(value) => Literal::LongInteger(value),
            TokenKind::Float(value) => Literal::Float(value),
            TokenKind::Double(value) => Literal::Double(value),
            TokenKind::String(value) => Literal::String(value),
            TokenKind::True => Literal::Boolean(true),
            TokenKind::False => Literal::Boolean(false),
            TokenKind::Invalid => Literal::Invalid,
            TokenKind::Identifier(name) => {
                self.advance();
                return Ok(Expr::Variable(Identifier::new(name, token.location)));
            }
            TokenKind::LParen => {
                self.advance();
                self.skip_newlines();
                let expr = self.parse_expression()?;
                self.skip_newlines();
                let closing = self.expect(TokenKind::RParen)?.location.clone();
                return Ok(Expr::Grouping {
                    expr: Box::new(expr),
                    location: token.location.union(&closing),
                });
            }
            TokenKind::LBracket => return self.parse_array_literal(),
            TokenKind::LBrace => return self.parse_aa_literal(),
            TokenKind::Function | TokenKind::Sub => return self.parse_anonymous_function(),
            _ => return Err(self.error_here("Expected expression")),
        };
        self.advance();
        Ok(Expr::Literal(literal, token.location))
    }

    fn parse_array_literal(&mut self) -> Result<Expr, SyntaxError> {
        let start = self.advance().location.clone();
        let mut elements = Vec::new();
        loop {
            self.skip_list_separators();
            if self.check(TokenKind::RBracket) {
                break;
            }
            elements.push(self.parse_expression()?);
        }
        let closing = self.expect(TokenKind::RBracket)?.location.clone();
        Ok(Expr::ArrayLiteral {
            elements,
            location: start.union(&closing),
        })
    }

    fn parse_aa_literal(&mut self) -> Result<Expr, SyntaxError> {
        let start = self.advance().location.clone();
        let mut members = Vec::new();
        loop {
            self.skip_list_separators();
            if self.check(TokenKind::RBrace) {
                break;
            }
            let name = match self.peek_kind() {
                TokenKind::String(value) => {
                    self.advance();
                    value
                }
                _ => self.expect_member_name()?.name,
            };
            self.expect(TokenKind::Colon)?;
            self.skip_newlines();
            let value = self.parse_expression()?;
            members.push(AAMember { name, value });
        }
        let closing = self.expect(TokenKind::RBrace)?.location.clone();
        Ok(Expr::AALiteral {
            members,
            location: start.union(&closing),
        })
    }

    fn parse_expression_list(&mut self, closing: TokenKind) -> Result<Vec<Expr>, SyntaxError> {
        let mut exprs = Vec::new();
        self.skip_newlines();
        if self.check(closing.clone()) {
            return Ok(exprs);
        }
        loop {
            self.skip_newlines();
            exprs.push(self.parse_expression()?);
            self.skip_newlines();
            if !self.matches(TokenKind::Comma) {
                break;
            }
        }
        Ok(exprs)
    }

    fn current_binary_op(&self) -> Option<(BinaryOp, u8)> {
        match self.peek_kind() {
            TokenKind::Or => Some((BinaryOp::Or, 1)),
            TokenKind::And => Some((BinaryOp::And, 2)),
            TokenKind::Eq => Some((BinaryOp::Equal, 4)),
            TokenKind::LtGt => Some((BinaryOp::NotEqual, 4)),
            TokenKind::Lt => Some((BinaryOp::Less, 4)),
            TokenKind::LtEq => Some((BinaryOp::LessEqual, 4)),
            TokenKind::Gt => Some((BinaryOp::Greater, 4)),
            TokenKind::GtEq => Some((BinaryOp::GreaterEqual, 4)),
            TokenKind::LtLt => Some((BinaryOp::LeftShift, 5)),
            TokenKind::GtGt => Some((BinaryOp::RightShift, 5)),
            TokenKind::Plus => Some((BinaryOp::Add, 6)),
            TokenKind::Minus => Some((BinaryOp::Subtract, 6)),
            TokenKind::Star => Some((BinaryOp::Multiply, 7)),
            TokenKind::Slash => Some((BinaryOp::Divide, 7)),
            TokenKind::Backslash => Some((BinaryOp::IntDivide, 7)),
            TokenKind::Mod => Some((BinaryOp::Modulo, 7)),
            _ => None,
        }
    }

    fn expect_identifier(&mut self, msg: &str) -> Result<Identifier, SyntaxError> {
        match self.peek_kind() {
            TokenKind::Identifier(name) => {
                let location = self.advance().location.clone();
                Ok(Identifier::new(name, location))
            }
            _ => Err(self.error_here(msg)),
        }
    }

    /// Member names after `.` may be keywords, e.g. `list.next` or `node.end`.
    fn expect_member_name(&mut self) -> Result<Identifier, SyntaxError> {
        match self.peek_kind().member_name() {
            Some(name) => {
                let location = self.advance().location.clone();
                Ok(Identifier::new(name, location))
            }
            None => Err(self.error_here("Expected member name")),
        }
    }

    fn expect_string_literal(&mut self, msg: &str) -> Result<String, SyntaxError> {
        match self.peek_kind() {
            TokenKind::String(value) => {
                self.advance();
                Ok(value)
            }
            _ => Err(self.error_here(msg)),
        }
    }

    fn expect(&mut self, kind: TokenKind) -> Result<&Token, SyntaxError> {
        if self.check(kind.clone()) {
            Ok(self.advance())
        } else {
            Err(self.error_here(&format!("Expected {:?}", kind)))
        }
    }

    fn expect_statement_end(&mut self, terminators: &[TokenKind]) -> Result<(), SyntaxError> {
        if self.at_statement_end() || terminators.contains(&self.peek_kind()) {
            Ok(())
        } else {
            Err(self.error_here("Expected newline or ':' after statement"))
        }
    }

    fn at_statement_end(&self) -> bool {
        matches!(
            self.peek_kind(),
            TokenKind::Newline
                | TokenKind::Colon
                | TokenKind::Eof
                | TokenKind::Else
                | TokenKind::ElseIf
                | TokenKind::EndIf
        )
    }

    fn matches(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.peek_kind() == kind
    }

    fn peek(&self) -> &Token {
        let index = self.pos.min(self.tokens.len().saturating_sub(1));
        &self.tokens[index]
    }

    fn peek_kind(&self) -> TokenKind {
        self.peek().kind.clone()
    }

    fn peek_kind_n(&self, n: usize) -> TokenKind {
        self.tokens
            .get(self.pos + n)
            .map(|t| t.kind.clone())
            .unwrap_or(TokenKind::Eof)
    }

    fn advance(&mut self) -> &Token {
        let index = self.pos.min(self.tokens.len().saturating_sub(1));
        self.pos = (self.pos + 1).min(self.tokens.len());
        &self.tokens[index]
    }

    fn is_eof(&self) -> bool {
        self.check(TokenKind::Eof)
    }

    fn skip_separators(&mut self) {
        while matches!(self.peek_kind(), TokenKind::Newline | TokenKind::Colon) {
            self.advance();
        }
    }

    fn skip_newlines(&mut self) {
        while self.check(TokenKind::Newline) {
            self.advance();
        }
    }

    fn skip_list_separators(&mut self) {
        while matches!(self.peek_kind(), TokenKind::Newline | TokenKind::Comma) {
            self.advance();
        }
    }

    fn current_location(&self) -> Location {
        self.peek().location.clone()
    }

    /// Location spanning `start` through the last consumed token.
    fn location_from(&self, start: &Location) -> Location {
        match self.pos.checked_sub(1).and_then(|idx| self.tokens.get(idx)) {
            Some(previous) => start.until(&previous.location),
            None => start.clone(),
        }
    }

    fn error_here(&self, message: &str) -> SyntaxError {
        let token = self.peek();
        SyntaxError::new(message, token.span, token.location.clone())
    }

    fn error_at(&self, location: &Location, message: &str) -> SyntaxError {
        SyntaxError::new(message, location.span, location.clone())
    }

    fn report(&mut self, err: SyntaxError) {
        self.errors.push(err);
    }

    fn synchronize_line(&mut self) {
        while !self.is_eof() {
            if self.check(TokenKind::Newline) {
                self.advance();
                return;
            }
            self.advance();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_ok(source: &str) -> Vec<Statement> {
        parse("test.brs", source).expect("parse")
    }

    #[test]
    fn colon_separates_statements() {
        let statements = parse_ok("a = 5 : a = a + 1 : print a");
        assert_eq!(statements.len(), 3, "statements: {statements:#?}");
        assert!(matches!(statements[2], Statement::Print { .. }));
    }

    #[test]
    fn multiplication_binds_tighter_than_addition() {
        let statements = parse_ok("x = 1 + 2 * 3");
        let Statement::Assignment { value, .. } = &statements[0] else {
            panic!("expected assignment, got {statements:?}");
        };
        let Expr::Binary { op, right, .. } = value else {
            panic!("expected binary, got {value:?}");
        };
        assert_eq!(*op, BinaryOp::Add);
        assert!(matches!(**right, Expr::Binary { op: BinaryOp::Multiply, .. }));
    }

    #[test]
    fn not_binds_looser_than_comparison() {
        let statements = parse_ok("x = not a = b");
        let Statement::Assignment { value, .. } = &statements[0] else {
            panic!("expected assignment");
        };
        let Expr::Unary { op, expr, .. } = value else {
            panic!("expected unary, got {value:?}");
        };
        assert_eq!(*op, UnaryOp::Not);
        assert!(matches!(**expr, Expr::Binary { op: BinaryOp::Equal, .. }));
    }

    #[test]
    fn compound_assignment_desugars_to_binary() {
        let statements = parse_ok("total += 2");
        assert!(matches!(
            &statements[0],
            Statement::Assignment { value: Expr::Binary { op: BinaryOp::Add, .. }, .. }
        ));
    }

    #[test]
    fn function_declarations_capture_signature() {
        let statements = parse_ok(
            "function add(a as integer, b = 2 as integer) as integer\n  return a + b\nend function",
        );
        let Statement::Function { func, .. } = &statements[0] else {
            panic!("expected function, got {statements:?}");
        };
        assert_eq!(func.params.len(), 2);
        assert_eq!(func.params[0].kind, ValueKind::Int32);
        assert!(func.params[1].default.is_some());
        assert_eq!(func.returns, ValueKind::Int32);
    }

    #[test]
    fn subs_default_to_void_returns() {
        let statements = parse_ok("sub main()\nend sub");
        let Statement::Function { func, .. } = &statements[0] else {
            panic!("expected sub");
        };
        assert_eq!(func.returns, ValueKind::Void);
        assert!(func.is_sub);
    }

    #[test]
    fn anonymous_functions_are_numbered() {
        let statements = parse_ok("f = function()\nend function\ng = sub()\nend sub");
        let names: Vec<_> = statements
            .iter()
            .filter_map(|statement| match statement {
                Statement::Assignment { value: Expr::Function(func), .. } => Some(func.name.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(names, vec!["$anon_0", "$anon_1"]);
    }

    #[test]
    fn block_and_single_line_if_forms() {
        let statements = parse_ok(
            "if a then b = 1 else b = 2\nif a > 1\n  b = 3\nelse if a < 0 then\n  b = 4\nelse\n  b = 5\nend if",
        );
        assert_eq!(statements.len(), 2);
        let Statement::If { else_ifs, else_branch, .. } = &statements[1] else {
            panic!("expected if");
        };
        assert_eq!(else_ifs.len(), 1);
        assert!(else_branch.is_some());
        let Statement::If { else_branch, .. } = &statements[0] else {
            panic!("expected inline if");
        };
        assert_eq!(else_branch.as_ref().map(|b| b.statements.len()), Some(1));
    }

    #[test]
    fn loops_accept_next_or_end_for() {
        let statements = parse_ok(
            "for i = 10 to 0 step -1\n  print i\nnext i\nfor each x in list\nend for\nwhile true\n  exit while\nend while",
        );
        assert!(matches!(statements[0], Statement::For { step: Some(_), .. }));
        assert!(matches!(statements[1], Statement::ForEach { .. }));
        assert!(matches!(statements[2], Statement::While { .. }));
    }

    #[test]
    fn labels_and_goto() {
        let statements = parse_ok("goto skip\nprint 1\nskip:\nprint 2");
        assert!(matches!(statements[0], Statement::Goto { .. }));
        assert!(matches!(&statements[2], Statement::Label(ident) if ident.name == "skip"));
    }

    #[test]
    fn setters_and_increments() {
        let statements = parse_ok("m.count = 1\nlist[0] = 2\nm.count++\nlist[1]--");
        assert!(matches!(statements[0], Statement::DottedSet { .. }));
        assert!(matches!(statements[1], Statement::IndexedSet { .. }));
        assert!(matches!(statements[2], Statement::Increment { op: IncrementOp::Increment, .. }));
        assert!(matches!(statements[3], Statement::Increment { op: IncrementOp::Decrement, .. }));
    }

    #[test]
    fn literals_span_multiple_lines() {
        let statements = parse_ok("x = {\n  name: \"a\",\n  \"Quoted Key\": [1, 2\n 3]\n}");
        let Statement::Assignment { value: Expr::AALiteral { members, .. }, .. } = &statements[0]
        else {
            panic!("expected aa literal");
        };
        assert_eq!(members.len(), 2);
        assert_eq!(members[1].name, "Quoted Key");
        assert!(matches!(&members[1].value, Expr::ArrayLiteral { elements, .. } if elements.len() == 3));
    }

    #[test]
    fn try_catch_and_throw() {
        let statements = parse_ok("try\n  throw \"boom\"\ncatch e\n  print e.message\nend try");
        assert!(matches!(statements[0], Statement::TryCatch { .. }));
    }

    #[test]
    fn print_keeps_separators() {
        let statements = parse_ok("print \"a\"; 1, 2;");
        let Statement::Print { items, .. } = &statements[0] else {
            panic!("expected print");
        };
        assert_eq!(items.len(), 6);
        assert_eq!(items[5], PrintItem::Semicolon);
    }

    #[test]
    fn optional_chaining_marks_nodes() {
        let statements = parse_ok("x = a?.b?[0]?()");
        let Statement::Assignment { value: Expr::Call { optional, callee, .. }, .. } = &statements[0]
        else {
            panic!("expected call");
        };
        assert!(*optional);
        assert!(matches!(**callee, Expr::IndexedGet { optional: true, .. }));
    }

    #[test]
    fn collects_multiple_errors() {
        let errors = parse("test.brs", "x = \ny = )\nprint 1").expect_err("should fail");
        assert_eq!(errors.errors.len(), 2, "errors: {:?}", errors.errors);
    }

    #[test]
    fn unterminated_block_reports_error() {
        let errors = parse("test.brs", "while true\n print 1\n").expect_err("should fail");
        assert!(errors.errors[0].message.contains("not terminated"));
    }
}
