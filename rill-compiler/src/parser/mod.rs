use std::collections::{BTreeSet, HashMap};
use std::mem;

use anyhow::{bail, Result};

use crate::ast::{
    Argument, Assign, BinaryOp, Block, ElseBody, Expression, ExpressionKind, FailStatement,
    ForeachStatement, Function, FunctionCall, GeneratorBody, IfStatement, Parameter, Program,
    ReturnStatement, Statement,
};
use crate::builtins;
use crate::diagnostics::{Diagnostics, Stage};
use crate::lexer::{Keyword, Token, TokenKind};
use crate::scope::{ScopeArena, ScopeId, Symbol, SymbolKind};
use crate::source::SourceFile;
use crate::types::Type;

/// Recursive-descent, predictive parser. One token of look-ahead, two in a
/// handful of places (named arguments, chained calls). Aborts on the first
/// error; the diagnostic carries the offending token's position.
pub struct Parser<'a> {
    _source: &'a SourceFile,
    tokens: Vec<Token>,
    current: usize,
    scopes: ScopeArena,
    current_scope: ScopeId,
    imports: BTreeSet<String>,
    diagnostics: Diagnostics,
}

impl<'a> Parser<'a> {
    pub fn new(source: &'a SourceFile, tokens: Vec<Token>) -> Self {
        let mut scopes = ScopeArena::new();
        let root = scopes.push(None, Type::NoReturn, false);
        Self {
            _source: source,
            tokens,
            current: 0,
            scopes,
            current_scope: root,
            imports: BTreeSet::new(),
            diagnostics: Diagnostics::new(),
        }
    }

    pub fn parse(&mut self) -> Result<Program> {
        let mut functions = Vec::new();
        while self.peek_kind() != TokenKind::Eof {
            if self.peek_kind() != TokenKind::Keyword(Keyword::Fn) {
                let token = self.peek().clone();
                return self.error_at(
                    &token,
                    format!(
                        "expected function declaration, got {} (\"{}\")",
                        token.kind.describe(),
                        token.lexeme
                    ),
                );
            }
            functions.push(self.parse_function()?);
        }
        Ok(Program {
            functions,
            imports: mem::take(&mut self.imports),
            scopes: mem::take(&mut self.scopes),
        })
    }

    pub fn into_diagnostics(self) -> Diagnostics {
        self.diagnostics
    }

    fn error_at<T>(&mut self, token: &Token, message: String) -> Result<T> {
        self.diagnostics
            .push(Stage::Parse, message.clone(), token.line, token.column);
        bail!(message);
    }

    fn expect_token(&mut self, kind: TokenKind) -> Result<Token> {
        if self.peek_kind() == kind {
            return Ok(self.advance());
        }
        let token = self.peek().clone();
        self.error_at(
            &token,
            format!(
                "expected {}, got {} (\"{}\")",
                kind.describe(),
                token.kind.describe(),
                token.lexeme
            ),
        )
    }

    fn expect_identifier(&mut self, what: &str) -> Result<Token> {
        if self.peek_kind() == TokenKind::Identifier {
            return Ok(self.advance());
        }
        let token = self.peek().clone();
        self.error_at(
            &token,
            format!(
                "expected {}, got {} (\"{}\")",
                what,
                token.kind.describe(),
                token.lexeme
            ),
        )
    }

    // ---- declarations -------------------------------------------------

    fn parse_function(&mut self) -> Result<Function> {
        self.expect_token(TokenKind::Keyword(Keyword::Fn))?;
        let name = self.expect_identifier("function name")?;

        let fallible = if self.peek_kind() == TokenKind::Question {
            self.advance();
            true
        } else {
            false
        };

        self.expect_token(TokenKind::LParen)?;
        let parameters = self.parse_parameters()?;

        let return_type = if self.peek_kind() == TokenKind::Arrow {
            self.advance();
            self.parse_type()?
        } else {
            Type::Void
        };

        let symbol = Symbol::function(&name.lexeme, return_type.clone(), fallible, parameters.clone());
        if !self.scopes.declare(self.current_scope, symbol) {
            return self.error_at(
                &name,
                format!("function \"{}\" is already defined", name.lexeme),
            );
        }

        let predeclared = parameters
            .iter()
            .map(|parameter| Symbol::variable(&parameter.name, parameter.ty.clone()))
            .collect::<Vec<_>>();
        let body = self.parse_block(predeclared, return_type.clone(), fallible)?;

        Ok(Function {
            name,
            parameters,
            body,
            return_type,
            fallible,
        })
    }

    fn parse_parameters(&mut self) -> Result<Vec<Parameter>> {
        let mut parameters = Vec::new();
        while self.peek_kind() != TokenKind::RParen {
            let token = self.expect_identifier("parameter name")?;
            let ty = self.parse_type()?;
            let default = if self.peek_kind() == TokenKind::Equal {
                self.advance();
                Some(self.parse_literal()?)
            } else {
                None
            };
            parameters.push(Parameter {
                name: token.lexeme.clone(),
                token,
                ty,
                default,
            });
            match self.peek_kind() {
                TokenKind::Comma => {
                    self.advance();
                }
                TokenKind::RParen => {}
                _ => {
                    let token = self.peek().clone();
                    return self.error_at(
                        &token,
                        format!(
                            "expected ',' or ')' after parameter, got {} (\"{}\")",
                            token.kind.describe(),
                            token.lexeme
                        ),
                    );
                }
            }
        }
        self.expect_token(TokenKind::RParen)?;
        Ok(parameters)
    }

    fn parse_type(&mut self) -> Result<Type> {
        let token = self.expect_identifier("type name")?;
        match token.lexeme.as_str() {
            "int" => Ok(Type::Int),
            "float" => Ok(Type::Float),
            "str" => Ok(Type::String),
            "bool" => Ok(Type::Bool),
            _ => self.error_at(&token, format!("unknown type \"{}\"", token.lexeme)),
        }
    }

    fn parse_literal(&mut self) -> Result<Expression> {
        let token = self.peek().clone();
        match token.kind {
            TokenKind::IntegerLiteral | TokenKind::FloatLiteral => {
                self.advance();
                Ok(Expression::new(token, ExpressionKind::NumLiteral))
            }
            TokenKind::StringLiteral => {
                self.advance();
                Ok(Expression::new(token, ExpressionKind::StringLiteral))
            }
            TokenKind::Keyword(Keyword::True) => {
                self.advance();
                Ok(Expression::new(token, ExpressionKind::BoolLiteral(true)))
            }
            TokenKind::Keyword(Keyword::False) => {
                self.advance();
                Ok(Expression::new(token, ExpressionKind::BoolLiteral(false)))
            }
            _ => self.error_at(
                &token,
                format!(
                    "parameter defaults must be literals, got {} (\"{}\")",
                    token.kind.describe(),
                    token.lexeme
                ),
            ),
        }
    }

    // ---- blocks and statements ----------------------------------------

    fn parse_block(
        &mut self,
        predeclared: Vec<Symbol>,
        return_type: Type,
        fallible: bool,
    ) -> Result<Block> {
        let lbrace = self.expect_token(TokenKind::LBrace)?;
        let scope = self
            .scopes
            .push(Some(self.current_scope), return_type, fallible);
        for symbol in predeclared {
            let name = symbol.name.clone();
            if !self.scopes.declare(scope, symbol) {
                return self.error_at(&lbrace, format!("duplicate binding \"{}\"", name));
            }
        }

        let previous = self.current_scope;
        self.current_scope = scope;

        let mut statements = Vec::new();
        while self.peek_kind() != TokenKind::RBrace {
            if self.peek_kind() == TokenKind::Eof {
                let token = self.peek().clone();
                return self.error_at(&token, "expected '}', got end of file".to_string());
            }
            statements.push(self.parse_statement()?);
        }
        self.expect_token(TokenKind::RBrace)?;
        self.current_scope = previous;

        Ok(Block {
            token: lbrace,
            statements,
            scope,
        })
    }

    fn parse_statement(&mut self) -> Result<Statement> {
        match self.peek_kind() {
            TokenKind::Identifier => match self.peek_ahead_kind(1) {
                TokenKind::Equal => self.parse_assign_statement(),
                TokenKind::LParen | TokenKind::Dot => self.parse_call_statement(),
                TokenKind::PlusPlus => {
                    let name = self.advance();
                    self.validate_variable(&name)?;
                    self.advance(); // consume '++'
                    Ok(Statement::Inc(name))
                }
                TokenKind::MinusMinus => {
                    let name = self.advance();
                    self.validate_variable(&name)?;
                    self.advance(); // consume '--'
                    Ok(Statement::Dec(name))
                }
                _ => {
                    let token = self.peek().clone();
                    self.error_at(
                        &token,
                        "expression statements are not allowed; expected assignment or call"
                            .to_string(),
                    )
                }
            },
            TokenKind::Keyword(keyword) => match keyword {
                Keyword::Fn => {
                    let token = self.peek().clone();
                    self.error_at(
                        &token,
                        "nested function declarations are not allowed".to_string(),
                    )
                }
                Keyword::If => Ok(Statement::If(self.parse_if()?)),
                Keyword::For => self.parse_foreach(),
                Keyword::Print => self.parse_call_statement(),
                Keyword::Return => self.parse_return(),
                Keyword::Fail => self.parse_fail(),
                Keyword::Continue => Ok(Statement::Continue(self.advance())),
                Keyword::Break => Ok(Statement::Break(self.advance())),
                _ => {
                    let token = self.peek().clone();
                    self.error_at(
                        &token,
                        format!(
                            "expected statement, got {} (\"{}\")",
                            token.kind.describe(),
                            token.lexeme
                        ),
                    )
                }
            },
            TokenKind::LBrace => Ok(Statement::Compound(self.parse_block(
                Vec::new(),
                Type::NoReturn,
                false,
            )?)),
            TokenKind::IntegerLiteral
            | TokenKind::FloatLiteral
            | TokenKind::StringLiteral
            | TokenKind::LParen => {
                let token = self.peek().clone();
                self.error_at(
                    &token,
                    "expression statements are not allowed; expected assignment or call"
                        .to_string(),
                )
            }
            _ => {
                let token = self.peek().clone();
                self.error_at(
                    &token,
                    format!(
                        "expected statement, got {} (\"{}\")",
                        token.kind.describe(),
                        token.lexeme
                    ),
                )
            }
        }
    }

    fn parse_assign_statement(&mut self) -> Result<Statement> {
        let assign = self.parse_assign(false)?;
        Ok(Statement::Assign(assign))
    }

    /// Shared by assignment statements and assignment-expressions. The
    /// expression form restricts the RHS to a single primary; the
    /// statement form takes a full expression or range.
    fn parse_assign(&mut self, expression: bool) -> Result<Assign> {
        let target = self.expect_identifier("variable name")?;
        let existing = self
            .scopes
            .lookup(self.current_scope, &target.lexeme)
            .map(|(_, symbol)| symbol.kind);
        let declaration = match existing {
            Some(SymbolKind::Variable) => false,
            Some(SymbolKind::Function) => {
                return self.error_at(
                    &target,
                    format!("cannot assign to function \"{}\"", target.lexeme),
                )
            }
            None => {
                self.scopes.declare(
                    self.current_scope,
                    Symbol::variable(&target.lexeme, Type::Undetermined),
                );
                true
            }
        };
        self.expect_token(TokenKind::Equal)?;
        let value = if expression {
            self.parse_postfix()?
        } else {
            self.parse_range_or_expression()?
        };
        Ok(Assign {
            target,
            value,
            declaration,
            expression,
        })
    }

    fn parse_call_statement(&mut self) -> Result<Statement> {
        let expr = if self.peek_kind() == TokenKind::Keyword(Keyword::Print) {
            let name = self.advance();
            let call = self.parse_call(name, None)?;
            Expression::new(call.token.clone(), ExpressionKind::Call(Box::new(call)))
        } else {
            self.parse_postfix()?
        };

        match expr.kind {
            ExpressionKind::Call(call) => {
                let mut call = *call;
                if self.peek_kind() == TokenKind::Arrow {
                    self.parse_generator_suffix(&mut call)?;
                }
                Ok(Statement::Call(call))
            }
            _ => {
                let token = expr.token.clone();
                self.error_at(
                    &token,
                    "expression statements are not allowed; expected assignment or call"
                        .to_string(),
                )
            }
        }
    }

    fn parse_generator_suffix(&mut self, call: &mut FunctionCall) -> Result<()> {
        self.expect_token(TokenKind::Arrow)?;
        let variable = self.expect_identifier("generator variable")?;
        let index = if self.peek_kind() == TokenKind::Comma {
            self.advance();
            Some(self.expect_identifier("generator index variable")?)
        } else {
            None
        };

        let mut predeclared = vec![Symbol::variable(&variable.lexeme, Type::Undetermined)];
        if let Some(index_token) = &index {
            predeclared.push(Symbol::variable(&index_token.lexeme, Type::Int));
        }
        let body = self.parse_block(predeclared, Type::NoReturn, false)?;
        call.generator = Some(GeneratorBody {
            variable,
            index,
            body,
        });
        Ok(())
    }

    fn parse_if(&mut self) -> Result<IfStatement> {
        let token = self.expect_token(TokenKind::Keyword(Keyword::If))?;
        let condition = self.parse_expression()?;
        let body = self.parse_block(Vec::new(), Type::NoReturn, false)?;

        let else_body = if self.peek_kind() == TokenKind::Keyword(Keyword::Else) {
            self.advance();
            if self.peek_kind() == TokenKind::Keyword(Keyword::If) {
                ElseBody::If(Box::new(self.parse_if()?))
            } else {
                ElseBody::Block(self.parse_block(Vec::new(), Type::NoReturn, false)?)
            }
        } else {
            ElseBody::None
        };

        Ok(IfStatement {
            token,
            condition,
            comp_type: Type::Undetermined,
            body,
            else_body,
        })
    }

    fn parse_foreach(&mut self) -> Result<Statement> {
        let token = self.expect_token(TokenKind::Keyword(Keyword::For))?;
        let iterator = self.parse_range_or_expression()?;
        self.expect_token(TokenKind::Arrow)?;
        let variable = self.expect_identifier("loop variable")?;
        let index = if self.peek_kind() == TokenKind::Comma {
            self.advance();
            Some(self.expect_identifier("loop index variable")?)
        } else {
            None
        };

        let mut predeclared = vec![Symbol::variable(&variable.lexeme, Type::Undetermined)];
        if let Some(index_token) = &index {
            predeclared.push(Symbol::variable(&index_token.lexeme, Type::Int));
        }
        let body = self.parse_block(predeclared, Type::NoReturn, false)?;

        // A generator builtin as the iterator expands into its own loop,
        // so the loop variables and body belong to the call itself.
        let generator_call = matches!(
            &iterator.kind,
            ExpressionKind::Call(call) if builtins::lookup(&call.name)
                .map(|builtin| builtin.generator)
                .unwrap_or(false)
        );
        if generator_call {
            let ExpressionKind::Call(call) = iterator.kind else {
                unreachable!("generator iterator just matched as a call");
            };
            let mut call = *call;
            call.generator = Some(GeneratorBody {
                variable,
                index,
                body,
            });
            return Ok(Statement::Call(call));
        }

        Ok(Statement::Foreach(ForeachStatement {
            token,
            iterator,
            variable,
            index,
            body,
        }))
    }

    fn parse_return(&mut self) -> Result<Statement> {
        let token = self.expect_token(TokenKind::Keyword(Keyword::Return))?;
        let expr = if self.peek_kind() == TokenKind::RBrace {
            None
        } else {
            Some(self.parse_expression()?)
        };
        Ok(Statement::Return(ReturnStatement { token, expr }))
    }

    fn parse_fail(&mut self) -> Result<Statement> {
        let token = self.expect_token(TokenKind::Keyword(Keyword::Fail))?;
        let expr = self.parse_expression()?;
        Ok(Statement::Fail(FailStatement { token, expr }))
    }

    // ---- expressions --------------------------------------------------

    /// A range is only valid as a `for` iterator, a slice indexer or an
    /// assignment RHS, so only those entry points call this.
    fn parse_range_or_expression(&mut self) -> Result<Expression> {
        let first = self.parse_expression()?;
        if self.peek_kind() == TokenKind::DotDot {
            let token = self.advance();
            let to = self.parse_expression()?;
            return Ok(Expression::new(
                token,
                ExpressionKind::Range {
                    from: Box::new(first),
                    to: Box::new(to),
                },
            ));
        }
        Ok(first)
    }

    fn parse_expression(&mut self) -> Result<Expression> {
        self.parse_logical()
    }

    fn parse_logical(&mut self) -> Result<Expression> {
        let mut node = self.parse_comparison()?;
        while matches!(
            self.peek_kind(),
            TokenKind::AmpersandAmpersand | TokenKind::PipePipe
        ) {
            let op_token = self.advance();
            let right = self.parse_comparison()?;
            node = Self::binary(op_token, node, right);
        }
        Ok(node)
    }

    fn parse_comparison(&mut self) -> Result<Expression> {
        let mut node = self.parse_term()?;
        while matches!(
            self.peek_kind(),
            TokenKind::DoubleEqual
                | TokenKind::BangEqual
                | TokenKind::Greater
                | TokenKind::GreaterEqual
                | TokenKind::Less
                | TokenKind::LessEqual
        ) {
            let op_token = self.advance();
            let right = self.parse_term()?;
            node = Self::binary(op_token, node, right);
        }
        Ok(node)
    }

    fn parse_term(&mut self) -> Result<Expression> {
        let mut node = self.parse_factor()?;
        while matches!(self.peek_kind(), TokenKind::Plus | TokenKind::Minus) {
            let op_token = self.advance();
            let right = self.parse_factor()?;
            node = Self::binary(op_token, node, right);
        }
        Ok(node)
    }

    fn parse_factor(&mut self) -> Result<Expression> {
        let mut node = self.parse_unary()?;
        while matches!(self.peek_kind(), TokenKind::Star | TokenKind::Slash) {
            let op_token = self.advance();
            let right = self.parse_unary()?;
            node = Self::binary(op_token, node, right);
        }
        Ok(node)
    }

    fn binary(op_token: Token, left: Expression, right: Expression) -> Expression {
        let op = BinaryOp::from_token(op_token.kind).expect("binary operator token");
        Expression::new(
            op_token,
            ExpressionKind::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            },
        )
    }

    fn parse_unary(&mut self) -> Result<Expression> {
        if self.peek_kind() == TokenKind::Bang {
            let token = self.advance();
            let operand = self.parse_unary()?;
            return Ok(Expression::new(
                token,
                ExpressionKind::Unary {
                    operand: Box::new(operand),
                },
            ));
        }
        self.parse_postfix()
    }

    /// Primary expression plus its postfix forms: method chaining
    /// (`recv.f(...)` desugars to `f(recv, ...)`) and the `?` / `?{ ... }`
    /// error suffixes on calls.
    fn parse_postfix(&mut self) -> Result<Expression> {
        let mut expr = self.parse_primary()?;

        while self.peek_kind() == TokenKind::Dot
            && self.peek_ahead_kind(1) == TokenKind::Identifier
            && self.peek_ahead_kind(2) == TokenKind::LParen
        {
            self.advance(); // consume '.'
            let name = self.advance();
            let call = self.parse_call(name, Some(expr))?;
            expr = Expression::new(call.token.clone(), ExpressionKind::Call(Box::new(call)));
        }

        if self.peek_kind() == TokenKind::Question {
            if let ExpressionKind::Call(ref mut call) = expr.kind {
                self.advance(); // consume '?'
                if self.peek_kind() == TokenKind::LBrace {
                    let err_symbol = Symbol::variable("err", Type::String);
                    call.error_body =
                        Some(self.parse_block(vec![err_symbol], Type::NoReturn, false)?);
                } else {
                    call.propagates = true;
                }
            }
        }

        Ok(expr)
    }

    fn parse_call(&mut self, name_token: Token, receiver: Option<Expression>) -> Result<FunctionCall> {
        self.expect_token(TokenKind::LParen)?;

        let method_receiver = receiver.is_some();
        let mut arguments = Vec::new();
        if let Some(receiver) = receiver {
            arguments.push(Argument {
                token: receiver.token.clone(),
                expr: receiver,
                name: None,
                order: 0,
                ty: Type::Undetermined,
            });
        }

        let mut seen_named = false;
        while self.peek_kind() != TokenKind::RParen {
            if self.peek_kind() == TokenKind::Identifier
                && self.peek_ahead_kind(1) == TokenKind::Equal
            {
                let arg_name = self.advance();
                self.advance(); // consume '='
                let expr = self.parse_expression()?;
                arguments.push(Argument {
                    token: arg_name.clone(),
                    expr,
                    name: Some(arg_name.lexeme),
                    order: arguments.len(),
                    ty: Type::Undetermined,
                });
                seen_named = true;
            } else {
                if seen_named {
                    let token = self.peek().clone();
                    return self.error_at(
                        &token,
                        "positional arguments must precede named arguments".to_string(),
                    );
                }
                let expr = self.parse_expression()?;
                arguments.push(Argument {
                    token: expr.token.clone(),
                    expr,
                    name: None,
                    order: arguments.len(),
                    ty: Type::Undetermined,
                });
            }

            match self.peek_kind() {
                TokenKind::Comma => {
                    self.advance();
                }
                TokenKind::RParen => {}
                _ => {
                    let token = self.peek().clone();
                    return self.error_at(
                        &token,
                        format!(
                            "expected ',' or ')' after argument, got {} (\"{}\")",
                            token.kind.describe(),
                            token.lexeme
                        ),
                    );
                }
            }
        }
        self.expect_token(TokenKind::RParen)?;

        let name = name_token.lexeme.clone();
        if name == "print" {
            self.imports.insert("fmt".to_string());
        }
        let is_builtin = builtins::is_builtin(&name);

        Ok(FunctionCall {
            token: name_token,
            name,
            arguments,
            is_builtin,
            method_receiver,
            resolved_args: HashMap::new(),
            resolved_return_type: Type::Undetermined,
            propagates: false,
            error_body: None,
            generator: None,
        })
    }

    fn parse_primary(&mut self) -> Result<Expression> {
        let token = self.peek().clone();
        match token.kind {
            TokenKind::LParen => {
                self.advance();
                let expr = self.parse_expression()?;
                self.expect_token(TokenKind::RParen)?;
                Ok(expr)
            }
            TokenKind::IntegerLiteral | TokenKind::FloatLiteral => {
                self.advance();
                Ok(Expression::new(token, ExpressionKind::NumLiteral))
            }
            TokenKind::StringLiteral => {
                self.advance();
                Ok(Expression::new(token, ExpressionKind::StringLiteral))
            }
            TokenKind::Keyword(Keyword::True) => {
                self.advance();
                Ok(Expression::new(token, ExpressionKind::BoolLiteral(true)))
            }
            TokenKind::Keyword(Keyword::False) => {
                self.advance();
                Ok(Expression::new(token, ExpressionKind::BoolLiteral(false)))
            }
            TokenKind::LBracket => self.parse_slice_literal(),
            TokenKind::Keyword(Keyword::Set) => self.parse_set_literal(),
            TokenKind::Identifier => match self.peek_ahead_kind(1) {
                TokenKind::LParen => {
                    let name = self.advance();
                    let call = self.parse_call(name, None)?;
                    Ok(Expression::new(
                        call.token.clone(),
                        ExpressionKind::Call(Box::new(call)),
                    ))
                }
                TokenKind::Equal => {
                    let assign = self.parse_assign(true)?;
                    Ok(Expression::new(
                        assign.target.clone(),
                        ExpressionKind::Assign(Box::new(assign)),
                    ))
                }
                TokenKind::LBracket => {
                    let name = self.advance();
                    self.validate_variable(&name)?;
                    self.advance(); // consume '['
                    let index = self.parse_range_or_expression()?;
                    self.expect_token(TokenKind::RBracket)?;
                    Ok(Expression::new(
                        name.clone(),
                        ExpressionKind::IndexedVar {
                            name: name.lexeme,
                            index: Box::new(index),
                        },
                    ))
                }
                _ => {
                    let name = self.advance();
                    self.validate_variable(&name)?;
                    Ok(Expression::new(
                        name.clone(),
                        ExpressionKind::Var { name: name.lexeme },
                    ))
                }
            },
            _ => self.error_at(
                &token,
                format!(
                    "expected expression, got {} (\"{}\")",
                    token.kind.describe(),
                    token.lexeme
                ),
            ),
        }
    }

    fn parse_slice_literal(&mut self) -> Result<Expression> {
        let token = self.expect_token(TokenKind::LBracket)?;
        let elements = self.parse_element_list(TokenKind::RBracket)?;
        Ok(Expression::new(
            token,
            ExpressionKind::SliceLiteral {
                elements,
                element_type: Type::Undetermined,
            },
        ))
    }

    fn parse_set_literal(&mut self) -> Result<Expression> {
        let token = self.expect_token(TokenKind::Keyword(Keyword::Set))?;
        self.expect_token(TokenKind::LBrace)?;
        let elements = self.parse_element_list(TokenKind::RBrace)?;
        Ok(Expression::new(
            token,
            ExpressionKind::SetLiteral {
                elements,
                element_type: Type::Undetermined,
            },
        ))
    }

    fn parse_element_list(&mut self, closing: TokenKind) -> Result<Vec<Expression>> {
        let mut elements = Vec::new();
        while self.peek_kind() != closing {
            elements.push(self.parse_expression()?);
            match self.peek_kind() {
                TokenKind::Comma => {
                    self.advance();
                }
                kind if kind == closing => {}
                _ => {
                    let token = self.peek().clone();
                    return self.error_at(
                        &token,
                        format!(
                            "expected ',' or {}, got {} (\"{}\")",
                            closing.describe(),
                            token.kind.describe(),
                            token.lexeme
                        ),
                    );
                }
            }
        }
        self.expect_token(closing)?;
        Ok(elements)
    }

    // ---- symbol helpers ----------------------------------------------

    fn validate_variable(&mut self, token: &Token) -> Result<()> {
        let is_variable = self
            .scopes
            .lookup(self.current_scope, &token.lexeme)
            .map(|(_, symbol)| symbol.kind == SymbolKind::Variable)
            .unwrap_or(false);
        if !is_variable {
            return self.error_at(
                token,
                format!("use of undeclared variable \"{}\"", token.lexeme),
            );
        }
        self.scopes.mark_used(self.current_scope, &token.lexeme);
        Ok(())
    }

    // ---- token helpers ------------------------------------------------

    fn peek(&self) -> &Token {
        &self.tokens[self.current.min(self.tokens.len() - 1)]
    }

    fn peek_kind(&self) -> TokenKind {
        self.peek().kind
    }

    fn peek_ahead_kind(&self, offset: usize) -> TokenKind {
        let index = (self.current + offset).min(self.tokens.len() - 1);
        self.tokens[index].kind
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if self.current < self.tokens.len() - 1 {
            self.current += 1;
        }
        token
    }
}
