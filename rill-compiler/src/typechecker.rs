use std::collections::HashMap;
use std::mem;

use crate::ast::{
    Argument, Assign, Block, ElseBody, Expression, ExpressionKind, ForeachStatement, Function,
    FunctionCall, IfStatement, Parameter, Program, Statement,
};
use crate::builtins;
use crate::diagnostics::{Diagnostics, Stage};
use crate::lexer::{Token, TokenKind};
use crate::scope::{ScopeArena, ScopeId, SymbolKind};
use crate::types::{common_type, Type};

/// Single post-order traversal over the AST. Fills the analysis slots
/// (symbol types, resolved arguments, condition and element types) and
/// validates the fallibility rules. Independent errors accumulate; the
/// traversal only stops descending into a node it could not make sense of.
pub struct TypeChecker {
    scopes: ScopeArena,
    current_scope: ScopeId,
    loop_depth: usize,
    diagnostics: Diagnostics,
}

impl TypeChecker {
    pub fn new() -> Self {
        Self {
            scopes: ScopeArena::new(),
            current_scope: ScopeId(0),
            loop_depth: 0,
            diagnostics: Diagnostics::new(),
        }
    }

    pub fn into_diagnostics(self) -> Diagnostics {
        self.diagnostics
    }

    pub fn check_program(&mut self, program: &mut Program) {
        self.scopes = mem::take(&mut program.scopes);
        self.current_scope = ScopeId(0);

        for function in &mut program.functions {
            self.check_function(function);
        }

        match self.scopes.lookup(ScopeId(0), "main") {
            Some((_, symbol)) if symbol.kind == SymbolKind::Function => {}
            _ => self
                .diagnostics
                .push(Stage::Type, "no \"main\" function defined", 0, 0),
        }
        if let Some(main) = program
            .functions
            .iter()
            .find(|function| function.name.lexeme == "main")
        {
            let token = main.name.clone();
            if !main.parameters.is_empty() {
                self.error(&token, "\"main\" takes no parameters".to_string());
            }
            if main.return_type != Type::Void {
                self.error(&token, "\"main\" cannot return a value".to_string());
            }
            if main.fallible {
                self.error(&token, "\"main\" cannot be fallible".to_string());
            }
        }

        program.scopes = mem::take(&mut self.scopes);
    }

    fn error(&mut self, token: &Token, message: String) {
        self.diagnostics
            .push(Stage::Type, message, token.line, token.column);
    }

    fn check_function(&mut self, function: &mut Function) {
        for parameter in &function.parameters {
            if let Some(default) = &parameter.default {
                let literal_ty = literal_type(default);
                if literal_ty != parameter.ty {
                    self.error(
                        &parameter.token,
                        format!(
                            "default value for parameter \"{}\" of function \"{}\" must be {}",
                            parameter.name,
                            function.name.lexeme,
                            parameter.ty.describe()
                        ),
                    );
                }
            }
        }
        self.check_block(&mut function.body);
    }

    fn check_block(&mut self, block: &mut Block) {
        let previous = self.current_scope;
        self.current_scope = block.scope;
        for statement in &mut block.statements {
            self.check_statement(statement);
        }
        self.current_scope = previous;
    }

    fn check_statement(&mut self, statement: &mut Statement) {
        match statement {
            Statement::NoOp => {}
            Statement::Assign(assign) => {
                self.check_assign(assign);
            }
            Statement::Call(call) => {
                self.check_call(call);
            }
            Statement::Compound(block) => self.check_block(block),
            Statement::Return(ret) => {
                let token = ret.token.clone();
                let returning = self.scopes.closest_returning(self.current_scope);
                let expected = match returning {
                    Some(id) => self.scopes.get(id).return_type.clone(),
                    None => {
                        self.error(&token, "\"return\" outside of a function".to_string());
                        return;
                    }
                };
                match &mut ret.expr {
                    Some(expr) => {
                        let ty = self.infer(expr);
                        if expected == Type::Void {
                            self.error(
                                &token,
                                "cannot return a value from a function without a return type"
                                    .to_string(),
                            );
                        } else if !assignable(&ty, &expected) {
                            self.error(
                                &token,
                                format!(
                                    "cannot return {} from a function returning {}",
                                    ty.describe(),
                                    expected.describe()
                                ),
                            );
                        }
                    }
                    None => {
                        if expected != Type::Void {
                            self.error(
                                &token,
                                format!(
                                    "missing return value in function returning {}",
                                    expected.describe()
                                ),
                            );
                        }
                    }
                }
            }
            Statement::Fail(fail) => {
                let token = fail.token.clone();
                let returning = self.scopes.closest_returning(self.current_scope);
                let fallible = returning
                    .map(|id| self.scopes.get(id).fallible)
                    .unwrap_or(false);
                if !fallible {
                    self.error(
                        &token,
                        "\"fail\" is only allowed inside fallible functions".to_string(),
                    );
                }
                let ty = self.infer(&mut fail.expr);
                if ty != Type::String {
                    self.error(
                        &token,
                        format!("\"fail\" expects a String message, got {}", ty.describe()),
                    );
                }
            }
            Statement::If(if_stmt) => self.check_if(if_stmt),
            Statement::Foreach(foreach) => self.check_foreach(foreach),
            Statement::Inc(token) | Statement::Dec(token) => {
                let token = token.clone();
                let numeric = self
                    .scopes
                    .lookup(self.current_scope, &token.lexeme)
                    .map(|(_, symbol)| symbol.ty.is_numeric())
                    .unwrap_or(false);
                if !numeric {
                    self.error(
                        &token,
                        format!("\"{}\" must be numeric to increment or decrement", token.lexeme),
                    );
                }
            }
            Statement::Continue(token) | Statement::Break(token) => {
                if self.loop_depth == 0 {
                    let token = token.clone();
                    self.error(
                        &token,
                        format!("\"{}\" outside of a loop", token.lexeme),
                    );
                }
            }
        }
    }

    fn check_if(&mut self, if_stmt: &mut IfStatement) {
        if_stmt.comp_type = self.infer(&mut if_stmt.condition);
        self.check_block(&mut if_stmt.body);
        match &mut if_stmt.else_body {
            ElseBody::None => {}
            ElseBody::Block(block) => self.check_block(block),
            ElseBody::If(nested) => self.check_if(nested),
        }
    }

    fn check_foreach(&mut self, foreach: &mut ForeachStatement) {
        let iter_ty = self.infer(&mut foreach.iterator);
        let element = match &iter_ty {
            Type::Slice(element) => (**element).clone(),
            Type::String => Type::String,
            Type::Undetermined => return,
            _ => {
                let token = foreach.token.clone();
                self.error(
                    &token,
                    format!("type {} is not iterable", iter_ty.describe()),
                );
                return;
            }
        };
        self.scopes
            .set_symbol_type(foreach.body.scope, &foreach.variable.lexeme, element);
        self.loop_depth += 1;
        self.check_block(&mut foreach.body);
        self.loop_depth -= 1;
    }

    /// Types an assignment, fixing the target's type on its first binding.
    /// Yields the RHS type so assignment-expressions can participate in a
    /// larger expression.
    fn check_assign(&mut self, assign: &mut Assign) -> Type {
        let rhs_ty = self.infer(&mut assign.value);
        let target = assign.target.clone();

        match rhs_ty {
            Type::Void | Type::NoReturn => {
                self.error(
                    &target,
                    format!(
                        "cannot assign an expression of type {} to \"{}\"",
                        rhs_ty.describe(),
                        target.lexeme
                    ),
                );
                return Type::Undetermined;
            }
            Type::Generator(_) => {
                self.error(
                    &target,
                    "generator calls cannot be used as values".to_string(),
                );
                return Type::Undetermined;
            }
            _ => {}
        }

        let existing = self
            .scopes
            .lookup(self.current_scope, &target.lexeme)
            .map(|(_, symbol)| symbol.ty.clone());
        match existing {
            Some(Type::Undetermined) => {
                self.scopes
                    .set_symbol_type(self.current_scope, &target.lexeme, rhs_ty.clone());
            }
            Some(declared) => {
                if !assignable(&rhs_ty, &declared) {
                    self.error(
                        &target,
                        format!(
                            "cannot assign {} to \"{}\" ({})",
                            rhs_ty.describe(),
                            target.lexeme,
                            declared.describe()
                        ),
                    );
                }
            }
            None => unreachable!(
                "assignment target \"{}\" survived parsing without a symbol",
                target.lexeme
            ),
        }
        rhs_ty
    }

    fn infer(&mut self, expr: &mut Expression) -> Type {
        let token = expr.token.clone();
        match &mut expr.kind {
            ExpressionKind::NoOp => Type::Undetermined,
            ExpressionKind::NumLiteral => match token.kind {
                TokenKind::IntegerLiteral => Type::Int,
                TokenKind::FloatLiteral => Type::Float,
                _ => unreachable!("numeric literal with token kind {:?}", token.kind),
            },
            ExpressionKind::BoolLiteral(_) => Type::Bool,
            ExpressionKind::StringLiteral => Type::String,
            ExpressionKind::Var { name } => match self.scopes.lookup(self.current_scope, name) {
                Some((_, symbol)) => symbol.ty.clone(),
                None => unreachable!("undeclared variable \"{}\" survived parsing", name),
            },
            ExpressionKind::IndexedVar { name, index } => {
                let name = name.clone();
                let slicing = matches!(index.kind, ExpressionKind::Range { .. });
                let index_ty = self.infer(index);
                if !slicing && !matches!(index_ty, Type::Int | Type::Float | Type::String) {
                    self.error(
                        &token,
                        format!("index must be an integer, got {}", index_ty.describe()),
                    );
                }
                let var_ty = match self.scopes.lookup(self.current_scope, &name) {
                    Some((_, symbol)) => symbol.ty.clone(),
                    None => unreachable!("undeclared variable \"{}\" survived parsing", name),
                };
                match (&var_ty, slicing) {
                    (Type::Slice(_), true) | (Type::String, true) => var_ty.clone(),
                    (Type::Slice(element), false) => (**element).clone(),
                    (Type::String, false) => Type::String,
                    _ => {
                        self.error(
                            &token,
                            format!("\"{}\" ({}) is not indexable", name, var_ty.describe()),
                        );
                        Type::Undetermined
                    }
                }
            }
            ExpressionKind::Range { from, to } => {
                let from_ty = self.infer(from);
                let from_token = from.token.clone();
                if from_ty != Type::Int {
                    self.error(
                        &from_token,
                        format!("range bounds must be integers, got {}", from_ty.describe()),
                    );
                }
                let to_ty = self.infer(to);
                let to_token = to.token.clone();
                if to_ty != Type::Int {
                    self.error(
                        &to_token,
                        format!("range bounds must be integers, got {}", to_ty.describe()),
                    );
                }
                Type::Slice(Box::new(Type::Int))
            }
            ExpressionKind::SliceLiteral {
                elements,
                element_type,
            } => {
                let element = self.container_element_type(elements, &token, "slice literal");
                *element_type = element.clone();
                Type::Slice(Box::new(element))
            }
            ExpressionKind::SetLiteral {
                elements,
                element_type,
            } => {
                let element = self.container_element_type(elements, &token, "set literal");
                *element_type = element.clone();
                Type::Set(Box::new(element))
            }
            ExpressionKind::Unary { operand } => {
                self.infer(operand);
                Type::Bool
            }
            ExpressionKind::Binary { op, left, right } => {
                let op = *op;
                let left_ty = self.infer(left);
                let right_ty = self.infer(right);
                if op.is_logical() {
                    Type::Bool
                } else {
                    common_type(&left_ty, &right_ty)
                }
            }
            ExpressionKind::Assign(assign) => self.check_assign(assign),
            ExpressionKind::Call(call) => self.check_call(call),
        }
    }

    /// Strongest element type of a container literal under the
    /// String > Float > Int lattice.
    fn container_element_type(
        &mut self,
        elements: &mut [Expression],
        token: &Token,
        what: &str,
    ) -> Type {
        let mut best = Type::Undetermined;
        let mut best_precedence = 0usize;
        for element in elements.iter_mut() {
            let ty = self.infer(element);
            let precedence = match ty {
                Type::String => 3,
                Type::Float => 2,
                Type::Int => 1,
                _ => {
                    let element_token = element.token.clone();
                    self.error(
                        &element_token,
                        format!("type {} not allowed in {}", ty.describe(), what),
                    );
                    continue;
                }
            };
            if precedence > best_precedence {
                best_precedence = precedence;
                best = ty;
            }
        }
        if best == Type::Undetermined {
            self.error(token, format!("cannot infer the element type of an empty {}", what));
        }
        best
    }

    /// Resolves a call's arguments against its callee's parameter list and
    /// validates arity, fallibility and generator usage. Yields the call's
    /// type after generator specialization.
    fn check_call(&mut self, call: &mut FunctionCall) -> Type {
        let call_token = call.token.clone();

        if call.name == "print" {
            for argument in &mut call.arguments {
                argument.ty = self.infer(&mut argument.expr);
            }
            if call.generator.is_some() {
                self.error(
                    &call_token,
                    "\"print\" is not a generator and cannot take a \"->\" body".to_string(),
                );
            }
            if call.propagates || call.error_body.is_some() {
                self.error(
                    &call_token,
                    "\"?\" used on a call to non-fallible function \"print\"".to_string(),
                );
            }
            call.resolved_return_type = Type::Void;
            return Type::Void;
        }

        let (parameters, return_type, callee_fallible, generator_builtin) = if call.is_builtin {
            let builtin = builtins::lookup(&call.name).expect("builtin just classified");
            (
                builtin.parameter_list(),
                builtin.return_type.clone(),
                builtin.fallible,
                builtin.generator,
            )
        } else {
            match self.scopes.lookup(self.current_scope, &call.name) {
                Some((_, symbol)) if symbol.kind == SymbolKind::Function => (
                    symbol.parameters.clone().expect("function symbol"),
                    symbol.ty.clone(),
                    symbol.fallible,
                    false,
                ),
                Some(_) => {
                    self.error(&call_token, format!("\"{}\" is not a function", call.name));
                    return Type::Undetermined;
                }
                None => {
                    self.error(
                        &call_token,
                        format!(
                            "no function named \"{}\" exists in the current scope",
                            call.name
                        ),
                    );
                    return Type::Undetermined;
                }
            }
        };

        for argument in &call.arguments {
            if let Some(name) = &argument.name {
                if !parameters.iter().any(|parameter| &parameter.name == name) {
                    let argument_token = argument.token.clone();
                    self.error(
                        &argument_token,
                        format!(
                            "unknown named argument \"{}\" for function \"{}\"",
                            name, call.name
                        ),
                    );
                }
            }
        }

        if !self.resolve_arguments(call, &parameters) {
            return Type::Undetermined;
        }

        for parameter in &parameters {
            let Some(argument) = call.resolved_args.get_mut(&parameter.name) else {
                continue;
            };
            let ty = self.infer(&mut argument.expr);
            argument.ty = ty.clone();
            if !argument_compatible(&ty, &parameter.ty) {
                let argument_token = argument.token.clone();
                self.error(
                    &argument_token,
                    format!(
                        "cannot pass {} for parameter \"{}\" ({}) of \"{}\"",
                        ty.describe(),
                        parameter.name,
                        parameter.ty.describe(),
                        call.name
                    ),
                );
            }
        }

        if callee_fallible {
            if !call.propagates && call.error_body.is_none() {
                let caller_fallible = self
                    .scopes
                    .closest_returning(self.current_scope)
                    .map(|id| self.scopes.get(id).fallible)
                    .unwrap_or(false);
                if !caller_fallible {
                    self.error(
                        &call_token,
                        format!(
                            "call to fallible function \"{}\" must handle or propagate the error",
                            call.name
                        ),
                    );
                }
            }
        } else if call.propagates || call.error_body.is_some() {
            self.error(
                &call_token,
                format!(
                    "\"?\" used on a call to non-fallible function \"{}\"",
                    call.name
                ),
            );
        }

        if let Some(body) = &mut call.error_body {
            self.check_block(body);
        }

        let sep_is_empty_literal = call
            .resolved_args
            .get("sep")
            .map(|argument| {
                matches!(argument.expr.kind, ExpressionKind::StringLiteral)
                    && argument.expr.token.lexeme.is_empty()
            })
            .unwrap_or(false);

        let mut result = return_type;
        if call.generator.is_some() {
            if !generator_builtin {
                self.error(
                    &call_token,
                    format!(
                        "\"{}\" is not a generator and cannot take a \"->\" body",
                        call.name
                    ),
                );
            } else {
                let element = if sep_is_empty_literal {
                    Type::String
                } else {
                    Type::Slice(Box::new(Type::String))
                };
                let generator = call.generator.as_mut().expect("generator body just checked");
                self.scopes.set_symbol_type(
                    generator.body.scope,
                    &generator.variable.lexeme,
                    element,
                );
                self.loop_depth += 1;
                self.check_block(&mut generator.body);
                self.loop_depth -= 1;
            }
            result = Type::Void;
        } else if matches!(result, Type::Generator(_)) {
            self.error(
                &call_token,
                format!(
                    "generator builtin \"{}\" requires a \"-> var {{ ... }}\" body",
                    call.name
                ),
            );
            result = Type::Void;
        }

        call.resolved_return_type = result.clone();
        result
    }

    /// Binds arguments to parameters: a named match first, then the
    /// positional slot, then the declared default. Resolution happens at
    /// most once; re-running the checker is a no-op here.
    fn resolve_arguments(&mut self, call: &mut FunctionCall, parameters: &[Parameter]) -> bool {
        if !call.resolved_args.is_empty() {
            return true;
        }
        let mut resolved = HashMap::new();
        for (index, parameter) in parameters.iter().enumerate() {
            let found = call.arguments.iter().find(|argument| match &argument.name {
                Some(name) => name == &parameter.name,
                None => argument.order == index,
            });
            match found {
                Some(argument) => {
                    resolved.insert(parameter.name.clone(), argument.clone());
                }
                None => match &parameter.default {
                    Some(default) => {
                        resolved.insert(
                            parameter.name.clone(),
                            Argument {
                                token: parameter.token.clone(),
                                expr: default.clone(),
                                name: None,
                                order: usize::MAX,
                                ty: Type::Undetermined,
                            },
                        );
                    }
                    None => {
                        let call_token = call.token.clone();
                        self.error(
                            &call_token,
                            format!(
                                "missing value for parameter \"{}\" (type {}) of function \"{}\"",
                                parameter.name,
                                parameter.ty.describe(),
                                call.name
                            ),
                        );
                        return false;
                    }
                },
            }
        }
        call.resolved_args = resolved;
        true
    }
}

impl Default for TypeChecker {
    fn default() -> Self {
        Self::new()
    }
}

/// Natural type of a literal expression (parameter defaults).
fn literal_type(expr: &Expression) -> Type {
    match &expr.kind {
        ExpressionKind::NumLiteral => match expr.token.kind {
            TokenKind::IntegerLiteral => Type::Int,
            _ => Type::Float,
        },
        ExpressionKind::BoolLiteral(_) => Type::Bool,
        ExpressionKind::StringLiteral => Type::String,
        _ => Type::Undetermined,
    }
}

/// A value fits a slot only when the emitter has a coercion for it:
/// Int, Float and String convert among themselves and widen to Bool,
/// but nothing narrows a Bool back. Containers must match structurally.
fn assignable(from: &Type, to: &Type) -> bool {
    if from == to {
        return true;
    }
    matches!(
        (from, to),
        (
            Type::Int | Type::Float | Type::String,
            Type::Int | Type::Float | Type::String | Type::Bool,
        )
    )
}

fn argument_compatible(argument: &Type, parameter: &Type) -> bool {
    match parameter {
        Type::Any => !matches!(
            argument,
            Type::Void | Type::NoReturn | Type::Generator(_) | Type::Undetermined
        ),
        Type::Appendable => argument.is_appendable(),
        Type::Set(element) if **element == Type::Any => matches!(argument, Type::Set(_)),
        Type::Slice(element) if **element == Type::Any => matches!(argument, Type::Slice(_)),
        Type::Int | Type::Float | Type::String | Type::Bool => assignable(argument, parameter),
        _ => argument == parameter,
    }
}
