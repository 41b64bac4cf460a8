use std::collections::BTreeSet;
use std::mem;

use crate::ast::{
    Assign, BinaryOp, Block, ElseBody, Expression, ExpressionKind, FailStatement,
    ForeachStatement, Function, FunctionCall, IfStatement, Program, ReturnStatement, Statement,
};
use crate::builtins;
use crate::diagnostics::{Diagnostics, Stage};
use crate::lexer::Token;
use crate::preludes;
use crate::scope::{ScopeArena, ScopeId};
use crate::types::{common_type, Type};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CoercionMode {
    Default,
    /// Float literals land in int slots by flooring instead of truncating.
    NumLiteral,
}

enum BuiltinEmit {
    /// Builtin that expands to a whole statement (`append`, `add`).
    Statement(String),
    Expression {
        code: String,
        ty: Type,
        fallible: bool,
    },
}

/// Walks the typed AST and produces the complete Go source file. The
/// walk is read-only over the AST; all mutation happens in the emitter's
/// own accumulators. Imports and preludes live in ordered sets so the
/// output is byte-identical across runs.
pub struct CodeGenerator<'a> {
    program: &'a Program,
    scopes: &'a ScopeArena,
    current_scope: ScopeId,
    indent_level: usize,
    imports: BTreeSet<String>,
    preludes: BTreeSet<String>,
    init_statements: Vec<String>,
    final_statements: Vec<String>,
    pre_statements: Vec<String>,
    post_statements: Vec<String>,
    ignore_pre_statements: bool,
    replacement_count: usize,
    tmp_var_count: usize,
    diagnostics: Diagnostics,
}

impl<'a> CodeGenerator<'a> {
    pub fn new(program: &'a Program) -> Self {
        Self {
            program,
            scopes: &program.scopes,
            current_scope: ScopeId(0),
            indent_level: 0,
            imports: BTreeSet::new(),
            preludes: BTreeSet::new(),
            init_statements: Vec::new(),
            final_statements: Vec::new(),
            pre_statements: Vec::new(),
            post_statements: Vec::new(),
            ignore_pre_statements: false,
            replacement_count: 0,
            tmp_var_count: 0,
            diagnostics: Diagnostics::new(),
        }
    }

    pub fn into_diagnostics(self) -> Diagnostics {
        self.diagnostics
    }

    pub fn generate(&mut self) -> String {
        let program = self.program;
        let functions = program
            .functions
            .iter()
            .map(|function| self.emit_function(function))
            .collect::<Vec<_>>();

        let mut imports = program.imports.clone();
        imports.extend(self.imports.iter().cloned());

        let mut output = String::from("package main\n");
        if !imports.is_empty() {
            output.push('\n');
            for import in &imports {
                output.push_str(&format!("import \"{}\"\n", import));
            }
        }
        for name in &self.preludes {
            output.push_str(preludes::code(name));
        }
        output.push('\n');
        output.push_str(&functions.join("\n\n"));
        output.push('\n');
        output
    }

    fn error(&mut self, token: &Token, message: String) {
        self.diagnostics
            .push(Stage::Emit, message, token.line, token.column);
    }

    fn add_import(&mut self, name: &str) {
        self.imports.insert(name.to_string());
    }

    fn add_prelude(&mut self, name: &str) {
        for import in preludes::imports(name) {
            self.add_import(import);
        }
        self.preludes.insert(name.to_string());
    }

    fn add_pre_statement(&mut self, statement: String) {
        self.pre_statements.push(statement);
    }

    /// Re-seed the pre-statement buffer with statements captured before a
    /// nested block emission, keeping anything the block left behind.
    fn restore_pre_statements(&mut self, mut captured: Vec<String>) {
        captured.append(&mut self.pre_statements);
        self.pre_statements = captured;
    }

    fn indent(&self) -> String {
        "    ".repeat(self.indent_level)
    }

    fn indented(&self, line: &str) -> String {
        format!("{}{}", self.indent(), line)
    }

    // ---- functions and blocks -----------------------------------------

    fn emit_function(&mut self, function: &Function) -> String {
        let name = &function.name.lexeme;
        let returns = if function.fallible {
            if function.return_type == Type::Void {
                "error".to_string()
            } else {
                format!("({}, error)", go_type(&function.return_type))
            }
        } else if function.return_type == Type::Void {
            String::new()
        } else {
            go_type(&function.return_type)
        };

        // A fallible void function still returns its error channel.
        if function.fallible && function.return_type == Type::Void {
            self.post_statements.push("return nil".to_string());
        }

        let parameters = function
            .parameters
            .iter()
            .map(|parameter| format!("{} {}", parameter.name, go_type(&parameter.ty)))
            .collect::<Vec<_>>()
            .join(", ");

        let body = self.emit_block(&function.body);
        if returns.is_empty() {
            format!("func {}({}) {}", name, parameters, body)
        } else {
            format!("func {}({}) {} {}", name, parameters, returns, body)
        }
    }

    /// Emits a braced block. Statement strings carry no indentation on
    /// their first line; nested lines were indented when generated.
    fn emit_block(&mut self, block: &Block) -> String {
        let previous_scope = self.current_scope;
        self.current_scope = block.scope;
        self.indent_level += 1;

        let mut lines: Vec<String> = Vec::new();
        for init in mem::take(&mut self.init_statements) {
            lines.push(self.indented(&init));
        }
        // Final statements are collected up front so statements inside
        // child scopes do not inherit them.
        let finals = mem::take(&mut self.final_statements);

        for statement in &block.statements {
            if !self.ignore_pre_statements {
                self.pre_statements.clear();
            }
            let rendered = self.emit_statement(statement);
            if !self.ignore_pre_statements {
                for pre in mem::take(&mut self.pre_statements) {
                    lines.push(self.indented(&pre));
                }
            }
            if !rendered.is_empty() {
                lines.push(self.indented(&rendered));
            }
        }

        if self.scopes.get(block.scope).return_type != Type::NoReturn {
            for post in mem::take(&mut self.post_statements) {
                lines.push(self.indented(&post));
            }
        }
        for fin in finals {
            lines.push(self.indented(&fin));
        }

        self.indent_level -= 1;
        self.current_scope = previous_scope;

        if lines.is_empty() {
            format!("{{\n{}}}", self.indent())
        } else {
            format!("{{\n{}\n{}}}", lines.join("\n"), self.indent())
        }
    }

    fn emit_statement(&mut self, statement: &Statement) -> String {
        match statement {
            Statement::NoOp => String::new(),
            Statement::Assign(assign) => self.emit_assign(assign),
            Statement::Call(call) => {
                let rendered = self.emit_call(call, &Type::NoCoercion);
                if rendered.is_empty() {
                    return rendered;
                }
                // A fallible call's value lands in a replacement variable;
                // discard it when the call stands alone.
                if self.call_is_fallible(call) && call.resolved_return_type != Type::Void {
                    return format!("_ = {}", rendered);
                }
                rendered
            }
            Statement::Compound(block) => self.emit_block(block),
            Statement::Return(ret) => self.emit_return(ret),
            Statement::Fail(fail) => self.emit_fail(fail),
            Statement::If(if_stmt) => self.emit_if(if_stmt),
            Statement::Foreach(foreach) => self.emit_foreach(foreach),
            Statement::Inc(token) => format!("{}++", token.lexeme),
            Statement::Dec(token) => format!("{}--", token.lexeme),
            Statement::Continue(_) => "continue".to_string(),
            Statement::Break(_) => "break".to_string(),
        }
    }

    fn emit_assign(&mut self, assign: &Assign) -> String {
        let name = assign.target.lexeme.clone();
        let (_, symbol) = self
            .scopes
            .lookup(self.current_scope, &name)
            .expect("assignment target was declared during parsing");
        let symbol_ty = symbol.ty.clone();
        let used = symbol.used;

        let op = if assign.declaration { ":=" } else { "=" };
        let value = self.emit_expr(&assign.value, &symbol_ty);
        let mut rendered = format!("{} {} {}", name, op, value);
        // The host compiler rejects declared-but-unused names.
        if assign.declaration && !used {
            rendered.push_str(&format!("\n{}_ = {}", self.indent(), name));
        }
        rendered
    }

    fn emit_return(&mut self, ret: &ReturnStatement) -> String {
        let returning = self
            .scopes
            .closest_returning(self.current_scope)
            .expect("return inside a function scope");
        let scope = self.scopes.get(returning);
        let return_type = scope.return_type.clone();
        let fallible = scope.fallible;

        match &ret.expr {
            Some(expr) => {
                let mut value = self.emit_expr(expr, &return_type);
                if fallible {
                    value.push_str(", nil");
                }
                format!("return {}", value)
            }
            None => {
                if fallible {
                    "return nil".to_string()
                } else {
                    "return".to_string()
                }
            }
        }
    }

    fn emit_fail(&mut self, fail: &FailStatement) -> String {
        let returning = self
            .scopes
            .closest_returning(self.current_scope)
            .expect("fail inside a function scope");
        let return_type = self.scopes.get(returning).return_type.clone();

        let message = self.emit_expr(&fail.expr, &Type::String);
        self.add_import("errors");
        if return_type == Type::Void {
            format!("return errors.New({})", message)
        } else {
            format!(
                "return {}, errors.New({})",
                self.zero_value(&return_type),
                message
            )
        }
    }

    fn emit_if(&mut self, if_stmt: &IfStatement) -> String {
        let condition = self.emit_condition(&if_stmt.condition, &if_stmt.comp_type);
        // Hoisted assignments and error desugarings from the condition
        // must survive the body emission and flush before the `if`.
        let condition_pres = mem::take(&mut self.pre_statements);
        let body = self.emit_block(&if_stmt.body);
        let else_code = match &if_stmt.else_body {
            ElseBody::None => String::new(),
            ElseBody::Block(block) => format!(" else {}", self.emit_block(block)),
            ElseBody::If(nested) => format!(" else {}", self.emit_if(nested)),
        };
        self.restore_pre_statements(condition_pres);
        format!("if {} {}{}", condition, body, else_code)
    }

    /// The emitted condition must be a Go boolean: comparisons and logical
    /// operators already are, anything else coerces to Bool as a whole.
    fn emit_condition(&mut self, condition: &Expression, comp_type: &Type) -> String {
        match &condition.kind {
            ExpressionKind::Binary { op, .. } if op.is_comparison() || op.is_logical() => {
                self.emit_expr(condition, comp_type)
            }
            _ => {
                let from = self.static_type(condition);
                let content = self.emit_expr(condition, &Type::NoCoercion);
                self.coerce(content, &from, &Type::Bool, CoercionMode::Default)
            }
        }
    }

    fn emit_foreach(&mut self, foreach: &ForeachStatement) -> String {
        // Counted loop over a range iterator.
        if let ExpressionKind::Range { from, to } = &foreach.iterator.kind {
            let variable = foreach.variable.lexeme.clone();
            let from = self.emit_expr(from, &Type::Int);
            let to = self.emit_expr(to, &Type::Int);
            let header_pres = mem::take(&mut self.pre_statements);
            let body = self.emit_block(&foreach.body);
            self.restore_pre_statements(header_pres);
            return format!(
                "for {} := {}; {} <= {}; {}++ {}",
                variable, from, variable, to, variable, body
            );
        }

        let iterator_ty = self.static_type(&foreach.iterator);
        let iterator = self.emit_expr(&foreach.iterator, &Type::NoCoercion);
        let body_scope = foreach.body.scope;
        let variable = foreach.variable.lexeme.clone();
        let value_used = self
            .scopes
            .get(body_scope)
            .symbols
            .get(&variable)
            .map(|symbol| symbol.used)
            .unwrap_or(false);
        let index_name = foreach.index.as_ref().and_then(|token| {
            let used = self
                .scopes
                .get(body_scope)
                .symbols
                .get(&token.lexeme)
                .map(|symbol| symbol.used)
                .unwrap_or(false);
            used.then(|| token.lexeme.clone())
        });

        // Iterating a string yields runes; the language's element type is
        // a one-character string, so rebind inside the body.
        let header_pres = mem::take(&mut self.pre_statements);

        if iterator_ty == Type::String {
            self.tmp_var_count += 1;
            let rune_var = format!("__char{}", self.tmp_var_count);
            self.init_statements
                .push(format!("{} := string({})", variable, rune_var));
            self.init_statements.push(format!("_ = {}", variable));
            let body = self.emit_block(&foreach.body);
            self.restore_pre_statements(header_pres);
            let index = index_name.unwrap_or_else(|| "_".to_string());
            return format!("for {}, {} := range {} {}", index, rune_var, iterator, body);
        }

        let body = self.emit_block(&foreach.body);
        self.restore_pre_statements(header_pres);
        match (index_name, value_used) {
            (Some(index), true) => {
                format!("for {}, {} := range {} {}", index, variable, iterator, body)
            }
            (None, true) => format!("for _, {} := range {} {}", variable, iterator, body),
            (Some(index), false) => format!("for {} := range {} {}", index, iterator, body),
            (None, false) => format!("for range {} {}", iterator, body),
        }
    }

    // ---- expressions --------------------------------------------------

    fn emit_expr(&mut self, expr: &Expression, coercion: &Type) -> String {
        match &expr.kind {
            ExpressionKind::NoOp => String::new(),
            ExpressionKind::NumLiteral => {
                let from = expr.literal_num_type();
                self.coerce(
                    expr.token.lexeme.clone(),
                    &from,
                    coercion,
                    CoercionMode::NumLiteral,
                )
            }
            ExpressionKind::BoolLiteral(_) => self.coerce(
                expr.token.lexeme.clone(),
                &Type::Bool,
                coercion,
                CoercionMode::Default,
            ),
            ExpressionKind::StringLiteral => self.coerce(
                format!("\"{}\"", expr.token.lexeme),
                &Type::String,
                coercion,
                CoercionMode::Default,
            ),
            ExpressionKind::Var { name } => {
                if *coercion == Type::NoCoercion {
                    return name.clone();
                }
                let ty = self
                    .scopes
                    .lookup(self.current_scope, name)
                    .map(|(_, symbol)| symbol.ty.clone())
                    .expect("variable was declared during parsing");
                self.coerce(name.clone(), &ty, coercion, CoercionMode::Default)
            }
            ExpressionKind::IndexedVar { name, index } => self.emit_indexed(expr, name, index, coercion),
            ExpressionKind::Range { from, to } => {
                self.add_prelude("createRange");
                let from = self.emit_expr(from, &Type::Int);
                let to = self.emit_expr(to, &Type::Int);
                let content = format!("__createRange({}, {})", from, to);
                self.coerce(
                    content,
                    &Type::Slice(Box::new(Type::Int)),
                    coercion,
                    CoercionMode::Default,
                )
            }
            ExpressionKind::SliceLiteral {
                elements,
                element_type,
            } => {
                let rendered = elements
                    .iter()
                    .map(|element| self.emit_expr(element, element_type))
                    .collect::<Vec<_>>()
                    .join(", ");
                let content = format!("[]{}{{{}}}", go_type(element_type), rendered);
                self.coerce(
                    content,
                    &Type::Slice(Box::new(element_type.clone())),
                    coercion,
                    CoercionMode::Default,
                )
            }
            ExpressionKind::SetLiteral {
                elements,
                element_type,
            } => {
                self.add_prelude("makeSet");
                let rendered = elements
                    .iter()
                    .map(|element| self.emit_expr(element, element_type))
                    .collect::<Vec<_>>()
                    .join(", ");
                let content = format!("__makeSet[{}]({})", go_type(element_type), rendered);
                self.coerce(
                    content,
                    &Type::Set(Box::new(element_type.clone())),
                    coercion,
                    CoercionMode::Default,
                )
            }
            ExpressionKind::Unary { operand } => {
                format!("!({})", self.emit_expr(operand, &Type::Bool))
            }
            ExpressionKind::Binary { op, left, right } => {
                self.emit_binary(*op, left, right, coercion)
            }
            ExpressionKind::Assign(assign) => {
                let pre = self.emit_assign(assign);
                self.add_pre_statement(pre);
                let name = assign.target.lexeme.clone();
                if *coercion == Type::NoCoercion {
                    return name;
                }
                let ty = self
                    .scopes
                    .lookup(self.current_scope, &name)
                    .map(|(_, symbol)| symbol.ty.clone())
                    .expect("assignment target was declared during parsing");
                self.coerce(name, &ty, coercion, CoercionMode::Default)
            }
            ExpressionKind::Call(call) => self.emit_call(call, coercion),
        }
    }

    fn emit_indexed(
        &mut self,
        expr: &Expression,
        name: &str,
        index: &Expression,
        coercion: &Type,
    ) -> String {
        let symbol_ty = self
            .scopes
            .lookup(self.current_scope, name)
            .map(|(_, symbol)| symbol.ty.clone())
            .expect("indexed variable was declared during parsing");

        // An inclusive range indexer becomes a half-open Go slice.
        if let ExpressionKind::Range { from, to } = &index.kind {
            let from = self.emit_expr(from, &Type::Int);
            let to = self.emit_expr(to, &Type::Int);
            let content = format!("{}[{} : {}+1]", name, from, to);
            return self.coerce(content, &symbol_ty, coercion, CoercionMode::Default);
        }

        let index = self.emit_expr(index, &Type::Int);
        match &symbol_ty {
            Type::Slice(element) => {
                let content = format!("{}[{}]", name, index);
                let element = (**element).clone();
                self.coerce(content, &element, coercion, CoercionMode::Default)
            }
            Type::String => {
                let content = format!("string({}[{}])", name, index);
                self.coerce(content, &Type::String, coercion, CoercionMode::Default)
            }
            _ => {
                self.error(
                    &expr.token,
                    format!("cannot index a value of type {}", symbol_ty.describe()),
                );
                String::new()
            }
        }
    }

    fn emit_binary(
        &mut self,
        op: BinaryOp,
        left: &Expression,
        right: &Expression,
        coercion: &Type,
    ) -> String {
        // `+` on two sets is a union.
        if op == BinaryOp::Add {
            let left_ty = self.static_type(left);
            if matches!(left_ty, Type::Set(_)) {
                self.add_prelude("setUnion");
                let l = self.emit_expr(left, &Type::NoCoercion);
                let r = self.emit_expr(right, &Type::NoCoercion);
                let content = format!("__setUnion({}, {})", l, r);
                return self.coerce(content, &left_ty, coercion, CoercionMode::Default);
            }
        }
        let child_coercion = if op.is_logical() {
            Type::Bool
        } else {
            coercion.clone()
        };
        let l = self.emit_with_parens(left, op, &child_coercion, false);
        let r = self.emit_with_parens(right, op, &child_coercion, true);
        format!("{} {} {}", l, op.symbol(), r)
    }

    /// A child binary operation is parenthesized iff its precedence is
    /// strictly lower than the parent's, or equal while sitting on the
    /// right-hand side (preserving left-associative grouping).
    fn emit_with_parens(
        &mut self,
        child: &Expression,
        parent_op: BinaryOp,
        coercion: &Type,
        is_right: bool,
    ) -> String {
        let rendered = self.emit_expr(child, coercion);
        if let ExpressionKind::Binary { op: child_op, .. } = &child.kind {
            let needs_parens = child_op.precedence() < parent_op.precedence()
                || (child_op.precedence() == parent_op.precedence() && is_right);
            if needs_parens {
                return format!("({})", rendered);
            }
        }
        rendered
    }

    // ---- calls --------------------------------------------------------

    fn call_is_fallible(&self, call: &FunctionCall) -> bool {
        if call.generator.is_some() || call.name == "print" {
            return false;
        }
        if call.is_builtin {
            return builtins::lookup(&call.name)
                .map(|builtin| builtin.fallible)
                .unwrap_or(false);
        }
        self.scopes
            .lookup(self.current_scope, &call.name)
            .map(|(_, symbol)| symbol.fallible)
            .unwrap_or(false)
    }

    fn emit_call(&mut self, call: &FunctionCall, coercion: &Type) -> String {
        if call.name == "print" {
            self.add_import("fmt");
            let arguments = call
                .arguments
                .iter()
                .map(|argument| self.emit_expr(&argument.expr, &Type::NoCoercion))
                .collect::<Vec<_>>()
                .join(", ");
            return format!("fmt.Println({})", arguments);
        }

        if call.generator.is_some() {
            return self.emit_read(call);
        }

        let (call_str, return_type, fallible) = if call.is_builtin {
            match self.emit_builtin(call) {
                BuiltinEmit::Statement(rendered) => return rendered,
                BuiltinEmit::Expression {
                    code,
                    ty,
                    fallible,
                } => (code, ty, fallible),
            }
        } else {
            let (_, symbol) = self
                .scopes
                .lookup(self.current_scope, &call.name)
                .expect("callee resolved during type checking");
            let parameters = symbol.parameters.clone().expect("function symbol");
            let return_type = symbol.ty.clone();
            let symbol_fallible = symbol.fallible;
            let arguments = parameters
                .iter()
                .map(|parameter| {
                    let argument = call
                        .resolved_args
                        .get(&parameter.name)
                        .expect("argument resolved during type checking");
                    self.emit_expr(&argument.expr, &parameter.ty)
                })
                .collect::<Vec<_>>()
                .join(", ");
            (
                format!("{}({})", call.name, arguments),
                return_type,
                symbol_fallible,
            )
        };

        if !fallible {
            return self.coerce(call_str, &return_type, coercion, CoercionMode::Default);
        }
        self.emit_fallible_call(call, call_str, &return_type, coercion)
    }

    /// Desugars a call into the dual-assignment pre-statement plus an
    /// error disposition: inline handler, propagation, or the
    /// non-propagatable helper. The expression slot left behind is the
    /// replacement variable.
    fn emit_fallible_call(
        &mut self,
        call: &FunctionCall,
        call_str: String,
        return_type: &Type,
        coercion: &Type,
    ) -> String {
        self.replacement_count += 1;
        let err_var = format!("__err_{}", self.replacement_count);

        let returning = self
            .scopes
            .closest_returning(self.current_scope)
            .expect("fallible call inside a function scope");
        let scope_return = self.scopes.get(returning).return_type.clone();
        let scope_fallible = self.scopes.get(returning).fallible;

        let mut replacement = String::new();
        let assignment = if *return_type == Type::Void {
            format!("{} := {}", err_var, call_str)
        } else {
            let result_var = format!("__{}_result_{}", call.name, self.replacement_count);
            replacement = self.coerce(
                result_var.clone(),
                return_type,
                coercion,
                CoercionMode::Default,
            );
            format!("{}, {} := {}", result_var, err_var, call_str)
        };
        self.add_pre_statement(assignment);

        if let Some(body) = &call.error_body {
            // Bind the user-visible `err` in the if header so nested
            // handlers never collide; discard it when the body ignores it.
            let err_used = self
                .scopes
                .get(body.scope)
                .symbols
                .get("err")
                .map(|symbol| symbol.used)
                .unwrap_or(false);
            if !err_used {
                self.init_statements.push("_ = err".to_string());
            }
            self.ignore_pre_statements = true;
            let rendered = self.emit_block(body);
            self.ignore_pre_statements = false;
            self.add_pre_statement(format!("if err := {}; err != nil {}", err_var, rendered));
        } else if scope_fallible {
            let line = if scope_return == Type::Void {
                format!("if {} != nil {{ return {} }}", err_var, err_var)
            } else {
                format!(
                    "if {} != nil {{ return {}, {} }}",
                    err_var,
                    self.zero_value(&scope_return),
                    err_var
                )
            };
            self.add_pre_statement(line);
        } else {
            self.add_prelude("handleNonPropagatableError");
            self.add_pre_statement(format!("__handleNonPropagatableError({})", err_var));
        }

        replacement
    }

    fn emit_builtin(&mut self, call: &FunctionCall) -> BuiltinEmit {
        let resolved = |name: &str| resolved_expr(call, name);

        match call.name.as_str() {
            "len" => {
                let var = self.emit_expr(resolved("var"), &Type::NoCoercion);
                BuiltinEmit::Expression {
                    code: format!("len({})", var),
                    ty: Type::Int,
                    fallible: false,
                }
            }
            "append" => {
                let dest_expr = resolved("dest");
                let dest_ty = self.static_type(dest_expr);
                let dest = self.emit_expr(dest_expr, &Type::NoCoercion);
                match &dest_ty {
                    Type::Slice(element) => {
                        let element = (**element).clone();
                        let value = self.emit_expr(resolved("var"), &element);
                        BuiltinEmit::Statement(format!("{} = append({}, {})", dest, dest, value))
                    }
                    Type::String => {
                        let value = self.emit_expr(resolved("var"), &Type::String);
                        BuiltinEmit::Statement(format!("{} += {}", dest, value))
                    }
                    _ => {
                        self.error(
                            &call.token,
                            format!("cannot append to a value of type {}", dest_ty.describe()),
                        );
                        BuiltinEmit::Statement(String::new())
                    }
                }
            }
            "add" => {
                let dest_expr = resolved("dest");
                let element = self
                    .static_type(dest_expr)
                    .element_type()
                    .unwrap_or(Type::Undetermined);
                let dest = self.emit_expr(dest_expr, &Type::NoCoercion);
                let value = self.emit_expr(resolved("var"), &element);
                BuiltinEmit::Statement(format!("{}[{}] = struct{{}}{{}}", dest, value))
            }
            "has" => {
                self.add_prelude("setContains");
                let haystack_expr = resolved("haystack");
                let element = self
                    .static_type(haystack_expr)
                    .element_type()
                    .unwrap_or(Type::Undetermined);
                let haystack = self.emit_expr(haystack_expr, &Type::NoCoercion);
                let needle = self.emit_expr(resolved("needle"), &element);
                BuiltinEmit::Expression {
                    code: format!("__setContains({}, {})", haystack, needle),
                    ty: Type::Bool,
                    fallible: false,
                }
            }
            "del" => {
                self.add_prelude("setDelete");
                let set_expr = resolved("set");
                let element = self
                    .static_type(set_expr)
                    .element_type()
                    .unwrap_or(Type::Undetermined);
                let set = self.emit_expr(set_expr, &Type::NoCoercion);
                let value = self.emit_expr(resolved("value"), &element);
                BuiltinEmit::Expression {
                    code: format!("__setDelete({}, {})", set, value),
                    ty: Type::Bool,
                    fallible: false,
                }
            }
            "join" => {
                let list_expr = resolved("list");
                let element = self
                    .static_type(list_expr)
                    .element_type()
                    .unwrap_or(Type::Undetermined);
                let list = self.emit_expr(list_expr, &Type::NoCoercion);
                let sep = self.emit_expr(resolved("sep"), &Type::String);
                let code = match element {
                    Type::String => {
                        self.add_import("strings");
                        format!("strings.Join({}, {})", list, sep)
                    }
                    Type::Int => {
                        self.add_prelude("joinIntSlice");
                        format!("__joinIntSlice({}, {})", list, sep)
                    }
                    Type::Float => {
                        self.add_prelude("joinFloatSlice");
                        format!("__joinFloatSlice({}, {})", list, sep)
                    }
                    other => {
                        self.error(
                            &call.token,
                            format!("cannot join a slice of {}", other.describe()),
                        );
                        String::new()
                    }
                };
                BuiltinEmit::Expression {
                    code,
                    ty: Type::String,
                    fallible: false,
                }
            }
            "split" => {
                self.add_import("strings");
                let string = self.emit_expr(resolved("string"), &Type::String);
                let sep = self.emit_expr(resolved("sep"), &Type::String);
                BuiltinEmit::Expression {
                    code: format!("strings.Split({}, {})", string, sep),
                    ty: Type::Slice(Box::new(Type::String)),
                    fallible: false,
                }
            }
            "match" => {
                self.add_prelude("regexMatch");
                let haystack = self.emit_expr(resolved("haystack"), &Type::String);
                let regex = self.emit_expr(resolved("regex"), &Type::String);
                BuiltinEmit::Expression {
                    code: format!("__regexMatch({}, {})", haystack, regex),
                    ty: Type::Bool,
                    fallible: false,
                }
            }
            "capture" => {
                self.add_prelude("regexCapture");
                let haystack = self.emit_expr(resolved("haystack"), &Type::String);
                let regex = self.emit_expr(resolved("regex"), &Type::String);
                BuiltinEmit::Expression {
                    code: format!("__regexCapture({}, {})", haystack, regex),
                    ty: Type::Slice(Box::new(Type::String)),
                    fallible: false,
                }
            }
            "find" => {
                self.add_prelude("regexFind");
                let haystack = self.emit_expr(resolved("haystack"), &Type::String);
                let regex = self.emit_expr(resolved("regex"), &Type::String);
                BuiltinEmit::Expression {
                    code: format!("__regexFind({}, {})", haystack, regex),
                    ty: Type::Slice(Box::new(Type::String)),
                    fallible: false,
                }
            }
            "slurp" => {
                self.add_prelude("slurpFile");
                let path = self.emit_expr(resolved("path"), &Type::String);
                BuiltinEmit::Expression {
                    code: format!("__slurpFile({})", path),
                    ty: Type::String,
                    fallible: false,
                }
            }
            "stringToInt" => {
                self.add_prelude("parseInt");
                let var = self.emit_expr(resolved("var"), &Type::String);
                BuiltinEmit::Expression {
                    code: format!("__parseInt({})", var),
                    ty: Type::Int,
                    fallible: true,
                }
            }
            "stringToFloat" => {
                self.add_prelude("parseFloat");
                let var = self.emit_expr(resolved("var"), &Type::String);
                BuiltinEmit::Expression {
                    code: format!("__parseFloat({})", var),
                    ty: Type::Float,
                    fallible: true,
                }
            }
            other => unreachable!("no emission template for builtin {:?}", other),
        }
    }

    /// Expands `read(...) -> var[, idx] { body }` into a scanner loop.
    /// Temporaries are numbered so nested reads never collide.
    fn emit_read(&mut self, call: &FunctionCall) -> String {
        self.tmp_var_count += 1;
        let n = self.tmp_var_count;
        self.add_import("bufio");
        self.add_import("os");

        let generator = call.generator.as_ref().expect("generator body present");
        let path_expr = &call
            .resolved_args
            .get("path")
            .expect("argument resolved during type checking")
            .expr;
        let chomp_expr = &call
            .resolved_args
            .get("chomp")
            .expect("argument resolved during type checking")
            .expr;
        let path = self.emit_expr(path_expr, &Type::String);
        let chomp = self.emit_expr(chomp_expr, &Type::Bool);

        let variable = generator.variable.lexeme.clone();
        let element_ty = self
            .scopes
            .get(generator.body.scope)
            .symbols
            .get(&variable)
            .map(|symbol| symbol.ty.clone())
            .expect("generator variable declared during parsing");

        if let Some(index) = &generator.index {
            self.init_statements.push(format!("__counter{}++", n));
            self.init_statements
                .push(format!("{} := __counter{}", index.lexeme, n));
            self.init_statements.push(format!("_ = {}", index.lexeme));
        }
        match element_ty {
            Type::String => {
                self.init_statements
                    .push(format!("{} := __scanner{}.Text()", variable, n));
                self.init_statements.push(format!(
                    "if !__chomp{} {{ {} = {} + \"\\n\" }}",
                    n, variable, variable
                ));
            }
            _ => {
                self.add_import("strings");
                let sep_expr = &call
                    .resolved_args
                    .get("sep")
                    .expect("argument resolved during type checking")
                    .expr;
                let sep = self.emit_expr(sep_expr, &Type::String);
                self.init_statements
                    .push(format!("__string{} := __scanner{}.Text()", n, n));
                self.init_statements
                    .push(format!("if !__chomp{} {{ __string{} += \"\\n\" }}", n, n));
                self.init_statements.push(format!(
                    "{} := strings.Split(__string{}, {})",
                    variable, n, sep
                ));
            }
        }
        self.init_statements.push(format!("_ = {}", variable));

        let header_pres = mem::take(&mut self.pre_statements);
        let body = self.emit_block(&generator.body);
        self.restore_pre_statements(header_pres);

        self.replacement_count += 1;
        let err_var = format!("__err_{}", self.replacement_count);
        self.add_prelude("handleNonPropagatableError");

        let mut lines = vec![format!("__file{}, {} := os.Open({})", n, err_var, path)];
        lines.push(self.indented(&format!("__handleNonPropagatableError({})", err_var)));
        lines.push(self.indented(&format!("defer __file{}.Close()", n)));
        if generator.index.is_some() {
            lines.push(self.indented(&format!("__counter{} := -1", n)));
        }
        lines.push(self.indented(&format!("__scanner{} := bufio.NewScanner(__file{})", n, n)));
        lines.push(self.indented(&format!("__chomp{} := {}", n, chomp)));
        lines.push(self.indented(&format!("for __scanner{}.Scan() {}", n, body)));
        lines.join("\n")
    }

    // ---- coercion and types -------------------------------------------

    /// Static type of an already-checked expression, derived from the
    /// analysis slots the type checker filled in.
    fn static_type(&self, expr: &Expression) -> Type {
        match &expr.kind {
            ExpressionKind::NoOp => Type::Undetermined,
            ExpressionKind::NumLiteral => expr.literal_num_type(),
            ExpressionKind::BoolLiteral(_) => Type::Bool,
            ExpressionKind::StringLiteral => Type::String,
            ExpressionKind::Var { name } => self
                .scopes
                .lookup(self.current_scope, name)
                .map(|(_, symbol)| symbol.ty.clone())
                .unwrap_or(Type::Undetermined),
            ExpressionKind::IndexedVar { name, index } => {
                let ty = self
                    .scopes
                    .lookup(self.current_scope, name)
                    .map(|(_, symbol)| symbol.ty.clone())
                    .unwrap_or(Type::Undetermined);
                if matches!(index.kind, ExpressionKind::Range { .. }) {
                    ty
                } else {
                    ty.element_type().unwrap_or(Type::Undetermined)
                }
            }
            ExpressionKind::Range { .. } => Type::Slice(Box::new(Type::Int)),
            ExpressionKind::SliceLiteral { element_type, .. } => {
                Type::Slice(Box::new(element_type.clone()))
            }
            ExpressionKind::SetLiteral { element_type, .. } => {
                Type::Set(Box::new(element_type.clone()))
            }
            ExpressionKind::Unary { .. } => Type::Bool,
            ExpressionKind::Binary { op, left, right } => {
                if op.is_logical() {
                    Type::Bool
                } else {
                    common_type(&self.static_type(left), &self.static_type(right))
                }
            }
            ExpressionKind::Assign(assign) => self
                .scopes
                .lookup(self.current_scope, &assign.target.lexeme)
                .map(|(_, symbol)| symbol.ty.clone())
                .unwrap_or(Type::Undetermined),
            ExpressionKind::Call(call) => call.resolved_return_type.clone(),
        }
    }

    fn zero_value(&mut self, ty: &Type) -> String {
        match ty {
            Type::Int | Type::Float => "0".to_string(),
            Type::String => "\"\"".to_string(),
            Type::Bool => "false".to_string(),
            Type::Slice(_) | Type::Set(_) => format!("{}{{}}", go_type(ty)),
            _ => {
                self.diagnostics.push(
                    Stage::Emit,
                    format!("no zero value for type {}", ty.describe()),
                    0,
                    0,
                );
                "nil".to_string()
            }
        }
    }

    /// Wrap `content` so a value of type `from` fits a slot expecting
    /// `to`. Identity on equal types and on the NoCoercion sentinel.
    fn coerce(&mut self, content: String, from: &Type, to: &Type, mode: CoercionMode) -> String {
        if from == to
            || matches!(
                to,
                Type::NoCoercion | Type::Any | Type::Appendable | Type::Undetermined
            )
        {
            return content;
        }
        match (from, to) {
            (Type::Int, Type::Float) => format!("float64({})", content),
            (Type::Int, Type::String) => {
                self.add_prelude("intToString");
                format!("strconv.Itoa({})", content)
            }
            (Type::Int, Type::Bool) => format!("{} != 0", content),
            (Type::Float, Type::Int) => {
                if mode == CoercionMode::NumLiteral {
                    self.add_import("math");
                    format!("int(math.Floor({}))", content)
                } else {
                    format!("int({})", content)
                }
            }
            (Type::Float, Type::String) => {
                self.add_import("strconv");
                format!("strconv.FormatFloat({}, 'f', -1, 64)", content)
            }
            (Type::Float, Type::Bool) => format!("{} != 0", content),
            (Type::String, Type::Int) => {
                self.add_prelude("stringToInt");
                format!("__stringToInt({})", content)
            }
            (Type::String, Type::Float) => {
                self.add_prelude("stringToFloat");
                format!("__stringToFloat({})", content)
            }
            (Type::String, Type::Bool) => format!("len({}) > 0", content),
            (Type::Slice(_), Type::Bool) | (Type::Set(_), Type::Bool) => {
                format!("len({}) > 0", content)
            }
            (Type::Slice(_), Type::Slice(_)) | (Type::Set(_), Type::Set(_)) => content,
            _ => {
                self.diagnostics.push(
                    Stage::Emit,
                    format!("cannot coerce {} to {}", from.describe(), to.describe()),
                    0,
                    0,
                );
                content
            }
        }
    }
}

fn resolved_expr<'b>(call: &'b FunctionCall, name: &str) -> &'b Expression {
    &call
        .resolved_args
        .get(name)
        .expect("argument resolved during type checking")
        .expr
}

pub(crate) fn go_type(ty: &Type) -> String {
    match ty {
        Type::Int => "int".to_string(),
        Type::Float => "float64".to_string(),
        Type::String => "string".to_string(),
        Type::Bool => "bool".to_string(),
        Type::Void => String::new(),
        Type::Slice(element) => format!("[]{}", go_type(element)),
        Type::Set(element) => format!("map[{}]struct{{}}", go_type(element)),
        other => unreachable!("no Go type for {}", other.describe()),
    }
}
