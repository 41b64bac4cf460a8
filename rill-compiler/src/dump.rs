//! Stable, human-readable renderings of the intermediate artifacts:
//! the token stream, the (typed) AST, and a canonical expression form.
//! Used by `--debug` output and by the pretty-printing tests.

use crate::ast::{
    Block, ElseBody, Expression, ExpressionKind, Function, FunctionCall, IfStatement, Program,
    Statement,
};
use crate::lexer::{Token, TokenKind};

pub fn dump_tokens(tokens: &[Token]) -> String {
    let mut out = String::new();
    for (index, token) in tokens.iter().enumerate() {
        out.push_str(&format!(
            "{} {:?} \"{}\" {}:{}\n",
            index, token.kind, token.lexeme, token.line, token.column
        ));
    }
    out
}

/// Rebuild the source text from a raw token stream (whitespace and
/// comments retained). String literals get their delimiters back; every
/// other token contributed its lexeme verbatim.
pub fn reconstruct_source(tokens: &[Token]) -> String {
    tokens
        .iter()
        .map(|token| match token.kind {
            TokenKind::StringLiteral => format!("\"{}\"", token.lexeme),
            _ => token.lexeme.clone(),
        })
        .collect()
}

pub fn dump_program(program: &Program) -> String {
    let mut out = String::new();
    out.push_str("Program\n");
    for function in &program.functions {
        dump_function(function, 1, &mut out);
    }
    out
}

fn pad(level: usize) -> String {
    "    ".repeat(level)
}

fn dump_function(function: &Function, level: usize, out: &mut String) {
    out.push_str(&format!(
        "{}Function {} fallible: {} returns: {}\n",
        pad(level),
        function.name.lexeme,
        function.fallible,
        function.return_type.describe()
    ));
    for parameter in &function.parameters {
        let default = parameter
            .default
            .as_ref()
            .map(|expr| format!(" = {}", format_expression(expr)))
            .unwrap_or_default();
        out.push_str(&format!(
            "{}Parameter {} {}{}\n",
            pad(level + 1),
            parameter.name,
            parameter.ty.describe(),
            default
        ));
    }
    dump_block(&function.body, level + 1, out);
}

fn dump_block(block: &Block, level: usize, out: &mut String) {
    out.push_str(&format!("{}CompoundStatement\n", pad(level)));
    for statement in &block.statements {
        dump_statement(statement, level + 1, out);
    }
}

fn dump_statement(statement: &Statement, level: usize, out: &mut String) {
    match statement {
        Statement::NoOp => out.push_str(&format!("{}NoOp\n", pad(level))),
        Statement::Assign(assign) => {
            let kind = if assign.declaration {
                "VarDeclaration"
            } else {
                "VarAssignment"
            };
            out.push_str(&format!(
                "{}{} {} = {}\n",
                pad(level),
                kind,
                assign.target.lexeme,
                format_expression(&assign.value)
            ));
        }
        Statement::Call(call) => dump_call(call, level, out),
        Statement::Compound(block) => dump_block(block, level, out),
        Statement::Return(ret) => {
            let expr = ret
                .expr
                .as_ref()
                .map(format_expression)
                .unwrap_or_default();
            out.push_str(&format!("{}Return {}\n", pad(level), expr));
        }
        Statement::Fail(fail) => {
            out.push_str(&format!(
                "{}Fail {}\n",
                pad(level),
                format_expression(&fail.expr)
            ));
        }
        Statement::If(if_stmt) => dump_if(if_stmt, level, out),
        Statement::Foreach(foreach) => {
            let index = foreach
                .index
                .as_ref()
                .map(|token| format!(", {}", token.lexeme))
                .unwrap_or_default();
            out.push_str(&format!(
                "{}Foreach {} -> {}{}\n",
                pad(level),
                format_expression(&foreach.iterator),
                foreach.variable.lexeme,
                index
            ));
            dump_block(&foreach.body, level + 1, out);
        }
        Statement::Inc(token) => out.push_str(&format!("{}Increment {}\n", pad(level), token.lexeme)),
        Statement::Dec(token) => out.push_str(&format!("{}Decrement {}\n", pad(level), token.lexeme)),
        Statement::Continue(_) => out.push_str(&format!("{}Continue\n", pad(level))),
        Statement::Break(_) => out.push_str(&format!("{}Break\n", pad(level))),
    }
}

fn dump_call(call: &FunctionCall, level: usize, out: &mut String) {
    out.push_str(&format!(
        "{}FunctionCall {} builtin: {}\n",
        pad(level),
        format_call(call),
        call.is_builtin
    ));
    if !call.resolved_args.is_empty() {
        let mut names = call.resolved_args.keys().cloned().collect::<Vec<_>>();
        names.sort();
        for name in names {
            let argument = &call.resolved_args[&name];
            out.push_str(&format!(
                "{}Argument {} ({}) = {}\n",
                pad(level + 1),
                name,
                argument.ty.describe(),
                format_expression(&argument.expr)
            ));
        }
    }
    if let Some(generator) = &call.generator {
        let index = generator
            .index
            .as_ref()
            .map(|token| format!(", {}", token.lexeme))
            .unwrap_or_default();
        out.push_str(&format!(
            "{}Generator -> {}{}\n",
            pad(level + 1),
            generator.variable.lexeme,
            index
        ));
        dump_block(&generator.body, level + 2, out);
    }
    if let Some(body) = &call.error_body {
        out.push_str(&format!("{}ErrorHandler\n", pad(level + 1)));
        dump_block(body, level + 2, out);
    }
}

fn dump_if(if_stmt: &IfStatement, level: usize, out: &mut String) {
    out.push_str(&format!(
        "{}If {} ({})\n",
        pad(level),
        format_expression(&if_stmt.condition),
        if_stmt.comp_type.describe()
    ));
    dump_block(&if_stmt.body, level + 1, out);
    match &if_stmt.else_body {
        ElseBody::None => {}
        ElseBody::Block(block) => {
            out.push_str(&format!("{}Else\n", pad(level)));
            dump_block(block, level + 1, out);
        }
        ElseBody::If(nested) => {
            out.push_str(&format!("{}Else\n", pad(level)));
            dump_if(nested, level + 1, out);
        }
    }
}

/// Canonical rendering of an expression: parentheses appear exactly where
/// precedence requires them, so printing a canonically parenthesized
/// source reproduces it modulo whitespace.
pub fn format_expression(expr: &Expression) -> String {
    match &expr.kind {
        ExpressionKind::NoOp => String::new(),
        ExpressionKind::NumLiteral | ExpressionKind::BoolLiteral(_) => expr.token.lexeme.clone(),
        ExpressionKind::StringLiteral => format!("\"{}\"", expr.token.lexeme),
        ExpressionKind::Var { name } => name.clone(),
        ExpressionKind::IndexedVar { name, index } => {
            format!("{}[{}]", name, format_expression(index))
        }
        ExpressionKind::Range { from, to } => {
            format!("{}..{}", format_expression(from), format_expression(to))
        }
        ExpressionKind::SliceLiteral { elements, .. } => {
            let rendered = elements
                .iter()
                .map(format_expression)
                .collect::<Vec<_>>()
                .join(", ");
            format!("[{}]", rendered)
        }
        ExpressionKind::SetLiteral { elements, .. } => {
            let rendered = elements
                .iter()
                .map(format_expression)
                .collect::<Vec<_>>()
                .join(", ");
            format!("set{{{}}}", rendered)
        }
        ExpressionKind::Unary { operand } => {
            let rendered = format_expression(operand);
            if matches!(operand.kind, ExpressionKind::Binary { .. }) {
                format!("!({})", rendered)
            } else {
                format!("!{}", rendered)
            }
        }
        ExpressionKind::Binary { op, left, right } => {
            let l = format_child(left, op.precedence(), false);
            let r = format_child(right, op.precedence(), true);
            format!("{} {} {}", l, op.symbol(), r)
        }
        ExpressionKind::Assign(assign) => {
            format!(
                "{} = {}",
                assign.target.lexeme,
                format_expression(&assign.value)
            )
        }
        ExpressionKind::Call(call) => format_call(call),
    }
}

fn format_child(child: &Expression, parent_precedence: u8, is_right: bool) -> String {
    let rendered = format_expression(child);
    if let ExpressionKind::Binary { op, .. } = &child.kind {
        let needs_parens = op.precedence() < parent_precedence
            || (op.precedence() == parent_precedence && is_right);
        if needs_parens {
            return format!("({})", rendered);
        }
    }
    rendered
}

fn format_call(call: &FunctionCall) -> String {
    let arguments = call
        .arguments
        .iter()
        .map(|argument| match &argument.name {
            Some(name) => format!("{} = {}", name, format_expression(&argument.expr)),
            None => format_expression(&argument.expr),
        })
        .collect::<Vec<_>>()
        .join(", ");
    let mut rendered = format!("{}({})", call.name, arguments);
    if call.propagates {
        rendered.push('?');
    }
    rendered
}
