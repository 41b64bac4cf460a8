use std::path::PathBuf;

use anyhow::Result;
use rill_compiler::{
    format_expression, Expression, ExpressionKind, Lexer, Parser, Program, SourceFile, SourceId,
    Statement,
};

fn parse_source(contents: &str) -> Result<Program> {
    let file = SourceFile::new(SourceId(0), PathBuf::from("test.rill"), contents.to_string());
    let tokens = Lexer::new(&file).tokenize()?;
    let mut parser = Parser::new(&file, tokens);
    parser.parse()
}

fn first_assign_value(program: &Program) -> &Expression {
    let function = program.functions.first().expect("function");
    match function.body.statements.first().expect("statement") {
        Statement::Assign(assign) => &assign.value,
        other => panic!("expected assignment, got {:?}", other),
    }
}

#[test]
fn parses_top_level_functions_only() {
    let program = parse_source(
        "fn helper(x int) -> int { return x }\nfn main() { y = helper(1) print(y) }\n",
    )
    .expect("parse");
    assert_eq!(program.functions.len(), 2);
    assert_eq!(program.functions[0].name.lexeme, "helper");
    assert_eq!(program.functions[1].name.lexeme, "main");
}

#[test]
fn rejects_free_statements_at_top_level() {
    let err = parse_source("print(\"hello\")\n").expect_err("free statement");
    assert!(err.to_string().contains("expected function declaration"));
}

#[test]
fn rejects_nested_function_declarations() {
    let err = parse_source("fn main() { fn inner() { } }").expect_err("nested fn");
    assert!(err.to_string().contains("nested function"));
}

#[test]
fn rejects_bare_expression_statements() {
    let err = parse_source("fn main() { 1 + 2 }").expect_err("bare expression");
    assert!(err.to_string().contains("expression statements are not allowed"));
}

#[test]
fn rejects_use_of_undeclared_variable() {
    let err = parse_source("fn main() { print(x) }").expect_err("undeclared");
    assert!(err.to_string().contains("use of undeclared variable"));
}

#[test]
fn rejects_positional_after_named_argument() {
    let err = parse_source("fn main() { foo(a = 1, 2) }").expect_err("argument order");
    assert!(err
        .to_string()
        .contains("positional arguments must precede named arguments"));
}

#[test]
fn multiplication_binds_tighter_than_addition() {
    let program = parse_source("fn main() { x = 1 + 2 * 3 print(x) }").expect("parse");
    assert_eq!(format_expression(first_assign_value(&program)), "1 + 2 * 3");
}

#[test]
fn canonical_parenthesization_round_trips() {
    let cases = [
        "(1 + 2) * 3",
        "1 - (2 - 3)",
        "a && b || c == d",
        "1 + 2 - 3",
    ];
    for expression in cases {
        let source = format!("fn main() {{ a = 1 b = 1 c = 1 d = 1 x = {} print(x) }}", expression);
        let program = parse_source(&source).expect("parse");
        let function = program.functions.first().expect("function");
        let assign = function
            .body
            .statements
            .iter()
            .find_map(|statement| match statement {
                Statement::Assign(assign) if assign.target.lexeme == "x" => Some(assign),
                _ => None,
            })
            .expect("assignment to x");
        assert_eq!(format_expression(&assign.value), expression);
    }
}

#[test]
fn method_chaining_desugars_to_prefix_call() {
    let program =
        parse_source("fn main() { s = \"a,b\" xs = s.split(\",\") print(xs) }").expect("parse");
    let function = program.functions.first().expect("function");
    let Statement::Assign(assign) = &function.body.statements[1] else {
        panic!("expected assignment");
    };
    let ExpressionKind::Call(call) = &assign.value.kind else {
        panic!("expected call, got {:?}", assign.value.kind);
    };
    assert_eq!(call.name, "split");
    assert!(call.method_receiver);
    assert_eq!(call.arguments.len(), 2);
    assert!(matches!(
        call.arguments[0].expr.kind,
        ExpressionKind::Var { .. }
    ));
}

#[test]
fn method_chaining_is_left_associative() {
    let program = parse_source(
        "fn main() { s = \"a,b\" out = s.split(\",\").join(\"-\") print(out) }",
    )
    .expect("parse");
    let function = program.functions.first().expect("function");
    let Statement::Assign(assign) = &function.body.statements[1] else {
        panic!("expected assignment");
    };
    let ExpressionKind::Call(outer) = &assign.value.kind else {
        panic!("expected call");
    };
    assert_eq!(outer.name, "join");
    let ExpressionKind::Call(inner) = &outer.arguments[0].expr.kind else {
        panic!("expected nested call");
    };
    assert_eq!(inner.name, "split");
}

#[test]
fn fallible_marker_and_error_suffixes_parse() {
    let program = parse_source(
        "fn parse?(s str) -> int { return stringToInt(s) }\nfn main() { n = parse(\"1\")? print(n) }\n",
    )
    .expect("parse");
    assert!(program.functions[0].fallible);
    let main = &program.functions[1];
    let Statement::Assign(assign) = &main.body.statements[0] else {
        panic!("expected assignment");
    };
    let ExpressionKind::Call(call) = &assign.value.kind else {
        panic!("expected call");
    };
    assert!(call.propagates);
    assert!(call.error_body.is_none());
}

#[test]
fn inline_error_handler_declares_err() {
    let program = parse_source(
        "fn parse?(s str) -> int { return stringToInt(s) }\nfn main() { n = parse(\"1\")? { print(err) } print(n) }\n",
    )
    .expect("parse");
    let main = &program.functions[1];
    let Statement::Assign(assign) = &main.body.statements[0] else {
        panic!("expected assignment");
    };
    let ExpressionKind::Call(call) = &assign.value.kind else {
        panic!("expected call");
    };
    let body = call.error_body.as_ref().expect("error handler body");
    assert!(program.scopes.get(body.scope).symbols.contains_key("err"));
}

#[test]
fn generator_body_attaches_to_read_iterator() {
    let program =
        parse_source("fn main() { for read(\"t.txt\") -> line, i { print(i) print(line) } }")
            .expect("parse");
    let main = &program.functions[0];
    let Statement::Call(call) = &main.body.statements[0] else {
        panic!("expected generator call statement");
    };
    assert_eq!(call.name, "read");
    let generator = call.generator.as_ref().expect("generator body");
    assert_eq!(generator.variable.lexeme, "line");
    assert_eq!(generator.index.as_ref().expect("index").lexeme, "i");
}

#[test]
fn plain_foreach_keeps_its_iterator() {
    let program =
        parse_source("fn main() { xs = [1, 2] for xs -> x { print(x) } }").expect("parse");
    let main = &program.functions[0];
    assert!(matches!(&main.body.statements[1], Statement::Foreach(_)));
}

#[test]
fn assignment_expression_in_condition_parses() {
    let program = parse_source(
        "fn f() -> int { return 1 }\nfn main() { if (x = f()) { print(x) } }",
    )
    .expect("parse");
    let main = &program.functions[1];
    let Statement::If(if_stmt) = &main.body.statements[0] else {
        panic!("expected if statement");
    };
    assert!(matches!(
        if_stmt.condition.kind,
        ExpressionKind::Assign(_)
    ));
}

#[test]
fn duplicate_function_names_are_rejected() {
    let err = parse_source("fn f() { }\nfn f() { }\nfn main() { }").expect_err("duplicate");
    assert!(err.to_string().contains("already defined"));
}

#[test]
fn parse_error_reports_expected_and_found() {
    let err = parse_source("fn main( { }").expect_err("bad parameter list");
    let message = err.to_string();
    assert!(message.contains("expected"), "message: {message}");
    assert!(message.contains("got"), "message: {message}");
}
