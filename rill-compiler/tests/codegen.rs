use std::path::PathBuf;

use rill_compiler::{CompileOptions, Compiler, SourceFile, SourceId};

fn compile_to_go(source: &str) -> String {
    let mut compiler = Compiler::new(CompileOptions::default());
    let file = SourceFile::new(SourceId(0), PathBuf::from("test.rill"), source.to_string());
    match compiler.compile(&file) {
        Ok(compilation) => compilation.go_source,
        Err(_) => panic!(
            "compilation failed: {:?}",
            compiler
                .diagnostics()
                .entries()
                .iter()
                .map(|diagnostic| diagnostic.message.clone())
                .collect::<Vec<_>>()
        ),
    }
}

#[test]
fn arithmetic_assignment_keeps_precedence() {
    let go = compile_to_go("fn main() { x = 1 + 2 * 3 print(x) }");
    assert!(go.contains("x := 1 + 2 * 3"), "generated:\n{go}");
    assert!(go.contains("fmt.Println(x)"));
    assert!(go.contains("import \"fmt\""));
}

#[test]
fn range_iterator_emits_counted_loop() {
    let go = compile_to_go("fn main() { for 1..3 -> i { print(i) } }");
    assert!(
        go.contains("for i := 1; i <= 3; i++ {"),
        "generated:\n{go}"
    );
}

#[test]
fn join_on_int_slice_uses_prelude_helper() {
    let go = compile_to_go("fn main() { xs = [1, 2, 3] print(join(xs, \"-\")) }");
    assert!(go.contains("xs := []int{1, 2, 3}"), "generated:\n{go}");
    assert!(go.contains("fmt.Println(__joinIntSlice(xs, \"-\"))"));
    assert!(go.contains("func __joinIntSlice(list []int, sep string) string"));
}

#[test]
fn fallible_function_returns_value_and_error() {
    let go = compile_to_go(
        "fn parse?(s str) -> int { return stringToInt(s) }\nfn main() { n = parse(\"abc\")? print(n) }\n",
    );
    assert!(go.contains("func parse(s string) (int, error)"), "generated:\n{go}");
    assert!(go.contains("__parseInt(s)"));
    assert!(go.contains("if __err_1 != nil { return 0, __err_1 }"));
    assert!(go.contains("__handleNonPropagatableError(__err_2)"));
    assert!(go.contains("func __parseInt(s string) (int, error)"));
}

#[test]
fn inline_error_handler_binds_err_in_if_header() {
    let go = compile_to_go(
        "fn parse?(s str) -> int { return stringToInt(s) }\nfn main() { n = parse(\"abc\")? { print(\"boom\") } print(n) }\n",
    );
    assert!(go.contains("if err := __err_2; err != nil {"), "generated:\n{go}");
    assert!(go.contains("_ = err"));
    assert!(go.contains("fmt.Println(\"boom\")"));
}

#[test]
fn read_generator_expands_to_scanner_loop() {
    let go = compile_to_go("fn main() { for read(\"t.txt\") -> line { print(line) } }");
    assert!(go.contains("__file1, __err_1 := os.Open(\"t.txt\")"), "generated:\n{go}");
    assert!(go.contains("defer __file1.Close()"));
    assert!(go.contains("__scanner1 := bufio.NewScanner(__file1)"));
    assert!(go.contains("__chomp1 := true"));
    assert!(go.contains("for __scanner1.Scan() {"));
    assert!(go.contains("line := __scanner1.Text()"));
    assert!(go.contains("import \"bufio\""));
}

#[test]
fn read_with_separator_splits_each_line() {
    let go = compile_to_go(
        "fn main() { for read(\"t.tsv\", sep = \"\\t\") -> fields { print(fields) } }",
    );
    assert!(
        go.contains("fields := strings.Split(__string1, \"\\t\")"),
        "generated:\n{go}"
    );
}

#[test]
fn read_with_index_variable_counts_iterations() {
    let go = compile_to_go(
        "fn main() { for read(\"t.txt\") -> line, i { print(i) print(line) } }",
    );
    assert!(go.contains("__counter1 := -1"), "generated:\n{go}");
    assert!(go.contains("__counter1++"));
    assert!(go.contains("i := __counter1"));
}

#[test]
fn set_literal_and_membership_use_set_helpers() {
    let go = compile_to_go(
        "fn main() { s = set{1, 2, 2, 3} print(has(s, 2)) print(has(s, 4)) }",
    );
    assert!(go.contains("s := __makeSet[int](1, 2, 2, 3)"), "generated:\n{go}");
    assert!(go.contains("fmt.Println(__setContains(s, 2))"));
    assert!(go.contains("func __makeSet[T comparable]"));
    assert!(go.contains("func __setContains[T comparable]"));
}

#[test]
fn unused_variable_gets_a_discard() {
    let go = compile_to_go("fn main() { x = 5 }");
    assert!(go.contains("x := 5"), "generated:\n{go}");
    assert!(go.contains("_ = x"));
}

#[test]
fn identity_coercion_emits_verbatim() {
    let go = compile_to_go("fn main() { x = 1 y = x print(y) }");
    assert!(go.contains("y := x"), "generated:\n{go}");
}

#[test]
fn float_literal_in_int_slot_floors() {
    let go = compile_to_go(
        "fn ident(a int) -> int { return a }\nfn main() { x = ident(2.9) print(x) }\n",
    );
    assert!(go.contains("ident(int(math.Floor(2.9)))"), "generated:\n{go}");
    assert!(go.contains("import \"math\""));
}

#[test]
fn numeric_reassignment_widens_to_bool() {
    // The reverse direction (Bool into a numeric slot) is a type error;
    // see the type_errors tests.
    let go = compile_to_go("fn main() { b = true b = 1 print(b) }");
    assert!(go.contains("b := true"), "generated:\n{go}");
    assert!(go.contains("b = 1 != 0"), "generated:\n{go}");
}

#[test]
fn non_comparison_condition_coerces_to_bool() {
    let go = compile_to_go("fn main() { x = 1 if x { print(\"y\") } }");
    assert!(go.contains("if x != 0 {"), "generated:\n{go}");
}

#[test]
fn comparison_condition_coerces_operands_to_common_type() {
    let go = compile_to_go("fn main() { x = 1 y = 1.5 if x < y { print(\"y\") } }");
    assert!(go.contains("if float64(x) < y {"), "generated:\n{go}");
}

#[test]
fn fallible_void_function_gets_trailing_return_nil() {
    let go = compile_to_go(
        "fn warn?(x int) { if x > 1 { fail \"too big\" } }\nfn main() { warn(1)? }\n",
    );
    assert!(go.contains("func warn(x int) error {"), "generated:\n{go}");
    assert!(go.contains("return errors.New(\"too big\")"));
    assert!(go.contains("return nil"));
    assert!(go.contains("__err_1 := warn(1)"));
    assert!(go.contains("import \"errors\""));
}

#[test]
fn slice_range_indexing_is_inclusive() {
    let go = compile_to_go("fn main() { xs = [1, 2, 3] ys = xs[0..1] print(ys) }");
    assert!(go.contains("ys := xs[0 : 1+1]"), "generated:\n{go}");
}

#[test]
fn append_rewrites_to_go_append_or_concat() {
    let go = compile_to_go(
        "fn main() { xs = [1] append(xs, 2) s = \"a\" append(s, \"b\") print(xs) print(s) }",
    );
    assert!(go.contains("xs = append(xs, 2)"), "generated:\n{go}");
    assert!(go.contains("s += \"b\""));
}

#[test]
fn range_rvalue_materializes_via_prelude() {
    let go = compile_to_go("fn main() { xs = 1..3 print(join(xs, \",\")) }");
    assert!(go.contains("xs := __createRange(1, 3)"), "generated:\n{go}");
    assert!(go.contains("func __createRange(from int, to int) []int"));
}

#[test]
fn hoisted_assignment_in_condition_precedes_the_if() {
    let go = compile_to_go(
        "fn f() -> int { return 1 }\nfn main() { if (x = f()) { print(x) } }\n",
    );
    let assign_pos = go.find("x := f()").expect("hoisted assignment");
    let if_pos = go.find("if x != 0 {").expect("condition");
    assert!(assign_pos < if_pos, "generated:\n{go}");
}

#[test]
fn string_iteration_rebinds_runes_as_strings() {
    let go = compile_to_go("fn main() { s = \"ab\" for s -> c { print(c) } }");
    assert!(go.contains("for _, __char1 := range s {"), "generated:\n{go}");
    assert!(go.contains("c := string(__char1)"));
}

#[test]
fn imports_are_sorted_and_unique() {
    let go = compile_to_go(
        "fn main() { for read(\"t.txt\") -> line { print(len(line)) } x = \"5.5\" + \"1\" print(x) }",
    );
    let imports: Vec<_> = go
        .lines()
        .filter(|line| line.starts_with("import "))
        .collect();
    let mut sorted = imports.clone();
    sorted.sort();
    sorted.dedup();
    assert_eq!(imports, sorted, "generated:\n{go}");
}

#[test]
fn emission_is_deterministic() {
    let source =
        "fn main() { s = set{1, 2} print(has(s, 1)) for read(\"t.txt\") -> line { print(line) } x = 1 + \"2\" print(x) }";
    let first = compile_to_go(source);
    let second = compile_to_go(source);
    assert_eq!(first, second);
}

#[test]
fn method_chaining_emits_prefix_calls() {
    let go = compile_to_go(
        "fn main() { s = \"a,b\" out = s.split(\",\").join(\"-\") print(out) }",
    );
    assert!(
        go.contains("out := strings.Join(strings.Split(s, \",\"), \"-\")"),
        "generated:\n{go}"
    );
}

#[test]
fn regex_and_file_builtins_route_through_preludes() {
    let go = compile_to_go(
        "fn main() { s = slurp(\"in.txt\") print(match(s, \"a+\")) print(capture(s, \"(a+)b\")) print(find(s, \"a+\")) }",
    );
    assert!(go.contains("s := __slurpFile(\"in.txt\")"), "generated:\n{go}");
    assert!(go.contains("__regexMatch(s, \"a+\")"));
    assert!(go.contains("__regexCapture(s, \"(a+)b\")"));
    assert!(go.contains("__regexFind(s, \"a+\")"));
    assert!(go.contains("import \"regexp\""));
    // Capture strips the full match and keeps the groups.
    assert!(go.contains("return m[1:]"));
}

#[test]
fn set_mutation_builtins_emit_map_operations() {
    let go = compile_to_go(
        "fn main() { s = set{1, 2} add(s, 3) removed = del(s, 1) print(removed) }",
    );
    assert!(go.contains("s[3] = struct{}{}"), "generated:\n{go}");
    assert!(go.contains("removed := __setDelete(s, 1)"));
    assert!(go.contains("func __setDelete[T comparable]"));
}

#[test]
fn set_union_uses_the_union_helper() {
    let go = compile_to_go(
        "fn main() { a = set{1} b = set{2} c = a + b print(has(c, 2)) }",
    );
    assert!(go.contains("c := __setUnion(a, b)"), "generated:\n{go}");
    assert!(go.contains("func __setUnion[T comparable]"));
}

#[test]
fn named_and_default_arguments_bind_in_declaration_order() {
    let go = compile_to_go(
        "fn greet(name str, punct str = \"!\") -> str { return name + punct }\nfn main() { print(greet(punct = \"?\", name = \"hi\")) }\n",
    );
    assert!(go.contains("greet(\"hi\", \"?\")"), "generated:\n{go}");
}
