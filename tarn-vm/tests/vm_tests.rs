mod common;

use common::{
    SharedBuf, expect_bool, expect_float, expect_int, expect_null, expect_str, run_error,
    run_value,
};
use tarn_vm::{CancelToken, Vm, compile};

#[test]
fn integer_arithmetic() {
    let cases = [
        ("1", 1),
        ("1 + 2", 3),
        ("1 - 2", -1),
        ("4 * 5", 20),
        ("7 % 3", 1),
        ("-5", -5),
        ("2 * (3 + 4)", 14),
        ("5 * 2 + 10 % 3", 11),
    ];
    for (source, want) in cases {
        expect_int(&run_value(source), want);
    }
}

#[test]
fn division_always_yields_a_float() {
    expect_float(&run_value("7 / 2"), 3.5);
    expect_float(&run_value("6 / 2"), 3.0);
    expect_float(&run_value("7.0 / 2"), 3.5);
}

#[test]
fn float_arithmetic_promotes_mixed_operands() {
    expect_float(&run_value("2.5 + 1"), 3.5);
    expect_float(&run_value("1 - 0.5"), 0.5);
    expect_float(&run_value("2 * 1.5"), 3.0);
    expect_float(&run_value("-2.5"), -2.5);
}

#[test]
fn division_and_modulo_by_zero_are_runtime_errors() {
    for source in ["1 / 0", "1.5 / 0.0", "1 % 0"] {
        let err = run_error(source);
        assert!(
            err.message.contains("division by zero"),
            "source {source:?} gave {}",
            err.message
        );
    }
}

#[test]
fn modulo_requires_integers() {
    let err = run_error("1.5 % 2");
    assert!(err.message.contains("unsupported types"));
}

#[test]
fn string_concatenation_stringifies_the_other_side() {
    expect_str(&run_value(r#""foo" + "bar""#), "foobar");
    expect_str(&run_value(r#""x" + 1"#), "x1");
    expect_str(&run_value(r#"1 + "x""#), "1x");
    expect_str(&run_value(r#""v" + 1.5"#), "v1.5");
    expect_str(&run_value(r#""n" + null"#), "nnull");
    expect_str(&run_value(r#""b" + true"#), "btrue");
}

#[test]
fn boolean_and_comparison_expressions() {
    let cases = [
        ("true", true),
        ("false", false),
        ("1 < 2", true),
        ("2 < 1", false),
        ("2 > 1", true),
        ("1 <= 1", true),
        ("2 <= 1", false),
        ("1 >= 1", true),
        ("1 >= 2", false),
        ("1 == 1", true),
        ("1 != 1", false),
        ("1.5 == 1.5", true),
        ("1.5 > 1.4", true),
        (r#""a" == "a""#, true),
        (r#""a" != "b""#, true),
        ("true == true", true),
        ("null == null", true),
        ("!true", false),
        ("!null", true),
        ("!5", false),
        ("!!true", true),
    ];
    for (source, want) in cases {
        expect_bool(&run_value(source), want);
    }
}

#[test]
fn cross_kind_primitive_equality_is_false() {
    expect_bool(&run_value(r#"1 == "1""#), false);
    expect_bool(&run_value(r#"1 != "1""#), true);
    expect_bool(&run_value("1 == 1.0"), false);
    expect_bool(&run_value("1 != 1.0"), true);
    expect_bool(&run_value("null == 0"), false);
    expect_bool(&run_value("true == 1"), false);
}

#[test]
fn mixed_numeric_ordering_promotes() {
    expect_bool(&run_value("1 < 1.5"), true);
    expect_bool(&run_value("2.5 > 2"), true);
    expect_bool(&run_value("2 >= 1.5"), true);
}

#[test]
fn logical_operators_yield_an_operand() {
    expect_int(&run_value("5 && 2"), 2);
    expect_int(&run_value("0 && 2"), 0);
    expect_int(&run_value("0 || 7"), 7);
    expect_int(&run_value("3 || 7"), 3);
    expect_str(&run_value(r#""" || "x""#), "x");
    expect_bool(&run_value("true && false"), false);
    expect_null(&run_value("null || null"));
}

#[test]
fn if_expressions_produce_values() {
    expect_int(&run_value("if (true) { 10 }"), 10);
    expect_null(&run_value("if (false) { 10 }"));
    expect_int(&run_value("if (false) { 10 } else { 20 }"), 20);
    expect_int(&run_value("var r = if (1 < 2) { 1 } else { 2 }\nr"), 1);
    expect_int(&run_value("if (5) { 1 } else { 2 }"), 1);
    expect_int(&run_value(r#"if ("s") { 1 } else { 2 }"#), 1);
    expect_int(&run_value("if (0.0) { 1 } else { 2 }"), 2);
}

#[test]
fn strict_truthiness_rejects_other_types() {
    let err = run_error("if ([]) { 1 }");
    assert!(
        err.message.contains("condition must be boolean, got ARRAY"),
        "got {}",
        err.message
    );
    let err = run_error("if ({}) { 1 }");
    assert!(err.message.contains("condition must be boolean, got HASH"));
    let err = run_error("if (func() {}) { 1 }");
    assert!(err.message.contains("condition must be boolean, got CLOSURE"));
}

#[test]
fn global_declarations_and_assignment() {
    expect_int(&run_value("var one = 1\none"), 1);
    expect_int(&run_value("var one = 1\nvar two = one + one\none + two"), 3);
    expect_int(&run_value("var x = 1\nx = 5\nx"), 5);
    expect_int(&run_value("a := 2\na * 3"), 6);
    expect_int(&run_value("const k = 41\nk + 1"), 42);
}

#[test]
fn compound_assignment_and_postfix_steps() {
    expect_int(&run_value("var x = 1\nx += 4\nx"), 5);
    expect_int(&run_value("var x = 5\nx -= 2\nx"), 3);
    expect_int(&run_value("var x = 1\nx++\nx"), 2);
    expect_int(&run_value("var x = 1\nx--\nx"), 0);
}

#[test]
fn array_literals_and_indexing() {
    expect_int(&run_value("[1, 2, 3][0]"), 1);
    expect_int(&run_value("[1, 2, 3][2]"), 3);
    expect_int(&run_value("var i = 1\n[1, 2, 3][i + 1]"), 3);
    expect_null(&run_value("[1, 2, 3][3]"));
    expect_null(&run_value("[1, 2, 3][-1]"));
    expect_null(&run_value("[][0]"));
}

#[test]
fn hash_literals_and_lookups() {
    expect_int(&run_value(r#"{"a": 1, "b": 2}["a"]"#), 1);
    expect_int(&run_value(r#"{1: 10, 2: 20}[2]"#), 20);
    expect_int(&run_value("{true: 5}[true]"), 5);
    expect_int(&run_value("{1.5: 7}[1.5]"), 7);
    expect_null(&run_value(r#"{"a": 1}["b"]"#));
    expect_null(&run_value("{}[0]"));
}

#[test]
fn hash_keys_must_be_hashable() {
    let err = run_error("{}[[1]]");
    assert!(err.message.contains("unusable as hash key: ARRAY"));
    let err = run_error("{[1]: 2}");
    assert!(err.message.contains("unusable as hash key: ARRAY"));
}

#[test]
fn indexing_other_types_fails() {
    let err = run_error("5[0]");
    assert!(err.message.contains("index operator not supported: INTEGER"));
    let err = run_error(r#""str"[0]"#);
    assert!(err.message.contains("index operator not supported: STRING"));
}

#[test]
fn member_access_reads_string_keys() {
    expect_int(&run_value(r#"var m = {"a": 1}
m.a"#), 1);
    expect_null(&run_value(r#"var m = {"a": 1}
m.b"#));
}

#[test]
fn member_and_index_assignment_mutate_containers() {
    expect_int(&run_value("var a = [1, 2, 3]\na[1] = 9\na[1]"), 9);
    expect_int(&run_value(r#"var m = {"a": 1}
m.a = 5
m.a"#), 5);
    expect_int(&run_value(r#"var m = {}
m.fresh = 7
m.fresh"#), 7);
    expect_int(&run_value(r#"var m = {}
m["k"] = 3
m["k"]"#), 3);
}

#[test]
fn array_index_assignment_bounds_are_checked() {
    let err = run_error("var a = [1]\na[5] = 2");
    assert!(err.message.contains("index out of range: 5"));
    let err = run_error("var a = [1]\na[-1] = 2");
    assert!(err.message.contains("index out of range: -1"));
}

#[test]
fn arrays_are_shared_by_reference() {
    let source = "var a = [1]\nvar b = a\nb[0] = 9\na[0]";
    expect_int(&run_value(source), 9);
}

#[test]
fn slices_copy_a_range() {
    let cases = [
        ("[1, 2, 3][1:]", "[2, 3]"),
        ("[1, 2, 3][:2]", "[1, 2]"),
        ("[1, 2, 3][:]", "[1, 2, 3]"),
        ("[1, 2, 3][1:2]", "[2]"),
        ("[1, 2, 3][0:99]", "[1, 2, 3]"),
        ("[1, 2, 3][2:1]", "[]"),
        ("[1, 2, 3][-5:2]", "[1, 2]"),
    ];
    for (source, want) in cases {
        assert_eq!(run_value(source).inspect(), want, "source: {source}");
    }
    // Slicing copies: mutating the slice leaves the source untouched.
    let source = "var a = [1, 2, 3]\nvar s = a[0:2]\ns[0] = 9\na[0]";
    expect_int(&run_value(source), 1);
}

#[test]
fn slice_requires_an_array() {
    let err = run_error(r#""abc"[0:1]"#);
    assert!(err.message.contains("slice operator not supported: STRING"));
}

#[test]
fn c_style_for_loops() {
    let source = "var sum = 0\nfor var i = 0; i < 5; i++ { sum += i }\nsum";
    expect_int(&run_value(source), 10);
    let source = "var n = 0\nfor n < 3 { n++ }\nn";
    expect_int(&run_value(source), 3);
}

#[test]
fn for_loops_support_break_and_continue() {
    let source = "var sum = 0\nfor var i = 0; i < 10; i++ {\n  if (i == 3) { continue }\n  if (i == 6) { break }\n  sum += i\n}\nsum";
    // 0+1+2+4+5 = 12
    expect_int(&run_value(source), 12);
}

#[test]
fn infinite_for_loops_exit_via_break() {
    let source = "var i = 0\nfor {\n  i++\n  if (i == 4) { break }\n}\ni";
    expect_int(&run_value(source), 4);
}

#[test]
fn for_in_iterates_arrays() {
    let source = "var sum = 0\nfor v in [1, 2, 3] { sum += v }\nsum";
    expect_int(&run_value(source), 6);
    let source = "var sum = 0\nvar xs = [2, 4]\nfor v in xs { for w in xs { sum += v * w } }\nsum";
    expect_int(&run_value(source), 36);
}

#[test]
fn for_in_supports_break_and_continue() {
    let source = "var sum = 0\nfor v in [1, 2, 3, 4] {\n  if (v == 3) { continue }\n  sum += v\n}\nsum";
    expect_int(&run_value(source), 7);
    let source = "var sum = 0\nfor v in [1, 2, 3, 4] {\n  if (v == 3) { break }\n  sum += v\n}\nsum";
    expect_int(&run_value(source), 3);
}

#[test]
fn for_in_over_non_arrays_fails() {
    let err = run_error("for v in 5 { }");
    assert!(
        err.message.contains("argument to `len` not supported"),
        "got {}",
        err.message
    );
}

#[test]
fn nested_loops_patch_their_own_break() {
    let source = "var hits = 0\nfor var i = 0; i < 3; i++ {\n  for var j = 0; j < 3; j++ {\n    if (j == 1) { break }\n    hits++\n  }\n}\nhits";
    expect_int(&run_value(source), 3);
}

#[test]
fn len_builtin() {
    expect_int(&run_value(r#"len("hello")"#), 5);
    expect_int(&run_value("len([1, 2, 3])"), 3);
    expect_int(&run_value(r#"len({"a": 1})"#), 1);
    let err = run_error("len(5)");
    assert!(err.message.contains("argument to `len` not supported, got INTEGER"));
    let err = run_error("len()");
    assert!(err.message.contains("wrong number of arguments. got=0, want=1"));
}

#[test]
fn push_builtin_mutates_the_shared_array() {
    expect_int(&run_value("var a = []\npush(a, 1)\npush(a, 2)\nlen(a)"), 2);
    expect_int(&run_value("var a = [1]\npush(a, 9)\na[1]"), 9);
    let err = run_error("push(5, 1)");
    assert!(err.message.contains("argument to `push` must be ARRAY"));
}

#[test]
fn keys_builtin_returns_the_original_keys() {
    expect_int(&run_value(r#"len(keys({"a": 1, "b": 2}))"#), 2);
    let err = run_error("keys([])");
    assert!(err.message.contains("argument to `keys` must be HASH"));
}

#[test]
fn print_builtin_writes_through_the_context() {
    let buf = SharedBuf::new();
    let bytecode = compile(r#"print("hello", 42, [1, 2])"#).expect("compile");
    let mut vm = Vm::new(bytecode);
    vm.set_output(Box::new(buf.clone()));
    vm.run(&CancelToken::new()).expect("run");
    assert_eq!(buf.contents(), "hello 42 [1, 2]\n");
}

#[test]
fn print_prefix_is_prepended() {
    let buf = SharedBuf::new();
    let bytecode = compile(r#"print("ready")"#).expect("compile");
    let mut vm = Vm::new(bytecode);
    vm.set_output(Box::new(buf.clone()));
    vm.set_print_prefix("[worker] ");
    vm.run(&CancelToken::new()).expect("run");
    assert_eq!(buf.contents(), "[worker] ready\n");
}

#[test]
fn unary_minus_prints_negative_literals() {
    let cases = [
        ("print(-1)", "-1\n"),
        ("print(-10)", "-10\n"),
        ("print(-1.5)", "-1.5\n"),
        ("print(-0.25)", "-0.25\n"),
    ];
    for (source, want) in cases {
        let buf = SharedBuf::new();
        let mut vm = Vm::new(compile(source).expect("compile"));
        vm.set_output(Box::new(buf.clone()));
        vm.run(&CancelToken::new()).expect("run");
        assert_eq!(buf.contents(), want, "source: {source}");
    }
}

#[test]
fn panic_builtin_raises_a_runtime_error() {
    let err = run_error(r#"panic("boom")"#);
    assert!(err.message.contains("boom"));
    assert!(!err.critical);
    assert!(!err.frames.is_empty());
}

#[test]
fn equality_on_containers_is_an_error_not_false() {
    let err = run_error("[1] == [1]");
    assert!(err.message.contains("equality not supported for type: ARRAY"));
    let err = run_error("{} == {}");
    assert!(err.message.contains("equality not supported for type: HASH"));
    let err = run_error("[1] == {}");
    assert!(err.message.contains("type mismatch: ARRAY == HASH"));
    let err = run_error("func() {} == func() {}");
    assert!(
        err.message.contains("equality not supported for type: CLOSURE"),
        "got {}",
        err.message
    );
}

#[test]
fn calling_a_non_function_fails() {
    let err = run_error("5()");
    assert!(err.message.contains("calling non-function"));
}

#[test]
fn negation_wraps_at_the_integer_boundary() {
    // Multiplication wraps silently, so its result can be i64::MIN; negating
    // that wraps back instead of aborting the VM.
    expect_int(&run_value("-(4611686018427387904 * 2)"), i64::MIN);
}

#[test]
fn negation_requires_a_number() {
    let err = run_error("-true");
    assert!(err.message.contains("unsupported type for negation: BOOLEAN"));
}
