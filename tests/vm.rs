mod common;

use common::{driver, output, run, run_units};
use ember::RuntimeError;
use pretty_assertions::assert_eq;

#[test]
fn arithmetic_follows_priorities() {
    assert_eq!(
        output("print(2 + 3 * 4);\nprint((2 + 3) * 4);\nprint(2 * 3 ** 2);\nprint(7 / 2, 7 / 2.0, 7 % 3);"),
        vec!["14", "20", "18", "3 3.5 1"]
    );
}

#[test]
fn assignment_is_right_associative() {
    assert_eq!(
        output("Integer a;\nInteger b;\na = b = 5;\nprint(a, b);"),
        vec!["5 5"]
    );
}

#[test]
fn compound_assignment_and_steps() {
    let lines = output(
        "Integer n = 10;\n\
         n += 5; n -= 3; n *= 2; n /= 4; n %= 4;\n\
         Integer a = n++;\n\
         Integer b = ++n;\n\
         print(a, b, n);\n\
         Float f = 1;\n\
         f += 1;\n\
         print(f);",
    );
    assert_eq!(lines, vec!["2 4 4", "2.0"]);
}

#[test]
fn logical_operators_short_circuit() {
    let lines = output(
        "Integer calls = 0;\n\
         method Bool touch() do calls += 1; return true; od\n\
         Bool a = false && touch();\n\
         Bool b = true || touch();\n\
         Bool c = true && touch();\n\
         print(a, b, c, calls);",
    );
    assert_eq!(lines, vec!["false true true 1"]);
}

#[test]
fn integer_edge_cases() {
    assert_eq!(
        output("print(1 << 64, -16 >> 2, -1 >>> 60, 2 ** -1, 1 ** -3);"),
        vec!["0 -4 15 0 1"]
    );
}

#[test]
fn strings_lists_and_maps() {
    let lines = output(
        "String s = \"ab\" + 'c''d';\n\
         List l = [1, 2, 3];\n\
         l[0] = 10;\n\
         l.push(\"x\");\n\
         Map m = {\"a\": 1};\n\
         m[\"b\"] = 2;\n\
         print(s, s.size, l, l.size);\n\
         print(m, m.has(\"b\"), m.empty);\n\
         print(l.pop(), l);",
    );
    assert_eq!(
        lines,
        vec![
            "abc'd 5 [10, 2, 3, \"x\"] 4",
            "{\"a\": 1, \"b\": 2} true false",
            "x [10, 2, 3]",
        ]
    );
}

#[test]
fn nested_containers_are_updated_in_place() {
    let lines = output(
        "List grid = [[0, 0], [0, 0]];\n\
         grid[1][0] = 7;\n\
         grid[1][0] += 1;\n\
         List copy = grid;\n\
         copy[0][0] = 9;\n\
         print(grid, copy);",
    );
    assert_eq!(lines, vec!["[[0, 0], [8, 0]] [[9, 0], [8, 0]]"]);
}

#[test]
fn counted_for_runs_the_documented_number_of_times() {
    let lines = output(
        "Integer n = 0;\n\
         for from 1 to 10 step 3 do n += 1; od\n\
         Integer m = 0;\n\
         for i from 5 to 1 do m += 1; od\n\
         Integer sum = 0;\n\
         for i from 10 to 1 step -3 do sum += i; od\n\
         print(n, m, sum);",
    );
    assert_eq!(lines, vec!["4 0 22"]);
}

#[test]
fn zero_step_is_a_runtime_error() {
    let err = run("for from 1 to 3 step 0 do od").unwrap_err();
    assert!(matches!(err, RuntimeError::ZeroStep { .. }), "{err}");
}

#[test]
fn while_and_repeat() {
    let lines = output(
        "Integer i = 0;\n\
         while i < 5 do i += 2; od\n\
         Integer j = 0;\n\
         repeat j += 1; until j >= 3\n\
         print(i, j);",
    );
    assert_eq!(lines, vec!["6 3"]);
}

#[test]
fn if_chains_take_the_first_true_branch() {
    let lines = output(
        "for x from 1 to 4 do\n\
           if x == 1 then print(\"one\");\n\
           elif x < 3 then print(\"small\");\n\
           elif x == 3 then print(\"three\");\n\
           else print(\"big\");\n\
           fi\n\
         od",
    );
    assert_eq!(lines, vec!["one", "small", "three", "big"]);
}

#[test]
fn leave_and_continue_unwind_two_loops() {
    let left = output(
        "Integer hits = 0;\n\
         for i from 1 to 3 do\n\
           for j from 1 to 3 do\n\
             if j == 2 then leave 2; fi\n\
             hits += 1;\n\
           od\n\
         od\n\
         print(hits);",
    );
    assert_eq!(left, vec!["1"]);

    let continued = output(
        "Integer hits = 0;\n\
         for i from 1 to 3 do\n\
           for j from 1 to 3 do\n\
             if j == 2 then continue 2; fi\n\
             hits += 1;\n\
           od\n\
           hits += 100;\n\
         od\n\
         print(hits);",
    );
    assert_eq!(continued, vec!["3"]);
}

#[test]
fn leave_and_continue_unwind_three_loops() {
    let left = output(
        "Integer n = 0;\n\
         while true do\n\
           repeat\n\
             for k from 1 to 5 do\n\
               n += 1;\n\
               if n == 4 then leave 3; fi\n\
             od\n\
           until false\n\
         od\n\
         print(n);",
    );
    assert_eq!(left, vec!["4"]);

    let continued = output(
        "Integer outer = 0;\n\
         Integer inner = 0;\n\
         for a from 1 to 2 do\n\
           outer += 1;\n\
           for b from 1 to 2 do\n\
             for c from 1 to 2 do\n\
               inner += 1;\n\
               continue 3;\n\
             od\n\
             inner += 100;\n\
           od\n\
           inner += 1000;\n\
         od\n\
         print(outer, inner);",
    );
    assert_eq!(continued, vec!["2 2"]);
}

#[test]
fn single_level_jumps() {
    let lines = output(
        "Integer i = 0;\n\
         Integer odd = 0;\n\
         while true do\n\
           i += 1;\n\
           if i > 6 then leave; fi\n\
           if i % 2 == 0 then continue; fi\n\
           odd += 1;\n\
         od\n\
         print(i, odd);",
    );
    assert_eq!(lines, vec!["7 3"]);
}

#[test]
fn methods_recurse_and_return_defaults() {
    let lines = output(
        "method Integer fact(Integer n) do\n\
           if n <= 1 then return 1; fi\n\
           return n * fact(n - 1);\n\
         od\n\
         method Integer nothing() do od\n\
         print(fact(10), nothing());",
    );
    assert_eq!(lines, vec!["3628800 0"]);
}

#[test]
fn methods_may_be_called_before_their_definition() {
    assert_eq!(
        output("print(later(2));\nmethod Float later(Float x) do return x / 4; od"),
        vec!["0.5"]
    );
}

#[test]
fn overloads_pick_the_exact_signature() {
    let lines = output(
        "method String kind(Integer x) do return \"int\"; od\n\
         method String kind(Float x) do return \"float\"; od\n\
         method String only(Float x) do return \"promoted\"; od\n\
         print(kind(1), kind(1.5), only(1));",
    );
    assert_eq!(lines, vec!["int float promoted"]);
}

#[test]
fn nested_methods_reach_enclosing_locals() {
    let lines = output(
        "method Integer outer(Integer base) do\n\
           Integer total = 0;\n\
           method add(Integer k) do total += base * k; od\n\
           for k from 1 to 3 do add(k); od\n\
           return total;\n\
         od\n\
         print(outer(10));",
    );
    assert_eq!(lines, vec!["60"]);
}

#[test]
fn lazy_variables_reevaluate_on_every_read() {
    let lines = output(
        "Integer x = 1;\n\
         lazy Integer y = x * 10;\n\
         print(y);\n\
         x = 2;\n\
         print(y);",
    );
    assert_eq!(lines, vec!["10", "20"]);
}

#[test]
fn lazy_locals_read_from_their_declaring_frame() {
    let lines = output(
        "method Integer f(Integer a) do\n\
           lazy Integer twice = a * 2;\n\
           method Integer peek() do return twice; od\n\
           a = 21;\n\
           return peek();\n\
         od\n\
         print(f(1));",
    );
    assert_eq!(lines, vec!["42"]);
}

#[test]
fn explicit_conversions() {
    assert_eq!(
        output("print(Integer(\"42\") + 1, Float(3), String(1.5), Bool(0), Integer(2.9));"),
        vec!["43 3.0 1.5 false 2"]
    );
}

#[test]
fn imported_modules_initialize_once() {
    let lines = run_units(&[
        ("main", "import util;\nimport util;\nprint(twice(counter));"),
        ("util", "Integer counter = 21;\nprint(\"util ready\");\nmethod Integer twice(Integer x) do return x * 2; od"),
    ])
    .unwrap();
    assert_eq!(lines, vec!["util ready", "42"]);
}

#[test]
fn statics_are_visible_after_a_run() {
    let mut driver = driver(&[("main", "Integer total = 0;\nfor i from 1 to 4 do total += i; od")]);
    let program = driver.parse("main").unwrap();
    let mut thread = driver.thread(&program);
    thread.run("main").unwrap();
    assert_eq!(thread.static_value("main", "total"), Some(&ember::Variant::Int(10)));
    assert_eq!(thread.stack_len(), 0);
    assert_eq!(thread.depth(), 0);
}

#[test]
fn runtime_errors_carry_positions() {
    let err = run("Integer z = 0;\nprint(1 / z);").unwrap_err();
    assert_eq!(err, RuntimeError::DivisionByZero { at: "main:2:9".into() });

    let err = run("List l = [1];\nprint(l[3]);").unwrap_err();
    assert!(matches!(err, RuntimeError::IndexOutOfRange { index: 3, len: 1, .. }), "{err}");

    let err = run("Map m = {1: 2};\nprint(m[5]);").unwrap_err();
    assert!(matches!(err, RuntimeError::MissingKey { .. }), "{err}");

    let err = run("assert(1 > 2);").unwrap_err();
    assert!(matches!(err, RuntimeError::AssertionFailed { .. }), "{err}");
}

#[test]
fn untyped_values_are_checked_when_used() {
    let err = run("List l = [1.5];\nprint(l[0] & 1);").unwrap_err();
    assert!(
        matches!(&err, RuntimeError::TypeMismatch { op, left, right, .. }
            if op == "&" && left == "Float" && right == "Integer"),
        "{err}"
    );
}

#[test]
fn iterated_for_fails_at_run_time() {
    let err = run("List l = [1];\nfor x in l do print(x); od").unwrap_err();
    assert!(matches!(err, RuntimeError::Unimplemented { .. }), "{err}");
}

#[test]
fn deep_recursion_overflows_the_frame_stack() {
    let mut driver = driver(&[("main", "method Integer down(Integer n) do return down(n + 1); od\nprint(down(0));")]);
    driver.vm_options_mut().max_depth = 32;
    let program = driver.parse("main").unwrap();
    let err = driver.execute(&program, "main", None, None).unwrap_err();
    assert!(matches!(err, RuntimeError::StackOverflow { depth: 32, .. }), "{err}");
}

#[test]
fn programs_with_errors_do_not_run() {
    let mut driver = driver(&[("main", "Integer a = \"no\";")]);
    let program = driver.parse("main").unwrap();
    let err = driver.execute(&program, "main", None, None).unwrap_err();
    assert_eq!(err, RuntimeError::ProgramHasErrors(1));
}

#[test]
fn statement_trace_goes_to_the_trace_sink() {
    let mut driver = driver(&[("main", "Integer a = 1 + 2;\nprint(a);")]);
    driver.vm_options_mut().trace_statements = true;
    let program = driver.parse("main").unwrap();
    let (mut trace, mut out) = (Vec::<String>::new(), Vec::<String>::new());
    driver
        .execute(&program, "main", Some(&mut trace), Some(&mut out))
        .unwrap();
    assert_eq!(out, vec!["3"]);
    assert_eq!(
        trace,
        vec!["main:1:9 VarDef", "1 + 2 -> 3", "main:2:1 ExprStmt", "call print(3)"]
    );
}

/// Runs `source` with the given flags, returning the trace and the output.
fn traced(source: &str, configure: impl FnOnce(&mut ember::VmOptions)) -> (Vec<String>, Vec<String>) {
    let mut driver = driver(&[("main", source)]);
    configure(driver.vm_options_mut());
    let program = driver.parse("main").unwrap();
    let (mut trace, mut out) = (Vec::<String>::new(), Vec::<String>::new());
    driver
        .execute(&program, "main", Some(&mut trace), Some(&mut out))
        .unwrap();
    (trace, out)
}

#[test]
fn unary_operators_and_conversions_are_traced() {
    let (trace, _) = traced(
        "Integer x = 5;\nInteger y = -x;\nBool b = !true;\nFloat f = Float(x);",
        |vm| vm.trace_statements = true,
    );
    assert_eq!(
        trace,
        vec![
            "main:1:9 VarDef",
            "main:2:9 VarDef",
            "- 5 -> -5",
            "main:3:6 VarDef",
            "! true -> false",
            "main:4:7 VarDef",
            "Float 5 -> 5.0",
        ]
    );
}

#[test]
fn indexing_and_members_are_traced() {
    let (trace, out) = traced(
        "List l = [4, 5];\nInteger n = l[1] + l.size();",
        |vm| vm.trace_statements = true,
    );
    assert!(out.is_empty());
    assert_eq!(
        trace,
        vec![
            "main:1:6 VarDef",
            "main:2:9 VarDef",
            "[1] -> 5",
            ".size() -> 2",
            "5 + 2 -> 7",
        ]
    );
}

#[test]
fn locals_are_traced_when_a_frame_is_left() {
    let (trace, out) = traced(
        "method Integer add(Integer a, Integer b) do Integer s = a + b; return s; od\nprint(add(2, 3));",
        |vm| vm.trace_locals = true,
    );
    assert_eq!(out, vec!["5"]);
    assert_eq!(trace, vec!["leave add: a=2, b=3, s=5"]);
}

#[test]
fn loop_counters_are_traced() {
    let (trace, out) = traced(
        "for i from 1 to 7 step 3 do print(i); od",
        |vm| vm.trace_auto = true,
    );
    assert_eq!(out, vec!["1", "4", "7"]);
    assert_eq!(trace, vec!["for #1 = 1", "for #2 = 4", "for #3 = 7"]);
}

#[test]
fn full_range_counted_for_runs() {
    assert_eq!(
        output("for i from -9223372036854775807 - 1 to 9223372036854775807 do print(i); leave; od\nprint(\"done\");"),
        vec!["-9223372036854775808", "done"]
    );
}

#[test]
fn self_referential_classes_construct() {
    assert_eq!(
        output("class Node do Node next; Integer value; od\nNode n;\nprint(1);"),
        vec!["1"]
    );
}

#[test]
fn deep_recursion_is_an_error_not_a_crash() {
    let mut driver = driver(&[("main", "method Integer down(Integer n) do return down(n + 1); od\nprint(down(0));")]);
    driver.vm_options_mut().max_depth = 600;
    let program = driver.parse("main").unwrap();
    let err = driver.execute(&program, "main", None, None).unwrap_err();
    assert!(matches!(err, RuntimeError::StackOverflow { depth: 600, .. }), "{err}");
}
