mod common;

use common::{codes, driver, parse};
use ember::Error;
use ember::diagnostic::codes as code;
use pretty_assertions::assert_eq;

#[test]
fn clean_program_has_no_diagnostics() {
    let program = parse(
        "Integer a = 1;\n\
         Float b = a + 0.5;\n\
         method Integer twice(Integer x) do return x * 2; od\n\
         print(twice(a), b);",
    );
    assert_eq!(codes(&program), Vec::<u16>::new());
}

#[test]
fn multiplication_binds_tighter_than_addition() {
    let program = parse("Integer a = 2 + 3 * 4;");
    let dump = program.dump();
    let expected = "\
Block
  VarDef a: Integer
    Binary + : Integer
      Constant 2 : Integer
      Binary * : Integer
        Constant 3 : Integer
        Constant 4 : Integer
";
    assert_eq!(dump, expected);
}

#[test]
fn assignment_chains_bind_to_the_right() {
    let program = parse("Integer a = 1;\nInteger b = 2;\na = b = (a + (b - 2) * 3);");
    let expected = "\
Block
  VarDef a: Integer
    Constant 1 : Integer
  VarDef b: Integer
    Constant 2 : Integer
  ExprStmt
    Binary = : Integer
      Name a : Integer
      Binary = : Integer
        Name b : Integer
        Binary + : Integer
          Name a : Integer
          Binary * : Integer
            Binary - : Integer
              Name b : Integer
              Constant 2 : Integer
            Constant 3 : Integer
";
    assert_eq!(program.dump(), expected);
}

#[test]
fn missing_operand_is_one_diagnostic_and_parsing_goes_on() {
    let program = parse("Integer a = ;\nInteger b = 2;\nprint(b);");
    assert_eq!(codes(&program), vec![code::UNEXPECTED_TOKEN]);
    assert_eq!(program.diagnostics[0].location, "main:1:13");
}

#[test]
fn recovery_resumes_inside_loop_bodies() {
    let program = parse(
        "Integer n = 0;\n\
         while n < 3 do\n\
           n = n + ;\n\
           n += 1;\n\
         od\n\
         print(n);",
    );
    assert_eq!(codes(&program), vec![code::UNEXPECTED_TOKEN]);
}

#[test]
fn missing_terminator_is_reported() {
    let program = parse("Integer a = 1\nInteger b = 2;");
    assert_eq!(codes(&program), vec![code::UNEXPECTED_TOKEN]);
    assert!(program.diagnostics[0].message.contains("expected ';'"));
}

#[test]
fn terminator_may_be_left_out_before_a_closer() {
    let program = parse("Integer n = 0;\nwhile n < 3 do n += 1 od\nprint(n)");
    assert_eq!(codes(&program), Vec::<u16>::new());
}

#[test]
fn body_variables_retire_at_the_closing_keyword() {
    let program = parse(
        "if true then\n\
           Integer x = 1;\n\
         fi\n\
         x = 2;",
    );
    assert_eq!(codes(&program), vec![code::UNDEFINED]);
    let diag = &program.diagnostics[0];
    assert!(diag.message.contains("line 3"), "{}", diag.message);
    assert_eq!(diag.related.as_deref(), Some("main:2:9"));
}

#[test]
fn inner_body_may_shadow_an_outer_variable() {
    let program = parse(
        "Integer x = 1;\n\
         if true then Integer x = 2; print(x); fi\n\
         print(x);",
    );
    assert_eq!(codes(&program), Vec::<u16>::new());
}

#[test]
fn duplicate_in_the_same_body_is_an_error() {
    let program = parse("Integer x = 1;\nString x = \"a\";");
    assert_eq!(codes(&program), vec![code::DUPLICATE]);
    assert_eq!(program.diagnostics[0].related.as_deref(), Some("main:1:9"));
}

#[test]
fn identical_method_signatures_are_duplicates() {
    let program = parse(
        "method f(Integer a) do od\n\
         method f(Float a) do od\n\
         method f(Integer b) do od",
    );
    assert_eq!(codes(&program), vec![code::DUPLICATE]);
    assert_eq!(program.diagnostics[0].location, "main:3:8");
    assert_eq!(program.diagnostics[0].related.as_deref(), Some("main:1:8"));
}

#[test]
fn overload_resolution_reports_ambiguity_and_mismatch() {
    let program = parse(
        "method f(Integer a) do od\n\
         method f(Float a) do od\n\
         f(true);\n\
         f(\"text\");",
    );
    assert_eq!(codes(&program), vec![code::AMBIGUOUS_CALL, code::NO_OVERLOAD]);
}

#[test]
fn unknown_method_is_undefined() {
    let program = parse("nothing(1);");
    assert_eq!(codes(&program), vec![code::UNDEFINED]);
}

#[test]
fn const_and_lazy_cannot_be_assigned() {
    let program = parse(
        "const Integer c = 1;\n\
         lazy Integer l = c + 1;\n\
         c = 2;\n\
         l = 3;\n\
         const Integer d;",
    );
    // the missing initializer is found while parsing, before the check pass
    assert_eq!(
        codes(&program),
        vec![code::MISSING_INITIALIZER, code::NOT_ASSIGNABLE, code::NOT_ASSIGNABLE]
    );
}

#[test]
fn jumps_deeper_than_the_loop_nesting_are_errors() {
    let program = parse(
        "while true do\n\
           for from 1 to 2 do leave 2; continue 3; od\n\
         od\n\
         leave;",
    );
    assert_eq!(codes(&program), vec![code::LOOP_DEPTH, code::LOOP_DEPTH]);
}

#[test]
fn return_outside_a_method_is_misplaced() {
    let program = parse("return 1;");
    assert_eq!(codes(&program), vec![code::MISPLACED_RETURN]);
}

#[test]
fn implicit_promotions_only() {
    let program = parse(
        "Float f = 1;\n\
         Integer i = true;\n\
         Integer j = 1.5;\n\
         Bool b = 1;",
    );
    assert_eq!(codes(&program), vec![code::TYPE_MISMATCH, code::TYPE_MISMATCH]);
    let dump = program.dump();
    assert!(dump.contains("Convert Float (implicit)"), "{dump}");
    assert!(dump.contains("Convert Integer (implicit)"), "{dump}");
}

#[test]
fn bitwise_operators_reject_floats_at_check_time() {
    let program = parse("Integer i = 1.5 & 1;");
    assert_eq!(codes(&program), vec![code::TYPE_MISMATCH]);
}

#[test]
fn class_field_access_is_not_implemented() {
    let program = parse(
        "class Point do\n\
           Integer x = 3;\n\
           method Integer getX() do return x; od\n\
         od\n\
         Point p;\n\
         print(p.x);",
    );
    assert_eq!(
        codes(&program),
        vec![code::IGNORED_INITIALIZER, code::UNIMPLEMENTED, code::UNIMPLEMENTED]
    );
}

#[test]
fn iterated_for_is_only_a_warning() {
    let program = parse("List l = [1, 2];\nfor x in l do print(x); od");
    assert_eq!(codes(&program), vec![code::UNIMPLEMENTED]);
    assert!(!program.has_errors());
}

#[test]
fn imports_link_modules_and_detect_cycles() {
    let mut driver = driver(&[
        ("main", "import util;\nprint(twice(counter));"),
        ("util", "Integer counter = 21;\nmethod Integer twice(Integer x) do return x * 2; od"),
    ]);
    let program = driver.parse("main").unwrap();
    assert_eq!(codes(&program), Vec::<u16>::new());
    assert!(program.module("util").is_some());

    let mut driver = common::driver(&[("main", "import a;"), ("a", "import main;")]);
    let program = driver.parse("main").unwrap();
    assert_eq!(codes(&program), vec![code::CIRCULAR_IMPORT]);
    assert!(program.diagnostics[0].location.contains("(imported from main:1:"));
}

#[test]
fn missing_import_is_a_diagnostic_but_missing_main_is_an_error() {
    let program = parse("import nowhere;");
    assert_eq!(codes(&program), vec![code::UNIT_NOT_FOUND]);

    let mut driver = driver(&[]);
    assert!(matches!(driver.parse("main"), Err(Error::UnitNotFound(unit)) if unit == "main"));
}

#[test]
fn lexical_errors_end_the_parse() {
    let program = parse("Integer a = 1;\nString s = \"open;\nInteger b = 2;");
    assert_eq!(codes(&program), vec![code::UNTERMINATED_STRING]);
}

#[test]
fn error_ceiling_stops_parsing() {
    let mut config = ember::EngineConfig::default();
    config.parser.max_errors = 3;
    let mut driver = ember::Driver::new(config).unwrap();
    driver.add_source("main", "a;\nb;\nc;\nd;\ne;");
    let program = driver.parse("main").unwrap();
    assert_eq!(
        codes(&program),
        vec![code::UNDEFINED, code::UNDEFINED, code::UNDEFINED, code::TOO_MANY_ERRORS]
    );
}

#[test]
fn moderate_nesting_is_accepted() {
    let source = format!("print({}1{});", "(".repeat(100), ")".repeat(100));
    assert_eq!(codes(&parse(&source)), Vec::<u16>::new());
}

#[test]
fn runaway_parentheses_stop_the_parse() {
    let source = format!("Integer a = {}1{};", "(".repeat(3000), ")".repeat(3000));
    let program = parse(&source);
    let found = codes(&program);
    assert_eq!(found.first(), Some(&code::NESTING_TOO_DEEP));
    assert_eq!(found.iter().filter(|c| **c == code::NESTING_TOO_DEEP).count(), 1);
    assert!(program.has_errors());
}

#[test]
fn runaway_operator_chains_stop_the_parse() {
    let source = format!("Integer a = 1{};", " + 1".repeat(1000));
    assert_eq!(codes(&parse(&source)).first(), Some(&code::NESTING_TOO_DEEP));
}

#[test]
fn runaway_bodies_stop_the_parse() {
    let source = format!("{}print(1);{}", "if true then ".repeat(300), " fi".repeat(300));
    assert_eq!(codes(&parse(&source)).first(), Some(&code::NESTING_TOO_DEEP));
}

#[test]
fn nesting_limit_is_configurable() {
    let mut config = ember::EngineConfig::default();
    config.parser.max_nesting = 4;
    let mut driver = ember::Driver::new(config).unwrap();
    driver.add_source("main", "Integer a = ((1 + 2));\nInteger b = (((((1)))));");
    let program = driver.parse("main").unwrap();
    assert_eq!(codes(&program), vec![code::NESTING_TOO_DEEP]);
    assert_eq!(program.diagnostics[0].location, "main:2:17");
}
