// Parser robustness tests
//
// Table-driven cases check that malformed programs are reported (with the
// expected message) without crashing, and that valid programs parse clean.
// Tree-shape tests compare against the parenthesized AST printer.

use lox::{parse, scan, DiagnosticCollector, Stmt};
use pretty_assertions::assert_eq;

/// Test result for a single test case
#[derive(Debug)]
enum TestResult {
    Pass,
    Fail(String),
    Crash(String),
}

#[derive(Debug, Clone)]
struct TestCase {
    name: &'static str,
    input: String,
    should_succeed: bool,
    expected_error_contains: Option<&'static str>,
}

impl TestCase {
    fn should_succeed(name: &'static str, input: &str) -> Self {
        Self {
            name,
            input: input.to_string(),
            should_succeed: true,
            expected_error_contains: None,
        }
    }

    fn should_fail(name: &'static str, input: &str) -> Self {
        Self {
            name,
            input: input.to_string(),
            should_succeed: false,
            expected_error_contains: None,
        }
    }

    fn should_fail_with_message(name: &'static str, input: &str, expected: &'static str) -> Self {
        Self {
            name,
            input: input.to_string(),
            should_succeed: false,
            expected_error_contains: Some(expected),
        }
    }
}

struct ParseOutcome {
    statements: Vec<Stmt>,
    diagnostics: Vec<String>,
}

fn parse_input(input: &str) -> ParseOutcome {
    let mut reporter = DiagnosticCollector::new();
    let tokens = scan(input, &mut reporter);
    let statements = parse(tokens, &mut reporter);
    ParseOutcome {
        statements,
        diagnostics: reporter.messages(),
    }
}

fn run_single_test(test: &TestCase) -> TestResult {
    // Catch any panics to detect crashes
    let result = std::panic::catch_unwind(|| parse_input(&test.input).diagnostics);

    let diagnostics = match result {
        Ok(diagnostics) => diagnostics,
        Err(panic_info) => {
            let panic_msg = if let Some(s) = panic_info.downcast_ref::<String>() {
                s.clone()
            } else if let Some(s) = panic_info.downcast_ref::<&str>() {
                s.to_string()
            } else {
                "Unknown panic".to_string()
            };
            return TestResult::Crash(panic_msg);
        }
    };

    match (diagnostics.is_empty(), test.should_succeed) {
        (true, true) => TestResult::Pass,
        (true, false) => TestResult::Fail("Expected parsing to fail, but it succeeded".to_string()),
        (false, true) => TestResult::Fail(format!(
            "Expected parsing to succeed, but got: {:?}",
            diagnostics
        )),
        (false, false) => match test.expected_error_contains {
            Some(expected) if !diagnostics.iter().any(|d| d.contains(expected)) => {
                TestResult::Fail(format!(
                    "Diagnostics {:?} don't contain expected text '{}'",
                    diagnostics, expected
                ))
            }
            _ => TestResult::Pass,
        },
    }
}

fn run_suite(name: &str, tests: &[TestCase]) -> usize {
    println!("Running test suite: {}", name);
    let mut failures = 0;

    for test in tests {
        match run_single_test(test) {
            TestResult::Pass => println!("  ok   {}", test.name),
            TestResult::Fail(msg) => {
                failures += 1;
                println!("  FAIL {}: {}", test.name, msg);
            }
            TestResult::Crash(msg) => {
                failures += 1;
                println!("  CRASH {}: {}", test.name, msg);
            }
        }
    }

    failures
}

fn malformed_expression_tests() -> Vec<TestCase> {
    vec![
        TestCase::should_fail_with_message(
            "unmatched_opening_paren",
            "print (1 + 2;",
            "Expect ')' after expression.",
        ),
        TestCase::should_fail_with_message(
            "unmatched_closing_paren",
            "print 1 + 2);",
            "Expect ';' after value.",
        ),
        TestCase::should_fail_with_message("empty_parentheses", "print ();", "Expect expression."),
        TestCase::should_fail_with_message("missing_right_operand", "1 +;", "Expect expression."),
        TestCase::should_fail("missing_left_operand", "* 1;"),
        TestCase::should_fail("double_plus", "1 ++ 2;"),
        TestCase::should_fail_with_message("eof_after_operator", "1 +", "at end"),
        TestCase::should_fail_with_message(
            "invalid_assignment_target",
            "1 = 2;",
            "Error at '=': Invalid assignment target.",
        ),
        TestCase::should_fail_with_message(
            "grouped_assignment_target",
            "var a; (a) = 2;",
            "Invalid assignment target.",
        ),
    ]
}

fn statement_tests() -> Vec<TestCase> {
    vec![
        TestCase::should_fail_with_message("missing_semicolon", "print 1", "Expect ';' after value."),
        TestCase::should_fail_with_message("var_without_name", "var = 1;", "Expect variable name."),
        TestCase::should_fail_with_message(
            "unclosed_block",
            "{ print 1;",
            "Expect '}' after block.",
        ),
        TestCase::should_fail_with_message("if_without_paren", "if true print 1;", "Expect '(' after 'if'."),
        TestCase::should_fail_with_message(
            "while_without_close_paren",
            "while (true print 1;",
            "Expect ')' after condition.",
        ),
        TestCase::should_fail_with_message(
            "for_missing_semicolon",
            "for (var i = 0 i < 3; i = i + 1) print i;",
            "Expect ';' after variable declaration.",
        ),
        TestCase::should_fail_with_message("fun_without_name", "fun (a) {}", "Expect function name."),
        TestCase::should_fail_with_message(
            "fun_bad_parameter",
            "fun f(1) {}",
            "Expect parameter name.",
        ),
        TestCase::should_fail_with_message(
            "fun_without_body",
            "fun f() print 1;",
            "Expect '{' before function body.",
        ),
        TestCase::should_fail_with_message(
            "call_trailing_comma",
            "f(1, 2,);",
            "Expect expression.",
        ),
        TestCase::should_fail_with_message(
            "call_unclosed",
            "f(1, 2;",
            "Expect ')' after arguments.",
        ),
    ]
}

fn positive_tests() -> Vec<TestCase> {
    vec![
        TestCase::should_succeed("empty_input", ""),
        TestCase::should_succeed("only_whitespace", "   \n\t  "),
        TestCase::should_succeed("only_comment", "// nothing to see"),
        TestCase::should_succeed("arithmetic", "print 1 + 2 * 3 - 4 / 5;"),
        TestCase::should_succeed("double_minus", "print 1 - -2;"),
        TestCase::should_succeed("logic", "print true and !false or nil;"),
        TestCase::should_succeed("var_and_assign", "var x = 1; x = x + 1;"),
        TestCase::should_succeed("if_else", "if (x) { print 1; } else print 2;"),
        TestCase::should_succeed("while_loop", "while (x < 10) x = x + 1;"),
        TestCase::should_succeed("for_all_clauses", "for (var i = 0; i < 3; i = i + 1) print i;"),
        TestCase::should_succeed("for_no_clauses", "for (;;) print 1;"),
        TestCase::should_succeed("function", "fun add(a, b) { return a + b; }"),
        TestCase::should_succeed("bare_return", "fun f() { return; }"),
        TestCase::should_succeed("chained_calls", "f(1)(2)();"),
        TestCase::should_succeed(
            "deeply_nested_parens",
            &format!("print {}1{};", "(".repeat(100), ")".repeat(100)),
        ),
        TestCase::should_succeed("decimal_number", "print 1.5;"),
    ]
}

#[test]
fn parser_robustness_suites() {
    let mut failures = 0;
    failures += run_suite("Malformed Expressions", &malformed_expression_tests());
    failures += run_suite("Statements", &statement_tests());
    failures += run_suite("Positive Tests", &positive_tests());

    assert_eq!(failures, 0, "see the suite output above");
}

fn printed(input: &str) -> Vec<String> {
    let outcome = parse_input(input);
    assert_eq!(outcome.diagnostics, Vec::<String>::new());
    outcome.statements.iter().map(ToString::to_string).collect()
}

#[test]
fn binary_levels_fold_left() {
    assert_eq!(printed("print 1 - 2 - 3;"), vec!["(print (- (- 1 2) 3))"]);
    assert_eq!(printed("print 1 + 2 * 3;"), vec!["(print (+ 1 (* 2 3)))"]);
    assert_eq!(
        printed("print -1 + 2 * (3 - x);"),
        vec!["(print (+ (- 1) (* 2 (group (- 3 x)))))"]
    );
    assert_eq!(
        printed("print a == b < c;"),
        vec!["(print (== a (< b c)))"]
    );
}

#[test]
fn logical_levels() {
    assert_eq!(
        printed("print a or b and c;"),
        vec!["(print (or a (and b c)))"]
    );
    assert_eq!(printed("print !!a;"), vec!["(print (! (! a)))"]);
}

#[test]
fn assignment_is_right_associative() {
    assert_eq!(printed("a = b = 1;"), vec!["(; (= a (= b 1)))"]);
}

#[test]
fn calls_chain() {
    assert_eq!(
        printed("f(1, \"s\")(g());"),
        vec!["(; (call (call f 1 \"s\") (call g)))"]
    );
}

#[test]
fn for_desugars_to_while() {
    assert_eq!(
        printed("for (var i = 0; i < 3; i = i + 1) print i;"),
        vec!["(block (var i 0) (while (< i 3) (block (print i) (; (= i (+ i 1))))))"]
    );
    assert_eq!(printed("for (;;) print 1;"), vec!["(while true (print 1))"]);
}

#[test]
fn declarations() {
    assert_eq!(
        printed("var a; var b = nil; fun f(x, y) { return x; }"),
        vec![
            "(var a)",
            "(var b nil)",
            "(fun f (x y) (return x))",
        ]
    );
    assert_eq!(
        printed("if (a) print 1; else { }"),
        vec!["(if a (print 1) (block))"]
    );
}

#[test]
fn two_broken_statements_give_two_diagnostics() {
    let outcome = parse_input("print ;\nvar = 1;\nprint \"ok\";");

    assert_eq!(
        outcome.diagnostics,
        vec![
            "[line 1] Error at ';': Expect expression.",
            "[line 2] Error at '=': Expect variable name.",
        ]
    );
    // recovery keeps the statement after the broken ones
    assert_eq!(outcome.statements.len(), 1);
}

#[test]
fn synchronize_stops_at_statement_keywords() {
    let outcome = parse_input("var x = 1 + ;\nprint 2;\nfun f( {}\nvar y = 3;");

    assert_eq!(
        outcome.diagnostics,
        vec![
            "[line 1] Error at ';': Expect expression.",
            "[line 3] Error at '{': Expect parameter name.",
        ]
    );
    let printed: Vec<String> = outcome.statements.iter().map(ToString::to_string).collect();
    assert_eq!(printed, vec!["(print 2)", "(var y 3)"]);
}

#[test]
fn invalid_assignment_target_does_not_abort_the_statement() {
    let outcome = parse_input("1 = 2; print 3;");

    assert_eq!(
        outcome.diagnostics,
        vec!["[line 1] Error at '=': Invalid assignment target."]
    );
    assert_eq!(outcome.statements.len(), 2);
}

#[test]
fn too_many_arguments_is_reported_once() {
    let args = vec!["0"; 256].join(", ");
    let outcome = parse_input(&format!("f({});", args));

    assert_eq!(
        outcome.diagnostics,
        vec!["[line 1] Error at '0': Can't have more than 255 arguments."]
    );
    assert_eq!(outcome.statements.len(), 1);
}

#[test]
fn too_many_parameters_is_reported_once() {
    let params: Vec<String> = (0..256).map(|i| format!("p{}", i)).collect();
    let outcome = parse_input(&format!("fun f({}) {{}}", params.join(", ")));

    assert_eq!(
        outcome.diagnostics,
        vec!["[line 1] Error at 'p255': Can't have more than 255 parameters."]
    );
    assert_eq!(outcome.statements.len(), 1);
}

/// Parses on a thread sized like a typical main thread, returning the
/// statement count and diagnostics.
fn parse_on_main_sized_stack(input: String) -> (usize, Vec<String>) {
    std::thread::Builder::new()
        .stack_size(8 * 1024 * 1024)
        .spawn(move || {
            let outcome = parse_input(&input);
            (outcome.statements.len(), outcome.diagnostics)
        })
        .unwrap()
        .join()
        .unwrap()
}

#[test]
fn deep_nesting_within_the_limit_parses() {
    let blocks = format!("{}{}", "{".repeat(3000), "}".repeat(3000));
    assert_eq!(parse_on_main_sized_stack(blocks), (1, Vec::new()));

    let groups = format!("print {}1{};", "(".repeat(3000), ")".repeat(3000));
    assert_eq!(parse_on_main_sized_stack(groups), (1, Vec::new()));

    let funs = format!("{}{}", "fun f() {".repeat(2000), "}".repeat(2000));
    assert_eq!(parse_on_main_sized_stack(funs), (1, Vec::new()));
}

#[test]
fn nesting_limit_stops_the_parse_with_one_diagnostic() {
    let blocks = format!("print 0;{}{}", "{".repeat(8000), "}".repeat(8000));
    let (count, diagnostics) = parse_on_main_sized_stack(blocks);
    // the statement before the runaway block survives
    assert_eq!(count, 1);
    assert_eq!(
        diagnostics,
        vec!["[line 1] Error at '{': Too much nesting; the limit is 4096 levels."]
    );

    let loops = format!("{}print 1;", "while (true) ".repeat(8000));
    let (_, diagnostics) = parse_on_main_sized_stack(loops);
    assert_eq!(
        diagnostics,
        vec!["[line 1] Error at 'while': Too much nesting; the limit is 4096 levels."]
    );

    let sum = format!("print {}1;", "1 + ".repeat(8000));
    let (_, diagnostics) = parse_on_main_sized_stack(sum);
    assert_eq!(diagnostics.len(), 1);
    assert!(diagnostics[0].contains("Too much nesting"));
}
