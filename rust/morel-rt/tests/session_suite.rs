use morel_rt::session::value_from_json;
use morel_rt::{BindingKind, Session};

fn eval(session: &mut Session, source: &str) -> String {
    let result = session.eval_statement(source).expect("statement failed");
    result
        .bindings
        .iter()
        .map(|b| b.format(session.props()))
        .collect::<Vec<_>>()
        .join("\n")
}

#[test]
fn bare_expression_binds_it() {
    let mut session = Session::new();
    assert_eq!(eval(&mut session, "1 + 2"), "val it = 3 : int");
    // `it` stays bound for the next statement.
    assert_eq!(eval(&mut session, "it * 10"), "val it = 30 : int");
}

#[test]
fn declarations_persist() {
    let mut session = Session::new();
    assert_eq!(eval(&mut session, "val x = 6"), "val x = 6 : int");
    assert_eq!(eval(&mut session, "val y = 7"), "val y = 7 : int");
    assert_eq!(eval(&mut session, "x * y"), "val it = 42 : int");
    assert_eq!(
        eval(&mut session, "fun twice f x = f (f x)"),
        "val twice = fn : ('a -> 'a) -> 'a -> 'a"
    );
    assert_eq!(eval(&mut session, "twice (fn n => n + 1) 40"), "val it = 42 : int");
}

#[test]
fn group_bindings_report_each_name() {
    let mut session = Session::new();
    assert_eq!(
        eval(&mut session, "val x = 1 and y = 2"),
        "val x = 1 : int\nval y = 2 : int"
    );
}

#[test]
fn datatype_declares_constructors() {
    let mut session = Session::new();
    let result = session
        .eval_statement("datatype color = RED | GREEN | BLUE")
        .expect("datatype");
    let names: Vec<&str> = result.bindings.iter().map(|b| b.name.as_str()).collect();
    assert_eq!(names, vec!["RED", "GREEN", "BLUE"]);
    assert!(result.bindings.iter().all(|b| b.kind == BindingKind::Con));
    assert_eq!(eval(&mut session, "RED"), "val it = RED : color");
    assert_eq!(
        eval(&mut session, "case GREEN of RED => 0 | GREEN => 1 | BLUE => 2"),
        "val it = 1 : int"
    );
}

#[test]
fn errors_leave_environment_untouched() {
    let mut session = Session::new();
    eval(&mut session, "val x = 1");

    // Parse error.
    let err = session.eval_statement("val = 3").expect_err("parse");
    assert_eq!(err.stage(), "parse");
    // Type error.
    let err = session.eval_statement("x + true").expect_err("type");
    assert_eq!(err.stage(), "type");
    // Eval error; the binding must not be committed.
    let err = session.eval_statement("val x = 1 div 0").expect_err("eval");
    assert_eq!(err.stage(), "eval");

    assert_eq!(eval(&mut session, "x"), "val it = 1 : int");
}

#[test]
fn failed_group_commits_nothing() {
    let mut session = Session::new();
    eval(&mut session, "val a = 10");
    session
        .eval_statement("val a = 99 and b = 1 div 0")
        .expect_err("eval");
    assert_eq!(eval(&mut session, "a"), "val it = 10 : int");
    session.eval_statement("b").expect_err("b must be unbound");
}

#[test]
fn properties_drive_printing() {
    let mut session = Session::new();
    assert_eq!(eval(&mut session, "Sys.set (\"printLength\", 3)"), "val it = () : unit");
    assert_eq!(
        eval(&mut session, "[1, 2, 3, 4, 5]"),
        "val it = [1,2,3,...] : int list"
    );
    assert_eq!(
        eval(&mut session, "Sys.show \"printLength\""),
        "val it = SOME \"3\" : string option"
    );
    assert_eq!(eval(&mut session, "Sys.unset \"printLength\""), "val it = () : unit");
    assert_eq!(
        eval(&mut session, "[1, 2, 3, 4, 5]"),
        "val it = [1,2,3,4,5] : int list"
    );
}

#[test]
fn show_all_lists_every_property() {
    let mut session = Session::new();
    let result = session.eval_statement("Sys.showAll ()").expect("showAll");
    let printed = result.bindings[0].format(session.props());
    for name in [
        "hybrid",
        "inlinePassCount",
        "lineWidth",
        "matchCoverageEnabled",
        "output",
        "printDepth",
        "printLength",
        "stringDepth",
    ] {
        assert!(printed.contains(name), "missing {} in {}", name, printed);
    }
}

#[test]
fn unknown_property_is_an_eval_error() {
    let mut session = Session::new();
    let err = session
        .eval_statement("Sys.set (\"nope\", 1)")
        .expect_err("unknown property");
    assert_eq!(err.stage(), "eval");
}

#[test]
fn match_coverage_property_gates_warnings() {
    let mut session = Session::new();
    let result = session
        .eval_statement("case 1 of 1 => true | _ => false")
        .expect("exhaustive");
    assert!(result.warnings.is_empty());

    let result = session.eval_statement("case 1 of 1 => true").expect("run");
    assert!(!result.warnings.is_empty());

    eval(&mut session, "Sys.set (\"matchCoverageEnabled\", false)");
    let result = session.eval_statement("case 1 of 1 => true").expect("run");
    assert!(result.warnings.is_empty());
}

#[test]
fn foreign_values_evaluate_like_native_records() {
    let mut session = Session::new();
    let json: serde_json::Value = serde_json::from_str(
        r#"{"emps": [
            {"id": 102, "name": "Shaggy", "deptno": 30},
            {"id": 103, "name": "Scooby", "deptno": 30},
            {"id": 104, "name": "Daphne", "deptno": 20}
        ]}"#,
    )
    .expect("json");
    session.bind_foreign("scott", value_from_json(&json));

    assert_eq!(
        eval(
            &mut session,
            "from #emps scott as e where #deptno e = 30 yield #id e"
        ),
        "val it = [102,103] : int list"
    );
    assert_eq!(
        eval(&mut session, "List.length (#emps scott)"),
        "val it = 3 : int"
    );
}

#[test]
fn sys_env_reports_bindings() {
    let mut session = Session::new();
    eval(&mut session, "val answer = 42");
    let result = session.eval_statement("Sys.env ()").expect("env");
    let printed = result.bindings[0].format(session.props());
    assert!(printed.contains("answer"));
}

#[test]
fn reals_print_re_parseably() {
    let mut session = Session::new();
    assert_eq!(eval(&mut session, "2.0"), "val it = 2.0 : real");
    assert_eq!(eval(&mut session, "~0.5"), "val it = ~0.5 : real");
    assert_eq!(eval(&mut session, "1.0 / 4.0"), "val it = 0.25 : real");
}
