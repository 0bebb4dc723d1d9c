use morel_rt::Session;

fn eval(session: &mut Session, source: &str) -> String {
    let result = session.eval_statement(source).expect("statement failed");
    result.bindings[0].format(session.props())
}

fn eval_one(source: &str) -> String {
    let mut session = Session::new();
    eval(&mut session, source)
}

#[test]
fn wildcard_and_identifier() {
    assert_eq!(eval_one("case 7 of _ => 0"), "val it = 0 : int");
    assert_eq!(eval_one("case 7 of n => n + 1"), "val it = 8 : int");
}

#[test]
fn literal_patterns() {
    assert_eq!(
        eval_one("case 2 of 1 => \"one\" | 2 => \"two\" | _ => \"many\""),
        "val it = \"two\" : string"
    );
    assert_eq!(
        eval_one("case #\"b\" of #\"a\" => 0 | #\"b\" => 1 | _ => 2"),
        "val it = 1 : int"
    );
    assert_eq!(
        eval_one("case false of true => 1 | false => 0"),
        "val it = 0 : int"
    );
}

#[test]
fn clauses_try_in_source_order() {
    assert_eq!(
        eval_one("case 1 of _ => \"first\" | 1 => \"second\""),
        "val it = \"first\" : string"
    );
}

#[test]
fn tuple_and_record_patterns() {
    assert_eq!(
        eval_one("case (1, 2) of (x, y) => x + y"),
        "val it = 3 : int"
    );
    assert_eq!(
        eval_one("case {a = 1, b = 2} of {a = x, b = y} => x * 10 + y"),
        "val it = 12 : int"
    );
    // Ellipsis accepts extra fields.
    assert_eq!(
        eval_one(
            "case {a = 1, b = 2, c = 3} of {b = x, ...} => x : int"
        ),
        "val it = 2 : int"
    );
    // Field-name shorthand binds the field to a variable of the same name.
    assert_eq!(
        eval_one("case {a = 5, b = 6} of {a, b} => a + b"),
        "val it = 11 : int"
    );
}

#[test]
fn list_and_cons_patterns() {
    assert_eq!(
        eval_one("case [1, 2, 3] of [] => 0 | h :: t => h"),
        "val it = 1 : int"
    );
    assert_eq!(
        eval_one("case [1, 2, 3] of [x, y, z] => x + y + z | _ => 0"),
        "val it = 6 : int"
    );
    assert_eq!(
        eval_one("case [1] of h :: [] => h | _ => 0"),
        "val it = 1 : int"
    );
    assert_eq!(
        eval_one("case [] of [] => \"empty\" | _ => \"full\""),
        "val it = \"empty\" : string"
    );
}

#[test]
fn layered_patterns() {
    assert_eq!(
        eval_one("case [1, 2] of all as h :: _ => (h, all) | _ => (0, [])"),
        "val it = (1,[1,2]) : int * int list"
    );
}

#[test]
fn constructor_patterns() {
    let mut session = Session::new();
    eval(
        &mut session,
        "datatype shape = CIRCLE of int | RECT of int * int | DOT",
    );
    assert_eq!(
        eval(
            &mut session,
            "case CIRCLE 5 of CIRCLE r => r | RECT (w, h) => w * h | DOT => 0"
        ),
        "val it = 5 : int"
    );
    assert_eq!(
        eval(
            &mut session,
            "case RECT (3, 4) of CIRCLE r => r | RECT (w, h) => w * h | DOT => 0"
        ),
        "val it = 12 : int"
    );
    assert_eq!(
        eval(&mut session, "case DOT of CIRCLE _ => false | _ => true"),
        "val it = true : bool"
    );
    // Constructors nest.
    assert_eq!(
        eval(
            &mut session,
            "case SOME (CIRCLE 9) of SOME (CIRCLE r) => r | _ => 0"
        ),
        "val it = 9 : int"
    );
}

#[test]
fn option_patterns() {
    assert_eq!(
        eval_one("case SOME 3 of SOME n => n | NONE => 0"),
        "val it = 3 : int"
    );
    assert_eq!(
        eval_one("case NONE of SOME n => n | NONE => ~1"),
        "val it = ~1 : int"
    );
}

#[test]
fn fun_clause_constructor_disambiguation() {
    let mut session = Session::new();
    eval(&mut session, "datatype box = FULL of int | EMPTY");
    // FULL consumes the next sibling pattern as its argument; EMPTY stands
    // alone, so both clauses take one argument.
    eval(
        &mut session,
        "fun content FULL n = n | content EMPTY = 0",
    );
    assert_eq!(eval(&mut session, "content (FULL 9)"), "val it = 9 : int");
    assert_eq!(eval(&mut session, "content EMPTY"), "val it = 0 : int");
}

#[test]
fn patterns_in_val_bindings() {
    let mut session = Session::new();
    assert_eq!(eval(&mut session, "val (x, y) = (1, 2)"), "val x = 1 : int");
    assert_eq!(eval(&mut session, "y"), "val it = 2 : int");
    assert_eq!(
        eval(&mut session, "val h :: t = [1, 2, 3]"),
        "val h = 1 : int"
    );
    assert_eq!(eval(&mut session, "t"), "val it = [2,3] : int list");
}

#[test]
fn val_binding_failure_raises_bind() {
    let mut session = Session::new();
    let err = session
        .eval_statement("val h :: t = []")
        .expect_err("bind failure");
    assert!(err.to_string().contains("Bind"));
}

#[test]
fn nonexhaustive_match_fails_at_runtime() {
    let mut session = Session::new();
    let err = session
        .eval_statement("(fn 1 => \"one\") 2")
        .expect_err("match failure");
    assert!(err.to_string().contains("Match"));
}

#[test]
fn closures_dispatch_over_rules() {
    assert_eq!(
        eval_one("let val sign = fn 0 => 0 | n => if n > 0 then 1 else ~1 in sign ~5 end"),
        "val it = ~1 : int"
    );
}
