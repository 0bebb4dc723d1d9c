use morel_compiler::{parse_decl, parse_expression, parse_literal, parse_statement, ParseError};

/// Unparse, reparse, and unparse again; a stable fixpoint is the round-trip
/// contract for every well-formed expression.
fn stable(source: &str) -> String {
    let first = parse_expression(source).expect("parse failure").to_string();
    let second = parse_expression(&first)
        .expect("reparse failure")
        .to_string();
    assert_eq!(first, second, "unparse not a fixpoint for {}", source);
    first
}

#[test]
fn literals_round_trip() {
    assert_eq!(stable("1"), "1");
    assert_eq!(stable("~1"), "~1");
    assert_eq!(stable("0xFF"), "255");
    assert_eq!(stable("1.5"), "1.5");
    assert_eq!(stable("~2.0"), "~2.0");
    assert_eq!(stable("\"a\\nb\""), "\"a\\nb\"");
    assert_eq!(stable("#\"x\""), "#\"x\"");
    assert_eq!(stable("true"), "true");
    assert_eq!(stable("()"), "()");
}

#[test]
fn redundant_parens_disappear() {
    assert_eq!(stable("(1 + 2) + 3"), "1 + 2 + 3");
    assert_eq!(stable("((1))"), "1");
    assert_eq!(stable("(1 * 2) * 3"), "1 * 2 * 3");
}

#[test]
fn meaningful_parens_survive() {
    assert_eq!(stable("1 - (2 - 3)"), "1 - (2 - 3)");
    assert_eq!(stable("(1 + 2) * 3"), "(1 + 2) * 3");
    assert_eq!(stable("1 * (2 + 3)"), "1 * (2 + 3)");
}

#[test]
fn associativity() {
    // :: and @ are right-associative at level 5.
    assert_eq!(stable("1 :: 2 :: [3]"), "1 :: 2 :: [3]");
    assert_eq!(stable("[1] @ [2] @ [3]"), "[1] @ [2] @ [3]");
    assert_eq!(stable("([1] @ [2]) @ [3]"), "([1] @ [2]) @ [3]");
    // Comparisons sit below arithmetic.
    assert_eq!(stable("1 + 2 = 3"), "1 + 2 = 3");
    assert_eq!(stable("a < b andalso c < d"), "a < b andalso c < d");
    assert_eq!(stable("a andalso b orelse c"), "a andalso b orelse c");
}

#[test]
fn application_binds_tightest() {
    assert_eq!(stable("f x + g y"), "f x + g y");
    assert_eq!(stable("f (x + 1)"), "f (x + 1)");
    assert_eq!(stable("f x y"), "f x y");
    assert_eq!(stable("f (g x)"), "f (g x)");
}

#[test]
fn records_sort_fields() {
    assert_eq!(stable("{b = 1, a = 2}"), "{a = 2, b = 1}");
    // Numeric labels sort numerically and come first.
    assert_eq!(
        stable("{x = 1, 2 = 2, 10 = 3}"),
        "{2 = 2, 10 = 3, x = 1}"
    );
}

#[test]
fn tuples_and_selectors() {
    assert_eq!(stable("(1, true, \"x\")"), "(1, true, \"x\")");
    assert_eq!(stable("#1 (true, 0)"), "#1 (true, 0)");
    assert_eq!(stable("#b {a = 1, b = true}"), "#b {a = 1, b = true}");
}

#[test]
fn special_forms() {
    assert_eq!(
        stable("if a then 1 else 2"),
        "if a then 1 else 2"
    );
    assert_eq!(
        stable("case x of 1 => true | _ => false"),
        "case x of 1 => true | _ => false"
    );
    assert_eq!(stable("fn x => x + 1"), "fn x => x + 1");
    assert_eq!(
        stable("let val x = 1 in x + 1 end"),
        "let val x = 1 in x + 1 end"
    );
}

#[test]
fn patterns_round_trip() {
    // Rule patterns are full patterns, so the parens around a cons drop.
    assert_eq!(
        stable("fn (h :: t) => h | [] => 0"),
        "fn h :: t => h | [] => 0"
    );
    assert_eq!(stable("fn (x, y) => x"), "fn (x, y) => x");
    assert_eq!(
        stable("fn {a = x, ...} => x"),
        "fn {a = x, ...} => x"
    );
    assert_eq!(stable("fn x as y => x"), "fn x as y => x");
}

#[test]
fn query_syntax() {
    assert_eq!(
        stable("from emps as e where #deptno e = 30 yield #id e"),
        "from emps as e where #deptno e = 30 yield #id e"
    );
    assert_eq!(
        stable("from emps as e, depts as d yield (e, d)"),
        "from emps as e, depts as d yield (e, d)"
    );
    assert_eq!(
        stable("from emps as e group #deptno e as deptno compute sum of #sal e as total"),
        "from emps as e group #deptno e as deptno compute sum of #sal e as total"
    );
}

#[test]
fn annotations() {
    assert_eq!(stable("1 : int"), "1 : int");
    assert_eq!(stable("fn x => x : int"), "fn x => x : int");
    assert_eq!(stable("[] : int list"), "[] : int list");
}

#[test]
fn declarations() {
    let decl = parse_decl("val x = 1 and y = 2").expect("parse");
    assert_eq!(decl.to_string(), "val x = 1 and y = 2");
    let decl = parse_decl("val rec f = fn x => f x").expect("parse");
    assert_eq!(decl.to_string(), "val rec f = fn x => f x");
    let decl = parse_decl("datatype 'a tree = LEAF | NODE of 'a * 'a tree * 'a tree")
        .expect("parse");
    assert_eq!(
        decl.to_string(),
        "datatype 'a tree = LEAF | NODE of 'a * 'a tree * 'a tree"
    );
}

#[test]
fn statement_and_literal_endpoints() {
    assert!(parse_statement("val x = 1;").is_ok());
    assert!(parse_statement("1 + 2").is_ok());
    assert!(parse_literal("~3").is_ok());
    assert!(parse_literal("1 + 2").is_err());
}

#[test]
fn malformed_syntax_is_rejected() {
    assert!(parse_expression("1 +").is_err());
    assert!(parse_expression("(1, 2").is_err());
    assert!(parse_expression("let val x = 1 in x").is_err());
    assert!(parse_expression("case x of").is_err());
    assert!(matches!(
        parse_expression("{0 = 1}"),
        Err(ParseError::InvalidLabel { .. })
    ));
    assert!(matches!(
        parse_decl("fun f 0 = 1 | g n = n"),
        Err(ParseError::MixedFunNames { .. })
    ));
}

#[test]
fn comments_and_whitespace() {
    assert_eq!(stable("1 (* plus (* nested *) *) + 2"), "1 + 2");
}

#[test]
fn qualified_names() {
    assert_eq!(stable("List.map f [1]"), "List.map f [1]");
}
