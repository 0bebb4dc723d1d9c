use morel_rt::Session;

fn eval(source: &str) -> String {
    let mut session = Session::new();
    let result = session.eval_statement(source).expect("statement failed");
    result.bindings[0].format(session.props())
}

fn eval_err(source: &str) -> String {
    let mut session = Session::new();
    match session.eval_statement(source) {
        Err(err) => format!("{}: {}", err.stage(), err),
        Ok(result) => panic!(
            "expected failure, got {}",
            result.bindings[0].format(session.props())
        ),
    }
}

#[test]
fn arithmetic() {
    assert_eq!(eval("1 + 2 * 3"), "val it = 7 : int");
    assert_eq!(eval("(1 + 2) * 3"), "val it = 9 : int");
    assert_eq!(eval("7 - 10"), "val it = ~3 : int");
    assert_eq!(eval("1.5 + 2.25"), "val it = 3.75 : real");
    assert_eq!(eval("2.0 * 3.0"), "val it = 6.0 : real");
    assert_eq!(eval("~ (1 + 2)"), "val it = ~3 : int");
}

#[test]
fn integer_division_floors() {
    assert_eq!(eval("20 div 3"), "val it = 6 : int");
    assert_eq!(eval("~10 mod 3"), "val it = 2 : int");
    assert_eq!(eval("20 div ~3"), "val it = ~7 : int");
    assert_eq!(eval("10 mod ~3"), "val it = ~2 : int");
}

#[test]
fn strings_and_chars() {
    assert_eq!(eval("\"a\" ^ \"b\""), "val it = \"ab\" : string");
    assert_eq!(eval("String.size \"abc\""), "val it = 3 : int");
    assert_eq!(eval("Char.ord #\"A\""), "val it = 65 : int");
    assert_eq!(eval("Char.chr 66"), "val it = #\"B\" : char");
    assert_eq!(
        eval("String.explode \"ab\""),
        "val it = [#\"a\",#\"b\"] : char list"
    );
}

#[test]
fn booleans_short_circuit() {
    assert_eq!(eval("true andalso false"), "val it = false : bool");
    assert_eq!(eval("false andalso (1 div 0 = 0)"), "val it = false : bool");
    assert_eq!(eval("true orelse (1 div 0 = 0)"), "val it = true : bool");
    assert_eq!(eval("not true"), "val it = false : bool");
}

#[test]
fn comparisons() {
    assert_eq!(eval("1 < 2"), "val it = true : bool");
    assert_eq!(eval("2 <= 1"), "val it = false : bool");
    assert_eq!(eval("\"a\" < \"b\""), "val it = true : bool");
    assert_eq!(eval("(1, true) = (1, true)"), "val it = true : bool");
    assert_eq!(eval("[1, 2] <> [1, 3]"), "val it = true : bool");
}

#[test]
fn let_bindings() {
    assert_eq!(eval("let val x = 1 and y = 2 in x + y end"), "val it = 3 : int");
    assert_eq!(
        eval("let val x = 1 in let val x = x + 1 in x * 10 end end"),
        "val it = 20 : int"
    );
    assert_eq!(
        eval("let val (x, y) = (3, 4) in x * y end"),
        "val it = 12 : int"
    );
}

#[test]
fn recursion() {
    assert_eq!(
        eval("let val rec fact = fn n => if n = 0 then 1 else n * fact (n - 1) in fact 5 end"),
        "val it = 120 : int"
    );
    assert_eq!(
        eval("let fun len [] = 0 | len (h :: t) = 1 + len t in len [1, 2, 3] end"),
        "val it = 3 : int"
    );
    assert_eq!(
        eval("let fun fib 0 = 0 | fib 1 = 1 | fib n = fib (n - 1) + fib (n - 2) in fib 10 end"),
        "val it = 55 : int"
    );
}

#[test]
fn functions_and_closures() {
    assert_eq!(eval("(fn _ => 42) 2"), "val it = 42 : int");
    assert_eq!(
        eval("let val add = fn x => fn y => x + y in add 1 2 end"),
        "val it = 3 : int"
    );
    // Closures capture the environment at evaluation time.
    assert_eq!(
        eval("let val x = 1 val f = fn () => x val x = 2 in f () end"),
        "val it = 1 : int"
    );
    assert_eq!(eval("fn x => x"), "val it = fn : 'a -> 'a");
}

#[test]
fn selectors() {
    assert_eq!(eval("#b {a = 1, b = 2, c = 3}"), "val it = 2 : int");
    assert_eq!(eval("#2 (true, 7)"), "val it = 7 : int");
    assert_eq!(
        eval("List.map #1 [(1, true), (2, false)]"),
        "val it = [1,2] : int list"
    );
}

#[test]
fn list_builtins() {
    assert_eq!(
        eval("List.map (fn x => x + 1) [1, 2, 3]"),
        "val it = [2,3,4] : int list"
    );
    assert_eq!(eval("List.rev [1, 2, 3]"), "val it = [3,2,1] : int list");
    assert_eq!(eval("List.length [1, 2, 3]"), "val it = 3 : int");
    assert_eq!(eval("List.hd [1, 2]"), "val it = 1 : int");
    assert_eq!(eval("List.tl [1, 2]"), "val it = [2] : int list");
    assert_eq!(
        eval("List.filter (fn x => x > 1) [1, 2, 3]"),
        "val it = [2,3] : int list"
    );
    assert_eq!(
        eval("List.foldl (fn (x, acc) => x + acc) 0 [1, 2, 3, 4]"),
        "val it = 10 : int"
    );
    assert_eq!(
        eval("List.foldr (fn (x, acc) => x :: acc) [] [1, 2]"),
        "val it = [1,2] : int list"
    );
    assert_eq!(eval("[1] @ [2, 3]"), "val it = [1,2,3] : int list");
    assert_eq!(
        eval("List.tabulate (3, fn i => i * i)"),
        "val it = [0,1,4] : int list"
    );
}

#[test]
fn option_builtins() {
    assert_eq!(eval("SOME 3"), "val it = SOME 3 : int option");
    assert_eq!(eval("Option.valOf (SOME 3)"), "val it = 3 : int");
    assert_eq!(eval("Option.isSome NONE"), "val it = false : bool");
    assert_eq!(eval("Option.getOpt (NONE, 7)"), "val it = 7 : int");
    assert_eq!(
        eval("Option.map (fn x => x + 1) (SOME 1)"),
        "val it = SOME 2 : int option"
    );
}

#[test]
fn relational_builtins() {
    assert_eq!(eval("sum [1, 2, 3]"), "val it = 6 : int");
    assert_eq!(eval("count [1, 2, 3]"), "val it = 3 : int");
    assert_eq!(eval("max [3, 1, 2]"), "val it = 3 : int");
    assert_eq!(eval("min [3, 1, 2]"), "val it = 1 : int");
    assert_eq!(eval("only [7]"), "val it = 7 : int");
    assert_eq!(eval("exists [1]"), "val it = true : bool");
    assert_eq!(eval("notExists []"), "val it = true : bool");
}

#[test]
fn composition() {
    assert_eq!(
        eval("((fn x => x + 1) o (fn x => x * 2)) 5"),
        "val it = 11 : int"
    );
}

#[test]
fn runtime_failures() {
    assert!(eval_err("1 div 0").contains("Div"));
    assert!(eval_err("1 mod 0").contains("Div"));
    assert!(eval_err("List.hd []").contains("Empty"));
    assert!(eval_err("List.nth ([1], 5)").contains("Subscript"));
    assert!(eval_err("Option.valOf NONE").contains("Option"));
    assert!(eval_err("Char.chr 999").contains("Chr"));
    assert!(eval_err("case 2 of 1 => 0").contains("Match"));
}

#[test]
fn hex_and_negative_literals() {
    assert_eq!(eval("0x10"), "val it = 16 : int");
    assert_eq!(eval("~0x10"), "val it = ~16 : int");
    assert_eq!(eval("~3 + 1"), "val it = ~2 : int");
}
