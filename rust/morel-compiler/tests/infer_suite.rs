use morel_compiler::{compile_statement, CompileError, TypeEnv};

fn type_of(source: &str) -> String {
    let env = TypeEnv::initial();
    let inferred = compile_statement(source, &env, false).expect("inference failure");
    inferred.bindings[0].1.to_string()
}

fn type_error(source: &str) -> String {
    let env = TypeEnv::initial();
    match compile_statement(source, &env, false) {
        Err(CompileError::Type(err)) => err.to_string(),
        Err(other) => panic!("expected type error, got {}", other),
        Ok(inferred) => panic!(
            "expected type error, inferred {}",
            inferred.bindings[0].1
        ),
    }
}

#[test]
fn literals() {
    assert_eq!(type_of("1"), "int");
    assert_eq!(type_of("1.5"), "real");
    assert_eq!(type_of("\"x\""), "string");
    assert_eq!(type_of("#\"x\""), "char");
    assert_eq!(type_of("true"), "bool");
    assert_eq!(type_of("()"), "unit");
}

#[test]
fn overloaded_arithmetic() {
    assert_eq!(type_of("1 + 2"), "int");
    assert_eq!(type_of("1.0 + ~2.0"), "real");
    assert_eq!(type_of("2 * 3"), "int");
    assert_eq!(type_of("2.0 / 4.0"), "real");
    assert_eq!(type_of("\"a\" ^ \"b\""), "string");
    assert_eq!(type_of("true andalso false"), "bool");
    // Unconstrained operands default to int.
    assert_eq!(type_of("fn x => x + x"), "int -> int");
    assert_eq!(type_of("fn x => ~x"), "int -> int");
}

#[test]
fn functions_and_application() {
    assert_eq!(type_of("fn x => x + 1"), "int -> int");
    assert_eq!(type_of("fn x => fn y => x + y"), "int -> int -> int");
    assert_eq!(type_of("fn x => x"), "'a -> 'a");
    assert_eq!(type_of("(fn x => x + 1) 3"), "int");
    assert_eq!(type_of("fn f => fn x => f (f x)"), "('a -> 'a) -> 'a -> 'a");
}

#[test]
fn tuples_records_lists() {
    assert_eq!(type_of("(1, true)"), "int * bool");
    assert_eq!(type_of("{a = 1, b = true}"), "{a:int, b:bool}");
    assert_eq!(type_of("[1, 2, 3]"), "int list");
    assert_eq!(type_of("[]"), "'a list");
    assert_eq!(type_of("[(1, true)]"), "(int * bool) list");
    assert_eq!(type_of("1 :: [2]"), "int list");
}

#[test]
fn selectors() {
    assert_eq!(type_of("#b {a = 1, b = true}"), "bool");
    assert_eq!(type_of("#1 (true, 0)"), "bool");
    assert_eq!(type_of("#2 (true, 0)"), "int");
    assert_eq!(type_of("fn r => #a r + #b (r : {a:int, b:int})"), "{a:int, b:int} -> int");
}

#[test]
fn conditionals_and_case() {
    assert_eq!(type_of("if true then 1 else 2"), "int");
    assert_eq!(type_of("case 1 of 1 => true | _ => false"), "bool");
    assert_eq!(type_of("fn [] => 0 | (h :: t) => h"), "int list -> int");
}

#[test]
fn let_and_recursion() {
    assert_eq!(type_of("let val x = 1 and y = 2 in x + y end"), "int");
    assert_eq!(
        type_of("let val rec f = fn n => if n = 0 then 1 else n * f (n - 1) in f 5 end"),
        "int"
    );
    assert_eq!(
        type_of("let fun len [] = 0 | len (h :: t) = 1 + len t in len [1, 2, 3] end"),
        "int"
    );
}

#[test]
fn top_level_bindings_generalize() {
    let env = TypeEnv::initial();
    let first = compile_statement("val id = fn x => x", &env, false).expect("infer");
    assert_eq!(first.bindings[0].1.to_string(), "'a -> 'a");
    let second = compile_statement("(id 1, id true)", &first.env, false).expect("infer");
    assert_eq!(second.bindings[0].1.to_string(), "int * bool");
}

#[test]
fn builtins_are_polymorphic() {
    assert_eq!(type_of("List.map"), "('a -> 'b) -> 'a list -> 'b list");
    assert_eq!(type_of("List.map (fn x => x + 1) [1, 2]"), "int list");
    assert_eq!(type_of("map (fn x => x > 0) [1]"), "bool list");
    assert_eq!(type_of("List.foldl (fn (x, acc) => x + acc) 0 [1, 2]"), "int");
    assert_eq!(type_of("Option.valOf (SOME 3)"), "int");
    assert_eq!(type_of("NONE"), "'a option");
    assert_eq!(type_of("[1] @ [2]"), "int list");
    assert_eq!(type_of("(fn x => x + 1) o (fn x => x * 2)"), "int -> int");
}

#[test]
fn datatypes() {
    let env = TypeEnv::initial();
    let decl = compile_statement(
        "datatype 'a tree = LEAF | NODE of 'a * 'a tree * 'a tree",
        &env,
        false,
    )
    .expect("datatype");
    let names: Vec<&str> = decl.bindings.iter().map(|(n, _)| n.as_str()).collect();
    assert_eq!(names, vec!["LEAF", "NODE"]);
    assert_eq!(decl.bindings[0].1.to_string(), "'a tree");
    assert_eq!(
        decl.bindings[1].1.to_string(),
        "'a * 'a tree * 'a tree -> 'a tree"
    );
    let use_it = compile_statement("NODE (1, LEAF, LEAF)", &decl.env, false).expect("use");
    assert_eq!(use_it.bindings[0].1.to_string(), "int tree");
}

#[test]
fn query_types() {
    assert_eq!(
        type_of("from [{a = 1, b = true}] as e yield #a e"),
        "int list"
    );
    assert_eq!(
        type_of("from [1, 2] as i where i > 1"),
        "int list"
    );
    assert_eq!(
        type_of("from [1] as i, [true] as b"),
        "{b:bool, i:int} list"
    );
    assert_eq!(
        type_of("from [{d = 1, s = 2}] as e group #d e as d compute sum of #s e as total"),
        "{d:int, total:int} list"
    );
}

#[test]
fn errors() {
    assert!(type_error("x + 1").contains("unbound"));
    assert!(type_error("1 + true").contains("cannot unify"));
    assert!(type_error("if 1 then 2 else 3").contains("cannot unify"));
    assert!(type_error("1 2").contains("non-function"));
    assert!(type_error("fn {a = x, ...} => x").contains("unresolved flex record"));
    assert!(type_error("val rec x = 1").contains("recursive binding"));
    assert!(type_error("#c {a = 1, b = 2}").contains("record"));
}

#[test]
fn coverage_warnings() {
    let env = TypeEnv::initial();
    let result = compile_statement("case 1 of 1 => true", &env, true).expect("infer");
    assert!(result
        .warnings
        .iter()
        .any(|w| w.to_string().contains("nonexhaustive")));

    let result = compile_statement("case 1 of _ => 1 | 2 => 3", &env, true).expect("infer");
    assert!(result
        .warnings
        .iter()
        .any(|w| w.to_string().contains("redundant")));

    let result =
        compile_statement("fn [] => 0 | (h :: t) => h", &env, true).expect("infer");
    assert!(result.warnings.is_empty());

    let result = compile_statement("case true of true => 1 | false => 0", &env, true)
        .expect("infer");
    assert!(result.warnings.is_empty());

    // Disabled coverage yields no warnings.
    let result = compile_statement("case 1 of 1 => true", &env, false).expect("infer");
    assert!(result.warnings.is_empty());
}

#[test]
fn case_record_fields_propagate_between_clauses() {
    assert_eq!(
        type_of("fn r => case r of {a = 1, b = x} => x | {a = _, ...} => 0"),
        "{a:int, b:int} -> int"
    );
}
