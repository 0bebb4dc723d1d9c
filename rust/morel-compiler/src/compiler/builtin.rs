//! Built-in value descriptors: names and type schemes.
//!
//! Implementations live in the runtime crate and are matched by name; the
//! inferencer only needs the schemes. Qualified names (`List.map`) and their
//! top-level aliases (`map`) are separate entries sharing one scheme.

use crate::compiler::types::{Scheme, Type};

#[derive(Debug, Clone)]
pub struct BuiltIn {
    pub name: &'static str,
    pub scheme: Scheme,
}

fn a() -> Type {
    Type::Var(0)
}

fn b() -> Type {
    Type::Var(1)
}

fn c() -> Type {
    Type::Var(2)
}

fn func2(t1: Type, t2: Type, r: Type) -> Type {
    Type::func(t1, Type::func(t2, r))
}

fn pair(t1: Type, t2: Type) -> Type {
    Type::Tuple(vec![t1, t2])
}

fn opt(t: Type) -> Type {
    Type::data("option", vec![t])
}

fn order() -> Type {
    Type::data("order", vec![])
}

fn vector(t: Type) -> Type {
    Type::data("vector", vec![t])
}

fn bag(t: Type) -> Type {
    Type::data("bag", vec![t])
}

fn mono(name: &'static str, ty: Type) -> BuiltIn {
    BuiltIn {
        name,
        scheme: Scheme::mono(ty),
    }
}

fn poly(name: &'static str, vars: u32, ty: Type) -> BuiltIn {
    BuiltIn {
        name,
        scheme: Scheme::poly(vars, ty),
    }
}

/// The whole built-in table. Order is insignificant; every entry lands in
/// the initial environment.
pub fn built_ins() -> Vec<BuiltIn> {
    let mut t = Vec::new();

    // General
    t.push(mono("not", Type::func(Type::BOOL, Type::BOOL)));
    t.push(mono("abs", Type::func(Type::INT, Type::INT)));
    t.push(poly("ignore", 1, Type::func(a(), Type::UNIT)));
    t.push(poly(
        "o",
        3,
        Type::func(
            pair(Type::func(b(), c()), Type::func(a(), b())),
            Type::func(a(), c()),
        ),
    ));
    t.push(poly("General.ignore", 1, Type::func(a(), Type::UNIT)));
    t.push(poly(
        "General.o",
        3,
        Type::func(
            pair(Type::func(b(), c()), Type::func(a(), b())),
            Type::func(a(), c()),
        ),
    ));
    t.push(poly("nil", 1, Type::list(a())));
    t.push(poly(
        "@",
        1,
        Type::func(pair(Type::list(a()), Type::list(a())), Type::list(a())),
    ));
    t.push(poly(
        "union",
        1,
        Type::func(pair(Type::list(a()), Type::list(a())), Type::list(a())),
    ));
    t.push(poly(
        "except",
        1,
        Type::func(pair(Type::list(a()), Type::list(a())), Type::list(a())),
    ));
    t.push(poly(
        "intersect",
        1,
        Type::func(pair(Type::list(a()), Type::list(a())), Type::list(a())),
    ));

    // List
    t.push(poly("List.null", 1, Type::func(Type::list(a()), Type::BOOL)));
    t.push(poly("List.length", 1, Type::func(Type::list(a()), Type::INT)));
    t.push(poly("List.hd", 1, Type::func(Type::list(a()), a())));
    t.push(poly("List.tl", 1, Type::func(Type::list(a()), Type::list(a()))));
    t.push(poly("List.last", 1, Type::func(Type::list(a()), a())));
    t.push(poly("List.rev", 1, Type::func(Type::list(a()), Type::list(a()))));
    t.push(poly(
        "List.append",
        1,
        Type::func(pair(Type::list(a()), Type::list(a())), Type::list(a())),
    ));
    t.push(poly(
        "List.concat",
        1,
        Type::func(Type::list(Type::list(a())), Type::list(a())),
    ));
    t.push(poly(
        "List.revAppend",
        1,
        Type::func(pair(Type::list(a()), Type::list(a())), Type::list(a())),
    ));
    t.push(poly(
        "List.take",
        1,
        Type::func(pair(Type::list(a()), Type::INT), Type::list(a())),
    ));
    t.push(poly(
        "List.drop",
        1,
        Type::func(pair(Type::list(a()), Type::INT), Type::list(a())),
    ));
    t.push(poly(
        "List.nth",
        1,
        Type::func(pair(Type::list(a()), Type::INT), a()),
    ));
    t.push(poly(
        "List.getItem",
        1,
        Type::func(Type::list(a()), opt(pair(a(), Type::list(a())))),
    ));
    t.push(poly(
        "List.map",
        2,
        func2(Type::func(a(), b()), Type::list(a()), Type::list(b())),
    ));
    t.push(poly(
        "List.mapPartial",
        2,
        func2(Type::func(a(), opt(b())), Type::list(a()), Type::list(b())),
    ));
    t.push(poly(
        "List.app",
        1,
        func2(Type::func(a(), Type::UNIT), Type::list(a()), Type::UNIT),
    ));
    t.push(poly(
        "List.filter",
        1,
        func2(Type::func(a(), Type::BOOL), Type::list(a()), Type::list(a())),
    ));
    t.push(poly(
        "List.partition",
        1,
        func2(
            Type::func(a(), Type::BOOL),
            Type::list(a()),
            pair(Type::list(a()), Type::list(a())),
        ),
    ));
    t.push(poly(
        "List.find",
        1,
        func2(Type::func(a(), Type::BOOL), Type::list(a()), opt(a())),
    ));
    t.push(poly(
        "List.exists",
        1,
        func2(Type::func(a(), Type::BOOL), Type::list(a()), Type::BOOL),
    ));
    t.push(poly(
        "List.all",
        1,
        func2(Type::func(a(), Type::BOOL), Type::list(a()), Type::BOOL),
    ));
    t.push(poly(
        "List.foldl",
        2,
        Type::func(
            Type::func(pair(a(), b()), b()),
            func2(b(), Type::list(a()), b()),
        ),
    ));
    t.push(poly(
        "List.foldr",
        2,
        Type::func(
            Type::func(pair(a(), b()), b()),
            func2(b(), Type::list(a()), b()),
        ),
    ));
    t.push(poly(
        "List.tabulate",
        1,
        Type::func(pair(Type::INT, Type::func(Type::INT, a())), Type::list(a())),
    ));
    t.push(poly(
        "List.collate",
        1,
        func2(
            Type::func(pair(a(), a()), order()),
            pair(Type::list(a()), Type::list(a())),
            order(),
        ),
    ));

    // Option
    t.push(poly("Option.isSome", 1, Type::func(opt(a()), Type::BOOL)));
    t.push(poly("Option.valOf", 1, Type::func(opt(a()), a())));
    t.push(poly("Option.getOpt", 1, Type::func(pair(opt(a()), a()), a())));
    t.push(poly(
        "Option.map",
        2,
        func2(Type::func(a(), b()), opt(a()), opt(b())),
    ));
    t.push(poly("Option.join", 1, Type::func(opt(opt(a())), opt(a()))));
    t.push(poly(
        "Option.filter",
        1,
        func2(Type::func(a(), Type::BOOL), a(), opt(a())),
    ));
    t.push(poly(
        "Option.app",
        1,
        func2(Type::func(a(), Type::UNIT), opt(a()), Type::UNIT),
    ));
    t.push(poly(
        "Option.mapPartial",
        2,
        func2(Type::func(a(), opt(b())), opt(a()), opt(b())),
    ));
    t.push(poly(
        "Option.compose",
        3,
        Type::func(
            pair(Type::func(b(), c()), Type::func(a(), opt(b()))),
            Type::func(a(), opt(c())),
        ),
    ));
    t.push(poly(
        "Option.composePartial",
        3,
        Type::func(
            pair(Type::func(b(), opt(c())), Type::func(a(), opt(b()))),
            Type::func(a(), opt(c())),
        ),
    ));

    // String
    t.push(mono("String.maxSize", Type::INT));
    t.push(mono("String.size", Type::func(Type::STRING, Type::INT)));
    t.push(mono(
        "String.sub",
        Type::func(pair(Type::STRING, Type::INT), Type::CHAR),
    ));
    t.push(mono(
        "String.substring",
        Type::func(
            Type::Tuple(vec![Type::STRING, Type::INT, Type::INT]),
            Type::STRING,
        ),
    ));
    t.push(mono(
        "String.extract",
        Type::func(
            Type::Tuple(vec![Type::STRING, Type::INT, opt(Type::INT)]),
            Type::STRING,
        ),
    ));
    t.push(mono(
        "String.concat",
        Type::func(Type::list(Type::STRING), Type::STRING),
    ));
    t.push(mono(
        "String.concatWith",
        func2(Type::STRING, Type::list(Type::STRING), Type::STRING),
    ));
    t.push(mono("String.str", Type::func(Type::CHAR, Type::STRING)));
    t.push(mono(
        "String.implode",
        Type::func(Type::list(Type::CHAR), Type::STRING),
    ));
    t.push(mono(
        "String.explode",
        Type::func(Type::STRING, Type::list(Type::CHAR)),
    ));
    t.push(mono(
        "String.map",
        func2(Type::func(Type::CHAR, Type::CHAR), Type::STRING, Type::STRING),
    ));
    t.push(mono(
        "String.translate",
        func2(
            Type::func(Type::CHAR, Type::STRING),
            Type::STRING,
            Type::STRING,
        ),
    ));
    t.push(mono(
        "String.isPrefix",
        func2(Type::STRING, Type::STRING, Type::BOOL),
    ));
    t.push(mono(
        "String.isSuffix",
        func2(Type::STRING, Type::STRING, Type::BOOL),
    ));
    t.push(mono(
        "String.isSubstring",
        func2(Type::STRING, Type::STRING, Type::BOOL),
    ));

    // Char
    t.push(mono("Char.chr", Type::func(Type::INT, Type::CHAR)));
    t.push(mono("Char.ord", Type::func(Type::CHAR, Type::INT)));
    t.push(mono("Char.minChar", Type::CHAR));
    t.push(mono("Char.maxChar", Type::CHAR));
    t.push(mono("Char.succ", Type::func(Type::CHAR, Type::CHAR)));
    t.push(mono("Char.pred", Type::func(Type::CHAR, Type::CHAR)));
    for name in [
        "Char.isDigit",
        "Char.isAlpha",
        "Char.isAlphaNum",
        "Char.isSpace",
        "Char.isLower",
        "Char.isUpper",
    ] {
        t.push(mono(name, Type::func(Type::CHAR, Type::BOOL)));
    }
    t.push(mono("Char.toLower", Type::func(Type::CHAR, Type::CHAR)));
    t.push(mono("Char.toUpper", Type::func(Type::CHAR, Type::CHAR)));
    t.push(mono(
        "Char.contains",
        func2(Type::STRING, Type::CHAR, Type::BOOL),
    ));
    t.push(mono(
        "Char.notContains",
        func2(Type::STRING, Type::CHAR, Type::BOOL),
    ));

    // Math
    for name in [
        "Math.acos",
        "Math.asin",
        "Math.atan",
        "Math.cos",
        "Math.cosh",
        "Math.exp",
        "Math.ln",
        "Math.log10",
        "Math.sin",
        "Math.sinh",
        "Math.sqrt",
        "Math.tan",
        "Math.tanh",
    ] {
        t.push(mono(name, Type::func(Type::REAL, Type::REAL)));
    }
    t.push(mono(
        "Math.atan2",
        Type::func(pair(Type::REAL, Type::REAL), Type::REAL),
    ));
    t.push(mono(
        "Math.pow",
        Type::func(pair(Type::REAL, Type::REAL), Type::REAL),
    ));
    t.push(mono("Math.e", Type::REAL));
    t.push(mono("Math.pi", Type::REAL));

    // Real
    t.push(mono("Real.abs", Type::func(Type::REAL, Type::REAL)));
    t.push(mono("Real.ceil", Type::func(Type::REAL, Type::INT)));
    t.push(mono("Real.floor", Type::func(Type::REAL, Type::INT)));
    t.push(mono("Real.round", Type::func(Type::REAL, Type::INT)));
    t.push(mono("Real.trunc", Type::func(Type::REAL, Type::INT)));
    t.push(mono("Real.fromInt", Type::func(Type::INT, Type::REAL)));
    t.push(mono("Real.toString", Type::func(Type::REAL, Type::STRING)));
    t.push(mono(
        "Real.compare",
        Type::func(pair(Type::REAL, Type::REAL), order()),
    ));
    t.push(mono(
        "Real.min",
        Type::func(pair(Type::REAL, Type::REAL), Type::REAL),
    ));
    t.push(mono(
        "Real.max",
        Type::func(pair(Type::REAL, Type::REAL), Type::REAL),
    ));

    // Int
    t.push(mono("Int.abs", Type::func(Type::INT, Type::INT)));
    t.push(mono(
        "Int.compare",
        Type::func(pair(Type::INT, Type::INT), order()),
    ));
    t.push(mono(
        "Int.div",
        Type::func(pair(Type::INT, Type::INT), Type::INT),
    ));
    t.push(mono(
        "Int.mod",
        Type::func(pair(Type::INT, Type::INT), Type::INT),
    ));
    t.push(mono(
        "Int.rem",
        Type::func(pair(Type::INT, Type::INT), Type::INT),
    ));
    t.push(mono(
        "Int.max",
        Type::func(pair(Type::INT, Type::INT), Type::INT),
    ));
    t.push(mono(
        "Int.min",
        Type::func(pair(Type::INT, Type::INT), Type::INT),
    ));
    t.push(mono(
        "Int.sameSign",
        Type::func(pair(Type::INT, Type::INT), Type::BOOL),
    ));
    t.push(mono("Int.sign", Type::func(Type::INT, Type::INT)));
    t.push(mono("Int.toString", Type::func(Type::INT, Type::STRING)));

    // Vector
    t.push(poly("Vector.fromList", 1, Type::func(Type::list(a()), vector(a()))));
    t.push(poly(
        "Vector.tabulate",
        1,
        Type::func(pair(Type::INT, Type::func(Type::INT, a())), vector(a())),
    ));
    t.push(poly("Vector.length", 1, Type::func(vector(a()), Type::INT)));
    t.push(poly(
        "Vector.sub",
        1,
        Type::func(pair(vector(a()), Type::INT), a()),
    ));
    t.push(poly(
        "Vector.concat",
        1,
        Type::func(Type::list(vector(a())), vector(a())),
    ));
    t.push(poly(
        "Vector.app",
        1,
        func2(Type::func(a(), Type::UNIT), vector(a()), Type::UNIT),
    ));
    t.push(poly(
        "Vector.map",
        2,
        func2(Type::func(a(), b()), vector(a()), vector(b())),
    ));
    t.push(poly(
        "Vector.foldl",
        2,
        Type::func(
            Type::func(pair(a(), b()), b()),
            func2(b(), vector(a()), b()),
        ),
    ));
    t.push(poly(
        "Vector.foldr",
        2,
        Type::func(
            Type::func(pair(a(), b()), b()),
            func2(b(), vector(a()), b()),
        ),
    ));
    t.push(poly(
        "Vector.all",
        1,
        func2(Type::func(a(), Type::BOOL), vector(a()), Type::BOOL),
    ));
    t.push(poly(
        "Vector.exists",
        1,
        func2(Type::func(a(), Type::BOOL), vector(a()), Type::BOOL),
    ));
    t.push(poly(
        "Vector.find",
        1,
        func2(Type::func(a(), Type::BOOL), vector(a()), opt(a())),
    ));
    t.push(poly(
        "Vector.collate",
        1,
        func2(
            Type::func(pair(a(), a()), order()),
            pair(vector(a()), vector(a())),
            order(),
        ),
    ));

    // Bag
    t.push(poly("Bag.fromList", 1, Type::func(Type::list(a()), bag(a()))));
    t.push(poly("Bag.toList", 1, Type::func(bag(a()), Type::list(a()))));
    t.push(poly("Bag.null", 1, Type::func(bag(a()), Type::BOOL)));
    t.push(poly("Bag.length", 1, Type::func(bag(a()), Type::INT)));
    t.push(poly(
        "Bag.app",
        1,
        func2(Type::func(a(), Type::UNIT), bag(a()), Type::UNIT),
    ));
    t.push(poly(
        "Bag.map",
        2,
        func2(Type::func(a(), b()), bag(a()), bag(b())),
    ));
    t.push(poly(
        "Bag.filter",
        1,
        func2(Type::func(a(), Type::BOOL), bag(a()), bag(a())),
    ));
    t.push(poly(
        "Bag.fold",
        2,
        Type::func(Type::func(pair(a(), b()), b()), func2(b(), bag(a()), b())),
    ));

    // Relational, with its top-level aliases
    for name in ["Relational.count", "count"] {
        t.push(poly(name, 1, Type::func(Type::list(a()), Type::INT)));
    }
    for name in ["Relational.exists", "exists"] {
        t.push(poly(name, 1, Type::func(Type::list(a()), Type::BOOL)));
    }
    for name in ["Relational.notExists", "notExists"] {
        t.push(poly(name, 1, Type::func(Type::list(a()), Type::BOOL)));
    }
    for name in ["Relational.empty", "empty"] {
        t.push(poly(name, 1, Type::func(Type::list(a()), Type::BOOL)));
    }
    for name in ["Relational.sum", "sum"] {
        t.push(mono(name, Type::func(Type::list(Type::INT), Type::INT)));
    }
    for name in ["Relational.max", "max", "Relational.min", "min"] {
        t.push(poly(name, 1, Type::func(Type::list(a()), a())));
    }
    for name in ["Relational.only", "only"] {
        t.push(poly(name, 1, Type::func(Type::list(a()), a())));
    }
    for name in ["Relational.onlyOrNone", "onlyOrNone"] {
        t.push(poly(name, 1, Type::func(Type::list(a()), opt(a()))));
    }
    t.push(poly(
        "map",
        2,
        func2(Type::func(a(), b()), Type::list(a()), Type::list(b())),
    ));

    // Sys
    t.push(mono(
        "Sys.env",
        Type::func(Type::UNIT, Type::list(pair(Type::STRING, Type::STRING))),
    ));
    t.push(poly(
        "Sys.set",
        1,
        Type::func(pair(Type::STRING, a()), Type::UNIT),
    ));
    t.push(mono("Sys.show", Type::func(Type::STRING, opt(Type::STRING))));
    t.push(mono("Sys.unset", Type::func(Type::STRING, Type::UNIT)));
    t.push(mono(
        "Sys.showAll",
        Type::func(Type::UNIT, Type::list(pair(Type::STRING, Type::STRING))),
    ));

    t
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_has_no_duplicate_names() {
        let table = built_ins();
        let mut names: Vec<&str> = table.iter().map(|b| b.name).collect();
        names.sort_unstable();
        let before = names.len();
        names.dedup();
        assert_eq!(before, names.len());
    }

    #[test]
    fn map_scheme_prints_as_expected() {
        let table = built_ins();
        let map = table.iter().find(|b| b.name == "List.map").unwrap();
        assert_eq!(map.scheme.to_string(), "('a -> 'b) -> 'a list -> 'b list");
    }
}
