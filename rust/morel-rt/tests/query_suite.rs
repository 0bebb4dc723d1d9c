use morel_rt::Session;

fn eval(session: &mut Session, source: &str) -> String {
    let result = session.eval_statement(source).expect("statement failed");
    result.bindings[0].format(session.props())
}

fn session_with_emps() -> Session {
    let mut session = Session::new();
    eval(
        &mut session,
        "val emps = [{id = 100, name = \"Fred\", deptno = 10}, \
         {id = 101, name = \"Velma\", deptno = 20}, \
         {id = 102, name = \"Shaggy\", deptno = 30}, \
         {id = 103, name = \"Scooby\", deptno = 30}]",
    );
    session
}

#[test]
fn where_and_yield() {
    let mut session = session_with_emps();
    assert_eq!(
        eval(
            &mut session,
            "from emps as e where #deptno e = 30 yield #id e"
        ),
        "val it = [102,103] : int list"
    );
}

#[test]
fn single_source_defaults_to_element() {
    let mut session = Session::new();
    assert_eq!(
        eval(&mut session, "from [1, 2, 3] as i"),
        "val it = [1,2,3] : int list"
    );
    assert_eq!(
        eval(&mut session, "from [1, 2, 3, 4] as i where i mod 2 = 0"),
        "val it = [2,4] : int list"
    );
}

#[test]
fn cartesian_product_in_source_order() {
    let mut session = Session::new();
    assert_eq!(
        eval(
            &mut session,
            "from [1, 2] as i, [\"a\", \"b\"] as s yield (i, s)"
        ),
        "val it = [(1,\"a\"),(1,\"b\"),(2,\"a\"),(2,\"b\")] : (int * string) list"
    );
    // The default row is the record of all bindings, labels sorted.
    assert_eq!(
        eval(&mut session, "from [1] as i, [true] as b"),
        "val it = [{b=true,i=1}] : {b:bool, i:int} list"
    );
}

#[test]
fn later_sources_see_earlier_bindings() {
    let mut session = Session::new();
    assert_eq!(
        eval(
            &mut session,
            "from [[1, 2], [3]] as row, row as x yield x"
        ),
        "val it = [1,2,3] : int list"
    );
}

#[test]
fn yield_records() {
    let mut session = session_with_emps();
    assert_eq!(
        eval(
            &mut session,
            "from emps as e where #deptno e = 10 yield {n = #name e, d = #deptno e}"
        ),
        "val it = [{d=10,n=\"Fred\"}] : {d:int, n:string} list"
    );
}

#[test]
fn group_and_compute() {
    let mut session = session_with_emps();
    assert_eq!(
        eval(
            &mut session,
            "from emps as e group #deptno e as deptno compute count of e as c"
        ),
        "val it = [{c=1,deptno=10},{c=1,deptno=20},{c=2,deptno=30}] : {c:int, deptno:int} list"
    );
    assert_eq!(
        eval(
            &mut session,
            "from emps as e group #deptno e as deptno compute count of e as c \
             yield {deptno = deptno, size = c}"
        ),
        "val it = [{deptno=10,size=1},{deptno=20,size=1},{deptno=30,size=2}] \
         : {deptno:int, size:int} list"
    );
}

#[test]
fn group_sum() {
    let mut session = Session::new();
    eval(
        &mut session,
        "val sales = [{dept = 1, amount = 10}, {dept = 2, amount = 20}, \
         {dept = 1, amount = 5}]",
    );
    assert_eq!(
        eval(
            &mut session,
            "from sales as s group #dept s as dept compute sum of #amount s as total"
        ),
        "val it = [{dept=1,total=15},{dept=2,total=25}] : {dept:int, total:int} list"
    );
}

#[test]
fn single_group_key_defaults_to_key() {
    let mut session = session_with_emps();
    assert_eq!(
        eval(&mut session, "from emps as e group #deptno e as deptno"),
        "val it = [10,20,30] : int list"
    );
}

#[test]
fn queries_nest_in_expressions() {
    let mut session = session_with_emps();
    assert_eq!(
        eval(
            &mut session,
            "sum (from emps as e where #deptno e = 30 yield #id e)"
        ),
        "val it = 205 : int"
    );
    assert_eq!(
        eval(
            &mut session,
            "List.length (from emps as e where #deptno e > 10)"
        ),
        "val it = 3 : int"
    );
}

#[test]
fn empty_source_yields_empty() {
    let mut session = Session::new();
    assert_eq!(
        eval(&mut session, "from [] as x yield (1, x)"),
        "val it = [] : (int * 'a) list"
    );
}
