mod common;
use common::*;

use cinder::ast::*;
use cinder::lexing::StrKind;
use cinder::Span;

#[test]
fn integer_promotion_narrows_on_store() {
    // let r: i32 = a + b with a: i32, b: i64 -- the narrow side widens
    // signed, the sum is i64, and the store truncates
    let sum = binary(BinOp::Add, var("a"), var("b"));
    let body = block(vec![
        let_local("r", Some(named("i32")), sum),
        var("r"),
    ]);
    let widen = function(
        "widen",
        vec![param("a", named("i32")), param("b", named("i64"))],
        Some(named("i32")),
        body,
    );
    let ir = compile_to_ir(program(vec![widen]));

    assert!(ir.contains("sext i32"));
    assert!(ir.contains("add i64"));
    assert!(ir.contains("trunc"));
}

#[test]
fn if_merges_with_a_phi() {
    let conditional = expr(ExpressionKind::If {
        condition: Box::new(expr(ExpressionKind::Bool(true))),
        then_branch: Box::new(int("1")),
        else_branch: Some(Box::new(int("2"))),
    });
    let ir = compile_to_ir(program(vec![function("main", vec![], Some(named("i32")), conditional)]));

    assert!(ir.contains("phi i32"));
}

#[test]
fn while_loop_reevaluates_the_condition() {
    let body = block(vec![
        let_local("x", None, int("10")),
        expr(ExpressionKind::While {
            condition: Box::new(binary(BinOp::Greater, var("x"), int("0"))),
            body: Box::new(binary(BinOp::Assign, var("x"), binary(BinOp::Sub, var("x"), int("1")))),
            else_branch: None,
        }),
        var("x"),
    ]);
    let ir = compile_to_ir(program(vec![function("main", vec![], Some(named("i32")), body)]));

    assert!(ir.contains("phi i32"));
    // the loop shape: one conditional branch in, one at the end of the body
    assert_eq!(ir.matches("br i1").count(), 2);
}

#[test]
fn pointer_arithmetic_is_a_gep() {
    // p + n and p - n; subtraction negates the index first
    let add = function(
        "offset",
        vec![param("p", pointer(named("i32"))), param("n", named("i32"))],
        Some(pointer(named("i32"))),
        binary(BinOp::Add, var("p"), var("n")),
    );
    let sub = function(
        "back",
        vec![param("q", pointer(named("i32"))), param("m", named("i32"))],
        Some(pointer(named("i32"))),
        binary(BinOp::Sub, var("q"), var("m")),
    );
    let ir = compile_to_ir(program(vec![add, sub]));

    assert_eq!(ir.matches("getelementptr").count(), 2);
    assert!(ir.contains("sub i32 0, %m"));
}

#[test]
fn c_string_decays_to_a_byte_pointer() {
    let hi = expr(ExpressionKind::String {
        value: b"hi".to_vec(),
        kind: StrKind::CStr,
    });
    let ir = compile_to_ir(program(vec![function("greeting", vec![], Some(pointer(named("u8"))), hi)]));

    assert!(ir.contains("private constant [3 x i8] c\"hi\\00\""));
}

#[test]
fn char_array_string_decays_through_its_storage() {
    // the default string flavor is addressable, so `as *u8` may decay it
    let hi = expr(ExpressionKind::String {
        value: b"hi".to_vec(),
        kind: StrKind::CharArray,
    });
    let decayed = expr(ExpressionKind::Cast {
        target: pointer(named("u8")),
        inner: Box::new(hi),
    });
    let ir = compile_to_ir(program(vec![function("greeting", vec![], Some(pointer(named("u8"))), decayed)]));

    assert!(ir.contains("c\"hi\\00\""));
}

#[test]
fn mutual_recursion_in_either_order() {
    // even() is defined before odd() but calls it
    let even = function(
        "even",
        vec![param("n", named("i32"))],
        Some(named("bool")),
        expr(ExpressionKind::If {
            condition: Box::new(binary(BinOp::Equals, var("n"), int("0"))),
            then_branch: Box::new(expr(ExpressionKind::Bool(true))),
            else_branch: Some(Box::new(call(
                "odd",
                vec![binary(BinOp::Sub, var("n"), int("1"))],
            ))),
        }),
    );
    let odd = function(
        "odd",
        vec![param("n", named("i32"))],
        Some(named("bool")),
        expr(ExpressionKind::If {
            condition: Box::new(binary(BinOp::Equals, var("n"), int("0"))),
            then_branch: Box::new(expr(ExpressionKind::Bool(false))),
            else_branch: Some(Box::new(call(
                "even",
                vec![binary(BinOp::Sub, var("n"), int("1"))],
            ))),
        }),
    );
    let ir = compile_to_ir(program(vec![even, odd]));

    assert!(ir.contains("define i1 @even"));
    assert!(ir.contains("define i1 @odd"));
}

#[test]
fn globals_get_initializers() {
    let global = TopLevel::Global(Let {
        name: String::from("answer"),
        annotation: None,
        init: Some(Box::new(int("42"))),
        constant: false,
        name_span: Span::marker(0),
        typ: NoContext,
    });
    let read = function("read", vec![], Some(named("i32")), var("answer"));
    let ir = compile_to_ir(program(vec![global, read]));

    assert!(ir.contains("@answer = global i32 42"));
}

#[test]
fn structs_methods_and_field_access() {
    let vec2 = TopLevel::Struct(StructDef {
        name: String::from("Vec2"),
        fields: vec![
            (String::from("x"), named("i32")),
            (String::from("y"), named("i32")),
        ],
        name_span: Span::marker(0),
    });

    // fun (this: *Vec2) sum() -> i32 = this.x + this.y
    let sum = TopLevel::Function(FunctionDef {
        prototype: Prototype {
            name: String::from("sum"),
            receiver: Some(pointer(named("Vec2"))),
            params: vec![],
            ret: Some(named("i32")),
            variadic: false,
            name_span: Span::marker(0),
            typ: NoContext,
        },
        body: binary(
            BinOp::Add,
            expr(ExpressionKind::Field {
                value: Box::new(var("this")),
                field: String::from("x"),
            }),
            expr(ExpressionKind::Field {
                value: Box::new(var("this")),
                field: String::from("y"),
            }),
        ),
    });

    // new Vec2 { x = 1, y = 2 } .sum()
    let make = expr(ExpressionKind::New {
        struct_name: String::from("Vec2"),
        fields: vec![
            (String::from("x"), int("1")),
            (String::from("y"), int("2")),
        ],
    });
    let use_it = function(
        "main",
        vec![],
        Some(named("i32")),
        expr(ExpressionKind::MethodCall {
            receiver: Box::new(make),
            method: String::from("sum"),
            args: vec![],
        }),
    );

    let ir = compile_to_ir(program(vec![vec2, sum, use_it]));

    assert!(ir.contains("%Vec2 = type { i32, i32 }"));
    // the method lands under its receiver-qualified key
    assert!(ir.contains("@\"(*Vec2)::sum\""));
    assert!(ir.contains("alloca %Vec2"));
}

#[test]
fn variadic_declare_and_call() {
    let printf = TopLevel::Declare(Declaration::Function(Prototype {
        name: String::from("printf"),
        receiver: None,
        params: vec![param("format", pointer(named("u8")))],
        ret: Some(named("i32")),
        variadic: true,
        name_span: Span::marker(0),
        typ: NoContext,
    }));
    let hi = expr(ExpressionKind::String {
        value: b"%d\n".to_vec(),
        kind: StrKind::CStr,
    });
    let main = function(
        "main",
        vec![],
        Some(named("i32")),
        call("printf", vec![hi, int("42")]),
    );
    let ir = compile_to_ir(program(vec![printf, main]));

    assert!(ir.contains("declare i32 @printf(ptr, ...)"));
}

#[test]
fn tuple_index_and_tuple_to_array_cast() {
    let tuple = TypeExpr::Tuple(vec![named("i32"), named("i32")]);

    let first = function(
        "first",
        vec![param("t", tuple.clone())],
        Some(named("i32")),
        expr(ExpressionKind::Index {
            value: Box::new(var("t")),
            index: Box::new(num("0", None)),
        }),
    );
    let as_array = function(
        "as_array",
        vec![param("u", tuple)],
        Some(TypeExpr::Array {
            elem: Box::new(named("i32")),
            count: 2,
        }),
        expr(ExpressionKind::Cast {
            target: TypeExpr::Array {
                elem: Box::new(named("i32")),
                count: 2,
            },
            inner: Box::new(var("u")),
        }),
    );
    let ir = compile_to_ir(program(vec![first, as_array]));

    assert!(ir.contains("extractvalue"));
    assert!(ir.contains("insertvalue"));
}

#[test]
fn assignment_stores_through_the_slot() {
    let body = block(vec![
        let_local("x", None, int("1")),
        binary(BinOp::Assign, var("x"), int("2")),
        var("x"),
    ]);
    let ir = compile_to_ir(program(vec![function("main", vec![], Some(named("i32")), body)]));

    assert!(ir.contains("alloca i32"));
    assert_eq!(ir.matches("store i32").count(), 2);
}

#[test]
fn deref_and_address_of() {
    // fun peek(p: *i32) -> i32 = *p
    let peek = function(
        "peek",
        vec![param("p", pointer(named("i32")))],
        Some(named("i32")),
        expr(ExpressionKind::Unary {
            op: UnaOp::Deref,
            inner: Box::new(var("p")),
        }),
    );
    // fun poke() -> i32 = { let x = 1i; let p = &x; *p }
    let poke = function(
        "poke",
        vec![],
        Some(named("i32")),
        block(vec![
            let_local("x", None, int("1")),
            let_local(
                "p",
                None,
                expr(ExpressionKind::Unary {
                    op: UnaOp::AddrOf,
                    inner: Box::new(var("x")),
                }),
            ),
            expr(ExpressionKind::Unary {
                op: UnaOp::Deref,
                inner: Box::new(var("p")),
            }),
        ]),
    );
    let ir = compile_to_ir(program(vec![peek, poke]));

    assert!(ir.contains("define i32 @peek"));
    assert!(ir.contains("load i32"));
}
