mod common;
use common::*;

use cinder::ast::*;
use cinder::Span;

#[test]
#[should_panic]
fn fail_mismatched_branches() {
    let conditional = expr(ExpressionKind::If {
        condition: Box::new(expr(ExpressionKind::Bool(true))),
        then_branch: Box::new(int("1")),
        else_branch: Some(Box::new(num("2", Some(cinder::lexing::NumSuffix::L)))),
    });
    compile_to_ir(program(vec![function("main", vec![], None, conditional)]));
}

#[test]
#[should_panic]
fn fail_unknown_name() {
    compile_to_ir(program(vec![function("main", vec![], None, var("nope"))]));
}

#[test]
#[should_panic]
fn fail_function_redefinition() {
    compile_to_ir(program(vec![
        function("twice", vec![], Some(named("i32")), int("1")),
        function("twice", vec![], Some(named("i32")), int("2")),
    ]));
}

#[test]
#[should_panic]
fn fail_non_constant_global_initializer() {
    let global = TopLevel::Global(Let {
        name: String::from("bad"),
        annotation: None,
        init: Some(Box::new(binary(BinOp::Add, int("1"), int("2")))),
        constant: false,
        name_span: Span::marker(0),
        typ: NoContext,
    });
    compile_to_ir(program(vec![global]));
}

#[test]
#[should_panic]
fn fail_const_array_decay() {
    // a by-value array parameter has no storage, so it cannot decay
    let decay = expr(ExpressionKind::Cast {
        target: pointer(named("u8")),
        inner: Box::new(var("a")),
    });
    let array = TypeExpr::Array {
        elem: Box::new(named("u8")),
        count: 2,
    };
    compile_to_ir(program(vec![function(
        "main",
        vec![param("a", array)],
        Some(pointer(named("u8"))),
        decay,
    )]));
}

#[test]
#[should_panic]
fn fail_assign_to_unaddressable() {
    // 1 = 2 has no slot to store into
    compile_to_ir(program(vec![function(
        "main",
        vec![],
        None,
        binary(BinOp::Assign, int("1"), int("2")),
    )]));
}
