//! Shared helpers for the integration tests
//!
//! The parser lives outside this crate, so test programs are built directly
//! as untyped trees with the small constructors below and then pushed
//! through elaboration and code generation.

#![allow(dead_code)]

use cinder::ast::*;
use cinder::lexing::{NumSuffix, NumberLiteral};
use cinder::Span;

pub fn expr(kind: ExpressionKind<NoContext>) -> UntypedExpression {
    Expression {
        kind,
        span: Span::marker(0),
        typ: NoContext,
    }
}

pub fn num(text: &str, suffix: Option<NumSuffix>) -> UntypedExpression {
    expr(ExpressionKind::Number(NumberLiteral {
        text: String::from(text),
        base: 10,
        has_dot: text.contains('.'),
        suffix,
    }))
}

pub fn int(text: &str) -> UntypedExpression {
    num(text, Some(NumSuffix::I))
}

pub fn var(name: &str) -> UntypedExpression {
    expr(ExpressionKind::Var(String::from(name)))
}

pub fn binary(op: BinOp, lhs: UntypedExpression, rhs: UntypedExpression) -> UntypedExpression {
    expr(ExpressionKind::Binary {
        op,
        lhs: Box::new(lhs),
        rhs: Box::new(rhs),
    })
}

pub fn call(name: &str, args: Vec<UntypedExpression>) -> UntypedExpression {
    expr(ExpressionKind::Call {
        callee: Box::new(var(name)),
        args,
    })
}

pub fn block(exprs: Vec<UntypedExpression>) -> UntypedExpression {
    expr(ExpressionKind::Block(exprs))
}

pub fn let_local(name: &str, annotation: Option<TypeExpr>, init: UntypedExpression) -> UntypedExpression {
    expr(ExpressionKind::Let(Let {
        name: String::from(name),
        annotation,
        init: Some(Box::new(init)),
        constant: false,
        name_span: Span::marker(0),
        typ: NoContext,
    }))
}

pub fn named(name: &str) -> TypeExpr {
    TypeExpr::Named(String::from(name))
}

pub fn pointer(inner: TypeExpr) -> TypeExpr {
    TypeExpr::Pointer(Box::new(inner))
}

pub fn param(name: &str, annotation: TypeExpr) -> Param<NoContext> {
    Param {
        name: String::from(name),
        annotation,
        typ: NoContext,
    }
}

pub fn prototype(name: &str, params: Vec<Param<NoContext>>, ret: Option<TypeExpr>) -> Prototype<NoContext> {
    Prototype {
        name: String::from(name),
        receiver: None,
        params,
        ret,
        variadic: false,
        name_span: Span::marker(0),
        typ: NoContext,
    }
}

pub fn function(
    name: &str,
    params: Vec<Param<NoContext>>,
    ret: Option<TypeExpr>,
    body: UntypedExpression,
) -> TopLevel<NoContext> {
    TopLevel::Function(FunctionDef {
        prototype: prototype(name, params, ret),
        body,
    })
}

pub fn program(top_levels: Vec<TopLevel<NoContext>>) -> UntypedProgram {
    Program { top_levels }
}

/// Elaborate, compile, verify, and hand back the printed IR
pub fn compile_to_ir(program: UntypedProgram) -> String {
    let program = cinder::elaborate(program).unwrap();

    let context = inkwell::context::Context::create();
    let module = cinder::compile(&context, program).unwrap();
    module.verify().unwrap();
    module.print_to_string().to_string()
}
