//! Elaboration
//!
//! This module turns the parser's untyped tree into a typed AST: every
//! expression gets its statically computed [Type], surface annotations are
//! resolved, and extension methods are desugared into calls of their
//! receiver-qualified free function. The main interface is the [elaborate]
//! function.
//!
//! Elaboration runs in two phases over the module. First every top-level is
//! *registered*: structs and type aliases land in the user-type table,
//! prototypes and annotated globals land in the variable-type table. Then
//! every function body is elaborated. Because registration runs first,
//! mutually recursive functions work in either source order, as long as
//! their return types are declared.
//!
//! The two name tables are flat and are never cleared between functions.

use std::collections::{HashMap, HashSet};

use miette::Diagnostic;
use thiserror::Error;

use crate::ast::*;
use crate::lexing::{NumSuffix, NumberLiteral, StrKind};
use crate::types::extension_name;
use crate::{Span, Type};

#[derive(Debug, Error, Diagnostic)]
pub enum ElaborateError {
    #[error("The name `{name}` is not bound")]
    UnknownName {
        name: String,

        #[label("unknown name")]
        span: Span,
    },

    #[error("The type name `{name}` is not known")]
    UnknownTypeName {
        name: String,

        #[label("here")]
        span: Span,
    },

    #[error("There are multiple type definitions with the name `{name}`")]
    DuplicateTypeDefinition {
        name: String,

        #[label("second definition")]
        span: Span,
    },

    #[error("Multiple fields in one struct are called `{field}`")]
    DuplicateFieldName {
        field: String,

        #[label("in this definition")]
        span: Span,
    },

    #[error("The variable `{name}` has neither a type nor a value")]
    UntypedValuelessLet {
        name: String,

        #[label("here")]
        span: Span,
    },

    #[error("The constant `{name}` needs an initialization value")]
    ConstantWithoutValue {
        name: String,

        #[label("here")]
        span: Span,
    },

    #[error("`{suffix}` typed literals cannot contain a `.`")]
    DottedIntegerLiteral {
        suffix: NumSuffix,

        #[label("this literal")]
        span: Span,
    },

    #[error("The operator `{op}` cannot be applied to `{lhs}` and `{rhs}`")]
    IncompatibleOperands {
        op: BinOp,
        lhs: Type,
        rhs: Type,

        #[label("here")]
        span: Span,
    },

    #[error("The operator `{op}` expects a number but got `{typ}`")]
    NonNumericOperand {
        op: UnaOp,
        typ: Type,

        #[label("here")]
        span: Span,
    },

    #[error("A condition must be a number but this one is `{typ}`")]
    NonNumericCondition {
        typ: Type,

        #[label("this condition")]
        span: Span,
    },

    #[error("The two branches have different types: `{then_type}` and `{else_type}`")]
    MismatchedBranches {
        then_type: Type,
        else_type: Type,

        #[label("in this conditional")]
        span: Span,
    },

    #[error("A value of type `{typ}` cannot be called")]
    NotAFunction {
        typ: Type,

        #[label("this call")]
        span: Span,
    },

    #[error("Expected {expected} arguments but got {actual}")]
    WrongNumberOfArguments {
        expected: usize,
        actual: usize,

        #[label("this call")]
        span: Span,
    },

    #[error("No method `{method}` is known for receivers of type `{receiver}`")]
    #[diagnostic(help("The method would have to be registered as `({receiver})::{method}`"))]
    MethodNotFound {
        method: String,
        receiver: Type,

        #[label("this method call")]
        span: Span,
    },

    #[error("Tried to access field `{field}` but the expression is of type `{typ}`")]
    FieldNotFound {
        field: String,
        typ: Type,

        #[label("here")]
        span: Span,
    },

    #[error("A value of type `{typ}` cannot be indexed")]
    #[diagnostic(help("Only pointers and tuples can be indexed"))]
    NotIndexable {
        typ: Type,

        #[label("here")]
        span: Span,
    },

    #[error("An index must be an integer but this one is `{typ}`")]
    NonIntegerIndex {
        typ: Type,

        #[label("this index")]
        span: Span,
    },

    #[error("A tuple index must be an integer literal")]
    TupleIndexNotLiteral {
        #[label("this index")]
        span: Span,
    },

    #[error("Tuple index {index} is out of range for a tuple of {len} elements")]
    TupleIndexOutOfRange {
        index: usize,
        len: usize,

        #[label("this index")]
        span: Span,
    },

    #[error("`*` cannot be used on a value of type `{typ}`")]
    DerefNonPointer {
        typ: Type,

        #[label("here")]
        span: Span,
    },

    #[error("A block cannot be empty")]
    EmptyBlock {
        #[label("this block")]
        span: Span,
    },

    #[error("Cannot cast `{typ}` to `{target}`")]
    ImpossibleCast {
        typ: Type,
        target: Type,

        #[label("here")]
        span: Span,
    },

    #[error("`new` needs a struct type but `{name}` is not one")]
    NewOfNonStruct {
        name: String,

        #[label("here")]
        span: Span,
    },

    #[error("The declaration of `{name}` needs a return type")]
    UntypedDeclare {
        name: String,

        #[label("this declaration")]
        span: Span,
    },
}

type Result<T> = std::result::Result<T, ElaborateError>;

/// Resolve and store the types of all expressions
pub fn elaborate(program: UntypedProgram) -> Result<TypedProgram> {
    let mut elaborator = Elaborator::new();

    for top_level in &program.top_levels {
        elaborator.register_top_level(top_level)?;
    }

    let mut top_levels = Vec::with_capacity(program.top_levels.len());
    for top_level in program.top_levels {
        top_levels.push(elaborator.elaborate_top_level(top_level)?);
    }

    Ok(Program { top_levels })
}

/// A prototype's resolved signature, before the return type is settled
struct Signature {
    name: String,
    receiver: Option<Type>,
    params: Vec<Type>,
    ret: Option<Type>,
}

/// The main state during elaboration
///
/// Two flat tables: names to the types of their values, and names to
/// user-defined types. Both are only ever added to.
pub struct Elaborator {
    variable_types: HashMap<String, Type>,
    user_types: HashMap<String, Type>,
}

impl Elaborator {
    fn new() -> Self {
        Self {
            variable_types: HashMap::new(),
            user_types: HashMap::new(),
        }
    }

    /// Phase one: make the top-level's names visible
    fn register_top_level(&mut self, top_level: &TopLevel<NoContext>) -> Result<()> {
        match top_level {
            TopLevel::Function(def) => {
                self.signature(&def.prototype)?;
            }
            TopLevel::Declare(Declaration::Function(proto)) => {
                self.signature(proto)?;
            }
            TopLevel::Declare(Declaration::Variable { name, annotation, name_span, .. }) => {
                let typ = self.resolve_type(annotation, *name_span)?;
                self.variable_types.insert(name.clone(), typ);
            }
            TopLevel::Global(let_) => {
                if let Some(annotation) = &let_.annotation {
                    let typ = self.resolve_type(annotation, let_.name_span)?;
                    self.variable_types.insert(let_.name.clone(), typ);
                }
            }
            TopLevel::Struct(def) => {
                self.register_struct(def)?;
            }
            TopLevel::TypeAlias(def) => {
                if self.user_types.contains_key(&def.name) {
                    return Err(ElaborateError::DuplicateTypeDefinition {
                        name: def.name.clone(),
                        span: def.name_span,
                    });
                }
                let target = self.resolve_type(&def.target, def.name_span)?;
                self.user_types.insert(def.name.clone(), target);
            }
        }
        Ok(())
    }

    fn register_struct(&mut self, def: &StructDef) -> Result<()> {
        if self.user_types.contains_key(&def.name) {
            return Err(ElaborateError::DuplicateTypeDefinition {
                name: def.name.clone(),
                span: def.name_span,
            });
        }

        let mut field_names = HashSet::new();
        let mut fields = Vec::with_capacity(def.fields.len());
        for (field_name, field_type) in &def.fields {
            if !field_names.insert(field_name) {
                return Err(ElaborateError::DuplicateFieldName {
                    field: field_name.clone(),
                    span: def.name_span,
                });
            }
            fields.push((field_name.clone(), self.resolve_type(field_type, def.name_span)?));
        }

        self.user_types.insert(
            def.name.clone(),
            Type::Struct {
                name: def.name.clone(),
                fields,
            },
        );
        Ok(())
    }

    /// Resolve a prototype's signature and register what can be registered
    ///
    /// Extension methods get their name rewritten to the receiver-qualified
    /// key and a trailing `this` parameter. Parameter types always become
    /// visible; the function type itself only when the return type is
    /// declared (otherwise it is registered after body inference).
    fn signature(&mut self, proto: &Prototype<NoContext>) -> Result<Signature> {
        let (name, receiver) = match &proto.receiver {
            Some(receiver) => {
                let receiver = self.resolve_type(receiver, proto.name_span)?;
                (extension_name(&receiver, &proto.name), Some(receiver))
            }
            None => (proto.name.clone(), None),
        };

        let mut params = Vec::with_capacity(proto.params.len() + 1);
        for param in &proto.params {
            let typ = self.resolve_type(&param.annotation, proto.name_span)?;
            self.variable_types.insert(param.name.clone(), typ.clone());
            params.push(typ);
        }
        if let Some(receiver) = &receiver {
            self.variable_types.insert(String::from("this"), receiver.clone());
            params.push(receiver.clone());
        }

        let ret = match &proto.ret {
            Some(ret) => Some(self.resolve_type(ret, proto.name_span)?),
            None => None,
        };

        if let Some(ret) = &ret {
            let typ = Type::Function {
                params: params.clone(),
                ret: Box::new(ret.clone()),
                variadic: proto.variadic,
            };
            self.variable_types.insert(name.clone(), typ);
        }

        Ok(Signature {
            name,
            receiver,
            params,
            ret,
        })
    }

    /// Build the typed prototype once the return type is known, and register
    /// the final function type
    fn finish_prototype(
        &mut self,
        proto: Prototype<NoContext>,
        signature: Signature,
        ret: Type,
    ) -> Prototype<Type> {
        let typ = Type::Function {
            params: signature.params.clone(),
            ret: Box::new(ret),
            variadic: proto.variadic,
        };
        self.variable_types.insert(signature.name.clone(), typ.clone());

        let mut params: Vec<Param<Type>> = proto
            .params
            .into_iter()
            .zip(signature.params)
            .map(|(param, typ)| Param {
                name: param.name,
                annotation: param.annotation,
                typ,
            })
            .collect();
        if let Some(receiver) = signature.receiver {
            params.push(Param {
                name: String::from("this"),
                annotation: proto.receiver.clone().unwrap_or(TypeExpr::Named(receiver.to_string())),
                typ: receiver,
            });
        }

        Prototype {
            name: signature.name,
            receiver: proto.receiver,
            params,
            ret: proto.ret,
            variadic: proto.variadic,
            name_span: proto.name_span,
            typ,
        }
    }

    /// Phase two: elaborate bodies and produce the typed top-level
    fn elaborate_top_level(&mut self, top_level: TopLevel<NoContext>) -> Result<TopLevel<Type>> {
        match top_level {
            TopLevel::Function(def) => {
                let signature = self.signature(&def.prototype)?;
                let body = self.elaborate_expression(def.body)?;

                let ret = match signature.ret.clone() {
                    Some(ret) => {
                        self.check_cast(&body.typ, &ret, body.span)?;
                        ret
                    }
                    None => body.typ.clone(),
                };

                let prototype = self.finish_prototype(def.prototype, signature, ret);
                Ok(TopLevel::Function(FunctionDef { prototype, body }))
            }

            TopLevel::Declare(Declaration::Function(proto)) => {
                let signature = self.signature(&proto)?;
                let ret = signature.ret.clone().ok_or(ElaborateError::UntypedDeclare {
                    name: proto.name.clone(),
                    span: proto.name_span,
                })?;
                let prototype = self.finish_prototype(proto, signature, ret);
                Ok(TopLevel::Declare(Declaration::Function(prototype)))
            }

            TopLevel::Declare(Declaration::Variable { name, annotation, name_span, .. }) => {
                let typ = self.resolve_type(&annotation, name_span)?;
                self.variable_types.insert(name.clone(), typ.clone());
                Ok(TopLevel::Declare(Declaration::Variable {
                    name,
                    annotation,
                    name_span,
                    typ,
                }))
            }

            TopLevel::Global(let_) => Ok(TopLevel::Global(self.elaborate_let(let_)?)),

            TopLevel::Struct(def) => Ok(TopLevel::Struct(def)),
            TopLevel::TypeAlias(def) => Ok(TopLevel::TypeAlias(def)),
        }
    }

    fn elaborate_let(&mut self, let_: Let<NoContext>) -> Result<Let<Type>> {
        let init = match let_.init {
            Some(init) => Some(Box::new(self.elaborate_expression(*init)?)),
            None => None,
        };

        let declared = match &let_.annotation {
            Some(annotation) => Some(self.resolve_type(annotation, let_.name_span)?),
            None => None,
        };

        if let_.constant && init.is_none() {
            return Err(ElaborateError::ConstantWithoutValue {
                name: let_.name,
                span: let_.name_span,
            });
        }

        let typ = match (declared, &init) {
            (Some(declared), Some(init)) => {
                self.check_cast(&init.typ, &declared, init.span)?;
                declared
            }
            (Some(declared), None) => declared,
            (None, Some(init)) => init.typ.clone(),
            (None, None) => {
                return Err(ElaborateError::UntypedValuelessLet {
                    name: let_.name,
                    span: let_.name_span,
                })
            }
        };

        self.variable_types.insert(let_.name.clone(), typ.clone());

        Ok(Let {
            name: let_.name,
            annotation: let_.annotation,
            init,
            constant: let_.constant,
            name_span: let_.name_span,
            typ,
        })
    }

    fn elaborate_expression(&mut self, expr: UntypedExpression) -> Result<TypedExpression> {
        let span = expr.span;
        match expr.kind {
            ExpressionKind::Number(literal) => {
                let typ = number_type(&literal, span)?;
                Ok(Expression {
                    kind: ExpressionKind::Number(literal),
                    span,
                    typ,
                })
            }

            ExpressionKind::Bool(b) => Ok(Expression {
                kind: ExpressionKind::Bool(b),
                span,
                typ: Type::BOOL,
            }),

            ExpressionKind::Char(c) => Ok(Expression {
                kind: ExpressionKind::Char(c),
                span,
                typ: Type::CHAR,
            }),

            ExpressionKind::String { value, kind } => {
                // the trailing null byte is part of the array
                let array = Type::Array {
                    elem: Box::new(Type::CHAR),
                    count: value.len() as u32 + 1,
                };
                let typ = match kind {
                    StrKind::CStr => Type::pointer_to(Type::CHAR),
                    StrKind::PtrCharArray => Type::pointer_to(array),
                    StrKind::CharArray => array,
                };
                Ok(Expression {
                    kind: ExpressionKind::String { value, kind },
                    span,
                    typ,
                })
            }

            ExpressionKind::Null => Ok(Expression {
                kind: ExpressionKind::Null,
                span,
                typ: Type::Null,
            }),

            ExpressionKind::Var(name) => {
                let typ = self.variable_types.get(&name).cloned().ok_or_else(|| {
                    ElaborateError::UnknownName {
                        name: name.clone(),
                        span,
                    }
                })?;
                Ok(Expression {
                    kind: ExpressionKind::Var(name),
                    span,
                    typ,
                })
            }

            ExpressionKind::Let(let_) => {
                let let_ = self.elaborate_let(let_)?;
                let typ = let_.typ.clone();
                Ok(Expression {
                    kind: ExpressionKind::Let(let_),
                    span,
                    typ,
                })
            }

            ExpressionKind::Cast { target, inner } => {
                let inner = self.elaborate_expression(*inner)?;
                let typ = self.resolve_type(&target, span)?;
                self.check_cast(&inner.typ, &typ, span)?;
                Ok(Expression {
                    kind: ExpressionKind::Cast {
                        target,
                        inner: Box::new(inner),
                    },
                    span,
                    typ,
                })
            }

            ExpressionKind::Binary { op, lhs, rhs } => {
                let lhs = self.elaborate_expression(*lhs)?;
                let rhs = self.elaborate_expression(*rhs)?;
                let typ = if op == BinOp::Assign {
                    self.check_cast(&rhs.typ, &lhs.typ, rhs.span)?;
                    rhs.typ.clone()
                } else {
                    binary_type(op, &lhs.typ, &rhs.typ, span)?
                };
                Ok(Expression {
                    kind: ExpressionKind::Binary {
                        op,
                        lhs: Box::new(lhs),
                        rhs: Box::new(rhs),
                    },
                    span,
                    typ,
                })
            }

            ExpressionKind::Unary { op, inner } => {
                let inner = self.elaborate_expression(*inner)?;
                let typ = match op {
                    UnaOp::Deref => match &inner.typ {
                        Type::Pointer(pointee) => (**pointee).clone(),
                        typ => {
                            return Err(ElaborateError::DerefNonPointer {
                                typ: typ.clone(),
                                span,
                            })
                        }
                    },
                    UnaOp::AddrOf => Type::pointer_to(inner.typ.clone()),
                    UnaOp::Not | UnaOp::Neg => {
                        if !inner.typ.is_number() {
                            return Err(ElaborateError::NonNumericOperand {
                                op,
                                typ: inner.typ.clone(),
                                span,
                            });
                        }
                        inner.typ.clone()
                    }
                };
                Ok(Expression {
                    kind: ExpressionKind::Unary {
                        op,
                        inner: Box::new(inner),
                    },
                    span,
                    typ,
                })
            }

            ExpressionKind::Call { callee, args } => {
                let callee = self.elaborate_expression(*callee)?;
                let mut typed_args = Vec::with_capacity(args.len());
                for arg in args {
                    typed_args.push(self.elaborate_expression(arg)?);
                }
                self.check_call(callee, typed_args, span)
            }

            ExpressionKind::MethodCall { receiver, method, args } => {
                let receiver = self.elaborate_expression(*receiver)?;
                let key = extension_name(&receiver.typ, &method);
                let typ = self.variable_types.get(&key).cloned().ok_or_else(|| {
                    ElaborateError::MethodNotFound {
                        method,
                        receiver: receiver.typ.clone(),
                        span,
                    }
                })?;

                let callee = Expression {
                    kind: ExpressionKind::Var(key),
                    span: receiver.span,
                    typ,
                };

                let mut typed_args = Vec::with_capacity(args.len() + 1);
                for arg in args {
                    typed_args.push(self.elaborate_expression(arg)?);
                }
                // the receiver goes last, matching the prototype rewriter
                typed_args.push(receiver);

                self.check_call(callee, typed_args, span)
            }

            ExpressionKind::Index { value, index } => {
                let value = self.elaborate_expression(*value)?;
                let index = self.elaborate_expression(*index)?;
                let typ = match &value.typ {
                    Type::Pointer(pointee) => {
                        if !index.typ.is_number() || index.typ.is_floating() {
                            return Err(ElaborateError::NonIntegerIndex {
                                typ: index.typ.clone(),
                                span: index.span,
                            });
                        }
                        (**pointee).clone()
                    }
                    Type::Tuple(elems) => {
                        let ordinal = tuple_ordinal(&index)?;
                        elems
                            .get(ordinal)
                            .cloned()
                            .ok_or(ElaborateError::TupleIndexOutOfRange {
                                index: ordinal,
                                len: elems.len(),
                                span: index.span,
                            })?
                    }
                    typ => {
                        return Err(ElaborateError::NotIndexable {
                            typ: typ.clone(),
                            span,
                        })
                    }
                };
                Ok(Expression {
                    kind: ExpressionKind::Index {
                        value: Box::new(value),
                        index: Box::new(index),
                    },
                    span,
                    typ,
                })
            }

            ExpressionKind::Field { value, field } => {
                let value = self.elaborate_expression(*value)?;
                let typ = match &value.typ {
                    Type::Pointer(pointee) => match &**pointee {
                        Type::Struct { fields, .. } => fields
                            .iter()
                            .find_map(|(name, typ)| (*name == field).then(|| typ.clone())),
                        _ => None,
                    },
                    _ => None,
                };
                let Some(typ) = typ else {
                    return Err(ElaborateError::FieldNotFound {
                        field,
                        typ: value.typ,
                        span,
                    });
                };
                Ok(Expression {
                    kind: ExpressionKind::Field {
                        value: Box::new(value),
                        field,
                    },
                    span,
                    typ,
                })
            }

            ExpressionKind::New { struct_name, fields } => {
                let struct_type = self
                    .user_types
                    .get(&struct_name)
                    .cloned()
                    .ok_or_else(|| ElaborateError::UnknownTypeName {
                        name: struct_name.clone(),
                        span,
                    })?;
                if !matches!(struct_type, Type::Struct { .. }) {
                    return Err(ElaborateError::NewOfNonStruct {
                        name: struct_name,
                        span,
                    });
                }

                let mut typed_fields = Vec::with_capacity(fields.len());
                for (field_name, value) in fields {
                    let Some(ordinal) = struct_type.field_index(&field_name) else {
                        return Err(ElaborateError::FieldNotFound {
                            field: field_name,
                            typ: struct_type,
                            span,
                        });
                    };
                    let value = self.elaborate_expression(value)?;
                    let Type::Struct { ref fields, .. } = struct_type else {
                        unreachable!("checked above");
                    };
                    self.check_cast(&value.typ, &fields[ordinal].1, value.span)?;
                    typed_fields.push((field_name, value));
                }

                Ok(Expression {
                    kind: ExpressionKind::New {
                        struct_name,
                        fields: typed_fields,
                    },
                    span,
                    typ: Type::pointer_to(struct_type),
                })
            }

            ExpressionKind::Block(exprs) => {
                if exprs.is_empty() {
                    return Err(ElaborateError::EmptyBlock { span });
                }
                let mut typed = Vec::with_capacity(exprs.len());
                for expr in exprs {
                    typed.push(self.elaborate_expression(expr)?);
                }
                let typ = typed.last().map(|e| e.typ.clone()).unwrap_or(Type::Null);
                Ok(Expression {
                    kind: ExpressionKind::Block(typed),
                    span,
                    typ,
                })
            }

            ExpressionKind::If { condition, then_branch, else_branch } => {
                let (condition, then_branch, else_branch, typ) =
                    self.elaborate_conditional(*condition, *then_branch, else_branch, span)?;
                Ok(Expression {
                    kind: ExpressionKind::If {
                        condition: Box::new(condition),
                        then_branch: Box::new(then_branch),
                        else_branch: Some(Box::new(else_branch)),
                    },
                    span,
                    typ,
                })
            }

            ExpressionKind::While { condition, body, else_branch } => {
                let (condition, body, else_branch, typ) =
                    self.elaborate_conditional(*condition, *body, else_branch, span)?;
                Ok(Expression {
                    kind: ExpressionKind::While {
                        condition: Box::new(condition),
                        body: Box::new(body),
                        else_branch: Some(Box::new(else_branch)),
                    },
                    span,
                    typ,
                })
            }
        }
    }

    /// The shared shape of `if` and `while`: a numeric condition and two
    /// branches of equal type; a missing else becomes a null of that type
    #[allow(clippy::type_complexity)]
    fn elaborate_conditional(
        &mut self,
        condition: UntypedExpression,
        then_branch: UntypedExpression,
        else_branch: Option<Box<UntypedExpression>>,
        span: Span,
    ) -> Result<(TypedExpression, TypedExpression, TypedExpression, Type)> {
        let condition = self.elaborate_expression(condition)?;
        if !condition.typ.is_number() {
            return Err(ElaborateError::NonNumericCondition {
                typ: condition.typ,
                span: condition.span,
            });
        }

        let then_branch = self.elaborate_expression(then_branch)?;
        let else_branch = match else_branch {
            Some(else_branch) => self.elaborate_expression(*else_branch)?,
            None => Expression {
                kind: ExpressionKind::Null,
                span: Span::marker(span.end),
                typ: then_branch.typ.clone(),
            },
        };

        if then_branch.typ != else_branch.typ {
            return Err(ElaborateError::MismatchedBranches {
                then_type: then_branch.typ,
                else_type: else_branch.typ,
                span,
            });
        }

        let typ = then_branch.typ.clone();
        Ok((condition, then_branch, else_branch, typ))
    }

    fn check_call(
        &self,
        callee: TypedExpression,
        args: Vec<TypedExpression>,
        span: Span,
    ) -> Result<TypedExpression> {
        let fn_type = match &callee.typ {
            Type::Function { .. } => callee.typ.clone(),
            Type::Pointer(pointee) if matches!(**pointee, Type::Function { .. }) => {
                (**pointee).clone()
            }
            typ => {
                return Err(ElaborateError::NotAFunction {
                    typ: typ.clone(),
                    span,
                })
            }
        };
        let Type::Function { params, ret, variadic } = fn_type else {
            unreachable!("checked above");
        };

        let arity_ok = if variadic {
            args.len() >= params.len()
        } else {
            args.len() == params.len()
        };
        if !arity_ok {
            return Err(ElaborateError::WrongNumberOfArguments {
                expected: params.len(),
                actual: args.len(),
                span,
            });
        }

        // variadic-tail arguments are passed as their natural type
        for (arg, param) in args.iter().zip(params.iter()) {
            self.check_cast(&arg.typ, param, arg.span)?;
        }

        Ok(Expression {
            kind: ExpressionKind::Call {
                callee: Box::new(callee),
                args,
            },
            span,
            typ: *ret,
        })
    }

    /// The static side of the cast matrix
    ///
    /// Addressability (needed by array decay) is a property of runtime
    /// values, so it is checked during emission instead.
    fn check_cast(&self, from: &Type, to: &Type, span: Span) -> Result<()> {
        let ok = match (from, to) {
            _ if from == to => true,
            (Type::Number { .. }, Type::Number { .. }) => true,
            (Type::Number { floating: false, .. }, Type::Pointer(_)) => true,
            (Type::Pointer(_), Type::Pointer(_)) => true,
            (Type::Pointer(_), Type::Number { floating: false, .. }) => true,
            (Type::Array { elem, .. }, Type::Pointer(pointee)) => elem == pointee,
            (Type::Tuple(elems), Type::Array { elem, count }) => {
                elems.len() == *count as usize && elems.iter().all(|t| t == &**elem)
            }
            (Type::Null, _) => true,
            _ => false,
        };

        if ok {
            Ok(())
        } else {
            Err(ElaborateError::ImpossibleCast {
                typ: from.clone(),
                target: to.clone(),
                span,
            })
        }
    }

    fn resolve_type(&self, type_expr: &TypeExpr, span: Span) -> Result<Type> {
        match type_expr {
            TypeExpr::Named(name) => Type::from_name(name)
                .or_else(|| self.user_types.get(name).cloned())
                .ok_or_else(|| ElaborateError::UnknownTypeName {
                    name: name.clone(),
                    span,
                }),
            TypeExpr::Pointer(inner) => {
                Ok(Type::pointer_to(self.resolve_type(inner, span)?))
            }
            TypeExpr::Array { elem, count } => Ok(Type::Array {
                elem: Box::new(self.resolve_type(elem, span)?),
                count: *count,
            }),
            TypeExpr::Tuple(elems) => {
                let mut types = Vec::with_capacity(elems.len());
                for elem in elems {
                    types.push(self.resolve_type(elem, span)?);
                }
                Ok(Type::Tuple(types))
            }
            TypeExpr::Function { params, ret, variadic } => {
                let mut param_types = Vec::with_capacity(params.len());
                for param in params {
                    param_types.push(self.resolve_type(param, span)?);
                }
                Ok(Type::Function {
                    params: param_types,
                    ret: Box::new(self.resolve_type(ret, span)?),
                    variadic: *variadic,
                })
            }
        }
    }
}

/// The type a numeric literal's suffix (or its absence) selects
fn number_type(literal: &NumberLiteral, span: Span) -> Result<Type> {
    let typ = match literal.suffix {
        Some(NumSuffix::D) => Type::float(64),
        Some(NumSuffix::F) => Type::float(32),
        Some(suffix) => {
            if literal.has_dot {
                return Err(ElaborateError::DottedIntegerLiteral { suffix, span });
            }
            match suffix {
                NumSuffix::I => Type::int(32, true),
                NumSuffix::U => Type::int(32, false),
                NumSuffix::L => Type::int(64, true),
                NumSuffix::B => Type::int(8, false),
                NumSuffix::D | NumSuffix::F => unreachable!("handled above"),
            }
        }
        None if literal.has_dot => Type::float(64),
        None => Type::int(32, true),
    };
    Ok(typ)
}

/// The ordinal a tuple index expression selects, which must be knowable
/// statically
fn tuple_ordinal(index: &TypedExpression) -> Result<usize> {
    let ExpressionKind::Number(literal) = &index.kind else {
        return Err(ElaborateError::TupleIndexNotLiteral { span: index.span });
    };
    if literal.has_dot {
        return Err(ElaborateError::TupleIndexNotLiteral { span: index.span });
    }
    usize::from_str_radix(&literal.text, literal.base)
        .map_err(|_| ElaborateError::TupleIndexNotLiteral { span: index.span })
}

/// The result type of a binary operator, given its operand types
///
/// Mixed float/int operands are rejected; two numbers promote to the wider
/// side; pointer plus or minus integer keeps the pointer type.
fn binary_type(op: BinOp, lhs: &Type, rhs: &Type, span: Span) -> Result<Type> {
    let incompatible = || ElaborateError::IncompatibleOperands {
        op,
        lhs: lhs.clone(),
        rhs: rhs.clone(),
        span,
    };

    match (lhs, rhs) {
        (
            Type::Number { bits: lhs_bits, floating: lhs_floating, .. },
            Type::Number { bits: rhs_bits, floating: rhs_floating, .. },
        ) => {
            if lhs_floating != rhs_floating {
                return Err(incompatible());
            }
            if op.is_integer_only() && *lhs_floating {
                return Err(incompatible());
            }
            if op.is_comparison() {
                Ok(Type::BOOL)
            } else if rhs_bits > lhs_bits {
                Ok(rhs.clone())
            } else {
                Ok(lhs.clone())
            }
        }
        (Type::Pointer(_), Type::Number { floating: false, .. })
            if op == BinOp::Add || op == BinOp::Sub =>
        {
            Ok(lhs.clone())
        }
        (Type::Number { floating: false, .. }, Type::Pointer(_)) if op == BinOp::Add => {
            Ok(rhs.clone())
        }
        _ => Err(incompatible()),
    }
}
