//! Code generation
//!
//! The [Emitter] lowers a typed AST to LLVM IR. It owns the builder cursor,
//! the module, and the flat name-to-value table; [compile] is the main
//! interface.
//!
//! The module is emitted in two phases: first every global and every
//! function prototype is declared, then every function body is emitted.
//! Forward and mutual references therefore work without any ordering
//! constraints between definitions.

use std::collections::HashMap;

use miette::Diagnostic;
use thiserror::Error;

use inkwell::builder::Builder;
use inkwell::context::Context;
use inkwell::module::{Linkage, Module};
use inkwell::values::{BasicMetadataValueEnum, FunctionValue, IntValue, PointerValue};
use inkwell::{FloatPredicate, IntPredicate};

use crate::ast::*;
use crate::lexing::{NumberLiteral, StrKind};
use crate::value::{num_cast, Value};
use crate::Type;

#[derive(Debug, Error, Diagnostic)]
pub enum EmitError {
    #[error("The LLVM builder failed")]
    Builder(#[from] inkwell::builder::BuilderError),

    #[error("The name `{name}` is not bound")]
    UnknownName { name: String },

    #[error("Cannot cast `{from}` to `{to}`")]
    InvalidCast { from: Type, to: Type },

    #[error("A value of type `{typ}` has no address")]
    NotAddressable { typ: Type },

    #[error("An array of type `{typ}` without an address cannot decay to a pointer")]
    ArrayDecayWithoutAddress { typ: Type },

    #[error("The global variable `{name}` needs a constant initializer")]
    NonConstantGlobal { name: String },

    #[error("The function `{name}` cannot be redefined")]
    FunctionRedefinition { name: String },

    #[error("Floating-point literals must be decimal but `{text}` is not")]
    NonDecimalFloat { text: String },

    #[error("The number literal `{text}` cannot be materialized")]
    MalformedNumber { text: String },
}

type Result<T> = std::result::Result<T, EmitError>;

/// Lower a typed program into an LLVM module
pub fn compile<'ctx>(context: &'ctx Context, program: TypedProgram) -> Result<Module<'ctx>> {
    let mut emitter = Emitter::new(context);

    for top_level in &program.top_levels {
        emitter.declare_top_level(top_level)?;
    }
    for top_level in &program.top_levels {
        if let TopLevel::Function(def) = top_level {
            emitter.emit_function(def)?;
        }
    }

    Ok(emitter.module)
}

/// The state of the lowering pass
///
/// `variables` is the flat name-to-value table; like the type tables during
/// elaboration it is never cleared between functions.
pub struct Emitter<'ctx> {
    context: &'ctx Context,
    builder: Builder<'ctx>,
    module: Module<'ctx>,
    variables: HashMap<String, Value<'ctx>>,
    function: Option<FunctionValue<'ctx>>,
}

impl<'ctx> Emitter<'ctx> {
    fn new(context: &'ctx Context) -> Self {
        Self {
            context,
            builder: context.create_builder(),
            module: context.create_module("cinderModule"),
            variables: HashMap::new(),
            function: None,
        }
    }

    pub(crate) fn context(&self) -> &'ctx Context {
        self.context
    }

    pub(crate) fn builder(&self) -> &Builder<'ctx> {
        &self.builder
    }

    fn current_function(&self) -> FunctionValue<'ctx> {
        self.function.expect("emission is inside a function body")
    }

    /// Phase one: declare globals and prototypes
    fn declare_top_level(&mut self, top_level: &TopLevel<Type>) -> Result<()> {
        match top_level {
            TopLevel::Function(def) => {
                self.declare_function(&def.prototype)?;
            }
            TopLevel::Declare(Declaration::Function(proto)) => {
                self.declare_function(proto)?;
            }
            TopLevel::Declare(Declaration::Variable { name, typ, .. }) => {
                let global = self
                    .module
                    .add_global(typ.llvm_type(self.context), None, name);
                self.variables.insert(
                    name.clone(),
                    Value::Load {
                        typ: typ.clone(),
                        ptr: global.as_pointer_value(),
                    },
                );
            }
            TopLevel::Global(let_) => self.declare_global(let_)?,
            // types were fully resolved during elaboration
            TopLevel::Struct(_) | TopLevel::TypeAlias(_) => {}
        }
        Ok(())
    }

    fn declare_function(&mut self, proto: &Prototype<Type>) -> Result<FunctionValue<'ctx>> {
        // an earlier `declare` may already have added the function
        let func = match self.module.get_function(&proto.name) {
            Some(func) => func,
            None => {
                let fn_type = proto
                    .typ
                    .llvm_fn_type(self.context)
                    .expect("a prototype's type is a function type");
                let func = self.module.add_function(&proto.name, fn_type, None);
                for (param, value) in proto.params.iter().zip(func.get_param_iter()) {
                    value.set_name(&param.name);
                }
                func
            }
        };

        self.variables.insert(
            proto.name.clone(),
            Value::Function {
                typ: proto.typ.clone(),
                func,
            },
        );
        Ok(func)
    }

    /// A global `let` becomes an LLVM global; its initializer must be a
    /// constant value
    fn declare_global(&mut self, let_: &Let<Type>) -> Result<()> {
        let global = self
            .module
            .add_global(let_.typ.llvm_type(self.context), None, &let_.name);

        if let Some(init) = &let_.init {
            if !is_const_literal(&init.kind) {
                return Err(EmitError::NonConstantGlobal {
                    name: let_.name.clone(),
                });
            }
            let value = self.emit_expression(init)?;
            match value.cast_to(let_.typ.clone()).llvm_value(self) {
                Ok(val) => global.set_initializer(&val),
                Err(_) => {
                    return Err(EmitError::NonConstantGlobal {
                        name: let_.name.clone(),
                    })
                }
            }
        }

        self.variables.insert(
            let_.name.clone(),
            Value::Load {
                typ: let_.typ.clone(),
                ptr: global.as_pointer_value(),
            },
        );
        Ok(())
    }

    /// Phase two: emit a function body
    fn emit_function(&mut self, def: &FunctionDef<Type>) -> Result<FunctionValue<'ctx>> {
        let name = &def.prototype.name;
        let func = self
            .module
            .get_function(name)
            .ok_or_else(|| EmitError::UnknownName { name: name.clone() })?;

        if func.count_basic_blocks() != 0 {
            return Err(EmitError::FunctionRedefinition { name: name.clone() });
        }

        self.function = Some(func);
        let entry = self.context.append_basic_block(func, "entry");
        self.builder.position_at_end(entry);

        for (param, value) in def.prototype.params.iter().zip(func.get_param_iter()) {
            self.variables.insert(
                param.name.clone(),
                Value::Const {
                    typ: param.typ.clone(),
                    val: value,
                },
            );
        }

        let body = self.emit_expression(&def.body)?;

        let Type::Function { ret, .. } = &def.prototype.typ else {
            unreachable!("a prototype's type is a function type");
        };
        let ret_val = body.cast_to((**ret).clone()).llvm_value(self)?;
        self.builder.build_return(Some(&ret_val))?;

        Ok(func)
    }

    fn emit_expression(&mut self, expr: &TypedExpression) -> Result<Value<'ctx>> {
        match &expr.kind {
            ExpressionKind::Number(literal) => self.emit_number(literal, &expr.typ),

            ExpressionKind::Bool(b) => Ok(Value::Const {
                typ: expr.typ.clone(),
                val: self.context.bool_type().const_int(*b as u64, false).into(),
            }),

            ExpressionKind::Char(c) => Ok(Value::Const {
                typ: expr.typ.clone(),
                val: self.context.i8_type().const_int(*c as u64, false).into(),
            }),

            ExpressionKind::String { value, kind } => self.emit_string(value, *kind, &expr.typ),

            ExpressionKind::Null => Ok(Value::Const {
                typ: expr.typ.clone(),
                val: expr.typ.llvm_type(self.context).const_zero(),
            }),

            ExpressionKind::Var(name) => {
                self.variables
                    .get(name)
                    .cloned()
                    .ok_or_else(|| EmitError::UnknownName { name: name.clone() })
            }

            ExpressionKind::Let(let_) => self.emit_let(let_),

            ExpressionKind::Cast { inner, .. } => {
                Ok(self.emit_expression(inner)?.cast_to(expr.typ.clone()))
            }

            ExpressionKind::Binary { op, lhs, rhs } => self.emit_binary(*op, lhs, rhs, &expr.typ),

            ExpressionKind::Unary { op, inner } => self.emit_unary(*op, inner, &expr.typ),

            ExpressionKind::Call { callee, args } => self.emit_call(callee, args, &expr.typ),

            ExpressionKind::Index { value, index } => self.emit_index(value, index, &expr.typ),

            ExpressionKind::Field { value, field } => self.emit_field(value, field, &expr.typ),

            ExpressionKind::MethodCall { .. } => {
                unreachable!("method calls are desugared during elaboration")
            }

            ExpressionKind::New { fields, .. } => self.emit_new(fields, &expr.typ),

            ExpressionKind::Block(exprs) => {
                let (last, init) = exprs.split_last().expect("elaboration rejects empty blocks");
                for expr in init {
                    self.emit_expression(expr)?;
                }
                self.emit_expression(last)
            }

            ExpressionKind::If { condition, then_branch, else_branch } => {
                let else_branch = else_branch.as_ref().expect("elaboration fills the else branch");
                self.emit_if(condition, then_branch, else_branch, &expr.typ)
            }

            ExpressionKind::While { condition, body, else_branch } => {
                let else_branch = else_branch.as_ref().expect("elaboration fills the else branch");
                self.emit_while(condition, body, else_branch, &expr.typ)
            }
        }
    }

    fn emit_number(&self, literal: &NumberLiteral, typ: &Type) -> Result<Value<'ctx>> {
        let Type::Number { signed, floating, .. } = typ else {
            unreachable!("number literals have number types");
        };

        let val = if *floating {
            if literal.base != 10 {
                return Err(EmitError::NonDecimalFloat {
                    text: literal.text.clone(),
                });
            }
            let value: f64 = literal.text.parse().map_err(|_| EmitError::MalformedNumber {
                text: literal.text.clone(),
            })?;
            typ.llvm_type(self.context)
                .into_float_type()
                .const_float(value)
                .into()
        } else {
            let value =
                u64::from_str_radix(&literal.text, literal.base).map_err(|_| {
                    EmitError::MalformedNumber {
                        text: literal.text.clone(),
                    }
                })?;
            typ.llvm_type(self.context)
                .into_int_type()
                .const_int(value, *signed)
                .into()
        };

        Ok(Value::Const {
            typ: typ.clone(),
            val,
        })
    }

    /// Strings are private constant globals holding the bytes plus a null
    /// terminator; the `c` flavor decays into a byte pointer right away
    fn emit_string(&self, value: &[u8], kind: StrKind, typ: &Type) -> Result<Value<'ctx>> {
        let mut bytes = value.to_vec();
        bytes.push(0);

        let initializer = self.context.const_string(&bytes, false);
        let array_type = self.context.i8_type().array_type(bytes.len() as u32);
        let global = self.module.add_global(array_type, None, ".str");
        global.set_linkage(Linkage::Private);
        global.set_constant(true);
        global.set_initializer(&initializer);

        let value = match kind {
            StrKind::CStr => {
                let zero = self.context.i64_type().const_zero();
                let decay =
                    unsafe { global.as_pointer_value().const_gep(array_type, &[zero, zero]) };
                Value::Const {
                    typ: typ.clone(),
                    val: decay.into(),
                }
            }
            StrKind::PtrCharArray => Value::Const {
                typ: typ.clone(),
                val: global.as_pointer_value().into(),
            },
            StrKind::CharArray => Value::ConstWithPtr {
                typ: typ.clone(),
                val: initializer.into(),
                ptr: global.as_pointer_value(),
            },
        };
        Ok(value)
    }

    /// Three shapes of local `let`: constants bind the initializer value
    /// directly, mutable bindings get a stack slot and a load-through-pointer
    fn emit_let(&mut self, let_: &Let<Type>) -> Result<Value<'ctx>> {
        if let_.constant {
            let init = let_
                .init
                .as_ref()
                .expect("elaboration requires a value for constants");
            let value = self.emit_expression(init)?.named(let_.name.clone());
            self.variables.insert(let_.name.clone(), value.clone());
            return Ok(value);
        }

        let ptr = self
            .builder
            .build_alloca(let_.typ.llvm_type(self.context), &let_.name)?;
        if let Some(init) = &let_.init {
            let init = self.emit_expression(init)?.cast_to(let_.typ.clone());
            let init = init.llvm_value(self)?;
            self.builder.build_store(ptr, init)?;
        }

        let value = Value::Load {
            typ: let_.typ.clone(),
            ptr,
        };
        self.variables.insert(let_.name.clone(), value.clone());
        Ok(value)
    }

    fn emit_binary(
        &mut self,
        op: BinOp,
        lhs: &TypedExpression,
        rhs: &TypedExpression,
        typ: &Type,
    ) -> Result<Value<'ctx>> {
        if op == BinOp::Assign {
            return self.emit_assign(lhs, rhs);
        }

        match (&lhs.typ, &rhs.typ) {
            (Type::Number { .. }, Type::Number { .. }) => self.emit_num_binop(op, lhs, rhs, typ),
            (Type::Pointer(_), Type::Number { .. }) => {
                let ptr = self.emit_expression(lhs)?;
                let ptr = ptr.llvm_value(self)?.into_pointer_value();
                let int = self.emit_expression(rhs)?;
                let int = int.llvm_value(self)?.into_int_value();
                self.emit_ptr_offset(op, ptr, int, typ)
            }
            (Type::Number { .. }, Type::Pointer(_)) => {
                let int = self.emit_expression(lhs)?;
                let int = int.llvm_value(self)?.into_int_value();
                let ptr = self.emit_expression(rhs)?;
                let ptr = ptr.llvm_value(self)?.into_pointer_value();
                self.emit_ptr_offset(op, ptr, int, typ)
            }
            _ => unreachable!("elaboration rejects other operand combinations"),
        }
    }

    /// Store the right side (cast to the left side's type) at the left
    /// side's address; the result reads the slot back
    fn emit_assign(&mut self, lhs: &TypedExpression, rhs: &TypedExpression) -> Result<Value<'ctx>> {
        let target = self.emit_expression(lhs)?;
        let ptr = target.llvm_ptr(self)?;

        let value = self.emit_expression(rhs)?.cast_to(lhs.typ.clone());
        let value = value.llvm_value(self)?;
        self.builder.build_store(ptr, value)?;

        Ok(Value::Load {
            typ: lhs.typ.clone(),
            ptr,
        })
    }

    fn emit_num_binop(
        &mut self,
        op: BinOp,
        lhs: &TypedExpression,
        rhs: &TypedExpression,
        typ: &Type,
    ) -> Result<Value<'ctx>> {
        let (
            Type::Number { bits: lhs_bits, signed: lhs_signed, floating },
            Type::Number { bits: rhs_bits, signed: rhs_signed, .. },
        ) = (&lhs.typ, &rhs.typ)
        else {
            unreachable!("both operands are numbers");
        };
        let floating = *floating;
        let signed = *lhs_signed && *rhs_signed;

        // widen the narrower operand to the wider type
        let left = self.emit_expression(lhs)?;
        let left = if rhs_bits > lhs_bits {
            left.cast_to(rhs.typ.clone())
        } else {
            left
        };
        let left = left.llvm_value(self)?;

        let right = self.emit_expression(rhs)?;
        let right = if lhs_bits > rhs_bits {
            right.cast_to(lhs.typ.clone())
        } else {
            right
        };
        let right = right.llvm_value(self)?;

        let builder = &self.builder;
        let val = if floating {
            let l = left.into_float_value();
            let r = right.into_float_value();
            match op {
                BinOp::Add => builder.build_float_add(l, r, "add")?.into(),
                BinOp::Sub => builder.build_float_sub(l, r, "sub")?.into(),
                BinOp::Mul => builder.build_float_mul(l, r, "mul")?.into(),
                BinOp::Div => builder.build_float_div(l, r, "div")?.into(),
                BinOp::Rem => builder.build_float_rem(l, r, "rem")?.into(),
                BinOp::Less => builder.build_float_compare(FloatPredicate::ULT, l, r, "lt")?.into(),
                BinOp::Greater => builder.build_float_compare(FloatPredicate::UGT, l, r, "gt")?.into(),
                BinOp::LessEq => builder.build_float_compare(FloatPredicate::ULE, l, r, "le")?.into(),
                BinOp::GreaterEq => builder.build_float_compare(FloatPredicate::UGE, l, r, "ge")?.into(),
                BinOp::Equals => builder.build_float_compare(FloatPredicate::UEQ, l, r, "equ")?.into(),
                BinOp::NotEquals => builder.build_float_compare(FloatPredicate::UNE, l, r, "neq")?.into(),
                _ => unreachable!("elaboration keeps integer-only operators off floats"),
            }
        } else {
            let l = left.into_int_value();
            let r = right.into_int_value();
            match op {
                BinOp::Add => builder.build_int_add(l, r, "add")?.into(),
                BinOp::Sub => builder.build_int_sub(l, r, "sub")?.into(),
                BinOp::Mul => builder.build_int_mul(l, r, "mul")?.into(),
                BinOp::Div if signed => builder.build_int_signed_div(l, r, "div")?.into(),
                BinOp::Div => builder.build_int_unsigned_div(l, r, "div")?.into(),
                BinOp::Rem if signed => builder.build_int_signed_rem(l, r, "rem")?.into(),
                BinOp::Rem => builder.build_int_unsigned_rem(l, r, "rem")?.into(),
                BinOp::BitAnd | BinOp::LogicalAnd => builder.build_and(l, r, "and")?.into(),
                BinOp::BitOr | BinOp::LogicalOr => builder.build_or(l, r, "or")?.into(),
                BinOp::Shl => builder.build_left_shift(l, r, "shl")?.into(),
                BinOp::Shr => builder.build_right_shift(l, r, signed, "shr")?.into(),
                BinOp::Less => {
                    let pred = if signed { IntPredicate::SLT } else { IntPredicate::ULT };
                    builder.build_int_compare(pred, l, r, "lt")?.into()
                }
                BinOp::Greater => {
                    let pred = if signed { IntPredicate::SGT } else { IntPredicate::UGT };
                    builder.build_int_compare(pred, l, r, "gt")?.into()
                }
                BinOp::LessEq => {
                    let pred = if signed { IntPredicate::SLE } else { IntPredicate::ULE };
                    builder.build_int_compare(pred, l, r, "le")?.into()
                }
                BinOp::GreaterEq => {
                    let pred = if signed { IntPredicate::SGE } else { IntPredicate::UGE };
                    builder.build_int_compare(pred, l, r, "ge")?.into()
                }
                BinOp::Equals => builder.build_int_compare(IntPredicate::EQ, l, r, "equ")?.into(),
                BinOp::NotEquals => builder.build_int_compare(IntPredicate::NE, l, r, "neq")?.into(),
                BinOp::Assign => unreachable!("assignments are handled before dispatch"),
            }
        };

        Ok(Value::Const {
            typ: typ.clone(),
            val,
        })
    }

    /// Pointer plus integer is a GEP; pointer minus integer negates the
    /// integer first
    fn emit_ptr_offset(
        &self,
        op: BinOp,
        ptr: PointerValue<'ctx>,
        int: IntValue<'ctx>,
        typ: &Type,
    ) -> Result<Value<'ctx>> {
        let Type::Pointer(pointee) = typ else {
            unreachable!("pointer arithmetic keeps the pointer type");
        };

        let int = if op == BinOp::Sub {
            self.builder.build_int_neg(int, "neg")?
        } else {
            int
        };

        let gep = unsafe {
            self.builder
                .build_gep(pointee.llvm_type(self.context), ptr, &[int], "ptradd")?
        };
        Ok(Value::Const {
            typ: typ.clone(),
            val: gep.into(),
        })
    }

    fn emit_unary(
        &mut self,
        op: UnaOp,
        inner: &TypedExpression,
        typ: &Type,
    ) -> Result<Value<'ctx>> {
        match op {
            UnaOp::Deref => {
                let pointer = self.emit_expression(inner)?;
                let ptr = pointer.llvm_value(self)?.into_pointer_value();
                Ok(Value::Load {
                    typ: typ.clone(),
                    ptr,
                })
            }
            UnaOp::AddrOf => {
                let value = self.emit_expression(inner)?;
                let ptr = value.llvm_ptr(self)?;
                Ok(Value::Const {
                    typ: typ.clone(),
                    val: ptr.into(),
                })
            }
            UnaOp::Not => {
                let value = self.emit_expression(inner)?;
                let raw = value.llvm_value(self)?;
                // compare against zero, then widen back to the operand type
                let negated: IntValue = if inner.typ.is_floating() {
                    let zero = inner.typ.llvm_type(self.context).into_float_type().const_zero();
                    self.builder
                        .build_float_compare(FloatPredicate::OEQ, raw.into_float_value(), zero, "not")?
                } else {
                    let zero = inner.typ.llvm_type(self.context).into_int_type().const_zero();
                    self.builder
                        .build_int_compare(IntPredicate::EQ, raw.into_int_value(), zero, "not")?
                };
                let val = num_cast(self, negated.into(), &Type::BOOL, typ)?;
                Ok(Value::Const {
                    typ: typ.clone(),
                    val,
                })
            }
            UnaOp::Neg => {
                let value = self.emit_expression(inner)?;
                let raw = value.llvm_value(self)?;
                let val = if inner.typ.is_floating() {
                    self.builder.build_float_neg(raw.into_float_value(), "neg")?.into()
                } else {
                    self.builder.build_int_neg(raw.into_int_value(), "neg")?.into()
                };
                Ok(Value::Const {
                    typ: typ.clone(),
                    val,
                })
            }
        }
    }

    /// Declared arguments are cast to their parameter types; variadic-tail
    /// arguments are passed as-is. Calls through function pointers go
    /// through an indirect call with the explicit function type.
    fn emit_call(
        &mut self,
        callee: &TypedExpression,
        args: &[TypedExpression],
        typ: &Type,
    ) -> Result<Value<'ctx>> {
        let callee_value = self.emit_expression(callee)?;
        let fn_type = match callee_value.typ() {
            Type::Function { .. } => callee_value.typ().clone(),
            Type::Pointer(pointee) => (**pointee).clone(),
            _ => unreachable!("elaboration checks the callee type"),
        };
        let Type::Function { ref params, .. } = fn_type else {
            unreachable!("elaboration checks the callee type");
        };

        let mut compiled: Vec<BasicMetadataValueEnum> = Vec::with_capacity(args.len());
        for (i, arg) in args.iter().enumerate() {
            let value = self.emit_expression(arg)?;
            let value = match params.get(i) {
                Some(param) => value.cast_to(param.clone()),
                None => value,
            };
            compiled.push(value.llvm_value(self)?.into());
        }

        let call = match &callee_value {
            Value::Function { func, .. } => self.builder.build_call(*func, &compiled, "call")?,
            other => {
                let fn_llvm = fn_type
                    .llvm_fn_type(self.context)
                    .expect("the callee type is a function type");
                let ptr = other.llvm_value(self)?.into_pointer_value();
                self.builder.build_indirect_call(fn_llvm, ptr, &compiled, "call")?
            }
        };

        let val = call
            .try_as_basic_value()
            .left()
            .expect("every function returns a value");
        Ok(Value::Const {
            typ: typ.clone(),
            val,
        })
    }

    fn emit_index(
        &mut self,
        value: &TypedExpression,
        index: &TypedExpression,
        typ: &Type,
    ) -> Result<Value<'ctx>> {
        let source = self.emit_expression(value)?;
        match source.typ().clone() {
            Type::Pointer(pointee) => {
                let ptr = source.llvm_value(self)?.into_pointer_value();
                let idx = self.emit_expression(index)?;
                let idx = idx.llvm_value(self)?.into_int_value();
                let gep = unsafe {
                    self.builder
                        .build_gep(pointee.llvm_type(self.context), ptr, &[idx], "index")?
                };
                Ok(Value::Load {
                    typ: typ.clone(),
                    ptr: gep,
                })
            }
            Type::Tuple(_) => {
                let ExpressionKind::Number(literal) = &index.kind else {
                    unreachable!("elaboration requires a literal tuple index");
                };
                let ordinal = u32::from_str_radix(&literal.text, literal.base).map_err(|_| {
                    EmitError::MalformedNumber {
                        text: literal.text.clone(),
                    }
                })?;

                if source.is_addressable() {
                    let tuple_type = source.typ().llvm_type(self.context);
                    let ptr = source.llvm_ptr(self)?;
                    let gep = self
                        .builder
                        .build_struct_gep(tuple_type, ptr, ordinal, "index")?;
                    Ok(Value::Load {
                        typ: typ.clone(),
                        ptr: gep,
                    })
                } else {
                    let tuple = source.llvm_value(self)?.into_struct_value();
                    let val = self.builder.build_extract_value(tuple, ordinal, "index")?;
                    Ok(Value::Const {
                        typ: typ.clone(),
                        val,
                    })
                }
            }
            _ => unreachable!("elaboration allows indexing pointers and tuples only"),
        }
    }

    fn emit_field(
        &mut self,
        value: &TypedExpression,
        field: &str,
        typ: &Type,
    ) -> Result<Value<'ctx>> {
        let source = self.emit_expression(value)?;
        let Type::Pointer(pointee) = source.typ().clone() else {
            unreachable!("elaboration requires a pointer to a struct");
        };
        let ordinal = pointee
            .field_index(field)
            .expect("elaboration checked the field") as u32;

        let ptr = source.llvm_value(self)?.into_pointer_value();
        let gep =
            self.builder
                .build_struct_gep(pointee.llvm_type(self.context), ptr, ordinal, field)?;
        Ok(Value::Load {
            typ: typ.clone(),
            ptr: gep,
        })
    }

    /// Allocate the struct, store the given fields in order, and hand back
    /// the pointer; unmentioned fields stay uninitialized
    fn emit_new(
        &mut self,
        fields: &[(Ident, TypedExpression)],
        typ: &Type,
    ) -> Result<Value<'ctx>> {
        let Type::Pointer(struct_type) = typ else {
            unreachable!("`new` produces a pointer to the struct");
        };
        let Type::Struct { fields: ref declared, .. } = **struct_type else {
            unreachable!("elaboration checks the struct type");
        };

        let llvm_struct = struct_type.llvm_type(self.context);
        let ptr = self.builder.build_alloca(llvm_struct, "new")?;

        for (field_name, value) in fields {
            let ordinal = struct_type
                .field_index(field_name)
                .expect("elaboration checked the field") as u32;
            let field_type = declared[ordinal as usize].1.clone();

            let value = self.emit_expression(value)?.cast_to(field_type);
            let value = value.llvm_value(self)?;
            let field_ptr = self
                .builder
                .build_struct_gep(llvm_struct, ptr, ordinal, field_name)?;
            self.builder.build_store(field_ptr, value)?;
        }

        Ok(Value::Const {
            typ: typ.clone(),
            val: ptr.into(),
        })
    }

    /// Turn a condition value into an `i1`
    ///
    /// Floats compare ordered-not-equal against zero; wider integers
    /// compare not-equal against zero.
    fn booleanize(&self, condition: &Value<'ctx>) -> Result<IntValue<'ctx>> {
        let raw = condition.llvm_value(self)?;
        match condition.typ() {
            Type::Number { floating: true, .. } => {
                let zero = condition.typ().llvm_type(self.context).into_float_type().const_zero();
                Ok(self.builder.build_float_compare(
                    FloatPredicate::ONE,
                    raw.into_float_value(),
                    zero,
                    "cond",
                )?)
            }
            Type::Number { bits: 1, .. } => Ok(raw.into_int_value()),
            Type::Number { .. } => {
                let zero = condition.typ().llvm_type(self.context).into_int_type().const_zero();
                Ok(self.builder.build_int_compare(
                    IntPredicate::NE,
                    raw.into_int_value(),
                    zero,
                    "cond",
                )?)
            }
            _ => unreachable!("elaboration requires numeric conditions"),
        }
    }

    /// The four-block lowering of `if`: branch into then/else, emit both
    /// sides, and join them with a phi in the merge block
    fn emit_if(
        &mut self,
        condition: &TypedExpression,
        then_branch: &TypedExpression,
        else_branch: &TypedExpression,
        typ: &Type,
    ) -> Result<Value<'ctx>> {
        let condition = self.emit_expression(condition)?;
        let cond = self.booleanize(&condition)?;

        let func = self.current_function();
        let then_bb = self.context.append_basic_block(func, "ifthen");
        let else_bb = self.context.append_basic_block(func, "ifelse");
        let merge_bb = self.context.append_basic_block(func, "ifmerge");

        self.builder.build_conditional_branch(cond, then_bb, else_bb)?;

        self.builder.position_at_end(then_bb);
        let then_value = self.emit_expression(then_branch)?;
        let then_value = then_value.llvm_value(self)?;
        self.builder.build_unconditional_branch(merge_bb)?;
        // NOTE: Important! Update bb for phi merge because the expression may change it
        let then_bb = self.builder.get_insert_block().unwrap();

        self.builder.position_at_end(else_bb);
        let else_value = self.emit_expression(else_branch)?;
        let else_value = else_value.llvm_value(self)?;
        self.builder.build_unconditional_branch(merge_bb)?;
        // NOTE: Important! Update bb for phi merge because the expression may change it
        let else_bb = self.builder.get_insert_block().unwrap();

        self.builder.position_at_end(merge_bb);
        let phi = self.builder.build_phi(typ.llvm_type(self.context), "ifphi")?;
        phi.add_incoming(&[(&then_value, then_bb), (&else_value, else_bb)]);

        Ok(Value::Const {
            typ: typ.clone(),
            val: phi.as_basic_value(),
        })
    }

    /// Loops share the `if` shape: the condition is re-evaluated at the end
    /// of the body and branches back to it or on to the merge block; the
    /// else side runs once when the first evaluation is false
    fn emit_while(
        &mut self,
        condition: &TypedExpression,
        body: &TypedExpression,
        else_branch: &TypedExpression,
        typ: &Type,
    ) -> Result<Value<'ctx>> {
        let first = self.emit_expression(condition)?;
        let cond = self.booleanize(&first)?;

        let func = self.current_function();
        let body_bb = self.context.append_basic_block(func, "whilebody");
        let else_bb = self.context.append_basic_block(func, "whileelse");
        let merge_bb = self.context.append_basic_block(func, "whilemerge");

        self.builder.build_conditional_branch(cond, body_bb, else_bb)?;

        self.builder.position_at_end(body_bb);
        let body_value = self.emit_expression(body)?;
        let body_value = body_value.llvm_value(self)?;
        let again = self.emit_expression(condition)?;
        let cond = self.booleanize(&again)?;
        self.builder.build_conditional_branch(cond, body_bb, merge_bb)?;
        let body_end_bb = self.builder.get_insert_block().unwrap();

        self.builder.position_at_end(else_bb);
        let else_value = self.emit_expression(else_branch)?;
        let else_value = else_value.llvm_value(self)?;
        self.builder.build_unconditional_branch(merge_bb)?;
        let else_end_bb = self.builder.get_insert_block().unwrap();

        self.builder.position_at_end(merge_bb);
        let phi = self.builder.build_phi(typ.llvm_type(self.context), "whilephi")?;
        phi.add_incoming(&[(&body_value, body_end_bb), (&else_value, else_end_bb)]);

        Ok(Value::Const {
            typ: typ.clone(),
            val: phi.as_basic_value(),
        })
    }
}

/// Whether an expression can seed a global initializer
fn is_const_literal<C>(kind: &ExpressionKind<C>) -> bool {
    matches!(
        kind,
        ExpressionKind::Number(_)
            | ExpressionKind::Bool(_)
            | ExpressionKind::Char(_)
            | ExpressionKind::String { .. }
            | ExpressionKind::Null
    )
}
