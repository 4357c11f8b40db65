//! The value abstraction
//!
//! A [Value] pairs an SSA handle with its [Type] and knows whether it is
//! addressable. Addressability is preserved through every wrapping: casts
//! lose it, named wrappers pass it through, load-through-pointer values
//! always carry it, and plain constants never have it.
//!
//! The cast machinery lives here too: [Value::cast_to] builds a lazy
//! wrapper and [build_cast] performs the actual conversion when the value
//! is materialized.

use inkwell::values::{BasicValueEnum, FunctionValue, PointerValue};
use inkwell::{FloatPredicate, IntPredicate};

use crate::codegen::{EmitError, Emitter};
use crate::Type;

type Result<T> = std::result::Result<T, EmitError>;

#[derive(Debug, Clone)]
pub enum Value<'ctx> {
    /// A plain SSA value; has no address
    Const {
        typ: Type,
        val: BasicValueEnum<'ctx>,
    },
    /// A constant that also knows where it lives
    ConstWithPtr {
        typ: Type,
        val: BasicValueEnum<'ctx>,
        ptr: PointerValue<'ctx>,
    },
    /// A pointer; a load materializes the value on demand
    Load {
        typ: Type,
        ptr: PointerValue<'ctx>,
    },
    /// A defined function; its address is itself
    Function {
        typ: Type,
        func: FunctionValue<'ctx>,
    },
    /// A lazy cast, performed when the value is materialized
    Cast {
        to: Type,
        source: Box<Value<'ctx>>,
    },
    /// Pass-through that assigns a debug name to the emitted value
    Named {
        name: String,
        inner: Box<Value<'ctx>>,
    },
}

impl<'ctx> Value<'ctx> {
    pub fn typ(&self) -> &Type {
        match self {
            Value::Const { typ, .. }
            | Value::ConstWithPtr { typ, .. }
            | Value::Load { typ, .. }
            | Value::Function { typ, .. } => typ,
            Value::Cast { to, .. } => to,
            Value::Named { inner, .. } => inner.typ(),
        }
    }

    pub fn is_addressable(&self) -> bool {
        match self {
            Value::Const { .. } | Value::Cast { .. } => false,
            Value::ConstWithPtr { .. } | Value::Load { .. } | Value::Function { .. } => true,
            Value::Named { inner, .. } => inner.is_addressable(),
        }
    }

    /// Wrap this value in a lazy cast to `to`
    pub fn cast_to(self, to: Type) -> Value<'ctx> {
        Value::Cast {
            to,
            source: Box::new(self),
        }
    }

    /// Attach a debug name, keeping everything else as-is
    pub fn named(self, name: impl Into<String>) -> Value<'ctx> {
        Value::Named {
            name: name.into(),
            inner: Box::new(self),
        }
    }

    /// Materialize the SSA value
    pub fn llvm_value(&self, e: &Emitter<'ctx>) -> Result<BasicValueEnum<'ctx>> {
        match self {
            Value::Const { val, .. } | Value::ConstWithPtr { val, .. } => Ok(*val),
            Value::Load { typ, ptr } => {
                Ok(e.builder().build_load(typ.llvm_type(e.context()), *ptr, "load")?)
            }
            Value::Function { func, .. } => {
                Ok(func.as_global_value().as_pointer_value().into())
            }
            Value::Cast { to, source } => build_cast(e, source, to),
            Value::Named { name, inner } => {
                let value = inner.llvm_value(e)?;
                value.set_name(name);
                Ok(value)
            }
        }
    }

    /// The SSA pointer to this value's storage, if it has any
    pub fn llvm_ptr(&self, e: &Emitter<'ctx>) -> Result<PointerValue<'ctx>> {
        match self {
            Value::Const { typ, .. } => Err(EmitError::NotAddressable { typ: typ.clone() }),
            Value::Cast { to, .. } => Err(EmitError::NotAddressable { typ: to.clone() }),
            Value::ConstWithPtr { ptr, .. } | Value::Load { ptr, .. } => Ok(*ptr),
            Value::Function { func, .. } => Ok(func.as_global_value().as_pointer_value()),
            Value::Named { inner, .. } => inner.llvm_ptr(e),
        }
    }
}

/// Perform a cast, dispatching on the source type
///
/// Equal types are a no-op. Everything else follows the cast matrix; an
/// uncovered combination is fatal.
pub(crate) fn build_cast<'ctx>(
    e: &Emitter<'ctx>,
    source: &Value<'ctx>,
    to: &Type,
) -> Result<BasicValueEnum<'ctx>> {
    let from = source.typ();
    if from == to {
        return source.llvm_value(e);
    }

    match from {
        Type::Number { .. } => {
            let value = source.llvm_value(e)?;
            num_cast(e, value, from, to)
        }
        Type::Pointer(_) => {
            let value = source.llvm_value(e)?.into_pointer_value();
            ptr_cast(e, value, from, to)
        }
        Type::Array { .. } => array_cast(e, source, to),
        Type::Tuple(_) => tuple_cast(e, source, to),
        Type::Null => Ok(to.llvm_type(e.context()).const_zero()),
        _ => Err(EmitError::InvalidCast {
            from: from.clone(),
            to: to.clone(),
        }),
    }
}

/// Number-to-number and number-to-pointer conversions
///
/// Signed/unsigned conversion flavors are picked from the *source*
/// signedness. A 1-bit destination is a compare against zero instead.
pub(crate) fn num_cast<'ctx>(
    e: &Emitter<'ctx>,
    value: BasicValueEnum<'ctx>,
    from: &Type,
    to: &Type,
) -> Result<BasicValueEnum<'ctx>> {
    let Type::Number { signed, floating, .. } = *from else {
        return Err(EmitError::InvalidCast {
            from: from.clone(),
            to: to.clone(),
        });
    };
    let builder = e.builder();

    match to {
        Type::Number { bits: 1, .. } => {
            if floating {
                let zero = from.llvm_type(e.context()).into_float_type().const_zero();
                Ok(builder
                    .build_float_compare(FloatPredicate::UNE, value.into_float_value(), zero, "tobool")?
                    .into())
            } else {
                let zero = from.llvm_type(e.context()).into_int_type().const_zero();
                Ok(builder
                    .build_int_compare(IntPredicate::NE, value.into_int_value(), zero, "tobool")?
                    .into())
            }
        }
        Type::Number { floating: to_floating, .. } => {
            let target = to.llvm_type(e.context());
            let cast = match (floating, to_floating) {
                (true, false) if signed => builder
                    .build_float_to_signed_int(value.into_float_value(), target.into_int_type(), "cast")?
                    .into(),
                (true, false) => builder
                    .build_float_to_unsigned_int(value.into_float_value(), target.into_int_type(), "cast")?
                    .into(),
                (false, true) if signed => builder
                    .build_signed_int_to_float(value.into_int_value(), target.into_float_type(), "cast")?
                    .into(),
                (false, true) => builder
                    .build_unsigned_int_to_float(value.into_int_value(), target.into_float_type(), "cast")?
                    .into(),
                (true, true) => builder
                    .build_float_cast(value.into_float_value(), target.into_float_type(), "cast")?
                    .into(),
                (false, false) => builder
                    .build_int_cast_sign_flag(value.into_int_value(), target.into_int_type(), signed, "cast")?
                    .into(),
            };
            Ok(cast)
        }
        Type::Pointer(_) if !floating => {
            let target = to.llvm_type(e.context()).into_pointer_type();
            Ok(builder
                .build_int_to_ptr(value.into_int_value(), target, "cast")?
                .into())
        }
        _ => Err(EmitError::InvalidCast {
            from: from.clone(),
            to: to.clone(),
        }),
    }
}

fn ptr_cast<'ctx>(
    e: &Emitter<'ctx>,
    value: PointerValue<'ctx>,
    from: &Type,
    to: &Type,
) -> Result<BasicValueEnum<'ctx>> {
    let builder = e.builder();
    match to {
        Type::Pointer(_) => {
            let target = to.llvm_type(e.context()).into_pointer_type();
            Ok(builder.build_pointer_cast(value, target, "cast")?.into())
        }
        Type::Number { floating: false, .. } => {
            let target = to.llvm_type(e.context()).into_int_type();
            Ok(builder.build_ptr_to_int(value, target, "cast")?.into())
        }
        _ => Err(EmitError::InvalidCast {
            from: from.clone(),
            to: to.clone(),
        }),
    }
}

/// Array-to-pointer decay: a two-zero GEP over the array's storage
///
/// Only addressable arrays can decay; a const array has no storage to
/// point into.
fn array_cast<'ctx>(
    e: &Emitter<'ctx>,
    source: &Value<'ctx>,
    to: &Type,
) -> Result<BasicValueEnum<'ctx>> {
    let from = source.typ().clone();
    let Type::Array { ref elem, .. } = from else {
        unreachable!("dispatched on the array variant");
    };

    let Type::Pointer(pointee) = to else {
        return Err(EmitError::InvalidCast { from, to: to.clone() });
    };
    if **pointee != **elem {
        return Err(EmitError::InvalidCast { from, to: to.clone() });
    }
    if !source.is_addressable() {
        return Err(EmitError::ArrayDecayWithoutAddress { typ: from });
    }

    let zero = e.context().i64_type().const_zero();
    let array_type = from.llvm_type(e.context());
    let ptr = source.llvm_ptr(e)?;
    let decay = unsafe { e.builder().build_gep(array_type, ptr, &[zero, zero], "decay")? };
    Ok(decay.into())
}

/// Tuple-to-array conversion
///
/// With storage at hand the tuple is reinterpreted in place; otherwise the
/// array is rebuilt element by element.
fn tuple_cast<'ctx>(
    e: &Emitter<'ctx>,
    source: &Value<'ctx>,
    to: &Type,
) -> Result<BasicValueEnum<'ctx>> {
    let from = source.typ().clone();
    let Type::Tuple(ref elems) = from else {
        unreachable!("dispatched on the tuple variant");
    };

    let Type::Array { elem, count } = to else {
        return Err(EmitError::InvalidCast { from, to: to.clone() });
    };
    if elems.len() != *count as usize || elems.iter().any(|t| t != &**elem) {
        return Err(EmitError::InvalidCast { from, to: to.clone() });
    }

    let array_type = to.llvm_type(e.context()).into_array_type();
    let builder = e.builder();

    if source.is_addressable() {
        let ptr = source.llvm_ptr(e)?;
        Ok(builder.build_load(array_type, ptr, "tupcast")?)
    } else {
        let tuple = source.llvm_value(e)?.into_struct_value();
        let mut array = array_type.get_undef();
        for i in 0..elems.len() as u32 {
            let element = builder.build_extract_value(tuple, i, "tupelem")?;
            array = builder
                .build_insert_value(array, element, i, "arrelem")?
                .into_array_value();
        }
        Ok(array.into())
    }
}
