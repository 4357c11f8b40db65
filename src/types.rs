//! The type algebra
//!
//! A [Type] is a tagged variant over everything the language can express.
//! Equality is structural except for structs, which compare nominally by
//! their registered name. The [std::fmt::Display] impl is the canonical
//! stringification; it doubles as the receiver part of extension-method keys
//! (see [extension_name]).

use std::fmt;

use inkwell::context::Context;
use inkwell::types::{BasicMetadataTypeEnum, BasicType, BasicTypeEnum, FunctionType};
use inkwell::AddressSpace;

#[derive(Debug, Clone, Eq)]
pub enum Type {
    /// An integer or float; `bits == 1` is the boolean
    Number {
        bits: u32,
        signed: bool,
        floating: bool,
    },
    Pointer(Box<Type>),
    Array { elem: Box<Type>, count: u32 },
    Tuple(Vec<Type>),
    Struct {
        name: String,
        fields: Vec<(String, Type)>,
    },
    Function {
        params: Vec<Type>,
        ret: Box<Type>,
        variadic: bool,
    },
    /// The bottom type of the `null` literal
    Null,
}

impl Type {
    pub const BOOL: Type = Type::Number {
        bits: 1,
        signed: false,
        floating: false,
    };
    pub const CHAR: Type = Type::Number {
        bits: 8,
        signed: false,
        floating: false,
    };

    pub fn int(bits: u32, signed: bool) -> Type {
        Type::Number {
            bits,
            signed,
            floating: false,
        }
    }

    pub fn float(bits: u32) -> Type {
        Type::Number {
            bits,
            signed: true,
            floating: true,
        }
    }

    pub fn pointer_to(inner: Type) -> Type {
        Type::Pointer(Box::new(inner))
    }

    /// Resolve a builtin type spelling
    pub fn from_name(name: &str) -> Option<Type> {
        let typ = match name {
            "bool" => Type::BOOL,
            "char" | "u8" => Type::CHAR,
            "i8" => Type::int(8, true),
            "i32" => Type::int(32, true),
            "u32" => Type::int(32, false),
            "i64" => Type::int(64, true),
            "u64" => Type::int(64, false),
            "f32" => Type::float(32),
            "f64" => Type::float(64),
            _ => return None,
        };
        Some(typ)
    }

    /// Bit width, for numbers only
    pub fn bits(&self) -> Option<u32> {
        match self {
            Type::Number { bits, .. } => Some(*bits),
            _ => None,
        }
    }

    pub fn is_number(&self) -> bool {
        matches!(self, Type::Number { .. })
    }

    pub fn is_floating(&self) -> bool {
        matches!(self, Type::Number { floating: true, .. })
    }

    /// Ordinal of a struct field, by name
    pub fn field_index(&self, field: &str) -> Option<usize> {
        match self {
            Type::Struct { fields, .. } => fields.iter().position(|(name, _)| name == field),
            _ => None,
        }
    }

    /// Materialize this type in the backend
    pub fn llvm_type<'ctx>(&self, context: &'ctx Context) -> BasicTypeEnum<'ctx> {
        match self {
            Type::Number { floating: true, bits: 32, .. } => context.f32_type().into(),
            Type::Number { floating: true, .. } => context.f64_type().into(),
            Type::Number { bits, .. } => context.custom_width_int_type(*bits).into(),
            Type::Pointer(_) | Type::Function { .. } | Type::Null => {
                context.ptr_type(AddressSpace::default()).into()
            }
            Type::Array { elem, count } => elem.llvm_type(context).array_type(*count).into(),
            Type::Tuple(elems) => {
                let fields: Vec<BasicTypeEnum> =
                    elems.iter().map(|t| t.llvm_type(context)).collect();
                context.struct_type(&fields, false).into()
            }
            Type::Struct { name, fields } => match context.get_struct_type(name) {
                Some(existing) => existing.into(),
                None => {
                    let body: Vec<BasicTypeEnum> =
                        fields.iter().map(|(_, t)| t.llvm_type(context)).collect();
                    let opaque = context.opaque_struct_type(name);
                    opaque.set_body(&body, false);
                    opaque.into()
                }
            },
        }
    }

    /// Materialize the signature of a [Type::Function]
    pub fn llvm_fn_type<'ctx>(&self, context: &'ctx Context) -> Option<FunctionType<'ctx>> {
        let Type::Function { params, ret, variadic } = self else {
            return None;
        };
        let param_types: Vec<BasicMetadataTypeEnum> =
            params.iter().map(|t| t.llvm_type(context).into()).collect();
        Some(ret.llvm_type(context).fn_type(&param_types, *variadic))
    }
}

impl PartialEq for Type {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (
                Type::Number { bits, signed, floating },
                Type::Number { bits: b, signed: s, floating: f },
            ) => bits == b && signed == s && floating == f,
            (Type::Pointer(a), Type::Pointer(b)) => a == b,
            (Type::Array { elem, count }, Type::Array { elem: e, count: c }) => {
                elem == e && count == c
            }
            (Type::Tuple(a), Type::Tuple(b)) => a == b,
            // structs are nominal
            (Type::Struct { name, .. }, Type::Struct { name: other, .. }) => name == other,
            (
                Type::Function { params, ret, variadic },
                Type::Function { params: p, ret: r, variadic: v },
            ) => params == p && ret == r && variadic == v,
            (Type::Null, Type::Null) => true,
            _ => false,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Number { bits: 1, .. } => write!(f, "bool"),
            Type::Number { bits, floating: true, .. } => write!(f, "f{bits}"),
            Type::Number { bits, signed: true, .. } => write!(f, "i{bits}"),
            Type::Number { bits, .. } => write!(f, "u{bits}"),
            Type::Pointer(inner) => write!(f, "*{inner}"),
            Type::Array { elem, count } => write!(f, "{elem}[{count}]"),
            Type::Tuple(elems) => {
                write!(f, "(")?;
                for (i, elem) in elems.iter().enumerate() {
                    if i != 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{elem}")?;
                }
                write!(f, ")")
            }
            Type::Struct { name, .. } => write!(f, "{name}"),
            Type::Function { params, ret, variadic } => {
                write!(f, "fun(")?;
                for (i, param) in params.iter().enumerate() {
                    if i != 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{param}")?;
                }
                if *variadic {
                    if !params.is_empty() {
                        write!(f, ", ")?;
                    }
                    write!(f, "...")?;
                }
                write!(f, ") -> {ret}")
            }
            Type::Null => write!(f, "null"),
        }
    }
}

/// The key an extension method on `receiver` is registered and looked up by
///
/// The method-call site and the prototype rewriter must agree on this exact
/// string; both go through here.
pub fn extension_name(receiver: &Type, name: &str) -> String {
    format!("({receiver})::{name}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stringify() {
        assert_eq!(Type::BOOL.to_string(), "bool");
        assert_eq!(Type::int(32, true).to_string(), "i32");
        assert_eq!(Type::int(64, false).to_string(), "u64");
        assert_eq!(Type::float(64).to_string(), "f64");
        assert_eq!(Type::pointer_to(Type::CHAR).to_string(), "*u8");
        assert_eq!(
            Type::Array {
                elem: Box::new(Type::CHAR),
                count: 3
            }
            .to_string(),
            "u8[3]"
        );
        assert_eq!(
            Type::Tuple(vec![Type::int(32, true), Type::float(32)]).to_string(),
            "(i32, f32)"
        );
        assert_eq!(
            Type::Function {
                params: vec![Type::int(32, true)],
                ret: Box::new(Type::BOOL),
                variadic: true,
            }
            .to_string(),
            "fun(i32, ...) -> bool"
        );
    }

    #[test]
    fn structural_equality() {
        assert_eq!(Type::int(32, true), Type::int(32, true));
        assert_ne!(Type::int(32, true), Type::int(32, false));
        assert_ne!(Type::int(32, true), Type::int(64, true));
        assert_ne!(Type::int(32, true), Type::float(32));
        assert_eq!(
            Type::pointer_to(Type::int(8, true)),
            Type::pointer_to(Type::int(8, true))
        );
        assert_ne!(
            Type::pointer_to(Type::int(8, true)),
            Type::pointer_to(Type::int(8, false))
        );
    }

    #[test]
    fn nominal_struct_equality() {
        let a = Type::Struct {
            name: String::from("Vec"),
            fields: vec![(String::from("len"), Type::int(64, false))],
        };
        let b = Type::Struct {
            name: String::from("Vec"),
            fields: vec![],
        };
        let c = Type::Struct {
            name: String::from("Map"),
            fields: vec![(String::from("len"), Type::int(64, false))],
        };
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn field_ordinals() {
        let vec = Type::Struct {
            name: String::from("Vec"),
            fields: vec![
                (String::from("data"), Type::pointer_to(Type::CHAR)),
                (String::from("len"), Type::int(64, false)),
            ],
        };
        assert_eq!(vec.field_index("data"), Some(0));
        assert_eq!(vec.field_index("len"), Some(1));
        assert_eq!(vec.field_index("cap"), None);
    }

    #[test]
    fn extension_keys() {
        let vec = Type::Struct {
            name: String::from("Vec"),
            fields: vec![],
        };
        assert_eq!(extension_name(&vec, "len"), "(Vec)::len");
        assert_eq!(
            extension_name(&Type::pointer_to(vec), "len"),
            "(*Vec)::len"
        );
        assert_eq!(extension_name(&Type::int(32, true), "abs"), "(i32)::abs");
    }
}
