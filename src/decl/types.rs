use std::collections::HashMap;
use std::fmt;

use super::{DeclArena, DeclId};

/// Type reference as written on a member, parameter, alias or superclass.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Ty {
    /// Standard-library or otherwise unresolved named type (`Int`, `String`).
    Named(String),
    Nominal {
        decl: DeclId,
        args: Vec<Ty>,
    },
    Optional(Box<Ty>),
    Array(Box<Ty>),
    Dictionary(Box<Ty>, Box<Ty>),
    Set(Box<Ty>),
    /// Generic parameter of the enclosing type.
    Param(String),
    Function(Vec<Ty>, Box<Ty>),
}

impl Ty {
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Ty::Named(name.into())
    }

    #[must_use]
    pub fn int() -> Self {
        Ty::named("Int")
    }

    #[must_use]
    pub fn double() -> Self {
        Ty::named("Double")
    }

    #[must_use]
    pub fn bool() -> Self {
        Ty::named("Bool")
    }

    #[must_use]
    pub fn string() -> Self {
        Ty::named("String")
    }

    #[must_use]
    pub fn nominal(decl: DeclId) -> Self {
        Ty::Nominal {
            decl,
            args: Vec::new(),
        }
    }

    #[must_use]
    pub fn generic(decl: DeclId, args: Vec<Ty>) -> Self {
        Ty::Nominal { decl, args }
    }

    #[must_use]
    pub fn optional(inner: Ty) -> Self {
        Ty::Optional(Box::new(inner))
    }

    #[must_use]
    pub fn array(element: Ty) -> Self {
        Ty::Array(Box::new(element))
    }

    #[must_use]
    pub fn set(element: Ty) -> Self {
        Ty::Set(Box::new(element))
    }

    #[must_use]
    pub fn dictionary(key: Ty, value: Ty) -> Self {
        Ty::Dictionary(Box::new(key), Box::new(value))
    }

    #[must_use]
    pub fn param(name: impl Into<String>) -> Self {
        Ty::Param(name.into())
    }

    #[must_use]
    pub fn function(params: Vec<Ty>, result: Ty) -> Self {
        Ty::Function(params, Box::new(result))
    }

    #[must_use]
    pub fn is_optional(&self) -> bool {
        matches!(self, Ty::Optional(_))
    }

    /// The wrapped type when `self` is an optional.
    #[must_use]
    pub fn optional_payload(&self) -> Option<&Ty> {
        match self {
            Ty::Optional(inner) => Some(inner),
            _ => None,
        }
    }

    #[must_use]
    pub fn nominal_decl(&self) -> Option<DeclId> {
        match self {
            Ty::Nominal { decl, .. } => Some(*decl),
            _ => None,
        }
    }

    /// Replace generic parameters by the types bound in `bindings`.
    #[must_use]
    pub fn substitute(&self, bindings: &HashMap<String, Ty>) -> Ty {
        if bindings.is_empty() {
            return self.clone();
        }
        match self {
            Ty::Param(name) => bindings.get(name).cloned().unwrap_or_else(|| self.clone()),
            Ty::Named(_) => self.clone(),
            Ty::Nominal { decl, args } => Ty::Nominal {
                decl: *decl,
                args: args.iter().map(|arg| arg.substitute(bindings)).collect(),
            },
            Ty::Optional(inner) => Ty::optional(inner.substitute(bindings)),
            Ty::Array(inner) => Ty::array(inner.substitute(bindings)),
            Ty::Set(inner) => Ty::set(inner.substitute(bindings)),
            Ty::Dictionary(key, value) => {
                Ty::dictionary(key.substitute(bindings), value.substitute(bindings))
            }
            Ty::Function(params, result) => Ty::function(
                params.iter().map(|param| param.substitute(bindings)).collect(),
                result.substitute(bindings),
            ),
        }
    }

    /// Displayable rendering that resolves nominal references through `arena`.
    #[must_use]
    pub fn display<'a>(&'a self, arena: &'a DeclArena) -> TyDisplay<'a> {
        TyDisplay { ty: self, arena }
    }
}

pub struct TyDisplay<'a> {
    ty: &'a Ty,
    arena: &'a DeclArena,
}

impl fmt::Display for TyDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let arena = self.arena;
        match self.ty {
            Ty::Named(name) | Ty::Param(name) => f.write_str(name),
            Ty::Nominal { decl, args } => {
                f.write_str(&arena.get(*decl).name)?;
                if !args.is_empty() {
                    f.write_str("<")?;
                    for (index, arg) in args.iter().enumerate() {
                        if index > 0 {
                            f.write_str(", ")?;
                        }
                        write!(f, "{}", arg.display(arena))?;
                    }
                    f.write_str(">")?;
                }
                Ok(())
            }
            Ty::Optional(inner) => match inner.as_ref() {
                Ty::Function(..) => write!(f, "({})?", inner.display(arena)),
                _ => write!(f, "{}?", inner.display(arena)),
            },
            Ty::Array(inner) => write!(f, "[{}]", inner.display(arena)),
            Ty::Set(inner) => write!(f, "Set<{}>", inner.display(arena)),
            Ty::Dictionary(key, value) => {
                write!(f, "[{}: {}]", key.display(arena), value.display(arena))
            }
            Ty::Function(params, result) => {
                f.write_str("(")?;
                for (index, param) in params.iter().enumerate() {
                    if index > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", param.display(arena))?;
                }
                write!(f, ") -> {}", result.display(arena))
            }
        }
    }
}

/// Literal initial values and parameter defaults.
#[derive(Clone, Debug, PartialEq)]
pub enum Literal {
    Nil,
    Bool(bool),
    Int(i64),
    Double(f64),
    String(String),
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Nil => f.write_str("nil"),
            Literal::Bool(value) => write!(f, "{value}"),
            Literal::Int(value) => write!(f, "{value}"),
            Literal::Double(value) => write!(f, "{value:?}"),
            Literal::String(value) => write!(f, "{value:?}"),
        }
    }
}
