//! Reference evaluator for synthesized bodies.
//!
//! Runs `encode(to:)` and `init(from:)` bodies produced by derivation against
//! in-memory keyed and unkeyed containers that read and write
//! `serde_json::Value` trees. Bodies must already be synthesized; see
//! [`crate::driver::DerivationReport::synthesize_bodies`].

mod decoder;
mod encoder;
mod error;
mod interp;
mod value;


use std::collections::HashMap;

use serde_json::Value as Json;

pub use self::error::{CodingPath, DecodingError, EncodingError, EvalError};
pub use self::value::Value;

use crate::body::Block;
use crate::decl::{DeclArena, DeclId, DeclKind, Ty};

/// A synthesized witness found by walking up from some type.
struct Witness<'a> {
    owner: DeclId,
    bindings: HashMap<String, Ty>,
    body: &'a Block,
}

pub struct Evaluator<'a> {
    arena: &'a DeclArena,
}

impl<'a> Evaluator<'a> {
    #[must_use]
    pub fn new(arena: &'a DeclArena) -> Self {
        Self { arena }
    }

    /// Encode `value` through its type's `encode(to:)`.
    pub fn encode(&self, value: &Value) -> Result<Json, EvalError> {
        tracing::trace!(target: "codable", stage = "eval.encode", kind = value.kind_name());
        self.encode_value(value, &[])
    }

    /// Decode a value of type `ty` from `input` through `init(from:)`.
    pub fn decode(&self, ty: &Ty, input: &Json) -> Result<Value, EvalError> {
        tracing::trace!(
            target: "codable",
            stage = "eval.decode",
            ty = %self.arena.type_name(ty)
        );
        self.decode_value(ty, input, &[])
    }

    /// Decode from JSON text.
    pub fn decode_str(&self, ty: &Ty, input: &str) -> Result<Value, EvalError> {
        let input: Json = serde_json::from_str(input).map_err(|err| {
            EvalError::Decoding(DecodingError::TypeMismatch {
                expected: "JSON".into(),
                path: Vec::new(),
                description: format!("The given data was not valid JSON: {err}"),
            })
        })?;
        self.decode(ty, &input)
    }

    /// The witness named `name(label:)` visible from `start`: declared on it or
    /// inherited from a superclass.
    fn witness(
        &self,
        start: DeclId,
        mut bindings: HashMap<String, Ty>,
        name: &str,
        label: &str,
    ) -> Result<Witness<'a>, EvalError> {
        let arena = self.arena;
        let mut current = start;
        for _ in 0..=arena.len() {
            for member in arena.lookup_direct(current, name) {
                let decl = arena.get(member);
                let (params, body) = match &decl.kind {
                    DeclKind::Func(func) => (&func.params, &func.body),
                    DeclKind::Constructor(ctor) => (&ctor.params, &ctor.body),
                    _ => continue,
                };
                if !matches!(params.as_slice(), [param] if param.label.as_deref() == Some(label)) {
                    continue;
                }
                let owner_name = &arena.get(current).name;
                let body = body.as_ref().ok_or_else(|| {
                    EvalError::unsupported(format!(
                        "'{}' of '{owner_name}' is user-written",
                        decl.full_name()
                    ))
                })?;
                let body = body.get().ok_or_else(|| {
                    EvalError::unsupported(format!(
                        "'{}' of '{owner_name}' has not been synthesized",
                        decl.full_name()
                    ))
                })?;
                return Ok(Witness {
                    owner: current,
                    bindings,
                    body,
                });
            }
            match self.superclass_of(current, &bindings) {
                Some((superclass, inherited)) => {
                    current = superclass;
                    bindings = inherited;
                }
                None => break,
            }
        }
        Err(EvalError::unsupported(format!(
            "'{}' has no '{name}({label}:)'",
            arena.get(start).name
        )))
    }

    /// Superclass of `class` with its generic arguments bound in terms of
    /// `bindings`.
    fn superclass_of(
        &self,
        class: DeclId,
        bindings: &HashMap<String, Ty>,
    ) -> Option<(DeclId, HashMap<String, Ty>)> {
        let superclass = self
            .arena
            .nominal(class)?
            .superclass
            .as_ref()?
            .substitute(bindings);
        let decl = self.arena.resolve_ty_decl(&superclass)?;
        Some((decl, self.arena.generic_bindings(&superclass)))
    }
}
