//! Value decoding and the checks behind keyed and unkeyed decoding
//! containers.

use indexmap::IndexMap;
use serde_json::{Map, Value as Json};

use super::error::{DecodingError, EvalError, child_path, index_key};
use super::interp::{Frame, Interp, Slot};
use super::value::Value;
use super::Evaluator;
use crate::decl::{DeclId, NominalKind, Ty};

fn json_kind(json: &Json) -> &'static str {
    match json {
        Json::Null => "a null value",
        Json::Bool(_) => "a bool",
        Json::Number(_) => "a number",
        Json::String(_) => "a string",
        Json::Array(_) => "an array",
        Json::Object(_) => "a dictionary",
    }
}

pub(super) fn type_mismatch(expected: &str, found: &Json, path: &[String]) -> EvalError {
    DecodingError::TypeMismatch {
        expected: expected.to_string(),
        path: path.to_vec(),
        description: format!(
            "Expected to decode {expected} but found {} instead.",
            json_kind(found)
        ),
    }
    .into()
}

/// Entries of a keyed container opened over `input`.
pub(super) fn keyed_entries(input: &Json, path: &[String]) -> Result<Map<String, Json>, EvalError> {
    match input {
        Json::Object(entries) => Ok(entries.clone()),
        Json::Null => Err(DecodingError::ValueNotFound {
            ty: "KeyedDecodingContainer".into(),
            path: path.to_vec(),
            description: "Cannot get keyed decoding container -- found null value instead."
                .into(),
        }
        .into()),
        other => Err(type_mismatch("Dictionary<String, Any>", other, path)),
    }
}

/// Items of an unkeyed container opened over `input`.
pub(super) fn unkeyed_items(input: &Json, path: &[String]) -> Result<Vec<Json>, EvalError> {
    match input {
        Json::Array(items) => Ok(items.clone()),
        Json::Null => Err(DecodingError::ValueNotFound {
            ty: "UnkeyedDecodingContainer".into(),
            path: path.to_vec(),
            description: "Cannot get unkeyed decoding container -- found null value instead."
                .into(),
        }
        .into()),
        other => Err(type_mismatch("Array<Any>", other, path)),
    }
}

fn decode_scalar(name: &str, input: &Json, path: &[String]) -> Result<Value, EvalError> {
    let decoded = match name {
        "Int" | "Int8" | "Int16" | "Int32" | "Int64" | "UInt" | "UInt8" | "UInt16" | "UInt32"
        | "UInt64" => input.as_i64().map(Value::Int),
        "Double" | "Float" => input.as_f64().map(Value::Double),
        "Bool" => input.as_bool().map(Value::Bool),
        "String" => input.as_str().map(Value::string),
        other => {
            return Err(EvalError::unsupported(format!(
                "no runtime representation for '{other}'"
            )));
        }
    };
    decoded.ok_or_else(|| type_mismatch(name, input, path))
}

impl Evaluator<'_> {
    pub(super) fn decode_value(&self, ty: &Ty, input: &Json, path: &[String]) -> Result<Value, EvalError> {
        if let Some(payload) = ty.optional_payload() {
            if input.is_null() {
                return Ok(Value::Nil);
            }
            return self.decode_value(payload, input, path);
        }
        if input.is_null() {
            let ty = self.arena.type_name(ty);
            return Err(DecodingError::ValueNotFound {
                description: format!("Expected {ty} value but found null instead."),
                ty,
                path: path.to_vec(),
            }
            .into());
        }
        match ty {
            Ty::Named(name) => decode_scalar(name, input, path),
            Ty::Array(element) | Ty::Set(element) => {
                let Json::Array(items) = input else {
                    return Err(type_mismatch(&self.arena.type_name(ty), input, path));
                };
                items
                    .iter()
                    .enumerate()
                    .map(|(index, item)| {
                        self.decode_value(element, item, &child_path(path, &index_key(index)))
                    })
                    .collect::<Result<Vec<_>, _>>()
                    .map(Value::Array)
            }
            Ty::Dictionary(key_ty, value_ty) => {
                if !matches!(key_ty.as_ref(), Ty::Named(name) if name == "String") {
                    return Err(EvalError::unsupported(format!(
                        "dictionary keys of type '{}'",
                        self.arena.type_name(key_ty)
                    )));
                }
                let Json::Object(entries) = input else {
                    return Err(type_mismatch(&self.arena.type_name(ty), input, path));
                };
                entries
                    .iter()
                    .map(|(key, item)| {
                        Ok((key.clone(), self.decode_value(value_ty, item, &child_path(path, key))?))
                    })
                    .collect::<Result<IndexMap<_, _>, EvalError>>()
                    .map(Value::Dictionary)
            }
            Ty::Nominal { .. } => self.decode_nominal(ty, input, path),
            Ty::Param(name) => Err(EvalError::unsupported(format!(
                "generic parameter '{name}' is not bound"
            ))),
            Ty::Optional(_) | Ty::Function(..) => Err(EvalError::unsupported(format!(
                "'{}' is not decodable",
                self.arena.type_name(ty)
            ))),
        }
    }

    fn decode_nominal(&self, ty: &Ty, input: &Json, path: &[String]) -> Result<Value, EvalError> {
        let type_name = self.arena.type_name(ty);
        let decl = self.arena.resolve_ty_decl(ty).ok_or_else(|| {
            EvalError::unsupported(format!("'{type_name}' does not name a nominal type"))
        })?;
        let witness = self.witness(decl, self.arena.generic_bindings(ty), "init", "from")?;
        let mut this = if self.arena.get(decl).is_nominal_kind(NominalKind::Enum) {
            Value::Nil
        } else {
            Value::Object {
                ty: ty.clone(),
                fields: self.initial_fields(decl),
            }
        };
        let mut interp = Interp::new(self, path.to_vec());
        let mut frame = Frame::new(
            witness.owner,
            witness.bindings,
            ty.clone(),
            &mut this,
            "decoder",
            Slot::Decoder {
                input: input.clone(),
                path: path.to_vec(),
            },
        );
        interp.run_block(witness.body, &mut frame)?;
        // An enum whose initializer body is empty never assigns `self`.
        if this == Value::Nil {
            return Err(DecodingError::ValueNotFound {
                description: format!("Could not find value of type '{type_name}'"),
                ty: type_name,
                path: path.to_vec(),
            }
            .into());
        }
        Ok(this)
    }

    /// Values stored properties hold before `init(from:)` runs, superclass
    /// properties first.
    fn initial_fields(&self, decl: DeclId) -> IndexMap<String, Value> {
        let mut chain = vec![decl];
        while let Some(superclass) = chain.last().and_then(|last| self.arena.superclass_decl(*last)) {
            if chain.contains(&superclass) {
                break;
            }
            chain.push(superclass);
        }
        let mut fields = IndexMap::new();
        for class in chain.into_iter().rev() {
            for property in self.arena.stored_properties(class) {
                let decl = self.arena.get(property);
                let Some(var) = decl.as_var() else { continue };
                if !var.is_user_accessible() {
                    continue;
                }
                let initial = match &var.initial_value {
                    Some(literal) => Value::from(literal),
                    None if var.is_default_initializable() => Value::Nil,
                    None => continue,
                };
                fields.insert(decl.name.clone(), initial);
            }
        }
        fields
    }
}
