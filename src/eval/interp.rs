//! Tree-walking execution of synthesized bodies.

use std::collections::HashMap;

use serde_json::{Map, Value as Json};

use super::decoder::{keyed_entries, unkeyed_items};
use super::encoder::{Container, EncodingTree, NodeId};
use super::error::{
    CodingPath, DecodingError, EncodingError, EvalError, child_path, index_key,
};
use super::value::Value;
use super::Evaluator;
use crate::body::{Arg, Block, ErrorDomain, Expr, Pattern, Stmt};
use crate::codable::SUPER_KEY;
use crate::decl::{DeclId, Ty};

/// Runtime contents of a local or of an intermediate expression.
#[derive(Clone, Debug)]
pub(super) enum Slot {
    Unit,
    Value(Value),
    Metatype(Ty),
    Key(String),
    Encoder(NodeId),
    KeyedEncoder(NodeId),
    UnkeyedEncoder(NodeId),
    Decoder {
        input: Json,
        path: CodingPath,
    },
    KeyedDecoder {
        entries: Map<String, Json>,
        keys: DeclId,
        path: CodingPath,
    },
    UnkeyedDecoder {
        items: Vec<Json>,
        index: usize,
        path: CodingPath,
    },
    AllKeys(Vec<String>),
    FirstKey(Option<String>),
    CodingPath(CodingPath),
    Error(EvalError),
}

impl Slot {
    fn describe(&self) -> &'static str {
        match self {
            Slot::Unit => "()",
            Slot::Value(value) => value.kind_name(),
            Slot::Metatype(_) => "metatype",
            Slot::Key(_) => "coding key",
            Slot::Encoder(_) => "encoder",
            Slot::KeyedEncoder(_) => "keyed encoding container",
            Slot::UnkeyedEncoder(_) => "unkeyed encoding container",
            Slot::Decoder { .. } => "decoder",
            Slot::KeyedDecoder { .. } => "keyed decoding container",
            Slot::UnkeyedDecoder { .. } => "unkeyed decoding container",
            Slot::AllKeys(_) => "key list",
            Slot::FirstKey(_) => "optional coding key",
            Slot::CodingPath(_) => "coding path",
            Slot::Error(_) => "error",
        }
    }
}

/// Locals and `self` of one executing body.
pub(super) struct Frame<'v> {
    /// Type declaring the executing witness.
    owner: DeclId,
    bindings: HashMap<String, Ty>,
    /// Dynamic type of `self`.
    self_ty: Ty,
    locals: HashMap<String, Slot>,
    this: &'v mut Value,
}

impl<'v> Frame<'v> {
    pub(super) fn new(
        owner: DeclId,
        bindings: HashMap<String, Ty>,
        self_ty: Ty,
        this: &'v mut Value,
        parameter: &str,
        argument: Slot,
    ) -> Self {
        let mut locals = HashMap::new();
        locals.insert(parameter.to_string(), argument);
        Self {
            owner,
            bindings,
            self_ty,
            locals,
            this,
        }
    }
}

/// Evaluated call arguments.
struct Arguments(Vec<(Option<String>, Slot)>);

impl Arguments {
    fn positional(&self) -> Result<&Slot, EvalError> {
        self.0
            .iter()
            .find(|(label, _)| label.is_none())
            .map(|(_, slot)| slot)
            .ok_or_else(|| EvalError::unsupported("missing positional argument"))
    }

    fn labeled(&self, label: &str) -> Result<&Slot, EvalError> {
        self.0
            .iter()
            .find(|(candidate, _)| candidate.as_deref() == Some(label))
            .map(|(_, slot)| slot)
            .ok_or_else(|| EvalError::unsupported(format!("missing argument '{label}:'")))
    }

    fn value(&self) -> Result<&Value, EvalError> {
        match self.positional()? {
            Slot::Value(value) => Ok(value),
            other => Err(EvalError::unsupported(format!(
                "expected a value argument, found {}",
                other.describe()
            ))),
        }
    }

    fn key(&self) -> Result<&str, EvalError> {
        match self.labeled("forKey")? {
            Slot::Key(key) => Ok(key),
            other => Err(EvalError::unsupported(format!(
                "expected a coding key, found {}",
                other.describe()
            ))),
        }
    }

    fn metatype(&self, label: Option<&str>) -> Result<&Ty, EvalError> {
        let slot = match label {
            Some(label) => self.labeled(label)?,
            None => self.positional()?,
        };
        match slot {
            Slot::Metatype(ty) => Ok(ty),
            other => Err(EvalError::unsupported(format!(
                "expected a metatype, found {}",
                other.describe()
            ))),
        }
    }
}

fn into_value(slot: Slot) -> Result<Value, EvalError> {
    match slot {
        Slot::Value(value) => Ok(value),
        other => Err(EvalError::unsupported(format!(
            "expected a value, found {}",
            other.describe()
        ))),
    }
}

pub(super) struct Interp<'e, 'a> {
    eval: &'e Evaluator<'a>,
    tree: EncodingTree,
}

impl<'e, 'a> Interp<'e, 'a> {
    pub(super) fn new(eval: &'e Evaluator<'a>, path: CodingPath) -> Self {
        Self {
            eval,
            tree: EncodingTree::new(path),
        }
    }

    pub(super) fn into_json(self) -> Json {
        self.tree.into_json()
    }

    pub(super) fn run_block(&mut self, block: &Block, frame: &mut Frame<'_>) -> Result<(), EvalError> {
        for stmt in &block.stmts {
            self.exec(stmt, frame)?;
        }
        Ok(())
    }

    fn exec(&mut self, stmt: &Stmt, frame: &mut Frame<'_>) -> Result<(), EvalError> {
        match stmt {
            Stmt::Let { name, value, .. } => {
                let slot = self.eval(value, frame)?;
                frame.locals.insert(name.clone(), slot);
                Ok(())
            }
            Stmt::Expr(expr) => self.eval(expr, frame).map(|_| ()),
            Stmt::Assign { place, value } => {
                let value = into_value(self.eval(value, frame)?)?;
                assign(place, value, frame)
            }
            Stmt::Switch {
                subject,
                arms,
                default,
            } => {
                let subject = self.eval(subject, frame)?;
                for arm in arms {
                    if bind_pattern(&arm.pattern, &subject, frame) {
                        return self.run_block(&arm.body, frame);
                    }
                }
                match default {
                    Some(block) => self.run_block(block, frame),
                    None => Err(EvalError::unsupported(format!(
                        "no switch arm matches {}",
                        subject.describe()
                    ))),
                }
            }
            Stmt::Throw(expr) => match self.eval(expr, frame)? {
                Slot::Error(error) => Err(error),
                other => Err(EvalError::unsupported(format!(
                    "cannot throw {}",
                    other.describe()
                ))),
            },
        }
    }

    fn eval(&mut self, expr: &Expr, frame: &mut Frame<'_>) -> Result<Slot, EvalError> {
        match expr {
            Expr::Local(name) => frame
                .locals
                .get(name)
                .cloned()
                .ok_or_else(|| EvalError::unsupported(format!("unbound local '{name}'"))),
            Expr::SelfRef => Ok(Slot::Value(frame.this.clone())),
            Expr::SuperRef => Err(EvalError::unsupported(
                "'super' is only valid as a call receiver",
            )),
            Expr::Member { base, name } => self.member(base, name, frame),
            Expr::Metatype(ty) => Ok(Slot::Metatype(ty.substitute(&frame.bindings))),
            Expr::Key { case, .. } => Ok(Slot::Key(case.clone())),
            Expr::Call {
                receiver,
                method,
                args,
            } => self.call(receiver, method, args, frame),
            Expr::Try(inner) => self.eval(inner, frame),
            Expr::CaseValue {
                enum_decl,
                case,
                args,
            } => {
                let payload = args
                    .iter()
                    .map(|arg| self.eval(&arg.value, frame).and_then(into_value))
                    .collect::<Result<Vec<_>, _>>()?;
                let ty = if frame.self_ty.nominal_decl() == Some(*enum_decl) {
                    frame.self_ty.clone()
                } else {
                    Ty::nominal(*enum_decl)
                };
                Ok(Slot::Value(Value::case(ty, case, payload)))
            }
            Expr::Literal(literal) => Ok(Slot::Value(Value::from(literal))),
            Expr::Error {
                domain,
                kind,
                subject,
                coding_path,
                description,
            } => {
                let ty = match subject.as_ref() {
                    Expr::Metatype(ty) => ty.substitute(&frame.bindings),
                    _ => frame.self_ty.clone(),
                };
                let ty = self.eval.arena.type_name(&ty);
                let path = match self.eval(coding_path, frame)? {
                    Slot::CodingPath(path) => path,
                    other => {
                        return Err(EvalError::unsupported(format!(
                            "expected a coding path, found {}",
                            other.describe()
                        )));
                    }
                };
                let description = description.clone();
                let error = match (domain, kind.as_str()) {
                    (ErrorDomain::Decoding, "valueNotFound") => DecodingError::ValueNotFound {
                        ty,
                        path,
                        description,
                    }
                    .into(),
                    (ErrorDomain::Encoding, "invalidValue") => EncodingError::InvalidValue {
                        ty,
                        path,
                        description,
                    }
                    .into(),
                    (domain, kind) => {
                        return Err(EvalError::unsupported(format!(
                            "no runtime support for '{}.{kind}'",
                            domain.type_name()
                        )));
                    }
                };
                Ok(Slot::Error(error))
            }
        }
    }

    fn member(&mut self, base: &Expr, name: &str, frame: &mut Frame<'_>) -> Result<Slot, EvalError> {
        if matches!(base, Expr::SelfRef) {
            return frame
                .this
                .field(name)
                .cloned()
                .map(Slot::Value)
                .ok_or_else(|| {
                    EvalError::unsupported(format!(
                        "'{}' holds no value for '{name}'",
                        self.eval.arena.type_name(&frame.self_ty)
                    ))
                });
        }
        let arena = self.eval.arena;
        match (self.eval(base, frame)?, name) {
            (
                Slot::Encoder(node) | Slot::KeyedEncoder(node) | Slot::UnkeyedEncoder(node),
                "codingPath",
            ) => Ok(Slot::CodingPath(self.tree.path(node).clone())),
            (
                Slot::Decoder { path, .. }
                | Slot::KeyedDecoder { path, .. }
                | Slot::UnkeyedDecoder { path, .. },
                "codingPath",
            ) => Ok(Slot::CodingPath(path)),
            // Input order, restricted to keys the enumeration declares.
            (Slot::KeyedDecoder { entries, keys, .. }, "allKeys") => Ok(Slot::AllKeys(
                entries
                    .keys()
                    .filter(|key| arena.enum_case_named(keys, key).is_some())
                    .cloned()
                    .collect(),
            )),
            (Slot::AllKeys(keys), "first") => Ok(Slot::FirstKey(keys.into_iter().next())),
            (other, name) => Err(EvalError::unsupported(format!(
                "no member '{name}' on {}",
                other.describe()
            ))),
        }
    }

    fn call(
        &mut self,
        receiver: &Expr,
        method: &str,
        args: &[Arg],
        frame: &mut Frame<'_>,
    ) -> Result<Slot, EvalError> {
        if matches!(receiver, Expr::SuperRef) {
            return self.call_super(method, args, frame);
        }
        let mut evaluated = Vec::with_capacity(args.len());
        for arg in args {
            evaluated.push((arg.label.clone(), self.eval(&arg.value, frame)?));
        }
        let args = Arguments(evaluated);
        // Containers are stateful; call through the local itself.
        if let Expr::Local(name) = receiver {
            let slot = frame
                .locals
                .get_mut(name)
                .ok_or_else(|| EvalError::unsupported(format!("unbound local '{name}'")))?;
            return self.call_slot(slot, method, &args);
        }
        let mut slot = self.eval(receiver, frame)?;
        self.call_slot(&mut slot, method, &args)
    }

    fn call_slot(&mut self, slot: &mut Slot, method: &str, args: &Arguments) -> Result<Slot, EvalError> {
        let arena = self.eval.arena;
        match (slot, method) {
            (Slot::Encoder(node), "container") => {
                self.tree.keyed(*node)?;
                Ok(Slot::KeyedEncoder(*node))
            }
            (Slot::KeyedEncoder(node), "encode" | "encodeIfPresent") => {
                let value = args.value()?;
                if method == "encodeIfPresent" && *value == Value::Nil {
                    return Ok(Slot::Unit);
                }
                let key = args.key()?;
                let json = self
                    .eval
                    .encode_value(value, &child_path(self.tree.path(*node), key))?;
                self.tree.insert_leaf(*node, key, json)?;
                Ok(Slot::Unit)
            }
            (Slot::KeyedEncoder(node), "nestedContainer") => Ok(Slot::KeyedEncoder(
                self.tree.insert_container(*node, args.key()?, Container::Keyed)?,
            )),
            (Slot::KeyedEncoder(node), "nestedUnkeyedContainer") => Ok(Slot::UnkeyedEncoder(
                self.tree.insert_container(*node, args.key()?, Container::Unkeyed)?,
            )),
            (Slot::KeyedEncoder(node), "superEncoder") => Ok(Slot::Encoder(
                self.tree.insert_container(*node, SUPER_KEY, Container::Pending)?,
            )),
            (Slot::UnkeyedEncoder(node), "encode") => {
                let index = self.tree.unkeyed_len(*node)?;
                let path = child_path(self.tree.path(*node), &index_key(index));
                let json = self.eval.encode_value(args.value()?, &path)?;
                self.tree.push_leaf(*node, json)?;
                Ok(Slot::Unit)
            }
            (Slot::Decoder { input, path }, "container") => {
                let keys = keys_decl(self.eval, args.metatype(Some("keyedBy"))?)?;
                Ok(Slot::KeyedDecoder {
                    entries: keyed_entries(input, path)?,
                    keys,
                    path: path.clone(),
                })
            }
            (Slot::KeyedDecoder { entries, path, .. }, "decode" | "decodeIfPresent") => {
                let ty = args.metatype(None)?;
                let key = args.key()?;
                let if_present = method == "decodeIfPresent";
                match entries.get(key) {
                    None | Some(Json::Null) if if_present => Ok(Slot::Value(Value::Nil)),
                    None => Err(DecodingError::KeyNotFound {
                        key: key.to_string(),
                        path: path.clone(),
                    }
                    .into()),
                    Some(input) => self
                        .eval
                        .decode_value(ty, input, &child_path(path, key))
                        .map(Slot::Value),
                }
            }
            (Slot::KeyedDecoder { entries, path, .. }, "nestedContainer") => {
                let keys = keys_decl(self.eval, args.metatype(Some("keyedBy"))?)?;
                let key = args.key()?;
                let input = nested_input(entries, key, path)?;
                let path = child_path(path, key);
                Ok(Slot::KeyedDecoder {
                    entries: keyed_entries(input, &path)?,
                    keys,
                    path,
                })
            }
            (Slot::KeyedDecoder { entries, path, .. }, "nestedUnkeyedContainer") => {
                let key = args.key()?;
                let input = nested_input(entries, key, path)?;
                let path = child_path(path, key);
                Ok(Slot::UnkeyedDecoder {
                    items: unkeyed_items(input, &path)?,
                    index: 0,
                    path,
                })
            }
            (Slot::KeyedDecoder { entries, path, .. }, "superDecoder") => Ok(Slot::Decoder {
                input: entries.get(SUPER_KEY).cloned().unwrap_or(Json::Null),
                path: child_path(path, SUPER_KEY),
            }),
            (Slot::UnkeyedDecoder { items, index, path }, "decode") => {
                let ty = args.metatype(None)?;
                let item_path = child_path(path, &index_key(*index));
                let Some(input) = items.get(*index) else {
                    return Err(DecodingError::ValueNotFound {
                        ty: arena.type_name(ty),
                        path: item_path,
                        description: "Unkeyed container is at end.".into(),
                    }
                    .into());
                };
                let value = self.eval.decode_value(ty, input, &item_path)?;
                *index += 1;
                Ok(Slot::Value(value))
            }
            (slot, method) => Err(EvalError::unsupported(format!(
                "no runtime support for '{method}' on {}",
                slot.describe()
            ))),
        }
    }

    /// `super.encode(to:)`, `super.init(from:)` and `super.init()`.
    fn call_super(&mut self, method: &str, args: &[Arg], frame: &mut Frame<'_>) -> Result<Slot, EvalError> {
        let (label, parameter) = match (method, args) {
            // Stored properties already hold their initial values.
            ("init", []) => return Ok(Slot::Unit),
            ("init", [_]) => ("from", "decoder"),
            ("encode", [_]) => ("to", "encoder"),
            _ => {
                return Err(EvalError::unsupported(format!(
                    "no runtime support for 'super.{method}'"
                )));
            }
        };
        let argument = match args {
            [arg] => self.eval(&arg.value, frame)?,
            _ => return Err(EvalError::unsupported("missing argument")),
        };
        let (superclass, bindings) = self
            .eval
            .superclass_of(frame.owner, &frame.bindings)
            .ok_or_else(|| {
                EvalError::unsupported(format!(
                    "'{}' has no superclass",
                    self.eval.arena.get(frame.owner).name
                ))
            })?;
        let witness = self.eval.witness(superclass, bindings, method, label)?;
        let mut inner = Frame::new(
            witness.owner,
            witness.bindings,
            frame.self_ty.clone(),
            &mut *frame.this,
            parameter,
            argument,
        );
        self.run_block(witness.body, &mut inner)?;
        Ok(Slot::Unit)
    }
}

fn keys_decl(eval: &Evaluator<'_>, ty: &Ty) -> Result<DeclId, EvalError> {
    eval.arena.resolve_ty_decl(ty).ok_or_else(|| {
        EvalError::unsupported(format!(
            "'{}' is not a coding-key enumeration",
            eval.arena.type_name(ty)
        ))
    })
}

fn nested_input<'j>(entries: &'j Map<String, Json>, key: &str, path: &[String]) -> Result<&'j Json, EvalError> {
    entries.get(key).ok_or_else(|| {
        DecodingError::KeyNotFound {
            key: key.to_string(),
            path: path.to_vec(),
        }
        .into()
    })
}

fn bind_pattern(pattern: &Pattern, subject: &Slot, frame: &mut Frame<'_>) -> bool {
    match (pattern, subject) {
        (
            Pattern::EnumCase { case, bindings, .. },
            Slot::Value(Value::Case {
                case: actual,
                payload,
                ..
            }),
        ) if case == actual => {
            for (binding, value) in bindings.iter().zip(payload) {
                frame
                    .locals
                    .insert(binding.name.clone(), Slot::Value(value.clone()));
            }
            true
        }
        (Pattern::Key { case, .. }, Slot::FirstKey(Some(actual))) => case == actual,
        _ => false,
    }
}

fn assign(place: &Expr, value: Value, frame: &mut Frame<'_>) -> Result<(), EvalError> {
    match place {
        Expr::SelfRef => {
            *frame.this = value;
            Ok(())
        }
        Expr::Member { base, name } if matches!(base.as_ref(), Expr::SelfRef) => {
            match &mut *frame.this {
                Value::Object { fields, .. } => {
                    fields.insert(name.clone(), value);
                    Ok(())
                }
                other => Err(EvalError::unsupported(format!(
                    "cannot assign '{name}' on {}",
                    other.kind_name()
                ))),
            }
        }
        _ => Err(EvalError::unsupported("unsupported assignment target")),
    }
}
