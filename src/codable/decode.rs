//! Bodies of synthesized `init(from:)` initializers.

use super::diagnostics as diag;
use super::encode::property_for_key;
use super::{Derivation, SUPER_KEY, missing_keys};
use crate::body::{Arg, Block, ErrorDomain, Expr, Pattern, Stmt, SwitchArm};
use crate::conformance::KnownProtocol;
use crate::decl::{DeclArena, DeclId, ParamDecl, Ty, VarDecl};
use crate::diagnostics::{DiagnosticSink, DiagnosticTransaction, Span};
use crate::error::{Error, Result};

const CONTAINER: &str = "container";
const NESTED: &str = "nestedContainer";

/// `let container = try decoder.container(keyedBy: CodingKeys.self)`
fn open_container(keys: DeclId) -> Stmt {
    Stmt::Let {
        name: CONTAINER.into(),
        mutable: false,
        value: Expr::local("decoder")
            .call(
                "container",
                vec![Arg::labeled("keyedBy", Expr::Metatype(Ty::nominal(keys)))],
            )
            .try_(),
    }
}

/// `try <container>.decode(T.self, forKey: K.x)`, or `decodeIfPresent` with the
/// payload type for optionals.
fn decode_call(container: &str, ty: &Ty, key: Expr) -> Expr {
    let (method, decoded) = match ty.optional_payload() {
        Some(payload) => ("decodeIfPresent", payload.clone()),
        None => ("decode", ty.clone()),
    };
    Expr::local(container)
        .call(
            method,
            vec![
                Arg::positional(Expr::Metatype(decoded)),
                Arg::labeled("forKey", key),
            ],
        )
        .try_()
}

pub(super) fn aggregate_body(
    derivation: &Derivation<'_>,
    arena: &DeclArena,
    sink: &mut DiagnosticSink,
) -> Result<Block> {
    let keys_name = derivation.keys_name();
    let keys = derivation
        .lookup_keys_enum(arena, keys_name)
        .ok_or_else(|| missing_keys(derivation, arena, keys_name))?;
    let key_cases = arena.cases(keys);
    let skip_super = derivation.has_super_key(arena);
    let super_decodable = derivation.superclass_conforms_to(arena, KnownProtocol::Decodable);

    let mut warnings = DiagnosticTransaction::new();
    let mut stmts = Vec::new();
    if !key_cases.is_empty() || super_decodable {
        stmts.push(open_container(keys));
    }
    for key in key_cases {
        let name = arena.get(key).name.as_str();
        if skip_super && name == SUPER_KEY {
            continue;
        }
        let property = property_for_key(derivation, arena, name)?;
        let decl = arena.get(property);
        let Some(var) = decl.as_var() else { continue };
        if var.is_let() && var.is_parent_initialized() {
            warn_not_decoded(derivation, arena, keys, name, var, decl.span, &mut warnings);
            continue;
        }
        stmts.push(Stmt::Assign {
            place: Expr::SelfRef.member(&decl.name),
            value: decode_call(CONTAINER, &var.ty, Expr::key(keys, name)),
        });
    }

    if let Some(superclass) = arena.superclass_decl(derivation.nominal) {
        if super_decodable {
            // try super.init(from: container.superDecoder())
            stmts.push(Stmt::Expr(
                Expr::SuperRef
                    .call(
                        "init",
                        vec![Arg::labeled(
                            "from",
                            Expr::local(CONTAINER).call("superDecoder", Vec::new()),
                        )],
                    )
                    .try_(),
            ));
        } else {
            let init = arena
                .constructors_with_labels(superclass, &[])
                .first()
                .and_then(|ctor| arena.get(*ctor).as_constructor())
                .ok_or_else(|| {
                    Error::synthesis(format!(
                        "superclass of '{}' has no 'init()' to call",
                        derivation.type_name(arena)
                    ))
                })?;
            let call = Expr::SuperRef.call("init", Vec::new());
            stmts.push(Stmt::Expr(if init.throws { call.try_() } else { call }));
        }
    }
    // Warnings only surface once a body exists; an early `?` drops them.
    warnings.commit(sink);
    Ok(Block::new(stmts))
}

fn warn_not_decoded(
    derivation: &Derivation<'_>,
    arena: &DeclArena,
    keys: DeclId,
    name: &str,
    var: &VarDecl,
    span: Option<Span>,
    warnings: &mut DiagnosticTransaction,
) {
    let key_exists = arena.enum_case_named(keys, name).is_some();
    let encodable = derivation.conforms_to(
        arena,
        &arena.declared_type(derivation.nominal),
        KnownProtocol::Encodable,
    );
    let implicit_keys = arena.get(keys).is_implicit;
    if !implicit_keys && (encodable || !key_exists) {
        return;
    }
    warnings.push(diag::property_will_not_be_decoded(span));
    if implicit_keys {
        warnings.push(diag::init_or_implicit_keys(encodable, name, span));
    } else {
        warnings.push(diag::init_or_explicit_keys(name, span));
    }
    warnings.push(diag::make_property_mutable(span, var.introducer_span));
}

pub(super) fn union_body(derivation: &Derivation<'_>, arena: &DeclArena) -> Result<Block> {
    let keys_name = derivation.keys_name();
    let keys = derivation
        .lookup_keys_enum(arena, keys_name)
        .ok_or_else(|| missing_keys(derivation, arena, keys_name))?;
    if arena.cases(keys).is_empty() {
        return Ok(Block::default());
    }
    let enum_name = derivation.type_name(arena);

    let mut arms = Vec::new();
    for case in arena.cases(derivation.nominal) {
        let decl = arena.get(case);
        let Some(payload) = decl.as_case() else { continue };
        if arena.enum_case_named(keys, &decl.name).is_none() {
            continue;
        }
        let case_key = Expr::key(keys, &decl.name);
        let mut body = Vec::new();
        let args = if payload.params.is_empty() {
            Vec::new()
        } else if payload.has_any_unnamed_params() {
            // var nestedContainer = try container.nestedUnkeyedContainer(forKey: CodingKeys.bar)
            body.push(Stmt::Let {
                name: NESTED.into(),
                mutable: true,
                value: Expr::local(CONTAINER)
                    .call(
                        "nestedUnkeyedContainer",
                        vec![Arg::labeled("forKey", case_key)],
                    )
                    .try_(),
            });
            payload
                .params
                .iter()
                .map(|param| Arg {
                    label: param.label.clone(),
                    value: Expr::local(NESTED)
                        .call(
                            "decode",
                            vec![Arg::positional(Expr::Metatype(param.ty.clone()))],
                        )
                        .try_(),
                })
                .collect()
        } else {
            let nested_name = derivation.config.case_keys_name(keys_name, &decl.name);
            let nested = derivation
                .lookup_keys_enum(arena, &nested_name)
                .ok_or_else(|| missing_keys(derivation, arena, &nested_name))?;
            body.push(Stmt::Let {
                name: NESTED.into(),
                mutable: false,
                value: Expr::local(CONTAINER)
                    .call(
                        "nestedContainer",
                        vec![
                            Arg::labeled("keyedBy", Expr::Metatype(Ty::nominal(nested))),
                            Arg::labeled("forKey", case_key),
                        ],
                    )
                    .try_(),
            });
            payload
                .params
                .iter()
                .map(|param| labeled_payload_arg(arena, nested, &decl.name, param))
                .collect::<Result<Vec<_>>>()?
        };
        body.push(Stmt::Assign {
            place: Expr::SelfRef,
            value: Expr::CaseValue {
                enum_decl: derivation.nominal,
                case: decl.name.clone(),
                args,
            },
        });
        arms.push(SwitchArm {
            pattern: Pattern::Key {
                keys,
                case: decl.name.clone(),
            },
            body: Block::new(body),
        });
    }

    let default = Block::new(vec![Stmt::Throw(Expr::Error {
        domain: ErrorDomain::Decoding,
        kind: "valueNotFound".into(),
        subject: Box::new(Expr::Metatype(arena.declared_type(derivation.nominal))),
        coding_path: Box::new(Expr::local(CONTAINER).member("codingPath")),
        description: format!("Could not find value of type '{enum_name}'"),
    })]);

    Ok(Block::new(vec![
        open_container(keys),
        Stmt::Switch {
            subject: Expr::local(CONTAINER).member("allKeys").member("first"),
            arms,
            default: Some(default),
        },
    ]))
}

/// Argument for one labeled payload parameter: decoded when its key exists,
/// the declared default otherwise.
fn labeled_payload_arg(
    arena: &DeclArena,
    nested: DeclId,
    case_name: &str,
    param: &ParamDecl,
) -> Result<Arg> {
    let label = param.label.as_deref().unwrap_or_default();
    let value = if arena.enum_case_named(nested, label).is_some() {
        decode_call(NESTED, &param.ty, Expr::key(nested, label))
    } else if let Some(default) = &param.default {
        Expr::Literal(default.clone())
    } else {
        return Err(Error::synthesis(format!(
            "parameter '{label}' of case '{case_name}' has neither a coding key nor a default value"
        )));
    };
    Ok(Arg::labeled(label, value))
}
