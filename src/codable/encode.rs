//! Bodies of synthesized `encode(to:)` methods.

use super::{Derivation, SUPER_KEY, missing_keys};
use crate::body::{Arg, Binding, Block, ErrorDomain, Expr, Pattern, Stmt, SwitchArm};
use crate::config::UncoveredCasePolicy;
use crate::conformance::KnownProtocol;
use crate::decl::{DeclArena, DeclId, Ty};
use crate::error::{Error, Result};

const CONTAINER: &str = "container";
const NESTED: &str = "nestedContainer";

/// `var container = encoder.container(keyedBy: CodingKeys.self)`
fn open_container(keys: DeclId) -> Stmt {
    Stmt::Let {
        name: CONTAINER.into(),
        mutable: true,
        value: Expr::local("encoder").call(
            "container",
            vec![Arg::labeled("keyedBy", Expr::Metatype(Ty::nominal(keys)))],
        ),
    }
}

/// Stored property backing the key `name`: the wrapper backing store for a
/// wrapped property, the property itself otherwise.
pub(super) fn property_for_key(
    derivation: &Derivation<'_>,
    arena: &DeclArena,
    name: &str,
) -> Result<DeclId> {
    arena
        .lookup_direct(derivation.nominal, name)
        .into_iter()
        .filter_map(|id| {
            let var = arena.get(id).as_var()?;
            if var.is_static {
                return None;
            }
            Some(var.wrapper_backing.unwrap_or(id))
        })
        .next()
        .ok_or_else(|| {
            Error::synthesis(format!(
                "no stored property of '{}' matches key '{name}'",
                derivation.type_name(arena)
            ))
        })
}

pub(super) fn aggregate_body(derivation: &Derivation<'_>, arena: &DeclArena) -> Result<Block> {
    let keys_name = derivation.keys_name();
    let keys = derivation
        .lookup_keys_enum(arena, keys_name)
        .ok_or_else(|| missing_keys(derivation, arena, keys_name))?;
    let skip_super = derivation.has_super_key(arena);

    let mut stmts = vec![open_container(keys)];
    for key in arena.cases(keys) {
        let name = arena.get(key).name.as_str();
        if skip_super && name == SUPER_KEY {
            continue;
        }
        let property = property_for_key(derivation, arena, name)?;
        let decl = arena.get(property);
        let optional = decl.as_var().is_some_and(|var| var.ty.is_optional());
        let method = if optional { "encodeIfPresent" } else { "encode" };
        stmts.push(Stmt::Expr(
            Expr::local(CONTAINER)
                .call(
                    method,
                    vec![
                        Arg::positional(Expr::SelfRef.member(&decl.name)),
                        Arg::labeled("forKey", Expr::key(keys, name)),
                    ],
                )
                .try_(),
        ));
    }
    if derivation.superclass_conforms_to(arena, KnownProtocol::Encodable) {
        // try super.encode(to: container.superEncoder())
        stmts.push(Stmt::Expr(
            Expr::SuperRef
                .call(
                    "encode",
                    vec![Arg::labeled(
                        "to",
                        Expr::local(CONTAINER).call("superEncoder", Vec::new()),
                    )],
                )
                .try_(),
        ));
    }
    Ok(Block::new(stmts))
}

pub(super) fn union_body(derivation: &Derivation<'_>, arena: &DeclArena) -> Result<Block> {
    let keys_name = derivation.keys_name();
    let keys = derivation
        .lookup_keys_enum(arena, keys_name)
        .ok_or_else(|| missing_keys(derivation, arena, keys_name))?;
    let enum_name = derivation.type_name(arena);

    let mut arms = Vec::new();
    for case in arena.cases(derivation.nominal) {
        let decl = arena.get(case);
        let Some(payload) = decl.as_case() else { continue };
        if arena.enum_case_named(keys, &decl.name).is_none() {
            match derivation.config.uncovered_case_policy {
                UncoveredCasePolicy::RuntimeError => arms.push(SwitchArm {
                    pattern: Pattern::EnumCase {
                        enum_decl: derivation.nominal,
                        case: decl.name.clone(),
                        bindings: Vec::new(),
                    },
                    body: Block::new(vec![Stmt::Throw(Expr::Error {
                        domain: ErrorDomain::Encoding,
                        kind: "invalidValue".into(),
                        subject: Box::new(Expr::SelfRef),
                        coding_path: Box::new(Expr::local("encoder").member("codingPath")),
                        description: format!(
                            "Case '{}' of '{enum_name}' cannot be encoded because it has no coding key",
                            decl.name
                        ),
                    })]),
                }),
                UncoveredCasePolicy::Reject => {}
            }
            continue;
        }

        // Payload locals are named by position; labels never become locals.
        let bindings: Vec<Binding> = payload
            .params
            .iter()
            .enumerate()
            .map(|(index, param)| Binding {
                label: param.label.clone(),
                name: format!("a{index}"),
            })
            .collect();
        let case_key = Expr::key(keys, &decl.name);
        let mut body = Vec::new();
        if payload.has_any_unnamed_params() {
            // var nestedContainer = container.nestedUnkeyedContainer(forKey: CodingKeys.bar)
            body.push(Stmt::Let {
                name: NESTED.into(),
                mutable: true,
                value: Expr::local(CONTAINER).call(
                    "nestedUnkeyedContainer",
                    vec![Arg::labeled("forKey", case_key)],
                ),
            });
            for binding in &bindings {
                body.push(Stmt::Expr(
                    Expr::local(NESTED)
                        .call("encode", vec![Arg::positional(Expr::local(&binding.name))])
                        .try_(),
                ));
            }
        } else {
            let nested_name = derivation.config.case_keys_name(keys_name, &decl.name);
            let nested = derivation
                .lookup_keys_enum(arena, &nested_name)
                .ok_or_else(|| missing_keys(derivation, arena, &nested_name))?;
            body.push(Stmt::Let {
                name: NESTED.into(),
                mutable: true,
                value: Expr::local(CONTAINER).call(
                    "nestedContainer",
                    vec![
                        Arg::labeled("keyedBy", Expr::Metatype(Ty::nominal(nested))),
                        Arg::labeled("forKey", case_key),
                    ],
                ),
            });
            for (param, binding) in payload.params.iter().zip(&bindings) {
                let Some(label) = param.label.as_deref() else { continue };
                if arena.enum_case_named(nested, label).is_none() {
                    continue;
                }
                let method = if param.ty.is_optional() {
                    "encodeIfPresent"
                } else {
                    "encode"
                };
                body.push(Stmt::Expr(
                    Expr::local(NESTED)
                        .call(
                            method,
                            vec![
                                Arg::positional(Expr::local(&binding.name)),
                                Arg::labeled("forKey", Expr::key(nested, label)),
                            ],
                        )
                        .try_(),
                ));
            }
        }
        arms.push(SwitchArm {
            pattern: Pattern::EnumCase {
                enum_decl: derivation.nominal,
                case: decl.name.clone(),
                bindings,
            },
            body: Block::new(body),
        });
    }

    Ok(Block::new(vec![
        open_container(keys),
        Stmt::Switch {
            subject: Expr::SelfRef,
            arms,
            default: None,
        },
    ]))
}
