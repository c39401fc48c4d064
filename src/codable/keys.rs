//! Synthesis of `CodingKeys` and per-case `CodingKeys_<case>` enumerations.

use super::diagnostics as diag;
use super::inventory::member_inventory;
use super::{Derivation, SUPER_KEY, lookup_keys_enum};
use crate::decl::{
    Access, ConformanceSite, Decl, DeclArena, DeclId, DeclKind, DeclaredConformance,
    EnumCaseDecl, NominalDecl, NominalKind,
};
use crate::diagnostics::{DiagnosticTransaction, Span};

/// Add the missing key enumerations to the derivation target.
///
/// For structs and classes the enumeration is attached only when every stored
/// property conforms; for enums, nested enumerations are attached even when
/// some payload parameter does not conform. Returns `false` when a member
/// failed to conform. Calling it again after success changes nothing.
pub fn synthesize_coding_keys(
    derivation: &Derivation<'_>,
    arena: &mut DeclArena,
    diags: &mut DiagnosticTransaction,
) -> bool {
    if derivation.is_union(arena) {
        synthesize_union_keys(derivation, arena, diags)
    } else {
        synthesize_aggregate_keys(derivation, arena, diags)
    }
}

fn synthesize_aggregate_keys(
    derivation: &Derivation<'_>,
    arena: &mut DeclArena,
    diags: &mut DiagnosticTransaction,
) -> bool {
    let keys_name = derivation.keys_name().to_string();
    if !arena.lookup_direct(derivation.nominal, &keys_name).is_empty() {
        return true;
    }
    let mut cases: Vec<(String, Option<Span>)> = Vec::new();
    if derivation.has_super_key(arena) {
        cases.push((SUPER_KEY.to_string(), None));
    }
    let mut all_conform = true;
    for member in member_inventory(arena, derivation.nominal).into_values() {
        if derivation.conforms(arena, &member.ty) {
            cases.push((member.name, member.span));
        } else {
            diags.push(diag::non_conforming_property(
                derivation.protocol,
                &arena.type_name(&member.ty),
                member.span,
            ));
            all_conform = false;
        }
    }
    if !all_conform {
        return false;
    }
    let keys = add_keys_enum(arena, derivation.nominal, &keys_name);
    for (name, span) in cases {
        add_key_case(arena, keys, &name, span);
    }
    tracing::trace!(
        target: "codable",
        stage = "keys.synthesized",
        type_name = %arena.get(derivation.nominal).name,
        keys = %keys_name,
        cases = arena.cases(keys).len(),
        "synthesized coding keys"
    );
    true
}

fn synthesize_union_keys(
    derivation: &Derivation<'_>,
    arena: &mut DeclArena,
    diags: &mut DiagnosticTransaction,
) -> bool {
    let keys_name = derivation.keys_name().to_string();
    let keys = match lookup_keys_enum(arena, derivation.nominal, &keys_name) {
        Some(keys) => keys,
        None => {
            let keys = add_keys_enum(arena, derivation.nominal, &keys_name);
            for case in arena.cases(derivation.nominal) {
                let decl = arena.get(case);
                let (name, span) = (decl.name.clone(), decl.span);
                add_key_case(arena, keys, &name, span);
            }
            keys
        }
    };

    let mut all_conform = true;
    for case in arena.cases(derivation.nominal) {
        let decl = arena.get(case);
        let Some(payload) = decl.as_case() else { continue };
        let case_name = decl.name.clone();
        if arena.enum_case_named(keys, &case_name).is_none() {
            continue;
        }
        let nested_name = derivation.config.case_keys_name(&keys_name, &case_name);
        if !arena.lookup_direct(derivation.nominal, &nested_name).is_empty() {
            continue;
        }
        // Unlabeled payloads are coded positionally.
        if payload.has_any_unnamed_params() {
            continue;
        }
        let params: Vec<_> = payload
            .params
            .iter()
            .map(|param| (param.label.clone().unwrap_or_default(), param.ty.clone(), param.span))
            .collect();
        let nested = add_keys_enum(arena, derivation.nominal, &nested_name);
        for (label, ty, span) in params {
            if derivation.conforms(arena, &ty) {
                add_key_case(arena, nested, &label, span);
            } else {
                diags.push(diag::non_conforming_property(
                    derivation.protocol,
                    &arena.type_name(&ty),
                    span,
                ));
                all_conform = false;
            }
        }
        tracing::trace!(
            target: "codable",
            stage = "keys.synthesized",
            type_name = %arena.get(derivation.nominal).name,
            keys = %nested_name,
            cases = arena.cases(nested).len(),
            "synthesized case coding keys"
        );
    }
    all_conform
}

fn add_keys_enum(arena: &mut DeclArena, parent: DeclId, name: &str) -> DeclId {
    let mut keys = NominalDecl::new(NominalKind::Enum);
    keys.conformances.push(DeclaredConformance {
        protocol: "CodingKey".into(),
        requirements: Vec::new(),
        site: ConformanceSite::TypeBody,
        span: None,
    });
    keys.file = arena.file_of(parent);
    arena.add_member(
        parent,
        Decl::new(name, DeclKind::Nominal(keys))
            .implicit()
            .with_access(Access::Private),
    )
}

fn add_key_case(arena: &mut DeclArena, keys: DeclId, name: &str, span: Option<Span>) {
    arena.add_member(
        keys,
        Decl::new(name, DeclKind::EnumCase(EnumCaseDecl::default()))
            .implicit()
            .with_span(span),
    );
}
