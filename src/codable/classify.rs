use super::diagnostics as diag;
use super::validate::{validate_case_coding_keys, validate_coding_keys, validate_union_coding_keys};
use super::Derivation;
use crate::conformance::KnownProtocol;
use crate::decl::{DeclArena, DeclId, DeclKind, NominalKind, Ty};
use crate::diagnostics::DiagnosticTransaction;

/// State of a type's coding-key enumerations.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Classification {
    /// A user-written enumeration is malformed; diagnostics were recorded.
    Invalid,
    /// At least one enumeration is missing and may be synthesized.
    NeedsSynthesis,
    /// Every enumeration exists and validated.
    Valid,
}

impl Classification {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Classification::Invalid => "invalid",
            Classification::NeedsSynthesis => "needs-synthesis",
            Classification::Valid => "valid",
        }
    }
}

/// Look for and check the coding-key enumerations of the derivation target.
pub fn classify_coding_keys(
    derivation: &Derivation<'_>,
    arena: &DeclArena,
    diags: &mut DiagnosticTransaction,
) -> Classification {
    if derivation.is_union(arena) {
        classify_union(derivation, arena, diags)
    } else {
        classify_aggregate(derivation, arena, diags)
    }
}

fn classify_aggregate(
    derivation: &Derivation<'_>,
    arena: &DeclArena,
    diags: &mut DiagnosticTransaction,
) -> Classification {
    let keys_name = derivation.keys_name();
    let Some(&found) = arena.lookup_direct(derivation.nominal, keys_name).first() else {
        return Classification::NeedsSynthesis;
    };
    let Some(keys) = check_keys_decl(derivation, arena, found, keys_name, diags) else {
        return Classification::Invalid;
    };
    if validate_coding_keys(derivation, arena, keys, diags) {
        Classification::Valid
    } else {
        Classification::Invalid
    }
}

fn classify_union(
    derivation: &Derivation<'_>,
    arena: &DeclArena,
    diags: &mut DiagnosticTransaction,
) -> Classification {
    let keys_name = derivation.keys_name();
    let mut needs_synthesis = false;
    let keys = match arena.lookup_direct(derivation.nominal, keys_name).first() {
        None => {
            needs_synthesis = true;
            None
        }
        Some(&found) => {
            let Some(keys) = check_keys_decl(derivation, arena, found, keys_name, diags) else {
                return Classification::Invalid;
            };
            if !validate_union_coding_keys(derivation, arena, keys, diags) {
                return Classification::Invalid;
            }
            Some(keys)
        }
    };

    let mut valid = true;
    for case in arena.cases(derivation.nominal) {
        let case_decl = arena.get(case);
        let Some(payload) = case_decl.as_case() else { continue };
        if payload.has_any_unnamed_params() {
            continue;
        }
        // Cases left out of user-written keys are never coded.
        if keys.is_some_and(|keys| arena.enum_case_named(keys, &case_decl.name).is_none()) {
            continue;
        }
        let nested_name = derivation
            .config
            .case_keys_name(keys_name, &case_decl.name);
        match arena.lookup_direct(derivation.nominal, &nested_name).first() {
            None => needs_synthesis = true,
            Some(&found) => match check_keys_decl(derivation, arena, found, &nested_name, diags) {
                None => valid = false,
                Some(nested) => {
                    valid &= validate_case_coding_keys(derivation, arena, case, nested, diags);
                }
            },
        }
    }

    if !valid {
        Classification::Invalid
    } else if needs_synthesis {
        Classification::NeedsSynthesis
    } else {
        Classification::Valid
    }
}

/// Check that the declaration found under a key-enumeration name is an enum
/// conforming to `CodingKey`, looking through a type alias. Returns the enum.
fn check_keys_decl(
    derivation: &Derivation<'_>,
    arena: &DeclArena,
    found: DeclId,
    name: &str,
    diags: &mut DiagnosticTransaction,
) -> Option<DeclId> {
    let decl = arena.get(found);
    let ty = match &decl.kind {
        DeclKind::Nominal(_) => Ty::nominal(found),
        DeclKind::TypeAlias(alias) => alias.target.clone(),
        _ => {
            diags.push(diag::keys_not_an_enum(derivation.protocol, name, decl.span));
            return None;
        }
    };
    if !derivation.conforms_to(arena, &ty, KnownProtocol::CodingKey) {
        diags.push(diag::keys_not_coding_key(derivation.protocol, name, decl.span));
        return None;
    }
    match arena.resolve_ty_decl(&ty) {
        Some(resolved) if arena.get(resolved).is_nominal_kind(NominalKind::Enum) => Some(resolved),
        _ => {
            diags.push(diag::keys_not_an_enum(derivation.protocol, name, decl.span));
            None
        }
    }
}
