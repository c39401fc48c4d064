//! Checks of user-written key enumerations against the members they code.

use super::diagnostics as diag;
use super::inventory::{Inventory, case_inventory, member_inventory};
use super::{Derivation, SUPER_KEY};
use crate::config::UncoveredCasePolicy;
use crate::conformance::KnownProtocol;
use crate::decl::{DeclArena, DeclId};
use crate::diagnostics::DiagnosticTransaction;

/// Validate the key enumeration `keys` of a struct or class. Problems are
/// recorded in `diags` and make the result `false`.
pub fn validate_coding_keys(
    derivation: &Derivation<'_>,
    arena: &DeclArena,
    keys: DeclId,
    diags: &mut DiagnosticTransaction,
) -> bool {
    let inventory = member_inventory(arena, derivation.nominal);
    let allow_super = derivation.has_super_key(arena);
    validate_against(derivation, arena, keys, inventory, allow_super, diags)
}

/// Validate the nested key enumeration `keys` of one enum case.
pub fn validate_case_coding_keys(
    derivation: &Derivation<'_>,
    arena: &DeclArena,
    case: DeclId,
    keys: DeclId,
    diags: &mut DiagnosticTransaction,
) -> bool {
    let inventory = case_inventory(arena, case);
    validate_against(derivation, arena, keys, inventory, false, diags)
}

/// Validate the top-level key enumeration of an enum: every key must name a
/// case. Under [`UncoveredCasePolicy::Reject`], every case must also have a
/// key when encoding.
pub fn validate_union_coding_keys(
    derivation: &Derivation<'_>,
    arena: &DeclArena,
    keys: DeclId,
    diags: &mut DiagnosticTransaction,
) -> bool {
    let enum_name = derivation.type_name(arena);
    let mut valid = true;
    for key in arena.cases(keys) {
        let key_decl = arena.get(key);
        if arena
            .enum_case_named(derivation.nominal, &key_decl.name)
            .is_none()
        {
            diags.push(diag::extraneous_union_key(
                &key_decl.name,
                &enum_name,
                key_decl.span,
            ));
            valid = false;
        }
    }
    if derivation.protocol == KnownProtocol::Encodable
        && derivation.config.uncovered_case_policy == UncoveredCasePolicy::Reject
    {
        let keys_name = arena.get(keys).name.clone();
        for case in arena.cases(derivation.nominal) {
            let case_decl = arena.get(case);
            if arena.enum_case_named(keys, &case_decl.name).is_none() {
                diags.push(diag::uncovered_case(&case_decl.name, &keys_name, case_decl.span));
                valid = false;
            }
        }
    }
    valid
}

fn validate_against(
    derivation: &Derivation<'_>,
    arena: &DeclArena,
    keys: DeclId,
    mut inventory: Inventory,
    allow_super: bool,
    diags: &mut DiagnosticTransaction,
) -> bool {
    let mut valid = true;
    for key in arena.cases(keys) {
        let key_decl = arena.get(key);
        if allow_super && key_decl.name == SUPER_KEY {
            continue;
        }
        match inventory.get(&key_decl.name) {
            None => {
                diags.push(diag::extraneous_key(&key_decl.name, key_decl.span));
                valid = false;
            }
            Some(member) if !derivation.conforms(arena, &member.ty) => {
                diags.push(diag::non_conforming_property(
                    derivation.protocol,
                    &arena.type_name(&member.ty),
                    member.span,
                ));
                valid = false;
            }
            Some(_) => {
                inventory.shift_remove(&key_decl.name);
            }
        }
    }
    if !valid {
        return false;
    }
    if derivation.protocol == KnownProtocol::Decodable {
        for member in inventory.values().filter(|member| !member.has_default) {
            diags.push(diag::non_decoded_property(
                derivation.protocol,
                &member.name,
                member.span,
            ));
            valid = false;
        }
    }
    valid
}
