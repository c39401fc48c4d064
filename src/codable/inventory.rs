//! Coding-relevant members of a type or enum case, keyed by coding name.

use indexmap::IndexMap;

use crate::decl::{DeclArena, DeclId, Ty};
use crate::diagnostics::Span;

/// A stored property or case payload parameter that takes part in coding.
#[derive(Clone, Debug, PartialEq)]
pub struct CodingMember {
    /// Storage declaration: the backing store for wrapped properties, the enum
    /// case for payload parameters.
    pub decl: DeclId,
    pub name: String,
    pub ty: Ty,
    pub span: Option<Span>,
    /// Receives a value without being decoded.
    pub has_default: bool,
}

/// Ordered map from coding name to member.
pub type Inventory = IndexMap<String, CodingMember>;

/// Name a stored property is coded under: the original property for a wrapper
/// backing store, the property itself otherwise.
#[must_use]
pub fn coding_name(arena: &DeclArena, var: DeclId) -> String {
    let decl = arena.get(var);
    decl.as_var()
        .and_then(|v| v.wrapped_original)
        .map(|original| arena.get(original).name.clone())
        .unwrap_or_else(|| decl.name.clone())
}

/// Stored instance properties of `nominal` visible to coding.
#[must_use]
pub fn member_inventory(arena: &DeclArena, nominal: DeclId) -> Inventory {
    let mut inventory = Inventory::new();
    for id in arena.stored_properties(nominal) {
        let decl = arena.get(id);
        let Some(var) = decl.as_var() else { continue };
        if !var.is_user_accessible() {
            continue;
        }
        let name = coding_name(arena, id);
        inventory.insert(
            name.clone(),
            CodingMember {
                decl: id,
                name,
                ty: var.ty.clone(),
                span: decl.span,
                has_default: var.is_default_initializable(),
            },
        );
    }
    inventory
}

/// Labeled payload parameters of an enum case. Unlabeled parameters are coded
/// positionally and never appear here.
#[must_use]
pub fn case_inventory(arena: &DeclArena, case: DeclId) -> Inventory {
    let decl = arena.get(case);
    let Some(case_decl) = decl.as_case() else {
        return Inventory::new();
    };
    case_decl
        .params
        .iter()
        .filter_map(|param| {
            let label = param.label.clone()?;
            Some((
                label.clone(),
                CodingMember {
                    decl: case,
                    name: label,
                    ty: param.ty.clone(),
                    span: param.span.or(decl.span),
                    has_default: param.default.is_some(),
                },
            ))
        })
        .collect()
}
