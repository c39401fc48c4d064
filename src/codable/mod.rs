//! Derived `Encodable` / `Decodable` conformance.
//!
//! Derivation runs in two phases. [`derive_encodable`] and [`derive_decodable`]
//! decide whether a requirement can be synthesized, synthesizing coding-key
//! enumerations when needed, and add the witness declaration to the type. The
//! witness carries a [`LazyBody`](crate::body::LazyBody); [`synthesize_body`]
//! produces the statements on first request.

mod classify;
mod decode;
pub mod diagnostics;
mod encode;
mod inventory;
mod keys;
mod requirements;
mod validate;

#[cfg(test)]
mod tests;

pub use classify::{Classification, classify_coding_keys};
pub use inventory::{CodingMember, Inventory, case_inventory, coding_name, member_inventory};
pub use keys::synthesize_coding_keys;
pub use requirements::{Requirement, RequirementKind, derive_decodable, derive_encodable};
pub use validate::{validate_case_coding_keys, validate_coding_keys, validate_union_coding_keys};

use crate::body::{Block, BodySynthesizer};
use crate::config::SynthesisConfig;
use crate::conformance::{ConformanceOracle, GenericContext, KnownProtocol};
use crate::decl::{DeclArena, DeclId, DeclKind, NominalKind, Ty};
use crate::diagnostics::DiagnosticSink;
use crate::error::{Error, Result};

/// Keyword reserved for the superclass payload in a class's key enumeration.
pub const SUPER_KEY: &str = "super";

/// Everything derivation of one protocol for one type needs to consult.
pub struct Derivation<'a> {
    pub nominal: DeclId,
    pub protocol: KnownProtocol,
    pub context: GenericContext,
    pub config: &'a SynthesisConfig,
    pub oracle: &'a dyn ConformanceOracle,
}

impl<'a> Derivation<'a> {
    #[must_use]
    pub fn new(
        arena: &DeclArena,
        nominal: DeclId,
        protocol: KnownProtocol,
        config: &'a SynthesisConfig,
        oracle: &'a dyn ConformanceOracle,
    ) -> Self {
        Self {
            nominal,
            protocol,
            context: GenericContext::for_conformance(arena, nominal, protocol),
            config,
            oracle,
        }
    }

    #[must_use]
    pub fn keys_name(&self) -> &str {
        &self.config.coding_keys_name
    }

    #[must_use]
    pub fn type_name(&self, arena: &DeclArena) -> String {
        arena.get(self.nominal).name.clone()
    }

    #[must_use]
    pub fn kind(&self, arena: &DeclArena) -> Option<NominalKind> {
        arena.nominal(self.nominal).map(|nominal| nominal.kind)
    }

    #[must_use]
    pub fn is_class(&self, arena: &DeclArena) -> bool {
        self.kind(arena) == Some(NominalKind::Class)
    }

    #[must_use]
    pub fn is_union(&self, arena: &DeclArena) -> bool {
        self.kind(arena) == Some(NominalKind::Enum)
    }

    /// Whether `ty` conforms to the protocol being derived.
    #[must_use]
    pub fn conforms(&self, arena: &DeclArena, ty: &Ty) -> bool {
        self.oracle
            .conforms_to(arena, ty, self.protocol, &self.context)
    }

    #[must_use]
    pub fn conforms_to(&self, arena: &DeclArena, ty: &Ty, protocol: KnownProtocol) -> bool {
        self.oracle.conforms_to(arena, ty, protocol, &self.context)
    }

    #[must_use]
    pub fn superclass_conforms_to(&self, arena: &DeclArena, protocol: KnownProtocol) -> bool {
        if !self.is_class(arena) {
            return false;
        }
        arena
            .nominal(self.nominal)
            .and_then(|nominal| nominal.superclass.as_ref())
            .is_some_and(|superclass| self.conforms_to(arena, superclass, protocol))
    }

    /// A class whose superclass is `Encodable` or `Decodable` reserves a
    /// `super` key.
    #[must_use]
    pub fn has_super_key(&self, arena: &DeclArena) -> bool {
        self.superclass_conforms_to(arena, KnownProtocol::Encodable)
            || self.superclass_conforms_to(arena, KnownProtocol::Decodable)
    }

    /// The key enumeration named `name` declared directly inside the type,
    /// seen through a type alias. `None` when there is none or it is not an
    /// enumeration.
    #[must_use]
    pub fn lookup_keys_enum(&self, arena: &DeclArena, name: &str) -> Option<DeclId> {
        lookup_keys_enum(arena, self.nominal, name)
    }
}

pub(crate) fn lookup_keys_enum(arena: &DeclArena, nominal: DeclId, name: &str) -> Option<DeclId> {
    let found = *arena.lookup_direct(nominal, name).first()?;
    let resolved = arena.resolve_type_decl(found)?;
    arena
        .get(resolved)
        .is_nominal_kind(NominalKind::Enum)
        .then_some(resolved)
}

/// Produce (or return the cached) body of a synthesized `encode(to:)` or
/// `init(from:)`.
///
/// Warnings raised while synthesizing, such as immutable properties that will
/// not be decoded, are pushed to `sink`.
pub fn synthesize_body<'a>(
    arena: &'a DeclArena,
    member: DeclId,
    config: &SynthesisConfig,
    oracle: &dyn ConformanceOracle,
    sink: &mut DiagnosticSink,
) -> Result<&'a Block> {
    let decl = arena.get(member);
    let lazy = match &decl.kind {
        DeclKind::Func(func) => func.body.as_ref(),
        DeclKind::Constructor(ctor) => ctor.body.as_ref(),
        _ => None,
    }
    .ok_or_else(|| {
        Error::internal(format!("`{}` has no synthesized body", decl.full_name()))
    })?;
    let nominal = decl.parent.ok_or_else(|| {
        Error::internal(format!("`{}` is not a member of a type", decl.full_name()))
    })?;
    lazy.get_or_synthesize(|synthesizer| {
        let protocol = match synthesizer {
            BodySynthesizer::EncodeAggregate | BodySynthesizer::EncodeUnion => {
                KnownProtocol::Encodable
            }
            BodySynthesizer::DecodeAggregate | BodySynthesizer::DecodeUnion => {
                KnownProtocol::Decodable
            }
        };
        let derivation = Derivation::new(arena, nominal, protocol, config, oracle);
        let block = match synthesizer {
            BodySynthesizer::EncodeAggregate => encode::aggregate_body(&derivation, arena),
            BodySynthesizer::EncodeUnion => encode::union_body(&derivation, arena),
            BodySynthesizer::DecodeAggregate => decode::aggregate_body(&derivation, arena, sink),
            BodySynthesizer::DecodeUnion => decode::union_body(&derivation, arena),
        }?;
        tracing::debug!(
            target: "codable",
            stage = "body.synthesized",
            type_name = %arena.get(nominal).name,
            requirement = %decl.full_name(),
            statements = block.stmts.len(),
            "synthesized body"
        );
        Ok(block)
    })
}

fn missing_keys(derivation: &Derivation<'_>, arena: &DeclArena, name: &str) -> Error {
    Error::synthesis(format!(
        "'{}' has no '{name}' enumeration to synthesize against",
        derivation.type_name(arena)
    ))
}
