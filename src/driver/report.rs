use crate::codable::synthesize_body;
use crate::config::SynthesisConfig;
use crate::conformance::{ConformanceOracle, KnownProtocol};
use crate::decl::{DeclArena, DeclId};
use crate::diagnostics::{Diagnostic, DiagnosticSink};
use crate::error::Result;

/// Metadata describing a synthesized witness.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivedMember {
    pub type_name: String,
    pub nominal: DeclId,
    pub protocol: KnownProtocol,
    pub member: DeclId,
}

/// A conformance some type asked derivation to provide.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConformanceRequest {
    pub type_name: String,
    pub nominal: DeclId,
    pub protocol: KnownProtocol,
}

#[derive(Debug, Default)]
pub struct DerivationReport {
    pub derived: Vec<DerivedMember>,
    pub failed: Vec<ConformanceRequest>,
    /// Requirements satisfied by user-written members.
    pub skipped: Vec<ConformanceRequest>,
    pub diagnostics: Vec<Diagnostic>,
}

impl DerivationReport {
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|diagnostic| diagnostic.severity.is_error())
    }

    /// Witness derived for `nominal`'s conformance to `protocol`.
    #[must_use]
    pub fn member_for(&self, nominal: DeclId, protocol: KnownProtocol) -> Option<DeclId> {
        self.derived
            .iter()
            .find(|derived| derived.nominal == nominal && derived.protocol == protocol)
            .map(|derived| derived.member)
    }

    /// Force every lazily synthesized body. Returns the diagnostics raised
    /// while synthesizing; the report's own diagnostics are left untouched.
    pub fn synthesize_bodies(
        &self,
        arena: &DeclArena,
        config: &SynthesisConfig,
        oracle: &dyn ConformanceOracle,
    ) -> Result<Vec<Diagnostic>> {
        let mut sink = DiagnosticSink::new(config.diagnostic_namespace.clone());
        for derived in &self.derived {
            synthesize_body(arena, derived.member, config, oracle, &mut sink)?;
        }
        Ok(sink.into_vec())
    }
}
