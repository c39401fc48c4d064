//! Whole-arena derivation: find every type that asks for a synthesized
//! `Encodable` or `Decodable` conformance and derive it.

mod report;

#[cfg(test)]
mod tests;

use std::time::Instant;

pub use self::report::{ConformanceRequest, DerivationReport, DerivedMember};

use crate::codable::{Derivation, Requirement, derive_decodable, derive_encodable};
use crate::config::SynthesisConfig;
use crate::conformance::{ConformanceOracle, KnownProtocol};
use crate::decl::{DeclArena, DeclId, NominalKind};
use crate::diagnostics::DiagnosticSink;

const DERIVABLE: [KnownProtocol; 2] = [KnownProtocol::Encodable, KnownProtocol::Decodable];

pub struct CodableDeriver<'a> {
    config: &'a SynthesisConfig,
    oracle: &'a dyn ConformanceOracle,
}

impl<'a> CodableDeriver<'a> {
    #[must_use]
    pub fn new(config: &'a SynthesisConfig, oracle: &'a dyn ConformanceOracle) -> Self {
        Self { config, oracle }
    }

    /// Derive every requested conformance in `arena`. Superclasses are
    /// processed before their subclasses so that a subclass sees the
    /// superclass's synthesized `init(from:)`.
    pub fn derive_all(&self, arena: &mut DeclArena) -> DerivationReport {
        let start = Instant::now();
        let candidates = candidates(arena);
        tracing::info!(
            target: "codable",
            stage = "driver.derive.start",
            candidates = candidates.len()
        );
        let mut sink = DiagnosticSink::new(self.config.diagnostic_namespace.clone());
        let mut report = DerivationReport::default();
        for nominal in candidates {
            self.derive_type(arena, nominal, &mut sink, &mut report);
        }
        report.diagnostics = sink.into_vec();
        tracing::info!(
            target: "codable",
            stage = "driver.derive.complete",
            derived = report.derived.len(),
            failed = report.failed.len(),
            skipped = report.skipped.len(),
            diagnostics = report.diagnostics.len(),
            elapsed_ms = start.elapsed().as_millis() as u64
        );
        report
    }

    /// Derive the conformances `nominal` declares.
    pub fn derive_type(
        &self,
        arena: &mut DeclArena,
        nominal: DeclId,
        sink: &mut DiagnosticSink,
        report: &mut DerivationReport,
    ) {
        let type_name = arena.get(nominal).name.clone();
        for protocol in DERIVABLE {
            if !declares(arena, nominal, protocol) {
                continue;
            }
            let Some(requirement) = Requirement::for_protocol(protocol) else {
                continue;
            };
            let entry = ConformanceRequest {
                type_name: type_name.clone(),
                nominal,
                protocol,
            };
            if is_witnessed(arena, nominal, &requirement) {
                tracing::debug!(
                    target: "codable",
                    stage = "driver.skip",
                    type_name = %type_name,
                    protocol = %protocol,
                    "requirement already witnessed"
                );
                report.skipped.push(entry);
                continue;
            }
            let derivation = Derivation::new(arena, nominal, protocol, self.config, self.oracle);
            let member = match protocol {
                KnownProtocol::Decodable => {
                    derive_decodable(&derivation, arena, &requirement, sink)
                }
                _ => derive_encodable(&derivation, arena, &requirement, sink),
            };
            match member {
                Some(member) => report.derived.push(DerivedMember {
                    type_name: type_name.clone(),
                    nominal,
                    protocol,
                    member,
                }),
                None => report.failed.push(entry),
            }
        }
    }
}

/// Structs, classes and enums declaring a derivable conformance, ordered so
/// that every class follows its superclass.
fn candidates(arena: &DeclArena) -> Vec<DeclId> {
    let mut found: Vec<(usize, DeclId)> = arena
        .iter()
        .filter(|(_, decl)| {
            decl.as_nominal().is_some_and(|nominal| {
                matches!(
                    nominal.kind,
                    NominalKind::Struct | NominalKind::Class | NominalKind::Enum
                )
            })
        })
        .map(|(id, _)| id)
        .filter(|id| DERIVABLE.iter().any(|protocol| declares(arena, *id, *protocol)))
        .map(|id| (superclass_depth(arena, id), id))
        .collect();
    found.sort_by_key(|(depth, id)| (*depth, *id));
    found.into_iter().map(|(_, id)| id).collect()
}

fn superclass_depth(arena: &DeclArena, class: DeclId) -> usize {
    let mut depth = 0;
    let mut current = class;
    while let Some(superclass) = arena.superclass_decl(current) {
        depth += 1;
        if depth > arena.len() {
            break;
        }
        current = superclass;
    }
    depth
}

fn declares(arena: &DeclArena, nominal: DeclId, protocol: KnownProtocol) -> bool {
    arena.nominal(nominal).is_some_and(|decl| {
        decl.conformances
            .iter()
            .any(|conformance| protocol.is_provided_by(&conformance.protocol))
    })
}

/// A user-written member already satisfies `requirement`.
fn is_witnessed(arena: &DeclArena, nominal: DeclId, requirement: &Requirement) -> bool {
    let labels: Vec<Option<&str>> = requirement
        .labels
        .iter()
        .map(|label| Some(label.as_str()))
        .collect();
    arena
        .lookup_direct(nominal, &requirement.base_name)
        .into_iter()
        .any(|member| {
            let decl = arena.get(member);
            let params = match (decl.as_func(), decl.as_constructor()) {
                (Some(func), _) => &func.params,
                (_, Some(ctor)) => &ctor.params,
                _ => return false,
            };
            params.iter().map(|param| param.label.as_deref()).eq(labels.iter().copied())
        })
}
