//! Derivation entry points for the `encode(to:)` and `init(from:)`
//! requirements.

use super::classify::{Classification, classify_coding_keys};
use super::diagnostics as diag;
use super::keys::synthesize_coding_keys;
use super::Derivation;
use crate::body::{BodySynthesizer, LazyBody};
use crate::conformance::KnownProtocol;
use crate::decl::{
    Access, ConformanceSite, ConstructorDecl, Decl, DeclArena, DeclId, DeclKind, FnParam,
    FuncDecl, NominalKind, Ty,
};
use crate::diagnostics::{DiagnosticSink, DiagnosticTransaction, Span};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RequirementKind {
    Function,
    Initializer,
}

impl RequirementKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            RequirementKind::Function => "function",
            RequirementKind::Initializer => "initializer",
        }
    }
}

/// A protocol requirement that derivation is asked to witness.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Requirement {
    pub kind: RequirementKind,
    pub base_name: String,
    pub labels: Vec<String>,
    pub span: Option<Span>,
}

impl Requirement {
    /// `func encode(to encoder: Encoder) throws`
    #[must_use]
    pub fn encode_to() -> Self {
        Self {
            kind: RequirementKind::Function,
            base_name: "encode".into(),
            labels: vec!["to".into()],
            span: None,
        }
    }

    /// `init(from decoder: Decoder) throws`
    #[must_use]
    pub fn init_from() -> Self {
        Self {
            kind: RequirementKind::Initializer,
            base_name: "init".into(),
            labels: vec!["from".into()],
            span: None,
        }
    }

    #[must_use]
    pub fn for_protocol(protocol: KnownProtocol) -> Option<Self> {
        match protocol {
            KnownProtocol::Encodable => Some(Self::encode_to()),
            KnownProtocol::Decodable => Some(Self::init_from()),
            KnownProtocol::CodingKey => None,
        }
    }

    #[must_use]
    pub fn full_name(&self) -> String {
        let labels: String = self.labels.iter().map(|label| format!("{label}:")).collect();
        format!("{}({labels})", self.base_name)
    }
}

/// Witness `encode(to:)` for the derivation target.
///
/// On success the method is added to the type and its handle returned. On
/// failure the recorded diagnostics are committed to `sink` behind a
/// "does not conform" headline and `None` is returned.
pub fn derive_encodable(
    derivation: &Derivation<'_>,
    arena: &mut DeclArena,
    requirement: &Requirement,
    sink: &mut DiagnosticSink,
) -> Option<DeclId> {
    derive(derivation, arena, requirement, "encode", sink)
}

/// Witness `init(from:)` for the derivation target.
pub fn derive_decodable(
    derivation: &Derivation<'_>,
    arena: &mut DeclArena,
    requirement: &Requirement,
    sink: &mut DiagnosticSink,
) -> Option<DeclId> {
    derive(derivation, arena, requirement, "init", sink)
}

fn derive(
    derivation: &Derivation<'_>,
    arena: &mut DeclArena,
    requirement: &Requirement,
    expected: &str,
    sink: &mut DiagnosticSink,
) -> Option<DeclId> {
    let type_name = derivation.type_name(arena);
    let derive_span = tracing::debug_span!(
        target: "codable",
        "derive",
        type_name = %type_name,
        protocol = %derivation.protocol
    );
    let _entered = derive_span.enter();
    tracing::debug!(target: "codable", stage = "derive.start", requirement = %requirement.full_name());

    if !matches!(
        derivation.kind(arena),
        Some(NominalKind::Struct | NominalKind::Class | NominalKind::Enum)
    ) {
        tracing::debug!(target: "codable", stage = "derive.finish", status = "unsupported-kind");
        return None;
    }
    if requirement.base_name != expected {
        sink.push(diag::broken_requirement(derivation.protocol, requirement.span));
        tracing::debug!(target: "codable", stage = "derive.finish", status = "broken-requirement");
        return None;
    }
    if check_disallowed_context(derivation, arena, requirement, sink) {
        tracing::debug!(target: "codable", stage = "derive.finish", status = "disallowed-context");
        return None;
    }

    let mut diags = DiagnosticTransaction::new();
    diags.push(diag::type_does_not_conform(
        &type_name,
        derivation.protocol,
        conformance_span(derivation, arena).or(arena.get(derivation.nominal).span),
    ));
    diags.push(diag::protocol_requires(
        requirement.kind.as_str(),
        &requirement.full_name(),
        requirement.span,
    ));

    if !can_synthesize(derivation, arena, requirement, &mut diags) {
        tracing::debug!(
            target: "codable",
            stage = "derive.finish",
            status = "failed",
            diagnostics = diags.pending().len()
        );
        diags.commit(sink);
        return None;
    }
    diags.abort();

    let member = match derivation.protocol {
        KnownProtocol::Decodable => add_init_from(derivation, arena),
        _ => add_encode_to(derivation, arena),
    };
    tracing::debug!(target: "codable", stage = "derive.finish", status = "derived", member = member.0);
    Some(member)
}

fn conformance_span(derivation: &Derivation<'_>, arena: &DeclArena) -> Option<Span> {
    arena
        .nominal(derivation.nominal)?
        .conformances
        .iter()
        .find(|conformance| derivation.protocol.is_provided_by(&conformance.protocol))
        .and_then(|conformance| conformance.span)
}

/// Extensions may not carry synthesized conformances in some positions. The
/// error goes straight to the sink.
fn check_disallowed_context(
    derivation: &Derivation<'_>,
    arena: &DeclArena,
    requirement: &Requirement,
    sink: &mut DiagnosticSink,
) -> bool {
    let Some(nominal) = arena.nominal(derivation.nominal) else {
        return false;
    };
    let Some(conformance) = nominal
        .conformances
        .iter()
        .find(|conformance| derivation.protocol.is_provided_by(&conformance.protocol))
    else {
        return false;
    };
    let ConformanceSite::Extension { file } = conformance.site else {
        return false;
    };
    if file != arena.file_of(derivation.nominal) {
        sink.push(diag::extension_in_other_file(derivation.protocol, conformance.span));
        return true;
    }
    if derivation.protocol == KnownProtocol::Decodable
        && nominal.kind == NominalKind::Class
        && !nominal.is_final
    {
        sink.push(diag::non_final_class_extension(
            &requirement.full_name(),
            conformance.span,
        ));
        return true;
    }
    false
}

fn can_synthesize(
    derivation: &Derivation<'_>,
    arena: &mut DeclArena,
    requirement: &Requirement,
    diags: &mut DiagnosticTransaction,
) -> bool {
    if derivation.protocol == KnownProtocol::Decodable
        && derivation.is_class(arena)
        && !super_init_is_callable(derivation, arena, requirement, diags)
    {
        return false;
    }

    let classification = classify_coding_keys(derivation, arena, diags);
    tracing::debug!(
        target: "codable",
        stage = "derive.classified",
        classification = classification.as_str()
    );
    match classification {
        Classification::Invalid => false,
        Classification::NeedsSynthesis => synthesize_coding_keys(derivation, arena, diags),
        Classification::Valid => true,
    }
}

/// A decodable subclass must be able to chain to its superclass: to
/// `init(from:)` when the superclass is decodable, to `init()` otherwise.
fn super_init_is_callable(
    derivation: &Derivation<'_>,
    arena: &DeclArena,
    requirement: &Requirement,
    diags: &mut DiagnosticTransaction,
) -> bool {
    let Some(superclass) = arena.superclass_decl(derivation.nominal) else {
        return true;
    };
    let requirement_name = derivation.protocol.name();
    let (labels, member): (Vec<Option<&str>>, String) =
        if derivation.superclass_conforms_to(arena, KnownProtocol::Decodable) {
            (
                requirement.labels.iter().map(|label| Some(label.as_str())).collect(),
                requirement.full_name(),
            )
        } else {
            (Vec::new(), "init()".to_string())
        };

    let found = arena.constructors_with_labels(superclass, &labels);
    let init = match found.as_slice() {
        [] => {
            diags.push(diag::no_super_init(
                requirement_name,
                &member,
                arena.get(superclass).span,
            ));
            return false;
        }
        [init] => *init,
        // Ambiguous; the type checker reports it.
        _ => return false,
    };

    let decl = arena.get(init);
    let Some(ctor) = decl.as_constructor() else {
        return false;
    };
    if !ctor.designated {
        diags.push(diag::super_init_not_designated(requirement_name, &member, decl.span));
        return false;
    }
    if !is_accessible_from(arena, init, derivation.nominal) {
        diags.push(diag::super_init_inaccessible(
            requirement_name,
            &member,
            decl.access,
            decl.span,
        ));
        return false;
    }
    if ctor.failable {
        diags.push(diag::super_init_failable(requirement_name, &member, decl.span));
        return false;
    }
    true
}

fn is_accessible_from(arena: &DeclArena, member: DeclId, from: DeclId) -> bool {
    match arena.get(member).access {
        Access::Private => false,
        Access::FilePrivate => arena.file_of(member) == arena.file_of(from),
        Access::Internal | Access::Public | Access::Open => true,
    }
}

/// Access of a synthesized witness, copied from the type.
fn witness_access(arena: &DeclArena, nominal: DeclId) -> Access {
    match arena.get(nominal).access {
        Access::Open => Access::Public,
        Access::Private => Access::FilePrivate,
        access => access,
    }
}

fn add_encode_to(derivation: &Derivation<'_>, arena: &mut DeclArena) -> DeclId {
    let synthesizer = if derivation.is_union(arena) {
        BodySynthesizer::EncodeUnion
    } else {
        BodySynthesizer::EncodeAggregate
    };
    let func = FuncDecl {
        params: vec![FnParam::new(Some("to"), "encoder", Ty::named("Encoder"))],
        throws: true,
        is_override: derivation.superclass_conforms_to(arena, KnownProtocol::Encodable),
        body: Some(LazyBody::new(synthesizer)),
    };
    let access = witness_access(arena, derivation.nominal);
    arena.add_member(
        derivation.nominal,
        Decl::new("encode", DeclKind::Func(func))
            .implicit()
            .with_access(access),
    )
}

fn add_init_from(derivation: &Derivation<'_>, arena: &mut DeclArena) -> DeclId {
    let synthesizer = if derivation.is_union(arena) {
        BodySynthesizer::DecodeUnion
    } else {
        BodySynthesizer::DecodeAggregate
    };
    let required = arena
        .nominal(derivation.nominal)
        .is_some_and(|nominal| nominal.kind == NominalKind::Class && !nominal.is_final);
    let ctor = ConstructorDecl {
        params: vec![FnParam::new(Some("from"), "decoder", Ty::named("Decoder"))],
        failable: false,
        throws: true,
        designated: true,
        required,
        body: Some(LazyBody::new(synthesizer)),
    };
    let access = witness_access(arena, derivation.nominal);
    arena.add_member(
        derivation.nominal,
        Decl::new("init", DeclKind::Constructor(ctor))
            .implicit()
            .with_access(access),
    )
}
