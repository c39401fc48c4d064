use super::*;
use crate::conformance::ConformanceTable;
use crate::decl::{DeclKind, Field, FnParam, Init, Literal, Ty};

fn run(arena: &mut DeclArena) -> DerivationReport {
    let config = SynthesisConfig::default();
    let oracle = ConformanceTable::default();
    CodableDeriver::new(&config, &oracle).derive_all(arena)
}

#[test]
fn superclasses_are_derived_before_subclasses() {
    let mut arena = DeclArena::new();
    let root = arena
        .class_type("Root")
        .conforms_to("Codable")
        .stored("id", Ty::int())
        .finish();
    // Declared ahead of its superclass on purpose.
    let leaf = arena.class_type("Leaf").conforms_to("Codable").finish();
    let middle = arena
        .class_type("Middle")
        .superclass(Ty::nominal(root))
        .conforms_to("Codable")
        .finish();
    if let DeclKind::Nominal(nominal) = &mut arena.get_mut(leaf).kind {
        nominal.superclass = Some(Ty::nominal(middle));
    }
    let report = run(&mut arena);
    assert!(!report.has_errors(), "{:?}", report.diagnostics);
    let order: Vec<&str> = report
        .derived
        .iter()
        .map(|derived| derived.type_name.as_str())
        .collect();
    assert_eq!(order, ["Root", "Root", "Middle", "Middle", "Leaf", "Leaf"]);
    assert!(report.member_for(leaf, KnownProtocol::Decodable).is_some());
}

#[test]
fn user_written_witnesses_are_skipped() {
    let mut arena = DeclArena::new();
    let custom = arena
        .struct_type("Custom")
        .conforms_to("Codable")
        .stored("id", Ty::int())
        .method(
            "encode",
            vec![FnParam::new(Some("to"), "encoder", Ty::named("Encoder"))],
            true,
        )
        .constructor(Init::from_decoder())
        .finish();
    let report = run(&mut arena);
    assert!(report.derived.is_empty());
    assert_eq!(report.skipped.len(), 2);
    assert!(arena.lookup_direct(custom, "CodingKeys").is_empty());
}

#[test]
fn failures_are_collected_with_diagnostics() {
    let mut arena = DeclArena::new();
    let broken = arena
        .struct_type("Broken")
        .conforms_to("Encodable")
        .stored("widget", Ty::named("Widget"))
        .finish();
    let fine = arena.struct_type("Fine").conforms_to("Encodable").finish();
    let plain = arena.struct_type("Plain").stored("id", Ty::int()).finish();
    let report = run(&mut arena);
    assert!(report.has_errors());
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].nominal, broken);
    assert!(report.member_for(fine, KnownProtocol::Encodable).is_some());
    assert!(report.member_for(plain, KnownProtocol::Encodable).is_none());
    assert_eq!(report.diagnostics.len(), 3);
}

#[test]
fn synthesize_bodies_reports_decode_warnings() {
    let mut arena = DeclArena::new();
    arena
        .struct_type("Settings")
        .conforms_to("Codable")
        .field(
            Field::constant("version", Ty::int()).initial(Literal::Int(1)),
        )
        .finish();
    let config = SynthesisConfig::default();
    let oracle = ConformanceTable::default();
    let report = CodableDeriver::new(&config, &oracle).derive_all(&mut arena);
    assert!(report.diagnostics.is_empty());
    let warnings = report.synthesize_bodies(&arena, &config, &oracle).unwrap();
    assert_eq!(warnings.len(), 3);
    assert!(warnings.iter().all(|diag| !diag.severity.is_error()));
    for derived in &report.derived {
        let decl = arena.get(derived.member);
        let synthesized = decl
            .as_func()
            .and_then(|func| func.body.as_ref())
            .or_else(|| decl.as_constructor().and_then(|ctor| ctor.body.as_ref()))
            .is_some_and(|body| body.is_synthesized());
        assert!(synthesized, "{} was not synthesized", decl.full_name());
    }
}
