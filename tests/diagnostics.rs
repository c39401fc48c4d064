use codable_synth::decl::{DeclArena, Field, Literal, Ty};
use codable_synth::diagnostics::{
    ErrorFormat, FileCache, FileId, FormatOptions, Span, format_diagnostics,
};
use codable_synth::{CodableDeriver, ConformanceTable, SynthesisConfig};
use expect_test::expect;
use serde_json::Value as Json;

fn span_of(source: &str, file: FileId, needle: &str) -> Span {
    let start = source.find(needle).expect("needle present");
    Span::in_file(file, start, start + needle.len())
}

#[test]
fn non_conforming_member_renders_short_diagnostics() {
    let source = "struct Gadget {\n    var widget: Widget\n}\n";
    let mut files = FileCache::default();
    let file = files.add_file("gadget.swift", source);

    let mut arena = DeclArena::new();
    let widget = arena.struct_type("Widget").finish();
    arena
        .struct_type("Gadget")
        .span(span_of(source, file, "Gadget"))
        .conforms_to("Encodable")
        .field(
            Field::var("widget", Ty::nominal(widget))
                .span(span_of(source, file, "var widget: Widget")),
        )
        .finish();

    let config = SynthesisConfig::default();
    let oracle = ConformanceTable::default();
    let report = CodableDeriver::new(&config, &oracle).derive_all(&mut arena);
    assert!(report.has_errors());

    let rendered = format_diagnostics(
        &report.diagnostics,
        &files,
        FormatOptions::plain(ErrorFormat::Short),
    );
    expect![[r#"
        gadget.swift:1:8: error[COD001]: type 'Gadget' does not conform to protocol 'Encodable'
        <unknown>:?:?: note[COD002]: protocol requires function 'encode(to:)'
        gadget.swift:2:5: note[COD013]: cannot automatically synthesize 'Encodable' because 'Widget' does not conform to 'Encodable'"#]]
    .assert_eq(&rendered);
}

#[test]
fn initialized_constant_warning_carries_fix_it() {
    let source = "struct Settings {\n    let version = 1\n}\n";
    let mut files = FileCache::default();
    let file = files.add_file("settings.swift", source);

    let mut arena = DeclArena::new();
    arena
        .struct_type("Settings")
        .span(span_of(source, file, "Settings"))
        .conforms_to("Codable")
        .field(
            Field::constant("version", Ty::int())
                .initial(Literal::Int(1))
                .span(span_of(source, file, "version"))
                .introducer_span(span_of(source, file, "let")),
        )
        .finish();

    let config = SynthesisConfig::default();
    let oracle = ConformanceTable::default();
    let report = CodableDeriver::new(&config, &oracle).derive_all(&mut arena);
    assert!(report.diagnostics.is_empty(), "{:?}", report.diagnostics);
    let warnings = report
        .synthesize_bodies(&arena, &config, &oracle)
        .expect("bodies synthesize");

    let short = format_diagnostics(&warnings, &files, FormatOptions::plain(ErrorFormat::Short));
    expect![[r#"
        settings.swift:2:9: warning[COD030]: immutable property will not be decoded because it is declared with an initial value which cannot be overwritten
        settings.swift:2:9: note[COD031]: set the initial value via the initializer or explicitly define a CodingKeys enum including a 'version' case to silence this warning
        settings.swift:2:9: note[COD033]: make the property mutable instead; suggestion: replace 'let' with 'var'"#]]
    .assert_eq(&short);

    let json = format_diagnostics(&warnings, &files, FormatOptions::plain(ErrorFormat::Json));
    let fix: Json = serde_json::from_str(json.lines().nth(2).expect("three diagnostics"))
        .expect("valid JSON");
    assert_eq!(fix["code"]["code"], "COD033");
    assert_eq!(fix["suggestions"][0]["replacement"], "var");
    assert_eq!(fix["suggestions"][0]["span"]["column_start"], 5);

    let human = format_diagnostics(
        &warnings[..1],
        &files,
        FormatOptions::plain(ErrorFormat::Human),
    );
    assert!(human.contains("  --> settings.swift:2:9"), "{human}");
    assert!(human.contains("   2 |     let version = 1"), "{human}");
}
