use super::*;
use crate::body::pretty::format_block;
use crate::config::UncoveredCasePolicy;
use crate::conformance::ConformanceTable;
use crate::decl::{Access, CaseParam, DeclArena, Field, Init, Literal, NominalKind};
use crate::diagnostics::{DiagnosticTransaction, FileId, Span};
use expect_test::{Expect, expect};

fn derive_with(
    arena: &mut DeclArena,
    nominal: DeclId,
    protocol: KnownProtocol,
    config: &SynthesisConfig,
) -> (Option<DeclId>, DiagnosticSink) {
    let oracle = ConformanceTable::default();
    let derivation = Derivation::new(arena, nominal, protocol, config, &oracle);
    let requirement = Requirement::for_protocol(protocol).unwrap();
    let mut sink = DiagnosticSink::new(&config.diagnostic_namespace);
    let member = match protocol {
        KnownProtocol::Decodable => derive_decodable(&derivation, arena, &requirement, &mut sink),
        _ => derive_encodable(&derivation, arena, &requirement, &mut sink),
    };
    (member, sink)
}

fn derive(
    arena: &mut DeclArena,
    nominal: DeclId,
    protocol: KnownProtocol,
) -> (Option<DeclId>, DiagnosticSink) {
    derive_with(arena, nominal, protocol, &SynthesisConfig::default())
}

fn render(sink: &DiagnosticSink) -> String {
    sink.diagnostics()
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

fn body_with(arena: &DeclArena, member: DeclId, config: &SynthesisConfig) -> (String, DiagnosticSink) {
    let oracle = ConformanceTable::default();
    let mut sink = DiagnosticSink::new("COD");
    let block = synthesize_body(arena, member, config, &oracle, &mut sink).unwrap();
    (format_block(arena, block), sink)
}

fn check_body(arena: &DeclArena, member: DeclId, expect: Expect) {
    let (text, _) = body_with(arena, member, &SynthesisConfig::default());
    expect.assert_eq(&text);
}

fn case_names(arena: &DeclArena, keys: DeclId) -> Vec<String> {
    arena
        .cases(keys)
        .into_iter()
        .map(|case| arena.get(case).name.clone())
        .collect()
}

fn keys_of(arena: &DeclArena, nominal: DeclId, name: &str) -> DeclId {
    lookup_keys_enum(arena, nominal, name).unwrap()
}

#[test]
fn struct_keys_follow_property_order() {
    let mut arena = DeclArena::new();
    let point = arena
        .struct_type("Point")
        .conforms_to("Codable")
        .stored("x", Ty::int())
        .stored("y", Ty::optional(Ty::int()))
        .field(Field::var("cache", Ty::string()).lazy())
        .field(Field::var("area", Ty::int()).computed())
        .field(Field::var("origin", Ty::int()).static_member())
        .finish();
    let (member, sink) = derive(&mut arena, point, KnownProtocol::Encodable);
    assert!(member.is_some());
    assert!(sink.is_empty());
    let keys = keys_of(&arena, point, "CodingKeys");
    assert_eq!(case_names(&arena, keys), ["x", "y"]);
    assert!(arena.get(keys).is_implicit);
    assert_eq!(arena.get(keys).access, Access::Private);
}

#[test]
fn struct_bodies_use_if_present_for_optionals() {
    let mut arena = DeclArena::new();
    let point = arena
        .struct_type("Point")
        .conforms_to("Codable")
        .stored("x", Ty::int())
        .stored("y", Ty::optional(Ty::int()))
        .finish();
    let encode = derive(&mut arena, point, KnownProtocol::Encodable).0.unwrap();
    let decode = derive(&mut arena, point, KnownProtocol::Decodable).0.unwrap();
    assert_eq!(arena.lookup_direct(point, "CodingKeys").len(), 1);
    check_body(
        &arena,
        encode,
        expect![[r#"
            var container = encoder.container(keyedBy: CodingKeys.self)
            try container.encode(self.x, forKey: CodingKeys.x)
            try container.encodeIfPresent(self.y, forKey: CodingKeys.y)
        "#]],
    );
    check_body(
        &arena,
        decode,
        expect![[r#"
            let container = try decoder.container(keyedBy: CodingKeys.self)
            self.x = try container.decode(Int.self, forKey: CodingKeys.x)
            self.y = try container.decodeIfPresent(Int.self, forKey: CodingKeys.y)
        "#]],
    );
}

#[test]
fn witnesses_carry_modifiers_and_access() {
    let mut arena = DeclArena::new();
    let base = arena
        .class_type("Base")
        .conforms_to("Codable")
        .stored("id", Ty::int())
        .access(Access::Open)
        .finish();
    let derived = arena
        .class_type("Derived")
        .superclass(Ty::nominal(base))
        .conforms_to("Codable")
        .stored("name", Ty::string())
        .access(Access::Private)
        .finish();
    derive(&mut arena, base, KnownProtocol::Encodable).0.unwrap();
    let base_init = derive(&mut arena, base, KnownProtocol::Decodable).0.unwrap();
    let encode = derive(&mut arena, derived, KnownProtocol::Encodable).0.unwrap();
    let init = derive(&mut arena, derived, KnownProtocol::Decodable).0.unwrap();

    assert_eq!(arena.get(base_init).access, Access::Public);
    assert!(arena.get(base_init).as_constructor().unwrap().required);
    assert_eq!(arena.get(encode).full_name(), "encode(to:)");
    assert!(arena.get(encode).as_func().unwrap().is_override);
    assert_eq!(arena.get(encode).access, Access::FilePrivate);
    assert!(arena.get(encode).is_implicit);
    assert_eq!(arena.get(init).full_name(), "init(from:)");
    assert!(arena.get(init).as_constructor().unwrap().throws);
}

#[test]
fn subclass_chains_to_superclass_coding() {
    let mut arena = DeclArena::new();
    let base = arena
        .class_type("Base")
        .conforms_to("Codable")
        .stored("id", Ty::int())
        .finish();
    let derived = arena
        .class_type("Derived")
        .superclass(Ty::nominal(base))
        .conforms_to("Codable")
        .stored("name", Ty::string())
        .finish();
    derive(&mut arena, base, KnownProtocol::Decodable).0.unwrap();
    let encode = derive(&mut arena, derived, KnownProtocol::Encodable).0.unwrap();
    let decode = derive(&mut arena, derived, KnownProtocol::Decodable).0.unwrap();
    let keys = keys_of(&arena, derived, "CodingKeys");
    assert_eq!(case_names(&arena, keys), ["super", "name"]);
    check_body(
        &arena,
        encode,
        expect![[r#"
            var container = encoder.container(keyedBy: CodingKeys.self)
            try container.encode(self.name, forKey: CodingKeys.name)
            try super.encode(to: container.superEncoder())
        "#]],
    );
    check_body(
        &arena,
        decode,
        expect![[r#"
            let container = try decoder.container(keyedBy: CodingKeys.self)
            self.name = try container.decode(String.self, forKey: CodingKeys.name)
            try super.init(from: container.superDecoder())
        "#]],
    );
}

#[test]
fn subclass_of_plain_class_calls_designated_init() {
    let mut arena = DeclArena::new();
    let base = arena
        .class_type("Base")
        .constructor(Init::empty().throwing())
        .finish();
    let derived = arena
        .class_type("Derived")
        .superclass(Ty::nominal(base))
        .conforms_to("Decodable")
        .stored("name", Ty::string())
        .finish();
    let (decode, sink) = derive(&mut arena, derived, KnownProtocol::Decodable);
    assert!(sink.is_empty(), "{}", render(&sink));
    let keys = keys_of(&arena, derived, "CodingKeys");
    assert_eq!(case_names(&arena, keys), ["name"]);
    check_body(
        &arena,
        decode.unwrap(),
        expect![[r#"
            let container = try decoder.container(keyedBy: CodingKeys.self)
            self.name = try container.decode(String.self, forKey: CodingKeys.name)
            try super.init()
        "#]],
    );
}

#[test]
fn super_init_problems_are_reported_on_the_initializer() {
    fn attempt(init: Option<Init>) -> String {
        let mut arena = DeclArena::new();
        let mut base = arena.class_type("Base");
        if let Some(init) = init {
            base = base.constructor(init);
        }
        let base = base.finish();
        let derived = arena
            .class_type("Derived")
            .superclass(Ty::nominal(base))
            .conforms_to("Decodable")
            .stored("name", Ty::string())
            .finish();
        let (member, sink) = derive(&mut arena, derived, KnownProtocol::Decodable);
        assert!(member.is_none());
        render(&sink)
    }
    expect![[r#"
        error[COD001]: type 'Derived' does not conform to protocol 'Decodable'
        note[COD002]: protocol requires initializer 'init(from:)'
        note[COD020]: cannot automatically synthesize 'Decodable' because superclass does not have a callable 'init()'"#]]
    .assert_eq(&attempt(None));
    expect![[r#"
        error[COD001]: type 'Derived' does not conform to protocol 'Decodable'
        note[COD002]: protocol requires initializer 'init(from:)'
        note[COD021]: cannot automatically synthesize 'Decodable' because implementation would need to call 'init()', which is not designated"#]]
    .assert_eq(&attempt(Some(Init::empty().convenience())));
    expect![[r#"
        error[COD001]: type 'Derived' does not conform to protocol 'Decodable'
        note[COD002]: protocol requires initializer 'init(from:)'
        note[COD022]: cannot automatically synthesize 'Decodable' because implementation would need to call 'init()', which is private"#]]
    .assert_eq(&attempt(Some(Init::empty().access(Access::Private))));
    expect![[r#"
        error[COD001]: type 'Derived' does not conform to protocol 'Decodable'
        note[COD002]: protocol requires initializer 'init(from:)'
        note[COD023]: cannot automatically synthesize 'Decodable' because implementation would need to call 'init()', which is failable"#]]
    .assert_eq(&attempt(Some(Init::empty().failable())));
}

#[test]
fn ambiguous_super_init_fails_without_notes() {
    let mut arena = DeclArena::new();
    let base = arena
        .class_type("Base")
        .constructor(Init::empty())
        .constructor(Init::empty())
        .finish();
    let derived = arena
        .class_type("Derived")
        .superclass(Ty::nominal(base))
        .conforms_to("Decodable")
        .finish();
    let (member, sink) = derive(&mut arena, derived, KnownProtocol::Decodable);
    assert!(member.is_none());
    assert_eq!(sink.len(), 2);
}

#[test]
fn union_keys_and_bodies() {
    let mut arena = DeclArena::new();
    let shape = arena
        .enum_type("Shape")
        .conforms_to("Codable")
        .case_with("circle", vec![CaseParam::labeled("radius", Ty::double())])
        .case_with(
            "pair",
            vec![CaseParam::unnamed(Ty::int()), CaseParam::unnamed(Ty::int())],
        )
        .case("dot")
        .finish();
    let encode = derive(&mut arena, shape, KnownProtocol::Encodable).0.unwrap();
    let decode = derive(&mut arena, shape, KnownProtocol::Decodable).0.unwrap();

    let keys = keys_of(&arena, shape, "CodingKeys");
    assert_eq!(case_names(&arena, keys), ["circle", "pair", "dot"]);
    let circle = keys_of(&arena, shape, "CodingKeys_circle");
    assert_eq!(case_names(&arena, circle), ["radius"]);
    let dot = keys_of(&arena, shape, "CodingKeys_dot");
    assert!(case_names(&arena, dot).is_empty());
    assert!(arena.lookup_direct(shape, "CodingKeys_pair").is_empty());

    check_body(
        &arena,
        encode,
        expect![[r#"
            var container = encoder.container(keyedBy: CodingKeys.self)
            switch self {
            case .circle(radius: let a0):
                var nestedContainer = container.nestedContainer(keyedBy: CodingKeys_circle.self, forKey: CodingKeys.circle)
                try nestedContainer.encode(a0, forKey: CodingKeys_circle.radius)
            case .pair(let a0, let a1):
                var nestedContainer = container.nestedUnkeyedContainer(forKey: CodingKeys.pair)
                try nestedContainer.encode(a0)
                try nestedContainer.encode(a1)
            case .dot:
                var nestedContainer = container.nestedContainer(keyedBy: CodingKeys_dot.self, forKey: CodingKeys.dot)
            }
        "#]],
    );
    check_body(
        &arena,
        decode,
        expect![[r#"
            let container = try decoder.container(keyedBy: CodingKeys.self)
            switch container.allKeys.first {
            case CodingKeys.circle?:
                let nestedContainer = try container.nestedContainer(keyedBy: CodingKeys_circle.self, forKey: CodingKeys.circle)
                self = Shape.circle(radius: try nestedContainer.decode(Double.self, forKey: CodingKeys_circle.radius))
            case CodingKeys.pair?:
                var nestedContainer = try container.nestedUnkeyedContainer(forKey: CodingKeys.pair)
                self = Shape.pair(try nestedContainer.decode(Int.self), try nestedContainer.decode(Int.self))
            case CodingKeys.dot?:
                self = Shape.dot
            default:
                throw DecodingError.valueNotFound(Shape.self, DecodingError.Context(codingPath: container.codingPath, debugDescription: "Could not find value of type 'Shape'"))
            }
        "#]],
    );
}

#[test]
fn missing_nested_key_falls_back_to_parameter_default() {
    let mut arena = DeclArena::new();
    let command = arena
        .enum_type("Command")
        .conforms_to("Decodable")
        .case_with(
            "move",
            vec![
                CaseParam::labeled("x", Ty::int()),
                CaseParam::labeled("y", Ty::int()).with_default(Literal::Int(0)),
            ],
        )
        .keys_enum("CodingKeys", &["move"])
        .keys_enum("CodingKeys_move", &["x"])
        .finish();
    let (decode, sink) = derive(&mut arena, command, KnownProtocol::Decodable);
    assert!(sink.is_empty(), "{}", render(&sink));
    check_body(
        &arena,
        decode.unwrap(),
        expect![[r#"
            let container = try decoder.container(keyedBy: CodingKeys.self)
            switch container.allKeys.first {
            case CodingKeys.move?:
                let nestedContainer = try container.nestedContainer(keyedBy: CodingKeys_move.self, forKey: CodingKeys.move)
                self = Command.move(x: try nestedContainer.decode(Int.self, forKey: CodingKeys_move.x), y: 0)
            default:
                throw DecodingError.valueNotFound(Command.self, DecodingError.Context(codingPath: container.codingPath, debugDescription: "Could not find value of type 'Command'"))
            }
        "#]],
    );
}

#[test]
fn uncovered_union_case_throws_at_runtime_by_default() {
    let mut arena = DeclArena::new();
    let flag = arena
        .enum_type("Flag")
        .conforms_to("Encodable")
        .case("on")
        .case("off")
        .keys_enum("CodingKeys", &["on"])
        .finish();
    let encode = derive(&mut arena, flag, KnownProtocol::Encodable).0.unwrap();
    check_body(
        &arena,
        encode,
        expect![[r#"
            var container = encoder.container(keyedBy: CodingKeys.self)
            switch self {
            case .on:
                var nestedContainer = container.nestedContainer(keyedBy: CodingKeys_on.self, forKey: CodingKeys.on)
            case .off:
                throw EncodingError.invalidValue(self, EncodingError.Context(codingPath: encoder.codingPath, debugDescription: "Case 'off' of 'Flag' cannot be encoded because it has no coding key"))
            }
        "#]],
    );
}

#[test]
fn uncovered_union_case_rejected_by_policy() {
    let mut arena = DeclArena::new();
    let flag = arena
        .enum_type("Flag")
        .conforms_to("Encodable")
        .case("on")
        .case_decl("off", Vec::new(), Some(Span::new(30, 33)))
        .keys_enum("CodingKeys", &["on"])
        .finish();
    let config = SynthesisConfig::default().with_policy(UncoveredCasePolicy::Reject);
    let (member, sink) = derive_with(&mut arena, flag, KnownProtocol::Encodable, &config);
    assert!(member.is_none());
    expect![[r#"
        error[COD001]: type 'Flag' does not conform to protocol 'Encodable'
        note[COD002]: protocol requires function 'encode(to:)'
        note[COD041]: cannot automatically synthesize 'Encodable' because case 'off' has no matching case in 'CodingKeys'"#]]
    .assert_eq(&render(&sink));
    assert_eq!(sink.diagnostics()[2].span(), Some(Span::new(30, 33)));
}

#[test]
fn union_with_partially_conforming_payload_keeps_nested_keys() {
    let mut arena = DeclArena::new();
    let event = arena
        .enum_type("Event")
        .conforms_to("Encodable")
        .case_with(
            "click",
            vec![
                CaseParam::labeled("x", Ty::int()),
                CaseParam::labeled("target", Ty::named("View")),
                CaseParam::labeled("handler", Ty::function(Vec::new(), Ty::named("Void"))),
            ],
        )
        .finish();
    let (member, sink) = derive(&mut arena, event, KnownProtocol::Encodable);
    assert!(member.is_none());
    expect![[r#"
        error[COD001]: type 'Event' does not conform to protocol 'Encodable'
        note[COD002]: protocol requires function 'encode(to:)'
        note[COD013]: cannot automatically synthesize 'Encodable' because 'View' does not conform to 'Encodable'
        note[COD013]: cannot automatically synthesize 'Encodable' because '() -> Void' does not conform to 'Encodable'"#]]
    .assert_eq(&render(&sink));
    let nested = keys_of(&arena, event, "CodingKeys_click");
    assert_eq!(case_names(&arena, nested), ["x"]);
}

#[test]
fn extraneous_union_key_is_reported() {
    let mut arena = DeclArena::new();
    let flag = arena
        .enum_type("Flag")
        .conforms_to("Codable")
        .case("on")
        .keys_enum("CodingKeys", &["on", "maybe"])
        .finish();
    let (member, sink) = derive(&mut arena, flag, KnownProtocol::Decodable);
    assert!(member.is_none());
    expect![[r#"
        error[COD001]: type 'Flag' does not conform to protocol 'Decodable'
        note[COD002]: protocol requires initializer 'init(from:)'
        note[COD012]: CodingKey case 'maybe' does not match any case of 'Flag'"#]]
    .assert_eq(&render(&sink));
}

#[test]
fn key_validation_failures() {
    let mut arena = DeclArena::new();
    let extra = arena
        .struct_type("Extra")
        .conforms_to("Codable")
        .stored("a", Ty::int())
        .keys_enum_spanned("CodingKeys", &[("a", None), ("b", Some(Span::new(40, 41)))])
        .finish();
    let (member, sink) = derive(&mut arena, extra, KnownProtocol::Encodable);
    assert!(member.is_none());
    expect![[r#"
        error[COD001]: type 'Extra' does not conform to protocol 'Encodable'
        note[COD002]: protocol requires function 'encode(to:)'
        note[COD012]: CodingKey case 'b' does not match any stored properties"#]]
    .assert_eq(&render(&sink));
    assert_eq!(sink.diagnostics()[2].span(), Some(Span::new(40, 41)));

    let partial = arena
        .struct_type("Partial")
        .conforms_to("Decodable")
        .stored("a", Ty::int())
        .stored("b", Ty::int())
        .stored("note", Ty::optional(Ty::string()))
        .field(Field::constant("version", Ty::int()).initial(Literal::Int(1)))
        .keys_enum("CodingKeys", &["a"])
        .finish();
    let (member, sink) = derive(&mut arena, partial, KnownProtocol::Decodable);
    assert!(member.is_none());
    expect![[r#"
        error[COD001]: type 'Partial' does not conform to protocol 'Decodable'
        note[COD002]: protocol requires initializer 'init(from:)'
        note[COD014]: cannot automatically synthesize 'Decodable' because 'b' does not have a matching CodingKey and does not have a default value"#]]
    .assert_eq(&render(&sink));

    // Encoding does not care about properties left out of the keys.
    let (member, sink) = derive(&mut arena, partial, KnownProtocol::Encodable);
    assert!(member.is_some(), "{}", render(&sink));
}

#[test]
fn key_validation_reports_every_mismatch_in_order() {
    let mut arena = DeclArena::new();
    let extra = arena
        .struct_type("Extra")
        .conforms_to("Encodable")
        .stored("a", Ty::int())
        .field(Field::var("widget", Ty::named("Widget")).span(Span::new(20, 26)))
        .keys_enum_spanned(
            "CodingKeys",
            &[
                ("a", None),
                ("b", Some(Span::new(40, 41))),
                ("widget", None),
                ("c", Some(Span::new(50, 51))),
                ("d", Some(Span::new(60, 61))),
            ],
        )
        .finish();
    let (member, sink) = derive(&mut arena, extra, KnownProtocol::Encodable);
    assert!(member.is_none());
    expect![[r#"
        error[COD001]: type 'Extra' does not conform to protocol 'Encodable'
        note[COD002]: protocol requires function 'encode(to:)'
        note[COD012]: CodingKey case 'b' does not match any stored properties
        note[COD013]: cannot automatically synthesize 'Encodable' because 'Widget' does not conform to 'Encodable'
        note[COD012]: CodingKey case 'c' does not match any stored properties
        note[COD012]: CodingKey case 'd' does not match any stored properties"#]]
    .assert_eq(&render(&sink));
    let spans: Vec<_> = sink.diagnostics()[2..].iter().map(|diag| diag.span()).collect();
    assert_eq!(
        spans,
        [
            Some(Span::new(40, 41)),
            Some(Span::new(20, 26)),
            Some(Span::new(50, 51)),
            Some(Span::new(60, 61)),
        ]
    );
}

#[test]
fn non_conforming_member_stays_matched_by_later_keys() {
    let mut arena = DeclArena::new();
    let twice = arena
        .struct_type("Twice")
        .conforms_to("Encodable")
        .stored("widget", Ty::named("Widget"))
        .keys_enum("CodingKeys", &["widget", "widget"])
        .finish();
    let (member, sink) = derive(&mut arena, twice, KnownProtocol::Encodable);
    assert!(member.is_none());
    let codes: Vec<_> = sink
        .diagnostics()
        .iter()
        .map(|diag| diag.code.as_ref().unwrap().code.as_str())
        .collect();
    assert_eq!(codes, ["COD001", "COD002", "COD013", "COD013"]);
}

#[test]
fn non_conforming_property_blocks_key_synthesis() {
    let mut arena = DeclArena::new();
    let holder = arena
        .struct_type("Holder")
        .conforms_to("Encodable")
        .stored("id", Ty::int())
        .field(Field::var("widget", Ty::named("Widget")).span(Span::new(10, 16)))
        .finish();
    let (member, sink) = derive(&mut arena, holder, KnownProtocol::Encodable);
    assert!(member.is_none());
    expect![[r#"
        error[COD001]: type 'Holder' does not conform to protocol 'Encodable'
        note[COD002]: protocol requires function 'encode(to:)'
        note[COD013]: cannot automatically synthesize 'Encodable' because 'Widget' does not conform to 'Encodable'"#]]
    .assert_eq(&render(&sink));
    assert_eq!(sink.diagnostics()[2].span(), Some(Span::new(10, 16)));
    assert!(arena.lookup_direct(holder, "CodingKeys").is_empty());
}

#[test]
fn malformed_key_declarations() {
    let mut arena = DeclArena::new();
    let aliased = arena
        .struct_type("Aliased")
        .conforms_to("Encodable")
        .stored("a", Ty::int())
        .type_alias("CodingKeys", Ty::string())
        .finish();
    let (_, sink) = derive(&mut arena, aliased, KnownProtocol::Encodable);
    assert_eq!(
        sink.diagnostics()[2].to_string(),
        "note[COD011]: cannot automatically synthesize 'Encodable' because 'CodingKeys' does not conform to CodingKey"
    );

    let property = arena
        .struct_type("Property")
        .conforms_to("Encodable")
        .stored("CodingKeys", Ty::int())
        .finish();
    let (_, sink) = derive(&mut arena, property, KnownProtocol::Encodable);
    assert_eq!(
        sink.diagnostics()[2].to_string(),
        "note[COD010]: cannot automatically synthesize 'Encodable' because 'CodingKeys' is not an enum"
    );

    let nested = arena
        .struct_type("Nested")
        .conforms_to("Encodable")
        .nested("CodingKeys", NominalKind::Struct, None)
        .finish();
    let (member, sink) = derive(&mut arena, nested, KnownProtocol::Encodable);
    assert!(member.is_none());
    assert_eq!(
        sink.diagnostics()[2].code.as_ref().unwrap().code,
        diagnostics::codes::KEYS_NOT_CODING_KEY
    );
}

#[test]
fn aliased_keys_enum_is_used() {
    let mut arena = DeclArena::new();
    let keys = arena
        .enum_type("SharedKeys")
        .conforms_to("CodingKey")
        .case("id")
        .finish();
    let record = arena
        .struct_type("Record")
        .conforms_to("Encodable")
        .stored("id", Ty::int())
        .type_alias("CodingKeys", Ty::nominal(keys))
        .finish();
    let encode = derive(&mut arena, record, KnownProtocol::Encodable).0.unwrap();
    check_body(
        &arena,
        encode,
        expect![[r#"
            var container = encoder.container(keyedBy: SharedKeys.self)
            try container.encode(self.id, forKey: SharedKeys.id)
        "#]],
    );
}

#[test]
fn immutable_initialized_property_warns_when_keys_are_implicit() {
    let mut arena = DeclArena::new();
    let config = arena
        .struct_type("Config")
        .conforms_to("Decodable")
        .field(
            Field::constant("version", Ty::int())
                .initial(Literal::Int(2))
                .span(Span::new(4, 20))
                .introducer_span(Span::new(4, 7)),
        )
        .stored("name", Ty::string())
        .finish();
    let (decode, sink) = derive(&mut arena, config, KnownProtocol::Decodable);
    assert!(sink.is_empty());
    let (text, warnings) = body_with(&arena, decode.unwrap(), &SynthesisConfig::default());
    expect![[r#"
        let container = try decoder.container(keyedBy: CodingKeys.self)
        self.name = try container.decode(String.self, forKey: CodingKeys.name)
    "#]]
    .assert_eq(&text);
    expect![[r#"
        warning[COD030]: immutable property will not be decoded because it is declared with an initial value which cannot be overwritten
        note[COD031]: set the initial value via the initializer or explicitly define a CodingKeys enum without a 'version' case to silence this warning
        note[COD033]: make the property mutable instead"#]]
    .assert_eq(&render(&warnings));
    let fix = &warnings.diagnostics()[2].suggestions[0];
    assert_eq!(fix.span, Some(Span::new(4, 7)));
    assert_eq!(fix.replacement.as_deref(), Some("var"));
}

#[test]
fn failed_decode_body_reports_no_warnings() {
    let mut arena = DeclArena::new();
    let config = arena
        .struct_type("Config")
        .conforms_to("Decodable")
        .field(Field::constant("version", Ty::int()).initial(Literal::Int(2)))
        .stored("name", Ty::string())
        .finish();
    let decode = derive(&mut arena, config, KnownProtocol::Decodable).0.unwrap();
    let keys = keys_of(&arena, config, "CodingKeys");
    arena.add_member(
        keys,
        crate::decl::Decl::new(
            "ghost",
            crate::decl::DeclKind::EnumCase(crate::decl::EnumCaseDecl::default()),
        ),
    );

    let oracle = ConformanceTable::default();
    let mut sink = DiagnosticSink::new("COD");
    let err = synthesize_body(&arena, decode, &SynthesisConfig::default(), &oracle, &mut sink)
        .unwrap_err();
    assert!(err.to_string().contains("matches key 'ghost'"), "{err}");
    assert!(sink.is_empty(), "{}", render(&sink));
}

#[test]
fn immutable_property_warning_depends_on_keys_and_encodable() {
    fn warnings(protocol: &str, explicit: bool) -> String {
        let mut arena = DeclArena::new();
        let mut builder = arena
            .struct_type("Config")
            .conforms_to(protocol)
            .field(Field::constant("version", Ty::int()).initial(Literal::Int(2)));
        if explicit {
            builder = builder.keys_enum("CodingKeys", &["version"]);
        }
        let config = builder.finish();
        let decode = derive(&mut arena, config, KnownProtocol::Decodable).0.unwrap();
        let (_, sink) = body_with(&arena, decode, &SynthesisConfig::default());
        sink.diagnostics()
            .iter()
            .map(|diag| diag.code.as_ref().unwrap().code.clone())
            .collect::<Vec<_>>()
            .join(",")
    }
    assert_eq!(warnings("Codable", false), "COD030,COD031,COD033");
    assert_eq!(warnings("Decodable", true), "COD030,COD032,COD033");
    assert_eq!(warnings("Codable", true), "");
}

#[test]
fn wrapped_property_codes_through_backing_store() {
    let mut arena = DeclArena::new();
    let clamped = arena
        .struct_type("Clamped")
        .conforms_to("Codable")
        .stored("wrappedValue", Ty::int())
        .finish();
    let settings = arena
        .struct_type("Settings")
        .conforms_to("Codable")
        .field(Field::var("volume", Ty::int()).wrapped_by(Ty::nominal(clamped)))
        .finish();
    let encode = derive(&mut arena, settings, KnownProtocol::Encodable).0.unwrap();
    let decode = derive(&mut arena, settings, KnownProtocol::Decodable).0.unwrap();
    check_body(
        &arena,
        encode,
        expect![[r#"
            var container = encoder.container(keyedBy: CodingKeys.self)
            try container.encode(self._volume, forKey: CodingKeys.volume)
        "#]],
    );
    check_body(
        &arena,
        decode,
        expect![[r#"
            let container = try decoder.container(keyedBy: CodingKeys.self)
            self._volume = try container.decode(Clamped.self, forKey: CodingKeys.volume)
        "#]],
    );
}

#[test]
fn generic_members_conform_through_where_clause() {
    let mut arena = DeclArena::new();
    let boxed = arena
        .struct_type("Box")
        .generic_param("T", &[])
        .conforms_to_where("Codable", &[("T", "Codable")])
        .stored("value", Ty::param("T"))
        .stored("items", Ty::array(Ty::param("T")))
        .finish();
    let decode = derive(&mut arena, boxed, KnownProtocol::Decodable).0.unwrap();
    check_body(
        &arena,
        decode,
        expect![[r#"
            let container = try decoder.container(keyedBy: CodingKeys.self)
            self.value = try container.decode(T.self, forKey: CodingKeys.value)
            self.items = try container.decode([T].self, forKey: CodingKeys.items)
        "#]],
    );

    let unbounded = arena
        .struct_type("Loose")
        .generic_param("T", &[])
        .conforms_to("Encodable")
        .stored("value", Ty::param("T"))
        .finish();
    assert!(derive(&mut arena, unbounded, KnownProtocol::Encodable).0.is_none());
}

#[test]
fn disallowed_extension_contexts() {
    let mut arena = DeclArena::new();
    let remote = arena
        .struct_type("Remote")
        .span(Span::in_file(FileId(1), 0, 10))
        .conforms_in_extension("Encodable", FileId(2))
        .stored("id", Ty::int())
        .finish();
    let (member, sink) = derive(&mut arena, remote, KnownProtocol::Encodable);
    assert!(member.is_none());
    expect![[r#"
        error[COD042]: implementation of 'Encodable' cannot be automatically synthesized in an extension in a different file to the type"#]]
    .assert_eq(&render(&sink));

    let open = arena
        .class_type("Model")
        .span(Span::in_file(FileId(1), 20, 30))
        .conforms_in_extension("Decodable", FileId(1))
        .finish();
    let (member, sink) = derive(&mut arena, open, KnownProtocol::Decodable);
    assert!(member.is_none());
    expect![[r#"
        error[COD043]: implementation of 'Decodable' for non-final class cannot be automatically synthesized in extension because initializer requirement 'init(from:)' can only be satisfied by a 'required' initializer in the class definition"#]]
    .assert_eq(&render(&sink));

    let sealed = arena
        .class_type("Sealed")
        .span(Span::in_file(FileId(1), 40, 50))
        .mark_final()
        .conforms_in_extension("Decodable", FileId(1))
        .finish();
    let (member, _) = derive(&mut arena, sealed, KnownProtocol::Decodable);
    assert!(!arena.get(member.unwrap()).as_constructor().unwrap().required);
}

#[test]
fn broken_requirement_and_unsupported_kinds() {
    let mut arena = DeclArena::new();
    let point = arena.struct_type("Point").conforms_to("Encodable").finish();
    let config = SynthesisConfig::default();
    let oracle = ConformanceTable::default();
    let derivation = Derivation::new(&arena, point, KnownProtocol::Encodable, &config, &oracle);
    let mut sink = DiagnosticSink::default();
    let mut requirement = Requirement::encode_to();
    requirement.base_name = "serialize".into();
    assert!(derive_encodable(&derivation, &mut arena, &requirement, &mut sink).is_none());
    assert_eq!(
        render(&sink),
        "error[COD040]: Encodable protocol is broken: unexpected requirement"
    );

    let proto = arena.protocol_type("Shape").conforms_to("Encodable").finish();
    let (member, sink) = derive(&mut arena, proto, KnownProtocol::Encodable);
    assert!(member.is_none());
    assert!(sink.is_empty());
}

#[test]
fn classification_and_idempotent_synthesis() {
    let mut arena = DeclArena::new();
    let point = arena
        .struct_type("Point")
        .conforms_to("Codable")
        .stored("x", Ty::int())
        .finish();
    let config = SynthesisConfig::default();
    let oracle = ConformanceTable::default();
    let derivation = Derivation::new(&arena, point, KnownProtocol::Encodable, &config, &oracle);
    let mut diags = DiagnosticTransaction::new();
    assert_eq!(
        classify_coding_keys(&derivation, &arena, &mut diags),
        Classification::NeedsSynthesis
    );
    assert!(synthesize_coding_keys(&derivation, &mut arena, &mut diags));
    assert!(synthesize_coding_keys(&derivation, &mut arena, &mut diags));
    assert_eq!(arena.lookup_direct(point, "CodingKeys").len(), 1);
    assert_eq!(
        classify_coding_keys(&derivation, &arena, &mut diags),
        Classification::Valid
    );
    assert!(diags.pending().is_empty());
}

#[test]
fn custom_key_names_from_config() {
    let mut arena = DeclArena::new();
    let shape = arena
        .enum_type("Shape")
        .conforms_to("Encodable")
        .case_with("circle", vec![CaseParam::labeled("r", Ty::double())])
        .finish();
    let config = SynthesisConfig {
        coding_keys_name: "Keys".into(),
        case_key_separator: "__".into(),
        ..SynthesisConfig::default()
    };
    let (member, sink) = derive_with(&mut arena, shape, KnownProtocol::Encodable, &config);
    assert!(sink.is_empty());
    assert!(lookup_keys_enum(&arena, shape, "Keys").is_some());
    let nested = keys_of(&arena, shape, "Keys__circle");
    assert_eq!(case_names(&arena, nested), ["r"]);
    let (text, _) = body_with(&arena, member.unwrap(), &config);
    assert!(text.contains("nestedContainer(keyedBy: Keys__circle.self, forKey: Keys.circle)"));
}

#[test]
fn body_synthesis_requires_a_lazy_body() {
    let mut arena = DeclArena::new();
    let point = arena
        .struct_type("Point")
        .method("encode", Vec::new(), true)
        .finish();
    let method = arena.lookup_direct(point, "encode")[0];
    let oracle = ConformanceTable::default();
    let mut sink = DiagnosticSink::default();
    let err = synthesize_body(&arena, method, &SynthesisConfig::default(), &oracle, &mut sink)
        .unwrap_err();
    assert!(err.to_string().contains("no synthesized body"));
}
