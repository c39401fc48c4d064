use crate::conformance::KnownProtocol;
use crate::decl::Access;
use crate::diagnostics::{Diagnostic, DiagnosticCode, Span, Suggestion};

pub mod codes {
    pub const TYPE_DOES_NOT_CONFORM: &str = "COD001";
    pub const PROTOCOL_REQUIRES: &str = "COD002";

    pub const KEYS_NOT_AN_ENUM: &str = "COD010";
    pub const KEYS_NOT_CODING_KEY: &str = "COD011";
    pub const EXTRANEOUS_KEY: &str = "COD012";
    pub const NON_CONFORMING_PROPERTY: &str = "COD013";
    pub const NON_DECODED_PROPERTY: &str = "COD014";

    pub const NO_SUPER_INIT: &str = "COD020";
    pub const SUPER_INIT_NOT_DESIGNATED: &str = "COD021";
    pub const SUPER_INIT_INACCESSIBLE: &str = "COD022";
    pub const SUPER_INIT_FAILABLE: &str = "COD023";

    pub const PROPERTY_WILL_NOT_BE_DECODED: &str = "COD030";
    pub const INIT_OR_IMPLICIT_KEYS: &str = "COD031";
    pub const INIT_OR_EXPLICIT_KEYS: &str = "COD032";
    pub const MAKE_PROPERTY_MUTABLE: &str = "COD033";

    pub const BROKEN_REQUIREMENT: &str = "COD040";
    pub const UNCOVERED_CASE: &str = "COD041";
    pub const EXTENSION_IN_OTHER_FILE: &str = "COD042";
    pub const NON_FINAL_CLASS_EXTENSION: &str = "COD043";
}

const CATEGORY: &str = "codable";

fn coded(diagnostic: Diagnostic, code: &'static str) -> Diagnostic {
    diagnostic.with_code(DiagnosticCode::new(code, Some(CATEGORY.into())))
}

#[must_use]
pub fn error(code: &'static str, message: impl Into<String>, span: Option<Span>) -> Diagnostic {
    coded(Diagnostic::error(message, span), code)
}

#[must_use]
pub fn warning(code: &'static str, message: impl Into<String>, span: Option<Span>) -> Diagnostic {
    coded(Diagnostic::warning(message, span), code)
}

#[must_use]
pub fn note(code: &'static str, message: impl Into<String>, span: Option<Span>) -> Diagnostic {
    coded(Diagnostic::note(message, span), code)
}

#[must_use]
pub fn type_does_not_conform(type_name: &str, protocol: KnownProtocol, span: Option<Span>) -> Diagnostic {
    error(
        codes::TYPE_DOES_NOT_CONFORM,
        format!("type '{type_name}' does not conform to protocol '{protocol}'"),
        span,
    )
}

#[must_use]
pub fn protocol_requires(kind: &str, requirement: &str, span: Option<Span>) -> Diagnostic {
    note(
        codes::PROTOCOL_REQUIRES,
        format!("protocol requires {kind} '{requirement}'"),
        span,
    )
}

#[must_use]
pub fn keys_not_an_enum(protocol: KnownProtocol, keys_name: &str, span: Option<Span>) -> Diagnostic {
    note(
        codes::KEYS_NOT_AN_ENUM,
        format!("cannot automatically synthesize '{protocol}' because '{keys_name}' is not an enum"),
        span,
    )
}

#[must_use]
pub fn keys_not_coding_key(protocol: KnownProtocol, keys_name: &str, span: Option<Span>) -> Diagnostic {
    note(
        codes::KEYS_NOT_CODING_KEY,
        format!(
            "cannot automatically synthesize '{protocol}' because '{keys_name}' does not conform to CodingKey"
        ),
        span,
    )
}

#[must_use]
pub fn extraneous_key(case: &str, span: Option<Span>) -> Diagnostic {
    note(
        codes::EXTRANEOUS_KEY,
        format!("CodingKey case '{case}' does not match any stored properties"),
        span,
    )
}

#[must_use]
pub fn extraneous_union_key(case: &str, enum_name: &str, span: Option<Span>) -> Diagnostic {
    note(
        codes::EXTRANEOUS_KEY,
        format!("CodingKey case '{case}' does not match any case of '{enum_name}'"),
        span,
    )
}

#[must_use]
pub fn non_conforming_property(protocol: KnownProtocol, type_name: &str, span: Option<Span>) -> Diagnostic {
    note(
        codes::NON_CONFORMING_PROPERTY,
        format!(
            "cannot automatically synthesize '{protocol}' because '{type_name}' does not conform to '{protocol}'"
        ),
        span,
    )
}

#[must_use]
pub fn non_decoded_property(protocol: KnownProtocol, name: &str, span: Option<Span>) -> Diagnostic {
    note(
        codes::NON_DECODED_PROPERTY,
        format!(
            "cannot automatically synthesize '{protocol}' because '{name}' does not have a matching CodingKey and does not have a default value"
        ),
        span,
    )
}

#[must_use]
pub fn no_super_init(requirement: &str, member: &str, span: Option<Span>) -> Diagnostic {
    note(
        codes::NO_SUPER_INIT,
        format!(
            "cannot automatically synthesize '{requirement}' because superclass does not have a callable '{member}'"
        ),
        span,
    )
}

#[must_use]
pub fn super_init_not_designated(requirement: &str, member: &str, span: Option<Span>) -> Diagnostic {
    note(
        codes::SUPER_INIT_NOT_DESIGNATED,
        format!(
            "cannot automatically synthesize '{requirement}' because implementation would need to call '{member}', which is not designated"
        ),
        span,
    )
}

#[must_use]
pub fn super_init_inaccessible(
    requirement: &str,
    member: &str,
    access: Access,
    span: Option<Span>,
) -> Diagnostic {
    note(
        codes::SUPER_INIT_INACCESSIBLE,
        format!(
            "cannot automatically synthesize '{requirement}' because implementation would need to call '{member}', which is {}",
            access.as_str()
        ),
        span,
    )
}

#[must_use]
pub fn super_init_failable(requirement: &str, member: &str, span: Option<Span>) -> Diagnostic {
    note(
        codes::SUPER_INIT_FAILABLE,
        format!(
            "cannot automatically synthesize '{requirement}' because implementation would need to call '{member}', which is failable"
        ),
        span,
    )
}

#[must_use]
pub fn property_will_not_be_decoded(span: Option<Span>) -> Diagnostic {
    warning(
        codes::PROPERTY_WILL_NOT_BE_DECODED,
        "immutable property will not be decoded because it is declared with an initial value which cannot be overwritten",
        span,
    )
}

#[must_use]
pub fn init_or_implicit_keys(including: bool, name: &str, span: Option<Span>) -> Diagnostic {
    let select = if including { "including" } else { "without" };
    note(
        codes::INIT_OR_IMPLICIT_KEYS,
        format!(
            "set the initial value via the initializer or explicitly define a CodingKeys enum {select} a '{name}' case to silence this warning"
        ),
        span,
    )
}

#[must_use]
pub fn init_or_explicit_keys(name: &str, span: Option<Span>) -> Diagnostic {
    note(
        codes::INIT_OR_EXPLICIT_KEYS,
        format!(
            "set the initial value via the initializer or remove the '{name}' case from the CodingKeys enum to silence this warning"
        ),
        span,
    )
}

#[must_use]
pub fn make_property_mutable(span: Option<Span>, introducer: Option<Span>) -> Diagnostic {
    note(codes::MAKE_PROPERTY_MUTABLE, "make the property mutable instead", span).with_suggestion(
        Suggestion::new("replace 'let' with 'var'", introducer, Some("var".into())),
    )
}

#[must_use]
pub fn broken_requirement(protocol: KnownProtocol, span: Option<Span>) -> Diagnostic {
    error(
        codes::BROKEN_REQUIREMENT,
        format!("{protocol} protocol is broken: unexpected requirement"),
        span,
    )
}

#[must_use]
pub fn uncovered_case(case: &str, keys_name: &str, span: Option<Span>) -> Diagnostic {
    note(
        codes::UNCOVERED_CASE,
        format!(
            "cannot automatically synthesize 'Encodable' because case '{case}' has no matching case in '{keys_name}'"
        ),
        span,
    )
}

#[must_use]
pub fn extension_in_other_file(protocol: KnownProtocol, span: Option<Span>) -> Diagnostic {
    error(
        codes::EXTENSION_IN_OTHER_FILE,
        format!(
            "implementation of '{protocol}' cannot be automatically synthesized in an extension in a different file to the type"
        ),
        span,
    )
}

#[must_use]
pub fn non_final_class_extension(requirement: &str, span: Option<Span>) -> Diagnostic {
    error(
        codes::NON_FINAL_CLASS_EXTENSION,
        format!(
            "implementation of 'Decodable' for non-final class cannot be automatically synthesized in extension because initializer requirement '{requirement}' can only be satisfied by a 'required' initializer in the class definition"
        ),
        span,
    )
}
