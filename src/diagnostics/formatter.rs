use std::fmt::Write;

use serde::Serialize;

use super::{Diagnostic, DiagnosticCode, FileCache, Label, LineCol, Severity, Span, Suggestion};

pub const JSON_SCHEMA_VERSION: &str = "1.0.0";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorFormat {
    Human,
    Json,
    Short,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FormatOptions {
    pub format: ErrorFormat,
    pub color: bool,
}

impl FormatOptions {
    #[must_use]
    pub fn plain(format: ErrorFormat) -> Self {
        Self {
            format,
            color: false,
        }
    }
}

/// Render a collection of diagnostics to a single string.
#[must_use]
pub fn format_diagnostics(
    diagnostics: &[Diagnostic],
    files: &FileCache,
    options: FormatOptions,
) -> String {
    let mut rendered = String::new();
    for (index, diagnostic) in diagnostics.iter().enumerate() {
        if index > 0 {
            rendered.push('\n');
        }
        let chunk = match options.format {
            ErrorFormat::Human => render_human(diagnostic, files, options.color),
            ErrorFormat::Short => render_short(diagnostic, files),
            ErrorFormat::Json => render_json(diagnostic, files),
        };
        rendered.push_str(&chunk);
    }
    rendered
}

fn render_human(diagnostic: &Diagnostic, files: &FileCache, color: bool) -> String {
    let mut out = format_header(diagnostic, color);
    out.push('\n');
    let (path, location) = locate_primary(diagnostic, files);
    out.push_str(&format_location_arrow(&path, location.as_ref()));
    if let Some(label) = diagnostic.primary_label.as_ref() {
        out.push_str(&render_snippet(label, files));
    }
    for note in &diagnostic.notes {
        let _ = write!(out, "\nnote: {note}");
    }
    for suggestion in &diagnostic.suggestions {
        let _ = write!(out, "\nhelp: {}", suggestion.message);
        if let Some(replacement) = &suggestion.replacement {
            let _ = write!(out, " replace with `{replacement}`");
        }
    }
    out
}

fn render_short(diagnostic: &Diagnostic, files: &FileCache) -> String {
    let (path, location) = locate_primary(diagnostic, files);
    let (line, column) = location
        .map(|loc| (loc.line.to_string(), loc.column.to_string()))
        .unwrap_or_else(|| ("?".into(), "?".into()));
    let mut out = format!(
        "{path}:{line}:{column}: {}[{}]: {}",
        diagnostic.severity.as_str(),
        code_text(diagnostic),
        diagnostic.message
    );
    for suggestion in &diagnostic.suggestions {
        let _ = write!(out, "; suggestion: {}", suggestion.message);
    }
    out
}

fn render_json(diagnostic: &Diagnostic, files: &FileCache) -> String {
    let payload = JsonDiagnostic {
        version: JSON_SCHEMA_VERSION,
        severity: diagnostic.severity.as_str(),
        code: diagnostic.code.as_ref(),
        message: &diagnostic.message,
        primary_span: diagnostic
            .primary_label
            .as_ref()
            .and_then(|label| JsonSpan::from_span(label.span, files)),
        notes: &diagnostic.notes,
        suggestions: diagnostic
            .suggestions
            .iter()
            .map(|suggestion| JsonSuggestion::from_suggestion(suggestion, files))
            .collect(),
    };
    serde_json::to_string(&payload).unwrap_or_else(|_| "{}".into())
}

fn code_text(diagnostic: &Diagnostic) -> &str {
    diagnostic
        .code
        .as_ref()
        .map(|c| c.code.as_str())
        .unwrap_or("UNKNOWN")
}

fn format_header(diagnostic: &Diagnostic, color: bool) -> String {
    let severity = diagnostic.severity.as_str();
    let prefix = if color {
        format!(
            "\u{1b}[{}m{severity}\u{1b}[0m",
            severity_color(diagnostic.severity)
        )
    } else {
        severity.to_string()
    };
    format!("{prefix}[{}]: {}", code_text(diagnostic), diagnostic.message)
}

fn format_location_arrow(path: &str, loc: Option<&LineCol>) -> String {
    match loc {
        Some(loc) => format!("  --> {path}:{}:{}\n   |\n", loc.line, loc.column),
        None => format!("  --> {path}:?:?\n   |\n"),
    }
}

fn render_snippet(label: &Label, files: &FileCache) -> String {
    let mut out = String::new();
    let Some(file) = files.get(label.span.file_id) else {
        return out;
    };
    let Some(loc) = file.line_col(label.span.start) else {
        return out;
    };
    let Some(line) = file.line(loc.line) else {
        return out;
    };
    let width = file
        .source
        .get(label.span.start..label.span.end)
        .map_or(1, |text| text.chars().count().max(1));
    let _ = writeln!(out, "{:>4} | {line}", loc.line);
    let _ = write!(
        out,
        "{:>4} | {}{} {}",
        "",
        " ".repeat(loc.column.saturating_sub(1)),
        "^".repeat(width),
        label.message
    );
    out
}

fn locate_primary(diagnostic: &Diagnostic, files: &FileCache) -> (String, Option<LineCol>) {
    if let Some(label) = diagnostic.primary_label.as_ref() {
        if let Some(path) = files.path(label.span.file_id) {
            return (
                path.display().to_string(),
                files.line_col(label.span.file_id, label.span.start),
            );
        }
    }
    ("<unknown>".into(), None)
}

fn severity_color(severity: Severity) -> &'static str {
    match severity {
        Severity::Error => "1;31",
        Severity::Warning => "1;33",
        Severity::Note => "1;34",
    }
}

#[derive(Serialize)]
struct JsonDiagnostic<'a> {
    version: &'static str,
    severity: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<&'a DiagnosticCode>,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    primary_span: Option<JsonSpan>,
    #[serde(skip_serializing_if = "<[String]>::is_empty")]
    notes: &'a [String],
    #[serde(skip_serializing_if = "Vec::is_empty")]
    suggestions: Vec<JsonSuggestion<'a>>,
}

#[derive(Serialize)]
struct JsonSpan {
    file: String,
    start: usize,
    end: usize,
    line_start: usize,
    column_start: usize,
}

impl JsonSpan {
    fn from_span(span: Span, files: &FileCache) -> Option<Self> {
        let file = files.get(span.file_id)?;
        let line_col = file.line_col(span.start)?;
        Some(Self {
            file: file.path.display().to_string(),
            start: span.start,
            end: span.end,
            line_start: line_col.line,
            column_start: line_col.column,
        })
    }
}

#[derive(Serialize)]
struct JsonSuggestion<'a> {
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    span: Option<JsonSpan>,
    #[serde(skip_serializing_if = "Option::is_none")]
    replacement: Option<&'a str>,
}

impl<'a> JsonSuggestion<'a> {
    fn from_suggestion(suggestion: &'a Suggestion, files: &FileCache) -> Self {
        Self {
            message: &suggestion.message,
            span: suggestion
                .span
                .and_then(|span| JsonSpan::from_span(span, files)),
            replacement: suggestion.replacement.as_deref(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    fn sample() -> (FileCache, Diagnostic) {
        let mut files = FileCache::default();
        let source = "struct Point {\n    let z: Widget\n}\n";
        let file_id = files.add_file("point.swift", source);
        let start = source.find("Widget").unwrap();
        let span = Span::in_file(file_id, start, start + "Widget".len());
        let mut diagnostic = Diagnostic::note(
            "cannot automatically synthesize 'Encodable' because 'Widget' does not conform to 'Encodable'",
            Some(span),
        )
        .with_primary_label("here")
        .with_code(DiagnosticCode::new("COD013", Some("codable".into())));
        diagnostic.add_note("stage: derive");
        diagnostic.add_suggestion(Suggestion::new(
            "make the property mutable instead",
            Some(span),
            Some("var".into()),
        ));
        (files, diagnostic)
    }

    #[test]
    fn human_format_includes_snippet_and_metadata() {
        let (files, diagnostic) = sample();
        let rendered = format_diagnostics(
            &[diagnostic],
            &files,
            FormatOptions::plain(ErrorFormat::Human),
        );
        assert!(
            rendered.starts_with("note[COD013]: cannot automatically synthesize"),
            "{rendered}"
        );
        assert!(rendered.contains("--> point.swift:2:12"), "{rendered}");
        assert!(rendered.contains("   2 |     let z: Widget"), "{rendered}");
        assert!(rendered.contains("^^^^^^ here"), "{rendered}");
        assert!(rendered.contains("note: stage: derive"), "{rendered}");
        assert!(
            rendered.contains("help: make the property mutable instead replace with `var`"),
            "{rendered}"
        );
    }

    #[test]
    fn short_format_is_single_line() {
        let (files, diagnostic) = sample();
        let rendered = format_diagnostics(
            &[diagnostic],
            &files,
            FormatOptions::plain(ErrorFormat::Short),
        );
        assert!(
            rendered.starts_with("point.swift:2:12: note[COD013]:"),
            "{rendered}"
        );
        assert_eq!(rendered.lines().count(), 1);
    }

    #[test]
    fn unattributed_diagnostics_render_unknown_location() {
        let files = FileCache::default();
        let diagnostic = Diagnostic::error("detached", None);
        let rendered = format_diagnostics(
            &[diagnostic],
            &files,
            FormatOptions::plain(ErrorFormat::Short),
        );
        assert_eq!(rendered, "<unknown>:?:?: error[UNKNOWN]: detached");
    }

    #[test]
    fn json_format_emits_schema_versioned_payload() {
        let (files, diagnostic) = sample();
        let rendered = format_diagnostics(
            &[diagnostic],
            &files,
            FormatOptions::plain(ErrorFormat::Json),
        );
        let value: Value = serde_json::from_str(&rendered).unwrap();
        assert_eq!(value["version"], JSON_SCHEMA_VERSION);
        assert_eq!(value["severity"], "note");
        assert_eq!(value["code"]["code"], "COD013");
        assert_eq!(value["primary_span"]["line_start"], 2);
        assert_eq!(value["suggestions"][0]["replacement"], "var");
    }
}
