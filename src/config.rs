use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::{Error, Result};

/// File name probed by [`SynthesisConfig::resolve`] inside a directory.
pub const CONFIG_FILE_NAME: &str = "codable.yaml";

/// What to do with a union case that has no top-level coding key when
/// synthesizing `encode(to:)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UncoveredCasePolicy {
    /// Emit a switch arm that throws `EncodingError.invalidValue`.
    #[default]
    RuntimeError,
    /// Fail the Encodable derivation with a note on the case.
    Reject,
}

impl UncoveredCasePolicy {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.to_ascii_lowercase().replace('_', "-").as_str() {
            "runtime-error" | "runtime" | "throw" => Some(Self::RuntimeError),
            "reject" | "error" | "compile-error" => Some(Self::Reject),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesisConfig {
    pub coding_keys_name: String,
    pub case_key_separator: String,
    pub uncovered_case_policy: UncoveredCasePolicy,
    pub diagnostic_namespace: String,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            coding_keys_name: "CodingKeys".into(),
            case_key_separator: "_".into(),
            uncovered_case_policy: UncoveredCasePolicy::default(),
            diagnostic_namespace: "COD".into(),
        }
    }
}

#[derive(Debug, Deserialize, Default)]
struct RawSynthesisDocument {
    #[serde(default, alias = "coding-keys-name")]
    coding_keys_name: Option<String>,
    #[serde(default, alias = "case-key-separator")]
    case_key_separator: Option<String>,
    #[serde(default, alias = "uncovered-case-policy")]
    uncovered_case_policy: Option<String>,
    #[serde(default, alias = "diagnostic-namespace")]
    diagnostic_namespace: Option<String>,
}

impl SynthesisConfig {
    #[must_use]
    pub fn with_policy(mut self, policy: UncoveredCasePolicy) -> Self {
        self.uncovered_case_policy = policy;
        self
    }

    /// Name of the nested key enumeration generated for a union case.
    #[must_use]
    pub fn case_keys_name(&self, keys_name: &str, case_name: &str) -> String {
        format!("{keys_name}{}{case_name}", self.case_key_separator)
    }

    /// Parse a YAML document. A top-level `codable:` section is honoured when present.
    pub fn from_yaml(contents: &str) -> Result<Self> {
        let yaml: serde_yaml::Value = serde_yaml::from_str(contents)?;
        let section = match yaml {
            serde_yaml::Value::Mapping(ref mapping) => mapping
                .get("codable")
                .cloned()
                .unwrap_or_else(|| yaml.clone()),
            serde_yaml::Value::Null => return Ok(Self::default()),
            _ => return Err(Error::config("expected a mapping at the document root")),
        };
        let raw: RawSynthesisDocument = serde_yaml::from_value(section)?;
        let mut config = Self::default();
        if let Some(name) = raw.coding_keys_name {
            config.coding_keys_name = name;
        }
        if let Some(separator) = raw.case_key_separator {
            config.case_key_separator = separator;
        }
        if let Some(policy) = raw.uncovered_case_policy {
            config.uncovered_case_policy = UncoveredCasePolicy::parse(&policy).ok_or_else(|| {
                Error::config(format!("unknown uncovered-case policy `{policy}`"))
            })?;
        }
        if let Some(namespace) = raw.diagnostic_namespace {
            config.diagnostic_namespace = namespace;
        }
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|err| {
            Error::config(format!(
                "failed to read synthesis config `{}`: {err}",
                path.display()
            ))
        })?;
        Self::from_yaml(&contents).map_err(|err| match err {
            Error::Config { message } => {
                Error::config(format!("{}: {message}", path.display()))
            }
            other => other,
        })
    }

    /// Load `path` (a file, or a directory containing `codable.yaml`), falling
    /// back to defaults when nothing is there.
    pub fn resolve(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let candidate = if path.is_dir() {
            path.join(CONFIG_FILE_NAME)
        } else {
            path.to_path_buf()
        };
        if candidate.exists() {
            Self::load(&candidate)
        } else {
            Ok(Self::default())
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !is_identifier(&self.coding_keys_name) {
            return Err(Error::config(format!(
                "coding keys name `{}` is not an identifier",
                self.coding_keys_name
            )));
        }
        if !self.case_key_separator.is_empty()
            && !self
                .case_key_separator
                .chars()
                .all(|ch| ch == '_' || ch.is_ascii_alphanumeric())
        {
            return Err(Error::config(format!(
                "case key separator `{}` cannot appear in an identifier",
                self.case_key_separator
            )));
        }
        if self.diagnostic_namespace.is_empty() {
            return Err(Error::config("diagnostic namespace must not be empty"));
        }
        Ok(())
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first == '_' || first.is_alphabetic() => {}
        _ => return false,
    }
    chars.all(|ch| ch == '_' || ch.is_alphanumeric())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{NamedTempFile, tempdir};

    #[test]
    fn defaults_match_documented_values() {
        let config = SynthesisConfig::default();
        assert_eq!(config.coding_keys_name, "CodingKeys");
        assert_eq!(config.case_key_separator, "_");
        assert_eq!(config.uncovered_case_policy, UncoveredCasePolicy::RuntimeError);
        assert_eq!(config.diagnostic_namespace, "COD");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn nested_case_keys_join_with_separator() {
        let config = SynthesisConfig::default();
        assert_eq!(config.case_keys_name("CodingKeys", "bar"), "CodingKeys_bar");
    }

    #[test]
    fn loads_kebab_case_section() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            "codable:\n  coding-keys-name: Keys\n  uncovered-case-policy: reject\n"
        )
        .unwrap();
        let config = SynthesisConfig::load(file.path()).unwrap();
        assert_eq!(config.coding_keys_name, "Keys");
        assert_eq!(config.uncovered_case_policy, UncoveredCasePolicy::Reject);
        assert_eq!(config.case_key_separator, "_");
    }

    #[test]
    fn loads_snake_case_root_document() {
        let config =
            SynthesisConfig::from_yaml("case_key_separator: \"\"\ndiagnostic_namespace: SYN\n")
                .unwrap();
        assert_eq!(config.case_key_separator, "");
        assert_eq!(config.diagnostic_namespace, "SYN");
    }

    #[test]
    fn unknown_policy_is_config_error() {
        let err = SynthesisConfig::from_yaml("uncovered-case-policy: shrug\n").unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
        assert!(err.to_string().contains("shrug"), "{err}");
    }

    #[test]
    fn invalid_keys_name_is_rejected() {
        let err = SynthesisConfig::from_yaml("coding-keys-name: \"9 keys\"\n").unwrap_err();
        assert!(err.to_string().contains("not an identifier"), "{err}");
    }

    #[test]
    fn resolve_falls_back_to_defaults() {
        let dir = tempdir().unwrap();
        assert_eq!(
            SynthesisConfig::resolve(Some(dir.path())).unwrap(),
            SynthesisConfig::default()
        );
        assert_eq!(SynthesisConfig::resolve(None).unwrap(), SynthesisConfig::default());

        fs::write(dir.path().join(CONFIG_FILE_NAME), "coding-keys-name: Keys\n").unwrap();
        let config = SynthesisConfig::resolve(Some(dir.path())).unwrap();
        assert_eq!(config.coding_keys_name, "Keys");
    }

    #[test]
    fn policy_parse_accepts_aliases() {
        assert_eq!(
            UncoveredCasePolicy::parse("runtime_error"),
            Some(UncoveredCasePolicy::RuntimeError)
        );
        assert_eq!(UncoveredCasePolicy::parse("REJECT"), Some(UncoveredCasePolicy::Reject));
        assert_eq!(UncoveredCasePolicy::parse("maybe"), None);
    }
}
