//! Decoder for `nix print-dev-env --json` output.
//!
//! Pure and stateless: well-formed input always decodes, malformed
//! input fails with a [`DecodeError`] and is never coerced into a
//! partial environment.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::domain::errors::DecodeError;

/// The decoded variable set of a dev environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DevEnv {
    /// Exported variables only; plain and array-valued shell variables
    /// are internal to the shell and skipped.
    pub vars: BTreeMap<String, String>,
}

/// Decode the raw JSON document produced by `nix print-dev-env --json`.
pub fn decode_dev_env(raw: &str) -> Result<DevEnv, DecodeError> {
    let document: Value = serde_json::from_str(raw)?;
    let variables = document
        .get("variables")
        .and_then(Value::as_object)
        .ok_or(DecodeError::MissingField("variables"))?;

    let mut vars = BTreeMap::new();
    for (name, entry) in variables {
        let kind = entry
            .get("type")
            .and_then(Value::as_str)
            .ok_or(DecodeError::MissingField("type"))?;
        match kind {
            "exported" => {
                let value = entry.get("value").and_then(Value::as_str).ok_or_else(|| {
                    DecodeError::UnsupportedVariable {
                        name: name.clone(),
                        kind: kind.to_string(),
                    }
                })?;
                vars.insert(name.clone(), value.to_string());
            }
            // Shell-internal variables; part of the grammar but not of
            // the exported environment.
            "var" | "array" | "associative" | "unknown" => {}
            other => {
                return Err(DecodeError::UnsupportedVariable {
                    name: name.clone(),
                    kind: other.to_string(),
                });
            }
        }
    }
    Ok(DevEnv { vars })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_exported_variables() {
        let raw = r#"{
            "variables": {
                "PATH": { "type": "exported", "value": "/nix/store/x/bin" },
                "shellHook": { "type": "var", "value": "echo hi" },
                "buildInputs": { "type": "array", "value": ["a", "b"] }
            }
        }"#;
        let env = decode_dev_env(raw).unwrap();
        assert_eq!(env.vars.len(), 1);
        assert_eq!(env.vars["PATH"], "/nix/store/x/bin");
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(matches!(
            decode_dev_env("not json"),
            Err(DecodeError::Malformed(_))
        ));
    }

    #[test]
    fn missing_variables_field_is_an_error() {
        assert!(matches!(
            decode_dev_env("{}"),
            Err(DecodeError::MissingField("variables"))
        ));
    }

    #[test]
    fn unknown_variable_kind_is_an_error() {
        let raw = r#"{ "variables": { "X": { "type": "mystery", "value": "v" } } }"#;
        assert!(matches!(
            decode_dev_env(raw),
            Err(DecodeError::UnsupportedVariable { .. })
        ));
    }

    #[test]
    fn exported_variable_without_string_value_is_an_error() {
        let raw = r#"{ "variables": { "X": { "type": "exported", "value": 3 } } }"#;
        assert!(matches!(
            decode_dev_env(raw),
            Err(DecodeError::UnsupportedVariable { .. })
        ));
    }
}
