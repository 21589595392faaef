use crate::error::{ParseError, ParseErrorKind};
use crate::types::Settings;

/// Parse a YAML (or JSON) string into unvalidated [`Settings`].
///
/// Performs deserialization and type mapping only. Entries missing required
/// fields are kept here; `validate` reports them and `compile` skips them.
pub fn parse(input: &str) -> Result<Settings, ParseError> {
    if input.trim().is_empty() {
        return Err(ParseError {
            kind: ParseErrorKind::Syntax,
            message: "empty input".to_string(),
            path: None,
        });
    }

    let value: serde_json::Value = serde_saphyr::from_str(input).map_err(|e| {
        let msg = e.to_string();
        ParseError {
            kind: classify_error(&msg),
            message: msg,
            path: None,
        }
    })?;

    parse_value(value)
}

/// Deserialize an already-decoded settings tree.
pub fn parse_value(value: serde_json::Value) -> Result<Settings, ParseError> {
    let obj = value.as_object().ok_or_else(|| ParseError {
        kind: ParseErrorKind::TypeMismatch,
        message: "settings root must be a mapping".to_string(),
        path: None,
    })?;

    for key in obj.keys() {
        if key != "control_fields" {
            return Err(ParseError {
                kind: ParseErrorKind::TypeMismatch,
                message: format!("unknown top-level field: {}", key),
                path: Some(key.clone()),
            });
        }
    }

    serde_json::from_value(value).map_err(|e| {
        let msg = e.to_string();
        ParseError {
            kind: classify_error(&msg),
            message: msg,
            path: None,
        }
    })
}

fn classify_error(msg: &str) -> ParseErrorKind {
    let lower = msg.to_lowercase();
    if lower.contains("unknown variant") {
        ParseErrorKind::UnknownVariant
    } else if lower.contains("invalid type") || lower.contains("expected") {
        ParseErrorKind::TypeMismatch
    } else {
        ParseErrorKind::Syntax
    }
}
