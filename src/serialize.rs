//! [`Settings`] → YAML serialization.

use crate::error::SerializeError;
use crate::types::Settings;

/// Serialize settings to a YAML string.
///
/// Settings should typically be normalized first so that defaults are
/// explicit in the output.
pub fn serialize(settings: &Settings) -> Result<String, SerializeError> {
    // Go through serde_json::Value so field order follows the struct definitions
    let value = serde_json::to_value(settings).map_err(|e| SerializeError {
        message: format!("failed to convert settings to JSON value: {}", e),
    })?;

    serde_saphyr::to_string(&value).map_err(|e| SerializeError {
        message: format!("failed to serialize to YAML: {}", e),
    })
}
