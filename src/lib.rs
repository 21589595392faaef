//! Form render skip logic for clinical data capture projects.
//!
//! Administrators attach conditions to *control fields*; each condition
//! unlocks a set of forms at a set of events. This crate evaluates those
//! conditions per record and turns the result into navigation decisions:
//!
//! ```text
//! parse(yaml) / Settings::from_host(values) → Settings
//!     → validate(&settings) → ValidationResult
//!     → normalize(settings) → Settings
//! SkipLogic::from_settings(settings, collaborators)
//!     → access_matrix(arm, record) → AccessMatrix
//!     → navigation::{decide_page_access, next_available_form, suppress_surveys, ...}
//! ```
//!
//! Invalid configuration never blocks data entry: entries missing required
//! settings are skipped, and a form is denied only when every condition
//! governing it fails.
//!
//! # Quick Start
//!
//! ```rust
//! let yaml = r#"
//! control_fields:
//!   - control_mode: default
//!     control_event_id: "41"
//!     control_field_key: age
//!     control_default_value: "0"
//!     branching_logic:
//!       - condition_operator: ">="
//!         condition_value: "18"
//!         target_forms: [consent_adult]
//! "#;
//!
//! let result = frsl::load(yaml).expect("parsable settings");
//! assert!(result.errors.is_empty());
//! assert_eq!(result.settings.control_fields.len(), 1);
//! ```
//!
//! # Feature Flags
//!
//! | Feature          | Default | Description |
//! |------------------|---------|-------------|
//! | `default-piping` | yes     | [`primitives::DataPiping`], a piping evaluator over an in-memory record snapshot. |

pub mod compile;
pub mod enums;
pub mod error;
pub mod evaluate;
pub mod navigation;
pub mod normalize;
pub mod parse;
pub mod primitives;
pub mod serialize;
pub mod settings;
pub mod types;
pub mod validate;

pub use error::*;
pub use types::*;

// Re-export entry-point functions at the crate root for convenience.
pub use compile::compile;
pub use evaluate::{AccessMatrix, Collaborators, SkipLogic};
pub use normalize::normalize;
pub use parse::parse;
pub use serialize::serialize;
pub use validate::validate;

/// Result of the [`load`] convenience entry point.
pub struct LoadResult {
    /// The normalized settings.
    pub settings: Settings,
    /// Entries that will be skipped during evaluation.
    pub errors: Vec<ValidationError>,
    /// Non-fatal warnings produced during validation.
    pub warnings: Vec<Diagnostic>,
}

/// Convenience entry point composing parse → validate → normalize.
///
/// Validation findings are reported, not enforced: skipped entries simply
/// restrict nothing. Use [`load_strict`] when saving configuration.
///
/// # Errors
///
/// Returns `Err` only if the input cannot be parsed.
pub fn load(input: &str) -> Result<LoadResult, SkipLogicError> {
    let settings = parse::parse(input)?;
    let result = validate::validate(&settings);

    Ok(LoadResult {
        settings: normalize::normalize(settings),
        errors: result.errors,
        warnings: result.warnings,
    })
}

/// Like [`load`], but rejects settings containing entries that would be
/// skipped.
///
/// # Errors
///
/// Returns every parse or validation error.
pub fn load_strict(input: &str) -> Result<LoadResult, Vec<SkipLogicError>> {
    let loaded = load(input).map_err(|e| vec![e])?;
    if !loaded.errors.is_empty() {
        return Err(loaded
            .errors
            .into_iter()
            .map(SkipLogicError::Validation)
            .collect());
    }
    Ok(loaded)
}
