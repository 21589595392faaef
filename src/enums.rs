//! Closed enumerations used throughout the skip-logic type system.
//!
//! [`ConditionOperator`] is lenient on input: the host settings
//! UI stores operators as free strings, and anything unrecognized compares
//! with equality.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// How a control field obtains its left-hand comparison value.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlMode {
    /// Raw value of a field at a given event.
    #[default]
    Default,
    /// Result of a piping template evaluated against the record.
    Advanced,
}

/// Comparison applied between the control value and the condition value.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ConditionOperator {
    #[default]
    Equal,
    NotEqual,
    GreaterThan,
    GreaterOrEqual,
    LessThan,
    LessOrEqual,
}

impl ConditionOperator {
    /// Parses an operator symbol. Unknown symbols fall back to [`Equal`](Self::Equal).
    pub fn from_symbol(symbol: &str) -> Self {
        Self::parse_known(symbol).unwrap_or(ConditionOperator::Equal)
    }

    /// Parses an operator symbol, returning `None` for anything unrecognized.
    pub fn parse_known(symbol: &str) -> Option<Self> {
        match symbol {
            "=" => Some(ConditionOperator::Equal),
            "<>" => Some(ConditionOperator::NotEqual),
            ">" => Some(ConditionOperator::GreaterThan),
            ">=" => Some(ConditionOperator::GreaterOrEqual),
            "<" => Some(ConditionOperator::LessThan),
            "<=" => Some(ConditionOperator::LessOrEqual),
            _ => None,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            ConditionOperator::Equal => "=",
            ConditionOperator::NotEqual => "<>",
            ConditionOperator::GreaterThan => ">",
            ConditionOperator::GreaterOrEqual => ">=",
            ConditionOperator::LessThan => "<",
            ConditionOperator::LessOrEqual => "<=",
        }
    }
}

impl fmt::Display for ConditionOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl Serialize for ConditionOperator {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.symbol())
    }
}

impl<'de> Deserialize<'de> for ConditionOperator {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let symbol = String::deserialize(deserializer)?;
        Ok(ConditionOperator::from_symbol(&symbol))
    }
}

/// Host page a link-hiding request originates from.
///
/// Each page renders data entry links with its own query-argument order, and
/// the hiding selectors match on the href prefix, so the order matters.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageKind {
    DataEntryForm,
    RecordHome,
    RecordStatusDashboard,
}

impl PageKind {
    /// Query arguments of data entry links, in the order the page emits them.
    pub fn link_args(&self) -> &'static [&'static str] {
        match self {
            PageKind::DataEntryForm => &["pid", "page", "id", "event_id"],
            PageKind::RecordHome => &["pid", "id", "event_id", "page"],
            PageKind::RecordStatusDashboard => &["pid", "id", "page", "event_id", "instance"],
        }
    }
}
