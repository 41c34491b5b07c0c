use std::fmt;

use serde::{Deserialize, Serialize};

/// A raw value read from, or written to, a tabular file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    #[default]
    Empty,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

impl CellValue {
    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            CellValue::String(value) => Some(value),
            _ => None,
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Empty => Ok(()),
            CellValue::Bool(value) => write!(f, "{value}"),
            CellValue::Int(value) => write!(f, "{value}"),
            CellValue::Float(value) => write!(f, "{value}"),
            CellValue::String(value) => f.write_str(value),
        }
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::String(value.to_string())
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        CellValue::String(value)
    }
}

impl From<i64> for CellValue {
    fn from(value: i64) -> Self {
        CellValue::Int(value)
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Float(value)
    }
}

impl From<bool> for CellValue {
    fn from(value: bool) -> Self {
        CellValue::Bool(value)
    }
}

impl<T: Into<CellValue>> From<Option<T>> for CellValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(CellValue::Empty, Into::into)
    }
}

/// Default value cleanup: trims strings, leaves other values untouched.
pub fn trim_cleanup(value: CellValue) -> CellValue {
    match value {
        CellValue::String(value) => CellValue::String(value.trim().to_string()),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::{CellValue, trim_cleanup};

    #[test]
    fn cleanup_trims_strings_only() {
        assert_eq!(
            trim_cleanup(CellValue::from("  \thallo \n\t   \t")),
            CellValue::from("hallo")
        );
        assert_eq!(trim_cleanup(CellValue::Int(6)), CellValue::Int(6));
        assert_eq!(trim_cleanup(CellValue::Float(6.66)), CellValue::Float(6.66));
        assert_eq!(trim_cleanup(CellValue::Empty), CellValue::Empty);
    }

    #[test]
    fn display_renders_plain_values() {
        assert_eq!(CellValue::Empty.to_string(), "");
        assert_eq!(CellValue::Int(6).to_string(), "6");
        assert_eq!(CellValue::Float(6.66).to_string(), "6.66");
        assert_eq!(CellValue::from(None::<&str>), CellValue::Empty);
    }
}
