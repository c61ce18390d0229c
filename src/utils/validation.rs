//! Input validation utilities
//!
//! Emptiness rules for loosely typed settings values.

use config::{Value, ValueKind};

/// Returns true when a settings value carries nothing usable.
///
/// Booleans are never empty. Strings are empty when blank after trimming,
/// arrays and tables when they have no elements.
pub fn is_empty_value(value: &Value) -> bool {
    match &value.kind {
        ValueKind::Nil => true,
        ValueKind::Boolean(_) => false,
        ValueKind::String(s) => s.trim().is_empty(),
        ValueKind::Array(items) => items.is_empty(),
        ValueKind::Table(table) => table.is_empty(),
        _ => false,
    }
}

/// Short name of a value's kind, for error messages.
pub fn kind_name(value: &Value) -> &'static str {
    match &value.kind {
        ValueKind::Nil => "nil",
        ValueKind::Boolean(_) => "boolean",
        ValueKind::String(_) => "string",
        ValueKind::Array(_) => "array",
        ValueKind::Table(_) => "table",
        ValueKind::Float(_) => "float",
        _ => "integer",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::Map;

    #[test]
    fn blank_strings_and_empty_collections_are_empty() {
        assert!(is_empty_value(&Value::new(None, ValueKind::Nil)));
        assert!(is_empty_value(&Value::from("")));
        assert!(is_empty_value(&Value::from("  \n")));
        assert!(is_empty_value(&Value::new(None, ValueKind::Array(Vec::new()))));
        assert!(is_empty_value(&Value::new(None, ValueKind::Table(Map::new()))));
    }

    #[test]
    fn booleans_and_numbers_are_not_empty() {
        assert!(!is_empty_value(&Value::from(false)));
        assert!(!is_empty_value(&Value::from(0i64)));
        assert!(!is_empty_value(&Value::from("ftp.example.com")));
    }

    #[test]
    fn kind_names() {
        assert_eq!(kind_name(&Value::from(true)), "boolean");
        assert_eq!(kind_name(&Value::from(21i64)), "integer");
        assert_eq!(kind_name(&Value::from("h")), "string");
    }
}
