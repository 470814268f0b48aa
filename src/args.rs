//! Named statement arguments and the binder that turns them into
//! positional parameters.

use std::collections::HashMap;

use log::debug;
use rusqlite::types::Value;

use crate::errors::BackendError;

/// Named arguments for one statement.
///
/// Names may repeat; the last value bound to a name wins.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Args {
    pairs: Vec<(String, Value)>,
}

impl Args {
    /// Create an empty argument set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a named value, returning the updated set.
    pub fn with(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.pairs.push((name.to_owned(), value.into()));
        self
    }

    /// Add a text value.
    pub fn with_text(self, name: &str, value: &str) -> Self {
        self.with(name, value.to_owned())
    }

    /// Build an argument set from the flat `name, value, name, value, ...`
    /// convention.
    ///
    /// # Arguments
    /// * `flat` - Alternating names and values. Entries whose name is not
    ///   text are skipped.
    ///
    /// # Returns
    /// The argument set, or `BackendError::ArgumentShape` for an odd length.
    pub fn from_flat(flat: Vec<Value>) -> Result<Self, BackendError> {
        if flat.len() % 2 != 0 {
            return Err(BackendError::ArgumentShape(flat.len()));
        }
        let mut pairs = Vec::with_capacity(flat.len() / 2);
        let mut iter = flat.into_iter();
        while let (Some(name), Some(value)) = (iter.next(), iter.next()) {
            match name {
                Value::Text(name) => pairs.push((name, value)),
                other => debug!("Skipping argument with non-text name {:?}", other),
            }
        }
        Ok(Self { pairs })
    }

    /// Number of name/value pairs, duplicates included.
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Resolve compiled placeholder names to positional values.
    ///
    /// Names with no bound value resolve to `NULL`. The result always has
    /// exactly one entry per name.
    pub fn bind(&self, names: &[String]) -> Vec<Value> {
        let lookup: HashMap<&str, &Value> = self
            .pairs
            .iter()
            .map(|(name, value)| (name.as_str(), value))
            .collect();
        names
            .iter()
            .map(|name| lookup.get(name.as_str()).map_or(Value::Null, |v| (*v).clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn binds_in_placeholder_order() {
        let args = Args::new()
            .with_text("qname", "example.com")
            .with("domain_id", 7i64)
            .with_text("qtype", "A");
        let bound = args.bind(&names(&["qtype", "qname", "domain_id"]));
        assert_eq!(
            bound,
            vec![
                Value::Text("A".into()),
                Value::Text("example.com".into()),
                Value::Integer(7),
            ]
        );
    }

    #[test]
    fn missing_names_bind_null() {
        let args = Args::new().with("domain_id", 3i64);
        let bound = args.bind(&names(&["domain_id", "include_disabled"]));
        assert_eq!(bound, vec![Value::Integer(3), Value::Null]);
    }

    #[test]
    fn last_value_wins() {
        let args = Args::new().with("serial", 1i64).with("serial", 2i64);
        assert_eq!(args.len(), 2);
        assert_eq!(args.bind(&names(&["serial"])), vec![Value::Integer(2)]);
    }

    #[test]
    fn repeated_names_bind_each_position() {
        let args = Args::new().with_text("value", "%a%");
        let bound = args.bind(&names(&["value", "value"]));
        assert_eq!(bound.len(), 2);
        assert!(bound.iter().all(|v| *v == Value::Text("%a%".into())));
    }

    #[test]
    fn flat_arguments_require_pairs() {
        let odd = vec![Value::Text("qname".into()), Value::Text("a".into()), Value::Integer(1)];
        assert!(matches!(Args::from_flat(odd), Err(BackendError::ArgumentShape(3))));
    }

    #[test]
    fn flat_arguments_skip_non_text_names() {
        let flat = vec![
            Value::Integer(5),
            Value::Integer(6),
            Value::Text("qtype".into()),
            Value::Text("MX".into()),
        ];
        let args = Args::from_flat(flat).unwrap();
        assert_eq!(args.len(), 1);
        assert_eq!(args.bind(&names(&["qtype"])), vec![Value::Text("MX".into())]);
    }

    #[test]
    fn optional_values_become_null() {
        let args = Args::new().with("ordername", None::<String>);
        assert_eq!(args.bind(&names(&["ordername"])), vec![Value::Null]);
    }
}
