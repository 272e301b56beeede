//! Filter model for table queries.

use serde_json::Value;

use super::Row;

/// Match on a row or partition key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyFilter {
    Eq(String),
    Prefix(String),
}

impl KeyFilter {
    pub fn matches(&self, key: &str) -> bool {
        match self {
            KeyFilter::Eq(v) => key == v,
            KeyFilter::Prefix(p) => key.starts_with(p.as_str()),
        }
    }
}

/// Conjunction of key filters and property equality checks.
///
/// The default query matches every row in the table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableQuery {
    pub partition_key: Option<KeyFilter>,
    pub row_key: Option<KeyFilter>,
    pub properties: Vec<(String, Value)>,
}

impl TableQuery {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn partition(pk: impl Into<String>) -> Self {
        Self {
            partition_key: Some(KeyFilter::Eq(pk.into())),
            ..Self::default()
        }
    }

    pub fn with_row_key(mut self, filter: KeyFilter) -> Self {
        self.row_key = Some(filter);
        self
    }

    pub fn with_partition_key(mut self, filter: KeyFilter) -> Self {
        self.partition_key = Some(filter);
        self
    }

    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.push((name.into(), value.into()));
        self
    }

    pub fn matches(&self, row: &Row) -> bool {
        self.partition_key.as_ref().is_none_or(|f| f.matches(&row.partition_key))
            && self.row_key.as_ref().is_none_or(|f| f.matches(&row.row_key))
            && self
                .properties
                .iter()
                .all(|(name, value)| row.properties.get(name) == Some(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(pk: &str, rk: &str, props: Value) -> Row {
        Row {
            partition_key: pk.into(),
            row_key: rk.into(),
            properties: props.as_object().cloned().unwrap_or_default(),
        }
    }

    #[test]
    fn empty_query_matches_everything() {
        assert!(TableQuery::all().matches(&row("a", "b", json!({}))));
    }

    #[test]
    fn key_filters_combine() {
        let r = row("brigade-1", "user-9", json!({"status": "active"}));
        assert!(TableQuery::partition("brigade-1").matches(&r));
        assert!(!TableQuery::partition("brigade").matches(&r));
        assert!(
            TableQuery::all()
                .with_partition_key(KeyFilter::Prefix("brigade".into()))
                .with_row_key(KeyFilter::Eq("user-9".into()))
                .matches(&r)
        );
    }

    #[test]
    fn property_equality_is_exact() {
        let r = row("p", "r", json!({"status": "active", "n": 2}));
        assert!(TableQuery::all().with_property("status", "active").matches(&r));
        assert!(!TableQuery::all().with_property("status", "removed").matches(&r));
        assert!(!TableQuery::all().with_property("missing", "x").matches(&r));
        assert!(TableQuery::all().with_property("n", 2).matches(&r));
    }
}
