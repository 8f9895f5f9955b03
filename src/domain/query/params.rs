//! Raw list parameters and their canonical encoding

use std::collections::BTreeMap;

use crate::domain::DomainError;

/// The complete raw parameter set of a list request
///
/// Keys are kept sorted and values are kept sorted per key, so the arrival
/// order of parameters never affects either the canonical encoding or which
/// value is read for a recognized parameter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ListParams {
    entries: BTreeMap<String, Vec<String>>,
}

impl ListParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the set from key/value pairs, keeping repeated keys
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut params = Self::new();

        for (key, value) in pairs {
            params.append(key, value);
        }

        params
    }

    /// Parses a raw `application/x-www-form-urlencoded` query string
    pub fn parse(query: &str) -> Result<Self, DomainError> {
        let query = query.strip_prefix('?').unwrap_or(query);
        let pairs: Vec<(String, String)> = serde_urlencoded::from_str(query)
            .map_err(|e| DomainError::validation(format!("Malformed query string: {}", e)))?;

        Ok(Self::from_pairs(pairs))
    }

    /// Adds a value, keeping any values already present for the key
    pub fn append(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let values = self.entries.entry(key.into()).or_default();
        let value = value.into();
        let position = values.partition_point(|existing| existing <= &value);
        values.insert(position, value);
    }

    /// Replaces every value of a key with a single value
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(key.into(), vec![value.into()]);
    }

    pub fn remove(&mut self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }

    /// First value of a key in canonical order
    pub fn first(&self, key: &str) -> Option<&str> {
        self.entries
            .get(key)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of key/value pairs
    pub fn len(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    /// Iterates every pair in canonical order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().flat_map(|(key, values)| {
            values
                .iter()
                .map(move |value| (key.as_str(), value.as_str()))
        })
    }

    /// Deterministic url-encoded rendering of the whole set
    pub fn canonical_encoding(&self) -> String {
        let pairs: Vec<(&str, &str)> = self.iter().collect();

        // String pairs always serialize; the Debug rendering is an equally
        // deterministic fallback.
        serde_urlencoded::to_string(&pairs).unwrap_or_else(|_| format!("{:?}", self.entries))
    }
}

impl<K, V> FromIterator<(K, V)> for ListParams
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self::from_pairs(iter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arrival_order_does_not_matter() {
        let a = ListParams::parse("status=1&search=a").unwrap();
        let b = ListParams::parse("search=a&status=1").unwrap();

        assert_eq!(a, b);
        assert_eq!(a.canonical_encoding(), b.canonical_encoding());
        assert_eq!(a.canonical_encoding(), "search=a&status=1");
    }

    #[test]
    fn test_repeated_values_are_sorted() {
        let a = ListParams::from_pairs([("tag", "b"), ("tag", "a")]);
        let b = ListParams::from_pairs([("tag", "a"), ("tag", "b")]);

        assert_eq!(a.canonical_encoding(), b.canonical_encoding());
        assert_eq!(a.first("tag"), Some("a"));
        assert_eq!(a.len(), 2);
    }

    #[test]
    fn test_any_difference_changes_encoding() {
        let base = ListParams::parse("page=2&search=a").unwrap();
        let other_value = ListParams::parse("page=3&search=a").unwrap();
        let extra_param = ListParams::parse("page=2&search=a&utm=x").unwrap();
        let empty_value = ListParams::parse("page=2&search=a&utm=").unwrap();

        let key = base.canonical_encoding();
        assert_ne!(key, other_value.canonical_encoding());
        assert_ne!(key, extra_param.canonical_encoding());
        assert_ne!(extra_param.canonical_encoding(), empty_value.canonical_encoding());
    }

    #[test]
    fn test_special_characters_are_encoded() {
        let params = ListParams::from_pairs([("search", "a&b=c")]);

        assert_eq!(params.canonical_encoding(), "search=a%26b%3Dc");
        assert_ne!(
            params.canonical_encoding(),
            ListParams::from_pairs([("search", "a"), ("b", "c")]).canonical_encoding()
        );
    }

    #[test]
    fn test_parse_strips_leading_question_mark() {
        let params = ListParams::parse("?page=4").unwrap();
        assert_eq!(params.first("page"), Some("4"));
    }

    #[test]
    fn test_set_replaces_values() {
        let mut params = ListParams::from_pairs([("page", "1"), ("page", "2")]);
        params.set("page", "5");

        assert_eq!(params.first("page"), Some("5"));
        assert_eq!(params.len(), 1);
        assert!(params.remove("page"));
        assert!(params.is_empty());
    }
}
