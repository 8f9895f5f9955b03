//! Cache key namespace for list entries

use crate::domain::query::ListParams;

const LIST_SEGMENT: &str = "list";

/// Derives list cache keys and the pattern that covers all of them
///
/// Keys have the form `<collection>_list_<canonical-encoding>`, so every list
/// view of a collection shares the prefix matched by
/// [`ListKeyspace::invalidation_pattern`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListKeyspace {
    collection: String,
}

impl ListKeyspace {
    pub fn new(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
        }
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    fn prefix(&self) -> String {
        format!("{}_{}_", self.collection, LIST_SEGMENT)
    }

    /// Key for one list view, derived from the whole raw parameter set
    pub fn key_for(&self, params: &ListParams) -> String {
        format!("{}{}", self.prefix(), params.canonical_encoding())
    }

    /// Glob pattern matching every list key of the collection
    pub fn invalidation_pattern(&self) -> String {
        format!("{}*", self.prefix())
    }
}

/// Translates a glob pattern (`*`, `?`) into an anchored regex
pub fn glob_to_regex(pattern: &str) -> Result<regex::Regex, regex::Error> {
    let mut expression = String::with_capacity(pattern.len() + 8);
    expression.push('^');

    for c in pattern.chars() {
        match c {
            '*' => expression.push_str(".*"),
            '?' => expression.push('.'),
            other => expression.push_str(&regex::escape(&other.to_string())),
        }
    }

    expression.push('$');
    regex::Regex::new(&expression)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_format() {
        let keyspace = ListKeyspace::new("users");
        let params = ListParams::parse("search=al&page=2").unwrap();

        assert_eq!(keyspace.key_for(&params), "users_list_page=2&search=al");
        assert_eq!(keyspace.key_for(&ListParams::new()), "users_list_");
    }

    #[test]
    fn test_pattern_covers_every_key() {
        let keyspace = ListKeyspace::new("users");
        let regex = glob_to_regex(&keyspace.invalidation_pattern()).unwrap();

        for query in ["", "page=2", "status=false&sort=asc", "x=*"] {
            let key = keyspace.key_for(&ListParams::parse(query).unwrap());
            assert!(regex.is_match(&key), "pattern should match {}", key);
        }
    }

    #[test]
    fn test_pattern_is_scoped_to_collection() {
        let users = ListKeyspace::new("users");
        let regex = glob_to_regex(&users.invalidation_pattern()).unwrap();

        let other = ListKeyspace::new("teams").key_for(&ListParams::new());
        assert!(!regex.is_match(&other));
        assert!(!regex.is_match("prefix_users_list_page=1"));
    }

    #[test]
    fn test_glob_escapes_regex_metacharacters() {
        let regex = glob_to_regex("a.b_*").unwrap();

        assert!(regex.is_match("a.b_anything"));
        assert!(!regex.is_match("axb_anything"));
    }

    #[test]
    fn test_glob_question_mark() {
        let regex = glob_to_regex("user:?").unwrap();

        assert!(regex.is_match("user:1"));
        assert!(!regex.is_match("user:12"));
    }
}
