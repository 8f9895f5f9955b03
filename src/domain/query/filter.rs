//! Filter predicate construction
//!
//! A [`UserFilter`] is the single source of the list predicate: the SQL store
//! renders it through [`UserFilter::to_sql`] for both the count and the data
//! query, and the in-memory store evaluates it through [`UserFilter::matches`].
//! Filter values only ever travel as bind parameters.

use crate::domain::user::User;

/// A value bound to a positional placeholder
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindValue {
    Text(String),
    Bool(bool),
}

/// A predicate fragment with `$n` placeholders and its ordered bind values
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SqlFragment {
    /// Predicate text without the `WHERE` keyword; empty when unfiltered
    pub sql: String,
    pub binds: Vec<BindValue>,
}

impl SqlFragment {
    pub fn is_empty(&self) -> bool {
        self.sql.is_empty()
    }

    /// ` WHERE <predicate>` or an empty string
    pub fn where_clause(&self) -> String {
        if self.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.sql)
        }
    }

    /// Index of the next free placeholder after this fragment's binds
    pub fn next_placeholder(&self, first_placeholder: usize) -> usize {
        first_placeholder + self.binds.len()
    }
}

/// Recognized list filters
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct UserFilter {
    /// Case-insensitive substring of the user's name
    pub search: Option<String>,
    /// Exact match on the lifecycle flag
    pub status: Option<bool>,
}

impl UserFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = Some(search.into());
        self
    }

    pub fn with_status(mut self, status: bool) -> Self {
        self.status = Some(status);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.search.is_none() && self.status.is_none()
    }

    /// Renders the predicate, numbering placeholders from `first_placeholder`
    pub fn to_sql(&self, first_placeholder: usize) -> SqlFragment {
        let mut clauses = Vec::new();
        let mut binds = Vec::new();

        if let Some(search) = &self.search {
            let placeholder = first_placeholder + binds.len();
            clauses.push(format!("name ILIKE ${} ESCAPE '\\'", placeholder));
            binds.push(BindValue::Text(format!("%{}%", escape_like(search))));
        }

        if let Some(status) = self.status {
            let placeholder = first_placeholder + binds.len();
            clauses.push(format!("status = ${}", placeholder));
            binds.push(BindValue::Bool(status));
        }

        SqlFragment {
            sql: clauses.join(" AND "),
            binds,
        }
    }

    /// Evaluates the same predicate against an in-memory record
    pub fn matches(&self, user: &User) -> bool {
        if let Some(search) = &self.search {
            let needle = search.to_lowercase();

            if !user.name().to_lowercase().contains(&needle) {
                return false;
            }
        }

        if let Some(status) = self.status {
            if user.status() != status {
                return false;
            }
        }

        true
    }
}

/// Escapes `LIKE` metacharacters so the term matches literally
fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());

    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }

    escaped
}
