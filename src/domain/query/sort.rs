use serde::{Deserialize, Serialize};

use crate::domain::DomainError;

/// Ordering of list results by user id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl SortDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }

    /// Sort fragment appended after the filter predicate
    pub fn order_by_sql(&self) -> &'static str {
        match self {
            Self::Asc => "ORDER BY id ASC",
            Self::Desc => "ORDER BY id DESC",
        }
    }
}

impl std::fmt::Display for SortDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for SortDirection {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "asc" | "ascending" => Ok(Self::Asc),
            "desc" | "descending" => Ok(Self::Desc),
            _ => Err(DomainError::validation(format!(
                "Unknown sort direction: {}. Valid directions: asc, desc",
                s
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_descending() {
        assert_eq!(SortDirection::default(), SortDirection::Desc);
        assert_eq!(SortDirection::default().order_by_sql(), "ORDER BY id DESC");
    }

    #[test]
    fn test_parse() {
        assert_eq!("ASC".parse::<SortDirection>().unwrap(), SortDirection::Asc);
        assert_eq!("descending".parse::<SortDirection>().unwrap(), SortDirection::Desc);
        assert!("id; DROP TABLE users".parse::<SortDirection>().is_err());
    }
}
