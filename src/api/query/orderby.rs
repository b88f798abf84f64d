//! Sort terms
//!
//! The remote query language takes a single sort key, so only the first
//! term of a list is ever encoded.

use crate::api::error::QueryError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn keyword(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }

    /// Accepts `asc`/`desc` in any case
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "asc" => Some(SortDirection::Asc),
            "desc" => Some(SortDirection::Desc),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortTerm {
    pub property: Option<String>,
    /// Field to sort on when it differs from the displayed property
    pub sort_property: Option<String>,
    pub direction: SortDirection,
}

impl SortTerm {
    pub fn asc(property: impl Into<String>) -> Self {
        Self {
            property: Some(property.into()),
            sort_property: None,
            direction: SortDirection::Asc,
        }
    }

    pub fn desc(property: impl Into<String>) -> Self {
        Self {
            property: Some(property.into()),
            sort_property: None,
            direction: SortDirection::Desc,
        }
    }

    pub fn with_sort_property(mut self, sort_property: impl Into<String>) -> Self {
        self.sort_property = Some(sort_property.into());
        self
    }

    fn key(&self) -> Option<&str> {
        self.property
            .as_deref()
            .or(self.sort_property.as_deref())
            .filter(|key| !key.trim().is_empty())
    }
}

/// `<field> <ASC|DESC>` for the first term; `None` when there are no terms
pub fn order_by_clause(terms: &[SortTerm]) -> Result<Option<String>, QueryError> {
    let Some(first) = terms.first() else {
        return Ok(None);
    };

    if terms.len() > 1 {
        log::debug!(
            "Ignoring {} additional sort terms, only one sort key is supported",
            terms.len() - 1
        );
    }

    let Some(key) = first.key() else {
        return Err(QueryError::Malformed(
            "sort term has neither a property nor a sort property".to_string(),
        ));
    };

    Ok(Some(format!("{} {}", key, first.direction.keyword())))
}
