//! Query descriptor and its encoding into a SOQL statement

use super::filters::{where_clause, FilterTerm};
use super::orderby::{order_by_clause, SortTerm};
use crate::api::error::QueryError;

/// Declared type of a projected field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FieldKind {
    #[default]
    String,
    Boolean,
    Integer,
    Number,
    Date,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDef {
    pub name: String,
    pub kind: FieldKind,
}

impl FieldDef {
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self { name: name.into(), kind }
    }

    pub fn string(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::String)
    }
}

/// One page of a paged list; `number` starts at 1
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub size: u32,
    pub number: u32,
}

impl Page {
    pub fn new(size: u32, number: u32) -> Self {
        Self { size, number }
    }

    pub fn offset(&self) -> u64 {
        self.size as u64 * self.number.saturating_sub(1) as u64
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct QueryDescriptor {
    pub collection: String,
    pub fields: Vec<FieldDef>,
    pub filters: Vec<FilterTerm>,
    pub sorters: Vec<SortTerm>,
    /// `None` means unpaged
    pub page: Option<Page>,
}

impl QueryDescriptor {
    pub fn new(collection: impl Into<String>, fields: Vec<FieldDef>) -> Self {
        Self {
            collection: collection.into(),
            fields,
            filters: Vec::new(),
            sorters: Vec::new(),
            page: None,
        }
    }

    fn kind_of(&self, property: &str) -> Option<FieldKind> {
        self.fields
            .iter()
            .find(|field| field.name == property)
            .map(|field| field.kind)
    }

    pub fn encode(&self) -> Result<String, QueryError> {
        encode(self)
    }
}

/// `SELECT <fields> FROM <collection>[ WHERE ..][ ORDER BY ..][ LIMIT n OFFSET m]`
pub fn encode(descriptor: &QueryDescriptor) -> Result<String, QueryError> {
    if descriptor.collection.trim().is_empty() {
        return Err(QueryError::Malformed("no collection to select from".to_string()));
    }
    if descriptor.fields.is_empty() {
        return Err(QueryError::Malformed(format!(
            "empty field list for {}",
            descriptor.collection
        )));
    }

    let fields = descriptor
        .fields
        .iter()
        .map(|field| field.name.as_str())
        .collect::<Vec<_>>()
        .join(",");
    let mut statement = format!("SELECT {} FROM {}", fields, descriptor.collection);

    let filters = where_clause(&descriptor.filters, |property| descriptor.kind_of(property))?;
    if let Some(clause) = filters {
        statement.push_str(" WHERE ");
        statement.push_str(&clause);
    }

    if let Some(clause) = order_by_clause(&descriptor.sorters)? {
        statement.push_str(" ORDER BY ");
        statement.push_str(&clause);
    }

    if let Some(page) = descriptor.page {
        if page.size == 0 {
            return Err(QueryError::Malformed("page size must be positive".to_string()));
        }
        statement.push_str(&format!(" LIMIT {} OFFSET {}", page.size, page.offset()));
    }

    log::debug!("Encoded query: {}", statement);
    Ok(statement)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn contacts() -> QueryDescriptor {
        QueryDescriptor::new(
            "Contact",
            vec![
                FieldDef::string("Id"),
                FieldDef::string("Name"),
                FieldDef::new("IsActive", FieldKind::Boolean),
                FieldDef::new("CreatedDate", FieldKind::Date),
            ],
        )
    }

    #[test]
    fn test_select_without_filters_has_no_where() {
        let statement = encode(&contacts()).unwrap();
        assert_eq!(statement, "SELECT Id,Name,IsActive,CreatedDate FROM Contact");
        assert!(!statement.contains("WHERE"));
    }

    #[test]
    fn test_raw_clause_is_verbatim() {
        let mut query = contacts();
        query.filters.push(FilterTerm::new("raw", "status = 'active'"));
        let statement = encode(&query).unwrap();
        assert!(statement.ends_with(" WHERE status = 'active'"));
    }

    #[test]
    fn test_boolean_and_like_filters() {
        let mut query = contacts();
        query.filters.push(FilterTerm::new("enabled", true));
        query.filters.push(FilterTerm::new("name", "%smith%"));
        let statement = encode(&query).unwrap();
        assert!(statement.contains("WHERE enabled = TRUE AND name LIKE '%smith%'"));
    }

    #[test]
    fn test_date_field_uses_declared_kind() {
        let mut query = contacts();
        let ts = Utc.with_ymd_and_hms(2014, 1, 2, 3, 4, 5).unwrap();
        query.filters.push(FilterTerm::new("CreatedDate", ts));
        assert!(encode(&query).unwrap().contains("CreatedDate = 2014-01-02T03:04:05.000Z"));

        query.filters = vec![FilterTerm::new("CreatedDate", "TODAY")];
        assert!(encode(&query).unwrap().contains("WHERE CreatedDate = TODAY"));

        // Undeclared field: the string is quoted
        query.filters = vec![FilterTerm::new("LastModifiedDate", "TODAY")];
        assert!(encode(&query).unwrap().contains("WHERE LastModifiedDate = 'TODAY'"));
    }

    #[test]
    fn test_paging() {
        let mut query = contacts();
        query.page = Some(Page::new(25, 3));
        assert!(encode(&query).unwrap().ends_with(" LIMIT 25 OFFSET 50"));

        query.page = Some(Page::new(10, 1));
        assert!(encode(&query).unwrap().ends_with(" LIMIT 10 OFFSET 0"));
    }

    #[test]
    fn test_full_statement_order() {
        let mut query = contacts();
        query.filters.push(FilterTerm::new("IsActive", true));
        query.sorters.push(SortTerm::desc("Name"));
        query.sorters.push(SortTerm::asc("Id"));
        query.page = Some(Page::new(5, 2));
        assert_eq!(
            encode(&query).unwrap(),
            "SELECT Id,Name,IsActive,CreatedDate FROM Contact WHERE IsActive = TRUE \
             ORDER BY Name DESC LIMIT 5 OFFSET 5"
        );
    }

    #[test]
    fn test_malformed_descriptors() {
        assert!(matches!(
            encode(&QueryDescriptor::new("Contact", vec![])),
            Err(QueryError::Malformed(_))
        ));
        assert!(encode(&QueryDescriptor::new("", vec![FieldDef::string("Id")])).is_err());

        let mut query = contacts();
        query.page = Some(Page::new(0, 1));
        assert!(encode(&query).is_err());
    }
}
