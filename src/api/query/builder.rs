//! QueryBuilder for fluent query construction
//!
//! Builds a reusable `QueryDescriptor`, or encodes and runs it straight away

use super::filters::{FilterTerm, FilterValue};
use super::orderby::SortTerm;
use super::query::{FieldDef, Page, QueryDescriptor};
use super::result::QueryResponse;
use crate::api::client::ForceClient;
use crate::api::error::RequestError;

#[derive(Debug, Clone)]
pub struct QueryBuilder {
    query: QueryDescriptor,
}

impl QueryBuilder {
    pub fn new(collection: impl Into<String>) -> Self {
        Self {
            query: QueryDescriptor::new(collection, Vec::new()),
        }
    }

    /// Project plain string-typed fields
    pub fn select(mut self, fields: &[&str]) -> Self {
        self.query.fields.extend(fields.iter().map(|f| FieldDef::string(*f)));
        self
    }

    /// Project a field with its declared kind
    pub fn field(mut self, field: FieldDef) -> Self {
        self.query.fields.push(field);
        self
    }

    pub fn filter(mut self, property: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        self.query.filters.push(FilterTerm::new(property, value));
        self
    }

    /// Raw clause appended to the WHERE clause as-is
    pub fn raw(mut self, clause: impl Into<String>) -> Self {
        self.query.filters.push(FilterTerm::raw(clause));
        self
    }

    /// Sort key; only the first one given is encoded
    pub fn order_by(mut self, sort: SortTerm) -> Self {
        self.query.sorters.push(sort);
        self
    }

    pub fn page(mut self, size: u32, number: u32) -> Self {
        self.query.page = Some(Page::new(size, number));
        self
    }

    pub fn build(self) -> QueryDescriptor {
        self.query
    }

    /// Build, encode and run
    pub async fn execute(self, client: &ForceClient) -> Result<QueryResponse, RequestError> {
        let statement = self.build().encode()?;
        client.query(&statement).await
    }
}
