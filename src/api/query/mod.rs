//! SOQL query building
//!
//! `QueryDescriptor` is the declarative form of a list fetch; `encode` turns
//! it into a statement for the query endpoint. `QueryBuilder` is the fluent
//! front end.

pub mod builder;
pub mod filters;
pub mod orderby;
pub mod query;
pub mod result;

pub use builder::QueryBuilder;
pub use filters::{FilterTerm, FilterValue, RAW_FILTER_PROPERTY};
pub use orderby::{SortDirection, SortTerm};
pub use query::{encode, FieldDef, FieldKind, Page, QueryDescriptor};
pub use result::QueryResponse;
