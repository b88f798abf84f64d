//! Force.com REST API client
//!
//! Session handling, the authentication flow, the request pipeline with its
//! one-shot token refresh, SOQL query encoding and the list data adapter.

pub mod auth;
pub mod client;
pub mod constants;
pub mod error;
pub mod logging;
pub mod models;
pub mod operations;
pub mod query;
pub mod request;
pub mod session;
pub mod transport;

pub use auth::{AuthFlow, AuthHint, AuthOutcome, AuthState};
pub use client::ForceClient;
pub use error::{AuthError, HttpFailure, QueryError, RequestError, TransportError};
pub use models::{Credentials, Session, SessionUpdate, UserInfo};
pub use operations::{ListDataAdapter, ListState, Operation, OperationResult, Record, RecordSchema};
pub use query::{
    FieldDef, FieldKind, FilterTerm, FilterValue, Page, QueryBuilder, QueryDescriptor,
    QueryResponse, SortTerm,
};
pub use request::{ApiResponse, RequestDescriptor};
pub use session::SessionStore;
pub use transport::{HttpRequest, HttpResponse, HttpTransport, ReqwestTransport};
