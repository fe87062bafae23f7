//! Public request/response types for the Tollgate API.

mod identity;
mod request;
mod response;

pub use identity::Identity;
pub use request::{DEFAULT_CONTEXT_SIZE, QueryRequest, truncate_chars};
pub use response::QueryResponse;
