pub mod ast;
pub mod backend;
pub mod config;
pub mod error;
pub mod fetcher;
pub mod filter;
pub mod logging;
pub mod memory_backend;
pub mod resolver;
pub mod schema;
pub mod translator;

pub use backend::{BackendError, BackendPort};
pub use error::ResolveError;
pub use fetcher::{fetch_with_query_fields, FetchError};
pub use resolver::QueryFieldResolver;
pub use schema::{FieldSchema, SummaryKind};
