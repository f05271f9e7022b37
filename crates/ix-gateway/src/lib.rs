//! Connection pool and typed database gateway.
//!
//! A semaphore-bounded connection pool with per-connection statement
//! caching, wrapped in a typed API that never interpolates values into SQL
//! text and always quotes identifiers through a dedicated API
//! ([`identifier::Ident`]).

pub mod identifier;
pub mod pool;
pub mod retry;
pub mod tls;
pub mod value;

pub use identifier::{
    quote_literal,
    Ident,
};
pub use pool::{
    ConnectionPool,
    GatewayConnection,
};
pub use retry::{
    classify,
    with_db_retry,
};
