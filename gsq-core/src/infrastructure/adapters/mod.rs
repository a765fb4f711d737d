pub mod duckdb;
pub mod http;

pub use self::duckdb::DuckDbStore;
pub use self::http::{ReqwestTransport, RetryPolicy};
