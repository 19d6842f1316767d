//! Persistence layer — durable per-user records.

pub mod libsql;
pub mod traits;

pub use libsql::LibSqlUserStore;
pub use traits::{UserRecord, UserStore};
