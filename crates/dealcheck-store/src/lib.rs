pub mod database;
pub mod error;
pub mod history;
pub mod kv;
pub mod schema;
pub mod session;

pub use database::Database;
pub use error::StoreError;
pub use history::{HistoryStore, StoredResult};
pub use kv::{KeyValue, MemoryKv, SqliteKv};
pub use session::SessionStore;
