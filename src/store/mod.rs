//! Persistence layer: conversation state between turns.

pub mod libsql_backend;
pub mod locks;
pub mod memory;
pub mod migrations;
pub mod traits;

pub use libsql_backend::LibSqlSessionStore;
pub use locks::{SessionGuard, SessionLocks};
pub use memory::InMemorySessionStore;
pub use traits::{SessionStore, stored_sessions};
