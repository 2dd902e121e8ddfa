//! Database module
//!
//! Provides database connectivity, row models, repositories, and error
//! handling for persistent storage of breakdown tickets.

pub mod connection;
pub mod error;
pub mod models;
pub mod repositories;

pub use connection::{DatabaseConnection, DatabasePool};
pub use error::{DatabaseError, DbResult};
