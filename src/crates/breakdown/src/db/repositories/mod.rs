//! Repository layer for database access

pub mod breakdown_repo;

pub use breakdown_repo::BreakdownRepository;
