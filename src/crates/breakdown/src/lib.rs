//! Equipment breakdown ticket service
//!
//! Tickets move through four stages (open, temporary fix, closure and
//! approval). The [`services::LifecycleEngine`] guards every transition,
//! persists tickets through a [`store::TicketStore`], keeps uploaded media in
//! a [`attachments::BlobStore`] and republishes the full dataset to a
//! spreadsheet mirror after each change.

pub mod allowlist;
pub mod api;
pub mod app;
pub mod attachments;
pub mod config;
pub mod db;
pub mod mirror;
pub mod services;
pub mod store;
pub mod ticket;
pub mod version;

pub use allowlist::{Allowlists, CodeSet};
pub use services::{LifecycleEngine, LifecycleError};
pub use store::{TicketFilter, TicketPatch, TicketStore};
pub use ticket::{ApprovalStatus, Stage, Ticket};

/// Get version information
pub fn version() -> &'static str {
    version::VERSION
}
