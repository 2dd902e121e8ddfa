//! HTTP request handlers

pub mod admin;
pub mod breakdowns;
pub mod files;
pub mod form;
pub mod health;

pub use breakdowns::{
    advance_approval, advance_closure, advance_temporary, get_breakdown, list_for_owner,
    open_breakdown,
};
pub use files::fetch_file;
pub use health::health;
