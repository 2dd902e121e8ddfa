// Version information for the breakdown crate

/// Version string for the breakdown crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Package name
pub const PKG_NAME: &str = env!("CARGO_PKG_NAME");
