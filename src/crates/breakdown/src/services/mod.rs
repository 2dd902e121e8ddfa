//! Breakdown services: the lifecycle engine and the admin gate

pub mod admin;
pub mod lifecycle;

pub use admin::{password_digest, AdminGate, AdminIdentity, GateError};
pub use lifecycle::{
    AdminEdit, ApprovalInput, ClosureInput, LifecycleEngine, LifecycleError, LifecycleResult,
    OpenInput, TemporaryInput,
};
