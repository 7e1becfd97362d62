//! Permission management module

pub mod checker;
pub mod config;
pub mod models;

pub use checker::{PermissionChecker, PermissionDecision};
pub use config::PermissionSnapshot;
pub use models::{AccessGroup, Caller, Enrollment, Restriction, Role, RoleRequirement};
