//! Access control for chatterbox commands
//!
//! Decides, per caller per command identifier, whether execution is allowed.
//! Callers pass when their role flags satisfy the command's own requirement, or
//! when a group they belong to owns a restriction pattern matching the identifier.

pub mod error;
pub mod pattern_matcher;
pub mod permission;
pub mod storage;

pub use error::{Error, Result};
pub use pattern_matcher::PatternMatcher;
pub use permission::{
    AccessGroup, Caller, Enrollment, PermissionChecker, PermissionDecision, PermissionSnapshot,
    Restriction, Role, RoleRequirement,
};
pub use storage::{FilePermissionStore, InMemoryPermissionStore, PermissionStore};
