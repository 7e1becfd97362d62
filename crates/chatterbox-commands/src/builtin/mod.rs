//! Modules shipped with the dispatcher
//!
//! `Core` exposes registry introspection to every caller. `Access` administers
//! groups, enrollments and restrictions through a [`PermissionStore`].
//!
//! [`PermissionStore`]: chatterbox_permissions::PermissionStore

mod access;
mod introspection;

pub use access::access_module;
pub use introspection::core_module;
