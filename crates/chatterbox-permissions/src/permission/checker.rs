//! Permission checking logic

use std::sync::Arc;

use tracing::{debug, trace};

use crate::{
    error::Result,
    pattern_matcher::PatternMatcher,
    permission::models::{Caller, RoleRequirement},
    storage::PermissionStore,
};

/// Decision result from permission checking
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PermissionDecision {
    /// The caller's role flags satisfy the command's own requirement
    AllowedByRole,
    /// A restriction owned by one of the caller's groups matches the command
    AllowedByGrant { group: String, pattern: String },
    /// No rule authorizes the caller
    Denied,
}

impl PermissionDecision {
    /// Whether execution is allowed
    pub fn is_allowed(&self) -> bool {
        !matches!(self, PermissionDecision::Denied)
    }
}

impl std::fmt::Display for PermissionDecision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PermissionDecision::AllowedByRole => write!(f, "allow (role)"),
            PermissionDecision::AllowedByGrant { group, pattern } => {
                write!(f, "allow (group {} grants {})", group, pattern)
            }
            PermissionDecision::Denied => write!(f, "deny"),
        }
    }
}

/// Evaluates whether a caller may run a command identifier
///
/// Access records are read from the store on every call; nothing is cached.
#[derive(Clone)]
pub struct PermissionChecker {
    store: Arc<dyn PermissionStore>,
    matcher: PatternMatcher,
}

impl PermissionChecker {
    /// Create a checker reading from the given store
    pub fn new(store: Arc<dyn PermissionStore>) -> Self {
        Self {
            store,
            matcher: PatternMatcher::new(),
        }
    }

    /// The store this checker reads from
    pub fn store(&self) -> &Arc<dyn PermissionStore> {
        &self.store
    }

    /// Check permission for a command
    ///
    /// # Arguments
    /// * `caller` - The identity attempting the invocation
    /// * `identifier` - Fully-qualified command identifier
    /// * `requirement` - The command's role requirement, `None` when the identifier
    ///   is not registered (always denied)
    pub fn check(
        &self,
        caller: &Caller,
        identifier: &str,
        requirement: Option<&RoleRequirement>,
    ) -> Result<PermissionDecision> {
        let Some(requirement) = requirement else {
            debug!(identifier, caller = %caller.id, "Unknown command identifier denied");
            return Ok(PermissionDecision::Denied);
        };

        if requirement.is_satisfied_by(caller) {
            trace!(identifier, caller = %caller.id, %requirement, "Role requirement satisfied");
            return Ok(PermissionDecision::AllowedByRole);
        }

        let enrollments = self.store.enrollments_for(&caller.id)?;
        let groups = self
            .store
            .groups()?
            .into_iter()
            .filter(|group| {
                group.includes_implicitly(caller)
                    || enrollments
                        .iter()
                        .any(|enrollment| enrollment.group_id == group.id)
            });

        for group in groups {
            for restriction in self.store.restrictions_for(group.id)? {
                if self.matcher.match_pattern(&restriction.pattern, identifier) {
                    debug!(
                        identifier,
                        caller = %caller.id,
                        group = %group.name,
                        pattern = %restriction.pattern,
                        "Granted by group restriction"
                    );
                    return Ok(PermissionDecision::AllowedByGrant {
                        group: group.name,
                        pattern: restriction.pattern,
                    });
                }
            }
        }

        debug!(identifier, caller = %caller.id, "No restriction grants access");
        Ok(PermissionDecision::Denied)
    }

    /// Convenience wrapper returning only the allow/deny outcome
    pub fn is_allowed(
        &self,
        caller: &Caller,
        identifier: &str,
        requirement: Option<&RoleRequirement>,
    ) -> Result<bool> {
        Ok(self.check(caller, identifier, requirement)?.is_allowed())
    }
}
