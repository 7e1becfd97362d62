//! Permission data models

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Role flag carried by a chat identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Moderator,
    Subscriber,
    Vip,
    Admin,
    Broadcaster,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Moderator => write!(f, "moderator"),
            Role::Subscriber => write!(f, "subscriber"),
            Role::Vip => write!(f, "vip"),
            Role::Admin => write!(f, "admin"),
            Role::Broadcaster => write!(f, "broadcaster"),
        }
    }
}

/// The speaker attempting to invoke a command
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Caller {
    /// Stable identity id assigned by the chat transport
    pub id: String,
    /// Name shown in replies
    pub display_name: String,
    /// Role flags
    #[serde(default)]
    pub roles: BTreeSet<Role>,
}

impl Caller {
    /// Create a caller without any roles
    pub fn new(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            roles: BTreeSet::new(),
        }
    }

    /// Add a role flag
    pub fn with_role(mut self, role: Role) -> Self {
        self.roles.insert(role);
        self
    }

    /// Check whether the caller carries a role
    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }

    /// Check whether the caller carries at least one of the given roles
    pub fn has_any_role<'a, I>(&self, roles: I) -> bool
    where
        I: IntoIterator<Item = &'a Role>,
    {
        roles.into_iter().any(|role| self.roles.contains(role))
    }
}

/// Built-in flag requirement declared by a command
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoleRequirement {
    /// Every caller satisfies the requirement
    #[default]
    Everyone,
    /// Callers carrying at least one of these roles satisfy the requirement
    AnyOf(BTreeSet<Role>),
    /// Only group restrictions can grant access
    GrantOnly,
}

impl RoleRequirement {
    /// Requirement satisfied by any of the given roles
    pub fn any_of<I: IntoIterator<Item = Role>>(roles: I) -> Self {
        RoleRequirement::AnyOf(roles.into_iter().collect())
    }

    /// Check whether the caller's flags satisfy this requirement on their own
    pub fn is_satisfied_by(&self, caller: &Caller) -> bool {
        match self {
            RoleRequirement::Everyone => true,
            RoleRequirement::AnyOf(roles) => caller.has_any_role(roles),
            RoleRequirement::GrantOnly => false,
        }
    }
}

impl std::fmt::Display for RoleRequirement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RoleRequirement::Everyone => write!(f, "everyone"),
            RoleRequirement::AnyOf(roles) => {
                let names: Vec<String> = roles.iter().map(Role::to_string).collect();
                write!(f, "any of [{}]", names.join(", "))
            }
            RoleRequirement::GrantOnly => write!(f, "grant only"),
        }
    }
}

/// A named group of identities sharing command restrictions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessGroup {
    pub id: Uuid,
    /// Unique group name
    pub name: String,
    /// Callers carrying any of these roles are implicit members
    #[serde(default)]
    pub include_roles: BTreeSet<Role>,
    pub created_at: DateTime<Utc>,
}

impl AccessGroup {
    /// Create a new group with a fresh id
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            include_roles: BTreeSet::new(),
            created_at: Utc::now(),
        }
    }

    /// Make callers carrying `role` implicit members
    pub fn including(mut self, role: Role) -> Self {
        self.include_roles.insert(role);
        self
    }

    /// Whether the caller's role flags make them an implicit member
    pub fn includes_implicitly(&self, caller: &Caller) -> bool {
        caller.has_any_role(&self.include_roles)
    }
}

/// Membership of an identity in a group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Enrollment {
    pub group_id: Uuid,
    pub identity_id: String,
    pub enrolled_at: DateTime<Utc>,
}

impl Enrollment {
    pub fn new(group_id: Uuid, identity_id: impl Into<String>) -> Self {
        Self {
            group_id,
            identity_id: identity_id.into(),
            enrolled_at: Utc::now(),
        }
    }
}

/// A command pattern granted to a group's members
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Restriction {
    pub group_id: Uuid,
    /// Exact identifier or wildcard pattern such as `Dungeon.*`
    pub pattern: String,
}

impl Restriction {
    pub fn new(group_id: Uuid, pattern: impl Into<String>) -> Self {
        Self {
            group_id,
            pattern: pattern.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_display() {
        assert_eq!(Role::Moderator.to_string(), "moderator");
        assert_eq!(Role::Vip.to_string(), "vip");
    }

    #[test]
    fn test_caller_roles() {
        let caller = Caller::new("42", "angler").with_role(Role::Subscriber);
        assert!(caller.has_role(Role::Subscriber));
        assert!(!caller.has_role(Role::Moderator));
        assert!(caller.has_any_role(&[Role::Moderator, Role::Subscriber]));
        assert!(!caller.has_any_role(&Vec::<Role>::new()));
    }

    #[test]
    fn test_requirement_satisfaction() {
        let viewer = Caller::new("1", "viewer");
        let moderator = Caller::new("2", "mod").with_role(Role::Moderator);
        let requirement = RoleRequirement::any_of([Role::Moderator, Role::Admin]);

        assert!(RoleRequirement::Everyone.is_satisfied_by(&viewer));
        assert!(!requirement.is_satisfied_by(&viewer));
        assert!(requirement.is_satisfied_by(&moderator));
        assert!(!RoleRequirement::GrantOnly.is_satisfied_by(&moderator));
    }

    #[test]
    fn test_group_implicit_membership() {
        let group = AccessGroup::new("mods").including(Role::Moderator);
        let moderator = Caller::new("2", "mod").with_role(Role::Moderator);
        let viewer = Caller::new("1", "viewer");

        assert!(group.includes_implicitly(&moderator));
        assert!(!group.includes_implicitly(&viewer));
    }

    #[test]
    fn test_role_serialization() {
        let json = serde_json::to_string(&Role::Broadcaster).unwrap();
        assert_eq!(json, "\"broadcaster\"");

        let requirement: RoleRequirement =
            serde_json::from_str(r#"{"any_of":["moderator"]}"#).unwrap();
        assert_eq!(requirement, RoleRequirement::any_of([Role::Moderator]));
    }
}
