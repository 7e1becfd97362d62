//! Serializable snapshot of all access records

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::{Error, Result},
    pattern_matcher::PatternMatcher,
    permission::models::{AccessGroup, Enrollment, Restriction},
};

/// Groups, enrollments and restrictions as stored by a permission store
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionSnapshot {
    #[serde(default)]
    pub groups: Vec<AccessGroup>,
    #[serde(default)]
    pub enrollments: Vec<Enrollment>,
    #[serde(default)]
    pub restrictions: Vec<Restriction>,
}

impl PermissionSnapshot {
    /// Create an empty snapshot
    pub fn new() -> Self {
        Self::default()
    }

    /// Find a group by name (ASCII case-insensitive)
    pub fn group_by_name(&self, name: &str) -> Option<&AccessGroup> {
        self.groups
            .iter()
            .find(|group| group.name.eq_ignore_ascii_case(name))
    }

    /// Find a group by id
    pub fn group(&self, id: Uuid) -> Option<&AccessGroup> {
        self.groups.iter().find(|group| group.id == id)
    }

    /// Enrollments of one identity
    pub fn enrollments_for(&self, identity_id: &str) -> Vec<Enrollment> {
        self.enrollments
            .iter()
            .filter(|enrollment| enrollment.identity_id == identity_id)
            .cloned()
            .collect()
    }

    /// Restrictions owned by one group
    pub fn restrictions_for(&self, group_id: Uuid) -> Vec<Restriction> {
        self.restrictions
            .iter()
            .filter(|restriction| restriction.group_id == group_id)
            .cloned()
            .collect()
    }

    /// Add a group; names are unique
    pub fn insert_group(&mut self, group: AccessGroup) -> Result<()> {
        if group.name.trim().is_empty() {
            return Err(Error::ConfigError("Group name cannot be empty".to_string()));
        }
        if self.group_by_name(&group.name).is_some() {
            return Err(Error::DuplicateGroup(group.name));
        }
        self.groups.push(group);
        Ok(())
    }

    /// Remove a group together with its enrollments and restrictions
    pub fn remove_group(&mut self, id: Uuid) -> Result<AccessGroup> {
        let index = self
            .groups
            .iter()
            .position(|group| group.id == id)
            .ok_or_else(|| Error::GroupNotFound(id.to_string()))?;
        let group = self.groups.remove(index);
        self.enrollments.retain(|enrollment| enrollment.group_id != id);
        self.restrictions.retain(|restriction| restriction.group_id != id);
        Ok(group)
    }

    /// Enroll an identity; enrolling twice is a no-op
    pub fn insert_enrollment(&mut self, enrollment: Enrollment) -> Result<()> {
        self.require_group(enrollment.group_id)?;
        let exists = self.enrollments.iter().any(|existing| {
            existing.group_id == enrollment.group_id
                && existing.identity_id == enrollment.identity_id
        });
        if !exists {
            self.enrollments.push(enrollment);
        }
        Ok(())
    }

    /// Remove an enrollment; returns whether one was removed
    pub fn remove_enrollment(&mut self, group_id: Uuid, identity_id: &str) -> Result<bool> {
        self.require_group(group_id)?;
        let before = self.enrollments.len();
        self.enrollments.retain(|enrollment| {
            !(enrollment.group_id == group_id && enrollment.identity_id == identity_id)
        });
        Ok(self.enrollments.len() != before)
    }

    /// Add a validated restriction; adding twice is a no-op
    pub fn insert_restriction(&mut self, restriction: Restriction) -> Result<()> {
        self.require_group(restriction.group_id)?;
        PatternMatcher::new().validate_pattern(&restriction.pattern)?;
        if !self.restrictions.contains(&restriction) {
            self.restrictions.push(restriction);
        }
        Ok(())
    }

    /// Remove a restriction; returns whether one was removed
    pub fn remove_restriction(&mut self, group_id: Uuid, pattern: &str) -> Result<bool> {
        self.require_group(group_id)?;
        let before = self.restrictions.len();
        self.restrictions
            .retain(|restriction| !(restriction.group_id == group_id && restriction.pattern == pattern));
        Ok(self.restrictions.len() != before)
    }

    fn require_group(&self, id: Uuid) -> Result<()> {
        self.group(id)
            .map(|_| ())
            .ok_or_else(|| Error::GroupNotFound(id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::permission::models::Role;

    #[test]
    fn test_snapshot_creation() {
        let snapshot = PermissionSnapshot::new();
        assert!(snapshot.groups.is_empty());
        assert!(snapshot.enrollments.is_empty());
        assert!(snapshot.restrictions.is_empty());
    }

    #[test]
    fn test_group_names_are_unique() {
        let mut snapshot = PermissionSnapshot::new();
        snapshot.insert_group(AccessGroup::new("Anglers")).unwrap();
        let err = snapshot.insert_group(AccessGroup::new("anglers")).unwrap_err();
        assert!(matches!(err, Error::DuplicateGroup(_)));
        assert!(snapshot.insert_group(AccessGroup::new("  ")).is_err());
    }

    #[test]
    fn test_remove_group_cascades() {
        let mut snapshot = PermissionSnapshot::new();
        let group = AccessGroup::new("Anglers").including(Role::Vip);
        let id = group.id;
        snapshot.insert_group(group).unwrap();
        snapshot.insert_enrollment(Enrollment::new(id, "42")).unwrap();
        snapshot
            .insert_restriction(Restriction::new(id, "Fishing.*"))
            .unwrap();

        snapshot.remove_group(id).unwrap();
        assert!(snapshot.enrollments.is_empty());
        assert!(snapshot.restrictions.is_empty());
        assert!(snapshot.remove_group(id).is_err());
    }

    #[test]
    fn test_enrollment_is_idempotent() {
        let mut snapshot = PermissionSnapshot::new();
        let group = AccessGroup::new("Anglers");
        let id = group.id;
        snapshot.insert_group(group).unwrap();

        snapshot.insert_enrollment(Enrollment::new(id, "42")).unwrap();
        snapshot.insert_enrollment(Enrollment::new(id, "42")).unwrap();
        assert_eq!(snapshot.enrollments_for("42").len(), 1);

        assert!(snapshot.remove_enrollment(id, "42").unwrap());
        assert!(!snapshot.remove_enrollment(id, "42").unwrap());
    }

    #[test]
    fn test_restriction_requires_valid_pattern_and_group() {
        let mut snapshot = PermissionSnapshot::new();
        let group = AccessGroup::new("Anglers");
        let id = group.id;

        assert!(matches!(
            snapshot.insert_restriction(Restriction::new(id, "Fishing.*")),
            Err(Error::GroupNotFound(_))
        ));

        snapshot.insert_group(group).unwrap();
        assert!(matches!(
            snapshot.insert_restriction(Restriction::new(id, "Fish*")),
            Err(Error::InvalidPattern { .. })
        ));
        snapshot
            .insert_restriction(Restriction::new(id, "Fishing.*"))
            .unwrap();
        snapshot
            .insert_restriction(Restriction::new(id, "Fishing.*"))
            .unwrap();
        assert_eq!(snapshot.restrictions_for(id).len(), 1);
        assert!(snapshot.remove_restriction(id, "Fishing.*").unwrap());
    }

    #[test]
    fn test_snapshot_serialization() {
        let mut snapshot = PermissionSnapshot::new();
        let group = AccessGroup::new("Anglers");
        let id = group.id;
        snapshot.insert_group(group).unwrap();
        snapshot
            .insert_restriction(Restriction::new(id, "Fishing.Cast"))
            .unwrap();

        let json = serde_json::to_string(&snapshot).unwrap();
        let deserialized: PermissionSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized, snapshot);

        let empty: PermissionSnapshot = serde_json::from_str("{}").unwrap();
        assert!(empty.groups.is_empty());
    }
}
