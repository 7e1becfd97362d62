//! Storage integration for access records
//!
//! Groups, enrollments and restrictions are owned by a persistence collaborator.
//! Every read goes back to the store so that changes are visible on the next check.

use std::{
    path::{Path, PathBuf},
    sync::{Arc, Mutex, RwLock},
};

use uuid::Uuid;

use crate::{
    error::{Error, Result},
    permission::{AccessGroup, Enrollment, PermissionSnapshot, Restriction},
};

/// Repository trait for reading and administering access records
pub trait PermissionStore: Send + Sync {
    /// All access groups
    fn groups(&self) -> Result<Vec<AccessGroup>>;

    /// Find a group by its unique name
    fn group_by_name(&self, name: &str) -> Result<Option<AccessGroup>>;

    /// Enrollments of one identity
    fn enrollments_for(&self, identity_id: &str) -> Result<Vec<Enrollment>>;

    /// Restriction patterns owned by one group
    fn restrictions_for(&self, group_id: Uuid) -> Result<Vec<Restriction>>;

    /// Create a group
    fn create_group(&self, group: AccessGroup) -> Result<()>;

    /// Delete a group and everything attached to it
    fn delete_group(&self, group_id: Uuid) -> Result<AccessGroup>;

    /// Enroll an identity in a group
    fn enroll(&self, group_id: Uuid, identity_id: &str) -> Result<()>;

    /// Remove an identity from a group
    fn unenroll(&self, group_id: Uuid, identity_id: &str) -> Result<bool>;

    /// Grant a command pattern to a group
    fn add_restriction(&self, group_id: Uuid, pattern: &str) -> Result<()>;

    /// Revoke a command pattern from a group
    fn remove_restriction(&self, group_id: Uuid, pattern: &str) -> Result<bool>;
}

/// In-memory permission store
#[derive(Debug, Clone, Default)]
pub struct InMemoryPermissionStore {
    snapshot: Arc<RwLock<PermissionSnapshot>>,
}

impl InMemoryPermissionStore {
    /// Create an empty in-memory store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store seeded with existing records
    pub fn with_snapshot(snapshot: PermissionSnapshot) -> Self {
        Self {
            snapshot: Arc::new(RwLock::new(snapshot)),
        }
    }

    fn read<T>(&self, f: impl FnOnce(&PermissionSnapshot) -> T) -> Result<T> {
        let snapshot = self
            .snapshot
            .read()
            .map_err(|e| Error::Internal(format!("Failed to read access records: {}", e)))?;
        Ok(f(&snapshot))
    }

    fn write<T>(&self, f: impl FnOnce(&mut PermissionSnapshot) -> Result<T>) -> Result<T> {
        let mut snapshot = self
            .snapshot
            .write()
            .map_err(|e| Error::Internal(format!("Failed to write access records: {}", e)))?;
        f(&mut snapshot)
    }
}

impl PermissionStore for InMemoryPermissionStore {
    fn groups(&self) -> Result<Vec<AccessGroup>> {
        self.read(|snapshot| snapshot.groups.clone())
    }

    fn group_by_name(&self, name: &str) -> Result<Option<AccessGroup>> {
        self.read(|snapshot| snapshot.group_by_name(name).cloned())
    }

    fn enrollments_for(&self, identity_id: &str) -> Result<Vec<Enrollment>> {
        self.read(|snapshot| snapshot.enrollments_for(identity_id))
    }

    fn restrictions_for(&self, group_id: Uuid) -> Result<Vec<Restriction>> {
        self.read(|snapshot| snapshot.restrictions_for(group_id))
    }

    fn create_group(&self, group: AccessGroup) -> Result<()> {
        self.write(|snapshot| snapshot.insert_group(group))
    }

    fn delete_group(&self, group_id: Uuid) -> Result<AccessGroup> {
        self.write(|snapshot| snapshot.remove_group(group_id))
    }

    fn enroll(&self, group_id: Uuid, identity_id: &str) -> Result<()> {
        self.write(|snapshot| snapshot.insert_enrollment(Enrollment::new(group_id, identity_id)))
    }

    fn unenroll(&self, group_id: Uuid, identity_id: &str) -> Result<bool> {
        self.write(|snapshot| snapshot.remove_enrollment(group_id, identity_id))
    }

    fn add_restriction(&self, group_id: Uuid, pattern: &str) -> Result<()> {
        self.write(|snapshot| snapshot.insert_restriction(Restriction::new(group_id, pattern)))
    }

    fn remove_restriction(&self, group_id: Uuid, pattern: &str) -> Result<bool> {
        self.write(|snapshot| snapshot.remove_restriction(group_id, pattern))
    }
}

/// File-based permission store
///
/// The JSON file is re-read on every call and replaced after every mutation by
/// writing a sibling `.tmp` file and renaming it over the original.
#[derive(Debug)]
pub struct FilePermissionStore {
    path: PathBuf,
    // Serializes read-modify-write cycles issued through this handle
    write_lock: Mutex<()>,
}

impl FilePermissionStore {
    /// Create a store backed by the given file
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            write_lock: Mutex::new(()),
        }
    }

    /// Create a store using `permissions.json` inside a base directory
    pub fn with_defaults<P: AsRef<Path>>(base_path: P) -> Self {
        Self::new(base_path.as_ref().join("permissions.json"))
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<PermissionSnapshot> {
        if !self.path.exists() {
            return Ok(PermissionSnapshot::new());
        }

        let content = std::fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(PermissionSnapshot::new());
        }
        Ok(serde_json::from_str(&content)?)
    }

    fn save(&self, snapshot: &PermissionSnapshot) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        // Readers only ever see a complete file: write a sibling, then rename over
        let content = serde_json::to_string_pretty(snapshot)?;
        let temp_path = self.temp_path();
        std::fs::write(&temp_path, content)?;
        std::fs::rename(&temp_path, &self.path)?;
        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_os_string();
        name.push(".tmp");
        PathBuf::from(name)
    }

    fn modify<T>(&self, f: impl FnOnce(&mut PermissionSnapshot) -> Result<T>) -> Result<T> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|e| Error::Internal(format!("Failed to lock permission file: {}", e)))?;
        let mut snapshot = self.load()?;
        let value = f(&mut snapshot)?;
        self.save(&snapshot)?;
        Ok(value)
    }
}

impl PermissionStore for FilePermissionStore {
    fn groups(&self) -> Result<Vec<AccessGroup>> {
        Ok(self.load()?.groups)
    }

    fn group_by_name(&self, name: &str) -> Result<Option<AccessGroup>> {
        Ok(self.load()?.group_by_name(name).cloned())
    }

    fn enrollments_for(&self, identity_id: &str) -> Result<Vec<Enrollment>> {
        Ok(self.load()?.enrollments_for(identity_id))
    }

    fn restrictions_for(&self, group_id: Uuid) -> Result<Vec<Restriction>> {
        Ok(self.load()?.restrictions_for(group_id))
    }

    fn create_group(&self, group: AccessGroup) -> Result<()> {
        self.modify(|snapshot| snapshot.insert_group(group))
    }

    fn delete_group(&self, group_id: Uuid) -> Result<AccessGroup> {
        self.modify(|snapshot| snapshot.remove_group(group_id))
    }

    fn enroll(&self, group_id: Uuid, identity_id: &str) -> Result<()> {
        self.modify(|snapshot| snapshot.insert_enrollment(Enrollment::new(group_id, identity_id)))
    }

    fn unenroll(&self, group_id: Uuid, identity_id: &str) -> Result<bool> {
        self.modify(|snapshot| snapshot.remove_enrollment(group_id, identity_id))
    }

    fn add_restriction(&self, group_id: Uuid, pattern: &str) -> Result<()> {
        self.modify(|snapshot| snapshot.insert_restriction(Restriction::new(group_id, pattern)))
    }

    fn remove_restriction(&self, group_id: Uuid, pattern: &str) -> Result<bool> {
        self.modify(|snapshot| snapshot.remove_restriction(group_id, pattern))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::permission::Role;

    #[test]
    fn test_in_memory_store_round_trip() {
        let store = InMemoryPermissionStore::new();
        let group = AccessGroup::new("Anglers");
        let id = group.id;

        store.create_group(group).unwrap();
        store.enroll(id, "42").unwrap();
        store.add_restriction(id, "Fishing.*").unwrap();

        assert_eq!(store.groups().unwrap().len(), 1);
        assert_eq!(store.enrollments_for("42").unwrap().len(), 1);
        assert_eq!(store.restrictions_for(id).unwrap()[0].pattern, "Fishing.*");
        assert_eq!(store.group_by_name("anglers").unwrap().unwrap().id, id);
    }

    #[test]
    fn test_in_memory_store_clones_share_records() {
        let store = InMemoryPermissionStore::new();
        let view = store.clone();
        store
            .create_group(AccessGroup::new("Mods").including(Role::Moderator))
            .unwrap();
        assert_eq!(view.groups().unwrap().len(), 1);
    }

    #[test]
    fn test_in_memory_store_rejects_invalid_pattern() {
        let store = InMemoryPermissionStore::new();
        let group = AccessGroup::new("Anglers");
        let id = group.id;
        store.create_group(group).unwrap();
        assert!(store.add_restriction(id, "Fishing..Cast").is_err());
        assert!(store.restrictions_for(id).unwrap().is_empty());
    }

    #[test]
    fn test_file_store_persists_between_handles() {
        let dir = tempfile::tempdir().unwrap();
        let store = FilePermissionStore::with_defaults(dir.path());
        let group = AccessGroup::new("Anglers");
        let id = group.id;

        store.create_group(group).unwrap();
        store.enroll(id, "42").unwrap();
        store.add_restriction(id, "Fishing.Cast").unwrap();

        let reopened = FilePermissionStore::new(store.path());
        assert_eq!(reopened.groups().unwrap().len(), 1);
        assert_eq!(reopened.enrollments_for("42").unwrap()[0].group_id, id);
        assert!(reopened.remove_restriction(id, "Fishing.Cast").unwrap());
        assert!(store.restrictions_for(id).unwrap().is_empty());
    }

    #[test]
    fn test_file_store_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FilePermissionStore::new(dir.path().join("nested").join("access.json"));
        assert!(store.groups().unwrap().is_empty());
        assert!(store.enrollments_for("42").unwrap().is_empty());
    }

    #[test]
    fn test_file_store_failed_mutation_leaves_file_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let store = FilePermissionStore::with_defaults(dir.path());
        store.create_group(AccessGroup::new("Anglers")).unwrap();
        assert!(store.create_group(AccessGroup::new("Anglers")).is_err());
        assert_eq!(store.groups().unwrap().len(), 1);
    }

    #[test]
    fn test_file_store_replaces_file_without_leftovers() {
        let dir = tempfile::tempdir().unwrap();
        let store = FilePermissionStore::with_defaults(dir.path());
        let group = AccessGroup::new("Anglers");
        let id = group.id;
        store.create_group(group).unwrap();
        store.add_restriction(id, "Fishing.*").unwrap();

        let entries: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect();
        assert_eq!(entries, vec![std::ffi::OsString::from("permissions.json")]);

        let content = std::fs::read_to_string(store.path()).unwrap();
        let snapshot: PermissionSnapshot = serde_json::from_str(&content).unwrap();
        assert_eq!(snapshot.restrictions_for(id).len(), 1);
    }

    #[test]
    fn test_file_store_reads_never_see_partial_writes() {
        let dir = tempfile::tempdir().unwrap();
        let writer = FilePermissionStore::with_defaults(dir.path());
        let reader = FilePermissionStore::new(writer.path());
        let group = AccessGroup::new("Anglers");
        let id = group.id;
        writer.create_group(group).unwrap();

        std::thread::scope(|scope| {
            scope.spawn(|| {
                for n in 0..100 {
                    writer
                        .add_restriction(id, &format!("Pond{}.{}", n, "x".repeat(64)))
                        .unwrap();
                }
            });
            for _ in 0..300 {
                assert_eq!(reader.groups().unwrap().len(), 1);
                reader.restrictions_for(id).unwrap();
            }
        });

        assert_eq!(reader.restrictions_for(id).unwrap().len(), 100);
    }
}
