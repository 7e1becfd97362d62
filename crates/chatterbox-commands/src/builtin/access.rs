use std::sync::Arc;

use chatterbox_permissions::{AccessGroup, Caller, Error, PermissionStore, Role, RoleRequirement};

use crate::output::{CommandOutput, CompactCollection};
use crate::types::{CommandDescriptor, CommandModule, Invocation, Param, Signature};

struct GroupEntry {
    name: String,
    roles: Vec<String>,
    patterns: Vec<String>,
}

type AdminFn = fn(&dyn PermissionStore, &Invocation) -> anyhow::Result<CommandOutput>;

/// Group administration through `store`
///
/// Every command requires the admin or broadcaster role and is whisper-only.
pub fn access_module(store: Arc<dyn PermissionStore>) -> CommandModule {
    let admin = |name: &str, description: &str, params: Vec<Param>, f: AdminFn| {
        let store = Arc::clone(&store);
        CommandDescriptor::new(name)
            .with_alias(name.to_ascii_lowercase())
            .with_description(description)
            .with_requirement(RoleRequirement::any_of([Role::Admin, Role::Broadcaster]))
            .whisper_only(true)
            .with_signature(Signature::from_fn(params, move |invocation| {
                f(store.as_ref(), invocation)
            }))
    };

    CommandModule::new("Access")
        .with_command(admin("Groups", "List access groups", Vec::new(), list_groups))
        .with_command(admin(
            "CreateGroup",
            "Create an access group",
            vec![
                Param::text("name"),
                Param::boolean("includeModerators").with_default(false),
            ],
            create_group,
        ))
        .with_command(admin(
            "DeleteGroup",
            "Delete an access group with its enrollments and restrictions",
            vec![Param::text("group")],
            delete_group,
        ))
        .with_command(admin(
            "Enroll",
            "Add an identity to a group",
            vec![Param::text("group"), Param::text("identity")],
            enroll,
        ))
        .with_command(admin(
            "Unenroll",
            "Remove an identity from a group",
            vec![Param::text("group"), Param::text("identity")],
            unenroll,
        ))
        .with_command(admin(
            "Grant",
            "Allow a group to run commands matching a pattern",
            vec![Param::text("group"), Param::text("pattern")],
            grant,
        ))
        .with_command(admin(
            "Revoke",
            "Remove a pattern from a group",
            vec![Param::text("group"), Param::text("pattern")],
            revoke,
        ))
        .with_command(admin(
            "Check",
            "Explain whether an identity may run a command",
            vec![Param::text("identity"), Param::text("identifier")],
            check,
        ))
}

/// Turn store outcomes into replies; only storage faults become errors
fn reply(outcome: chatterbox_permissions::Result<String>) -> anyhow::Result<CommandOutput> {
    match outcome {
        Ok(line) => Ok(CommandOutput::text(line)),
        Err(
            e @ (Error::DuplicateGroup(_)
            | Error::GroupNotFound(_)
            | Error::InvalidPattern { .. }
            | Error::ConfigError(_)),
        ) => Ok(CommandOutput::text(e.to_string())),
        Err(e) => Err(e.into()),
    }
}

fn find_group(store: &dyn PermissionStore, name: &str) -> chatterbox_permissions::Result<AccessGroup> {
    store
        .group_by_name(name)?
        .ok_or_else(|| Error::GroupNotFound(name.to_string()))
}

fn list_groups(store: &dyn PermissionStore, _: &Invocation) -> anyhow::Result<CommandOutput> {
    let mut entries = Vec::new();
    for group in store.groups()? {
        let patterns = store
            .restrictions_for(group.id)?
            .into_iter()
            .map(|restriction| restriction.pattern)
            .collect();
        entries.push(GroupEntry {
            name: group.name,
            roles: group.include_roles.iter().map(ToString::to_string).collect(),
            patterns,
        });
    }
    if entries.is_empty() {
        return Ok(CommandOutput::text("No access groups."));
    }

    Ok(CommandOutput::collection(CompactCollection::with_fields(
        entries,
        |entry: &GroupEntry| {
            let roles = if entry.roles.is_empty() {
                String::new()
            } else {
                format!(" [{}]", entry.roles.join(", "))
            };
            format!("{}{}: {}", entry.name, roles, entry.patterns.join(", "))
        },
        |entry: &GroupEntry| {
            vec![
                entry.name.clone(),
                entry.roles.join(","),
                entry.patterns.join(","),
            ]
        },
    )))
}

fn create_group(store: &dyn PermissionStore, invocation: &Invocation) -> anyhow::Result<CommandOutput> {
    let name = invocation.args.text("name")?;
    let mut group = AccessGroup::new(name);
    if invocation.args.boolean("includeModerators")? {
        group = group.including(Role::Moderator);
    }
    reply(store.create_group(group).map(|_| format!("Created group {}.", name)))
}

fn delete_group(store: &dyn PermissionStore, invocation: &Invocation) -> anyhow::Result<CommandOutput> {
    let name = invocation.args.text("group")?;
    reply(
        find_group(store, name)
            .and_then(|group| store.delete_group(group.id))
            .map(|group| format!("Deleted group {}.", group.name)),
    )
}

fn enroll(store: &dyn PermissionStore, invocation: &Invocation) -> anyhow::Result<CommandOutput> {
    let identity = invocation.args.text("identity")?;
    reply(find_group(store, invocation.args.text("group")?).and_then(|group| {
        store.enroll(group.id, identity)?;
        Ok(format!("Enrolled {} in {}.", identity, group.name))
    }))
}

fn unenroll(store: &dyn PermissionStore, invocation: &Invocation) -> anyhow::Result<CommandOutput> {
    let identity = invocation.args.text("identity")?;
    reply(find_group(store, invocation.args.text("group")?).and_then(|group| {
        Ok(if store.unenroll(group.id, identity)? {
            format!("Removed {} from {}.", identity, group.name)
        } else {
            format!("{} is not enrolled in {}.", identity, group.name)
        })
    }))
}

fn grant(store: &dyn PermissionStore, invocation: &Invocation) -> anyhow::Result<CommandOutput> {
    let pattern = invocation.args.text("pattern")?;
    reply(find_group(store, invocation.args.text("group")?).and_then(|group| {
        store.add_restriction(group.id, pattern)?;
        Ok(format!("{} may now use {}.", group.name, pattern))
    }))
}

fn revoke(store: &dyn PermissionStore, invocation: &Invocation) -> anyhow::Result<CommandOutput> {
    let pattern = invocation.args.text("pattern")?;
    reply(find_group(store, invocation.args.text("group")?).and_then(|group| {
        Ok(if store.remove_restriction(group.id, pattern)? {
            format!("{} may no longer use {}.", group.name, pattern)
        } else {
            format!("{} has no restriction {}.", group.name, pattern)
        })
    }))
}

fn check(_: &dyn PermissionStore, invocation: &Invocation) -> anyhow::Result<CommandOutput> {
    let identity = invocation.args.text("identity")?;
    let identifier = invocation.args.text("identifier")?;
    let context = &invocation.context;

    let command = context.registry.get(identifier).ok();
    let requirement = command
        .as_ref()
        .map(|command| command.descriptor().requirement());
    let identifier = command
        .as_ref()
        .map(|command| command.identifier())
        .unwrap_or(identifier);
    let decision = context
        .checker
        .check(&Caller::new(identity, identity), identifier, requirement)?;
    Ok(CommandOutput::text(format!("{} -> {}: {}", identity, identifier, decision)))
}
