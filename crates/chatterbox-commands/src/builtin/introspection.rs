use crate::output::{CommandOutput, CompactCollection};
use crate::types::{CommandDescriptor, CommandModule, Invocation, Param, Signature};

/// A command the caller may run
struct CommandEntry {
    identifier: String,
    aliases: Vec<String>,
}

/// Registry introspection: `Core.Commands`, `Core.Aliases` and `Core.Help`
pub fn core_module() -> CommandModule {
    CommandModule::new("Core")
        .with_command(
            CommandDescriptor::new("Commands")
                .with_alias("commands")
                .with_description("List the commands you can run")
                .with_signature(Signature::from_fn(Vec::new(), list_commands)),
        )
        .with_command(
            CommandDescriptor::new("Aliases")
                .with_alias("aliases")
                .with_description("Show the words that invoke a command")
                .with_signature(Signature::from_fn(vec![Param::text("identifier")], aliases)),
        )
        .with_command(
            CommandDescriptor::new("Help")
                .with_alias("help")
                .with_description("Show how to use a command")
                .with_signature(Signature::from_fn(vec![Param::text("command")], help)),
        )
}

fn list_commands(invocation: &Invocation) -> anyhow::Result<CommandOutput> {
    let context = &invocation.context;
    let mut entries = Vec::new();
    for command in context.registry.list_all() {
        let requirement = command.descriptor().requirement();
        if context
            .checker
            .is_allowed(&invocation.caller, command.identifier(), Some(requirement))?
        {
            entries.push(CommandEntry {
                identifier: command.identifier().to_string(),
                aliases: command.descriptor().aliases(),
            });
        }
    }

    Ok(CommandOutput::collection(CompactCollection::with_fields(
        entries,
        |entry: &CommandEntry| format!("{} ({})", entry.identifier, entry.aliases.join(", ")),
        |entry: &CommandEntry| vec![entry.identifier.clone(), entry.aliases.join(",")],
    )))
}

fn aliases(invocation: &Invocation) -> anyhow::Result<CommandOutput> {
    let identifier = invocation.args.text("identifier")?;
    let registry = &invocation.context.registry;
    if !registry.exists(identifier) {
        return Ok(CommandOutput::text(format!("Unknown command: {}", identifier)));
    }
    let command = registry.get(identifier)?;
    Ok(CommandOutput::text(format!(
        "{}: {}",
        command.identifier(),
        command.descriptor().aliases().join(", ")
    )))
}

fn help(invocation: &Invocation) -> anyhow::Result<CommandOutput> {
    let word = invocation.args.text("command")?;
    let candidates = invocation.context.registry.resolve(word);
    if candidates.is_empty() {
        return Ok(CommandOutput::text(format!("No command named '{}'.", word)));
    }

    let mut lines = Vec::new();
    for command in candidates {
        let descriptor = command.descriptor();
        if descriptor.description().is_empty() {
            lines.push(command.identifier().to_string());
        } else {
            lines.push(format!("{} - {}", command.identifier(), descriptor.description()));
        }
        for signature in descriptor.signatures() {
            lines.push(format!("Usage: {}", signature.usage(word)));
        }
        if descriptor.is_whisper_only() {
            lines.push("Whisper only.".to_string());
        }
    }
    Ok(CommandOutput::lines(lines))
}
