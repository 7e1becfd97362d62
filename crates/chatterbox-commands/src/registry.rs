use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info};

use crate::error::{CommandError, Result};
use crate::types::{CommandDescriptor, CommandModule};

/// A descriptor bound to its composed `module.command` identifier
#[derive(Debug)]
pub struct RegisteredCommand {
    identifier: String,
    module: String,
    descriptor: CommandDescriptor,
}

impl RegisteredCommand {
    /// Fully-qualified identifier, immutable once registered
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn module(&self) -> &str {
        &self.module
    }

    pub fn descriptor(&self) -> &CommandDescriptor {
        &self.descriptor
    }

    /// Whether `word` is one of this command's aliases
    pub fn has_alias(&self, word: &str) -> bool {
        self.descriptor
            .aliases()
            .iter()
            .any(|alias| alias.eq_ignore_ascii_case(word))
    }
}

/// Registry mapping command identifiers to descriptors
///
/// Built once at startup from the modules passed to [`CommandRegistry::from_modules`]
/// and read-only afterwards.
#[derive(Debug, Clone, Default)]
pub struct CommandRegistry {
    commands: Vec<Arc<RegisteredCommand>>,
    by_identifier: HashMap<String, usize>,
}

impl CommandRegistry {
    /// Create a new empty command registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from every module, failing on the first invalid declaration
    pub fn from_modules<I>(modules: I) -> Result<Self>
    where
        I: IntoIterator<Item = CommandModule>,
    {
        let mut registry = Self::new();
        for module in modules {
            registry.register_module(module)?;
        }
        info!(commands = registry.count(), "Command registry built");
        Ok(registry)
    }

    /// Register every command of a module
    ///
    /// The module is validated as a whole before anything is inserted, so a failure
    /// leaves the registry unchanged.
    pub fn register_module(&mut self, module: CommandModule) -> Result<()> {
        validate_module_name(&module.name)?;

        let mut staged: Vec<RegisteredCommand> = Vec::with_capacity(module.commands.len());
        for descriptor in module.commands {
            let identifier = format!("{}.{}", module.name, descriptor.name());
            validate_descriptor(&identifier, &descriptor)?;

            let key = identifier.to_ascii_lowercase();
            if self.by_identifier.contains_key(&key)
                || staged
                    .iter()
                    .any(|command| command.identifier.eq_ignore_ascii_case(&identifier))
            {
                return Err(CommandError::DuplicateIdentifier(identifier));
            }

            staged.push(RegisteredCommand {
                identifier,
                module: module.name.clone(),
                descriptor,
            });
        }

        for command in staged {
            debug!(
                identifier = %command.identifier,
                aliases = ?command.descriptor.aliases(),
                "Registered command"
            );
            self.by_identifier
                .insert(command.identifier.to_ascii_lowercase(), self.commands.len());
            self.commands.push(Arc::new(command));
        }
        Ok(())
    }

    /// Get a command by fully-qualified identifier
    pub fn get(&self, identifier: &str) -> Result<Arc<RegisteredCommand>> {
        self.by_identifier
            .get(&identifier.to_ascii_lowercase())
            .map(|index| Arc::clone(&self.commands[*index]))
            .ok_or_else(|| CommandError::CommandNotFound(identifier.to_string()))
    }

    /// Commands carrying `word` as an alias, in registration order
    pub fn find_by_alias(&self, word: &str) -> Vec<Arc<RegisteredCommand>> {
        self.commands
            .iter()
            .filter(|command| command.has_alias(word))
            .cloned()
            .collect()
    }

    /// Candidates for the first word of a message
    ///
    /// Aliases are tried first; a word matching no alias is looked up as a
    /// fully-qualified identifier.
    pub fn resolve(&self, word: &str) -> Vec<Arc<RegisteredCommand>> {
        if word.is_empty() {
            return Vec::new();
        }
        let candidates = self.find_by_alias(word);
        if !candidates.is_empty() {
            return candidates;
        }
        self.get(word).map(|command| vec![command]).unwrap_or_default()
    }

    /// Every registered identifier, in registration order
    pub fn identifiers(&self) -> Vec<String> {
        self.commands
            .iter()
            .map(|command| command.identifier.clone())
            .collect()
    }

    /// Declared aliases of one identifier
    pub fn aliases_of(&self, identifier: &str) -> Result<Vec<String>> {
        Ok(self.get(identifier)?.descriptor.aliases())
    }

    /// Get all commands
    pub fn list_all(&self) -> Vec<Arc<RegisteredCommand>> {
        self.commands.clone()
    }

    /// Check if an identifier is registered
    pub fn exists(&self, identifier: &str) -> bool {
        self.by_identifier
            .contains_key(&identifier.to_ascii_lowercase())
    }

    /// Get the number of registered commands
    pub fn count(&self) -> usize {
        self.commands.len()
    }
}

fn validate_module_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(CommandError::InvalidCommandName(
            "Module name cannot be empty".to_string(),
        ));
    }
    if name
        .split('.')
        .any(|segment| !is_valid_segment(segment))
    {
        return Err(CommandError::InvalidCommandName(format!(
            "Invalid module name: {}",
            name
        )));
    }
    Ok(())
}

fn validate_descriptor(identifier: &str, descriptor: &CommandDescriptor) -> Result<()> {
    if !is_valid_segment(descriptor.name()) {
        return Err(CommandError::InvalidCommandName(format!(
            "Invalid command name: {}",
            identifier
        )));
    }

    for alias in descriptor.aliases() {
        if alias.is_empty() || alias.chars().any(char::is_whitespace) {
            return Err(CommandError::InvalidCommandName(format!(
                "Invalid alias '{}' for {}",
                alias, identifier
            )));
        }
    }

    if descriptor.signatures().is_empty() {
        return Err(CommandError::InvalidSignature {
            command: identifier.to_string(),
            reason: "at least one signature is required".to_string(),
        });
    }

    for signature in descriptor
        .signatures()
        .iter()
        .chain(descriptor.compact_signatures())
    {
        signature.validate(identifier)?;
    }
    Ok(())
}

fn is_valid_segment(segment: &str) -> bool {
    !segment.is_empty()
        && !segment.contains('.')
        && !segment.contains('*')
        && !segment.chars().any(char::is_whitespace)
}
