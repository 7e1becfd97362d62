use thiserror::Error;

/// Errors that can occur in the commands system
#[derive(Error, Debug)]
pub enum CommandError {
    #[error("Command not found: {0}")]
    CommandNotFound(String),

    #[error("Command identifier already registered: {0}")]
    DuplicateIdentifier(String),

    #[error("Invalid command name: {0}")]
    InvalidCommandName(String),

    #[error("Invalid signature for {command}: {reason}")]
    InvalidSignature { command: String, reason: String },

    #[error("Argument mismatch: {0}")]
    ArgumentMismatch(String),

    #[error("Template parsing error: {0}")]
    TemplateError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Permission error: {0}")]
    Permission(#[from] chatterbox_permissions::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Regex error: {0}")]
    RegexError(#[from] regex::Error),
}

pub type Result<T> = std::result::Result<T, CommandError>;
