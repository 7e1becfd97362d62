use crate::error::{CommandError, Result};
use crate::template::TemplateProcessor;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Variables available to the permission denied message
pub const PERMISSION_DENIED_VARS: &[&str] = &["user", "command"];
/// Variables available to the whisper-only message
pub const WHISPER_ONLY_VARS: &[&str] = &["user", "command"];
/// Variables available to the syntax error message
pub const SYNTAX_ERROR_VARS: &[&str] = &["user", "command", "usage"];
/// Variables available to the type error message
pub const TYPE_ERROR_VARS: &[&str] = &["user", "command", "parameter", "expected", "value"];

/// Reply lines written by the dispatcher itself
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplyMessages {
    pub permission_denied: String,
    pub whisper_only: String,
    pub syntax_error: String,
    pub type_error: String,
}

impl Default for ReplyMessages {
    fn default() -> Self {
        Self {
            permission_denied: "{{user}}, you are not allowed to use {{command}}.".to_string(),
            whisper_only: "{{command}} can only be used in whispers.".to_string(),
            syntax_error: "Invalid syntax. Usage: {{usage}}".to_string(),
            type_error: "Invalid value '{{value}}' for {{parameter}}: expected {{expected}}."
                .to_string(),
        }
    }
}

/// Dispatcher configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatcherConfig {
    /// Reserved token selecting compact output
    pub compact_flag: String,
    /// Prefix required in front of the command word, empty for none
    pub command_prefix: String,
    /// Attach a debug payload to every result
    pub debug: bool,
    pub messages: ReplyMessages,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            compact_flag: "-c".to_string(),
            command_prefix: String::new(),
            debug: false,
            messages: ReplyMessages::default(),
        }
    }
}

impl DispatcherConfig {
    /// Check the configuration for values the dispatcher cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.compact_flag.is_empty() || self.compact_flag.chars().any(char::is_whitespace) {
            return Err(CommandError::ConfigError(format!(
                "compact_flag must be a single non-empty token, got '{}'",
                self.compact_flag
            )));
        }
        if self.command_prefix.chars().any(char::is_whitespace) {
            return Err(CommandError::ConfigError(
                "command_prefix cannot contain whitespace".to_string(),
            ));
        }

        let templates = [
            (&self.messages.permission_denied, PERMISSION_DENIED_VARS),
            (&self.messages.whisper_only, WHISPER_ONLY_VARS),
            (&self.messages.syntax_error, SYNTAX_ERROR_VARS),
            (&self.messages.type_error, TYPE_ERROR_VARS),
        ];
        for (template, allowed) in templates {
            TemplateProcessor::validate_variables(template, allowed)?;
        }
        Ok(())
    }
}

/// Dispatcher configuration manager
pub struct ConfigManager;

impl ConfigManager {
    /// Load configuration from a YAML file
    pub fn load_from_yaml<P: AsRef<Path>>(path: P) -> Result<DispatcherConfig> {
        let content = read(path.as_ref())?;
        let config: DispatcherConfig = serde_yaml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a JSON file
    pub fn load_from_json<P: AsRef<Path>>(path: P) -> Result<DispatcherConfig> {
        let content = read(path.as_ref())?;
        let config: DispatcherConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a file (auto-detect format)
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<DispatcherConfig> {
        let path = path.as_ref();
        match extension(path) {
            "yaml" | "yml" => Self::load_from_yaml(path),
            "json" => Self::load_from_json(path),
            _ => Err(unsupported()),
        }
    }

    /// Save configuration to a YAML file
    pub fn save_to_yaml<P: AsRef<Path>>(config: &DispatcherConfig, path: P) -> Result<()> {
        let content = serde_yaml::to_string(config)?;
        write(path.as_ref(), &content)
    }

    /// Save configuration to a JSON file
    pub fn save_to_json<P: AsRef<Path>>(config: &DispatcherConfig, path: P) -> Result<()> {
        let content = serde_json::to_string_pretty(config)?;
        write(path.as_ref(), &content)
    }

    /// Save configuration to a file (auto-detect format)
    pub fn save_to_file<P: AsRef<Path>>(config: &DispatcherConfig, path: P) -> Result<()> {
        let path = path.as_ref();
        match extension(path) {
            "yaml" | "yml" => Self::save_to_yaml(config, path),
            "json" => Self::save_to_json(config, path),
            _ => Err(unsupported()),
        }
    }
}

fn read(path: &Path) -> Result<String> {
    fs::read_to_string(path)
        .map_err(|e| CommandError::ConfigError(format!("Failed to read config file: {}", e)))
}

fn write(path: &Path, content: &str) -> Result<()> {
    fs::write(path, content)
        .map_err(|e| CommandError::ConfigError(format!("Failed to write config file: {}", e)))
}

fn extension(path: &Path) -> &str {
    path.extension().and_then(|ext| ext.to_str()).unwrap_or("")
}

fn unsupported() -> CommandError {
    CommandError::ConfigError("Unsupported file format. Use .yaml, .yml, or .json".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn custom_config() -> DispatcherConfig {
        DispatcherConfig {
            compact_flag: "--compact".to_string(),
            command_prefix: "!".to_string(),
            debug: true,
            messages: ReplyMessages {
                permission_denied: "Nope, {{user}}.".to_string(),
                ..ReplyMessages::default()
            },
        }
    }

    #[test]
    fn test_defaults() {
        let config = DispatcherConfig::default();
        assert_eq!(config.compact_flag, "-c");
        assert_eq!(config.command_prefix, "");
        assert!(!config.debug);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_save_and_load_yaml() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("dispatcher.yaml");

        ConfigManager::save_to_yaml(&custom_config(), &path).unwrap();
        let loaded = ConfigManager::load_from_yaml(&path).unwrap();
        assert_eq!(loaded, custom_config());
    }

    #[test]
    fn test_save_and_load_json() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("dispatcher.json");

        ConfigManager::save_to_json(&custom_config(), &path).unwrap();
        let loaded = ConfigManager::load_from_json(&path).unwrap();
        assert_eq!(loaded, custom_config());
    }

    #[test]
    fn test_auto_detect_format() {
        let dir = TempDir::new().unwrap();
        for name in ["dispatcher.yml", "dispatcher.json"] {
            let path = dir.path().join(name);
            ConfigManager::save_to_file(&custom_config(), &path).unwrap();
            assert_eq!(ConfigManager::load_from_file(&path).unwrap(), custom_config());
        }
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("dispatcher.yaml");
        fs::write(&path, "command_prefix: \"!\"\nmessages:\n  syntax_error: \"Try {{usage}}\"\n")
            .unwrap();

        let loaded = ConfigManager::load_from_file(&path).unwrap();
        assert_eq!(loaded.command_prefix, "!");
        assert_eq!(loaded.compact_flag, "-c");
        assert_eq!(loaded.messages.syntax_error, "Try {{usage}}");
        assert_eq!(
            loaded.messages.type_error,
            ReplyMessages::default().type_error
        );
    }

    #[test]
    fn test_unsupported_format() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("dispatcher.txt");
        assert!(ConfigManager::save_to_file(&custom_config(), &path).is_err());
        assert!(ConfigManager::load_from_file(&path).is_err());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = DispatcherConfig::default();
        config.compact_flag = String::new();
        assert!(config.validate().is_err());

        let mut config = DispatcherConfig::default();
        config.command_prefix = "! ".to_string();
        assert!(config.validate().is_err());

        let mut config = DispatcherConfig::default();
        config.messages.permission_denied = "{{usage}}".to_string();
        assert!(config.validate().is_err());
    }
}
