use crate::error::{CommandError, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\{\{([a-zA-Z_][a-zA-Z0-9_]*)(?::([^}]*))?\}\}")
        .expect("placeholder pattern is a valid regex")
});

/// Template processor for reply messages
pub struct TemplateProcessor;

impl TemplateProcessor {
    /// Process a template string with variable substitution
    ///
    /// Supports the following placeholder formats:
    /// - {{variable}} - simple substitution
    /// - {{variable:default}} - substitution with default value
    pub fn process(template: &str, variables: &HashMap<String, String>) -> Result<String> {
        let mut result = String::with_capacity(template.len());
        let mut last = 0;

        for cap in PLACEHOLDER.captures_iter(template) {
            let (Some(full), Some(name)) = (cap.get(0), cap.get(1)) else {
                continue;
            };
            let value = variables
                .get(name.as_str())
                .map(String::as_str)
                .or_else(|| cap.get(2).map(|default| default.as_str()))
                .ok_or_else(|| {
                    CommandError::TemplateError(format!("Missing variable: {}", name.as_str()))
                })?;

            result.push_str(&template[last..full.start()]);
            result.push_str(value);
            last = full.end();
        }

        result.push_str(&template[last..]);
        Ok(result)
    }

    /// Extract all variable names from a template
    pub fn extract_variables(template: &str) -> Vec<String> {
        let mut variables = Vec::new();
        for cap in PLACEHOLDER.captures_iter(template) {
            if let Some(name) = cap.get(1) {
                let name = name.as_str().to_string();
                if !variables.contains(&name) {
                    variables.push(name);
                }
            }
        }
        variables
    }

    /// Check that every placeholder without a default is restricted to `allowed`
    pub fn validate_variables(template: &str, allowed: &[&str]) -> Result<()> {
        for cap in PLACEHOLDER.captures_iter(template) {
            let Some(name) = cap.get(1) else { continue };
            if cap.get(2).is_none() && !allowed.contains(&name.as_str()) {
                return Err(CommandError::TemplateError(format!(
                    "Unknown variable: {}",
                    name.as_str()
                )));
            }
        }
        Ok(())
    }
}
