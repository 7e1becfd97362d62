use std::{future::Future, sync::Arc};

use chatterbox_permissions::{Caller, PermissionChecker, RoleRequirement};
use futures::future::{BoxFuture, FutureExt};
use serde::{Deserialize, Serialize};

use crate::error::{CommandError, Result};
use crate::output::CommandOutput;
use crate::registry::CommandRegistry;

/// Declared type of an operation parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamKind {
    /// Token passed through unchanged
    Text,
    /// Base-10 signed integer covering the whole token
    Integer,
    /// Case-insensitive `true` / `false`
    Boolean,
    /// The invoking identity, injected positionally and never read from a token
    Caller,
}

impl ParamKind {
    /// Whether a parameter of this kind consumes a message token
    pub fn consumes_token(&self) -> bool {
        !matches!(self, ParamKind::Caller)
    }
}

impl std::fmt::Display for ParamKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParamKind::Text => write!(f, "text"),
            ParamKind::Integer => write!(f, "integer"),
            ParamKind::Boolean => write!(f, "boolean"),
            ParamKind::Caller => write!(f, "caller"),
        }
    }
}

/// A coerced argument value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgValue {
    Text(String),
    Integer(i64),
    Boolean(bool),
    Caller(Caller),
}

impl ArgValue {
    /// The parameter kind this value satisfies
    pub fn kind(&self) -> ParamKind {
        match self {
            ArgValue::Text(_) => ParamKind::Text,
            ArgValue::Integer(_) => ParamKind::Integer,
            ArgValue::Boolean(_) => ParamKind::Boolean,
            ArgValue::Caller(_) => ParamKind::Caller,
        }
    }
}

impl std::fmt::Display for ArgValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ArgValue::Text(s) => write!(f, "{}", s),
            ArgValue::Integer(i) => write!(f, "{}", i),
            ArgValue::Boolean(b) => write!(f, "{}", b),
            ArgValue::Caller(caller) => write!(f, "{}", caller.display_name),
        }
    }
}

impl From<&str> for ArgValue {
    fn from(value: &str) -> Self {
        ArgValue::Text(value.to_string())
    }
}

impl From<String> for ArgValue {
    fn from(value: String) -> Self {
        ArgValue::Text(value)
    }
}

impl From<i64> for ArgValue {
    fn from(value: i64) -> Self {
        ArgValue::Integer(value)
    }
}

impl From<bool> for ArgValue {
    fn from(value: bool) -> Self {
        ArgValue::Boolean(value)
    }
}

/// A typed parameter of an operation signature
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    /// Parameter name, used in usage lines and for lookup in [`BoundArgs`]
    pub name: String,
    pub kind: ParamKind,
    /// Value used when the token is omitted
    pub default: Option<ArgValue>,
}

impl Param {
    fn new(name: impl Into<String>, kind: ParamKind) -> Self {
        Self {
            name: name.into(),
            kind,
            default: None,
        }
    }

    pub fn text(name: impl Into<String>) -> Self {
        Self::new(name, ParamKind::Text)
    }

    pub fn integer(name: impl Into<String>) -> Self {
        Self::new(name, ParamKind::Integer)
    }

    pub fn boolean(name: impl Into<String>) -> Self {
        Self::new(name, ParamKind::Boolean)
    }

    /// The injected caller identity
    pub fn caller() -> Self {
        Self::new("caller", ParamKind::Caller)
    }

    /// Make the parameter optional
    pub fn with_default(mut self, default: impl Into<ArgValue>) -> Self {
        self.default = Some(default.into());
        self
    }

    /// Whether the parameter may be omitted
    pub fn is_optional(&self) -> bool {
        self.default.is_some()
    }
}

/// Arguments bound to a signature, in declaration order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BoundArgs {
    values: Vec<(String, ArgValue)>,
}

impl BoundArgs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: impl Into<String>, value: ArgValue) {
        self.values.push((name.into(), value));
    }

    pub fn get(&self, name: &str) -> Option<&ArgValue> {
        self.values
            .iter()
            .find(|(param, _)| param == name)
            .map(|(_, value)| value)
    }

    pub fn text(&self, name: &str) -> Result<&str> {
        match self.require(name)? {
            ArgValue::Text(value) => Ok(value),
            other => Err(mismatch(name, ParamKind::Text, other)),
        }
    }

    pub fn integer(&self, name: &str) -> Result<i64> {
        match self.require(name)? {
            ArgValue::Integer(value) => Ok(*value),
            other => Err(mismatch(name, ParamKind::Integer, other)),
        }
    }

    pub fn boolean(&self, name: &str) -> Result<bool> {
        match self.require(name)? {
            ArgValue::Boolean(value) => Ok(*value),
            other => Err(mismatch(name, ParamKind::Boolean, other)),
        }
    }

    pub fn caller(&self, name: &str) -> Result<&Caller> {
        match self.require(name)? {
            ArgValue::Caller(value) => Ok(value),
            other => Err(mismatch(name, ParamKind::Caller, other)),
        }
    }

    /// Values in declaration order
    pub fn values(&self) -> impl Iterator<Item = &ArgValue> {
        self.values.iter().map(|(_, value)| value)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    fn require(&self, name: &str) -> Result<&ArgValue> {
        self.get(name)
            .ok_or_else(|| CommandError::ArgumentMismatch(format!("no argument named '{}'", name)))
    }
}

fn mismatch(name: &str, expected: ParamKind, actual: &ArgValue) -> CommandError {
    CommandError::ArgumentMismatch(format!(
        "argument '{}' is {}, not {}",
        name,
        actual.kind(),
        expected
    ))
}

/// Shared services available to every operation
#[derive(Clone)]
pub struct CommandContext {
    pub registry: Arc<CommandRegistry>,
    pub checker: PermissionChecker,
}

/// Everything a bound operation receives
#[derive(Clone)]
pub struct Invocation {
    pub caller: Caller,
    pub args: BoundArgs,
    /// Fully-qualified identifier of the running command
    pub identifier: String,
    /// Whether the message arrived through a whisper
    pub private: bool,
    /// Whether compact output was requested
    pub compact: bool,
    pub context: CommandContext,
}

pub type HandlerFuture = BoxFuture<'static, anyhow::Result<CommandOutput>>;

/// Type-erased operation behind a signature
pub type Handler = Arc<dyn Fn(Invocation) -> HandlerFuture + Send + Sync>;

/// One invocable overload of a command
#[derive(Clone)]
pub struct Signature {
    params: Vec<Param>,
    handler: Handler,
}

impl Signature {
    /// Create a signature from an already type-erased handler
    pub fn new(params: Vec<Param>, handler: Handler) -> Self {
        Self { params, handler }
    }

    /// Synchronous operation
    pub fn from_fn<F>(params: Vec<Param>, f: F) -> Self
    where
        F: Fn(&Invocation) -> anyhow::Result<CommandOutput> + Send + Sync + 'static,
    {
        let f = Arc::new(f);
        let handler: Handler = Arc::new(move |invocation: Invocation| {
            let f = Arc::clone(&f);
            async move { f(&invocation) }.boxed()
        });
        Self::new(params, handler)
    }

    /// Asynchronous operation; the dispatcher awaits it before rendering
    pub fn from_async_fn<F, Fut>(params: Vec<Param>, f: F) -> Self
    where
        F: Fn(Invocation) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<CommandOutput>> + Send + 'static,
    {
        let f = Arc::new(f);
        let handler: Handler = Arc::new(move |invocation: Invocation| {
            let f = Arc::clone(&f);
            async move { f(invocation).await }.boxed()
        });
        Self::new(params, handler)
    }

    /// Operation taking no tokens
    pub fn nullary<F>(f: F) -> Self
    where
        F: Fn(&Caller) -> anyhow::Result<CommandOutput> + Send + Sync + 'static,
    {
        Self::from_fn(Vec::new(), move |invocation| f(&invocation.caller))
    }

    /// Operation taking one text token
    pub fn text<F>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&Caller, &str) -> anyhow::Result<CommandOutput> + Send + Sync + 'static,
    {
        let name = name.into();
        let params = vec![Param::text(name.clone())];
        Self::from_fn(params, move |invocation| {
            f(&invocation.caller, invocation.args.text(&name)?)
        })
    }

    /// Operation taking one integer token
    pub fn integer<F>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&Caller, i64) -> anyhow::Result<CommandOutput> + Send + Sync + 'static,
    {
        let name = name.into();
        let params = vec![Param::integer(name.clone())];
        Self::from_fn(params, move |invocation| {
            f(&invocation.caller, invocation.args.integer(&name)?)
        })
    }

    pub fn params(&self) -> &[Param] {
        &self.params
    }

    pub fn handler(&self) -> &Handler {
        &self.handler
    }

    /// Parameters that consume a message token
    pub fn token_params(&self) -> impl Iterator<Item = &Param> {
        self.params.iter().filter(|param| param.kind.consumes_token())
    }

    /// Accepted token count as `(required, maximum)`
    pub fn token_range(&self) -> (usize, usize) {
        let maximum = self.token_params().count();
        let required = self
            .token_params()
            .filter(|param| !param.is_optional())
            .count();
        (required, maximum)
    }

    /// Whether `count` tokens fit this signature
    pub fn accepts(&self, count: usize) -> bool {
        let (required, maximum) = self.token_range();
        (required..=maximum).contains(&count)
    }

    /// Usage line such as `fish <count:integer> [bait:text=worm]`
    pub fn usage(&self, word: &str) -> String {
        let mut usage = word.to_string();
        for param in self.token_params() {
            usage.push(' ');
            match &param.default {
                Some(default) => {
                    usage.push_str(&format!("[{}:{}={}]", param.name, param.kind, default))
                }
                None => usage.push_str(&format!("<{}:{}>", param.name, param.kind)),
            }
        }
        usage
    }

    /// Check the declaration rules enforced at registration
    pub fn validate(&self, command: &str) -> Result<()> {
        let invalid = |reason: String| CommandError::InvalidSignature {
            command: command.to_string(),
            reason,
        };

        let mut seen_optional = false;
        for (index, param) in self.params.iter().enumerate() {
            if param.name.trim().is_empty() {
                return Err(invalid(format!("parameter {} has no name", index)));
            }
            if self.params[..index]
                .iter()
                .any(|other| other.name.eq_ignore_ascii_case(&param.name))
            {
                return Err(invalid(format!("duplicate parameter '{}'", param.name)));
            }

            match (&param.default, param.kind) {
                (Some(_), ParamKind::Caller) => {
                    return Err(invalid("the caller parameter cannot have a default".to_string()))
                }
                (Some(default), kind) if default.kind() != kind => {
                    return Err(invalid(format!(
                        "default for '{}' is {}, expected {}",
                        param.name,
                        default.kind(),
                        kind
                    )))
                }
                (Some(_), _) => seen_optional = true,
                (None, ParamKind::Caller) => {}
                (None, _) if seen_optional => {
                    return Err(invalid(format!(
                        "required parameter '{}' follows an optional one",
                        param.name
                    )))
                }
                (None, _) => {}
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for Signature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signature")
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

/// A command as supplied by a module, before its identifier is composed
#[derive(Debug, Clone)]
pub struct CommandDescriptor {
    name: String,
    description: String,
    aliases: Vec<String>,
    whisper_only: bool,
    requirement: RoleRequirement,
    signatures: Vec<Signature>,
    compact_signatures: Vec<Signature>,
}

impl CommandDescriptor {
    /// Create a descriptor open to everyone, usable in public channels
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            aliases: Vec::new(),
            whisper_only: false,
            requirement: RoleRequirement::Everyone,
            signatures: Vec::new(),
            compact_signatures: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Add a word that invokes this command
    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    /// Restrict the command to private channels
    pub fn whisper_only(mut self, whisper_only: bool) -> Self {
        self.whisper_only = whisper_only;
        self
    }

    pub fn with_requirement(mut self, requirement: RoleRequirement) -> Self {
        self.requirement = requirement;
        self
    }

    /// Add a verbose overload
    pub fn with_signature(mut self, signature: Signature) -> Self {
        self.signatures.push(signature);
        self
    }

    /// Add an overload preferred when compact output is requested
    pub fn with_compact_signature(mut self, signature: Signature) -> Self {
        self.compact_signatures.push(signature);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Declared aliases, or the command name when none were declared
    pub fn aliases(&self) -> Vec<String> {
        if self.aliases.is_empty() {
            vec![self.name.clone()]
        } else {
            self.aliases.clone()
        }
    }

    pub fn is_whisper_only(&self) -> bool {
        self.whisper_only
    }

    pub fn requirement(&self) -> &RoleRequirement {
        &self.requirement
    }

    pub fn signatures(&self) -> &[Signature] {
        &self.signatures
    }

    pub fn compact_signatures(&self) -> &[Signature] {
        &self.compact_signatures
    }

    /// Overload sets to bind against, in the order they are tried
    ///
    /// In compact mode the compact overloads come first, followed by the verbose
    /// ones for token counts no compact overload accepts.
    pub fn overload_sets(&self, compact: bool) -> Vec<&[Signature]> {
        if compact && !self.compact_signatures.is_empty() {
            vec![&self.compact_signatures, &self.signatures]
        } else {
            vec![&self.signatures]
        }
    }
}

/// A named group of commands contributed at startup
#[derive(Debug, Clone)]
pub struct CommandModule {
    pub name: String,
    pub commands: Vec<CommandDescriptor>,
}

impl CommandModule {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            commands: Vec::new(),
        }
    }

    pub fn with_command(mut self, command: CommandDescriptor) -> Self {
        self.commands.push(command);
        self
    }
}

/// Outcome of processing one chat message
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InvocationResult {
    /// False when the message was not a command
    pub processed: bool,
    /// Lines addressed to the caller
    pub responses: Vec<String>,
    /// Channel-wide messages
    pub broadcasts: Vec<String>,
    /// Internal faults captured while running the operation
    pub errors: Vec<String>,
    /// Set when a whisper-only command was used in a public channel
    pub timeout_sender: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debug: Option<serde_json::Value>,
}

impl InvocationResult {
    /// Result for a message that is not a command
    pub fn unprocessed() -> Self {
        Self::default()
    }

    /// Processed result carrying a single response line
    pub fn reply(line: impl Into<String>) -> Self {
        Self {
            processed: true,
            responses: vec![line.into()],
            ..Self::default()
        }
    }
}
