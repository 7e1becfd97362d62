//! Message processing: lookup, permission, visibility, binding, execution and rendering

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use chatterbox_permissions::{Caller, PermissionChecker, PermissionDecision};
use chrono::Utc;
use dashmap::DashMap;
use futures::FutureExt;
use serde_json::json;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::binder::{ArgumentBinder, BindError};
use crate::config::DispatcherConfig;
use crate::events::{panic_message, DispatchEvent, Subscribers};
use crate::output::{CommandOutput, RenderMode};
use crate::registry::{CommandRegistry, RegisteredCommand};
use crate::template::TemplateProcessor;
use crate::tokenizer::TokenizedMessage;
use crate::types::{BoundArgs, CommandContext, Invocation, InvocationResult, Signature};

/// Why a candidate command was not invoked
enum Rejection {
    Denied,
    WhisperOnly,
    Bind(BindError),
}

/// Single entry point turning chat messages into command invocations
///
/// Messages from the same caller are processed one at a time: a second message
/// waits until the first one's operation has completed. Messages from different
/// callers run independently.
pub struct Dispatcher {
    registry: Arc<CommandRegistry>,
    checker: PermissionChecker,
    config: DispatcherConfig,
    events: Subscribers<DispatchEvent>,
    pending: DashMap<String, Arc<Mutex<()>>>,
}

impl Dispatcher {
    /// Create a dispatcher with the default configuration
    pub fn new(registry: Arc<CommandRegistry>, checker: PermissionChecker) -> Self {
        Self {
            registry,
            checker,
            config: DispatcherConfig::default(),
            events: Subscribers::new(),
            pending: DashMap::new(),
        }
    }

    pub fn with_config(mut self, config: DispatcherConfig) -> Self {
        self.config = config;
        self
    }

    pub fn registry(&self) -> &Arc<CommandRegistry> {
        &self.registry
    }

    pub fn checker(&self) -> &PermissionChecker {
        &self.checker
    }

    pub fn config(&self) -> &DispatcherConfig {
        &self.config
    }

    /// Callbacks notified after every executed invocation
    pub fn events(&self) -> &Subscribers<DispatchEvent> {
        &self.events
    }

    /// Number of callers with a message currently in flight or waiting
    pub fn pending_callers(&self) -> usize {
        self.pending.len()
    }

    /// Process one chat message
    ///
    /// Never fails: every outcome, including operation faults, is reported
    /// through the returned [`InvocationResult`].
    pub async fn process_message(
        &self,
        raw: &str,
        caller: &Caller,
        private: bool,
    ) -> InvocationResult {
        let message = TokenizedMessage::parse(raw);
        debug!(caller = %caller.id, private, word = %message.command, "Message received");

        let Some(word) = self.command_word(&message.command) else {
            return InvocationResult::unprocessed();
        };

        let candidates = self.registry.resolve(word);
        if candidates.is_empty() {
            debug!(word = %word, "No command matches word");
            return InvocationResult::unprocessed();
        }

        let lock = self.identity_lock(&caller.id);
        let result = {
            let _guard = lock.lock().await;
            self.dispatch(word, message.arguments, &candidates, caller, private)
                .await
        };
        drop(lock);
        self.release_identity_lock(&caller.id);
        result
    }

    fn command_word<'a>(&self, word: &'a str) -> Option<&'a str> {
        let word = if self.config.command_prefix.is_empty() {
            word
        } else {
            word.strip_prefix(self.config.command_prefix.as_str())?
        };
        (!word.is_empty()).then_some(word)
    }

    async fn dispatch(
        &self,
        word: &str,
        mut arguments: Vec<String>,
        candidates: &[Arc<RegisteredCommand>],
        caller: &Caller,
        private: bool,
    ) -> InvocationResult {
        let flag = self.config.compact_flag.as_str();
        let compact = arguments.iter().any(|token| token == flag);
        arguments.retain(|token| token != flag);

        let mut store_errors = Vec::new();
        let mut reported: Option<(&Arc<RegisteredCommand>, Rejection)> = None;

        for command in candidates {
            let descriptor = command.descriptor();
            let identifier = command.identifier();

            let decision = self
                .checker
                .check(caller, identifier, Some(descriptor.requirement()))
                .unwrap_or_else(|e| {
                    error!(identifier = %identifier, error = %e, "Permission lookup failed");
                    store_errors.push(format!("{}: {}", identifier, e));
                    PermissionDecision::Denied
                });

            if !decision.is_allowed() {
                info!(caller = %caller.id, identifier = %identifier, "Permission denied");
                if reported.is_none() {
                    reported = Some((command, Rejection::Denied));
                }
                continue;
            }

            let rejection = if descriptor.is_whisper_only() && !private {
                info!(caller = %caller.id, identifier = %identifier, "Whisper-only command used publicly");
                Rejection::WhisperOnly
            } else {
                match ArgumentBinder::bind_descriptor(descriptor, &arguments, caller, compact) {
                    Ok(binding) => {
                        let mut result = self
                            .execute(word, command, binding.signature, binding.args, caller, private, compact)
                            .await;
                        store_errors.append(&mut result.errors);
                        result.errors = store_errors;
                        return result;
                    }
                    Err(e) => {
                        debug!(identifier = %identifier, error = %e, "Binding failed");
                        Rejection::Bind(e)
                    }
                }
            };

            // The first candidate that passed its permission check owns the reported failure
            if matches!(reported, None | Some((_, Rejection::Denied))) {
                reported = Some((command, rejection));
            }
        }

        let mut result = match reported {
            Some((command, rejection)) => self.reject(word, command, rejection, caller, compact),
            None => InvocationResult::unprocessed(),
        };
        result.errors.extend(store_errors);
        result
    }

    #[allow(clippy::too_many_arguments)]
    async fn execute(
        &self,
        word: &str,
        command: &RegisteredCommand,
        signature: &Signature,
        args: BoundArgs,
        caller: &Caller,
        private: bool,
        compact: bool,
    ) -> InvocationResult {
        let identifier = command.identifier().to_string();
        let arguments: Vec<String> = args.values().map(ToString::to_string).collect();
        let invocation = Invocation {
            caller: caller.clone(),
            args,
            identifier: identifier.clone(),
            private,
            compact,
            context: CommandContext {
                registry: Arc::clone(&self.registry),
                checker: self.checker.clone(),
            },
        };

        debug!(identifier = %identifier, caller = %caller.id, compact, "Invoking command");
        let started = Instant::now();
        let handler = Arc::clone(signature.handler());
        let outcome: Result<CommandOutput, String> =
            match std::panic::catch_unwind(AssertUnwindSafe(|| handler(invocation))) {
                Ok(future) => match AssertUnwindSafe(future).catch_unwind().await {
                    Ok(Ok(output)) => Ok(output),
                    Ok(Err(e)) => Err(format!("{:#}", e)),
                    Err(panic) => Err(panic_message(panic)),
                },
                Err(panic) => Err(panic_message(panic)),
            };
        let elapsed_ms = started.elapsed().as_millis() as u64;

        let mut result = InvocationResult {
            processed: true,
            ..InvocationResult::default()
        };
        match &outcome {
            Ok(output) => {
                let mode = if compact {
                    RenderMode::Compact
                } else {
                    RenderMode::Verbose
                };
                result.responses = output.render(mode);
                result.broadcasts = output.broadcasts.clone();
                debug!(identifier = %identifier, elapsed_ms, lines = result.responses.len(), "Command completed");
            }
            Err(fault) => {
                error!(identifier = %identifier, error = %fault, "Command failed");
                result.errors.push(format!("{}: {}", identifier, fault));
            }
        }

        if self.config.debug {
            result.debug = Some(json!({
                "identifier": identifier,
                "signature": signature.usage(word),
                "compact": compact,
                "arguments": arguments,
                "elapsed_ms": elapsed_ms,
            }));
        }

        let panicked = self.events.publish(&DispatchEvent {
            invocation_id: Uuid::new_v4(),
            identifier,
            caller_id: caller.id.clone(),
            compact,
            succeeded: outcome.is_ok(),
            elapsed_ms,
            at: Utc::now(),
        });
        if panicked > 0 {
            result.errors.push(format!(
                "{}: {} dispatch subscriber(s) panicked",
                command.identifier(),
                panicked
            ));
        }

        result
    }

    fn reject(
        &self,
        word: &str,
        command: &RegisteredCommand,
        rejection: Rejection,
        caller: &Caller,
        compact: bool,
    ) -> InvocationResult {
        let messages = &self.config.messages;
        let mut vars = vec![
            ("user", caller.display_name.clone()),
            ("command", command.identifier().to_string()),
        ];

        let mut result = match rejection {
            Rejection::Denied => {
                InvocationResult::reply(render(&messages.permission_denied, &vars))
            }
            Rejection::WhisperOnly => InvocationResult {
                timeout_sender: true,
                ..InvocationResult::reply(render(&messages.whisper_only, &vars))
            },
            Rejection::Bind(BindError::Syntax { .. }) => {
                let mut usages: Vec<String> = Vec::new();
                for signatures in command.descriptor().overload_sets(compact) {
                    for usage in signatures.iter().map(|signature| signature.usage(word)) {
                        if !usages.contains(&usage) {
                            usages.push(usage);
                        }
                    }
                }
                let usage = usages.join(" or ");
                vars.push(("usage", usage));
                InvocationResult::reply(render(&messages.syntax_error, &vars))
            }
            Rejection::Bind(BindError::Type {
                parameter,
                expected,
                value,
            }) => {
                vars.push(("parameter", parameter));
                vars.push(("expected", expected.to_string()));
                vars.push(("value", value));
                InvocationResult::reply(render(&messages.type_error, &vars))
            }
        };

        if self.config.debug {
            result.debug = Some(json!({
                "identifier": command.identifier(),
                "compact": compact,
                "invoked": false,
            }));
        }
        result
    }

    fn identity_lock(&self, identity: &str) -> Arc<Mutex<()>> {
        Arc::clone(self.pending.entry(identity.to_string()).or_default().value())
    }

    fn release_identity_lock(&self, identity: &str) {
        self.pending
            .remove_if(identity, |_, lock| Arc::strong_count(lock) == 1);
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("commands", &self.registry.count())
            .field("config", &self.config)
            .field("pending", &self.pending.len())
            .finish()
    }
}

fn render(template: &str, vars: &[(&str, String)]) -> String {
    let variables: HashMap<String, String> = vars
        .iter()
        .map(|(name, value)| (name.to_string(), value.clone()))
        .collect();
    TemplateProcessor::process(template, &variables).unwrap_or_else(|e| {
        warn!(error = %e, "Reply template could not be filled");
        template.to_string()
    })
}
