//! Chatterbox command dispatch
//!
//! This crate turns a raw chat line plus the speaker's identity into one validated,
//! permission-checked, typed invocation of a registered command, and renders the
//! result as human-readable lines or as a compact `;`/`|` delimited record.
//!
//! # Examples
//!
//! ```ignore
//! use std::sync::Arc;
//! use chatterbox_commands::{
//!     CommandDescriptor, CommandModule, CommandOutput, CommandRegistry, Dispatcher, Signature,
//! };
//! use chatterbox_permissions::{Caller, InMemoryPermissionStore, PermissionChecker};
//!
//! let fishing = CommandModule::new("Fishing").with_command(
//!     CommandDescriptor::new("Cast")
//!         .with_alias("cast")
//!         .with_signature(Signature::integer("count", |caller, count| {
//!             Ok(CommandOutput::text(format!("{} casts {} lines", caller.display_name, count)))
//!         })),
//! );
//!
//! let registry = Arc::new(CommandRegistry::from_modules([fishing])?);
//! let checker = PermissionChecker::new(Arc::new(InMemoryPermissionStore::new()));
//! let dispatcher = Dispatcher::new(registry, checker);
//!
//! let result = dispatcher
//!     .process_message("cast 3", &Caller::new("42", "Angler"), false)
//!     .await;
//! assert_eq!(result.responses, vec!["Angler casts 3 lines"]);
//! ```

pub mod binder;
pub mod builtin;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod events;
pub mod output;
pub mod registry;
pub mod template;
pub mod tokenizer;
pub mod types;

pub use binder::{ArgumentBinder, BindError, Binding};
pub use builtin::{access_module, core_module};
pub use config::{ConfigManager, DispatcherConfig, ReplyMessages};
pub use dispatcher::Dispatcher;
pub use error::{CommandError, Result};
pub use events::{DispatchEvent, SubscriptionId, Subscribers};
pub use output::{
    format_record, parse_records, CommandOutput, CompactCollection, CompactRender, OutputBody,
    RenderMode,
};
pub use registry::{CommandRegistry, RegisteredCommand};
pub use template::TemplateProcessor;
pub use tokenizer::{tokenize, TokenizedMessage};
pub use types::{
    ArgValue, BoundArgs, CommandContext, CommandDescriptor, CommandModule, Handler, HandlerFuture,
    Invocation, InvocationResult, Param, ParamKind, Signature,
};
