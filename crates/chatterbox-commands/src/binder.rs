//! Matching of argument tokens against operation signatures

use chatterbox_permissions::Caller;
use thiserror::Error;

use crate::types::{ArgValue, BoundArgs, CommandDescriptor, ParamKind, Signature};

/// Why tokens could not be bound to any signature
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BindError {
    /// The token count fits no overload
    #[error("no overload accepts {supplied} argument(s)")]
    Syntax { supplied: usize },

    /// A token could not be coerced to its parameter's type
    #[error("invalid value '{value}' for {parameter}: expected {expected}")]
    Type {
        parameter: String,
        expected: ParamKind,
        value: String,
    },
}

/// A successfully bound overload
#[derive(Debug)]
pub struct Binding<'a> {
    /// Position of the overload within its overload set
    pub index: usize,
    pub signature: &'a Signature,
    pub args: BoundArgs,
}

/// Binds tokens to one of several candidate signatures
pub struct ArgumentBinder;

impl ArgumentBinder {
    /// Select and bind an overload
    ///
    /// Overloads whose token range fits are tried in declaration order and the first
    /// one that coerces completely wins. When some fit but none coerces, the type
    /// error of the first fitting overload is returned.
    pub fn bind<'a>(
        signatures: &'a [Signature],
        tokens: &[String],
        caller: &Caller,
    ) -> Result<Binding<'a>, BindError> {
        let mut first_type_error = None;

        for (index, signature) in signatures.iter().enumerate() {
            if !signature.accepts(tokens.len()) {
                continue;
            }
            match Self::bind_signature(signature, tokens, caller) {
                Ok(args) => {
                    return Ok(Binding {
                        index,
                        signature,
                        args,
                    })
                }
                Err(error) => {
                    first_type_error.get_or_insert(error);
                }
            }
        }

        Err(first_type_error.unwrap_or(BindError::Syntax {
            supplied: tokens.len(),
        }))
    }

    /// Bind against a descriptor's overload sets in order
    ///
    /// A later set is only consulted when no overload of the earlier sets accepts
    /// the token count; a type error ends the search.
    pub fn bind_descriptor<'a>(
        descriptor: &'a CommandDescriptor,
        tokens: &[String],
        caller: &Caller,
        compact: bool,
    ) -> Result<Binding<'a>, BindError> {
        let mut last = BindError::Syntax {
            supplied: tokens.len(),
        };
        for signatures in descriptor.overload_sets(compact) {
            match Self::bind(signatures, tokens, caller) {
                Ok(binding) => return Ok(binding),
                Err(error @ BindError::Type { .. }) => return Err(error),
                Err(error) => last = error,
            }
        }
        Err(last)
    }

    /// Bind tokens to one signature
    pub fn bind_signature(
        signature: &Signature,
        tokens: &[String],
        caller: &Caller,
    ) -> Result<BoundArgs, BindError> {
        if !signature.accepts(tokens.len()) {
            return Err(BindError::Syntax {
                supplied: tokens.len(),
            });
        }

        let mut args = BoundArgs::new();
        let mut remaining = tokens.iter();

        for param in signature.params() {
            if param.kind == ParamKind::Caller {
                args.push(&param.name, ArgValue::Caller(caller.clone()));
                continue;
            }

            let value = match (remaining.next(), &param.default) {
                (Some(token), _) => Self::coerce(param.kind, token).ok_or_else(|| {
                    BindError::Type {
                        parameter: param.name.clone(),
                        expected: param.kind,
                        value: token.clone(),
                    }
                })?,
                (None, Some(default)) => default.clone(),
                (None, None) => {
                    return Err(BindError::Syntax {
                        supplied: tokens.len(),
                    })
                }
            };
            args.push(&param.name, value);
        }

        Ok(args)
    }

    /// Coerce one token to a parameter kind
    ///
    /// Returns `None` when the token does not represent a value of that kind. The
    /// caller kind never comes from a token.
    pub fn coerce(kind: ParamKind, token: &str) -> Option<ArgValue> {
        match kind {
            ParamKind::Text => Some(ArgValue::Text(token.to_string())),
            ParamKind::Integer => token.parse::<i64>().ok().map(ArgValue::Integer),
            ParamKind::Boolean => {
                if token.eq_ignore_ascii_case("true") {
                    Some(ArgValue::Boolean(true))
                } else if token.eq_ignore_ascii_case("false") {
                    Some(ArgValue::Boolean(false))
                } else {
                    None
                }
            }
            ParamKind::Caller => None,
        }
    }
}
