//! Dispatch error taxonomy.
//!
//! # Responsibility
//! - Separate declaration-time failures (`ConfigurationError`) from call-time
//!   failures (`SignatureError`, `TypeContractError`, handler failures).
//! - Carry qualified command names so every failure is attributable.
//!
//! # Invariants
//! - Nothing in this crate retries on any of these errors.
//! - Plugin failures are surfaced, never masked.

use crate::capture::CaptureError;
use crate::value::ValueType;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type CommandResult<T> = Result<T, CommandError>;

/// Declaration-time contract errors. Fatal at registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    InvalidName(String),
    DuplicateDefaultHandler(String),
    DuplicateContract { command: &'static str, name: String },
    ConflictingCommand(&'static str),
    GlobalCatalogInstalled,
}

impl Display for ConfigurationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidName(value) => write!(f, "contract or command name is invalid: {value}"),
            Self::DuplicateDefaultHandler(name) => {
                write!(f, "command '{name}' has already been assigned a default handler")
            }
            Self::DuplicateContract { command, name } => {
                write!(f, "contract already declared on {command}: {name}")
            }
            Self::ConflictingCommand(name) => {
                write!(f, "another command type is already registered as {name}")
            }
            Self::GlobalCatalogInstalled => {
                write!(f, "a different global command catalog is already installed")
            }
        }
    }
}

impl Error for ConfigurationError {}

/// Caller arguments do not match a contract signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureError {
    pub qualified_name: String,
    pub supplied: String,
    pub expected: String,
}

impl Display for SignatureError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "wrong types were used for command '{}'. types used {}, types expected {}",
            self.qualified_name, self.supplied, self.expected
        )
    }
}

impl Error for SignatureError {}

/// A produced value violates an entry's declared return type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeContractError {
    pub qualified_name: String,
    pub produced: ValueType,
    pub expected: ValueType,
}

impl Display for TypeContractError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "command '{}' produced a value of type {}, expected {}",
            self.qualified_name, self.produced, self.expected
        )
    }
}

impl Error for TypeContractError {}

/// Failure raised inside one handler (plugin or default).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerError {
    pub message: String,
}

impl HandlerError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl Display for HandlerError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl Error for HandlerError {}

/// Handler failure attributed to its source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerFailure {
    pub qualified_name: String,
    /// Plugin id, or `None` for a default handler.
    pub plugin_id: Option<String>,
    pub error: HandlerError,
}

impl Display for HandlerFailure {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.plugin_id {
            Some(plugin_id) => write!(
                f,
                "plugin '{plugin_id}' failed while handling '{}': {}",
                self.qualified_name, self.error
            ),
            None => write!(
                f,
                "default handler failed while handling '{}': {}",
                self.qualified_name, self.error
            ),
        }
    }
}

impl Error for HandlerFailure {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(&self.error)
    }
}

/// Umbrella error for command invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    Configuration(ConfigurationError),
    Signature(SignatureError),
    TypeContract(TypeContractError),
    Handler(HandlerFailure),
    Capture(CaptureError),
    UnknownContract(String),
    NoResult(String),
}

impl Display for CommandError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Configuration(err) => write!(f, "{err}"),
            Self::Signature(err) => write!(f, "{err}"),
            Self::TypeContract(err) => write!(f, "{err}"),
            Self::Handler(err) => write!(f, "{err}"),
            Self::Capture(err) => write!(f, "{err}"),
            Self::UnknownContract(name) => write!(f, "unknown command contract: {name}"),
            Self::NoResult(name) => write!(f, "no handler produced a value for '{name}'"),
        }
    }
}

impl Error for CommandError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Configuration(err) => Some(err),
            Self::Signature(err) => Some(err),
            Self::TypeContract(err) => Some(err),
            Self::Handler(err) => Some(err),
            Self::Capture(err) => Some(err),
            Self::UnknownContract(_) | Self::NoResult(_) => None,
        }
    }
}

impl From<ConfigurationError> for CommandError {
    fn from(value: ConfigurationError) -> Self {
        Self::Configuration(value)
    }
}

impl From<SignatureError> for CommandError {
    fn from(value: SignatureError) -> Self {
        Self::Signature(value)
    }
}

impl From<TypeContractError> for CommandError {
    fn from(value: TypeContractError) -> Self {
        Self::TypeContract(value)
    }
}

impl From<HandlerFailure> for CommandError {
    fn from(value: HandlerFailure) -> Self {
        Self::Handler(value)
    }
}

impl From<CaptureError> for CommandError {
    fn from(value: CaptureError) -> Self {
        Self::Capture(value)
    }
}
