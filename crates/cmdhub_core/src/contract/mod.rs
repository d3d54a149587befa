//! Contract registry: typed extension points declared by commands.
//!
//! # Responsibility
//! - Declare events (fire-and-collect) and entries (typed result) with their
//!   call signatures.
//! - Validate calls before any plugin sees them.
//!
//! # Invariants
//! - A contract is immutable once added to a `ContractTable`.
//! - Events and entries live in disjoint namespaces per command.
//! - An entry owns at most one default handler.

pub mod entry;
pub mod event;
pub mod signature;
pub mod table;

use crate::error::{ConfigurationError, HandlerError};
use crate::value::{CallArgs, Value};
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;

pub use entry::CommandEntry;
pub use event::CommandEvent;
pub use signature::Signature;
pub use table::{ContractDescriptor, ContractKind, ContractTable};

/// Outcome of one handler. `Ok(None)` means "no value from this handler".
pub type HandlerResult = Result<Option<Value>, HandlerError>;

/// Shared handler callable used by defaults and plugins alike.
pub type Handler = Arc<dyn Fn(&CallArgs) -> HandlerResult + Send + Sync>;

/// Wraps a closure as a shareable [`Handler`].
pub fn handler<F>(f: F) -> Handler
where
    F: Fn(&CallArgs) -> HandlerResult + Send + Sync + 'static,
{
    Arc::new(f)
}

static CONTRACT_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid contract name regex"));

/// Returns true for identifiers usable as command or contract names.
pub fn is_valid_contract_name(value: &str) -> bool {
    CONTRACT_NAME_RE.is_match(value)
}

pub(crate) fn require_valid_name(value: &str) -> Result<(), ConfigurationError> {
    if is_valid_contract_name(value) {
        Ok(())
    } else {
        Err(ConfigurationError::InvalidName(value.to_string()))
    }
}

/// Fields shared by events and entries.
#[derive(Debug, Clone)]
pub(crate) struct ContractHeader {
    pub name: String,
    pub owner: &'static str,
    pub qualified_name: String,
    pub signature: Signature,
    pub description: String,
}

impl ContractHeader {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            qualified_name: name.clone(),
            name,
            owner: "",
            signature: Signature::default(),
            description: String::new(),
        }
    }

    pub fn bind(&mut self, owner: &'static str) {
        self.owner = owner;
        self.qualified_name = format!("{owner}.{}", self.name);
    }
}

#[cfg(test)]
mod tests {
    use super::is_valid_contract_name;

    #[test]
    fn accepts_identifier_names() {
        assert!(is_valid_contract_name("say"));
        assert!(is_valid_contract_name("_init2"));
        assert!(is_valid_contract_name("InitApplication"));
    }

    #[test]
    fn rejects_names_that_would_break_qualification() {
        assert!(!is_valid_contract_name(""));
        assert!(!is_valid_contract_name("Greet.say"));
        assert!(!is_valid_contract_name("2fast"));
        assert!(!is_valid_contract_name("say hi"));
    }
}
