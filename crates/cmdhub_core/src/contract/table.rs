//! Per-command contract table and its documentation descriptors.

use crate::contract::{require_valid_name, CommandEntry, CommandEvent, Signature};
use crate::error::ConfigurationError;
use serde::Serialize;
use std::collections::BTreeMap;

/// Contract flavor shown in descriptors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ContractKind {
    Event,
    Entry,
}

/// Serializable summary of one contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContractDescriptor {
    pub kind: ContractKind,
    pub qualified_name: String,
    pub positional: Vec<String>,
    pub keyword: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub return_type: Option<String>,
    pub description: String,
}

impl ContractDescriptor {
    fn new(
        kind: ContractKind,
        qualified_name: &str,
        signature: &Signature,
        return_type: Option<String>,
        description: &str,
    ) -> Self {
        Self {
            kind,
            qualified_name: qualified_name.to_string(),
            positional: signature.positional.iter().map(ToString::to_string).collect(),
            keyword: signature
                .keyword
                .iter()
                .map(|(name, ty)| (name.clone(), ty.to_string()))
                .collect(),
            return_type,
            description: description.to_string(),
        }
    }
}

/// Mapping from declared name to contract for one command.
///
/// Events and entries are stored apart but share one name space: a short
/// name is used by at most one event or entry.
#[derive(Debug, Clone)]
pub struct ContractTable {
    command: &'static str,
    events: BTreeMap<String, CommandEvent>,
    entries: BTreeMap<String, CommandEntry>,
}

impl ContractTable {
    pub fn new(command: &'static str) -> Self {
        Self {
            command,
            events: BTreeMap::new(),
            entries: BTreeMap::new(),
        }
    }

    pub fn command(&self) -> &'static str {
        self.command
    }

    /// Adds an event and binds its qualified name to this command.
    pub fn add_event(&mut self, mut event: CommandEvent) -> Result<(), ConfigurationError> {
        self.require_free_name(event.name())?;
        event.header.bind(self.command);
        self.events.insert(event.name().to_string(), event);
        Ok(())
    }

    /// Adds an entry and binds its qualified name to this command.
    pub fn add_entry(&mut self, mut entry: CommandEntry) -> Result<(), ConfigurationError> {
        self.require_free_name(entry.name())?;
        entry.header.bind(self.command);
        self.entries.insert(entry.name().to_string(), entry);
        Ok(())
    }

    // Both namespaces feed one qualified-name space, so a name may be used once.
    fn require_free_name(&self, name: &str) -> Result<(), ConfigurationError> {
        require_valid_name(name)?;
        if self.events.contains_key(name) || self.entries.contains_key(name) {
            return Err(ConfigurationError::DuplicateContract {
                command: self.command,
                name: name.to_string(),
            });
        }
        Ok(())
    }

    pub fn event(&self, name: &str) -> Option<&CommandEvent> {
        self.events.get(name)
    }

    pub fn entry(&self, name: &str) -> Option<&CommandEntry> {
        self.entries.get(name)
    }

    pub fn events(&self) -> impl Iterator<Item = &CommandEvent> {
        self.events.values()
    }

    pub fn entries(&self) -> impl Iterator<Item = &CommandEntry> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.events.len() + self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty() && self.entries.is_empty()
    }

    /// Qualified names of every event and entry.
    pub fn qualified_names(&self) -> impl Iterator<Item = &str> {
        self.events
            .values()
            .map(CommandEvent::qualified_name)
            .chain(self.entries.values().map(CommandEntry::qualified_name))
    }

    pub fn describe(&self) -> Vec<ContractDescriptor> {
        let events = self.events.values().map(|event| {
            ContractDescriptor::new(
                ContractKind::Event,
                event.qualified_name(),
                event.signature(),
                None,
                event.description(),
            )
        });
        let entries = self.entries.values().map(|entry| {
            ContractDescriptor::new(
                ContractKind::Entry,
                entry.qualified_name(),
                entry.signature(),
                Some(entry.return_type().to_string()),
                entry.description(),
            )
        });
        events.chain(entries).collect()
    }
}
