//! Command catalog: frozen contract tables and the process-wide directory.
//!
//! # Responsibility
//! - Enumerate each command's contracts exactly once, at registration.
//! - Expose read-only lookups and the `<Command>.<name>` directory.
//!
//! # Invariants
//! - A built catalog never mutates, so reads take no locks.
//! - Registering the same command type twice is a no-op.
//! - Qualified names are unique across the catalog.

use crate::command::Command;
use crate::contract::{
    require_valid_name, CommandEntry, CommandEvent, ContractDescriptor, ContractTable,
};
use crate::error::{CommandError, CommandResult, ConfigurationError};
use log::{debug, info};
use once_cell::sync::OnceCell;
use std::any::TypeId;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

static GLOBAL_CATALOG: OnceCell<Arc<CommandCatalog>> = OnceCell::new();

struct RegisteredCommand {
    type_id: TypeId,
    table: ContractTable,
}

/// Collects command declarations before freezing them into a catalog.
#[derive(Default)]
pub struct CatalogBuilder {
    commands: BTreeMap<&'static str, RegisteredCommand>,
}

impl CatalogBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enumerates `C`'s contracts.
    ///
    /// # Errors
    /// - `ConfigurationError::ConflictingCommand` when another type already
    ///   uses `C::NAME`.
    /// - Any declaration error returned by `C::declare`.
    pub fn register<C: Command>(&mut self) -> Result<&mut Self, ConfigurationError> {
        if let Some(existing) = self.commands.get(C::NAME) {
            if existing.type_id == TypeId::of::<C>() {
                return Ok(self);
            }
            return Err(ConfigurationError::ConflictingCommand(C::NAME));
        }
        require_valid_name(C::NAME)?;

        let mut table = ContractTable::new(C::NAME);
        C::declare(&mut table)?;
        debug!(
            "event=command_enumerate module=catalog command={} contracts={}",
            C::NAME,
            table.len()
        );
        self.commands.insert(
            C::NAME,
            RegisteredCommand {
                type_id: TypeId::of::<C>(),
                table,
            },
        );
        Ok(self)
    }

    pub fn build(self) -> Arc<CommandCatalog> {
        let known = self
            .commands
            .values()
            .flat_map(|command| command.table.qualified_names().map(str::to_string))
            .collect::<BTreeSet<_>>();
        info!(
            "event=catalog_build module=catalog commands={} contracts={}",
            self.commands.len(),
            known.len()
        );
        Arc::new(CommandCatalog {
            commands: self.commands,
            known,
        })
    }
}

/// Frozen set of command contract tables.
pub struct CommandCatalog {
    commands: BTreeMap<&'static str, RegisteredCommand>,
    known: BTreeSet<String>,
}

impl CommandCatalog {
    pub fn table(&self, command: &str) -> Option<&ContractTable> {
        self.commands.get(command).map(|registered| &registered.table)
    }

    /// Resolves one entry by command and declared name.
    pub fn entry(&self, command: &str, name: &str) -> CommandResult<&CommandEntry> {
        self.table(command)
            .and_then(|table| table.entry(name))
            .ok_or_else(|| CommandError::UnknownContract(format!("{command}.{name}")))
    }

    /// Resolves one event by command and declared name.
    pub fn event(&self, command: &str, name: &str) -> CommandResult<&CommandEvent> {
        self.table(command)
            .and_then(|table| table.event(name))
            .ok_or_else(|| CommandError::UnknownContract(format!("{command}.{name}")))
    }

    pub fn command_names(&self) -> Vec<&'static str> {
        self.commands.keys().copied().collect()
    }

    /// Every `<Command>.<name>` identifier, events and entries alike.
    pub fn list_known_commands(&self) -> BTreeSet<String> {
        self.known.clone()
    }

    pub fn is_known(&self, qualified_name: &str) -> bool {
        self.known.contains(qualified_name)
    }

    pub fn describe(&self) -> Vec<ContractDescriptor> {
        self.commands
            .values()
            .flat_map(|command| command.table.describe())
            .collect()
    }
}

/// Installs the process-wide catalog.
///
/// Installing the same catalog again is a no-op; a different one is rejected.
pub fn install_global(catalog: Arc<CommandCatalog>) -> Result<(), ConfigurationError> {
    let installed = GLOBAL_CATALOG.get_or_init(|| Arc::clone(&catalog));
    if Arc::ptr_eq(installed, &catalog) {
        Ok(())
    } else {
        Err(ConfigurationError::GlobalCatalogInstalled)
    }
}

pub fn global_catalog() -> Option<Arc<CommandCatalog>> {
    GLOBAL_CATALOG.get().cloned()
}

/// Directory of the installed catalog; empty before installation.
pub fn list_known_commands() -> BTreeSet<String> {
    GLOBAL_CATALOG
        .get()
        .map(|catalog| catalog.list_known_commands())
        .unwrap_or_default()
}
