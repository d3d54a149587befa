//! Command base: behavior groupings that own contracts and expose `run`.
//!
//! # Responsibility
//! - Declare a command's contracts through an explicit static table.
//! - Resolve those contracts by name through the injected catalog.
//! - Provide invocation helpers so `main` bodies stay domain-only.
//!
//! # Invariants
//! - Contracts are enumerated at catalog registration, before any lookup.
//! - A command only resolves contracts it declared itself.

use crate::capture::{CaptureBoard, CaptureSlot, CaptureToken};
use crate::catalog::CommandCatalog;
use crate::contract::{CommandEntry, CommandEvent, ContractTable};
use crate::error::{CommandResult, ConfigurationError};
use crate::invoke::Invoke;
use crate::plugin::CommandFanout;
use crate::value::{CallArgs, Value};
use log::{debug, info};
use std::sync::Arc;

/// Shared collaborators injected into every command constructor.
#[derive(Clone)]
pub struct CommandContext {
    catalog: Arc<CommandCatalog>,
    fanout: Arc<dyn CommandFanout>,
    board: CaptureBoard,
}

impl CommandContext {
    pub fn new(catalog: Arc<CommandCatalog>, fanout: Arc<dyn CommandFanout>) -> Self {
        Self {
            catalog,
            fanout,
            board: CaptureBoard::new(),
        }
    }

    /// Replaces the capture board, e.g. to share one across contexts.
    pub fn with_board(mut self, board: CaptureBoard) -> Self {
        self.board = board;
        self
    }

    pub fn catalog(&self) -> &CommandCatalog {
        &self.catalog
    }

    pub fn fanout(&self) -> &dyn CommandFanout {
        self.fanout.as_ref()
    }

    pub fn board(&self) -> &CaptureBoard {
        &self.board
    }

    pub fn entry(&self, command: &str, name: &str) -> CommandResult<&CommandEntry> {
        self.catalog.entry(command, name)
    }

    pub fn event(&self, command: &str, name: &str) -> CommandResult<&CommandEvent> {
        self.catalog.event(command, name)
    }
}

/// A named behavior grouping.
///
/// Implementors declare their contracts in [`Command::declare`] and define
/// what running means in [`Command::main`]. Callers go through
/// [`Command::run`].
pub trait Command: Send + Sync + 'static {
    /// Owner segment of every qualified name this command declares.
    const NAME: &'static str;

    type Input;
    type Output;

    /// Adds this command's own events and entries to `contracts`.
    fn declare(contracts: &mut ContractTable) -> Result<(), ConfigurationError>;

    fn context(&self) -> &CommandContext;

    fn main(&self, input: Self::Input) -> CommandResult<Self::Output>;

    fn run(&self, input: Self::Input) -> CommandResult<Self::Output> {
        info!("event=command_run module=command command={}", Self::NAME);
        self.main(input)
    }

    fn entry(&self, name: &str) -> CommandResult<&CommandEntry> {
        self.context().entry(Self::NAME, name)
    }

    fn event(&self, name: &str) -> CommandResult<&CommandEvent> {
        self.context().event(Self::NAME, name)
    }

    /// Invokes one of this command's entries and returns the merged value.
    fn invoke(&self, name: &str, args: CallArgs) -> CommandResult<Value> {
        let entry = self.entry(name)?;
        Invoke::new(entry, args).run(self.context().fanout())
    }

    /// Invokes one entry in capture mode on the context's board.
    fn invoke_capture(
        &self,
        name: &str,
        token: impl Into<CaptureToken>,
        args: CallArgs,
    ) -> CommandResult<CaptureSlot> {
        let context = self.context();
        let entry = self.entry(name)?;
        Invoke::new(entry, args)
            .capture(token)
            .dispatch(context.fanout(), context.board())
    }

    /// Emits one of this command's events; returns how many plugins answered.
    fn emit(&self, name: &str, args: CallArgs) -> CommandResult<usize> {
        let event = self.event(name)?;
        let answered = event.emit(self.context().fanout(), args)?;
        debug!(
            "event=command_emit module=command qualified_name={} answered={}",
            event.qualified_name(),
            answered
        );
        Ok(answered)
    }
}

/// A command that can revert its own effect.
///
/// No history is kept here; callers own any undo stack.
pub trait UndoCommand: Command {
    fn undo(&self) -> CommandResult<()>;
}

#[cfg(test)]
mod tests {
    use super::{Command, CommandContext, UndoCommand};
    use crate::catalog::CatalogBuilder;
    use crate::contract::{CommandEntry, CommandEvent, ContractTable};
    use crate::error::{CommandError, CommandResult, ConfigurationError};
    use crate::plugin::{PluginManifest, PluginRegistry};
    use crate::value::{CallArgs, Value, ValueType};
    use std::sync::atomic::{AtomicI64, Ordering};
    use std::sync::Arc;

    struct Counter {
        context: CommandContext,
        total: AtomicI64,
    }

    impl Command for Counter {
        const NAME: &'static str = "Counter";
        type Input = i64;
        type Output = i64;

        fn declare(contracts: &mut ContractTable) -> Result<(), ConfigurationError> {
            let mut step = CommandEntry::new("step", ValueType::Int).arg(ValueType::Int);
            step.set_default(|args| Ok(args.get(0).cloned()))?;
            contracts.add_entry(step)?;
            contracts.add_event(CommandEvent::new("changed").arg(ValueType::Int))
        }

        fn context(&self) -> &CommandContext {
            &self.context
        }

        fn main(&self, amount: i64) -> CommandResult<i64> {
            let step = self
                .invoke("step", CallArgs::new().arg(amount))?
                .as_int()
                .unwrap_or(amount);
            let total = self.total.fetch_add(step, Ordering::SeqCst) + step;
            self.emit("changed", CallArgs::new().arg(total))?;
            Ok(total)
        }
    }

    impl UndoCommand for Counter {
        fn undo(&self) -> CommandResult<()> {
            self.total.store(0, Ordering::SeqCst);
            Ok(())
        }
    }

    fn context(registry: PluginRegistry) -> CommandContext {
        let mut builder = CatalogBuilder::new();
        builder.register::<Counter>().expect("register Counter");
        CommandContext::new(builder.build(), Arc::new(registry))
    }

    #[test]
    fn run_resolves_own_contracts_and_composes_result() {
        let counter = Counter {
            context: context(PluginRegistry::new()),
            total: AtomicI64::new(0),
        };
        assert_eq!(counter.run(2).expect("first run"), 2);
        assert_eq!(counter.run(3).expect("second run"), 5);

        counter.undo().expect("undo");
        assert_eq!(counter.run(1).expect("after undo"), 1);
    }

    #[test]
    fn plugin_override_flows_through_invoke() {
        let mut registry = PluginRegistry::new();
        registry
            .register(PluginManifest::new("double", "1.0.0"))
            .expect("register plugin");
        registry
            .subscribe("double", "Counter.step", |args| {
                Ok(args.get(0).and_then(Value::as_int).map(|n| Value::from(n * 2)))
            })
            .expect("subscribe");
        let counter = Counter {
            context: context(registry),
            total: AtomicI64::new(0),
        };
        assert_eq!(counter.run(4).expect("run"), 8);
    }

    #[test]
    fn undeclared_names_are_unknown_contracts() {
        let counter = Counter {
            context: context(PluginRegistry::new()),
            total: AtomicI64::new(0),
        };
        let err = counter
            .invoke("missing", CallArgs::new())
            .expect_err("undeclared entry");
        assert_eq!(
            err,
            CommandError::UnknownContract("Counter.missing".to_string())
        );
        assert!(counter.event("step").is_err());
    }
}
