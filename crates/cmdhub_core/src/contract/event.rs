//! Event contracts: notifications fanned out to every subscriber.

use crate::aggregator::HandlerAggregator;
use crate::contract::{ContractHeader, Signature};
use crate::error::CommandResult;
use crate::plugin::CommandFanout;
use crate::value::{CallArgs, ValueType};
use log::debug;

/// Declared event without a return value.
#[derive(Debug, Clone)]
pub struct CommandEvent {
    pub(crate) header: ContractHeader,
}

impl CommandEvent {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            header: ContractHeader::new(name),
        }
    }

    /// Appends one required positional argument type.
    pub fn arg(mut self, ty: ValueType) -> Self {
        self.header.signature.positional.push(ty);
        self
    }

    /// Declares one optional keyword argument type.
    pub fn kwarg(mut self, name: impl Into<String>, ty: ValueType) -> Self {
        self.header.signature.keyword.insert(name.into(), ty);
        self
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.header.description = description.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.header.name
    }

    /// Returns `"<Command>.<name>"`.
    pub fn qualified_name(&self) -> &str {
        &self.header.qualified_name
    }

    pub fn description(&self) -> &str {
        &self.header.description
    }

    pub fn signature(&self) -> &Signature {
        &self.header.signature
    }

    pub fn check_call(&self, args: &CallArgs) -> CommandResult<()> {
        self.header
            .signature
            .check_call(self.qualified_name(), args)?;
        Ok(())
    }

    /// Validates `args` and fans the event out to every subscriber.
    pub fn call(&self, fanout: &dyn CommandFanout, args: CallArgs) -> CommandResult<HandlerAggregator> {
        self.check_call(&args)?;
        debug!(
            "event=contract_call module=contract kind=event qualified_name={} positional={} keyword={}",
            self.qualified_name(),
            args.positional.len(),
            args.keyword.len()
        );
        Ok(fanout.call_command(self.qualified_name(), &args))
    }

    /// Emits the event and returns how many subscribers ran.
    pub fn emit(&self, fanout: &dyn CommandFanout, args: CallArgs) -> CommandResult<usize> {
        self.call(fanout, args)?.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::CommandEvent;
    use crate::error::CommandError;
    use crate::plugin::PluginRegistry;
    use crate::value::{CallArgs, ValueType};

    #[test]
    fn unbound_event_reports_plain_name() {
        let event = CommandEvent::new("init").describe("application started");
        assert_eq!(event.qualified_name(), "init");
        assert_eq!(event.description(), "application started");
    }

    #[test]
    fn call_rejects_bad_arguments_before_fanout() {
        let mut event = CommandEvent::new("opened").arg(ValueType::Int);
        event.header.bind("Viewer");
        let registry = PluginRegistry::new();

        let err = event
            .call(&registry, CallArgs::new().arg("x"))
            .expect_err("str is not int");
        assert!(matches!(err, CommandError::Signature(_)));
    }

    #[test]
    fn emit_without_subscribers_runs_nothing() {
        let mut event = CommandEvent::new("init");
        event.header.bind("InitApplication");
        let registry = PluginRegistry::new();

        let ran = event.emit(&registry, CallArgs::new()).expect("emit succeeds");
        assert_eq!(ran, 0);
    }
}
