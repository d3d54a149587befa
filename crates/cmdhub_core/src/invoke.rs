//! One-shot invocation builders over entries.

use crate::capture::{CaptureBoard, CaptureSlot, CaptureToken};
use crate::contract::CommandEntry;
use crate::error::CommandResult;
use crate::plugin::CommandFanout;
use crate::value::{CallArgs, Value};

/// Synchronous invocation: validate, fan out, merge.
///
/// ```
/// use cmdhub_core::{CallArgs, CommandEntry, ContractTable, Invoke, PluginRegistry, Value, ValueType};
///
/// let mut say = CommandEntry::new("say", ValueType::Str).arg(ValueType::Str);
/// say.set_default(|args| {
///     let name = args.get(0).and_then(Value::as_str).unwrap_or_default();
///     Ok(Some(Value::from(format!("hello {name}"))))
/// })
/// .unwrap();
/// let mut table = ContractTable::new("Greet");
/// table.add_entry(say).unwrap();
///
/// let registry = PluginRegistry::new();
/// let entry = table.entry("say").unwrap();
/// let merged = Invoke::new(entry, CallArgs::new().arg("ann")).run(&registry).unwrap();
/// assert_eq!(merged, Value::from("hello ann"));
/// ```
pub struct Invoke<'a> {
    entry: &'a CommandEntry,
    args: CallArgs,
}

impl<'a> Invoke<'a> {
    pub fn new(entry: &'a CommandEntry, args: CallArgs) -> Self {
        Self { entry, args }
    }

    /// Switches to capture mode with `token`.
    pub fn capture(self, token: impl Into<CaptureToken>) -> CaptureInvoke<'a> {
        CaptureInvoke {
            entry: self.entry,
            args: self.args,
            token: token.into(),
        }
    }

    pub fn run(self, fanout: &dyn CommandFanout) -> CommandResult<Value> {
        self.entry.call(fanout, self.args)?.merge()
    }
}

/// Capture invocation: reserve the token slot, fan out, feed the slot.
pub struct CaptureInvoke<'a> {
    entry: &'a CommandEntry,
    args: CallArgs,
    token: CaptureToken,
}

impl CaptureInvoke<'_> {
    pub fn token(&self) -> &CaptureToken {
        &self.token
    }

    /// Returns the owning slot; replies may keep arriving through `board`.
    ///
    /// The slot is reserved before the fan-out starts, so plugins may reply
    /// from other threads immediately. On error the slot is released.
    pub fn dispatch(
        self,
        fanout: &dyn CommandFanout,
        board: &CaptureBoard,
    ) -> CommandResult<CaptureSlot> {
        self.entry.check_call(&self.args)?;
        let slot = board.open(
            self.token.clone(),
            self.entry.qualified_name(),
            self.entry.return_type(),
        )?;
        self.entry
            .call_capture(fanout, self.token, self.args)?
            .dispatch(&slot)?;
        Ok(slot)
    }
}
