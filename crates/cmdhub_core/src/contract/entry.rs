//! Entry contracts: typed extension points with default handlers.

use crate::aggregator::HandlerAggregator;
use crate::capture::CaptureToken;
use crate::contract::{ContractHeader, Handler, HandlerResult, Signature};
use crate::error::{CommandResult, ConfigurationError};
use crate::plugin::CommandFanout;
use crate::value::{CallArgs, ValueType};
use log::debug;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;

/// Declared entry with a return type, an optional default handler and any
/// number of default capture handlers.
#[derive(Clone)]
pub struct CommandEntry {
    pub(crate) header: ContractHeader,
    return_type: ValueType,
    default_handler: Option<Handler>,
    default_capture_handlers: Vec<Handler>,
}

impl CommandEntry {
    pub fn new(name: impl Into<String>, return_type: ValueType) -> Self {
        Self {
            header: ContractHeader::new(name),
            return_type,
            default_handler: None,
            default_capture_handlers: Vec::new(),
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

    /// Sets the sole default handler.
    ///
    /// # Errors
    /// - `ConfigurationError::DuplicateDefaultHandler` when one is already set.
    pub fn set_default<F>(&mut self, handler: F) -> Result<(), ConfigurationError>
    where
        F: Fn(&CallArgs) -> HandlerResult + Send + Sync + 'static,
    {
        if self.default_handler.is_some() {
            return Err(ConfigurationError::DuplicateDefaultHandler(
                self.qualified_name().to_string(),
            ));
        }
        self.default_handler = Some(Arc::new(handler));
        Ok(())
    }

    /// Appends one default capture handler. Order is preserved.
    pub fn add_capture_default<F>(&mut self, handler: F)
    where
        F: Fn(&CallArgs) -> HandlerResult + Send + Sync + 'static,
    {
        self.default_capture_handlers.push(Arc::new(handler));
    }

    /// Registrar form: `capture = false` sets the default handler,
    /// `capture = true` appends a capture handler.
    pub fn default<F>(&mut self, capture: bool, handler: F) -> Result<(), ConfigurationError>
    where
        F: Fn(&CallArgs) -> HandlerResult + Send + Sync + 'static,
    {
        if capture {
            self.add_capture_default(handler);
            Ok(())
        } else {
            self.set_default(handler)
        }
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

    pub fn return_type(&self) -> ValueType {
        self.return_type
    }

    pub fn default_handler(&self) -> Option<&Handler> {
        self.default_handler.as_ref()
    }

    pub fn default_capture_handlers(&self) -> &[Handler] {
        &self.default_capture_handlers
    }

    pub fn check_call(&self, args: &CallArgs) -> CommandResult<()> {
        self.header
            .signature
            .check_call(self.qualified_name(), args)?;
        Ok(())
    }

    /// Validates `args`, fans out to plugins and returns the stamped
    /// aggregator. Nothing is merged yet.
    pub fn call(&self, fanout: &dyn CommandFanout, args: CallArgs) -> CommandResult<HandlerAggregator> {
        self.check_call(&args)?;
        debug!(
            "event=contract_call module=contract kind=entry qualified_name={} capture=false positional={} keyword={}",
            self.qualified_name(),
            args.positional.len(),
            args.keyword.len()
        );
        let mut aggregator = fanout.call_command(self.qualified_name(), &args);
        aggregator.stamp_default(self.default_handler.clone(), self.return_type);
        Ok(aggregator)
    }

    /// Same as [`CommandEntry::call`], with every downstream handler stamped
    /// with `token` and the default capture handlers attached.
    pub fn call_capture(
        &self,
        fanout: &dyn CommandFanout,
        token: impl Into<CaptureToken>,
        args: CallArgs,
    ) -> CommandResult<HandlerAggregator> {
        self.check_call(&args)?;
        let token = token.into();
        debug!(
            "event=contract_call module=contract kind=entry qualified_name={} capture=true token={}",
            self.qualified_name(),
            token
        );
        let args = args.stamped(token.clone());
        let mut aggregator = fanout.call_command(self.qualified_name(), &args);
        aggregator.stamp_default(self.default_handler.clone(), self.return_type);
        aggregator.stamp_capture(token);
        for handler in &self.default_capture_handlers {
            aggregator.add_capture_handler(Arc::clone(handler));
        }
        Ok(aggregator)
    }
}

impl Debug for CommandEntry {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandEntry")
            .field("qualified_name", &self.header.qualified_name)
            .field("signature", &self.header.signature)
            .field("return_type", &self.return_type)
            .field("has_default_handler", &self.default_handler.is_some())
            .field(
                "default_capture_handlers",
                &self.default_capture_handlers.len(),
            )
            .finish()
    }
}
