//! Command and event dispatch core for plugin-extensible applications.
//! Commands declare typed contracts; plugins implement or override them.

pub mod aggregator;
pub mod builtin;
pub mod capture;
pub mod catalog;
pub mod command;
pub mod config;
pub mod contract;
pub mod error;
pub mod invoke;
pub mod logging;
pub mod plugin;
pub mod value;

pub use aggregator::{HandlerAggregator, PluginOutcome};
pub use builtin::{GetItem, InitApplication};
pub use capture::{
    CaptureBoard, CaptureError, CaptureReply, CaptureSlot, CaptureToken, Delivery,
    ReplyOutcome, ReplySource,
};
pub use catalog::{
    global_catalog, install_global, list_known_commands, CatalogBuilder, CommandCatalog,
};
pub use command::{Command, CommandContext, UndoCommand};
pub use config::{ConfigError, CoreConfig, FanoutStrategy};
pub use contract::{
    handler, is_valid_contract_name, CommandEntry, CommandEvent, ContractDescriptor,
    ContractKind, ContractTable, Handler, HandlerResult, Signature,
};
pub use error::{
    CommandError, CommandResult, ConfigurationError, HandlerError, HandlerFailure,
    SignatureError, TypeContractError,
};
pub use invoke::{CaptureInvoke, Invoke};
pub use logging::{default_log_level, init_from_config, init_logging, logging_status};
pub use plugin::{
    CommandFanout, ManifestValidationError, PluginManifest, PluginRegistry, PluginRegistryError,
    RegisteredPlugin,
};
pub use value::{CallArgs, ObjectKind, ObjectValue, Value, ValueType};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
