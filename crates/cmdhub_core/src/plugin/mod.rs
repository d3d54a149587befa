//! Plugin registry boundary.
//!
//! # Responsibility
//! - Define the fan-out seam (`CommandFanout`) the contracts call into.
//! - Provide an in-process registry that hosts can use as that seam.
//!
//! # Invariants
//! - Fan-out results are recorded in plugin registration order.
//! - The fan-out never validates produced values.

pub mod manifest;
pub mod registry;

use crate::aggregator::HandlerAggregator;
use crate::value::CallArgs;

pub use manifest::{ManifestValidationError, PluginManifest};
pub use registry::{PluginRegistry, PluginRegistryError, RegisteredPlugin};

/// Fan-out of one call to every plugin registered for a qualified name.
pub trait CommandFanout: Send + Sync {
    /// Returns an aggregator populated with one outcome per subscribed plugin,
    /// in registration order.
    fn call_command(&self, qualified_name: &str, args: &CallArgs) -> HandlerAggregator;
}
