//! In-process plugin registry and fan-out.

use crate::aggregator::HandlerAggregator;
use crate::catalog::CommandCatalog;
use crate::config::FanoutStrategy;
use crate::contract::{Handler, HandlerResult};
use crate::error::HandlerError;
use crate::plugin::manifest::{ManifestValidationError, PluginManifest};
use crate::plugin::CommandFanout;
use crate::value::CallArgs;
use log::{debug, info, warn};
use std::collections::{BTreeMap, HashMap};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread;

/// Plugin registration/subscription errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PluginRegistryError {
    InvalidManifest(ManifestValidationError),
    DuplicatePluginId(String),
    PluginNotFound(String),
    UnknownCommand(String),
    DuplicateSubscription {
        plugin_id: String,
        qualified_name: String,
    },
}

impl Display for PluginRegistryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidManifest(err) => write!(f, "invalid plugin manifest: {err}"),
            Self::DuplicatePluginId(value) => write!(f, "plugin id already registered: {value}"),
            Self::PluginNotFound(value) => write!(f, "plugin not found: {value}"),
            Self::UnknownCommand(value) => write!(f, "unknown command: {value}"),
            Self::DuplicateSubscription {
                plugin_id,
                qualified_name,
            } => write!(
                f,
                "plugin '{plugin_id}' already subscribed to {qualified_name}"
            ),
        }
    }
}

impl Error for PluginRegistryError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidManifest(err) => Some(err),
            _ => None,
        }
    }
}

/// Registered plugin snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisteredPlugin {
    pub manifest: PluginManifest,
    /// Registration sequence; lower runs and wins first.
    pub sequence: u64,
}

#[derive(Clone)]
struct Subscription {
    plugin_id: String,
    sequence: u64,
    handler: Handler,
}

/// Live set of plugins and their command subscriptions.
///
/// Plugins subscribe by qualified name only, so they need no build-time
/// access to the commands they extend.
#[derive(Default)]
pub struct PluginRegistry {
    plugins: BTreeMap<String, RegisteredPlugin>,
    subscriptions: HashMap<String, Vec<Subscription>>,
    catalog: Option<Arc<CommandCatalog>>,
    strategy: FanoutStrategy,
    next_sequence: u64,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_strategy(mut self, strategy: FanoutStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Restricts subscriptions to qualified names known by `catalog`.
    pub fn with_catalog(mut self, catalog: Arc<CommandCatalog>) -> Self {
        self.catalog = Some(catalog);
        self
    }

    pub fn strategy(&self) -> FanoutStrategy {
        self.strategy
    }

    /// Registers one plugin after manifest validation.
    pub fn register(&mut self, mut manifest: PluginManifest) -> Result<(), PluginRegistryError> {
        manifest
            .validate()
            .map_err(PluginRegistryError::InvalidManifest)?;
        let id = manifest.id.trim().to_string();
        if self.plugins.contains_key(id.as_str()) {
            return Err(PluginRegistryError::DuplicatePluginId(id));
        }

        manifest.id = id.clone();
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        info!(
            "event=plugin_register module=plugin plugin_id={} version={} sequence={}",
            id, manifest.version, sequence
        );
        self.plugins
            .insert(id, RegisteredPlugin { manifest, sequence });
        Ok(())
    }

    /// Subscribes a registered plugin's handler to one qualified name.
    pub fn subscribe<F>(
        &mut self,
        plugin_id: &str,
        qualified_name: &str,
        handler: F,
    ) -> Result<(), PluginRegistryError>
    where
        F: Fn(&CallArgs) -> HandlerResult + Send + Sync + 'static,
    {
        let plugin_id = plugin_id.trim();
        let Some(plugin) = self.plugins.get(plugin_id) else {
            return Err(PluginRegistryError::PluginNotFound(plugin_id.to_string()));
        };
        if let Some(catalog) = &self.catalog {
            if !catalog.is_known(qualified_name) {
                return Err(PluginRegistryError::UnknownCommand(
                    qualified_name.to_string(),
                ));
            }
        }

        let sequence = plugin.sequence;
        let subscribers = self
            .subscriptions
            .entry(qualified_name.to_string())
            .or_default();
        if subscribers.iter().any(|sub| sub.plugin_id == plugin_id) {
            return Err(PluginRegistryError::DuplicateSubscription {
                plugin_id: plugin_id.to_string(),
                qualified_name: qualified_name.to_string(),
            });
        }

        let at = subscribers.partition_point(|sub| sub.sequence < sequence);
        subscribers.insert(
            at,
            Subscription {
                plugin_id: plugin_id.to_string(),
                sequence,
                handler: Arc::new(handler),
            },
        );
        debug!(
            "event=plugin_subscribe module=plugin plugin_id={} qualified_name={}",
            plugin_id, qualified_name
        );
        Ok(())
    }

    /// Removes a plugin and every subscription it owns.
    pub fn unregister(&mut self, plugin_id: &str) -> Result<(), PluginRegistryError> {
        let plugin_id = plugin_id.trim();
        if self.plugins.remove(plugin_id).is_none() {
            return Err(PluginRegistryError::PluginNotFound(plugin_id.to_string()));
        }
        for subscribers in self.subscriptions.values_mut() {
            subscribers.retain(|sub| sub.plugin_id != plugin_id);
        }
        self.subscriptions.retain(|_, subscribers| !subscribers.is_empty());
        info!(
            "event=plugin_unregister module=plugin plugin_id={}",
            plugin_id
        );
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    pub fn get(&self, plugin_id: &str) -> Option<&RegisteredPlugin> {
        self.plugins.get(plugin_id.trim())
    }

    /// Returns plugin ids in registration order.
    pub fn plugin_ids(&self) -> Vec<String> {
        let mut plugins = self.plugins.values().collect::<Vec<_>>();
        plugins.sort_by_key(|plugin| plugin.sequence);
        plugins
            .into_iter()
            .map(|plugin| plugin.manifest.id.clone())
            .collect()
    }

    /// Returns subscriber plugin ids for one qualified name, in registration order.
    pub fn subscribers(&self, qualified_name: &str) -> Vec<String> {
        self.subscriptions
            .get(qualified_name)
            .map(|subs| subs.iter().map(|sub| sub.plugin_id.clone()).collect())
            .unwrap_or_default()
    }

    fn run_sequential(subscribers: &[Subscription], args: &CallArgs) -> Vec<HandlerResult> {
        subscribers
            .iter()
            .map(|sub| run_isolated(sub, args))
            .collect()
    }

    fn run_concurrent(subscribers: &[Subscription], args: &CallArgs) -> Vec<HandlerResult> {
        thread::scope(|scope| {
            let handles = subscribers
                .iter()
                .map(|sub| scope.spawn(move || run_isolated(sub, args)))
                .collect::<Vec<_>>();
            handles
                .into_iter()
                .map(|handle| {
                    handle
                        .join()
                        .unwrap_or_else(|_| Err(HandlerError::new("plugin thread panicked")))
                })
                .collect()
        })
    }
}

impl CommandFanout for PluginRegistry {
    fn call_command(&self, qualified_name: &str, args: &CallArgs) -> HandlerAggregator {
        let mut aggregator = HandlerAggregator::new(qualified_name, args);
        let Some(subscribers) = self.subscriptions.get(qualified_name) else {
            return aggregator;
        };

        debug!(
            "event=fanout_start module=plugin qualified_name={} subscribers={} strategy={}",
            qualified_name,
            subscribers.len(),
            self.strategy.as_str()
        );
        let results = match self.strategy {
            FanoutStrategy::Sequential => Self::run_sequential(subscribers, args),
            FanoutStrategy::Concurrent => Self::run_concurrent(subscribers, args),
        };
        for (sub, result) in subscribers.iter().zip(results) {
            aggregator.record(sub.plugin_id.clone(), result);
        }
        aggregator
    }
}

fn run_isolated(sub: &Subscription, args: &CallArgs) -> HandlerResult {
    match panic::catch_unwind(AssertUnwindSafe(|| (sub.handler)(args))) {
        Ok(result) => result,
        Err(_) => {
            warn!(
                "event=plugin_panicked module=plugin plugin_id={}",
                sub.plugin_id
            );
            Err(HandlerError::new(format!(
                "plugin '{}' panicked",
                sub.plugin_id
            )))
        }
    }
}
