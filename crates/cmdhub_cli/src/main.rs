//! CLI smoke entry point.
//!
//! # Responsibility
//! - Wire a catalog, a plugin registry and the built-in commands.
//! - Print the command directory in a deterministic order.

use cmdhub_core::{
    init_from_config, install_global, list_known_commands, CatalogBuilder, Command,
    CommandContext, CoreConfig, GetItem, InitApplication, PluginManifest, PluginRegistry,
};
use log::info;
use std::process::ExitCode;
use std::sync::Arc;

const PROBE_PLUGIN_ID: &str = "cmdhub.cli_probe";

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("cmdhub error: {message}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), String> {
    let config = CoreConfig::from_env().map_err(|err| err.to_string())?;
    init_from_config(&config)?;

    let mut builder = CatalogBuilder::new();
    builder
        .register::<InitApplication>()
        .and_then(|builder| builder.register::<GetItem>())
        .map_err(|err| err.to_string())?;
    let catalog = builder.build();
    install_global(Arc::clone(&catalog)).map_err(|err| err.to_string())?;

    let mut registry = PluginRegistry::new()
        .with_strategy(config.fanout)
        .with_catalog(Arc::clone(&catalog));
    registry
        .register(PluginManifest::new(PROBE_PLUGIN_ID, cmdhub_core::core_version()))
        .map_err(|err| err.to_string())?;
    registry
        .subscribe(PROBE_PLUGIN_ID, "InitApplication.init", |_| Ok(None))
        .map_err(|err| err.to_string())?;

    let context = CommandContext::new(catalog, Arc::new(registry));
    let answered = InitApplication::new(context)
        .run(())
        .map_err(|err| err.to_string())?;
    info!("event=cli_init module=cli status=ok answered={answered}");

    println!("cmdhub_core version={}", cmdhub_core::core_version());
    println!("fanout={} init_answered={answered}", config.fanout.as_str());
    for qualified_name in list_known_commands() {
        println!("{qualified_name}");
    }
    Ok(())
}
