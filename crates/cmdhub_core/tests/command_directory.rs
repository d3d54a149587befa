use cmdhub_core::{
    global_catalog, install_global, list_known_commands, CatalogBuilder, Command, CommandContext,
    ConfigurationError, GetItem, InitApplication, PluginManifest, PluginRegistry,
    PluginRegistryError,
};
use std::sync::Arc;

fn builtin_catalog() -> Arc<cmdhub_core::CommandCatalog> {
    let mut builder = CatalogBuilder::new();
    builder
        .register::<InitApplication>()
        .and_then(|builder| builder.register::<GetItem>())
        .expect("register builtins");
    builder.build()
}

// The global directory is process-wide, so every global assertion lives here.
#[test]
fn global_directory_lists_installed_commands_once() {
    assert!(list_known_commands().is_empty());
    assert!(global_catalog().is_none());

    let catalog = builtin_catalog();
    install_global(Arc::clone(&catalog)).expect("install");
    install_global(Arc::clone(&catalog)).expect("same catalog again");

    let err = install_global(builtin_catalog()).expect_err("different catalog");
    assert_eq!(err, ConfigurationError::GlobalCatalogInstalled);

    assert_eq!(
        list_known_commands().into_iter().collect::<Vec<_>>(),
        vec!["GetItem.get".to_string(), "InitApplication.init".to_string()]
    );
    let installed = global_catalog().expect("installed catalog");
    assert!(Arc::ptr_eq(&installed, &catalog));
}

#[test]
fn registry_bound_to_catalog_rejects_unknown_commands() {
    let catalog = builtin_catalog();
    let mut registry = PluginRegistry::new().with_catalog(Arc::clone(&catalog));
    registry
        .register(PluginManifest::new("starter", "0.3.1"))
        .expect("register");

    registry
        .subscribe("starter", "InitApplication.init", |_| Ok(None))
        .expect("known command");
    let err = registry
        .subscribe("starter", "InitApplication.shutdown", |_| Ok(None))
        .expect_err("unknown command");
    assert_eq!(
        err,
        PluginRegistryError::UnknownCommand("InitApplication.shutdown".to_string())
    );
    assert_eq!(registry.subscribers("InitApplication.init"), vec!["starter"]);

    let init = InitApplication::new(CommandContext::new(catalog, Arc::new(registry)));
    assert_eq!(init.run(()).expect("init"), 1);
}

#[test]
fn descriptors_export_as_json_for_documentation() {
    let catalog = builtin_catalog();
    let exported = serde_json::to_value(catalog.describe()).expect("serialize descriptors");
    let names = exported
        .as_array()
        .expect("array")
        .iter()
        .map(|descriptor| descriptor["qualified_name"].as_str().unwrap_or_default().to_string())
        .collect::<Vec<_>>();
    assert_eq!(names, vec!["GetItem.get", "InitApplication.init"]);
    assert_eq!(exported[0]["kind"], "entry");
    assert_eq!(exported[0]["return_type"], "Item");
    assert_eq!(exported[1]["kind"], "event");
    assert!(exported[1].get("return_type").is_none());
}
