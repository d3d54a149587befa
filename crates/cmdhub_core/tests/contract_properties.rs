use cmdhub_core::{
    CallArgs, CaptureBoard, CaptureToken, CatalogBuilder, Command, CommandContext, CommandEntry,
    CommandEvent, CommandResult, ConfigurationError, ContractTable, Invoke, ObjectKind,
    ObjectValue, PluginRegistry, ReplyOutcome, ReplySource, Value, ValueType,
};
use std::collections::BTreeSet;
use std::sync::Arc;

static SHAPE: ObjectKind = ObjectKind::root("Shape");
static CIRCLE: ObjectKind = ObjectKind::child("Circle", &SHAPE);
static COLOR: ObjectKind = ObjectKind::root("Color");

fn draw_entry() -> CommandEntry {
    CommandEntry::new("draw", ValueType::Str)
        .arg(ValueType::Object(&SHAPE))
        .arg(ValueType::Number)
        .kwarg("outline", ValueType::Bool)
}

struct Canvas;

impl Command for Canvas {
    const NAME: &'static str = "Canvas";
    type Input = ();
    type Output = ();

    fn declare(contracts: &mut ContractTable) -> Result<(), ConfigurationError> {
        let mut draw = draw_entry();
        draw.set_default(|_| Ok(Some(Value::from("drawn"))))?;
        draw.add_capture_default(|_| Ok(Some(Value::from("first capture"))));
        draw.add_capture_default(|_| Ok(Some(Value::from("second capture"))));
        contracts.add_entry(draw)?;
        contracts.add_event(CommandEvent::new("drawn").arg(ValueType::Object(&SHAPE)))?;
        contracts.add_event(CommandEvent::new("cleared"))
    }

    fn context(&self) -> &CommandContext {
        unreachable!("only declared")
    }

    fn main(&self, _input: ()) -> CommandResult<()> {
        Ok(())
    }
}

struct Palette;

impl Command for Palette {
    const NAME: &'static str = "Palette";
    type Input = ();
    type Output = ();

    fn declare(contracts: &mut ContractTable) -> Result<(), ConfigurationError> {
        contracts.add_entry(CommandEntry::new("draw", ValueType::Object(&COLOR)))
    }

    fn context(&self) -> &CommandContext {
        unreachable!("only declared")
    }

    fn main(&self, _input: ()) -> CommandResult<()> {
        Ok(())
    }
}

fn canvas_table() -> ContractTable {
    let mut table = ContractTable::new(Canvas::NAME);
    Canvas::declare(&mut table).expect("declare Canvas");
    table
}

#[test]
fn check_call_accepts_instances_subtypes_and_type_tags() {
    let table = canvas_table();
    let draw = table.entry("draw").expect("draw entry");

    for args in [
        CallArgs::new().arg(ObjectValue::new(&SHAPE)).arg(1),
        CallArgs::new().arg(ObjectValue::new(&CIRCLE)).arg(2.5),
        CallArgs::new()
            .arg(ValueType::Object(&CIRCLE))
            .arg(3)
            .kwarg("outline", true),
    ] {
        assert!(draw.check_call(&args).is_ok(), "{args:?} should match");
    }
}

#[test]
fn check_call_rejects_unrelated_arguments() {
    let table = canvas_table();
    let draw = table.entry("draw").expect("draw entry");

    for args in [
        CallArgs::new().arg(ObjectValue::new(&COLOR)).arg(1),
        CallArgs::new().arg(ObjectValue::new(&SHAPE)).arg("wide"),
        CallArgs::new().arg(ObjectValue::new(&SHAPE)),
        CallArgs::new()
            .arg(ObjectValue::new(&SHAPE))
            .arg(1)
            .kwarg("fill", true),
        CallArgs::new()
            .arg(ObjectValue::new(&SHAPE))
            .arg(1)
            .kwarg("outline", "yes"),
    ] {
        assert!(draw.check_call(&args).is_err(), "{args:?} should fail");
    }
}

#[test]
fn second_default_handler_is_a_configuration_error() {
    let mut entry = draw_entry();
    entry
        .default(false, |_| Ok(Some(Value::from("one"))))
        .expect("first default");
    let err = entry
        .default(false, |_| Ok(Some(Value::from("two"))))
        .expect_err("second default");
    assert_eq!(
        err,
        ConfigurationError::DuplicateDefaultHandler("draw".to_string())
    );
}

#[test]
fn second_capture_default_is_accepted_and_both_run() {
    let table = canvas_table();
    let draw = table.entry("draw").expect("draw entry");
    assert_eq!(draw.default_capture_handlers().len(), 2);

    let board = CaptureBoard::new();
    let slot = Invoke::new(
        draw,
        CallArgs::new().arg(ObjectValue::new(&CIRCLE)).arg(1),
    )
    .capture("both-run")
    .dispatch(&PluginRegistry::new(), &board)
    .expect("dispatch");

    let replies = slot.replies();
    let captured = replies
        .iter()
        .filter_map(|reply| match (&reply.source, &reply.outcome) {
            (ReplySource::CaptureDefault(index), ReplyOutcome::Value(value)) => {
                Some((*index, value.clone()))
            }
            _ => None,
        })
        .collect::<Vec<_>>();
    assert_eq!(
        captured,
        vec![
            (0, Value::from("first capture")),
            (1, Value::from("second capture")),
        ]
    );
}

#[test]
fn qualified_names_are_owner_dot_name_and_unique() {
    let mut builder = CatalogBuilder::new();
    builder
        .register::<Canvas>()
        .and_then(|builder| builder.register::<Palette>())
        .expect("register commands");
    let catalog = builder.build();

    let table = catalog.table("Canvas").expect("Canvas table");
    for entry in table.entries() {
        assert_eq!(entry.qualified_name(), format!("Canvas.{}", entry.name()));
    }
    for event in table.events() {
        assert_eq!(event.qualified_name(), format!("Canvas.{}", event.name()));
    }

    let all = catalog
        .command_names()
        .into_iter()
        .filter_map(|command| catalog.table(command))
        .flat_map(|table| table.qualified_names().map(str::to_string).collect::<Vec<_>>())
        .collect::<Vec<_>>();
    let unique = all.iter().cloned().collect::<BTreeSet<_>>();
    assert_eq!(all.len(), unique.len());
    assert!(unique.contains("Palette.draw"));
    assert!(unique.contains("Canvas.draw"));
}

#[test]
fn duplicate_names_are_rejected_across_both_namespaces() {
    let mut table = ContractTable::new("Canvas");
    table.add_entry(draw_entry()).expect("first draw");
    let err = table.add_entry(draw_entry()).expect_err("second draw");
    assert_eq!(
        err,
        ConfigurationError::DuplicateContract {
            command: "Canvas",
            name: "draw".to_string(),
        }
    );
    let err = table
        .add_event(CommandEvent::new("draw"))
        .expect_err("event reusing the entry name");
    assert!(matches!(err, ConfigurationError::DuplicateContract { .. }));
    table
        .add_event(CommandEvent::new("drawn"))
        .expect("distinct event name");
}

#[test]
fn call_stamps_expected_type_without_capture() {
    let table = canvas_table();
    let draw = table.entry("draw").expect("draw entry");
    let aggregator = draw
        .call(
            &PluginRegistry::new(),
            CallArgs::new().arg(ObjectValue::new(&SHAPE)).arg(1),
        )
        .expect("call");

    assert_eq!(aggregator.expected_type(), Some(ValueType::Str));
    assert!(!aggregator.is_capture());
    assert!(aggregator.capture_token().is_none());
    assert!(aggregator.capture_handlers().is_empty());
}

#[test]
fn call_capture_stamps_token_and_handlers_in_declaration_order() {
    let table = canvas_table();
    let draw = table.entry("draw").expect("draw entry");
    let aggregator = draw
        .call_capture(
            &PluginRegistry::new(),
            42u64,
            CallArgs::new().arg(ObjectValue::new(&SHAPE)).arg(1),
        )
        .expect("call capture");

    assert!(aggregator.is_capture());
    assert_eq!(aggregator.capture_token(), Some(&CaptureToken::from(42u64)));
    assert_eq!(aggregator.args().capture_token(), Some(&CaptureToken::from(42u64)));
    assert_eq!(aggregator.expected_type(), Some(ValueType::Str));

    let declared = draw.default_capture_handlers();
    let stamped = aggregator.capture_handlers();
    assert_eq!(stamped.len(), declared.len());
    for (stamped, declared) in stamped.iter().zip(declared) {
        assert!(Arc::ptr_eq(stamped, declared));
    }
}
