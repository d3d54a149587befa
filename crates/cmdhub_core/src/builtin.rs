//! Built-in commands every Host registers.

use crate::command::{Command, CommandContext};
use crate::contract::{CommandEntry, CommandEvent, ContractTable};
use crate::error::{CommandError, CommandResult, ConfigurationError, TypeContractError};
use crate::value::{CallArgs, ObjectKind, ObjectValue, Value, ValueType};

/// Root of the item hierarchy.
pub static ITEM: ObjectKind = ObjectKind::root("Item");
pub static GALLERY: ObjectKind = ObjectKind::child("Gallery", &ITEM);
pub static COLLECTION: ObjectKind = ObjectKind::child("Collection", &ITEM);

/// Announces application start to every subscribed plugin.
pub struct InitApplication {
    context: CommandContext,
}

impl InitApplication {
    pub fn new(context: CommandContext) -> Self {
        Self { context }
    }
}

impl Command for InitApplication {
    const NAME: &'static str = "InitApplication";
    type Input = ();
    /// Number of plugins that handled `init`.
    type Output = usize;

    fn declare(contracts: &mut ContractTable) -> Result<(), ConfigurationError> {
        contracts.add_event(CommandEvent::new("init").describe("application finished loading"))
    }

    fn context(&self) -> &CommandContext {
        &self.context
    }

    fn main(&self, _input: ()) -> CommandResult<usize> {
        self.emit("init", CallArgs::new())
    }
}

/// Fetches one item by kind tag and id.
///
/// The first argument is a type tag (`Value::Type(Object(&GALLERY))`), so
/// plugins can serve a whole subtree of kinds from one handler.
pub struct GetItem {
    context: CommandContext,
}

impl GetItem {
    pub fn new(context: CommandContext) -> Self {
        Self { context }
    }
}

impl Command for GetItem {
    const NAME: &'static str = "GetItem";
    type Input = (&'static ObjectKind, i64);
    type Output = ObjectValue;

    fn declare(contracts: &mut ContractTable) -> Result<(), ConfigurationError> {
        let mut get = CommandEntry::new("get", ValueType::Object(&ITEM))
            .arg(ValueType::Object(&ITEM))
            .arg(ValueType::Int)
            .describe("fetch one item of the given kind");
        get.set_default(|args| {
            let kind = match args.get(0).and_then(Value::as_type) {
                Some(ValueType::Object(kind)) => kind,
                _ => &ITEM,
            };
            let id = args.get(1).and_then(Value::as_int).unwrap_or_default();
            Ok(Some(ObjectValue::new(kind).with_field("id", id).into()))
        })?;
        contracts.add_entry(get)
    }

    fn context(&self) -> &CommandContext {
        &self.context
    }

    fn main(&self, (kind, id): (&'static ObjectKind, i64)) -> CommandResult<ObjectValue> {
        let args = CallArgs::new().arg(ValueType::Object(kind)).arg(id);
        match self.invoke("get", args)? {
            Value::Object(object) => Ok(object),
            other => Err(CommandError::TypeContract(TypeContractError {
                qualified_name: format!("{}.get", Self::NAME),
                produced: other.value_type(),
                expected: ValueType::Object(&ITEM),
            })),
        }
    }
}
