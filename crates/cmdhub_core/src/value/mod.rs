//! Runtime value model shared by contracts and plugin handlers.

pub mod call;
pub mod types;
#[allow(clippy::module_inception)]
pub mod value;

pub use call::CallArgs;
pub use types::{ObjectKind, ValueType};
pub use value::{ObjectValue, Value};
