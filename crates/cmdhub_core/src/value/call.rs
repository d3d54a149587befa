//! Call arguments passed through contracts into plugin handlers.

use crate::capture::CaptureToken;
use crate::value::value::Value;
use std::collections::BTreeMap;

/// Positional and keyword arguments of one invocation.
///
/// In capture mode every handler receives the same `capture_token` stamp.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CallArgs {
    pub positional: Vec<Value>,
    pub keyword: BTreeMap<String, Value>,
    capture_token: Option<CaptureToken>,
}

impl CallArgs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one positional argument.
    pub fn arg(mut self, value: impl Into<Value>) -> Self {
        self.positional.push(value.into());
        self
    }

    /// Sets one keyword argument.
    pub fn kwarg(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.keyword.insert(name.into(), value.into());
        self
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.positional.get(index)
    }

    pub fn get_kwarg(&self, name: &str) -> Option<&Value> {
        self.keyword.get(name)
    }

    pub fn capture_token(&self) -> Option<&CaptureToken> {
        self.capture_token.as_ref()
    }

    pub(crate) fn stamped(mut self, token: CaptureToken) -> Self {
        self.capture_token = Some(token);
        self
    }
}
