//! Handler aggregator: the outcome of one contract invocation.
//!
//! # Responsibility
//! - Collect plugin outcomes recorded by the fan-out in registration order.
//! - Run the default handler and merge everything into one typed result.
//!
//! # Invariants
//! - Each produced value is checked against the expected type exactly once,
//!   at merge time.
//! - A plugin value overrides the default handler's value; among plugins the
//!   first in registration order wins.
//! - One plugin's failure never removes another plugin's recorded outcome.

use crate::capture::{CaptureError, CaptureSlot, CaptureToken};
use crate::contract::{Handler, HandlerResult};
use crate::error::{CommandError, CommandResult, HandlerFailure, TypeContractError};
use crate::value::{CallArgs, Value, ValueType};
use log::{debug, warn};
use std::fmt::{Debug, Formatter};

/// One plugin's recorded outcome.
#[derive(Debug, Clone, PartialEq)]
pub struct PluginOutcome {
    pub plugin_id: String,
    pub result: HandlerResult,
}

/// Transient per-invocation result collector.
pub struct HandlerAggregator {
    qualified_name: String,
    args: CallArgs,
    capture: bool,
    capture_token: Option<CaptureToken>,
    expected_type: Option<ValueType>,
    default_handler: Option<Handler>,
    capture_handlers: Vec<Handler>,
    outcomes: Vec<PluginOutcome>,
}

impl HandlerAggregator {
    /// Creates an empty aggregator for a fan-out of `qualified_name`.
    pub fn new(qualified_name: impl Into<String>, args: &CallArgs) -> Self {
        Self {
            qualified_name: qualified_name.into(),
            args: args.clone(),
            capture: false,
            capture_token: None,
            expected_type: None,
            default_handler: None,
            capture_handlers: Vec::new(),
            outcomes: Vec::new(),
        }
    }

    /// Records one plugin outcome. Call in plugin registration order.
    pub fn record(&mut self, plugin_id: impl Into<String>, result: HandlerResult) {
        self.outcomes.push(PluginOutcome {
            plugin_id: plugin_id.into(),
            result,
        });
    }

    pub fn qualified_name(&self) -> &str {
        &self.qualified_name
    }

    pub fn args(&self) -> &CallArgs {
        &self.args
    }

    pub fn is_capture(&self) -> bool {
        self.capture
    }

    pub fn capture_token(&self) -> Option<&CaptureToken> {
        self.capture_token.as_ref()
    }

    /// Declared return type; `None` for events.
    pub fn expected_type(&self) -> Option<ValueType> {
        self.expected_type
    }

    pub fn default_handler(&self) -> Option<&Handler> {
        self.default_handler.as_ref()
    }

    pub fn capture_handlers(&self) -> &[Handler] {
        &self.capture_handlers
    }

    pub fn outcomes(&self) -> &[PluginOutcome] {
        &self.outcomes
    }

    pub(crate) fn stamp_default(&mut self, handler: Option<Handler>, expected_type: ValueType) {
        self.default_handler = handler;
        self.expected_type = Some(expected_type);
    }

    pub(crate) fn stamp_capture(&mut self, token: CaptureToken) {
        self.capture = true;
        self.capture_token = Some(token);
    }

    pub(crate) fn add_capture_handler(&mut self, handler: Handler) {
        self.capture_handlers.push(handler);
    }

    fn validate(&self, value: &Value, expected: ValueType) -> Result<(), TypeContractError> {
        if value.is_instance_of(expected) {
            return Ok(());
        }
        Err(TypeContractError {
            qualified_name: self.qualified_name.clone(),
            produced: value.value_type(),
            expected,
        })
    }

    fn plugin_failure(&self, outcome: &PluginOutcome) -> Option<HandlerFailure> {
        let Err(error) = &outcome.result else {
            return None;
        };
        warn!(
            "event=plugin_failed module=aggregator qualified_name={} plugin_id={}",
            self.qualified_name, outcome.plugin_id
        );
        Some(HandlerFailure {
            qualified_name: self.qualified_name.clone(),
            plugin_id: Some(outcome.plugin_id.clone()),
            error: error.clone(),
        })
    }

    /// Runs the default handler and merges all values into one result.
    ///
    /// Consumes the aggregator, so each invocation is merged and validated
    /// once.
    ///
    /// # Errors
    /// - `CommandError::Handler` for the first plugin failure in registration
    ///   order, or a default handler failure.
    /// - `CommandError::TypeContract` when any produced value violates the
    ///   expected type.
    /// - `CommandError::NoResult` when nothing produced a value and the
    ///   expected type is not `Null`.
    pub fn merge(self) -> CommandResult<Value> {
        let expected = self.expected_type.unwrap_or(ValueType::Any);

        let mut plugin_value: Option<(&str, &Value)> = None;
        for outcome in &self.outcomes {
            if let Some(failure) = self.plugin_failure(outcome) {
                return Err(failure.into());
            }
            if let Ok(Some(value)) = &outcome.result {
                self.validate(value, expected)?;
                if plugin_value.is_none() {
                    plugin_value = Some((outcome.plugin_id.as_str(), value));
                }
            }
        }

        let default_value = match &self.default_handler {
            Some(handler) => match handler(&self.args) {
                Ok(Some(value)) => {
                    self.validate(&value, expected)?;
                    Some(value)
                }
                Ok(None) => None,
                Err(error) => {
                    return Err(HandlerFailure {
                        qualified_name: self.qualified_name.clone(),
                        plugin_id: None,
                        error,
                    }
                    .into())
                }
            },
            None => None,
        };

        if let Some((plugin_id, value)) = plugin_value {
            debug!(
                "event=aggregator_merge module=aggregator qualified_name={} source=plugin plugin_id={}",
                self.qualified_name, plugin_id
            );
            return Ok(value.clone());
        }
        if let Some(value) = default_value {
            debug!(
                "event=aggregator_merge module=aggregator qualified_name={} source=default",
                self.qualified_name
            );
            return Ok(value);
        }
        if expected == ValueType::Null {
            return Ok(Value::Null);
        }
        Err(CommandError::NoResult(self.qualified_name.clone()))
    }

    /// Completes an event fan-out and returns how many subscribers ran.
    pub fn finish(&self) -> CommandResult<usize> {
        for outcome in &self.outcomes {
            if let Some(failure) = self.plugin_failure(outcome) {
                return Err(failure.into());
            }
        }
        debug!(
            "event=aggregator_finish module=aggregator qualified_name={} subscribers={}",
            self.qualified_name,
            self.outcomes.len()
        );
        Ok(self.outcomes.len())
    }

    /// Feeds a capture invocation into its open slot.
    ///
    /// Default capture handlers run in declaration order, then the default
    /// handler; plugins that returned no value stay pending on the slot.
    pub fn dispatch(self, slot: &CaptureSlot) -> CommandResult<()> {
        if !self.capture {
            return Err(CaptureError::NotCaptureMode(self.qualified_name).into());
        }
        if self.capture_token.as_ref() != Some(slot.token()) {
            return Err(CaptureError::TokenMismatch {
                expected: slot.token().clone(),
                actual: self.capture_token,
            }
            .into());
        }

        let capture_results = self
            .capture_handlers
            .iter()
            .map(|handler| handler(&self.args))
            .collect::<Vec<_>>();
        let default_result = self.default_handler.as_ref().map(|handler| handler(&self.args));
        let immediate = self
            .outcomes
            .into_iter()
            .map(|outcome| (outcome.plugin_id, outcome.result))
            .collect::<Vec<_>>();

        debug!(
            "event=capture_dispatch module=aggregator qualified_name={} token={} plugins={} capture_handlers={}",
            self.qualified_name,
            slot.token(),
            immediate.len(),
            capture_results.len()
        );
        slot.attach(immediate, capture_results, default_result)?;
        Ok(())
    }
}

impl Debug for HandlerAggregator {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerAggregator")
            .field("qualified_name", &self.qualified_name)
            .field("capture", &self.capture)
            .field("capture_token", &self.capture_token)
            .field("expected_type", &self.expected_type)
            .field("has_default_handler", &self.default_handler.is_some())
            .field("capture_handlers", &self.capture_handlers.len())
            .field("outcomes", &self.outcomes)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::HandlerAggregator;
    use crate::contract::handler;
    use crate::error::{CommandError, HandlerError};
    use crate::value::{CallArgs, Value, ValueType};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn aggregator(expected: ValueType) -> HandlerAggregator {
        let mut aggregator = HandlerAggregator::new("Greet.say", &CallArgs::new().arg("ann"));
        aggregator.stamp_default(
            Some(handler(|args| {
                let name = args.get(0).and_then(Value::as_str).unwrap_or_default();
                Ok(Some(Value::from(format!("hello {name}"))))
            })),
            expected,
        );
        aggregator
    }

    #[test]
    fn default_value_is_used_without_plugins() {
        let merged = aggregator(ValueType::Str).merge().expect("merge");
        assert_eq!(merged, Value::from("hello ann"));
    }

    #[test]
    fn first_plugin_value_overrides_default() {
        let mut aggregator = aggregator(ValueType::Str);
        aggregator.record("declines", Ok(None));
        aggregator.record("first", Ok(Some("hi ann".into())));
        aggregator.record("second", Ok(Some("yo ann".into())));
        assert_eq!(aggregator.merge().expect("merge"), Value::from("hi ann"));
    }

    #[test]
    fn default_handler_runs_once_even_when_overridden() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let mut aggregator = HandlerAggregator::new("Greet.say", &CallArgs::new());
        aggregator.stamp_default(
            Some(handler(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(Some("default".into()))
            })),
            ValueType::Str,
        );
        aggregator.record("plugin", Ok(Some("plugin".into())));

        assert_eq!(aggregator.merge().expect("merge"), Value::from("plugin"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn mistyped_plugin_value_fails_type_contract() {
        let mut aggregator = aggregator(ValueType::Str);
        aggregator.record("bad", Ok(Some(Value::Int(5))));
        let err = aggregator.merge().expect_err("int violates str");
        match err {
            CommandError::TypeContract(err) => {
                assert_eq!(err.qualified_name, "Greet.say");
                assert_eq!(err.produced, ValueType::Int);
                assert_eq!(err.expected, ValueType::Str);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn plugin_failure_surfaces_and_keeps_other_outcomes() {
        let mut aggregator = aggregator(ValueType::Str);
        aggregator.record("ok", Ok(Some("fine".into())));
        aggregator.record("broken", Err(HandlerError::new("boom")));
        assert_eq!(aggregator.outcomes().len(), 2);
        assert_eq!(aggregator.outcomes()[0].result, Ok(Some(Value::from("fine"))));

        let err = aggregator.merge().expect_err("failure surfaces");
        assert!(matches!(err, CommandError::Handler(ref failure)
            if failure.plugin_id.as_deref() == Some("broken")));
    }

    #[test]
    fn type_tags_are_not_accepted_as_return_values() {
        let mut aggregator = HandlerAggregator::new("Greet.say", &CallArgs::new());
        aggregator.stamp_default(
            Some(handler(|_| Ok(Some(Value::Type(ValueType::Str))))),
            ValueType::Str,
        );
        let err = aggregator.merge().expect_err("type tag is not a str");
        match err {
            CommandError::TypeContract(err) => {
                assert_eq!(err.produced, ValueType::Type);
                assert_eq!(err.expected, ValueType::Str);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn empty_merge_reports_no_result_unless_null_expected() {
        let aggregator = HandlerAggregator::new("Greet.say", &CallArgs::new());
        let mut typed = aggregator;
        typed.stamp_default(None, ValueType::Str);
        assert!(matches!(typed.merge(), Err(CommandError::NoResult(_))));

        let mut unit = HandlerAggregator::new("Greet.log", &CallArgs::new());
        unit.stamp_default(None, ValueType::Null);
        assert_eq!(unit.merge().expect("null entry"), Value::Null);
    }

    #[test]
    fn finish_counts_event_subscribers() {
        let mut aggregator = HandlerAggregator::new("InitApplication.init", &CallArgs::new());
        aggregator.record("a", Ok(None));
        aggregator.record("b", Ok(None));
        assert_eq!(aggregator.finish().expect("finish"), 2);
        assert!(aggregator.expected_type().is_none());
    }
}
