//! Declared call signatures and argument validation.

use crate::error::SignatureError;
use crate::value::{CallArgs, ValueType};
use std::collections::BTreeMap;

/// Ordered positional types plus named keyword types.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Signature {
    pub positional: Vec<ValueType>,
    pub keyword: BTreeMap<String, ValueType>,
}

impl Signature {
    /// Validates one call against this signature.
    ///
    /// # Contract
    /// - Positional count must match exactly.
    /// - Each positional value must conform to its declared type.
    /// - Keyword names must be declared; supplied values must conform.
    /// - Declared keywords may be omitted.
    pub fn check_call(&self, qualified_name: &str, args: &CallArgs) -> Result<(), SignatureError> {
        let count_matches = args.positional.len() == self.positional.len();
        let positional_match = self
            .positional
            .iter()
            .zip(args.positional.iter())
            .all(|(declared, value)| value.conforms_to(*declared));
        let keyword_match = args.keyword.iter().all(|(name, value)| {
            self.keyword
                .get(name)
                .is_some_and(|declared| value.conforms_to(*declared))
        });

        if count_matches && positional_match && keyword_match {
            return Ok(());
        }

        Err(SignatureError {
            qualified_name: qualified_name.to_string(),
            supplied: describe_supplied(args),
            expected: self.describe(),
        })
    }

    /// Renders the declared types as `(str, int, loud=bool)`.
    pub fn describe(&self) -> String {
        let parts = self
            .positional
            .iter()
            .map(ToString::to_string)
            .chain(
                self.keyword
                    .iter()
                    .map(|(name, declared)| format!("{name}={declared}")),
            )
            .collect::<Vec<_>>();
        format!("({})", parts.join(", "))
    }
}

fn describe_supplied(args: &CallArgs) -> String {
    let parts = args
        .positional
        .iter()
        .map(|value| value.describe_type())
        .chain(
            args.keyword
                .iter()
                .map(|(name, value)| format!("{name}={}", value.describe_type())),
        )
        .collect::<Vec<_>>();
    format!("({})", parts.join(", "))
}
