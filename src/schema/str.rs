//! String nodes: free-form, a closed choice set, or regex-constrained.
//!
//! Patterns use the `regex` crate dialect and are matched with
//! [`Regex::is_match`], i.e. an unanchored substring search. Schemas that
//! need a full-string match must anchor with `^`/`$` themselves; patterns
//! written for other engines' default anchoring are not portable here.

use std::collections::BTreeSet;

use regex::Regex;
use serde_json::{Map, Value};

use super::kind_name;
use crate::error::{CompileError, ValidationCause, ValidationError};

#[derive(Debug, Clone, Default)]
pub struct StringSchema {
    /// The exact values the string may take, if constrained.
    choices: Option<BTreeSet<String>>,

    /// Mutually exclusive with `choices`.
    pattern: Option<Regex>,
}

impl StringSchema {
    pub(crate) fn parse(def: &Map<String, Value>) -> Result<Self, CompileError> {
        let mut schema = Self::default();

        if let Some(raw) = def.get("choices") {
            let choices: Vec<String> =
                serde_json::from_value(raw.clone()).map_err(|err| CompileError::Constraint {
                    field: "choices",
                    detail: err.to_string(),
                })?;

            if choices.is_empty() {
                return Err(CompileError::EmptyChoices);
            }

            schema.choices = Some(choices.into_iter().collect());
        }

        if let Some(raw) = def.get("pattern") {
            if schema.choices.is_some() {
                return Err(CompileError::ChoicesExclusive("pattern"));
            }

            let Value::String(pattern) = raw else {
                return Err(CompileError::Constraint {
                    field: "pattern",
                    detail: "must be a string".into(),
                });
            };

            schema.pattern = Some(Regex::new(pattern).map_err(|err| {
                CompileError::Constraint {
                    field: "pattern",
                    detail: err.to_string(),
                }
            })?);
        }

        Ok(schema)
    }

    pub(crate) fn validate(&self, value: &Value) -> Result<(), ValidationError> {
        let value = match value {
            Value::String(value) => value,
            Value::Null => return Err(ValidationError::new(ValidationCause::Null("string"))),
            other => {
                return Err(ValidationError::new(ValidationCause::TypeMismatch {
                    expected: "string",
                    found: kind_name(other).to_string(),
                }));
            }
        };

        if let Some(choices) = &self.choices {
            if !choices.contains(value) {
                return Err(ValidationError::new(ValidationCause::StringChoice(
                    value.clone(),
                )));
            }
        }

        if let Some(pattern) = &self.pattern {
            if !pattern.is_match(value) {
                return Err(ValidationError::new(ValidationCause::PatternMismatch {
                    value: value.clone(),
                    pattern: pattern.as_str().to_string(),
                }));
            }
        }

        Ok(())
    }
}
