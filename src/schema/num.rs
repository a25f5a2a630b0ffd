//! Int and number nodes.
//!
//! Both support a choice set or inclusive `min`/`max` bounds, never both.
//! `int` accepts exactly the JSON integers representable as `i64`; `number`
//! compares as `f64`, so bounds checks inherit floating-point imprecision
//! near boundary values.

use std::collections::BTreeSet;
use std::fmt::Display;

use ordered_float::OrderedFloat;
use serde_json::{Map, Value};

use super::kind_name;
use crate::error::{CompileError, ValidationCause, ValidationError};

#[derive(Debug, Clone, Default)]
pub struct IntSchema {
    choices: Option<BTreeSet<i64>>,
    min: Option<i64>,
    max: Option<i64>,
}

#[derive(Debug, Clone, Default)]
pub struct NumberSchema {
    choices: Option<BTreeSet<OrderedFloat<f64>>>,
    min: Option<f64>,
    max: Option<f64>,
}

impl IntSchema {
    pub(crate) fn parse(def: &Map<String, Value>) -> Result<Self, CompileError> {
        let mut schema = Self::default();

        if let Some(raw) = def.get("choices") {
            let choices: Vec<i64> = parse_constraint(raw, "choices")?;
            if choices.is_empty() {
                return Err(CompileError::EmptyChoices);
            }
            schema.choices = Some(choices.into_iter().collect());
        }

        schema.min = parse_bound(def, "min", schema.choices.is_some())?;
        schema.max = parse_bound(def, "max", schema.choices.is_some())?;

        if let (Some(min), Some(max)) = (schema.min, schema.max) {
            if min > max {
                return Err(CompileError::MinGreaterThanMax);
            }
        }

        Ok(schema)
    }

    pub(crate) fn validate(&self, value: &Value) -> Result<(), ValidationError> {
        let num = match value {
            Value::Number(raw) => match raw.as_i64() {
                Some(num) => num,
                None => {
                    return Err(ValidationError::new(ValidationCause::TypeMismatch {
                        expected: "int",
                        found: format!("number {raw}"),
                    }));
                }
            },
            Value::Null => return Err(ValidationError::new(ValidationCause::Null("int"))),
            other => {
                return Err(ValidationError::new(ValidationCause::TypeMismatch {
                    expected: "int",
                    found: kind_name(other).to_string(),
                }));
            }
        };

        if let Some(choices) = &self.choices {
            if !choices.contains(&num) {
                return Err(ValidationError::new(ValidationCause::NumberChoice(
                    num.to_string(),
                )));
            }
        }

        check_bounds(num, self.min, self.max)
    }
}

impl NumberSchema {
    pub(crate) fn parse(def: &Map<String, Value>) -> Result<Self, CompileError> {
        let mut schema = Self::default();

        if let Some(raw) = def.get("choices") {
            let choices: Vec<f64> = parse_constraint(raw, "choices")?;
            if choices.is_empty() {
                return Err(CompileError::EmptyChoices);
            }
            schema.choices = Some(choices.into_iter().map(OrderedFloat).collect());
        }

        schema.min = parse_bound(def, "min", schema.choices.is_some())?;
        schema.max = parse_bound(def, "max", schema.choices.is_some())?;

        if let (Some(min), Some(max)) = (schema.min, schema.max) {
            if min > max {
                return Err(CompileError::MinGreaterThanMax);
            }
        }

        Ok(schema)
    }

    pub(crate) fn validate(&self, value: &Value) -> Result<(), ValidationError> {
        let num = match value {
            Value::Number(raw) => match raw.as_f64() {
                Some(num) => num,
                None => {
                    return Err(ValidationError::new(ValidationCause::TypeMismatch {
                        expected: "number",
                        found: format!("number {raw}"),
                    }));
                }
            },
            Value::Null => return Err(ValidationError::new(ValidationCause::Null("number"))),
            other => {
                return Err(ValidationError::new(ValidationCause::TypeMismatch {
                    expected: "number",
                    found: kind_name(other).to_string(),
                }));
            }
        };

        if let Some(choices) = &self.choices {
            if !choices.contains(&OrderedFloat(num)) {
                return Err(ValidationError::new(ValidationCause::NumberChoice(
                    num.to_string(),
                )));
            }
        }

        check_bounds(num, self.min, self.max)
    }
}

fn parse_constraint<T: serde::de::DeserializeOwned>(
    raw: &Value,
    field: &'static str,
) -> Result<T, CompileError> {
    serde_json::from_value(raw.clone()).map_err(|err| CompileError::Constraint {
        field,
        detail: err.to_string(),
    })
}

fn parse_bound<T: serde::de::DeserializeOwned>(
    def: &Map<String, Value>,
    field: &'static str,
    has_choices: bool,
) -> Result<Option<T>, CompileError> {
    let Some(raw) = def.get(field) else {
        return Ok(None);
    };
    if has_choices {
        return Err(CompileError::ChoicesExclusive(field));
    }
    parse_constraint(raw, field).map(Some)
}

/// Inclusive range check shared by int and number. Float comparisons are
/// native `f64` and can misjudge values right at the bounds.
fn check_bounds<N: PartialOrd + Display + Copy>(
    num: N,
    min: Option<N>,
    max: Option<N>,
) -> Result<(), ValidationError> {
    if let Some(min) = min {
        if num < min {
            return Err(ValidationError::new(ValidationCause::BelowMinimum {
                value: num.to_string(),
                min: min.to_string(),
            }));
        }
    }

    if let Some(max) = max {
        if num > max {
            return Err(ValidationError::new(ValidationCause::AboveMaximum {
                value: num.to_string(),
                max: max.to_string(),
            }));
        }
    }

    Ok(())
}
