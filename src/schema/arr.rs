//! Array nodes: a homogeneous element type plus optional uniqueness.

use std::collections::HashSet;

use serde_json::{Map, Value};

use super::{Compiler, TypeNode, kind_name};
use crate::error::{CompileError, ValidationCause, ValidationError};

#[derive(Debug, Clone)]
pub struct ArraySchema {
    element_type: Box<TypeNode>,

    /// Reject duplicate elements, compared by their serialized form.
    unique: bool,
}

impl ArraySchema {
    pub(crate) fn parse(
        compiler: &Compiler,
        def: &Map<String, Value>,
    ) -> Result<Self, CompileError> {
        let Some(values) = def.get("values") else {
            return Err(CompileError::ArrayMissingValues);
        };

        let element_type = compiler
            .parse(values)
            .map_err(|err| CompileError::ArrayValuesType(Box::new(err)))?;

        let unique = match def.get("unique") {
            None => false,
            Some(Value::Bool(unique)) => *unique,
            Some(_) => {
                return Err(CompileError::Constraint {
                    field: "unique",
                    detail: "must be a boolean".into(),
                });
            }
        };

        Ok(Self {
            element_type: Box::new(element_type),
            unique,
        })
    }

    pub(crate) fn validate(&self, value: &Value) -> Result<(), ValidationError> {
        let items = match value {
            Value::Array(items) => items,
            Value::Null => return Err(ValidationError::new(ValidationCause::Null("array"))),
            other => {
                return Err(ValidationError::new(ValidationCause::TypeMismatch {
                    expected: "array",
                    found: kind_name(other).to_string(),
                }));
            }
        };

        for (index, item) in items.iter().enumerate() {
            self.element_type
                .validate(item)
                .map_err(|err| err.in_index(index))?;
        }

        if self.unique {
            // duplicates are judged on the encoded bytes: `1` and `"1"`
            // differ, `1` and `1.0` differ, structurally equal maps collide
            let mut seen = HashSet::with_capacity(items.len());
            for item in items {
                if !seen.insert(item.to_string()) {
                    return Err(ValidationError::new(ValidationCause::DuplicateValues));
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::schema::CompiledSchema;

    fn items_schema(def: serde_json::Value) -> CompiledSchema {
        let schema = json!({"schema": {"items": def}});
        CompiledSchema::compile(schema.to_string().as_bytes()).unwrap()
    }

    #[test]
    fn uniqueness_is_judged_on_encoded_bytes() {
        let schema = items_schema(json!({"type": "array", "values": "any", "unique": true}));

        let accept = |doc: serde_json::Value| schema.validate(doc.to_string().as_bytes());
        assert!(accept(json!({"items": [1, 1]})).is_err());
        assert!(accept(json!({"items": [1, "1"]})).is_ok());
        assert!(accept(json!({"items": [1, 1.0]})).is_ok());
        assert!(accept(json!({"items": [{"a": 1}, {"a": 1}]})).is_err());
        assert!(accept(json!({"items": [{"a": 1}, {"a": 2}]})).is_ok());
    }

    #[test]
    fn element_failures_carry_the_index() {
        let schema = items_schema(json!({"type": "array", "values": "int"}));
        let err = schema
            .validate(json!({"items": [1, "x"]}).to_string().as_bytes())
            .unwrap_err();
        assert_eq!(err.path_string(), "items[1]");
    }

    #[test]
    fn empty_arrays_are_valid_and_null_is_not() {
        let schema = items_schema(json!({"type": "array", "values": "int", "unique": true}));
        assert!(schema.validate(br#"{"items": []}"#).is_ok());
        assert!(schema.validate(br#"{"items": null}"#).is_err());
    }

    #[test]
    fn values_constraint_is_mandatory() {
        let schema = json!({"schema": {"items": {"type": "array"}}});
        let err = CompiledSchema::compile(schema.to_string().as_bytes()).unwrap_err();
        assert!(matches!(err, CompileError::ArrayMissingValues));
    }
}
