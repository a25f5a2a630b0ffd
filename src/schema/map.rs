//! Map nodes: the composite at the heart of every schema.
//!
//! A map definition takes exactly one of two shapes:
//! - *exact*: a `"schema"` table naming each permitted key and its entry
//!   type, optionally with `"required"` key-set alternatives;
//! - *pattern*: `"keys"`/`"values"` types that every entry must satisfy.
//!
//! Keys must conform to the key grammar in both shapes, at compile time and
//! at validation time, regardless of any declared key schema.

use indexmap::IndexMap;
use serde_json::{Map, Value};

use super::{Compiler, StringSchema, TypeNode, kind_name, valid_map_key};
use crate::error::{CompileError, ValidationCause, ValidationError};

#[derive(Debug, Clone)]
pub struct MapSchema {
    /// Exact shape: permitted keys and their entry types.
    entry_schemas: Option<IndexMap<String, TypeNode>>,

    /// Pattern shape: every key must satisfy this string-based type.
    key_schema: Option<Box<TypeNode>>,

    /// Pattern shape: every value must satisfy this type.
    value_schema: Option<Box<TypeNode>>,

    /// Alternative key-sets; an instance must fully contain at least one.
    /// Empty means no requirement.
    required_combs: Vec<Vec<String>>,
}

impl MapSchema {
    pub(crate) fn parse(
        compiler: &Compiler,
        def: &Map<String, Value>,
    ) -> Result<Self, CompileError> {
        check_exclusive_constraints(def)?;

        if let Some(raw) = def.get("schema") {
            let Value::Object(entries) = raw else {
                return Err(CompileError::Constraint {
                    field: "schema",
                    detail: "must be a map from keys to types".into(),
                });
            };

            let mut entry_schemas = IndexMap::with_capacity(entries.len());
            for (key, entry_def) in entries {
                if !valid_map_key(key) {
                    return Err(CompileError::MapKeyFormat(key.clone()));
                }
                entry_schemas.insert(key.clone(), compiler.parse(entry_def)?);
            }

            let required_combs = match def.get("required") {
                None => Vec::new(),
                Some(raw) => parse_required(raw)?,
            };
            for comb in &required_combs {
                for key in comb {
                    if !entry_schemas.contains_key(key) {
                        return Err(CompileError::RequiredKeyWithoutEntry(key.clone()));
                    }
                }
            }

            return Ok(Self {
                entry_schemas: Some(entry_schemas),
                key_schema: None,
                value_schema: None,
                required_combs,
            });
        }

        let key_schema = match def.get("keys") {
            None => None,
            Some(raw) => {
                let key_type = parse_key_type(compiler, raw)
                    .map_err(|err| CompileError::KeysConstraint(Box::new(err)))?;
                Some(Box::new(key_type))
            }
        };

        let value_schema = match def.get("values") {
            None => None,
            Some(raw) => Some(Box::new(compiler.parse(raw)?)),
        };

        if key_schema.is_none() && value_schema.is_none() {
            return Err(CompileError::MapMissingConstraints);
        }

        Ok(Self {
            entry_schemas: None,
            key_schema,
            value_schema,
            required_combs: Vec::new(),
        })
    }

    pub(crate) fn validate(&self, value: &Value) -> Result<(), ValidationError> {
        let entries = match value {
            Value::Object(entries) => entries,
            Value::Null => return Err(ValidationError::new(ValidationCause::Null("map"))),
            other => {
                return Err(ValidationError::new(ValidationCause::TypeMismatch {
                    expected: "map",
                    found: kind_name(other).to_string(),
                }));
            }
        };

        for key in entries.keys() {
            if !valid_map_key(key) {
                return Err(ValidationError::new(ValidationCause::KeyFormat(
                    key.clone(),
                )));
            }
        }

        if let Some(entry_schemas) = &self.entry_schemas {
            for key in entries.keys() {
                if !entry_schemas.contains_key(key) {
                    return Err(ValidationError::new(ValidationCause::UnexpectedKey(
                        key.clone(),
                    )));
                }
            }
        }

        let satisfied = self
            .required_combs
            .iter()
            .any(|comb| comb.iter().all(|key| entries.contains_key(key)));
        if !self.required_combs.is_empty() && !satisfied {
            return Err(ValidationError::new(ValidationCause::MissingRequiredKeys));
        }

        if let Some(entry_schemas) = &self.entry_schemas {
            for (key, entry) in entries {
                if let Some(schema) = entry_schemas.get(key) {
                    schema.validate(entry).map_err(|err| err.in_key(key))?;
                }
            }
            return Ok(());
        }

        if let Some(key_schema) = &self.key_schema {
            for key in entries.keys() {
                let encoded = Value::String(key.clone());
                key_schema
                    .validate(&encoded)
                    .map_err(|err| err.in_key(key))?;
            }
        }

        if let Some(value_schema) = &self.value_schema {
            for (key, entry) in entries {
                value_schema
                    .validate(entry)
                    .map_err(|err| err.in_key(key))?;
            }
        }

        Ok(())
    }
}

fn check_exclusive_constraints(def: &Map<String, Value>) -> Result<(), CompileError> {
    if def.contains_key("required") && !def.contains_key("schema") {
        return Err(CompileError::RequiredWithoutSchema);
    }
    if def.contains_key("schema") && def.contains_key("keys") {
        return Err(CompileError::ExclusiveMapConstraints("keys"));
    }
    if def.contains_key("schema") && def.contains_key("values") {
        return Err(CompileError::ExclusiveMapConstraints("values"));
    }
    Ok(())
}

/// `"required"` is either a flat list of keys (one required set) or a list
/// of lists (alternative sets).
fn parse_required(raw: &Value) -> Result<Vec<Vec<String>>, CompileError> {
    if let Ok(combs) = serde_json::from_value::<Vec<Vec<String>>>(raw.clone()) {
        return Ok(combs);
    }
    match serde_json::from_value::<Vec<String>>(raw.clone()) {
        Ok(single) => Ok(vec![single]),
        Err(err) => Err(CompileError::Constraint {
            field: "required",
            detail: err.to_string(),
        }),
    }
}

/// A `"keys"` type must resolve to something string-based: the bare name
/// `string`, an inline string definition, or a string-based user type.
fn parse_key_type(compiler: &Compiler, raw: &Value) -> Result<TypeNode, CompileError> {
    match raw {
        Value::String(typ) if typ == "string" => Ok(TypeNode::Str(StringSchema::default())),
        Value::String(typ) if typ.starts_with('$') => {
            let reference = compiler.user_ref(typ)?;
            if !reference.is_string_based() {
                return Err(CompileError::KeyTypeNotStringBased(
                    typ.trim_start_matches('$').to_string(),
                ));
            }
            Ok(TypeNode::Ref(reference))
        }
        Value::String(typ) => Err(CompileError::KeyTypeNotString(typ.clone())),
        Value::Object(def) => {
            match def.get("type") {
                None => {}
                Some(Value::String(typ)) if typ == "string" => {}
                Some(Value::String(typ)) => {
                    return Err(CompileError::KeyTypeNotString(typ.clone()));
                }
                Some(_) => return Err(CompileError::TypeFieldNotString),
            }
            Ok(TypeNode::Str(StringSchema::parse(def)?))
        }
        _ => Err(CompileError::TypeDefinitionShape),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::schema::CompiledSchema;

    fn compile(schema: serde_json::Value) -> Result<CompiledSchema, CompileError> {
        CompiledSchema::compile(schema.to_string().as_bytes())
    }

    fn check(schema: &CompiledSchema, doc: serde_json::Value) -> Result<(), ValidationError> {
        schema.validate(doc.to_string().as_bytes())
    }

    #[test]
    fn exact_shape_rejects_unexpected_keys() {
        let schema = compile(json!({"schema": {"a": "int"}})).unwrap();
        assert!(check(&schema, json!({"a": 1})).is_ok());

        let err = check(&schema, json!({"a": 1, "b": 2})).unwrap_err();
        assert_eq!(
            err.cause().to_string(),
            r#"map contains unexpected key "b""#
        );
    }

    #[test]
    fn required_alternatives_need_one_full_set() {
        let schema = compile(json!({
            "schema": {"A": "int", "B": "int", "C": "int"},
            "required": [["A"], ["B", "C"]]
        }))
        .unwrap();

        assert!(check(&schema, json!({"A": 1})).is_ok());
        assert!(check(&schema, json!({"B": 1, "C": 1})).is_ok());
        assert!(check(&schema, json!({"B": 1})).is_err());
        assert!(check(&schema, json!({})).is_err());
    }

    #[test]
    fn flat_required_list_is_a_single_set() {
        let schema = compile(json!({
            "schema": {"a": "int", "b": "int"},
            "required": ["a", "b"]
        }))
        .unwrap();

        assert!(check(&schema, json!({"a": 1, "b": 2})).is_ok());
        assert!(check(&schema, json!({"a": 1})).is_err());
    }

    #[test]
    fn required_keys_must_have_entries() {
        let err = compile(json!({
            "schema": {"a": "int"},
            "required": ["a", "b"]
        }))
        .unwrap_err();
        assert!(matches!(err, CompileError::RequiredKeyWithoutEntry(key) if key == "b"));
    }

    #[test]
    fn constraint_shapes_are_mutually_exclusive() {
        let inner = json!({"type": "map", "required": ["a"]});
        let err = compile(json!({"schema": {"m": inner}})).unwrap_err();
        assert!(matches!(err, CompileError::RequiredWithoutSchema));

        let inner = json!({"type": "map", "schema": {"a": "int"}, "keys": "string"});
        let err = compile(json!({"schema": {"m": inner}})).unwrap_err();
        assert!(matches!(err, CompileError::ExclusiveMapConstraints("keys")));

        let inner = json!({"type": "map", "schema": {"a": "int"}, "values": "int"});
        let err = compile(json!({"schema": {"m": inner}})).unwrap_err();
        assert!(matches!(err, CompileError::ExclusiveMapConstraints("values")));

        let inner = json!({"type": "map"});
        let err = compile(json!({"schema": {"m": inner}})).unwrap_err();
        assert!(matches!(err, CompileError::MapMissingConstraints));
    }

    #[test]
    fn pattern_shape_checks_keys_and_values() {
        let inner = json!({"type": "map", "keys": {"pattern": "^snap-"}, "values": "int"});
        let schema = compile(json!({"schema": {"m": inner}})).unwrap();

        assert!(check(&schema, json!({"m": {"snap-a": 1}})).is_ok());

        let err = check(&schema, json!({"m": {"other": 1}})).unwrap_err();
        assert_eq!(err.path_string(), "m.other");

        let err = check(&schema, json!({"m": {"snap-a": "x"}})).unwrap_err();
        assert_eq!(err.path_string(), "m.snap-a");
    }

    #[test]
    fn document_keys_must_match_the_key_grammar() {
        let inner = json!({"type": "map", "values": "any"});
        let schema = compile(json!({"schema": {"m": inner}})).unwrap();

        assert!(check(&schema, json!({"m": {"ok-key": 1}})).is_ok());
        for bad in ["has space", "_lead", "1num", "trail-", "a--b"] {
            let err = check(&schema, json!({"m": {bad: 1}})).unwrap_err();
            assert_eq!(
                err.cause().to_string(),
                format!(r#"key "{bad}" doesn't conform to required format"#),
                "key {bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn schema_entry_keys_obey_the_same_grammar() {
        let err = compile(json!({"schema": {"bad key": "int"}})).unwrap_err();
        assert!(matches!(err, CompileError::MapKeyFormat(key) if key == "bad key"));
    }

    #[test]
    fn inline_key_definitions_must_be_string_based() {
        let inner = json!({"type": "map", "keys": {"type": "int"}});
        let err = compile(json!({"schema": {"m": inner}})).unwrap_err();
        let CompileError::KeysConstraint(inner_err) = err else {
            panic!("expected keys constraint error");
        };
        assert!(matches!(*inner_err, CompileError::KeyTypeNotString(typ) if typ == "int"));
    }
}
