//! Schema compiler and document validator.
//!
//! A schema is itself JSON. Compilation walks it top-down, dispatching on
//! declared type names to build an immutable tree of [`TypeNode`]s
//! bottom-up; validation then walks documents depth-first against that
//! tree, short-circuiting on the first failure.
//!
//! Design notes:
//! - The node set is closed: one enum, matched exhaustively at every
//!   validate/parse site. No runtime type probing.
//! - Named types (`"types"`) compile in declaration order and are
//!   registered before the top level, so `$name` references resolve to
//!   already-compiled nodes; forward references are compile errors.
//! - A [`CompiledSchema`] is write-once and safe for unlimited concurrent
//!   [`CompiledSchema::validate`] calls.

pub mod arr;
pub mod map;
pub mod num;
pub mod str;

use std::sync::Arc;

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use tracing::{debug, trace};

use crate::error::{CompileError, ValidationCause, ValidationError};

pub use arr::ArraySchema;
pub use map::MapSchema;
pub use num::{IntSchema, NumberSchema};
pub use self::str::StringSchema;

// ------------------------------- Grammars --------------------------------- //

/// User-defined type names: lowercase, digits and dashes after the first
/// letter.
static VALID_USER_TYPE_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z][a-z0-9-]*$").expect("static pattern"));

/// Map keys: a letter followed by alphanumerics with single dashes between
/// them. Enforced on schema entries and document keys alike.
static VALID_MAP_KEY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z](?:-?[A-Za-z0-9])*$").expect("static pattern"));

pub(crate) fn valid_map_key(key: &str) -> bool {
    VALID_MAP_KEY.is_match(key)
}

/// JSON kind name used in type-mismatch messages.
pub(crate) fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "map",
    }
}

// --------------------------------- Nodes ---------------------------------- //

/// A compiled validator for one declared type, owning its sub-nodes.
#[derive(Debug, Clone)]
pub enum TypeNode {
    Map(MapSchema),
    Str(StringSchema),
    Int(IntSchema),
    Number(NumberSchema),
    Bool,
    Any,
    Array(ArraySchema),
    Ref(UserRef),
}

impl TypeNode {
    /// Validate an already-parsed JSON value against this node.
    pub fn validate(&self, value: &Value) -> Result<(), ValidationError> {
        match self {
            TypeNode::Map(schema) => schema.validate(value),
            TypeNode::Str(schema) => schema.validate(value),
            TypeNode::Int(schema) => schema.validate(value),
            TypeNode::Number(schema) => schema.validate(value),
            TypeNode::Bool => validate_bool(value),
            TypeNode::Any => validate_any(value),
            TypeNode::Array(schema) => schema.validate(value),
            TypeNode::Ref(reference) => reference.node.validate(value),
        }
    }
}

/// Composite kinds carry their sub-schemas in the constraint object, so a
/// bare type name cannot declare them.
fn kind_expects_constraints(name: &str) -> bool {
    matches!(name, "map" | "array")
}

fn validate_bool(value: &Value) -> Result<(), ValidationError> {
    match value {
        Value::Bool(_) => Ok(()),
        Value::Null => Err(ValidationError::new(ValidationCause::Null("bool"))),
        other => Err(ValidationError::new(ValidationCause::TypeMismatch {
            expected: "bool",
            found: kind_name(other).to_string(),
        })),
    }
}

/// `any` accepts every JSON value except null.
fn validate_any(value: &Value) -> Result<(), ValidationError> {
    match value {
        Value::Null => Err(ValidationError::new(ValidationCause::Null("any"))),
        _ => Ok(()),
    }
}

/// A resolved reference to a user-defined type. Reference sites carry no
/// constraints of their own; those live in the named-type declaration.
#[derive(Debug, Clone)]
pub struct UserRef {
    node: Arc<TypeNode>,

    /// Whether the wrapped node is a plain string schema. A reference to a
    /// reference does not count, even when the chain bottoms out in one.
    string_based: bool,
}

impl UserRef {
    fn new(node: Arc<TypeNode>) -> Self {
        let string_based = matches!(node.as_ref(), TypeNode::Str(_));
        Self { node, string_based }
    }

    /// Consulted when a map's `"keys"` constraint names this type: keys
    /// must resolve to something string-compatible.
    pub(crate) fn is_string_based(&self) -> bool {
        self.string_based
    }
}

// -------------------------------- Compiler -------------------------------- //

/// Compiler state while walking a schema document: the named types
/// registered so far. References resolve against declaration order only.
pub(crate) struct Compiler {
    user_types: IndexMap<String, UserRef>,
}

impl Compiler {
    fn new() -> Self {
        Self {
            user_types: IndexMap::new(),
        }
    }

    /// Parse one type definition: a bare name, or an object whose `"type"`
    /// entry (default `"map"`) selects the kind and whose remaining keys
    /// are kind-specific constraints.
    pub(crate) fn parse(&self, raw: &Value) -> Result<TypeNode, CompileError> {
        match raw {
            Value::Object(def) => {
                let typ = match def.get("type") {
                    None => "map",
                    Some(Value::String(typ)) => typ.as_str(),
                    Some(_) => return Err(CompileError::TypeFieldNotString),
                };

                match typ {
                    "map" => Ok(TypeNode::Map(MapSchema::parse(self, def)?)),
                    "string" => Ok(TypeNode::Str(StringSchema::parse(def)?)),
                    "int" => Ok(TypeNode::Int(IntSchema::parse(def)?)),
                    "number" => Ok(TypeNode::Number(NumberSchema::parse(def)?)),
                    // bool and any take no constraints; unrecognized keys
                    // are ignored rather than rejected
                    "bool" => Ok(TypeNode::Bool),
                    "any" => Ok(TypeNode::Any),
                    "array" => Ok(TypeNode::Array(ArraySchema::parse(self, def)?)),
                    other => {
                        let reference = self.user_ref(other)?;
                        // a reference site cannot restate or extend the
                        // named type's constraints
                        if def.keys().any(|key| key != "type") {
                            return Err(CompileError::RefWithConstraints(other.to_string()));
                        }
                        Ok(TypeNode::Ref(reference))
                    }
                }
            }
            Value::String(name) => {
                if kind_expects_constraints(name) {
                    return Err(CompileError::ExpectedConstraints(name.clone()));
                }
                match name.as_str() {
                    "string" => Ok(TypeNode::Str(StringSchema::default())),
                    "int" => Ok(TypeNode::Int(IntSchema::default())),
                    "number" => Ok(TypeNode::Number(NumberSchema::default())),
                    "bool" => Ok(TypeNode::Bool),
                    "any" => Ok(TypeNode::Any),
                    other => Ok(TypeNode::Ref(self.user_ref(other)?)),
                }
            }
            _ => Err(CompileError::TypeDefinitionShape),
        }
    }

    /// Resolve a `$name` reference against the registered user types.
    pub(crate) fn user_ref(&self, typ: &str) -> Result<UserRef, CompileError> {
        let Some(name) = typ.strip_prefix('$') else {
            return Err(CompileError::UnknownType(typ.to_string()));
        };
        self.user_types
            .get(name)
            .cloned()
            .ok_or_else(|| CompileError::UnknownUserType(name.to_string()))
    }
}

// --------------------------------- Facade --------------------------------- //

/// A compiled schema: the top-level map node plus the named-type table.
/// Immutable after [`CompiledSchema::compile`]; share freely across threads
/// for concurrent validation.
#[derive(Debug)]
pub struct CompiledSchema {
    top_level: TypeNode,
    user_types: IndexMap<String, UserRef>,
}

impl CompiledSchema {
    /// Compile raw schema bytes. The top level must be a JSON object with a
    /// `"schema"` constraint; `"type"`, if present, must be `"map"`; an
    /// optional `"types"` object declares named reusable types.
    pub fn compile(raw: &[u8]) -> Result<Self, CompileError> {
        let document: Value =
            serde_json::from_slice(raw).map_err(CompileError::TopLevelDecode)?;
        let Value::Object(def) = &document else {
            return Err(CompileError::TopLevelNotMap);
        };

        match def.get("type") {
            None => {}
            Some(Value::String(typ)) if typ == "map" => {}
            Some(Value::String(typ)) => return Err(CompileError::TopLevelType(typ.clone())),
            Some(_) => return Err(CompileError::TopLevelTypeNotString),
        }

        if !def.contains_key("schema") {
            return Err(CompileError::TopLevelMissingSchema);
        }

        let mut compiler = Compiler::new();
        if let Some(types) = def.get("types") {
            let Value::Object(types) = types else {
                return Err(CompileError::UserTypesShape);
            };
            for (name, type_def) in types {
                if !VALID_USER_TYPE_NAME.is_match(name) {
                    return Err(CompileError::UserTypeName(name.clone()));
                }
                let node = compiler
                    .parse(type_def)
                    .map_err(|source| CompileError::UserType {
                        name: name.clone(),
                        source: Box::new(source),
                    })?;
                trace!(name = name.as_str(), "registered user-defined type");
                compiler
                    .user_types
                    .insert(name.clone(), UserRef::new(Arc::new(node)));
            }
        }

        let top_level = compiler.parse(&document)?;
        debug!(user_types = compiler.user_types.len(), "schema compiled");

        Ok(Self {
            top_level,
            user_types: compiler.user_types,
        })
    }

    /// Validate raw document bytes against the compiled schema, reporting
    /// the first offending element found during a depth-first walk.
    pub fn validate(&self, raw: &[u8]) -> Result<(), ValidationError> {
        let value: Value = serde_json::from_slice(raw).map_err(|err| {
            ValidationError::new(ValidationCause::InvalidDocument(err.to_string()))
        })?;
        self.top_level.validate(&value)
    }

    /// Names of the user-defined types this schema declares, in declaration
    /// order.
    pub fn user_type_names(&self) -> impl Iterator<Item = &str> {
        self.user_types.keys().map(String::as_str)
    }
}

// --------------------------------- Tests ---------------------------------- //
