//! Compile-time and validation-time failures.
//!
//! Two disjoint classes, never mixed:
//! - [`CompileError`]: the schema itself is unusable; always fatal, no
//!   partial schema is ever produced.
//! - [`ValidationError`]: a document failed a compiled schema; carries an
//!   explicit key/index path to the first offending element, built up by
//!   each composite node as the error propagates outward.

use std::fmt;

use thiserror::Error;

// ----------------------------- Compile errors ----------------------------- //

#[derive(Debug, Error)]
pub enum CompileError {
    #[error("cannot parse top level schema as map: {0}")]
    TopLevelDecode(serde_json::Error),

    #[error("cannot parse top level schema as map: not a JSON object")]
    TopLevelNotMap,

    #[error(r#"cannot parse top level schema's "type" entry: must be a string"#)]
    TopLevelTypeNotString,

    #[error(r#"cannot parse top level schema: unexpected declared type "{0}", should be "map" or omitted"#)]
    TopLevelType(String),

    #[error(r#"cannot parse top level schema: must have a "schema" constraint"#)]
    TopLevelMissingSchema,

    #[error("cannot parse user-defined types map: must be a map from type names to definitions")]
    UserTypesShape,

    #[error(r#"cannot parse user-defined type name "{0}": must match ^[a-z][a-z0-9-]*$"#)]
    UserTypeName(String),

    #[error(r#"cannot parse user-defined type "{name}": {source}"#)]
    UserType {
        name: String,
        #[source]
        source: Box<CompileError>,
    },

    #[error("cannot parse type definition: must be expressed as a map or a string")]
    TypeDefinitionShape,

    #[error(r#"cannot parse "type" constraint in type definition: must be a string"#)]
    TypeFieldNotString,

    #[error(r#"cannot parse unknown type "{0}""#)]
    UnknownType(String),

    #[error(r#"cannot find user-defined type "{0}""#)]
    UnknownUserType(String),

    #[error(r#"cannot parse "{0}": must be schema definition with constraints"#)]
    ExpectedConstraints(String),

    #[error(r#"user type reference "{0}" cannot carry inline constraints"#)]
    RefWithConstraints(String),

    /// Catch-all for a constraint whose value has the wrong shape.
    #[error(r#"cannot parse "{field}" constraint: {detail}"#)]
    Constraint {
        field: &'static str,
        detail: String,
    },

    #[error(r#"cannot parse map: cannot use "required" without "schema" constraint"#)]
    RequiredWithoutSchema,

    #[error(r#"cannot parse map: cannot use "schema" and "{0}" constraints simultaneously"#)]
    ExclusiveMapConstraints(&'static str),

    #[error(r#"cannot parse map: key "{0}" doesn't conform to required format"#)]
    MapKeyFormat(String),

    #[error(r#"cannot parse map's "required" constraint: required key "{0}" must have schema entry"#)]
    RequiredKeyWithoutEntry(String),

    #[error(r#"cannot parse map: must have "schema" or "keys"/"values" constraint"#)]
    MapMissingConstraints,

    #[error(r#"cannot parse "keys" constraint: {0}"#)]
    KeysConstraint(#[source] Box<CompileError>),

    #[error(r#"keys must be based on string but got "{0}""#)]
    KeyTypeNotString(String),

    #[error(r#"key type "{0}" must be based on string"#)]
    KeyTypeNotStringBased(String),

    #[error(r#"cannot have a "choices" constraint with an empty list"#)]
    EmptyChoices,

    #[error(r#"cannot use "choices" and "{0}" constraints in same schema"#)]
    ChoicesExclusive(&'static str),

    #[error(r#"cannot have "min" constraint with value greater than "max""#)]
    MinGreaterThanMax,

    #[error(r#"cannot parse "array": must have "values" constraint"#)]
    ArrayMissingValues,

    #[error(r#"cannot parse "array" values type: {0}"#)]
    ArrayValuesType(#[source] Box<CompileError>),
}

// ---------------------------- Validation errors --------------------------- //

/// One step of the path locating a failing element: a map key or an array
/// index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

/// Why a single element failed validation.
#[derive(Debug, Error)]
pub enum ValidationCause {
    /// The document bytes were not valid JSON.
    #[error("{0}")]
    InvalidDocument(String),

    #[error("expected {expected} type but got {found}")]
    TypeMismatch {
        expected: &'static str,
        found: String,
    },

    #[error(r#"cannot accept null value for "{0}" type"#)]
    Null(&'static str),

    #[error(r#"string "{0}" is not one of the allowed choices"#)]
    StringChoice(String),

    #[error("{0} is not one of the allowed choices")]
    NumberChoice(String),

    #[error(r#"string "{value}" doesn't match schema pattern {pattern}"#)]
    PatternMismatch { value: String, pattern: String },

    #[error("{value} is less than the allowed minimum {min}")]
    BelowMinimum { value: String, min: String },

    #[error("{value} is greater than the allowed maximum {max}")]
    AboveMaximum { value: String, max: String },

    #[error(r#"key "{0}" doesn't conform to required format"#)]
    KeyFormat(String),

    #[error(r#"map contains unexpected key "{0}""#)]
    UnexpectedKey(String),

    #[error("cannot find required combinations of keys")]
    MissingRequiredKeys,

    #[error(r#"cannot accept duplicate values for array with "unique" constraint"#)]
    DuplicateValues,
}

/// A document failed validation. The path locates the offending element;
/// an empty path means the top-level value itself was rejected.
#[derive(Debug)]
pub struct ValidationError {
    path: Vec<PathSegment>,
    cause: ValidationCause,
}

impl ValidationError {
    pub(crate) fn new(cause: ValidationCause) -> Self {
        Self {
            path: Vec::new(),
            cause,
        }
    }

    /// Prefix the path with the map key under which the failure occurred.
    pub(crate) fn in_key(mut self, key: &str) -> Self {
        self.path.insert(0, PathSegment::Key(key.to_string()));
        self
    }

    /// Prefix the path with the array index under which the failure occurred.
    pub(crate) fn in_index(mut self, index: usize) -> Self {
        self.path.insert(0, PathSegment::Index(index));
        self
    }

    pub fn path(&self) -> &[PathSegment] {
        &self.path
    }

    pub fn cause(&self) -> &ValidationCause {
        &self.cause
    }

    /// Dot/bracket rendering of the path, e.g. `a.b[2]`. Empty for a
    /// top-level failure.
    pub fn path_string(&self) -> String {
        use std::fmt::Write;

        let mut out = String::new();
        for (i, segment) in self.path.iter().enumerate() {
            match segment {
                PathSegment::Key(key) => {
                    if i > 0 {
                        out.push('.');
                    }
                    out.push_str(key);
                }
                PathSegment::Index(index) => {
                    let _ = write!(out, "[{index}]");
                }
            }
        }
        out
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            write!(f, "cannot accept top level element: {}", self.cause)
        } else {
            write!(
                f,
                "cannot accept element in {:?}: {}",
                self.path_string(),
                self.cause
            )
        }
    }
}

impl std::error::Error for ValidationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.cause)
    }
}
