//! JSON schema compiler and validator for structured configuration data.
//!
//! A schema is itself a JSON document: a top-level map of entry
//! constraints, optionally preceded by reusable named types referenced as
//! `$name`. [`CompiledSchema::compile`] turns it into an immutable node
//! tree; [`CompiledSchema::validate`] checks documents against that tree,
//! reporting the first offending element together with a key/index path.
//!
//! ```
//! use cfgschema::CompiledSchema;
//!
//! let schema = CompiledSchema::compile(br#"{
//!     "types": { "port": { "type": "int", "min": 1, "max": 65535 } },
//!     "schema": { "listen": "$port" }
//! }"#)?;
//!
//! assert!(schema.validate(br#"{ "listen": 8080 }"#).is_ok());
//!
//! let err = schema.validate(br#"{ "listen": 0 }"#).unwrap_err();
//! assert_eq!(err.path_string(), "listen");
//! # Ok::<(), cfgschema::CompileError>(())
//! ```
//!
//! Compilation and validation are synchronous and pure-CPU. A compiled
//! schema is read-only, so any number of threads may validate against it
//! concurrently. Recursion depth follows schema/document nesting with no
//! internal bound; callers handling adversarial input must cap nesting
//! themselves.

pub mod error;
pub mod schema;

pub use error::{CompileError, PathSegment, ValidationCause, ValidationError};
pub use schema::CompiledSchema;
