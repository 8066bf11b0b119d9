//! Declarative node-kind schemas for syntax trees.
#![cfg_attr(docsrs, feature(doc_cfg))]
#![allow(clippy::multiple_crate_versions)]

/// Dynamic node data shared by built nodes and raw parser output.
pub mod value;

/// The constraint algebra describing legal field values.
///
/// Constraints name other kinds rather than embedding them, which is what
/// allows recursive and mutually recursive kinds to be declared in any
/// order.
pub mod constraint;

/// The declaration surface used by schema authors.
pub mod decl;

/// The registry of kinds and the inheritance resolver.
///
/// Every other stage reads kinds through this table. A kind's effective
/// fields are its supertypes' fields, left to right, overlaid by its own.
pub mod registry;

/// Builder and validator synthesis.
pub mod synth;

/// Extension layering: plugins loaded once per shared context.
pub mod fork;

/// Shared default values.
pub mod shared;

/// Registry-wide consistency checks.
///
/// Validation catches schema mistakes that lazy resolution would
/// otherwise only surface on first use of the affected kind.
pub mod validate;

/// Serializable kind metadata for traversal and printing back ends.
pub mod describe;

/// Bundled kind sets.
pub mod def;

mod error;

pub use constraint::{Constraint, Depth, KindResolver, Mismatch, Primitive};
pub use decl::{DefaultValue, FieldSpec, KindBuilder};
pub use def::jsx_registry;
pub use describe::{FieldDescriptor, KindDescriptor, SchemaDescriptor};
pub use error::Error;
pub use fork::{Fork, Plugin};
pub use registry::Registry;
pub use shared::{Defaults, Shared};
pub use synth::{Builder, Validator};
pub use validate::validate;
pub use value::{Node, Value};
