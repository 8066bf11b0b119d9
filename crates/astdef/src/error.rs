//! Errors raised while declaring kinds, synthesizing builders, and
//! constructing nodes.

use crate::constraint::Mismatch;
use thiserror::Error;

/// Every failure the engine can report.
///
/// None of these are recoverable at the point of detection: they describe
/// a malformed schema (fixed by the schema author) or malformed input data
/// (fixed by the caller).
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// A kind was declared inconsistently, or declared after finalization.
    #[error("declaration error in kind '{kind}': {reason}")]
    Declaration {
        /// The kind whose declaration is malformed.
        kind: String,
        /// What is wrong with it.
        reason: String,
    },

    /// A builder was called with the wrong number of positional arguments.
    #[error(
        "builder for '{kind}' takes {} argument(s) ({}), got {got}",
        .params.len(),
        .params.join(", ")
    )]
    Arity {
        /// The kind being built.
        kind: String,
        /// The expected build parameters, in positional order.
        params: Vec<String>,
        /// The number of arguments actually supplied.
        got: usize,
    },

    /// A field value does not satisfy its constraint.
    #[error("field '{field}' of '{kind}' expects {expected}, got {actual}")]
    ConstraintViolation {
        /// The kind being built or checked.
        kind: String,
        /// The offending field.
        field: String,
        /// Rendering of the field's constraint.
        expected: String,
        /// Rendering of the offending value.
        actual: String,
        /// The detailed constraint mismatch.
        mismatch: Mismatch,
    },

    /// A kind name is referenced but was never defined.
    #[error(
        "unresolved kind '{name}'{}",
        .referenced_by
            .as_ref()
            .map(|k| format!(" (referenced by '{k}')"))
            .unwrap_or_default()
    )]
    UnresolvedReference {
        /// The missing kind.
        name: String,
        /// The kind whose declaration references it, if known.
        referenced_by: Option<String>,
    },

    /// A serialized schema descriptor could not be parsed.
    #[error("descriptor parse error: {0}")]
    Descriptor(String),

    /// A plugin could not be loaded into a fork.
    #[error("plugin '{plugin}' failed: {reason}")]
    Plugin {
        /// The plugin's type name.
        plugin: &'static str,
        /// Why loading failed.
        reason: String,
    },
}

impl Error {
    pub(crate) fn declaration(kind: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::Declaration {
            kind: kind.into(),
            reason: reason.into(),
        }
    }
}
