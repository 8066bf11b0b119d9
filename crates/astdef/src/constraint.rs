//! The type-constraint algebra.
//!
//! A [`Constraint`] describes which values may occupy a field. The set of
//! variants is closed and matched exhaustively. References to other kinds
//! are stored by name and resolved through a [`KindResolver`] at check
//! time, so a constraint may name a kind that is declared later, or that
//! refers back to the kind holding the field.

use crate::value::Value;
use std::fmt;

/// The primitive semantic types a field may require.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Primitive {
    /// A string.
    String,
    /// A boolean.
    Boolean,
    /// A number.
    Number,
}

impl Primitive {
    /// Returns `true` if `value` has this primitive type.
    #[must_use]
    pub fn admits(self, value: &Value) -> bool {
        matches!(
            (self, value),
            (Primitive::String, Value::String(_))
                | (Primitive::Boolean, Value::Bool(_))
                | (Primitive::Number, Value::Number(_))
        )
    }

    /// The canonical lowercase name of this primitive.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Primitive::String => "string",
            Primitive::Boolean => "boolean",
            Primitive::Number => "number",
        }
    }
}

/// What values a field accepts.
#[derive(Debug, Clone, PartialEq)]
pub enum Constraint {
    /// A node of the named kind or of any of its subtypes.
    Kind(String),
    /// A value of a primitive type.
    Primitive(Primitive),
    /// Exactly this value.
    Literal(Value),
    /// Any of the alternatives, tried in order.
    Union(Vec<Constraint>),
    /// An array whose every element satisfies the inner constraint.
    ArrayOf(Box<Constraint>),
}

/// How far [`Constraint::check`] descends into tagged nested nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Depth {
    /// A tagged nested node is accepted when its tag names the expected
    /// kind or a subtype of it. Untagged nodes are always checked field by
    /// field.
    #[default]
    Shallow,
    /// Tagged nested nodes are also checked field by field.
    Deep,
}

/// Resolves kind references on behalf of [`Constraint::check`].
pub trait KindResolver {
    /// Checks `value` against the kind called `kind`.
    ///
    /// # Errors
    ///
    /// Returns a [`Mismatch`] describing why `value` is not such a node,
    /// including [`Mismatch::Unresolved`] if no such kind exists.
    fn check_kind(&self, kind: &str, value: &Value, depth: Depth) -> Result<(), Mismatch>;
}

/// Why a value failed a constraint.
#[derive(Debug, Clone, PartialEq)]
pub enum Mismatch {
    /// The value is of the wrong shape.
    Expected {
        /// Rendering of what was expected.
        expected: String,
        /// Rendering of the value found.
        actual: String,
    },
    /// No alternative of a union accepted the value.
    NoAlternative {
        /// Rendering of every alternative tried, in order.
        alternatives: Vec<String>,
        /// Rendering of the value found.
        actual: String,
    },
    /// An array element failed.
    Element {
        /// Index of the first failing element.
        index: usize,
        /// Why it failed.
        cause: Box<Mismatch>,
    },
    /// A field of a structurally checked node failed.
    Field {
        /// The kind whose field failed.
        kind: String,
        /// The field name.
        field: String,
        /// Why it failed.
        cause: Box<Mismatch>,
    },
    /// A structurally checked node lacks a field.
    MissingField {
        /// The kind that declares the field.
        kind: String,
        /// The field name.
        field: String,
    },
    /// The referenced kind does not exist.
    Unresolved {
        /// The missing kind's name.
        kind: String,
    },
    /// The referenced kind exists but its definition cannot be resolved.
    Malformed {
        /// The kind that failed to resolve.
        kind: String,
        /// The resolution error.
        reason: String,
    },
}

impl Constraint {
    /// A reference to another kind, by name.
    #[must_use]
    pub fn kind(name: impl Into<String>) -> Self {
        Constraint::Kind(name.into())
    }

    /// Any string.
    #[must_use]
    pub fn string() -> Self {
        Constraint::Primitive(Primitive::String)
    }

    /// Any boolean.
    #[must_use]
    pub fn boolean() -> Self {
        Constraint::Primitive(Primitive::Boolean)
    }

    /// Any number.
    #[must_use]
    pub fn number() -> Self {
        Constraint::Primitive(Primitive::Number)
    }

    /// The `null` literal.
    #[must_use]
    pub fn null() -> Self {
        Constraint::Literal(Value::Null)
    }

    /// Exactly `value`.
    #[must_use]
    pub fn literal(value: impl Into<Value>) -> Self {
        Constraint::Literal(value.into())
    }

    /// Any of `alternatives`, first match wins.
    #[must_use]
    pub fn or(alternatives: impl IntoIterator<Item = Constraint>) -> Self {
        Constraint::Union(alternatives.into_iter().collect())
    }

    /// An array of `element`.
    #[must_use]
    pub fn array_of(element: Constraint) -> Self {
        Constraint::ArrayOf(Box::new(element))
    }

    /// Returns `true` if `value` satisfies this constraint. Never fails.
    #[must_use]
    pub fn matches(&self, value: &Value, resolver: &impl KindResolver) -> bool {
        self.check(value, resolver, Depth::Shallow).is_ok()
    }

    /// Checks `value` against this constraint.
    ///
    /// # Errors
    ///
    /// Returns the first [`Mismatch`] encountered.
    pub fn check(
        &self,
        value: &Value,
        resolver: &impl KindResolver,
        depth: Depth,
    ) -> Result<(), Mismatch> {
        match self {
            Constraint::Kind(name) => resolver.check_kind(name, value, depth),
            Constraint::Primitive(primitive) => {
                if primitive.admits(value) {
                    Ok(())
                } else {
                    Err(self.expected(value))
                }
            }
            Constraint::Literal(literal) => {
                if literal == value {
                    Ok(())
                } else {
                    Err(self.expected(value))
                }
            }
            Constraint::Union(alternatives) => {
                if alternatives
                    .iter()
                    .any(|alt| alt.check(value, resolver, depth).is_ok())
                {
                    Ok(())
                } else {
                    Err(Mismatch::NoAlternative {
                        alternatives: alternatives.iter().map(ToString::to_string).collect(),
                        actual: value.to_string(),
                    })
                }
            }
            Constraint::ArrayOf(element) => {
                let Value::Array(items) = value else {
                    return Err(self.expected(value));
                };
                for (index, item) in items.iter().enumerate() {
                    element
                        .check(item, resolver, depth)
                        .map_err(|cause| Mismatch::Element {
                            index,
                            cause: Box::new(cause),
                        })?;
                }
                Ok(())
            }
        }
    }

    /// Number of alternatives, recursively through unions, that accept
    /// `null`.
    pub(crate) fn null_alternatives(&self) -> usize {
        match self {
            Constraint::Literal(Value::Null) => 1,
            Constraint::Union(alternatives) => {
                alternatives.iter().map(Constraint::null_alternatives).sum()
            }
            Constraint::Kind(_)
            | Constraint::Primitive(_)
            | Constraint::Literal(_)
            | Constraint::ArrayOf(_) => 0,
        }
    }

    /// Calls `visit` with every kind name this constraint references.
    pub(crate) fn each_kind_ref<'a>(&'a self, visit: &mut impl FnMut(&'a str)) {
        match self {
            Constraint::Kind(name) => visit(name),
            Constraint::Union(alternatives) => {
                for alt in alternatives {
                    alt.each_kind_ref(visit);
                }
            }
            Constraint::ArrayOf(element) => element.each_kind_ref(visit),
            Constraint::Primitive(_) | Constraint::Literal(_) => {}
        }
    }

    fn expected(&self, value: &Value) -> Mismatch {
        Mismatch::Expected {
            expected: self.to_string(),
            actual: value.to_string(),
        }
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Constraint::Kind(name) => write!(f, "{name}"),
            Constraint::Primitive(primitive) => write!(f, "{}", primitive.name()),
            Constraint::Literal(value) => write!(f, "{value}"),
            Constraint::Union(alternatives) => {
                for (i, alt) in alternatives.iter().enumerate() {
                    if i > 0 {
                        write!(f, " | ")?;
                    }
                    write!(f, "{alt}")?;
                }
                Ok(())
            }
            Constraint::ArrayOf(element) => write!(f, "[{element}]"),
        }
    }
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Mismatch::Expected { expected, actual } => {
                write!(f, "expected {expected}, got {actual}")
            }
            Mismatch::NoAlternative {
                alternatives,
                actual,
            } => write!(
                f,
                "{actual} matches none of: {}",
                alternatives.join(", ")
            ),
            Mismatch::Element { index, cause } => write!(f, "element {index}: {cause}"),
            Mismatch::Field { kind, field, cause } => write!(f, "{kind}.{field}: {cause}"),
            Mismatch::MissingField { kind, field } => {
                write!(f, "missing field '{field}' of '{kind}'")
            }
            Mismatch::Unresolved { kind } => write!(f, "unresolved kind '{kind}'"),
            Mismatch::Malformed { kind, reason } => write!(f, "kind '{kind}' is malformed: {reason}"),
        }
    }
}
