//! Builder and validator synthesis.
//!
//! A [`Builder`] constructs nodes of one kind from positional arguments;
//! a [`Validator`] checks whether an arbitrary value already is such a
//! node. Requesting either finalizes the kind.

use crate::constraint::{Depth, KindResolver, Mismatch};
use crate::error::Error;
use crate::registry::{Registry, Resolved};
use crate::value::{Node, Value};

/// Constructs nodes of one finalized kind.
#[derive(Debug, Clone, Copy)]
pub struct Builder<'r> {
    registry: &'r Registry,
    kind: &'r str,
    resolved: &'r Resolved,
    params: &'r [String],
}

/// Checks values against one finalized kind.
#[derive(Debug, Clone, Copy)]
pub struct Validator<'r> {
    registry: &'r Registry,
    kind: &'r str,
}

impl Registry {
    /// Finalizes `kind` and returns its builder.
    ///
    /// # Errors
    ///
    /// Fails if `kind` is undefined or does not resolve, if neither it nor
    /// its primary supertype chain declares build parameters, or if some
    /// field has neither a build parameter nor a default.
    pub fn builder(&self, kind: &str) -> Result<Builder<'_>, Error> {
        let id = self.lookup(kind).ok_or_else(|| Error::UnresolvedReference {
            name: kind.to_owned(),
            referenced_by: None,
        })?;
        let resolved = self.finalize(id)?;
        let params = buildable(kind, resolved)?;
        Ok(Builder {
            registry: self,
            kind: &self.def(id).name,
            resolved,
            params,
        })
    }

    /// Finalizes `kind` and returns its validator.
    ///
    /// # Errors
    ///
    /// Fails if `kind` is undefined or does not resolve.
    pub fn validator(&self, kind: &str) -> Result<Validator<'_>, Error> {
        let id = self.lookup(kind).ok_or_else(|| Error::UnresolvedReference {
            name: kind.to_owned(),
            referenced_by: None,
        })?;
        self.finalize(id)?;
        Ok(Validator {
            registry: self,
            kind: &self.def(id).name,
        })
    }

    /// Shorthand for `self.builder(kind)?.build(args)`.
    ///
    /// # Errors
    ///
    /// See [`Registry::builder`] and [`Builder::build`].
    pub fn build(&self, kind: &str, args: Vec<Value>) -> Result<Node, Error> {
        self.builder(kind)?.build(args)
    }

    /// Shorthand for [`Validator::is_kind`]; `false` if `kind` cannot be
    /// validated at all.
    #[must_use]
    pub fn is_kind(&self, kind: &str, value: &Value) -> bool {
        self.validator(kind).is_ok_and(|v| v.is_kind(value))
    }
}

/// The build parameters of a resolved kind, once every field is known to
/// be reachable.
pub(crate) fn buildable<'a>(kind: &str, resolved: &'a Resolved) -> Result<&'a [String], Error> {
    let params = resolved
        .build_params
        .as_deref()
        .ok_or_else(|| Error::declaration(kind, "kind declares no build parameters"))?;
    if let Some(field) = resolved
        .fields
        .iter()
        .find(|f| f.default().is_none() && !params.iter().any(|p| p == f.name()))
    {
        return Err(Error::declaration(
            kind,
            format!(
                "field '{}' has neither a build parameter nor a default",
                field.name()
            ),
        ));
    }
    Ok(params)
}

impl<'r> Builder<'r> {
    /// The kind this builder constructs.
    #[must_use]
    pub fn kind(&self) -> &'r str {
        self.kind
    }

    /// The positional parameters, in order.
    #[must_use]
    pub fn params(&self) -> &'r [String] {
        self.params
    }

    /// Constructs a node from one argument per build parameter.
    ///
    /// Arguments are assigned first. Remaining fields are then filled from
    /// their defaults in declaration order, each provider seeing the node as
    /// built so far. Finally every field is validated.
    ///
    /// # Errors
    ///
    /// [`Error::Arity`] if `args` does not have exactly one value per
    /// build parameter; [`Error::ConstraintViolation`] for the first field
    /// whose value fails its constraint.
    pub fn build(&self, args: Vec<Value>) -> Result<Node, Error> {
        if args.len() != self.params.len() {
            return Err(Error::Arity {
                kind: self.kind.to_owned(),
                params: self.params.to_vec(),
                got: args.len(),
            });
        }
        self.construct(self.params.iter().cloned().zip(args))
    }

    /// Constructs a node from named field values, defaulting the rest.
    ///
    /// Fields `source` carries that the kind does not declare are ignored.
    ///
    /// # Errors
    ///
    /// [`Error::ConstraintViolation`] if a field without a default is
    /// missing, or for the first field whose value fails its constraint.
    pub fn from_fields(&self, source: &Node) -> Result<Node, Error> {
        let provided = self.resolved.fields.iter().filter_map(|spec| {
            source
                .get(spec.name())
                .map(|value| (spec.name().to_owned(), value.clone()))
        });
        self.construct(provided)
    }

    fn construct(&self, provided: impl IntoIterator<Item = (String, Value)>) -> Result<Node, Error> {
        let mut node = Node::new(self.kind);
        for (name, value) in provided {
            node.set(name, value);
        }

        for spec in &self.resolved.fields {
            if node.has(spec.name()) {
                continue;
            }
            let Some(default) = spec.default() else {
                return Err(Error::ConstraintViolation {
                    kind: self.kind.to_owned(),
                    field: spec.name().to_owned(),
                    expected: spec.constraint().to_string(),
                    actual: "nothing".to_owned(),
                    mismatch: Mismatch::MissingField {
                        kind: self.kind.to_owned(),
                        field: spec.name().to_owned(),
                    },
                });
            };
            let value = default.produce(&node);
            node.set(spec.name(), value);
        }

        let order: Vec<&str> = self.resolved.fields.iter().map(|f| f.name()).collect();
        node.reorder(&order);

        for spec in &self.resolved.fields {
            let Some(value) = node.get(spec.name()) else {
                continue;
            };
            spec.constraint()
                .check(value, self.registry, Depth::Shallow)
                .map_err(|mismatch| Error::ConstraintViolation {
                    kind: self.kind.to_owned(),
                    field: spec.name().to_owned(),
                    expected: spec.constraint().to_string(),
                    actual: value.to_string(),
                    mismatch,
                })?;
        }
        Ok(node)
    }
}

impl<'r> Validator<'r> {
    /// The kind this validator checks.
    #[must_use]
    pub fn kind(&self) -> &'r str {
        self.kind
    }

    /// Returns `true` if `value` is a node of this kind: a node tagged with
    /// this kind or a subtype, or an untagged node whose fields all
    /// satisfy this kind's constraints. An absent field is judged by its
    /// default.
    #[must_use]
    pub fn is_kind(&self, value: &Value) -> bool {
        self.check(value).is_ok()
    }

    /// Like [`Validator::is_kind`], reporting why the value fails.
    ///
    /// # Errors
    ///
    /// Returns the first [`Mismatch`] found.
    pub fn check(&self, value: &Value) -> Result<(), Mismatch> {
        self.registry.check_kind(self.kind, value, Depth::Shallow)
    }

    /// Validates `value` and, recursively, every node inside it field by
    /// field, tagged or not.
    ///
    /// # Errors
    ///
    /// Returns the first [`Mismatch`] found.
    pub fn check_deep(&self, value: &Value) -> Result<(), Mismatch> {
        self.registry.check_kind(self.kind, value, Depth::Deep)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraint::Constraint;
    use crate::decl::DefaultValue;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn points() -> Registry {
        let mut registry = Registry::new();
        registry
            .define("Point")
            .build(&["x", "y"])
            .unwrap()
            .field("x", Constraint::number())
            .unwrap()
            .field("y", Constraint::number())
            .unwrap();
        registry
    }

    #[test]
    fn test_point_builds_and_validates() {
        let registry = points();
        let node = registry.build("Point", vec![3.into(), 4.into()]).unwrap();
        assert_eq!(node.kind(), Some("Point"));
        assert_eq!(node.get("x"), Some(&Value::from(3)));
        assert_eq!(node.get("y"), Some(&Value::from(4)));
        assert!(registry.is_kind("Point", &node.into()));
    }

    #[test]
    fn test_point_arity() {
        let registry = points();
        for args in [vec![], vec![Value::from(3)], vec![3.into(), 4.into(), 5.into()]] {
            let got = args.len();
            match registry.build("Point", args) {
                Err(Error::Arity { kind, params, got: actual }) => {
                    assert_eq!(kind, "Point");
                    assert_eq!(params, ["x", "y"]);
                    assert_eq!(actual, got);
                }
                other => panic!("expected arity error, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_point_constraint_violation_names_field() {
        let registry = points();
        match registry.build("Point", vec![3.into(), "4".into()]) {
            Err(Error::ConstraintViolation {
                kind,
                field,
                expected,
                actual,
                ..
            }) => {
                assert_eq!(kind, "Point");
                assert_eq!(field, "y");
                assert_eq!(expected, "number");
                assert_eq!(actual, "\"4\"");
            }
            other => panic!("expected constraint violation, got {other:?}"),
        }
    }

    #[test]
    fn test_argument_wins_over_default() {
        let mut registry = Registry::new();
        registry
            .define("Flag")
            .build(&["on"])
            .unwrap()
            .field_default("on", Constraint::boolean(), false)
            .unwrap();
        let node = registry.build("Flag", vec![true.into()]).unwrap();
        assert_eq!(node.get("on"), Some(&Value::Bool(true)));
    }

    #[test]
    fn test_computed_defaults_run_in_declaration_order() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut registry = Registry::new();
        let log = Rc::clone(&seen);
        let first = DefaultValue::computed(move |node| {
            log.borrow_mut()
                .push(node.fields().map(|(k, _)| k.to_owned()).collect::<Vec<_>>());
            node.get("base").cloned().unwrap_or(Value::Null)
        });
        let log = Rc::clone(&seen);
        let second = DefaultValue::computed(move |node| {
            log.borrow_mut()
                .push(node.fields().map(|(k, _)| k.to_owned()).collect::<Vec<_>>());
            node.get("first").cloned().unwrap_or(Value::Null)
        });
        registry
            .define("Chain")
            .build(&["base"])
            .unwrap()
            .field_default("first", Constraint::number(), first)
            .unwrap()
            .field_default("second", Constraint::number(), second)
            .unwrap()
            .field("base", Constraint::number())
            .unwrap();

        let node = registry.build("Chain", vec![7.into()]).unwrap();
        assert_eq!(node.get("second"), Some(&Value::from(7)));
        let fields: Vec<_> = node.fields().map(|(k, _)| k).collect();
        assert_eq!(fields, ["first", "second", "base"]);
        assert_eq!(
            *seen.borrow(),
            [vec!["base".to_owned()], vec!["base".to_owned(), "first".to_owned()]]
        );
    }

    #[test]
    fn test_unreachable_field_fails_synthesis() {
        let mut registry = Registry::new();
        registry
            .define("Broken")
            .build(&[])
            .unwrap()
            .field("needed", Constraint::string())
            .unwrap();
        let err = registry.builder("Broken").unwrap_err();
        assert!(err.to_string().contains("'needed'"), "{err}");
    }

    #[test]
    fn test_abstract_kind_has_no_builder() {
        let mut registry = Registry::new();
        registry.define("Abstract").field("a", Constraint::string()).unwrap();
        assert!(registry.builder("Abstract").is_err());
        assert!(registry.validator("Abstract").is_ok());
    }

    #[test]
    fn test_build_params_inherited_from_primary_supertype() {
        let mut registry = points();
        registry
            .define("Point3")
            .bases(&["Point"])
            .unwrap()
            .field_default("z", Constraint::number(), Value::from(0))
            .unwrap();
        let builder = registry.builder("Point3").unwrap();
        assert_eq!(builder.params(), ["x", "y"]);
        let node = builder.build(vec![1.into(), 2.into()]).unwrap();
        assert_eq!(node.get("z"), Some(&Value::from(0)));
        assert!(registry.is_kind("Point", &node.into()));
    }

    #[test]
    fn test_from_fields_defaults_missing() {
        let mut registry = Registry::new();
        registry
            .define("Opt")
            .build(&["value"])
            .unwrap()
            .field("value", Constraint::string())
            .unwrap()
            .field_default("note", Constraint::or([Constraint::string(), Constraint::null()]), Value::Null)
            .unwrap();
        let builder = registry.builder("Opt").unwrap();

        let source = Node::untagged().with("value", "v").with("extra", 1);
        let node = builder.from_fields(&source).unwrap();
        assert_eq!(node.get("note"), Some(&Value::Null));
        assert!(!node.has("extra"));

        let err = builder.from_fields(&Node::untagged()).unwrap_err();
        assert!(matches!(err, Error::ConstraintViolation { ref field, .. } if field == "value"));
    }

    #[test]
    fn test_untagged_node_checked_structurally() {
        let registry = points();
        let validator = registry.validator("Point").unwrap();
        assert!(validator.is_kind(&Node::untagged().with("x", 1).with("y", 2).into()));
        assert!(!validator.is_kind(&Node::untagged().with("x", 1).into()));
        assert_eq!(
            validator.check(&Node::untagged().with("x", 1).with("y", true).into()),
            Err(Mismatch::Field {
                kind: "Point".into(),
                field: "y".into(),
                cause: Box::new(Mismatch::Expected {
                    expected: "number".into(),
                    actual: "true".into(),
                }),
            })
        );
        assert!(!validator.is_kind(&Value::from(1)));
        assert!(!validator.is_kind(&Node::new("Elsewhere").into()));
    }

    #[test]
    fn test_deep_check_descends_into_tagged_children() {
        let mut registry = points();
        registry
            .define("Segment")
            .build(&["from", "to"])
            .unwrap()
            .field("from", Constraint::kind("Point"))
            .unwrap()
            .field("to", Constraint::kind("Point"))
            .unwrap();
        // A tagged but malformed child passes the shallow check only.
        let bogus = Node::new("Point").with("x", "nope");
        let segment: Value = Node::new("Segment")
            .with("from", bogus.clone())
            .with("to", bogus)
            .into();
        let validator = registry.validator("Segment").unwrap();
        assert!(validator.is_kind(&segment));
        assert!(validator.check_deep(&segment).is_err());
    }

    #[test]
    fn test_forward_reference_resolves_later() {
        let mut registry = Registry::new();
        registry
            .define("Tree")
            .build(&["children"])
            .unwrap()
            .field("children", Constraint::array_of(Constraint::kind("Branch")))
            .unwrap();
        let early = Node::new("Branch");
        let children = Value::Array(vec![Value::Node(early.clone())]);
        assert!(registry.build("Tree", vec![children]).is_err());

        registry
            .define("Branch")
            .bases(&["Tree"])
            .unwrap();
        let leaf = registry.build("Branch", vec![Value::Array(vec![])]).unwrap();
        let children = Value::Array(vec![Value::Node(leaf), Value::Node(early)]);
        let tree = registry.build("Tree", vec![children]).unwrap();
        assert!(registry.is_kind("Tree", &tree.into()));
    }
}
