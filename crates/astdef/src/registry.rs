//! The kind registry and inheritance resolver.
//!
//! Definitions live in an arena indexed by position; everything else,
//! including supertype lists and [`Constraint::Kind`](crate::Constraint::Kind)
//! references, names kinds by string and is resolved against the arena on
//! demand. That is what lets kinds refer to each other in any order.

use crate::constraint::{Depth, KindResolver, Mismatch};
use crate::decl::{FieldSpec, KindBuilder};
use crate::error::Error;
use crate::value::{Node, Value};
use std::borrow::Cow;
use std::cell::OnceCell;
use std::collections::HashMap;
use tracing::{debug, trace};

/// Index of a kind in its [`Registry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct KindId(usize);

/// A kind as declared, before inheritance is applied.
#[derive(Debug, Clone)]
pub(crate) struct KindDef {
    pub(crate) name: String,
    pub(crate) supertypes: Vec<String>,
    pub(crate) fields: Vec<FieldSpec>,
    pub(crate) build_params: Option<Vec<String>>,
    pub(crate) finalized: OnceCell<Resolved>,
}

/// A kind with inheritance applied.
#[derive(Debug, Clone)]
pub(crate) struct Resolved {
    /// Effective fields in declaration order.
    pub(crate) fields: Vec<FieldSpec>,
    /// The kind itself, then every supertype depth-first, without repeats.
    pub(crate) ancestors: Vec<String>,
    pub(crate) build_params: Option<Vec<String>>,
}

impl Resolved {
    pub(crate) fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name() == name)
    }
}

/// The table of every kind known to a loading context.
///
/// Kinds are only ever added. A kind becomes immutable once finalized,
/// which happens the first time a builder or validator is requested for
/// it or for one of its subtypes.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    kinds: Vec<KindDef>,
    index: HashMap<String, KindId>,
}

impl Registry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the declaration builder for `name`, creating an empty kind
    /// the first time the name is requested.
    pub fn define(&mut self, name: &str) -> KindBuilder<'_> {
        let id = match self.lookup(name) {
            Some(id) => id,
            None => {
                let id = KindId(self.kinds.len());
                self.kinds.push(KindDef {
                    name: name.to_owned(),
                    supertypes: Vec::new(),
                    fields: Vec::new(),
                    build_params: None,
                    finalized: OnceCell::new(),
                });
                self.index.insert(name.to_owned(), id);
                trace!(kind = name, "created kind");
                id
            }
        };
        KindBuilder::new(self, id)
    }

    /// Returns `true` if `name` has been defined.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Returns `true` if `name` has been defined and finalized.
    #[must_use]
    pub fn is_finalized(&self, name: &str) -> bool {
        self.lookup(name)
            .is_some_and(|id| self.def(id).finalized.get().is_some())
    }

    /// Iterates over kind names in the order they were first defined.
    pub fn kind_names(&self) -> impl Iterator<Item = &str> {
        self.kinds.iter().map(|def| def.name.as_str())
    }

    /// The effective field names of `kind`, in order.
    ///
    /// # Errors
    ///
    /// Fails if `kind` is undefined or its inheritance cannot be resolved.
    pub fn field_names(&self, kind: &str) -> Result<Vec<String>, Error> {
        let resolved = self.resolve_named(kind)?;
        Ok(resolved.fields.iter().map(|f| f.name().to_owned()).collect())
    }

    /// The effective field names of `kind` a traversal visits by default:
    /// every field not marked hidden, in order.
    ///
    /// # Errors
    ///
    /// Fails if `kind` is undefined or its inheritance cannot be resolved.
    pub fn traversal_fields(&self, kind: &str) -> Result<Vec<String>, Error> {
        let resolved = self.resolve_named(kind)?;
        Ok(resolved
            .fields
            .iter()
            .filter(|f| !f.is_hidden())
            .map(|f| f.name().to_owned())
            .collect())
    }

    /// The effective spec of one field of `kind`.
    ///
    /// # Errors
    ///
    /// Fails if `kind` is undefined or does not resolve, or has no such
    /// field.
    pub fn field_spec(&self, kind: &str, field: &str) -> Result<FieldSpec, Error> {
        let resolved = self.resolve_named(kind)?;
        resolved.field(field).cloned().ok_or_else(|| {
            Error::declaration(kind, format!("no field named '{field}'"))
        })
    }

    /// `kind` followed by all of its supertypes, depth-first.
    ///
    /// # Errors
    ///
    /// Fails if `kind` is undefined or its inheritance cannot be resolved.
    pub fn supertypes_of(&self, kind: &str) -> Result<Vec<String>, Error> {
        Ok(self.resolve_named(kind)?.ancestors.clone())
    }

    /// Returns `true` if `sub` is `sup` or inherits from it.
    #[must_use]
    pub fn is_supertype_of(&self, sup: &str, sub: &str) -> bool {
        self.resolve_named(sub)
            .is_ok_and(|resolved| resolved.ancestors.iter().any(|a| a == sup))
    }

    /// The value of `field` on a tagged node, falling back to the field's
    /// default when the node lacks it.
    ///
    /// Returns `None` for untagged nodes, unknown kinds, unknown fields, and
    /// absent fields without a default.
    #[must_use]
    pub fn field_value(&self, node: &Node, field: &str) -> Option<Value> {
        if let Some(value) = node.get(field) {
            return Some(value.clone());
        }
        let resolved = self.resolve_named(node.kind()?).ok()?;
        let default = resolved.field(field)?.default()?;
        Some(default.produce(node))
    }

    pub(crate) fn lookup(&self, name: &str) -> Option<KindId> {
        self.index.get(name).copied()
    }

    pub(crate) fn def(&self, id: KindId) -> &KindDef {
        &self.kinds[id.0]
    }

    pub(crate) fn def_mut(&mut self, id: KindId) -> &mut KindDef {
        &mut self.kinds[id.0]
    }

    pub(crate) fn defs(&self) -> impl Iterator<Item = &KindDef> {
        self.kinds.iter()
    }

    pub(crate) fn resolve_named(&self, name: &str) -> Result<Cow<'_, Resolved>, Error> {
        let id = self.lookup(name).ok_or_else(|| Error::UnresolvedReference {
            name: name.to_owned(),
            referenced_by: None,
        })?;
        self.resolve(id)
    }

    /// The effective shape of a kind: memoized when finalized, computed
    /// afresh otherwise.
    pub(crate) fn resolve(&self, id: KindId) -> Result<Cow<'_, Resolved>, Error> {
        match self.def(id).finalized.get() {
            Some(resolved) => Ok(Cow::Borrowed(resolved)),
            None => self.compute(id, &mut Vec::new()).map(Cow::Owned),
        }
    }

    /// Finalizes a kind and all of its supertypes.
    pub(crate) fn finalize(&self, id: KindId) -> Result<&Resolved, Error> {
        let def = self.def(id);
        if let Some(resolved) = def.finalized.get() {
            return Ok(resolved);
        }
        let resolved = self.compute(id, &mut Vec::new())?;
        for base in &def.supertypes {
            if let Some(base_id) = self.lookup(base) {
                self.finalize(base_id)?;
            }
        }
        debug!(
            kind = %def.name,
            fields = resolved.fields.len(),
            "finalized kind"
        );
        Ok(def.finalized.get_or_init(|| resolved))
    }

    fn compute(&self, id: KindId, stack: &mut Vec<KindId>) -> Result<Resolved, Error> {
        let def = self.def(id);
        if let Some(resolved) = def.finalized.get() {
            return Ok(resolved.clone());
        }
        if stack.contains(&id) {
            return Err(Error::declaration(&def.name, "supertype chain is cyclic"));
        }
        stack.push(id);

        let mut fields = Vec::new();
        let mut ancestors = vec![def.name.clone()];
        let mut inherited_params = None;
        for (i, base) in def.supertypes.iter().enumerate() {
            let base_id = self
                .lookup(base)
                .ok_or_else(|| Error::UnresolvedReference {
                    name: base.clone(),
                    referenced_by: Some(def.name.clone()),
                })?;
            let base = self.compute(base_id, stack)?;
            overlay(&mut fields, base.fields);
            for ancestor in base.ancestors {
                if !ancestors.contains(&ancestor) {
                    ancestors.push(ancestor);
                }
            }
            if i == 0 {
                inherited_params = base.build_params;
            }
        }
        stack.pop();
        overlay(&mut fields, def.fields.iter().cloned());

        let build_params = def.build_params.clone().or(inherited_params);
        if let Some(params) = &build_params {
            if let Some(param) = params
                .iter()
                .find(|p| !fields.iter().any(|f| f.name() == p.as_str()))
            {
                return Err(Error::declaration(
                    &def.name,
                    format!("build parameter '{param}' is not a declared or inherited field"),
                ));
            }
        }

        Ok(Resolved {
            fields,
            ancestors,
            build_params,
        })
    }

    /// Checks every effective field of `kind` on `node`. An absent field
    /// is checked through its default, as [`Registry::field_value`] reads it.
    fn check_fields(
        &self,
        kind: &str,
        resolved: &Resolved,
        node: &Node,
        depth: Depth,
    ) -> Result<(), Mismatch> {
        for spec in &resolved.fields {
            let value = match (node.get(spec.name()), spec.default()) {
                (Some(value), _) => Cow::Borrowed(value),
                (None, Some(default)) => Cow::Owned(default.produce(node)),
                (None, None) => {
                    return Err(Mismatch::MissingField {
                        kind: kind.to_owned(),
                        field: spec.name().to_owned(),
                    });
                }
            };
            spec.constraint()
                .check(&value, self, depth)
                .map_err(|cause| Mismatch::Field {
                    kind: kind.to_owned(),
                    field: spec.name().to_owned(),
                    cause: Box::new(cause),
                })?;
        }
        Ok(())
    }
}

/// Merges `incoming` into `fields`: a same-named field is replaced where
/// it stands, new fields are appended.
fn overlay(fields: &mut Vec<FieldSpec>, incoming: impl IntoIterator<Item = FieldSpec>) {
    for spec in incoming {
        match fields.iter_mut().find(|f| f.name() == spec.name()) {
            Some(slot) => *slot = spec,
            None => fields.push(spec),
        }
    }
}

fn malformed(kind: &str, err: &Error) -> Mismatch {
    match err {
        Error::UnresolvedReference { name, .. } => Mismatch::Unresolved { kind: name.clone() },
        other => Mismatch::Malformed {
            kind: kind.to_owned(),
            reason: other.to_string(),
        },
    }
}

impl KindResolver for Registry {
    fn check_kind(&self, kind: &str, value: &Value, depth: Depth) -> Result<(), Mismatch> {
        let id = self.lookup(kind).ok_or_else(|| Mismatch::Unresolved {
            kind: kind.to_owned(),
        })?;
        let Value::Node(node) = value else {
            return Err(Mismatch::Expected {
                expected: kind.to_owned(),
                actual: value.to_string(),
            });
        };
        let Some(tag) = node.kind() else {
            let resolved = self.resolve(id).map_err(|e| malformed(kind, &e))?;
            return self.check_fields(kind, &resolved, node, depth);
        };
        let not_a_subtype = || Mismatch::Expected {
            expected: kind.to_owned(),
            actual: tag.to_owned(),
        };
        let tag_id = self.lookup(tag).ok_or_else(not_a_subtype)?;
        let resolved = self.resolve(tag_id).map_err(|e| malformed(tag, &e))?;
        if !resolved.ancestors.iter().any(|a| a == kind) {
            return Err(not_a_subtype());
        }
        match depth {
            Depth::Shallow => Ok(()),
            Depth::Deep => self.check_fields(tag, &resolved, node, depth),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraint::Constraint;

    fn shapes() -> Registry {
        let mut registry = Registry::new();
        registry
            .define("Shape")
            .field("label", Constraint::string())
            .unwrap()
            .hidden_field(
                "origin",
                Constraint::or([Constraint::kind("Point"), Constraint::null()]),
                Value::Null,
            )
            .unwrap();
        registry
            .define("Named")
            .field("label", Constraint::or([Constraint::string(), Constraint::null()]))
            .unwrap()
            .field("id", Constraint::number())
            .unwrap();
        registry
            .define("Circle")
            .bases(&["Shape", "Named"])
            .unwrap()
            .field("radius", Constraint::number())
            .unwrap()
            .field("id", Constraint::string())
            .unwrap();
        registry
    }

    #[test]
    fn test_effective_fields_include_supertypes() {
        let registry = shapes();
        assert_eq!(
            registry.field_names("Circle").unwrap(),
            ["label", "origin", "id", "radius"]
        );
        for base in ["Shape", "Named"] {
            let sub = registry.field_names("Circle").unwrap();
            for name in registry.field_names(base).unwrap() {
                assert!(sub.contains(&name), "{name} missing from Circle");
            }
        }
    }

    #[test]
    fn test_later_sources_override_earlier() {
        let registry = shapes();
        // `Named` is listed after `Shape`, so its `label` wins.
        assert_eq!(
            registry.field_spec("Circle", "label").unwrap().constraint(),
            &Constraint::or([Constraint::string(), Constraint::null()])
        );
        // Local declarations win over everything inherited.
        assert_eq!(
            registry.field_spec("Circle", "id").unwrap().constraint(),
            &Constraint::string()
        );
    }

    #[test]
    fn test_hidden_flag_is_inherited() {
        let mut registry = shapes();
        assert!(registry.field_spec("Circle", "origin").unwrap().is_hidden());
        assert_eq!(
            registry.traversal_fields("Circle").unwrap(),
            ["label", "id", "radius"]
        );

        registry
            .define("Square")
            .bases(&["Shape"])
            .unwrap()
            .field("origin", Constraint::kind("Point"))
            .unwrap();
        assert!(!registry.field_spec("Square", "origin").unwrap().is_hidden());
        assert_eq!(
            registry.traversal_fields("Square").unwrap(),
            ["label", "origin"]
        );
    }

    #[test]
    fn test_supertype_additions_visible_before_finalization() {
        let mut registry = shapes();
        registry
            .define("Shape")
            .field_default("visible", Constraint::boolean(), true)
            .unwrap();
        assert!(registry.field_names("Circle").unwrap().contains(&"visible".to_owned()));
    }

    #[test]
    fn test_ancestors_depth_first() {
        let mut registry = Registry::new();
        registry.define("Node");
        registry.define("Expression").bases(&["Node"]).unwrap();
        registry.define("Pattern").bases(&["Node"]).unwrap();
        registry
            .define("Identifier")
            .bases(&["Expression", "Pattern"])
            .unwrap();
        assert_eq!(
            registry.supertypes_of("Identifier").unwrap(),
            ["Identifier", "Expression", "Node", "Pattern"]
        );
        assert!(registry.is_supertype_of("Node", "Identifier"));
        assert!(registry.is_supertype_of("Identifier", "Identifier"));
        assert!(!registry.is_supertype_of("Identifier", "Node"));
    }

    #[test]
    fn test_cyclic_supertypes_rejected() {
        let mut registry = Registry::new();
        registry.define("A").bases(&["B"]).unwrap();
        registry.define("B").bases(&["A"]).unwrap();
        let err = registry.field_names("A").unwrap_err();
        assert!(err.to_string().contains("cyclic"), "{err}");
    }

    #[test]
    fn test_undefined_supertype_unresolved() {
        let mut registry = Registry::new();
        registry.define("Orphan").bases(&["Nowhere"]).unwrap();
        assert!(matches!(
            registry.field_names("Orphan"),
            Err(Error::UnresolvedReference { ref name, referenced_by: Some(ref by) })
                if name == "Nowhere" && by == "Orphan"
        ));
    }

    #[test]
    fn test_build_param_must_be_a_field() {
        let mut registry = Registry::new();
        registry
            .define("Pair")
            .build(&["left", "right"])
            .unwrap()
            .field("left", Constraint::number())
            .unwrap();
        let err = registry.field_names("Pair").unwrap_err();
        assert!(err.to_string().contains("'right'"), "{err}");
    }

    #[test]
    fn test_finalization_freezes_kind_and_supertypes() {
        let mut registry = Registry::new();
        registry
            .define("Base")
            .field_default("flag", Constraint::boolean(), false)
            .unwrap();
        registry
            .define("Leaf")
            .bases(&["Base"])
            .unwrap()
            .build(&[])
            .unwrap();
        assert!(!registry.is_finalized("Leaf"));
        registry.builder("Leaf").unwrap();
        assert!(registry.is_finalized("Leaf"));
        assert!(registry.is_finalized("Base"));

        let err = registry
            .define("Base")
            .field("late", Constraint::string())
            .unwrap_err();
        assert!(err.to_string().contains("finalized"));
        assert!(registry.define("Leaf").build(&[]).is_err());
    }

    #[test]
    fn test_field_value_falls_back_to_default() {
        let registry = shapes();
        let node = Node::new("Circle").with("radius", 2);
        assert_eq!(registry.field_value(&node, "origin"), Some(Value::Null));
        assert_eq!(registry.field_value(&node, "radius"), Some(Value::from(2)));
        assert_eq!(registry.field_value(&node, "label"), None);
        assert_eq!(registry.field_value(&Node::untagged(), "origin"), None);
    }

    #[test]
    fn test_untagged_node_falls_back_to_defaults() {
        let mut registry = Registry::new();
        registry
            .define("Ident")
            .field("name", Constraint::string())
            .unwrap()
            .field_default("optional", Constraint::boolean(), false)
            .unwrap()
            .hidden_field("loc", Constraint::null(), Value::Null)
            .unwrap();

        let raw = Value::from(Node::untagged().with("name", "x"));
        assert!(registry.check_kind("Ident", &raw, Depth::Shallow).is_ok());

        let nameless = Value::from(Node::untagged().with("optional", true));
        assert!(matches!(
            registry.check_kind("Ident", &nameless, Depth::Shallow),
            Err(Mismatch::MissingField { field, .. }) if field == "name"
        ));

        let wrong = Value::from(Node::untagged().with("name", "x").with("optional", "yes"));
        assert!(matches!(
            registry.check_kind("Ident", &wrong, Depth::Shallow),
            Err(Mismatch::Field { field, .. }) if field == "optional"
        ));
    }

    #[test]
    fn test_define_is_idempotent() {
        let mut registry = Registry::new();
        registry.define("Thing").field("a", Constraint::number()).unwrap();
        registry.define("Thing").field("b", Constraint::number()).unwrap();
        assert_eq!(registry.kind_names().collect::<Vec<_>>(), ["Thing"]);
        assert_eq!(registry.field_names("Thing").unwrap(), ["a", "b"]);
    }
}
