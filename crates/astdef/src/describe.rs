//! Serializable kind metadata.
//!
//! Traversal engines and printers live outside this crate; they consume
//! these descriptors rather than the registry itself. Descriptors are plain
//! data and round-trip through JSON via [`facet_json`].

use crate::error::Error;
use crate::registry::Registry;
use facet::Facet;

/// The resolved shape of one kind.
#[derive(Debug, Clone, PartialEq, Facet)]
pub struct KindDescriptor {
    /// The kind name.
    pub name: String,

    /// Directly declared supertypes, primary first.
    pub supertypes: Vec<String>,

    /// The kind followed by every supertype, depth-first.
    pub ancestors: Vec<String>,

    /// Positional constructor parameters, if the kind is buildable.
    pub build_params: Option<Vec<String>>,

    /// Effective fields in declaration order.
    pub fields: Vec<FieldDescriptor>,
}

/// One effective field.
#[derive(Debug, Clone, PartialEq, Facet)]
pub struct FieldDescriptor {
    /// The field name.
    pub name: String,

    /// Rendering of the field's constraint, e.g. `[JSXAttribute | JSXSpreadAttribute]`.
    pub constraint: String,

    /// Rendering of the default: the constant, or `computed`.
    pub default: Option<String>,

    /// Whether traversal skips the field by default.
    pub hidden: bool,
}

/// Every kind of a registry.
#[derive(Debug, Clone, PartialEq, Facet)]
pub struct SchemaDescriptor {
    /// Kinds in definition order.
    pub kinds: Vec<KindDescriptor>,
}

impl Registry {
    /// Describes `kind` without finalizing it.
    ///
    /// # Errors
    ///
    /// Fails if `kind` is undefined or its inheritance cannot be resolved.
    pub fn describe(&self, kind: &str) -> Result<KindDescriptor, Error> {
        let resolved = self.resolve_named(kind)?;
        let supertypes = self
            .lookup(kind)
            .map(|id| self.def(id).supertypes.clone())
            .unwrap_or_default();
        Ok(KindDescriptor {
            name: kind.to_owned(),
            supertypes,
            ancestors: resolved.ancestors.clone(),
            build_params: resolved.build_params.clone(),
            fields: resolved
                .fields
                .iter()
                .map(|spec| FieldDescriptor {
                    name: spec.name().to_owned(),
                    constraint: spec.constraint().to_string(),
                    default: spec.default().map(ToString::to_string),
                    hidden: spec.is_hidden(),
                })
                .collect(),
        })
    }

    /// Describes every kind.
    ///
    /// # Errors
    ///
    /// Fails on the first kind whose inheritance cannot be resolved.
    pub fn describe_all(&self) -> Result<SchemaDescriptor, Error> {
        let kinds = self
            .kind_names()
            .map(|name| self.describe(name))
            .collect::<Result<_, _>>()?;
        Ok(SchemaDescriptor { kinds })
    }
}

impl SchemaDescriptor {
    /// Renders the descriptor as JSON.
    #[must_use]
    pub fn to_json(&self) -> String {
        facet_json::to_string(self)
    }

    /// Parses a descriptor previously rendered by [`SchemaDescriptor::to_json`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::Descriptor`] if `json` is not a valid descriptor.
    pub fn from_json(json: &str) -> Result<Self, Error> {
        facet_json::from_str(json).map_err(|e| Error::Descriptor(e.to_string()))
    }

    /// Looks up one kind.
    #[must_use]
    pub fn kind(&self, name: &str) -> Option<&KindDescriptor> {
        self.kinds.iter().find(|k| k.name == name)
    }
}
