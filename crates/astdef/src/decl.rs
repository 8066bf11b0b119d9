//! The declaration surface: field specs, default providers, and the
//! chained [`KindBuilder`] returned by [`Registry::define`].

use crate::constraint::Constraint;
use crate::error::Error;
use crate::registry::{KindId, Registry};
use crate::value::{Node, Value};
use std::fmt;
use std::rc::Rc;

/// A function computing a field's value from the partially built node.
pub type ComputeFn = dyn Fn(&Node) -> Value;

/// How a field obtains a value when it is not supplied.
#[derive(Clone)]
pub enum DefaultValue {
    /// A fixed value, cloned into every node.
    Constant(Value),
    /// A value derived from fields already set on the node.
    Computed(Rc<ComputeFn>),
}

impl DefaultValue {
    /// Wraps a function of the partially built node.
    pub fn computed(f: impl Fn(&Node) -> Value + 'static) -> Self {
        DefaultValue::Computed(Rc::new(f))
    }

    /// Produces the default for `node`.
    #[must_use]
    pub fn produce(&self, node: &Node) -> Value {
        match self {
            DefaultValue::Constant(value) => value.clone(),
            DefaultValue::Computed(f) => f(node),
        }
    }
}

impl fmt::Debug for DefaultValue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            DefaultValue::Constant(value) => f.debug_tuple("Constant").field(value).finish(),
            DefaultValue::Computed(_) => f.write_str("Computed(..)"),
        }
    }
}

impl fmt::Display for DefaultValue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            DefaultValue::Constant(value) => write!(f, "{value}"),
            DefaultValue::Computed(_) => f.write_str("computed"),
        }
    }
}

impl From<Value> for DefaultValue {
    fn from(value: Value) -> Self {
        DefaultValue::Constant(value)
    }
}

impl From<bool> for DefaultValue {
    fn from(value: bool) -> Self {
        DefaultValue::Constant(Value::Bool(value))
    }
}

/// One field of a kind.
#[derive(Debug, Clone)]
pub struct FieldSpec {
    name: String,
    constraint: Constraint,
    default: Option<DefaultValue>,
    hidden: bool,
}

impl FieldSpec {
    /// A required, visible field.
    #[must_use]
    pub fn new(name: impl Into<String>, constraint: Constraint) -> Self {
        Self {
            name: name.into(),
            constraint,
            default: None,
            hidden: false,
        }
    }

    /// Sets the default provider.
    #[must_use]
    pub fn with_default(mut self, default: impl Into<DefaultValue>) -> Self {
        self.default = Some(default.into());
        self
    }

    /// Excludes the field from traversal order.
    #[must_use]
    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    /// The field name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The field's constraint.
    #[must_use]
    pub fn constraint(&self) -> &Constraint {
        &self.constraint
    }

    /// The default provider, if any.
    #[must_use]
    pub fn default(&self) -> Option<&DefaultValue> {
        self.default.as_ref()
    }

    /// Whether the field is excluded from traversal order.
    #[must_use]
    pub fn is_hidden(&self) -> bool {
        self.hidden
    }
}

/// Chained declarations against one kind.
///
/// Every method fails once the kind is finalized. Methods consume and
/// return the builder so a whole declaration reads as one `?`-chained
/// expression.
#[derive(Debug)]
pub struct KindBuilder<'r> {
    registry: &'r mut Registry,
    id: KindId,
}

impl<'r> KindBuilder<'r> {
    pub(crate) fn new(registry: &'r mut Registry, id: KindId) -> Self {
        Self { registry, id }
    }

    /// The kind being declared.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.registry.def(self.id).name
    }

    /// Appends supertypes. The first supertype ever listed is the primary
    /// one.
    ///
    /// # Errors
    ///
    /// Fails if the kind is finalized or lists itself.
    pub fn bases(self, names: &[&str]) -> Result<Self, Error> {
        self.ensure_open()?;
        let def = self.registry.def_mut(self.id);
        for name in names {
            if *name == def.name {
                return Err(Error::declaration(&def.name, "a kind cannot be its own supertype"));
            }
            if !def.supertypes.iter().any(|s| s == name) {
                def.supertypes.push((*name).to_owned());
            }
        }
        Ok(self)
    }

    /// Declares the positional constructor parameters, in order.
    ///
    /// Names are checked against the effective fields when the kind is
    /// finalized, so fields may be declared after `build`.
    ///
    /// # Errors
    ///
    /// Fails if the kind is finalized or a name is repeated.
    pub fn build(self, params: &[&str]) -> Result<Self, Error> {
        self.ensure_open()?;
        let def = self.registry.def_mut(self.id);
        for (i, param) in params.iter().enumerate() {
            if params[..i].contains(param) {
                return Err(Error::declaration(
                    &def.name,
                    format!("build parameter '{param}' is listed twice"),
                ));
            }
        }
        def.build_params = Some(params.iter().map(|p| (*p).to_owned()).collect());
        Ok(self)
    }

    /// Declares a required, visible field.
    ///
    /// # Errors
    ///
    /// See [`KindBuilder::declare`].
    pub fn field(self, name: &str, constraint: Constraint) -> Result<Self, Error> {
        self.declare(FieldSpec::new(name, constraint))
    }

    /// Declares a visible field with a default provider.
    ///
    /// # Errors
    ///
    /// See [`KindBuilder::declare`].
    pub fn field_default(
        self,
        name: &str,
        constraint: Constraint,
        default: impl Into<DefaultValue>,
    ) -> Result<Self, Error> {
        self.declare(FieldSpec::new(name, constraint).with_default(default))
    }

    /// Declares a field hidden from traversal, with a default provider.
    ///
    /// # Errors
    ///
    /// See [`KindBuilder::declare`].
    pub fn hidden_field(
        self,
        name: &str,
        constraint: Constraint,
        default: impl Into<DefaultValue>,
    ) -> Result<Self, Error> {
        self.declare(FieldSpec::new(name, constraint).with_default(default).hidden())
    }

    /// Declares a field.
    ///
    /// Redeclaring a local field with the same constraint and visibility
    /// replaces its default; anything else is an error.
    ///
    /// # Errors
    ///
    /// Fails if the kind is finalized, if the constraint admits `null`
    /// through more than one alternative, or on an incompatible
    /// redeclaration.
    pub fn declare(self, spec: FieldSpec) -> Result<Self, Error> {
        self.ensure_open()?;
        let def = self.registry.def_mut(self.id);
        if spec.constraint.null_alternatives() > 1 {
            return Err(Error::declaration(
                &def.name,
                format!(
                    "field '{}' has more than one alternative matching null: {}",
                    spec.name, spec.constraint
                ),
            ));
        }
        match def.fields.iter_mut().find(|f| f.name == spec.name) {
            Some(existing) => {
                if existing.constraint != spec.constraint || existing.hidden != spec.hidden {
                    return Err(Error::declaration(
                        &def.name,
                        format!(
                            "field '{}' redeclared as {} (was {})",
                            spec.name, spec.constraint, existing.constraint
                        ),
                    ));
                }
                existing.default = spec.default;
            }
            None => def.fields.push(spec),
        }
        Ok(self)
    }

    fn ensure_open(&self) -> Result<(), Error> {
        let def = self.registry.def(self.id);
        if def.finalized.get().is_some() {
            return Err(Error::declaration(&def.name, "kind is already finalized"));
        }
        Ok(())
    }
}
