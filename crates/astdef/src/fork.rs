//! Extension layering.
//!
//! A [`Fork`] is one loading context: a single [`Registry`] plus a cache
//! of every [`Plugin`] already initialized against it. Plugins pull in the
//! plugins they build on through [`Fork::use_plugin`], which runs each one
//! at most once, so every extension sees the same base definitions.

use crate::decl::KindBuilder;
use crate::error::Error;
use crate::registry::Registry;
use crate::validate::validate;
use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::rc::Rc;
use tracing::debug;

/// A unit of schema declarations, initialized once per [`Fork`].
pub trait Plugin: 'static {
    /// What the plugin hands to the plugins that use it.
    type Output: 'static;

    /// Declares kinds and dependencies against `fork`.
    ///
    /// # Errors
    ///
    /// Any declaration error; loading stops and the fork is rolled back.
    fn init(fork: &mut Fork) -> Result<Self::Output, Error>;
}

/// A loading context shared by every plugin loaded into it.
#[derive(Debug, Default)]
pub struct Fork {
    registry: Registry,
    used: HashMap<TypeId, Rc<dyn Any>>,
    loading: Vec<TypeId>,
}

impl Fork {
    /// Creates an empty fork.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads `P` and returns the fork, for chaining.
    ///
    /// # Errors
    ///
    /// See [`Fork::use_plugin`].
    pub fn load<P: Plugin>(mut self) -> Result<Self, Error> {
        self.use_plugin::<P>()?;
        Ok(self)
    }

    /// Runs `P::init` the first time `P` is used in this fork and returns
    /// its cached output on every call.
    ///
    /// # Errors
    ///
    /// Whatever `P::init` returns, or [`Error::Plugin`] if `P` ends up
    /// using itself. Once the outermost plugin returns, the whole registry
    /// is checked with [`validate`] and any problem fails the load. On
    /// failure the registry and the plugin cache are restored to their
    /// state before the call.
    pub fn use_plugin<P: Plugin>(&mut self) -> Result<Rc<P::Output>, Error> {
        let key = TypeId::of::<P>();
        let plugin = type_name::<P>();
        if let Some(cached) = self.used.get(&key) {
            return Rc::clone(cached)
                .downcast::<P::Output>()
                .map_err(|_| Error::Plugin {
                    plugin,
                    reason: "cached output has an unexpected type".to_owned(),
                });
        }
        if self.loading.contains(&key) {
            return Err(Error::Plugin {
                plugin,
                reason: "plugin uses itself".to_owned(),
            });
        }

        let registry = self.registry.clone();
        let used = self.used.clone();
        self.loading.push(key);
        debug!(plugin, "initializing plugin");
        let result = P::init(self);
        self.loading.pop();
        let result = result.and_then(|output| {
            if self.loading.is_empty() {
                validate(&self.registry)?;
            }
            Ok(output)
        });

        match result {
            Ok(output) => {
                let output = Rc::new(output);
                let erased: Rc<dyn Any> = output.clone();
                self.used.insert(key, erased);
                Ok(output)
            }
            Err(err) => {
                debug!(plugin, error = %err, "plugin failed, rolling back");
                self.registry = registry;
                self.used = used;
                Err(err)
            }
        }
    }

    /// Returns `true` if `P` has been initialized in this fork.
    #[must_use]
    pub fn is_used<P: Plugin>(&self) -> bool {
        self.used.contains_key(&TypeId::of::<P>())
    }

    /// Starts or continues declaring `name` in the shared registry.
    pub fn define(&mut self, name: &str) -> KindBuilder<'_> {
        self.registry.define(name)
    }

    /// The shared registry.
    #[must_use]
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Consumes the fork, keeping its registry.
    #[must_use]
    pub fn into_registry(self) -> Registry {
        self.registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraint::Constraint;
    use std::cell::Cell;

    thread_local! {
        static BASE_RUNS: Cell<usize> = const { Cell::new(0) };
    }

    struct Base;

    impl Plugin for Base {
        type Output = &'static str;

        fn init(fork: &mut Fork) -> Result<Self::Output, Error> {
            BASE_RUNS.with(|runs| runs.set(runs.get() + 1));
            fork.define("Node")
                .field_default("loc", Constraint::null(), crate::value::Value::Null)?;
            Ok("base")
        }
    }

    struct Left;

    impl Plugin for Left {
        type Output = ();

        fn init(fork: &mut Fork) -> Result<(), Error> {
            fork.use_plugin::<Base>()?;
            fork.define("Left").bases(&["Node"])?.build(&[])?;
            Ok(())
        }
    }

    struct Right;

    impl Plugin for Right {
        type Output = ();

        fn init(fork: &mut Fork) -> Result<(), Error> {
            fork.use_plugin::<Base>()?;
            fork.define("Right").bases(&["Node"])?.build(&[])?;
            Ok(())
        }
    }

    struct Faulty;

    impl Plugin for Faulty {
        type Output = ();

        fn init(fork: &mut Fork) -> Result<(), Error> {
            fork.use_plugin::<Right>()?;
            fork.define("Half").bases(&["Node"])?;
            fork.define("Half").bases(&["Half"])?;
            Ok(())
        }
    }

    struct Dangling;

    impl Plugin for Dangling {
        type Output = ();

        fn init(fork: &mut Fork) -> Result<(), Error> {
            fork.use_plugin::<Base>()?;
            fork.define("Ghost").bases(&["Node"])?.build(&["nope"])?;
            Ok(())
        }
    }

    struct Ouroboros;

    impl Plugin for Ouroboros {
        type Output = ();

        fn init(fork: &mut Fork) -> Result<(), Error> {
            fork.use_plugin::<Ouroboros>()?;
            Ok(())
        }
    }

    #[test]
    fn test_shared_plugin_runs_once() {
        BASE_RUNS.with(|runs| runs.set(0));
        let mut fork = Fork::new().load::<Left>().unwrap().load::<Right>().unwrap();
        assert_eq!(BASE_RUNS.with(Cell::get), 1);

        let first = fork.use_plugin::<Base>().unwrap();
        let second = fork.use_plugin::<Base>().unwrap();
        assert!(Rc::ptr_eq(&first, &second));
        assert_eq!(*first, "base");
        assert_eq!(BASE_RUNS.with(Cell::get), 1);

        let registry = fork.into_registry();
        assert!(registry.is_supertype_of("Node", "Left"));
        assert!(registry.is_supertype_of("Node", "Right"));
        assert_eq!(registry.kind_names().filter(|k| *k == "Node").count(), 1);
    }

    #[test]
    fn test_failed_plugin_rolls_back() {
        let mut fork = Fork::new().load::<Left>().unwrap();
        assert!(fork.use_plugin::<Faulty>().is_err());
        assert!(!fork.registry().contains("Half"));
        assert!(!fork.registry().contains("Right"));
        assert!(!fork.is_used::<Right>());
        assert!(!fork.is_used::<Faulty>());
        assert!(fork.is_used::<Left>());
        assert!(fork.registry().contains("Left"));
    }

    #[test]
    fn test_malformed_declarations_fail_the_load() {
        let mut fork = Fork::new().load::<Left>().unwrap();
        let err = fork.use_plugin::<Dangling>().unwrap_err();
        assert!(
            matches!(&err, Error::Declaration { kind, reason } if kind == "Ghost" && reason.contains("nope")),
            "unexpected error: {err:?}"
        );
        assert!(!fork.registry().contains("Ghost"));
        assert!(!fork.is_used::<Dangling>());
        assert!(fork.registry().contains("Left"));

        assert!(Fork::new().load::<Dangling>().is_err());
    }

    #[test]
    fn test_self_use_is_reported() {
        let err = Fork::new().load::<Ouroboros>().unwrap_err();
        assert!(matches!(err, Error::Plugin { reason, .. } if reason.contains("itself")));
    }
}
