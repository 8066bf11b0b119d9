//! Whole-registry consistency checks.
//!
//! Kinds are resolved lazily, so a typo in a kind name or a field no
//! builder can fill only surfaces when the affected kind is first used.
//! [`validate`] runs those checks eagerly over every kind once a loading
//! pass is complete, without finalizing anything.

use crate::error::Error;
use crate::registry::Registry;
use crate::synth::buildable;
use std::collections::HashSet;
use tracing::warn;

/// Checks every kind in `registry`:
///
/// - every supertype and constraint reference names a defined kind;
/// - every kind's inheritance resolves (no cycles, valid build parameters);
/// - every buildable kind can actually synthesize a builder.
///
/// Kinds that are neither buildable nor referenced anywhere are logged as
/// warnings.
///
/// # Errors
///
/// Returns the first problem found.
pub fn validate(registry: &Registry) -> Result<(), Error> {
    check_undefined_kinds(registry)?;
    check_resolution(registry)?;
    check_unused_kinds(registry);
    Ok(())
}

fn check_undefined_kinds(registry: &Registry) -> Result<(), Error> {
    for def in registry.defs() {
        let mut missing = None;
        for base in &def.supertypes {
            if missing.is_none() && !registry.contains(base) {
                missing = Some(base.as_str());
            }
        }
        for field in &def.fields {
            field.constraint().each_kind_ref(&mut |name| {
                if missing.is_none() && !registry.contains(name) {
                    missing = Some(name);
                }
            });
        }
        if let Some(name) = missing {
            return Err(Error::UnresolvedReference {
                name: name.to_owned(),
                referenced_by: Some(def.name.clone()),
            });
        }
    }
    Ok(())
}

fn check_resolution(registry: &Registry) -> Result<(), Error> {
    for name in registry.kind_names() {
        let resolved = registry.resolve_named(name)?;
        if resolved.build_params.is_some() {
            buildable(name, &resolved)?;
        }
    }
    Ok(())
}

fn check_unused_kinds(registry: &Registry) {
    let mut referenced = HashSet::new();
    for def in registry.defs() {
        referenced.extend(def.supertypes.iter().map(String::as_str));
        for field in &def.fields {
            field.constraint().each_kind_ref(&mut |name| {
                referenced.insert(name);
            });
        }
    }

    for def in registry.defs() {
        if def.build_params.is_none() && !referenced.contains(def.name.as_str()) {
            warn!(kind = %def.name, "kind is not buildable and nothing references it");
        }
    }
}
