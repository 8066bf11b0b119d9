//! Kind sets shipped with the crate, each as a [`Plugin`](crate::Plugin).

pub mod base;
pub mod jsx;

pub use base::Base;
pub use jsx::Jsx;

use crate::error::Error;
use crate::fork::Fork;
use crate::registry::Registry;

/// A registry holding the base and JSX kinds.
///
/// # Errors
///
/// Fails only if the bundled declarations are malformed.
pub fn jsx_registry() -> Result<Registry, Error> {
    Ok(Fork::new().load::<Jsx>()?.into_registry())
}
