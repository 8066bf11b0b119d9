//! Default values reused across many field declarations.

use crate::decl::DefaultValue;
use crate::error::Error;
use crate::fork::{Fork, Plugin};
use crate::value::Value;

/// Plugin providing [`Defaults`].
#[derive(Debug)]
pub struct Shared;

/// Common constant defaults.
#[derive(Debug, Clone)]
pub struct Defaults {
    /// `null`.
    pub null: DefaultValue,
    /// An empty array.
    pub empty_array: DefaultValue,
    /// `false`.
    pub false_value: DefaultValue,
    /// `true`.
    pub true_value: DefaultValue,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            null: DefaultValue::Constant(Value::Null),
            empty_array: DefaultValue::Constant(Value::Array(Vec::new())),
            false_value: DefaultValue::Constant(Value::Bool(false)),
            true_value: DefaultValue::Constant(Value::Bool(true)),
        }
    }
}

impl Plugin for Shared {
    type Output = Defaults;

    fn init(_fork: &mut Fork) -> Result<Defaults, Error> {
        Ok(Defaults::default())
    }
}
