//! Built-in record transforms.

pub mod explode;
pub mod fields;
pub mod filter;

use adp_engine::{PluginRegistry, Registration, RegistryError};
use adp_sdk::prelude::*;

use crate::config::{schema_of, PluginConfig};

/// Registration for a transform whose only constructor input is its config.
fn registration<C, T>(
    name: &'static str,
    description: &str,
    build: fn(C) -> Result<T, PluginError>,
) -> Result<Registration, RegistryError>
where
    C: PluginConfig + 'static,
    T: Transform + 'static,
{
    Ok(Registration::transform(name, move |params| {
        let config = C::from_params(params)?;
        Ok(Box::new(build(config)?) as Box<dyn Transform>)
    })
    .with_schema(schema_of::<C>(name)?)
    .with_description(description))
}

pub(crate) fn register(registry: &mut PluginRegistry) -> Result<(), RegistryError> {
    registry.register(registration(
        fields::RENAME,
        "Rename record fields",
        |config| Ok(fields::Rename::new(config)),
    )?)?;
    registry.register(registration(
        fields::SELECT,
        "Keep only the listed fields, in the listed order",
        |config| Ok(fields::Select::new(config)),
    )?)?;
    registry.register(registration(
        fields::DROP,
        "Remove the listed fields",
        |config| Ok(fields::DropFields::new(config)),
    )?)?;
    registry.register(registration(
        filter::NAME,
        "Keep records whose field matches a regular expression",
        filter::Filter::new,
    )?)?;
    registry.register(registration(
        explode::NAME,
        "Emit one record per element of a sequence field",
        |config| Ok(explode::Explode::new(config)),
    )?)?;
    Ok(())
}
