//! Built-in sources.

pub mod ndjson;

use adp_engine::{PluginRegistry, Registration, RegistryError};
use adp_sdk::prelude::*;

use crate::config::{schema_of, PluginConfig};

pub(crate) fn register(registry: &mut PluginRegistry) -> Result<(), RegistryError> {
    registry.register(
        Registration::source(ndjson::NAME, |params| {
            let config = ndjson::Config::from_params(params)?;
            Ok(Box::new(ndjson::NdjsonSource::new(config)) as Box<dyn Source>)
        })
        .with_schema(schema_of::<ndjson::Config>(ndjson::NAME)?)
        .with_description("Read newline-delimited JSON objects from a file"),
    )
}
