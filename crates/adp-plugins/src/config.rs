//! Typed stage parameters shared by the built-in plugins.

use std::path::{Component, Path};

use adp_engine::RegistryError;
use adp_sdk::prelude::*;
use serde::de::DeserializeOwned;

/// Parameter struct of a built-in plugin, paired with the JSON Schema the
/// registry validates raw parameters against.
pub trait PluginConfig: DeserializeOwned {
    const SCHEMA_JSON: &'static str;

    /// Checks serde and the schema cannot express.
    fn validate(&self) -> Result<(), PluginError> {
        Ok(())
    }

    /// Decode and validate.
    fn from_params(params: &Params) -> Result<Self, PluginError> {
        let config: Self = decode(params)?;
        config.validate()?;
        Ok(config)
    }
}

/// Parse a config's schema for registration.
pub(crate) fn schema_of<C: PluginConfig>(name: &str) -> Result<Value, RegistryError> {
    serde_json::from_str(C::SCHEMA_JSON).map_err(|e| RegistryError::InvalidSchema {
        name: PluginName::new(name),
        message: e.to_string(),
    })
}

/// Output filenames must stay inside the output directory.
pub(crate) fn validate_filename(filename: &str) -> Result<(), PluginError> {
    let path = Path::new(filename);
    let escapes = path
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
    if filename.trim().is_empty() || escapes {
        return Err(PluginError::config(
            "INVALID_FILENAME",
            format!("filename '{filename}' must be a relative path inside the output directory"),
        ));
    }
    Ok(())
}
