//! Stage parameter mappings.

use serde::de::DeserializeOwned;

use adp_types::{PluginError, Value};

/// Parameters declared for one stage in the pipeline document.
pub type Params = serde_json::Map<String, Value>;

/// Deserialize stage parameters into a typed configuration struct.
///
/// Plugins should mark their config structs `#[serde(deny_unknown_fields)]`
/// so misspelled keys fail when the pipeline is bound rather than being
/// silently ignored.
///
/// # Errors
///
/// Returns a `Config` [`PluginError`] describing the first mismatch.
pub fn decode<T: DeserializeOwned>(params: &Params) -> Result<T, PluginError> {
    serde_json::from_value(Value::Object(params.clone()))
        .map_err(|e| PluginError::config("INVALID_PARAMS", e.to_string()))
}
