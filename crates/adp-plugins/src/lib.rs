//! Built-in adp plugins.
//!
//! | name | kind |
//! |---|---|
//! | `file:ndjson` | source |
//! | `record:rename`, `record:select`, `record:drop`, `record:filter`, `record:explode` | transform |
//! | `file:jsonl`, `file:json`, `file:geojson`, `file:csv`, `file:sqlite` | sink |
//!
//! Names are unique across capability kinds, so the NDJSON reader and
//! writer are registered under different names.

pub mod config;
pub mod sink;
pub mod source;
pub mod transform;

use adp_engine::{PluginBundle, PluginRegistry, RegistryError};

/// Entry point registering every built-in plugin.
///
/// # Errors
///
/// Fails if any built-in name is already taken in `registry`.
pub fn register_builtins(registry: &mut PluginRegistry) -> Result<(), RegistryError> {
    source::register(registry)?;
    transform::register(registry)?;
    sink::register(registry)?;
    Ok(())
}

/// Bundles shipped with this crate, for [`PluginRegistry::with_bundles`].
pub const BUNDLES: &[PluginBundle] = &[register_builtins];

#[cfg(test)]
mod tests {
    use super::*;
    use adp_types::CapabilityKind;

    #[test]
    fn builtins_register_without_clashes() {
        let registry = PluginRegistry::with_bundles(BUNDLES).unwrap();
        let names: Vec<(&str, CapabilityKind)> = registry
            .list()
            .map(|r| (r.name().as_str(), r.kind()))
            .collect();
        assert_eq!(
            names,
            vec![
                ("file:csv", CapabilityKind::Sink),
                ("file:geojson", CapabilityKind::Sink),
                ("file:json", CapabilityKind::Sink),
                ("file:jsonl", CapabilityKind::Sink),
                ("file:ndjson", CapabilityKind::Source),
                ("file:sqlite", CapabilityKind::Sink),
                ("record:drop", CapabilityKind::Transform),
                ("record:explode", CapabilityKind::Transform),
                ("record:filter", CapabilityKind::Transform),
                ("record:rename", CapabilityKind::Transform),
                ("record:select", CapabilityKind::Transform),
            ]
        );
        assert!(registry.list().all(|r| r.schema().is_some()));
    }

    #[test]
    fn installing_twice_fails() {
        let mut registry = PluginRegistry::with_bundles(BUNDLES).unwrap();
        assert!(matches!(
            registry.install(register_builtins),
            Err(RegistryError::DuplicateName { .. })
        ));
    }
}
