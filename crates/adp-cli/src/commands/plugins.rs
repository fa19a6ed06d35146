use adp_engine::PluginRegistry;
use anyhow::Result;
use serde_json::{json, Value};

/// Execute the `plugins` command: list registered plugins.
pub fn execute(as_json: bool) -> Result<()> {
    let registry = super::registry()?;
    if as_json {
        println!("{}", serde_json::to_string_pretty(&describe(&registry))?);
        return Ok(());
    }

    if registry.is_empty() {
        println!("No plugins registered.");
        return Ok(());
    }
    for registration in registry.list() {
        println!(
            "  {:18} {:10} {}",
            registration.name().as_str(),
            registration.kind().as_str(),
            registration.description()
        );
    }
    Ok(())
}

fn describe(registry: &PluginRegistry) -> Value {
    Value::Array(
        registry
            .list()
            .map(|r| {
                json!({
                    "name": r.name().as_str(),
                    "kind": r.kind().as_str(),
                    "description": r.description(),
                    "schema": r.schema(),
                })
            })
            .collect(),
    )
}
