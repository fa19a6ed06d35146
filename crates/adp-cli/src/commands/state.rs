use std::path::Path;

use adp_engine::resolve::create_state_backend;
use anyhow::{Context, Result};

/// Execute the `state` command: print the stored state of the source.
pub fn execute(pipeline_path: &Path) -> Result<()> {
    let spec = super::load(pipeline_path)?;
    let backend = create_state_backend(&spec.state)?;
    let entry = backend
        .load_entry(&spec.name, &spec.source.class)
        .with_context(|| format!("Failed to read state for pipeline '{}'", spec.name))?;

    match entry {
        Some(entry) => println!("{}", serde_json::to_string_pretty(&entry)?),
        None => println!(
            "No state stored for pipeline '{}' (source {}).",
            spec.name, spec.source.class
        ),
    }
    Ok(())
}
