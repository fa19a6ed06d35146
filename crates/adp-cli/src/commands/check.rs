use std::path::Path;

use adp_engine::check_pipeline;
use anyhow::Result;

/// Execute the `check` command: bind every stage and open the state store.
pub fn execute(pipeline_path: &Path) -> Result<()> {
    let spec = super::load(pipeline_path)?;
    println!("Pipeline structure: OK");

    let registry = super::registry()?;
    let result = check_pipeline(&spec, &registry)?;

    for stage in &result.stages {
        println!(
            "{:18} OK ({} {})",
            format!("{}:", stage.stage),
            stage.kind,
            stage.plugin
        );
    }
    println!("Output directory:  {}", result.outdir.display());

    if result.state_ok {
        println!("State backend:     OK");
        println!("\nAll checks passed.");
        Ok(())
    } else {
        println!("State backend:     FAILED");
        anyhow::bail!("One or more checks failed")
    }
}
