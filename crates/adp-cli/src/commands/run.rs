use std::path::Path;

use adp_engine::{run_pipeline, RunSummary};
use anyhow::Result;

/// Execute the `run` command: load, bind and run a pipeline once.
pub fn execute(pipeline_path: &Path, workdir: Option<&Path>, json: bool) -> Result<()> {
    let mut spec = super::load(pipeline_path)?;
    if let Some(dir) = workdir {
        spec.workdir = Some(dir.to_path_buf());
    }

    tracing::info!(
        pipeline = %spec.name,
        source = %spec.source.class,
        sink = %spec.sink.class,
        transforms = spec.transforms.len(),
        "Pipeline loaded"
    );

    let registry = super::registry()?;
    let summary = run_pipeline(&spec, &registry)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_summary(&summary);
    }
    Ok(())
}

fn print_summary(summary: &RunSummary) {
    println!("Pipeline '{}' completed successfully.", summary.pipeline);
    println!("  Records read:    {}", summary.records_read);
    println!("  Records written: {}", summary.records_written);
    for outcome in &summary.stages {
        println!(
            "    {:16} {:18} {} record(s)",
            outcome.stage.to_string(),
            outcome.plugin.as_str(),
            outcome.records
        );
    }
    for path in &summary.paths {
        println!("  Output:          {}", path.display());
    }
    match (&summary.state, summary.state_advanced) {
        (Some(state), true) => println!("  State saved:     {}", state.data),
        _ => println!("  State saved:     no"),
    }
    println!("  Duration:        {:.2}s", summary.duration_secs);
}
