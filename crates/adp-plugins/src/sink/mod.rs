//! Built-in file sinks.
//!
//! Every sink writes through [`AtomicArtifact`] (or, for SQLite, a single
//! transaction), so a failed run never leaves a half-written output.

pub mod delimited;
pub mod geojson;
pub mod json;
pub mod jsonl;
pub mod sqlite;

use std::io::{BufWriter, Write};

use adp_engine::{PluginRegistry, Registration, RegistryError};
use adp_sdk::prelude::*;

use crate::config::{schema_of, PluginConfig};

fn registration<C, S>(
    name: &'static str,
    description: &str,
    build: fn(C) -> S,
) -> Result<Registration, RegistryError>
where
    C: PluginConfig + 'static,
    S: Sink + 'static,
{
    Ok(Registration::sink(name, move |params| {
        let config = C::from_params(params)?;
        Ok(Box::new(build(config)) as Box<dyn Sink>)
    })
    .with_schema(schema_of::<C>(name)?)
    .with_description(description))
}

pub(crate) fn register(registry: &mut PluginRegistry) -> Result<(), RegistryError> {
    registry.register(registration(
        jsonl::NAME,
        "Write records as newline-delimited JSON",
        jsonl::JsonLinesSink::new,
    )?)?;
    registry.register(registration(
        json::NAME,
        "Write records as a JSON array",
        json::JsonArraySink::new,
    )?)?;
    registry.register(registration(
        geojson::NAME,
        "Write records as a GeoJSON FeatureCollection",
        geojson::GeoJsonSink::new,
    )?)?;
    registry.register(registration(
        delimited::NAME,
        "Write records as CSV with a header row",
        delimited::CsvSink::new,
    )?)?;
    registry.register(registration(
        sqlite::NAME,
        "Write records into an SQLite table",
        sqlite::SqliteSink::new,
    )?)?;
    Ok(())
}

/// Text around the encoded records of a streamed JSON document.
pub(crate) struct Framing {
    pub open: &'static str,
    /// Before the first record.
    pub first: &'static str,
    /// Between records.
    pub separator: &'static str,
    /// After the last record, if there was one.
    pub tail: &'static str,
    pub close: &'static str,
}

/// Stream `input` into `filename` under the output directory, one JSON
/// value per record.
pub(crate) fn write_framed<F>(
    ctx: &StageContext,
    filename: &str,
    input: RecordStream<'_>,
    framing: &Framing,
    mut encode: F,
) -> Result<WriteSummary, PluginError>
where
    F: FnMut(Record) -> Value,
{
    let mut artifact = AtomicArtifact::create(ctx.output_path(filename))?;
    let mut out = BufWriter::new(&mut artifact);
    out.write_all(framing.open.as_bytes())?;

    let mut count = 0u64;
    for item in input {
        let value = encode(item?);
        let lead = if count == 0 {
            framing.first
        } else {
            framing.separator
        };
        out.write_all(lead.as_bytes())?;
        serde_json::to_writer(&mut out, &value)?;
        count += 1;
    }
    if count > 0 {
        out.write_all(framing.tail.as_bytes())?;
    }
    out.write_all(framing.close.as_bytes())?;
    out.flush()?;
    drop(out);

    let path = artifact.commit()?;
    tracing::info!(path = %path.display(), records = count, "Wrote artifact");
    Ok(WriteSummary::new(count).with_path(path))
}

/// Column order for tabular sinks: every key, in first-seen order.
pub(crate) fn union_columns(records: &[Record]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut columns = Vec::new();
    for record in records {
        for key in record.keys() {
            if seen.insert(key.as_str()) {
                columns.push(key.clone());
            }
        }
    }
    columns
}
