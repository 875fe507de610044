//! Record sinks.
//!
//! A scan commits its full record set through a [`RecordSink`] exactly once,
//! after every direction has been processed. The all-or-nothing contract is
//! deliberate: a scan is a complete grid, and a partial grid is not a
//! meaningful partial result. Sinks must not leave a partial artifact behind
//! when the commit itself fails.

use crate::accumulate::ScanRecord;
use crate::error::Result;
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

/// Destination for the completed record set.
///
/// Implement this to route scan output somewhere other than the bundled
/// JSON-lines file, e.g. into an analysis framework's own tabular store.
pub trait RecordSink {
    /// Persists the full record set in emission order. Called at most once
    /// per run, and only after the whole grid has been scanned.
    fn commit(&mut self, records: &[ScanRecord]) -> Result<()>;
}

/// Row layout of the persisted record set.
///
/// Field names match the columns downstream analysis scripts already read
/// (`angle`, `phi`, `nMaterials`, `matDepth`, `nX0`, `nLambda`, `material`);
/// the per-material sequences are aligned by index and have length
/// `nMaterials`.
#[derive(Serialize)]
struct RecordRow<'a> {
    angle: f64,
    phi: f64,
    #[serde(rename = "nMaterials")]
    n_materials: usize,
    #[serde(rename = "matDepth")]
    mat_depth: Vec<f64>,
    #[serde(rename = "nX0")]
    n_x0: Vec<f64>,
    #[serde(rename = "nLambda")]
    n_lambda: Vec<f64>,
    material: Vec<&'a str>,
}

impl<'a> From<&'a ScanRecord> for RecordRow<'a> {
    fn from(record: &'a ScanRecord) -> Self {
        Self {
            angle: record.angle,
            phi: record.phi,
            n_materials: record.material_count(),
            mat_depth: record.contributions.iter().map(|c| c.path_length).collect(),
            n_x0: record
                .contributions
                .iter()
                .map(|c| c.num_radiation_lengths)
                .collect(),
            n_lambda: record
                .contributions
                .iter()
                .map(|c| c.num_interaction_lengths)
                .collect(),
            material: record
                .contributions
                .iter()
                .map(|c| c.material.name.as_str())
                .collect(),
        }
    }
}

/// File sink writing one JSON object per record.
///
/// The destination file is only created at commit time, and every row is
/// serialized to a scratch buffer before the file is touched, so a failed
/// run or a failed serialization leaves no output file at all.
pub struct JsonLinesSink {
    path: PathBuf,
}

impl JsonLinesSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}

impl RecordSink for JsonLinesSink {
    fn commit(&mut self, records: &[ScanRecord]) -> Result<()> {
        let mut buffer = Vec::new();
        for record in records {
            serde_json::to_writer(&mut buffer, &RecordRow::from(record))?;
            buffer.push(b'\n');
        }

        let file = File::create(&self.path)?;
        let mut writer = BufWriter::new(file);
        writer.write_all(&buffer)?;
        writer.flush()?;
        log::info!(
            "committed {} records to {}",
            records.len(),
            self.path.display()
        );
        Ok(())
    }
}

/// In-process sink capturing records for tests or embedding.
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Vec<ScanRecord>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> &[ScanRecord] {
        &self.records
    }
}

impl RecordSink for MemorySink {
    fn commit(&mut self, records: &[ScanRecord]) -> Result<()> {
        self.records.extend_from_slice(records);
        Ok(())
    }
}
