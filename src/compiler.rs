//! Run compiler
//!
//! Produces the endpoints the viewer reads. A run directory holds the CSV
//! files named by each descriptor's `source` plus an optional `stats.csv`.
//! Compiling it writes `{output}/{type}/{id}.json` (chart id to series table)
//! and upserts the run into `{output}/runs.json`.
//!
//! Each CSV file is parsed once, however many charts read it. A chart whose
//! source file is missing is skipped with a warning.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use crate::catalog::{Catalog, Row};
use crate::error::{ChartsError, Result, ResultExt};
use crate::stats::{prepare_stats, read_stats_csv, StatsMap};
use crate::types::{Run, RunPayload};

/// Stats file name inside a run directory
pub const STATS_FILE: &str = "stats.csv";

/// Run index file name inside the output directory
pub const RUNS_INDEX_FILE: &str = "runs.json";

/// What a compilation produced
#[derive(Debug, Clone, PartialEq)]
pub struct CompileReport {
    /// Path of the written run payload
    pub payload_path: PathBuf,
    /// Ids of the charts written to the payload
    pub charts: Vec<String>,
    /// Ids of the charts skipped because their source was missing
    pub skipped: Vec<String>,
    /// The run entry written to the index
    pub run: Run,
}

/// Compiles run directories against a catalog
pub struct RunCompiler<'a> {
    catalog: &'a Catalog,
}

impl<'a> RunCompiler<'a> {
    pub fn new(catalog: &'a Catalog) -> Self {
        Self { catalog }
    }

    /// Compile `input` into `output` as `run`
    pub fn compile(&self, input: &Path, output: &Path, mut run: Run) -> Result<CompileReport> {
        if !input.is_dir() {
            return Err(ChartsError::Config(format!(
                "Run directory {} does not exist",
                input.display()
            )));
        }
        tracing::info!("Compiling run '{}' from {}", run.id, input.display());

        let stats = load_stats(input)?;
        let mut sources: HashMap<String, Option<Vec<Row>>> = HashMap::new();
        let mut payload = RunPayload::new();
        let mut skipped = Vec::new();

        for descriptor in self.catalog.charts() {
            if !sources.contains_key(&descriptor.source) {
                let rows = read_source(&input.join(&descriptor.source))?;
                sources.insert(descriptor.source.clone(), rows);
            }
            match sources.get(&descriptor.source).and_then(Option::as_ref) {
                Some(rows) => {
                    let table = descriptor.compute(rows, &stats);
                    tracing::debug!("Chart '{}': {} series", descriptor.id, table.len());
                    payload.insert(descriptor.id.clone(), table);
                }
                None => {
                    tracing::warn!(
                        "Skipping chart '{}': {} not found",
                        descriptor.id,
                        descriptor.source
                    );
                    skipped.push(descriptor.id.clone());
                }
            }
        }

        let payload_dir = output.join(&run.kind);
        std::fs::create_dir_all(&payload_dir)
            .with_context(|| format!("Failed to create {}", payload_dir.display()))?;
        let payload_path = payload_dir.join(format!("{}.json", run.id));
        write_json(&payload_path, &payload)?;

        run.loaded = false;
        run.stats = (!stats.is_empty()).then(|| stats.to_json_map());
        run.created_at = Some(chrono::Utc::now());
        upsert_run(&output.join(RUNS_INDEX_FILE), run.clone())?;

        tracing::info!(
            "Wrote {} charts to {} ({} skipped)",
            payload.len(),
            payload_path.display(),
            skipped.len()
        );
        Ok(CompileReport {
            payload_path,
            charts: payload.keys().cloned().collect(),
            skipped,
            run,
        })
    }
}

fn load_stats(input: &Path) -> Result<StatsMap> {
    let path = input.join(STATS_FILE);
    if !path.exists() {
        tracing::debug!("No {} in {}", STATS_FILE, input.display());
        return Ok(StatsMap::default());
    }
    let records = read_stats_csv(&path)?;
    Ok(prepare_stats(&records))
}

/// Read a CSV file into rows; `None` when the file does not exist
pub fn read_source(path: &Path) -> Result<Option<Vec<Row>>> {
    if !path.exists() {
        return Ok(None);
    }
    read_rows(path).map(Some)
}

/// Read every record of a CSV file, keyed by header
pub fn read_rows(path: &Path) -> Result<Vec<Row>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;
    let headers = reader
        .headers()
        .with_context(|| format!("Failed to read header of {}", path.display()))?
        .clone();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.with_context(|| format!("Bad record in {}", path.display()))?;
        rows.push(Row::from_pairs(headers.iter().zip(record.iter())));
    }
    Ok(rows)
}

fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<()> {
    let content = serde_json::to_string(value)?;
    std::fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))
}

fn upsert_run(index: &Path, run: Run) -> Result<()> {
    let mut runs: Vec<Run> = if index.exists() {
        let content = std::fs::read_to_string(index)
            .with_context(|| format!("Failed to read {}", index.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse {}", index.display()))?
    } else {
        Vec::new()
    };

    match runs.iter_mut().find(|r| r.id == run.id) {
        Some(existing) => *existing = run,
        None => runs.push(run),
    }

    if let Some(parent) = index.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    write_json(index, &runs)
}

/// Chart ids grouped by source file, for listing what a run directory needs
pub fn sources_by_file(catalog: &Catalog) -> BTreeMap<String, Vec<String>> {
    let mut sources: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for descriptor in catalog.charts() {
        sources
            .entry(descriptor.source.clone())
            .or_default()
            .push(descriptor.id.clone());
    }
    sources
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_rows_trims_and_keys_by_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("x.csv");
        std::fs::write(&path, "Year, Gender\n2000, MALE\n2001,FEMALE\n").unwrap();

        let rows = read_rows(&path).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get("Gender"), Some("MALE"));
        assert_eq!(rows[1].number("Year"), 2001.0);
    }

    #[test]
    fn test_missing_source_is_none() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(read_source(&dir.path().join("nope.csv")).unwrap(), None);
    }

    #[test]
    fn test_sources_by_file_groups_builtin_charts() {
        let catalog = crate::catalog::builtin_catalog().unwrap();
        let sources = sources_by_file(&catalog);
        assert!(sources["incidence.csv"].contains(&"incidenceByYear".to_string()));
        assert!(sources["mortality.csv"].contains(&"mortality".to_string()));
    }
}
