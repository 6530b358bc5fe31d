//! Reading trial result files from disk
//!
//! A batch folder routinely contains half-written or foreign JSON files, and
//! one bad file must never hide the rest. Every failure is logged and the file
//! is skipped.

use super::{AlgorithmResult, LinePoint, Sample, StateEvent, TrialRecord, STATE_ORDER};
use crate::error::LoadError;
use crate::render::MEASURED;
use rayon::prelude::*;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

#[derive(Deserialize)]
struct ResultFile {
    #[serde(rename = "sampleFile", alias = "name", default)]
    sample_file: Option<String>,
    #[serde(rename = "baseTs", default, deserialize_with = "lenient_int")]
    base_ts: Option<i64>,
    series: Vec<RawSample>,
    algorithms: BTreeMap<String, RawAlgorithm>,
}

#[derive(Deserialize)]
struct RawSample {
    t: i64,
    #[serde(default, deserialize_with = "lenient_number")]
    rssi: Option<f64>,
}

#[derive(Deserialize)]
struct RawAlgorithm {
    #[serde(default)]
    line: Option<Vec<RawLinePoint>>,
    #[serde(default)]
    states: Option<BTreeMap<String, Value>>,
    /// Flat layout: state tags written next to `line`
    #[serde(flatten)]
    rest: BTreeMap<String, Value>,
}

#[derive(Deserialize)]
struct RawLinePoint {
    #[serde(default, deserialize_with = "lenient_int")]
    t: Option<i64>,
    #[serde(default, deserialize_with = "lenient_number")]
    v: Option<f64>,
}

#[derive(Deserialize)]
struct RawEvent {
    #[serde(default, deserialize_with = "lenient_int")]
    t: Option<i64>,
    #[serde(default, deserialize_with = "lenient_number")]
    rssi: Option<f64>,
}

fn lenient_number<'de, D: Deserializer<'de>>(de: D) -> Result<Option<f64>, D::Error> {
    let value = Option::<Value>::deserialize(de)?;
    Ok(value.and_then(|v| v.as_f64()).filter(|v| v.is_finite()))
}

fn lenient_int<'de, D: Deserializer<'de>>(de: D) -> Result<Option<i64>, D::Error> {
    let value = Option::<Value>::deserialize(de)?;
    Ok(value.and_then(|v| {
        v.as_i64()
            .or_else(|| v.as_f64().filter(|f| f.is_finite()).map(|f| f.round() as i64))
    }))
}

impl RawAlgorithm {
    fn into_result(self) -> AlgorithmResult {
        let line = self
            .line
            .unwrap_or_default()
            .into_iter()
            .map(|p| LinePoint { t: p.t, v: p.v })
            .collect();

        let source = self.states.unwrap_or_default();
        let mut states = BTreeMap::new();
        for tag in STATE_ORDER {
            let node = source.get(tag.as_str()).or_else(|| self.rest.get(tag.as_str()));
            // null or a non-object means the stage is absent
            if let Some(node @ Value::Object(_)) = node {
                if let Ok(ev) = serde_json::from_value::<RawEvent>(node.clone()) {
                    states.insert(tag, StateEvent { t: ev.t, rssi: ev.rssi });
                }
            }
        }

        AlgorithmResult { line, states }
    }
}

/// Parse a single trial file.
pub fn load_file<P: AsRef<Path>>(path: P) -> Result<TrialRecord, LoadError> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_record(path, &text)
}

pub(crate) fn parse_record(path: &Path, text: &str) -> Result<TrialRecord, LoadError> {
    let raw: ResultFile = serde_json::from_str(text).map_err(|source| LoadError::Json {
        path: path.to_path_buf(),
        source,
    })?;

    let name = raw.sample_file.unwrap_or_else(|| {
        path.file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string())
    });

    Ok(TrialRecord {
        path: path.to_path_buf(),
        name,
        base_ts: raw.base_ts,
        series: raw
            .series
            .into_iter()
            .map(|s| Sample { t: s.t, rssi: s.rssi })
            .collect(),
        algorithms: rename_reserved(path, raw.algorithms)
            .into_iter()
            .map(|(label, algo)| (label, algo.into_result()))
            .collect(),
    })
}

/// Move an algorithm named like the raw series to a label of its own, so its
/// overlays never share a legend entry with the measured samples.
fn rename_reserved<T>(path: &Path, mut algorithms: BTreeMap<String, T>) -> BTreeMap<String, T> {
    if let Some(algo) = algorithms.remove(MEASURED) {
        let mut label = format!("{} (algorithm)", MEASURED);
        while algorithms.contains_key(&label) {
            label.push_str(" (algorithm)");
        }
        warn!(
            "{}: algorithm '{}' renamed to '{}' to keep it apart from the raw series",
            path.display(),
            MEASURED,
            label
        );
        algorithms.insert(label, algo);
    }
    algorithms
}

/// Result of loading a batch: what parsed, and what was skipped and why.
#[derive(Debug, Default)]
pub struct LoadOutcome {
    pub records: Vec<TrialRecord>,
    pub skipped: Vec<(PathBuf, LoadError)>,
}

/// Load every path, keeping input order. Failures are logged and skipped.
pub fn load_all(paths: &[PathBuf]) -> LoadOutcome {
    load_all_with(paths, |_| {})
}

/// Like [`load_all`], calling `on_done` once per file as it finishes.
pub fn load_all_with<F>(paths: &[PathBuf], on_done: F) -> LoadOutcome
where
    F: Fn(&Path) + Sync,
{
    let results: Vec<Result<TrialRecord, LoadError>> = paths
        .par_iter()
        .map(|p| {
            let r = load_file(p);
            on_done(p);
            r
        })
        .collect();

    let mut outcome = LoadOutcome::default();
    for (path, result) in paths.iter().zip(results) {
        match result {
            Ok(record) => {
                debug!(file = %path.display(), samples = record.series.len(), "loaded trial");
                outcome.records.push(record);
            }
            Err(e) => {
                warn!("skipping {}: {}", path.display(), e);
                outcome.skipped.push((path.clone(), e));
            }
        }
    }
    outcome
}

fn is_result_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.starts_with("result_") && n.to_ascii_lowercase().ends_with(".json"))
        .unwrap_or(false)
}

/// Expand a path into the sorted list of `result_*.json` files beneath it.
///
/// A path naming a file is returned as-is, whatever its name.
pub fn collect_result_files<P: AsRef<Path>>(path: P) -> Vec<PathBuf> {
    let path = path.as_ref();
    if !path.is_dir() {
        return if path.exists() { vec![path.to_path_buf()] } else { vec![] };
    }

    let mut files: Vec<PathBuf> = WalkDir::new(path)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file() && is_result_file(e.path()))
        .map(|e| e.path().to_path_buf())
        .collect();
    files.sort();
    files
}

fn trailing_digits(s: &str) -> &str {
    let start = s
        .char_indices()
        .rev()
        .take_while(|(_, c)| c.is_ascii_digit())
        .last()
        .map(|(i, _)| i)
        .unwrap_or(s.len());
    &s[start..]
}

/// Last three digits of the number that ends `name` before its extension.
///
/// `calibration_data_1761170896.csv` gives `896`. Extensions are peeled one at a
/// time, so `result_calibration_data_1761170896.csv.json` gives `896` as well.
pub fn id_suffix(name: &str) -> Option<String> {
    let mut current = name;
    loop {
        let digits = trailing_digits(current);
        if !digits.is_empty() {
            let keep = digits.len().saturating_sub(3);
            return Some(digits[keep..].to_string());
        }
        match current.rfind('.') {
            Some(dot) => current = &current[..dot],
            None => return None,
        }
    }
}

/// Keep only trials whose [`id_suffix`] matches one of `ids`.
///
/// An empty `ids` keeps everything. Ids that match nothing are reported.
pub fn select_by_ids<T, F>(items: Vec<T>, ids: &[u32], name_of: F) -> Vec<T>
where
    F: Fn(&T) -> &str,
{
    if ids.is_empty() {
        return items;
    }

    let wanted: BTreeSet<String> = ids.iter().map(|i| format!("{:03}", i % 1000)).collect();
    let before = items.len();
    let mut matched = BTreeSet::new();
    let selected: Vec<T> = items
        .into_iter()
        .filter(|item| match id_suffix(name_of(item)) {
            Some(id) if wanted.contains(&id) => {
                matched.insert(id);
                true
            }
            _ => false,
        })
        .collect();

    for id in wanted.difference(&matched) {
        warn!("no trial matches id {}", id);
    }
    debug!("selected {} of {} trials for ids {:?}", selected.len(), before, wanted);
    if selected.is_empty() {
        warn!("no trials left after id selection; check the ids against the sample file names");
    }
    selected
}
