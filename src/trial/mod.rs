//! Trial records: one calibration pass of a tag past a receiver
//!
//! A trial file holds the raw RSSI series the receiver measured plus, for each
//! proximity-detection algorithm that was replayed over it, the algorithm's
//! smoothed output line and the lifecycle states it reached:
//!
//! ```text
//! {
//!   "sampleFile": "calibration_data_1761170896.csv",
//!   "series": [ {"t": 0, "rssi": -91}, {"t": 120, "rssi": -88}, ... ],
//!   "algorithms": {
//!     "EMA(alpha=0.3)": {
//!       "line": [ {"t": 0, "v": -91.0}, ... ],
//!       "APPROACHING": {"t": 240, "rssi": -86},
//!       "HERE":        {"t": 960, "rssi": -79},
//!       "LOGGED":      {"t": null, "rssi": null},
//!       "PEAK":        {"t": null, "rssi": null}
//!     }
//!   }
//! }
//! ```

pub mod loader;

use crate::classify::Classification;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

pub use loader::{collect_result_files, id_suffix, load_all, load_file, select_by_ids, LoadOutcome};

/// One raw RSSI measurement, `t` in milliseconds from the trial's base time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Sample {
    pub t: i64,
    /// `None` when the file carried something that is not a number
    pub rssi: Option<f64>,
}

/// Lifecycle stages an algorithm can report, in the order they are drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StateTag {
    Approaching,
    Here,
    Logged,
    Peak,
}

pub const STATE_ORDER: [StateTag; 4] = [
    StateTag::Approaching,
    StateTag::Here,
    StateTag::Logged,
    StateTag::Peak,
];

impl StateTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            StateTag::Approaching => "APPROACHING",
            StateTag::Here => "HERE",
            StateTag::Logged => "LOGGED",
            StateTag::Peak => "PEAK",
        }
    }
}

impl fmt::Display for StateTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct StateEvent {
    pub t: Option<i64>,
    pub rssi: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct LinePoint {
    pub t: Option<i64>,
    pub v: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct AlgorithmResult {
    pub line: Vec<LinePoint>,
    pub states: BTreeMap<StateTag, StateEvent>,
}

impl AlgorithmResult {
    /// Whether the algorithm actually reached `tag`.
    ///
    /// Trial generators write `{"t": null}` for stages that never happened,
    /// so a tag only counts when it carries a timestamp.
    pub fn reached(&self, tag: StateTag) -> bool {
        self.states.get(&tag).map_or(false, |e| e.t.is_some())
    }

    /// Line points with both coordinates present.
    pub fn valid_line(&self) -> Vec<(i64, f64)> {
        self.line
            .iter()
            .filter_map(|p| Some((p.t?, p.v?)))
            .collect()
    }

    /// Entered the approach/presence stages but never got logged.
    pub fn missed_log(&self) -> bool {
        (self.reached(StateTag::Approaching) || self.reached(StateTag::Here))
            && !self.reached(StateTag::Logged)
    }
}

/// A parsed trial file. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrialRecord {
    pub path: PathBuf,
    pub name: String,
    pub base_ts: Option<i64>,
    pub series: Vec<Sample>,
    pub algorithms: BTreeMap<String, AlgorithmResult>,
}

impl TrialRecord {
    pub fn sample_count(&self) -> usize {
        self.series.len()
    }

    /// Strongest numeric RSSI in the series.
    pub fn peak_rssi(&self) -> Option<f64> {
        self.numeric_rssi().reduce(f64::max)
    }

    pub fn first_t(&self) -> Option<i64> {
        self.series.iter().map(|s| s.t).min()
    }

    pub fn numeric_rssi(&self) -> impl Iterator<Item = f64> + '_ {
        self.series.iter().filter_map(|s| s.rssi)
    }

    /// Short numeric id used for selecting trials on the command line.
    pub fn id(&self) -> Option<String> {
        id_suffix(&self.name)
    }
}

/// A trial with its derived labels attached.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trial {
    pub record: TrialRecord,
    pub class: Classification,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn algo(states: &[(StateTag, Option<i64>)]) -> AlgorithmResult {
        AlgorithmResult {
            line: vec![],
            states: states
                .iter()
                .map(|&(tag, t)| (tag, StateEvent { t, rssi: None }))
                .collect(),
        }
    }

    #[test]
    fn test_state_order_is_lifecycle_order() {
        let mut tags = STATE_ORDER.to_vec();
        tags.sort();
        assert_eq!(tags, STATE_ORDER.to_vec());
        assert_eq!(STATE_ORDER[0].as_str(), "APPROACHING");
        assert_eq!(STATE_ORDER[3].to_string(), "PEAK");
    }

    #[test]
    fn test_null_timestamp_is_not_reached() {
        let a = algo(&[(StateTag::Approaching, Some(100)), (StateTag::Logged, None)]);
        assert!(a.reached(StateTag::Approaching));
        assert!(!a.reached(StateTag::Logged));
        assert!(!a.reached(StateTag::Here));
        assert!(a.missed_log());
    }

    #[test]
    fn test_missed_log_requires_an_entry_stage() {
        assert!(!algo(&[]).missed_log());
        assert!(!algo(&[(StateTag::Peak, Some(5))]).missed_log());
        assert!(algo(&[(StateTag::Here, Some(5))]).missed_log());
        assert!(!algo(&[(StateTag::Here, Some(5)), (StateTag::Logged, Some(9))]).missed_log());
    }

    #[test]
    fn test_valid_line_drops_partial_points() {
        let a = AlgorithmResult {
            line: vec![
                LinePoint { t: Some(0), v: Some(-90.0) },
                LinePoint { t: None, v: Some(-89.0) },
                LinePoint { t: Some(20), v: None },
                LinePoint { t: Some(30), v: Some(-85.5) },
            ],
            states: BTreeMap::new(),
        };
        assert_eq!(a.valid_line(), vec![(0, -90.0), (30, -85.5)]);
    }

    #[test]
    fn test_peak_ignores_non_numeric_samples() {
        let record = TrialRecord {
            path: PathBuf::from("result_x.json"),
            name: "calibration_data_1761170896.csv".into(),
            base_ts: None,
            series: vec![
                Sample { t: 50, rssi: Some(-90.0) },
                Sample { t: 10, rssi: None },
                Sample { t: 90, rssi: Some(-74.0) },
            ],
            algorithms: BTreeMap::new(),
        };
        assert_eq!(record.sample_count(), 3);
        assert_eq!(record.peak_rssi(), Some(-74.0));
        assert_eq!(record.first_t(), Some(10));
        assert_eq!(record.id().as_deref(), Some("896"));
    }
}
