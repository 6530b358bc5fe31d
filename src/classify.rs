//! Guessing what kind of pass a trial was
//!
//! Trial files carry no ground truth about how the tag moved. The labels are
//! inferred from the data itself:
//!
//! - **Speed**: a receiver samples at a roughly fixed rate, so the number of
//!   samples captured while the tag is in range tracks how long it lingered.
//!   Few samples means a run, many means a walk.
//! - **Proximity**: the strongest RSSI seen during the pass. Closer passes peak
//!   higher (less negative).
//!
//! Runs were recorded in two sessions (tag in hand, then tag on shoe). The
//! trellis view splits them by recording time, which is only possible once the
//! whole batch of runs is known; see [`refine_run_subtypes`].

use crate::config::ClassifyConfig;
use crate::trial::{Trial, TrialRecord};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum SpeedLabel {
    Walk,
    Jog,
    Run,
    #[serde(rename = "Run (Hand)")]
    RunHand,
    #[serde(rename = "Run (Shoe)")]
    RunShoe,
}

impl SpeedLabel {
    /// Folds the run subtypes back into plain `Run`.
    pub fn base(&self) -> SpeedLabel {
        match self {
            SpeedLabel::RunHand | SpeedLabel::RunShoe => SpeedLabel::Run,
            other => *other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SpeedLabel::Walk => "Walk",
            SpeedLabel::Jog => "Jog",
            SpeedLabel::Run => "Run",
            SpeedLabel::RunHand => "Run (Hand)",
            SpeedLabel::RunShoe => "Run (Shoe)",
        }
    }
}

impl fmt::Display for SpeedLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum ProximityLabel {
    Close,
    Far,
    Unknown,
}

impl ProximityLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProximityLabel::Close => "Close",
            ProximityLabel::Far => "Far",
            ProximityLabel::Unknown => "?",
        }
    }
}

impl fmt::Display for ProximityLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Labels derived from a trial's raw series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Classification {
    pub sample_count: usize,
    pub peak_rssi: Option<f64>,
    /// Earliest sample timestamp, used to order runs by recording session
    pub first_t: Option<i64>,
    pub speed: SpeedLabel,
    pub proximity: ProximityLabel,
}

pub fn speed_for(sample_count: usize, config: &ClassifyConfig) -> SpeedLabel {
    if sample_count <= config.run_max_rows {
        SpeedLabel::Run
    } else if sample_count >= config.walk_min_rows {
        SpeedLabel::Walk
    } else {
        SpeedLabel::Jog
    }
}

pub fn proximity_for(peak_rssi: Option<f64>, config: &ClassifyConfig) -> ProximityLabel {
    match peak_rssi {
        None => ProximityLabel::Unknown,
        Some(peak) if peak >= config.close_peak_dbm => ProximityLabel::Close,
        Some(_) => ProximityLabel::Far,
    }
}

pub fn classify(record: &TrialRecord, config: &ClassifyConfig) -> Classification {
    let sample_count = record.sample_count();
    let peak_rssi = record.peak_rssi();
    Classification {
        sample_count,
        peak_rssi,
        first_t: record.first_t(),
        speed: speed_for(sample_count, config),
        proximity: proximity_for(peak_rssi, config),
    }
}

/// Attach classifications to a batch of freshly loaded records.
pub fn classify_all(records: Vec<TrialRecord>, config: &ClassifyConfig) -> Vec<Trial> {
    records
        .into_iter()
        .map(|record| {
            let class = classify(&record, config);
            Trial { record, class }
        })
        .collect()
}

/// Split the batch's runs into the hand-held and shoe-mounted sessions.
///
/// Runs are stable-sorted by earliest timestamp (trials without one first,
/// ties by name, then by batch position). The later `ceil(N/2)` become
/// `Run (Shoe)`, the rest `Run (Hand)`. Already refined runs take part again,
/// so calling this twice gives the same labels.
pub fn refine_run_subtypes(trials: &mut [Trial]) {
    let mut runs: Vec<usize> = trials
        .iter()
        .enumerate()
        .filter(|(_, t)| t.class.speed.base() == SpeedLabel::Run)
        .map(|(i, _)| i)
        .collect();

    runs.sort_by(|&a, &b| {
        let (ta, tb) = (&trials[a], &trials[b]);
        ta.class
            .first_t
            .cmp(&tb.class.first_t)
            .then_with(|| ta.record.name.cmp(&tb.record.name))
    });

    let mid = runs.len() / 2;
    for (rank, &idx) in runs.iter().enumerate() {
        trials[idx].class.speed = if rank >= mid {
            SpeedLabel::RunShoe
        } else {
            SpeedLabel::RunHand
        };
    }
}

/// Trial counts per (speed, proximity) facet.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FacetSummary {
    pub total: usize,
    pub counts: BTreeMap<(SpeedLabel, ProximityLabel), usize>,
}

impl FacetSummary {
    pub fn from_trials(trials: &[Trial]) -> Self {
        let mut summary = Self {
            total: trials.len(),
            ..Self::default()
        };
        for t in trials {
            *summary.counts.entry((t.class.speed, t.class.proximity)).or_insert(0) += 1;
        }
        summary
    }

    pub fn count(&self, speed: SpeedLabel, proximity: ProximityLabel) -> usize {
        self.counts.get(&(speed, proximity)).copied().unwrap_or(0)
    }

    /// Speeds that actually occur, in display order.
    pub fn speeds(&self) -> Vec<SpeedLabel> {
        let mut speeds: Vec<SpeedLabel> = self.counts.keys().map(|(s, _)| *s).collect();
        speeds.dedup();
        speeds
    }
}
