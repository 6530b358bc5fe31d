//! Report generation for rendered figures
//!
//! - **HTML**: figures as inline SVG with clickable legends
//! - **JSON**: the figure model plus a per-trial table, for other tools
//! - **CSV**: one classification row per trial
//!
//! # Usage
//!
//! ```ignore
//! use rssiview::report;
//!
//! // Automatically picks format based on extension
//! report::generate("report.html", &figures, &trials)?;  // HTML
//! report::generate("report.json", &figures, &trials)?;  // JSON
//! report::generate("report.csv", &figures, &trials)?;   // CSV
//! ```

pub mod csv;
pub mod html;
pub mod json;
pub mod svg;

use crate::classify::{ProximityLabel, SpeedLabel};
use crate::render::Figure;
use crate::trial::Trial;
use serde::Serialize;
use std::io;
use std::path::Path;

/// Generate a report in the appropriate format based on file extension
pub fn generate<P: AsRef<Path>>(path: P, figures: &[Figure], trials: &[Trial]) -> io::Result<()> {
    let path = path.as_ref();
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    let mut file = std::fs::File::create(path)?;

    match ext.as_str() {
        "html" | "htm" => html::write(&mut file, figures, trials),
        "json" => json::write(&mut file, figures, trials),
        _ => csv::write(&mut file, trials),
    }
}

/// Trial counts by base speed and proximity
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Summary {
    pub total: usize,
    pub walk: usize,
    pub jog: usize,
    pub run: usize,
    pub close: usize,
    pub far: usize,
    pub unknown: usize,
}

impl Summary {
    pub fn from_trials(trials: &[Trial]) -> Self {
        let mut summary = Self {
            total: trials.len(),
            ..Self::default()
        };

        for t in trials {
            match t.class.speed.base() {
                SpeedLabel::Walk => summary.walk += 1,
                SpeedLabel::Jog => summary.jog += 1,
                _ => summary.run += 1,
            }
            match t.class.proximity {
                ProximityLabel::Close => summary.close += 1,
                ProximityLabel::Far => summary.far += 1,
                ProximityLabel::Unknown => summary.unknown += 1,
            }
        }

        summary
    }
}

/// One line of the classification table shared by the CSV and JSON reports.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrialRow {
    pub name: String,
    pub id: Option<String>,
    pub rows: usize,
    pub peak_rssi: Option<f64>,
    pub speed: SpeedLabel,
    pub proximity: ProximityLabel,
}

impl TrialRow {
    pub fn from_trial(trial: &Trial) -> Self {
        Self {
            name: trial.record.name.clone(),
            id: trial.record.id(),
            rows: trial.class.sample_count,
            peak_rssi: trial.class.peak_rssi,
            speed: trial.class.speed,
            proximity: trial.class.proximity,
        }
    }
}

/// Table rows in display order: by speed, then name.
pub fn rows(trials: &[Trial]) -> Vec<TrialRow> {
    let mut rows: Vec<TrialRow> = trials.iter().map(TrialRow::from_trial).collect();
    rows.sort_by(|a, b| a.speed.cmp(&b.speed).then_with(|| a.name.cmp(&b.name)));
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::Classification;
    use crate::config::Config;
    use crate::render;
    use crate::trial::{Sample, TrialRecord};
    use std::collections::BTreeMap;
    use std::path::PathBuf;

    // ==========================================================================
    // SUMMARY STATISTICS TESTS
    // ==========================================================================
    //
    // The Summary struct counts trials per speed and proximity. It is shown
    // at the top of the HTML report.
    // ==========================================================================

    fn create_test_trial(name: &str, speed: SpeedLabel, proximity: ProximityLabel) -> Trial {
        Trial {
            record: TrialRecord {
                path: PathBuf::from(format!("/runs/result_{}.json", name)),
                name: name.to_string(),
                base_ts: None,
                series: vec![Sample { t: 0, rssi: Some(-80.0) }],
                algorithms: BTreeMap::new(),
            },
            class: Classification {
                sample_count: 1,
                peak_rssi: Some(-80.0),
                first_t: Some(0),
                speed,
                proximity,
            },
        }
    }

    #[test]
    fn test_summary_empty() {
        let summary = Summary::from_trials(&[]);
        assert_eq!(summary, Summary::default());
    }

    #[test]
    fn test_summary_mixed() {
        let trials = vec![
            create_test_trial("a_001.csv", SpeedLabel::Walk, ProximityLabel::Close),
            create_test_trial("b_002.csv", SpeedLabel::Jog, ProximityLabel::Far),
            create_test_trial("c_003.csv", SpeedLabel::RunHand, ProximityLabel::Far),
            create_test_trial("d_004.csv", SpeedLabel::RunShoe, ProximityLabel::Unknown),
            create_test_trial("e_005.csv", SpeedLabel::Run, ProximityLabel::Close),
        ];
        let summary = Summary::from_trials(&trials);

        assert_eq!(summary.total, 5);
        assert_eq!((summary.walk, summary.jog, summary.run), (1, 1, 3));
        assert_eq!((summary.close, summary.far, summary.unknown), (2, 2, 1));
    }

    #[test]
    fn test_rows_sorted_by_speed_then_name() {
        let trials = vec![
            create_test_trial("z_009.csv", SpeedLabel::Walk, ProximityLabel::Close),
            create_test_trial("b_002.csv", SpeedLabel::Run, ProximityLabel::Far),
            create_test_trial("a_001.csv", SpeedLabel::Walk, ProximityLabel::Far),
        ];
        let names: Vec<String> = rows(&trials).into_iter().map(|r| r.name).collect();
        assert_eq!(names, vec!["a_001.csv", "z_009.csv", "b_002.csv"]);
    }

    // ==========================================================================
    // FORMAT DISPATCH
    // ==========================================================================

    #[test]
    fn test_generate_picks_format_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let trials = vec![create_test_trial("walk_001.csv", SpeedLabel::Walk, ProximityLabel::Close)];
        let figures = render::render_pages(&trials, &Config::default());

        let html_path = dir.path().join("report.HTML");
        let json_path = dir.path().join("report.json");
        let csv_path = dir.path().join("report.txt");
        generate(&html_path, &figures, &trials).unwrap();
        generate(&json_path, &figures, &trials).unwrap();
        generate(&csv_path, &figures, &trials).unwrap();

        let html = std::fs::read_to_string(html_path).unwrap();
        assert!(html.starts_with("<!DOCTYPE html>"));

        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(json_path).unwrap()).unwrap();
        assert_eq!(json["summary"]["total"], 1);

        let csv = std::fs::read_to_string(csv_path).unwrap();
        assert!(csv.starts_with("name,id,rows,peak_rssi,speed,proximity\n"));
    }
}
