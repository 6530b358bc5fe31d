//! rssiview - Compare proximity-detection algorithms on RSSI calibration trials
//!
//! A calibration campaign walks, jogs and runs a Bluetooth tag past a
//! receiver many times. Each pass is saved as a trial file holding the raw
//! RSSI series and, for every detection algorithm replayed over it, the
//! algorithm's smoothed line and the moments it reported APPROACHING, HERE,
//! LOGGED and PEAK. rssiview lays those trials out side by side so the
//! algorithms can be compared by eye.
//!
//! # Pipeline
//!
//! 1. **Load** ([`trial`]): parse every `result_*.json`, skipping bad files
//! 2. **Classify** ([`classify`]): guess speed from sample count and
//!    proximity from peak RSSI
//! 3. **Lay out** ([`layout`]): paginated, fixed grid or trellis
//! 4. **Render** ([`render`]): draw panels, register every element under its
//!    label, attach the legend toggle
//! 5. **Report** ([`report`], [`serve`]): HTML/JSON/CSV files or a local server
//!
//! # Quick Start
//!
//! ```no_run
//! use rssiview::{prepare_trials, render, Config, LayoutPolicy};
//!
//! let config = Config::default();
//! let mut trials = prepare_trials("results/", &[], &config, |_| {});
//! let figures = render::render(LayoutPolicy::Grid, &mut trials, &config);
//! rssiview::report::generate("grid.html", &figures, &trials)?;
//! # Ok::<(), std::io::Error>(())
//! ```
//!
//! # Classification
//!
//! | Samples      | Speed |   | Peak RSSI  | Proximity |
//! |--------------|-------|---|------------|-----------|
//! | 70 or fewer  | Run   |   | >= -78 dBm | Close     |
//! | 71 to 139    | Jog   |   | < -78 dBm  | Far       |
//! | 140 or more  | Walk  |   | none       | ?         |
//!
//! # Modules
//!
//! - [`trial`]: record model and the tolerant loader
//! - [`classify`]: speed/proximity labels and the run split
//! - [`layout`]: where each trial goes
//! - [`render`]: panels, overlays and the legend toggle
//! - [`report`]: output formatters (HTML, JSON, CSV)
//! - [`serve`]: interactive mode over HTTP
//! - [`config`], [`error`]: tunables and error types

pub mod classify;
pub mod config;
pub mod error;
pub mod layout;
pub mod render;
pub mod report;
pub mod serve;
pub mod trial;

pub use classify::{classify_all, refine_run_subtypes, FacetSummary, ProximityLabel, SpeedLabel};
pub use config::Config;
pub use error::{ConfigError, LoadError};
pub use layout::LayoutPolicy;
pub use render::Figure;
pub use trial::{Trial, TrialRecord};

use std::path::Path;

/// Load every trial under `path`, classify it and keep the requested ids.
///
/// Unreadable files are skipped with a warning. `on_done` is called once per
/// file from the loader's worker threads.
pub fn prepare_trials<P, F>(path: P, ids: &[u32], config: &Config, on_done: F) -> Vec<Trial>
where
    P: AsRef<Path>,
    F: Fn(&Path) + Sync,
{
    let files = trial::collect_result_files(path);
    let outcome = trial::loader::load_all_with(&files, on_done);
    let trials = classify_all(outcome.records, &config.classify);
    trial::select_by_ids(trials, ids, |t| t.record.name.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    // ==========================================================================
    // PUBLIC API TESTS
    // ==========================================================================
    //
    // These tests verify the public API surface is correct and documented.
    // ==========================================================================

    #[test]
    fn test_public_exports() {
        let _: LayoutPolicy = "grid".parse().unwrap();
        let _ = Config::default();
        let _ = SpeedLabel::RunShoe;
        let _ = ProximityLabel::Unknown;
        assert_eq!(FacetSummary::from_trials(&[]).total, 0);
    }

    #[test]
    fn test_prepare_trials_on_directory() {
        let dir = tempfile::tempdir().unwrap();
        let series: Vec<String> = (0..80).map(|i| format!(r#"{{"t":{},"rssi":-85}}"#, i * 100)).collect();
        let body = format!(
            r#"{{"sampleFile":"calibration_data_1761170123.csv","series":[{}],"algorithms":{{}}}}"#,
            series.join(",")
        );
        std::fs::write(dir.path().join("result_a.json"), &body).unwrap();
        std::fs::write(dir.path().join("result_broken.json"), "{ nope").unwrap();
        std::fs::write(dir.path().join("notes.json"), &body).unwrap();

        let trials = prepare_trials(dir.path(), &[], &Config::default(), |_| {});
        assert_eq!(trials.len(), 1);
        assert_eq!(trials[0].class.speed, SpeedLabel::Jog);
        assert_eq!(trials[0].class.proximity, ProximityLabel::Far);

        assert_eq!(prepare_trials(dir.path(), &[123], &Config::default(), |_| {}).len(), 1);
        assert!(prepare_trials(dir.path(), &[999], &Config::default(), |_| {}).is_empty());
    }
}
