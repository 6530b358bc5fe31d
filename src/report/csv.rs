//! CSV classification table

use crate::report::rows;
use crate::trial::Trial;
use std::io::{self, Write};

pub const HEADER: &str = "name,id,rows,peak_rssi,speed,proximity";

/// Header first, even with no rows, then one serialized `TrialRow` per trial.
pub fn write<W: Write>(writer: &mut W, trials: &[Trial]) -> io::Result<()> {
    let mut wtr = ::csv::WriterBuilder::new()
        .has_headers(false)
        .terminator(::csv::Terminator::Any(b'\n'))
        .from_writer(writer);

    wtr.write_record(HEADER.split(','))?;
    for row in rows(trials) {
        wtr.serialize(row)?;
    }
    wtr.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::classify;
    use crate::config::ClassifyConfig;
    use crate::trial::{Sample, TrialRecord};
    use std::collections::BTreeMap;
    use std::path::PathBuf;

    fn trial(name: &str, rows: usize, peak: Option<f64>) -> Trial {
        let record = TrialRecord {
            path: PathBuf::from("result.json"),
            name: name.to_string(),
            base_ts: None,
            series: (0..rows).map(|i| Sample { t: i as i64, rssi: peak }).collect(),
            algorithms: BTreeMap::new(),
        };
        let class = classify(&record, &ClassifyConfig::default());
        Trial { record, class }
    }

    fn render(trials: &[Trial]) -> String {
        let mut out = Vec::new();
        write(&mut out, trials).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_rows_follow_header() {
        let csv = render(&[
            trial("calibration_data_1761170896.csv", 650, Some(-72.0)),
            trial("calibration_data_1761171291.csv", 60, Some(-88.5)),
        ]);
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], HEADER);
        assert_eq!(lines[1], "calibration_data_1761170896.csv,896,650,-72.0,Walk,Close");
        assert_eq!(lines[2], "calibration_data_1761171291.csv,291,60,-88.5,Run,Far");
    }

    #[test]
    fn test_missing_values_left_empty() {
        let csv = render(&[trial("no id", 0, None)]);
        assert_eq!(csv.lines().nth(1), Some("no id,,0,,Run,Unknown"));
    }

    #[test]
    fn test_header_written_without_rows() {
        assert_eq!(render(&[]), format!("{}\n", HEADER));
    }

    #[test]
    fn test_escape_quotes_and_commas() {
        let csv = render(&[
            trial("a,b", 0, None),
            trial("say \"hi\"", 0, None),
            trial("two\nlines", 0, None),
            trial("plain", 0, None),
        ]);
        assert!(csv.contains("\"a,b\",,0,,Run,Unknown\n"));
        assert!(csv.contains("\"say \"\"hi\"\"\",,0,,Run,Unknown\n"));
        assert!(csv.contains("\"two\nlines\",,0,,Run,Unknown\n"));
        assert!(csv.contains("\nplain,,0,,Run,Unknown\n"));

        let mut reader = ::csv::Reader::from_reader(csv.as_bytes());
        let names: Vec<String> = reader
            .records()
            .map(|r| r.unwrap()[0].to_string())
            .collect();
        assert_eq!(names.len(), 4);
        assert!(names.contains(&"two\nlines".to_string()));
    }

    #[test]
    fn test_run_subtype_label_unquoted() {
        let mut t = trial("calibration_data_1761171291.csv", 60, Some(-90.0));
        t.class.speed = crate::classify::SpeedLabel::RunHand;
        let csv = render(&[t]);
        assert_eq!(csv.lines().nth(1), Some("calibration_data_1761171291.csv,291,60,-90.0,Run (Hand),Far"));
    }
}
