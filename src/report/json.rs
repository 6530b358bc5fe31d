//! JSON report: summary, classification table and the full figure model

use crate::render::Figure;
use crate::report::{rows, Summary, TrialRow};
use crate::trial::Trial;
use serde::Serialize;
use std::io::{self, Write};

#[derive(Serialize)]
struct JsonReport<'a> {
    generated: String,
    summary: Summary,
    trials: Vec<TrialRow>,
    figures: &'a [Figure],
}

pub fn write<W: Write>(writer: &mut W, figures: &[Figure], trials: &[Trial]) -> io::Result<()> {
    let report = JsonReport {
        generated: chrono::Local::now().to_rfc3339(),
        summary: Summary::from_trials(trials),
        trials: rows(trials),
        figures,
    };
    serde_json::to_writer_pretty(&mut *writer, &report)?;
    writeln!(writer)
}
