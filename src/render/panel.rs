//! Drawing one trial into one panel
//!
//! A panel shows the raw series (faint line plus hollow markers) and, for each
//! algorithm, its smoothed line and the lifecycle states it reported.
//!
//! # Where a state marker goes
//!
//! Algorithms report the RSSI they saw when entering a state, but that value
//! is not always usable: some report a processed value above anything the
//! receiver can measure, some report nothing. The marker's y is therefore:
//!
//! 1. the event's own RSSI, if it is a number inside the admissible band
//!    (not above -60 dBm; in the strict variant also not below -120 dBm)
//! 2. otherwise the raw sample nearest in time to the event
//! 3. otherwise nothing is drawn for that state
//!
//! # Missed logs
//!
//! An algorithm that reached APPROACHING or HERE but never LOGGED gets a cross
//! just past the last sample, so unfinished lifecycles stand out.

use super::overlay::{OverlayRegistry, MEASURED};
use super::style::{is_known, style_for, Marker, MEASURED_LINE_COLOR, MEASURED_MARKER_COLOR};
use super::{Element, Panel, Range, Role, Shape, TimeUnit};
use crate::trial::{Sample, StateEvent, StateTag, Trial, STATE_ORDER};
use tracing::debug;

/// Floor of a dynamic y-range never sits above this.
pub const DYNAMIC_FLOOR_DBM: f64 = -105.0;
/// Top of a dynamic y-range never sits below this.
pub const DYNAMIC_TOP_MIN_DBM: f64 = -70.0;
/// Top of a dynamic y-range never sits above this.
pub const DYNAMIC_TOP_MAX_DBM: f64 = -60.0;

const X_PAD_FRACTION: f64 = 0.05;
const X_PAD_MIN_MS: f64 = 1.0;
const MISS_OFFSET_FRACTION: f64 = 0.01;

/// Event RSSI values trusted for drawing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EventBand {
    pub ceiling: f64,
    pub floor: Option<f64>,
}

impl EventBand {
    pub fn lenient(ceiling: f64) -> Self {
        Self { ceiling, floor: None }
    }

    pub fn strict(ceiling: f64, floor: f64) -> Self {
        Self { ceiling, floor: Some(floor) }
    }

    pub fn admits(&self, rssi: f64) -> bool {
        rssi <= self.ceiling && self.floor.map_or(true, |f| rssi >= f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum YPolicy {
    /// Fit each panel to its own data
    Dynamic,
    /// Same range on every panel so magnitudes compare
    Fixed(Range),
}

/// State marker areas in square points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarkerSizes {
    pub peak: f64,
    pub state: f64,
}

/// Stacked pages have room to spare.
pub const PAGE_MARKERS: MarkerSizes = MarkerSizes { peak: 180.0, state: 48.0 };
/// Larger markers for the small grid cells.
pub const GRID_MARKERS: MarkerSizes = MarkerSizes { peak: 220.0, state: 60.0 };

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PanelOptions {
    pub y: YPolicy,
    pub band: EventBand,
    pub time_unit: TimeUnit,
    pub markers: MarkerSizes,
}

/// `[min(min-2, -105), max(max+2, -70)]`, top clamped to -60.
pub fn dynamic_y_range(series: &[Sample]) -> Range {
    let mut values = series.iter().filter_map(|s| s.rssi);
    let Some(first) = values.next() else {
        return Range::new(DYNAMIC_FLOOR_DBM, DYNAMIC_TOP_MIN_DBM);
    };
    let (lo, hi) = values.fold((first, first), |(lo, hi), v| (lo.min(v), hi.max(v)));
    Range::new(
        (lo - 2.0).min(DYNAMIC_FLOOR_DBM),
        (hi + 2.0).max(DYNAMIC_TOP_MIN_DBM).min(DYNAMIC_TOP_MAX_DBM),
    )
}

/// Span of `times`, right edge padded by 5% (at least 1 ms).
pub fn padded_x_range<I: IntoIterator<Item = i64>>(times: I) -> Option<Range> {
    let (lo, hi) = span(times)?;
    let pad = ((hi - lo) * X_PAD_FRACTION).max(X_PAD_MIN_MS);
    Some(Range::new(lo, hi + pad))
}

fn span<I: IntoIterator<Item = i64>>(times: I) -> Option<(f64, f64)> {
    let mut it = times.into_iter();
    let first = it.next()?;
    let (lo, hi) = it.fold((first, first), |(lo, hi), t| (lo.min(t), hi.max(t)));
    Some((lo as f64, hi as f64))
}

/// RSSI of the sample closest in time to `t`. Earliest in series order wins ties.
pub fn nearest_series_rssi(series: &[Sample], t: i64) -> Option<f64> {
    let mut best: Option<(u64, f64)> = None;
    for s in series {
        let Some(rssi) = s.rssi else { continue };
        let d = s.t.abs_diff(t);
        if best.map_or(true, |(bd, _)| d < bd) {
            best = Some((d, rssi));
        }
    }
    best.map(|(_, rssi)| rssi)
}

/// The y at which a state marker is drawn, or `None` to skip it.
pub fn resolve_event_y(event: &StateEvent, series: &[Sample], band: EventBand) -> Option<f64> {
    let t = event.t?;
    match event.rssi {
        Some(rssi) if band.admits(rssi) => Some(rssi),
        _ => nearest_series_rssi(series, t),
    }
}

fn points(series: &[Sample]) -> Vec<(f64, f64)> {
    series
        .iter()
        .filter_map(|s| Some((s.t as f64, s.rssi?)))
        .collect()
}

/// Collects a panel's elements, registering each under its label.
struct Painter<'r> {
    registry: &'r mut OverlayRegistry,
    elements: Vec<Element>,
}

impl<'r> Painter<'r> {
    fn new(registry: &'r mut OverlayRegistry) -> Self {
        Self { registry, elements: Vec::new() }
    }

    fn push(&mut self, label: &str, role: Role, shape: Shape) {
        let id = self.registry.register(label);
        self.elements.push(Element {
            id,
            label: label.to_string(),
            role,
            shape,
        });
    }

    fn measured(&mut self, pts: Vec<(f64, f64)>, faint: bool) {
        if pts.is_empty() {
            return;
        }
        let (line_width, line_opacity) = if faint { (0.5, 0.2) } else { (0.6, 0.3) };
        self.push(
            MEASURED,
            Role::RawLine,
            Shape::Polyline {
                points: pts.clone(),
                color: MEASURED_LINE_COLOR.to_string(),
                width: line_width,
                dashed: false,
                opacity: line_opacity,
            },
        );
        // trellis facets pile up many trials, so samples are small dots there
        let (size, filled, opacity) = if faint { (6.25, true, 0.6) } else { (25.0, false, 0.95) };
        self.push(
            MEASURED,
            Role::RawSamples,
            Shape::Scatter {
                points: pts,
                marker: Marker::Circle,
                size,
                color: MEASURED_MARKER_COLOR.to_string(),
                filled,
                opacity,
                edge: None,
                edge_width: 0.9,
                z: 2,
            },
        );
    }

    fn finish(self) -> Vec<Element> {
        self.elements
    }
}

/// Draw one trial. Every element is registered in `registry`.
pub fn draw_trial(
    trial: &Trial,
    title: String,
    (row, col): (usize, usize),
    opts: &PanelOptions,
    registry: &mut OverlayRegistry,
) -> Panel {
    let record = &trial.record;
    let series = &record.series;

    let y = match opts.y {
        YPolicy::Fixed(range) => range,
        YPolicy::Dynamic => dynamic_y_range(series),
    };

    // Time span: the series if there is one, else whatever the algorithms drew
    let data_span = span(series.iter().map(|s| s.t)).or_else(|| {
        span(record.algorithms.values().flat_map(|a| {
            let line = a.valid_line().into_iter().map(|(t, _)| t);
            let events: Vec<i64> = a.states.values().filter_map(|e| e.t).collect();
            line.chain(events)
        }))
    });
    let x = match data_span {
        Some((lo, hi)) => {
            let pad = ((hi - lo) * X_PAD_FRACTION).max(X_PAD_MIN_MS);
            Range::new(lo, hi + pad)
        }
        None => Range::new(0.0, 1.0),
    };
    let data_right = data_span.map_or(x.max, |(_, hi)| hi);

    let mut painter = Painter::new(registry);
    painter.measured(points(series), false);
    let mut skipped_events = Vec::new();

    for (label, algo) in &record.algorithms {
        if !is_known(label) {
            debug!("No style for algorithm '{}', using the default", label);
        }
        let style = style_for(label);

        let line: Vec<(f64, f64)> = algo
            .valid_line()
            .into_iter()
            .map(|(t, v)| (t as f64, v))
            .collect();
        if !line.is_empty() {
            painter.push(
                label,
                Role::AlgorithmLine,
                Shape::Polyline {
                    points: line,
                    color: style.color.to_string(),
                    width: 1.6,
                    dashed: true,
                    opacity: 0.95,
                },
            );
        }

        let mut last_y = None;
        for tag in STATE_ORDER {
            let Some(event) = algo.states.get(&tag) else { continue };
            let Some(t) = event.t else {
                // placeholder for a stage the algorithm never reached
                continue;
            };
            let Some(yv) = resolve_event_y(event, series, opts.band) else {
                debug!(
                    "{}: {} {} at t={} has no usable RSSI and no sample to fall back on, not drawn",
                    record.name, label, tag, t
                );
                skipped_events.push((label.clone(), tag));
                continue;
            };
            let at = (t as f64, yv);
            last_y = Some(yv);

            let (marker, size, edge, edge_width, z, offset_px, font_size) = if tag == StateTag::Peak {
                (Marker::Star, opts.markers.peak, Some("black".to_string()), 1.5, 5, 14.0, 9.0)
            } else {
                (style.marker, opts.markers.state, None, 0.0, 3, 12.0, 8.0)
            };
            painter.push(
                label,
                Role::State(tag),
                Shape::Scatter {
                    points: vec![at],
                    marker,
                    size,
                    color: style.color.to_string(),
                    filled: true,
                    opacity: 1.0,
                    edge,
                    edge_width,
                    z,
                },
            );
            painter.push(
                label,
                Role::StateLabel(tag),
                Shape::Text {
                    at,
                    text: tag.as_str().to_string(),
                    offset_px,
                    color: style.color.to_string(),
                    font_size,
                },
            );
        }

        if algo.missed_log() {
            let miss_y = last_y
                .or_else(|| series.iter().rev().find_map(|s| s.rssi))
                .unwrap_or(y.min);
            let miss_x = data_right + x.width() * MISS_OFFSET_FRACTION;
            painter.push(
                label,
                Role::Miss,
                Shape::Scatter {
                    points: vec![(miss_x, miss_y)],
                    marker: Marker::Cross,
                    size: 110.0,
                    color: style.color.to_string(),
                    filled: true,
                    opacity: 1.0,
                    edge: None,
                    edge_width: 2.0,
                    z: 5,
                },
            );
        }
    }

    Panel {
        title,
        row,
        col,
        x,
        y,
        time_unit: opts.time_unit,
        blank: false,
        elements: painter.finish(),
        skipped_events,
    }
}

/// Draw the raw series of several trials overlaid in one trellis facet.
pub fn draw_facet(
    trials: &[&Trial],
    title: String,
    (row, col): (usize, usize),
    y: Range,
    registry: &mut OverlayRegistry,
) -> Panel {
    let x = padded_x_range(trials.iter().flat_map(|t| t.record.series.iter().map(|s| s.t)))
        .unwrap_or(Range::new(0.0, 1.0));

    let mut painter = Painter::new(registry);
    for trial in trials {
        painter.measured(points(&trial.record.series), true);
    }

    Panel {
        title,
        row,
        col,
        x,
        y,
        time_unit: TimeUnit::Millis,
        blank: false,
        elements: painter.finish(),
        skipped_events: Vec::new(),
    }
}
