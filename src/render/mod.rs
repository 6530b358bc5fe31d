//! Figure model: panels of drawn elements plus their legend controller
//!
//! Rendering produces a backend-neutral description of what is on screen.
//! Coordinates are in data space (x in milliseconds, y in dBm); the report
//! writers map them to pixels. Each element knows the label that owns it, and
//! its visibility lives in the figure's [`ToggleController`].
//!
//! - [`panel`]: draws one trial (or one trellis facet) into a [`Panel`]
//! - [`overlay`]: label registry, legend and the toggle handler
//! - [`style`]: per-algorithm colors and markers
//! - [`figure`]: turns layout plans into finished [`Figure`]s

pub mod figure;
pub mod overlay;
pub mod panel;
pub mod style;

use crate::trial::StateTag;
use overlay::{ElementId, Legend, ToggleController};
use serde::Serialize;
use style::Marker;

pub use figure::{render, render_grid, render_pages, render_trellis};
pub use overlay::MEASURED;

/// How time is labeled on a panel's x axis. Positions are always milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeUnit {
    Millis,
    Seconds,
}

impl TimeUnit {
    pub fn axis_title(&self) -> &'static str {
        match self {
            TimeUnit::Millis => "t (ms offset)",
            TimeUnit::Seconds => "time (s)",
        }
    }

    /// Tick text for a position given in milliseconds.
    pub fn format_tick(&self, ms: f64) -> String {
        match self {
            TimeUnit::Millis => format!("{:.0}", ms),
            TimeUnit::Seconds => {
                let s = ms / 1000.0;
                if (s - s.round()).abs() < 1e-9 {
                    format!("{:.0}", s)
                } else {
                    format!("{:.1}", s)
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Range {
    pub min: f64,
    pub max: f64,
}

impl Range {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn width(&self) -> f64 {
        self.max - self.min
    }
}

/// What an element depicts, independent of how it is styled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "role", content = "state", rename_all = "snake_case")]
pub enum Role {
    RawLine,
    RawSamples,
    AlgorithmLine,
    State(StateTag),
    StateLabel(StateTag),
    /// Algorithm entered the approach stages but never logged the tag
    Miss,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Shape {
    Polyline {
        points: Vec<(f64, f64)>,
        color: String,
        width: f64,
        dashed: bool,
        opacity: f64,
    },
    Scatter {
        points: Vec<(f64, f64)>,
        marker: Marker,
        /// Marker area in square points
        size: f64,
        color: String,
        filled: bool,
        opacity: f64,
        edge: Option<String>,
        edge_width: f64,
        z: i32,
    },
    Text {
        at: (f64, f64),
        text: String,
        /// Pixel offset below the anchor
        offset_px: f64,
        color: String,
        font_size: f64,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Element {
    pub id: ElementId,
    pub label: String,
    pub role: Role,
    pub shape: Shape,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Panel {
    pub title: String,
    pub row: usize,
    pub col: usize,
    pub x: Range,
    pub y: Range,
    pub time_unit: TimeUnit,
    /// Grid cell with nothing in it; drawn disabled
    pub blank: bool,
    pub elements: Vec<Element>,
    /// State events (algorithm, tag) that had a time but no y to draw at
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub skipped_events: Vec<(String, StateTag)>,
}

impl Panel {
    pub fn blank(row: usize, col: usize, y: Range, time_unit: TimeUnit) -> Self {
        Self {
            title: String::new(),
            row,
            col,
            x: Range::new(0.0, 1.0),
            y,
            time_unit,
            blank: true,
            elements: Vec::new(),
            skipped_events: Vec::new(),
        }
    }

    pub fn elements_with_role(&self, role: Role) -> impl Iterator<Item = &Element> {
        self.elements.iter().filter(move |e| e.role == role)
    }

    pub fn elements_of(&self, label: &str) -> impl Iterator<Item = &Element> + '_ {
        let label = label.to_string();
        self.elements.iter().filter(move |e| e.label == label)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Figure {
    pub title: String,
    pub rows: usize,
    pub cols: usize,
    pub panels: Vec<Panel>,
    pub controller: ToggleController,
}

impl Figure {
    pub fn legend(&self) -> &Legend {
        self.controller.legend()
    }

    pub fn toggle(&mut self, label: &str) -> Option<bool> {
        self.controller.on_pick(label)
    }

    pub fn is_visible(&self, element: &Element) -> bool {
        self.controller.is_visible(element.id)
    }
}
