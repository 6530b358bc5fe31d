//! Colors and marker shapes per algorithm

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Marker {
    Circle,
    Square,
    Diamond,
    TriangleUp,
    TriangleDown,
    Plus,
    Cross,
    Star,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlgStyle {
    pub color: &'static str,
    pub marker: Marker,
}

pub const MEASURED_LINE_COLOR: &str = "gray";
pub const MEASURED_MARKER_COLOR: &str = "#1f77b4";

/// Used for any algorithm the table does not know.
pub const DEFAULT_STYLE: AlgStyle = AlgStyle {
    color: "#8B4513",
    marker: Marker::Cross,
};

const STYLE_TABLE: &[(&str, AlgStyle)] = &[
    ("EMA(alpha=0.3)", AlgStyle { color: "#1f77b4", marker: Marker::TriangleUp }),
    ("MedianN(N=7)", AlgStyle { color: "#ff7f0e", marker: Marker::Square }),
    ("Kalman(Q=4.0,R=16.0)", AlgStyle { color: "#2ca02c", marker: Marker::Diamond }),
    (
        "Median→EMA FSM (N=5, α=0.3, thrA=-90, thrH=-85, rise=3, fall=2, hyst=2dB)",
        AlgStyle { color: "#9467bd", marker: Marker::Circle },
    ),
    (
        "EMA+TimeExit(α=0.35, HERE@-80dBm, +2000ms)",
        AlgStyle { color: "#8c564b", marker: Marker::TriangleDown },
    ),
    (
        "PowerDist(α=0.50, P1m=-70.0, n=2.00, thr=6.0m, N=2)",
        AlgStyle { color: "#e377c2", marker: Marker::Plus },
    ),
    (
        "TCA(α=0.30, P1m=-70.0, n=2.00, thr=2.50s, win=40)",
        AlgStyle { color: "#7f7f7f", marker: Marker::Cross },
    ),
];

pub fn style_for(label: &str) -> AlgStyle {
    STYLE_TABLE
        .iter()
        .find(|(name, _)| *name == label)
        .map(|(_, style)| *style)
        .unwrap_or(DEFAULT_STYLE)
}

pub fn is_known(label: &str) -> bool {
    STYLE_TABLE.iter().any(|(name, _)| *name == label)
}
