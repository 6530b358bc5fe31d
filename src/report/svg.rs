//! Inline SVG for one figure
//!
//! Each panel becomes a `<g class="panel">` positioned on the figure's grid.
//! Every drawn element is wrapped in `<g class="el" data-label=...>` so the
//! page script can find all elements of a label across panels. Hidden
//! elements are emitted with `display:none`.

use crate::render::style::Marker;
use crate::render::{Element, Figure, Panel, Range, Shape};
use std::f64::consts::PI;
use std::fmt::Write;

const MARGIN_LEFT: f64 = 56.0;
const MARGIN_RIGHT: f64 = 16.0;
const MARGIN_TOP: f64 = 28.0;
const MARGIN_BOTTOM: f64 = 40.0;
const Y_TICK_STEP: f64 = 10.0;
const X_TICKS: usize = 5;

/// Outer size of one panel in pixels.
pub fn panel_size(figure: &Figure) -> (f64, f64) {
    if figure.cols <= 1 {
        (960.0, 260.0)
    } else if figure.cols == 2 {
        (480.0, 240.0)
    } else {
        (300.0, 220.0)
    }
}

/// Data-space to pixel mapping for one panel's plot area.
#[derive(Debug, Clone, Copy)]
struct Frame {
    left: f64,
    top: f64,
    width: f64,
    height: f64,
    x: Range,
    y: Range,
}

impl Frame {
    fn new(panel: &Panel, (w, h): (f64, f64)) -> Self {
        Self {
            left: MARGIN_LEFT,
            top: MARGIN_TOP,
            width: (w - MARGIN_LEFT - MARGIN_RIGHT).max(1.0),
            height: (h - MARGIN_TOP - MARGIN_BOTTOM).max(1.0),
            x: panel.x,
            y: panel.y,
        }
    }

    fn px(&self, (x, y): (f64, f64)) -> (f64, f64) {
        let xw = if self.x.width() > 0.0 { self.x.width() } else { 1.0 };
        let yw = if self.y.width() > 0.0 { self.y.width() } else { 1.0 };
        (
            self.left + (x - self.x.min) / xw * self.width,
            self.top + self.height - (y - self.y.min) / yw * self.height,
        )
    }
}

pub fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

/// Marker size is an area in square points, like scatter `s`.
fn radius(size: f64) -> f64 {
    size.max(0.0).sqrt() / 2.0
}

fn polygon(points: &[(f64, f64)]) -> String {
    points
        .iter()
        .map(|(x, y)| format!("{:.1},{:.1}", x, y))
        .collect::<Vec<_>>()
        .join(" ")
}

fn star(cx: f64, cy: f64, r: f64) -> Vec<(f64, f64)> {
    (0..10)
        .map(|i| {
            let rr = if i % 2 == 0 { r } else { r * 0.4 };
            let a = -PI / 2.0 + i as f64 * PI / 5.0;
            (cx + rr * a.cos(), cy + rr * a.sin())
        })
        .collect()
}

fn marker_svg(out: &mut String, marker: Marker, (cx, cy): (f64, f64), r: f64, paint: &str) {
    let _ = match marker {
        Marker::Circle => write!(out, r#"<circle cx="{:.1}" cy="{:.1}" r="{:.1}" {}/>"#, cx, cy, r, paint),
        Marker::Square => write!(
            out,
            r#"<rect x="{:.1}" y="{:.1}" width="{:.1}" height="{:.1}" {}/>"#,
            cx - r,
            cy - r,
            2.0 * r,
            2.0 * r,
            paint
        ),
        Marker::Diamond => write!(
            out,
            r#"<polygon points="{}" {}/>"#,
            polygon(&[(cx, cy - r), (cx + r, cy), (cx, cy + r), (cx - r, cy)]),
            paint
        ),
        Marker::TriangleUp => write!(
            out,
            r#"<polygon points="{}" {}/>"#,
            polygon(&[(cx, cy - r), (cx + r, cy + r), (cx - r, cy + r)]),
            paint
        ),
        Marker::TriangleDown => write!(
            out,
            r#"<polygon points="{}" {}/>"#,
            polygon(&[(cx, cy + r), (cx + r, cy - r), (cx - r, cy - r)]),
            paint
        ),
        Marker::Plus => write!(
            out,
            r#"<path d="M{:.1},{:.1}H{:.1}M{:.1},{:.1}V{:.1}" {}/>"#,
            cx - r,
            cy,
            cx + r,
            cx,
            cy - r,
            cy + r,
            paint
        ),
        Marker::Cross => write!(
            out,
            r#"<path d="M{:.1},{:.1}L{:.1},{:.1}M{:.1},{:.1}L{:.1},{:.1}" {}/>"#,
            cx - r,
            cy - r,
            cx + r,
            cy + r,
            cx - r,
            cy + r,
            cx + r,
            cy - r,
            paint
        ),
        Marker::Star => write!(out, r#"<polygon points="{}" {}/>"#, polygon(&star(cx, cy, r)), paint),
    };
}

/// Stroke-only markers take the fill color as their stroke.
fn is_line_marker(marker: Marker) -> bool {
    matches!(marker, Marker::Plus | Marker::Cross)
}

fn z_of(e: &Element) -> i32 {
    match &e.shape {
        Shape::Polyline { .. } => 1,
        Shape::Scatter { z, .. } => *z,
        Shape::Text { .. } => 6,
    }
}

fn element_svg(out: &mut String, frame: &Frame, e: &Element) {
    match &e.shape {
        Shape::Polyline { points, color, width, dashed, opacity } => {
            let pts: Vec<(f64, f64)> = points.iter().map(|p| frame.px(*p)).collect();
            let dash = if *dashed { r#" stroke-dasharray="6,3""# } else { "" };
            let _ = write!(
                out,
                r#"<polyline points="{}" fill="none" stroke="{}" stroke-width="{}" stroke-opacity="{}"{}/>"#,
                polygon(&pts),
                escape(color),
                width,
                opacity,
                dash
            );
        }
        Shape::Scatter { points, marker, size, color, filled, opacity, edge, edge_width, .. } => {
            let r = radius(*size);
            let color = escape(color);
            let paint = if is_line_marker(*marker) {
                format!(r#"fill="none" stroke="{}" stroke-width="{}" opacity="{}""#, color, edge_width.max(1.0), opacity)
            } else {
                let fill = if *filled { color.clone() } else { "none".to_string() };
                let stroke = match edge {
                    Some(edge) => escape(edge),
                    None => color.clone(),
                };
                format!(
                    r#"fill="{}" stroke="{}" stroke-width="{}" opacity="{}""#,
                    fill,
                    stroke,
                    if edge.is_some() { *edge_width } else { 0.9 },
                    opacity
                )
            };
            for p in points {
                marker_svg(out, *marker, frame.px(*p), r, &paint);
            }
        }
        Shape::Text { at, text, offset_px, color, font_size } => {
            let (x, y) = frame.px(*at);
            let _ = write!(
                out,
                r#"<text x="{:.1}" y="{:.1}" text-anchor="middle" font-size="{}" fill="{}">{}</text>"#,
                x,
                y + offset_px + font_size,
                font_size,
                escape(color),
                escape(text)
            );
        }
    }
}

fn axes_svg(out: &mut String, frame: &Frame, panel: &Panel) {
    let bottom = frame.top + frame.height;
    let _ = write!(
        out,
        r##"<rect x="{:.1}" y="{:.1}" width="{:.1}" height="{:.1}" fill="#ffffff" stroke="#444"/>"##,
        frame.left, frame.top, frame.width, frame.height
    );

    // y ticks on whole multiples of the step
    let mut v = (frame.y.min / Y_TICK_STEP).ceil() * Y_TICK_STEP;
    while v <= frame.y.max + 1e-9 {
        let (_, py) = frame.px((frame.x.min, v));
        let _ = write!(
            out,
            r##"<line x1="{:.1}" y1="{:.1}" x2="{:.1}" y2="{:.1}" stroke="#ddd"/><text x="{:.1}" y="{:.1}" text-anchor="end" font-size="10" fill="#555">{:.0}</text>"##,
            frame.left,
            py,
            frame.left + frame.width,
            py,
            frame.left - 4.0,
            py + 3.0,
            v
        );
        v += Y_TICK_STEP;
    }

    for i in 0..=X_TICKS {
        let t = frame.x.min + frame.x.width() * i as f64 / X_TICKS as f64;
        let (px, _) = frame.px((t, frame.y.min));
        let _ = write!(
            out,
            r##"<text x="{:.1}" y="{:.1}" text-anchor="middle" font-size="10" fill="#555">{}</text>"##,
            px,
            bottom + 14.0,
            panel.time_unit.format_tick(t)
        );
    }

    let _ = write!(
        out,
        r##"<text x="{:.1}" y="{:.1}" text-anchor="middle" font-size="11" fill="#333">{}</text><text x="12" y="{:.1}" text-anchor="middle" font-size="11" fill="#333" transform="rotate(-90, 12, {:.1})">RSSI (dBm)</text>"##,
        frame.left + frame.width / 2.0,
        bottom + 32.0,
        panel.time_unit.axis_title(),
        frame.top + frame.height / 2.0,
        frame.top + frame.height / 2.0
    );
}

/// Render a figure as one `<svg>`. `index` keeps ids unique across figures.
pub fn figure_svg(figure: &Figure, index: usize) -> String {
    let (pw, ph) = panel_size(figure);
    let width = pw * figure.cols.max(1) as f64;
    let height = ph * figure.rows.max(1) as f64;

    let mut out = String::new();
    let _ = write!(
        out,
        r#"<svg class="figure" xmlns="http://www.w3.org/2000/svg" width="{:.0}" height="{:.0}" viewBox="0 0 {:.0} {:.0}">"#,
        width, height, width, height
    );

    for (p, panel) in figure.panels.iter().enumerate() {
        let frame = Frame::new(panel, (pw, ph));
        let _ = write!(
            out,
            r#"<g class="panel{}" transform="translate({:.1},{:.1})">"#,
            if panel.blank { " blank" } else { "" },
            pw * panel.col as f64,
            ph * panel.row as f64
        );

        if panel.blank {
            let _ = write!(
                out,
                r##"<rect x="{:.1}" y="{:.1}" width="{:.1}" height="{:.1}" fill="#f3f3f3" stroke="#ccc"/></g>"##,
                frame.left, frame.top, frame.width, frame.height
            );
            continue;
        }

        let clip = format!("f{}-clip{}", index, p);
        let _ = write!(
            out,
            r#"<clipPath id="{}"><rect x="{:.1}" y="{:.1}" width="{:.1}" height="{:.1}"/></clipPath>"#,
            clip, frame.left, frame.top, frame.width, frame.height
        );
        axes_svg(&mut out, &frame, panel);
        let _ = write!(
            out,
            r##"<text x="{:.1}" y="16" text-anchor="middle" font-size="11" font-weight="600" fill="#222">{}</text>"##,
            frame.left + frame.width / 2.0,
            escape(&panel.title)
        );

        let mut elements: Vec<&Element> = panel.elements.iter().collect();
        elements.sort_by_key(|e| z_of(e));

        let _ = write!(out, r#"<g clip-path="url(#{})">"#, clip);
        for e in elements {
            let hidden = if figure.is_visible(e) { "" } else { r#" style="display:none""# };
            let _ = write!(
                out,
                r#"<g class="el" id="f{}-e{}" data-label="{}"{}>"#,
                index,
                e.id.0,
                escape(&e.label),
                hidden
            );
            element_svg(&mut out, &frame, e);
            out.push_str("</g>");
        }
        out.push_str("</g></g>");
    }

    out.push_str("</svg>");
    out
}
