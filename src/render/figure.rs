//! Turning layout plans into finished figures
//!
//! Each figure gets its own [`OverlayRegistry`]. Panels register into it as
//! they are drawn, and the [`ToggleController`] is attached only after the
//! last panel, so the legend reflects exactly what the figure contains.

use super::overlay::{OverlayRegistry, ToggleController};
use super::panel::{
    draw_facet, draw_trial, EventBand, PanelOptions, YPolicy, GRID_MARKERS, PAGE_MARKERS,
};
use super::{Figure, Panel, Range, TimeUnit};
use crate::classify::refine_run_subtypes;
use crate::config::Config;
use crate::layout::{self, LayoutPolicy, Slot};
use crate::trial::Trial;
use tracing::debug;

pub const GRID_TITLE: &str = "All samples - Run (top), Jog (middle), Walk (bottom)";
pub const TRELLIS_TITLE: &str = "Raw RSSI by speed and proximity";

fn page_panel_title(trial: &Trial) -> String {
    format!(
        "{} [id={}]  [{}]  (rows={})",
        trial.record.name,
        trial.record.id().as_deref().unwrap_or("???"),
        trial.class.proximity,
        trial.class.sample_count
    )
}

fn grid_panel_title(trial: &Trial) -> String {
    format!(
        "{}  [{} · {}]  (rows={})",
        trial.record.name, trial.class.speed, trial.class.proximity, trial.class.sample_count
    )
}

fn finish(title: String, rows: usize, cols: usize, panels: Vec<Panel>, registry: OverlayRegistry) -> Figure {
    debug!(
        "Figure '{}': {} panel(s), {} element(s)",
        title,
        panels.len(),
        registry.len()
    );
    Figure {
        title,
        rows,
        cols,
        panels,
        controller: ToggleController::attach(registry),
    }
}

/// One figure per page, each trial fitted to its own y-range.
pub fn render_pages(trials: &[Trial], config: &Config) -> Vec<Figure> {
    let opts = PanelOptions {
        y: YPolicy::Dynamic,
        band: EventBand::lenient(config.axes.event_ceiling_dbm),
        time_unit: TimeUnit::Millis,
        markers: PAGE_MARKERS,
    };

    layout::paginate(trials, config.layout.page_size)
        .into_iter()
        .map(|page| {
            let mut registry = OverlayRegistry::new();
            let panels = page
                .trials
                .iter()
                .enumerate()
                .map(|(row, &i)| {
                    let trial = &trials[i];
                    draw_trial(trial, page_panel_title(trial), (row, 0), &opts, &mut registry)
                })
                .collect();
            finish(page.title(), page.trials.len(), 1, panels, registry)
        })
        .collect()
}

/// Every trial in one R x C figure on a shared y-range.
pub fn render_grid(trials: &[Trial], config: &Config) -> Option<Figure> {
    let plan = layout::grid(trials, config.layout.grid_rows, config.layout.grid_cols)?;
    let (lo, hi) = config.axes.grid_y;
    let y = Range::new(lo, hi);
    let opts = PanelOptions {
        y: YPolicy::Fixed(y),
        band: EventBand::strict(config.axes.event_ceiling_dbm, config.axes.event_floor_dbm),
        time_unit: TimeUnit::Seconds,
        markers: GRID_MARKERS,
    };

    let mut registry = OverlayRegistry::new();
    let mut panels = Vec::with_capacity(plan.rows * plan.cols);
    for row in 0..plan.rows {
        for col in 0..plan.cols {
            let panel = match plan.cell(row, col) {
                Slot::Trial(i) => {
                    let trial = &trials[i];
                    draw_trial(trial, grid_panel_title(trial), (row, col), &opts, &mut registry)
                }
                Slot::Blank => Panel::blank(row, col, y, TimeUnit::Seconds),
            };
            panels.push(panel);
        }
    }

    Some(finish(GRID_TITLE.to_string(), plan.rows, plan.cols, panels, registry))
}

/// Speed x proximity facets of overlaid raw series. Splits runs first.
pub fn render_trellis(trials: &mut [Trial], config: &Config) -> Option<Figure> {
    refine_run_subtypes(trials);
    let plan = layout::trellis(trials)?;
    let (lo, hi) = config.axes.trellis_y;
    let y = Range::new(lo, hi);

    let mut registry = OverlayRegistry::new();
    let mut panels = Vec::with_capacity(plan.rows.len() * plan.cols.len());
    for (row, &speed) in plan.rows.iter().enumerate() {
        for (col, &proximity) in plan.cols.iter().enumerate() {
            let members: Vec<&Trial> = plan.facet(speed, proximity).iter().map(|&i| &trials[i]).collect();
            let title = format!("{} - {}", speed, proximity);
            panels.push(draw_facet(&members, title, (row, col), y, &mut registry));
        }
    }

    Some(finish(
        TRELLIS_TITLE.to_string(),
        plan.rows.len(),
        plan.cols.len(),
        panels,
        registry,
    ))
}

pub fn render(policy: LayoutPolicy, trials: &mut [Trial], config: &Config) -> Vec<Figure> {
    match policy {
        LayoutPolicy::Pages => render_pages(trials, config),
        LayoutPolicy::Grid => render_grid(trials, config).into_iter().collect(),
        LayoutPolicy::Trellis => render_trellis(trials, config).into_iter().collect(),
    }
}
