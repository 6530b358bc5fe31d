//! Arranging classified trials into figures
//!
//! Three arrangements are supported:
//!
//! | Policy    | Figures          | Panels                                     |
//! |-----------|------------------|--------------------------------------------|
//! | Paginated | one per page     | one stacked panel per trial, K per page    |
//! | Grid      | exactly one      | R x C cells, Run / Jog / Walk blocks       |
//! | Trellis   | exactly one      | speed rows x proximity columns, overlaid   |
//!
//! Layout only decides *where* trials go, as indices into the trial slice.
//! Drawing happens in [`crate::render`].

use crate::classify::{ProximityLabel, SpeedLabel};
use crate::trial::Trial;
use serde::Serialize;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LayoutPolicy {
    Pages,
    Grid,
    Trellis,
}

impl std::str::FromStr for LayoutPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pages" | "paginated" => Ok(LayoutPolicy::Pages),
            "grid" => Ok(LayoutPolicy::Grid),
            "trellis" => Ok(LayoutPolicy::Trellis),
            other => Err(format!("unknown layout '{}' (expected pages, grid or trellis)", other)),
        }
    }
}

/// Speed order for the paginated view.
pub const PAGE_SPEED_ORDER: [SpeedLabel; 3] = [SpeedLabel::Walk, SpeedLabel::Jog, SpeedLabel::Run];
/// Block order for the grid, fastest first.
pub const GRID_SPEED_ORDER: [SpeedLabel; 3] = [SpeedLabel::Run, SpeedLabel::Jog, SpeedLabel::Walk];
pub const TRELLIS_ROWS: [SpeedLabel; 4] = [
    SpeedLabel::Walk,
    SpeedLabel::Jog,
    SpeedLabel::RunHand,
    SpeedLabel::RunShoe,
];
pub const TRELLIS_COLS: [ProximityLabel; 2] = [ProximityLabel::Close, ProximityLabel::Far];

/// Indices of trials with the given base speed, sorted by display name.
fn speed_block(trials: &[Trial], speed: SpeedLabel) -> Vec<usize> {
    let mut idx: Vec<usize> = (0..trials.len())
        .filter(|&i| trials[i].class.speed.base() == speed)
        .collect();
    idx.sort_by(|&a, &b| trials[a].record.name.cmp(&trials[b].record.name));
    idx
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PagePlan {
    pub speed: SpeedLabel,
    /// 1-based position of the first trial within its speed group
    pub first: usize,
    pub last: usize,
    pub page: usize,
    pub page_count: usize,
    pub trials: Vec<usize>,
}

impl PagePlan {
    pub fn title(&self) -> String {
        format!("{} - samples {}-{}", self.speed, self.first, self.last)
    }
}

/// Group by speed, sort by name, cut into pages of at most `page_size`.
pub fn paginate(trials: &[Trial], page_size: usize) -> Vec<PagePlan> {
    let page_size = page_size.max(1);
    let mut pages = Vec::new();

    for speed in PAGE_SPEED_ORDER {
        let group = speed_block(trials, speed);
        if group.is_empty() {
            continue;
        }
        let page_count = (group.len() + page_size - 1) / page_size;
        for (n, chunk) in group.chunks(page_size).enumerate() {
            let first = n * page_size + 1;
            pages.push(PagePlan {
                speed,
                first,
                last: first + chunk.len() - 1,
                page: n + 1,
                page_count,
                trials: chunk.to_vec(),
            });
        }
    }
    pages
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "trial", rename_all = "lowercase")]
pub enum Slot {
    Trial(usize),
    Blank,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GridPlan {
    pub rows: usize,
    pub cols: usize,
    /// Row-major, always `rows * cols` long
    pub slots: Vec<Slot>,
    /// Trials that did not fit
    pub dropped: Vec<usize>,
}

impl GridPlan {
    pub fn cell(&self, row: usize, col: usize) -> Slot {
        self.slots[row * self.cols + col]
    }

    pub fn blank_count(&self) -> usize {
        self.slots.iter().filter(|s| **s == Slot::Blank).count()
    }
}

/// Comma-separated record names of the given trials, for diagnostics.
pub fn trial_names(trials: &[Trial], idx: &[usize]) -> String {
    idx.iter()
        .filter_map(|&i| trials.get(i))
        .map(|t| t.record.name.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Run block, then Jog, then Walk, row-major into a `rows` x `cols` grid.
pub fn grid(trials: &[Trial], rows: usize, cols: usize) -> Option<GridPlan> {
    if trials.is_empty() {
        return None;
    }
    let Some(capacity) = rows.checked_mul(cols) else {
        warn!("{}x{} grid is too large to lay out", rows, cols);
        return None;
    };
    let ordered: Vec<usize> = GRID_SPEED_ORDER
        .iter()
        .flat_map(|&speed| speed_block(trials, speed))
        .collect();

    let dropped: Vec<usize> = ordered.iter().skip(capacity).copied().collect();
    if !dropped.is_empty() {
        warn!(
            "{} trial(s) do not fit in the {}x{} grid and are left out: {}",
            dropped.len(),
            rows,
            cols,
            trial_names(trials, &dropped)
        );
    }

    let slots = (0..capacity)
        .map(|i| ordered.get(i).map_or(Slot::Blank, |&t| Slot::Trial(t)))
        .collect();

    Some(GridPlan { rows, cols, slots, dropped })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrellisPlan {
    pub rows: Vec<SpeedLabel>,
    pub cols: Vec<ProximityLabel>,
    /// Row-major facets, each holding the trials overlaid in it
    pub facets: Vec<Vec<usize>>,
    /// Trials with no facet (unknown proximity or unsplit runs)
    pub unplaced: Vec<usize>,
}

impl TrellisPlan {
    pub fn facet(&self, speed: SpeedLabel, proximity: ProximityLabel) -> &[usize] {
        let r = self.rows.iter().position(|s| *s == speed);
        let c = self.cols.iter().position(|p| *p == proximity);
        match (r, c) {
            (Some(r), Some(c)) => &self.facets[r * self.cols.len() + c],
            _ => &[],
        }
    }
}

/// Speed x proximity facets. Expects runs already split into hand/shoe.
pub fn trellis(trials: &[Trial]) -> Option<TrellisPlan> {
    if trials.is_empty() {
        return None;
    }
    let mut facets = vec![Vec::new(); TRELLIS_ROWS.len() * TRELLIS_COLS.len()];
    let mut unplaced = Vec::new();

    let mut order: Vec<usize> = (0..trials.len()).collect();
    order.sort_by(|&a, &b| trials[a].record.name.cmp(&trials[b].record.name));

    for i in order {
        let class = &trials[i].class;
        let r = TRELLIS_ROWS.iter().position(|s| *s == class.speed);
        let c = TRELLIS_COLS.iter().position(|p| *p == class.proximity);
        match (r, c) {
            (Some(r), Some(c)) => facets[r * TRELLIS_COLS.len() + c].push(i),
            _ => unplaced.push(i),
        }
    }

    if !unplaced.is_empty() {
        warn!(
            "{} trial(s) have no trellis facet and are left out: {}",
            unplaced.len(),
            trial_names(trials, &unplaced)
        );
    }

    Some(TrellisPlan {
        rows: TRELLIS_ROWS.to_vec(),
        cols: TRELLIS_COLS.to_vec(),
        facets,
        unplaced,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::Classification;
    use crate::trial::TrialRecord;
    use std::collections::BTreeMap;
    use std::path::PathBuf;

    fn trial(name: &str, speed: SpeedLabel, proximity: ProximityLabel) -> Trial {
        Trial {
            record: TrialRecord {
                path: PathBuf::from(format!("result_{}.json", name)),
                name: name.to_string(),
                base_ts: None,
                series: vec![],
                algorithms: BTreeMap::new(),
            },
            class: Classification {
                sample_count: 0,
                peak_rssi: None,
                first_t: None,
                speed,
                proximity,
            },
        }
    }

    fn names(trials: &[Trial], idx: &[usize]) -> Vec<String> {
        idx.iter().map(|&i| trials[i].record.name.clone()).collect()
    }

    // ==========================================================================
    // PAGINATED
    // ==========================================================================

    #[test]
    fn test_paginate_groups_sorts_and_chunks() {
        use ProximityLabel::*;
        use SpeedLabel::*;
        let trials = vec![
            trial("w3", Walk, Far),
            trial("r1", Run, Close),
            trial("w1", Walk, Close),
            trial("j1", Jog, Far),
            trial("w2", Walk, Far),
            trial("rh", RunHand, Far),
        ];

        let pages = paginate(&trials, 2);
        assert_eq!(pages.len(), 4);

        assert_eq!(pages[0].speed, Walk);
        assert_eq!(names(&trials, &pages[0].trials), vec!["w1", "w2"]);
        assert_eq!(pages[0].title(), "Walk - samples 1-2");
        assert_eq!((pages[0].page, pages[0].page_count), (1, 2));

        assert_eq!(names(&trials, &pages[1].trials), vec!["w3"]);
        assert_eq!(pages[1].title(), "Walk - samples 3-3");

        assert_eq!(pages[2].speed, Jog);
        assert_eq!(pages[3].speed, Run);
        assert_eq!(names(&trials, &pages[3].trials), vec!["r1", "rh"]);
    }

    #[test]
    fn test_paginate_empty_is_noop() {
        assert!(paginate(&[], 4).is_empty());
    }

    // ==========================================================================
    // GRID
    // ==========================================================================

    #[test]
    fn test_grid_orders_blocks_and_blanks_tail() {
        use ProximityLabel::*;
        use SpeedLabel::*;
        let trials = vec![
            trial("walk_b", Walk, Close),
            trial("jog_a", Jog, Far),
            trial("run_b", Run, Far),
            trial("walk_a", Walk, Far),
            trial("run_a", Run, Unknown),
        ];

        let plan = grid(&trials, 2, 3).unwrap();
        assert_eq!(plan.slots.len(), 6);
        let placed: Vec<String> = plan
            .slots
            .iter()
            .filter_map(|s| match s {
                Slot::Trial(i) => Some(trials[*i].record.name.clone()),
                Slot::Blank => None,
            })
            .collect();
        assert_eq!(placed, vec!["run_a", "run_b", "jog_a", "walk_a", "walk_b"]);
        assert_eq!(plan.cell(1, 2), Slot::Blank);
        assert_eq!(plan.blank_count(), 1);
        assert!(plan.dropped.is_empty());
    }

    #[test]
    fn test_grid_overflow_is_reported() {
        let trials: Vec<Trial> = (0..5)
            .map(|i| trial(&format!("t{}", i), SpeedLabel::Jog, ProximityLabel::Far))
            .collect();
        let plan = grid(&trials, 2, 2).unwrap();
        assert_eq!(plan.blank_count(), 0);
        assert_eq!(names(&trials, &plan.dropped), vec!["t4"]);
    }

    #[test]
    fn test_grid_empty_is_noop() {
        assert!(grid(&[], 4, 5).is_none());
    }

    #[test]
    fn test_grid_size_overflow_is_refused() {
        let trials = vec![trial("t0", SpeedLabel::Walk, ProximityLabel::Far)];
        assert!(grid(&trials, usize::MAX, 2).is_none());
    }

    #[test]
    fn test_left_out_trials_are_named() {
        let trials: Vec<Trial> = ["a", "b", "c"]
            .iter()
            .map(|n| trial(n, SpeedLabel::Walk, ProximityLabel::Far))
            .collect();
        let plan = grid(&trials, 1, 1).unwrap();
        assert_eq!(trial_names(&trials, &plan.dropped), "b, c");
        assert_eq!(trial_names(&trials, &[]), "");
        assert_eq!(trial_names(&trials, &[0, 7]), "a");
    }

    // ==========================================================================
    // TRELLIS
    // ==========================================================================

    #[test]
    fn test_trellis_facets() {
        use ProximityLabel::*;
        use SpeedLabel::*;
        let trials = vec![
            trial("b", RunShoe, Close),
            trial("a", RunShoe, Close),
            trial("c", RunHand, Far),
            trial("d", Walk, Unknown),
            trial("e", Run, Far),
            trial("f", Jog, Far),
        ];
        let plan = trellis(&trials).unwrap();
        assert_eq!(plan.facets.len(), 8);
        assert_eq!(names(&trials, plan.facet(RunShoe, Close)), vec!["a", "b"]);
        assert_eq!(names(&trials, plan.facet(RunHand, Far)), vec!["c"]);
        assert_eq!(names(&trials, plan.facet(Jog, Far)), vec!["f"]);
        assert!(plan.facet(Walk, Close).is_empty());
        assert_eq!(names(&trials, &plan.unplaced), vec!["d", "e"]);
        assert_eq!(trial_names(&trials, &plan.unplaced), "d, e");
    }

    #[test]
    fn test_layout_policy_parse() {
        assert_eq!("grid".parse::<LayoutPolicy>(), Ok(LayoutPolicy::Grid));
        assert_eq!("Paginated".parse::<LayoutPolicy>(), Ok(LayoutPolicy::Pages));
        assert_eq!("trellis".parse::<LayoutPolicy>(), Ok(LayoutPolicy::Trellis));
        assert!("mosaic".parse::<LayoutPolicy>().is_err());
    }
}
