//! Which drawn elements belong to which legend entry, and who is visible
//!
//! Every element a panel draws is registered under its owning label: the raw
//! series under [`MEASURED`], overlays under their algorithm's name. The
//! registry lives exactly as long as one figure; nothing is shared between
//! figures.
//!
//! Once all panels are drawn, [`ToggleController::attach`] builds the legend
//! from the labels that actually appeared and applies the opening state:
//! measurements visible, every algorithm hidden so the viewer opts in to each
//! overlay. Picking a legend entry then flips every element of that label on
//! every panel at once.

use super::style::{style_for, MEASURED_MARKER_COLOR};
use serde::Serialize;
use std::collections::HashMap;

pub const MEASURED: &str = "Measured";

/// Alpha of a legend entry whose overlay is hidden.
pub const DIMMED_ALPHA: f64 = 0.25;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ElementId(pub usize);

#[derive(Debug, Clone, Default, Serialize)]
pub struct OverlayRegistry {
    /// Labels in first-registered order
    order: Vec<String>,
    members: HashMap<String, Vec<ElementId>>,
    visible: Vec<bool>,
}

impl OverlayRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate an element id owned by `label`. Elements start visible.
    pub fn register(&mut self, label: &str) -> ElementId {
        let id = ElementId(self.visible.len());
        self.visible.push(true);
        match self.members.get_mut(label) {
            Some(ids) => ids.push(id),
            None => {
                self.order.push(label.to_string());
                self.members.insert(label.to_string(), vec![id]);
            }
        }
        id
    }

    /// Labels in legend order: "Measured" first, then as first drawn.
    pub fn labels(&self) -> Vec<&str> {
        let measured = self.order.iter().filter(|l| l.as_str() == MEASURED);
        let others = self.order.iter().filter(|l| l.as_str() != MEASURED);
        measured.chain(others).map(String::as_str).collect()
    }

    pub fn contains(&self, label: &str) -> bool {
        self.members.contains_key(label)
    }

    pub fn elements(&self, label: &str) -> &[ElementId] {
        self.members.get(label).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.visible.len()
    }

    pub fn is_empty(&self) -> bool {
        self.visible.is_empty()
    }

    pub fn is_visible(&self, id: ElementId) -> bool {
        self.visible.get(id.0).copied().unwrap_or(false)
    }

    /// `Some(true)` if any element of the label is visible.
    pub fn label_visible(&self, label: &str) -> Option<bool> {
        let ids = self.members.get(label)?;
        Some(ids.iter().any(|id| self.visible[id.0]))
    }

    pub fn set_label_visible(&mut self, label: &str, visible: bool) -> bool {
        let Some(ids) = self.members.get(label) else {
            return false;
        };
        for id in ids {
            self.visible[id.0] = visible;
        }
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LegendKind {
    /// Marker-only entry for the raw samples
    Measured,
    /// Dashed line entry for an algorithm overlay
    Algorithm,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LegendEntry {
    pub label: String,
    pub color: String,
    pub kind: LegendKind,
    pub visible: bool,
}

impl LegendEntry {
    pub fn alpha(&self) -> f64 {
        if self.visible {
            1.0
        } else {
            DIMMED_ALPHA
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Legend {
    pub entries: Vec<LegendEntry>,
}

impl Legend {
    pub fn build(registry: &OverlayRegistry) -> Self {
        let entries = registry
            .labels()
            .into_iter()
            .map(|label| {
                let (color, kind) = if label == MEASURED {
                    (MEASURED_MARKER_COLOR, LegendKind::Measured)
                } else {
                    (style_for(label).color, LegendKind::Algorithm)
                };
                LegendEntry {
                    label: label.to_string(),
                    color: color.to_string(),
                    kind,
                    visible: registry.label_visible(label).unwrap_or(false),
                }
            })
            .collect();
        Self { entries }
    }

    pub fn labels(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.label.as_str()).collect()
    }

    pub fn entry(&self, label: &str) -> Option<&LegendEntry> {
        self.entries.iter().find(|e| e.label == label)
    }

    fn entry_mut(&mut self, label: &str) -> Option<&mut LegendEntry> {
        self.entries.iter_mut().find(|e| e.label == label)
    }
}

/// Legend click handler bound to one figure's registry.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ToggleController {
    registry: OverlayRegistry,
    legend: Legend,
}

impl ToggleController {
    /// Take ownership of a finished registry, apply the opening visibility and
    /// build the legend.
    pub fn attach(mut registry: OverlayRegistry) -> Self {
        let labels: Vec<String> = registry.labels().into_iter().map(String::from).collect();
        for label in &labels {
            registry.set_label_visible(label, label == MEASURED);
        }
        let legend = Legend::build(&registry);
        Self { registry, legend }
    }

    /// Flip one label. Returns the new visibility, or `None` if the label is
    /// not on this figure (the pick is ignored).
    pub fn on_pick(&mut self, label: &str) -> Option<bool> {
        let make_visible = !self.registry.label_visible(label)?;
        self.registry.set_label_visible(label, make_visible);
        if let Some(entry) = self.legend.entry_mut(label) {
            entry.visible = make_visible;
        }
        Some(make_visible)
    }

    pub fn registry(&self) -> &OverlayRegistry {
        &self.registry
    }

    pub fn legend(&self) -> &Legend {
        &self.legend
    }

    pub fn is_visible(&self, id: ElementId) -> bool {
        self.registry.is_visible(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_registry() -> (OverlayRegistry, Vec<ElementId>) {
        let mut reg = OverlayRegistry::new();
        let ids = vec![
            reg.register("Kalman(Q=4.0,R=16.0)"),
            reg.register(MEASURED),
            reg.register("Mystery"),
            reg.register(MEASURED),
            reg.register("Kalman(Q=4.0,R=16.0)"),
        ];
        (reg, ids)
    }

    #[test]
    fn test_register_groups_by_label() {
        let (reg, ids) = sample_registry();
        assert_eq!(reg.len(), 5);
        assert_eq!(reg.elements(MEASURED), &[ids[1], ids[3]]);
        assert_eq!(reg.elements("Kalman(Q=4.0,R=16.0)"), &[ids[0], ids[4]]);
        assert!(reg.elements("absent").is_empty());
        assert!(ids.iter().all(|id| reg.is_visible(*id)));
    }

    #[test]
    fn test_labels_put_measured_first() {
        let (reg, _) = sample_registry();
        assert_eq!(reg.labels(), vec![MEASURED, "Kalman(Q=4.0,R=16.0)", "Mystery"]);
    }

    #[test]
    fn test_attach_applies_opening_visibility() {
        let (reg, ids) = sample_registry();
        let ctl = ToggleController::attach(reg);

        assert!(ctl.is_visible(ids[1]));
        assert!(ctl.is_visible(ids[3]));
        assert!(!ctl.is_visible(ids[0]));
        assert!(!ctl.is_visible(ids[2]));

        let legend = ctl.legend();
        assert_eq!(legend.labels(), vec![MEASURED, "Kalman(Q=4.0,R=16.0)", "Mystery"]);
        assert_eq!(legend.entries[0].kind, LegendKind::Measured);
        assert_eq!(legend.entries[0].alpha(), 1.0);
        assert_eq!(legend.entries[1].color, "#2ca02c");
        assert_eq!(legend.entries[1].alpha(), DIMMED_ALPHA);
        assert_eq!(legend.entries[2].color, "#8B4513");
    }

    #[test]
    fn test_toggle_flips_every_element_of_label() {
        let (reg, ids) = sample_registry();
        let mut ctl = ToggleController::attach(reg);

        assert_eq!(ctl.on_pick("Kalman(Q=4.0,R=16.0)"), Some(true));
        assert!(ctl.is_visible(ids[0]) && ctl.is_visible(ids[4]));
        assert!(ctl.legend().entry("Kalman(Q=4.0,R=16.0)").unwrap().visible);
        assert!(!ctl.is_visible(ids[2]));

        assert_eq!(ctl.on_pick(MEASURED), Some(false));
        assert!(!ctl.is_visible(ids[1]) && !ctl.is_visible(ids[3]));
        assert_eq!(ctl.legend().entry(MEASURED).unwrap().alpha(), DIMMED_ALPHA);
    }

    #[test]
    fn test_double_toggle_restores_state() {
        let (reg, ids) = sample_registry();
        let mut ctl = ToggleController::attach(reg);
        let before: Vec<bool> = ids.iter().map(|id| ctl.is_visible(*id)).collect();
        let legend_before = ctl.legend().clone();

        for label in [MEASURED, "Mystery", "Kalman(Q=4.0,R=16.0)"] {
            ctl.on_pick(label);
            ctl.on_pick(label);
        }

        let after: Vec<bool> = ids.iter().map(|id| ctl.is_visible(*id)).collect();
        assert_eq!(before, after);
        assert_eq!(&legend_before, ctl.legend());
    }

    #[test]
    fn test_partial_visibility_resolves_to_hidden() {
        let (mut reg, ids) = sample_registry();
        // one of two Measured elements hidden: a pick hides both
        reg.visible[ids[3].0] = false;
        let mut ctl = ToggleController { legend: Legend::build(&reg), registry: reg };
        assert_eq!(ctl.on_pick(MEASURED), Some(false));
        assert!(!ctl.is_visible(ids[1]) && !ctl.is_visible(ids[3]));
    }

    #[test]
    fn test_unknown_label_is_ignored() {
        let (reg, ids) = sample_registry();
        let mut ctl = ToggleController::attach(reg);
        let before: Vec<bool> = ids.iter().map(|id| ctl.is_visible(*id)).collect();
        assert_eq!(ctl.on_pick("not drawn"), None);
        let after: Vec<bool> = ids.iter().map(|id| ctl.is_visible(*id)).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn test_empty_registry_has_empty_legend() {
        let ctl = ToggleController::attach(OverlayRegistry::new());
        assert!(ctl.legend().entries.is_empty());
        assert!(ctl.registry().is_empty());
    }
}
