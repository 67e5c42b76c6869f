//! Step Sequencer
//!
//! Reduces the catalog's step list by the triage selection and walks the
//! remaining order one negative answer at a time.

use std::collections::{BTreeSet, HashSet};

use diag_assist_config::FlowConfig;
use diag_assist_core::{ContentCatalog, CoreError, DiagnosticStep, NONE_SELECTION};
use diag_assist_text_processing::phrasing;

use crate::state::SessionState;

/// Where the session goes after triage
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriageRoute {
    /// Open the guided flow with this analysis text
    Guided { acknowledgment: String },
    /// Nothing worth trying, hand off to the specialist
    Escalate,
}

/// Outcome of a triage submission, computed without touching session state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriagePlan {
    /// Valid check ids, in checklist order
    pub effective: Vec<String>,
    /// What the session records: the valid ids, or just the none sentinel
    pub selections: BTreeSet<String>,
    /// What the operator "said"
    pub utterance: String,
    pub remaining: Vec<String>,
    pub route: TriageRoute,
}

/// Result of a negative answer on a step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Advance {
    Next { cursor: usize, step_id: String },
    Exhausted,
}

pub struct StepSequencer<'a> {
    catalog: &'a ContentCatalog,
    escalate_when_basics_exhausted: bool,
}

impl<'a> StepSequencer<'a> {
    pub fn new(catalog: &'a ContentCatalog, flow: &FlowConfig) -> Self {
        Self {
            catalog,
            escalate_when_basics_exhausted: flow.escalate_when_basics_exhausted,
        }
    }

    /// Raw selection reduced to known triage checks.
    ///
    /// The none sentinel anywhere empties the selection. Ids that are not
    /// triage checks are dropped with a warning.
    pub fn effective_selection<S: AsRef<str>>(&self, raw: &[S]) -> Vec<String> {
        if raw.iter().any(|id| id.as_ref() == NONE_SELECTION) {
            return Vec::new();
        }

        for id in raw.iter().map(|id| id.as_ref()) {
            if !self.catalog.is_triage_check(id) {
                tracing::warn!(check_id = %id, "Ignoring unknown triage selection");
            }
        }

        let selected: HashSet<&str> = raw.iter().map(|id| id.as_ref()).collect();
        self.catalog
            .triage
            .checks
            .iter()
            .filter(|check| selected.contains(check.id.as_str()))
            .map(|check| check.id.clone())
            .collect()
    }

    /// Unselected basic steps, then every deep step, each in catalog order.
    pub fn remaining_order(&self, effective: &[String]) -> Vec<String> {
        self.catalog
            .non_deep_steps()
            .filter(|step| !effective.contains(&step.id))
            .chain(self.catalog.deep_steps())
            .map(|step| step.id.clone())
            .collect()
    }

    /// Whether the selection rules out every triageable step
    pub fn covers_all_basic(&self, effective: &[String]) -> bool {
        let mut basic = self.catalog.non_deep_steps().peekable();
        basic.peek().is_some() && basic.all(|step| effective.contains(&step.id))
    }

    pub fn triage_utterance(&self, effective: &[String]) -> String {
        let summaries: Vec<&str> = self
            .catalog
            .triage
            .checks
            .iter()
            .filter(|check| effective.contains(&check.id))
            .map(|check| check.summary.as_str())
            .collect();
        phrasing::triage_utterance(
            &summaries,
            self.catalog.triage.checks.len(),
            &self.catalog.triage.unresolved_note,
        )
    }

    /// Opening analysis naming the ruled-out steps (catalog order, lower-cased)
    pub fn acknowledgment(&self, effective: &[String], opening: &DiagnosticStep) -> String {
        let ruled_out: Vec<String> = self
            .catalog
            .steps
            .iter()
            .filter(|step| effective.contains(&step.id))
            .map(|step| step.label.to_lowercase())
            .collect();
        phrasing::acknowledgment(&ruled_out, &opening.analysis)
    }

    /// Work out the whole triage transition
    pub fn plan<S: AsRef<str>>(&self, raw: &[S]) -> Result<TriagePlan, CoreError> {
        let effective = self.effective_selection(raw);
        let selections = if raw.iter().any(|id| id.as_ref() == NONE_SELECTION) {
            BTreeSet::from([NONE_SELECTION.to_string()])
        } else {
            effective.iter().cloned().collect()
        };
        let utterance = self.triage_utterance(&effective);
        let remaining = self.remaining_order(&effective);

        let escalate = remaining.is_empty()
            || (self.escalate_when_basics_exhausted && self.covers_all_basic(&effective));

        let route = if escalate {
            TriageRoute::Escalate
        } else {
            let opening = self.catalog.require_step(&remaining[0])?;
            TriageRoute::Guided {
                acknowledgment: self.acknowledgment(&effective, opening),
            }
        };

        Ok(TriagePlan {
            effective,
            selections,
            utterance,
            remaining,
            route,
        })
    }

    /// Next position after a negative answer on the current step
    pub fn advance(&self, state: &SessionState) -> Advance {
        let cursor = state.cursor + 1;
        match state.remaining_step_order.get(cursor) {
            Some(step_id) => Advance::Next {
                cursor,
                step_id: step_id.clone(),
            },
            None => Advance::Exhausted,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use diag_assist_config::parse_catalog;

    fn catalog() -> ContentCatalog {
        let path = concat!(
            env!("CARGO_MANIFEST_DIR"),
            "/../../config/catalogs/rtv_xg850_overheating.yaml"
        );
        parse_catalog(&std::fs::read_to_string(path).unwrap()).unwrap()
    }

    #[test]
    fn test_effective_selection_none_sentinel() {
        let catalog = catalog();
        let sequencer = StepSequencer::new(&catalog, &FlowConfig::default());
        assert!(sequencer
            .effective_selection(&["oilLevel", "none"])
            .is_empty());
    }

    #[test]
    fn test_effective_selection_drops_unknown_and_orders() {
        let catalog = catalog();
        let sequencer = StepSequencer::new(&catalog, &FlowConfig::default());
        let effective =
            sequencer.effective_selection(&["radiatorScreen", "coolingFan", "bogus", "coolantLevel"]);
        assert_eq!(effective, vec!["coolantLevel", "radiatorScreen"]);
    }

    #[test]
    fn test_remaining_order_is_independent_of_selection_order() {
        let catalog = catalog();
        let sequencer = StepSequencer::new(&catalog, &FlowConfig::default());
        let a = sequencer.remaining_order(&sequencer.effective_selection(&["radiatorScreen", "coolantLevel"]));
        let b = sequencer.remaining_order(&sequencer.effective_selection(&["coolantLevel", "radiatorScreen"]));
        assert_eq!(a, b);
        assert_eq!(a, vec!["oilLevel", "coolingFan", "hoseInspection", "coolantFlush"]);
    }

    #[test]
    fn test_remaining_order_puts_deep_steps_last() {
        let mut catalog = catalog();
        let fan = catalog.steps.iter().position(|s| s.id == "coolingFan").unwrap();
        let fan = catalog.steps.remove(fan);
        catalog.steps.insert(1, fan);

        let sequencer = StepSequencer::new(&catalog, &FlowConfig::default());
        assert_eq!(
            sequencer.remaining_order(&sequencer.effective_selection(&["none"])),
            vec![
                "coolantLevel",
                "oilLevel",
                "radiatorScreen",
                "coolingFan",
                "hoseInspection",
                "coolantFlush"
            ]
        );
        assert_eq!(
            sequencer.remaining_order(&sequencer.effective_selection(&["oilLevel"])),
            vec!["coolantLevel", "radiatorScreen", "coolingFan", "hoseInspection", "coolantFlush"]
        );
    }

    #[test]
    fn test_plan_single_selection() {
        let catalog = catalog();
        let sequencer = StepSequencer::new(&catalog, &FlowConfig::default());
        let plan = sequencer.plan(&["oilLevel"]).unwrap();
        assert_eq!(plan.utterance, "Already tried the engine oil. Still overheating.");
        assert_eq!(plan.remaining[..2], ["coolantLevel", "radiatorScreen"]);
        match plan.route {
            TriageRoute::Guided { acknowledgment } => {
                assert!(acknowledgment.starts_with("Good, you've already checked engine oil level. "));
                assert!(acknowledgment.ends_with(&catalog.steps[0].analysis));
            }
            TriageRoute::Escalate => panic!("expected guided route"),
        }
    }

    #[test]
    fn test_plan_empty_selection() {
        let catalog = catalog();
        let sequencer = StepSequencer::new(&catalog, &FlowConfig::default());
        let plan = sequencer.plan(&["none", "oilLevel"]).unwrap();
        assert_eq!(plan.selections, BTreeSet::from(["none".to_string()]));
        assert_eq!(plan.utterance, "Haven't tried any of these yet.");
        assert_eq!(plan.remaining.len(), 6);
        assert!(matches!(
            plan.route,
            TriageRoute::Guided { ref acknowledgment }
                if acknowledgment.starts_with("Let's start with the most common cause. ")
        ));
    }

    #[test]
    fn test_plan_full_selection_escalates() {
        let catalog = catalog();
        let sequencer = StepSequencer::new(&catalog, &FlowConfig::default());
        let plan = sequencer
            .plan(&["coolantLevel", "oilLevel", "radiatorScreen"])
            .unwrap();
        assert_eq!(plan.utterance, "Already checked all of these. Nothing resolved it.");
        assert_eq!(plan.route, TriageRoute::Escalate);
    }

    #[test]
    fn test_plan_full_selection_runs_deep_steps_when_configured() {
        let catalog = catalog();
        let flow = FlowConfig {
            escalate_when_basics_exhausted: false,
            ..FlowConfig::default()
        };
        let sequencer = StepSequencer::new(&catalog, &flow);
        let plan = sequencer
            .plan(&["coolantLevel", "oilLevel", "radiatorScreen"])
            .unwrap();
        assert_eq!(plan.remaining, vec!["coolingFan", "hoseInspection", "coolantFlush"]);
        match plan.route {
            TriageRoute::Guided { acknowledgment } => assert!(acknowledgment.starts_with(
                "Good, you've already ruled out coolant level & hoses, engine oil level, and radiator screen & airflow. "
            )),
            TriageRoute::Escalate => panic!("expected guided route"),
        }
    }

    #[test]
    fn test_advance() {
        let catalog = catalog();
        let sequencer = StepSequencer::new(&catalog, &FlowConfig::default());
        let mut state = SessionState::new();
        state.remaining_step_order = vec!["a".to_string(), "b".to_string()];
        assert_eq!(
            sequencer.advance(&state),
            Advance::Next {
                cursor: 1,
                step_id: "b".to_string()
            }
        );
        state.cursor = 1;
        assert_eq!(sequencer.advance(&state), Advance::Exhausted);
    }
}
