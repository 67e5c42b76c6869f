//! Content catalog
//!
//! Immutable scenario content consumed by the orchestrator: diagnostic steps,
//! redirect diagnoses, triage checklist, escalation contact and the opaque
//! reference material shown alongside the conversation.

use chrono::NaiveDate;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{CoreError, Result};

/// Sentinel triage id meaning "haven't tried any of these"
pub const NONE_SELECTION: &str = "none";

/// Equipment component a diagnostic step inspects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Component {
    Fan,
    Hose,
    Coolant,
    Oil,
}

/// Shared view over anything presented as a yes/no diagnostic entry.
///
/// Implemented by both catalog steps and redirect diagnoses so the
/// orchestrator can present and resolve either one the same way.
pub trait DiagnosticEntry {
    fn id(&self) -> &str;
    fn label(&self) -> &str;
    fn analysis(&self) -> &str;
    fn recommendation(&self) -> &str;
    fn sources(&self) -> &[String];
    fn yes_label(&self) -> &str;
    fn no_label(&self) -> &str;
    fn resolution(&self) -> &str;

    /// Component inspected by this entry, if tagged
    fn component(&self) -> Option<Component> {
        None
    }
}

/// One candidate root cause
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticStep {
    pub id: String,
    pub label: String,
    pub analysis: String,
    pub recommendation: String,
    #[serde(default)]
    pub sources: Vec<String>,
    pub yes_label: String,
    pub no_label: String,
    pub resolution: String,
    /// Deep steps are never offered in triage
    #[serde(default)]
    pub deep: bool,
    #[serde(default)]
    pub component: Option<Component>,
}

impl DiagnosticEntry for DiagnosticStep {
    fn id(&self) -> &str {
        &self.id
    }
    fn label(&self) -> &str {
        &self.label
    }
    fn analysis(&self) -> &str {
        &self.analysis
    }
    fn recommendation(&self) -> &str {
        &self.recommendation
    }
    fn sources(&self) -> &[String] {
        &self.sources
    }
    fn yes_label(&self) -> &str {
        &self.yes_label
    }
    fn no_label(&self) -> &str {
        &self.no_label
    }
    fn resolution(&self) -> &str {
        &self.resolution
    }
    fn component(&self) -> Option<Component> {
        self.component
    }
}

/// Case-insensitive trigger regex, serialized as its source pattern
#[derive(Debug, Clone)]
pub struct TriggerPattern {
    source: String,
    regex: Regex,
}

impl TriggerPattern {
    /// Compile a case-insensitive trigger
    pub fn new(pattern: &str) -> Result<Self> {
        let regex = RegexBuilder::new(pattern)
            .case_insensitive(true)
            .build()
            .map_err(|e| CoreError::InvalidPattern {
                id: pattern.to_string(),
                message: e.to_string(),
            })?;
        Ok(Self {
            source: pattern.to_string(),
            regex,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }
}

impl PartialEq for TriggerPattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl Serialize for TriggerPattern {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.source)
    }
}

impl<'de> Deserialize<'de> for TriggerPattern {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let source = String::deserialize(deserializer)?;
        TriggerPattern::new(&source).map_err(serde::de::Error::custom)
    }
}

/// Ad-hoc diagnosis spliced into the guided flow when free text matches
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RedirectDefinition {
    pub id: String,
    /// Any matching trigger activates the redirect
    pub triggers: Vec<TriggerPattern>,
    pub label: String,
    pub analysis: String,
    pub recommendation: String,
    #[serde(default)]
    pub sources: Vec<String>,
    pub yes_label: String,
    pub no_label: String,
    pub resolution: String,
}

impl RedirectDefinition {
    /// Whether the operator's text trips this redirect
    pub fn matches(&self, text: &str) -> bool {
        self.triggers.iter().any(|t| t.is_match(text))
    }
}

impl DiagnosticEntry for RedirectDefinition {
    fn id(&self) -> &str {
        &self.id
    }
    fn label(&self) -> &str {
        &self.label
    }
    fn analysis(&self) -> &str {
        &self.analysis
    }
    fn recommendation(&self) -> &str {
        &self.recommendation
    }
    fn sources(&self) -> &[String] {
        &self.sources
    }
    fn yes_label(&self) -> &str {
        &self.yes_label
    }
    fn no_label(&self) -> &str {
        &self.no_label
    }
    fn resolution(&self) -> &str {
        &self.resolution
    }
}

/// Triage checklist entry. `id` names a non-deep step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriageCheck {
    pub id: String,
    pub label: String,
    /// Natural-language fragment used in the operator's summary utterance
    pub summary: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntakeContent {
    pub questions: Vec<String>,
    /// Substituted when the operator submits an empty description
    pub default_response: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriageContent {
    pub message: String,
    pub prompt: String,
    pub checks: Vec<TriageCheck>,
    pub none_label: String,
    /// Appended to partial triage summaries, e.g. "Still overheating."
    pub unresolved_note: String,
}

/// Human specialist offered on escalation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Expert {
    pub name: String,
    pub title: String,
    pub availability: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscalationContent {
    pub text: String,
    pub expert: Expert,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetInfo {
    pub name: String,
    pub id: String,
    pub location: String,
    #[serde(default)]
    pub last_pm: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkOrderInfo {
    pub number: String,
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub history: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceSection {
    #[serde(rename = "ref")]
    pub reference: String,
    pub pages: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceFile {
    pub name: String,
    #[serde(default)]
    pub sections: Vec<ReferenceSection>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkOrderSummary {
    pub diagnosis: String,
    #[serde(default)]
    pub repairs: Vec<String>,
    pub status: String,
    #[serde(default)]
    pub recommendations: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriorWorkOrder {
    pub number: String,
    pub title: String,
    pub date: String,
    pub assignee: String,
    pub summary: WorkOrderSummary,
}

/// Reference material listed in the sources panel
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceSources {
    #[serde(default)]
    pub files: Vec<ReferenceFile>,
    #[serde(default)]
    pub work_orders: Vec<PriorWorkOrder>,
}

/// Complete scenario content, loaded once before any session starts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentCatalog {
    pub asset: AssetInfo,
    pub work_order: WorkOrderInfo,
    pub intake: IntakeContent,
    pub triage: TriageContent,
    /// Candidate causes in sequencing order
    pub steps: Vec<DiagnosticStep>,
    pub escalation: EscalationContent,
    /// Evaluated in declaration order; first match wins
    #[serde(default)]
    pub redirects: Vec<RedirectDefinition>,
    #[serde(default)]
    pub sources: ReferenceSources,
}

impl ContentCatalog {
    /// Look up a step by id
    pub fn step(&self, id: &str) -> Option<&DiagnosticStep> {
        self.steps.iter().find(|s| s.id == id)
    }

    /// Look up a step by id, failing on unknown ids
    pub fn require_step(&self, id: &str) -> Result<&DiagnosticStep> {
        self.step(id)
            .ok_or_else(|| CoreError::UnknownStep(id.to_string()))
    }

    pub fn redirect(&self, id: &str) -> Option<&RedirectDefinition> {
        self.redirects.iter().find(|r| r.id == id)
    }

    pub fn require_redirect(&self, id: &str) -> Result<&RedirectDefinition> {
        self.redirect(id)
            .ok_or_else(|| CoreError::UnknownRedirect(id.to_string()))
    }

    /// Triageable steps in catalog order
    pub fn non_deep_steps(&self) -> impl Iterator<Item = &DiagnosticStep> {
        self.steps.iter().filter(|s| !s.deep)
    }

    pub fn deep_steps(&self) -> impl Iterator<Item = &DiagnosticStep> {
        self.steps.iter().filter(|s| s.deep)
    }

    pub fn triage_check(&self, id: &str) -> Option<&TriageCheck> {
        self.triage.checks.iter().find(|c| c.id == id)
    }

    pub fn is_triage_check(&self, id: &str) -> bool {
        self.triage_check(id).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step(id: &str, deep: bool) -> DiagnosticStep {
        DiagnosticStep {
            id: id.to_string(),
            label: format!("{} label", id),
            analysis: format!("{} analysis", id),
            recommendation: format!("{} recommendation", id),
            sources: vec!["Manual, p. 12 - Something".to_string()],
            yes_label: "yes".to_string(),
            no_label: "no".to_string(),
            resolution: format!("{} resolved", id),
            deep,
            component: None,
        }
    }

    fn catalog() -> ContentCatalog {
        ContentCatalog {
            asset: AssetInfo {
                name: "Test asset".to_string(),
                id: "A-1".to_string(),
                location: "Yard".to_string(),
                last_pm: NaiveDate::from_ymd_opt(2026, 1, 20),
            },
            work_order: WorkOrderInfo {
                number: "1".to_string(),
                title: "Overheating".to_string(),
                description: "Runs hot".to_string(),
                history: String::new(),
            },
            intake: IntakeContent {
                questions: vec!["When?".to_string()],
                default_response: "Yesterday.".to_string(),
            },
            triage: TriageContent {
                message: "Check these".to_string(),
                prompt: "Tried any?".to_string(),
                checks: vec![TriageCheck {
                    id: "a".to_string(),
                    label: "Checked a".to_string(),
                    summary: "a".to_string(),
                }],
                none_label: "None".to_string(),
                unresolved_note: "Still broken.".to_string(),
            },
            steps: vec![step("a", false), step("deep", true), step("b", false)],
            escalation: EscalationContent {
                text: "Escalating".to_string(),
                expert: Expert {
                    name: "Pat".to_string(),
                    title: "Tech".to_string(),
                    availability: "Now".to_string(),
                },
            },
            redirects: vec![RedirectDefinition {
                id: "crack".to_string(),
                triggers: vec![TriggerPattern::new("radiator.*crack").unwrap()],
                label: "Cracked radiator".to_string(),
                analysis: "Cracks".to_string(),
                recommendation: "Inspect".to_string(),
                sources: vec![],
                yes_label: "Found it".to_string(),
                no_label: "Intact".to_string(),
                resolution: "Replace radiator".to_string(),
            }],
            sources: ReferenceSources::default(),
        }
    }

    #[test]
    fn test_step_lookup() {
        let catalog = catalog();
        assert_eq!(catalog.step("b").map(|s| s.label.as_str()), Some("b label"));
        assert!(catalog.step("missing").is_none());
        assert_eq!(
            catalog.require_step("missing"),
            Err(CoreError::UnknownStep("missing".to_string()))
        );
    }

    #[test]
    fn test_deep_partition() {
        let catalog = catalog();
        let basic: Vec<_> = catalog.non_deep_steps().map(|s| s.id.as_str()).collect();
        let deep: Vec<_> = catalog.deep_steps().map(|s| s.id.as_str()).collect();
        assert_eq!(basic, vec!["a", "b"]);
        assert_eq!(deep, vec!["deep"]);
    }

    #[test]
    fn test_trigger_case_insensitive() {
        let catalog = catalog();
        assert!(catalog.redirects[0].matches("The RADIATOR has a Crack"));
        assert!(!catalog.redirects[0].matches("radiator looks fine"));
    }

    #[test]
    fn test_invalid_trigger() {
        assert!(matches!(
            TriggerPattern::new("radiator.*(crack"),
            Err(CoreError::InvalidPattern { .. })
        ));
    }

    #[test]
    fn test_entry_trait() {
        let catalog = catalog();
        let entry: &dyn DiagnosticEntry = catalog.redirect("crack").unwrap();
        assert_eq!(entry.resolution(), "Replace radiator");
        assert_eq!(entry.component(), None);
    }

    #[test]
    fn test_catalog_yaml() {
        let yaml = serde_yaml::to_string(&catalog()).unwrap();
        let parsed: ContentCatalog = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed, catalog());
        assert!(yaml.contains("radiator.*crack"));
    }
}
