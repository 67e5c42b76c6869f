//! Conversational replies
//!
//! Templated answers for free text that did not trigger a redirect. Replies
//! mention the entry currently on screen so the operator is steered back to
//! the open yes/no prompt.

use diag_assist_core::{Component, DiagnosticEntry};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::intent::IntentCategory;

const NO_CURRENT_STEP: &str = "the current step";

static PAGE_REFERENCE: Lazy<Regex> = Lazy::new(|| Regex::new(r"p\.\s*[\d–\-]+").unwrap());

/// Extract a page reference such as "p. 60" or "p. 75–76"
pub fn page_reference(source: &str) -> Option<&str> {
    PAGE_REFERENCE.find(source).map(|m| m.as_str())
}

/// Build the reply for a classified utterance.
///
/// `current` is the step or redirect currently shown, if any.
pub fn compose_reply(category: IntentCategory, current: Option<&dyn DiagnosticEntry>) -> String {
    let label = current
        .map(|e| e.label().to_lowercase())
        .unwrap_or_else(|| NO_CURRENT_STEP.to_string());
    let on_component =
        |component: Component| current.and_then(|e| e.component()) == Some(component);

    match category {
        IntentCategory::ObservationLeak => format!(
            "That's a useful observation — a leak would definitely contribute to overheating. Make a note of where you're seeing it. For now let's finish checking {} since it'll help narrow down whether the leak is the primary cause or a secondary symptom.",
            label
        ),
        IntentCategory::ObservationNoise => {
            let middle = if current.is_some() {
                format!(
                    "While you're working on {}, pay attention to whether the noise changes",
                    label
                )
            } else {
                "Note when it happens".to_string()
            };
            format!(
                "Unusual sounds can be a big clue. {} — that'll help us correlate it. Let's keep going with the current check.",
                middle
            )
        }
        IntentCategory::ObservationThermal => format!(
            "Good catch — that could indicate a coolant or oil leak hitting a hot surface. If you're seeing active steam or smoke, let the engine cool fully before continuing. Otherwise, let's proceed with {} — it may reveal the source.",
            label
        ),
        IntentCategory::GenericObservation => format!(
            "Noted — I'll factor that in. Let's continue with {} and see if it connects.",
            label
        ),
        IntentCategory::HowToQuestion => match current.and_then(|e| e.sources().first()) {
            Some(source) => {
                let pointer = match page_reference(source) {
                    Some(page) => format!("check {}", page),
                    None => "see the reference listed on the action card".to_string(),
                };
                format!(
                    "Good question. The operator's manual covers this — {}. The procedure on the card above should walk you through it step by step.",
                    pointer
                )
            }
            None => "The action card above has the procedure. If you need the exact page reference, check the sources linked at the bottom of the card.".to_string(),
        },
        IntentCategory::SkipRequest => format!(
            "Understood. If you're confident {} isn't the issue, select the \"still overheating\" option below and I'll move to the next diagnostic step.",
            label
        ),
        IntentCategory::StepConfirmation => "Great — did that resolve the overheating? Use the options below to let me know and I'll either close this out or move to the next check.".to_string(),
        IntentCategory::MentionsFan => {
            if on_component(Component::Fan) {
                "The cooling fan is on our diagnostic list. That's exactly what we're looking at now — follow the steps on the card above.".to_string()
            } else if current.is_some() {
                format!(
                    "The cooling fan is on our diagnostic list. Let's finish {} first — if that doesn't resolve it, we'll check the fan and its fuse next.",
                    label
                )
            } else {
                "The cooling fan is on our diagnostic list.".to_string()
            }
        }
        IntentCategory::MentionsHose => {
            if on_component(Component::Hose) {
                "Hose and clamp inspection is part of the diagnostic path. That's the current step — check all three connection points shown in the manual.".to_string()
            } else if current.is_some() {
                format!(
                    "Hose and clamp inspection is part of the diagnostic path. We'll get to that — let's finish {} first to rule it out systematically.",
                    label
                )
            } else {
                "Hose and clamp inspection is part of the diagnostic path.".to_string()
            }
        }
        IntentCategory::MentionsCoolant => {
            if on_component(Component::Coolant) {
                "Right — that's what we're checking now. The recovery tank should read between FULL and LOW when cool.".to_string()
            } else {
                format!(
                    "Coolant is definitely relevant here. Let's finish {} first, then we can circle back if needed.",
                    label
                )
            }
        }
        IntentCategory::MentionsOil => {
            if on_component(Component::Oil) {
                "Exactly — pull the dipstick on a level surface with the engine off. Oil level should be within the marked range.".to_string()
            } else {
                format!("Oil level is on the list. Let's work through {} first.", label)
            }
        }
        IntentCategory::Default => {
            if current.is_some() {
                format!(
                    "Noted. Let's keep working through {} — once you've completed the check, use the options below to tell me the result.",
                    label
                )
            } else {
                "Noted. Let me know how I can help.".to_string()
            }
        }
    }
}
