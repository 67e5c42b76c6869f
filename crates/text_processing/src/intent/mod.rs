//! Intent Classification
//!
//! Maps a free-text operator utterance to exactly one conversational
//! category. Rules are evaluated in a fixed priority order and the first
//! match wins, so "where is the oil dipstick" is a how-to question, not an
//! oil mention.
//!
//! # Example
//!
//! ```
//! use diag_assist_text_processing::intent::{classify, IntentCategory};
//!
//! assert_eq!(classify("There's a puddle under the cart"), IntentCategory::ObservationLeak);
//! assert_eq!(classify("ok"), IntentCategory::StepConfirmation);
//! ```

use diag_assist_core::{Component, RedirectDefinition};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Conversational category of an utterance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IntentCategory {
    ObservationLeak,
    ObservationNoise,
    /// Smell, smoke, steam or heat
    ObservationThermal,
    GenericObservation,
    HowToQuestion,
    SkipRequest,
    StepConfirmation,
    MentionsFan,
    MentionsHose,
    MentionsCoolant,
    MentionsOil,
    Default,
}

impl IntentCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            IntentCategory::ObservationLeak => "observation-leak",
            IntentCategory::ObservationNoise => "observation-noise",
            IntentCategory::ObservationThermal => "observation-thermal",
            IntentCategory::GenericObservation => "generic-observation",
            IntentCategory::HowToQuestion => "how-to-question",
            IntentCategory::SkipRequest => "skip-request",
            IntentCategory::StepConfirmation => "step-confirmation",
            IntentCategory::MentionsFan => "mentions-fan",
            IntentCategory::MentionsHose => "mentions-hose",
            IntentCategory::MentionsCoolant => "mentions-coolant",
            IntentCategory::MentionsOil => "mentions-oil",
            IntentCategory::Default => "default",
        }
    }

    /// Component named by a component-mention category
    pub fn component(&self) -> Option<Component> {
        match self {
            IntentCategory::MentionsFan => Some(Component::Fan),
            IntentCategory::MentionsHose => Some(Component::Hose),
            IntentCategory::MentionsCoolant => Some(Component::Coolant),
            IntentCategory::MentionsOil => Some(Component::Oil),
            _ => None,
        }
    }
}

impl std::fmt::Display for IntentCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// Ordered rules. Matching runs against the lower-cased, trimmed utterance.
static INTENT_RULES: Lazy<Vec<(Regex, IntentCategory)>> = Lazy::new(|| {
    vec![
        (
            Regex::new(r"leak|drip|puddle|seep|wet|spray|residue|stain").unwrap(),
            IntentCategory::ObservationLeak,
        ),
        (
            Regex::new(r"noise|sound|knock|rattle|squeal|grind|whine|hum|vibrat").unwrap(),
            IntentCategory::ObservationNoise,
        ),
        (
            Regex::new(r"smell|smoke|steam|fume|burning|hot").unwrap(),
            IntentCategory::ObservationThermal,
        ),
        (
            Regex::new(r"notice|found|see|looks like|there's|there’s|spotted|i see").unwrap(),
            IntentCategory::GenericObservation,
        ),
        (
            Regex::new(r"where (is|are|do)|how (do|can|should)|what tool|which").unwrap(),
            IntentCategory::HowToQuestion,
        ),
        (
            Regex::new(r"skip|next|move on|something else|different|not (the|this)|wrong track")
                .unwrap(),
            IntentCategory::SkipRequest,
        ),
        (
            Regex::new(
                r"^(done|ok|okay|got it|checked|finished|yep|yes|affirmative|completed)\.?$|i('ve|’ve| have) (done|checked|finished|completed)",
            )
            .unwrap(),
            IntentCategory::StepConfirmation,
        ),
        (Regex::new(r"fan|fuse|electric").unwrap(), IntentCategory::MentionsFan),
        (Regex::new(r"hose|clamp|band").unwrap(), IntentCategory::MentionsHose),
        (
            Regex::new(r"coolant|antifreeze|reservoir|tank").unwrap(),
            IntentCategory::MentionsCoolant,
        ),
        (Regex::new(r"oil|dipstick").unwrap(), IntentCategory::MentionsOil),
    ]
});

/// Classify an utterance. Empty input classifies as `Default`.
pub fn classify(text: &str) -> IntentCategory {
    let lower = text.trim().to_lowercase();
    if lower.is_empty() {
        return IntentCategory::Default;
    }

    INTENT_RULES
        .iter()
        .find(|(pattern, _)| pattern.is_match(&lower))
        .map(|(_, category)| *category)
        .unwrap_or(IntentCategory::Default)
}

/// Routing decision for a free-text submission
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Classification {
    /// Splice in the redirect with this id
    Redirect(String),
    /// Answer conversationally
    Intent(IntentCategory),
}

/// Route an utterance: redirects first (when allowed), then intent rules.
///
/// Redirects are tested in declaration order; the first match wins even when
/// a later redirect would also match.
pub fn route(text: &str, redirects: &[RedirectDefinition], allow_redirect: bool) -> Classification {
    if allow_redirect {
        let mut matching = redirects.iter().filter(|r| r.matches(text));
        if let Some(first) = matching.next() {
            let shadowed: Vec<&str> = matching.map(|r| r.id.as_str()).collect();
            if !shadowed.is_empty() {
                tracing::debug!(
                    redirect_id = %first.id,
                    shadowed = ?shadowed,
                    "Multiple redirects matched, using first declared"
                );
            }
            return Classification::Redirect(first.id.clone());
        }
    }
    Classification::Intent(classify(text))
}
