//! Sentence assembly for operator utterances and assistant transitions

/// Outcome text recorded when the session ends through a specialist request
pub const ESCALATED_OUTCOME: &str = "Escalated to specialist";

/// Separator between attempted step labels in the session summary
pub const TRAIL_SEPARATOR: &str = " → ";

/// Join items as "X", "X and Y" or "X, Y, and Z"
pub fn join_list<S: AsRef<str>>(items: &[S]) -> String {
    match items {
        [] => String::new(),
        [only] => only.as_ref().to_string(),
        [first, second] => format!("{} and {}", first.as_ref(), second.as_ref()),
        [rest @ .., last] => {
            let head: Vec<&str> = rest.iter().map(|s| s.as_ref()).collect();
            format!("{}, and {}", head.join(", "), last.as_ref())
        }
    }
}

/// What the operator "says" when submitting the triage checklist.
///
/// `summaries` are the selected checks' summaries in catalog order.
pub fn triage_utterance<S: AsRef<str>>(
    summaries: &[S],
    total_checks: usize,
    unresolved_note: &str,
) -> String {
    if summaries.is_empty() {
        "Haven't tried any of these yet.".to_string()
    } else if summaries.len() == total_checks {
        "Already checked all of these. Nothing resolved it.".to_string()
    } else {
        format!("Already tried {}. {}", join_list(summaries), unresolved_note)
            .trim_end()
            .to_string()
    }
}

/// Opening analysis when entering the guided flow.
///
/// `ruled_out` are lower-cased labels of the steps excluded by triage.
pub fn acknowledgment<S: AsRef<str>>(ruled_out: &[S], opening_analysis: &str) -> String {
    let lead = match ruled_out {
        [] => "Let's start with the most common cause. ".to_string(),
        [only] => format!("Good, you've already checked {}. ", only.as_ref()),
        many => format!("Good, you've already ruled out {}. ", join_list(many)),
    };
    format!("{}{}", lead, opening_analysis)
}

/// Transition back to the main flow after a redirect is ruled out
pub fn rule_out_transition(step_label: &str) -> String {
    format!(
        "Good — we can rule that out. Let's continue where we left off with {}.",
        step_label.to_lowercase()
    )
}

/// Confirmation after the operator requests the specialist
pub fn escalation_confirmation(expert_name: &str) -> String {
    format!(
        "I've sent a request to {}. They'll reach out within the hour. In the meantime, I've saved all diagnostic info to this work order.",
        expert_name
    )
}

/// Attempted labels joined for the session summary
pub fn summary_trail<S: AsRef<str>>(labels: &[S]) -> String {
    labels
        .iter()
        .map(|l| l.as_ref())
        .collect::<Vec<_>>()
        .join(TRAIL_SEPARATOR)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_list() {
        let empty: [&str; 0] = [];
        assert_eq!(join_list(&empty), "");
        assert_eq!(join_list(&["coolant"]), "coolant");
        assert_eq!(join_list(&["coolant", "oil"]), "coolant and oil");
        assert_eq!(join_list(&["coolant", "oil", "screen"]), "coolant, oil, and screen");
    }

    #[test]
    fn test_triage_utterance() {
        let none: [&str; 0] = [];
        assert_eq!(
            triage_utterance(&none, 3, "Still overheating."),
            "Haven't tried any of these yet."
        );
        assert_eq!(
            triage_utterance(&["a", "b", "c"], 3, "Still overheating."),
            "Already checked all of these. Nothing resolved it."
        );
        assert_eq!(
            triage_utterance(&["coolant level"], 3, "Still overheating."),
            "Already tried coolant level. Still overheating."
        );
        assert_eq!(
            triage_utterance(&["coolant level", "the engine oil"], 3, ""),
            "Already tried coolant level and the engine oil."
        );
    }

    #[test]
    fn test_acknowledgment() {
        let none: [&str; 0] = [];
        assert_eq!(
            acknowledgment(&none, "Low coolant is common."),
            "Let's start with the most common cause. Low coolant is common."
        );
        assert_eq!(
            acknowledgment(&["engine oil level"], "Check the screen."),
            "Good, you've already checked engine oil level. Check the screen."
        );
        assert_eq!(
            acknowledgment(&["a", "b"], "Next."),
            "Good, you've already ruled out a and b. Next."
        );
    }

    #[test]
    fn test_transitions() {
        assert_eq!(
            rule_out_transition("Coolant level & hoses"),
            "Good — we can rule that out. Let's continue where we left off with coolant level & hoses."
        );
        assert!(escalation_confirmation("Jake Torres").starts_with("I've sent a request to Jake Torres."));
        assert_eq!(summary_trail(&["A", "B"]), "A → B");
        assert_eq!(summary_trail(&["A"]), "A");
    }
}
