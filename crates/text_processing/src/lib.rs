//! Text processing for the diagnostic assistant
//!
//! This crate turns operator free text into routing decisions and assembles
//! the assistant's conversational prose:
//! - **Intent classification**: fixed-priority pattern rules and redirect routing
//! - **Replies**: templated answers tied to the step currently shown
//! - **Phrasing**: list joining, triage utterances, acknowledgments, transitions
//!
//! # Example
//!
//! ```
//! use diag_assist_text_processing::{classify, compose_reply, IntentCategory};
//!
//! let category = classify("How do I check the coolant?");
//! assert_eq!(category, IntentCategory::HowToQuestion);
//! let reply = compose_reply(category, None);
//! assert!(!reply.is_empty());
//! ```

pub mod intent;
pub mod phrasing;
pub mod reply;

pub use intent::{classify, route, Classification, IntentCategory};
pub use phrasing::{
    acknowledgment, escalation_confirmation, join_list, rule_out_transition, summary_trail,
    triage_utterance, ESCALATED_OUTCOME, TRAIL_SEPARATOR,
};
pub use reply::{compose_reply, page_reference};
