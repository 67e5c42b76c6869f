//! Core error types

use thiserror::Error;

use crate::phase::Phase;

/// Errors raised by core catalog and phase lookups
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("Unknown diagnostic step: {0}")]
    UnknownStep(String),

    #[error("Unknown redirect: {0}")]
    UnknownRedirect(String),

    #[error("Invalid phase transition from {from} to {to}")]
    InvalidTransition { from: Phase, to: Phase },

    #[error("Invalid trigger pattern for {id}: {message}")]
    InvalidPattern { id: String, message: String },
}

pub type Result<T> = std::result::Result<T, CoreError>;
