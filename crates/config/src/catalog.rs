//! Content catalog loading
//!
//! The catalog is authored as YAML and validated once before any session
//! starts. A catalog that fails validation is rejected as a whole.

use std::collections::HashSet;
use std::path::Path;

use diag_assist_core::{ContentCatalog, NONE_SELECTION};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Catalog file not found: {0}: {1}")]
    FileNotFound(String, String),

    #[error("Failed to parse catalog: {0}")]
    ParseError(String),

    #[error("Catalog defines no diagnostic steps")]
    NoSteps,

    #[error("Duplicate catalog id: {0}")]
    DuplicateId(String),

    #[error("Triage check '{0}' does not name a diagnostic step")]
    UnknownTriageCheck(String),

    #[error("Triage check '{0}' names a deep step")]
    DeepTriageCheck(String),

    #[error("Redirect '{0}' has no triggers")]
    NoTriggers(String),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },
}

/// Load and validate a catalog from a YAML file
pub fn load_catalog<P: AsRef<Path>>(path: P) -> Result<ContentCatalog, CatalogError> {
    let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
        CatalogError::FileNotFound(path.as_ref().display().to_string(), e.to_string())
    })?;

    let catalog = parse_catalog(&content)?;
    tracing::info!(
        path = %path.as_ref().display(),
        steps = catalog.steps.len(),
        redirects = catalog.redirects.len(),
        "Loaded content catalog"
    );
    Ok(catalog)
}

/// Parse and validate a catalog from YAML text
pub fn parse_catalog(yaml: &str) -> Result<ContentCatalog, CatalogError> {
    let catalog: ContentCatalog =
        serde_yaml::from_str(yaml).map_err(|e| CatalogError::ParseError(e.to_string()))?;
    validate_catalog(&catalog)?;
    Ok(catalog)
}

/// Check structural invariants the orchestrator relies on
pub fn validate_catalog(catalog: &ContentCatalog) -> Result<(), CatalogError> {
    if catalog.steps.is_empty() {
        return Err(CatalogError::NoSteps);
    }

    // Step and redirect ids share one namespace
    let mut ids = HashSet::new();
    for id in catalog
        .steps
        .iter()
        .map(|s| s.id.as_str())
        .chain(catalog.redirects.iter().map(|r| r.id.as_str()))
    {
        if id == NONE_SELECTION {
            return Err(CatalogError::InvalidValue {
                field: "id".to_string(),
                message: format!("'{}' is reserved for the empty triage selection", id),
            });
        }
        if !ids.insert(id) {
            return Err(CatalogError::DuplicateId(id.to_string()));
        }
    }

    let mut check_ids = HashSet::new();
    for check in &catalog.triage.checks {
        if !check_ids.insert(check.id.as_str()) {
            return Err(CatalogError::DuplicateId(check.id.clone()));
        }
        match catalog.step(&check.id) {
            None => return Err(CatalogError::UnknownTriageCheck(check.id.clone())),
            Some(step) if step.deep => {
                return Err(CatalogError::DeepTriageCheck(check.id.clone()))
            }
            Some(_) => {}
        }
    }

    for step in catalog.non_deep_steps() {
        if !check_ids.contains(step.id.as_str()) {
            tracing::warn!(
                step_id = %step.id,
                "Basic step is not offered in triage and can never be ruled out up front"
            );
        }
    }

    for redirect in &catalog.redirects {
        if redirect.triggers.is_empty() {
            return Err(CatalogError::NoTriggers(redirect.id.clone()));
        }
    }

    if catalog.escalation.expert.name.trim().is_empty() {
        return Err(CatalogError::InvalidValue {
            field: "escalation.expert.name".to_string(),
            message: "Expert name is required".to_string(),
        });
    }

    Ok(())
}
