//! Redirect Handler
//!
//! Splices an ad-hoc diagnosis into the guided flow when the operator's free
//! text matches a redirect trigger. The step cursor is left alone; a negative
//! answer returns to the step, a positive one resolves the session.

use diag_assist_core::{ContentCatalog, CoreError, Phase, RedirectDefinition};
use diag_assist_text_processing::{route, Classification};

use crate::state::SessionState;

pub struct RedirectHandler<'a> {
    catalog: &'a ContentCatalog,
}

impl<'a> RedirectHandler<'a> {
    pub fn new(catalog: &'a ContentCatalog) -> Self {
        Self { catalog }
    }

    /// Redirects are only eligible in the guided phase with none active
    pub fn accepts_redirect(&self, state: &SessionState) -> bool {
        state.phase == Phase::Guided && state.active_redirect.is_none()
    }

    /// Route free text to a redirect or a conversational intent
    pub fn classify(&self, state: &SessionState, text: &str) -> Classification {
        route(text, &self.catalog.redirects, self.accepts_redirect(state))
    }

    /// Make the redirect the entry on screen
    pub fn activate(
        &self,
        state: &mut SessionState,
        redirect_id: &str,
    ) -> Result<&'a RedirectDefinition, CoreError> {
        let redirect = self.catalog.require_redirect(redirect_id)?;
        tracing::info!(
            redirect_id = %redirect.id,
            step_id = ?state.current_step_id(),
            "Redirect activated"
        );
        state.active_redirect = Some(redirect.id.clone());
        Ok(redirect)
    }

    /// Clear the active redirect, returning the one dismissed
    pub fn dismiss(&self, state: &mut SessionState) -> Option<&'a RedirectDefinition> {
        let id = state.active_redirect.take()?;
        tracing::debug!(redirect_id = %id, "Redirect ruled out");
        self.catalog.redirect(&id)
    }

    /// The redirect currently overriding the step, if any
    pub fn active(&self, state: &SessionState) -> Option<&'a RedirectDefinition> {
        state
            .active_redirect
            .as_deref()
            .and_then(|id| self.catalog.redirect(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use diag_assist_config::parse_catalog;
    use diag_assist_text_processing::IntentCategory;

    fn catalog() -> ContentCatalog {
        let path = concat!(
            env!("CARGO_MANIFEST_DIR"),
            "/../../config/catalogs/rtv_xg850_overheating.yaml"
        );
        parse_catalog(&std::fs::read_to_string(path).unwrap()).unwrap()
    }

    fn guided_state() -> SessionState {
        SessionState {
            phase: Phase::Guided,
            remaining_step_order: vec!["coolantLevel".to_string(), "oilLevel".to_string()],
            ..SessionState::default()
        }
    }

    #[test]
    fn test_classify_redirect_in_guided() {
        let catalog = catalog();
        let handler = RedirectHandler::new(&catalog);
        let state = guided_state();
        assert_eq!(
            handler.classify(&state, "there's a crack in the radiator"),
            Classification::Redirect("radiatorDamage".to_string())
        );
        assert_eq!(
            handler.classify(&state, "I think the thermostat is stuck"),
            Classification::Redirect("thermostatStuck".to_string())
        );
        assert_eq!(
            handler.classify(&state, "the oil looks milky"),
            Classification::Redirect("headGasketLeak".to_string())
        );
    }

    #[test]
    fn test_no_redirect_outside_guided() {
        let catalog = catalog();
        let handler = RedirectHandler::new(&catalog);
        let mut state = guided_state();
        state.phase = Phase::Triage;
        assert_eq!(
            handler.classify(&state, "there's a crack in the radiator"),
            Classification::Intent(IntentCategory::GenericObservation)
        );
    }

    #[test]
    fn test_no_nested_redirects() {
        let catalog = catalog();
        let handler = RedirectHandler::new(&catalog);
        let mut state = guided_state();
        handler.activate(&mut state, "thermostatStuck").unwrap();
        assert!(matches!(
            handler.classify(&state, "there's a crack in the radiator"),
            Classification::Intent(_)
        ));
    }

    #[test]
    fn test_activate_and_dismiss_leave_cursor() {
        let catalog = catalog();
        let handler = RedirectHandler::new(&catalog);
        let mut state = guided_state();
        state.cursor = 1;

        let redirect = handler.activate(&mut state, "waterPumpFailure").unwrap();
        assert_eq!(redirect.label, "Water pump failure");
        assert_eq!(handler.active(&state).map(|r| r.id.as_str()), Some("waterPumpFailure"));

        let dismissed = handler.dismiss(&mut state).unwrap();
        assert_eq!(dismissed.id, "waterPumpFailure");
        assert!(state.active_redirect.is_none());
        assert_eq!(state.cursor, 1);
        assert!(handler.dismiss(&mut state).is_none());
    }

    #[test]
    fn test_activate_unknown() {
        let catalog = catalog();
        let handler = RedirectHandler::new(&catalog);
        let mut state = guided_state();
        assert_eq!(
            handler.activate(&mut state, "nope").unwrap_err(),
            CoreError::UnknownRedirect("nope".to_string())
        );
        assert!(state.active_redirect.is_none());
    }
}
