//! One end-to-end rewrite: preconditions, operand capture, result handling
//!
//! [`ActionController::begin`] runs synchronously inside the event loop and
//! either aborts (with a notice for validation failures) or marks the action
//! in flight and hands back the request to send. The reply comes back as an
//! event and goes through [`ActionController::finish`]. Only one action is
//! ever in flight.

use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::constants::{notices, remote, timing};
use crate::control::ControlMounter;
use crate::dom::Dom;
use crate::error::{RemoteCallError, ValidationError};
use crate::overlay::{Overlay, VisualState};
use crate::rewrite::{RewriteRequest, RewriteResponse};
use crate::settings::EffectiveSettings;
use crate::text_access::{self, Operand};
use crate::timers::{TimerKind, Timers};

/// Built fresh for every activation, never persisted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionRequest {
    pub source_text: String,
    pub prompt: String,
    pub api_key: String,
}

impl ActionRequest {
    pub fn into_rewrite(self, model_id: &str, origin: Option<String>) -> RewriteRequest {
        RewriteRequest {
            system_prompt: self.prompt,
            user_text: self.source_text,
            model_id: model_id.to_string(),
            api_key: self.api_key,
            origin,
        }
    }
}

/// Site/global key first, then the build-time fallback
pub fn resolve_api_key(
    settings: &EffectiveSettings,
    fallback: Option<&str>,
) -> Result<String, ValidationError> {
    let key = settings.api_key.trim();
    if !key.is_empty() {
        return Ok(key.to_string());
    }
    fallback
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(str::to_string)
        .ok_or(ValidationError::MissingApiKey)
}

#[derive(Debug)]
pub struct ActionController {
    in_flight: Option<Operand>,
    fallback_api_key: Option<String>,
}

impl Default for ActionController {
    fn default() -> Self {
        Self::new(remote::FALLBACK_API_KEY.map(str::to_string))
    }
}

impl ActionController {
    pub fn new(fallback_api_key: Option<String>) -> Self {
        Self {
            in_flight: None,
            fallback_api_key,
        }
    }

    pub fn in_flight(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Check preconditions and capture the operand. Returns the request to
    /// send, or `None` if the action was aborted.
    pub fn begin<D: Dom, M: ControlMounter<D>>(
        &mut self,
        dom: &mut D,
        overlay: &mut Overlay<D, M>,
        settings: &EffectiveSettings,
    ) -> Option<ActionRequest> {
        let Some(config) = overlay.config().cloned() else {
            debug!("Activation without an active surface, ignoring");
            return None;
        };
        if !dom.is_connected(config.anchor) {
            debug!(anchor = config.anchor.0, "Activation on a detached anchor, ignoring");
            return None;
        }
        if self.in_flight() {
            debug!("Rewrite already in flight, ignoring activation");
            return None;
        }

        let validated = resolve_api_key(settings, self.fallback_api_key.as_deref()).and_then(
            |api_key| text_access::read_operand(dom, &config).map(|operand| (api_key, operand)),
        );
        let (api_key, operand) = match validated {
            Ok(pair) => pair,
            Err(e) => {
                info!(reason = %e, "Rewrite aborted");
                dom.alert(e.notice());
                return None;
            }
        };

        let request = ActionRequest {
            source_text: operand.text.clone(),
            prompt: settings.reword_prompt.clone(),
            api_key,
        };
        info!(
            anchor = config.anchor.0,
            variant = ?config.variant,
            chars = operand.text.chars().count(),
            "Starting rewrite"
        );
        self.in_flight = Some(operand);
        overlay.set_visual(dom, VisualState::Processing);
        Some(request)
    }

    /// Apply the remote outcome, release the in-flight slot, and schedule the
    /// visual reset
    pub fn finish<D: Dom, M: ControlMounter<D>>(
        &mut self,
        dom: &mut D,
        overlay: &mut Overlay<D, M>,
        timers: &mut Timers,
        result: Result<RewriteResponse, RemoteCallError>,
    ) {
        let Some(operand) = self.in_flight.take() else {
            warn!("Rewrite result arrived with nothing in flight");
            return;
        };

        let outcome = result.and_then(|response| {
            if response.text.trim().is_empty() {
                Err(RemoteCallError::EmptyResponse)
            } else {
                Ok(response.text)
            }
        });

        let state = match outcome {
            Ok(text) if dom.is_connected(operand.anchor) => {
                match text_access::write_back(dom, &operand, &text) {
                    Ok(()) => {
                        info!(anchor = operand.anchor.0, "Rewrite applied");
                        VisualState::Success
                    }
                    Err(e) => {
                        warn!(anchor = operand.anchor.0, reason = %e, "Rewrite not applied");
                        dom.alert(e.notice());
                        VisualState::Error
                    }
                }
            }
            Ok(_) => {
                warn!(anchor = operand.anchor.0, "Anchor detached before rewrite arrived, dropping result");
                VisualState::Error
            }
            Err(e) => {
                error!(error = %e, "Error rephrasing text");
                dom.alert(notices::REMOTE_FAILURE);
                VisualState::Error
            }
        };
        overlay.set_visual_for(dom, operand.anchor, state);
        timers.schedule(
            TimerKind::VisualReset,
            Duration::from_millis(timing::VISUAL_RESET_DELAY_MS),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::FloatingButton;
    use crate::dom::MemoryDom;
    use crate::settings::GlobalSettings;
    use crate::surface::classify;
    use tokio::sync::mpsc;

    struct Fixture {
        dom: MemoryDom,
        overlay: Overlay<MemoryDom, FloatingButton>,
        timers: Timers,
        _rx: mpsc::UnboundedReceiver<crate::content_script::PageEvent>,
    }

    fn fixture(value: &str) -> Fixture {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut dom = MemoryDom::default();
        let mut timers = Timers::new(tx);
        let mut overlay = Overlay::new(FloatingButton);
        let node = dom.append(dom.body(), "textarea");
        dom.set_value(node, value);
        dom.set_selection_range(node, 0, 0);
        let config = classify(&dom, node).unwrap();
        overlay.show(&mut dom, &mut timers, config, &GlobalSettings::default());
        Fixture { dom, overlay, timers, _rx: rx }
    }

    fn keyed() -> GlobalSettings {
        GlobalSettings {
            api_key: "sk-test".to_string(),
            ..GlobalSettings::default()
        }
    }

    #[test]
    fn test_resolve_api_key_prefers_settings() {
        assert_eq!(resolve_api_key(&keyed(), Some("sk-env")).unwrap(), "sk-test");
        assert_eq!(
            resolve_api_key(&GlobalSettings::default(), Some("sk-env")).unwrap(),
            "sk-env"
        );
        assert_eq!(
            resolve_api_key(&GlobalSettings::default(), Some("  ")),
            Err(ValidationError::MissingApiKey)
        );
        assert_eq!(
            resolve_api_key(&GlobalSettings::default(), None),
            Err(ValidationError::MissingApiKey)
        );
    }

    #[test]
    fn test_action_request_maps_to_rewrite_request() {
        let request = ActionRequest {
            source_text: "text".to_string(),
            prompt: "prompt".to_string(),
            api_key: "key".to_string(),
        }
        .into_rewrite("model-x", Some("https://a.example".to_string()));
        assert_eq!(request.system_prompt, "prompt");
        assert_eq!(request.user_text, "text");
        assert_eq!(request.model_id, "model-x");
        assert_eq!(request.origin.as_deref(), Some("https://a.example"));
    }

    #[tokio::test]
    async fn test_missing_key_alerts_without_state_change() {
        let mut f = fixture("hello");
        let mut controller = ActionController::new(None);

        let request = controller.begin(&mut f.dom, &mut f.overlay, &GlobalSettings::default());
        assert!(request.is_none());
        assert!(!controller.in_flight());
        assert_eq!(f.overlay.visual_state(), Some(VisualState::Default));
        assert_eq!(f.dom.alerts(), &[notices::MISSING_API_KEY.to_string()]);
    }

    #[tokio::test]
    async fn test_empty_operand_alerts_without_state_change() {
        let mut f = fixture("   ");
        let mut controller = ActionController::new(None);

        assert!(controller.begin(&mut f.dom, &mut f.overlay, &keyed()).is_none());
        assert!(!controller.in_flight());
        assert_eq!(f.overlay.visual_state(), Some(VisualState::Default));
        assert_eq!(f.dom.alerts(), &[notices::EMPTY_OPERAND.to_string()]);
    }

    #[tokio::test]
    async fn test_begin_marks_in_flight_and_blocks_second_activation() {
        let mut f = fixture("hello");
        let mut controller = ActionController::new(None);

        let request = controller.begin(&mut f.dom, &mut f.overlay, &keyed()).unwrap();
        assert_eq!(request.source_text, "hello");
        assert_eq!(request.api_key, "sk-test");
        assert!(controller.in_flight());
        assert_eq!(f.overlay.visual_state(), Some(VisualState::Processing));

        assert!(controller.begin(&mut f.dom, &mut f.overlay, &keyed()).is_none());
        assert_eq!(f.overlay.visual_state(), Some(VisualState::Processing));
        assert!(f.dom.alerts().is_empty());
    }

    #[tokio::test]
    async fn test_finish_success_writes_and_schedules_reset() {
        let mut f = fixture("hello");
        let mut controller = ActionController::new(None);
        controller.begin(&mut f.dom, &mut f.overlay, &keyed()).unwrap();

        controller.finish(
            &mut f.dom,
            &mut f.overlay,
            &mut f.timers,
            Ok(RewriteResponse { text: "Hello.".to_string() }),
        );
        let anchor = f.overlay.anchor().unwrap();
        assert_eq!(f.dom.value(anchor), "Hello.");
        assert_eq!(f.overlay.visual_state(), Some(VisualState::Success));
        assert!(!controller.in_flight());
        assert!(f.timers.is_pending(TimerKind::VisualReset));
    }

    #[tokio::test]
    async fn test_finish_failure_sets_error_and_alerts() {
        let mut f = fixture("hello");
        let mut controller = ActionController::new(None);
        controller.begin(&mut f.dom, &mut f.overlay, &keyed()).unwrap();

        controller.finish(
            &mut f.dom,
            &mut f.overlay,
            &mut f.timers,
            Err(RemoteCallError::Network("connection reset".to_string())),
        );
        let anchor = f.overlay.anchor().unwrap();
        assert_eq!(f.dom.value(anchor), "hello");
        assert_eq!(f.overlay.visual_state(), Some(VisualState::Error));
        assert_eq!(f.dom.alerts(), &[notices::REMOTE_FAILURE.to_string()]);
        assert!(!controller.in_flight());
        assert!(f.timers.is_pending(TimerKind::VisualReset));
    }

    #[tokio::test]
    async fn test_finish_refuses_fragment_edited_meanwhile() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut timers = Timers::new(tx);
        let mut dom = MemoryDom::default();
        let mut overlay = Overlay::new(FloatingButton);
        let editor = dom.append(dom.body(), "div");
        dom.set_attribute(editor, "contenteditable", "true");
        dom.set_text(editor, "please fix teh typo");
        dom.select_text(editor, 7, 19);
        let config = classify(&dom, editor).unwrap();
        overlay.show(&mut dom, &mut timers, config, &GlobalSettings::default());

        let mut controller = ActionController::new(None);
        controller.begin(&mut dom, &mut overlay, &keyed()).unwrap();
        dom.set_text(editor, "rewritten by hand");

        controller.finish(
            &mut dom,
            &mut overlay,
            &mut timers,
            Ok(RewriteResponse { text: "fix the typo".to_string() }),
        );
        assert_eq!(dom.text_content(editor), "rewritten by hand");
        assert_eq!(overlay.visual_state(), Some(VisualState::Error));
        assert_eq!(dom.alerts(), &[notices::FRAGMENT_CHANGED.to_string()]);
        assert!(!controller.in_flight());
    }

    #[tokio::test]
    async fn test_finish_blank_reply_is_error() {
        let mut f = fixture("hello");
        let mut controller = ActionController::new(None);
        controller.begin(&mut f.dom, &mut f.overlay, &keyed()).unwrap();

        controller.finish(
            &mut f.dom,
            &mut f.overlay,
            &mut f.timers,
            Ok(RewriteResponse { text: " \n".to_string() }),
        );
        assert_eq!(f.overlay.visual_state(), Some(VisualState::Error));
        assert_eq!(f.dom.value(f.overlay.anchor().unwrap()), "hello");
    }
}
