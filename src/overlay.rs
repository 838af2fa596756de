//! The single floating overlay
//!
//! `Hidden --show--> Shown(Default)`, `Shown(*) --hide--> Hidden`. While shown
//! the visual sub-state moves `Default -> Processing -> Success|Error ->
//! Default`, driven only by the action controller.
//!
//! Showing always hides first, so at most one container and one set of
//! anchor observers exist at a time. Hiding releases everything in a fixed
//! order: observers, timers, control, container, references.

use std::marker::PhantomData;
use tracing::{debug, info};

use crate::constants::overlay;
use crate::control::{ControlHandle, ControlMounter, ControlProps, PropsPatch};
use crate::dom::{Dom, NodeId, ObserverId, ObserverKind};
use crate::position;
use crate::settings::EffectiveSettings;
use crate::surface::SurfaceConfig;
use crate::timers::{TimerKind, Timers};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VisualState {
    #[default]
    Default,
    Processing,
    Success,
    Error,
}

impl VisualState {
    pub fn as_str(self) -> &'static str {
        match self {
            VisualState::Default => "default",
            VisualState::Processing => "processing",
            VisualState::Success => "success",
            VisualState::Error => "error",
        }
    }
}

/// What triggered a show request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShowTrigger {
    Focus,
    Hover,
}

/// When input events may show or hide the overlay
pub mod policy {
    use super::ShowTrigger;
    use crate::settings::EffectiveSettings;

    /// Disabled refuses everything; hover and focus display are exclusive
    pub fn allows_show(settings: &EffectiveSettings, trigger: ShowTrigger) -> bool {
        settings.enabled
            && match trigger {
                ShowTrigger::Hover => settings.show_on_hover,
                ShowTrigger::Focus => !settings.show_on_hover,
            }
    }

    pub fn allows_hover_hide(settings: &EffectiveSettings) -> bool {
        settings.show_on_hover
    }

    pub fn allows_blur_hide(settings: &EffectiveSettings, focus_on_anchor: bool, in_flight: bool) -> bool {
        settings.auto_hide && !focus_on_anchor && !in_flight
    }
}

#[derive(Debug)]
struct ActiveOverlay<H> {
    config: SurfaceConfig,
    container: NodeId,
    control: H,
    observers: Vec<ObserverId>,
    visual: VisualState,
}

pub struct Overlay<D: Dom, M: ControlMounter<D>> {
    mounter: M,
    active: Option<ActiveOverlay<M::Handle>>,
    _dom: PhantomData<fn(&mut D)>,
}

impl<D: Dom, M: ControlMounter<D>> Overlay<D, M> {
    pub fn new(mounter: M) -> Self {
        Self {
            mounter,
            active: None,
            _dom: PhantomData,
        }
    }

    pub fn is_shown(&self) -> bool {
        self.active.is_some()
    }

    pub fn config(&self) -> Option<&SurfaceConfig> {
        self.active.as_ref().map(|a| &a.config)
    }

    pub fn anchor(&self) -> Option<NodeId> {
        self.active.as_ref().map(|a| a.config.anchor)
    }

    pub fn container(&self) -> Option<NodeId> {
        self.active.as_ref().map(|a| a.container)
    }

    /// Visual sub-state, `None` while hidden
    pub fn visual_state(&self) -> Option<VisualState> {
        self.active.as_ref().map(|a| a.visual)
    }

    /// Whether `node` is the overlay container or inside it
    pub fn contains(&self, dom: &D, node: NodeId) -> bool {
        self.container().is_some_and(|c| dom.contains(c, node))
    }

    /// Replace whatever is shown with a fresh overlay anchored per `config`.
    /// Returns false (and stays hidden) when the anchor is detached.
    pub fn show(
        &mut self,
        dom: &mut D,
        timers: &mut Timers,
        config: SurfaceConfig,
        settings: &EffectiveSettings,
    ) -> bool {
        self.hide(dom, timers);

        let anchor = config.anchor;
        if !dom.is_connected(anchor) {
            debug!(anchor = anchor.0, "Refusing to show overlay for detached anchor");
            return false;
        }

        let container = dom.create_element("div");
        dom.set_attribute(container, "id", overlay::CONTAINER_ID);
        dom.set_attribute(container, "style", overlay::CONTAINER_STYLE);
        let control = self.mounter.mount(
            dom,
            container,
            ControlProps {
                size: settings.button_size,
                state: VisualState::Default,
            },
        );
        dom.append_to_body(container);

        let observers = vec![
            dom.observe(anchor, ObserverKind::Resize),
            dom.observe(anchor, ObserverKind::Input),
        ];
        position::reposition(dom, container, anchor, settings);

        info!(anchor = anchor.0, variant = ?config.variant, rule = ?config.rule, "Showing overlay");
        self.active = Some(ActiveOverlay {
            config,
            container,
            control,
            observers,
            visual: VisualState::Default,
        });
        true
    }

    /// Tear down the overlay; no-op when hidden
    pub fn hide(&mut self, dom: &mut D, timers: &mut Timers) {
        let Some(active) = self.active.take() else {
            return;
        };
        for observer in &active.observers {
            dom.disconnect(*observer);
        }
        timers.cancel_all(&TimerKind::ANCHOR_SCOPED);
        active.control.destroy(dom);
        dom.remove(active.container);
        debug!(anchor = active.config.anchor.0, "Hid overlay");
    }

    /// Move the overlay next to its anchor. Returns false when the anchor is
    /// no longer attached, in which case the caller must hide.
    pub fn reposition(&mut self, dom: &mut D, settings: &EffectiveSettings) -> bool {
        let Some(active) = self.active.as_ref() else {
            return true;
        };
        if !dom.is_connected(active.config.anchor) {
            return false;
        }
        position::reposition(dom, active.container, active.config.anchor, settings);
        true
    }

    pub fn set_visual(&mut self, dom: &mut D, state: VisualState) {
        if let Some(active) = self.active.as_mut() {
            if active.visual != state {
                debug!(from = active.visual.as_str(), to = state.as_str(), "Overlay visual state");
            }
            active.visual = state;
            active.control.update(dom, PropsPatch::state(state));
        }
    }

    /// Set the visual state only if still anchored to `anchor`
    pub fn set_visual_for(&mut self, dom: &mut D, anchor: NodeId, state: VisualState) {
        if self.anchor() == Some(anchor) {
            self.set_visual(dom, state);
        }
    }

    pub fn set_button_size(&mut self, dom: &mut D, size: u32) {
        if let Some(active) = self.active.as_mut() {
            active.control.update(dom, PropsPatch::size(size));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::FloatingButton;
    use crate::dom::MemoryDom;
    use crate::settings::GlobalSettings;
    use crate::surface::classify;
    use crate::types::Rect;
    use std::time::Duration;
    use tokio::sync::mpsc;

    fn setup() -> (MemoryDom, Overlay<MemoryDom, FloatingButton>, Timers, mpsc::UnboundedReceiver<crate::content_script::PageEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (MemoryDom::default(), Overlay::new(FloatingButton), Timers::new(tx), rx)
    }

    fn textarea(dom: &mut MemoryDom) -> SurfaceConfig {
        let node = dom.append(dom.body(), "textarea");
        dom.set_rect(node, Rect::new(0.0, 0.0, 100.0, 20.0));
        classify(dom, node).unwrap()
    }

    #[test]
    fn test_policy_hover_and_focus_are_exclusive() {
        let focus_mode = GlobalSettings::default();
        assert!(policy::allows_show(&focus_mode, ShowTrigger::Focus));
        assert!(!policy::allows_show(&focus_mode, ShowTrigger::Hover));

        let hover_mode = GlobalSettings { show_on_hover: true, ..GlobalSettings::default() };
        assert!(!policy::allows_show(&hover_mode, ShowTrigger::Focus));
        assert!(policy::allows_show(&hover_mode, ShowTrigger::Hover));
        assert!(policy::allows_hover_hide(&hover_mode));
    }

    #[test]
    fn test_policy_disabled_refuses_show() {
        let disabled = GlobalSettings { enabled: false, ..GlobalSettings::default() };
        assert!(!policy::allows_show(&disabled, ShowTrigger::Focus));
        let disabled_hover = GlobalSettings { show_on_hover: true, ..disabled };
        assert!(!policy::allows_show(&disabled_hover, ShowTrigger::Hover));
    }

    #[test]
    fn test_policy_blur_hide_gates() {
        let settings = GlobalSettings::default();
        assert!(policy::allows_blur_hide(&settings, false, false));
        assert!(!policy::allows_blur_hide(&settings, true, false));
        assert!(!policy::allows_blur_hide(&settings, false, true));
        let sticky = GlobalSettings { auto_hide: false, ..GlobalSettings::default() };
        assert!(!policy::allows_blur_hide(&sticky, false, false));
    }

    #[tokio::test]
    async fn test_show_mounts_container_and_observers() {
        let (mut dom, mut overlay, mut timers, _rx) = setup();
        let config = textarea(&mut dom);
        let anchor = config.anchor;

        assert!(overlay.show(&mut dom, &mut timers, config, &GlobalSettings::default()));
        assert_eq!(overlay.anchor(), Some(anchor));
        assert_eq!(overlay.visual_state(), Some(VisualState::Default));
        assert_eq!(dom.elements_with_id(overlay::CONTAINER_ID).len(), 1);
        assert_eq!(dom.active_observer_count(), 2);
        assert_eq!(dom.style(overlay.container().unwrap(), "left"), Some("116px"));
    }

    #[tokio::test]
    async fn test_repeated_show_and_hide_never_leak() {
        let (mut dom, mut overlay, mut timers, _rx) = setup();
        let settings = GlobalSettings::default();
        let first = textarea(&mut dom);
        let second = textarea(&mut dom);

        for config in [first.clone(), second.clone(), first.clone(), second] {
            overlay.show(&mut dom, &mut timers, config, &settings);
            assert_eq!(dom.elements_with_id(overlay::CONTAINER_ID).len(), 1);
            assert_eq!(dom.active_observer_count(), 2);
        }

        overlay.hide(&mut dom, &mut timers);
        overlay.hide(&mut dom, &mut timers);
        assert!(!overlay.is_shown());
        assert!(dom.elements_with_id(overlay::CONTAINER_ID).is_empty());
        assert_eq!(dom.active_observer_count(), 0);
    }

    #[tokio::test]
    async fn test_hide_cancels_anchor_timers() {
        let (mut dom, mut overlay, mut timers, _rx) = setup();
        let config = textarea(&mut dom);
        overlay.show(&mut dom, &mut timers, config, &GlobalSettings::default());
        timers.schedule(TimerKind::AnchorInputDebounce, Duration::from_millis(100));
        timers.schedule(TimerKind::BlurCheck, Duration::from_millis(150));

        overlay.hide(&mut dom, &mut timers);
        assert!(!timers.is_pending(TimerKind::AnchorInputDebounce));
        assert!(!timers.is_pending(TimerKind::BlurCheck));
    }

    #[tokio::test]
    async fn test_show_refuses_detached_anchor() {
        let (mut dom, mut overlay, mut timers, _rx) = setup();
        let config = textarea(&mut dom);
        dom.remove(config.anchor);

        assert!(!overlay.show(&mut dom, &mut timers, config, &GlobalSettings::default()));
        assert!(!overlay.is_shown());
        assert_eq!(dom.active_observer_count(), 0);
    }

    #[tokio::test]
    async fn test_reposition_reports_detached_anchor() {
        let (mut dom, mut overlay, mut timers, _rx) = setup();
        let config = textarea(&mut dom);
        let anchor = config.anchor;
        let settings = GlobalSettings::default();
        overlay.show(&mut dom, &mut timers, config, &settings);

        assert!(overlay.reposition(&mut dom, &settings));
        dom.remove(anchor);
        assert!(!overlay.reposition(&mut dom, &settings));
    }

    #[tokio::test]
    async fn test_visual_state_only_for_current_anchor() {
        let (mut dom, mut overlay, mut timers, _rx) = setup();
        let config = textarea(&mut dom);
        let anchor = config.anchor;
        let other = textarea(&mut dom).anchor;
        overlay.show(&mut dom, &mut timers, config, &GlobalSettings::default());

        overlay.set_visual_for(&mut dom, other, VisualState::Error);
        assert_eq!(overlay.visual_state(), Some(VisualState::Default));

        overlay.set_visual_for(&mut dom, anchor, VisualState::Processing);
        assert_eq!(overlay.visual_state(), Some(VisualState::Processing));
    }
}
