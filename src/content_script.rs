//! Per-page content script: the event loop that ties everything together
//!
//! Page listeners, timers, the remote call, settings loading, and runtime
//! messages all post [`PageEvent`]s into one unbounded channel. A single
//! [`ContentScript`] drains it and is the only thing that touches the DOM,
//! the overlay, or the in-memory settings.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, trace, warn};
use url::Url;

use crate::action::ActionController;
use crate::constants::timing;
use crate::control::ControlMounter;
use crate::dom::{Dom, NodeId};
use crate::error::RemoteCallError;
use crate::messages::{Ack, RuntimeMessage};
use crate::overlay::{Overlay, ShowTrigger, VisualState, policy};
use crate::resolver;
use crate::rewrite::{RewriteResponse, Rewriter};
use crate::settings::{DomainOverrides, EffectiveSettings, GlobalSettings};
use crate::store::{self, SettingsStore};
use crate::surface;
use crate::timers::{TimerFired, TimerKind, Timers};
use crate::types::Point;

// ==============================================================================
// Events
// ==============================================================================

#[derive(Debug)]
pub enum PageEvent {
    /// Document-level `focusin`
    FocusIn { target: NodeId },
    /// Document-level `focusout`
    FocusOut { target: NodeId },
    /// Document-level `mouseover`
    MouseOver { target: NodeId },
    /// Document-level `mouseout`, with the pointer position at that moment
    MouseOut { target: NodeId, point: Point },
    /// Window `scroll` (capturing)
    Scroll,
    /// Window `resize`
    Resize,
    /// Resize observer on the current anchor
    AnchorResized { target: NodeId },
    /// `input` listener on the current anchor
    AnchorInput { target: NodeId },
    /// The overlay button was clicked
    Activate,
    TimerFired(TimerFired),
    RewriteFinished(Result<RewriteResponse, RemoteCallError>),
    /// Initial settings read completed
    SettingsLoaded {
        global: GlobalSettings,
        overrides: DomainOverrides,
    },
    /// Message from the options page, acknowledged through `ack`
    Runtime {
        message: RuntimeMessage,
        ack: Option<oneshot::Sender<Ack>>,
    },
}

// ==============================================================================
// Content script
// ==============================================================================

pub struct ContentScript<D: Dom, M: ControlMounter<D>> {
    dom: D,
    overlay: Overlay<D, M>,
    timers: Timers,
    global: GlobalSettings,
    overrides: DomainOverrides,
    action: ActionController,
    rewriter: Arc<dyn Rewriter>,
    tx: mpsc::UnboundedSender<PageEvent>,
    hover_point: Point,
    /// Hide check suppressed by an in-flight rewrite, re-run after its feedback clears
    deferred_check: Option<TimerKind>,
}

impl<D: Dom, M: ControlMounter<D>> ContentScript<D, M> {
    /// Build a content script over `dom`. Until settings are loaded the
    /// built-in defaults apply.
    pub fn new(
        dom: D,
        mounter: M,
        rewriter: Arc<dyn Rewriter>,
    ) -> (Self, mpsc::UnboundedReceiver<PageEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let script = Self {
            dom,
            overlay: Overlay::new(mounter),
            timers: Timers::new(tx.clone()),
            global: GlobalSettings::default(),
            overrides: DomainOverrides::new(),
            action: ActionController::default(),
            rewriter,
            tx,
            hover_point: Point::default(),
            deferred_check: None,
        };
        (script, rx)
    }

    /// Replace the build-time fallback API key
    pub fn with_fallback_api_key(mut self, key: Option<String>) -> Self {
        self.action = ActionController::new(key);
        self
    }

    /// Sender for host listeners to post page events
    pub fn sender(&self) -> mpsc::UnboundedSender<PageEvent> {
        self.tx.clone()
    }

    pub fn dom(&self) -> &D {
        &self.dom
    }

    pub fn dom_mut(&mut self) -> &mut D {
        &mut self.dom
    }

    pub fn overlay(&self) -> &Overlay<D, M> {
        &self.overlay
    }

    pub fn global(&self) -> &GlobalSettings {
        &self.global
    }

    pub fn overrides(&self) -> &DomainOverrides {
        &self.overrides
    }

    pub fn in_flight(&self) -> bool {
        self.action.in_flight()
    }

    /// Settings for the page's current URL, resolved fresh on every call
    pub fn effective(&self) -> EffectiveSettings {
        resolver::resolve(&self.global, &self.overrides, &self.dom.location())
    }

    /// Read both settings records in the background; the result arrives as
    /// [`PageEvent::SettingsLoaded`]
    pub fn start_loading(&self, store: Arc<dyn SettingsStore>) {
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let global = store::load_global_settings(store.as_ref()).await;
            let overrides = store::load_overrides(store.as_ref()).await;
            let _ = tx.send(PageEvent::SettingsLoaded { global, overrides });
        });
    }

    /// Drain the event channel for the lifetime of the page
    pub async fn run(mut self, mut rx: mpsc::UnboundedReceiver<PageEvent>) {
        info!(url = %self.dom.location(), "Content script running");
        while let Some(event) = rx.recv().await {
            self.dispatch(event);
        }
    }

    pub fn dispatch(&mut self, event: PageEvent) {
        trace!(event = ?event, "Dispatching page event");
        match event {
            PageEvent::FocusIn { target } => self.on_focus_in(target),
            PageEvent::FocusOut { target } => self.on_focus_out(target),
            PageEvent::MouseOver { target } => self.on_mouse_over(target),
            PageEvent::MouseOut { target, point } => self.on_mouse_out(target, point),
            PageEvent::Scroll | PageEvent::Resize => self.reposition_or_hide(),
            PageEvent::AnchorResized { target } => {
                if self.overlay.anchor() == Some(target) {
                    self.reposition_or_hide();
                }
            }
            PageEvent::AnchorInput { target } => {
                if self.overlay.anchor() == Some(target) {
                    self.timers.schedule(
                        TimerKind::AnchorInputDebounce,
                        Duration::from_millis(timing::ANCHOR_INPUT_DEBOUNCE_MS),
                    );
                }
            }
            PageEvent::Activate => self.activate(),
            PageEvent::TimerFired(fired) => {
                if self.timers.take_fired(fired) {
                    self.on_timer(fired.kind);
                }
            }
            PageEvent::RewriteFinished(result) => {
                self.action
                    .finish(&mut self.dom, &mut self.overlay, &mut self.timers, result);
            }
            PageEvent::SettingsLoaded { global, overrides } => {
                self.global = global;
                self.overrides = overrides;
                self.refresh_appearance();
            }
            PageEvent::Runtime { message, ack } => {
                let reply = self.handle_message(message);
                if let Some(ack) = ack {
                    let _ = ack.send(reply);
                }
            }
        }
    }

    /// Apply a settings change pushed from the options page
    pub fn handle_message(&mut self, message: RuntimeMessage) -> Ack {
        match message {
            RuntimeMessage::SettingsUpdated { settings } => {
                self.global = settings.merged_over(&self.global);
                info!("Settings updated");
            }
            RuntimeMessage::DomainOverridesUpdated { overrides } => {
                info!(count = overrides.len(), "Site overrides updated");
                self.overrides = overrides;
            }
        }
        self.refresh_appearance();
        Ack::ok()
    }

    // ==========================================================================
    // Visibility
    // ==========================================================================

    fn on_focus_in(&mut self, target: NodeId) {
        if self.overlay.contains(&self.dom, target) {
            self.timers.cancel(TimerKind::BlurCheck);
            self.deferred_check = None;
            return;
        }
        self.show_for(target, ShowTrigger::Focus);
    }

    fn on_focus_out(&mut self, target: NodeId) {
        let Some(anchor) = self.overlay.anchor() else {
            return;
        };
        if target != anchor && !self.overlay.contains(&self.dom, target) {
            return;
        }
        let settings = self.effective();
        if settings.auto_hide {
            self.timers
                .schedule(TimerKind::BlurCheck, Duration::from_millis(settings.hide_delay));
        }
    }

    fn on_mouse_over(&mut self, target: NodeId) {
        if self.overlay.contains(&self.dom, target) {
            self.timers.cancel(TimerKind::HoverCheck);
            self.deferred_check = None;
            return;
        }
        self.show_for(target, ShowTrigger::Hover);
    }

    fn on_mouse_out(&mut self, target: NodeId, point: Point) {
        let Some(anchor) = self.overlay.anchor() else {
            return;
        };
        if target != anchor && !self.overlay.contains(&self.dom, target) {
            return;
        }
        if policy::allows_hover_hide(&self.effective()) {
            self.hover_point = point;
            self.timers.schedule(
                TimerKind::HoverCheck,
                Duration::from_millis(timing::HOVER_CHECK_DELAY_MS),
            );
        }
    }

    fn show_for(&mut self, target: NodeId, trigger: ShowTrigger) {
        let settings = self.effective();
        if !policy::allows_show(&settings, trigger) {
            return;
        }
        let Some(config) = surface::classify(&self.dom, target) else {
            return;
        };

        if self.overlay.anchor() == Some(config.anchor) {
            self.timers.cancel_all(&[TimerKind::BlurCheck, TimerKind::HoverCheck]);
            self.deferred_check = None;
            self.reposition_or_hide();
            return;
        }
        if self.action.in_flight() {
            debug!(anchor = config.anchor.0, "Rewrite in flight, keeping overlay on current anchor");
            return;
        }
        self.deferred_check = None;
        self.overlay
            .show(&mut self.dom, &mut self.timers, config, &settings);
    }

    fn on_timer(&mut self, kind: TimerKind) {
        match kind {
            TimerKind::AnchorInputDebounce => self.reposition_or_hide(),
            TimerKind::VisualReset => {
                self.overlay.set_visual(&mut self.dom, VisualState::Default);
                if let Some(check) = self.deferred_check.take() {
                    debug!(check = ?check, "Re-running hide check held back by the rewrite");
                    self.on_timer(check);
                }
            }
            TimerKind::BlurCheck => {
                let Some(anchor) = self.overlay.anchor() else {
                    return;
                };
                let focus_on_anchor = self
                    .dom
                    .active_element()
                    .is_some_and(|n| n == anchor || self.overlay.contains(&self.dom, n));
                let settings = self.effective();
                if policy::allows_blur_hide(&settings, focus_on_anchor, self.action.in_flight()) {
                    debug!(anchor = anchor.0, "Focus left the anchor, hiding overlay");
                    self.overlay.hide(&mut self.dom, &mut self.timers);
                } else if policy::allows_blur_hide(&settings, focus_on_anchor, false) {
                    debug!(anchor = anchor.0, "Rewrite in flight, deferring blur hide");
                    self.deferred_check = Some(kind);
                }
            }
            TimerKind::HoverCheck => {
                let Some(anchor) = self.overlay.anchor() else {
                    return;
                };
                let over = self.dom.element_from_point(self.hover_point);
                let still_over = over.is_some_and(|n| {
                    self.dom.contains(anchor, n) || self.overlay.contains(&self.dom, n)
                });
                if still_over {
                    return;
                }
                if self.action.in_flight() {
                    debug!(anchor = anchor.0, "Rewrite in flight, deferring hover hide");
                    self.deferred_check = Some(kind);
                } else {
                    debug!(anchor = anchor.0, "Pointer left the anchor, hiding overlay");
                    self.overlay.hide(&mut self.dom, &mut self.timers);
                }
            }
        }
    }

    // ==========================================================================
    // Positioning and appearance
    // ==========================================================================

    fn reposition_or_hide(&mut self) {
        let settings = self.effective();
        if !self.overlay.reposition(&mut self.dom, &settings) {
            info!("Anchor detached from the document, hiding overlay");
            self.overlay.hide(&mut self.dom, &mut self.timers);
        }
    }

    fn refresh_appearance(&mut self) {
        if !self.overlay.is_shown() {
            return;
        }
        let settings = self.effective();
        if !settings.enabled {
            info!("Disabled for this page, hiding overlay");
            self.overlay.hide(&mut self.dom, &mut self.timers);
            return;
        }
        self.overlay.set_button_size(&mut self.dom, settings.button_size);
        self.reposition_or_hide();
    }

    // ==========================================================================
    // Action
    // ==========================================================================

    fn activate(&mut self) {
        let settings = self.effective();
        let Some(request) = self.action.begin(&mut self.dom, &mut self.overlay, &settings) else {
            return;
        };
        let origin = page_origin(&self.dom.location());
        let request = request.into_rewrite(&settings.model, origin);

        let rewriter = Arc::clone(&self.rewriter);
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let result = rewriter.rewrite(request).await;
            if tx.send(PageEvent::RewriteFinished(result)).is_err() {
                warn!("Content script gone before rewrite finished");
            }
        });
    }
}

/// `scheme://host[:port]` of the page, if it has a tuple origin
fn page_origin(location: &str) -> Option<String> {
    let origin = Url::parse(location).ok()?.origin();
    origin.is_tuple().then(|| origin.ascii_serialization())
}
