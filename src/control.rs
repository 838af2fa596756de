//! The mounted visual control
//!
//! The overlay lifecycle only talks to [`ControlMounter`] / [`ControlHandle`];
//! [`FloatingButton`] is the stock implementation that renders a `<button>`
//! into the overlay container.

use tracing::trace;

use crate::constants::overlay;
use crate::dom::{Dom, NodeId};
use crate::overlay::VisualState;

/// Props the control is mounted with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlProps {
    pub size: u32,
    pub state: VisualState,
}

/// Partial prop update
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PropsPatch {
    pub size: Option<u32>,
    pub state: Option<VisualState>,
}

impl PropsPatch {
    pub fn state(state: VisualState) -> Self {
        Self { state: Some(state), ..Self::default() }
    }

    pub fn size(size: u32) -> Self {
        Self { size: Some(size), ..Self::default() }
    }
}

pub trait ControlMounter<D: Dom> {
    type Handle: ControlHandle<D>;

    fn mount(&mut self, dom: &mut D, container: NodeId, props: ControlProps) -> Self::Handle;
}

pub trait ControlHandle<D: Dom> {
    fn update(&mut self, dom: &mut D, patch: PropsPatch);
    fn destroy(self, dom: &mut D);
}

/// Round action button reflecting size and visual state
#[derive(Debug, Default, Clone, Copy)]
pub struct FloatingButton;

#[derive(Debug)]
pub struct FloatingButtonHandle {
    button: NodeId,
    props: ControlProps,
}

impl FloatingButtonHandle {
    pub fn button(&self) -> NodeId {
        self.button
    }

    pub fn props(&self) -> ControlProps {
        self.props
    }

    fn render<D: Dom>(&self, dom: &mut D) {
        let size = format!("{}px", self.props.size);
        dom.set_style(self.button, "width", &size);
        dom.set_style(self.button, "height", &size);
        dom.set_attribute(self.button, "data-state", self.props.state.as_str());
        dom.set_attribute(
            self.button,
            "aria-busy",
            if self.props.state == VisualState::Processing { "true" } else { "false" },
        );
    }
}

impl<D: Dom> ControlMounter<D> for FloatingButton {
    type Handle = FloatingButtonHandle;

    fn mount(&mut self, dom: &mut D, container: NodeId, props: ControlProps) -> Self::Handle {
        let button = dom.create_element("button");
        dom.set_attribute(button, "type", "button");
        dom.set_attribute(button, "aria-label", overlay::BUTTON_LABEL);
        dom.set_attribute(button, "title", overlay::BUTTON_LABEL);
        dom.append_child(container, button);

        let handle = FloatingButtonHandle { button, props };
        handle.render(dom);
        trace!(button = button.0, size = props.size, "Mounted floating button");
        handle
    }
}

impl<D: Dom> ControlHandle<D> for FloatingButtonHandle {
    fn update(&mut self, dom: &mut D, patch: PropsPatch) {
        if let Some(size) = patch.size {
            self.props.size = size;
        }
        if let Some(state) = patch.state {
            self.props.state = state;
        }
        self.render(dom);
    }

    fn destroy(self, dom: &mut D) {
        dom.remove(self.button);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::MemoryDom;

    #[test]
    fn test_mount_renders_props() {
        let mut dom = MemoryDom::default();
        let container = dom.append(dom.body(), "div");
        let handle = FloatingButton.mount(
            &mut dom,
            container,
            ControlProps { size: 32, state: VisualState::Default },
        );

        assert_eq!(dom.children(container), vec![handle.button()]);
        assert_eq!(dom.style(handle.button(), "width"), Some("32px"));
        assert_eq!(dom.attribute(handle.button(), "data-state").as_deref(), Some("default"));
    }

    #[test]
    fn test_update_applies_partial_props() {
        let mut dom = MemoryDom::default();
        let container = dom.append(dom.body(), "div");
        let mut handle = FloatingButton.mount(
            &mut dom,
            container,
            ControlProps { size: 32, state: VisualState::Default },
        );

        handle.update(&mut dom, PropsPatch::state(VisualState::Processing));
        assert_eq!(handle.props(), ControlProps { size: 32, state: VisualState::Processing });
        assert_eq!(dom.attribute(handle.button(), "aria-busy").as_deref(), Some("true"));

        handle.update(&mut dom, PropsPatch::size(40));
        assert_eq!(dom.style(handle.button(), "height"), Some("40px"));
        assert_eq!(dom.attribute(handle.button(), "data-state").as_deref(), Some("processing"));
    }

    #[test]
    fn test_destroy_removes_button() {
        let mut dom = MemoryDom::default();
        let container = dom.append(dom.body(), "div");
        let handle = FloatingButton.mount(
            &mut dom,
            container,
            ControlProps { size: 32, state: VisualState::Default },
        );
        let button = handle.button();

        ControlHandle::<MemoryDom>::destroy(handle, &mut dom);
        assert!(!dom.is_connected(button));
        assert!(dom.children(container).is_empty());
    }
}
