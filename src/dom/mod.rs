//! Host DOM seam
//!
//! The content script never touches a concrete browser binding. Everything it
//! needs from the page (node queries, form values, the window selection,
//! observers, focus, notices, and style writes) goes through [`Dom`].
//! [`MemoryDom`] implements it in memory for headless hosts and tests.

pub mod memory;

pub use memory::MemoryDom;

use crate::types::{Point, Rect};

/// Opaque handle to a DOM node owned by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

/// Handle to an observer/listener registered on a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(pub u64);

/// Kinds of per-anchor observation the position tracker registers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObserverKind {
    /// ResizeObserver on the anchor
    Resize,
    /// `input` listener on the anchor
    Input,
}

pub trait Dom {
    // === Tree queries ===

    /// Uppercase tag name (`INPUT`, `DIV`, ...)
    fn tag_name(&self, node: NodeId) -> String;
    fn attribute(&self, node: NodeId, name: &str) -> Option<String>;
    fn has_class(&self, node: NodeId, class: &str) -> bool;
    /// `isContentEditable`
    fn is_content_editable(&self, node: NodeId) -> bool;
    fn parent(&self, node: NodeId) -> Option<NodeId>;
    fn children(&self, node: NodeId) -> Vec<NodeId>;
    /// Whether the node is still attached to the document
    fn is_connected(&self, node: NodeId) -> bool;
    /// `ancestor.contains(node)`, inclusive
    fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(n) = current {
            if n == ancestor {
                return true;
            }
            current = self.parent(n);
        }
        false
    }

    // === Form controls (input/textarea) ===

    fn value(&self, node: NodeId) -> String;
    fn set_value(&mut self, node: NodeId, value: &str);
    /// `(selectionStart, selectionEnd)` in characters
    fn selection_range(&self, node: NodeId) -> (usize, usize);
    fn set_selection_range(&mut self, node: NodeId, start: usize, end: usize);

    // === Rich text ===

    fn text_content(&self, node: NodeId) -> String;
    fn set_text_content(&mut self, node: NodeId, text: &str);
    /// Character offsets of the window selection within `root`'s text
    /// content. `None` unless both ends of the selection lie inside `root`.
    fn selection_offsets(&self, root: NodeId) -> Option<(usize, usize)>;
    /// Place the window selection over `[start, end)` of `root`'s text
    /// content. Returns false if the offsets cannot be mapped into `root`.
    fn select_offsets(&mut self, root: NodeId, start: usize, end: usize) -> bool;
    /// `range.deleteContents()` on the current selection range
    fn delete_selection_contents(&mut self);
    /// Insert `text` as one text node at the selection range, then collapse
    /// the selection to just after the inserted node
    fn insert_text_at_selection(&mut self, text: &str);

    // === Focus and events ===

    fn active_element(&self) -> Option<NodeId>;
    fn focus(&mut self, node: NodeId);
    /// Dispatch a bubbling synthetic `input` event on the node
    fn dispatch_input_event(&mut self, node: NodeId);
    /// `document.elementFromPoint`
    fn element_from_point(&self, point: Point) -> Option<NodeId>;
    /// Blocking user notice (`alert`)
    fn alert(&mut self, message: &str);

    // === Geometry ===

    fn bounding_rect(&self, node: NodeId) -> Rect;
    /// Page scroll offsets (`pageXOffset`, `pageYOffset`)
    fn scroll_offset(&self) -> Point;
    /// `location.href`
    fn location(&self) -> String;

    // === Overlay plumbing ===

    fn create_element(&mut self, tag: &str) -> NodeId;
    fn set_attribute(&mut self, node: NodeId, name: &str, value: &str);
    fn set_style(&mut self, node: NodeId, property: &str, value: &str);
    fn append_child(&mut self, parent: NodeId, child: NodeId);
    fn append_to_body(&mut self, node: NodeId);
    fn remove(&mut self, node: NodeId);

    // === Anchor-scoped observers ===

    fn observe(&mut self, node: NodeId, kind: ObserverKind) -> ObserverId;
    fn disconnect(&mut self, observer: ObserverId);
}
