//! In-memory document used by headless hosts and tests
//!
//! Models just enough of a browser document for the content script: an element
//! tree under `<html><body>`, form values with selection offsets, a window
//! selection whose ends sit in node text, focus, a scripted pointer target,
//! and observer bookkeeping so leaks are observable.
//!
//! Unknown node ids behave like detached, attribute-less elements; writes to
//! them are dropped.

use std::collections::{BTreeMap, HashMap};
use tracing::trace;

use super::{Dom, NodeId, ObserverId, ObserverKind};
use crate::text_access::{char_len, char_slice, splice_chars};
use crate::types::{Point, Rect};

#[derive(Debug, Default)]
struct NodeData {
    tag: String,
    attributes: BTreeMap<String, String>,
    style: BTreeMap<String, String>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    value: String,
    selection: (usize, usize),
    text: String,
    rect: Rect,
}

static DETACHED: NodeData = NodeData {
    tag: String::new(),
    attributes: BTreeMap::new(),
    style: BTreeMap::new(),
    parent: None,
    children: Vec::new(),
    value: String::new(),
    selection: (0, 0),
    text: String::new(),
    rect: Rect { x: 0.0, y: 0.0, width: 0.0, height: 0.0 },
};

/// One end of the window selection: a character offset in a node's own text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Boundary {
    node: NodeId,
    offset: usize,
}

/// Selection from `start` to `end`, in document order
#[derive(Debug, Clone, Copy)]
struct RangeSelection {
    start: Boundary,
    end: Boundary,
}

impl RangeSelection {
    fn collapsed_at(at: Boundary) -> Self {
        Self { start: at, end: at }
    }
}

#[derive(Debug)]
pub struct MemoryDom {
    nodes: Vec<NodeData>,
    root: NodeId,
    body: NodeId,
    active: Option<NodeId>,
    selection: Option<RangeSelection>,
    pointer_target: Option<NodeId>,
    scroll: Point,
    url: String,
    observers: HashMap<ObserverId, (NodeId, ObserverKind)>,
    next_observer: u64,
    alerts: Vec<String>,
    input_events: Vec<NodeId>,
}

impl Default for MemoryDom {
    fn default() -> Self {
        Self::new("https://example.com/")
    }
}

impl MemoryDom {
    /// Create an empty document at `url`
    pub fn new(url: &str) -> Self {
        let mut dom = Self {
            nodes: Vec::new(),
            root: NodeId(0),
            body: NodeId(0),
            active: None,
            selection: None,
            pointer_target: None,
            scroll: Point::default(),
            url: url.to_string(),
            observers: HashMap::new(),
            next_observer: 0,
            alerts: Vec::new(),
            input_events: Vec::new(),
        };
        dom.root = dom.create_element("html");
        dom.body = dom.create_element("body");
        let (root, body) = (dom.root, dom.body);
        dom.append_child(root, body);
        dom
    }

    fn node(&self, node: NodeId) -> &NodeData {
        self.nodes.get(node.0).unwrap_or(&DETACHED)
    }

    fn node_mut(&mut self, node: NodeId) -> Option<&mut NodeData> {
        let data = self.nodes.get_mut(node.0);
        if data.is_none() {
            trace!(node = node.0, "Ignoring write to unknown node");
        }
        data
    }

    fn detach(&mut self, node: NodeId) {
        let parent = self.node_mut(node).and_then(|data| data.parent.take());
        if let Some(data) = parent.and_then(|p| self.node_mut(p)) {
            data.children.retain(|c| *c != node);
        }
    }

    /// `root` and its descendants in document order
    fn preorder(&self, root: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![root];
        while let Some(n) = stack.pop() {
            out.push(n);
            stack.extend(self.node(n).children.iter().rev().copied());
        }
        out
    }

    /// Character offset of `node`'s own text within `root`'s text content
    fn text_offset(&self, root: NodeId, node: NodeId) -> Option<usize> {
        let mut base = 0;
        for n in self.preorder(root) {
            if n == node {
                return Some(base);
            }
            base += char_len(&self.node(n).text);
        }
        None
    }

    /// Boundary for character `offset` of `root`'s text content
    fn locate(&self, root: NodeId, offset: usize) -> Option<Boundary> {
        let mut base = 0;
        for n in self.preorder(root) {
            let len = char_len(&self.node(n).text);
            if offset <= base + len {
                return Some(Boundary { node: n, offset: offset - base });
            }
            base += len;
        }
        None
    }

    fn set_own_text(&mut self, node: NodeId, text: String) {
        if let Some(data) = self.node_mut(node) {
            data.text = text;
        }
    }

    pub fn body(&self) -> NodeId {
        self.body
    }

    /// Create an element and append it under `parent`
    pub fn append(&mut self, parent: NodeId, tag: &str) -> NodeId {
        let node = self.create_element(tag);
        self.append_child(parent, node);
        node
    }

    /// Set a node's own text (the text the window selection indexes into)
    pub fn set_text(&mut self, node: NodeId, text: &str) {
        self.set_own_text(node, text.to_string());
    }

    pub fn set_rect(&mut self, node: NodeId, rect: Rect) {
        if let Some(data) = self.node_mut(node) {
            data.rect = rect;
        }
    }

    pub fn set_scroll(&mut self, scroll: Point) {
        self.scroll = scroll;
    }

    pub fn set_location(&mut self, url: &str) {
        self.url = url.to_string();
    }

    /// Place the window selection over `[start, end)` of the node's own text
    pub fn select_text(&mut self, node: NodeId, start: usize, end: usize) {
        self.select_span(node, start, node, end);
    }

    /// Place the window selection from `start` in `start_node`'s own text to
    /// `end` in `end_node`'s own text
    pub fn select_span(&mut self, start_node: NodeId, start: usize, end_node: NodeId, end: usize) {
        self.selection = Some(RangeSelection {
            start: Boundary { node: start_node, offset: start },
            end: Boundary { node: end_node, offset: end },
        });
    }

    pub fn clear_selection(&mut self) {
        self.selection = None;
    }

    /// Current selection as `(node, offset)` ends
    pub fn selection_ends(&self) -> Option<((NodeId, usize), (NodeId, usize))> {
        self.selection
            .map(|s| ((s.start.node, s.start.offset), (s.end.node, s.end.offset)))
    }

    /// Script what `element_from_point` reports
    pub fn set_pointer_target(&mut self, node: Option<NodeId>) {
        self.pointer_target = node;
    }

    pub fn style(&self, node: NodeId, property: &str) -> Option<&str> {
        self.node(node).style.get(property).map(String::as_str)
    }

    /// Attached elements carrying `id`
    pub fn elements_with_id(&self, id: &str) -> Vec<NodeId> {
        (0..self.nodes.len())
            .map(NodeId)
            .filter(|n| self.is_connected(*n))
            .filter(|n| self.node(*n).attributes.get("id").map(String::as_str) == Some(id))
            .collect()
    }

    pub fn active_observer_count(&self) -> usize {
        self.observers.len()
    }

    pub fn alerts(&self) -> &[String] {
        &self.alerts
    }

    /// Nodes that received a synthetic `input` event, in dispatch order
    pub fn input_events(&self) -> &[NodeId] {
        &self.input_events
    }
}

impl Dom for MemoryDom {
    fn tag_name(&self, node: NodeId) -> String {
        self.node(node).tag.clone()
    }

    fn attribute(&self, node: NodeId, name: &str) -> Option<String> {
        self.node(node).attributes.get(name).cloned()
    }

    fn has_class(&self, node: NodeId, class: &str) -> bool {
        self.node(node)
            .attributes
            .get("class")
            .is_some_and(|classes| classes.split_whitespace().any(|c| c == class))
    }

    fn is_content_editable(&self, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(n) = current {
            match self.node(n).attributes.get("contenteditable").map(String::as_str) {
                Some("" | "true" | "plaintext-only") => return true,
                Some("false") => return false,
                _ => current = self.node(n).parent,
            }
        }
        false
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.node(node).parent
    }

    fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.node(node).children.clone()
    }

    fn is_connected(&self, node: NodeId) -> bool {
        self.contains(self.root, node)
    }

    fn value(&self, node: NodeId) -> String {
        self.node(node).value.clone()
    }

    fn set_value(&mut self, node: NodeId, value: &str) {
        let len = char_len(value);
        if let Some(data) = self.node_mut(node) {
            data.value = value.to_string();
            // Assigning `.value` moves the caret to the end, like a browser
            data.selection = (len, len);
        }
    }

    fn selection_range(&self, node: NodeId) -> (usize, usize) {
        self.node(node).selection
    }

    fn set_selection_range(&mut self, node: NodeId, start: usize, end: usize) {
        if let Some(data) = self.node_mut(node) {
            let end = end.min(char_len(&data.value));
            data.selection = (start.min(end), end);
        }
    }

    fn text_content(&self, node: NodeId) -> String {
        self.preorder(node)
            .into_iter()
            .map(|n| self.node(n).text.as_str())
            .collect()
    }

    fn set_text_content(&mut self, node: NodeId, text: &str) {
        if self.node_mut(node).is_none() {
            return;
        }
        let touches_selection = self
            .selection
            .is_some_and(|s| self.contains(node, s.start.node) || self.contains(node, s.end.node));
        for child in self.children(node) {
            self.detach(child);
        }
        self.set_own_text(node, text.to_string());
        if touches_selection {
            self.selection = Some(RangeSelection::collapsed_at(Boundary {
                node,
                offset: char_len(text),
            }));
        }
    }

    fn selection_offsets(&self, root: NodeId) -> Option<(usize, usize)> {
        let sel = self.selection?;
        let start = self.text_offset(root, sel.start.node)? + sel.start.offset;
        let end = self.text_offset(root, sel.end.node)? + sel.end.offset;
        Some((start.min(end), start.max(end)))
    }

    fn select_offsets(&mut self, root: NodeId, start: usize, end: usize) -> bool {
        match (self.locate(root, start), self.locate(root, end)) {
            (Some(start), Some(end)) => {
                self.selection = Some(RangeSelection { start, end });
                true
            }
            _ => false,
        }
    }

    fn delete_selection_contents(&mut self) {
        let Some(sel) = self.selection else {
            return;
        };
        let (start, end) = (sel.start, sel.end);
        if start.node == end.node {
            let text = splice_chars(&self.node(start.node).text, start.offset, end.offset, "");
            self.set_own_text(start.node, text);
        } else {
            let order = self.preorder(self.root);
            let position = |n: NodeId| order.iter().position(|o| *o == n);
            if let (Some(first), Some(last)) = (position(start.node), position(end.node)) {
                for n in order[first + 1..last.max(first + 1)].iter().copied() {
                    self.set_own_text(n, String::new());
                }
            }
            let head = char_slice(&self.node(start.node).text, 0, start.offset).to_string();
            let end_text = &self.node(end.node).text;
            let tail = char_slice(end_text, end.offset, char_len(end_text)).to_string();
            self.set_own_text(start.node, head);
            self.set_own_text(end.node, tail);
        }
        self.selection = Some(RangeSelection::collapsed_at(start));
    }

    fn insert_text_at_selection(&mut self, text: &str) {
        if let Some(sel) = self.selection {
            let at = sel.start;
            let spliced = splice_chars(&self.node(at.node).text, at.offset, at.offset, text);
            self.set_own_text(at.node, spliced);
            self.selection = Some(RangeSelection::collapsed_at(Boundary {
                node: at.node,
                offset: at.offset + char_len(text),
            }));
        }
    }

    fn active_element(&self) -> Option<NodeId> {
        self.active
    }

    fn focus(&mut self, node: NodeId) {
        self.active = Some(node);
    }

    fn dispatch_input_event(&mut self, node: NodeId) {
        trace!(node = node.0, "Synthetic input event");
        self.input_events.push(node);
    }

    fn element_from_point(&self, _point: Point) -> Option<NodeId> {
        self.pointer_target
    }

    fn alert(&mut self, message: &str) {
        self.alerts.push(message.to_string());
    }

    fn bounding_rect(&self, node: NodeId) -> Rect {
        self.node(node).rect
    }

    fn scroll_offset(&self) -> Point {
        self.scroll
    }

    fn location(&self) -> String {
        self.url.clone()
    }

    fn create_element(&mut self, tag: &str) -> NodeId {
        self.nodes.push(NodeData {
            tag: tag.to_ascii_uppercase(),
            ..NodeData::default()
        });
        NodeId(self.nodes.len() - 1)
    }

    fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) {
        if let Some(data) = self.node_mut(node) {
            data.attributes.insert(name.to_string(), value.to_string());
        }
    }

    fn set_style(&mut self, node: NodeId, property: &str, value: &str) {
        if let Some(data) = self.node_mut(node) {
            data.style.insert(property.to_string(), value.to_string());
        }
    }

    fn append_child(&mut self, parent: NodeId, child: NodeId) {
        if parent.0 >= self.nodes.len() || child.0 >= self.nodes.len() {
            trace!(parent = parent.0, child = child.0, "Ignoring append with unknown node");
            return;
        }
        self.detach(child);
        if let Some(data) = self.node_mut(child) {
            data.parent = Some(parent);
        }
        if let Some(data) = self.node_mut(parent) {
            data.children.push(child);
        }
    }

    fn append_to_body(&mut self, node: NodeId) {
        let body = self.body;
        self.append_child(body, node);
    }

    fn remove(&mut self, node: NodeId) {
        self.detach(node);
        if self.active.is_some_and(|a| !self.is_connected(a)) {
            self.active = None;
        }
    }

    fn observe(&mut self, node: NodeId, kind: ObserverKind) -> ObserverId {
        let id = ObserverId(self.next_observer);
        self.next_observer += 1;
        self.observers.insert(id, (node, kind));
        id
    }

    fn disconnect(&mut self, observer: ObserverId) {
        self.observers.remove(&observer);
    }
}
