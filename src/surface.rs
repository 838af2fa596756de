//! Editable-surface classification
//!
//! Decides whether a node the user is interacting with is something we can
//! rewrite, which variant it is, and which element the overlay should anchor
//! to. Rules are tried in [`MatchRule::PRIORITY`] order and the first match
//! wins: rich editors nest a generic contenteditable node inside their own
//! wrapper markup, so the generic rule must come last.

use tracing::trace;

use crate::constants::{elements, markers};
use crate::dom::{Dom, NodeId};

/// Recognized editable-surface categories
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceVariant {
    Input,
    Textarea,
    RichText,
}

impl SurfaceVariant {
    /// Input and textarea are read through value + selection offsets
    pub fn is_range_based(self) -> bool {
        matches!(self, SurfaceVariant::Input | SurfaceVariant::Textarea)
    }
}

/// Classification rules in priority order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchRule {
    /// `role="textbox"` plus a known test id, or a rich-text marker class
    CommentEditor,
    /// Ancestor editor root containing a content-editable region
    EditorContainer,
    /// Node carries the content-region marker class itself
    ContentRegion,
    TextInput,
    Textarea,
    /// Any other `isContentEditable` element
    GenericEditable,
}

impl MatchRule {
    pub const PRIORITY: [MatchRule; 6] = [
        MatchRule::CommentEditor,
        MatchRule::EditorContainer,
        MatchRule::ContentRegion,
        MatchRule::TextInput,
        MatchRule::Textarea,
        MatchRule::GenericEditable,
    ];

    pub fn variant(self) -> SurfaceVariant {
        match self {
            MatchRule::TextInput => SurfaceVariant::Input,
            MatchRule::Textarea => SurfaceVariant::Textarea,
            MatchRule::CommentEditor
            | MatchRule::EditorContainer
            | MatchRule::ContentRegion
            | MatchRule::GenericEditable => SurfaceVariant::RichText,
        }
    }

    /// CSS-selector description of what matched
    pub fn selector(self) -> String {
        match self {
            MatchRule::CommentEditor => format!(
                "[role=\"{}\"][{}], .{}",
                markers::TEXTBOX_ROLE,
                markers::TEST_ID_ATTRIBUTE,
                markers::RICH_TEXT_MARKER_CLASSES.join(", .")
            ),
            MatchRule::EditorContainer => format!(
                ".{} [contenteditable]",
                markers::EDITOR_ROOT_CLASSES.join(" [contenteditable], .")
            ),
            MatchRule::ContentRegion => format!(".{}", markers::CONTENT_REGION_CLASS),
            MatchRule::TextInput => "input".to_string(),
            MatchRule::Textarea => "textarea".to_string(),
            MatchRule::GenericEditable => "[contenteditable]".to_string(),
        }
    }

    /// The element to anchor to when this rule matches `node`
    fn try_match<D: Dom + ?Sized>(self, dom: &D, node: NodeId) -> Option<NodeId> {
        match self {
            MatchRule::CommentEditor => is_comment_editor(dom, node).then_some(node),
            MatchRule::EditorContainer => editor_root(dom, node)
                .and_then(|root| find_editable_region(dom, root)),
            MatchRule::ContentRegion => {
                dom.has_class(node, markers::CONTENT_REGION_CLASS).then_some(node)
            }
            MatchRule::TextInput => is_text_input(dom, node).then_some(node),
            MatchRule::Textarea => {
                (dom.tag_name(node) == elements::TEXTAREA_TAG).then_some(node)
            }
            MatchRule::GenericEditable => dom.is_content_editable(node).then_some(node),
        }
    }
}

/// What the overlay is attached to. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SurfaceConfig {
    pub variant: SurfaceVariant,
    pub anchor: NodeId,
    pub rule: MatchRule,
    pub match_selector: Option<String>,
}

/// Classify `node`, or `None` when it is not an editable surface we handle
pub fn classify<D: Dom + ?Sized>(dom: &D, node: NodeId) -> Option<SurfaceConfig> {
    if !dom.is_connected(node) {
        return None;
    }
    let (rule, anchor) = MatchRule::PRIORITY
        .iter()
        .find_map(|rule| rule.try_match(dom, node).map(|anchor| (*rule, anchor)))?;
    trace!(node = node.0, anchor = anchor.0, rule = ?rule, "Classified surface");
    Some(SurfaceConfig {
        variant: rule.variant(),
        anchor,
        rule,
        match_selector: Some(rule.selector()),
    })
}

fn is_comment_editor<D: Dom + ?Sized>(dom: &D, node: NodeId) -> bool {
    let role_match = dom.attribute(node, "role").as_deref() == Some(markers::TEXTBOX_ROLE)
        && dom
            .attribute(node, markers::TEST_ID_ATTRIBUTE)
            .is_some_and(|id| markers::COMMENT_EDITOR_TEST_IDS.contains(&id.as_str()));
    role_match
        || markers::RICH_TEXT_MARKER_CLASSES
            .iter()
            .any(|class| dom.has_class(node, class))
}

fn editor_root<D: Dom + ?Sized>(dom: &D, node: NodeId) -> Option<NodeId> {
    let mut current = Some(node);
    while let Some(n) = current {
        if markers::EDITOR_ROOT_CLASSES.iter().any(|class| dom.has_class(n, class)) {
            return Some(n);
        }
        current = dom.parent(n);
    }
    None
}

/// Depth-first search for the editor's editable region, preferring the
/// content-region marker over any other contenteditable descendant
fn find_editable_region<D: Dom + ?Sized>(dom: &D, root: NodeId) -> Option<NodeId> {
    let descendants = descendants(dom, root);
    descendants
        .iter()
        .copied()
        .find(|n| dom.has_class(*n, markers::CONTENT_REGION_CLASS) && dom.is_content_editable(*n))
        .or_else(|| {
            descendants
                .iter()
                .copied()
                .find(|n| dom.attribute(*n, "contenteditable").is_some() && dom.is_content_editable(*n))
        })
}

fn descendants<D: Dom + ?Sized>(dom: &D, root: NodeId) -> Vec<NodeId> {
    let mut out = Vec::new();
    let mut stack: Vec<NodeId> = dom.children(root).into_iter().rev().collect();
    while let Some(n) = stack.pop() {
        out.push(n);
        stack.extend(dom.children(n).into_iter().rev());
    }
    out
}

fn is_text_input<D: Dom + ?Sized>(dom: &D, node: NodeId) -> bool {
    if dom.tag_name(node) != elements::INPUT_TAG {
        return false;
    }
    let input_type = dom
        .attribute(node, "type")
        .unwrap_or_default()
        .to_ascii_lowercase();
    elements::TEXT_INPUT_TYPES.contains(&input_type.as_str())
}
