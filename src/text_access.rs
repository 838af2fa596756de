//! Reading the text to rewrite and writing the result back
//!
//! Inputs and textareas are range-based: the operand is the value between the
//! selection offsets (or the whole value when nothing is selected) and the
//! result is spliced back at those offsets. Rich-text regions are
//! selection-based and go through the live window selection.
//!
//! Offsets are counted in characters, never bytes.

use tracing::debug;

use crate::dom::{Dom, NodeId};
use crate::error::{ValidationError, WriteBackError};
use crate::surface::SurfaceConfig;

/// Text captured for one action, plus what's needed to write the result back
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operand {
    pub anchor: NodeId,
    pub text: String,
    pub target: WriteTarget,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteTarget {
    /// Splice into the form value at `[start, end)`; `None` replaces it all
    Range(Option<(usize, usize)>),
    /// Replace `[start, end)` of the anchor's text content, as selected at
    /// read time; `None` replaces the whole content
    Selection(Option<(usize, usize)>),
}

/// Capture the operand for `config`'s anchor.
///
/// Fails with [`ValidationError::EmptyOperand`] on empty or whitespace-only text.
pub fn read_operand<D: Dom + ?Sized>(
    dom: &D,
    config: &SurfaceConfig,
) -> Result<Operand, ValidationError> {
    let anchor = config.anchor;
    let (text, target) = if config.variant.is_range_based() {
        read_range(dom, anchor)
    } else {
        read_selection(dom, anchor)
    };

    if text.trim().is_empty() {
        return Err(ValidationError::EmptyOperand);
    }
    Ok(Operand { anchor, text, target })
}

/// Write `replacement` back in place of the operand, then notify the page.
///
/// A rich-text fragment is only replaced if the anchor still holds the
/// original fragment at the captured offsets; the live selection at write
/// time is never trusted.
pub fn write_back<D: Dom + ?Sized>(
    dom: &mut D,
    operand: &Operand,
    replacement: &str,
) -> Result<(), WriteBackError> {
    match operand.target {
        WriteTarget::Range(range) => {
            write_range(dom, operand.anchor, range, replacement);
            Ok(())
        }
        WriteTarget::Selection(range) => write_selection(dom, operand, range, replacement),
    }
}

fn read_range<D: Dom + ?Sized>(dom: &D, anchor: NodeId) -> (String, WriteTarget) {
    let value = dom.value(anchor);
    let (start, end) = dom.selection_range(anchor);
    if start == end {
        // Nothing selected: operate on the whole field
        (value, WriteTarget::Range(None))
    } else {
        (
            char_slice(&value, start, end).to_string(),
            WriteTarget::Range(Some((start, end))),
        )
    }
}

fn write_range<D: Dom + ?Sized>(
    dom: &mut D,
    anchor: NodeId,
    range: Option<(usize, usize)>,
    replacement: &str,
) {
    let caret = match range {
        Some((start, end)) => {
            let original = dom.value(anchor);
            dom.set_value(anchor, &splice_chars(&original, start, end, replacement));
            start.min(char_len(&original)) + char_len(replacement)
        }
        None => {
            dom.set_value(anchor, replacement);
            char_len(replacement)
        }
    };
    dom.set_selection_range(anchor, caret, caret);
    debug!(anchor = anchor.0, caret = caret, "Wrote rewritten value");
    dom.dispatch_input_event(anchor);
    dom.focus(anchor);
}

fn read_selection<D: Dom + ?Sized>(dom: &D, anchor: NodeId) -> (String, WriteTarget) {
    let content = dom.text_content(anchor);
    match dom.selection_offsets(anchor) {
        Some((start, end)) if start < end => (
            char_slice(&content, start, end).to_string(),
            WriteTarget::Selection(Some((start, end))),
        ),
        _ => (content, WriteTarget::Selection(None)),
    }
}

fn write_selection<D: Dom + ?Sized>(
    dom: &mut D,
    operand: &Operand,
    range: Option<(usize, usize)>,
    replacement: &str,
) -> Result<(), WriteBackError> {
    let anchor = operand.anchor;
    match range {
        Some((start, end)) => {
            let content = dom.text_content(anchor);
            if char_slice(&content, start, end) != operand.text
                || !dom.select_offsets(anchor, start, end)
            {
                return Err(WriteBackError::FragmentChanged);
            }
            dom.delete_selection_contents();
            dom.insert_text_at_selection(replacement);
        }
        None => dom.set_text_content(anchor, replacement),
    }
    debug!(anchor = anchor.0, fragment = range.is_some(), "Wrote rewritten rich text");
    dom.dispatch_input_event(anchor);
    dom.focus(anchor);
    Ok(())
}

// ==============================================================================
// Character-offset helpers
// ==============================================================================

pub(crate) fn char_len(s: &str) -> usize {
    s.chars().count()
}

fn byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

/// `s[start..end]` by character offsets, clamped to the string
pub(crate) fn char_slice(s: &str, start: usize, end: usize) -> &str {
    let end = byte_index(s, end);
    let start = byte_index(s, start).min(end);
    &s[start..end]
}

/// Replace characters `[start, end)` of `s` with `insert`, clamped to the string
pub(crate) fn splice_chars(s: &str, start: usize, end: usize, insert: &str) -> String {
    let end = byte_index(s, end);
    let start = byte_index(s, start).min(end);
    let mut out = String::with_capacity(s.len() + insert.len());
    out.push_str(&s[..start]);
    out.push_str(insert);
    out.push_str(&s[end..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::MemoryDom;
    use crate::surface::classify;

    fn textarea(dom: &mut MemoryDom, value: &str, start: usize, end: usize) -> SurfaceConfig {
        let node = dom.append(dom.body(), "textarea");
        dom.set_value(node, value);
        dom.set_selection_range(node, start, end);
        classify(dom, node).unwrap()
    }

    fn rich(dom: &mut MemoryDom, text: &str) -> SurfaceConfig {
        let node = dom.append(dom.body(), "div");
        dom.set_attribute(node, "contenteditable", "true");
        dom.set_text(node, text);
        classify(dom, node).unwrap()
    }

    #[test]
    fn test_collapsed_selection_reads_full_value() {
        let mut dom = MemoryDom::default();
        let config = textarea(&mut dom, "hello world", 3, 3);
        let operand = read_operand(&dom, &config).unwrap();
        assert_eq!(operand.text, "hello world");
        assert_eq!(operand.target, WriteTarget::Range(None));
    }

    #[test]
    fn test_range_selection_reads_exact_substring() {
        let mut dom = MemoryDom::default();
        let config = textarea(&mut dom, "hello world", 6, 11);
        let operand = read_operand(&dom, &config).unwrap();
        assert_eq!(operand.text, "world");
        assert_eq!(operand.target, WriteTarget::Range(Some((6, 11))));
    }

    #[test]
    fn test_whitespace_operand_is_rejected() {
        let mut dom = MemoryDom::default();
        let config = textarea(&mut dom, "   \n ", 0, 0);
        assert_eq!(read_operand(&dom, &config), Err(ValidationError::EmptyOperand));

        let config = textarea(&mut dom, "a   b", 1, 4);
        assert_eq!(read_operand(&dom, &config), Err(ValidationError::EmptyOperand));
    }

    #[test]
    fn test_full_replace_round_trips() {
        let mut dom = MemoryDom::default();
        let config = textarea(&mut dom, "draft", 0, 0);
        let operand = read_operand(&dom, &config).unwrap();

        write_back(&mut dom, &operand, "Final text").unwrap();
        dom.set_selection_range(config.anchor, 0, 0);
        assert_eq!(read_operand(&dom, &config).unwrap().text, "Final text");
        assert_eq!(dom.input_events(), &[config.anchor]);
    }

    #[test]
    fn test_splice_places_caret_after_insert() {
        let mut dom = MemoryDom::default();
        let config = textarea(&mut dom, "hello world", 0, 5);
        let operand = read_operand(&dom, &config).unwrap();

        write_back(&mut dom, &operand, "Greetings").unwrap();
        assert_eq!(dom.value(config.anchor), "Greetings world");
        assert_eq!(dom.selection_range(config.anchor), (9, 9));
        assert_eq!(dom.active_element(), Some(config.anchor));
    }

    #[test]
    fn test_splice_counts_characters_not_bytes() {
        let mut dom = MemoryDom::default();
        let config = textarea(&mut dom, "ça va bien", 0, 5);
        let operand = read_operand(&dom, &config).unwrap();
        assert_eq!(operand.text, "ça va");

        write_back(&mut dom, &operand, "très").unwrap();
        assert_eq!(dom.value(config.anchor), "très bien");
        assert_eq!(dom.selection_range(config.anchor), (4, 4));
    }

    #[test]
    fn test_rich_text_without_selection_uses_text_content() {
        let mut dom = MemoryDom::default();
        let config = rich(&mut dom, "draft note");
        let operand = read_operand(&dom, &config).unwrap();
        assert_eq!(operand.text, "draft note");
        assert_eq!(operand.target, WriteTarget::Selection(None));

        write_back(&mut dom, &operand, "Draft note.").unwrap();
        assert_eq!(dom.text_content(config.anchor), "Draft note.");
        assert_eq!(dom.input_events(), &[config.anchor]);
    }

    #[test]
    fn test_rich_text_selection_outside_anchor_is_ignored() {
        let mut dom = MemoryDom::default();
        let config = rich(&mut dom, "inside");
        let other = dom.append(dom.body(), "p");
        dom.set_text(other, "outside");
        dom.select_text(other, 0, 7);

        assert_eq!(read_operand(&dom, &config).unwrap().text, "inside");
    }

    #[test]
    fn test_rich_text_selection_is_replaced_in_place() {
        let mut dom = MemoryDom::default();
        let config = rich(&mut dom, "fix teh typo here");
        dom.select_text(config.anchor, 4, 12);

        let operand = read_operand(&dom, &config).unwrap();
        assert_eq!(operand.text, "teh typo");

        write_back(&mut dom, &operand, "the typo").unwrap();
        assert_eq!(dom.text_content(config.anchor), "fix the typo here");
        assert_eq!(dom.selection_offsets(config.anchor), Some((12, 12)));
    }

    #[test]
    fn test_rich_text_fragment_survives_selection_change() {
        let mut dom = MemoryDom::default();
        let config = rich(&mut dom, "keep this, fix teh typo, keep that");
        dom.select_text(config.anchor, 11, 23);

        let operand = read_operand(&dom, &config).unwrap();
        assert_eq!(operand.text, "fix teh typo");
        assert_eq!(operand.target, WriteTarget::Selection(Some((11, 23))));

        // User clicks elsewhere in the editor while the rewrite is pending
        dom.select_text(config.anchor, 3, 3);
        write_back(&mut dom, &operand, "fix the typo").unwrap();
        assert_eq!(dom.text_content(config.anchor), "keep this, fix the typo, keep that");

        // Or selects some other words
        let config = rich(&mut dom, "alpha beta gamma");
        dom.select_text(config.anchor, 6, 10);
        let operand = read_operand(&dom, &config).unwrap();
        dom.select_text(config.anchor, 0, 5);
        write_back(&mut dom, &operand, "BETA").unwrap();
        assert_eq!(dom.text_content(config.anchor), "alpha BETA gamma");
    }

    #[test]
    fn test_rich_text_fragment_edited_meanwhile_is_refused() {
        let mut dom = MemoryDom::default();
        let config = rich(&mut dom, "keep this, fix teh typo");
        dom.select_text(config.anchor, 11, 23);
        let operand = read_operand(&dom, &config).unwrap();

        dom.set_text(config.anchor, "new start. keep this, fix teh typo");
        assert_eq!(
            write_back(&mut dom, &operand, "fix the typo"),
            Err(WriteBackError::FragmentChanged)
        );
        assert_eq!(dom.text_content(config.anchor), "new start. keep this, fix teh typo");
        assert!(dom.input_events().is_empty());
    }

    #[test]
    fn test_rich_text_selection_reaching_outside_anchor_is_ignored() {
        let mut dom = MemoryDom::default();
        let before = dom.append(dom.body(), "p");
        dom.set_text(before, "header text");
        let config = rich(&mut dom, "body text");
        dom.select_span(before, 7, config.anchor, 4);

        let operand = read_operand(&dom, &config).unwrap();
        assert_eq!(operand.text, "body text");
        assert_eq!(operand.target, WriteTarget::Selection(None));

        write_back(&mut dom, &operand, "Body text.").unwrap();
        assert_eq!(dom.text_content(before), "header text");
        assert_eq!(dom.text_content(config.anchor), "Body text.");
    }

    #[test]
    fn test_char_helpers_clamp() {
        assert_eq!(char_slice("abc", 1, 10), "bc");
        assert_eq!(char_slice("abc", 5, 2), "");
        assert_eq!(splice_chars("abc", 1, 2, "XY"), "aXYc");
        assert_eq!(splice_chars("abc", 7, 9, "!"), "abc!");
    }
}
