//! Overlay placement relative to its anchor
//!
//! Positions are document coordinates: the anchor's viewport rect plus the
//! page scroll offsets, so the absolutely positioned container stays glued to
//! the anchor while the page scrolls.

use tracing::trace;

use crate::dom::{Dom, NodeId};
use crate::settings::{ButtonPosition, EffectiveSettings};
use crate::types::{Point, Rect};

/// Document coordinates of the overlay's top-left corner
pub fn compute_position(anchor: Rect, scroll: Point, settings: &EffectiveSettings) -> Point {
    let offset_x = f64::from(settings.offset_x);
    let offset_y = f64::from(settings.offset_y);
    let size = f64::from(settings.button_size);

    let (x, y) = match settings.button_position {
        ButtonPosition::BottomRight => (anchor.right() + offset_x, anchor.bottom() + offset_y),
        ButtonPosition::Right => (anchor.right() + offset_x, anchor.top() + offset_y),
        ButtonPosition::Left => (anchor.left() - size - offset_x.abs(), anchor.top() + offset_y),
        ButtonPosition::Top => (anchor.center_x() - size / 2.0, anchor.top() - size - offset_y.abs()),
        ButtonPosition::Bottom => (anchor.center_x() - size / 2.0, anchor.bottom() + offset_y),
    };
    Point::new(x + scroll.x, y + scroll.y)
}

/// Read the anchor's current box and move `overlay` next to it
pub fn reposition<D: Dom + ?Sized>(
    dom: &mut D,
    overlay: NodeId,
    anchor: NodeId,
    settings: &EffectiveSettings,
) -> Point {
    let position = compute_position(dom.bounding_rect(anchor), dom.scroll_offset(), settings);
    dom.set_style(overlay, "left", &format!("{}px", position.x));
    dom.set_style(overlay, "top", &format!("{}px", position.y));
    trace!(overlay = overlay.0, anchor = anchor.0, x = position.x, y = position.y, "Repositioned overlay");
    position
}
