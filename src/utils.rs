//! Utility functions for region geometry and numeric conversions.

pub mod safe_cast;

use opencv::core::Rect;
use safe_cast::f32_to_i32_clamp;

/// Expand a face box by `shift` of its size on every side, square it, and fit it into the frame
///
/// The mesh model expects some context around the face and a square input.
/// Returns `None` when the frame is empty or the box lies entirely outside it.
#[must_use]
#[allow(clippy::cast_precision_loss)] // Precision loss acceptable for box dimensions
pub fn refine_box(bbox: Rect, max_width: i32, max_height: i32, shift: f32) -> Option<Rect> {
    if max_width <= 0 || max_height <= 0 || bbox.width <= 0 || bbox.height <= 0 {
        return None;
    }

    let x_shift = f32_to_i32_clamp(bbox.width as f32 * shift, 0, max_width);
    let y_shift = f32_to_i32_clamp(bbox.height as f32 * shift, 0, max_height);

    // Square around the expanded box center, capped by the smaller frame side
    let width = bbox.width + 2 * x_shift;
    let height = bbox.height + 2 * y_shift;
    let side = width.max(height).min(max_width).min(max_height);
    let center_x = bbox.x + bbox.width / 2;
    let center_y = bbox.y + bbox.height / 2;

    let x = (center_x - side / 2).clamp(0, max_width - side);
    let y = (center_y - side / 2).clamp(0, max_height - side);
    let refined = Rect::new(x, y, side, side);

    let overlaps = bbox.x < max_width && bbox.y < max_height && bbox.x + bbox.width > 0 && bbox.y + bbox.height > 0;
    overlaps.then_some(refined)
}
