//! Map viewport derivation.
//!
//! Center and zoom are derived from the axis-aligned bounds of all supplied
//! positions; the driver position is included by the caller when known. Zoom
//! thresholds are checked in ascending order and the last match wins, so a
//! larger range always overrides a smaller-range zoom choice.

use crate::models::{LatLng, Viewport};

/// Default close zoom used when the points span a small area
const DEFAULT_ZOOM: u8 = 13;

/// (range threshold, zoom) pairs, ascending. A range larger than a threshold
/// selects that zoom; later matches override earlier ones.
const ZOOM_THRESHOLDS: [(f64, u8); 5] = [(0.2, 10), (0.5, 9), (1.0, 8), (2.0, 7), (5.0, 6)];

/// Compute the viewport covering every supplied position. `None` when there
/// is nothing to show.
pub fn compute_bounds(positions: &[LatLng]) -> Option<Viewport> {
    let first = positions.first()?;

    let mut min = *first;
    let mut max = *first;
    for position in &positions[1..] {
        min[0] = min[0].min(position[0]);
        min[1] = min[1].min(position[1]);
        max[0] = max[0].max(position[0]);
        max[1] = max[1].max(position[1]);
    }

    let center = [(min[0] + max[0]) / 2.0, (min[1] + max[1]) / 2.0];
    let range = (max[0] - min[0]).max(max[1] - min[1]);

    let mut zoom = DEFAULT_ZOOM;
    for (threshold, level) in ZOOM_THRESHOLDS {
        if range > threshold {
            zoom = level;
        }
    }

    Some(Viewport { center, zoom })
}
