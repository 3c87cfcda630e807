//! Progress-based segment styling.
//!
//! A path is split into consecutive-pair segments, each colored along a
//! fixed green → amber → red gradient by its position in the route. Visual
//! emphasis (opacity/weight) is derived from where a segment sits relative
//! to the progress ratio, which is the next undelivered stop normalized over
//! the total stop count. This is the sole mechanism conveying "where the
//! driver should be" on the map, so the 0.05 tolerance band is contractual.

use crate::models::{LatLng, ResolvedStop, Segment};

/// Route start color (green)
const GRADIENT_START: [u8; 3] = [0x2e, 0xcc, 0x71];
/// Route midpoint color (amber)
const GRADIENT_MID: [u8; 3] = [0xf3, 0x9c, 0x12];
/// Route end color (red)
const GRADIENT_END: [u8; 3] = [0xe7, 0x4c, 0x3c];

/// Tolerance band around the progress ratio marking the active segment
const ACTIVE_BAND: f64 = 0.05;

/// Minimum line weight for the dashed fallback set
const MIN_FALLBACK_WEIGHT: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VisualStyle {
    pub opacity: f64,
    pub weight: u32,
}

/// Already-traversed segments: faded and thin
const TRAVERSED: VisualStyle = VisualStyle {
    opacity: 0.25,
    weight: 3,
};
/// The active/current segment: full emphasis
const ACTIVE: VisualStyle = VisualStyle {
    opacity: 1.0,
    weight: 6,
};
/// Upcoming segments: medium emphasis
const UPCOMING: VisualStyle = VisualStyle {
    opacity: 0.6,
    weight: 4,
};

/// Index of the first stop whose status is neither completed nor failed,
/// or -1 when every stop is terminal
pub fn next_stop_index(stops: &[ResolvedStop]) -> i32 {
    stops
        .iter()
        .position(|stop| !stop.status.is_terminal())
        .map(|index| index as i32)
        .unwrap_or(-1)
}

/// Gradient color for segment `index` of `total_segments`: green at the
/// start, amber at the midpoint, red at the end. A single-segment path gets
/// the fixed midpoint color.
pub fn gradient_color(index: usize, total_segments: usize) -> String {
    if total_segments <= 1 {
        return hex_color(GRADIENT_MID);
    }

    let t = index as f64 / (total_segments - 1) as f64;
    let rgb = if t <= 0.5 {
        lerp_rgb(GRADIENT_START, GRADIENT_MID, t * 2.0)
    } else {
        lerp_rgb(GRADIENT_MID, GRADIENT_END, (t - 0.5) * 2.0)
    };
    hex_color(rgb)
}

/// Progress ratio in [0, 1]: the next stop index normalized over the stop
/// count. Negative `next_stop_index` (all stops terminal) means fully
/// traveled.
pub fn progress_ratio(next_stop_index: i32, total_stops: usize) -> f64 {
    if next_stop_index < 0 {
        return 1.0;
    }
    let denominator = total_stops.saturating_sub(1).max(1) as f64;
    (next_stop_index as f64 / denominator).min(1.0)
}

/// Emphasis for segment `index` of `total_segments` relative to the route's
/// progress. Segments behind the progress ratio are faded, the segment at
/// the ratio (±0.05) is the active one, everything ahead is medium.
pub fn visual_style(
    index: usize,
    total_segments: usize,
    next_stop_index: i32,
    total_stops: usize,
) -> VisualStyle {
    // All stops terminal: the whole path has been traversed
    if next_stop_index < 0 {
        return TRAVERSED;
    }

    let ratio = progress_ratio(next_stop_index, total_stops);
    let position = segment_position(index, total_segments);

    if position < ratio - ACTIVE_BAND {
        TRAVERSED
    } else if (position - ratio).abs() <= ACTIVE_BAND {
        ACTIVE
    } else {
        UPCOMING
    }
}

/// Split a path into styled consecutive-pair segments along the gradient
pub fn styled_segments(path: &[LatLng], next_stop_index: i32, total_stops: usize) -> Vec<Segment> {
    let total_segments = path.len().saturating_sub(1);
    path.windows(2)
        .enumerate()
        .map(|(index, pair)| {
            let style = visual_style(index, total_segments, next_stop_index, total_stops);
            Segment {
                positions: [pair[0], pair[1]],
                color: gradient_color(index, total_segments),
                index,
                opacity: style.opacity,
                weight: style.weight,
                dashed: false,
            }
        })
        .collect()
}

/// Lower-fidelity fallback: dashed straight lines between the raw stop
/// positions, one weight thinner (floored at 2). Always computed so the map
/// can degrade when the routing service fails.
pub fn fallback_segments(
    positions: &[LatLng],
    next_stop_index: i32,
    total_stops: usize,
) -> Vec<Segment> {
    styled_segments(positions, next_stop_index, total_stops)
        .into_iter()
        .map(|mut segment| {
            segment.dashed = true;
            segment.weight = segment.weight.saturating_sub(1).max(MIN_FALLBACK_WEIGHT);
            segment
        })
        .collect()
}

/// Normalized position of a segment along the path
fn segment_position(index: usize, total_segments: usize) -> f64 {
    if total_segments == 0 {
        return 0.0;
    }
    index as f64 / total_segments as f64
}

fn lerp_rgb(from: [u8; 3], to: [u8; 3], t: f64) -> [u8; 3] {
    let t = t.clamp(0.0, 1.0);
    let mut rgb = [0u8; 3];
    for channel in 0..3 {
        let value = from[channel] as f64 + (to[channel] as f64 - from[channel] as f64) * t;
        rgb[channel] = value.round() as u8;
    }
    rgb
}

fn hex_color(rgb: [u8; 3]) -> String {
    format!("#{:02x}{:02x}{:02x}", rgb[0], rgb[1], rgb[2])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DeliveryStatus;

    fn make_stop(id: &str, status: DeliveryStatus) -> ResolvedStop {
        ResolvedStop {
            id: id.to_string(),
            position: [48.37, 10.89],
            client_name: format!("Client {}", id),
            address: "Teststraße 1, 86150 Augsburg".to_string(),
            status,
            sequence_order: None,
        }
    }

    #[test]
    fn next_stop_is_first_non_terminal() {
        let stops = vec![
            make_stop("a", DeliveryStatus::Completed),
            make_stop("b", DeliveryStatus::InProgress),
            make_stop("c", DeliveryStatus::Pending),
        ];
        assert_eq!(next_stop_index(&stops), 1);
    }

    #[test]
    fn next_stop_skips_failed_points() {
        let stops = vec![
            make_stop("a", DeliveryStatus::Completed),
            make_stop("b", DeliveryStatus::Failed),
            make_stop("c", DeliveryStatus::Pending),
        ];
        assert_eq!(next_stop_index(&stops), 2);
    }

    #[test]
    fn next_stop_is_negative_when_all_terminal() {
        let stops = vec![
            make_stop("a", DeliveryStatus::Completed),
            make_stop("b", DeliveryStatus::Failed),
        ];
        assert_eq!(next_stop_index(&stops), -1);
        assert_eq!(next_stop_index(&[]), -1);
    }

    #[test]
    fn path_of_n_points_yields_n_minus_one_segments() {
        let path: Vec<LatLng> = (0..6).map(|i| [48.0 + i as f64 * 0.01, 10.89]).collect();
        let segments = styled_segments(&path, 0, 6);
        assert_eq!(segments.len(), 5);

        // Distinct colors, green at the start, amber at the midpoint, red at
        // the end
        let colors: Vec<_> = segments.iter().map(|s| s.color.as_str()).collect();
        assert_eq!(colors[0], "#2ecc71");
        assert_eq!(colors[2], "#f39c12");
        assert_eq!(colors[4], "#e74c3c");
        let mut unique = colors.clone();
        unique.dedup();
        assert_eq!(unique.len(), colors.len());
    }

    #[test]
    fn single_segment_gets_fixed_color() {
        let segments = styled_segments(&[[48.37, 10.89], [48.38, 10.90]], 0, 2);
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].color, "#f39c12");
    }

    #[test]
    fn segment_at_progress_ratio_is_active() {
        // 3 stops, next stop 1: ratio = 0.5; of 2 segments, the second sits
        // at position 0.5 and must carry full emphasis
        assert_eq!(visual_style(1, 2, 1, 3), ACTIVE);
        // First segment is behind the ratio: traversed
        assert_eq!(visual_style(0, 2, 1, 3), TRAVERSED);
    }

    #[test]
    fn segments_ahead_of_ratio_are_upcoming() {
        // 5 stops, next stop 1: ratio = 0.25; of 4 segments, positions 0.5
        // and 0.75 are ahead
        assert_eq!(visual_style(2, 4, 1, 5), UPCOMING);
        assert_eq!(visual_style(3, 4, 1, 5), UPCOMING);
    }

    #[test]
    fn all_segments_traversed_when_no_next_stop() {
        for index in 0..4 {
            assert_eq!(visual_style(index, 4, -1, 5), TRAVERSED);
        }
    }

    #[test]
    fn progress_ratio_clamps() {
        assert_eq!(progress_ratio(-1, 5), 1.0);
        assert_eq!(progress_ratio(0, 5), 0.0);
        assert_eq!(progress_ratio(4, 5), 1.0);
        assert_eq!(progress_ratio(9, 5), 1.0);
        // Single stop: denominator floored at 1
        assert_eq!(progress_ratio(0, 1), 0.0);
    }

    #[test]
    fn fallback_segments_are_dashed_and_thinner() {
        let positions: Vec<LatLng> = vec![[48.37, 10.89], [48.38, 10.90], [48.39, 10.91]];
        let main = styled_segments(&positions, 1, 3);
        let fallback = fallback_segments(&positions, 1, 3);

        assert_eq!(fallback.len(), main.len());
        for (main_segment, fallback_segment) in main.iter().zip(&fallback) {
            assert!(fallback_segment.dashed);
            assert_eq!(
                fallback_segment.weight,
                main_segment.weight.saturating_sub(1).max(2)
            );
            assert_eq!(fallback_segment.color, main_segment.color);
            assert_eq!(fallback_segment.opacity, main_segment.opacity);
        }
    }

    #[test]
    fn fallback_weight_floors_at_two() {
        // Traversed segments have weight 3; the fallback drops to 2, never 1
        let positions: Vec<LatLng> = vec![[48.37, 10.89], [48.38, 10.90], [48.39, 10.91]];
        let fallback = fallback_segments(&positions, -1, 3);
        assert!(fallback.iter().all(|s| s.weight == 2));
    }
}
