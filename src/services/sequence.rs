//! Manually-editable stop ordering for a route.
//!
//! Ordering is independent of geocoding: every operation works on the
//! delivery points as loaded from the backend. Rendering always sorts by
//! `sequence_order` ascending with unordered points last, ties broken by
//! client name for determinism.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use utoipa::ToSchema;

use crate::models::DeliveryPoint;

/// Projection of one point's ordering state for submission to the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SequenceUpdate {
    pub id: String,
    pub sequence_order: Option<u32>,
    pub is_start_point: bool,
    pub is_end_point: bool,
}

/// Move a point between two positions (swap-based move up/down), then
/// renumber every point to its new 0-based index. Out-of-range indices are
/// ignored.
pub fn reorder(points: &mut [DeliveryPoint], from: usize, to: usize) {
    if from >= points.len() || to >= points.len() || from == to {
        return;
    }
    points.swap(from, to);
    renumber(points);
}

/// Toggle the start-point flag on the given point. At most one point holds
/// the flag: setting a new start point clears any previous holder, and
/// re-invoking on the current holder clears it.
pub fn set_start(points: &mut [DeliveryPoint], point_id: &str) {
    toggle_single_flag(points, point_id, |p| &mut p.is_start_point);
}

/// Symmetric to [`set_start`] for the end-point flag
pub fn set_end(points: &mut [DeliveryPoint], point_id: &str) {
    toggle_single_flag(points, point_id, |p| &mut p.is_end_point);
}

fn toggle_single_flag<F>(points: &mut [DeliveryPoint], point_id: &str, mut flag: F)
where
    F: FnMut(&mut DeliveryPoint) -> &mut bool,
{
    let was_set = points
        .iter_mut()
        .find(|p| p.id == point_id)
        .map(|p| *flag(p))
        .unwrap_or(false);

    for point in points.iter_mut() {
        let value = point.id == point_id && !was_set;
        *flag(point) = value;
    }
}

/// Restore `sequence_order` to the original array index and clear both
/// start/end flags on all points
pub fn reset(points: &mut [DeliveryPoint]) {
    for (index, point) in points.iter_mut().enumerate() {
        point.sequence_order = Some(index as u32);
        point.is_start_point = false;
        point.is_end_point = false;
    }
}

/// Sort points for rendering: `sequence_order` ascending, points without an
/// explicit order last, ties broken by client name
pub fn sort_for_rendering(points: &mut [DeliveryPoint]) {
    points.sort_by(|a, b| match (a.sequence_order, b.sequence_order) {
        (Some(x), Some(y)) => x.cmp(&y).then_with(|| a.client_name.cmp(&b.client_name)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.client_name.cmp(&b.client_name),
    });
}

/// Projection sent to the backend when persisting the manual ordering
pub fn persistable_payload(points: &[DeliveryPoint]) -> Vec<SequenceUpdate> {
    points
        .iter()
        .map(|p| SequenceUpdate {
            id: p.id.clone(),
            sequence_order: p.sequence_order,
            is_start_point: p.is_start_point,
            is_end_point: p.is_end_point,
        })
        .collect()
}

fn renumber(points: &mut [DeliveryPoint]) {
    for (index, point) in points.iter_mut().enumerate() {
        point.sequence_order = Some(index as u32);
    }
}
