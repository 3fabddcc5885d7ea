//! Per-container drag session state.
//!
//! ```text
//! Idle --press on handle--> Pending --moved >= threshold--> Dragging
//!   ^                          |                               |
//!   +------ release/cancel ----+------ commit / cancel --------+
//! ```

use std::collections::BTreeMap;

use crate::constants::DRAG_DISTANCE_THRESHOLD;
use crate::geometry::Bounds;
use crate::host::{NodeId, NodeStyle};
use crate::layout::GridMetrics;
use crate::meta::ItemMeta;
use crate::placeholder::PlaceholderRenderer;

/// A press on a handle that has not yet moved far enough to be a drag.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PendingDrag {
    pub pointer_id: u32,
    pub item: NodeId,
    pub handle: NodeId,
    pub start_x: f64,
    pub start_y: f64,
    pub captured: bool,
}

impl PendingDrag {
    pub fn exceeds_threshold(&self, x: f64, y: f64) -> bool {
        (x - self.start_x).abs() >= DRAG_DISTANCE_THRESHOLD
            || (y - self.start_y).abs() >= DRAG_DISTANCE_THRESHOLD
    }
}

#[derive(Debug)]
pub struct ActiveDrag {
    pub pointer_id: u32,
    pub item: NodeId,
    pub handle: NodeId,
    pub captured: bool,
    /// Ids in document order when the drag started, for revert.
    pub start_order: Vec<String>,
    pub start_index: usize,
    /// Frozen for the whole session.
    pub metrics: GridMetrics,
    pub item_rect: Bounds,
    /// Item position relative to the container at drag start.
    pub elem_start: (f64, f64),
    /// Pointer position at drag start.
    pub origin: (f64, f64),
    pub grab_offset: (f64, f64),
    pub prev_style: NodeStyle,
    pub spans: BTreeMap<NodeId, usize>,
    pub items_meta: Vec<ItemMeta>,
    pub placeholder: PlaceholderRenderer,
}

impl ActiveDrag {
    /// Grid-snapped translation for a pointer at (`x`, `y`), and the raw
    /// item position it was derived from.
    pub fn translation_for(&self, x: f64, y: f64) -> ((f64, f64), (f64, f64)) {
        let raw_x = self.elem_start.0 + (x - self.origin.0);
        let raw_y = self.elem_start.1 + (y - self.origin.1);
        let tx = snap_translation(raw_x, self.elem_start.0, self.metrics.step_x);
        let ty = snap_translation(raw_y, self.elem_start.1, self.metrics.step_y);
        ((tx, ty), (raw_x, raw_y))
    }
}

#[derive(Debug, Default)]
pub enum DragPhase {
    #[default]
    Idle,
    Pending(PendingDrag),
    Dragging(Box<ActiveDrag>),
}

impl DragPhase {
    pub fn is_idle(&self) -> bool {
        matches!(self, DragPhase::Idle)
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, DragPhase::Pending(_))
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self, DragPhase::Dragging(_))
    }

    pub fn pointer_id(&self) -> Option<u32> {
        match self {
            DragPhase::Idle => None,
            DragPhase::Pending(p) => Some(p.pointer_id),
            DragPhase::Dragging(d) => Some(d.pointer_id),
        }
    }

    pub fn active(&self) -> Option<&ActiveDrag> {
        match self {
            DragPhase::Dragging(d) => Some(&**d),
            _ => None,
        }
    }

    pub fn active_mut(&mut self) -> Option<&mut ActiveDrag> {
        match self {
            DragPhase::Dragging(d) => Some(&mut **d),
            _ => None,
        }
    }
}

/// Translation that keeps a dragged item aligned to the grid step.
pub fn snap_translation(raw: f64, start: f64, step: f64) -> f64 {
    let step = if step.is_finite() && step > 0.0 { step } else { 1.0 };
    (raw / step).round() * step - start
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn threshold_is_inclusive_on_either_axis() {
        let pending = PendingDrag {
            pointer_id: 1,
            item: NodeId(1),
            handle: NodeId(2),
            start_x: 10.0,
            start_y: 10.0,
            captured: false,
        };
        assert!(!pending.exceeds_threshold(14.9, 14.9));
        assert!(!pending.exceeds_threshold(6.0, 13.0));
        assert!(pending.exceeds_threshold(15.0, 10.0));
        assert!(pending.exceeds_threshold(10.0, 4.0));
    }

    #[test]
    fn translation_snaps_to_step() {
        assert_eq!(snap_translation(0.0, 0.0, 110.0), 0.0);
        assert_eq!(snap_translation(50.0, 0.0, 110.0), 0.0);
        assert_eq!(snap_translation(60.0, 0.0, 110.0), 110.0);
        assert_eq!(snap_translation(250.0, 110.0, 110.0), 110.0);
        assert_eq!(snap_translation(7.0, 0.0, 0.0), 7.0);
    }

    #[test]
    fn phase_accessors() {
        let phase = DragPhase::default();
        assert!(phase.is_idle());
        assert_eq!(phase.pointer_id(), None);
        let pending = DragPhase::Pending(PendingDrag {
            pointer_id: 4,
            item: NodeId(1),
            handle: NodeId(1),
            start_x: 0.0,
            start_y: 0.0,
            captured: true,
        });
        assert!(pending.is_pending());
        assert_eq!(pending.pointer_id(), Some(4));
        assert!(pending.active().is_none());
    }
}
