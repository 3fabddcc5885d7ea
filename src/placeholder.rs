//! Placeholder placement and FLIP reflow.
//!
//! During a drag exactly one placeholder node reserves the dragged item's
//! target slot. Every time the slot changes the occupancy plan is rebuilt and
//! written to the host as explicit placements. Items that moved are first
//! shifted back to where they were with an inverse transform, and on the next
//! animation frame the transform is released so the host can slide them home.

use std::collections::BTreeMap;

use tracing::{debug, trace};

use crate::constants::REFLOW_EPSILON;
use crate::debug::{self, Counter};
use crate::geometry::Bounds;
use crate::host::{FrameHandle, GridHost, HostError, NodeId};
use crate::layout::{
    GridCell, GridMetrics, OccupancyPlan, PlanEntry, PlanError, clamp_index_for_span, plan_occupancy,
};

#[derive(Debug, Clone, Copy, PartialEq)]
struct ReflowEntry {
    node: NodeId,
    prev_transform: Option<(f64, f64)>,
    prev_suppressed: bool,
}

#[derive(Debug)]
struct PendingReflow {
    frame: FrameHandle,
    entries: Vec<ReflowEntry>,
}

/// At most one reflow in flight per container.
#[derive(Debug, Default)]
pub struct ReflowAnimation {
    pending: Option<PendingReflow>,
}

impl ReflowAnimation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn frame(&self) -> Option<FrameHandle> {
        self.pending.as_ref().map(|p| p.frame)
    }

    /// Rectangles of `nodes` as laid out right now.
    pub fn measure(host: &dyn GridHost, nodes: &[NodeId]) -> Vec<(NodeId, Bounds)> {
        nodes
            .iter()
            .filter_map(|node| host.bounding_rect(*node).ok().map(|rect| (*node, rect)))
            .collect()
    }

    /// Invert the displacement between `before` and `after` and schedule the
    /// release. Returns how many nodes were animated.
    pub fn play(
        &mut self,
        host: &mut dyn GridHost,
        before: &[(NodeId, Bounds)],
        after: &[(NodeId, Bounds)],
    ) -> usize {
        let previous: BTreeMap<NodeId, Bounds> = before.iter().copied().collect();
        let moved: Vec<(NodeId, f64, f64)> = after
            .iter()
            .filter_map(|(node, rect)| {
                let prev = previous.get(node)?;
                let dx = prev.left - rect.left;
                let dy = prev.top - rect.top;
                (dx.abs() >= REFLOW_EPSILON || dy.abs() >= REFLOW_EPSILON).then_some((*node, dx, dy))
            })
            .collect();
        if moved.is_empty() {
            return 0;
        }
        self.cancel(host);

        let mut entries = Vec::with_capacity(moved.len());
        for (node, dx, dy) in moved {
            let mut style = host.style(node);
            entries.push(ReflowEntry {
                node,
                prev_transform: style.transform,
                prev_suppressed: style.transition_suppressed,
            });
            style.transform = Some((dx, dy));
            style.transition_suppressed = true;
            host.set_style(node, style);
        }
        let count = entries.len();
        let frame = host.request_animation_frame();
        trace!(count, frame = ?frame, "reflow scheduled");
        self.pending = Some(PendingReflow { frame, entries });
        count
    }

    /// Release the inverse transforms if `handle` is ours.
    pub fn on_frame(&mut self, host: &mut dyn GridHost, handle: FrameHandle) -> bool {
        if self.frame() != Some(handle) {
            return false;
        }
        if let Some(pending) = self.pending.take() {
            restore(host, &pending.entries);
        }
        true
    }

    /// Drop the scheduled frame and put styles back immediately.
    pub fn cancel(&mut self, host: &mut dyn GridHost) {
        if let Some(pending) = self.pending.take() {
            host.cancel_animation_frame(pending.frame);
            restore(host, &pending.entries);
        }
    }
}

fn restore(host: &mut dyn GridHost, entries: &[ReflowEntry]) {
    for entry in entries {
        let mut style = host.style(entry.node);
        style.transform = entry.prev_transform;
        style.transition_suppressed = entry.prev_suppressed;
        host.set_style(entry.node, style);
    }
}

/// Owns the placeholder node for one drag session.
#[derive(Debug)]
pub struct PlaceholderRenderer {
    node: NodeId,
    index: usize,
    span: usize,
    plan: Option<OccupancyPlan>,
    saved_placements: BTreeMap<NodeId, Option<GridCell>>,
    reflow: ReflowAnimation,
}

impl PlaceholderRenderer {
    /// Create the placeholder and insert it where `dragged` sits.
    pub fn create(
        host: &mut dyn GridHost,
        container: NodeId,
        dragged: NodeId,
        index: usize,
        span: usize,
        metrics: &GridMetrics,
    ) -> Result<Self, HostError> {
        let node = host.create_placeholder(dragged);
        if let Err(err) = host.insert_before(container, node, Some(dragged)) {
            host.remove_node(node);
            return Err(err);
        }
        if let Ok(rect) = host.bounding_rect(dragged) {
            let mut style = host.style(node);
            style.size = Some((rect.width.round().max(1.0), rect.height.round().max(1.0)));
            style.pointer_events_disabled = true;
            host.set_style(node, style);
        }
        Ok(Self {
            node,
            index,
            span: span.clamp(1, metrics.columns.max(1)),
            plan: None,
            saved_placements: BTreeMap::new(),
            reflow: ReflowAnimation::new(),
        })
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn span(&self) -> usize {
        self.span
    }

    pub fn plan(&self) -> Option<&OccupancyPlan> {
        self.plan.as_ref()
    }

    pub fn reflow(&self) -> &ReflowAnimation {
        &self.reflow
    }

    /// Plan entries for `items` with the placeholder spliced in at its index.
    fn entries(&self, items: &[NodeId], spans: &BTreeMap<NodeId, usize>) -> Vec<PlanEntry> {
        let mut entries: Vec<PlanEntry> = items
            .iter()
            .map(|node| PlanEntry::node(*node, spans.get(node).copied().unwrap_or(1)))
            .collect();
        let at = self.index.min(entries.len());
        entries.insert(at, PlanEntry::placeholder(self.span));
        entries
    }

    /// Rebuild the plan and write it to the placeholder and every item.
    pub fn replan(
        &mut self,
        host: &mut dyn GridHost,
        items: &[NodeId],
        spans: &BTreeMap<NodeId, usize>,
        metrics: &GridMetrics,
    ) -> Result<&OccupancyPlan, PlanError> {
        let plan = plan_occupancy(&self.entries(items, spans), metrics.columns)?;
        let mut style = host.style(self.node);
        style.placement = plan.placeholder;
        host.set_style(self.node, style);
        for (node, cell) in &plan.nodes {
            let mut style = host.style(*node);
            self.saved_placements.entry(*node).or_insert(style.placement);
            style.placement = Some(*cell);
            host.set_style(*node, style);
        }
        Ok(self.plan.insert(plan))
    }

    /// Move the placeholder toward `target`. `items` are the container's
    /// items in document order, dragged item and placeholder excluded.
    ///
    /// Returns the settled item rectangles (measured before the inverse
    /// transforms go on) when the placeholder moved, `None` otherwise.
    pub fn move_to(
        &mut self,
        host: &mut dyn GridHost,
        container: NodeId,
        target: usize,
        items: &[NodeId],
        spans: &BTreeMap<NodeId, usize>,
        metrics: &GridMetrics,
    ) -> Result<Option<Vec<(NodeId, Bounds)>>, HostError> {
        let total = items.len();
        let clamped = clamp_index_for_span(target.min(total), metrics.columns, self.span, total);
        if clamped == self.index {
            return Ok(None);
        }

        self.reflow.cancel(host);
        let before = ReflowAnimation::measure(&*host, items);
        host.insert_before(container, self.node, items.get(clamped).copied())?;
        debug::bump(Counter::Swaps);
        trace!(from = self.index, to = clamped, "placeholder moved");
        self.index = clamped;

        if let Err(err) = self.replan(host, items, spans, metrics) {
            debug!(error = %err, "occupancy plan failed");
        }
        let after = ReflowAnimation::measure(&*host, items);
        self.reflow.play(host, &before, &after);
        Ok(Some(after))
    }

    pub fn on_frame(&mut self, host: &mut dyn GridHost, handle: FrameHandle) -> bool {
        self.reflow.on_frame(host, handle)
    }

    /// Cancel any reflow, restore item placements and take the placeholder
    /// out of the document. `dragged` is inserted where the placeholder was
    /// when given.
    pub fn teardown(self, host: &mut dyn GridHost, container: NodeId, dragged: Option<NodeId>) {
        let PlaceholderRenderer {
            node,
            saved_placements,
            mut reflow,
            ..
        } = self;
        reflow.cancel(host);
        for (item, placement) in saved_placements {
            let mut style = host.style(item);
            style.placement = placement;
            host.set_style(item, style);
        }
        if let Some(dragged) = dragged
            && let Err(err) = host.insert_before(container, dragged, Some(node))
        {
            debug!(error = %err, "failed to drop item at placeholder");
        }
        host.remove_node(node);
    }
}
