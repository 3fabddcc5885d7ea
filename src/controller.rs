//! The draggable grid controller.
//!
//! One `DraggableGrid` drives one container. It never owns the host: every
//! entry point borrows a `&mut dyn GridHost`, and pointer input arrives
//! through [`DraggableGrid::handle_event`]. Public methods never fail; host
//! and storage errors are logged and the affected step is skipped.

use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use thiserror::Error;
use tracing::{debug, trace, warn};

use crate::constants::{
    DEFAULT_GAP, DRAG_OPACITY, DRAG_Z_INDEX, PLACEHOLDER_SELECTOR, TAG_ACTIVE, TAG_PENDING, TAG_POINTER_DOWN,
};
use crate::debug::{self, Counter, Diagnostics};
use crate::drag::{ActiveDrag, DragPhase, PendingDrag};
use crate::geometry::Bounds;
use crate::host::{
    ContainerFlag, FrameHandle, GridHost, GridOverlay, NodeId, NodeStyle, PointerEvent, PointerPhase,
    parse_selectors,
};
use crate::layout::{
    GridMetrics, GridOptions, OccupancyPlan, PlanEntry, PlanError, derive_metrics, plan_occupancy,
    resolve_span, unit_reference,
};
use crate::listeners::{ListenerKind, ListenerRegistry};
use crate::meta::{capture_items_meta, index_for_pointer, index_from_grid, items_meta_from_rects};
use crate::order::{IdGetter, IdResolver, apply_order, normalize_id, order_signature};
use crate::placeholder::PlaceholderRenderer;
use crate::store::{OrderStore, read_stored_order, write_stored_order};

pub type OrderCallback = Box<dyn FnMut(&[String])>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("an item selector is required")]
    MissingItemSelector,
    #[error("a handle selector is required")]
    MissingHandleSelector,
    #[error("a storage key is required")]
    MissingStorageKey,
}

/// Construction options for a [`DraggableGrid`].
pub struct GridConfig {
    pub container: NodeId,
    pub item_selector: String,
    pub handle_selector: String,
    pub storage_key: String,
    pub grid: GridOptions,
    pub id_getter: Option<IdGetter>,
    pub on_order_change: Option<OrderCallback>,
    pub enabled: bool,
}

impl fmt::Debug for GridConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GridConfig")
            .field("container", &self.container)
            .field("item_selector", &self.item_selector)
            .field("handle_selector", &self.handle_selector)
            .field("storage_key", &self.storage_key)
            .field("grid", &self.grid)
            .field("id_getter", &self.id_getter.is_some())
            .field("on_order_change", &self.on_order_change.is_some())
            .field("enabled", &self.enabled)
            .finish()
    }
}

impl GridConfig {
    pub fn new(
        container: NodeId,
        item_selector: impl Into<String>,
        handle_selector: impl Into<String>,
        storage_key: impl Into<String>,
    ) -> Self {
        Self {
            container,
            item_selector: item_selector.into(),
            handle_selector: handle_selector.into(),
            storage_key: storage_key.into(),
            grid: GridOptions::default(),
            id_getter: None,
            on_order_change: None,
            enabled: true,
        }
    }

    pub fn with_grid(mut self, grid: GridOptions) -> Self {
        self.grid = grid;
        self
    }

    pub fn with_id_getter(mut self, getter: IdGetter) -> Self {
        self.id_getter = Some(getter);
        self
    }

    pub fn with_order_callback(mut self, callback: impl FnMut(&[String]) + 'static) -> Self {
        self.on_order_change = Some(Box::new(callback));
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.item_selector.trim().is_empty() {
            return Err(ConfigError::MissingItemSelector);
        }
        if parse_selectors(&self.handle_selector).is_empty() {
            return Err(ConfigError::MissingHandleSelector);
        }
        if self.storage_key.trim().is_empty() {
            return Err(ConfigError::MissingStorageKey);
        }
        Ok(())
    }
}

pub struct DraggableGrid {
    container: NodeId,
    item_selector: String,
    handle_selectors: Vec<String>,
    storage_key: String,
    grid: GridOptions,
    resolver: IdResolver,
    on_order_change: Option<OrderCallback>,
    store: Rc<dyn OrderStore>,
    enabled: bool,
    edit_mode_requested: bool,
    edit_mode_active: bool,
    phase: DragPhase,
    overlay_metrics: Option<GridMetrics>,
    last_order_signature: Option<String>,
    applied_initial_order: bool,
    flow_placements: bool,
    listeners: ListenerRegistry,
    diagnostics: Diagnostics,
    destroyed: bool,
}

impl fmt::Debug for DraggableGrid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DraggableGrid")
            .field("container", &self.container)
            .field("item_selector", &self.item_selector)
            .field("storage_key", &self.storage_key)
            .field("enabled", &self.enabled)
            .field("edit_mode_active", &self.edit_mode_active)
            .field("phase", &self.phase)
            .field("last_order_signature", &self.last_order_signature)
            .finish_non_exhaustive()
    }
}

impl DraggableGrid {
    /// Configure a grid. Returns `None` when a required option is missing;
    /// nothing is attached to the host in that case.
    pub fn new(
        host: &mut dyn GridHost,
        store: Rc<dyn OrderStore>,
        config: GridConfig,
    ) -> Option<Self> {
        if let Err(err) = config.validate() {
            debug!(container = ?config.container, error = %err, "grid not configured");
            return None;
        }
        let mut grid = Self {
            container: config.container,
            item_selector: String::new(),
            handle_selectors: Vec::new(),
            storage_key: String::new(),
            grid: GridOptions::default(),
            resolver: IdResolver::default(),
            on_order_change: None,
            store: Rc::clone(&store),
            enabled: true,
            edit_mode_requested: false,
            edit_mode_active: false,
            phase: DragPhase::Idle,
            overlay_metrics: None,
            last_order_signature: None,
            applied_initial_order: false,
            flow_placements: false,
            listeners: ListenerRegistry::new(),
            diagnostics: Diagnostics::default(),
            destroyed: false,
        };
        grid.configure(host, store, config).ok()?;
        Some(grid)
    }

    /// Apply a new configuration to existing state. Listeners already
    /// attached stay attached.
    pub fn configure(
        &mut self,
        host: &mut dyn GridHost,
        store: Rc<dyn OrderStore>,
        config: GridConfig,
    ) -> Result<(), ConfigError> {
        config.validate()?;
        if !self.phase.is_idle() {
            // settle against the old container and store before swapping them
            self.cancel_drag(host, false);
        }
        self.container = config.container;
        self.item_selector = config.item_selector.trim().to_string();
        self.handle_selectors = parse_selectors(&config.handle_selector);
        self.storage_key = config.storage_key.trim().to_string();
        self.grid = config.grid;
        self.resolver = IdResolver::new(config.id_getter);
        self.on_order_change = config.on_order_change;
        self.store = store;
        self.enabled = config.enabled;
        self.destroyed = false;

        if self
            .listeners
            .attach_once(self.container, ListenerKind::PointerDown, TAG_POINTER_DOWN)
        {
            trace!(container = ?self.container, "pointer-down listener attached");
        }
        host.set_container_flag(self.container, ContainerFlag::Bound, true);
        self.apply_stored_order(host, true);
        self.edit_mode_active = false;
        self.apply_edit_mode(host, self.enabled);
        debug!(
            container = ?self.container,
            storage_key = %self.storage_key,
            enabled = self.enabled,
            "grid configured"
        );
        Ok(())
    }

    pub fn container(&self) -> NodeId {
        self.container
    }

    pub fn storage_key(&self) -> &str {
        &self.storage_key
    }

    pub fn phase(&self) -> &DragPhase {
        &self.phase
    }

    pub fn is_dragging(&self) -> bool {
        self.phase.is_dragging()
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    pub fn edit_mode_active(&self) -> bool {
        self.edit_mode_active
    }

    pub fn grid_options(&self) -> &GridOptions {
        &self.grid
    }

    pub fn last_order_signature(&self) -> Option<&str> {
        self.last_order_signature.as_deref()
    }

    pub fn applied_initial_order(&self) -> bool {
        self.applied_initial_order
    }

    /// Metrics of the running drag, else the ones last shown by the overlay.
    pub fn metrics(&self) -> Option<GridMetrics> {
        self.phase
            .active()
            .map(|active| active.metrics)
            .or(self.overlay_metrics)
    }

    pub fn placeholder_index(&self) -> Option<usize> {
        self.phase.active().map(|active| active.placeholder.index())
    }

    pub fn placeholder_node(&self) -> Option<NodeId> {
        self.phase.active().map(|active| active.placeholder.node())
    }

    pub fn occupancy_plan(&self) -> Option<&OccupancyPlan> {
        self.phase
            .active()
            .and_then(|active| active.placeholder.plan())
    }

    pub fn dragged_item(&self) -> Option<NodeId> {
        self.phase.active().map(|active| active.item)
    }

    pub fn diagnostics(&self) -> Diagnostics {
        Diagnostics {
            listeners_active: self.listeners.len(),
            listeners_attached_total: self.listeners.attached_total(),
            ..self.diagnostics
        }
    }

    pub fn listeners(&self) -> &ListenerRegistry {
        &self.listeners
    }

    /// Ids of the container's items in document order.
    pub fn current_order(&self, host: &dyn GridHost) -> Vec<String> {
        self.collect_items(host, None)
            .into_iter()
            .filter_map(|node| self.resolver.resolve(host, node))
            .collect()
    }

    pub fn enable(&mut self, host: &mut dyn GridHost) {
        if self.destroyed {
            return;
        }
        self.enabled = true;
        self.apply_edit_mode(host, self.edit_mode_requested);
    }

    /// Cancels any pending or active drag without committing.
    pub fn disable(&mut self, host: &mut dyn GridHost) {
        if self.phase.is_dragging() {
            self.cancel_drag(host, false);
        } else {
            self.clear_pending(host);
        }
        self.enabled = false;
        self.apply_edit_mode(host, self.edit_mode_requested);
    }

    pub fn refresh(&mut self, host: &mut dyn GridHost) {
        self.apply_stored_order(host, true);
        self.sync_overlay(host);
    }

    pub fn reapply(&mut self, host: &mut dyn GridHost) {
        self.refresh(host);
    }

    pub fn set_edit_mode(&mut self, host: &mut dyn GridHost, on: bool) {
        self.apply_edit_mode(host, on);
    }

    pub fn set_grid(&mut self, host: &mut dyn GridHost, options: GridOptions) {
        self.grid = options;
        self.overlay_metrics = None;
        self.sync_overlay(host);
    }

    /// Tear everything down. Returns false when already destroyed.
    pub fn destroy(&mut self, host: &mut dyn GridHost) -> bool {
        if self.destroyed {
            return false;
        }
        self.cancel_drag(host, false);
        self.overlay_metrics = None;
        self.edit_mode_requested = false;
        self.edit_mode_active = false;
        host.set_overlay(self.container, None);
        host.set_container_flag(self.container, ContainerFlag::Dragging, false);
        host.set_container_flag(self.container, ContainerFlag::GridlinesVisible, false);
        host.set_container_flag(self.container, ContainerFlag::Bound, false);
        let removed = self.listeners.clear();
        self.enabled = false;
        self.destroyed = true;
        debug!(container = ?self.container, listeners = removed, "grid destroyed");
        true
    }

    /// Reorder from the persisted order. Without `force`, an order whose
    /// signature was already applied is skipped.
    pub fn apply_stored_order(&mut self, host: &mut dyn GridHost, force: bool) {
        if self.phase.is_dragging() {
            return;
        }
        let stored = read_stored_order(&*self.store, &self.storage_key);
        if stored.is_empty() {
            if force {
                let current = self.current_order(&*host);
                if !current.is_empty() {
                    self.last_order_signature = Some(order_signature(&current));
                }
            }
            self.applied_initial_order = true;
            debug::record_widgets(&self.current_order(&*host));
            return;
        }
        let normalized: Vec<String> = stored.iter().filter_map(|id| normalize_id(id)).collect();
        let signature = order_signature(&normalized);
        if !force && self.last_order_signature.as_deref() == Some(signature.as_str()) {
            return;
        }
        let applied = self.reorder(host, &normalized);
        trace!(stored = %signature, applied = applied.len(), "stored order applied");
        self.applied_initial_order = true;
        debug::record_widgets(&applied);
    }

    /// Recompute the occupancy plan and write it straight to the host, e.g.
    /// after the container was resized. Bumps the debug resize counter.
    pub fn reflow(&mut self, host: &mut dyn GridHost) -> Option<OccupancyPlan> {
        debug::bump(Counter::Resized);
        if let Some(item) = self.dragged_item() {
            let items = self.collect_items(&*host, Some(item));
            let active = self.phase.active_mut()?;
            let metrics = active.metrics;
            return match active.placeholder.replan(host, &items, &active.spans, &metrics) {
                Ok(plan) => Some(plan.clone()),
                Err(err) => {
                    warn!(error = %err, "reflow failed");
                    None
                }
            };
        }
        self.overlay_metrics = None;
        let metrics = self.derive_metrics(&*host, None)?;
        match self.apply_flow_plan(host, &metrics) {
            Ok(plan) => {
                self.flow_placements = true;
                Some(plan)
            }
            Err(err) => {
                warn!(error = %err, "reflow failed");
                None
            }
        }
    }

    /// Feed one pointer event. Returns whether this grid consumed it.
    pub fn handle_event(&mut self, host: &mut dyn GridHost, event: &PointerEvent) -> bool {
        if self.destroyed {
            return false;
        }
        match event.phase {
            PointerPhase::Down => self.on_pointer_down(host, event),
            PointerPhase::Move => self.on_pointer_move(host, event),
            PointerPhase::Up => self.on_pointer_up(host, event),
            PointerPhase::Cancel => self.on_pointer_cancel(host, event),
        }
    }

    /// Deliver an animation frame. Returns whether it belonged to this grid.
    pub fn on_animation_frame(&mut self, host: &mut dyn GridHost, handle: FrameHandle) -> bool {
        match self.phase.active_mut() {
            Some(active) => active.placeholder.on_frame(host, handle),
            None => false,
        }
    }

    fn on_pointer_down(&mut self, host: &mut dyn GridHost, event: &PointerEvent) -> bool {
        if !self
            .listeners
            .is_attached(self.container, ListenerKind::PointerDown, TAG_POINTER_DOWN)
        {
            return false;
        }
        if !self.phase.is_idle() || !self.enabled || !event.is_primary() {
            return false;
        }
        let Some(target) = event.target else {
            return false;
        };
        if !host.contains(self.container, target) || host.within_interactive(target) {
            return false;
        }
        let Some(item) = host.closest(target, &self.item_selector) else {
            return false;
        };
        if item == self.container || !host.contains(self.container, item) {
            return false;
        }
        if self.resolver.resolve(&*host, item).is_none() {
            trace!(item = ?item, "item has no id");
            return false;
        }
        let handle = self.first_handle_for(&*host, item);
        if !host.contains(handle, target) {
            return false;
        }

        let captured = match host.set_pointer_capture(handle, event.pointer_id) {
            Ok(()) => true,
            Err(err) => {
                trace!(error = %err, "pending drag continues without capture");
                false
            }
        };
        for kind in ListenerKind::SESSION {
            self.listeners.attach_once(handle, kind, TAG_PENDING);
        }
        self.phase = DragPhase::Pending(PendingDrag {
            pointer_id: event.pointer_id,
            item,
            handle,
            start_x: event.x,
            start_y: event.y,
            captured,
        });
        trace!(item = ?item, pointer = event.pointer_id, "drag pending");
        true
    }

    /// Whether the running session still listens for `kind`.
    fn session_listens(&self, kind: ListenerKind) -> bool {
        match &self.phase {
            DragPhase::Idle => false,
            DragPhase::Pending(pending) => {
                self.listeners.is_attached(pending.handle, kind, TAG_PENDING)
            }
            DragPhase::Dragging(active) => self.listeners.is_attached(active.item, kind, TAG_ACTIVE),
        }
    }

    fn on_pointer_move(&mut self, host: &mut dyn GridHost, event: &PointerEvent) -> bool {
        if !self.session_listens(ListenerKind::PointerMove) {
            return false;
        }
        match &self.phase {
            DragPhase::Idle => false,
            DragPhase::Pending(pending) => {
                if pending.pointer_id != event.pointer_id {
                    return false;
                }
                let pending = *pending;
                if !pending.exceeds_threshold(event.x, event.y) {
                    return true;
                }
                self.clear_pending(host);
                if self.begin_drag(host, &pending) {
                    self.drag_move(host, event);
                }
                true
            }
            DragPhase::Dragging(active) => {
                if active.pointer_id != event.pointer_id {
                    return false;
                }
                self.drag_move(host, event);
                true
            }
        }
    }

    fn on_pointer_up(&mut self, host: &mut dyn GridHost, event: &PointerEvent) -> bool {
        if self.phase.pointer_id() != Some(event.pointer_id)
            || !self.session_listens(ListenerKind::PointerUp)
        {
            return false;
        }
        if self.phase.is_pending() {
            self.clear_pending(host);
        } else {
            self.finish_drag(host, true);
        }
        true
    }

    fn on_pointer_cancel(&mut self, host: &mut dyn GridHost, event: &PointerEvent) -> bool {
        if self.phase.pointer_id() != Some(event.pointer_id)
            || !self.session_listens(ListenerKind::PointerCancel)
        {
            return false;
        }
        self.cancel_drag(host, false);
        true
    }

    /// Items of this container in document order. Placeholders and `skip`
    /// are left out.
    fn collect_items(&self, host: &dyn GridHost, skip: Option<NodeId>) -> Vec<NodeId> {
        host.query_all(self.container, &self.item_selector)
            .into_iter()
            .filter(|node| Some(*node) != skip && *node != self.container)
            .filter(|node| !host.matches(*node, PLACEHOLDER_SELECTOR))
            .collect()
    }

    fn first_handle_for(&self, host: &dyn GridHost, item: NodeId) -> NodeId {
        let sized = |node: NodeId| host.bounding_rect(node).is_ok_and(|rect| rect.has_area());
        for selector in &self.handle_selectors {
            if let Some(candidate) = host.query_first(item, selector)
                && sized(candidate)
            {
                return candidate;
            }
        }
        host.children(item)
            .into_iter()
            .find(|child| sized(*child))
            .unwrap_or(item)
    }

    /// Single-column rectangle measured off `node`.
    fn reference_rect(&self, host: &dyn GridHost, node: NodeId) -> Option<Bounds> {
        let rect = host.bounding_rect(node).ok()?;
        let span = host.declared_span(node).unwrap_or(1);
        let gap = self
            .grid
            .gap
            .or_else(|| host.inferred_gap(node))
            .filter(|gap| gap.is_finite() && *gap >= 0.0)
            .unwrap_or(DEFAULT_GAP);
        Some(unit_reference(rect, span, gap))
    }

    /// Metrics measured against `reference`, or against the first
    /// single-column item when there is none.
    fn derive_metrics(&self, host: &dyn GridHost, reference: Option<NodeId>) -> Option<GridMetrics> {
        let container_rect = match host.bounding_rect(self.container) {
            Ok(rect) => rect,
            Err(err) => {
                debug!(container = ?self.container, error = %err, "container has no geometry");
                return None;
            }
        };
        let items = self.collect_items(host, None);
        let first = items.first().copied();
        let reference = reference
            .and_then(|node| self.reference_rect(host, node))
            .or_else(|| {
                items
                    .iter()
                    .copied()
                    .find(|node| host.declared_span(*node).is_none_or(|span| span <= 1))
                    .or(first)
                    .and_then(|node| self.reference_rect(host, node))
            });
        let gap = first.and_then(|node| host.inferred_gap(node));
        let metrics = derive_metrics(&self.grid, container_rect, reference, gap);
        debug::record_columns(metrics.columns);
        Some(metrics)
    }

    fn spans_for(&self, host: &dyn GridHost, items: &[NodeId], metrics: &GridMetrics) -> BTreeMap<NodeId, usize> {
        items
            .iter()
            .map(|node| {
                let width = host
                    .bounding_rect(*node)
                    .map(|rect| rect.width)
                    .unwrap_or(metrics.col_width);
                (*node, resolve_span(host.declared_span(*node), width, metrics))
            })
            .collect()
    }

    fn apply_flow_plan(
        &self,
        host: &mut dyn GridHost,
        metrics: &GridMetrics,
    ) -> Result<OccupancyPlan, PlanError> {
        let items = self.collect_items(&*host, None);
        let spans = self.spans_for(&*host, &items, metrics);
        let entries: Vec<PlanEntry> = items
            .iter()
            .map(|node| PlanEntry::node(*node, spans.get(node).copied().unwrap_or(1)))
            .collect();
        let plan = plan_occupancy(&entries, metrics.columns)?;
        for (node, cell) in &plan.nodes {
            let mut style = host.style(*node);
            style.placement = Some(*cell);
            style.transform = None;
            host.set_style(*node, style);
        }
        Ok(plan)
    }

    fn reorder(&mut self, host: &mut dyn GridHost, ids: &[String]) -> Vec<String> {
        let applied = apply_order(host, self.container, ids, &self.item_selector, &self.resolver);
        if !applied.is_empty() {
            self.last_order_signature = Some(order_signature(&applied));
        }
        if self.flow_placements
            && let Some(metrics) = self.derive_metrics(&*host, None)
            && let Err(err) = self.apply_flow_plan(host, &metrics)
        {
            debug!(error = %err, "placements not refreshed");
        }
        applied
    }

    fn begin_drag(&mut self, host: &mut dyn GridHost, pending: &PendingDrag) -> bool {
        let item = pending.item;
        let items = self.collect_items(&*host, None);
        if items.len() <= 1 {
            trace!(count = items.len(), "not enough items to drag");
            return false;
        }
        let Some(start_index) = items.iter().position(|node| *node == item) else {
            return false;
        };
        let item_rect = match host.bounding_rect(item) {
            Ok(rect) => rect,
            Err(err) => {
                debug!(item = ?item, error = %err, "drag aborted");
                return false;
            }
        };
        let Some(metrics) = self.derive_metrics(&*host, Some(item)) else {
            return false;
        };

        let start_order: Vec<String> = items
            .iter()
            .filter_map(|node| self.resolver.resolve(&*host, *node))
            .collect();
        let others: Vec<NodeId> = items.iter().copied().filter(|node| *node != item).collect();
        let spans = self.spans_for(&*host, &others, &metrics);
        let span = resolve_span(host.declared_span(item), item_rect.width, &metrics);

        let mut placeholder =
            match PlaceholderRenderer::create(host, self.container, item, start_index, span, &metrics) {
                Ok(placeholder) => placeholder,
                Err(err) => {
                    debug!(item = ?item, error = %err, "placeholder could not be inserted");
                    return false;
                }
            };
        if let Err(err) = placeholder.replan(host, &others, &spans, &metrics) {
            debug!(error = %err, "initial occupancy plan failed");
        }

        let container = metrics.container;
        let elem_start = (item_rect.left - container.left, item_rect.top - container.top);
        let prev_style = host.style(item);
        host.set_style(
            item,
            NodeStyle {
                offset: Some(elem_start),
                size: Some((item_rect.width.round().max(1.0), item_rect.height.round().max(1.0))),
                transform: None,
                transition_suppressed: true,
                opacity: Some(DRAG_OPACITY),
                z_index: Some(DRAG_Z_INDEX),
                pointer_events_disabled: true,
                placement: prev_style.placement,
            },
        );
        host.set_selection_suppressed(true);
        host.set_container_flag(self.container, ContainerFlag::Dragging, true);

        for kind in ListenerKind::SESSION {
            self.listeners.attach_once(item, kind, TAG_ACTIVE);
        }
        let captured = match host.set_pointer_capture(item, pending.pointer_id) {
            Ok(()) => true,
            Err(err) => {
                debug!(error = %err, "dragging without pointer capture");
                false
            }
        };

        let items_meta = capture_items_meta(&*host, &others, &metrics);
        debug::bump(Counter::DragStarts);
        self.diagnostics.drag_starts += 1;
        debug!(
            item = ?item,
            index = start_index,
            span,
            columns = metrics.columns,
            "drag started"
        );
        self.phase = DragPhase::Dragging(Box::new(ActiveDrag {
            pointer_id: pending.pointer_id,
            item,
            handle: pending.handle,
            captured,
            start_order,
            start_index,
            metrics,
            item_rect,
            elem_start,
            origin: (pending.start_x, pending.start_y),
            grab_offset: (pending.start_x - item_rect.left, pending.start_y - item_rect.top),
            prev_style,
            spans,
            items_meta,
            placeholder,
        }));
        self.sync_overlay(host);
        true
    }

    fn drag_move(&mut self, host: &mut dyn GridHost, event: &PointerEvent) {
        let Some(item) = self.dragged_item() else {
            return;
        };
        let others = self.collect_items(&*host, Some(item));
        let container = self.container;
        let Some(active) = self.phase.active_mut() else {
            return;
        };

        let (translate, _) = active.translation_for(event.x, event.y);
        let mut style = host.style(item);
        style.transform = Some(translate);
        host.set_style(item, style);

        let metrics = active.metrics;
        let total = others.len();
        let target = index_for_pointer(&active.items_meta, event.x, event.y, metrics.gap, total)
            .unwrap_or_else(|| {
                let local_x = event.x - metrics.container.left;
                let local_y = event.y - metrics.container.top;
                index_from_grid(&metrics, local_x, local_y, total)
            });
        match active
            .placeholder
            .move_to(host, container, target, &others, &active.spans, &metrics)
        {
            Ok(Some(settled)) => {
                active.items_meta = items_meta_from_rects(&others, &settled, &active.spans);
                self.diagnostics.swaps += 1;
            }
            Ok(None) => {}
            Err(err) => debug!(index = target, error = %err, "placeholder move failed"),
        }
    }

    fn clear_pending(&mut self, host: &mut dyn GridHost) {
        let DragPhase::Pending(pending) = &self.phase else {
            return;
        };
        let pending = *pending;
        if pending.captured {
            host.release_pointer_capture(pending.handle, pending.pointer_id);
        }
        self.listeners.detach_tag(TAG_PENDING);
        self.phase = DragPhase::Idle;
    }

    fn cancel_drag(&mut self, host: &mut dyn GridHost, commit: bool) {
        self.clear_pending(host);
        self.finish_drag(host, commit);
    }

    fn finish_drag(&mut self, host: &mut dyn GridHost, commit: bool) {
        let DragPhase::Dragging(active) = std::mem::take(&mut self.phase) else {
            return;
        };
        let ActiveDrag {
            pointer_id,
            item,
            captured,
            start_order,
            metrics,
            prev_style,
            placeholder,
            ..
        } = *active;

        if captured {
            host.release_pointer_capture(item, pointer_id);
        }
        self.listeners.detach_tag(TAG_ACTIVE);
        host.set_selection_suppressed(false);
        host.set_style(item, prev_style);
        placeholder.teardown(host, self.container, Some(item));

        if commit {
            self.persist_current_order(&*host);
            debug::bump(Counter::DragEnds);
            self.diagnostics.drag_ends += 1;
            self.log_summary(&*host);
        } else {
            if !start_order.is_empty() {
                self.reorder(host, &start_order);
            }
            debug::record_widgets(&self.current_order(&*host));
            self.diagnostics.drag_cancels += 1;
            debug!(item = ?item, "drag cancelled");
        }
        if commit
            && self.flow_placements
            && let Err(err) = self.apply_flow_plan(host, &metrics)
        {
            debug!(error = %err, "placements not refreshed");
        }

        self.overlay_metrics = Some(metrics);
        host.set_container_flag(self.container, ContainerFlag::Dragging, false);
        self.sync_overlay(host);
    }

    fn persist_current_order(&mut self, host: &dyn GridHost) {
        let order = self.current_order(host);
        if order.is_empty() {
            return;
        }
        let signature = order_signature(&order);
        if self.last_order_signature.as_deref() == Some(signature.as_str()) {
            trace!(signature = %signature, "order unchanged");
            return;
        }
        match write_stored_order(&*self.store, &self.storage_key, &order) {
            Ok(()) => self.diagnostics.persisted_writes += 1,
            Err(err) => warn!(key = %self.storage_key, error = %err, "order write discarded"),
        }
        self.last_order_signature = Some(signature);
        debug::record_widgets(&order);
        if let Some(callback) = self.on_order_change.as_mut() {
            callback(&order);
        }
    }

    fn log_summary(&self, host: &dyn GridHost) {
        let bound = host.container_flag(self.container, ContainerFlag::Bound);
        let placeholder_gone = host.query_first(self.container, PLACEHOLDER_SELECTOR).is_none();
        debug!(
            bound,
            placeholder_gone,
            snapshot = %debug::debug_snapshot_json(),
            "DND_SUMMARY"
        );
    }

    fn apply_edit_mode(&mut self, host: &mut dyn GridHost, requested: bool) {
        self.edit_mode_requested = requested;
        self.edit_mode_active = self.enabled && requested;
        if !self.phase.is_dragging() {
            self.sync_overlay(host);
        }
    }

    fn sync_overlay(&mut self, host: &mut dyn GridHost) {
        let dragging = self.phase.is_dragging();
        if self.destroyed || !(dragging || self.edit_mode_active) {
            host.set_overlay(self.container, None);
            host.set_container_flag(self.container, ContainerFlag::GridlinesVisible, false);
            return;
        }
        let metrics = match self.phase.active() {
            Some(active) => Some(active.metrics),
            None => match self.overlay_metrics {
                Some(cached) => Some(cached),
                None => self.derive_metrics(&*host, None),
            },
        };
        let Some(metrics) = metrics else {
            return;
        };
        self.overlay_metrics = Some(metrics);
        host.set_overlay(
            self.container,
            Some(GridOverlay {
                step_x: metrics.step_x.round().max(1.0),
                step_y: metrics.step_y.round().max(1.0),
                gap: metrics.gap.round().max(0.0),
                columns: metrics.columns,
                dragging,
            }),
        );
        host.set_container_flag(self.container, ContainerFlag::GridlinesVisible, true);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::TileBoard;
    use crate::store::MemoryStore;

    fn grid(board: &mut TileBoard, config: GridConfig) -> DraggableGrid {
        DraggableGrid::new(board, Rc::new(MemoryStore::new()), config).unwrap()
    }

    #[test]
    fn config_trims_and_splits_selectors() {
        let mut board = TileBoard::with_tiles(&["a", "b"]);
        let root = board.root();
        let g = grid(
            &mut board,
            GridConfig::new(root, " .tile ", ".grip, , .tile-handle", " dash "),
        );
        assert_eq!(g.item_selector, ".tile");
        assert_eq!(g.handle_selectors, vec![".grip", ".tile-handle"]);
        assert_eq!(g.storage_key(), "dash");
        assert!(format!("{:?}", GridConfig::new(root, "a", "b", "c")).contains("on_order_change: false"));
    }

    #[test]
    fn starting_disabled_ignores_presses() {
        let mut board = TileBoard::with_tiles(&["a", "b"]);
        let root = board.root();
        let mut g = grid(
            &mut board,
            GridConfig::new(root, ".tile", ".tile-handle", "dash").with_enabled(false),
        );
        assert!(!g.is_enabled());
        assert!(!g.edit_mode_active());
        let down = PointerEvent::down(50.0, 0.5, board.handle("a").unwrap());
        assert!(!g.handle_event(&mut board, &down));
        // still bound, just inert
        assert!(g.listeners().is_attached(root, ListenerKind::PointerDown, TAG_POINTER_DOWN));
    }

    #[test]
    fn reflow_during_a_drag_replans_around_the_placeholder() {
        let mut board = TileBoard::with_tiles(&["a", "b", "c"]);
        let root = board.root();
        let mut g = grid(&mut board, GridConfig::new(root, ".tile", ".tile-handle", "dash"));
        let down = PointerEvent::down(50.0, 0.5, board.handle("a").unwrap());
        g.handle_event(&mut board, &down);
        g.handle_event(&mut board, &PointerEvent::moved(300.0, 50.0));
        let plan = g.reflow(&mut board).unwrap();
        assert_eq!(plan.placeholder.map(|cell| cell.col), Some(2));
        assert_eq!(g.occupancy_plan(), Some(&plan));
        assert!(g.is_dragging());
    }

    #[test]
    fn items_without_ids_are_not_draggable() {
        let mut board = TileBoard::with_tiles(&["a", "b"]);
        let root = board.root();
        let a = board.tile("a").unwrap();
        board.remove_attribute(a, "data-widget-id");
        let mut g = grid(&mut board, GridConfig::new(root, ".tile", ".tile-handle", "dash"));
        let down = PointerEvent::down(50.0, 0.5, board.handle("a").unwrap());
        assert!(!g.handle_event(&mut board, &down));
        assert_eq!(g.current_order(&board), vec!["b"]);
    }

    #[test]
    fn session_events_are_ignored_once_their_listeners_are_gone() {
        let mut board = TileBoard::with_tiles(&["a", "b", "c"]);
        let root = board.root();
        let mut g = grid(&mut board, GridConfig::new(root, ".tile", ".tile-handle", "dash"));
        let down = PointerEvent::down(50.0, 0.5, board.handle("a").unwrap());

        assert!(g.handle_event(&mut board, &down));
        g.listeners.detach_tag(TAG_PENDING);
        assert!(!g.handle_event(&mut board, &PointerEvent::up(50.0, 0.5)));
        assert!(g.phase().is_pending());
        g.disable(&mut board);
        g.enable(&mut board);

        assert!(g.handle_event(&mut board, &down));
        assert!(g.handle_event(&mut board, &PointerEvent::moved(300.0, 50.0)));
        assert!(g.is_dragging());
        g.listeners.detach_tag(TAG_ACTIVE);
        assert!(!g.handle_event(&mut board, &PointerEvent::moved(50.0, 50.0)));
        assert_eq!(g.placeholder_index(), Some(2));
        assert!(!g.handle_event(&mut board, &PointerEvent::up(300.0, 50.0)));
        assert!(g.is_dragging());
    }

    #[test]
    fn reconfiguring_mid_drag_cancels_it() {
        let mut board = TileBoard::with_tiles(&["a", "b", "c"]);
        let root = board.root();
        let store = Rc::new(MemoryStore::new());
        let mut g = DraggableGrid::new(
            &mut board,
            store.clone(),
            GridConfig::new(root, ".tile", ".tile-handle", "dash"),
        )
        .unwrap();
        let down = PointerEvent::down(50.0, 0.5, board.handle("a").unwrap());
        g.handle_event(&mut board, &down);
        g.handle_event(&mut board, &PointerEvent::moved(300.0, 50.0));
        assert!(g.is_dragging());

        let config = GridConfig::new(root, ".tile", ".tile-handle", "dash").with_enabled(false);
        g.configure(&mut board, store.clone(), config).unwrap();
        assert!(!g.is_dragging());
        assert_eq!(g.listeners().len(), 1);
        assert!(board.placeholders().is_empty());
        assert!(!g.handle_event(&mut board, &PointerEvent::up(300.0, 50.0)));
        assert_eq!(board.order_ids(), vec!["a", "b", "c"]);
        assert!(store.is_empty());
    }
}
