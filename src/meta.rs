//! Frame-local snapshots of item geometry.

use std::collections::BTreeMap;

use tracing::trace;

use crate::geometry::Bounds;
use crate::host::{GridHost, NodeId};
use crate::layout::{GridMetrics, resolve_span};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ItemMeta {
    pub node: NodeId,
    /// Position among the items the snapshot was taken from.
    pub order: usize,
    pub rect: Bounds,
    pub center_x: f64,
    pub center_y: f64,
    pub span: usize,
}

impl ItemMeta {
    /// Whether `y` falls in this item's row band, widened by half a gap on
    /// each side so the gutter between rows still maps to a row.
    pub fn band_contains(&self, y: f64, gap: f64) -> bool {
        let slack = gap.max(0.0) / 2.0;
        y >= self.rect.top - slack && y <= self.rect.bottom() + slack
    }
}

/// Snapshot `items` in order. Items without geometry are skipped but keep
/// their `order` slot.
pub fn capture_items_meta(
    host: &dyn GridHost,
    items: &[NodeId],
    metrics: &GridMetrics,
) -> Vec<ItemMeta> {
    items
        .iter()
        .enumerate()
        .filter_map(|(order, &node)| match host.bounding_rect(node) {
            Ok(rect) => Some(ItemMeta {
                node,
                order,
                rect,
                center_x: rect.center_x(),
                center_y: rect.center_y(),
                span: resolve_span(host.declared_span(node), rect.width, metrics),
            }),
            Err(err) => {
                trace!(node = ?node, error = %err, "skipping item without geometry");
                None
            }
        })
        .collect()
}

/// Snapshots from rectangles already measured, e.g. right after a
/// placeholder move. `spans` falls back to 1 for unknown nodes.
pub fn items_meta_from_rects(
    items: &[NodeId],
    rects: &[(NodeId, Bounds)],
    spans: &BTreeMap<NodeId, usize>,
) -> Vec<ItemMeta> {
    let rects: BTreeMap<NodeId, Bounds> = rects.iter().copied().collect();
    items
        .iter()
        .enumerate()
        .filter_map(|(order, node)| {
            let rect = rects.get(node)?;
            Some(ItemMeta {
                node: *node,
                order,
                rect: *rect,
                center_x: rect.center_x(),
                center_y: rect.center_y(),
                span: spans.get(node).copied().unwrap_or(1),
            })
        })
        .collect()
}

/// Target insertion index for a pointer at (`x`, `y`), using item snapshots.
///
/// Among the items whose row band contains `y`, the one with the nearest
/// horizontal center decides: left of its center inserts before it, right of
/// it inserts after. A pointer above a band inserts before the first item
/// below it. Anywhere else appends. Returns `None` when there is nothing to
/// map against.
pub fn index_for_pointer(metas: &[ItemMeta], x: f64, y: f64, gap: f64, total: usize) -> Option<usize> {
    if metas.is_empty() {
        return None;
    }
    let nearest = metas
        .iter()
        .filter(|meta| meta.band_contains(y, gap))
        .min_by(|a, b| {
            let da = (x - a.center_x).abs();
            let db = (x - b.center_x).abs();
            da.total_cmp(&db)
        });
    if let Some(meta) = nearest {
        let index = if x < meta.center_x {
            meta.order
        } else {
            meta.order + 1
        };
        return Some(index.min(total));
    }
    let slack = gap.max(0.0) / 2.0;
    let below = metas.iter().find(|meta| y < meta.rect.top - slack);
    Some(below.map_or(total, |meta| meta.order.min(total)))
}

/// Grid-cell fallback used when no snapshots exist. Coordinates are relative
/// to the container origin.
pub fn index_from_grid(metrics: &GridMetrics, local_x: f64, local_y: f64, total: usize) -> usize {
    let columns = metrics.columns.max(1);
    let step_x = if metrics.step_x > 0.0 { metrics.step_x } else { 1.0 };
    let step_y = if metrics.step_y > 0.0 { metrics.step_y } else { 1.0 };
    let col = ((local_x + step_x / 2.0) / step_x).floor().max(0.0) as usize;
    let col = col.min(columns - 1);
    let row = ((local_y + step_y / 2.0) / step_y).floor().max(0.0) as usize;
    let max_row = total.div_ceil(columns);
    let row = row.min(max_row);
    (row * columns + col).min(total)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics(columns: usize) -> GridMetrics {
        GridMetrics {
            col_width: 100.0,
            row_height: 80.0,
            gap: 10.0,
            step_x: 110.0,
            step_y: 90.0,
            columns,
            container: Bounds::new(0.0, 0.0, 330.0, 400.0),
        }
    }

    fn meta(order: usize, row: usize, col: usize) -> ItemMeta {
        let rect = Bounds::new(col as f64 * 110.0, row as f64 * 90.0, 100.0, 80.0);
        ItemMeta {
            node: NodeId(order as u32 + 10),
            order,
            rect,
            center_x: rect.center_x(),
            center_y: rect.center_y(),
            span: 1,
        }
    }

    #[test]
    fn nearest_center_in_band_decides_side() {
        // placeholder sits at col 0; remaining items at col 1 and 2
        let metas = [meta(0, 0, 1), meta(1, 0, 2)];
        assert_eq!(index_for_pointer(&metas, 300.0, 50.0, 10.0, 2), Some(2));
        assert_eq!(index_for_pointer(&metas, 230.0, 50.0, 10.0, 2), Some(1));
        assert_eq!(index_for_pointer(&metas, 20.0, 50.0, 10.0, 2), Some(0));
        // gutter below the row still counts as that row
        assert_eq!(index_for_pointer(&metas, 300.0, 84.0, 10.0, 2), Some(2));
    }

    #[test]
    fn pointer_above_next_row_inserts_before_it() {
        let metas = [meta(0, 0, 0), meta(1, 0, 1), meta(2, 2, 0)];
        assert_eq!(index_for_pointer(&metas, 10.0, 120.0, 10.0, 3), Some(2));
        assert_eq!(index_for_pointer(&metas, 10.0, 900.0, 10.0, 3), Some(3));
        assert_eq!(index_for_pointer(&[], 10.0, 10.0, 10.0, 3), None);
    }

    #[test]
    fn snapshots_from_measured_rects_keep_order_slots() {
        let items = [NodeId(1), NodeId(2), NodeId(3)];
        let rects = [
            (NodeId(3), Bounds::new(220.0, 0.0, 100.0, 80.0)),
            (NodeId(1), Bounds::new(0.0, 0.0, 100.0, 80.0)),
        ];
        let spans = BTreeMap::from([(NodeId(3), 2)]);
        let metas = items_meta_from_rects(&items, &rects, &spans);
        assert_eq!(metas.len(), 2);
        assert_eq!((metas[0].order, metas[0].span), (0, 1));
        assert_eq!((metas[1].order, metas[1].span), (2, 2));
        assert_eq!(metas[1].center_x, 270.0);
    }

    #[test]
    fn grid_fallback_is_bounded() {
        let m = metrics(3);
        assert_eq!(index_from_grid(&m, 0.0, 0.0, 5), 0);
        assert_eq!(index_from_grid(&m, 120.0, 0.0, 5), 1);
        assert_eq!(index_from_grid(&m, 5000.0, 0.0, 5), 2);
        assert_eq!(index_from_grid(&m, 0.0, 100.0, 5), 3);
        assert_eq!(index_from_grid(&m, 250.0, 5000.0, 5), 5);
        assert_eq!(index_from_grid(&m, -40.0, -40.0, 5), 0);
    }
}
