pub mod occupancy;

pub use occupancy::*;

use crate::constants::{DEFAULT_GAP, SPAN_SNAP_TOLERANCE};
use crate::geometry::Bounds;

/// Optional grid overrides. Anything left unset is measured from the host.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GridOptions {
    pub columns: Option<usize>,
    pub min_columns: Option<usize>,
    pub max_columns: Option<usize>,
    pub col_width: Option<f64>,
    pub row_height: Option<f64>,
    pub gap: Option<f64>,
}

impl GridOptions {
    pub fn with_columns(mut self, columns: usize) -> Self {
        self.columns = Some(columns);
        self
    }

    pub fn with_min_columns(mut self, min: usize) -> Self {
        self.min_columns = Some(min);
        self
    }

    pub fn with_max_columns(mut self, max: usize) -> Self {
        self.max_columns = Some(max);
        self
    }

    pub fn with_col_width(mut self, width: f64) -> Self {
        self.col_width = Some(width);
        self
    }

    pub fn with_row_height(mut self, height: f64) -> Self {
        self.row_height = Some(height);
        self
    }

    pub fn with_gap(mut self, gap: f64) -> Self {
        self.gap = Some(gap);
        self
    }
}

/// Grid geometry frozen for the duration of one drag session.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridMetrics {
    pub col_width: f64,
    pub row_height: f64,
    pub gap: f64,
    pub step_x: f64,
    pub step_y: f64,
    pub columns: usize,
    pub container: Bounds,
}

impl GridMetrics {
    /// Rectangle covered by `cell`, relative to the container origin.
    pub fn cell_bounds(&self, cell: GridCell) -> Bounds {
        let span = cell.span.max(1) as f64;
        Bounds::new(
            self.container.left + cell.col as f64 * self.step_x,
            self.container.top + cell.row as f64 * self.step_y,
            span * self.col_width + (span - 1.0) * self.gap,
            self.row_height,
        )
    }
}

fn positive_or(value: Option<f64>, fallback: Option<f64>) -> f64 {
    match value {
        Some(v) if v.is_finite() && v > 0.0 => v,
        _ => match fallback {
            Some(f) if f.is_finite() && f > 0.0 => f,
            _ => 1.0,
        },
    }
}

fn gap_or(value: Option<f64>, fallback: Option<f64>) -> f64 {
    match value {
        Some(v) if v.is_finite() && v >= 0.0 => v,
        _ => match fallback {
            Some(f) if f.is_finite() && f >= 0.0 => f,
            _ => DEFAULT_GAP,
        },
    }
}

/// Derive grid metrics from container geometry.
///
/// `reference` is the rectangle of the item being dragged (or the first item)
/// and supplies column width and row height when the options leave them out.
/// `measured_gap` is whatever spacing the host could infer between items.
pub fn derive_metrics(
    options: &GridOptions,
    container: Bounds,
    reference: Option<Bounds>,
    measured_gap: Option<f64>,
) -> GridMetrics {
    let col_width = positive_or(options.col_width, reference.map(|r| r.width));
    let row_height = positive_or(options.row_height, reference.map(|r| r.height));
    let gap = gap_or(options.gap, measured_gap);
    let step_x = col_width + gap;
    let step_y = row_height + gap;

    let measured = ((container.width + gap) / step_x).floor();
    let mut columns = if measured.is_finite() && measured >= 1.0 {
        measured as usize
    } else {
        1
    };
    if let Some(fixed) = options.columns.filter(|c| *c > 0) {
        columns = fixed;
    }
    if let Some(max) = options.max_columns.filter(|c| *c > 0) {
        columns = columns.min(max);
    }
    if let Some(min) = options.min_columns.filter(|c| *c > 0) {
        columns = columns.max(min);
    }

    GridMetrics {
        col_width,
        row_height,
        gap,
        step_x,
        step_y,
        columns: columns.max(1),
        container,
    }
}

/// One column's worth of `rect` for an item declared `span` columns wide.
/// The inner gutters are taken out before dividing, so a 2-wide tile yields
/// the same reference as its single-column neighbours.
pub fn unit_reference(rect: Bounds, span: usize, gap: f64) -> Bounds {
    if span <= 1 {
        return rect;
    }
    let k = span as f64;
    let width = (rect.width - (k - 1.0) * gap.max(0.0)) / k;
    if !(width.is_finite() && width > 0.0) {
        return rect;
    }
    Bounds::new(rect.left, rect.top, width, rect.height)
}

/// Column span implied by a measured width.
pub fn infer_span(width: f64, metrics: &GridMetrics) -> usize {
    let step = metrics.step_x.max(1.0);
    let raw = ((width + metrics.gap) / step).round();
    let span = if raw.is_finite() && raw >= 1.0 {
        raw as usize
    } else {
        1
    };
    span.clamp(1, metrics.columns.max(1))
}

/// Declared span when the host has one, otherwise inferred from `width`.
/// Always within `[1, columns]`.
pub fn resolve_span(declared: Option<usize>, width: f64, metrics: &GridMetrics) -> usize {
    match declared.filter(|span| *span > 0) {
        Some(span) => span.clamp(1, metrics.columns.max(1)),
        None => infer_span(width, metrics),
    }
}

/// Keep a spanning placeholder from being asked to start past `columns - span`.
///
/// Offsets that overshoot by at most [`SPAN_SNAP_TOLERANCE`] are pulled back
/// to the last valid start in the same row; larger overshoots move to the
/// start of the next row when that index exists.
///
/// The append slot is clamped like any other index, so when it would start
/// past `columns - span` a wide item lands before the trailing items instead
/// of after them.
pub fn clamp_index_for_span(index: usize, columns: usize, span: usize, total: usize) -> usize {
    let columns = columns.max(1);
    let span = span.clamp(1, columns);
    let target = index.min(total);
    let max_start = columns - span;
    let row_start = (target / columns) * columns;
    let offset = target - row_start;
    if offset <= max_start {
        return target;
    }
    let same_row = row_start + max_start;
    let next_row = row_start + columns;
    if offset - max_start <= SPAN_SNAP_TOLERANCE || next_row > total {
        same_row
    } else {
        next_row
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn container(width: f64) -> Bounds {
        Bounds::new(0.0, 0.0, width, 200.0)
    }

    #[test]
    fn columns_follow_container_width() {
        let item = Bounds::new(0.0, 0.0, 100.0, 80.0);
        let m = derive_metrics(&GridOptions::default(), container(320.0), Some(item), Some(10.0));
        assert_eq!(m.col_width, 100.0);
        assert_eq!(m.row_height, 80.0);
        assert_eq!(m.step_x, 110.0);
        assert_eq!(m.step_y, 90.0);
        assert_eq!(m.columns, 3);
    }

    #[test]
    fn configured_columns_then_min_max_clamp() {
        let item = Bounds::new(0.0, 0.0, 100.0, 80.0);
        let opts = GridOptions::default().with_columns(9).with_max_columns(4);
        let m = derive_metrics(&opts, container(320.0), Some(item), None);
        assert_eq!(m.columns, 4);

        let opts = GridOptions::default().with_min_columns(5);
        let m = derive_metrics(&opts, container(320.0), Some(item), Some(10.0));
        assert_eq!(m.columns, 5);
    }

    #[test]
    fn gap_and_sizes_fall_back() {
        let m = derive_metrics(&GridOptions::default(), container(50.0), None, None);
        assert_eq!(m.col_width, 1.0);
        assert_eq!(m.gap, DEFAULT_GAP);
        // invalid configured values are ignored
        let opts = GridOptions::default().with_gap(-3.0).with_col_width(f64::NAN);
        let m = derive_metrics(&opts, container(50.0), None, Some(4.0));
        assert_eq!(m.gap, 4.0);
        assert_eq!(m.col_width, 1.0);
    }

    #[test]
    fn narrow_container_keeps_one_column() {
        let item = Bounds::new(0.0, 0.0, 300.0, 80.0);
        let m = derive_metrics(&GridOptions::default(), container(120.0), Some(item), Some(0.0));
        assert_eq!(m.columns, 1);
    }

    #[test]
    fn wide_references_are_divided_back_to_one_column() {
        let wide = Bounds::new(0.0, 0.0, 210.0, 80.0);
        assert_eq!(unit_reference(wide, 2, 10.0), Bounds::new(0.0, 0.0, 100.0, 80.0));
        assert_eq!(unit_reference(wide, 1, 10.0), wide);
        // gutters wider than the item leave it alone
        assert_eq!(unit_reference(Bounds::new(0.0, 0.0, 20.0, 8.0), 3, 50.0).width, 20.0);

        let m = derive_metrics(
            &GridOptions::default(),
            container(320.0),
            Some(unit_reference(wide, 2, 10.0)),
            Some(10.0),
        );
        assert_eq!(m.columns, 3);
        assert_eq!(resolve_span(Some(2), wide.width, &m), 2);
    }

    #[test]
    fn span_inference_uses_step_width() {
        let item = Bounds::new(0.0, 0.0, 100.0, 80.0);
        let m = derive_metrics(&GridOptions::default(), container(440.0), Some(item), Some(10.0));
        assert_eq!(m.columns, 4);
        assert_eq!(infer_span(100.0, &m), 1);
        assert_eq!(infer_span(210.0, &m), 2);
        assert_eq!(infer_span(2000.0, &m), 4);
        assert_eq!(resolve_span(Some(3), 100.0, &m), 3);
        assert_eq!(resolve_span(Some(0), 210.0, &m), 2);
        assert_eq!(resolve_span(Some(12), 100.0, &m), 4);
    }

    #[test]
    fn cell_bounds_cover_span_and_inner_gaps() {
        let item = Bounds::new(0.0, 0.0, 100.0, 80.0);
        let m = derive_metrics(&GridOptions::default(), container(440.0), Some(item), Some(10.0));
        let b = m.cell_bounds(GridCell::new(1, 2, 2));
        assert_eq!(b, Bounds::new(220.0, 90.0, 210.0, 80.0));
    }

    #[test]
    fn span_clamp_never_starts_past_last_valid_column() {
        for total in 0..=13 {
            for index in 0..=total + 2 {
                let clamped = clamp_index_for_span(index, 4, 2, total);
                assert!(clamped <= total);
                assert!(clamped % 4 <= 2, "index {index} of {total} -> {clamped}");
            }
        }
    }

    #[test]
    fn span_clamp_snaps_back_within_tolerance() {
        // offset 3 in a 4-column grid with span 2 overshoots by one
        assert_eq!(clamp_index_for_span(3, 4, 2, 10), 2);
        assert_eq!(clamp_index_for_span(7, 4, 2, 10), 6);
        // wide overshoot jumps to the next row
        assert_eq!(clamp_index_for_span(5, 6, 1, 20), 5);
        assert_eq!(clamp_index_for_span(4, 6, 3, 20), 3);
        assert_eq!(clamp_index_for_span(5, 8, 6, 20), 8);
        // unit spans are never moved
        assert_eq!(clamp_index_for_span(3, 4, 1, 10), 3);
    }

    #[test]
    fn append_slot_is_clamped_when_it_would_overflow() {
        // 3 columns, a 2-wide item and two others: appending would start at column 2
        assert_eq!(clamp_index_for_span(2, 3, 2, 2), 1);
        assert_eq!(clamp_index_for_span(9, 3, 2, 2), 1);
        // appending at a valid start column is left alone
        assert_eq!(clamp_index_for_span(3, 3, 2, 3), 3);
        assert_eq!(clamp_index_for_span(2, 4, 2, 2), 2);
    }
}
