//! First-fit, row-major occupancy planning.
//!
//! Every entry (items in document order, with the placeholder at its target
//! index) is given the first run of `span` free columns found scanning rows
//! top to bottom and columns left to right. There is no backtracking: the
//! plan is a pure function of the entry order and spans.

use std::collections::BTreeMap;

use thiserror::Error;

use crate::host::NodeId;

/// One placed run of cells. `row` and `col` are zero based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GridCell {
    pub row: usize,
    pub col: usize,
    pub span: usize,
}

impl GridCell {
    pub const fn new(row: usize, col: usize, span: usize) -> Self {
        Self { row, col, span }
    }

    /// Exclusive end column.
    pub fn end_col(&self) -> usize {
        self.col + self.span
    }

    pub fn overlaps(&self, other: &GridCell) -> bool {
        self.row == other.row && self.col < other.end_col() && other.col < self.end_col()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    Node(NodeId),
    Placeholder,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlanEntry {
    pub slot: Slot,
    pub span: usize,
}

impl PlanEntry {
    pub fn node(node: NodeId, span: usize) -> Self {
        Self {
            slot: Slot::Node(node),
            span,
        }
    }

    pub fn placeholder(span: usize) -> Self {
        Self {
            slot: Slot::Placeholder,
            span,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PlanError {
    #[error("entry {index} with span {span} found no free run within {bound} rows")]
    RowBoundExceeded {
        index: usize,
        span: usize,
        bound: usize,
    },
}

/// Row-major occupancy bitmap. Rows are materialized lazily.
#[derive(Debug, Clone)]
pub struct Occupancy {
    columns: usize,
    rows: Vec<Vec<bool>>,
}

impl Occupancy {
    pub fn new(columns: usize) -> Self {
        Self {
            columns: columns.max(1),
            rows: Vec::new(),
        }
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    /// One past the lowest row holding a claimed cell.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    fn clamp_span(&self, span: usize) -> usize {
        span.clamp(1, self.columns)
    }

    pub fn is_free(&self, row: usize, col: usize, span: usize) -> bool {
        if col + span > self.columns {
            return false;
        }
        match self.rows.get(row) {
            Some(cells) => cells[col..col + span].iter().all(|taken| !taken),
            None => true,
        }
    }

    /// Mark a run as taken. Runs hanging past the last column are cut short.
    pub fn claim(&mut self, cell: GridCell) {
        if cell.col >= self.columns {
            return;
        }
        let end = cell.end_col().min(self.columns);
        while self.rows.len() <= cell.row {
            self.rows.push(vec![false; self.columns]);
        }
        for taken in &mut self.rows[cell.row][cell.col..end] {
            *taken = true;
        }
    }

    /// First-fit a run of `span` cells in rows `0..row_bound`.
    pub fn place(&mut self, span: usize, row_bound: usize) -> Option<GridCell> {
        let span = self.clamp_span(span);
        for row in 0..row_bound {
            for col in 0..=(self.columns - span) {
                if self.is_free(row, col, span) {
                    let cell = GridCell::new(row, col, span);
                    self.claim(cell);
                    return Some(cell);
                }
            }
        }
        None
    }
}

/// Pack `spans` in order on top of whatever `occupancy` already holds.
///
/// The k-th span always lands within the first `row_count + k + 1` rows: the
/// pre-claimed cells touch at most `row_count` rows and the k earlier spans at
/// most k more, so one of those rows is still empty. The bound below is
/// therefore never hit unless the bitmap was corrupted.
pub fn pack_spans(spans: &[usize], occupancy: &mut Occupancy) -> Result<Vec<GridCell>, PlanError> {
    let bound = occupancy.row_count() + spans.len();
    let mut cells = Vec::with_capacity(spans.len());
    for (index, &span) in spans.iter().enumerate() {
        let cell = occupancy
            .place(span, bound)
            .ok_or(PlanError::RowBoundExceeded { index, span, bound })?;
        cells.push(cell);
    }
    Ok(cells)
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct OccupancyPlan {
    pub placeholder: Option<GridCell>,
    pub nodes: BTreeMap<NodeId, GridCell>,
    pub columns: usize,
    pub rows: usize,
}

impl OccupancyPlan {
    pub fn cell_of(&self, node: NodeId) -> Option<GridCell> {
        self.nodes.get(&node).copied()
    }

    /// Every placed cell, placeholder included.
    pub fn cells(&self) -> impl Iterator<Item = GridCell> + '_ {
        self.placeholder.iter().copied().chain(self.nodes.values().copied())
    }
}

pub fn plan_occupancy(entries: &[PlanEntry], columns: usize) -> Result<OccupancyPlan, PlanError> {
    let mut occupancy = Occupancy::new(columns);
    let spans: Vec<usize> = entries.iter().map(|entry| entry.span).collect();
    let cells = pack_spans(&spans, &mut occupancy)?;
    let mut plan = OccupancyPlan {
        columns: occupancy.columns(),
        rows: occupancy.row_count(),
        ..OccupancyPlan::default()
    };
    for (entry, cell) in entries.iter().zip(cells) {
        match entry.slot {
            Slot::Placeholder => plan.placeholder = Some(cell),
            Slot::Node(node) => {
                plan.nodes.insert(node, cell);
            }
        }
    }
    Ok(plan)
}
