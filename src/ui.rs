//! Terminal rendering of a [`TileBoard`].
//!
//! `UiFrame` wraps a ratatui buffer and clips every draw to the visible area.
//! Board coordinates are taken to be terminal cells, so tile rectangles map
//! straight onto the buffer through [`Bounds::to_cells`].

use ratatui::Frame;
use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::Line;
use ratatui::widgets::{Block, BorderType, Clear, Paragraph, Widget};

use crate::board::TileBoard;
use crate::geometry::Bounds;
use crate::host::{GridHost, GridOverlay, NodeId};

const GRID_DOT: &str = "·";
const ACTION_GLYPH: &str = "⋮";

/// Wrapper around `ratatui::Frame` that clamps drawing to the visible area.
pub struct UiFrame<'a> {
    area: Rect,
    buffer: &'a mut Buffer,
}

impl<'a> UiFrame<'a> {
    pub fn new(frame: &'a mut Frame<'_>) -> Self {
        let area = frame.area();
        let buffer = frame.buffer_mut();
        Self { area, buffer }
    }

    /// Draw into a detached buffer, e.g. in tests.
    pub fn from_parts(area: Rect, buffer: &'a mut Buffer) -> Self {
        Self { area, buffer }
    }

    pub fn area(&self) -> Rect {
        self.area
    }

    pub fn buffer_mut(&mut self) -> &mut Buffer {
        self.buffer
    }

    fn clip_rect(&self, rect: Rect) -> Option<Rect> {
        let clipped = rect.intersection(self.area);
        if clipped.width == 0 || clipped.height == 0 {
            None
        } else {
            Some(clipped)
        }
    }

    pub fn render_widget<W>(&mut self, widget: W, area: Rect)
    where
        W: Widget,
    {
        if let Some(clipped) = self.clip_rect(area) {
            widget.render(clipped, self.buffer);
        }
    }

    pub fn set_string(&mut self, x: u16, y: u16, text: &str, style: Style) {
        let area = self.area;
        safe_set_string(self.buffer, area, x, y, text, style);
    }
}

pub(crate) fn safe_set_string(
    buffer: &mut Buffer,
    bounds: Rect,
    x: u16,
    y: u16,
    text: &str,
    style: Style,
) {
    if bounds.width == 0 || bounds.height == 0 {
        return;
    }
    let max_x = bounds.x.saturating_add(bounds.width);
    let max_y = bounds.y.saturating_add(bounds.height);
    if x < bounds.x || x >= max_x || y < bounds.y || y >= max_y {
        return;
    }
    let available = max_x.saturating_sub(x);
    let text = truncate_to_width(text, available as usize);
    buffer.set_string(x, y, text, style);
}

pub(crate) fn truncate_to_width(value: &str, width: usize) -> String {
    if value.chars().count() <= width {
        return value.to_string();
    }
    value.chars().take(width).collect()
}

/// Draw every container of `board`: gridlines first, then tiles in document
/// order, then lifted tiles by z-index.
pub fn render_board(frame: &mut UiFrame<'_>, board: &TileBoard) {
    for container in board.containers() {
        render_container(frame, board, *container);
    }
}

fn render_container(frame: &mut UiFrame<'_>, board: &TileBoard, container: NodeId) {
    if let Some(overlay) = board.overlay(container) {
        render_gridlines(frame, board, container, &overlay);
    }
    let mut lifted = Vec::new();
    for node in board.children(container) {
        if let Some(z) = board.style(node).z_index {
            lifted.push((z, node));
            continue;
        }
        render_node(frame, board, node);
    }
    lifted.sort();
    for (_, node) in lifted {
        render_node(frame, board, node);
    }
}

fn render_gridlines(
    frame: &mut UiFrame<'_>,
    board: &TileBoard,
    container: NodeId,
    overlay: &GridOverlay,
) {
    let Ok(rect) = board.bounding_rect(container) else {
        return;
    };
    let Some(geometry) = board.geometry(container) else {
        return;
    };
    let color = if overlay.dragging {
        Color::Cyan
    } else {
        Color::DarkGray
    };
    let style = Style::default().fg(color);
    // one spare row so there is somewhere to drop below the last tile
    let rows = ((rect.height + overlay.gap) / overlay.step_y).round() as usize + 1;
    for row in 0..rows {
        for col in 0..overlay.columns {
            let cell = Bounds::new(
                rect.left + col as f64 * overlay.step_x,
                rect.top + row as f64 * overlay.step_y,
                geometry.col_width,
                geometry.row_height,
            )
            .to_cells();
            for (x, y) in [
                (cell.x, cell.y),
                (cell.right().saturating_sub(1), cell.y),
                (cell.x, cell.bottom().saturating_sub(1)),
                (cell.right().saturating_sub(1), cell.bottom().saturating_sub(1)),
            ] {
                frame.set_string(x, y, GRID_DOT, style);
            }
        }
    }
}

fn render_node(frame: &mut UiFrame<'_>, board: &TileBoard, node: NodeId) {
    let Ok(bounds) = board.bounding_rect(node) else {
        return;
    };
    let area = bounds.to_cells();
    if board.is_placeholder(node) {
        frame.render_widget(Clear, area);
        frame.render_widget(
            Block::bordered()
                .border_type(BorderType::Plain)
                .border_style(Style::default().fg(Color::Yellow))
                .title(" drop "),
            area,
        );
        return;
    }
    let style = board.style(node);
    let lifted = style.opacity.is_some_and(|o| o < 1.0);
    let moving = style.transform.is_some() && !lifted;
    let border = if lifted {
        Style::default().fg(Color::Gray).add_modifier(Modifier::DIM)
    } else if moving {
        Style::default().fg(Color::LightBlue)
    } else {
        Style::default().fg(Color::White)
    };
    let title = board.title(node).unwrap_or_default();
    let span = board.declared_span(node).unwrap_or(1);
    frame.render_widget(Clear, area);
    frame.render_widget(
        Block::bordered()
            .border_type(if lifted {
                BorderType::Double
            } else {
                BorderType::Rounded
            })
            .border_style(border)
            .title(Line::from(format!(" {title} ")).style(border.add_modifier(Modifier::BOLD))),
        area,
    );
    if area.width > 2 {
        frame.set_string(
            area.right().saturating_sub(2),
            area.y,
            ACTION_GLYPH,
            border,
        );
    }
    if area.height > 2 && area.width > 2 {
        let body = Rect {
            x: area.x + 1,
            y: area.y + 1,
            width: area.width - 2,
            height: area.height - 2,
        };
        frame.render_widget(
            Paragraph::new(format!("span {span}")).style(Style::default().fg(Color::DarkGray)),
            body,
        );
    }
}

/// Bottom status line.
pub fn render_status(frame: &mut UiFrame<'_>, area: Rect, text: &str) {
    frame.render_widget(Clear, area);
    frame.render_widget(
        Paragraph::new(text.to_string()).style(Style::default().fg(Color::Black).bg(Color::Gray)),
        area,
    );
}

/// Tail of the debug log in a bordered pane.
pub fn render_log(frame: &mut UiFrame<'_>, area: Rect, lines: &[String]) {
    frame.render_widget(Clear, area);
    let text: Vec<Line> = lines.iter().map(|l| Line::from(l.as_str())).collect();
    frame.render_widget(
        Paragraph::new(text).block(Block::bordered().title(" log ")),
        area,
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::BoardGeometry;

    fn cell_board(ids: &[&str]) -> TileBoard {
        let mut board = TileBoard::new();
        let container = board.add_container(BoardGeometry::default().with_width(40.0).with_cell(12.0, 4.0, 2.0));
        for id in ids {
            board.add_tile_to(container, id, 1);
        }
        board
    }

    fn row_text(buf: &Buffer, y: u16) -> String {
        (0..buf.area.width)
            .map(|x| buf.cell((x, y)).map(|c| c.symbol().to_string()).unwrap_or_default())
            .collect()
    }

    #[test]
    fn truncate_to_width_short_and_long() {
        assert_eq!(truncate_to_width("abc", 5), "abc");
        assert_eq!(truncate_to_width("abcdef", 3), "abc");
    }

    #[test]
    fn safe_set_string_writes_within_bounds() {
        let bounds = Rect::new(0, 0, 5, 1);
        let mut buf = Buffer::empty(bounds);
        safe_set_string(&mut buf, bounds, 2, 0, "hello", Style::default());
        assert_eq!(row_text(&buf, 0), "  hel");
        // out of bounds is ignored
        safe_set_string(&mut buf, bounds, 9, 0, "x", Style::default());
    }

    #[test]
    fn render_widget_clips_to_frame_area() {
        let area = Rect::new(0, 0, 6, 4);
        let mut buf = Buffer::empty(area);
        let mut ui = UiFrame::from_parts(area, &mut buf);
        ui.render_widget(Paragraph::new("AAAAAAAAAA"), Rect::new(3, 1, 5, 2));
        assert_eq!(row_text(&buf, 1), "   AAA");
    }

    #[test]
    fn tiles_render_with_titles_in_order() {
        let board = cell_board(&["alpha", "beta"]);
        let area = Rect::new(0, 0, 40, 6);
        let mut buf = Buffer::empty(area);
        let mut ui = UiFrame::from_parts(area, &mut buf);
        render_board(&mut ui, &board);
        let top = row_text(&buf, 0);
        let alpha = top.find("alpha").unwrap();
        let beta = top.find("beta").unwrap();
        assert!(alpha < beta);
        assert!(beta >= 14);
        assert!(row_text(&buf, 1).contains("span 1"));
    }

    #[test]
    fn overlay_draws_grid_dots() {
        let mut board = cell_board(&["alpha"]);
        let container = board.root();
        board.set_overlay(
            container,
            Some(GridOverlay {
                step_x: 14.0,
                step_y: 6.0,
                gap: 2.0,
                columns: 2,
                dragging: true,
            }),
        );
        let area = Rect::new(0, 0, 40, 12);
        let mut buf = Buffer::empty(area);
        let mut ui = UiFrame::from_parts(area, &mut buf);
        render_board(&mut ui, &board);
        // second column's free cell still shows its corners
        assert_eq!(buf.cell((14, 0)).map(|c| c.symbol()), Some(GRID_DOT));
        // the spare row below the last tile
        assert_eq!(buf.cell((0, 6)).map(|c| c.symbol()), Some(GRID_DOT));
    }
}
