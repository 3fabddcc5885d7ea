use std::cell::RefCell;
use std::rc::Rc;

use dash_grid::board::{BoardGeometry, TileBoard};
use dash_grid::host::{GridHost, PointerKind};
use dash_grid::layout::{GridCell, OccupancyPlan};
use dash_grid::store::OrderStore;
use dash_grid::{DraggableGrid, GridConfig, MemoryStore, PointerEvent};

fn grid_for(board: &mut TileBoard, store: Rc<MemoryStore>) -> DraggableGrid {
    let config = GridConfig::new(board.root(), ".tile", ".tile-handle", "dash");
    DraggableGrid::new(board, store, config).expect("valid config")
}

fn press(board: &TileBoard, id: &str) -> PointerEvent {
    let handle = board.handle(id).unwrap();
    let rect = board.bounding_rect(handle).unwrap();
    PointerEvent::down(rect.left + 50.0, rect.top + 0.5, handle)
}

#[test]
fn drag_to_the_end_commits_and_persists() {
    let mut board = TileBoard::with_tiles(&["w1", "w2", "w3"]);
    let store = Rc::new(MemoryStore::new());
    let seen: Rc<RefCell<Vec<Vec<String>>>> = Rc::default();
    let sink = Rc::clone(&seen);
    let config = GridConfig::new(board.root(), ".tile", ".tile-handle", "dash")
        .with_order_callback(move |order| sink.borrow_mut().push(order.to_vec()));
    let mut grid = DraggableGrid::new(&mut board, store.clone(), config).unwrap();

    let down = PointerEvent::down(50.0, 0.5, board.handle("w1").unwrap());
    assert!(grid.handle_event(&mut board, &down));
    assert!(grid.phase().is_pending());
    assert!(grid.handle_event(&mut board, &PointerEvent::moved(300.0, 50.0)));
    assert!(grid.is_dragging());
    assert_eq!(grid.placeholder_index(), Some(2));
    assert_eq!(board.placeholders().len(), 1);
    assert!(board.selection_suppressed());

    assert!(grid.handle_event(&mut board, &PointerEvent::up(300.0, 50.0)));
    assert!(!grid.is_dragging());
    assert_eq!(board.order_ids(), vec!["w2", "w3", "w1"]);
    assert!(board.placeholders().is_empty());
    assert!(!board.selection_suppressed());
    assert_eq!(
        store.get_item("dash").unwrap().as_deref(),
        Some(r#"["w2","w3","w1"]"#)
    );
    assert_eq!(seen.borrow().as_slice(), &[vec!["w2", "w3", "w1"]]);
    assert_eq!(grid.last_order_signature(), Some("w2|w3|w1"));

    let diagnostics = grid.diagnostics();
    assert_eq!(diagnostics.drag_starts, 1);
    assert_eq!(diagnostics.drag_ends, 1);
    assert_eq!(diagnostics.persisted_writes, 1);
    // only the pointer-down registration survives the session
    assert_eq!(diagnostics.listeners_active, 1);

    let w1 = board.tile("w1").unwrap();
    let style = board.style(w1);
    assert_eq!(style.z_index, None);
    assert_eq!(style.opacity, None);
    assert!(!style.pointer_events_disabled);
}

#[test]
fn drop_in_place_writes_nothing() {
    let mut board = TileBoard::with_tiles(&["w1", "w2", "w3"]);
    let store = Rc::new(MemoryStore::new());
    let mut grid = grid_for(&mut board, store.clone());

    let down = press(&board, "w2");
    grid.handle_event(&mut board, &down);
    // past the threshold but still over w2's own slot
    grid.handle_event(&mut board, &PointerEvent::moved(down.x + 6.0, down.y + 6.0));
    assert!(grid.is_dragging());
    grid.handle_event(&mut board, &PointerEvent::up(down.x + 6.0, down.y + 6.0));

    assert_eq!(board.order_ids(), vec!["w1", "w2", "w3"]);
    assert!(store.is_empty());
    assert_eq!(grid.diagnostics().persisted_writes, 0);
    assert_eq!(grid.diagnostics().drag_ends, 1);
}

#[test]
fn cancel_restores_the_starting_order() {
    let mut board = TileBoard::with_tiles(&["w1", "w2", "w3"]);
    let store = Rc::new(MemoryStore::new());
    let mut grid = grid_for(&mut board, store.clone());

    let press_w1 = press(&board, "w1");
    grid.handle_event(&mut board, &press_w1);
    grid.handle_event(&mut board, &PointerEvent::moved(300.0, 50.0));
    assert_eq!(grid.placeholder_index(), Some(2));
    assert!(grid.handle_event(&mut board, &PointerEvent::cancel()));

    assert!(grid.phase().is_idle());
    assert_eq!(board.order_ids(), vec!["w1", "w2", "w3"]);
    assert!(board.placeholders().is_empty());
    assert!(store.is_empty());
    assert_eq!(grid.diagnostics().drag_cancels, 1);
    for id in ["w1", "w2", "w3"] {
        let style = board.style(board.tile(id).unwrap());
        assert_eq!(style.transform, None);
        assert_eq!(style.placement, None);
    }
}

#[test]
fn small_moves_stay_pending_and_release_cleanly() {
    let mut board = TileBoard::with_tiles(&["w1", "w2"]);
    let store = Rc::new(MemoryStore::new());
    let mut grid = grid_for(&mut board, store.clone());

    let down = press(&board, "w1");
    grid.handle_event(&mut board, &down);
    assert_eq!(board.capture_of(down.pointer_id), board.handle("w1"));
    assert!(grid.handle_event(&mut board, &PointerEvent::moved(down.x + 4.0, down.y + 4.0)));
    assert!(grid.phase().is_pending());
    assert!(board.placeholders().is_empty());

    grid.handle_event(&mut board, &PointerEvent::up(down.x + 4.0, down.y + 4.0));
    assert!(grid.phase().is_idle());
    assert_eq!(board.capture_of(down.pointer_id), None);
    assert_eq!(grid.diagnostics().drag_starts, 0);
    assert!(store.is_empty());
}

#[test]
fn presses_outside_handles_are_ignored() {
    let mut board = TileBoard::with_tiles(&["w1", "w2"]);
    let mut grid = grid_for(&mut board, Rc::new(MemoryStore::new()));
    let w1 = board.tile("w1").unwrap();
    let action = board.action("w1").unwrap();
    let handle = board.handle("w1").unwrap();

    // tile body, below the handle strip
    assert!(!grid.handle_event(&mut board, &PointerEvent::down(50.0, 40.0, w1)));
    // the menu button inside the handle
    assert!(!grid.handle_event(&mut board, &PointerEvent::down(99.5, 0.5, action)));
    // secondary mouse button
    assert!(!grid.handle_event(
        &mut board,
        &PointerEvent::down(50.0, 0.5, handle).with_button(2)
    ));
    assert!(grid.phase().is_idle());

    // touch contacts report no button but still count
    assert!(grid.handle_event(
        &mut board,
        &PointerEvent::down(50.0, 0.5, handle)
            .with_kind(PointerKind::Touch)
            .with_button(1)
    ));
    assert!(grid.phase().is_pending());
}

#[test]
fn single_item_never_lifts() {
    let mut board = TileBoard::with_tiles(&["solo"]);
    let mut grid = grid_for(&mut board, Rc::new(MemoryStore::new()));
    let press_solo = press(&board, "solo");
    grid.handle_event(&mut board, &press_solo);
    grid.handle_event(&mut board, &PointerEvent::moved(200.0, 60.0));
    assert!(!grid.is_dragging());
    assert!(board.placeholders().is_empty());
}

#[test]
fn drag_works_without_pointer_capture() {
    let mut board = TileBoard::with_tiles(&["w1", "w2", "w3"]);
    board.set_capture_supported(false);
    let store = Rc::new(MemoryStore::new());
    let mut grid = grid_for(&mut board, store.clone());

    let press_w1 = press(&board, "w1");
    grid.handle_event(&mut board, &press_w1);
    grid.handle_event(&mut board, &PointerEvent::moved(300.0, 50.0));
    assert!(grid.is_dragging());
    grid.handle_event(&mut board, &PointerEvent::up(300.0, 50.0));
    assert_eq!(board.order_ids(), vec!["w2", "w3", "w1"]);
    assert_eq!(
        store.get_item("dash").unwrap().as_deref(),
        Some(r#"["w2","w3","w1"]"#)
    );
}

#[test]
fn displaced_items_slide_home_on_the_next_frame() {
    let mut board = TileBoard::with_tiles(&["w1", "w2", "w3"]);
    let mut grid = grid_for(&mut board, Rc::new(MemoryStore::new()));
    let w2 = board.tile("w2").unwrap();

    let press_w1 = press(&board, "w1");
    grid.handle_event(&mut board, &press_w1);
    grid.handle_event(&mut board, &PointerEvent::moved(300.0, 50.0));
    assert_eq!(board.style(w2).transform, Some((110.0, 0.0)));
    assert!(board.style(w2).transition_suppressed);

    let frames = board.take_due_frames();
    assert!(!frames.is_empty());
    let mut delivered = false;
    for frame in frames {
        delivered |= grid.on_animation_frame(&mut board, frame);
    }
    assert!(delivered);
    assert_eq!(board.style(w2).transform, None);
    // w2 now sits in the first cell
    assert_eq!(board.bounding_rect(w2).unwrap().left, 0.0);
}

#[test]
fn dragged_item_follows_the_pointer() {
    let mut board = TileBoard::with_tiles(&["w1", "w2", "w3"]);
    let mut grid = grid_for(&mut board, Rc::new(MemoryStore::new()));
    let w1 = board.tile("w1").unwrap();

    let down = PointerEvent::down(50.0, 0.5, board.handle("w1").unwrap());
    grid.handle_event(&mut board, &down);
    grid.handle_event(&mut board, &PointerEvent::moved(70.0, 30.5));
    let style = board.style(w1);
    assert_eq!(style.offset, Some((0.0, 0.0)));
    assert_eq!(style.z_index, Some(50));
    assert!(style.pointer_events_disabled);
    assert!(style.transform.is_some());
    assert_eq!(grid.dragged_item(), Some(w1));
}

#[test]
fn disable_mid_drag_cancels_and_blocks_new_presses() {
    let mut board = TileBoard::with_tiles(&["w1", "w2", "w3"]);
    let store = Rc::new(MemoryStore::new());
    let mut grid = grid_for(&mut board, store.clone());

    let press_w1 = press(&board, "w1");
    grid.handle_event(&mut board, &press_w1);
    grid.handle_event(&mut board, &PointerEvent::moved(300.0, 50.0));
    grid.disable(&mut board);
    assert!(grid.phase().is_idle());
    assert_eq!(board.order_ids(), vec!["w1", "w2", "w3"]);
    assert!(store.is_empty());

    let press_w1 = press(&board, "w1");
    assert!(!grid.handle_event(&mut board, &press_w1));
    grid.enable(&mut board);
    let press_w1 = press(&board, "w1");
    assert!(grid.handle_event(&mut board, &press_w1));
}

#[test]
fn other_pointers_are_ignored_during_a_session() {
    let mut board = TileBoard::with_tiles(&["w1", "w2", "w3"]);
    let mut grid = grid_for(&mut board, Rc::new(MemoryStore::new()));

    let press_w1 = press(&board, "w1");
    grid.handle_event(&mut board, &press_w1);
    grid.handle_event(&mut board, &PointerEvent::moved(300.0, 50.0));
    let press_w2 = press(&board, "w2").with_pointer(7);
    assert!(!grid.handle_event(&mut board, &press_w2));
    assert!(!grid.handle_event(&mut board, &PointerEvent::moved(0.0, 0.0).with_pointer(7)));
    assert!(!grid.handle_event(&mut board, &PointerEvent::up(0.0, 0.0).with_pointer(7)));
    assert!(grid.is_dragging());
    assert_eq!(grid.placeholder_index(), Some(2));
}

#[test]
fn two_containers_drag_independently() {
    let mut board = TileBoard::new();
    let left = board.add_container(BoardGeometry::default());
    let right = board.add_container(BoardGeometry::default().with_origin(0.0, 400.0));
    for id in ["a1", "a2", "a3"] {
        board.add_tile_to(left, id, 1);
    }
    for id in ["b1", "b2", "b3"] {
        board.add_tile_to(right, id, 1);
    }
    let store = Rc::new(MemoryStore::new());
    let mut grid_a = DraggableGrid::new(
        &mut board,
        store.clone(),
        GridConfig::new(left, ".tile", ".tile-handle", "left"),
    )
    .unwrap();
    let mut grid_b = DraggableGrid::new(
        &mut board,
        store.clone(),
        GridConfig::new(right, ".tile", ".tile-handle", "right"),
    )
    .unwrap();

    let down_a = press(&board, "a1");
    let down_b = press(&board, "b1").with_pointer(2);
    // each grid only takes presses inside its own container
    assert!(!grid_b.handle_event(&mut board, &down_a));
    assert!(grid_a.handle_event(&mut board, &down_a));
    assert!(grid_b.handle_event(&mut board, &down_b));

    let move_a = PointerEvent::moved(300.0, 50.0);
    let move_b = PointerEvent::moved(300.0, 450.0).with_pointer(2);
    for event in [move_a, move_b] {
        grid_a.handle_event(&mut board, &event);
        grid_b.handle_event(&mut board, &event);
    }
    assert!(grid_a.is_dragging() && grid_b.is_dragging());
    let press_a2 = press(&board, "a2");
    assert!(!grid_a.handle_event(&mut board, &press_a2));

    grid_b.handle_event(&mut board, &PointerEvent::cancel().with_pointer(2));
    grid_a.handle_event(&mut board, &PointerEvent::up(300.0, 50.0));

    assert_eq!(board.order_ids_in(left), vec!["a2", "a3", "a1"]);
    assert_eq!(board.order_ids_in(right), vec!["b1", "b2", "b3"]);
    assert!(store.get_item("right").unwrap().is_none());
    assert_eq!(
        store.get_item("left").unwrap().as_deref(),
        Some(r#"["a2","a3","a1"]"#)
    );
}

fn wide_first_board(width: f64, ids: &[&str]) -> TileBoard {
    let mut board = TileBoard::new();
    board.add_container(BoardGeometry::default().with_width(width));
    board.add_tile("w1", 2);
    for id in ids {
        board.add_tile(id, 1);
    }
    board
}

fn assert_disjoint(plan: &OccupancyPlan) {
    let cells: Vec<GridCell> = plan.cells().collect();
    for (i, a) in cells.iter().enumerate() {
        for b in &cells[i + 1..] {
            assert!(!a.overlaps(b), "{a:?} overlaps {b:?}");
        }
    }
}

/// Moves the pointer and checks the plan still holds a 2-wide placeholder
/// in a grid of `columns`.
fn move_wide(board: &mut TileBoard, grid: &mut DraggableGrid, x: f64, y: f64, columns: usize) {
    grid.handle_event(board, &PointerEvent::moved(x, y));
    assert!(grid.is_dragging());
    assert_eq!(grid.metrics().map(|m| m.columns), Some(columns));
    let plan = grid.occupancy_plan().expect("plan while dragging");
    assert_eq!(plan.columns, columns);
    assert_eq!(plan.placeholder.map(|cell| cell.span), Some(2));
    assert_disjoint(plan);
}

#[test]
fn wide_tile_keeps_its_span_in_three_columns() {
    let mut board = wide_first_board(320.0, &["w2", "w3"]);
    let store = Rc::new(MemoryStore::new());
    let mut grid = grid_for(&mut board, store.clone());
    let w2 = board.tile("w2").unwrap();
    let w3 = board.tile("w3").unwrap();

    let down = press(&board, "w1");
    assert!(grid.handle_event(&mut board, &down));
    move_wide(&mut board, &mut grid, 300.0, 50.0, 3);
    assert_eq!(grid.placeholder_index(), Some(1));
    let plan = grid.occupancy_plan().unwrap();
    assert_eq!(plan.placeholder, Some(GridCell::new(0, 1, 2)));
    assert_eq!(plan.cell_of(w2), Some(GridCell::new(0, 0, 1)));
    assert_eq!(plan.cell_of(w3), Some(GridCell::new(1, 0, 1)));

    // appending would start the wide tile in the last column
    move_wide(&mut board, &mut grid, 300.0, 130.0, 3);
    assert_eq!(grid.placeholder_index(), Some(1));

    grid.handle_event(&mut board, &PointerEvent::up(300.0, 130.0));
    assert_eq!(board.order_ids(), vec!["w2", "w1", "w3"]);
    assert_eq!(
        store.get_item("dash").unwrap().as_deref(),
        Some(r#"["w2","w1","w3"]"#)
    );
}

#[test]
fn wide_tile_walks_a_four_column_row() {
    let mut board = wide_first_board(430.0, &["w2", "w3", "w4"]);
    let store = Rc::new(MemoryStore::new());
    let mut grid = grid_for(&mut board, store.clone());
    let w4 = board.tile("w4").unwrap();

    let down = press(&board, "w1");
    assert!(grid.handle_event(&mut board, &down));
    move_wide(&mut board, &mut grid, 400.0, 50.0, 4);
    assert_eq!(grid.placeholder_index(), Some(2));
    let plan = grid.occupancy_plan().unwrap();
    assert_eq!(plan.placeholder, Some(GridCell::new(0, 2, 2)));
    assert_eq!(plan.cell_of(w4), Some(GridCell::new(1, 0, 1)));

    // past the last valid start column the placeholder stays put
    move_wide(&mut board, &mut grid, 300.0, 130.0, 4);
    assert_eq!(grid.placeholder_index(), Some(2));

    move_wide(&mut board, &mut grid, 20.0, 40.0, 4);
    assert_eq!(grid.placeholder_index(), Some(0));
    assert_eq!(
        grid.occupancy_plan().and_then(|plan| plan.placeholder),
        Some(GridCell::new(0, 0, 2))
    );

    move_wide(&mut board, &mut grid, 400.0, 50.0, 4);
    assert_eq!(grid.placeholder_index(), Some(2));
    grid.handle_event(&mut board, &PointerEvent::up(400.0, 50.0));

    assert_eq!(board.order_ids(), vec!["w2", "w3", "w1", "w4"]);
    assert_eq!(
        store.get_item("dash").unwrap().as_deref(),
        Some(r#"["w2","w3","w1","w4"]"#)
    );
    assert!(board.placeholders().is_empty());
}
