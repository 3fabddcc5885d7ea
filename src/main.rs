use std::io;
use std::path::PathBuf;
use std::rc::Rc;
use std::time::Duration;

use clap::Parser;
use crossterm::event::{Event, KeyCode, KeyEventKind, KeyModifiers};
use indoc::indoc;
use ratatui::layout::Rect;
use tracing::{debug, info};

use dash_grid::board::{BoardGeometry, TileBoard};
use dash_grid::controller::GridConfig;
use dash_grid::debug_log::{self, DebugLogHandle};
use dash_grid::drivers::console::{ConsoleInputDriver, ConsoleOutputDriver};
use dash_grid::drivers::{InputDriver, OutputDriver};
use dash_grid::event_loop::{ControlFlow, EventLoop};
use dash_grid::host::{NodeId, PointerEvent};
use dash_grid::layout::GridOptions;
use dash_grid::registry::GridRegistry;
use dash_grid::store::{FileStore, MemoryStore, OrderStore};
use dash_grid::debug as debug_state;
use dash_grid::{tracing_sub, ui};

const LOG_ROWS: u16 = 7;
const TILE_WIDTH: f64 = 18.0;
const TILE_HEIGHT: f64 = 5.0;
const TILE_GAP: f64 = 1.0;

const KEY_HELP: &str = indoc! {"
    Drag a tile by its top border. While the demo runs:
      q, ctrl-c   quit
      esc         cancel the drag in progress
      e           toggle edit mode (gridlines)
      d           enable or disable dragging
      r           reapply the persisted order
"};

#[derive(Parser, Debug)]
#[command(
    name = "dash-grid",
    version = env!("CARGO_PKG_VERSION"),
    about = "Drag dashboard tiles around a terminal grid",
    after_help = KEY_HELP
)]
struct Cli {
    /// Comma separated tile ids. `id:span` makes a tile span several columns.
    #[arg(
        long,
        value_name = "IDS",
        default_value = "inbox:2,calendar,tasks,deals:2,notes,pipeline,reports"
    )]
    tiles: String,

    /// Fixed column count instead of fitting the terminal width.
    #[arg(long)]
    columns: Option<usize>,

    /// Directory for the persisted order. Without it the order lives in memory.
    #[arg(long, value_name = "DIR")]
    store_dir: Option<PathBuf>,

    #[arg(long, default_value = "dashboard.order")]
    storage_key: String,

    /// Write the debug log to this file on exit.
    #[arg(long, value_name = "FILE")]
    debug_log: Option<PathBuf>,
}

fn parse_tiles(list: &str) -> Vec<(String, usize)> {
    list.split(',')
        .filter_map(|part| {
            let part = part.trim();
            let (id, span) = match part.split_once(':') {
                Some((id, span)) => (id.trim(), span.trim().parse().unwrap_or(1)),
                None => (part, 1),
            };
            (!id.is_empty()).then(|| (id.to_string(), span))
        })
        .collect()
}

struct Demo {
    board: TileBoard,
    registry: GridRegistry,
    container: NodeId,
    edit_mode: bool,
    log: DebugLogHandle,
}

impl Demo {
    fn new(cli: &Cli, log: DebugLogHandle, width: u16) -> io::Result<Self> {
        let store: Rc<dyn OrderStore> = match &cli.store_dir {
            Some(dir) => Rc::new(FileStore::new(dir)),
            None => Rc::new(MemoryStore::new()),
        };
        let mut board = TileBoard::new();
        let container = board.add_container(
            BoardGeometry::default()
                .with_origin(1.0, 1.0)
                .with_width(f64::from(width.saturating_sub(2)))
                .with_cell(TILE_WIDTH, TILE_HEIGHT, TILE_GAP),
        );
        for (id, span) in parse_tiles(&cli.tiles) {
            board.add_tile_to(container, &id, span);
        }

        let mut grid = GridOptions::default();
        if let Some(columns) = cli.columns {
            grid = grid.with_columns(columns);
        }
        let config = GridConfig::new(container, ".tile", ".tile-handle", cli.storage_key.as_str())
            .with_grid(grid)
            .with_order_callback(|order| info!(order = ?order, "order changed"));
        let mut registry = GridRegistry::new();
        if registry.configure(&mut board, store, config).is_none() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "grid configuration rejected",
            ));
        }
        registry.reflow_all(&mut board);
        let edit_mode = registry
            .get(container)
            .is_some_and(|grid| grid.edit_mode_active());
        Ok(Self {
            board,
            registry,
            container,
            edit_mode,
            log,
        })
    }

    fn handle(&mut self, event: Event) -> ControlFlow {
        match event {
            Event::Mouse(mouse) => {
                if let Some(pointer) = self.board.pointer_from_mouse(mouse) {
                    self.registry.dispatch(&mut self.board, &pointer);
                }
            }
            Event::Resize(width, _) => {
                self.board
                    .set_width(self.container, f64::from(width.saturating_sub(2)));
                self.registry.reflow_all(&mut self.board);
            }
            Event::Key(key) if key.kind == KeyEventKind::Press => {
                if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL)
                {
                    return ControlFlow::Quit;
                }
                return self.handle_key(key.code);
            }
            _ => {}
        }
        ControlFlow::Continue
    }

    fn handle_key(&mut self, code: KeyCode) -> ControlFlow {
        let container = self.container;
        match code {
            KeyCode::Char('q') => return ControlFlow::Quit,
            KeyCode::Esc => {
                self.registry
                    .dispatch(&mut self.board, &PointerEvent::cancel());
            }
            KeyCode::Char('e') => {
                self.edit_mode = !self.edit_mode;
                if let Some(grid) = self.registry.get_mut(container) {
                    grid.set_edit_mode(&mut self.board, self.edit_mode);
                }
            }
            KeyCode::Char('d') => {
                if let Some(grid) = self.registry.get_mut(container) {
                    if grid.is_enabled() {
                        grid.disable(&mut self.board);
                    } else {
                        grid.enable(&mut self.board);
                    }
                }
            }
            KeyCode::Char('r') => {
                if let Some(grid) = self.registry.get_mut(container) {
                    grid.reapply(&mut self.board);
                }
            }
            _ => {}
        }
        ControlFlow::Continue
    }

    fn tick(&mut self) {
        for frame in self.board.take_due_frames() {
            self.registry.on_animation_frame(&mut self.board, frame);
        }
    }

    fn status(&self) -> String {
        let grid = self.registry.get(self.container);
        let enabled = grid.is_some_and(|g| g.is_enabled());
        let dragging = grid.is_some_and(|g| g.is_dragging());
        let snapshot = debug_state::debug_snapshot();
        format!(
            " q quit | esc cancel | e edit {} | d {} | r reapply | cols {} | drags {} swaps {}{}",
            if self.edit_mode { "on" } else { "off" },
            if enabled { "enabled" } else { "disabled" },
            snapshot.columns,
            snapshot.drag_ends,
            snapshot.swaps,
            if dragging { " | dragging" } else { "" },
        )
    }

    fn draw(&self, frame: &mut ui::UiFrame<'_>) {
        let area = frame.area();
        ui::render_board(frame, &self.board);
        let log_height = LOG_ROWS.min(area.height / 3);
        let log_area = Rect {
            x: area.x,
            y: area.bottom().saturating_sub(log_height + 1),
            width: area.width,
            height: log_height,
        };
        let lines = self.log.tail(log_height.saturating_sub(2) as usize);
        ui::render_log(frame, log_area, &lines);
        let status_area = Rect {
            x: area.x,
            y: area.bottom().saturating_sub(1),
            width: area.width,
            height: 1,
        };
        ui::render_status(frame, status_area, &self.status());
    }
}

fn main() -> io::Result<()> {
    let cli = Cli::parse();

    let log = DebugLogHandle::default();
    debug_log::set_global_debug_log(log.clone());
    debug_log::install_panic_hook(cli.debug_log.clone());
    tracing_sub::init_default();

    let mut output = ConsoleOutputDriver::new()?;
    let width = output.size()?.width;
    let mut demo = Demo::new(&cli, log.clone(), width)?;

    output.enter()?;
    let mut input = ConsoleInputDriver::new();
    input.set_mouse_capture(true)?;
    debug!(tiles = %cli.tiles, "demo started");

    let mut event_loop = EventLoop::new(input, Duration::from_millis(16));
    let result = event_loop.run(|_, event| {
        let flow = match event {
            Some(event) => demo.handle(event),
            None => {
                demo.tick();
                output.draw(|mut frame| demo.draw(&mut frame))?;
                ControlFlow::Continue
            }
        };
        Ok(flow)
    });

    event_loop.driver().set_mouse_capture(false)?;
    output.exit()?;
    if let Some(path) = &cli.debug_log {
        log.dump_to(path)?;
    }
    result
}
