use std::io;
use std::rc::Rc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use clap::{Parser, ValueEnum};
use dash_grid::board::{BoardGeometry, TileBoard};
use dash_grid::controller::{DraggableGrid, GridConfig};
use dash_grid::host::{GridHost, NodeId, PointerEvent};
use dash_grid::layout::{PlanEntry, plan_occupancy};
use dash_grid::store::MemoryStore;

#[derive(Copy, Clone, Debug, ValueEnum)]
enum Mode {
    /// Plan random span layouts with a placeholder at a random index.
    Plan,
    /// Sweep a full drag session across an in-memory board.
    Drag,
}

#[derive(Parser, Debug)]
#[command(
    name = "grid-bench",
    version = env!("CARGO_PKG_VERSION"),
    about = "Throughput benchmark for grid planning and drag sessions"
)]
struct BenchCli {
    #[arg(short = 'm', long, value_enum, default_value_t = Mode::Plan)]
    mode: Mode,

    /// Items per layout.
    #[arg(short = 'n', long = "items", default_value_t = 48)]
    items: usize,

    /// Grid columns.
    #[arg(short = 'c', long = "columns", default_value_t = 6)]
    columns: usize,

    /// Widest span an item may take.
    #[arg(long = "max-span", default_value_t = 3)]
    max_span: usize,

    /// How long to run the benchmark.
    #[arg(
        short = 'd',
        long = "duration",
        value_name = "SECONDS",
        default_value_t = 3.0
    )]
    duration_seconds: f64,
}

struct BenchConfig {
    mode: Mode,
    items: usize,
    columns: usize,
    max_span: usize,
    duration: Duration,
}

impl TryFrom<&BenchCli> for BenchConfig {
    type Error = String;

    fn try_from(cli: &BenchCli) -> Result<Self, Self::Error> {
        if !(0.1..=600.0).contains(&cli.duration_seconds) {
            return Err("duration must be between 0.1 and 600 seconds".to_string());
        }
        if !(2..=10_000).contains(&cli.items) {
            return Err("items must be between 2 and 10000".to_string());
        }
        if !(1..=64).contains(&cli.columns) {
            return Err("columns must be between 1 and 64".to_string());
        }
        if cli.max_span == 0 {
            return Err("max-span must be at least 1".to_string());
        }
        Ok(Self {
            mode: cli.mode,
            items: cli.items,
            columns: cli.columns,
            max_span: cli.max_span.min(cli.columns),
            duration: Duration::from_secs_f64(cli.duration_seconds),
        })
    }
}

fn main() -> io::Result<()> {
    let args = BenchCli::parse();
    let config = BenchConfig::try_from(&args)
        .map_err(|msg| io::Error::new(io::ErrorKind::InvalidInput, msg))?;
    let stats = match config.mode {
        Mode::Plan => run_plan(&config)?,
        Mode::Drag => run_drag(&config),
    };
    println!("{}", stats.final_report(&config));
    Ok(())
}

fn run_plan(config: &BenchConfig) -> io::Result<BenchStats> {
    let mut stats = BenchStats::new();
    let mut rng = Lcg::seeded_from_clock();
    while stats.elapsed() < config.duration {
        let mut entries: Vec<PlanEntry> = (0..config.items)
            .map(|i| PlanEntry::node(NodeId(i as u32), 1 + rng.below(config.max_span)))
            .collect();
        let at = rng.below(entries.len() + 1);
        entries.insert(at, PlanEntry::placeholder(1 + rng.below(config.max_span)));

        let started = Instant::now();
        let plan = plan_occupancy(&entries, config.columns).map_err(io::Error::other)?;
        stats.record(started.elapsed(), plan.rows);

        let cells: Vec<_> = plan.cells().collect();
        for (i, a) in cells.iter().enumerate() {
            if cells[i + 1..].iter().any(|b| a.overlaps(b)) {
                return Err(io::Error::other(format!("overlapping cells in plan: {a:?}")));
            }
        }
    }
    stats.mark_completed();
    Ok(stats)
}

fn run_drag(config: &BenchConfig) -> BenchStats {
    let mut stats = BenchStats::new();
    let mut rng = Lcg::seeded_from_clock();
    let geometry = BoardGeometry::default()
        .with_cell(100.0, 80.0, 10.0)
        .with_width(config.columns as f64 * 110.0 - 10.0);
    while stats.elapsed() < config.duration {
        let mut board = TileBoard::new();
        let container = board.add_container(geometry);
        for i in 0..config.items {
            board.add_tile_to(container, &format!("w{i}"), 1 + rng.below(config.max_span));
        }
        let store = Rc::new(MemoryStore::new());
        let Some(mut grid) = DraggableGrid::new(
            &mut board,
            store,
            GridConfig::new(container, ".tile", ".tile-handle", "bench"),
        ) else {
            break;
        };
        let source = format!("w{}", rng.below(config.items));
        let (Some(handle), Ok(container_rect)) =
            (board.handle(&source), board.bounding_rect(container))
        else {
            break;
        };
        let Ok(start) = board.bounding_rect(handle) else {
            break;
        };

        let started = Instant::now();
        let (x0, y0) = (start.left + 1.0, start.top + 0.5);
        grid.handle_event(&mut board, &PointerEvent::down(x0, y0, handle));
        let steps = 32;
        for step in 1..=steps {
            let t = step as f64 / steps as f64;
            let x = container_rect.left + container_rect.width * t;
            let y = container_rect.top + container_rect.height * (1.0 - t);
            grid.handle_event(&mut board, &PointerEvent::moved(x, y));
            for frame in board.take_due_frames() {
                grid.on_animation_frame(&mut board, frame);
            }
        }
        grid.handle_event(&mut board, &PointerEvent::up(x0, y0));
        stats.record(started.elapsed(), steps);
    }
    stats.mark_completed();
    stats
}

struct BenchStats {
    start: Instant,
    completed_at: Option<Instant>,
    runs: u64,
    units: u64,
    total_time: Duration,
    fastest: Duration,
    slowest: Duration,
}

impl BenchStats {
    fn new() -> Self {
        Self {
            start: Instant::now(),
            completed_at: None,
            runs: 0,
            units: 0,
            total_time: Duration::ZERO,
            fastest: Duration::MAX,
            slowest: Duration::ZERO,
        }
    }

    fn elapsed(&self) -> Duration {
        match self.completed_at {
            Some(done) => done.duration_since(self.start),
            None => self.start.elapsed(),
        }
    }

    fn mark_completed(&mut self) {
        self.completed_at = Some(Instant::now());
    }

    fn record(&mut self, time: Duration, units: usize) {
        self.runs = self.runs.saturating_add(1);
        self.units = self.units.saturating_add(units as u64);
        self.total_time += time;
        self.fastest = self.fastest.min(time);
        self.slowest = self.slowest.max(time);
    }

    fn average_us(&self) -> f64 {
        if self.runs == 0 {
            return 0.0;
        }
        self.total_time.as_secs_f64() / self.runs as f64 * 1_000_000.0
    }

    fn fastest_us(&self) -> f64 {
        if self.runs == 0 {
            return 0.0;
        }
        self.fastest.as_secs_f64() * 1_000_000.0
    }

    fn slowest_us(&self) -> f64 {
        self.slowest.as_secs_f64() * 1_000_000.0
    }

    fn final_report(&self, config: &BenchConfig) -> String {
        let elapsed = self.elapsed().as_secs_f64();
        let per_second = if elapsed > 0.0 {
            self.runs as f64 / elapsed
        } else {
            0.0
        };
        let (mode, unit) = match config.mode {
            Mode::Plan => ("plan", "rows"),
            Mode::Drag => ("drag", "moves"),
        };
        indoc::formatdoc!(
            r#"
            Grid bench ({mode}) completed.
            Items: {items} | Columns: {columns} | Max span: {max_span}
            Runs: {runs} in {elapsed:.2}s (~{per_second:.0}/s)
            Avg run: {avg:.1} us | Best: {best:.1} us | Worst: {worst:.1} us
            Total {unit}: {units}
            "#,
            items = config.items,
            columns = config.columns,
            max_span = config.max_span,
            runs = self.runs,
            avg = self.average_us(),
            best = self.fastest_us(),
            worst = self.slowest_us(),
            units = self.units,
        )
    }
}

struct Lcg {
    state: u64,
}

impl Lcg {
    fn seeded_from_clock() -> Self {
        let seed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(0)
            ^ 0xA5A5_A5A5_1234_5678;
        Self { state: seed }
    }

    fn next(&mut self) -> u32 {
        self.state = self.state.wrapping_mul(6364136223846793005).wrapping_add(1);
        (self.state >> 32) as u32
    }

    /// Uniform-ish value in `0..bound`.
    fn below(&mut self, bound: usize) -> usize {
        if bound == 0 {
            return 0;
        }
        self.next() as usize % bound
    }
}
