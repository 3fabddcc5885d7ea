use std::collections::VecDeque;
use std::io::{self, Stdout};
use std::time::Duration;

use crossterm::event::{
    DisableMouseCapture, EnableMouseCapture, Event, KeyEventKind, MouseEvent, MouseEventKind,
};
use crossterm::terminal::{EnterAlternateScreen, LeaveAlternateScreen};
use crossterm::{execute, terminal};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::Size;

use super::{InputDriver, OutputDriver};
use crate::ui::UiFrame;

fn is_motion(mouse: &MouseEvent) -> bool {
    matches!(mouse.kind, MouseEventKind::Drag(_) | MouseEventKind::Moved)
}

/// Pop the next event worth handling. Key releases are dropped, and a run of
/// mouse motion collapses into its last position so a fast drag costs one
/// placeholder update instead of one per cell crossed.
fn next_coalesced(queue: &mut VecDeque<Event>) -> Option<Event> {
    loop {
        let event = queue.pop_front()?;
        match event {
            Event::Key(key) if key.kind == KeyEventKind::Release => continue,
            Event::Mouse(mut mouse) if is_motion(&mouse) => {
                while let Some(Event::Mouse(next)) = queue.front()
                    && next.kind == mouse.kind
                {
                    mouse = *next;
                    queue.pop_front();
                }
                return Some(Event::Mouse(mouse));
            }
            other => return Some(other),
        }
    }
}

/// Reads crossterm events, draining whatever is already buffered so motion
/// can be coalesced.
#[derive(Debug, Default)]
pub struct ConsoleInputDriver {
    queue: VecDeque<Event>,
    mouse_captured: bool,
}

impl ConsoleInputDriver {
    pub fn new() -> Self {
        Self::default()
    }

    fn fill(&mut self, timeout: Duration) -> io::Result<()> {
        if !crossterm::event::poll(timeout)? {
            return Ok(());
        }
        self.queue.push_back(crossterm::event::read()?);
        while crossterm::event::poll(Duration::ZERO)? {
            self.queue.push_back(crossterm::event::read()?);
        }
        Ok(())
    }
}

impl InputDriver for ConsoleInputDriver {
    fn poll(&mut self, timeout: Duration) -> io::Result<bool> {
        if self.queue.is_empty() {
            self.fill(timeout)?;
        }
        Ok(!self.queue.is_empty())
    }

    fn read(&mut self) -> io::Result<Event> {
        loop {
            if let Some(event) = next_coalesced(&mut self.queue) {
                return Ok(event);
            }
            self.queue.push_back(crossterm::event::read()?);
        }
    }

    fn set_mouse_capture(&mut self, enabled: bool) -> io::Result<()> {
        if enabled == self.mouse_captured {
            return Ok(());
        }
        if enabled {
            execute!(io::stdout(), EnableMouseCapture)?;
        } else {
            execute!(io::stdout(), DisableMouseCapture)?;
        }
        self.mouse_captured = enabled;
        Ok(())
    }
}

/// Alternate-screen ratatui terminal. Leaves the screen on drop.
pub struct ConsoleOutputDriver {
    terminal: Terminal<CrosstermBackend<Stdout>>,
    active: bool,
}

impl ConsoleOutputDriver {
    pub fn new() -> io::Result<Self> {
        let terminal = Terminal::new(CrosstermBackend::new(io::stdout()))?;
        Ok(Self {
            terminal,
            active: false,
        })
    }
}

impl OutputDriver for ConsoleOutputDriver {
    fn enter(&mut self) -> io::Result<()> {
        if self.active {
            return Ok(());
        }
        terminal::enable_raw_mode()?;
        execute!(self.terminal.backend_mut(), EnterAlternateScreen)?;
        self.terminal.hide_cursor()?;
        self.terminal.clear()?;
        self.active = true;
        Ok(())
    }

    fn exit(&mut self) -> io::Result<()> {
        if !self.active {
            return Ok(());
        }
        self.active = false;
        terminal::disable_raw_mode()?;
        execute!(
            self.terminal.backend_mut(),
            DisableMouseCapture,
            LeaveAlternateScreen
        )?;
        self.terminal.show_cursor()
    }

    fn size(&self) -> io::Result<Size> {
        self.terminal.size()
    }

    fn draw<F>(&mut self, f: F) -> io::Result<()>
    where
        F: FnOnce(UiFrame<'_>),
    {
        self.terminal.draw(|frame| f(UiFrame::new(frame)))?;
        Ok(())
    }
}

impl Drop for ConsoleOutputDriver {
    fn drop(&mut self) {
        let _ = self.exit();
    }
}
