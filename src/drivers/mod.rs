//! Terminal input and output seams for the demo.
//!
//! The grid engine itself never touches the terminal; only the demo binary
//! and its event loop go through these traits.

pub mod console;

use ::crossterm::event::Event;
use ratatui::layout::Size;
use std::io;
use std::time::Duration;

use crate::ui::UiFrame;

pub trait InputDriver {
    fn poll(&mut self, timeout: Duration) -> io::Result<bool>;
    fn read(&mut self) -> io::Result<Event>;
    fn set_mouse_capture(&mut self, _enabled: bool) -> io::Result<()> {
        Ok(())
    }
}

impl<T: InputDriver + ?Sized> InputDriver for &mut T {
    fn poll(&mut self, timeout: Duration) -> io::Result<bool> {
        (**self).poll(timeout)
    }

    fn read(&mut self) -> io::Result<Event> {
        (**self).read()
    }

    fn set_mouse_capture(&mut self, enabled: bool) -> io::Result<()> {
        (**self).set_mouse_capture(enabled)
    }
}

/// Screen the board is rendered to.
pub trait OutputDriver {
    /// Take over the screen. Calling it twice is harmless.
    fn enter(&mut self) -> io::Result<()>;
    fn exit(&mut self) -> io::Result<()>;
    /// Current size in cells; the demo sizes its board from the width.
    fn size(&self) -> io::Result<Size>;

    fn draw<F>(&mut self, f: F) -> io::Result<()>
    where
        F: FnOnce(UiFrame<'_>);
}

#[cfg(test)]
mod tests {
    use super::*;
    use ::crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

    struct Dummy;

    impl InputDriver for Dummy {
        fn poll(&mut self, _timeout: Duration) -> io::Result<bool> {
            Ok(true)
        }

        fn read(&mut self) -> io::Result<Event> {
            Ok(Event::Key(KeyEvent::new(
                KeyCode::Char('x'),
                KeyModifiers::NONE,
            )))
        }
    }

    fn drain_one<D: InputDriver>(mut driver: D) -> io::Result<Event> {
        assert!(driver.poll(Duration::from_millis(0))?);
        driver.read()
    }

    #[test]
    fn blanket_impl_for_mut_ref_works() {
        let mut d = Dummy;
        let ev = drain_one(&mut d).unwrap();
        let Event::Key(k) = ev else {
            panic!("expected key");
        };
        assert_eq!(k.code, KeyCode::Char('x'));
        assert!((&mut d).set_mouse_capture(true).is_ok());
    }
}
