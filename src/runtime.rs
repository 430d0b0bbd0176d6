//! Input plumbing for the lesson host: terminal events, the tick cadence
//! and the key bindings for player controls.

use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::time::Duration;

use crossterm::event::{self, Event as CtEvent, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::config::PlaybackTimings;

/// What the host loop reacts to between frames.
#[derive(Clone, Debug)]
pub enum PlayerEvent {
    Key(KeyEvent),
    Resize,
    /// No input arrived within one tick interval; the player should be ticked.
    Tick,
}

pub trait PlayerEventSource: Send + 'static {
    fn recv_timeout(&self, timeout: Duration) -> Result<PlayerEvent, RecvTimeoutError>;
}

/// Reads the terminal on a background thread and forwards key presses and resizes.
pub struct CrosstermEventSource {
    rx: Receiver<PlayerEvent>,
}

impl CrosstermEventSource {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();

        std::thread::spawn(move || loop {
            let forwarded = match event::read() {
                // Windows reports releases too
                Ok(CtEvent::Key(key)) if key.kind == KeyEventKind::Press => tx.send(PlayerEvent::Key(key)),
                Ok(CtEvent::Resize(_, _)) => tx.send(PlayerEvent::Resize),
                Ok(_) => Ok(()),
                Err(_) => break,
            };
            if forwarded.is_err() {
                break;
            }
        });

        Self { rx }
    }
}

impl Default for CrosstermEventSource {
    fn default() -> Self {
        Self::new()
    }
}

impl PlayerEventSource for CrosstermEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<PlayerEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

pub trait Ticker: Send + Sync + 'static {
    fn interval(&self) -> Duration;
}

/// Ticks the player at a constant cadence.
#[derive(Clone, Copy, Debug)]
pub struct FixedTicker {
    interval: Duration,
}

impl FixedTicker {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }

    pub fn from_millis(ms: u64) -> Self {
        Self::new(Duration::from_millis(ms.max(1)))
    }

    /// The subtitle poll is the finest-grained player timer, so the host
    /// ticks at that rate.
    pub fn for_timings(timings: &PlaybackTimings) -> Self {
        Self::from_millis(timings.subtitle_poll_ms.min(timings.progress_tick_ms))
    }
}

impl Ticker for FixedTicker {
    fn interval(&self) -> Duration {
        self.interval
    }
}

/// Feeds scripted input to a `Runner` in tests.
pub struct TestEventSource {
    rx: Receiver<PlayerEvent>,
}

impl TestEventSource {
    pub fn new(rx: Receiver<PlayerEvent>) -> Self {
        Self { rx }
    }
}

impl PlayerEventSource for TestEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<PlayerEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

/// A player control bound to a key.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Control {
    TogglePlay,
    ToggleMute,
    Next,
    Previous,
    Retry,
    /// Answer or reveal the n-th entry (zero based) of the scene's interaction.
    Pick(usize),
    Quit,
}

impl Control {
    pub fn from_key(key: &KeyEvent) -> Option<Self> {
        if key.modifiers.contains(KeyModifiers::CONTROL) {
            return (key.code == KeyCode::Char('c')).then_some(Control::Quit);
        }
        let control = match key.code {
            KeyCode::Esc | KeyCode::Char('q') => Control::Quit,
            KeyCode::Char(' ') => Control::TogglePlay,
            KeyCode::Char('m') => Control::ToggleMute,
            KeyCode::Right | KeyCode::Char('n') => Control::Next,
            KeyCode::Left | KeyCode::Char('p') => Control::Previous,
            KeyCode::Char('r') => Control::Retry,
            KeyCode::Char(c @ '1'..='9') => Control::Pick(c as usize - '1' as usize),
            _ => return None,
        };
        Some(control)
    }
}

/// Drives the lesson host: each step is one input event, or a tick once the
/// interval passes without input.
pub struct Runner<E: PlayerEventSource, T: Ticker> {
    event_source: E,
    ticker: T,
}

impl<E: PlayerEventSource, T: Ticker> Runner<E, T> {
    pub fn new(event_source: E, ticker: T) -> Self {
        Self { event_source, ticker }
    }

    pub fn step(&self) -> PlayerEvent {
        match self.event_source.recv_timeout(self.ticker.interval()) {
            Ok(ev) => ev,
            // a closed source leaves playback running on ticks alone
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => PlayerEvent::Tick,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn scripted(events: Vec<PlayerEvent>) -> Runner<TestEventSource, FixedTicker> {
        let (tx, rx) = mpsc::channel();
        for event in events {
            tx.send(event).unwrap();
        }
        Runner::new(TestEventSource::new(rx), FixedTicker::from_millis(1))
    }

    #[test]
    fn idle_host_ticks_the_player() {
        let runner = scripted(vec![]);
        assert_matches!(runner.step(), PlayerEvent::Tick);
        assert_matches!(runner.step(), PlayerEvent::Tick);
    }

    #[test]
    fn queued_controls_arrive_in_order_before_ticks() {
        let runner = scripted(vec![
            PlayerEvent::Key(key(KeyCode::Char(' '))),
            PlayerEvent::Resize,
            PlayerEvent::Key(key(KeyCode::Char('2'))),
        ]);

        assert_matches!(runner.step(), PlayerEvent::Key(k) if Control::from_key(&k) == Some(Control::TogglePlay));
        assert_matches!(runner.step(), PlayerEvent::Resize);
        assert_matches!(runner.step(), PlayerEvent::Key(k) if Control::from_key(&k) == Some(Control::Pick(1)));
        assert_matches!(runner.step(), PlayerEvent::Tick);
    }

    #[test]
    fn host_ticks_at_the_subtitle_poll_rate() {
        let timings = PlaybackTimings::default();
        assert_eq!(FixedTicker::for_timings(&timings).interval(), Duration::from_millis(50));

        let stalled = PlaybackTimings {
            subtitle_poll_ms: 0,
            ..PlaybackTimings::default()
        };
        assert_eq!(FixedTicker::for_timings(&stalled).interval(), Duration::from_millis(1));
    }

    #[test]
    fn key_bindings() {
        assert_eq!(Control::from_key(&key(KeyCode::Char(' '))), Some(Control::TogglePlay));
        assert_eq!(Control::from_key(&key(KeyCode::Char('m'))), Some(Control::ToggleMute));
        assert_eq!(Control::from_key(&key(KeyCode::Right)), Some(Control::Next));
        assert_eq!(Control::from_key(&key(KeyCode::Char('p'))), Some(Control::Previous));
        assert_eq!(Control::from_key(&key(KeyCode::Char('r'))), Some(Control::Retry));
        assert_eq!(Control::from_key(&key(KeyCode::Char('1'))), Some(Control::Pick(0)));
        assert_eq!(Control::from_key(&key(KeyCode::Char('9'))), Some(Control::Pick(8)));
        assert_eq!(Control::from_key(&key(KeyCode::Esc)), Some(Control::Quit));
        assert_eq!(Control::from_key(&key(KeyCode::Char('0'))), None);

        let ctrl_c = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(Control::from_key(&ctrl_c), Some(Control::Quit));
        let ctrl_m = KeyEvent::new(KeyCode::Char('m'), KeyModifiers::CONTROL);
        assert_eq!(Control::from_key(&ctrl_m), None);
    }
}
