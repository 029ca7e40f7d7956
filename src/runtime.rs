use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::time::{Duration, Instant};

use crossterm::event::{self, Event as CtEvent, KeyEvent, MouseButton, MouseEventKind};

/// Unified event type consumed by the app runner
#[derive(Clone, Debug)]
pub enum GameEvent {
    Key(KeyEvent),
    /// left button press at terminal (column, row)
    Click(u16, u16),
    Resize,
    Tick,
}

/// Source of terminal events (keyboard, mouse, resize)
pub trait GameEventSource: Send + 'static {
    /// Block for up to `timeout` waiting for an event.
    /// Returns Ok(event) if an event arrives before the timeout, or Err(Timeout) if it expires.
    fn recv_timeout(&self, timeout: Duration) -> Result<GameEvent, RecvTimeoutError>;
}

/// Production event source using crossterm
pub struct CrosstermEventSource {
    rx: Receiver<GameEvent>,
}

impl CrosstermEventSource {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();

        std::thread::spawn(move || loop {
            let evt = match event::read() {
                Ok(CtEvent::Key(key)) => Some(GameEvent::Key(key)),
                Ok(CtEvent::Mouse(mouse)) => match mouse.kind {
                    MouseEventKind::Down(MouseButton::Left) => {
                        Some(GameEvent::Click(mouse.column, mouse.row))
                    }
                    _ => None,
                },
                Ok(CtEvent::Resize(_, _)) => Some(GameEvent::Resize),
                Ok(_) => None,
                Err(_) => break,
            };

            if let Some(evt) = evt {
                if tx.send(evt).is_err() {
                    break;
                }
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

impl GameEventSource for CrosstermEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<GameEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

/// Configurable ticker interface
pub trait Ticker: Send + Sync + 'static {
    fn interval(&self) -> Duration;
}

/// Fixed interval ticker
#[derive(Clone, Copy, Debug)]
pub struct FixedTicker {
    interval: Duration,
}

impl FixedTicker {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }
}

impl Ticker for FixedTicker {
    fn interval(&self) -> Duration {
        self.interval
    }
}

/// Test event source for unit tests
pub struct TestEventSource {
    rx: Receiver<GameEvent>,
}

impl TestEventSource {
    pub fn new(rx: Receiver<GameEvent>) -> Self {
        Self { rx }
    }
}

impl GameEventSource for TestEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<GameEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

/// Runner that advances the application one event/tick at a time
pub struct Runner<E: GameEventSource, T: Ticker> {
    event_source: E,
    ticker: T,
}

impl<E: GameEventSource, T: Ticker> Runner<E, T> {
    pub fn new(event_source: E, ticker: T) -> Self {
        Self {
            event_source,
            ticker,
        }
    }

    /// Blocks up to tick interval and returns the next event, or Tick on timeout
    pub fn step(&self) -> GameEvent {
        match self.event_source.recv_timeout(self.ticker.interval()) {
            Ok(ev) => ev,
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => GameEvent::Tick,
        }
    }
}

/// Response deadline for one round. A tap cancels it so a late tick cannot fire it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TrialTimer {
    started_at: Instant,
    deadline: Instant,
    cancelled: bool,
}

impl TrialTimer {
    pub fn start(started_at: Instant, timeout: Duration) -> Self {
        Self {
            started_at,
            deadline: started_at + timeout,
            cancelled: false,
        }
    }

    pub fn cancel(&mut self) {
        self.cancelled = true;
    }

    pub fn has_expired(&self, now: Instant) -> bool {
        !self.cancelled && now >= self.deadline
    }

    pub fn elapsed_ms(&self, now: Instant) -> u64 {
        now.saturating_duration_since(self.started_at).as_millis() as u64
    }

    /// Fraction of the response window still left, in `[0, 1]`
    pub fn remaining_fraction(&self, now: Instant) -> f64 {
        let total = self.deadline.saturating_duration_since(self.started_at);
        if total.is_zero() {
            return 0.0;
        }
        let left = self.deadline.saturating_duration_since(now);
        (left.as_secs_f64() / total.as_secs_f64()).clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    #[test]
    fn step_returns_tick_on_timeout() {
        let (_tx, rx) = mpsc::channel();
        let es = TestEventSource::new(rx);
        let ticker = FixedTicker::new(Duration::from_millis(1));
        let runner = Runner::new(es, ticker);

        match runner.step() {
            GameEvent::Tick => {}
            _ => panic!("expected Tick on timeout"),
        }
    }

    #[test]
    fn step_passes_through_events() {
        let (tx, rx) = mpsc::channel();
        tx.send(GameEvent::Click(3, 4)).unwrap();
        let es = TestEventSource::new(rx);
        let ticker = FixedTicker::new(Duration::from_millis(10));
        let runner = Runner::new(es, ticker);

        match runner.step() {
            GameEvent::Click(3, 4) => {}
            other => panic!("expected Click event, got {other:?}"),
        }
    }

    #[test]
    fn timer_expires_at_deadline() {
        let t0 = Instant::now();
        let timer = TrialTimer::start(t0, Duration::from_millis(1500));
        assert!(!timer.has_expired(t0 + Duration::from_millis(1499)));
        assert!(timer.has_expired(t0 + Duration::from_millis(1500)));
        assert_eq!(timer.elapsed_ms(t0 + Duration::from_millis(420)), 420);
    }

    #[test]
    fn cancelled_timer_never_expires() {
        let t0 = Instant::now();
        let mut timer = TrialTimer::start(t0, Duration::from_millis(10));
        timer.cancel();
        assert!(!timer.has_expired(t0 + Duration::from_secs(60)));
    }

    #[test]
    fn remaining_fraction_clamps() {
        let t0 = Instant::now();
        let timer = TrialTimer::start(t0, Duration::from_millis(1000));
        assert_eq!(timer.remaining_fraction(t0), 1.0);
        assert!((timer.remaining_fraction(t0 + Duration::from_millis(250)) - 0.75).abs() < 1e-9);
        assert_eq!(timer.remaining_fraction(t0 + Duration::from_secs(5)), 0.0);
    }
}
