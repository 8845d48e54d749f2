use std::collections::VecDeque;
use std::sync::mpsc::{self, Receiver};
use std::thread;
use std::time::Duration;

use crossterm::event::{self, Event as CtEvent, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::result::AttemptResult;
use crate::session::{DurationBudget, TypingSession};

/// Wall-clock interval between countdown ticks.
pub const TICK_INTERVAL: Duration = Duration::from_secs(1);

/// Unified event type consumed by the session driver.
///
/// Keystrokes and countdown ticks arrive on the same stream, so they apply
/// to the session strictly in arrival order; a tick can never interleave
/// with the processing of a keystroke.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// A typed character (`'\n'` for the Enter key).
    Key(char),
    Backspace,
    /// One second of countdown.
    Tick,
    /// The typist abandoned the attempt.
    Cancel,
}

/// Source of session events.
pub trait EventSource {
    /// Next event on the timeline, or `None` when the source is exhausted.
    fn next_event(&mut self) -> Option<SessionEvent>;
}

/// Production event source: a 1 Hz ticker thread and a terminal reader
/// thread merged into one channel.
pub struct ChannelEventSource {
    rx: Receiver<SessionEvent>,
}

impl ChannelEventSource {
    pub fn new(rx: Receiver<SessionEvent>) -> Self {
        Self { rx }
    }

    /// Spawn the two producer threads over the current terminal. The
    /// threads exit once the receiving side hangs up.
    pub fn from_terminal() -> Self {
        let (tx, rx) = mpsc::channel();

        let tick_tx = tx.clone();
        thread::spawn(move || loop {
            thread::sleep(TICK_INTERVAL);
            if tick_tx.send(SessionEvent::Tick).is_err() {
                break;
            }
        });

        thread::spawn(move || loop {
            let event = match event::read() {
                Ok(CtEvent::Key(key)) => map_key_event(key),
                Ok(_) => None,
                Err(_) => Some(SessionEvent::Cancel),
            };
            if let Some(event) = event {
                let stop = event == SessionEvent::Cancel;
                if tx.send(event).is_err() || stop {
                    break;
                }
            }
        });

        Self { rx }
    }
}

impl EventSource for ChannelEventSource {
    fn next_event(&mut self) -> Option<SessionEvent> {
        self.rx.recv().ok()
    }
}

/// Deterministic event source for tests and replays.
pub struct ScriptedEventSource {
    events: VecDeque<SessionEvent>,
}

impl ScriptedEventSource {
    pub fn new<I: IntoIterator<Item = SessionEvent>>(events: I) -> Self {
        Self {
            events: events.into_iter().collect(),
        }
    }

    /// Key events that reproduce `text` verbatim.
    pub fn keys_for(text: &str) -> Vec<SessionEvent> {
        text.chars().map(SessionEvent::Key).collect()
    }
}

impl EventSource for ScriptedEventSource {
    fn next_event(&mut self) -> Option<SessionEvent> {
        self.events.pop_front()
    }
}

/// Translate a terminal key event into a session event.
///
/// Esc and ctrl-c abandon the attempt; keys with no session meaning map to
/// `None` and never reach the session.
pub fn map_key_event(key: KeyEvent) -> Option<SessionEvent> {
    if key.kind == KeyEventKind::Release {
        return None;
    }
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        return Some(SessionEvent::Cancel);
    }
    match key.code {
        KeyCode::Char(c) => Some(SessionEvent::Key(c)),
        KeyCode::Enter => Some(SessionEvent::Key('\n')),
        KeyCode::Tab => Some(SessionEvent::Key('\t')),
        KeyCode::Backspace => Some(SessionEvent::Backspace),
        KeyCode::Esc => Some(SessionEvent::Cancel),
        _ => None,
    }
}

/// How a driven session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriveOutcome {
    /// The session finished and was scored.
    Finished(AttemptResult),
    /// The attempt was abandoned; no score exists.
    Canceled,
}

/// Drives one session over a serialized event stream.
///
/// The driver owns the session for the whole run. On `Cancel` (or an
/// exhausted source) the session is dropped with the driver, so no event
/// still in flight can ever reach a discarded session.
pub struct SessionDriver<S: EventSource> {
    session: TypingSession,
    source: S,
}

impl<S: EventSource> SessionDriver<S> {
    pub fn new(session: TypingSession, source: S) -> Self {
        Self { session, source }
    }

    /// Run the session to its end, invoking `observe` after every applied
    /// event. Used by the binary to redraw its status line.
    pub fn run_with<F>(mut self, budget: DurationBudget, mut observe: F) -> DriveOutcome
    where
        F: FnMut(&TypingSession, SessionEvent),
    {
        self.session.start(budget);
        // an empty reference scores before any event arrives
        if let Some(result) = self.session.result() {
            return DriveOutcome::Finished(result);
        }
        while let Some(event) = self.source.next_event() {
            match event {
                SessionEvent::Key(ch) => self.session.type_char(ch),
                SessionEvent::Backspace => self.session.backspace(),
                SessionEvent::Tick => self.session.tick(),
                SessionEvent::Cancel => return DriveOutcome::Canceled,
            }
            observe(&self.session, event);
            if let Some(result) = self.session.result() {
                return DriveOutcome::Finished(result);
            }
        }
        DriveOutcome::Canceled
    }

    pub fn run(self, budget: DurationBudget) -> DriveOutcome {
        self.run_with(budget, |_, _| {})
    }
}
