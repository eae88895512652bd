use std::sync::{Mutex, MutexGuard, PoisonError};

use shared::game_state::{GameState, Side};

pub const STARTING_MESSAGE: &str = "Starting Game";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Playing,
    /// a countdown was asked for and the tick loop has not started showing it yet.
    CountdownPending { message: &'static str },
    /// the tick loop is showing a countdown with the lock released. the ball stays frozen.
    CountingDown,
}

/// the popup shown while both peers wait out a reset after `side` scored.
pub fn score_message(side: Side) -> &'static str {
    match side {
        Side::Left => "<-- SCORE",
        Side::Right => "SCORE -->",
    }
}

#[derive(Debug)]
pub struct Simulation {
    pub state: GameState,
    pub phase: Phase,
}

/// the one lock every activity of a session goes through to read or write the game.
#[derive(Debug)]
pub struct SharedState {
    inner: Mutex<Simulation>,
}

impl SharedState {
    pub fn new(state: GameState, phase: Phase) -> Self {
        Self {
            inner: Mutex::new(Simulation { state, phase }),
        }
    }

    /// a panic while holding the lock leaves the game in a consistent enough state to keep
    /// drawing and syncing it, so poisoning is ignored.
    pub fn lock(&self) -> MutexGuard<'_, Simulation> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn snapshot(&self) -> GameState {
        self.lock().state
    }
}

impl Default for SharedState {
    fn default() -> Self {
        Self::new(GameState::default(), Phase::Playing)
    }
}
