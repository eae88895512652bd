use std::{io, time::Duration};

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use log::info;
use shared::game_state::PaddleMove;

use crate::{
    error::{AtSite, SessionError, Site},
    session::Peer,
    shutdown::ShutdownReason,
    transport::Transport,
};

/// how long one wait for a key lasts before the input loop checks for shutdown.
const INPUT_POLL: Duration = Duration::from_millis(100);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Input {
    Move(PaddleMove),
    Interrupt,
}

pub trait InputSource: Send + 'static {
    /// waits up to `timeout` for the next meaningful input.
    fn next_input(&mut self, timeout: Duration) -> io::Result<Option<Input>>;
}

/// reads the terminal's key events. raw mode has to be on for ctrl+c to arrive as a key.
pub struct Keyboard;

impl InputSource for Keyboard {
    fn next_input(&mut self, timeout: Duration) -> io::Result<Option<Input>> {
        if !event::poll(timeout)? {
            return Ok(None);
        }
        match event::read()? {
            Event::Key(key) => Ok(map_key(key)),
            _ => Ok(None),
        }
    }
}

fn map_key(key: KeyEvent) -> Option<Input> {
    if key.kind == KeyEventKind::Release {
        return None;
    }
    if key.modifiers == KeyModifiers::CONTROL && key.code == KeyCode::Char('c') {
        return Some(Input::Interrupt);
    }
    match key.code {
        KeyCode::Up | KeyCode::Char('w') => Some(Input::Move(PaddleMove::Up)),
        KeyCode::Down | KeyCode::Char('s') => Some(Input::Move(PaddleMove::Down)),
        KeyCode::Char('q') | KeyCode::Esc => Some(Input::Interrupt),
        _ => None,
    }
}

/// applies the local player's moves to their own paddle until shutdown. an interrupt ends the
/// session for both peers.
pub fn run<T: Transport, I: InputSource>(peer: &Peer<T>, source: &mut I) -> Result<(), SessionError> {
    let side = peer.role.local_side();
    while !peer.shutdown.is_triggered() {
        match source.next_input(INPUT_POLL).at(Site::ReadInput)? {
            Some(Input::Move(paddle_move)) => peer.state.lock().state.move_paddle(side, paddle_move),
            Some(Input::Interrupt) => {
                info!("interrupted by the player");
                peer.shutdown.trigger(ShutdownReason::Interrupted);
            }
            None => {}
        }
    }
    Ok(())
}
