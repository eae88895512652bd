use std::{
    thread,
    time::{Duration, Instant},
};

use log::{info, warn};
use rand::Rng;
use shared::{
    game_state::{GameState, Side},
    peer_msg::PeerMessage,
};

use crate::{
    error::{SessionError, Site},
    screen::Screen,
    session::Peer,
    shared_state::{score_message, Phase},
    shutdown::ShutdownReason,
    transport::Transport,
};

/// what one pass of the tick loop did while it held the lock.
enum Step {
    Complete,
    Played(GameState),
    Scored { side: Side, snapshot: GameState },
    Countdown { message: &'static str, snapshot: GameState },
}

/// advances the game once per tick interval until the round limit is reached or shutdown is
/// triggered. a goal this peer is authoritative for is scored here and broadcast as a reset.
pub fn run<T, S, R>(peer: &Peer<T>, screen: &mut S, rng: &mut R) -> Result<(), SessionError>
where
    T: Transport,
    S: Screen,
    R: Rng + ?Sized,
{
    let interval = peer.config.tick_interval();
    while !peer.shutdown.is_triggered() {
        let started = Instant::now();
        match step(peer, rng) {
            Step::Complete => {
                info!("all {} rounds played", peer.config.round_limit);
                peer.shutdown.trigger(ShutdownReason::RoundsComplete);
                break;
            }
            Step::Played(snapshot) => draw(screen, &snapshot),
            Step::Scored { side, snapshot } => {
                info!(
                    "{side:?} scored, {}-{} after {} rounds",
                    snapshot.left_score, snapshot.right_score, snapshot.rounds_played
                );
                draw(screen, &snapshot);
                peer.send(PeerMessage::RoundReset { snapshot }, Site::SendReset)?;
            }
            Step::Countdown { message, snapshot } => {
                draw(screen, &snapshot);
                countdown(peer, screen, message);
            }
        }
        thread::sleep(pause(started.elapsed(), interval));
    }
    Ok(())
}

fn step<T: Transport, R: Rng + ?Sized>(peer: &Peer<T>, rng: &mut R) -> Step {
    let mut sim = peer.state.lock();
    if sim.state.rounds_reached(peer.config.round_limit) {
        return Step::Complete;
    }
    match sim.phase {
        Phase::CountdownPending { message } => {
            sim.phase = Phase::CountingDown;
            Step::Countdown {
                message,
                snapshot: sim.state,
            }
        }
        // only this loop enters the countdown, and it leaves it before the next step.
        Phase::CountingDown => Step::Played(sim.state),
        Phase::Playing => match sim.state.advance(peer.role) {
            Some(side) => {
                sim.state.award_point(side);
                sim.state.reset(rng);
                sim.phase = Phase::CountdownPending {
                    message: score_message(side),
                };
                Step::Scored {
                    side,
                    snapshot: sim.state,
                }
            }
            None => Step::Played(sim.state),
        },
    }
}

/// shows the countdown without holding the lock, so sync keeps running underneath it.
fn countdown<T: Transport, S: Screen>(peer: &Peer<T>, screen: &mut S, message: &str) {
    for remaining in (1..=peer.config.countdown_steps).rev() {
        if let Err(err) = screen.countdown(message, remaining) {
            warn!("failed to draw the countdown: {err}");
        }
        if !peer.shutdown.sleep(peer.config.countdown_step) {
            return;
        }
    }
    let mut sim = peer.state.lock();
    // a reset that arrived meanwhile asked for a fresh countdown.
    if sim.phase == Phase::CountingDown {
        sim.state.recenter_paddles();
        sim.phase = Phase::Playing;
    }
}

fn draw<S: Screen>(screen: &mut S, state: &GameState) {
    if let Err(err) = screen.draw(state) {
        warn!("failed to draw the game: {err}");
    }
}

/// the rest of the tick interval. a tick that overran starts the next one straight away.
fn pause(elapsed: Duration, interval: Duration) -> Duration {
    interval.saturating_sub(elapsed)
}
