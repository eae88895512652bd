use std::{
    thread,
    time::{Duration, Instant},
};

use log::{debug, info, warn};
use shared::{
    game_state::Role,
    peer_msg::{PeerMessage, MAX_PEER_MESSAGE_SIZE},
};

use crate::{
    error::{AtSite, SessionError, Site},
    session::Peer,
    shared_state::{score_message, Phase},
    shutdown::ShutdownReason,
    transport::{is_timeout, Transport},
};

/// streams the local state to the peer every sync interval until the round limit is reached or
/// shutdown is triggered.
pub fn run_outbound<T: Transport>(peer: &Peer<T>) -> Result<(), SessionError> {
    while !peer.shutdown.is_triggered() {
        let snapshot = {
            let sim = peer.state.lock();
            if sim.state.rounds_reached(peer.config.round_limit) {
                break;
            }
            sim.state
        };
        peer.send(PeerMessage::StateUpdate { snapshot }, Site::SendState)?;
        thread::sleep(peer.config.sync_interval);
    }
    Ok(())
}

/// receives and applies the peer's messages until it closes, shutdown is triggered, or the peer
/// stays silent past the configured timeout. malformed datagrams are dropped.
pub fn run_inbound<T: Transport>(peer: &Peer<T>) -> Result<(), SessionError> {
    let mut buffer = [0; MAX_PEER_MESSAGE_SIZE];
    let mut last_heard = Instant::now();
    while !peer.shutdown.is_triggered() {
        let n = match peer.transport.recv(&mut buffer) {
            Ok(n) => n,
            Err(err) if is_timeout(&err) => {
                check_silence(last_heard.elapsed(), peer.config.peer_timeout)?;
                continue;
            }
            Err(err) if peer.shutdown.is_triggered() => {
                debug!("receive failed after shutdown: {err}");
                break;
            }
            Err(err) => return Err(err).at(Site::Receive),
        };
        last_heard = Instant::now();
        let message = match PeerMessage::try_from(&buffer[..n]) {
            Ok(message) => message,
            Err(err) => {
                debug!("ignoring malformed datagram: {err}");
                continue;
            }
        };
        if apply(peer, message)?.is_break() {
            break;
        }
    }
    Ok(())
}

fn apply<T: Transport>(
    peer: &Peer<T>,
    message: PeerMessage,
) -> Result<std::ops::ControlFlow<()>, SessionError> {
    use std::ops::ControlFlow::{Break, Continue};

    match message {
        PeerMessage::StateUpdate { snapshot } => {
            peer.state.lock().state.merge_update(peer.role, &snapshot);
        }
        PeerMessage::RoundReset { snapshot } => {
            let mut sim = peer.state.lock();
            let advanced = sim.state.merge_reset(peer.role, &snapshot);
            sim.phase = Phase::CountdownPending {
                message: score_message(peer.role.remote_side()),
            };
            info!(
                "peer scored, rounds played {}{}",
                sim.state.rounds_played,
                if advanced { ", round advanced" } else { "" }
            );
        }
        PeerMessage::Close => {
            info!("peer closed the session");
            // a peer that is already leaving has sent its own close.
            if !peer.shutdown.is_triggered() {
                peer.send(PeerMessage::Close, Site::SendClose)?;
            }
            peer.shutdown.trigger(ShutdownReason::PeerClosed);
            return Ok(Break(()));
        }
        // the ack went missing and the guest is still greeting.
        PeerMessage::Hello if peer.role == Role::Host => {
            debug!("answering a repeated hello");
            let ack = PeerMessage::Ack {
                difficulty: peer.config.difficulty,
                round_limit: peer.config.round_limit,
            };
            if let Err(err) = peer.send(ack, Site::SendAck) {
                warn!("failed to repeat the ack: {err}");
            }
        }
        message => debug!("ignoring {} mid-session", message.tag()),
    }
    Ok(Continue(()))
}

fn check_silence(silence: Duration, peer_timeout: Duration) -> Result<(), SessionError> {
    if silence > peer_timeout {
        Err(SessionError::PeerSilent { silence })
    } else {
        Ok(())
    }
}
