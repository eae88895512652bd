use std::{
    fmt::Display,
    sync::Arc,
    thread::{self, Builder, JoinHandle},
};

use log::{debug, error, info, warn};
use rand::Rng;
use shared::{
    game_state::{GameState, Role},
    peer_msg::PeerMessage,
};

use crate::{
    config::SessionConfig,
    error::{AtSite, SessionError, Site},
    input::{self, InputSource},
    screen::Screen,
    shared_state::{Phase, SharedState, STARTING_MESSAGE},
    shutdown::{Shutdown, ShutdownReason},
    sync, tick,
    transport::Transport,
};

/// everything the activities of one session share.
pub struct Peer<T> {
    pub role: Role,
    pub transport: T,
    pub state: SharedState,
    pub shutdown: Shutdown,
    pub config: SessionConfig,
}

impl<T: Transport> Peer<T> {
    pub fn new(role: Role, transport: T, config: SessionConfig) -> Self {
        Self {
            role,
            transport,
            state: SharedState::default(),
            shutdown: Shutdown::new(),
            config,
        }
    }

    /// failures once shutdown has begun are expected, the peer may already be gone.
    pub fn send(&self, message: PeerMessage, site: Site) -> Result<(), SessionError> {
        match self.transport.send(&Vec::<u8>::from(message)) {
            Ok(_) => Ok(()),
            Err(err) if self.shutdown.is_triggered() => {
                debug!("dropped a send after shutdown: {err}");
                Ok(())
            }
            Err(err) => Err(err).at(site),
        }
    }
}

#[derive(Debug)]
pub struct Outcome {
    pub role: Role,
    pub reason: ShutdownReason,
    pub state: GameState,
    pub round_limit: u32,
}

impl Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let played = self.state.rounds_played;
        match self.reason {
            ShutdownReason::RoundsComplete => {
                write!(f, "all {} rounds played", self.round_limit)
            }
            ShutdownReason::Interrupted => write!(f, "^C"),
            ShutdownReason::PeerClosed => write!(
                f,
                "opponent left after {played} of {} rounds",
                self.round_limit
            ),
            ShutdownReason::Failed => write!(f, "error occurred"),
        }
    }
}

/// resets the game, runs the tick, sync and input activities until the round limit is reached
/// or shutdown is triggered, then waits for all of them. the first failure wins.
pub fn run<T, S, I, R>(
    peer: Arc<Peer<T>>,
    mut screen: S,
    mut keys: I,
    mut rng: R,
) -> Result<Outcome, SessionError>
where
    T: Transport,
    S: Screen,
    I: InputSource,
    R: Rng + Send + 'static,
{
    {
        let mut sim = peer.state.lock();
        sim.state.reset(&mut rng);
        sim.phase = Phase::CountdownPending {
            message: STARTING_MESSAGE,
        };
    }
    info!(
        "session started as {:?}, {} difficulty, {} rounds",
        peer.role, peer.config.difficulty, peer.config.round_limit
    );

    let tick = spawn_task("tick", &peer, move |peer| {
        tick::run(peer, &mut screen, &mut rng)
    })?;
    let others = [
        spawn_task("outbound_sync", &peer, sync::run_outbound),
        spawn_task("inbound_sync", &peer, sync::run_inbound),
        spawn_task("input", &peer, move |peer| input::run(peer, &mut keys)),
    ];

    let mut results = vec![join("tick", tick)];
    // the tick loop only returns once shutdown is underway, unless it panicked.
    peer.shutdown.trigger(ShutdownReason::Failed);
    if peer.shutdown.reason() != Some(ShutdownReason::PeerClosed) {
        if let Err(err) = peer.transport.send(&Vec::<u8>::from(PeerMessage::Close)) {
            warn!("failed to tell the peer the session is over: {err}");
        }
    }
    for (task, handle) in ["outbound_sync", "inbound_sync", "input"].into_iter().zip(others) {
        results.push(handle.and_then(|handle| join(task, handle)));
    }
    results.into_iter().collect::<Result<Vec<_>, _>>()?;

    let outcome = Outcome {
        role: peer.role,
        reason: peer.shutdown.reason().unwrap_or(ShutdownReason::Failed),
        state: peer.state.snapshot(),
        round_limit: peer.config.round_limit,
    };
    info!("session ended: {:?}", outcome.reason);
    Ok(outcome)
}

type Task = JoinHandle<Result<(), SessionError>>;

fn spawn_task<T, F>(task: &'static str, peer: &Arc<Peer<T>>, body: F) -> Result<Task, SessionError>
where
    T: Transport,
    F: FnOnce(&Peer<T>) -> Result<(), SessionError> + Send + 'static,
{
    let peer = Arc::clone(peer);
    let shutdown = peer.shutdown.clone();
    Builder::new()
        .name(task.to_owned())
        .spawn(move || {
            let _guard = FailOnPanic(peer.shutdown.clone());
            let result = body(&peer);
            if let Err(err) = &result {
                error!("{task} stopped: {err}");
                peer.shutdown.trigger(ShutdownReason::Failed);
            }
            result
        })
        .map_err(|source| {
            shutdown.trigger(ShutdownReason::Failed);
            SessionError::Spawn { task, source }
        })
}

fn join(task: &'static str, handle: Task) -> Result<(), SessionError> {
    handle
        .join()
        .unwrap_or(Err(SessionError::Panicked { task }))
}

/// stops the rest of the session when a task unwinds.
struct FailOnPanic(Shutdown);

impl Drop for FailOnPanic {
    fn drop(&mut self) {
        if thread::panicking() {
            self.0.trigger(ShutdownReason::Failed);
        }
    }
}
