use std::{fmt::Display, io, time::Duration};

use thiserror::Error;

/// where a fatal failure happened. each site ends the process with its own exit status so a
/// failed session can be traced back to the call that broke it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Site {
    ResolvePeer,
    CreateSocket,
    BindPort,
    ReadInput,
    AwaitHello,
    SendAck,
    SendHello,
    AwaitAck,
    SendState,
    SendReset,
    Receive,
    PeerSilent,
    SendClose,
}

impl Site {
    pub fn exit_code(self) -> u8 {
        match self {
            Site::ResolvePeer => 1,
            Site::CreateSocket => 3,
            Site::BindPort => 4,
            Site::ReadInput => 5,
            Site::AwaitHello => 23,
            Site::SendAck => 24,
            Site::SendHello => 25,
            Site::AwaitAck => 26,
            Site::SendState => 43,
            Site::SendReset => 51,
            Site::Receive => 91,
            Site::PeerSilent => 92,
            Site::SendClose => 123,
        }
    }
}

impl Display for Site {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Display::fmt(
            match self {
                Site::ResolvePeer => "resolving the host address",
                Site::CreateSocket => "creating the socket",
                Site::BindPort => "binding the listening port",
                Site::ReadInput => "reading keyboard input",
                Site::AwaitHello => "waiting for a challenger",
                Site::SendAck => "acknowledging the challenger",
                Site::SendHello => "greeting the host",
                Site::AwaitAck => "waiting for the host's settings",
                Site::SendState => "sending game state",
                Site::SendReset => "sending a round reset",
                Site::Receive => "receiving from the peer",
                Site::PeerSilent => "waiting on a silent peer",
                Site::SendClose => "acknowledging the peer's close",
            },
            f,
        )
    }
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("failed while {site}: {source}")]
    Transport {
        site: Site,
        #[source]
        source: io::Error,
    },
    #[error("{addr} did not resolve to any address")]
    Unresolved { addr: String },
    #[error("nothing heard from the peer for {silence:?}")]
    PeerSilent { silence: Duration },
    #[error("failed to start the {task} thread: {source}")]
    Spawn {
        task: &'static str,
        #[source]
        source: io::Error,
    },
    #[error("the {task} thread panicked")]
    Panicked { task: &'static str },
}

impl SessionError {
    pub fn site(&self) -> Option<Site> {
        match self {
            SessionError::Transport { site, .. } => Some(*site),
            SessionError::Unresolved { .. } => Some(Site::ResolvePeer),
            SessionError::PeerSilent { .. } => Some(Site::PeerSilent),
            SessionError::Spawn { .. } | SessionError::Panicked { .. } => None,
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.site().map_or(101, Site::exit_code)
    }
}

pub trait AtSite<T> {
    /// tags an io failure with the site it happened at.
    fn at(self, site: Site) -> Result<T, SessionError>;
}

impl<T> AtSite<T> for io::Result<T> {
    fn at(self, site: Site) -> Result<T, SessionError> {
        self.map_err(|source| SessionError::Transport { site, source })
    }
}
