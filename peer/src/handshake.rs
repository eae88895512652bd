use std::{
    io,
    net::{Ipv4Addr, Ipv6Addr, SocketAddr, ToSocketAddrs, UdpSocket},
    time::{Duration, Instant},
};

use log::{debug, info, warn};
use shared::{
    difficulty::Difficulty,
    game_state::Role,
    peer_msg::{PeerMessage, MAX_PEER_MESSAGE_SIZE},
};

use crate::{
    error::{AtSite, SessionError, Site},
    transport::is_timeout,
};

/// how long a guest waits for the ack before sending its hello again.
const HELLO_RETRY: Duration = Duration::from_millis(500);

/// the outcome of a handshake: a socket connected to the peer plus the settings both sides agreed on.
#[derive(Debug)]
pub struct Established {
    pub socket: UdpSocket,
    pub role: Role,
    pub peer_addr: SocketAddr,
    pub difficulty: Difficulty,
    pub round_limit: u32,
}

pub fn bind_host(port: u16) -> Result<UdpSocket, SessionError> {
    UdpSocket::bind((Ipv4Addr::UNSPECIFIED, port)).at(Site::BindPort)
}

/// waits for the first `Hello`, locks the socket onto its sender and replies with the settings.
pub fn accept(
    socket: UdpSocket,
    difficulty: Difficulty,
    round_limit: u32,
) -> Result<Established, SessionError> {
    let mut buffer = [0; MAX_PEER_MESSAGE_SIZE];
    let peer_addr = loop {
        let (n, addr) = socket.recv_from(&mut buffer).at(Site::AwaitHello)?;
        match PeerMessage::try_from(&buffer[..n]) {
            Ok(PeerMessage::Hello) => break addr,
            Ok(message) => debug!("ignoring {} from {addr} while awaiting hello", message.tag()),
            Err(err) => debug!("ignoring malformed datagram from {addr}: {err}"),
        }
    };
    socket.connect(peer_addr).at(Site::AwaitHello)?;
    info!("challenger {peer_addr} joined");
    let ack = PeerMessage::Ack {
        difficulty,
        round_limit,
    };
    socket.send(&Vec::<u8>::from(ack)).at(Site::SendAck)?;
    Ok(Established {
        socket,
        role: Role::Host,
        peer_addr,
        difficulty,
        round_limit,
    })
}

/// greets the host at `host:port` and adopts the difficulty and round limit it answers with.
/// every resolved address is tried in turn, each getting an even share of `timeout`.
pub fn join(host: &str, port: u16, timeout: Duration) -> Result<Established, SessionError> {
    let addrs = (host, port)
        .to_socket_addrs()
        .at(Site::ResolvePeer)?
        .collect::<Vec<_>>();
    join_any(&addrs, timeout).ok_or_else(|| SessionError::Unresolved {
        addr: format!("{host}:{port}"),
    })?
}

/// the first address to answer wins. the last failure is reported when none does, and `None`
/// only when there was nothing to try.
fn join_any(
    addrs: &[SocketAddr],
    timeout: Duration,
) -> Option<Result<Established, SessionError>> {
    let share = timeout / u32::try_from(addrs.len()).unwrap_or(u32::MAX).max(1);
    let mut last = None;
    for &peer_addr in addrs {
        match greet(peer_addr, share) {
            Ok(established) => return Some(Ok(established)),
            Err(err) => {
                warn!("{peer_addr} did not answer: {err}");
                last = Some(Err(err));
            }
        }
    }
    last
}

/// repeats the hello to `peer_addr` until an ack arrives or `timeout` passes.
fn greet(peer_addr: SocketAddr, timeout: Duration) -> Result<Established, SessionError> {
    let local_addr: SocketAddr = match peer_addr {
        SocketAddr::V4(_) => (Ipv4Addr::UNSPECIFIED, 0).into(),
        SocketAddr::V6(_) => (Ipv6Addr::UNSPECIFIED, 0).into(),
    };
    let socket = UdpSocket::bind(local_addr).at(Site::CreateSocket)?;
    socket.connect(peer_addr).at(Site::CreateSocket)?;
    socket
        .set_read_timeout(Some(HELLO_RETRY.min(timeout)))
        .at(Site::CreateSocket)?;
    info!("greeting host {peer_addr}");

    let hello = Vec::<u8>::from(PeerMessage::Hello);
    let mut buffer = [0; MAX_PEER_MESSAGE_SIZE];
    let started = Instant::now();
    loop {
        socket.send(&hello).at(Site::SendHello)?;
        match socket.recv(&mut buffer) {
            Ok(n) => match PeerMessage::try_from(&buffer[..n]) {
                Ok(PeerMessage::Ack {
                    difficulty,
                    round_limit,
                }) => {
                    info!("host chose {difficulty} difficulty and {round_limit} rounds");
                    return Ok(Established {
                        socket,
                        role: Role::Guest,
                        peer_addr,
                        difficulty,
                        round_limit,
                    });
                }
                Ok(message) => debug!("ignoring {} while awaiting ack", message.tag()),
                Err(err) => debug!("ignoring malformed datagram: {err}"),
            },
            Err(err) if is_timeout(&err) => {}
            Err(err) => return Err(err).at(Site::AwaitAck),
        }
        if started.elapsed() >= timeout {
            return Err(io::Error::new(
                io::ErrorKind::TimedOut,
                format!("no answer from {peer_addr}"),
            ))
            .at(Site::AwaitAck);
        }
    }
}
