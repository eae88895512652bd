use std::{
    io,
    net::{Ipv4Addr, UdpSocket},
    sync::{
        atomic::{AtomicUsize, Ordering},
        mpsc, Arc, Mutex,
    },
    thread,
    time::{Duration, Instant},
};

use shared::{
    difficulty::Difficulty,
    game_state::{GameState, PaddleMove},
    peer_msg::{PeerMessage, MAX_PEER_MESSAGE_SIZE},
};

use crate::{
    config::SessionConfig,
    input::{Input, InputSource},
    screen::Screen,
    transport::{is_timeout, Transport},
};

const IDLE_RECV: Duration = Duration::from_millis(5);

pub fn fast_config() -> SessionConfig {
    SessionConfig {
        difficulty: Difficulty::Hard,
        round_limit: 1,
        sync_interval: Duration::from_millis(1),
        recv_timeout: Duration::from_millis(20),
        peer_timeout: Duration::from_secs(5),
        countdown_steps: 2,
        countdown_step: Duration::from_millis(10),
    }
}

/// two sockets on localhost connected to each other.
pub fn loopback_pair() -> (UdpSocket, UdpSocket) {
    let a = UdpSocket::bind((Ipv4Addr::LOCALHOST, 0)).unwrap();
    let b = UdpSocket::bind((Ipv4Addr::LOCALHOST, 0)).unwrap();
    a.connect(b.local_addr().unwrap()).unwrap();
    b.connect(a.local_addr().unwrap()).unwrap();
    for socket in [&a, &b] {
        socket
            .set_read_timeout(Some(fast_config().recv_timeout))
            .unwrap();
    }
    (a, b)
}

pub fn send_message(socket: &UdpSocket, message: PeerMessage) {
    socket.send(&Vec::<u8>::from(message)).unwrap();
}

/// the next well formed message within a second, if any.
pub fn recv_message(socket: &UdpSocket) -> Option<PeerMessage> {
    let mut buffer = [0; MAX_PEER_MESSAGE_SIZE];
    let deadline = Instant::now() + Duration::from_secs(1);
    while Instant::now() < deadline {
        match socket.recv(&mut buffer) {
            Ok(n) => {
                if let Ok(message) = PeerMessage::try_from(&buffer[..n]) {
                    return Some(message);
                }
            }
            Err(err) if is_timeout(&err) => {}
            Err(err) => panic!("receive failed: {err}"),
        }
    }
    None
}

/// runs `f` on its own thread and fails the test if it has not finished within `limit`.
pub fn within<T: Send + 'static>(limit: Duration, f: impl FnOnce() -> T + Send + 'static) -> T {
    let (tx, rx) = mpsc::channel();
    let handle = thread::spawn(move || {
        let _ = tx.send(f());
    });
    match rx.recv_timeout(limit) {
        Ok(value) => {
            handle.join().unwrap();
            value
        }
        Err(mpsc::RecvTimeoutError::Disconnected) => {
            // the closure panicked, surface its panic.
            match handle.join() {
                Err(panic) => std::panic::resume_unwind(panic),
                Ok(()) => unreachable!("finished without a value"),
            }
        }
        Err(mpsc::RecvTimeoutError::Timeout) => panic!("did not finish within {limit:?}"),
    }
}

/// records every message sent and never receives anything.
#[derive(Default)]
pub struct IdleTransport {
    sent: Mutex<Vec<Vec<u8>>>,
}

impl IdleTransport {
    pub fn sent(&self) -> Vec<PeerMessage> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .map(|datagram| PeerMessage::try_from(datagram.as_slice()).unwrap())
            .collect()
    }
}

impl Transport for IdleTransport {
    fn send(&self, datagram: &[u8]) -> io::Result<usize> {
        self.sent.lock().unwrap().push(datagram.to_vec());
        Ok(datagram.len())
    }

    fn recv(&self, _buffer: &mut [u8]) -> io::Result<usize> {
        thread::sleep(IDLE_RECV);
        Err(io::ErrorKind::WouldBlock.into())
    }
}

/// every send fails. receives idle unless `fail_receives` is set.
#[derive(Default)]
pub struct FailingTransport {
    pub sends: AtomicUsize,
    pub fail_receives: bool,
}

impl Transport for FailingTransport {
    fn send(&self, _datagram: &[u8]) -> io::Result<usize> {
        self.sends.fetch_add(1, Ordering::Relaxed);
        Err(io::ErrorKind::ConnectionRefused.into())
    }

    fn recv(&self, _buffer: &mut [u8]) -> io::Result<usize> {
        if self.fail_receives {
            return Err(io::ErrorKind::ConnectionReset.into());
        }
        thread::sleep(IDLE_RECV);
        Err(io::ErrorKind::WouldBlock.into())
    }
}

#[derive(Default)]
pub struct RecordingScreen {
    frames: Arc<AtomicUsize>,
    countdowns: Arc<Mutex<Vec<String>>>,
}

impl RecordingScreen {
    pub fn frames(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.frames)
    }

    /// one entry per countdown step shown.
    pub fn countdowns(&self) -> Arc<Mutex<Vec<String>>> {
        Arc::clone(&self.countdowns)
    }
}

impl Screen for RecordingScreen {
    fn draw(&mut self, _state: &GameState) -> io::Result<()> {
        self.frames.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn countdown(&mut self, message: &str, _remaining: u32) -> io::Result<()> {
        self.countdowns.lock().unwrap().push(message.to_owned());
        Ok(())
    }
}

pub struct NoInput;

impl InputSource for NoInput {
    fn next_input(&mut self, timeout: Duration) -> io::Result<Option<Input>> {
        thread::sleep(timeout.min(IDLE_RECV));
        Ok(None)
    }
}

/// a player holding the up key.
pub struct HoldUp;

impl InputSource for HoldUp {
    fn next_input(&mut self, timeout: Duration) -> io::Result<Option<Input>> {
        thread::sleep(timeout.min(IDLE_RECV));
        Ok(Some(Input::Move(PaddleMove::Up)))
    }
}
