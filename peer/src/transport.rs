use std::{io, net::UdpSocket};

/// a datagram link to the one peer of a session. the socket behind it is already connected, so
/// nothing needs to name the peer address on each call.
pub trait Transport: Send + Sync + 'static {
    fn send(&self, datagram: &[u8]) -> io::Result<usize>;

    /// blocks until a datagram arrives or the link's read timeout passes.
    fn recv(&self, buffer: &mut [u8]) -> io::Result<usize>;
}

impl Transport for UdpSocket {
    fn send(&self, datagram: &[u8]) -> io::Result<usize> {
        UdpSocket::send(self, datagram)
    }

    fn recv(&self, buffer: &mut [u8]) -> io::Result<usize> {
        UdpSocket::recv(self, buffer)
    }
}

/// a read timeout surfaces as `WouldBlock` on unix and `TimedOut` on windows.
pub fn is_timeout(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
    )
}
