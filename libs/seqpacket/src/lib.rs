//! Async `SOCK_SEQPACKET` Unix sockets.
//!
//! The daemons talk to their clients over sequenced-packet sockets: reliable,
//! connection-oriented, and message-boundary preserving. tokio has no native
//! type for these, so we build them from `socket2` sockets registered with
//! [`AsyncFd`]. A zero-length read means the peer closed the connection.

#![cfg_attr(test, allow(clippy::unwrap_used))]

use std::future::poll_fn;
use std::io;
use std::os::fd::AsRawFd;
use std::path::Path;
use std::task::{ready, Context, Poll};

use socket2::{Domain, SockAddr, Socket, Type};
use tokio::io::unix::AsyncFd;

/// A listening SEQPACKET socket bound to a filesystem path.
pub struct SeqPacketListener {
    fd: AsyncFd<Socket>,
}

impl SeqPacketListener {
    /// Binds and listens at `path`, removing a stale socket file first.
    pub fn bind(path: &Path) -> io::Result<Self> {
        match std::fs::remove_file(path) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e),
        }

        let socket = Socket::new(Domain::UNIX, Type::SEQPACKET, None)?;
        socket.bind(&SockAddr::unix(path)?)?;
        socket.listen(16)?;
        socket.set_nonblocking(true)?;

        Ok(Self {
            fd: AsyncFd::new(socket)?,
        })
    }

    pub fn poll_accept(&self, cx: &mut Context<'_>) -> Poll<io::Result<SeqPacketStream>> {
        loop {
            let mut guard = ready!(self.fd.poll_read_ready(cx))?;

            match guard.try_io(|fd| fd.get_ref().accept()) {
                Ok(Ok((socket, _addr))) => {
                    socket.set_nonblocking(true)?;

                    return Poll::Ready(Ok(SeqPacketStream {
                        fd: AsyncFd::new(socket)?,
                    }));
                }
                Ok(Err(e)) => return Poll::Ready(Err(e)),
                Err(_would_block) => continue,
            }
        }
    }
}

/// One end of a connected SEQPACKET socket.
pub struct SeqPacketStream {
    fd: AsyncFd<Socket>,
}

impl SeqPacketStream {
    pub fn connect(path: &Path) -> io::Result<Self> {
        let socket = Socket::new(Domain::UNIX, Type::SEQPACKET, None)?;
        socket.connect(&SockAddr::unix(path)?)?;
        socket.set_nonblocking(true)?;

        Ok(Self {
            fd: AsyncFd::new(socket)?,
        })
    }

    /// Receives one message. `Ok(0)` means the peer closed the connection.
    pub fn poll_recv(&self, cx: &mut Context<'_>, buf: &mut [u8]) -> Poll<io::Result<usize>> {
        loop {
            let mut guard = ready!(self.fd.poll_read_ready(cx))?;

            match guard.try_io(|fd| sys_recv(fd.get_ref().as_raw_fd(), buf)) {
                Ok(result) => return Poll::Ready(result),
                Err(_would_block) => continue,
            }
        }
    }

    pub async fn recv(&self, buf: &mut [u8]) -> io::Result<usize> {
        poll_fn(|cx| self.poll_recv(cx, buf)).await
    }

    /// Sends one message without waiting for writability.
    ///
    /// SEQPACKET peers in this system drain their sockets promptly; a full
    /// send buffer is treated as a transient failure by callers.
    pub fn send(&self, buf: &[u8]) -> io::Result<()> {
        let n = sys_send(self.fd.as_raw_fd(), buf)?;

        debug_assert_eq!(n, buf.len());

        Ok(())
    }
}

fn sys_recv(fd: i32, buf: &mut [u8]) -> io::Result<usize> {
    let n = unsafe { libc::recv(fd, buf.as_mut_ptr().cast(), buf.len(), 0) };

    if n < 0 {
        return Err(io::Error::last_os_error());
    }

    Ok(n as usize)
}

fn sys_send(fd: i32, buf: &[u8]) -> io::Result<usize> {
    let n = unsafe { libc::send(fd, buf.as_ptr().cast(), buf.len(), 0) };

    if n < 0 {
        return Err(io::Error::last_os_error());
    }

    Ok(n as usize)
}
