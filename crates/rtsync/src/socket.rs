//! Low-level async rtnetlink socket operations.

use std::io;
use std::os::unix::io::{AsRawFd, RawFd};
use std::sync::atomic::{AtomicU32, Ordering};
use std::task::{Context, Poll};

use bytes::BytesMut;
use netlink_sys::{Socket, SocketAddr, protocols};
use tokio::io::Interest;
use tokio::io::unix::AsyncFd;

use crate::error::{Error, Result};

/// Receive buffer reserved per datagram. Large enough for any burst of
/// route notifications the kernel coalesces into one read.
const RECV_BUFFER: usize = 32768;

/// Async NETLINK_ROUTE socket.
///
/// A socket either subscribes to a multicast group mask at bind time (a
/// monitor handle) or binds with no groups (a control handle whose traffic
/// is exclusively request/reply).
pub struct NetlinkSocket {
    /// The underlying async file descriptor.
    fd: AsyncFd<Socket>,
    /// Sequence number counter.
    seq: AtomicU32,
    /// Local port ID (assigned by kernel at bind).
    pid: u32,
}

impl NetlinkSocket {
    /// Open a socket subscribed to the given multicast group mask
    /// (0 for a control handle), with kernel send/receive buffers
    /// enlarged to `buffer_size` bytes.
    pub fn open(groups: u32, buffer_size: usize) -> Result<Self> {
        let mut socket = Socket::new(protocols::NETLINK_ROUTE)?;
        set_buffer_sizes(&socket, buffer_size)?;
        socket.set_non_blocking(true)?;

        // Bind with the subscription mask and learn our port ID.
        let mut addr = SocketAddr::new(0, groups);
        socket.bind(&addr)?;
        socket.get_address(&mut addr)?;
        let pid = addr.port_number();

        // Extended ACK gives better error messages where supported.
        socket.set_ext_ack(true).ok();

        let fd = AsyncFd::new(socket)?;

        Ok(Self {
            fd,
            seq: AtomicU32::new(1),
            pid,
        })
    }

    /// Get the next sequence number.
    pub fn next_seq(&self) -> u32 {
        self.seq.fetch_add(1, Ordering::Relaxed)
    }

    /// Get the local port ID.
    pub fn pid(&self) -> u32 {
        self.pid
    }

    /// Send a message. Returns the number of bytes written; the caller
    /// does not wait for any kernel reply here.
    pub async fn send(&self, msg: &[u8]) -> Result<usize> {
        loop {
            let mut guard = self.fd.ready(Interest::WRITABLE).await?;

            match guard.try_io(|inner| inner.get_ref().send(msg, 0)) {
                Ok(Ok(n)) => return Ok(n),
                Ok(Err(e)) if e.kind() == io::ErrorKind::Interrupted => continue,
                Ok(Err(e)) => return Err(e.into()),
                Err(_would_block) => continue,
            }
        }
    }

    /// Receive one datagram, waiting until data arrives.
    pub async fn recv_msg(&self) -> Result<Vec<u8>> {
        loop {
            let mut buf = BytesMut::with_capacity(RECV_BUFFER);
            let mut guard = self.fd.ready(Interest::READABLE).await?;

            match guard.try_io(|inner| inner.get_ref().recv(&mut buf, 0)) {
                Ok(Ok(0)) => return Err(Error::Eof),
                Ok(Ok(_n)) => return Ok(buf.to_vec()),
                Ok(Err(e)) if e.kind() == io::ErrorKind::Interrupted => continue,
                Ok(Err(e)) => return Err(e.into()),
                Err(_would_block) => continue,
            }
        }
    }

    /// Receive one datagram if one is queued, `None` if the read would
    /// block. This is what drain loops call until the socket is empty.
    pub async fn try_recv(&self) -> Result<Option<Vec<u8>>> {
        std::future::poll_fn(|cx| match self.poll_recv(cx) {
            Poll::Ready(result) => Poll::Ready(result.map(Some)),
            Poll::Pending => Poll::Ready(Ok(None)),
        })
        .await
    }

    /// Wait until the socket is readable.
    pub async fn readable(&self) -> Result<()> {
        self.fd.ready(Interest::READABLE).await?;
        Ok(())
    }

    /// Poll for one incoming datagram.
    pub fn poll_recv(&self, cx: &mut Context<'_>) -> Poll<Result<Vec<u8>>> {
        loop {
            let mut buf = BytesMut::with_capacity(RECV_BUFFER);
            let mut guard = match self.fd.poll_read_ready(cx) {
                Poll::Ready(Ok(guard)) => guard,
                Poll::Ready(Err(e)) => return Poll::Ready(Err(e.into())),
                Poll::Pending => return Poll::Pending,
            };

            match guard.try_io(|inner| inner.get_ref().recv(&mut buf, 0)) {
                Ok(Ok(0)) => return Poll::Ready(Err(Error::Eof)),
                Ok(Ok(_n)) => return Poll::Ready(Ok(buf.to_vec())),
                Ok(Err(e)) if e.kind() == io::ErrorKind::Interrupted => continue,
                Ok(Err(e)) => return Poll::Ready(Err(e.into())),
                Err(_would_block) => continue,
            }
        }
    }
}

impl AsRawFd for NetlinkSocket {
    fn as_raw_fd(&self) -> RawFd {
        self.fd.get_ref().as_raw_fd()
    }
}

/// Enlarge the kernel-side send and receive buffers. Route dumps on busy
/// routers overflow the defaults long before the drain loop runs.
fn set_buffer_sizes(socket: &Socket, bytes: usize) -> Result<()> {
    let value = bytes as libc::c_int;
    for opt in [libc::SO_SNDBUF, libc::SO_RCVBUF] {
        // SAFETY: plain setsockopt on a fd we own, passing a c_int by
        // pointer with its exact size.
        let rc = unsafe {
            libc::setsockopt(
                socket.as_raw_fd(),
                libc::SOL_SOCKET,
                opt,
                &value as *const libc::c_int as *const libc::c_void,
                std::mem::size_of::<libc::c_int>() as libc::socklen_t,
            )
        };
        if rc < 0 {
            return Err(Error::Io(io::Error::last_os_error()));
        }
    }
    Ok(())
}
