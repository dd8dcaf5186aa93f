//! Raw Ethernet I/O for the MIP daemon.
//!
//! One AF_PACKET socket receives every MIP frame on the machine; the
//! arriving interface is recovered from the `sockaddr_ll` the kernel fills
//! in. Sends address a specific interface and destination MAC, with the
//! Ethernet header prepended here so the rest of the daemon only ever deals
//! in PDU bytes.

#![cfg_attr(test, allow(clippy::unwrap_used))]

mod frame;
mod interfaces;

pub use frame::{EtherHeader, ETHER_HEADER_LEN};
pub use interfaces::{enumerate_interfaces, Interface, MacAddr, MAX_INTERFACES};

use mip_wire::ETHERTYPE_MIP;
use std::io;
use std::os::fd::{AsRawFd, OwnedFd};
use std::task::{ready, Context, Poll};
use tokio::io::unix::AsyncFd;

/// Largest frame we ever exchange: Ethernet header + MIP header + full SDU.
pub const MAX_FRAME_LEN: usize = ETHER_HEADER_LEN + 4 + mip_wire::MAX_SDU_LEN;

/// A non-blocking AF_PACKET socket bound to the MIP EtherType, together
/// with the node's interface table.
pub struct RawLink {
    fd: AsyncFd<OwnedFd>,
    interfaces: Vec<Interface>,
}

impl RawLink {
    /// Opens the raw socket. Requires CAP_NET_RAW.
    pub fn open(interfaces: Vec<Interface>) -> io::Result<Self> {
        use socket2::{Domain, Protocol, Socket, Type};

        let protocol = Protocol::from((ETHERTYPE_MIP).to_be() as i32);
        let socket = Socket::new(Domain::PACKET, Type::RAW, Some(protocol))?;
        socket.set_nonblocking(true)?;

        Ok(Self {
            fd: AsyncFd::new(socket.into())?,
            interfaces,
        })
    }

    pub fn interfaces(&self) -> &[Interface] {
        &self.interfaces
    }

    /// Whether a frame addressed to `mac` should be accepted by this node.
    pub fn is_local_dst(&self, mac: MacAddr) -> bool {
        mac == MacAddr::BROADCAST || self.interfaces.iter().any(|i| i.mac == mac)
    }

    /// Receives one frame into `buf`, yielding its length and the index of
    /// the interface it arrived on.
    pub fn poll_recv(
        &self,
        cx: &mut Context<'_>,
        buf: &mut [u8],
    ) -> Poll<io::Result<(usize, u32)>> {
        loop {
            let mut guard = ready!(self.fd.poll_read_ready(cx))?;

            match guard.try_io(|fd| recv_with_ifindex(fd.get_ref(), buf)) {
                Ok(result) => return Poll::Ready(result),
                Err(_would_block) => continue,
            }
        }
    }

    /// Sends `payload` to `dst` out of the interface with index `if_index`,
    /// using that interface's own MAC as the frame source.
    pub fn send_unicast(&self, if_index: u32, dst: MacAddr, payload: &[u8]) -> io::Result<()> {
        let src = self
            .interfaces
            .iter()
            .find(|i| i.if_index == if_index)
            .map(|i| i.mac)
            .ok_or_else(|| {
                io::Error::new(io::ErrorKind::NotFound, format!("no interface {if_index}"))
            })?;

        self.send_frame(if_index, src, dst, payload)
    }

    /// Sends `payload` to the Ethernet broadcast address on every interface.
    pub fn broadcast(&self, payload: &[u8]) -> io::Result<()> {
        for interface in &self.interfaces {
            self.send_frame(interface.if_index, interface.mac, MacAddr::BROADCAST, payload)?;
        }

        Ok(())
    }

    fn send_frame(
        &self,
        if_index: u32,
        src: MacAddr,
        dst: MacAddr,
        payload: &[u8],
    ) -> io::Result<()> {
        let header = EtherHeader {
            dst,
            src,
            ethertype: ETHERTYPE_MIP,
        };

        let mut frame = Vec::with_capacity(ETHER_HEADER_LEN + payload.len());
        frame.extend_from_slice(&header.encode());
        frame.extend_from_slice(payload);

        tracing::trace!(%src, %dst, if_index, len = frame.len(), "Sending frame");

        send_to_interface(self.fd.get_ref(), if_index, dst, &frame)
    }
}

/// `recvfrom` with a `sockaddr_ll` out-parameter so we learn the arriving
/// interface index.
fn recv_with_ifindex(fd: &OwnedFd, buf: &mut [u8]) -> io::Result<(usize, u32)> {
    let mut addr: libc::sockaddr_ll = unsafe { std::mem::zeroed() };
    let mut addr_len = std::mem::size_of::<libc::sockaddr_ll>() as libc::socklen_t;

    let n = unsafe {
        libc::recvfrom(
            fd.as_raw_fd(),
            buf.as_mut_ptr().cast(),
            buf.len(),
            0,
            std::ptr::addr_of_mut!(addr).cast(),
            &mut addr_len,
        )
    };

    if n < 0 {
        return Err(io::Error::last_os_error());
    }

    Ok((n as usize, addr.sll_ifindex as u32))
}

fn send_to_interface(fd: &OwnedFd, if_index: u32, dst: MacAddr, frame: &[u8]) -> io::Result<()> {
    let mut addr: libc::sockaddr_ll = unsafe { std::mem::zeroed() };
    addr.sll_family = libc::AF_PACKET as libc::sa_family_t;
    addr.sll_protocol = ETHERTYPE_MIP.to_be();
    addr.sll_ifindex = if_index as i32;
    addr.sll_halen = 6;
    addr.sll_addr[..6].copy_from_slice(&dst.0);

    let n = unsafe {
        libc::sendto(
            fd.as_raw_fd(),
            frame.as_ptr().cast(),
            frame.len(),
            0,
            std::ptr::addr_of!(addr).cast(),
            std::mem::size_of::<libc::sockaddr_ll>() as libc::socklen_t,
        )
    };

    if n < 0 {
        return Err(io::Error::last_os_error());
    }

    Ok(())
}
