use crate::daemon::{ClientId, Command, Daemon};
use anyhow::Result;
use mip_wire::ETHERTYPE_MIP;
use raw_link::{ETHER_HEADER_LEN, EtherHeader, MAX_FRAME_LEN, RawLink};
use seqpacket::{SeqPacketListener, SeqPacketStream};
use std::collections::HashMap;
use std::convert::Infallible;
use std::task::{Context, Poll};

/// Drives the [`Daemon`] against the raw link and the upper-layer socket.
///
/// Single-threaded: every input is handled to completion (including the
/// side-effects it produces) before the next one is looked at, which is what
/// makes the FIFO pairing of routing requests and responses deterministic.
pub struct Eventloop {
    link: RawLink,
    listener: SeqPacketListener,
    clients: HashMap<ClientId, SeqPacketStream>,
    daemon: Daemon,
    buf: Box<[u8; MAX_FRAME_LEN]>,
}

enum ClientEvent {
    Message(ClientId, usize),
    Closed(ClientId),
}

impl Eventloop {
    pub fn new(link: RawLink, listener: SeqPacketListener, daemon: Daemon) -> Self {
        Self {
            link,
            listener,
            clients: HashMap::new(),
            daemon,
            buf: Box::new([0u8; MAX_FRAME_LEN]),
        }
    }

    pub fn poll(&mut self, cx: &mut Context<'_>) -> Poll<Result<Infallible>> {
        loop {
            while let Some(command) = self.daemon.next_command() {
                self.execute(command);
            }

            match self.link.poll_recv(cx, self.buf.as_mut_slice()) {
                Poll::Ready(Ok((len, if_index))) => {
                    self.handle_raw_frame(len, if_index);
                    continue;
                }
                Poll::Ready(Err(e)) => {
                    tracing::warn!("Failed to receive from raw socket: {e}");
                    continue;
                }
                Poll::Pending => {}
            }

            match self.listener.poll_accept(cx) {
                Poll::Ready(Ok(stream)) => {
                    let id = self.daemon.handle_client_connected();
                    tracing::debug!(%id, "Accepted upper-layer connection");
                    self.clients.insert(id, stream);
                    continue;
                }
                Poll::Ready(Err(e)) => {
                    tracing::warn!("Failed to accept upper-layer connection: {e}");
                    continue;
                }
                Poll::Pending => {}
            }

            if let Some(event) = self.poll_clients(cx) {
                match event {
                    ClientEvent::Message(id, len) => {
                        self.daemon.handle_client_message(id, &self.buf[..len]);
                    }
                    ClientEvent::Closed(id) => {
                        self.clients.remove(&id);
                        self.daemon.handle_client_closed(id);
                    }
                }
                continue;
            }

            return Poll::Pending;
        }
    }

    fn poll_clients(&mut self, cx: &mut Context<'_>) -> Option<ClientEvent> {
        for (&id, stream) in &self.clients {
            match stream.poll_recv(cx, self.buf.as_mut_slice()) {
                Poll::Ready(Ok(0)) => return Some(ClientEvent::Closed(id)),
                Poll::Ready(Ok(len)) => return Some(ClientEvent::Message(id, len)),
                Poll::Ready(Err(e)) => {
                    tracing::debug!(%id, "Failed to read from upper-layer connection: {e}");
                    return Some(ClientEvent::Closed(id));
                }
                Poll::Pending => {}
            }
        }

        None
    }

    fn handle_raw_frame(&mut self, len: usize, if_index: u32) {
        let frame = &self.buf[..len];

        let header = match EtherHeader::decode(frame) {
            Ok(header) => header,
            Err(e) => {
                tracing::debug!("Dropping runt frame: {e}");
                return;
            }
        };

        // Acceptance filter: addressed to one of our MACs or broadcast,
        // and carrying the MIP EtherType.
        if header.ethertype != ETHERTYPE_MIP || !self.link.is_local_dst(header.dst) {
            tracing::trace!(src = %header.src, dst = %header.dst, "Frame not for us; dropping");
            return;
        }

        tracing::trace!(src = %header.src, dst = %header.dst, if_index, "Received frame");

        self.daemon
            .handle_frame(header.src, &self.buf[ETHER_HEADER_LEN..len], if_index);
    }

    fn execute(&mut self, command: Command) {
        match command {
            Command::SendFrame { if_index, dst, pdu } => {
                if let Err(e) = self.link.send_unicast(if_index, dst, &pdu.encode()) {
                    tracing::warn!(%dst, if_index, "Failed to send frame: {e}");
                }
            }
            Command::Broadcast { pdu } => {
                if let Err(e) = self.link.broadcast(&pdu.encode()) {
                    tracing::warn!("Failed to broadcast frame: {e}");
                }
            }
            Command::SendUpper { client, record } => {
                let Some(stream) = self.clients.get(&client) else {
                    tracing::debug!(%client, "Upper-layer connection is gone; dropping message");
                    return;
                };

                if let Err(e) = stream.send(&record.encode()) {
                    tracing::warn!(%client, "Failed to send to upper layer: {e}");
                }
            }
            Command::Close { client } => {
                tracing::debug!(%client, "Closing upper-layer connection");
                self.clients.remove(&client);
            }
        }
    }
}
