mod arp_cache;
mod pending;

pub use arp_cache::{ArpCache, ArpCacheEntry};
pub use pending::{ArpPending, QueueFull, RoutePending};

use mip_wire::{
    ArpMessage, ArpOp, BROADCAST_ADDR, MAX_TTL, MipPacket, Record, RoutingMsg, SduType,
};
use raw_link::MacAddr;
use std::collections::{HashMap, VecDeque};
use std::fmt;

/// At most this many identified upper-layer connections.
const MAX_CLIENTS: usize = 10;

/// Identifies one accepted upper-layer connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClientId(u64);

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "client-{}", self.0)
    }
}

/// The side-effects requested by the [`Daemon`].
///
/// The daemon itself is sans-IO; the caller executes these.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Transmit a PDU to `dst` out of one specific interface.
    SendFrame {
        if_index: u32,
        dst: MacAddr,
        pdu: MipPacket,
    },
    /// Transmit a PDU to the broadcast MAC on every interface.
    Broadcast { pdu: MipPacket },
    /// Deliver a record to an upper-layer connection.
    SendUpper { client: ClientId, record: Record },
    /// Close an upper-layer connection.
    Close { client: ClientId },
}

/// The MIP daemon's forwarding plane.
///
/// Owns the ARP cache, both pending queues and the table of accepted
/// upper-layer connections. Inputs arrive through the `handle_*` methods;
/// resulting side-effects are queued and drained via [`Daemon::next_command`].
pub struct Daemon {
    local_addr: u8,

    arp_cache: ArpCache,
    arp_pending: ArpPending,
    route_pending: RoutePending,

    /// Accepted connections; `None` until the client has sent its
    /// identification byte.
    clients: HashMap<ClientId, Option<SduType>>,
    /// The most recently identified PING connection.
    ping_client: Option<ClientId>,
    /// The routing daemon's connection.
    routing_client: Option<ClientId>,
    next_client_id: u64,

    pending_commands: VecDeque<Command>,
}

impl Daemon {
    pub fn new(local_addr: u8) -> Self {
        Self {
            local_addr,
            arp_cache: ArpCache::default(),
            arp_pending: ArpPending::default(),
            route_pending: RoutePending::default(),
            clients: HashMap::new(),
            ping_client: None,
            routing_client: None,
            next_client_id: 0,
            pending_commands: VecDeque::new(),
        }
    }

    pub fn local_addr(&self) -> u8 {
        self.local_addr
    }

    /// Returns the next command to be executed.
    pub fn next_command(&mut self) -> Option<Command> {
        self.pending_commands.pop_front()
    }

    /// Registers a newly accepted connection and returns its id.
    pub fn handle_client_connected(&mut self) -> ClientId {
        let id = ClientId(self.next_client_id);
        self.next_client_id += 1;

        self.clients.insert(id, None);

        id
    }

    /// A connection was closed by the peer (zero-length read).
    pub fn handle_client_closed(&mut self, id: ClientId) {
        tracing::debug!(%id, "Upper-layer connection closed");

        self.clients.remove(&id);

        if self.ping_client == Some(id) {
            self.ping_client = None;
        }
        if self.routing_client == Some(id) {
            self.routing_client = None;
        }
    }

    /// One message received on an accepted connection.
    pub fn handle_client_message(&mut self, id: ClientId, bytes: &[u8]) {
        match self.clients.get(&id).copied() {
            None => {}
            Some(None) => self.identify_client(id, bytes),
            Some(Some(SduType::Ping)) => self.handle_ping_record(bytes),
            Some(Some(SduType::Routing)) => self.handle_routing_record(bytes),
            Some(Some(SduType::Arp)) => {
                debug_assert!(false, "ARP connections are rejected at identification")
            }
        }
    }

    /// One frame received on the raw link, already past the acceptance
    /// filter and stripped of its Ethernet header.
    pub fn handle_frame(&mut self, frame_src: MacAddr, pdu_bytes: &[u8], if_index: u32) {
        let pdu = match MipPacket::decode(pdu_bytes) {
            Ok(pdu) => pdu,
            Err(e) => {
                tracing::debug!("Dropping undecodable PDU: {e}");
                return;
            }
        };

        tracing::trace!(src = pdu.src, dest = pdu.dest, ttl = pdu.ttl, ?pdu.sdu_type, "Received PDU");

        if pdu.dest == self.local_addr || pdu.dest == BROADCAST_ADDR {
            match pdu.sdu_type {
                SduType::Ping => self.deliver_upper(self.ping_client, pdu),
                SduType::Routing => self.deliver_upper(self.routing_client, pdu),
                SduType::Arp => self.handle_arp(frame_src, pdu, if_index),
            }

            return;
        }

        // Transit traffic.
        if pdu.ttl <= 1 {
            tracing::debug!(src = pdu.src, dest = pdu.dest, "TTL expired; dropping packet");
            return;
        }

        let mut pdu = pdu;
        pdu.ttl -= 1;

        self.send_mip_packet(pdu);
    }

    fn identify_client(&mut self, id: ClientId, bytes: &[u8]) {
        let sdu_type = bytes.first().copied().and_then(|b| SduType::from_wire(b).ok());

        let accepted = match sdu_type {
            Some(SduType::Ping) | Some(SduType::Routing)
                if self.identified_clients() >= MAX_CLIENTS =>
            {
                tracing::debug!(%id, "Too many upper-layer connections; rejecting");
                None
            }
            Some(SduType::Ping) => {
                self.ping_client = Some(id);
                Some(SduType::Ping)
            }
            Some(SduType::Routing) => {
                self.routing_client = Some(id);
                Some(SduType::Routing)
            }
            Some(SduType::Arp) => {
                tracing::debug!(%id, "ARP connections are not accepted; rejecting");
                None
            }
            None => {
                tracing::debug!(%id, "Unknown identification byte; rejecting");
                None
            }
        };

        match accepted {
            Some(sdu_type) => {
                tracing::debug!(%id, ?sdu_type, "Upper-layer connection identified");
                self.clients.insert(id, Some(sdu_type));
            }
            None => {
                self.clients.remove(&id);
                self.pending_commands.push_back(Command::Close { client: id });
            }
        }
    }

    fn identified_clients(&self) -> usize {
        self.clients.values().filter(|t| t.is_some()).count()
    }

    fn handle_ping_record(&mut self, bytes: &[u8]) {
        let record = match Record::decode(bytes) {
            Ok(record) => record,
            Err(e) => {
                tracing::debug!("Dropping undecodable ping record: {e}");
                return;
            }
        };

        let pdu = MipPacket::new(
            record.addr,
            self.local_addr,
            sanitize_ttl(record.ttl),
            SduType::Ping,
            record.payload,
        );

        self.send_mip_packet(pdu);
    }

    fn handle_routing_record(&mut self, bytes: &[u8]) {
        let record = match Record::decode(bytes) {
            Ok(record) => record,
            Err(e) => {
                tracing::debug!("Dropping undecodable routing record: {e}");
                return;
            }
        };

        // A RSP answers one of our own REQs and never leaves this node.
        if RoutingMsg::is_response(&record.payload) {
            match RoutingMsg::decode(&record.payload) {
                Ok(RoutingMsg::Response { next_hop }) => self.handle_route_response(next_hop),
                Ok(_) | Err(_) => {
                    tracing::debug!("Dropping malformed routing response");
                }
            }

            return;
        }

        let pdu = MipPacket::new(
            record.addr,
            self.local_addr,
            sanitize_ttl(record.ttl),
            SduType::Routing,
            record.payload,
        );

        self.send_mip_packet(pdu);
    }

    /// Sends a PDU originated or forwarded by this node: broadcasts go
    /// straight to the link, everything else first needs a next hop from
    /// the routing daemon.
    fn send_mip_packet(&mut self, pdu: MipPacket) {
        if pdu.dest == BROADCAST_ADDR {
            self.pending_commands.push_back(Command::Broadcast { pdu });
            return;
        }

        if self.routing_client.is_none() {
            tracing::debug!(dest = pdu.dest, "No routing daemon connected; dropping packet");
            return;
        }

        match self.route_pending.enqueue(pdu) {
            Ok(Some(dest)) => self.send_routing_request(dest),
            Ok(None) => {}
            Err(_) => tracing::warn!("Route pending queue full; dropping packet"),
        }
    }

    fn send_routing_request(&mut self, dest: u8) {
        let Some(client) = self.routing_client else {
            tracing::debug!(dest, "No routing daemon connected; request not sent");
            return;
        };

        tracing::trace!(dest, "Requesting next hop");

        let record = RoutingMsg::Request { lookup: dest }.into_record(self.local_addr, 0);

        self.pending_commands
            .push_back(Command::SendUpper { client, record });
    }

    fn handle_route_response(&mut self, next_hop: u8) {
        let Some((pdu, next_request)) = self.route_pending.on_response() else {
            tracing::debug!("Routing response but no packet awaiting a route");
            return;
        };

        if next_hop == BROADCAST_ADDR {
            tracing::debug!(dest = pdu.dest, "No route; dropping packet");
        } else {
            tracing::trace!(dest = pdu.dest, next_hop, "Got next hop");
            self.transmit_via(next_hop, pdu);
        }

        if let Some(dest) = next_request {
            self.send_routing_request(dest);
        }
    }

    /// Transmits `pdu` towards `next_hop`, resolving its MAC first if
    /// necessary.
    fn transmit_via(&mut self, next_hop: u8, pdu: MipPacket) {
        match self.arp_cache.get(next_hop) {
            Some(entry) => {
                self.pending_commands.push_back(Command::SendFrame {
                    if_index: entry.if_index,
                    dst: entry.mac,
                    pdu,
                });
            }
            None => {
                tracing::debug!(next_hop, "No cached MAC; resolving");

                self.send_arp_request(next_hop);

                if self.arp_pending.enqueue(next_hop, pdu).is_err() {
                    tracing::warn!("ARP pending queue full; dropping packet");
                }
            }
        }
    }

    fn send_arp_request(&mut self, addr: u8) {
        let request = ArpMessage {
            op: ArpOp::Request,
            addr,
        };

        let pdu = MipPacket::new(
            BROADCAST_ADDR,
            self.local_addr,
            1,
            SduType::Arp,
            request.encode().to_vec(),
        );

        self.pending_commands.push_back(Command::Broadcast { pdu });
    }

    fn handle_arp(&mut self, frame_src: MacAddr, pdu: MipPacket, if_index: u32) {
        let msg = match ArpMessage::decode(pdu.sdu()) {
            Ok(msg) => msg,
            Err(e) => {
                tracing::debug!("Dropping undecodable ARP message: {e}");
                return;
            }
        };

        if msg.addr != self.local_addr && pdu.dest != self.local_addr {
            tracing::trace!(addr = msg.addr, "ARP message not for us; dropping");
            return;
        }

        match msg.op {
            ArpOp::Request => {
                self.arp_cache.add(pdu.src, frame_src, if_index);

                let response = ArpMessage {
                    op: ArpOp::Response,
                    addr: msg.addr,
                };

                let reply = MipPacket::new(
                    pdu.src,
                    self.local_addr,
                    1,
                    SduType::Arp,
                    response.encode().to_vec(),
                );

                // Replied directly on the receiving interface; an ARP reply
                // must not recurse into route lookup.
                self.pending_commands.push_back(Command::SendFrame {
                    if_index,
                    dst: frame_src,
                    pdu: reply,
                });
            }
            ArpOp::Response => {
                self.arp_cache.add(pdu.src, frame_src, if_index);

                let Some(entry) = self.arp_cache.get(msg.addr) else {
                    tracing::debug!(addr = msg.addr, "ARP response for an address we have no binding for");
                    return;
                };

                for pending in self.arp_pending.drain(msg.addr) {
                    self.pending_commands.push_back(Command::SendFrame {
                        if_index: entry.if_index,
                        dst: entry.mac,
                        pdu: pending,
                    });
                }
            }
        }
    }

    fn deliver_upper(&mut self, client: Option<ClientId>, pdu: MipPacket) {
        let Some(client) = client else {
            tracing::debug!(?pdu.sdu_type, "No upper-layer client for this SDU type; dropping");
            return;
        };

        let record = Record::new(pdu.src, pdu.ttl, pdu.into_sdu());

        self.pending_commands
            .push_back(Command::SendUpper { client, record });
    }
}

/// Upper layers may pass any TTL byte; the PDU field is 4 bits and 0 means
/// "use the maximum".
fn sanitize_ttl(ttl: u8) -> u8 {
    if ttl == 0 { MAX_TTL } else { ttl.min(MAX_TTL) }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LOCAL: u8 = 10;
    const MAC_B: MacAddr = MacAddr([2, 0, 0, 0, 0, 0x14]);
    const MAC_C: MacAddr = MacAddr([2, 0, 0, 0, 0, 0x1E]);

    fn daemon_with_routing() -> (Daemon, ClientId) {
        let mut daemon = Daemon::new(LOCAL);
        let routing = daemon.handle_client_connected();
        daemon.handle_client_message(routing, &[SduType::Routing as u8]);
        assert!(daemon.next_command().is_none());

        (daemon, routing)
    }

    fn connect_ping(daemon: &mut Daemon) -> ClientId {
        let ping = daemon.handle_client_connected();
        daemon.handle_client_message(ping, &[SduType::Ping as u8]);

        ping
    }

    fn routing_response(next_hop: u8) -> Vec<u8> {
        RoutingMsg::Response { next_hop }
            .into_record(LOCAL, 0)
            .encode()
    }

    fn drain(daemon: &mut Daemon) -> Vec<Command> {
        std::iter::from_fn(|| daemon.next_command()).collect()
    }

    #[test]
    fn ping_record_asks_routing_daemon_for_next_hop() {
        let (mut daemon, routing) = daemon_with_routing();
        connect_ping(&mut daemon);

        daemon.handle_client_message(
            daemon.ping_client.unwrap(),
            &Record::new(20, 8, b"hi".to_vec()).encode(),
        );

        let commands = drain(&mut daemon);

        assert_eq!(
            commands,
            [Command::SendUpper {
                client: routing,
                record: RoutingMsg::Request { lookup: 20 }.into_record(LOCAL, 0),
            }]
        );
    }

    #[test]
    fn response_with_unknown_mac_triggers_arp_request() {
        let (mut daemon, _) = daemon_with_routing();
        let ping = connect_ping(&mut daemon);

        daemon.handle_client_message(ping, &Record::new(20, 8, b"hi".to_vec()).encode());
        drain(&mut daemon);

        daemon.handle_client_message(daemon.routing_client.unwrap(), &routing_response(20));

        let commands = drain(&mut daemon);

        let expected_arp = ArpMessage {
            op: ArpOp::Request,
            addr: 20,
        };

        assert_eq!(
            commands,
            [Command::Broadcast {
                pdu: MipPacket::new(255, LOCAL, 1, SduType::Arp, expected_arp.encode().to_vec()),
            }]
        );
    }

    #[test]
    fn arp_response_drains_all_pending_packets_for_that_hop() {
        let (mut daemon, _) = daemon_with_routing();
        let ping = connect_ping(&mut daemon);

        // Two packets to the same destination; both end up ARP-pending on 20.
        daemon.handle_client_message(ping, &Record::new(20, 8, b"one".to_vec()).encode());
        daemon.handle_client_message(ping, &Record::new(20, 8, b"two".to_vec()).encode());
        let routing = daemon.routing_client.unwrap();
        daemon.handle_client_message(routing, &routing_response(20));
        daemon.handle_client_message(routing, &routing_response(20));
        drain(&mut daemon);

        // B answers our ARP request.
        let arp_response = ArpMessage {
            op: ArpOp::Response,
            addr: 20,
        };
        let pdu = MipPacket::new(LOCAL, 20, 1, SduType::Arp, arp_response.encode().to_vec());
        daemon.handle_frame(MAC_B, &pdu.encode(), 3);

        let commands = drain(&mut daemon);

        assert_eq!(
            commands,
            [
                Command::SendFrame {
                    if_index: 3,
                    dst: MAC_B,
                    pdu: MipPacket::new(20, LOCAL, 8, SduType::Ping, b"one".to_vec()),
                },
                Command::SendFrame {
                    if_index: 3,
                    dst: MAC_B,
                    pdu: MipPacket::new(20, LOCAL, 8, SduType::Ping, b"two".to_vec()),
                },
            ]
        );
    }

    #[test]
    fn cached_mac_transmits_immediately() {
        let (mut daemon, _) = daemon_with_routing();
        let ping = connect_ping(&mut daemon);

        // Learn B's MAC from an ARP request it sends us.
        let arp_request = ArpMessage {
            op: ArpOp::Request,
            addr: LOCAL,
        };
        let pdu = MipPacket::new(255, 20, 1, SduType::Arp, arp_request.encode().to_vec());
        daemon.handle_frame(MAC_B, &pdu.encode(), 2);
        drain(&mut daemon);

        daemon.handle_client_message(ping, &Record::new(20, 8, b"hi".to_vec()).encode());
        drain(&mut daemon);
        daemon.handle_client_message(daemon.routing_client.unwrap(), &routing_response(20));

        let commands = drain(&mut daemon);

        assert_eq!(
            commands,
            [Command::SendFrame {
                if_index: 2,
                dst: MAC_B,
                pdu: MipPacket::new(20, LOCAL, 8, SduType::Ping, b"hi".to_vec()),
            }]
        );
    }

    #[test]
    fn arp_request_for_us_is_answered_directly_on_receiving_interface() {
        let (mut daemon, _) = daemon_with_routing();

        let arp_request = ArpMessage {
            op: ArpOp::Request,
            addr: LOCAL,
        };
        let pdu = MipPacket::new(255, 20, 1, SduType::Arp, arp_request.encode().to_vec());
        daemon.handle_frame(MAC_B, &pdu.encode(), 7);

        let commands = drain(&mut daemon);

        let expected_reply = ArpMessage {
            op: ArpOp::Response,
            addr: LOCAL,
        };

        // The reply is unicast on interface 7, not routed.
        assert_eq!(
            commands,
            [Command::SendFrame {
                if_index: 7,
                dst: MAC_B,
                pdu: MipPacket::new(20, LOCAL, 1, SduType::Arp, expected_reply.encode().to_vec()),
            }]
        );
    }

    #[test]
    fn arp_for_someone_else_is_dropped() {
        let (mut daemon, _) = daemon_with_routing();

        let arp_request = ArpMessage {
            op: ArpOp::Request,
            addr: 99,
        };
        let pdu = MipPacket::new(255, 20, 1, SduType::Arp, arp_request.encode().to_vec());
        daemon.handle_frame(MAC_B, &pdu.encode(), 1);

        assert!(daemon.next_command().is_none());
    }

    #[test]
    fn no_route_response_drops_exactly_one_packet() {
        let (mut daemon, routing) = daemon_with_routing();
        let ping = connect_ping(&mut daemon);

        daemon.handle_client_message(ping, &Record::new(20, 8, b"one".to_vec()).encode());
        daemon.handle_client_message(ping, &Record::new(30, 8, b"two".to_vec()).encode());
        drain(&mut daemon);

        daemon.handle_client_message(routing, &routing_response(255));

        // The first packet is dropped; a REQ for the second goes out.
        let commands = drain(&mut daemon);

        assert_eq!(
            commands,
            [Command::SendUpper {
                client: routing,
                record: RoutingMsg::Request { lookup: 30 }.into_record(LOCAL, 0),
            }]
        );
    }

    #[test]
    fn response_with_empty_queue_is_ignored() {
        let (mut daemon, routing) = daemon_with_routing();

        daemon.handle_client_message(routing, &routing_response(20));

        assert!(daemon.next_command().is_none());
    }

    #[test]
    fn only_one_routing_request_outstanding_at_a_time() {
        let (mut daemon, routing) = daemon_with_routing();
        let ping = connect_ping(&mut daemon);

        daemon.handle_client_message(ping, &Record::new(20, 8, b"one".to_vec()).encode());
        daemon.handle_client_message(ping, &Record::new(30, 8, b"two".to_vec()).encode());

        let requests = drain(&mut daemon)
            .into_iter()
            .filter(|c| matches!(c, Command::SendUpper { .. }))
            .count();

        assert_eq!(requests, 1);

        // Consuming the first response releases the second request.
        daemon.handle_client_message(routing, &routing_response(255));

        assert_eq!(
            drain(&mut daemon),
            [Command::SendUpper {
                client: routing,
                record: RoutingMsg::Request { lookup: 30 }.into_record(LOCAL, 0),
            }]
        );
    }

    #[test]
    fn broadcast_destination_skips_routing() {
        let (mut daemon, _) = daemon_with_routing();
        let ping = connect_ping(&mut daemon);

        daemon.handle_client_message(ping, &Record::new(255, 1, b"hi".to_vec()).encode());

        assert_eq!(
            drain(&mut daemon),
            [Command::Broadcast {
                pdu: MipPacket::new(255, LOCAL, 1, SduType::Ping, b"hi".to_vec()),
            }]
        );
    }

    #[test]
    fn transit_packet_is_forwarded_with_decremented_ttl() {
        let (mut daemon, routing) = daemon_with_routing();

        let pdu = MipPacket::new(30, 20, 8, SduType::Ping, b"hi".to_vec());
        daemon.handle_frame(MAC_B, &pdu.encode(), 1);

        // Forwarding needs a next hop; the enqueued packet has TTL 7.
        assert_eq!(
            drain(&mut daemon),
            [Command::SendUpper {
                client: routing,
                record: RoutingMsg::Request { lookup: 30 }.into_record(LOCAL, 0),
            }]
        );

        daemon.handle_client_message(routing, &routing_response(30));
        drain(&mut daemon); // ARP request broadcast

        let arp_response = ArpMessage {
            op: ArpOp::Response,
            addr: 30,
        };
        let response_pdu =
            MipPacket::new(LOCAL, 30, 1, SduType::Arp, arp_response.encode().to_vec());
        daemon.handle_frame(MAC_C, &response_pdu.encode(), 2);

        assert_eq!(
            drain(&mut daemon),
            [Command::SendFrame {
                if_index: 2,
                dst: MAC_C,
                pdu: MipPacket::new(30, 20, 7, SduType::Ping, b"hi".to_vec()),
            }]
        );
    }

    #[test]
    fn transit_packet_with_expiring_ttl_is_dropped() {
        let (mut daemon, _) = daemon_with_routing();

        let pdu = MipPacket::new(30, 20, 1, SduType::Ping, b"hi".to_vec());
        daemon.handle_frame(MAC_B, &pdu.encode(), 1);

        assert!(daemon.next_command().is_none());
    }

    #[test]
    fn local_ping_is_delivered_with_source_and_ttl() {
        let (mut daemon, _) = daemon_with_routing();
        let ping = connect_ping(&mut daemon);

        let pdu = MipPacket::new(LOCAL, 20, 6, SduType::Ping, b"hi".to_vec());
        daemon.handle_frame(MAC_B, &pdu.encode(), 1);

        assert_eq!(
            drain(&mut daemon),
            [Command::SendUpper {
                client: ping,
                record: Record::new(20, 6, b"hi".to_vec()),
            }]
        );
    }

    #[test]
    fn local_routing_pdu_is_forwarded_to_routing_daemon() {
        let (mut daemon, routing) = daemon_with_routing();

        // A HELLO broadcast from 20: the SDU is tag-only, the daemon
        // prefixes the sender address and TTL on delivery.
        let pdu = MipPacket::new(255, 20, 1, SduType::Routing, b"HEL".to_vec());
        daemon.handle_frame(MAC_B, &pdu.encode(), 1);

        assert_eq!(
            drain(&mut daemon),
            [Command::SendUpper {
                client: routing,
                record: Record::new(20, 1, b"HEL".to_vec()),
            }]
        );
    }

    #[test]
    fn hello_from_routing_daemon_is_broadcast() {
        let (mut daemon, routing) = daemon_with_routing();

        daemon.handle_client_message(routing, &RoutingMsg::Hello.into_record(255, 1).encode());

        assert_eq!(
            drain(&mut daemon),
            [Command::Broadcast {
                pdu: MipPacket::new(255, LOCAL, 1, SduType::Routing, b"HEL".to_vec()),
            }]
        );
    }

    #[test]
    fn ping_ttl_zero_becomes_max() {
        let (mut daemon, routing) = daemon_with_routing();
        let ping = connect_ping(&mut daemon);

        daemon.handle_client_message(ping, &Record::new(20, 0, b"hi".to_vec()).encode());
        drain(&mut daemon);

        // Resolve the route and the MAC so the packet comes out.
        daemon.handle_client_message(routing, &routing_response(20));
        drain(&mut daemon);
        let arp_response = ArpMessage {
            op: ArpOp::Response,
            addr: 20,
        };
        let response_pdu =
            MipPacket::new(LOCAL, 20, 1, SduType::Arp, arp_response.encode().to_vec());
        daemon.handle_frame(MAC_B, &response_pdu.encode(), 1);

        let commands = drain(&mut daemon);

        assert_eq!(
            commands,
            [Command::SendFrame {
                if_index: 1,
                dst: MAC_B,
                pdu: MipPacket::new(20, LOCAL, MAX_TTL, SduType::Ping, b"hi".to_vec()),
            }]
        );
    }

    #[test]
    fn arp_client_is_rejected() {
        let mut daemon = Daemon::new(LOCAL);
        let client = daemon.handle_client_connected();

        daemon.handle_client_message(client, &[SduType::Arp as u8]);

        assert_eq!(drain(&mut daemon), [Command::Close { client }]);
    }

    #[test]
    fn unknown_identification_byte_is_rejected() {
        let mut daemon = Daemon::new(LOCAL);
        let client = daemon.handle_client_connected();

        daemon.handle_client_message(client, &[0x7F]);

        assert_eq!(drain(&mut daemon), [Command::Close { client }]);
    }

    #[test]
    fn latest_ping_client_wins_delivery() {
        let (mut daemon, _) = daemon_with_routing();
        let _first = connect_ping(&mut daemon);
        let second = connect_ping(&mut daemon);

        let pdu = MipPacket::new(LOCAL, 20, 6, SduType::Ping, b"hi".to_vec());
        daemon.handle_frame(MAC_B, &pdu.encode(), 1);

        assert_eq!(
            drain(&mut daemon),
            [Command::SendUpper {
                client: second,
                record: Record::new(20, 6, b"hi".to_vec()),
            }]
        );
    }

    #[test]
    fn disconnected_ping_client_stops_delivery() {
        let (mut daemon, _) = daemon_with_routing();
        let ping = connect_ping(&mut daemon);

        daemon.handle_client_closed(ping);

        let pdu = MipPacket::new(LOCAL, 20, 6, SduType::Ping, b"hi".to_vec());
        daemon.handle_frame(MAC_B, &pdu.encode(), 1);

        assert!(daemon.next_command().is_none());
    }

    #[test]
    fn client_cap_is_enforced() {
        let mut daemon = Daemon::new(LOCAL);

        for _ in 0..MAX_CLIENTS {
            connect_ping(&mut daemon);
        }
        assert!(daemon.next_command().is_none());

        let client = daemon.handle_client_connected();
        daemon.handle_client_message(client, &[SduType::Ping as u8]);

        assert_eq!(drain(&mut daemon), [Command::Close { client }]);
    }
}
