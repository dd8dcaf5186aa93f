use crate::table::RoutingTable;
use mip_wire::{BROADCAST_ADDR, MAX_COST, Record, RoutingMsg};
use std::collections::VecDeque;
use std::time::Duration;

/// How often we announce ourselves to our neighbours.
pub const HELLO_INTERVAL: Duration = Duration::from_secs(5);

/// A neighbour that stays silent for a whole window is considered dead.
pub const HELLO_TIMEOUT: Duration = Duration::from_secs(10);

const MAX_NODES: usize = 256;

/// The routing protocol engine.
///
/// Sans-IO: [`Router::handle_record`] consumes records read from the MIP
/// daemon socket, the two tick methods consume timer expiries, and the
/// records to send back accumulate until drained with
/// [`Router::next_record`].
pub struct Router {
    table: RoutingTable,
    /// Which neighbours we heard a HELLO from in the current window.
    checkins: [bool; MAX_NODES],
    pending_records: VecDeque<Record>,
}

impl Default for Router {
    fn default() -> Self {
        Self {
            table: RoutingTable::default(),
            checkins: [false; MAX_NODES],
            pending_records: VecDeque::new(),
        }
    }
}

impl Router {
    /// Returns the next record to write to the MIP daemon socket.
    pub fn next_record(&mut self) -> Option<Record> {
        self.pending_records.pop_front()
    }

    pub fn table(&self) -> &RoutingTable {
        &self.table
    }

    /// One record received from the MIP daemon. Its `addr` field carries
    /// the sender's MIP address for messages that travelled the wire, and
    /// the daemon's own address for a locally issued REQ.
    pub fn handle_record(&mut self, record: Record) {
        let msg = match RoutingMsg::decode(&record.payload) {
            Ok(msg) => msg,
            Err(e) => {
                tracing::debug!("Dropping undecodable routing message: {e}");
                return;
            }
        };

        match msg {
            RoutingMsg::Hello => self.handle_hello(record.addr),
            RoutingMsg::Update { costs } => self.handle_update(record.addr, &costs),
            RoutingMsg::Request { lookup } => self.handle_request(record.addr, lookup),
            RoutingMsg::Response { .. } => {
                tracing::debug!("Ignoring unexpected routing response");
            }
        }
    }

    /// Time to send the periodic HELLO beacon.
    pub fn handle_hello_tick(&mut self) {
        tracing::debug!("Sending HELLO");

        self.pending_records
            .push_back(RoutingMsg::Hello.into_record(BROADCAST_ADDR, 1));
    }

    /// End of a liveness window: poison every neighbour that did not check
    /// in, reset the check-ins of those that did.
    pub fn handle_timeout_tick(&mut self) {
        let mut changed = false;

        for neighbour in self.table.neighbours() {
            if self.checkins[neighbour as usize] {
                self.checkins[neighbour as usize] = false;
            } else {
                tracing::info!(neighbour, "Neighbour timed out");

                self.table.set_hop_unreachable(neighbour);
                changed = true;
            }
        }

        if changed {
            self.send_updates();
        }
    }

    fn handle_hello(&mut self, sender: u8) {
        tracing::debug!(sender, "Received HELLO");

        self.checkins[sender as usize] = true;

        if self.table.find_fastest_route(sender).cost != 1 {
            self.table.add_update_route(sender, sender, 1);
            tracing::info!(sender, "New neighbour");
        }

        // Even a known neighbour gets a fresh view; it may have restarted.
        self.send_updates();
    }

    fn handle_update(&mut self, sender: u8, received: &[u8; MAX_NODES]) {
        tracing::debug!(sender, "Received UPDATE");

        let previous = self.table.fastest_costs();
        let mut changed = false;

        if self.table.find_fastest_route(sender).cost != 1 {
            self.table.add_update_route(sender, sender, 1);
            changed = true;
            tracing::info!(sender, "New neighbour");
        }

        for node in 0..MAX_NODES {
            let dest = node as u8;

            if dest == sender {
                continue;
            }

            if received[node] == MAX_COST {
                // The sender lost this destination; forget the route via it.
                if self.table.route_exists(dest, sender) {
                    self.table.delete_route(dest, sender);
                    changed = true;
                }
            } else {
                // One hop to the sender plus whatever the sender pays.
                self.table
                    .add_update_route(dest, sender, received[node].saturating_add(1));
            }
        }

        if self.table.fastest_costs() != previous {
            changed = true;
        }

        if changed {
            self.send_updates();
        }
    }

    fn handle_request(&mut self, requester: u8, lookup: u8) {
        let fastest = self.table.find_fastest_route(lookup);

        let next_hop = if fastest.valid && fastest.cost < MAX_COST {
            fastest.next_hop
        } else {
            BROADCAST_ADDR
        };

        tracing::debug!(lookup, next_hop, "Answering route request");

        self.pending_records
            .push_back(RoutingMsg::Response { next_hop }.into_record(requester, 0));
    }

    /// Sends the current table to every neighbour, poisoned-reverse
    /// filtered per recipient.
    fn send_updates(&mut self) {
        for neighbour in self.table.neighbours() {
            let costs = self.table.fastest_costs_for_neighbour(neighbour);

            self.pending_records.push_back(
                RoutingMsg::Update {
                    costs: Box::new(costs),
                }
                .into_record(neighbour, 1),
            );
        }
    }
}
