use mip_wire::MipPacket;
use std::collections::VecDeque;

/// Bound on either pending queue; beyond this, packets are dropped.
const MAX_PENDING: usize = 1024;

/// Packets waiting for a next-hop answer from the routing daemon.
///
/// Strictly FIFO, with at most one routing REQ in flight: a REQ is issued
/// for the head of the queue only, and the next REQ goes out once the
/// response for the previous one has been consumed. The k-th response
/// therefore always pairs with the k-th enqueued packet.
#[derive(Debug, Default)]
pub struct RoutePending {
    queue: VecDeque<MipPacket>,
}

impl RoutePending {
    /// Enqueues a packet. Returns the destination to issue a REQ for, if
    /// this packet became the head of an idle queue.
    pub fn enqueue(&mut self, pdu: MipPacket) -> Result<Option<u8>, QueueFull> {
        if self.queue.len() >= MAX_PENDING {
            return Err(QueueFull);
        }

        let was_idle = self.queue.is_empty();
        let dest = pdu.dest;
        self.queue.push_back(pdu);

        Ok(was_idle.then_some(dest))
    }

    /// Consumes one response: yields the packet it answers and, if more
    /// packets are waiting, the destination to issue the next REQ for.
    pub fn on_response(&mut self) -> Option<(MipPacket, Option<u8>)> {
        let pdu = self.queue.pop_front()?;
        let next_request = self.queue.front().map(|p| p.dest);

        Some((pdu, next_request))
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

/// Packets waiting for ARP resolution, keyed by the next hop being
/// resolved. Multiple packets may wait on the same next hop; they drain in
/// enqueue order.
#[derive(Debug, Default)]
pub struct ArpPending {
    queue: VecDeque<(u8, MipPacket)>,
}

impl ArpPending {
    pub fn enqueue(&mut self, next_hop: u8, pdu: MipPacket) -> Result<(), QueueFull> {
        if self.queue.len() >= MAX_PENDING {
            return Err(QueueFull);
        }

        self.queue.push_back((next_hop, pdu));

        Ok(())
    }

    /// Removes and returns every packet waiting on `next_hop`, in order.
    pub fn drain(&mut self, next_hop: u8) -> Vec<MipPacket> {
        let mut drained = Vec::new();
        let mut index = 0;

        while index < self.queue.len() {
            if self.queue[index].0 == next_hop {
                if let Some((_, pdu)) = self.queue.remove(index) {
                    drained.push(pdu);
                }
            } else {
                index += 1;
            }
        }

        drained
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct QueueFull;

#[cfg(test)]
mod tests {
    use super::*;
    use mip_wire::SduType;

    fn pdu(dest: u8) -> MipPacket {
        MipPacket::new(dest, 10, 8, SduType::Ping, Vec::new())
    }

    #[test]
    fn first_enqueue_triggers_request() {
        let mut pending = RoutePending::default();

        assert_eq!(pending.enqueue(pdu(20)).unwrap(), Some(20));
        assert_eq!(pending.enqueue(pdu(30)).unwrap(), None);
    }

    #[test]
    fn responses_consume_in_fifo_order_and_chain_requests() {
        let mut pending = RoutePending::default();
        pending.enqueue(pdu(20)).unwrap();
        pending.enqueue(pdu(30)).unwrap();

        let (first, next) = pending.on_response().unwrap();
        assert_eq!(first.dest, 20);
        assert_eq!(next, Some(30));

        let (second, next) = pending.on_response().unwrap();
        assert_eq!(second.dest, 30);
        assert_eq!(next, None);
    }

    #[test]
    fn response_with_empty_queue_is_none() {
        let mut pending = RoutePending::default();

        assert!(pending.on_response().is_none());
    }

    #[test]
    fn route_queue_is_bounded() {
        let mut pending = RoutePending::default();

        for _ in 0..MAX_PENDING {
            pending.enqueue(pdu(20)).unwrap();
        }

        assert_eq!(pending.enqueue(pdu(20)).unwrap_err(), QueueFull);
    }

    #[test]
    fn arp_drain_only_matches_key_and_keeps_order() {
        let mut pending = ArpPending::default();
        pending.enqueue(20, pdu(40)).unwrap();
        pending.enqueue(30, pdu(50)).unwrap();
        pending.enqueue(20, pdu(60)).unwrap();

        let drained = pending.drain(20);

        assert_eq!(drained.iter().map(|p| p.dest).collect::<Vec<_>>(), [40, 60]);
        assert_eq!(pending.len(), 1);
        assert!(pending.drain(20).is_empty());
    }
}
