use crate::{DecodeError, Record};

pub const HELLO_TAG: [u8; 3] = *b"HEL";
pub const UPDATE_TAG: [u8; 3] = *b"UPD";
pub const REQUEST_TAG: [u8; 3] = *b"REQ";
pub const RESPONSE_TAG: [u8; 3] = *b"RSP";

const TAG_LEN: usize = 3;
const COSTS_LEN: usize = 256;

/// One message of the routing protocol.
///
/// On the IPC socket a routing message travels as a [`Record`] whose payload
/// is the 3-byte tag followed by the body; the record's `addr`/`ttl` prefix
/// completes the 5-byte routing header. On the MIP wire only the payload is
/// carried (as a ROUTING SDU) — the receiving MIP daemon rebuilds the prefix
/// from the PDU's source address and TTL, which is how the sender's identity
/// reaches the peer routing daemon.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoutingMsg {
    Hello,
    Update { costs: Box<[u8; COSTS_LEN]> },
    Request { lookup: u8 },
    Response { next_hop: u8 },
}

impl RoutingMsg {
    /// Serializes into a full IPC record with the given header prefix.
    pub fn into_record(self, addr: u8, ttl: u8) -> Record {
        let mut payload = Vec::with_capacity(TAG_LEN + 1);

        match self {
            RoutingMsg::Hello => payload.extend_from_slice(&HELLO_TAG),
            RoutingMsg::Update { costs } => {
                payload.extend_from_slice(&UPDATE_TAG);
                payload.extend_from_slice(costs.as_slice());
            }
            RoutingMsg::Request { lookup } => {
                payload.extend_from_slice(&REQUEST_TAG);
                payload.push(lookup);
            }
            RoutingMsg::Response { next_hop } => {
                payload.extend_from_slice(&RESPONSE_TAG);
                payload.push(next_hop);
            }
        }

        Record::new(addr, ttl, payload)
    }

    /// Parses a record payload (tag + body).
    pub fn decode(payload: &[u8]) -> Result<Self, DecodeError> {
        if payload.len() < TAG_LEN {
            return Err(DecodeError::Truncated {
                need: TAG_LEN,
                got: payload.len(),
            });
        }

        let tag = [payload[0], payload[1], payload[2]];
        let body = &payload[TAG_LEN..];

        match tag {
            HELLO_TAG => Ok(RoutingMsg::Hello),
            UPDATE_TAG => {
                if body.len() < COSTS_LEN {
                    return Err(DecodeError::Truncated {
                        need: TAG_LEN + COSTS_LEN,
                        got: payload.len(),
                    });
                }

                let mut costs = Box::new([0u8; COSTS_LEN]);
                costs.copy_from_slice(&body[..COSTS_LEN]);

                Ok(RoutingMsg::Update { costs })
            }
            REQUEST_TAG => {
                let lookup = *body.first().ok_or(DecodeError::Truncated {
                    need: TAG_LEN + 1,
                    got: payload.len(),
                })?;

                Ok(RoutingMsg::Request { lookup })
            }
            RESPONSE_TAG => {
                let next_hop = *body.first().ok_or(DecodeError::Truncated {
                    need: TAG_LEN + 1,
                    got: payload.len(),
                })?;

                Ok(RoutingMsg::Response { next_hop })
            }
            other => Err(DecodeError::UnknownTag(other)),
        }
    }

    /// Whether a record payload carries a routing RESPONSE.
    pub fn is_response(payload: &[u8]) -> bool {
        payload.starts_with(&RESPONSE_TAG)
    }
}
