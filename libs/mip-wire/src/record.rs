use crate::{DecodeError, MAX_SDU_LEN};

const PREFIX_LEN: usize = 2;

/// One message on the local socket between the MIP daemon and its clients.
///
/// Wire layout: `addr`, `ttl`, then the payload (at most [`MAX_SDU_LEN`]
/// bytes, so it always fits a PDU). The meaning of `addr` depends on
/// direction: the destination MIP address on the way down, the source MIP
/// address on the way up.
///
/// Routing messages reuse this prefix as the first two fields of their own
/// header, so a routing message is a [`Record`] whose payload starts with a
/// 3-byte ASCII tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub addr: u8,
    pub ttl: u8,
    pub payload: Vec<u8>,
}

impl Record {
    pub fn new(addr: u8, ttl: u8, payload: Vec<u8>) -> Self {
        debug_assert!(payload.len() <= MAX_SDU_LEN);

        Self { addr, ttl, payload }
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(PREFIX_LEN + self.payload.len());
        buf.push(self.addr);
        buf.push(self.ttl);
        buf.extend_from_slice(&self.payload);

        buf
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        if bytes.len() < PREFIX_LEN {
            return Err(DecodeError::Truncated {
                need: PREFIX_LEN,
                got: bytes.len(),
            });
        }

        let payload = &bytes[PREFIX_LEN..];

        if payload.len() > MAX_SDU_LEN {
            return Err(DecodeError::SduTooLong(payload.len()));
        }

        Ok(Self {
            addr: bytes[0],
            ttl: bytes[1],
            payload: payload.to_vec(),
        })
    }
}
