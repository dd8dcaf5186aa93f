use raw_link::MacAddr;

/// Hard upper bound; one entry per possible MIP address.
const MAX_ENTRIES: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArpCacheEntry {
    pub addr: u8,
    pub mac: MacAddr,
    pub if_index: u32,
}

/// The MIP-to-MAC resolution cache.
///
/// An insertion-ordered vector with linear lookup; entries live for the
/// process lifetime. `add` appends without deduplication and `get` returns
/// the first match, so the earliest learned binding wins.
#[derive(Debug, Default)]
pub struct ArpCache {
    entries: Vec<ArpCacheEntry>,
}

impl ArpCache {
    pub fn add(&mut self, addr: u8, mac: MacAddr, if_index: u32) {
        if self.entries.len() >= MAX_ENTRIES {
            tracing::debug!(addr, "ARP cache full; not caching binding");
            return;
        }

        tracing::trace!(addr, %mac, if_index, "Caching ARP binding");

        self.entries.push(ArpCacheEntry {
            addr,
            mac,
            if_index,
        });
    }

    pub fn get(&self, addr: u8) -> Option<ArpCacheEntry> {
        self.entries.iter().find(|e| e.addr == addr).copied()
    }

    /// Forgets all bindings for `addr`. Order of the remaining entries is
    /// not preserved.
    pub fn remove(&mut self, addr: u8) {
        while let Some(index) = self.entries.iter().position(|e| e.addr == addr) {
            self.entries.swap_remove(index);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
