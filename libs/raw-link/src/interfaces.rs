use anyhow::{Context as _, Result};
use nix::net::if_::InterfaceFlags;
use std::fmt;

/// The interface table is capped; nodes in this protocol are small.
pub const MAX_INTERFACES: usize = 10;

/// A 48-bit link-layer address.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct MacAddr(pub [u8; 6]);

impl MacAddr {
    pub const BROADCAST: MacAddr = MacAddr([0xFF; 6]);
}

impl fmt::Display for MacAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;

        write!(f, "{a:02x}:{b:02x}:{c:02x}:{d:02x}:{e:02x}:{g:02x}")
    }
}

impl fmt::Debug for MacAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// One usable network interface, recorded once at startup.
#[derive(Debug, Clone)]
pub struct Interface {
    pub name: String,
    pub mac: MacAddr,
    pub if_index: u32,
}

/// Enumerates all non-loopback interfaces with a link-layer address,
/// capped at [`MAX_INTERFACES`].
pub fn enumerate_interfaces() -> Result<Vec<Interface>> {
    let addrs = nix::ifaddrs::getifaddrs().context("Failed to enumerate interfaces")?;

    let mut interfaces = Vec::new();

    for ifaddr in addrs {
        if ifaddr.flags.contains(InterfaceFlags::IFF_LOOPBACK) {
            continue;
        }

        let Some(link) = ifaddr.address.as_ref().and_then(|a| a.as_link_addr()) else {
            continue;
        };

        let Some(mac) = link.addr() else {
            continue;
        };

        if interfaces.len() >= MAX_INTERFACES {
            tracing::warn!(
                name = %ifaddr.interface_name,
                "Ignoring interface beyond the supported maximum"
            );
            continue;
        }

        let interface = Interface {
            name: ifaddr.interface_name.clone(),
            mac: MacAddr(mac),
            if_index: link.ifindex() as u32,
        };

        tracing::debug!(name = %interface.name, mac = %interface.mac, if_index = interface.if_index, "Found interface");

        interfaces.push(interface);
    }

    anyhow::ensure!(!interfaces.is_empty(), "No usable network interfaces");

    Ok(interfaces)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mac_display_is_lowercase_colon_separated() {
        let mac = MacAddr([0x02, 0x42, 0xAC, 0x11, 0x00, 0x0A]);

        assert_eq!(mac.to_string(), "02:42:ac:11:00:0a");
    }

    #[test]
    fn broadcast_mac_is_all_ones() {
        assert_eq!(MacAddr::BROADCAST.to_string(), "ff:ff:ff:ff:ff:ff");
    }
}
