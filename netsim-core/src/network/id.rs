//! Identifiers for networks, devices and interfaces.
//!
//! Ids are never reused: a stale id keeps pointing at nothing instead of
//! silently aliasing a newer object.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_NETWORK: AtomicU64 = AtomicU64::new(1);

/// Identity of one [`Network`](super::Network).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NetworkId(u64);

impl NetworkId {
    pub(crate) fn next() -> Self {
        NetworkId(NEXT_NETWORK.fetch_add(1, Ordering::Relaxed))
    }
}

/// A device, scoped to the network that created it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DeviceId {
    pub(crate) network: NetworkId,
    pub(crate) index: u32,
}

/// An interface, scoped to the network that created it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct InterfaceId {
    pub(crate) network: NetworkId,
    pub(crate) index: u32,
}

impl DeviceId {
    pub fn network(&self) -> NetworkId {
        self.network
    }
}

impl InterfaceId {
    pub fn network(&self) -> NetworkId {
        self.network
    }
}

impl fmt::Display for NetworkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "net{}", self.0)
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/dev{}", self.network, self.index)
    }
}

impl fmt::Display for InterfaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/if{}", self.network, self.index)
    }
}
