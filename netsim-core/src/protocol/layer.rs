//! Layer binding table: which protocol is encapsulated inside which.

use std::collections::HashMap;
use std::fmt;

use super::{BuiltinProtocol, Packet, Protocol};
use crate::error::ProtocolError;

type Predicate = Box<dyn Fn(&Packet) -> bool + Send + Sync>;

struct LayerBinding {
    predicate: Predicate,
    next: BuiltinProtocol,
}

/// Registry of protocols and of the bindings between them.
///
/// Bindings are keyed by the outer protocol's name and tried in the order
/// they were added; the first predicate that accepts the parsed outer packet
/// wins. A fallback, if any, is used when no binding matches.
///
/// The table is built once and then shared read-only by every parse.
#[derive(Default)]
pub struct LayerTable {
    protocols: Vec<BuiltinProtocol>,
    bindings: HashMap<&'static str, Vec<LayerBinding>>,
    fallbacks: HashMap<&'static str, BuiltinProtocol>,
}

impl LayerTable {
    /// Create a new empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a protocol so it can be looked up by name.
    pub fn register<P: Into<BuiltinProtocol>>(&mut self, protocol: P) {
        let protocol = protocol.into();
        if !self.protocols.contains(&protocol) {
            self.protocols.push(protocol);
        }
    }

    /// Bind `next` inside `parent` when `predicate` accepts the parent.
    pub fn bind<P, N, F>(&mut self, parent: P, next: N, predicate: F)
    where
        P: Into<BuiltinProtocol>,
        N: Into<BuiltinProtocol>,
        F: Fn(&Packet) -> bool + Send + Sync + 'static,
    {
        let (parent, next) = (parent.into(), next.into());
        self.register(parent);
        self.register(next);
        self.bindings
            .entry(parent.name())
            .or_default()
            .push(LayerBinding {
                predicate: Box::new(predicate),
                next,
            });
    }

    /// Bind `next` inside `parent` when `parent.field == value`.
    pub fn bind_field<P, N>(&mut self, parent: P, field: &'static str, value: u64, next: N)
    where
        P: Into<BuiltinProtocol>,
        N: Into<BuiltinProtocol>,
    {
        self.bind(parent, next, move |packet| packet.get_u64(field) == Some(value));
    }

    /// Use `next` for any payload of `parent` no binding claims.
    pub fn bind_fallback<P, N>(&mut self, parent: P, next: N)
    where
        P: Into<BuiltinProtocol>,
        N: Into<BuiltinProtocol>,
    {
        let (parent, next) = (parent.into(), next.into());
        self.register(parent);
        self.register(next);
        self.fallbacks.insert(parent.name(), next);
    }

    /// Protocol encapsulated in `packet`, if any binding matches.
    pub fn resolve(&self, packet: &Packet) -> Option<BuiltinProtocol> {
        let name = packet.name();
        self.bindings
            .get(name)
            .and_then(|bindings| {
                bindings
                    .iter()
                    .find(|binding| (binding.predicate)(packet))
                    .map(|binding| binding.next)
            })
            .or_else(|| self.fallbacks.get(name).copied())
    }

    /// Get a protocol by name.
    pub fn get_protocol(&self, name: &str) -> Option<BuiltinProtocol> {
        self.protocols.iter().copied().find(|p| p.name() == name)
    }

    /// Parse `data` as the protocol called `name`.
    pub fn decode(&self, name: &str, data: &[u8]) -> Result<Packet, ProtocolError> {
        let protocol = self
            .get_protocol(name)
            .ok_or_else(|| ProtocolError::UnknownProtocol {
                name: name.to_string(),
            })?;
        Ok(Packet::decode(protocol, data, self))
    }

    /// Get all registered protocols, in registration order.
    pub fn all_protocols(&self) -> impl Iterator<Item = BuiltinProtocol> + '_ {
        self.protocols.iter().copied()
    }

    /// Names of protocols that may be encapsulated in `name`.
    pub fn children(&self, name: &str) -> Vec<&'static str> {
        let mut children: Vec<&'static str> = self
            .bindings
            .get(name)
            .into_iter()
            .flatten()
            .map(|binding| binding.next.name())
            .chain(self.fallbacks.get(name).map(|p| p.name()))
            .collect();
        children.dedup();
        children
    }

    /// Get the number of registered protocols.
    pub fn len(&self) -> usize {
        self.protocols.len()
    }

    /// Check if the table is empty.
    pub fn is_empty(&self) -> bool {
        self.protocols.is_empty()
    }
}

impl fmt::Debug for LayerTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bindings: HashMap<_, _> = self
            .protocols
            .iter()
            .map(|p| (p.name(), self.children(p.name())))
            .collect();
        f.debug_struct("LayerTable")
            .field("protocols", &self.protocols)
            .field("bindings", &bindings)
            .finish()
    }
}
