//! Error types for netsim-core.
//!
//! This module provides structured error types for all netsim-core operations:
//!
//! - [`enum@Error`] - Main error enum that wraps all error types
//! - [`TopologyError`] - Naming, lookup and connection rule violations
//! - [`SimulationError`] - Clock lifecycle violations
//! - [`AddressError`] - Malformed MAC / IPv4 literals
//! - [`ProtocolError`] - Packet construction errors
//! - [`CaptureError`] - Capture export errors
//!
//! Malformed binary input is never an error: parsing is lenient and leaves
//! undecodable fields unset.

use thiserror::Error;

/// Main error type for netsim-core operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Topology precondition violated
    #[error("Topology error: {0}")]
    Topology(#[from] TopologyError),

    /// Simulation clock misuse
    #[error("Simulation error: {0}")]
    Simulation(#[from] SimulationError),

    /// Malformed address literal
    #[error("Address error: {0}")]
    Address(#[from] AddressError),

    /// Packet construction error
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Capture export error
    #[error("Capture error: {0}")]
    Capture(#[from] CaptureError),

    /// Topology (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised by device, interface and link operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TopologyError {
    /// Another device already uses this name
    #[error("device name '{name}' is already taken")]
    DeviceNameTaken { name: String },

    /// The device already has an interface with this name
    #[error("interface name '{interface}' is already taken on device '{device}'")]
    InterfaceNameTaken { device: String, interface: String },

    /// Another interface in the network already uses this MAC address
    #[error("MAC address {mac} is already in use")]
    MacTaken { mac: String },

    /// No device with this name
    #[error("device '{name}' not found")]
    DeviceNotFound { name: String },

    /// No interface with this name on the device
    #[error("interface '{interface}' not found on device '{device}'")]
    InterfaceNotFound { device: String, interface: String },

    /// No interface with this id in the network
    #[error("interface {id} does not exist in this network")]
    UnknownInterfaceId { id: String },

    /// An interface cannot be linked to itself
    #[error("interface '{interface}' on device '{device}' cannot connect to itself")]
    SelfConnection { device: String, interface: String },

    /// The interface already has a peer
    #[error("interface '{interface}' on device '{device}' is already connected")]
    AlreadyConnected { device: String, interface: String },

    /// The two endpoints live in different networks
    #[error("cannot connect interfaces that belong to different networks")]
    CrossNetwork,

    /// Disconnecting an interface that has no peer
    #[error("interface '{interface}' on device '{device}' is not connected")]
    NotConnected { device: String, interface: String },

    /// Every interface of the device already has a peer
    #[error("device '{device}' has no free interface")]
    NoFreeInterface { device: String },

    /// The device was removed from its network
    #[error("device '{name}' has been removed from its network")]
    DeviceRemoved { name: String },

    /// No interface of the device has an IPv4 address
    #[error("device '{device}' has no IPv4 address")]
    NoAddress { device: String },

    /// The operation only applies to another device type
    #[error("device '{device}' is a {actual}, expected a {expected}")]
    WrongDeviceType {
        device: String,
        expected: &'static str,
        actual: &'static str,
    },
}

/// Errors related to the simulation clock.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimulationError {
    /// `start()` on a running network
    #[error("network is already running")]
    AlreadyRunning,

    /// `stop()` or `tick()` on a stopped network
    #[error("network is not running")]
    NotRunning,
}

/// Errors related to address literals.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AddressError {
    /// Not a colon (or dash) separated 6-octet MAC literal
    #[error("invalid MAC address: '{literal}'")]
    InvalidMac { literal: String },

    /// Not a dotted-quad IPv4 literal
    #[error("invalid IPv4 address: '{literal}'")]
    InvalidIpv4 { literal: String },
}

/// Errors related to packet construction.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// No protocol with this identifier
    #[error("unknown protocol '{name}'")]
    UnknownProtocol { name: String },

    /// The protocol declares no field with this name
    #[error("{protocol}: unknown field '{field}'")]
    UnknownField {
        protocol: &'static str,
        field: String,
    },

    /// The value does not fit the field's declared kind
    #[error("{protocol}: field '{field}' expects {expected}")]
    KindMismatch {
        protocol: &'static str,
        field: &'static str,
        expected: &'static str,
    },
}

/// Errors related to capture export.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CaptureError {
    /// A captured packet refers to an interface not present at export time
    #[error("packet {id} refers to unknown interface '{interface}' on device '{device}'")]
    UnknownInterface {
        id: u64,
        device: String,
        interface: String,
    },
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
