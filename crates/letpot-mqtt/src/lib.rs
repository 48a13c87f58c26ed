//! # letpot-mqtt
//!
//! Everything between a pump instruction and the telemetry broker:
//!
//! - [`credentials`]: broker username/password derived from the session identity
//! - [`command`]: the 15-byte pump on/off payload
//! - [`framing`]: MTU-bounded, hex-rendered wire packets with message ids
//! - [`broker`]: the single broker session, reconnected on identity change or loss
//! - [`transport`]: the connector seam and its `rumqttc` implementation

#![deny(unsafe_code)]

pub mod broker;
pub mod command;
pub mod credentials;
pub mod framing;
pub mod transport;

pub use broker::{BrokerSessionManager, ConnectionState};
pub use command::encode_pump_command;
pub use credentials::{BrokerCredentials, derive_credentials};
pub use framing::{MessageIdCounter, frame_packets, framed_len};
pub use transport::{BrokerConnection, BrokerConnector, ConnectOptions, RumqttConnector};
