//! Autoloader adapters
//!
//! Everything that talks to the PowerVault 124T web interface: the status
//! page parser, the paced HTTP transport and the client built on both.

pub mod client;
pub mod parser;
pub mod transport;

pub use client::{DeviceClient, EjectPolicy, DEFAULT_BUSY_BACKOFF};
pub use parser::parse_inventory;
pub use transport::{PacedTransport, TransportConfig, DEFAULT_REQUEST_INTERVAL};
