//! Tape Bulk Eject
//!
//! Moves a batch of tapes into the mailslot of a PowerVault 124T
//! autoloader by driving its HTML web interface.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                     Eject Orchestrator                        │
//! │       (skip / wait for mailslot / eject one at a time)        │
//! ├──────────────────────────────────────────────────────────────┤
//! │                       Device Client                           │
//! │  ┌──────────────────┐  ┌──────────────┐  ┌────────────────┐  │
//! │  │   Credentials    │  │  Inventory   │  │  Eject + retry │  │
//! │  │     probe        │  │   refresh    │  │   on busy      │  │
//! │  └──────────────────┘  └──────┬───────┘  └────────────────┘  │
//! │                               │                               │
//! │                    ┌──────────┴──────────┐                    │
//! │                    │ Status page parser  │                    │
//! │                    └─────────────────────┘                    │
//! ├──────────────────────────────────────────────────────────────┤
//! │              DeviceTransport (paced, serialized)              │
//! │                  HTTP basic auth, body cap                    │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`eject`]: Multi-tape workflow
//! - [`autoloader`]: Parser, paced transport and device client
//! - [`domain`]: Tape locations, inventory and the transport port
//! - [`config`]: Config file and tape list handling
//! - [`error`]: Error types and handling

pub mod autoloader;
pub mod config;
pub mod domain;
pub mod eject;
pub mod error;

#[cfg(test)]
mod testing;

// Re-export commonly used types
pub use autoloader::{
    parse_inventory, DeviceClient, EjectPolicy, PacedTransport, TransportConfig,
};

pub use config::{default_config_path, parse_tape_list, DeviceConfig};

pub use domain::ports::{
    DeviceEndpoints, DeviceRequest, DeviceTransport, DeviceTransportRef, Inventory, Location,
};

pub use eject::{EjectOrchestrator, EjectSummary};

pub use error::{Error, ErrorAction, Result};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
