//! Domain layer - tape locations, the inventory and the device port
//!
//! Adapters in [`crate::autoloader`] implement the port defined here.

pub mod ports;

pub use ports::*;
