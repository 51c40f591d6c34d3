//! PwrShield firmware library.
//!
//! Exposes the domain modules for integration testing and for the binary.
//! All ESP-IDF-specific code is guarded by `#[cfg(target_os = "espidf")]`
//! within each module; everything else runs on the host.

#![deny(unused_must_use)]

pub mod actuation;
pub mod app;
pub mod codec;
pub mod config;
pub mod error;
pub mod fsm;
pub mod heartbeat;
pub mod pins;
pub mod router;
pub mod supervisor;
pub mod topics;

// ESP-IDF adapters with host simulation stubs behind cfg attributes.
pub mod adapters;
