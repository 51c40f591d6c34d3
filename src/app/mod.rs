//! Application core: control-loop orchestration with no direct I/O.
//!
//! The [`Controller`](service::Controller) ties the power state machine to
//! the connectivity supervisor and the message router.  Hardware and network
//! access happen only through the **port traits** in [`ports`], so the whole
//! loop runs on the host against mock adapters.

pub mod commands;
pub mod events;
pub mod ports;
pub mod service;
