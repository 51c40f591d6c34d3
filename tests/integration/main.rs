//! Integration test driver for the `tests/integration/` submodules.
//!
//! Each `mod` below maps to a file that exercises one subsystem against
//! mock adapters.  All tests run on the host with no real hardware.

mod controller_tests;
mod mock_hw;
