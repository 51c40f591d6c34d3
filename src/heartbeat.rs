//! Liveness probes and the borrowed wall clock.
//!
//! The board has no RTC.  Every probe carries the peer's epoch seconds;
//! answering one anchors `(timestamp, local_ms)` in
//! [`ControllerStatus`](crate::fsm::status::ControllerStatus), and any later
//! wall-clock value is extrapolated from that anchor with the monotonic
//! clock.

use crate::codec;

/// A captured probe awaiting its reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PingProbe {
    payload: Vec<u8>,
    timestamp: Option<i64>,
}

impl PingProbe {
    /// Capture `payload` verbatim.  The timestamp is read but the bytes are
    /// kept exactly as received.
    pub fn capture(payload: &[u8]) -> Self {
        Self {
            payload: payload.to_vec(),
            timestamp: codec::peek_timestamp(payload),
        }
    }

    /// Bytes to echo on the pong topic.
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Peer epoch seconds, if the probe carried them.
    pub fn timestamp(&self) -> Option<i64> {
        self.timestamp
    }
}

/// `last_ts + whole seconds elapsed since last_at_ms`.
///
/// A clock reading older than the anchor counts as zero elapsed.
pub fn reconstruct_timestamp(last_ts: i64, last_at_ms: u64, now_ms: u64) -> i64 {
    let elapsed_secs = now_ms.saturating_sub(last_at_ms) / 1000;
    last_ts.saturating_add(i64::try_from(elapsed_secs).unwrap_or(i64::MAX))
}
