//! Event hub configuration.

use std::time::Duration;

/// Default bound on a single subscriber round trip.
pub const DEFAULT_TRANSPORT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default cap on RHS results accepted from clients, in bytes.
pub const DEFAULT_MAX_RHS_RESULT_LEN: usize = 4096;

/// Event hub configuration.
#[derive(Debug, Clone)]
pub struct HubConfig {
    /// Bound on each `Connection::send`; `None` waits forever.
    pub transport_timeout: Option<Duration>,

    /// Hard cap on RHS results, applied on top of the caller's capacity.
    pub max_rhs_result_len: usize,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            transport_timeout: Some(DEFAULT_TRANSPORT_TIMEOUT),
            max_rhs_result_len: DEFAULT_MAX_RHS_RESULT_LEN,
        }
    }
}

impl HubConfig {
    /// Build from millisecond settings; a zero timeout disables it.
    pub fn from_millis(transport_timeout_ms: u64, max_rhs_result_len: usize) -> Self {
        Self {
            transport_timeout: (transport_timeout_ms > 0)
                .then(|| Duration::from_millis(transport_timeout_ms)),
            max_rhs_result_len,
        }
    }

    /// Set the transport timeout.
    pub fn with_transport_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.transport_timeout = timeout;
        self
    }

    /// Set the RHS result cap.
    pub fn with_max_rhs_result_len(mut self, len: usize) -> Self {
        self.max_rhs_result_len = len;
        self
    }
}
