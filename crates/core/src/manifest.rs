use std::time::Duration;

/// Failure budgets for the head item of the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Resends allowed after a command failure (no reply, error reply,
    /// wrong shape) before the item is dropped.
    pub max_command_send_retries: u32,
    /// Processing attempts allowed before the item is dropped.
    pub max_retries_per_item: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_command_send_retries: 1,
            max_retries_per_item: 3,
        }
    }
}

/// Timing of one request/reply exchange with the responder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    pub poll_interval: Duration,
    pub poll_attempts: u32,
    /// Fixed wait after a command is sent, before polling starts.
    pub settle: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            poll_attempts: 10,
            settle: Duration::from_millis(300),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchConfig {
    /// Total attempts per download, including the first.
    pub max_retries: u32,
    /// Linear backoff unit: attempt `n` waits `backoff * n` before retrying.
    pub backoff: Duration,
    pub redirect_limit: u8,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff: Duration::from_secs(1),
            redirect_limit: 5,
        }
    }
}
