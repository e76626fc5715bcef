use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Identity of one attached endpoint, used in log lines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EndpointId {
    id: u64,
}

impl EndpointId {
    #[must_use]
    pub fn new(id: u64) -> Self {
        Self { id }
    }

    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }
}

impl fmt::Display for EndpointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.id)
    }
}

/// Thread-safe ID generator
#[derive(Debug)]
pub struct IdGen {
    next_id: AtomicU64,
}

impl IdGen {
    #[must_use]
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
        }
    }

    /// Get the next unique ID
    pub fn get_next(&self) -> EndpointId {
        EndpointId::new(self.next_id.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for IdGen {
    fn default() -> Self {
        Self::new()
    }
}
