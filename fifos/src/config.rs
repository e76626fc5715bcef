//! Registry-wide settings

/// Capacity used when nothing else is configured
pub const DEFAULT_CAPACITY: usize = 512;

/// Settings shared by every channel of one registry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FifoConfig {
    /// Fixed size of each channel's buffer, in bytes. Also the largest
    /// length accepted by a single read or write.
    pub capacity: usize,
}

impl FifoConfig {
    #[must_use]
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }
}

impl Default for FifoConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_capacity() {
        assert_eq!(FifoConfig::default().capacity, 512);
    }

    #[test]
    fn test_with_capacity() {
        let config = FifoConfig::default().with_capacity(10);
        assert_eq!(config.capacity, 10);
    }
}
