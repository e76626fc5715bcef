//! Error type for channel operations
//!
//! End-of-stream is not represented here: a read that hits it returns `Ok(0)`.

use std::fmt;
use std::io;

use crate::buffer::BufferError;
use crate::channel::Role;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FifoError {
    /// Requested length exceeds the channel capacity
    InvalidSize { requested: usize, capacity: usize },
    /// Channel storage or a transfer buffer could not be allocated
    OutOfMemory,
    /// The caller was interrupted while blocked
    Interrupted,
    /// Write against a channel without consumers
    BrokenPipe,
    /// Operation not permitted for the endpoint's role
    WrongRole { role: Role },
    /// Buffer precondition violated
    Buffer(BufferError),
}

impl fmt::Display for FifoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidSize {
                requested,
                capacity,
            } => write!(
                f,
                "invalid size: {requested} bytes requested, capacity is {capacity}"
            ),
            Self::OutOfMemory => write!(f, "out of memory"),
            Self::Interrupted => write!(f, "interrupted"),
            Self::BrokenPipe => write!(f, "broken pipe"),
            Self::WrongRole { role } => write!(f, "operation not permitted for a {role}"),
            Self::Buffer(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for FifoError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Buffer(e) => Some(e),
            _ => None,
        }
    }
}

impl From<BufferError> for FifoError {
    fn from(e: BufferError) -> Self {
        Self::Buffer(e)
    }
}

impl From<std::collections::TryReserveError> for FifoError {
    fn from(_: std::collections::TryReserveError) -> Self {
        Self::OutOfMemory
    }
}

impl embedded_io::Error for FifoError {
    fn kind(&self) -> embedded_io::ErrorKind {
        match self {
            Self::InvalidSize { .. } => embedded_io::ErrorKind::InvalidInput,
            Self::OutOfMemory => embedded_io::ErrorKind::OutOfMemory,
            Self::Interrupted => embedded_io::ErrorKind::Interrupted,
            Self::BrokenPipe => embedded_io::ErrorKind::BrokenPipe,
            Self::WrongRole { .. } => embedded_io::ErrorKind::PermissionDenied,
            Self::Buffer(_) => embedded_io::ErrorKind::Other,
        }
    }
}

impl From<FifoError> for io::Error {
    fn from(e: FifoError) -> Self {
        let kind = match e {
            FifoError::InvalidSize { .. } => io::ErrorKind::InvalidInput,
            FifoError::OutOfMemory => io::ErrorKind::OutOfMemory,
            FifoError::Interrupted => io::ErrorKind::Interrupted,
            FifoError::BrokenPipe => io::ErrorKind::BrokenPipe,
            FifoError::WrongRole { .. } => io::ErrorKind::PermissionDenied,
            FifoError::Buffer(_) => io::ErrorKind::Other,
        };
        io::Error::new(kind, e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_io::Error as _;

    #[test]
    fn test_embedded_io_kinds() {
        assert_eq!(
            FifoError::BrokenPipe.kind(),
            embedded_io::ErrorKind::BrokenPipe
        );
        assert_eq!(
            FifoError::Interrupted.kind(),
            embedded_io::ErrorKind::Interrupted
        );
        assert_eq!(
            FifoError::InvalidSize {
                requested: 600,
                capacity: 512
            }
            .kind(),
            embedded_io::ErrorKind::InvalidInput
        );
    }

    #[test]
    fn test_into_io_error() {
        let e: io::Error = FifoError::BrokenPipe.into();
        assert_eq!(e.kind(), io::ErrorKind::BrokenPipe);
        assert_eq!(e.to_string(), "broken pipe");
    }

    #[test]
    fn test_display_invalid_size() {
        let e = FifoError::InvalidSize {
            requested: 600,
            capacity: 512,
        };
        assert_eq!(
            e.to_string(),
            "invalid size: 600 bytes requested, capacity is 512"
        );
    }
}
