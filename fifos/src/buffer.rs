//! Fixed-capacity byte ring
//!
//! Storage for one channel. The ring has no locking of its own: every call
//! happens while the owning channel's mutex is held.

use std::collections::TryReserveError;

/// Error type for buffer operations
///
/// Returned when a caller breaks an insert/remove precondition. The bytes
/// already stored are left untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferError {
    /// Insert of `requested` bytes with only `free` bytes of room
    Overflow { requested: usize, free: usize },
    /// Remove of `requested` bytes with only `stored` bytes present
    Underflow { requested: usize, stored: usize },
}

impl std::fmt::Display for BufferError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Overflow { requested, free } => {
                write!(f, "Buffer overflow: {requested} bytes requested, {free} free")
            }
            Self::Underflow { requested, stored } => {
                write!(f, "Buffer underflow: {requested} bytes requested, {stored} stored")
            }
        }
    }
}

impl std::error::Error for BufferError {}

/// Bounded FIFO of bytes backed by a ring
///
/// `len() <= capacity()` always holds, and bytes come out of `remove` in
/// exactly the order they went into `insert`.
///
/// # Example
///
/// ```
/// use fifos::buffer::RingBuffer;
///
/// let mut ring = RingBuffer::with_capacity(8).unwrap();
/// ring.insert(b"hello").unwrap();
///
/// let mut out = [0u8; 3];
/// ring.remove(&mut out).unwrap();
/// assert_eq!(&out, b"hel");
/// assert_eq!(ring.len(), 2);
/// ```
pub struct RingBuffer {
    data: Box<[u8]>,
    head: usize,
    len: usize,
}

impl RingBuffer {
    /// Allocate a ring of `capacity` bytes
    ///
    /// # Errors
    /// Returns the allocator error if the storage cannot be reserved.
    pub fn with_capacity(capacity: usize) -> Result<Self, TryReserveError> {
        let mut data = Vec::new();
        data.try_reserve_exact(capacity)?;
        data.resize(capacity, 0);
        Ok(Self {
            data: data.into_boxed_slice(),
            head: 0,
            len: 0,
        })
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// Number of bytes currently stored
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[must_use]
    pub fn free_space(&self) -> usize {
        self.capacity() - self.len
    }

    /// Append all of `items` behind the bytes already stored
    ///
    /// # Errors
    /// `BufferError::Overflow` if `items` does not fit into the free space.
    /// Nothing is written in that case.
    pub fn insert(&mut self, items: &[u8]) -> Result<(), BufferError> {
        let free = self.free_space();
        if items.len() > free {
            return Err(BufferError::Overflow {
                requested: items.len(),
                free,
            });
        }
        if items.is_empty() {
            return Ok(());
        }

        let capacity = self.capacity();
        let tail = (self.head + self.len) % capacity;
        let first = items.len().min(capacity - tail);
        let (front, back) = items.split_at(first);

        // SAFETY: bounds follow from the free space check above:
        // - tail + first <= capacity
        // - back.len() = items.len() - first <= head (the wrapped region is free)
        #[allow(clippy::indexing_slicing)]
        {
            self.data[tail..tail + first].copy_from_slice(front);
            self.data[..back.len()].copy_from_slice(back);
        }
        self.len += items.len();
        Ok(())
    }

    /// Move the oldest `out.len()` bytes into `out`
    ///
    /// # Errors
    /// `BufferError::Underflow` if fewer bytes are stored. Nothing is removed
    /// in that case.
    pub fn remove(&mut self, out: &mut [u8]) -> Result<(), BufferError> {
        if out.len() > self.len {
            return Err(BufferError::Underflow {
                requested: out.len(),
                stored: self.len,
            });
        }
        if out.is_empty() {
            return Ok(());
        }

        let capacity = self.capacity();
        let first = out.len().min(capacity - self.head);
        let (front, back) = out.split_at_mut(first);

        #[allow(clippy::indexing_slicing)]
        {
            front.copy_from_slice(&self.data[self.head..self.head + first]);
            back.copy_from_slice(&self.data[..back.len()]);
        }
        self.head = (self.head + out.len()) % capacity;
        self.len -= out.len();
        if self.len == 0 {
            self.head = 0;
        }
        Ok(())
    }
}

impl std::fmt::Debug for RingBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RingBuffer")
            .field("capacity", &self.capacity())
            .field("len", &self.len)
            .field("head", &self.head)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_ring_is_empty() {
        let ring = RingBuffer::with_capacity(16).unwrap();
        assert!(ring.is_empty());
        assert_eq!(ring.len(), 0);
        assert_eq!(ring.free_space(), 16);
    }

    #[test]
    fn test_insert_and_remove() {
        let mut ring = RingBuffer::with_capacity(16).unwrap();
        ring.insert(b"hello").unwrap();
        ring.insert(b" world").unwrap();
        assert_eq!(ring.len(), 11);

        let mut out = [0u8; 11];
        ring.remove(&mut out).unwrap();
        assert_eq!(&out, b"hello world");
        assert!(ring.is_empty());
    }

    #[test]
    fn test_wraps_around_the_end() {
        let mut ring = RingBuffer::with_capacity(8).unwrap();
        ring.insert(b"abcdef").unwrap();

        let mut out = [0u8; 5];
        ring.remove(&mut out).unwrap();
        assert_eq!(&out, b"abcde");

        // tail sits at 6, so this write splits across the end
        ring.insert(b"ghijkl").unwrap();
        assert_eq!(ring.len(), 7);
        assert_eq!(ring.free_space(), 1);

        let mut out = [0u8; 7];
        ring.remove(&mut out).unwrap();
        assert_eq!(&out, b"fghijkl");
    }

    #[test]
    fn test_fill_to_capacity() {
        let mut ring = RingBuffer::with_capacity(4).unwrap();
        ring.insert(b"1234").unwrap();
        assert_eq!(ring.free_space(), 0);
        assert_eq!(
            ring.insert(b"5"),
            Err(BufferError::Overflow {
                requested: 1,
                free: 0
            })
        );
    }

    #[test]
    fn test_underflow_leaves_contents() {
        let mut ring = RingBuffer::with_capacity(4).unwrap();
        ring.insert(b"ab").unwrap();

        let mut out = [0u8; 3];
        assert_eq!(
            ring.remove(&mut out),
            Err(BufferError::Underflow {
                requested: 3,
                stored: 2
            })
        );
        assert_eq!(ring.len(), 2);

        let mut out = [0u8; 2];
        ring.remove(&mut out).unwrap();
        assert_eq!(&out, b"ab");
    }

    #[test]
    fn test_empty_operations_are_noops() {
        let mut ring = RingBuffer::with_capacity(4).unwrap();
        ring.insert(b"").unwrap();
        ring.remove(&mut []).unwrap();
        assert!(ring.is_empty());
    }
}
