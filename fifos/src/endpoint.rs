//! Attached side of a channel
//!
//! An [`Endpoint`] is what `FifoRegistry::open` hands out: a producer or a
//! consumer attached to one channel. It stays counted on the channel until
//! it is closed or dropped.
//!
//! # Thread Safety
//!
//! `read()` and `write()` take `&self`, so an endpoint can be shared between
//! threads. Every call goes through the channel's mutex. The endpoint's
//! interrupt token is shared too, so interrupting it cancels every one of
//! those calls that is blocked at that moment.

use std::fmt;
use std::sync::Arc;

use crate::channel::{Channel, Role};
use crate::error::FifoError;
use crate::idgen::EndpointId;
use crate::interrupt::Interrupt;
use crate::registry::{ChannelKey, FifoRegistry};

pub struct Endpoint<K: ChannelKey> {
    id: EndpointId,
    key: K,
    role: Role,
    channel: Arc<Channel>,
    registry: FifoRegistry<K>,
    interrupt: Interrupt,
    closed: bool,
}

impl<K: ChannelKey> Endpoint<K> {
    pub(crate) fn new(
        id: EndpointId,
        key: K,
        role: Role,
        channel: Arc<Channel>,
        registry: FifoRegistry<K>,
        interrupt: Interrupt,
    ) -> Self {
        Self {
            id,
            key,
            role,
            channel,
            registry,
            interrupt,
            closed: false,
        }
    }

    #[must_use]
    pub fn id(&self) -> EndpointId {
        self.id
    }

    #[must_use]
    pub fn key(&self) -> &K {
        &self.key
    }

    #[must_use]
    pub fn role(&self) -> Role {
        self.role
    }

    /// Largest length a single read or write accepts
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.channel.capacity()
    }

    /// Token that cancels this endpoint's blocking calls
    #[must_use]
    pub fn interrupt_handle(&self) -> Interrupt {
        self.interrupt.clone()
    }

    fn require(&self, role: Role) -> Result<(), FifoError> {
        if self.role != role {
            return Err(FifoError::WrongRole { role: self.role });
        }
        Ok(())
    }

    /// Read exactly `buf.len()` bytes (POSIX-style)
    ///
    /// Blocks until that many bytes are buffered. Returns:
    /// - `buf.len()` on success
    /// - fewer bytes if all producers left before the request could be met
    /// - 0 on end-of-stream (no producers and nothing buffered)
    ///
    /// # Errors
    /// `InvalidSize` if `buf` is longer than the capacity, `Interrupted` if
    /// the endpoint's token fires while blocked, `WrongRole` on a producer.
    pub fn read(&self, buf: &mut [u8]) -> Result<usize, FifoError> {
        self.require(Role::Consumer)?;
        let n = self.channel.read(buf, &self.interrupt)?;
        log::trace!("endpoint {} read {n}/{} bytes", self.id, buf.len());
        Ok(n)
    }

    /// Read whatever is buffered, up to `buf.len()` bytes (stream-style)
    ///
    /// Blocks only while the channel is empty. Returns 0 on end-of-stream.
    /// Requests longer than the capacity are fine; they just get at most
    /// one buffer's worth.
    ///
    /// # Errors
    /// `Interrupted` if the endpoint's token fires while blocked,
    /// `WrongRole` on a producer.
    pub fn read_some(&self, buf: &mut [u8]) -> Result<usize, FifoError> {
        self.require(Role::Consumer)?;
        let n = self.channel.read_some(buf, &self.interrupt)?;
        log::trace!("endpoint {} read {n} of up to {} bytes", self.id, buf.len());
        Ok(n)
    }

    /// Read up to `n` bytes into a freshly allocated vector
    ///
    /// Same blocking rules as [`read`](Self::read); an empty vector means
    /// end-of-stream.
    ///
    /// # Errors
    /// As `read`, plus `OutOfMemory` if the transfer buffer cannot be
    /// allocated.
    pub fn read_to_vec(&self, n: usize) -> Result<Vec<u8>, FifoError> {
        self.require(Role::Consumer)?;
        if n > self.capacity() {
            return Err(FifoError::InvalidSize {
                requested: n,
                capacity: self.capacity(),
            });
        }
        let mut buf = Vec::new();
        buf.try_reserve_exact(n)?;
        buf.resize(n, 0);

        let got = self.read(&mut buf)?;
        buf.truncate(got);
        Ok(buf)
    }

    /// Write all of `data` in one piece
    ///
    /// Blocks until the channel has room for the whole of `data`.
    ///
    /// # Errors
    /// `BrokenPipe` if no consumer is attached (or the last one left while
    /// waiting), `InvalidSize` if `data` is longer than the capacity,
    /// `Interrupted` if the endpoint's token fires while blocked, `WrongRole`
    /// on a consumer.
    pub fn write(&self, data: &[u8]) -> Result<usize, FifoError> {
        self.require(Role::Producer)?;
        let n = self.channel.write(data, &self.interrupt)?;
        log::trace!("endpoint {} wrote {n} bytes", self.id);
        Ok(n)
    }

    /// Detach from the channel
    ///
    /// The last endpoint to leave destroys the channel. Dropping an endpoint
    /// has the same effect.
    pub fn close(mut self) {
        self.release();
    }

    fn release(&mut self) {
        self.closed = true;
        self.registry.detach(&self.key, &self.channel, self.role);
        log::debug!("endpoint {} ({}) on {:?} closed", self.id, self.role, self.key);
    }
}

impl<K: ChannelKey> fmt::Debug for Endpoint<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Endpoint(id={}, key={:?}, role={}, closed={})",
            self.id, self.key, self.role, self.closed
        )
    }
}

impl<K: ChannelKey> Drop for Endpoint<K> {
    fn drop(&mut self) {
        if !self.closed {
            self.release();
        }
    }
}

// Implement embedded_io traits

impl<K: ChannelKey> embedded_io::ErrorType for Endpoint<K> {
    type Error = FifoError;
}

impl<K: ChannelKey> embedded_io::Read for Endpoint<K> {
    /// Returns as soon as anything is buffered, see [`Endpoint::read_some`]
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        self.read_some(buf)
    }
}

impl<K: ChannelKey> embedded_io::Write for Endpoint<K> {
    /// Writes beyond the capacity are clamped, giving a short write
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        let len = buf.len().min(self.capacity());
        let clamped = buf.get(..len).unwrap_or_default();
        Endpoint::write(self, clamped)
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}
