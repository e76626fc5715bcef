//! Rendezvous and blocking transfer on a channel
//!
//! Rules, all evaluated under the channel lock:
//!
//! - Opening as one role blocks until the other role is attached.
//! - A read or write longer than the capacity is rejected up front.
//! - A consumer blocks until it can take its whole request. If no producer
//!   is left, whatever is buffered is handed out, and an empty channel
//!   reads as end-of-stream (`Ok(0)`). The stream-style `read_some` instead
//!   returns as soon as anything is buffered.
//! - A producer blocks until its whole request fits. Writing while no
//!   consumer is attached, or after the last one left, is a broken pipe.
//! - Every state change broadcasts to the side that may now proceed.

use std::sync::Arc;

use crate::channel::{Channel, ChannelState, Role};
use crate::error::FifoError;
use crate::interrupt::Interrupt;

impl Channel {
    fn check_size(&self, requested: usize) -> Result<(), FifoError> {
        if requested > self.capacity() {
            return Err(FifoError::InvalidSize {
                requested,
                capacity: self.capacity(),
            });
        }
        Ok(())
    }

    /// Count a new endpoint of `role`
    ///
    /// Everyone of the other role parked here is released: the ones waiting
    /// in open may now complete their rendezvous. Returns the ticket to pass
    /// to [`rendezvous`](Self::rendezvous).
    pub(crate) fn join(&self, role: Role) -> u64 {
        let mut state = self.lock();
        *state.count_mut(role) += 1;
        *state.arrivals_mut(role) += 1;
        self.wake_all(&mut state, role.other());
        state.arrivals(role.other())
    }

    /// Block until an endpoint of the other role is attached
    ///
    /// Also returns once one has arrived after `join`, even if it already
    /// left again; otherwise an opener could miss a partner that came and
    /// went while it was parked and wait forever.
    ///
    /// The caller must already be counted through `join`. On interrupt that
    /// count is undone before the channel lock is released, as if the open
    /// had never happened; removing an unused channel from its registry is
    /// up to the caller.
    pub(crate) fn rendezvous(
        self: &Arc<Self>,
        role: Role,
        ticket: u64,
        interrupt: &Interrupt,
    ) -> Result<(), FifoError> {
        let partner = role.other();
        let mut state = self.lock();
        while state.count(partner) == 0 && state.arrivals(partner) == ticket {
            if let Err(e) = self.wait(&mut state, role, interrupt) {
                self.leave_locked(&mut state, role);
                return Err(e);
            }
        }
        Ok(())
    }

    /// Uncount an endpoint of `role`
    ///
    /// When the last endpoint of a role leaves, the other side is woken:
    /// consumers to drain and see end-of-stream, producers to see the broken
    /// pipe. Returns `true` if the channel has no endpoints left.
    pub(crate) fn leave(&self, role: Role) -> bool {
        let mut state = self.lock();
        self.leave_locked(&mut state, role);
        state.is_unused()
    }

    fn leave_locked(&self, state: &mut ChannelState, role: Role) {
        let count = state.count_mut(role);
        debug_assert!(*count > 0, "leave() without a matching join()");
        *count = count.saturating_sub(1);
        if *count == 0 {
            self.wake_all(state, role.other());
        }
    }

    /// No endpoint of either role is attached
    pub(crate) fn is_unused(&self) -> bool {
        self.lock().is_unused()
    }

    /// Take `out.len()` bytes out of the channel
    ///
    /// Returns the number of bytes placed in `out`. That is `out.len()`
    /// unless the producers are gone, in which case the remaining bytes are
    /// returned, and 0 means end-of-stream.
    pub(crate) fn read(
        self: &Arc<Self>,
        out: &mut [u8],
        interrupt: &Interrupt,
    ) -> Result<usize, FifoError> {
        self.check_size(out.len())?;

        let mut state = self.lock();
        let n = loop {
            let buffered = state.buffer.len();
            if buffered >= out.len() {
                break out.len();
            }
            if state.count(Role::Producer) == 0 {
                if buffered == 0 {
                    log::debug!("channel.read: empty and no producers, end of stream");
                } else {
                    log::debug!(
                        "channel.read: no producers, short read of {buffered}/{} bytes",
                        out.len()
                    );
                }
                break buffered;
            }
            self.wait(&mut state, Role::Consumer, interrupt)?;
        };

        let (taken, _) = out.split_at_mut(n);
        state.buffer.remove(taken)?;
        if n > 0 {
            self.wake_all(&mut state, Role::Producer);
        }
        log::trace!("channel.read: {n} bytes, {} left", state.buffer.len());
        Ok(n)
    }

    /// Take whatever is buffered, up to `out.len()` bytes
    ///
    /// Blocks only while the channel is empty and producers are attached.
    /// Returns 0 on end-of-stream or for an empty `out`.
    pub(crate) fn read_some(
        self: &Arc<Self>,
        out: &mut [u8],
        interrupt: &Interrupt,
    ) -> Result<usize, FifoError> {
        if out.is_empty() {
            return Ok(0);
        }

        let mut state = self.lock();
        while state.buffer.is_empty() && state.count(Role::Producer) > 0 {
            self.wait(&mut state, Role::Consumer, interrupt)?;
        }

        let n = out.len().min(state.buffer.len());
        let (taken, _) = out.split_at_mut(n);
        state.buffer.remove(taken)?;
        if n > 0 {
            self.wake_all(&mut state, Role::Producer);
        } else {
            log::debug!("channel.read_some: empty and no producers, end of stream");
        }
        log::trace!("channel.read_some: {n} bytes, {} left", state.buffer.len());
        Ok(n)
    }

    /// Put all of `data` into the channel
    ///
    /// Returns `data.len()`; a write is never split.
    pub(crate) fn write(
        self: &Arc<Self>,
        data: &[u8],
        interrupt: &Interrupt,
    ) -> Result<usize, FifoError> {
        self.check_size(data.len())?;

        let mut state = self.lock();
        if state.count(Role::Consumer) == 0 {
            log::debug!("channel.write: no consumers");
            return Err(FifoError::BrokenPipe);
        }

        while state.count(Role::Consumer) > 0 && state.buffer.free_space() < data.len() {
            self.wait(&mut state, Role::Producer, interrupt)?;
        }

        // The last consumer may have left while this producer was parked
        if state.count(Role::Consumer) == 0 {
            log::debug!("channel.write: consumers left while waiting");
            return Err(FifoError::BrokenPipe);
        }

        state.buffer.insert(data)?;
        if !data.is_empty() {
            self.wake_all(&mut state, Role::Consumer);
        }
        log::trace!(
            "channel.write: {} bytes, {} buffered",
            data.len(),
            state.buffer.len()
        );
        Ok(data.len())
    }
}
