//! Caller interruption
//!
//! An [`Interrupt`] plays the role of a signal delivered to one caller. It is
//! shared between the threads that may block inside a channel and whoever
//! wants to cancel those blocks. Several threads may be parked under the same
//! token at once, for example when they share one endpoint.
//!
//! # Delivery
//!
//! Each parked caller records the number of interrupts raised so far. When it
//! wakes up and that number has moved, it was interrupted. One `interrupt()`
//! therefore cancels every caller parked at that moment. If nobody is parked,
//! the interrupt stays pending and fails the next blocking wait instead.
//!
//! # Lost-interrupt race
//!
//! The blocked side works as follows:
//!
//! 10. Blocker (channel lock held): take the token lock
//! 20. Blocker: fail if an interrupt is pending, else register the channel
//!     and the current interrupt count
//! 30. Blocker: park on the condition variable, which releases the channel
//!     lock
//!
//! And the interrupting side:
//!
//! 40. Interrupter (token lock held): bump the interrupt count, or mark it
//!     pending if nobody is registered
//! 50. Interrupter: copy out the registered channels, release the token lock
//! 60. Interrupter: take each channel's lock and notify every waiter
//!
//! Steps 20 and 40 are serialized by the token lock. If 40 comes first, the
//! blocker fails at step 20. If 20 comes first, step 60 cannot take the
//! channel lock before the blocker is parked, so the notification is not
//! lost.

use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;

use crate::channel::Channel;

#[derive(Default)]
struct InterruptState {
    /// Interrupts raised while somebody was parked
    raised: u64,
    /// Interrupt raised while nobody was parked, not yet consumed
    pending: bool,
    next_waiter: u64,
    parked: Vec<(u64, Arc<Channel>)>,
}

impl InterruptState {
    fn unpark(&mut self, waiter: u64) {
        if let Some(pos) = self.parked.iter().position(|(id, _)| *id == waiter) {
            self.parked.swap_remove(pos);
        }
    }
}

/// Clonable interruption token
///
/// All clones refer to the same token.
#[derive(Clone, Default)]
pub struct Interrupt {
    inner: Arc<Mutex<InterruptState>>,
}

impl Interrupt {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Interrupt the owners of this token
    ///
    /// Every caller blocked in open, read or write under this token wakes
    /// up, rolls back and fails with `FifoError::Interrupted`. If none is
    /// blocked, the next blocking wait fails that way.
    pub fn interrupt(&self) {
        let channels: Vec<Arc<Channel>> = {
            let mut state = self.inner.lock();
            if state.parked.is_empty() {
                state.pending = true;
                return;
            }
            state.raised = state.raised.wrapping_add(1);
            state
                .parked
                .iter()
                .map(|(_, channel)| Arc::clone(channel))
                .collect()
        };
        // Channel locks are taken only after the token lock is released
        for channel in channels {
            log::debug!("interrupt: waking waiters of {channel:?}");
            channel.interrupt_waiters();
        }
    }

    /// An interrupt was raised while nobody was blocked, and no wait has
    /// consumed it yet
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.inner.lock().pending
    }

    /// Withdraw a pending interrupt without failing a wait
    pub fn clear(&self) {
        self.inner.lock().pending = false;
    }

    /// Register a caller about to park on `channel`
    ///
    /// Returns `None`, consuming the pending interrupt, if there is one.
    pub(crate) fn park(&self, channel: &Arc<Channel>) -> Option<Parked<'_>> {
        let mut state = self.inner.lock();
        if state.pending {
            state.pending = false;
            return None;
        }
        let waiter = state.next_waiter;
        state.next_waiter = state.next_waiter.wrapping_add(1);
        state.parked.push((waiter, Arc::clone(channel)));
        Some(Parked {
            interrupt: self,
            waiter,
            seen: state.raised,
        })
    }
}

impl fmt::Debug for Interrupt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.lock();
        f.debug_struct("Interrupt")
            .field("pending", &state.pending)
            .field("parked", &state.parked.len())
            .finish_non_exhaustive()
    }
}

/// Registration of a parked caller; removed on drop
pub(crate) struct Parked<'a> {
    interrupt: &'a Interrupt,
    waiter: u64,
    seen: u64,
}

impl Parked<'_> {
    /// Deregister; `true` if an interrupt was raised since `park`
    pub(crate) fn interrupted(self) -> bool {
        let mut state = self.interrupt.inner.lock();
        state.unpark(self.waiter);
        state.raised != self.seen
    }
}

impl Drop for Parked<'_> {
    fn drop(&mut self) {
        self.interrupt.inner.lock().unpark(self.waiter);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interrupt_without_waiters_stays_pending() {
        let interrupt = Interrupt::new();
        interrupt.interrupt();
        assert!(interrupt.is_pending());

        let channel = Arc::new(Channel::new(4).unwrap());
        assert!(interrupt.park(&channel).is_none());
        assert!(!interrupt.is_pending());
        assert!(interrupt.park(&channel).is_some());
    }

    #[test]
    fn test_interrupt_reaches_every_parked_caller() {
        let interrupt = Interrupt::new();
        let channel = Arc::new(Channel::new(4).unwrap());
        let first = interrupt.park(&channel).unwrap();
        let second = interrupt.park(&channel).unwrap();

        interrupt.interrupt();

        assert!(!interrupt.is_pending());
        assert!(first.interrupted());
        assert!(second.interrupted());
        assert!(interrupt.inner.lock().parked.is_empty());
    }

    #[test]
    fn test_unparking_one_caller_keeps_the_other_registered() {
        let interrupt = Interrupt::new();
        let channel = Arc::new(Channel::new(4).unwrap());
        let first = interrupt.park(&channel).unwrap();
        let second = interrupt.park(&channel).unwrap();

        assert!(!first.interrupted());
        assert_eq!(interrupt.inner.lock().parked.len(), 1);

        interrupt.interrupt();
        assert!(second.interrupted());
    }
}
