//! Per-channel state and the monitor that guards it
//!
//! One `parking_lot::Mutex` protects the ring and all counters. Two condition
//! variables sit next to it, one per role. Each role also keeps a count of the
//! threads parked on its condition variable; the count decides whether a
//! broadcast is needed and is reported in [`ChannelStats`].
//!
//! Waking is always a broadcast. A waiter's predicate depends on its own
//! request size, so a single targeted wakeup could land on a thread whose
//! threshold is still not met while another one starves.

use parking_lot::{Condvar, Mutex, MutexGuard};
use std::fmt;
use std::sync::Arc;

use crate::buffer::RingBuffer;
use crate::error::FifoError;
use crate::interrupt::Interrupt;

/// Attachment kind of an endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// Writer side
    Producer,
    /// Reader side
    Consumer,
}

impl Role {
    /// The complementary role
    #[must_use]
    pub fn other(self) -> Self {
        match self {
            Self::Producer => Self::Consumer,
            Self::Consumer => Self::Producer,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Producer => write!(f, "producer"),
            Self::Consumer => write!(f, "consumer"),
        }
    }
}

/// Snapshot of a channel's counters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelStats {
    pub capacity: usize,
    pub buffered: usize,
    pub producers: usize,
    pub consumers: usize,
    pub blocked_producers: usize,
    pub blocked_consumers: usize,
}

/// Threads parked on one condition variable
///
/// A broadcast zeroes `blocked` and bumps `generation`. A thread that wakes
/// up in the generation it parked in was not released by a broadcast
/// (spurious wakeup or interrupt) and removes itself from the count.
#[derive(Debug, Default)]
struct Waiters {
    blocked: usize,
    generation: u64,
}

impl Waiters {
    fn enter(&mut self) -> u64 {
        self.blocked += 1;
        self.generation
    }

    fn leave(&mut self, ticket: u64) {
        if self.generation == ticket {
            self.blocked -= 1;
        }
    }

    /// Returns `true` if anybody was parked
    fn release_all(&mut self) -> bool {
        if self.blocked == 0 {
            return false;
        }
        self.blocked = 0;
        self.generation = self.generation.wrapping_add(1);
        true
    }
}

/// Mutable part of a channel, only reachable through the channel lock
pub(crate) struct ChannelState {
    pub(crate) buffer: RingBuffer,
    producers: usize,
    consumers: usize,
    /// Total joins per role over the channel's lifetime
    producer_arrivals: u64,
    consumer_arrivals: u64,
    blocked_producers: Waiters,
    blocked_consumers: Waiters,
}

impl ChannelState {
    pub(crate) fn count(&self, role: Role) -> usize {
        match role {
            Role::Producer => self.producers,
            Role::Consumer => self.consumers,
        }
    }

    pub(crate) fn count_mut(&mut self, role: Role) -> &mut usize {
        match role {
            Role::Producer => &mut self.producers,
            Role::Consumer => &mut self.consumers,
        }
    }

    pub(crate) fn arrivals(&self, role: Role) -> u64 {
        match role {
            Role::Producer => self.producer_arrivals,
            Role::Consumer => self.consumer_arrivals,
        }
    }

    pub(crate) fn arrivals_mut(&mut self, role: Role) -> &mut u64 {
        match role {
            Role::Producer => &mut self.producer_arrivals,
            Role::Consumer => &mut self.consumer_arrivals,
        }
    }

    fn waiters_mut(&mut self, role: Role) -> &mut Waiters {
        match role {
            Role::Producer => &mut self.blocked_producers,
            Role::Consumer => &mut self.blocked_consumers,
        }
    }

    /// No endpoint of either role is attached
    pub(crate) fn is_unused(&self) -> bool {
        self.producers == 0 && self.consumers == 0
    }
}

/// One named FIFO: the monitor around its state
pub(crate) struct Channel {
    capacity: usize,
    state: Mutex<ChannelState>,
    producer_queue: Condvar,
    consumer_queue: Condvar,
}

impl Channel {
    /// Allocate a channel with an empty ring of `capacity` bytes
    pub(crate) fn new(capacity: usize) -> Result<Self, FifoError> {
        if capacity == 0 {
            return Err(FifoError::InvalidSize {
                requested: 0,
                capacity,
            });
        }
        let buffer = RingBuffer::with_capacity(capacity)?;
        Ok(Self {
            capacity,
            state: Mutex::new(ChannelState {
                buffer,
                producers: 0,
                consumers: 0,
                producer_arrivals: 0,
                consumer_arrivals: 0,
                blocked_producers: Waiters::default(),
                blocked_consumers: Waiters::default(),
            }),
            producer_queue: Condvar::new(),
            consumer_queue: Condvar::new(),
        })
    }

    pub(crate) fn capacity(&self) -> usize {
        self.capacity
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, ChannelState> {
        self.state.lock()
    }

    fn queue(&self, role: Role) -> &Condvar {
        match role {
            Role::Producer => &self.producer_queue,
            Role::Consumer => &self.consumer_queue,
        }
    }

    /// Release every thread of `role` parked on this channel
    pub(crate) fn wake_all(&self, state: &mut ChannelState, role: Role) {
        if state.waiters_mut(role).release_all() {
            self.queue(role).notify_all();
        }
    }

    /// Park on the `role` queue until woken
    ///
    /// Precondition: `state` is this channel's guard.
    /// Post-condition: the lock is held again, whether the wait succeeded or
    /// not.
    ///
    /// On interrupt the caller is taken back out of the blocked count before
    /// `FifoError::Interrupted` is returned. Any further rollback (role
    /// counters, allocations) belongs to the caller. Wakeups may be spurious;
    /// callers re-check their predicate in a loop.
    pub(crate) fn wait(
        self: &Arc<Self>,
        state: &mut MutexGuard<'_, ChannelState>,
        role: Role,
        interrupt: &Interrupt,
    ) -> Result<(), FifoError> {
        // Registered while the channel lock is held: an interrupt raised
        // from now on notifies this channel under its lock.
        let Some(parked) = interrupt.park(self) else {
            log::debug!("channel: {role} interrupted before parking");
            return Err(FifoError::Interrupted);
        };

        let ticket = state.waiters_mut(role).enter();
        self.queue(role).wait(state);
        state.waiters_mut(role).leave(ticket);

        if parked.interrupted() {
            log::debug!("channel: {role} interrupted while parked");
            return Err(FifoError::Interrupted);
        }
        Ok(())
    }

    /// Wake every parked thread so that interrupted ones can notice
    pub(crate) fn interrupt_waiters(&self) {
        let _state = self.state.lock();
        self.producer_queue.notify_all();
        self.consumer_queue.notify_all();
    }

    pub(crate) fn stats(&self) -> ChannelStats {
        let state = self.state.lock();
        ChannelStats {
            capacity: self.capacity,
            buffered: state.buffer.len(),
            producers: state.producers,
            consumers: state.consumers,
            blocked_producers: state.blocked_producers.blocked,
            blocked_consumers: state.blocked_consumers.blocked,
        }
    }
}

impl fmt::Debug for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.state.try_lock() {
            Some(state) => write!(
                f,
                "Channel(capacity={}, buffered={}, producers={}, consumers={})",
                self.capacity,
                state.buffer.len(),
                state.producers,
                state.consumers
            ),
            None => write!(f, "Channel(capacity={}, <locked>)", self.capacity),
        }
    }
}
