//! FifoRegistry - maps channel keys to live channels
//!
//! A channel exists while at least one endpoint is attached to it. The first
//! open of a key creates it and the last close of that key destroys it.
//!
//! # Lock ordering
//!
//! registry lock → channel lock. Both are held only for short, non-blocking
//! sections (lookup, counting, removal). No blocking wait ever runs with the
//! registry lock held, so a parked reader on one channel never stalls an
//! open of another.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

use crate::channel::{Channel, ChannelStats, Role};
use crate::config::FifoConfig;
use crate::endpoint::Endpoint;
use crate::error::FifoError;
use crate::idgen::IdGen;
use crate::interrupt::Interrupt;

/// Requirements on the external identity of a channel
pub trait ChannelKey: Eq + Hash + Clone + fmt::Debug + Send + Sync + 'static {}

impl<T> ChannelKey for T where T: Eq + Hash + Clone + fmt::Debug + Send + Sync + 'static {}

struct RegistryInner<K> {
    channels: Mutex<HashMap<K, Arc<Channel>>>,
    config: FifoConfig,
    id_gen: IdGen,
}

/// Process-wide table of named FIFOs
///
/// Cheap to clone; all clones share the same channels.
///
/// # Example
///
/// ```
/// use fifos::{FifoRegistry, Role};
/// use std::thread;
///
/// let registry = FifoRegistry::new();
///
/// let reader = {
///     let registry = registry.clone();
///     thread::spawn(move || {
///         let consumer = registry.open("demo", Role::Consumer).unwrap();
///         let mut buf = [0u8; 5];
///         let n = consumer.read(&mut buf).unwrap();
///         buf[..n].to_vec()
///     })
/// };
///
/// let producer = registry.open("demo", Role::Producer).unwrap();
/// producer.write(b"hello").unwrap();
/// drop(producer);
///
/// assert_eq!(reader.join().unwrap(), b"hello");
/// ```
pub struct FifoRegistry<K = String> {
    inner: Arc<RegistryInner<K>>,
}

impl<K> Clone for FifoRegistry<K> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<K: ChannelKey> FifoRegistry<K> {
    /// Create a registry with the default configuration
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(FifoConfig::default())
    }

    #[must_use]
    pub fn with_config(config: FifoConfig) -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                channels: Mutex::new(HashMap::new()),
                config,
                id_gen: IdGen::new(),
            }),
        }
    }

    #[must_use]
    pub fn config(&self) -> &FifoConfig {
        &self.inner.config
    }

    /// Attach to the channel `key` as `role`
    ///
    /// Blocks until an endpoint of the other role is attached too.
    ///
    /// # Errors
    /// - `OutOfMemory` if a new channel could not be allocated
    /// - `InvalidSize` if the configured capacity is zero
    pub fn open(&self, key: K, role: Role) -> Result<Endpoint<K>, FifoError> {
        self.open_with_interrupt(key, role, Interrupt::new())
    }

    /// Like [`open`](Self::open), cancellable through `interrupt`
    ///
    /// The endpoint keeps the token, so it also cancels later reads and
    /// writes.
    ///
    /// # Errors
    /// As `open`, plus `Interrupted` if the token fires while waiting for
    /// the other role. The attach is then undone as if it never happened.
    pub fn open_with_interrupt(
        &self,
        key: K,
        role: Role,
        interrupt: Interrupt,
    ) -> Result<Endpoint<K>, FifoError> {
        let (channel, ticket) = self.attach(&key, role)?;
        let id = self.inner.id_gen.get_next();

        if let Err(e) = channel.rendezvous(role, ticket, &interrupt) {
            log::debug!("registry.open: {role} {id} on {key:?} abandoned: {e}");
            // Someone may have attached meanwhile, or already removed it
            let mut channels = self.inner.channels.lock();
            if channel.is_unused() && Self::remove_installed(&mut channels, &key, &channel) {
                log::debug!("registry.open: {key:?} destroyed after abandoned open");
            }
            return Err(e);
        }

        log::debug!("registry.open: {role} {id} attached to {key:?}");
        Ok(Endpoint::new(id, key, role, channel, self.clone(), interrupt))
    }

    /// Find or create the channel and count `role` on it
    ///
    /// Returns the channel and the rendezvous ticket from `Channel::join`.
    ///
    /// The allocation happens outside the registry lock. Two first openers
    /// of the same key may both allocate; whoever takes the lock first
    /// installs its channel and the other one drops its own.
    fn attach(&self, key: &K, role: Role) -> Result<(Arc<Channel>, u64), FifoError> {
        let mut fresh: Option<Arc<Channel>> = None;
        loop {
            let mut channels = self.inner.channels.lock();
            if let Some(channel) = channels.get(key) {
                if fresh.is_some() {
                    log::debug!("registry.attach: {key:?} installed concurrently, discarding ours");
                }
                let ticket = channel.join(role);
                return Ok((Arc::clone(channel), ticket));
            }
            if let Some(channel) = fresh.take() {
                log::debug!(
                    "registry.attach: created {key:?} with capacity {}",
                    channel.capacity()
                );
                let ticket = channel.join(role);
                channels.insert(key.clone(), Arc::clone(&channel));
                return Ok((channel, ticket));
            }
            drop(channels);

            fresh = Some(Arc::new(Channel::new(self.inner.config.capacity)?));
        }
    }

    /// Uncount `role` and destroy the channel if it became unused
    pub(crate) fn detach(&self, key: &K, channel: &Arc<Channel>, role: Role) {
        let mut channels = self.inner.channels.lock();
        if !channel.leave(role) {
            return;
        }
        if Self::remove_installed(&mut channels, key, channel) {
            log::debug!("registry.detach: last endpoint left, {key:?} destroyed");
        } else {
            log::warn!("registry.detach: {key:?} unused but not installed");
        }
    }

    /// Drop the map entry of `key` if it is `channel`
    ///
    /// The caller holds the registry lock, so nobody attaches in between.
    fn remove_installed(
        channels: &mut HashMap<K, Arc<Channel>>,
        key: &K,
        channel: &Arc<Channel>,
    ) -> bool {
        match channels.get(key) {
            Some(installed) if Arc::ptr_eq(installed, channel) => {
                channels.remove(key);
                true
            }
            _ => false,
        }
    }

    /// Counters of the channel `key`, if it exists
    #[must_use]
    pub fn stats(&self, key: &K) -> Option<ChannelStats> {
        let channel = self.inner.channels.lock().get(key).cloned();
        channel.map(|channel| channel.stats())
    }

    #[must_use]
    pub fn contains(&self, key: &K) -> bool {
        self.inner.channels.lock().contains_key(key)
    }

    /// Number of live channels
    #[must_use]
    pub fn channel_count(&self) -> usize {
        self.inner.channels.lock().len()
    }
}

impl<K: ChannelKey> Default for FifoRegistry<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: ChannelKey> fmt::Debug for FifoRegistry<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "FifoRegistry(channels={}, capacity={})",
            self.channel_count(),
            self.inner.config.capacity
        )
    }
}
