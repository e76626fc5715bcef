#![allow(dead_code)]

use std::time::{Duration, Instant};

use fifos::{ChannelKey, ChannelStats, FifoConfig, FifoRegistry};

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn registry(capacity: usize) -> FifoRegistry<&'static str> {
    init_logging();
    FifoRegistry::with_config(FifoConfig::default().with_capacity(capacity))
}

/// Poll the channel counters until `cond` holds
///
/// Used to know that another thread is really parked before acting, instead
/// of sleeping for a guessed amount of time.
///
/// # Panics
/// Panics after 5 seconds.
pub fn wait_for_stats<K: ChannelKey>(
    registry: &FifoRegistry<K>,
    key: &K,
    cond: impl Fn(&ChannelStats) -> bool,
) -> ChannelStats {
    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        if let Some(stats) = registry.stats(key) {
            if cond(&stats) {
                return stats;
            }
        }
        assert!(
            Instant::now() < deadline,
            "timed out waiting on {key:?}, last stats: {:?}",
            registry.stats(key)
        );
        std::thread::sleep(Duration::from_millis(1));
    }
}

/// Attach one producer and one consumer to `key`
pub fn open_pair<K: ChannelKey>(
    registry: &FifoRegistry<K>,
    key: K,
) -> (fifos::Endpoint<K>, fifos::Endpoint<K>) {
    let consumer = {
        let registry = registry.clone();
        let key = key.clone();
        std::thread::spawn(move || registry.open(key, fifos::Role::Consumer))
    };
    let producer = registry
        .open(key, fifos::Role::Producer)
        .expect("producer open");
    let consumer = consumer
        .join()
        .expect("consumer thread panicked")
        .expect("consumer open");
    (producer, consumer)
}
