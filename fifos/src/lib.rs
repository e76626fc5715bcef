//! Named, multi-instance FIFOs
//!
//! Independent byte channels identified by a key, each with any number of
//! producers and consumers, a fixed-capacity buffer and blocking, ordered
//! delivery.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────┐
//! │  FifoRegistry (key → channel)       │
//! │  - lazy creation on first open      │
//! │  - teardown on last close           │
//! └─────────────────────────────────────┘
//!          │ hands out
//!          ▼
//! ┌─────────────────────────────────────┐
//! │  Endpoint (producer or consumer)    │
//! │  - read / write / close             │
//! │  - Interrupt token                  │
//! └─────────────────────────────────────┘
//!          │ blocks on
//!          ▼
//! ┌─────────────────────────────────────┐
//! │  Channel (monitor)                  │
//! │  - one mutex, two condvars          │
//! │  - role and blocked counters        │
//! └─────────────────────────────────────┘
//!          │ stores bytes in
//!          ▼
//! ┌─────────────────────────────────────┐
//! │  RingBuffer (fixed capacity)        │
//! └─────────────────────────────────────┘
//! ```

pub mod buffer;
pub mod channel;
pub mod config;
pub mod endpoint;
pub mod error;
pub mod idgen;
pub mod interrupt;
mod protocol;
pub mod registry;

pub use buffer::{BufferError, RingBuffer};
pub use channel::{ChannelStats, Role};
pub use config::{FifoConfig, DEFAULT_CAPACITY};
pub use endpoint::Endpoint;
pub use error::FifoError;
pub use idgen::{EndpointId, IdGen};
pub use interrupt::Interrupt;
pub use registry::{ChannelKey, FifoRegistry};
