//! Line-based chat over two named FIFOs
//!
//! Each participant writes its own session into one channel and reads the
//! partner's session from another. Sending and receiving run on separate
//! threads because both block.

pub mod message;
pub mod peer;
pub mod session;

pub use message::{ChatError, Message, MessageKind, CONTENT_LEN, FRAME_LEN};
pub use peer::run_echo_peer;
pub use session::{read_greeting, read_message, receive_messages, send_session, write_message};

/// Channel carrying frames from the user to the echo peer
pub const TO_PEER: &str = "to-echo";

/// Channel carrying frames from the echo peer back to the user
pub const FROM_PEER: &str = "from-echo";
