//! In-process chat partner that echoes every line back

use fifos::{ChannelKey, FifoRegistry, Role};

use crate::message::{ChatError, Message};
use crate::session::{read_greeting, read_message, write_message};

/// Serve one session: read from `inbound`, answer on `outbound`
///
/// Introduces itself as `name`, echoes every `Normal` line it receives and
/// ends its own session when the other side ends theirs. Returns the number
/// of lines echoed.
///
/// # Errors
/// Opening either channel, or any stream or framing error.
pub fn run_echo_peer<K: ChannelKey>(
    registry: &FifoRegistry<K>,
    name: &str,
    inbound: K,
    outbound: K,
) -> Result<usize, ChatError> {
    let mut input = registry.open(inbound, Role::Consumer)?;
    let mut output = registry.open(outbound, Role::Producer)?;

    write_message(&mut output, &Message::name(name))?;
    let partner = read_greeting(&mut input)?;
    log::debug!("chat: {name} talking to {partner}");

    let mut echoed = 0;
    while let Some(message) = read_message(&mut input)? {
        if message.kind != crate::MessageKind::Normal {
            break;
        }
        write_message(&mut output, &Message::normal(message.text))?;
        echoed += 1;
    }

    write_message(&mut output, &Message::end())?;
    Ok(echoed)
}
