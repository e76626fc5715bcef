//! Sending and receiving sides of a chat session
//!
//! A session is a `Name` frame, any number of `Normal` frames and an `End`
//! frame, over any `embedded_io` byte stream.

use embedded_io::{Read, Write};

use crate::message::{ChatError, Message, MessageKind, FRAME_LEN};

fn io_error<E: embedded_io::Error>(e: E) -> ChatError {
    ChatError::Io(e.kind())
}

/// Write one frame
///
/// # Errors
/// `ChatError::Io` if the stream rejects the write.
pub fn write_message<W: Write>(out: &mut W, message: &Message) -> Result<(), ChatError> {
    out.write_all(&message.encode()).map_err(io_error)?;
    out.flush().map_err(io_error)
}

/// Read one frame
///
/// Returns `Ok(None)` if the stream ended cleanly before the frame.
///
/// # Errors
/// `ChatError::Truncated` if the stream ended inside the frame,
/// `ChatError::UnknownKind` for a malformed frame, `ChatError::Io` on
/// stream errors.
pub fn read_message<R: Read>(input: &mut R) -> Result<Option<Message>, ChatError> {
    let mut frame = [0u8; FRAME_LEN];
    let mut got = 0;
    while got < FRAME_LEN {
        let n = input.read(&mut frame[got..]).map_err(io_error)?;
        if n == 0 {
            if got == 0 {
                return Ok(None);
            }
            return Err(ChatError::Truncated { got });
        }
        got += n;
    }
    Message::decode(&frame).map(Some)
}

/// Introduce ourselves, send every line, then close the session
///
/// Returns the number of lines sent.
///
/// # Errors
/// Fails on the first frame the stream rejects.
pub fn send_session<W, I>(out: &mut W, name: &str, lines: I) -> Result<usize, ChatError>
where
    W: Write,
    I: IntoIterator<Item = String>,
{
    write_message(out, &Message::name(name))?;
    let mut sent = 0;
    for line in lines {
        write_message(out, &Message::normal(line))?;
        sent += 1;
    }
    write_message(out, &Message::end())?;
    log::debug!("chat: {name} sent {sent} lines");
    Ok(sent)
}

/// Read the peer's `Name` frame
///
/// # Errors
/// `ChatError::NoGreeting` if the stream is already over,
/// `ChatError::Protocol` if the first frame is not a `Name`.
pub fn read_greeting<R: Read>(input: &mut R) -> Result<String, ChatError> {
    let message = read_message(input)?.ok_or(ChatError::NoGreeting)?;
    if message.kind != MessageKind::Name {
        return Err(ChatError::Protocol {
            expected: MessageKind::Name,
            got: message.kind,
        });
    }
    Ok(message.text)
}

/// Hand each `Normal` frame to `on_message` until `End` or end-of-stream
///
/// Returns the number of messages received.
///
/// # Errors
/// Stream and framing errors from [`read_message`].
pub fn receive_messages<R, F>(input: &mut R, mut on_message: F) -> Result<usize, ChatError>
where
    R: Read,
    F: FnMut(&str),
{
    let mut received = 0;
    while let Some(message) = read_message(input)? {
        if message.kind != MessageKind::Normal {
            log::debug!("chat: session closed by peer ({:?})", message.kind);
            break;
        }
        on_message(&message.text);
        received += 1;
    }
    Ok(received)
}
