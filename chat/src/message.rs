//! Fixed-size chat frames
//!
//! Every frame is `FRAME_LEN` bytes: one kind byte followed by a
//! NUL-padded content area. Fixed frames let a reader ask the channel for
//! exactly one message per read.

use std::fmt;

/// Size of the content area, including room for the terminating NUL
pub const CONTENT_LEN: usize = 128;

/// Size of a whole frame on the wire
pub const FRAME_LEN: usize = CONTENT_LEN + 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    /// A line of chat text
    Normal = 0,
    /// First frame of a session, carries the sender's name
    Name = 1,
    /// Last frame of a session
    End = 2,
}

impl TryFrom<u8> for MessageKind {
    type Error = ChatError;

    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        match byte {
            0 => Ok(Self::Normal),
            1 => Ok(Self::Name),
            2 => Ok(Self::End),
            other => Err(ChatError::UnknownKind(other)),
        }
    }
}

/// Error type for chat sessions
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatError {
    /// Frame with a kind byte outside `MessageKind`
    UnknownKind(u8),
    /// A frame of the wrong kind at this point of the session
    Protocol {
        expected: MessageKind,
        got: MessageKind,
    },
    /// Stream ended before the session started
    NoGreeting,
    /// Stream ended in the middle of a frame
    Truncated { got: usize },
    /// Underlying stream failure
    Io(embedded_io::ErrorKind),
}

impl fmt::Display for ChatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownKind(byte) => write!(f, "unknown message kind {byte}"),
            Self::Protocol { expected, got } => {
                write!(f, "protocol error: expected {expected:?}, got {got:?}")
            }
            Self::NoGreeting => write!(f, "stream closed before the peer introduced itself"),
            Self::Truncated { got } => {
                write!(f, "stream closed mid-frame after {got}/{FRAME_LEN} bytes")
            }
            Self::Io(kind) => write!(f, "I/O error: {kind:?}"),
        }
    }
}

impl std::error::Error for ChatError {}

impl From<fifos::FifoError> for ChatError {
    fn from(e: fifos::FifoError) -> Self {
        Self::Io(embedded_io::Error::kind(&e))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub kind: MessageKind,
    pub text: String,
}

impl Message {
    #[must_use]
    pub fn name(name: &str) -> Self {
        Self {
            kind: MessageKind::Name,
            text: name.to_string(),
        }
    }

    #[must_use]
    pub fn normal(text: impl Into<String>) -> Self {
        Self {
            kind: MessageKind::Normal,
            text: text.into(),
        }
    }

    #[must_use]
    pub fn end() -> Self {
        Self {
            kind: MessageKind::End,
            text: String::new(),
        }
    }

    /// Serialize into one frame
    ///
    /// Text longer than `CONTENT_LEN - 1` bytes is cut at the last character
    /// boundary that fits.
    #[must_use]
    pub fn encode(&self) -> [u8; FRAME_LEN] {
        let mut frame = [0u8; FRAME_LEN];
        frame[0] = self.kind as u8;

        let mut end = self.text.len().min(CONTENT_LEN - 1);
        while !self.text.is_char_boundary(end) {
            end -= 1;
        }
        let text = &self.text.as_bytes()[..end];
        frame[1..=text.len()].copy_from_slice(text);
        frame
    }

    /// Parse one frame
    ///
    /// # Errors
    /// `ChatError::UnknownKind` if the kind byte is not a `MessageKind`.
    pub fn decode(frame: &[u8; FRAME_LEN]) -> Result<Self, ChatError> {
        let kind = MessageKind::try_from(frame[0])?;
        let content = &frame[1..];
        let len = content.iter().position(|&b| b == 0).unwrap_or(content.len());
        Ok(Self {
            kind,
            text: String::from_utf8_lossy(&content[..len]).into_owned(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_layout() {
        let frame = Message::normal("hi").encode();
        assert_eq!(frame.len(), 129);
        assert_eq!(frame[0], 0);
        assert_eq!(&frame[1..3], b"hi");
        assert!(frame[3..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_long_text_truncated_on_char_boundary() {
        // 126 ASCII bytes, then a 2-byte character that does not fit in 127
        let text = format!("{}é", "a".repeat(126));
        let decoded = Message::decode(&Message::normal(text).encode()).unwrap();
        assert_eq!(decoded.text, "a".repeat(126));
    }

    #[test]
    fn test_unknown_kind_rejected() {
        let mut frame = Message::end().encode();
        frame[0] = 9;
        assert_eq!(Message::decode(&frame), Err(ChatError::UnknownKind(9)));
    }

    #[test]
    fn test_name_frame() {
        let decoded = Message::decode(&Message::name("alice").encode()).unwrap();
        assert_eq!(decoded, Message::name("alice"));
    }
}
