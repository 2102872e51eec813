//! The wire message exchanged between council members.
//!
//! Every message carries its type, the value under discussion, the
//! proposal number it pertains to, and the id of whoever sent it. The wire
//! form is length-prefixed JSON: a 4-byte big-endian length followed by
//! that many bytes of `serde_json`-encoded `Message`. This keeps the
//! framing trivial to read off a fresh `TcpStream` while staying easy to
//! inspect, unlike a raw Java-serialization stream.

use std::io::{self, Read, Write};

use serde::{Deserialize, Serialize};

/// The six message types exchanged by the protocol.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageType {
    Prepare,
    Promise,
    Reject,
    AcceptRequest,
    Accepted,
    Learn,
}

/// An immutable record carrying `{type, value, proposalNumber, senderId}`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    #[serde(rename = "type")]
    pub msg_type: MessageType,
    pub value: String,
    pub proposal_number: i64,
    pub sender_id: String,
}

impl Message {
    pub fn new(
        msg_type: MessageType,
        value: impl Into<String>,
        proposal_number: i64,
        sender_id: impl Into<String>,
    ) -> Self {
        Message {
            msg_type,
            value: value.into(),
            proposal_number,
            sender_id: sender_id.into(),
        }
    }

    /// Writes this message to `w` as a 4-byte length prefix followed by its
    /// JSON encoding, then flushes. Used for a single-shot send over a
    /// freshly opened connection.
    pub fn write_framed<W: Write>(&self, mut w: W) -> io::Result<()> {
        let encoded =
            serde_json::to_vec(self).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        let len = encoded.len() as u32;
        w.write_all(&len.to_be_bytes())?;
        w.write_all(&encoded)?;
        w.flush()
    }

    /// Reads exactly one framed message from `r`. Returns `Err` on a short
    /// read, an oversized frame, or malformed JSON; the caller treats all
    /// of these as a dropped message.
    pub fn read_framed<R: Read>(mut r: R) -> io::Result<Message> {
        let mut len_buf = [0u8; 4];
        r.read_exact(&mut len_buf)?;
        let len = u32::from_be_bytes(len_buf) as usize;

        const MAX_FRAME: usize = 1 << 20;
        if len > MAX_FRAME {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("frame of {} bytes exceeds the {} byte limit", len, MAX_FRAME),
            ));
        }

        let mut payload = vec![0u8; len];
        r.read_exact(&mut payload)?;
        serde_json::from_slice(&payload).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_a_byte_buffer() {
        let m = Message::new(MessageType::Promise, "M1", 3, "M2");
        let mut buf = Vec::new();
        m.write_framed(&mut buf).unwrap();

        let decoded = Message::read_framed(&buf[..]).unwrap();
        assert_eq!(m, decoded);
    }

    #[test]
    fn empty_value_round_trips() {
        let m = Message::new(MessageType::Reject, "", 5, "M3");
        let mut buf = Vec::new();
        m.write_framed(&mut buf).unwrap();
        assert_eq!(m, Message::read_framed(&buf[..]).unwrap());
    }

    #[test]
    fn rejects_oversized_frame() {
        let mut buf = Vec::new();
        buf.extend_from_slice(&(2u32 << 20).to_be_bytes());
        assert!(Message::read_framed(&buf[..]).is_err());
    }

    #[test]
    fn wire_shape_uses_camel_case_field_names() {
        let m = Message::new(MessageType::AcceptRequest, "M1", 3, "M1");
        let encoded = serde_json::to_string(&m).unwrap();
        assert!(encoded.contains("\"type\":\"ACCEPT_REQUEST\""));
        assert!(encoded.contains("\"proposalNumber\":3"));
        assert!(encoded.contains("\"senderId\":\"M1\""));
    }
}
