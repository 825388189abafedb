use bytes::{BufMut, Bytes, BytesMut};
use prost::encoding::encoded_len_varint;
use prost::Message as _;

use crate::{TransportError, MAX_MESSAGE_LEN};

/// The size of the big-endian body length which prefixes every frame.
pub const LENGTH_PREFIX_SIZE: usize = std::mem::size_of::<u16>();

/// The largest body which fits inside a single frame.
pub const MAX_BODY_LEN: usize = MAX_MESSAGE_LEN - LENGTH_PREFIX_SIZE;

/// The key byte of the payload field, tag 3 with the length-delimited wire type.
const PAYLOAD_KEY_LEN: usize = 1;

#[derive(Clone, PartialEq, Eq, Hash, prost::Message)]
/// A single message exchanged between two transports.
///
/// On the wire this is a protobuf message with the sender as field `1`,
/// the recipient as field `2` and the payload as field `3`.
pub struct Message {
    #[prost(string, tag = "1")]
    pub sender: String,
    #[prost(string, tag = "2")]
    pub recipient: String,
    #[prost(bytes = "bytes", tag = "3")]
    pub payload: Bytes,
}

impl Message {
    pub fn new(
        sender: impl Into<String>,
        recipient: impl Into<String>,
        payload: impl Into<Bytes>,
    ) -> Self {
        Self {
            sender: sender.into(),
            recipient: recipient.into(),
            payload: payload.into(),
        }
    }
}

/// Serializes a message into a length-prefixed frame.
///
/// Returns [TransportError::MessageTooLong] if the frame would exceed
/// [MAX_MESSAGE_LEN] bytes.
pub fn encode_frame(msg: &Message) -> Result<Bytes, TransportError> {
    let body = msg.encode_to_vec();
    let frame_len = LENGTH_PREFIX_SIZE + body.len();
    if frame_len > MAX_MESSAGE_LEN {
        return Err(TransportError::MessageTooLong { frame_len });
    }

    let mut frame = BytesMut::with_capacity(frame_len);
    frame.put_u16(body.len() as u16);
    frame.put_slice(&body);
    Ok(frame.freeze())
}

/// Deserializes a frame body, without its length prefix.
pub fn decode_body(body: &[u8]) -> Result<Message, prost::DecodeError> {
    Message::decode(body)
}

/// The largest payload that can be sent between the two IDs in a single frame.
pub fn max_payload_len(sender: &str, recipient: &str) -> usize {
    let header_len = Message::new(sender, recipient, Bytes::new()).encoded_len();
    let budget = match MAX_BODY_LEN.checked_sub(header_len + PAYLOAD_KEY_LEN) {
        Some(budget) => budget,
        None => return 0,
    };

    // The payload length prefix is itself variable width.
    let mut len = budget;
    while len > 0 && len + encoded_len_varint(len as u64) > budget {
        len -= 1;
    }
    len
}
