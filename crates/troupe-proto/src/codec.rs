//! Frame codec abstraction and the default binary implementation.
//!
//! The session layer depends only on [`FrameCodec`]. It needs four things from
//! a codec: recognise a header, slice out a payload, (de)serialise the actor
//! description carried by Hello/Welcome, and encode the four control frames.
//! Anything beyond that (application framing, compression, encryption) is the
//! codec's own business.

use bytes::{BufMut, Bytes, BytesMut};

use crate::{
    actor::ActorDescription,
    errors::{CodecError, Result},
    frame::Frame,
    header::FrameHeader,
};

/// Pluggable frame codec consumed by channel sessions.
///
/// Implementations must be cheap to call from timer callbacks: no blocking,
/// no I/O.
pub trait FrameCodec: Send + Sync + 'static {
    /// Decode the header at the start of `buf`.
    ///
    /// `buf` is one inbound chunk as delivered by the transport.
    fn try_decode_frame_header(&self, buf: &[u8]) -> Result<FrameHeader>;

    /// Slice the payload described by `header` out of `buf`.
    ///
    /// `buf` must start at the header.
    fn decode_payload<'a>(&self, buf: &'a [u8], header: &FrameHeader) -> Result<&'a [u8]>;

    /// Deserialise the identity carried by a Hello or Welcome payload.
    ///
    /// Blank fields are not rejected here; callers check
    /// [`ActorDescription::validate`].
    fn decode_control_payload(&self, payload: &[u8]) -> Result<ActorDescription>;

    /// Serialise an identity for a Hello or Welcome payload.
    fn encode_control_payload(&self, actor: &ActorDescription) -> Result<Bytes>;

    /// Encode a complete control frame (header and payload).
    fn encode_frame(&self, frame: &Frame) -> Result<Bytes>;
}

/// Default codec: [`FrameHeader`] followed by the raw payload, with CBOR
/// control payloads.
#[derive(Debug, Clone, Copy, Default)]
pub struct BinaryFrameCodec;

impl BinaryFrameCodec {
    /// Create the codec.
    pub fn new() -> Self {
        Self
    }

    /// Encode an application frame with an arbitrary opcode byte.
    ///
    /// Not used by the session layer itself; peers and tests use it to put
    /// application traffic on the wire in the same framing.
    pub fn encode_raw(&self, opcode: u8, payload: &[u8]) -> Result<Bytes> {
        let len = checked_len(payload.len())?;
        let mut buf = BytesMut::with_capacity(FrameHeader::SIZE + payload.len());
        buf.put_slice(&FrameHeader::new(opcode, len).to_bytes());
        buf.put_slice(payload);
        Ok(buf.freeze())
    }
}

impl FrameCodec for BinaryFrameCodec {
    fn try_decode_frame_header(&self, buf: &[u8]) -> Result<FrameHeader> {
        FrameHeader::from_bytes(buf)
    }

    fn decode_payload<'a>(&self, buf: &'a [u8], header: &FrameHeader) -> Result<&'a [u8]> {
        let end = header.frame_len();
        buf.get(FrameHeader::SIZE..end)
            .ok_or(CodecError::Truncated { expected: end, actual: buf.len() })
    }

    fn decode_control_payload(&self, payload: &[u8]) -> Result<ActorDescription> {
        ciborium::de::from_reader(payload).map_err(|e| CodecError::ControlPayload(e.to_string()))
    }

    fn encode_control_payload(&self, actor: &ActorDescription) -> Result<Bytes> {
        let mut buf = Vec::new();
        ciborium::ser::into_writer(actor, &mut buf)
            .map_err(|e| CodecError::ControlPayload(e.to_string()))?;
        Ok(Bytes::from(buf))
    }

    fn encode_frame(&self, frame: &Frame) -> Result<Bytes> {
        self.encode_raw(frame.opcode().to_u8(), frame.payload())
    }
}

fn checked_len(len: usize) -> Result<u32> {
    if len > FrameHeader::MAX_PAYLOAD_SIZE {
        return Err(CodecError::PayloadTooLarge { size: len, max: FrameHeader::MAX_PAYLOAD_SIZE });
    }
    Ok(len as u32)
}
