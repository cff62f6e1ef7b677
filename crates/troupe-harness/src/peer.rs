//! Scripted remote peer.
//!
//! A [`Peer`] plays the other end of a channel: it produces the frames a real
//! client would send (Hello, Ping, Pong, application frames) and decodes what
//! the session sends back.

use bytes::Bytes;
use troupe_proto::{ActorDescription, BinaryFrameCodec, CodecError, Frame, FrameCodec, Opcode};

/// Decoded frame received from a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    /// Handshake reply carrying the session's identity
    Welcome(ActorDescription),
    /// Handshake request (only if the session side is itself a client)
    Hello(ActorDescription),
    /// Heartbeat request
    Ping,
    /// Heartbeat reply
    Pong,
    /// Any other opcode; payload as sent
    Other {
        /// Raw opcode byte
        opcode: u8,
        /// Payload following the header
        payload: Bytes,
    },
}

/// The remote side of a channel, speaking the binary frame codec.
#[derive(Debug, Clone)]
pub struct Peer {
    actor: ActorDescription,
    codec: BinaryFrameCodec,
}

impl Peer {
    /// Peer presenting `actor` in its Hello.
    pub fn new(actor: ActorDescription) -> Self {
        Self { actor, codec: BinaryFrameCodec::new() }
    }

    /// Identity offered in Hello.
    pub fn actor(&self) -> &ActorDescription {
        &self.actor
    }

    /// Hello frame carrying this peer's identity.
    ///
    /// # Errors
    /// Propagates codec failures.
    pub fn hello(&self) -> Result<Bytes, CodecError> {
        let payload = self.codec.encode_control_payload(&self.actor)?;
        self.codec.encode_frame(&Frame::Hello(payload))
    }

    /// Ping frame.
    ///
    /// # Errors
    /// Propagates codec failures.
    pub fn ping(&self) -> Result<Bytes, CodecError> {
        self.codec.encode_frame(&Frame::Ping)
    }

    /// Pong frame.
    ///
    /// # Errors
    /// Propagates codec failures.
    pub fn pong(&self) -> Result<Bytes, CodecError> {
        self.codec.encode_frame(&Frame::Pong)
    }

    /// Application frame with an arbitrary opcode.
    ///
    /// # Errors
    /// Propagates codec failures (payload too large).
    pub fn app(&self, opcode: u8, payload: &[u8]) -> Result<Bytes, CodecError> {
        self.codec.encode_raw(opcode, payload)
    }

    /// Decode one complete frame sent by the session.
    ///
    /// # Errors
    /// Header, payload or identity decoding failures.
    pub fn decode(&self, frame: &[u8]) -> Result<Inbound, CodecError> {
        let header = self.codec.try_decode_frame_header(frame)?;
        let payload = self.codec.decode_payload(frame, &header)?;

        let inbound = match header.opcode() {
            Some(Opcode::Welcome) => Inbound::Welcome(self.codec.decode_control_payload(payload)?),
            Some(Opcode::Hello) => Inbound::Hello(self.codec.decode_control_payload(payload)?),
            Some(Opcode::Ping) => Inbound::Ping,
            Some(Opcode::Pong) => Inbound::Pong,
            None => Inbound::Other {
                opcode: header.raw_opcode(),
                payload: Bytes::copy_from_slice(payload),
            },
        };
        Ok(inbound)
    }

    /// Decode a batch of frames, stopping at the first failure.
    ///
    /// # Errors
    /// See [`decode`](Self::decode).
    pub fn decode_all(&self, frames: &[Bytes]) -> Result<Vec<Inbound>, CodecError> {
        frames.iter().map(|frame| self.decode(frame)).collect()
    }
}
