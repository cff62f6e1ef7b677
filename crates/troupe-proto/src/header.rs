//! Fixed 8-byte frame header.
//!
//! ```text
//! 0      2         3        4                  8
//! ┌──────┬─────────┬────────┬──────────────────┐
//! │ "TR" │ version │ opcode │ payload_len (BE) │
//! └──────┴─────────┴────────┴──────────────────┘
//! ```
//!
//! The header is read with `zerocopy`, so decoding is a bounds check and a
//! copy of eight bytes. Validation (magic, version, size limit) happens in
//! [`FrameHeader::from_bytes`]; nothing else constructs a header from the
//! wire.

use zerocopy::{
    FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned, byteorder::big_endian::U32,
};

use crate::{
    errors::{CodecError, Result},
    opcodes::Opcode,
};

/// Frame header.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, FromBytes, IntoBytes, KnownLayout, Immutable, Unaligned,
)]
#[repr(C)]
pub struct FrameHeader {
    magic: [u8; 2],
    version: u8,
    opcode: u8,
    payload_len: U32,
}

impl FrameHeader {
    /// Encoded header size
    pub const SIZE: usize = 8;

    /// Frame magic
    pub const MAGIC: [u8; 2] = *b"TR";

    /// Protocol version written by this codec
    pub const VERSION: u8 = 1;

    /// Largest accepted payload (16 MiB)
    pub const MAX_PAYLOAD_SIZE: usize = 16 * 1024 * 1024;

    /// Build a header for a raw opcode byte.
    ///
    /// Application frames use this with opcodes outside [`Opcode`].
    pub fn new(opcode: u8, payload_len: u32) -> Self {
        Self {
            magic: Self::MAGIC,
            version: Self::VERSION,
            opcode,
            payload_len: U32::new(payload_len),
        }
    }

    /// Build a header for a control opcode.
    pub fn for_opcode(opcode: Opcode, payload_len: u32) -> Self {
        Self::new(opcode.to_u8(), payload_len)
    }

    /// Parse and validate a header from the start of `bytes`.
    ///
    /// Trailing bytes are ignored; whether the payload is actually present is
    /// checked when the payload is sliced out.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let (header, _) = Self::read_from_prefix(bytes)
            .map_err(|_| CodecError::Truncated { expected: Self::SIZE, actual: bytes.len() })?;

        if header.magic != Self::MAGIC {
            return Err(CodecError::InvalidMagic { found: header.magic });
        }
        if header.version != Self::VERSION {
            return Err(CodecError::UnsupportedVersion(header.version));
        }
        let size = header.payload_len();
        if size > Self::MAX_PAYLOAD_SIZE {
            return Err(CodecError::PayloadTooLarge { size, max: Self::MAX_PAYLOAD_SIZE });
        }

        Ok(header)
    }

    /// Encoded header bytes.
    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut out = [0u8; Self::SIZE];
        out.copy_from_slice(self.as_bytes());
        out
    }

    /// Control opcode, or `None` for application frames.
    pub fn opcode(&self) -> Option<Opcode> {
        Opcode::from_u8(self.opcode)
    }

    /// Raw opcode byte.
    pub fn raw_opcode(&self) -> u8 {
        self.opcode
    }

    /// Declared payload length in bytes.
    pub fn payload_len(&self) -> usize {
        self.payload_len.get() as usize
    }

    /// Total frame length (header plus payload).
    pub fn frame_len(&self) -> usize {
        Self::SIZE + self.payload_len()
    }
}
