//! Wire types for Troupe actor channels.
//!
//! A channel carries frames: a fixed 8-byte header (zero-copy binary) followed
//! by a variable-length payload. Four opcodes are reserved for the session
//! layer (`Hello`, `Welcome`, `Ping`, `Pong`); everything else belongs to the
//! application and is opaque at this level.
//!
//! The session layer never touches the byte layout directly. It goes through
//! the [`FrameCodec`] trait, and [`BinaryFrameCodec`] is the implementation
//! shipped here. Handshake payloads carry an [`ActorDescription`] encoded as
//! CBOR.
//!
//! # Security
//!
//! Header parsing uses compile-time verified layouts via `zerocopy`. Payloads
//! are capped at 16 MiB.
#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod actor;
pub mod codec;
pub mod errors;
pub mod frame;
pub mod header;
pub mod opcodes;

pub use actor::ActorDescription;
pub use codec::{BinaryFrameCodec, FrameCodec};
pub use errors::{CodecError, Result};
pub use frame::Frame;
pub use header::FrameHeader;
pub use opcodes::Opcode;
