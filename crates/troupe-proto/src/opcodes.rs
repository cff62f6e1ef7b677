//! Session-layer opcodes.
//!
//! Only four values are interpreted below the application. Any other opcode
//! byte is legal on the wire and simply has no [`Opcode`] representation.

/// Control opcodes understood by the channel session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Opcode {
    /// Identity offer from the connecting actor
    Hello = 0x01,
    /// Identity reply from the accepting actor; completes the handshake
    Welcome = 0x02,
    /// Heartbeat request
    Ping = 0x03,
    /// Heartbeat reply
    Pong = 0x04,
}

impl Opcode {
    /// Map a raw opcode byte to a control opcode.
    ///
    /// Returns `None` for application opcodes.
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x01 => Some(Self::Hello),
            0x02 => Some(Self::Welcome),
            0x03 => Some(Self::Ping),
            0x04 => Some(Self::Pong),
            _ => None,
        }
    }

    /// Raw opcode byte.
    pub fn to_u8(self) -> u8 {
        self as u8
    }
}
