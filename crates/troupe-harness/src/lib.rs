//! Test harness for troupe channel sessions.
//!
//! Three layers, from cheapest to most realistic:
//!
//! - [`MemoryTransport`] records outbound frames in memory. Tests feed inbound
//!   chunks straight into the session and inspect what it sent back.
//! - [`scenario`] wires a hub session to one or more scripted [`Peer`]s and
//!   checks the resulting [`scenario::World`] with an oracle.
//! - [`StreamTransport`] runs a session over any byte stream (a tokio duplex
//!   pipe or a turmoil TCP connection, see [`sim`]), framing chunks by header.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod memory;
pub mod peer;
pub mod recorder;
pub mod scenario;
pub mod sim;
pub mod stream;

pub use memory::MemoryTransport;
pub use peer::{Inbound, Peer};
pub use recorder::{RecordingObserver, SessionEvent};
pub use stream::{StreamSession, StreamTransport, read_frame, serve};
