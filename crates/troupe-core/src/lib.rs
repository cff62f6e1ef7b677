//! Troupe channel session layer.
//!
//! Turns an order-preserving byte transport into an identified,
//! liveness-monitored channel between two actors.
//!
//! # Architecture
//!
//! The session is the only stateful piece. It is fed inbound chunks by the
//! transport and answers through the [`TransportSession`] contract; it never
//! owns a socket. Frame layout is delegated to a pluggable
//! [`troupe_proto::FrameCodec`], so the session only reasons about opcodes and
//! actor identities.
//!
//! Liveness runs on two tokio timers owned by each session: a periodic
//! keep-alive tick and a one-shot timeout armed whenever a Ping goes out.
//! Closing the session cancels both.
//!
//! # Components
//!
//! - [`session`]: Channel session state machine (handshake, Ping/Pong, close)
//! - [`keep_alive`]: Inbound-activity tracker and periodic tick
//! - [`config`]: Channel configuration and timeout policy
//! - [`transport`]: Transport contract consumed by sessions
//! - [`observer`]: Upward notifications
//! - [`error`]: Error types

pub mod config;
pub mod error;
pub mod keep_alive;
pub mod observer;
pub mod session;
mod sync;
mod timeout;
pub mod transport;

pub use config::{ChannelConfiguration, KeepAliveTimeoutPolicy};
pub use error::{ConfigError, HandshakeError, SessionError, TransportError};
pub use keep_alive::KeepAliveTracker;
pub use observer::SessionObserver;
pub use session::{ChannelSession, KeepAliveTick, SessionPhase};
pub use transport::TransportSession;
