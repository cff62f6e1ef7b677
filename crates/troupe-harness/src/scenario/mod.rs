//! Scenario framework.
//!
//! A scenario connects one hub identity to any number of scripted peers, each
//! over its own [`MemoryTransport`](crate::MemoryTransport) and
//! [`ChannelSession`](troupe_core::ChannelSession). Every peer opens with a
//! Hello (or a deliberately broken first chunk), then plays its steps in
//! declaration order. An oracle inspects the resulting [`World`].
//!
//! The oracle is mandatory: [`Scenario`] has no `run` method, only
//! [`RunnableScenario`] does.
//!
//! Scenarios are synchronous. Keep-alive timers are scheduled on a private
//! runtime that is never driven, so only inbound traffic moves the sessions;
//! timer behaviour belongs in paused-clock tests.

pub mod builder;
pub mod oracle;
pub mod world;

pub use builder::{RunnableScenario, Scenario, Step};
pub use world::{PeerLink, World};

/// Verification run against the final world state.
pub type OracleFn = Box<dyn FnOnce(&World) -> Result<(), String>>;
