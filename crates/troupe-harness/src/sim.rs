//! Turmoil network glue.
//!
//! Hosts in a turmoil simulation accept connections with
//! [`accept_session`]; everything after that is ordinary [`serve`].

use std::{io, sync::Arc};

use tracing::debug;
use troupe_core::{ChannelConfiguration, SessionObserver};
use troupe_proto::ActorDescription;
use turmoil::net::TcpListener;

use crate::stream::{StreamSession, serve};

/// Accept one simulated TCP connection and run a session over it.
///
/// The session is keyed by the peer's address.
///
/// # Errors
/// Propagates accept failures.
pub async fn accept_session(
    listener: &TcpListener,
    local: ActorDescription,
    config: ChannelConfiguration,
    observers: impl IntoIterator<Item = Arc<dyn SessionObserver>>,
) -> io::Result<StreamSession> {
    let (stream, peer) = listener.accept().await?;
    debug!(%peer, "accepted simulated connection");
    Ok(serve(stream, peer.to_string(), local, config, observers))
}
