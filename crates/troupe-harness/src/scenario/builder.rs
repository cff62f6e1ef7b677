//! Scenario builder API.
//!
//! Provides a declarative API for constructing scenario tests that enforce
//! the Oracle Pattern.

use std::sync::Arc;

use bytes::Bytes;
use tracing::debug;
use troupe_core::{ChannelConfiguration, ChannelSession};
use troupe_proto::{ActorDescription, BinaryFrameCodec};

use crate::{
    MemoryTransport, Peer, RecordingObserver,
    scenario::{OracleFn, PeerLink, World},
};

/// Something a peer does after its opening chunk.
#[derive(Debug, Clone)]
pub enum Step {
    /// Send a Ping
    Ping,
    /// Send a Pong
    Pong,
    /// Send an application frame
    App {
        /// Opcode byte
        opcode: u8,
        /// Frame payload
        payload: Bytes,
    },
    /// Send these exact bytes as one chunk
    Raw(Bytes),
    /// Close the hub session from the hub side
    Close,
}

#[derive(Debug)]
struct PeerScript {
    name: String,
    actor: ActorDescription,
    opening: Option<Bytes>,
    steps: Vec<Step>,
}

/// Scenario builder.
///
/// Add peers and their steps, then call `.oracle()` to get a
/// [`RunnableScenario`].
#[derive(Debug)]
pub struct Scenario {
    name: String,
    hub: ActorDescription,
    config: ChannelConfiguration,
    peers: Vec<PeerScript>,
}

impl Scenario {
    /// Create a scenario with a default hub identity and configuration.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            hub: ActorDescription::new("hub", "hub"),
            config: ChannelConfiguration::with_defaults(Arc::new(BinaryFrameCodec::new())),
            peers: Vec::new(),
        }
    }

    /// Identity every hub session presents.
    pub fn hub(mut self, actor: ActorDescription) -> Self {
        self.hub = actor;
        self
    }

    /// Configuration for every hub session.
    pub fn config(mut self, config: ChannelConfiguration) -> Self {
        self.config = config;
        self
    }

    /// Add a peer that introduces itself as `client#<name>`.
    pub fn peer(self, name: impl Into<String>) -> Self {
        let name = name.into();
        let actor = ActorDescription::new("client", name.clone());
        self.peer_with_actor(name, actor)
    }

    /// Add a peer presenting a specific identity.
    pub fn peer_with_actor(mut self, name: impl Into<String>, actor: ActorDescription) -> Self {
        self.peers.push(PeerScript { name: name.into(), actor, opening: None, steps: Vec::new() });
        self
    }

    /// Add a peer whose first chunk is `opening` instead of a Hello.
    pub fn peer_opening_with(mut self, name: impl Into<String>, opening: Bytes) -> Self {
        let name = name.into();
        let actor = ActorDescription::new("client", name.clone());
        self.peers.push(PeerScript { name, actor, opening: Some(opening), steps: Vec::new() });
        self
    }

    /// Append a step for the most recently added peer.
    ///
    /// Ignored if no peer has been added yet.
    pub fn then(mut self, step: Step) -> Self {
        if let Some(script) = self.peers.last_mut() {
            script.steps.push(step);
        }
        self
    }

    /// Set the oracle function and return a runnable scenario.
    ///
    /// The oracle is mandatory - you cannot run a scenario without
    /// verification.
    pub fn oracle(self, oracle: OracleFn) -> RunnableScenario {
        RunnableScenario { scenario: self, oracle }
    }
}

/// A scenario with an oracle function that can be executed.
pub struct RunnableScenario {
    scenario: Scenario,
    oracle: OracleFn,
}

impl RunnableScenario {
    /// Execute the scenario.
    ///
    /// For each peer, in declaration order:
    /// 1. Create a hub session over a fresh memory transport
    /// 2. Deliver the opening chunk (Hello unless overridden)
    /// 3. Play the peer's steps, collecting everything the session sends
    ///
    /// Then run the oracle against the final world.
    ///
    /// # Errors
    /// Peer names must be unique and every frame the session sends must
    /// decode; otherwise, whatever the oracle reports.
    pub fn run(self) -> Result<(), String> {
        let Scenario { name, hub, config, peers } = self.scenario;

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .map_err(|e| format!("Scenario '{name}': runtime: {e}"))?;
        let _enter = runtime.enter();

        let mut world = World::new(hub.clone());

        for script in peers {
            if world.link(&script.name).is_some() {
                return Err(format!("Scenario '{name}': duplicate peer {}", script.name));
            }

            let peer = Peer::new(script.actor);
            let transport = Arc::new(MemoryTransport::new(format!("{}-link", script.name)));
            let session = ChannelSession::new(hub.clone(), config.clone(), transport.clone());
            let recorder = Arc::new(RecordingObserver::new());
            session.subscribe(recorder.clone());
            world.add_link(script.name.clone(), PeerLink::new(peer, session, transport, recorder));

            let link = world
                .link_mut(&script.name)
                .ok_or_else(|| format!("Scenario '{name}': peer {} not found", script.name))?;

            let opening = match script.opening {
                Some(opening) => opening,
                None => link.peer().hello().map_err(|e| {
                    format!("Scenario '{name}': peer {} hello failed: {e}", script.name)
                })?,
            };
            debug!(scenario = %name, peer = %script.name, "opening");
            link.deliver(&opening)
                .map_err(|e| format!("Scenario '{name}': peer {}: {e}", script.name))?;

            for step in script.steps {
                debug!(scenario = %name, peer = %script.name, ?step, "step");
                play(link, step)
                    .map_err(|e| format!("Scenario '{name}': peer {}: {e}", script.name))?;
            }
        }

        (self.oracle)(&world)
    }
}

fn play(link: &mut PeerLink, step: Step) -> Result<(), String> {
    let chunk = match step {
        Step::Ping => link.peer().ping(),
        Step::Pong => link.peer().pong(),
        Step::App { opcode, payload } => link.peer().app(opcode, &payload),
        Step::Raw(bytes) => Ok(bytes),
        Step::Close => {
            link.session().close();
            return link.collect();
        },
    }
    .map_err(|e| format!("encode failed: {e}"))?;

    link.deliver(&chunk)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scenario_requires_oracle() {
        // This should compile - oracle provided
        let _scenario = Scenario::new("test").peer("alice").oracle(Box::new(|_world| Ok(())));

        // This should NOT compile - no oracle
        // let scenario = Scenario::new("test").peer("alice");
        // scenario.run(); // ERROR: no method `run` on type `Scenario`
    }

    #[test]
    fn scenario_creates_links() {
        let scenario = Scenario::new("test").peer("alice").peer("bob").oracle(Box::new(|world| {
            assert!(world.link("alice").is_some());
            assert!(world.link("bob").is_some());
            assert_eq!(world.peer_names(), vec!["alice".to_string(), "bob".to_string()]);
            Ok(())
        }));

        scenario.run().expect("scenario should succeed");
    }

    #[test]
    fn duplicate_peer_is_rejected() {
        let result =
            Scenario::new("dup").peer("alice").peer("alice").oracle(Box::new(|_| Ok(()))).run();

        assert!(result.unwrap_err().contains("duplicate peer alice"));
    }
}
