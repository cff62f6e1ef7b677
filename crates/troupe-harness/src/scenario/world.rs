//! World state for scenario execution.
//!
//! The World owns every peer link (peer script, session, transport and
//! recorder), counts frames in both directions and decodes what each session
//! sent back.

use std::{collections::BTreeMap, sync::Arc};

use bytes::Bytes;
use troupe_core::ChannelSession;
use troupe_proto::ActorDescription;

use crate::{Inbound, MemoryTransport, Peer, RecordingObserver};

/// One peer and the hub session serving it.
#[derive(Debug)]
pub struct PeerLink {
    peer: Peer,
    session: Arc<ChannelSession>,
    transport: Arc<MemoryTransport>,
    recorder: Arc<RecordingObserver>,
    inbox: Vec<Inbound>,
    frames_sent: usize,
}

impl PeerLink {
    pub(crate) fn new(
        peer: Peer,
        session: Arc<ChannelSession>,
        transport: Arc<MemoryTransport>,
        recorder: Arc<RecordingObserver>,
    ) -> Self {
        Self { peer, session, transport, recorder, inbox: Vec::new(), frames_sent: 0 }
    }

    /// Scripted peer.
    pub fn peer(&self) -> &Peer {
        &self.peer
    }

    /// Hub session serving this peer.
    pub fn session(&self) -> &Arc<ChannelSession> {
        &self.session
    }

    /// Transport between the two.
    pub fn transport(&self) -> &MemoryTransport {
        &self.transport
    }

    /// Notifications raised by the session.
    pub fn recorder(&self) -> &RecordingObserver {
        &self.recorder
    }

    /// Frames the session sent to the peer, decoded, in order.
    pub fn inbox(&self) -> &[Inbound] {
        &self.inbox
    }

    /// Chunks the peer delivered to the session.
    pub fn frames_sent(&self) -> usize {
        self.frames_sent
    }

    /// Frames the peer received from the session.
    pub fn frames_received(&self) -> usize {
        self.inbox.len()
    }

    /// Feed `chunk` to the session and collect its replies.
    pub(crate) fn deliver(&mut self, chunk: &Bytes) -> Result<(), String> {
        self.frames_sent += 1;
        self.session.on_data_received(chunk);
        self.collect()
    }

    /// Decode everything the session has sent since the last collection.
    pub(crate) fn collect(&mut self) -> Result<(), String> {
        for frame in self.transport.drain() {
            let inbound = self
                .peer
                .decode(&frame)
                .map_err(|e| format!("undecodable frame from session: {e}"))?;
            self.inbox.push(inbound);
        }
        Ok(())
    }
}

/// World state containing the hub identity and every peer link.
#[derive(Debug)]
pub struct World {
    hub: ActorDescription,
    links: BTreeMap<String, PeerLink>,
}

impl World {
    /// Create an empty world for `hub`.
    pub fn new(hub: ActorDescription) -> Self {
        Self { hub, links: BTreeMap::new() }
    }

    /// Identity the hub presents in Welcome.
    pub fn hub(&self) -> &ActorDescription {
        &self.hub
    }

    /// Add a peer link under `name`.
    pub fn add_link(&mut self, name: impl Into<String>, link: PeerLink) {
        self.links.insert(name.into(), link);
    }

    /// Peer link by name.
    pub fn link(&self, name: &str) -> Option<&PeerLink> {
        self.links.get(name)
    }

    pub(crate) fn link_mut(&mut self, name: &str) -> Option<&mut PeerLink> {
        self.links.get_mut(name)
    }

    /// Hub session serving `name`.
    pub fn session(&self, name: &str) -> Option<&Arc<ChannelSession>> {
        self.link(name).map(PeerLink::session)
    }

    /// Chunks `name` delivered; 0 for unknown peers.
    pub fn frames_sent(&self, name: &str) -> usize {
        self.link(name).map_or(0, PeerLink::frames_sent)
    }

    /// Frames `name` received; 0 for unknown peers.
    pub fn frames_received(&self, name: &str) -> usize {
        self.link(name).map_or(0, PeerLink::frames_received)
    }

    /// Every link, ordered by peer name.
    pub fn links(&self) -> impl Iterator<Item = (&str, &PeerLink)> {
        self.links.iter().map(|(name, link)| (name.as_str(), link))
    }

    /// Peer names in order.
    pub fn peer_names(&self) -> Vec<String> {
        self.links.keys().cloned().collect()
    }
}
