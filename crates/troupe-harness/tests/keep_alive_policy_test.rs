//! Heartbeat and liveness-timeout behaviour on a paused clock.
//!
//! Every test uses a 100ms interval and a 250ms timeout. With a silent peer
//! the first Ping goes out at 100ms, so its deadline is 350ms. Checks are made
//! away from tick boundaries.

use std::{sync::Arc, time::Duration};

use bytes::Bytes;
use tokio::time::{Instant, sleep_until};
use troupe_core::{ChannelConfiguration, ChannelSession, KeepAliveTimeoutPolicy};
use troupe_harness::{Inbound, MemoryTransport, Peer, RecordingObserver};
use troupe_proto::{ActorDescription, BinaryFrameCodec};

struct Link {
    start: Instant,
    peer: Peer,
    transport: Arc<MemoryTransport>,
    recorder: Arc<RecordingObserver>,
    session: Arc<ChannelSession>,
}

impl Link {
    fn handshaked(policy: KeepAliveTimeoutPolicy) -> Self {
        let start = Instant::now();
        let config = ChannelConfiguration::new(
            Arc::new(BinaryFrameCodec::new()),
            Duration::from_millis(100),
            Duration::from_millis(250),
        )
        .unwrap()
        .with_timeout_policy(policy);

        let peer = Peer::new(ActorDescription::new("client", "alice"));
        let transport = Arc::new(MemoryTransport::new("alice-link"));
        let recorder = Arc::new(RecordingObserver::new());
        let session =
            ChannelSession::new(ActorDescription::new("hub", "hub"), config, transport.clone());
        session.subscribe(recorder.clone());

        session.on_data_received(&peer.hello().unwrap());
        assert!(session.is_active());

        Self { start, peer, transport, recorder, session }
    }

    async fn at(&self, ms: u64) {
        sleep_until(self.start + Duration::from_millis(ms)).await;
    }

    fn received(&self) -> Vec<Inbound> {
        self.peer.decode_all(&self.transport.pending()).unwrap()
    }

    fn pings(&self) -> usize {
        self.received().iter().filter(|frame| **frame == Inbound::Ping).count()
    }
}

#[tokio::test(start_paused = true)]
async fn silent_peer_is_dropped_after_timeout() {
    let link = Link::handshaked(KeepAliveTimeoutPolicy::default());

    link.at(50).await;
    assert_eq!(link.pings(), 0);

    link.at(110).await;
    assert_eq!(link.pings(), 1);
    assert!(link.session.is_keep_alive_timeout_armed());

    link.at(340).await;
    assert!(link.session.is_active());

    link.at(360).await;
    assert!(link.session.is_closed());
    assert_eq!(link.transport.close_calls(), 1);
    assert_eq!(link.recorder.closes(), 1);
}

#[tokio::test(start_paused = true)]
async fn chatty_peer_is_never_pinged() {
    let link = Link::handshaked(KeepAliveTimeoutPolicy::default());
    let app = link.peer.app(0x40, b"tick").unwrap();

    for ms in (60..=1000).step_by(60) {
        link.at(ms).await;
        link.session.on_data_received(&app);
    }

    assert_eq!(link.pings(), 0);
    assert!(link.session.is_active());
    assert_eq!(link.recorder.data().len(), 16);
}

#[tokio::test(start_paused = true)]
async fn pong_keeps_session_alive() {
    let link = Link::handshaked(KeepAliveTimeoutPolicy::DisarmOnInboundData);

    link.at(120).await;
    assert_eq!(link.pings(), 1);
    link.session.on_data_received(&link.peer.pong().unwrap());
    assert!(!link.session.is_keep_alive_timeout_armed());

    link.at(400).await;
    assert!(link.session.is_active());
}

#[tokio::test(start_paused = true)]
async fn any_inbound_data_disarms_by_default() {
    let link = Link::handshaked(KeepAliveTimeoutPolicy::DisarmOnInboundData);

    link.at(120).await;
    link.session.on_data_received(b"not even a frame");
    assert!(!link.session.is_keep_alive_timeout_armed());

    link.at(400).await;
    assert!(link.session.is_active());
}

#[tokio::test(start_paused = true)]
async fn only_pong_disarms_under_pong_policy() {
    let link = Link::handshaked(KeepAliveTimeoutPolicy::DisarmOnPong);

    link.at(120).await;
    link.session.on_data_received(&link.peer.app(0x40, b"busy").unwrap());
    assert!(link.session.is_keep_alive_timeout_armed());

    link.at(360).await;
    assert!(link.session.is_closed());
}

#[tokio::test(start_paused = true)]
async fn pong_disarms_under_pong_policy() {
    let link = Link::handshaked(KeepAliveTimeoutPolicy::DisarmOnPong);

    link.at(120).await;
    link.session.on_data_received(&link.peer.pong().unwrap());
    assert!(!link.session.is_keep_alive_timeout_armed());

    link.at(400).await;
    assert!(link.session.is_active());
}

#[tokio::test(start_paused = true)]
async fn independent_timeout_fires_regardless_of_pong() {
    let link = Link::handshaked(KeepAliveTimeoutPolicy::Independent);

    link.at(120).await;
    link.session.on_data_received(&link.peer.pong().unwrap());
    assert!(link.session.is_keep_alive_timeout_armed());

    link.at(360).await;
    assert!(link.session.is_closed());
    assert_eq!(link.transport.close_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn repeated_pings_do_not_extend_deadline() {
    let link = Link::handshaked(KeepAliveTimeoutPolicy::default());

    // Pings at 100, 200 and 300ms; the deadline stays at 350ms
    link.at(310).await;
    assert_eq!(link.pings(), 3);
    assert!(link.session.is_active());

    link.at(360).await;
    assert!(link.session.is_closed());
}

#[tokio::test(start_paused = true)]
async fn peer_ping_is_answered_and_counts_as_activity() {
    let link = Link::handshaked(KeepAliveTimeoutPolicy::default());

    link.at(90).await;
    link.session.on_data_received(&link.peer.ping().unwrap());

    // Tick at 100ms sees 10ms of silence
    link.at(150).await;
    assert_eq!(link.received(), vec![
        Inbound::Welcome(ActorDescription::new("hub", "hub")),
        Inbound::Pong,
    ]);
    assert!(link.recorder.data().is_empty());
}

#[tokio::test(start_paused = true)]
async fn dead_transport_stops_heartbeat() {
    let link = Link::handshaked(KeepAliveTimeoutPolicy::default());
    link.transport.disconnect();

    link.at(500).await;

    assert_eq!(link.pings(), 0);
    assert!(!link.session.is_active());
    assert!(link.session.send(Bytes::from_static(b"x")).is_err());
}

#[tokio::test(start_paused = true)]
async fn close_stops_all_timers() {
    let link = Link::handshaked(KeepAliveTimeoutPolicy::default());

    link.at(120).await;
    assert!(link.session.is_keep_alive_timeout_armed());
    link.session.close();
    assert!(!link.session.is_keep_alive_running());
    assert!(!link.session.is_keep_alive_timeout_armed());

    link.at(1000).await;
    assert_eq!(link.pings(), 1);
    assert_eq!(link.transport.close_calls(), 1);
    assert_eq!(link.recorder.closes(), 1);
}
