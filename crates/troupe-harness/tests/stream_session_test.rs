//! Sessions driven over an in-process byte stream.

use std::{sync::Arc, time::Duration};

use tokio::io::{AsyncWriteExt, DuplexStream, duplex};
use troupe_core::{ChannelConfiguration, SessionObserver, SessionPhase};
use troupe_harness::{
    Inbound, Peer, RecordingObserver, SessionEvent, StreamSession, read_frame, serve,
};
use troupe_proto::{ActorDescription, BinaryFrameCodec};

fn config() -> ChannelConfiguration {
    ChannelConfiguration::new(
        Arc::new(BinaryFrameCodec::new()),
        Duration::from_millis(100),
        Duration::from_millis(250),
    )
    .unwrap()
}

fn start() -> (StreamSession, DuplexStream, Arc<RecordingObserver>) {
    let (server, client) = duplex(4096);
    let recorder = Arc::new(RecordingObserver::new());
    let observers: Vec<Arc<dyn SessionObserver>> = vec![recorder.clone()];
    let hub = ActorDescription::new("hub", "hub");
    let served = serve(server, "duplex-1", hub, config(), observers);
    (served, client, recorder)
}

async fn next(client: &mut DuplexStream, peer: &Peer) -> Option<Inbound> {
    let codec = BinaryFrameCodec::new();
    let frame = read_frame(client, &codec).await.unwrap()?;
    Some(peer.decode(&frame).unwrap())
}

#[tokio::test(start_paused = true)]
async fn handshake_and_heartbeat_over_stream() {
    let (served, mut client, recorder) = start();
    let peer = Peer::new(ActorDescription::new("client", "alice"));

    client.write_all(&peer.hello().unwrap()).await.unwrap();
    assert_eq!(
        next(&mut client, &peer).await,
        Some(Inbound::Welcome(ActorDescription::new("hub", "hub")))
    );

    client.write_all(&peer.ping().unwrap()).await.unwrap();
    assert_eq!(next(&mut client, &peer).await, Some(Inbound::Pong));

    // Two frames in one write are still delivered one at a time
    let mut burst = peer.app(0x40, b"one").unwrap().to_vec();
    burst.extend_from_slice(&peer.app(0x41, b"two").unwrap());
    client.write_all(&burst).await.unwrap();

    // Idle long enough for the hub to ping us; answer it
    assert_eq!(next(&mut client, &peer).await, Some(Inbound::Ping));
    client.write_all(&peer.pong().unwrap()).await.unwrap();

    tokio::time::sleep(Duration::from_millis(50)).await;
    let session = served.session();
    assert_eq!(session.phase(), SessionPhase::Handshaked);
    assert_eq!(recorder.data(), vec![
        peer.app(0x40, b"one").unwrap(),
        peer.app(0x41, b"two").unwrap(),
        peer.pong().unwrap(),
    ]);

    drop(client);
    let session = served.finished().await;
    assert!(session.is_closed());
    assert_eq!(recorder.closes(), 1);
}

#[tokio::test(start_paused = true)]
async fn silent_client_is_disconnected() {
    let (served, mut client, recorder) = start();
    let peer = Peer::new(ActorDescription::new("client", "alice"));

    client.write_all(&peer.hello().unwrap()).await.unwrap();
    assert!(matches!(next(&mut client, &peer).await, Some(Inbound::Welcome(_))));

    // Pings go unanswered until the timeout closes the stream
    let mut pings = 0;
    while let Some(frame) = next(&mut client, &peer).await {
        assert_eq!(frame, Inbound::Ping);
        pings += 1;
    }
    assert!(pings >= 1);

    let session = served.finished().await;
    assert!(session.is_closed());
    assert_eq!(recorder.events().last(), Some(&SessionEvent::Closed));
}

#[tokio::test(start_paused = true)]
async fn bad_opening_closes_stream() {
    let (served, mut client, recorder) = start();
    let peer = Peer::new(ActorDescription::new("client", "alice"));

    client.write_all(b"GET / HTTP/1.1\r\n\r\n").await.unwrap();

    assert_eq!(next(&mut client, &peer).await, None);
    let session = served.finished().await;
    assert!(session.is_closed());
    assert_eq!(recorder.handshakes(), 0);
}
