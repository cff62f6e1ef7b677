//! Scenario tests for the handshake and post-handshake dispatch.

use bytes::Bytes;
use troupe_core::SessionPhase;
use troupe_harness::{
    Inbound, Peer, SessionEvent,
    scenario::{Scenario, Step, oracle},
};
use troupe_proto::ActorDescription;

#[test]
fn single_peer_handshake() {
    let result = Scenario::new("single peer handshake")
        .hub(ActorDescription::new("hub", "central"))
        .peer("alice")
        .oracle(Box::new(|world| {
            let alice = world.link("alice").ok_or("alice should exist")?;

            if alice.session().phase() != SessionPhase::Handshaked {
                let phase = alice.session().phase();
                return Err(format!("alice should be Handshaked, got {phase:?}"));
            }

            let expected = vec![Inbound::Welcome(ActorDescription::new("hub", "central"))];
            if alice.inbox() != expected.as_slice() {
                return Err(format!("alice should receive one Welcome, got {:?}", alice.inbox()));
            }

            let events = alice.recorder().events();
            let expected = vec![SessionEvent::Handshaked(ActorDescription::new("client", "alice"))];
            if events != expected {
                return Err(format!("expected one handshake notification, got {events:?}"));
            }

            if world.frames_sent("alice") != 1 || world.frames_received("alice") != 1 {
                return Err(format!(
                    "expected 1 frame each way, got {} sent / {} received",
                    world.frames_sent("alice"),
                    world.frames_received("alice")
                ));
            }

            Ok(())
        }))
        .run();

    assert!(result.is_ok(), "scenario failed: {result:?}");
}

#[test]
fn every_peer_gets_its_own_session() {
    let result = Scenario::new("three peers")
        .peer("alice")
        .peer("bob")
        .peer_with_actor("carol", ActorDescription::new("worker", "carol-7"))
        .oracle(oracle::all_of(vec![oracle::all_handshaked(), oracle::identities_exchanged()]))
        .run();

    assert!(result.is_ok(), "scenario failed: {result:?}");
}

#[test]
fn ping_before_hello_is_rejected() {
    let ping = Peer::new(ActorDescription::new("client", "x")).ping().unwrap();
    let result = Scenario::new("ping first")
        .peer_opening_with("eve", ping)
        .oracle(oracle::rejected("eve"))
        .run();

    assert!(result.is_ok(), "scenario failed: {result:?}");
}

#[test]
fn garbage_opening_is_rejected() {
    let result = Scenario::new("garbage first")
        .peer_opening_with("eve", Bytes::from_static(b"\x16\x03\x01\x02\x00\x01\x00\x01\xfc"))
        .oracle(oracle::rejected("eve"))
        .run();

    assert!(result.is_ok(), "scenario failed: {result:?}");
}

#[test]
fn blank_identity_is_rejected() {
    let result = Scenario::new("blank identity")
        .peer_with_actor("eve", ActorDescription::new("", "eve"))
        .oracle(oracle::rejected("eve"))
        .run();

    assert!(result.is_ok(), "scenario failed: {result:?}");
}

#[test]
fn rejected_peer_does_not_affect_others() {
    let result = Scenario::new("mixed")
        .peer("alice")
        .peer_opening_with("eve", Bytes::from_static(b"nope"))
        .then(Step::Raw(Bytes::from_static(b"still nope")))
        .peer("bob")
        .oracle(Box::new(|world| {
            oracle::rejected("eve")(world)?;
            for name in ["alice", "bob"] {
                let session = world.session(name).ok_or("missing session")?;
                if !session.is_active() {
                    return Err(format!("{name} should still be active"));
                }
            }
            // Nothing after a failed handshake reaches observers
            let eve = world.link("eve").ok_or("eve should exist")?;
            if eve.recorder().events() != vec![SessionEvent::Closed] {
                return Err(format!("eve events: {:?}", eve.recorder().events()));
            }
            Ok(())
        }))
        .run();

    assert!(result.is_ok(), "scenario failed: {result:?}");
}

#[test]
fn ping_is_answered_and_application_data_forwarded() {
    let result = Scenario::new("traffic")
        .peer("alice")
        .then(Step::Ping)
        .then(Step::App { opcode: 0x40, payload: Bytes::from_static(b"hello hub") })
        .then(Step::Pong)
        .then(Step::Raw(Bytes::from_static(b"opaque")))
        .then(Step::Ping)
        .oracle(Box::new(|world| {
            let alice = world.link("alice").ok_or("alice should exist")?;

            let replies: Vec<_> = alice.inbox().iter().skip(1).cloned().collect();
            if replies != vec![Inbound::Pong, Inbound::Pong] {
                return Err(format!("expected two Pongs, got {replies:?}"));
            }

            let app = alice.peer().app(0x40, b"hello hub").map_err(|e| e.to_string())?;
            let pong = alice.peer().pong().map_err(|e| e.to_string())?;
            let expected = vec![app, pong, Bytes::from_static(b"opaque")];
            if alice.recorder().data() != expected {
                return Err(format!("forwarded data mismatch: {:?}", alice.recorder().data()));
            }

            Ok(())
        }))
        .run();

    assert!(result.is_ok(), "scenario failed: {result:?}");
}

#[test]
fn close_ends_session_and_drops_later_traffic() {
    let result = Scenario::new("close")
        .peer("alice")
        .then(Step::Close)
        .then(Step::Ping)
        .then(Step::App { opcode: 0x40, payload: Bytes::new() })
        .then(Step::Close)
        .oracle(Box::new(|world| {
            let alice = world.link("alice").ok_or("alice should exist")?;

            if !alice.session().is_closed() || alice.session().remote_actor().is_some() {
                return Err("alice session should be closed with no remote".into());
            }
            if alice.transport().close_calls() != 1 {
                return Err(format!("transport closed {} times", alice.transport().close_calls()));
            }
            if alice.frames_received() != 1 {
                return Err(format!("only the Welcome expected, got {:?}", alice.inbox()));
            }
            if alice.recorder().closes() != 1 || !alice.recorder().data().is_empty() {
                return Err(format!("events: {:?}", alice.recorder().events()));
            }
            Ok(())
        }))
        .run();

    assert!(result.is_ok(), "scenario failed: {result:?}");
}
