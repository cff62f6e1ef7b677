//! Reusable oracles.

use troupe_core::SessionPhase;

use crate::{Inbound, scenario::OracleFn};

/// Every session completed its handshake and is still open.
pub fn all_handshaked() -> OracleFn {
    Box::new(|world| {
        for (name, link) in world.links() {
            let phase = link.session().phase();
            if phase != SessionPhase::Handshaked {
                return Err(format!("{name}: expected Handshaked, got {phase:?}"));
            }
        }
        Ok(())
    })
}

/// Each side learned the other's identity: the session holds the peer's
/// Hello identity and the peer's first inbound frame is a Welcome carrying
/// the hub's.
pub fn identities_exchanged() -> OracleFn {
    Box::new(|world| {
        for (name, link) in world.links() {
            let remote = link.session().remote_actor();
            if remote.as_deref() != Some(link.peer().actor()) {
                return Err(format!("{name}: session remote is {remote:?}"));
            }
            match link.inbox().first() {
                Some(Inbound::Welcome(actor)) if actor == world.hub() => {},
                other => return Err(format!("{name}: expected Welcome from hub, got {other:?}")),
            }
        }
        Ok(())
    })
}

/// The named peer's session is closed, its transport was closed exactly once
/// and no handshake was ever reported.
pub fn rejected(name: &'static str) -> OracleFn {
    Box::new(move |world| {
        let link = world.link(name).ok_or_else(|| format!("{name} not in world"))?;
        if !link.session().is_closed() {
            return Err(format!("{name}: session still {:?}", link.session().phase()));
        }
        if link.transport().close_calls() != 1 {
            return Err(format!(
                "{name}: transport closed {} times",
                link.transport().close_calls()
            ));
        }
        if link.recorder().handshakes() != 0 {
            return Err(format!("{name}: handshake reported"));
        }
        if link.frames_received() != 0 {
            return Err(format!("{name}: session replied {:?}", link.inbox()));
        }
        Ok(())
    })
}

/// Run every oracle, stopping at the first failure.
pub fn all_of(oracles: Vec<OracleFn>) -> OracleFn {
    Box::new(move |world| {
        for oracle in oracles {
            oracle(world)?;
        }
        Ok(())
    })
}
