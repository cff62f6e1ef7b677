//! Actor identity exchanged during the handshake.

use std::{fmt, net::SocketAddr};

use serde::{Deserialize, Serialize};

use crate::errors::{CodecError, Result};

/// Identity of an actor endpoint.
///
/// Sent in Hello (by the connecting actor) and Welcome (by the accepting
/// actor). Immutable once built; sessions share it behind an `Arc`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActorDescription {
    /// Role of the actor, e.g. `"gateway"` or `"worker"`
    pub actor_type: String,

    /// Name unique within `actor_type`
    pub name: String,

    /// Address the actor listens on, if it accepts connections
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<SocketAddr>,
}

impl ActorDescription {
    /// Create a description without a listen address.
    pub fn new(actor_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self { actor_type: actor_type.into(), name: name.into(), address: None }
    }

    /// Attach the address this actor listens on.
    #[must_use]
    pub fn with_address(mut self, address: SocketAddr) -> Self {
        self.address = Some(address);
        self
    }

    /// Check that the description identifies someone.
    pub fn validate(&self) -> Result<()> {
        if self.actor_type.is_empty() {
            return Err(CodecError::InvalidIdentity("empty actor type"));
        }
        if self.name.is_empty() {
            return Err(CodecError::InvalidIdentity("empty actor name"));
        }
        Ok(())
    }
}

impl fmt::Display for ActorDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.actor_type, self.name)?;
        if let Some(address) = self.address {
            write!(f, "@{address}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_address_when_present() {
        let actor = ActorDescription::new("gateway", "gw-1");
        assert_eq!(actor.to_string(), "gateway#gw-1");

        let actor = actor.with_address("127.0.0.1:7000".parse().unwrap());
        assert_eq!(actor.to_string(), "gateway#gw-1@127.0.0.1:7000");
    }

    #[test]
    fn empty_fields_are_invalid() {
        assert!(ActorDescription::new("worker", "w-1").validate().is_ok());
        assert_eq!(
            ActorDescription::new("", "w-1").validate(),
            Err(CodecError::InvalidIdentity("empty actor type"))
        );
        assert_eq!(
            ActorDescription::new("worker", "").validate(),
            Err(CodecError::InvalidIdentity("empty actor name"))
        );
    }
}
