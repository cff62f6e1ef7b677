//! Channel configuration shared by sessions.

use std::{fmt, sync::Arc, time::Duration};

use troupe_proto::FrameCodec;

use crate::error::ConfigError;

/// Default idle time before a Ping is sent.
pub const DEFAULT_KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(5);

/// Default time a Ping may stay unanswered.
pub const DEFAULT_KEEP_ALIVE_TIMEOUT: Duration = Duration::from_secs(15);

/// What disarms an outstanding keep-alive timeout.
///
/// The timeout is armed when a Ping is sent. Without a disarm rule it runs to
/// completion and closes the session no matter what arrives in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeepAliveTimeoutPolicy {
    /// Any inbound chunk after the handshake proves liveness
    #[default]
    DisarmOnInboundData,

    /// Only a Pong frame proves liveness
    DisarmOnPong,

    /// Nothing disarms the timeout; once armed it closes the session when it
    /// fires, even if the Pong arrived in time. A later Ping does not push
    /// the pending deadline out.
    Independent,
}

/// Immutable configuration bundle for channel sessions.
///
/// Cloning is cheap; every session built from the same configuration shares
/// the codec.
#[derive(Clone)]
pub struct ChannelConfiguration {
    codec: Arc<dyn FrameCodec>,
    keep_alive_interval: Duration,
    keep_alive_timeout: Duration,
    timeout_policy: KeepAliveTimeoutPolicy,
}

impl ChannelConfiguration {
    /// Create a configuration.
    ///
    /// # Errors
    /// Returns `ZeroInterval` / `ZeroTimeout` if either duration is zero.
    pub fn new(
        codec: Arc<dyn FrameCodec>,
        keep_alive_interval: Duration,
        keep_alive_timeout: Duration,
    ) -> Result<Self, ConfigError> {
        if keep_alive_interval.is_zero() {
            return Err(ConfigError::ZeroInterval);
        }
        if keep_alive_timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout);
        }

        Ok(Self {
            codec,
            keep_alive_interval,
            keep_alive_timeout,
            timeout_policy: KeepAliveTimeoutPolicy::default(),
        })
    }

    /// Configuration with the default keep-alive timings.
    pub fn with_defaults(codec: Arc<dyn FrameCodec>) -> Self {
        Self {
            codec,
            keep_alive_interval: DEFAULT_KEEP_ALIVE_INTERVAL,
            keep_alive_timeout: DEFAULT_KEEP_ALIVE_TIMEOUT,
            timeout_policy: KeepAliveTimeoutPolicy::default(),
        }
    }

    /// Replace the timeout disarm policy.
    #[must_use]
    pub fn with_timeout_policy(mut self, policy: KeepAliveTimeoutPolicy) -> Self {
        self.timeout_policy = policy;
        self
    }

    /// Frame codec.
    pub fn codec(&self) -> &dyn FrameCodec {
        self.codec.as_ref()
    }

    /// Idle time before a Ping is sent.
    pub fn keep_alive_interval(&self) -> Duration {
        self.keep_alive_interval
    }

    /// Time a Ping may stay unanswered before the session is closed.
    pub fn keep_alive_timeout(&self) -> Duration {
        self.keep_alive_timeout
    }

    /// Timeout disarm policy.
    pub fn timeout_policy(&self) -> KeepAliveTimeoutPolicy {
        self.timeout_policy
    }
}

impl fmt::Debug for ChannelConfiguration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChannelConfiguration")
            .field("keep_alive_interval", &self.keep_alive_interval)
            .field("keep_alive_timeout", &self.keep_alive_timeout)
            .field("timeout_policy", &self.timeout_policy)
            .finish_non_exhaustive()
    }
}
