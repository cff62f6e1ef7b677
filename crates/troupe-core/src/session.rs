//! Channel session state machine.
//!
//! A session sits on top of one transport connection and turns it into an
//! identified, liveness-monitored channel between two actors.
//!
//! # State Machine
//!
//! ```text
//! ┌──────────────┐  Hello   ┌────────────┐
//! │ Unhandshaked │─────────>│ Handshaked │──┐ data / Ping
//! └──────────────┘          └────────────┘<─┘
//!        │ bad first frame         │ keep-alive timeout / close
//!        ↓                         ↓
//!   ┌────────┐                ┌────────┐
//!   │ Closed │                │ Closed │
//!   └────────┘                └────────┘
//! ```
//!
//! The first inbound chunk must be a Hello carrying the peer's
//! [`ActorDescription`]. The session answers with a Welcome carrying its own
//! identity, starts the keep-alive timer, and from then on answers Pings and
//! forwards everything else upward untouched. Any failure during the
//! handshake is final.
//!
//! # Concurrency
//!
//! Four sources drive a session: the transport's reader, the periodic
//! keep-alive tick, the keep-alive timeout and explicit `close` calls. The
//! reader is single-writer (the transport delivers chunks in order, one at a
//! time). The tick serialises itself with a non-blocking guard; overlapping
//! ticks are dropped. `close` flips the state under the state lock, so only
//! the first caller releases the timers.

use std::sync::{Arc, Mutex, OnceLock, TryLockError, Weak};

use bytes::Bytes;
use tokio::{runtime::Handle, time::Instant};
use tracing::{debug, error, info, trace};
use troupe_proto::{ActorDescription, Frame, Opcode};

use crate::{
    config::{ChannelConfiguration, KeepAliveTimeoutPolicy},
    error::{HandshakeError, SessionError},
    keep_alive::KeepAliveTracker,
    observer::{ObserverRegistry, SessionObserver},
    sync::lock,
    timeout::KeepAliveTimeout,
    transport::TransportSession,
};

/// Externally visible session phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Waiting for the peer's Hello
    Unhandshaked,
    /// Handshake completed; remote identity known
    Handshaked,
    /// Closed (handshake failure, timeout or explicit close)
    Closed,
}

enum SessionState {
    Unhandshaked,
    Handshaked(Arc<ActorDescription>),
    Closed,
}

impl SessionState {
    fn phase(&self) -> SessionPhase {
        match self {
            Self::Unhandshaked => SessionPhase::Unhandshaked,
            Self::Handshaked(_) => SessionPhase::Handshaked,
            Self::Closed => SessionPhase::Closed,
        }
    }
}

/// Outcome of one keep-alive tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeepAliveTick {
    /// Another tick was still in flight; this one did nothing
    Dropped,
    /// Session not active; nothing to do
    Inactive,
    /// Data arrived within the last interval
    NotDue,
    /// Ping sent and timeout armed
    PingSent,
    /// Sending the Ping failed; the session has been closed
    Failed,
}

/// Handshake and heartbeat state machine for one transport connection.
///
/// Always handled through an `Arc`; timer tasks keep a `Weak` back-reference
/// and stop once the last strong reference is gone.
pub struct ChannelSession {
    local: Arc<ActorDescription>,
    config: ChannelConfiguration,
    transport: Arc<dyn TransportSession>,
    state: Mutex<SessionState>,
    keep_alive_guard: Mutex<()>,
    tracker: KeepAliveTracker,
    timeout: KeepAliveTimeout,
    runtime: OnceLock<Handle>,
    observers: ObserverRegistry,
    this: Weak<ChannelSession>,
}

impl ChannelSession {
    /// Create an unhandshaked session over `transport`.
    ///
    /// If called inside a tokio runtime, that runtime drives the keep-alive
    /// timers; otherwise the runtime current at handshake time is used.
    pub fn new(
        local: ActorDescription,
        config: ChannelConfiguration,
        transport: Arc<dyn TransportSession>,
    ) -> Arc<Self> {
        Arc::new_cyclic(|this: &Weak<Self>| {
            let tick_target = this.clone();
            let tracker =
                KeepAliveTracker::new(config.keep_alive_interval(), Instant::now(), move || {
                    if let Some(session) = tick_target.upgrade() {
                        session.on_keep_alive();
                    }
                });

            let runtime = OnceLock::new();
            if let Ok(handle) = Handle::try_current() {
                let _ = runtime.set(handle);
            }

            Self {
                local: Arc::new(local),
                timeout: KeepAliveTimeout::new(config.keep_alive_timeout()),
                config,
                transport,
                state: Mutex::new(SessionState::Unhandshaked),
                keep_alive_guard: Mutex::new(()),
                tracker,
                runtime,
                observers: ObserverRegistry::default(),
                this: this.clone(),
            }
        })
    }

    /// Register an observer. Observers are notified in registration order.
    pub fn subscribe(&self, observer: Arc<dyn SessionObserver>) {
        self.observers.subscribe(observer);
    }

    /// Transport's stable key.
    pub fn session_key(&self) -> &str {
        self.transport.session_key()
    }

    /// Identity this side presents in Welcome.
    pub fn local_actor(&self) -> &ActorDescription {
        &self.local
    }

    /// Peer identity learned from Hello; `None` unless handshaked.
    pub fn remote_actor(&self) -> Option<Arc<ActorDescription>> {
        match &*lock(&self.state) {
            SessionState::Handshaked(remote) => Some(Arc::clone(remote)),
            SessionState::Unhandshaked | SessionState::Closed => None,
        }
    }

    /// Current phase.
    pub fn phase(&self) -> SessionPhase {
        lock(&self.state).phase()
    }

    /// Whether the handshake has completed and the session is not closed.
    pub fn is_handshaked(&self) -> bool {
        self.phase() == SessionPhase::Handshaked
    }

    /// Whether the session has been closed.
    pub fn is_closed(&self) -> bool {
        self.phase() == SessionPhase::Closed
    }

    /// Handshaked and the transport is still live.
    pub fn is_active(&self) -> bool {
        self.transport.is_active() && self.is_handshaked()
    }

    /// Configuration this session was built with.
    pub fn config(&self) -> &ChannelConfiguration {
        &self.config
    }

    /// Idle time before a Ping is sent.
    pub fn keep_alive_interval(&self) -> std::time::Duration {
        self.config.keep_alive_interval()
    }

    /// Time a Ping may stay unanswered.
    pub fn keep_alive_timeout(&self) -> std::time::Duration {
        self.config.keep_alive_timeout()
    }

    /// Whether a Ping is outstanding with its timeout armed.
    pub fn is_keep_alive_timeout_armed(&self) -> bool {
        self.timeout.is_armed()
    }

    /// Whether the periodic keep-alive tick is running.
    pub fn is_keep_alive_running(&self) -> bool {
        self.tracker.is_running()
    }

    /// Feed one inbound chunk from the transport.
    ///
    /// Before the handshake the chunk must be a Hello; anything else closes
    /// the session. After the handshake, Pings are answered and every other
    /// chunk, decodable or not, is forwarded to observers unchanged. Chunks
    /// arriving after close are dropped.
    pub fn on_data_received(&self, data: &[u8]) {
        let remote = match &*lock(&self.state) {
            SessionState::Unhandshaked => None,
            SessionState::Handshaked(remote) => Some(Arc::clone(remote)),
            SessionState::Closed => {
                trace!(session = %self.session_key(), len = data.len(), "data after close dropped");
                return;
            },
        };

        match remote {
            None => self.handshake(data),
            Some(remote) => self.on_channel_data(&remote, data),
        }
    }

    /// Send an application frame through the session.
    ///
    /// # Errors
    /// `NotActive` before the handshake, after close, or once the transport
    /// is gone; `Transport` if the transport refuses the frame.
    pub fn send(&self, frame: Bytes) -> Result<(), SessionError> {
        if !self.is_active() {
            return Err(SessionError::NotActive);
        }
        self.transport.begin_send(frame)?;
        Ok(())
    }

    /// Close the session.
    ///
    /// Stops the keep-alive tick, cancels the timeout, forgets the remote
    /// identity and closes the transport. Safe to call repeatedly and from
    /// any task; only the first call does the work, and every call returns
    /// with the session already observably closed.
    pub fn close(&self) {
        let previous = std::mem::replace(&mut *lock(&self.state), SessionState::Closed);
        let remote = match previous {
            SessionState::Closed => return,
            SessionState::Handshaked(remote) => Some(remote),
            SessionState::Unhandshaked => None,
        };

        self.tracker.dispose();
        self.timeout.dispose();
        self.transport.close();

        match remote {
            Some(remote) => {
                info!(session = %self.session_key(), %remote, "channel session closed");
            },
            None => info!(session = %self.session_key(), "channel session closed before handshake"),
        }

        for observer in self.observers.snapshot() {
            observer.on_closed(self);
        }
    }

    /// Run one keep-alive check.
    ///
    /// Normally driven by the periodic timer. Overlapping calls are dropped
    /// rather than queued: only one check per session runs at a time.
    pub fn on_keep_alive(&self) -> KeepAliveTick {
        let _guard = match self.keep_alive_guard.try_lock() {
            Ok(guard) => guard,
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
            Err(TryLockError::WouldBlock) => {
                trace!(session = %self.session_key(), "keep-alive tick dropped, one in flight");
                return KeepAliveTick::Dropped;
            },
        };

        // The runtime handle is set before the session can become active.
        let Some(runtime) = self.runtime.get().filter(|_| self.is_active()) else {
            return KeepAliveTick::Inactive;
        };

        match self.send_keep_alive_if_idle(runtime) {
            Ok(true) => KeepAliveTick::PingSent,
            Ok(false) => KeepAliveTick::NotDue,
            Err(error) => {
                error!(session = %self.session_key(), %error, "keep-alive failed");
                self.close();
                KeepAliveTick::Failed
            },
        }
    }

    fn send_keep_alive_if_idle(&self, runtime: &Handle) -> Result<bool, SessionError> {
        if !self.tracker.should_send_keep_alive(Instant::now()) {
            return Ok(false);
        }

        let ping = self.config.codec().encode_frame(&Frame::Ping)?;
        debug!(
            session = %self.session_key(),
            local = %self.local,
            "keep-alive request"
        );

        // Armed before the send: the reply may be handled before begin_send
        // returns, and its disarm must find the deadline in place.
        let armed = self.arm_keep_alive_timeout(runtime);
        if let Err(error) = self.transport.begin_send(ping) {
            if armed {
                self.timeout.disarm();
            }
            return Err(error.into());
        }
        self.tracker.reset_timer();

        Ok(true)
    }

    fn arm_keep_alive_timeout(&self, runtime: &Handle) -> bool {
        let target = self.this.clone();
        self.timeout.arm(runtime, move || {
            if let Some(session) = target.upgrade() {
                session.on_keep_alive_timeout();
            }
        })
    }

    fn on_keep_alive_timeout(&self) {
        if self.is_closed() {
            return;
        }
        error!(
            session = %self.session_key(),
            timeout = ?self.keep_alive_timeout(),
            "keep-alive timeout"
        );
        self.close();
    }

    fn handshake(&self, data: &[u8]) {
        if let Err(error) = self.try_handshake(data) {
            error!(session = %self.session_key(), %error, "handshake failed");
            self.close();
        }
    }

    fn try_handshake(&self, data: &[u8]) -> Result<(), HandshakeError> {
        let remote = Arc::new(self.decode_hello(data)?);

        let codec = self.config.codec();
        let payload = codec.encode_control_payload(&self.local).map_err(HandshakeError::Encode)?;
        let welcome =
            codec.encode_frame(&Frame::Welcome(payload)).map_err(HandshakeError::Encode)?;
        let runtime = self.runtime_handle().ok_or(HandshakeError::NoRuntime)?;

        {
            let mut state = lock(&self.state);
            if !matches!(*state, SessionState::Unhandshaked) {
                return Err(HandshakeError::Closed);
            }
            *state = SessionState::Handshaked(Arc::clone(&remote));
        }

        self.transport.begin_send(welcome).map_err(HandshakeError::Send)?;
        self.tracker.on_data_received(Instant::now());
        self.tracker.start_timer(&runtime);

        // A close that landed during the Welcome send has already raised
        // on_closed; on_handshaked must not follow it.
        if !self.is_handshaked() {
            debug!(session = %self.session_key(), %remote, "closed while completing handshake");
            return Ok(());
        }

        info!(session = %self.session_key(), %remote, "handshake completed");
        for observer in self.observers.snapshot() {
            observer.on_handshaked(self, &remote);
        }

        Ok(())
    }

    fn decode_hello(&self, data: &[u8]) -> Result<ActorDescription, HandshakeError> {
        let codec = self.config.codec();
        let header =
            codec.try_decode_frame_header(data).map_err(HandshakeError::HeaderUndecodable)?;
        if header.opcode() != Some(Opcode::Hello) {
            return Err(HandshakeError::UnexpectedOpcode(header.raw_opcode()));
        }

        let payload = codec.decode_payload(data, &header).map_err(HandshakeError::Payload)?;
        let remote =
            codec.decode_control_payload(payload).map_err(HandshakeError::InvalidIdentity)?;
        remote.validate().map_err(HandshakeError::InvalidIdentity)?;

        Ok(remote)
    }

    fn runtime_handle(&self) -> Option<Handle> {
        if let Some(handle) = self.runtime.get() {
            return Some(handle.clone());
        }
        let handle = Handle::try_current().ok()?;
        Some(self.runtime.get_or_init(|| handle).clone())
    }

    fn on_channel_data(&self, remote: &ActorDescription, data: &[u8]) {
        self.tracker.on_data_received(Instant::now());

        let opcode =
            self.config.codec().try_decode_frame_header(data).ok().and_then(|h| h.opcode());
        self.observe_liveness(opcode);

        if opcode == Some(Opcode::Ping) {
            self.reply_keep_alive(remote);
            return;
        }

        for observer in self.observers.snapshot() {
            observer.on_data_received(self, remote, data);
        }
    }

    fn observe_liveness(&self, opcode: Option<Opcode>) {
        let disarm = match self.config.timeout_policy() {
            KeepAliveTimeoutPolicy::DisarmOnInboundData => true,
            KeepAliveTimeoutPolicy::DisarmOnPong => opcode == Some(Opcode::Pong),
            KeepAliveTimeoutPolicy::Independent => false,
        };
        if disarm && self.timeout.disarm() {
            trace!(session = %self.session_key(), "keep-alive timeout disarmed");
        }
    }

    fn reply_keep_alive(&self, remote: &ActorDescription) {
        let result = self
            .config
            .codec()
            .encode_frame(&Frame::Pong)
            .map_err(SessionError::from)
            .and_then(|pong| {
                debug!(
                    session = %self.session_key(),
                    local = %self.local,
                    %remote,
                    "keep-alive response"
                );
                self.transport.begin_send(pong).map_err(SessionError::from)
            });

        if let Err(error) = result {
            error!(session = %self.session_key(), %error, "keep-alive response failed");
            self.close();
        }
    }
}

impl std::fmt::Debug for ChannelSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelSession")
            .field("session_key", &self.session_key())
            .field("local", &self.local)
            .field("phase", &self.phase())
            .finish_non_exhaustive()
    }
}
