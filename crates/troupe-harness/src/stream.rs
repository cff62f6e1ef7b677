//! Sessions over byte streams.
//!
//! ```text
//!            ┌──────────── serve() ─────────────┐
//!  stream ──>│ reader task ──> on_data_received │
//!            │                  ChannelSession  │
//!  stream <──│ writer task <── StreamTransport  │
//!            └──────────────────────────────────┘
//! ```
//!
//! The reader cuts the byte stream into chunks using the codec's header, so
//! the session sees exactly one frame per `on_data_received`. Outbound frames
//! go through an unbounded queue to a writer task; `begin_send` never blocks.
//! Closing the session closes the transport, which stops both tasks after the
//! writer has flushed what was already queued.

use std::{io, sync::Arc};

use bytes::{Bytes, BytesMut};
use tokio::{
    io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt},
    sync::{mpsc, watch},
    task::JoinHandle,
};
use tracing::{debug, warn};
use troupe_core::{
    ChannelConfiguration, ChannelSession, SessionObserver, TransportError, TransportSession,
};
use troupe_proto::{ActorDescription, FrameCodec, FrameHeader};

/// Transport half handed to the session: a queue into the writer task.
#[derive(Debug)]
pub struct StreamTransport {
    key: String,
    outbound: mpsc::UnboundedSender<Bytes>,
    closed: watch::Sender<bool>,
}

impl TransportSession for StreamTransport {
    fn session_key(&self) -> &str {
        &self.key
    }

    fn is_active(&self) -> bool {
        !*self.closed.borrow() && !self.outbound.is_closed()
    }

    fn begin_send(&self, frame: Bytes) -> Result<(), TransportError> {
        if *self.closed.borrow() {
            return Err(TransportError::Closed);
        }
        self.outbound.send(frame).map_err(|_| TransportError::Closed)
    }

    fn close(&self) {
        self.closed.send_replace(true);
    }
}

/// A session being driven over a stream.
#[derive(Debug)]
pub struct StreamSession {
    session: Arc<ChannelSession>,
    reader: JoinHandle<()>,
    writer: JoinHandle<()>,
}

impl StreamSession {
    /// The session.
    pub fn session(&self) -> &Arc<ChannelSession> {
        &self.session
    }

    /// Wait until both stream tasks have stopped.
    ///
    /// Returns once the session has closed (by the peer hanging up, a
    /// handshake failure, a keep-alive timeout or an explicit close) and
    /// queued frames have been flushed.
    pub async fn finished(self) -> Arc<ChannelSession> {
        let _ = self.reader.await;
        let _ = self.writer.await;
        self.session
    }
}

/// Run a session over `stream`.
///
/// `observers` are subscribed before the first byte is read, so they see the
/// handshake. Must be called from within a tokio runtime.
pub fn serve<S>(
    stream: S,
    key: impl Into<String>,
    local: ActorDescription,
    config: ChannelConfiguration,
    observers: impl IntoIterator<Item = Arc<dyn SessionObserver>>,
) -> StreamSession
where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    let (read_half, write_half) = tokio::io::split(stream);
    let (outbound, queue) = mpsc::unbounded_channel();
    let (closed, _) = watch::channel(false);

    let transport = Arc::new(StreamTransport {
        key: key.into(),
        outbound,
        closed: closed.clone(),
    });
    let session = ChannelSession::new(local, config, transport);
    for observer in observers {
        session.subscribe(observer);
    }

    let writer = tokio::spawn(write_frames(write_half, queue, closed.subscribe()));
    let reader = tokio::spawn(read_frames(read_half, Arc::clone(&session), closed.subscribe()));

    StreamSession { session, reader, writer }
}

/// Read one chunk from `reader`.
///
/// A chunk is a full frame (header and payload) when the header decodes, or
/// the raw header-sized prefix when it does not, letting the session decide
/// what to do with bytes it cannot frame. Returns `None` on a clean end of
/// stream.
///
/// # Errors
/// I/O failures, including a stream that ends mid-frame.
pub async fn read_frame<R>(reader: &mut R, codec: &dyn FrameCodec) -> io::Result<Option<Bytes>>
where
    R: AsyncRead + Unpin,
{
    let mut head = [0u8; FrameHeader::SIZE];
    match reader.read_exact(&mut head).await {
        Ok(_) => {},
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e),
    }

    let Ok(header) = codec.try_decode_frame_header(&head) else {
        return Ok(Some(Bytes::copy_from_slice(&head)));
    };

    let mut frame = BytesMut::zeroed(header.frame_len());
    frame[..FrameHeader::SIZE].copy_from_slice(&head);
    reader.read_exact(&mut frame[FrameHeader::SIZE..]).await?;
    Ok(Some(frame.freeze()))
}

/// Resolves once the transport is closed or dropped.
async fn wait_closed(closed: &mut watch::Receiver<bool>) {
    while !*closed.borrow_and_update() {
        if closed.changed().await.is_err() {
            return;
        }
    }
}

async fn read_frames<R>(
    mut reader: R,
    session: Arc<ChannelSession>,
    mut closed: watch::Receiver<bool>,
) where
    R: AsyncRead + Unpin,
{
    loop {
        let chunk = tokio::select! {
            biased;
            () = wait_closed(&mut closed) => break,
            chunk = read_frame(&mut reader, session.config().codec()) => chunk,
        };

        match chunk {
            Ok(Some(chunk)) => session.on_data_received(&chunk),
            Ok(None) => {
                debug!(session = %session.session_key(), "peer closed stream");
                break;
            },
            Err(error) => {
                warn!(session = %session.session_key(), %error, "stream read failed");
                break;
            },
        }
    }

    session.close();
}

async fn write_frames<W>(
    mut writer: W,
    mut queue: mpsc::UnboundedReceiver<Bytes>,
    mut closed: watch::Receiver<bool>,
) where
    W: AsyncWrite + Unpin,
{
    loop {
        let frame = tokio::select! {
            biased;
            frame = queue.recv() => frame,
            () = wait_closed(&mut closed) => None,
        };
        let Some(frame) = frame else { break };

        if let Err(error) = writer.write_all(&frame).await {
            warn!(%error, "stream write failed");
            break;
        }
    }

    let _ = writer.shutdown().await;
}
