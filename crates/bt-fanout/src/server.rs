//! Observer endpoints.
//!
//! Two wire protocols share one session loop:
//!
//! * **WebSocket**: one JSON LocationEvent per text frame.  This is what a
//!   browser map connects to.
//! * **Lines**: plain TCP, one JSON LocationEvent per line (NDJSON).
//!
//! Each accepted connection gets its own task and its own hub receiver.  The
//! task pushes events and, at the same time, watches the inbound side so a
//! client that hangs up is noticed even while no events are flowing.
//! Anything the client sends is ignored.

use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use log::{info, warn};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream, ToSocketAddrs};
use tokio::sync::{broadcast, watch};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;

use bt_core::LocationEvent;

use crate::{FanoutError, FanoutHub, FanoutResult};

/// A write that cannot complete in this long ends the session.
const WRITE_TIMEOUT: Duration = Duration::from_secs(5);

/// A client that has not finished the upgrade in this long is dropped.
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

/// Why an observer session ended.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SessionEnd {
    ClientClosed,
    DeliveryFailed,
    HubClosed,
    Shutdown,
}

/// Summary of one finished observer session.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SessionReport {
    pub end:       SessionEnd,
    pub delivered: u64,
    /// Events skipped because the observer fell too far behind.
    pub skipped:   u64,
}

/// Wire format spoken on an observer listener.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ObserverProtocol {
    /// One JSON event per WebSocket text frame.
    WebSocket,
    /// One JSON event per `\n`-terminated line.
    Lines,
}

// ── Session halves ────────────────────────────────────────────────────────────

/// Outbound half of an observer connection.
pub(crate) trait EventSink: Send {
    /// Push one serialized event.
    fn deliver(&mut self, json: Vec<u8>) -> impl Future<Output = io::Result<()>> + Send;

    fn close(&mut self) -> impl Future<Output = ()> + Send;
}

/// Inbound half of an observer connection.
pub(crate) trait Hangup: Send {
    /// Resolves once the client has gone away.  Cancel-safe.
    fn hung_up(&mut self) -> impl Future<Output = ()> + Send;
}

/// NDJSON writer.
pub(crate) struct LineSink<W>(pub W);

impl<W: AsyncWrite + Unpin + Send> EventSink for LineSink<W> {
    async fn deliver(&mut self, mut json: Vec<u8>) -> io::Result<()> {
        json.push(b'\n');
        within_write_timeout(async {
            self.0.write_all(&json).await?;
            self.0.flush().await
        })
        .await
    }

    async fn close(&mut self) {
        let _ = self.0.shutdown().await;
    }
}

/// EOF or a read error on a byte stream.
pub(crate) struct ByteHangup<R>(pub R);

impl<R: AsyncRead + Unpin + Send> Hangup for ByteHangup<R> {
    async fn hung_up(&mut self) {
        let mut scratch = [0u8; 512];
        while let Ok(n) = self.0.read(&mut scratch).await {
            if n == 0 {
                return;
            }
        }
    }
}

/// WebSocket text-frame writer.
pub(crate) struct FrameSink<S>(pub SplitSink<WebSocketStream<S>, Message>);

impl<S: AsyncRead + AsyncWrite + Unpin + Send> EventSink for FrameSink<S> {
    async fn deliver(&mut self, json: Vec<u8>) -> io::Result<()> {
        let text = String::from_utf8(json).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        within_write_timeout(async { self.0.send(Message::Text(text)).await.map_err(io::Error::other) }).await
    }

    async fn close(&mut self) {
        let _ = self.0.close().await;
    }
}

/// A close frame, end of stream, or a protocol error.
pub(crate) struct FrameHangup<S>(pub SplitStream<WebSocketStream<S>>);

impl<S: AsyncRead + AsyncWrite + Unpin + Send> Hangup for FrameHangup<S> {
    async fn hung_up(&mut self) {
        while let Some(Ok(msg)) = self.0.next().await {
            if msg.is_close() {
                return;
            }
        }
    }
}

async fn within_write_timeout(write: impl Future<Output = io::Result<()>>) -> io::Result<()> {
    tokio::time::timeout(WRITE_TIMEOUT, write)
        .await
        .map_err(|_| io::Error::new(io::ErrorKind::TimedOut, "observer write timed out"))?
}

// ── Server ────────────────────────────────────────────────────────────────────

/// Accepts observer connections and streams hub events to them.
pub struct ObserverServer {
    listener: TcpListener,
    protocol: ObserverProtocol,
}

impl ObserverServer {
    /// NDJSON over plain TCP.
    pub async fn bind(addr: impl ToSocketAddrs) -> FanoutResult<Self> {
        Self::bind_as(addr, ObserverProtocol::Lines).await
    }

    /// JSON text frames over WebSocket.
    pub async fn bind_websocket(addr: impl ToSocketAddrs) -> FanoutResult<Self> {
        Self::bind_as(addr, ObserverProtocol::WebSocket).await
    }

    pub async fn bind_as(addr: impl ToSocketAddrs, protocol: ObserverProtocol) -> FanoutResult<Self> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self { listener, protocol })
    }

    pub fn local_addr(&self) -> FanoutResult<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    pub fn protocol(&self) -> ObserverProtocol {
        self.protocol
    }

    /// Accept connections until `shutdown` turns `true`.  Sessions already
    /// running see the same flag and close on their own.
    pub async fn run(self, hub: FanoutHub, mut shutdown: watch::Receiver<bool>) {
        if let Ok(addr) = self.listener.local_addr() {
            info!("observer server ({:?}) listening on {addr}", self.protocol);
        }

        while !*shutdown.borrow() {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        let _ = stream.set_nodelay(true);
                        let events = hub.subscribe();
                        let shutdown = shutdown.clone();
                        info!("observer {peer} connected ({} observers)", hub.observer_count());
                        tokio::spawn(serve(stream, self.protocol, events, shutdown, peer));
                    }
                    Err(e) => warn!("accept failed: {e}"),
                },
            }
        }
    }
}

async fn serve(
    stream:   TcpStream,
    protocol: ObserverProtocol,
    events:   broadcast::Receiver<Arc<LocationEvent>>,
    shutdown: watch::Receiver<bool>,
    peer:     SocketAddr,
) {
    let name = peer.to_string();
    let report = match protocol {
        ObserverProtocol::Lines => {
            let (reader, writer) = stream.into_split();
            session(ByteHangup(reader), LineSink(writer), events, shutdown, &name).await
        }
        ObserverProtocol::WebSocket => {
            let upgraded = tokio::time::timeout(HANDSHAKE_TIMEOUT, tokio_tungstenite::accept_async(stream)).await;
            let ws = match upgraded {
                Ok(Ok(ws)) => ws,
                Ok(Err(e)) => {
                    warn!("{}", FanoutError::Handshake { observer: name, reason: e.to_string() });
                    return;
                }
                Err(_) => {
                    warn!("{}", FanoutError::Handshake { observer: name, reason: "timed out".to_string() });
                    return;
                }
            };
            let (sink, stream) = ws.split();
            session(FrameHangup(stream), FrameSink(sink), events, shutdown, &name).await
        }
    };
    info!(
        "observer {peer} disconnected ({:?}, {} delivered, {} skipped)",
        report.end, report.delivered, report.skipped
    );
}

/// Drive one observer until it hangs up, falls over, or shutdown.
pub(crate) async fn session<H, S>(
    mut inbound:  H,
    mut outbound: S,
    mut events:   broadcast::Receiver<Arc<LocationEvent>>,
    mut shutdown: watch::Receiver<bool>,
    peer:         &str,
) -> SessionReport
where
    H: Hangup,
    S: EventSink,
{
    let (mut delivered, mut skipped) = (0u64, 0u64);

    let end = loop {
        if *shutdown.borrow() {
            break SessionEnd::Shutdown;
        }
        tokio::select! {
            biased;
            changed = shutdown.changed() => {
                if changed.is_err() {
                    break SessionEnd::Shutdown;
                }
            }
            _ = inbound.hung_up() => break SessionEnd::ClientClosed,
            received = events.recv() => match received {
                Ok(event) => {
                    if let Err(e) = outbound.deliver(event.to_json()).await {
                        warn!("{}", FanoutError::Delivery { observer: peer.to_string(), reason: e.to_string() });
                        break SessionEnd::DeliveryFailed;
                    }
                    delivered += 1;
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!("observer {peer} fell behind, skipped {n} events");
                    skipped += n;
                }
                Err(broadcast::error::RecvError::Closed) => break SessionEnd::HubClosed,
            },
        }
    };

    outbound.close().await;
    SessionReport { end, delivered, skipped }
}
