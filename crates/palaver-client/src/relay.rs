//! Async WebSocket client for the Palaver relay.
//!
//! One socket carries chat traffic and call signaling. Inbound frames are
//! decoded and fanned out on a broadcast channel; outbound frames queue on a
//! bounded mpsc drained by the connection task. There is no reconnect: when
//! the socket goes away subscribers see [`InboundEvent::Disconnected`] and the
//! client stays down.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use futures_util::{SinkExt, StreamExt};
use palaver_call::{CallError, CallResult, SignalData, SignalSink};
use palaver_common::config::RelayConfig;
use palaver_common::models::UserId;
use palaver_common::relay::{CallEnvelope, InboundEvent, OutboundEvent, RelayFrame};
use tokio::sync::{Notify, broadcast, mpsc};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tracing::{debug, info, warn};

use crate::error::{ClientError, Result};

/// Relay client. Cheap to clone; all clones share one connection.
///
/// ```rust,no_run
/// use palaver_client::relay::RelayClient;
///
/// #[tokio::main]
/// async fn main() -> palaver_client::Result<()> {
///     let cfg = palaver_common::config::init().map_err(palaver_common::error::PalaverError::from)?;
///     let relay = RelayClient::new(&cfg.relay, cfg.api.session_cookie.clone(), cfg.identity.user_id);
///     let mut events = relay.subscribe();
///     relay.connect().await?;
///     while let Ok(event) = events.recv().await {
///         println!("{event:?}");
///     }
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct RelayClient {
    url: String,
    session_cookie: Option<String>,
    events: broadcast::Sender<InboundEvent>,
    outbound: RelayOutbound,
    /// Taken by the connection task on `connect`.
    outbound_rx: Arc<Mutex<Option<mpsc::Receiver<RelayFrame>>>>,
    connected: Arc<AtomicBool>,
    close: Arc<Notify>,
}

/// Send half of the relay. Holding one does not keep inbound subscribers
/// alive.
#[derive(Clone, Debug)]
pub struct RelayOutbound {
    local_user: UserId,
    tx: mpsc::Sender<RelayFrame>,
}

impl RelayOutbound {
    /// Queue an outbound frame.
    pub fn send(&self, event: OutboundEvent) -> Result<()> {
        let name = event.name();
        let frame = event.into_frame()?;
        self.tx.try_send(frame).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => {
                warn!(event = name, "Relay outbound queue full, dropping frame");
                ClientError::QueueFull
            }
            mpsc::error::TrySendError::Closed(_) => ClientError::NotConnected,
        })?;
        debug!(event = name, "Queued relay frame");
        Ok(())
    }
}

impl SignalSink for RelayOutbound {
    fn send_signal(&self, to: UserId, signal: &SignalData) -> CallResult<()> {
        let envelope = CallEnvelope {
            user_to_call: to,
            signal_data: serde_json::to_value(signal)?,
            from: self.local_user,
        };
        self.send(OutboundEvent::CallUser(envelope))
            .map_err(|e| CallError::Relay(e.to_string()))
    }
}

impl RelayClient {
    pub fn new(cfg: &RelayConfig, session_cookie: Option<String>, local_user: UserId) -> Self {
        let (events, _) = broadcast::channel(256);
        let (tx, outbound_rx) = mpsc::channel(cfg.outbound_buffer.max(1));
        Self {
            url: cfg.url.clone(),
            session_cookie,
            events,
            outbound: RelayOutbound { local_user, tx },
            outbound_rx: Arc::new(Mutex::new(Some(outbound_rx))),
            connected: Arc::new(AtomicBool::new(false)),
            close: Arc::new(Notify::new()),
        }
    }

    pub fn local_user(&self) -> UserId {
        self.outbound.local_user
    }

    /// Subscribe to decoded inbound events. Subscribe before [`connect`](Self::connect)
    /// to see the `Connected` event.
    pub fn subscribe(&self) -> broadcast::Receiver<InboundEvent> {
        self.events.subscribe()
    }

    /// Handle for queueing frames only.
    pub fn outbound(&self) -> RelayOutbound {
        self.outbound.clone()
    }

    /// Open the socket and spawn the connection task. Returns once connected.
    ///
    /// A client connects at most once. A failed dial leaves it ready to retry.
    pub async fn connect(&self) -> Result<()> {
        let outbound_rx = self
            .outbound_rx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .ok_or(ClientError::AlreadyConnected)?;

        let ws = match self.dial().await {
            Ok(ws) => ws,
            Err(e) => {
                warn!(url = %self.url, "Relay connect failed: {e}");
                *self.outbound_rx.lock().unwrap_or_else(PoisonError::into_inner) =
                    Some(outbound_rx);
                return Err(e);
            }
        };
        info!(url = %self.url, user = self.local_user(), "Relay connected");
        self.connected.store(true, Ordering::Release);
        let _ = self.events.send(InboundEvent::Connected);

        let events = self.events.clone();
        let connected = Arc::clone(&self.connected);
        let close = Arc::clone(&self.close);
        tokio::spawn(async move {
            run_connection(ws, outbound_rx, events.clone(), close).await;
            info!("Relay disconnected");
            connected.store(false, Ordering::Release);
            let _ = events.send(InboundEvent::Disconnected);
        });
        Ok(())
    }

    async fn dial(&self) -> Result<Socket> {
        let mut request = self.url.as_str().into_client_request()?;
        if let Some(cookie) = &self.session_cookie {
            let value = HeaderValue::from_str(&format!("session={cookie}"))
                .map_err(|e| ClientError::Common(anyhow::anyhow!(e).into()))?;
            request.headers_mut().insert("cookie", value);
        }
        let (ws, _) = connect_async(request).await?;
        Ok(ws)
    }

    /// Queue an outbound frame.
    pub fn send(&self, event: OutboundEvent) -> Result<()> {
        self.outbound.send(event)
    }

    /// Whether the connection task is still running.
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    /// Close the socket. Subscribers see `Disconnected`. No-op when not
    /// connected.
    pub fn close(&self) {
        if self.is_connected() {
            self.close.notify_one();
        } else {
            debug!("Relay close with no connection, ignoring");
        }
    }
}

impl SignalSink for RelayClient {
    fn send_signal(&self, to: UserId, signal: &SignalData) -> CallResult<()> {
        self.outbound.send_signal(to, signal)
    }
}

type Socket =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

async fn run_connection(
    ws: Socket,
    mut outbound: mpsc::Receiver<RelayFrame>,
    events: broadcast::Sender<InboundEvent>,
    close: Arc<Notify>,
) {
    let (mut sink, mut stream) = ws.split();

    loop {
        tokio::select! {
            msg = stream.next() => match msg {
                Some(Ok(Message::Text(text))) => dispatch(text.as_str(), &events),
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => continue,
                Some(Err(e)) => {
                    warn!("Relay read failed: {e}");
                    break;
                }
            },
            frame = outbound.recv() => {
                let Some(frame) = frame else { break };
                let text = match serde_json::to_string(&frame) {
                    Ok(text) => text,
                    Err(e) => {
                        warn!(event = %frame.event, "Failed to encode relay frame: {e}");
                        continue;
                    }
                };
                if let Err(e) = sink.send(Message::Text(text.into())).await {
                    warn!(event = %frame.event, "Relay write failed: {e}");
                    break;
                }
            }
            _ = close.notified() => {
                debug!("Closing relay connection");
                let _ = sink.close().await;
                break;
            }
        }
    }
}

/// Decode one text frame and fan it out. Bad frames are logged and skipped.
fn dispatch(text: &str, events: &broadcast::Sender<InboundEvent>) {
    let decoded = serde_json::from_str::<RelayFrame>(text).and_then(InboundEvent::from_frame);
    match decoded {
        Ok(InboundEvent::Unknown(name)) => debug!(event = %name, "Ignoring unknown relay event"),
        Ok(event) => {
            let _ = events.send(event);
        }
        Err(e) => warn!("Malformed relay frame: {e}"),
    }
}
