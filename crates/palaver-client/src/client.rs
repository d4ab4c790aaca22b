//! High-level `PalaverClient` combining REST, the relay, chat state, and calls.

use std::sync::Arc;

use palaver_call::{
    CallHandle, CallObserver, CallRuntime, CallSnapshot, DirectMedia, MediaDevices, MediaKind,
};
use palaver_common::config::ClientConfig;
use palaver_common::models::{ChatMessage, ProfileUpdate, UserId};
use palaver_common::relay::{InboundEvent, OutboundEvent};
use tokio::sync::{Mutex, broadcast};
use tracing::{debug, info, warn};

use crate::chat::{ChatEffect, ChatState, RosterView};
use crate::error::Result;
use crate::relay::{RelayClient, RelayOutbound};
use crate::rest::RestClient;

/// What the chat UI needs to repaint.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatUpdate {
    Connected,
    Disconnected,
    Roster(RosterView),
    /// A conversation was opened with its full history.
    Conversation {
        partner: UserId,
        messages: Vec<ChatMessage>,
    },
    /// A message was appended to the open conversation.
    Message(ChatMessage),
    /// The open conversation's partner read our messages.
    ReadBy(UserId),
}

/// The Palaver client.
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use palaver_client::PalaverClient;
/// # async fn run(
/// #     devices: Arc<dyn palaver_call::MediaDevices>,
/// #     media: Arc<dyn palaver_call::DirectMedia>,
/// # ) -> palaver_client::Result<()> {
/// let cfg = palaver_common::config::init().map_err(palaver_common::error::PalaverError::from)?;
/// palaver_client::telemetry::init(&cfg.log);
///
/// let client = PalaverClient::connect(cfg, devices, media, Vec::new()).await?;
/// let mut updates = client.subscribe();
/// client.users().await?;
/// while let Ok(update) = updates.recv().await {
///     println!("{update:?}");
/// }
/// # Ok(())
/// # }
/// ```
pub struct PalaverClient {
    local_user: UserId,
    default_media: MediaKind,
    pub rest: RestClient,
    relay: RelayClient,
    calls: CallHandle,
    chat: Arc<Mutex<ChatState>>,
    updates: broadcast::Sender<ChatUpdate>,
}

impl PalaverClient {
    /// Connect the relay, then start the call runtime and begin dispatching.
    ///
    /// Nothing is left running if the relay cannot be reached.
    pub async fn connect(
        cfg: &ClientConfig,
        devices: Arc<dyn MediaDevices>,
        media: Arc<dyn DirectMedia>,
        observers: Vec<Arc<dyn CallObserver>>,
    ) -> Result<Self> {
        let local_user = cfg.identity.user_id;
        let rest = RestClient::new(&cfg.api)?;
        let relay = RelayClient::new(&cfg.relay, cfg.api.session_cookie.clone(), local_user);
        // Subscribed first so nothing between connect and dispatch is lost.
        let inbound = relay.subscribe();
        relay.connect().await?;

        let (calls, _) =
            CallRuntime::spawn(local_user, Arc::new(relay.outbound()), devices, media, observers);
        let (updates, _) = broadcast::channel(256);

        let client = Self {
            local_user,
            default_media: cfg.calls.default_media,
            rest,
            relay,
            calls,
            chat: Arc::new(Mutex::new(ChatState::new(local_user))),
            updates,
        };

        let dispatcher = Dispatcher {
            rest: client.rest.clone(),
            relay: client.relay.outbound(),
            calls: client.calls.clone(),
            chat: Arc::clone(&client.chat),
            updates: client.updates.clone(),
        };
        tokio::spawn(async move {
            dispatcher.run(inbound).await;
            debug!("Relay dispatch stopped");
        });

        info!(
            user = local_user,
            username = ?cfg.identity.username,
            "Palaver client ready"
        );
        Ok(client)
    }

    pub fn local_user(&self) -> UserId {
        self.local_user
    }

    /// Subscribe to chat repaint updates.
    pub fn subscribe(&self) -> broadcast::Receiver<ChatUpdate> {
        self.updates.subscribe()
    }

    /// Handle to the call runtime, for the media adapters (inbound sessions,
    /// library failures).
    pub fn calls(&self) -> &CallHandle {
        &self.calls
    }

    // ── Chat ──────────────────────────────────────────────────────────────────

    /// Reload the roster from the server.
    pub async fn users(&self) -> Result<RosterView> {
        reload_roster(&self.rest, &self.chat, &self.updates).await
    }

    /// Open the conversation with `user`: load history, mark it read, refresh
    /// unread counts.
    pub async fn open_conversation(&self, user: UserId) -> Result<Vec<ChatMessage>> {
        let history = self.rest.messages(user).await?;
        let mark = self
            .chat
            .lock()
            .await
            .open_conversation(user, history.clone());
        info!(partner = user, messages = history.len(), "Conversation opened");
        let _ = self.updates.send(ChatUpdate::Conversation {
            partner: user,
            messages: history.clone(),
        });

        self.relay.send(OutboundEvent::MarkRead(mark))?;
        if let Err(e) = self.users().await {
            warn!("Failed to refresh roster: {e}");
        }
        Ok(history)
    }

    /// Send `text` to the open conversation. The relay echoes it back as a
    /// `receive_message`, which is when it shows up in the conversation.
    pub async fn send_message(&self, text: &str) -> Result<()> {
        let request = self.chat.lock().await.compose(text)?;
        debug!(to = request.receiver_id, "Sending message");
        self.relay.send(OutboundEvent::SendMessage(request))
    }

    pub async fn update_profile(&self, about: impl Into<String>) -> Result<()> {
        self.rest
            .update_profile(&ProfileUpdate {
                about: about.into(),
            })
            .await
    }

    /// Filter the roster by username.
    pub async fn search(&self, filter: &str) -> RosterView {
        self.chat.lock().await.search(filter)
    }

    /// Copy of the chat state for painting.
    pub async fn chat(&self) -> ChatState {
        self.chat.lock().await.clone()
    }

    // ── Calls ─────────────────────────────────────────────────────────────────

    /// Call `target`; `kind` falls back to the configured default media.
    pub fn start_call(&self, target: UserId, kind: Option<MediaKind>) -> Result<()> {
        Ok(self
            .calls
            .start_call(target, kind.unwrap_or(self.default_media))?)
    }

    pub fn answer_call(&self) -> Result<()> {
        Ok(self.calls.answer()?)
    }

    pub fn end_call(&self) -> Result<()> {
        Ok(self.calls.end_call()?)
    }

    pub async fn call_state(&self) -> Result<CallSnapshot> {
        Ok(self.calls.snapshot().await?)
    }

    /// Hang up without signaling, release media, and close the relay.
    pub fn disconnect(&self) {
        if let Err(e) = self.calls.shutdown() {
            debug!("Call runtime already stopped: {e}");
        }
        self.relay.close();
    }
}

async fn reload_roster(
    rest: &RestClient,
    chat: &Mutex<ChatState>,
    updates: &broadcast::Sender<ChatUpdate>,
) -> Result<RosterView> {
    let roster = rest.users().await?;
    let view = {
        let mut chat = chat.lock().await;
        chat.set_roster(roster);
        chat.roster_view()
    };
    let _ = updates.send(ChatUpdate::Roster(view.clone()));
    Ok(view)
}

/// Routes inbound relay events: call signals to the call runtime, chat
/// frames to chat state.
struct Dispatcher {
    rest: RestClient,
    relay: RelayOutbound,
    calls: CallHandle,
    chat: Arc<Mutex<ChatState>>,
    updates: broadcast::Sender<ChatUpdate>,
}

impl Dispatcher {
    async fn run(self, mut inbound: broadcast::Receiver<InboundEvent>) {
        loop {
            match inbound.recv().await {
                // No reconnect: nothing more will arrive.
                Ok(InboundEvent::Disconnected) => {
                    self.handle(InboundEvent::Disconnected).await;
                    break;
                }
                Ok(event) => self.handle(event).await,
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!(skipped = n, "Relay dispatch lagged, events dropped");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    }

    async fn handle(&self, event: InboundEvent) {
        match event {
            InboundEvent::Connected => {
                let _ = self.updates.send(ChatUpdate::Connected);
            }
            InboundEvent::Disconnected => {
                warn!("Relay connection lost");
                let _ = self.updates.send(ChatUpdate::Disconnected);
            }
            InboundEvent::CallSignal(signal) => {
                let from = signal.from;
                if let Err(e) = self.calls.deliver_signal(signal) {
                    warn!(from, "Dropping call signal: {e}");
                }
            }
            InboundEvent::MessageReceived(msg) => self.on_message(msg).await,
            InboundEvent::MessagesRead(receipt) => {
                if self.chat.lock().await.on_messages_read(receipt) {
                    debug!(reader = receipt.reader_id, "Messages read");
                    let _ = self.updates.send(ChatUpdate::ReadBy(receipt.reader_id));
                }
            }
            InboundEvent::Unknown(name) => debug!(event = %name, "Ignoring relay event"),
        }
    }

    async fn on_message(&self, msg: ChatMessage) {
        let effect = self.chat.lock().await.on_message(msg.clone());
        match effect {
            Some(ChatEffect::ReloadRoster) => {
                debug!(from = msg.sender_id, "Message for another conversation");
                if let Err(e) = reload_roster(&self.rest, &self.chat, &self.updates).await {
                    warn!("Failed to refresh roster: {e}");
                }
                return;
            }
            Some(ChatEffect::MarkRead(mark)) => {
                if let Err(e) = self.relay.send(OutboundEvent::MarkRead(mark)) {
                    warn!(sender = mark.sender_id, "Failed to send read receipt: {e}");
                }
            }
            None => {}
        }
        let _ = self.updates.send(ChatUpdate::Message(msg));
    }
}
