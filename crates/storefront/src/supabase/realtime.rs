//! Realtime change feed over the Phoenix websocket protocol.
//!
//! One socket per signed-in user joins a channel per watched table, filtered
//! to the user's rows. Each `postgres_changes` event is forwarded as a
//! [`TableChange`]; the payload itself is ignored because the store refetches
//! the affected list. Refreshed access tokens are pushed to the joined
//! channels. The socket task ends when the server closes the connection or
//! every receiver is gone; reconnecting is up to the owner of the receiver.

use std::sync::Arc;
use std::time::Duration;

use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, instrument, warn};
use url::Url;

use maison_core::UserId;

use crate::config::SupabaseConfig;

/// Phoenix closes channels that miss heartbeats for 30 seconds.
pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(25);

const PROTOCOL_VERSION: &str = "1.0.0";

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Errors from the realtime connection.
#[derive(Debug, Error)]
pub enum RealtimeError {
    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
}

/// Tables whose per-user rows are watched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WatchedTable {
    CartItems,
    Wishlist,
}

impl WatchedTable {
    pub const ALL: [Self; 2] = [Self::CartItems, Self::Wishlist];

    /// Database table name.
    #[must_use]
    pub const fn table_name(self) -> &'static str {
        match self {
            Self::CartItems => "cart_items",
            Self::Wishlist => "wishlist",
        }
    }

    /// Channel name used when joining.
    #[must_use]
    pub const fn channel(self) -> &'static str {
        match self {
            Self::CartItems => "cart_items_changes",
            Self::Wishlist => "wishlist_items_changes",
        }
    }

    fn from_table_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.table_name() == name)
    }
}

/// Kind of row change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

/// A row change on a watched table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableChange {
    pub table: WatchedTable,
    pub kind: ChangeKind,
}

/// Handle to a running change feed. Dropping it stops the feed.
#[derive(Debug)]
pub struct Subscription {
    handle: JoinHandle<()>,
    tokens: Option<watch::Sender<SecretString>>,
}

impl Subscription {
    /// Wrap the task that forwards changes.
    #[must_use]
    pub const fn new(handle: JoinHandle<()>) -> Self {
        Self {
            handle,
            tokens: None,
        }
    }

    /// Wrap a task that also picks up refreshed access tokens from `tokens`.
    #[must_use]
    pub const fn with_token_updates(
        handle: JoinHandle<()>,
        tokens: watch::Sender<SecretString>,
    ) -> Self {
        Self {
            handle,
            tokens: Some(tokens),
        }
    }

    /// Hand a refreshed access token to the running feed.
    pub fn refresh_token(&self, access_token: SecretString) {
        if let Some(tokens) = &self.tokens {
            tokens.send_replace(access_token);
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

// =============================================================================
// RealtimeClient
// =============================================================================

/// Opens per-user change feeds.
#[derive(Clone)]
pub struct RealtimeClient {
    inner: Arc<RealtimeClientInner>,
}

struct RealtimeClientInner {
    websocket_url: Url,
}

impl RealtimeClient {
    /// Create a new realtime client.
    #[must_use]
    pub fn new(config: &SupabaseConfig) -> Self {
        let mut websocket_url = config.endpoint("/realtime/v1/websocket");
        let scheme = if websocket_url.scheme() == "https" {
            "wss"
        } else {
            "ws"
        };
        // Switching between special schemes never fails
        let _ = websocket_url.set_scheme(scheme);
        websocket_url
            .query_pairs_mut()
            .append_pair("apikey", config.anon_key.expose_secret())
            .append_pair("vsn", PROTOCOL_VERSION);

        Self {
            inner: Arc::new(RealtimeClientInner { websocket_url }),
        }
    }

    /// Connect, join one channel per [`WatchedTable`] and forward changes
    /// to `changes` until the socket closes.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection or the join messages fail.
    #[instrument(skip(self, access_token, changes), fields(user_id = %user_id))]
    pub async fn subscribe(
        &self,
        user_id: UserId,
        access_token: &SecretString,
        changes: mpsc::Sender<TableChange>,
    ) -> Result<Subscription, RealtimeError> {
        let (socket, _) = connect_async(self.inner.websocket_url.as_str()).await?;
        let (mut sink, stream) = socket.split();

        for (join_ref, table) in (1_u64..).zip(WatchedTable::ALL) {
            let message = join_message(
                table,
                user_id,
                access_token.expose_secret(),
                &join_ref.to_string(),
            );
            sink.send(Message::text(message.to_string())).await?;
        }

        debug!("Realtime channels joined");
        let (tokens, token_updates) = watch::channel(access_token.clone());
        let handle = tokio::spawn(forward_changes(sink, stream, changes, token_updates));
        Ok(Subscription::with_token_updates(handle, tokens))
    }
}

async fn forward_changes(
    mut sink: SplitSink<Socket, Message>,
    mut stream: SplitStream<Socket>,
    changes: mpsc::Sender<TableChange>,
    mut tokens: watch::Receiver<SecretString>,
) {
    let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
    heartbeat.tick().await;
    let mut next_ref: u64 = 100;

    loop {
        tokio::select! {
            updated = tokens.changed() => {
                if updated.is_err() {
                    break;
                }
                let access_token = tokens.borrow_and_update().expose_secret().to_owned();
                if let Err(e) = push_access_token(&mut sink, &access_token, &mut next_ref).await {
                    warn!(error = %e, "Realtime token refresh failed");
                    break;
                }
                debug!("Realtime access token refreshed");
            }
            _ = heartbeat.tick() => {
                next_ref += 1;
                let message = heartbeat_message(&next_ref.to_string()).to_string();
                if let Err(e) = sink.send(Message::text(message)).await {
                    warn!(error = %e, "Realtime heartbeat failed");
                    break;
                }
            }
            frame = stream.next() => match frame {
                Some(Ok(Message::Text(text))) => match classify(text.as_str()) {
                    Incoming::Change(change) => {
                        if changes.send(change).await.is_err() {
                            break;
                        }
                    }
                    Incoming::JoinError(reason) => {
                        warn!(reason = %reason, "Realtime channel join rejected");
                    }
                    Incoming::Other => {}
                },
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!(error = %e, "Realtime socket error");
                    break;
                }
            },
            () = changes.closed() => break,
        }
    }

    debug!("Realtime feed stopped");
}

async fn push_access_token(
    sink: &mut SplitSink<Socket, Message>,
    access_token: &str,
    next_ref: &mut u64,
) -> Result<(), RealtimeError> {
    for (join_ref, table) in (1_u64..).zip(WatchedTable::ALL) {
        *next_ref += 1;
        let message = access_token_message(
            table,
            access_token,
            &next_ref.to_string(),
            &join_ref.to_string(),
        );
        sink.send(Message::text(message.to_string())).await?;
    }
    Ok(())
}

// =============================================================================
// Protocol Messages
// =============================================================================

/// `phx_join` for one table, filtered to the user's rows.
#[must_use]
pub fn join_message(
    table: WatchedTable,
    user_id: UserId,
    access_token: &str,
    join_ref: &str,
) -> serde_json::Value {
    serde_json::json!({
        "topic": format!("realtime:{}", table.channel()),
        "event": "phx_join",
        "payload": {
            "config": {
                "broadcast": { "self": false },
                "presence": { "key": "" },
                "postgres_changes": [{
                    "event": "*",
                    "schema": "public",
                    "table": table.table_name(),
                    "filter": format!("user_id=eq.{user_id}"),
                }],
            },
            "access_token": access_token,
        },
        "ref": join_ref,
        "join_ref": join_ref,
    })
}

/// Replace the token a joined channel authorizes with.
#[must_use]
pub fn access_token_message(
    table: WatchedTable,
    access_token: &str,
    message_ref: &str,
    join_ref: &str,
) -> serde_json::Value {
    serde_json::json!({
        "topic": format!("realtime:{}", table.channel()),
        "event": "access_token",
        "payload": { "access_token": access_token },
        "ref": message_ref,
        "join_ref": join_ref,
    })
}

/// Socket-level keepalive.
#[must_use]
pub fn heartbeat_message(message_ref: &str) -> serde_json::Value {
    serde_json::json!({
        "topic": "phoenix",
        "event": "heartbeat",
        "payload": {},
        "ref": message_ref,
    })
}

#[derive(Debug, Deserialize)]
struct Envelope {
    event: String,
    #[serde(default)]
    payload: Payload,
}

#[derive(Debug, Default, Deserialize)]
struct Payload {
    #[serde(default)]
    data: Option<ChangeData>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    response: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct ChangeData {
    table: String,
    #[serde(rename = "type")]
    kind: ChangeKind,
}

#[derive(Debug, PartialEq, Eq)]
enum Incoming {
    Change(TableChange),
    JoinError(String),
    Other,
}

fn classify(text: &str) -> Incoming {
    let Ok(envelope) = serde_json::from_str::<Envelope>(text) else {
        return Incoming::Other;
    };

    match envelope.event.as_str() {
        "postgres_changes" => envelope
            .payload
            .data
            .and_then(|data| {
                WatchedTable::from_table_name(&data.table).map(|table| TableChange {
                    table,
                    kind: data.kind,
                })
            })
            .map_or(Incoming::Other, Incoming::Change),
        "phx_reply" if envelope.payload.status.as_deref() == Some("error") => Incoming::JoinError(
            envelope
                .payload
                .response
                .map_or_else(String::new, |r| r.to_string()),
        ),
        _ => Incoming::Other,
    }
}
