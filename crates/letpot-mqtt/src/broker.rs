//! Broker session management.
//!
//! At most one broker connection exists per manager. It is bound to the user
//! id its credentials were derived from and replaced when that id changes or
//! the transport reports the connection dead. Connecting and publishing share
//! one async lock, so concurrent callers neither race to open duplicate
//! connections nor interleave the packets of two commands.
//!
//! ```text
//!   Disconnected ──ensure_connected──▶ Connecting ──ok──▶ Connected
//!        ▲                                 │                  │
//!        └────────────── error ────────────┘                  │
//!        └──── close / identity change / connection lost ─────┘
//! ```

use std::sync::Arc;

use letpot_core::{LetPotError, Result};
use letpot_settings::BrokerSettings;
use tokio::sync::{Mutex, watch};
use tracing::{info, warn};
use uuid::Uuid;

use crate::credentials::derive_credentials;
use crate::framing::{MessageIdCounter, frame_packets, framed_len};
use crate::transport::{BrokerConnection, BrokerConnector, ConnectOptions, RumqttConnector};

/// Externally visible broker session state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectionState {
    /// No connection, or the last attempt failed.
    Disconnected,
    /// A connection attempt is in flight.
    Connecting,
    /// A connection is bound to a user id.
    Connected,
}

/// Why `ensure_connected` is opening a new connection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReconnectReason {
    /// No connection has been opened yet (or it was closed).
    NoConnection,
    /// The transport reports the connection as down.
    ConnectionLost,
    /// The caller's user id differs from the bound one.
    IdentityChanged,
}

/// State guarded by the manager's lock.
#[derive(Default)]
struct BrokerSession {
    connection: Option<Box<dyn BrokerConnection>>,
    bound_user_id: Option<String>,
    ids: MessageIdCounter,
}

impl BrokerSession {
    fn reconnect_reason(&self, user_id: &str) -> Option<ReconnectReason> {
        match (&self.connection, &self.bound_user_id) {
            (None, _) => Some(ReconnectReason::NoConnection),
            (Some(conn), _) if !conn.is_connected() => Some(ReconnectReason::ConnectionLost),
            (Some(_), Some(bound)) if bound == user_id => None,
            (Some(_), _) => Some(ReconnectReason::IdentityChanged),
        }
    }

    /// Drop the current connection, disconnecting it first if still up.
    ///
    /// Disconnect failures are logged and otherwise ignored.
    async fn teardown(&mut self) {
        self.bound_user_id = None;
        let Some(old) = self.connection.take() else {
            return;
        };
        if old.is_connected() {
            if let Err(e) = old.disconnect().await {
                warn!(error = %e, "failed to disconnect previous broker connection");
            }
        }
    }
}

/// Owner of the single broker connection.
pub struct BrokerSessionManager {
    connector: Arc<dyn BrokerConnector>,
    settings: BrokerSettings,
    session: Mutex<BrokerSession>,
    state: watch::Sender<ConnectionState>,
}

impl BrokerSessionManager {
    /// Create a manager using `connector` to open connections.
    pub fn new(connector: Arc<dyn BrokerConnector>, settings: BrokerSettings) -> Self {
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            connector,
            settings,
            session: Mutex::new(BrokerSession::default()),
            state,
        }
    }

    /// Create a manager that connects with `rumqttc`.
    pub fn with_rumqtt(settings: BrokerSettings) -> Self {
        Self::new(Arc::new(RumqttConnector), settings)
    }

    /// State after the last transition performed by this manager.
    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Watch state transitions.
    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    /// Make sure a live connection bound to `user_id` exists.
    ///
    /// Reuses the current connection when it is up and bound to the same
    /// user id; otherwise tears it down and opens a new one with freshly
    /// derived credentials and a message id counter reset to 0. Connection
    /// failures are returned, not retried.
    pub async fn ensure_connected(&self, email: &str, user_id: &str) -> Result<()> {
        let mut session = self.session.lock().await;
        self.connect_locked(&mut session, email, user_id).await
    }

    /// Publish a command payload to `<device_id>/cmd`.
    ///
    /// Connects if needed, frames the payload, and publishes every packet in
    /// order with at-least-once delivery. Returns the number of packets sent.
    #[tracing::instrument(skip(self, email, payload), fields(len = payload.len()))]
    pub async fn publish_command(
        &self,
        device_id: &str,
        email: &str,
        user_id: &str,
        payload: &[u8],
    ) -> Result<usize> {
        // an unframeable payload must not open or replace a connection
        let _ = framed_len(payload)?;

        let mut guard = self.session.lock().await;
        self.connect_locked(&mut guard, email, user_id).await?;

        let BrokerSession {
            connection, ids, ..
        } = &mut *guard;
        let Some(conn) = connection.as_deref() else {
            return Err(LetPotError::connection_msg("no broker connection"));
        };

        let topic = format!("{device_id}/cmd");
        let mut sent = 0;
        for packet in frame_packets(payload, ids)? {
            conn.publish(&topic, packet.clone().into_bytes()).await?;
            info!(%topic, %packet, "published packet");
            sent += 1;
        }
        Ok(sent)
    }

    /// Close the connection, if any.
    pub async fn close(&self) {
        let mut session = self.session.lock().await;
        session.teardown().await;
        self.set_state(ConnectionState::Disconnected);
    }

    /// Id the next published packet will carry.
    pub async fn next_message_id(&self) -> u32 {
        self.session.lock().await.ids.peek()
    }

    async fn connect_locked(
        &self,
        session: &mut BrokerSession,
        email: &str,
        user_id: &str,
    ) -> Result<()> {
        let Some(reason) = session.reconnect_reason(user_id) else {
            return Ok(());
        };

        info!(?reason, %user_id, "connecting to broker");
        session.teardown().await;
        self.set_state(ConnectionState::Connecting);

        session.ids.reset();
        let options = ConnectOptions {
            url: self.settings.url(),
            port: self.settings.port,
            client_id: format!("{}{}", self.settings.client_id_prefix, Uuid::now_v7().simple()),
            credentials: derive_credentials(email, user_id),
            keep_alive: self.settings.keep_alive(),
            connect_timeout: self.settings.connect_timeout(),
        };

        match self.connector.connect(options).await {
            Ok(conn) => {
                session.connection = Some(conn);
                session.bound_user_id = Some(user_id.to_string());
                self.set_state(ConnectionState::Connected);
                info!(%user_id, "connected to broker");
                Ok(())
            }
            Err(e) => {
                self.set_state(ConnectionState::Disconnected);
                Err(e)
            }
        }
    }

    fn set_state(&self, state: ConnectionState) {
        let _ = self.state.send_replace(state);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
