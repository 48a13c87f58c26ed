//! Broker transport seam.
//!
//! [`BrokerConnector`] opens connections and [`BrokerConnection`] publishes
//! on one. The production implementation, [`RumqttConnector`], speaks MQTT
//! over a secure WebSocket with `rumqttc`; reconnection after a transient
//! drop is left to the `rumqttc` event loop.

use std::time::Duration;

use async_trait::async_trait;
use letpot_core::{LetPotError, Result};
use rumqttc::{AsyncClient, ConnectReturnCode, Event, EventLoop, MqttOptions, Outgoing, Packet, QoS, Transport};
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::credentials::BrokerCredentials;

/// Capacity of the request channel between client and event loop.
const CHANNEL_CAPACITY: usize = 16;
/// Pause between polls after the event loop reports an error.
const RECONNECT_DELAY: Duration = Duration::from_secs(2);
/// How long `disconnect` waits for the DISCONNECT packet to go out.
const DISCONNECT_GRACE: Duration = Duration::from_secs(2);

/// Parameters for one connection attempt.
#[derive(Clone, Debug)]
pub struct ConnectOptions {
    /// Full `wss://host:port/path` URL.
    pub url: String,
    /// Broker port (also part of `url`).
    pub port: u16,
    /// Client identifier, unique per attempt.
    pub client_id: String,
    /// Derived broker credentials.
    pub credentials: BrokerCredentials,
    /// MQTT keep-alive.
    pub keep_alive: Duration,
    /// Maximum wait for the broker to accept the connection.
    pub connect_timeout: Duration,
}

/// Opens broker connections.
#[async_trait]
pub trait BrokerConnector: Send + Sync {
    /// Connect and wait until the broker has accepted the session.
    async fn connect(&self, options: ConnectOptions) -> Result<Box<dyn BrokerConnection>>;
}

/// A live (or formerly live) broker connection.
#[async_trait]
pub trait BrokerConnection: Send + Sync {
    /// Whether the transport currently reports the connection as up.
    fn is_connected(&self) -> bool;

    /// Publish `payload` to `topic` with at-least-once delivery.
    async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<()>;

    /// Close the connection.
    async fn disconnect(&self) -> Result<()>;
}

// ─────────────────────────────────────────────────────────────────────────────
// rumqttc implementation
// ─────────────────────────────────────────────────────────────────────────────

/// [`BrokerConnector`] backed by `rumqttc` over secure WebSocket.
#[derive(Clone, Copy, Debug, Default)]
pub struct RumqttConnector;

#[async_trait]
impl BrokerConnector for RumqttConnector {
    #[tracing::instrument(skip_all, fields(client_id = %options.client_id))]
    async fn connect(&self, options: ConnectOptions) -> Result<Box<dyn BrokerConnection>> {
        let mut mqtt = MqttOptions::new(&options.client_id, &options.url, options.port);
        let _ = mqtt
            .set_transport(Transport::wss_with_default_config())
            .set_credentials(&options.credentials.username, &options.credentials.password)
            .set_clean_session(true)
            .set_keep_alive(options.keep_alive);

        let (client, eventloop) = AsyncClient::new(mqtt, CHANNEL_CAPACITY);
        let (state_tx, state_rx) = watch::channel(false);
        let (ready_tx, ready_rx) = oneshot::channel();
        let task = tokio::spawn(drive_event_loop(eventloop, state_tx, ready_tx));

        let outcome = tokio::time::timeout(options.connect_timeout, ready_rx).await;
        let failure = match outcome {
            Ok(Ok(Ok(()))) => {
                debug!(url = %options.url, "broker accepted connection");
                return Ok(Box::new(RumqttConnection {
                    client,
                    connected: state_rx,
                    task,
                }));
            }
            Ok(Ok(Err(e))) => e,
            Ok(Err(_)) => LetPotError::connection_msg("broker event loop ended before CONNACK"),
            Err(_) => LetPotError::connection_msg(format!(
                "no CONNACK from {} within {:?}",
                options.url, options.connect_timeout
            )),
        };
        task.abort();
        Err(failure)
    }
}

/// Poll the event loop until the connection is closed.
///
/// Errors before the first CONNACK fail the connect attempt. Errors after it
/// are logged and polling continues, which makes `rumqttc` reconnect.
async fn drive_event_loop(
    mut eventloop: EventLoop,
    connected: watch::Sender<bool>,
    ready: oneshot::Sender<Result<()>>,
) {
    let mut ready = Some(ready);
    loop {
        match eventloop.poll().await {
            Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                if ack.code == ConnectReturnCode::Success {
                    let _ = connected.send_replace(true);
                    if let Some(tx) = ready.take() {
                        let _ = tx.send(Ok(()));
                    } else {
                        debug!("broker connection re-established");
                    }
                } else {
                    let _ = connected.send_replace(false);
                    let err = LetPotError::connection_msg(format!(
                        "broker refused connection: {:?}",
                        ack.code
                    ));
                    if let Some(tx) = ready.take() {
                        let _ = tx.send(Err(err));
                        return;
                    }
                    warn!(code = ?ack.code, "broker refused reconnection");
                }
            }
            Ok(Event::Outgoing(Outgoing::Disconnect)) => {
                let _ = connected.send_replace(false);
                debug!("broker connection closed");
                return;
            }
            Ok(_) => {}
            Err(e) => {
                let _ = connected.send_replace(false);
                if let Some(tx) = ready.take() {
                    let _ = tx.send(Err(LetPotError::connection("connecting to broker", e)));
                    return;
                }
                warn!(error = %e, "broker connection lost, retrying");
                tokio::time::sleep(RECONNECT_DELAY).await;
            }
        }
    }
}

/// A `rumqttc` client plus the task driving its event loop.
struct RumqttConnection {
    client: AsyncClient,
    connected: watch::Receiver<bool>,
    task: JoinHandle<()>,
}

#[async_trait]
impl BrokerConnection for RumqttConnection {
    fn is_connected(&self) -> bool {
        *self.connected.borrow() && !self.task.is_finished()
    }

    async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<()> {
        self.client
            .publish(topic, QoS::AtLeastOnce, false, payload)
            .await
            .map_err(|e| LetPotError::connection(format!("publishing to {topic}"), e))
    }

    async fn disconnect(&self) -> Result<()> {
        self.client
            .disconnect()
            .await
            .map_err(|e| LetPotError::connection("disconnecting from broker", e))?;
        let mut connected = self.connected.clone();
        let _ = tokio::time::timeout(DISCONNECT_GRACE, connected.wait_for(|up| !*up)).await;
        Ok(())
    }
}

impl Drop for RumqttConnection {
    fn drop(&mut self) {
        self.task.abort();
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
