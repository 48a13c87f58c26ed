//! Pump commands on top of an authenticated session.

use std::sync::Arc;
use std::time::Duration;

use letpot_auth::{Device, Session, SessionManager};
use letpot_core::{LetPotError, Result};
use letpot_mqtt::{BrokerSessionManager, ConnectionState, encode_pump_command};
use letpot_settings::{DeviceSettings, LetPotSettings};
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Entry point for everything a user does with their devices.
///
/// Commands validate (and if needed refresh) the session first, then publish
/// through the shared broker connection.
#[derive(Clone)]
pub struct LetPotClient {
    sessions: SessionManager,
    broker: Arc<BrokerSessionManager>,
    device: DeviceSettings,
}

impl LetPotClient {
    /// Build a client from settings, connecting to the broker with `rumqttc`.
    pub fn new(settings: &LetPotSettings) -> Result<Self> {
        Ok(Self::from_parts(
            SessionManager::new(&settings.api)?,
            Arc::new(BrokerSessionManager::with_rumqtt(settings.broker.clone())),
            settings.device.clone(),
        ))
    }

    /// Build a client from already constructed managers.
    pub fn from_parts(
        sessions: SessionManager,
        broker: Arc<BrokerSessionManager>,
        device: DeviceSettings,
    ) -> Self {
        Self {
            sessions,
            broker,
            device,
        }
    }

    /// Device defaults in effect.
    pub fn device_settings(&self) -> &DeviceSettings {
        &self.device
    }

    /// Log in with email and password.
    pub async fn login(&self, email: &str, password: &str) -> Result<Session> {
        self.sessions.login(email, password).await
    }

    /// Whether a session is installed.
    pub async fn is_logged_in(&self) -> bool {
        self.sessions.store().is_logged_in().await
    }

    /// Devices registered to the logged-in user.
    pub async fn devices(&self) -> Result<Vec<Device>> {
        self.sessions.devices().await
    }

    /// Run the pump on `device_id` for `seconds`.
    pub async fn turn_on(&self, device_id: &str, seconds: u16) -> Result<()> {
        self.send_pump(device_id, true, seconds).await
    }

    /// Stop the pump on `device_id`.
    pub async fn turn_off(&self, device_id: &str) -> Result<()> {
        self.send_pump(device_id, false, 0).await
    }

    /// Turn the pump on for `seconds`, wait that long, then turn it off.
    ///
    /// If `cancel` fires during the wait the cycle stops with
    /// [`LetPotError::Cancelled`] and no "off" command is sent; the device
    /// still stops on its own once the on-duration elapses.
    #[tracing::instrument(skip(self, cancel))]
    pub async fn test_cycle(
        &self,
        device_id: &str,
        seconds: u16,
        cancel: &CancellationToken,
    ) -> Result<()> {
        self.turn_on(device_id, seconds).await?;

        tokio::select! {
            () = tokio::time::sleep(Duration::from_secs(u64::from(seconds))) => {}
            () = cancel.cancelled() => {
                info!("test cycle cancelled before turning off");
                return Err(LetPotError::Cancelled);
            }
        }

        self.turn_off(device_id).await
    }

    /// Current broker connection state.
    pub fn broker_state(&self) -> ConnectionState {
        self.broker.state()
    }

    /// Close the broker connection.
    pub async fn close(&self) {
        self.broker.close().await;
    }

    #[tracing::instrument(skip(self))]
    async fn send_pump(&self, device_id: &str, turn_on: bool, seconds: u16) -> Result<()> {
        let session = self.sessions.ensure_valid_session().await?;
        let command = encode_pump_command(turn_on, seconds);
        let _ = self
            .broker
            .publish_command(device_id, &session.email, &session.user_id, &command)
            .await?;
        info!(device_id, turn_on, seconds, "pump command sent");
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use assert_matches::assert_matches;
    use async_trait::async_trait;
    use base64::Engine;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use letpot_auth::{ApiClient, SessionStore};
    use letpot_core::now_secs;
    use letpot_mqtt::{BrokerConnection, BrokerConnector, ConnectOptions};
    use letpot_settings::BrokerSettings;
    use parking_lot::Mutex;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    /// Records `(user_id, topic, packet)` for every publish.
    #[derive(Default)]
    struct RecordingBroker {
        connects: AtomicUsize,
        sent: Arc<Mutex<Vec<(String, String, String)>>>,
    }

    struct RecordingConnection {
        username: String,
        sent: Arc<Mutex<Vec<(String, String, String)>>>,
    }

    #[async_trait]
    impl BrokerConnector for RecordingBroker {
        async fn connect(&self, options: ConnectOptions) -> Result<Box<dyn BrokerConnection>> {
            let _ = self.connects.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(RecordingConnection {
                username: options.credentials.username,
                sent: Arc::clone(&self.sent),
            }))
        }
    }

    #[async_trait]
    impl BrokerConnection for RecordingConnection {
        fn is_connected(&self) -> bool {
            true
        }

        async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<()> {
            self.sent.lock().push((
                self.username.clone(),
                topic.to_string(),
                String::from_utf8(payload).unwrap(),
            ));
            Ok(())
        }

        async fn disconnect(&self) -> Result<()> {
            Ok(())
        }
    }

    impl RecordingBroker {
        /// Pump mode byte of each sent command (packet byte 6).
        fn pump_modes(&self) -> Vec<u8> {
            self.sent
                .lock()
                .iter()
                .map(|(_, _, packet)| hex::decode(packet).unwrap()[6])
                .collect()
        }
    }

    fn token_for(uid: &str) -> String {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256"}"#);
        let payload = URL_SAFE_NO_PAD.encode(json!({ "uid": uid }).to_string());
        format!("{header}.{payload}.sig")
    }

    fn live_session() -> Session {
        let now = now_secs();
        Session {
            user_id: "uid-123".to_string(),
            email: "user@example.com".to_string(),
            access_token: "access".to_string(),
            access_token_expires_at: now + 3600,
            refresh_token: "refresh".to_string(),
            refresh_token_expires_at: now + 7200,
        }
    }

    fn client_against(base_url: &str) -> (Arc<RecordingBroker>, LetPotClient) {
        let broker = Arc::new(RecordingBroker::default());
        let sessions = SessionManager::with_store(
            ApiClient::with_client(reqwest::Client::new(), base_url),
            Arc::new(SessionStore::new()),
        );
        let client = LetPotClient::from_parts(
            sessions,
            Arc::new(BrokerSessionManager::new(broker.clone(), BrokerSettings::default())),
            DeviceSettings::default(),
        );
        (broker, client)
    }

    async fn logged_in_client() -> (Arc<RecordingBroker>, LetPotClient) {
        // no HTTP is expected; point at a port nothing listens on
        let (broker, client) = client_against("http://127.0.0.1:1");
        client.sessions.store().set(live_session()).await;
        (broker, client)
    }

    #[tokio::test]
    async fn commands_require_login() {
        let (broker, client) = client_against("http://127.0.0.1:1");
        let err = client.turn_on("dev", 5).await.unwrap_err();
        assert_matches!(err, LetPotError::NotAuthenticated);
        assert_eq!(broker.connects.load(Ordering::SeqCst), 0);
        assert_eq!(client.broker_state(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn turn_on_publishes_pump_command() {
        let (broker, client) = logged_in_client().await;
        client.turn_on("LPH21ABC", 300).await.unwrap();

        let sent = broker.sent.lock().clone();
        assert_eq!(
            sent,
            vec![(
                "user@example.com__letpot_v3".to_string(),
                "LPH21ABC/cmd".to_string(),
                "4d00000f41020100012c000000000000000000".to_string(),
            )]
        );
        assert_eq!(client.broker_state(), ConnectionState::Connected);
    }

    #[tokio::test]
    async fn turn_off_sends_zero_duration() {
        let (broker, client) = logged_in_client().await;
        client.turn_off("dev").await.unwrap();
        let sent = broker.sent.lock().clone();
        assert_eq!(sent[0].2, "4d00000f410200000000000000000000000000");
    }

    #[tokio::test]
    async fn commands_share_one_connection() {
        let (broker, client) = logged_in_client().await;
        client.turn_on("dev", 5).await.unwrap();
        client.turn_off("dev").await.unwrap();
        assert_eq!(broker.connects.load(Ordering::SeqCst), 1);
        assert_eq!(broker.pump_modes(), vec![1, 0]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cycle_turns_on_then_off() {
        let (broker, client) = logged_in_client().await;
        let started = tokio::time::Instant::now();
        client
            .test_cycle("dev", 5, &CancellationToken::new())
            .await
            .unwrap();

        assert!(started.elapsed() >= Duration::from_secs(5));
        assert_eq!(broker.pump_modes(), vec![1, 0]);
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_test_cycle_skips_off() {
        let (broker, client) = logged_in_client().await;
        let cancel = CancellationToken::new();

        let cycle = {
            let client = client.clone();
            let cancel = cancel.clone();
            tokio::spawn(async move { client.test_cycle("dev", 60, &cancel).await })
        };
        tokio::time::sleep(Duration::from_secs(1)).await;
        cancel.cancel();

        let err = cycle.await.unwrap().unwrap_err();
        assert_matches!(err, LetPotError::Cancelled);
        assert_eq!(broker.pump_modes(), vec![1]);
    }

    #[tokio::test]
    async fn login_then_command_uses_session_identity() {
        let server = MockServer::start().await;
        let exp = now_secs() + 3600;
        Mock::given(method("POST"))
            .and(path("/v1/auth/login"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ok": true,
                "data": {
                    "token": {"token": token_for("uid-777"), "exp": exp},
                    "refreshToken": {"token": "r", "exp": exp + 3600}
                }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let (broker, client) = client_against(&server.uri());
        assert!(!client.is_logged_in().await);
        let session = client.login("Grower@Example.com", "pw").await.unwrap();
        assert_eq!(session.user_id, "uid-777");
        assert!(client.is_logged_in().await);

        client.turn_on("dev", 5).await.unwrap();
        assert_eq!(broker.sent.lock()[0].0, "grower@example.com__letpot_v3");
    }

    #[tokio::test]
    async fn devices_are_listed_for_logged_in_user() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/user/uid-123/devices"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ok": true,
                "data": [{"deviceId": "LPH21ABC", "deviceName": "Kitchen"}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let (_, client) = client_against(&server.uri());
        client.sessions.store().set(live_session()).await;

        let devices = client.devices().await.unwrap();
        assert_eq!(devices.len(), 1);
        assert_eq!(devices[0].device_id, "LPH21ABC");
        assert_eq!(devices[0].display_name(), "Kitchen");
    }

    #[tokio::test]
    async fn close_drops_connection() {
        let (broker, client) = logged_in_client().await;
        client.turn_on("dev", 5).await.unwrap();
        client.close().await;
        assert_eq!(client.broker_state(), ConnectionState::Disconnected);

        client.turn_off("dev").await.unwrap();
        assert_eq!(broker.connects.load(Ordering::SeqCst), 2);
    }
}
