use super::{ClientState, ConnectionManager, ConnectionState, RtClient};
use crate::infrastructure::RestClient;
use crate::listener::RtListener;
use crate::types::{
    CONNECTION_EVENTS_BUFFER, DEFAULT_API_URL, DEFAULT_TIMEOUT, HEARTBEAT_INTERVAL,
    RECONNECT_INTERVALS, Result, RtError,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{RwLock, broadcast, watch};

pub const ENV_APP_ID: &str = "BACKENDLESS_APP_ID";
pub const ENV_API_KEY: &str = "BACKENDLESS_API_KEY";
pub const ENV_API_URL: &str = "BACKENDLESS_API_URL";
pub const ENV_RT_URL: &str = "BACKENDLESS_RT_URL";
pub const ENV_USER_TOKEN: &str = "BACKENDLESS_USER_TOKEN";

#[derive(Debug, Clone)]
pub struct RtClientOptions {
    pub app_id: String,
    pub api_key: String,
    /// REST base used for the realtime lookup and publishing
    pub api_url: String,
    /// Skips the lookup when set
    pub rt_url: Option<String>,
    pub user_token: Option<String>,
    /// Milliseconds to wait for method results and channel joins
    pub timeout: Option<u64>,
    pub heartbeat_interval: Option<u64>,
    pub reconnect_intervals: Vec<u64>,
}

impl Default for RtClientOptions {
    fn default() -> Self {
        Self {
            app_id: String::new(),
            api_key: String::new(),
            api_url: DEFAULT_API_URL.to_string(),
            rt_url: None,
            user_token: None,
            timeout: None,
            heartbeat_interval: None,
            reconnect_intervals: RECONNECT_INTERVALS.to_vec(),
        }
    }
}

impl RtClientOptions {
    pub fn new(app_id: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            app_id: app_id.into(),
            api_key: api_key.into(),
            ..Default::default()
        }
    }

    /// Reads options from `BACKENDLESS_*` environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key)
                .filter(|value| !value.is_empty())
                .ok_or_else(|| RtError::Config(format!("{} must be set", key)))
        };

        let mut options = Self::new(required(ENV_APP_ID)?, required(ENV_API_KEY)?);
        if let Some(api_url) = lookup(ENV_API_URL) {
            options.api_url = api_url;
        }
        options.rt_url = lookup(ENV_RT_URL);
        options.user_token = lookup(ENV_USER_TOKEN);
        Ok(options)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout.unwrap_or(DEFAULT_TIMEOUT))
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.heartbeat_interval.unwrap_or(HEARTBEAT_INTERVAL))
    }
}

/// Builder for RtClient that handles initialization
pub struct RtClientBuilder {
    options: RtClientOptions,
}

impl RtClientBuilder {
    /// Create a new builder
    pub fn new(options: RtClientOptions) -> Result<Self> {
        if options.app_id.is_empty() {
            return Err(RtError::Auth("Application id is required".to_string()));
        }
        if options.api_key.is_empty() {
            return Err(RtError::Auth("API key is required".to_string()));
        }

        Ok(Self { options })
    }

    /// Build the client and spawn background tasks
    pub fn build(self) -> RtClient {
        let mut client_state = ClientState::new();
        client_state.user_token = self.options.user_token.clone();

        // Initialize state watcher channel
        let (state_tx, state_rx) = watch::channel((ConnectionState::Closed, false));
        client_state.state_change_tx = Some(state_tx);

        let (events_tx, _) = broadcast::channel(CONNECTION_EVENTS_BUFFER);
        let connection = Arc::new(ConnectionManager::new());
        let rest = RestClient::new(
            &self.options.api_url,
            &self.options.app_id,
            &self.options.api_key,
        );

        let client = RtClient {
            client_id: uuid::Uuid::new_v4().to_string(),
            listener: Arc::new(RtListener::new(Arc::clone(&connection))),
            connection,
            rest: Arc::new(rest),
            events_tx,
            options: self.options,
            state: Arc::new(RwLock::new(client_state)),
        };

        // Spawn reconnection watcher task
        let client_for_watcher = client.clone();
        tokio::spawn(async move {
            let mut rx = state_rx;

            while rx.changed().await.is_ok() {
                let (state, was_manual) = *rx.borrow_and_update();

                // Reconnect if closed/disconnected AND not manual
                if matches!(state, ConnectionState::Closed) && !was_manual {
                    tracing::info!("State watcher detected disconnect, attempting reconnection...");

                    if let Err(e) = client_for_watcher.try_reconnect().await {
                        tracing::error!("Reconnection watcher failed: {}", e);
                    }
                }
            }
            tracing::info!("Reconnection watcher task finished");
        });

        client
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_options_from_env() {
        let options = RtClientOptions::from_lookup(env(&[
            (ENV_APP_ID, "app"),
            (ENV_API_KEY, "key"),
            (ENV_RT_URL, "http://localhost:5000"),
        ]))
        .unwrap();

        assert_eq!(options.app_id, "app");
        assert_eq!(options.api_key, "key");
        assert_eq!(options.api_url, DEFAULT_API_URL);
        assert_eq!(options.rt_url.as_deref(), Some("http://localhost:5000"));
        assert_eq!(options.user_token, None);
    }

    #[test]
    fn test_options_from_env_requires_credentials() {
        let result = RtClientOptions::from_lookup(env(&[(ENV_APP_ID, "app")]));
        assert!(matches!(result, Err(RtError::Config(msg)) if msg.contains(ENV_API_KEY)));

        let result = RtClientOptions::from_lookup(env(&[(ENV_APP_ID, ""), (ENV_API_KEY, "key")]));
        assert!(matches!(result, Err(RtError::Config(_))));
    }

    #[test]
    fn test_option_defaults() {
        let options = RtClientOptions::new("app", "key");
        assert_eq!(options.timeout(), Duration::from_millis(DEFAULT_TIMEOUT));
        assert_eq!(
            options.heartbeat_interval(),
            Duration::from_millis(HEARTBEAT_INTERVAL)
        );
        assert_eq!(options.reconnect_intervals, RECONNECT_INTERVALS.to_vec());
    }

    #[test]
    fn test_builder_validates_credentials() {
        assert!(matches!(
            RtClientBuilder::new(RtClientOptions::new("", "key")),
            Err(RtError::Auth(_))
        ));
        assert!(matches!(
            RtClientBuilder::new(RtClientOptions::new("app", "")),
            Err(RtError::Auth(_))
        ));
        assert!(RtClientBuilder::new(RtClientOptions::new("app", "key")).is_ok());
    }
}
