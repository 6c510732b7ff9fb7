//! Connection management for MongoDB
//!
//! One [`ConnectionManager`] is shared by every request. It owns the
//! database handle and applies the reconnect policy:
//! - without credentials it stays `NotConfigured` and never connects
//! - a failed connection is retried by a later request, at most one attempt
//!   at a time and no more often than `reconnect_interval`
//! - requests never wait for an attempt in progress

use mongodb::bson::doc;
use mongodb::{Client, Database, options::ClientOptions};
use std::time::Instant;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, error, info, warn};

use crate::config::ConnectionConfig;
use crate::error::{ConnectionError, Result};

/// MongoDB connection manager
pub struct ConnectionManager {
    /// Connection configuration
    config: ConnectionConfig,

    /// Current state and database handle
    inner: RwLock<Inner>,

    /// Held while an attempt runs; stores when the last attempt started
    attempt: Mutex<Option<Instant>>,
}

struct Inner {
    state: ConnectionState,
    database: Option<Database>,
}

/// Connection state information
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    /// Credentials missing; never connects
    NotConfigured,

    /// No attempt made yet
    Disconnected,

    /// Connected and ready
    Connected,

    /// Last attempt failed
    Failed(String),
}

impl ConnectionManager {
    /// Create a connection manager; does not connect
    pub fn new(config: ConnectionConfig) -> Self {
        let state = if config.has_credentials() {
            ConnectionState::Disconnected
        } else {
            ConnectionState::NotConfigured
        };

        Self {
            config,
            inner: RwLock::new(Inner {
                state,
                database: None,
            }),
            attempt: Mutex::new(None),
        }
    }

    /// Connect and verify with a ping.
    ///
    /// Waits for an attempt already in progress, then makes its own.
    pub async fn connect(&self) -> Result<()> {
        if self.is_not_configured().await {
            error!(
                "MONGODB_USERNAME, MONGODB_PASSWORD, and MONGODB_LOCATION must be set to connect"
            );
            return Err(ConnectionError::NotConfigured.into());
        }

        let mut last_attempt = self.attempt.lock().await;
        *last_attempt = Some(Instant::now());
        self.attempt_connect().await
    }

    /// Whether the manager is connected, reconnecting first when allowed.
    ///
    /// Returns immediately when another attempt is in progress or the
    /// previous attempt is more recent than `reconnect_interval`.
    pub async fn ensure_connected(&self) -> bool {
        match self.state().await {
            ConnectionState::Connected => return true,
            ConnectionState::NotConfigured => return false,
            ConnectionState::Disconnected | ConnectionState::Failed(_) => {}
        }

        if !self.config.reconnect {
            return false;
        }

        let Ok(mut last_attempt) = self.attempt.try_lock() else {
            debug!("Reconnect already in progress");
            return false;
        };

        // State may have changed while another attempt held the lock
        if self.is_connected().await {
            return true;
        }

        if let Some(previous) = *last_attempt
            && previous.elapsed() < self.config.reconnect_interval()
        {
            return false;
        }

        *last_attempt = Some(Instant::now());
        info!("Attempting to reconnect to MongoDB");
        self.attempt_connect().await.is_ok()
    }

    /// Database handle, if connected
    pub async fn database(&self) -> Result<Database> {
        let inner = self.inner.read().await;
        match (&inner.state, &inner.database) {
            (ConnectionState::Connected, Some(db)) => Ok(db.clone()),
            (ConnectionState::NotConfigured, _) => Err(ConnectionError::NotConfigured.into()),
            _ => Err(ConnectionError::NotConnected.into()),
        }
    }

    /// Get current connection state
    pub async fn state(&self) -> ConnectionState {
        self.inner.read().await.state.clone()
    }

    /// Check if currently connected
    pub async fn is_connected(&self) -> bool {
        matches!(self.inner.read().await.state, ConnectionState::Connected)
    }

    /// Name of the configured database
    pub fn database_name(&self) -> &str {
        &self.config.database
    }

    async fn is_not_configured(&self) -> bool {
        matches!(self.inner.read().await.state, ConnectionState::NotConfigured)
    }

    /// One attempt; the caller holds the attempt lock
    async fn attempt_connect(&self) -> Result<()> {
        match self.open_database().await {
            Ok(db) => {
                let mut inner = self.inner.write().await;
                inner.state = ConnectionState::Connected;
                inner.database = Some(db);
                info!(
                    "Connected to MongoDB, using database '{}'",
                    self.config.database
                );
                Ok(())
            }
            Err(e) => {
                let mut inner = self.inner.write().await;
                inner.state = ConnectionState::Failed(e.to_string());
                inner.database = None;
                error!("MongoDB connection error: {}", e);
                Err(e)
            }
        }
    }

    async fn open_database(&self) -> Result<Database> {
        let options = self.client_options().await?;
        let client = Client::with_options(options)
            .map_err(|e| ConnectionError::ConnectionFailed(e.to_string()))?;

        let db = client.database(&self.config.database);
        db.run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| ConnectionError::PingFailed(e.to_string()))?;

        Ok(db)
    }

    /// Parse `location` and attach credentials
    async fn client_options(&self) -> Result<ClientOptions> {
        let uri = self.config.connection_uri().ok_or_else(|| {
            ConnectionError::InvalidUri("connection location is not set".to_string())
        })?;

        let mut options = ClientOptions::parse(&uri)
            .await
            .map_err(|e| ConnectionError::InvalidUri(e.to_string()))?;

        if options.credential.is_some() {
            warn!("Connection location carries credentials; configured credentials take precedence");
        }

        // Keeps any auth source or mechanism the URI selected
        let mut credential = options.credential.take().unwrap_or_default();
        credential.username = self.config.username.clone();
        credential.password = self.config.password.clone();
        options.credential = Some(credential);

        let timeout = std::time::Duration::from_secs(self.config.timeout);
        options.connect_timeout = Some(timeout);
        options.server_selection_timeout = Some(timeout);
        options.app_name = Some(env!("CARGO_PKG_NAME").to_string());

        Ok(options)
    }
}
