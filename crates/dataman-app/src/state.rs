use std::sync::Arc;

use dataman_config::Config;
use dataman_core::SessionStatus;
use tokio::sync::RwLock;

pub struct AppState {
    pub config: Arc<RwLock<Config>>,
    /// Connection state and text encoding of the reader session
    pub session: SessionStatus,
}

impl AppState {
    /// An unknown text encoding is not fatal here; the session refuses to
    /// connect with it later and stays disconnected.
    pub fn new(config: Config) -> Self {
        let session = SessionStatus::with_encoding_label(&config.session.text_encoding)
            .unwrap_or_else(|e| {
                tracing::warn!("{e}, using UTF-8");
                SessionStatus::default()
            });

        Self {
            config: Arc::new(RwLock::new(config)),
            session,
        }
    }
}
