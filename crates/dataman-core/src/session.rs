use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, RwLock};

use dataman_types::{ConnectionState, ResultTypes, SystemInfo};
use encoding_rs::Encoding;

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Discovery failed: {0}")]
    Discovery(String),

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Unknown text encoding: {0}")]
    UnknownEncoding(String),

    #[error("Session is not connected")]
    NotConnected,

    #[error("Event channel closed")]
    ChannelClosed,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Finds readers that can be connected to
pub trait SystemDiscoverer {
    fn discover(&self) -> Result<Vec<SystemInfo>, SessionError>;
}

/// Connection to one reader.
///
/// Implementations deliver `DeviceEvent`s from their own thread through the
/// channel they were created with, and keep `status()` up to date.
pub trait DeviceSession: Send {
    fn system(&self) -> &SystemInfo;

    fn status(&self) -> &SessionStatus;

    fn connect(&mut self) -> Result<(), SessionError>;

    /// Select which result kinds the reader sends
    fn set_result_types(&mut self, types: ResultTypes) -> Result<(), SessionError>;

    fn disconnect(&mut self);
}

/// Connect `session` and subscribe to `types`.
///
/// A failed connect leaves the status disconnected and is returned to the
/// caller; there is no retry. A rejected subscription is only logged, the
/// reader then keeps whatever result types it was configured with.
pub fn open_session(
    session: &mut dyn DeviceSession,
    types: ResultTypes,
) -> Result<(), SessionError> {
    let system = session.system().clone();
    tracing::info!(
        "Connecting to {} on {} ({} baud)",
        system.name,
        system.port_name,
        system.baud_rate
    );

    if let Err(e) = session.connect() {
        session.status().set_state(ConnectionState::Disconnected);
        return Err(e);
    }

    if let Err(e) = session.set_result_types(types) {
        tracing::warn!("Failed to set result types {types}: {e}");
    }

    Ok(())
}

/// Connection state and text encoding of a session, shared with the display
/// thread so the assembler can read them at decode time.
#[derive(Clone)]
pub struct SessionStatus {
    inner: Arc<StatusInner>,
}

struct StatusInner {
    state: AtomicU8,
    encoding: RwLock<&'static Encoding>,
}

impl SessionStatus {
    pub fn new(encoding: &'static Encoding) -> Self {
        Self {
            inner: Arc::new(StatusInner {
                state: AtomicU8::new(state_to_u8(ConnectionState::Disconnected)),
                encoding: RwLock::new(encoding),
            }),
        }
    }

    /// Status with the encoding named by a WHATWG label such as `utf-8`
    pub fn with_encoding_label(label: &str) -> Result<Self, SessionError> {
        Ok(Self::new(encoding_for_label(label)?))
    }

    pub fn state(&self) -> ConnectionState {
        state_from_u8(self.inner.state.load(Ordering::Acquire))
    }

    pub fn set_state(&self, state: ConnectionState) {
        self.inner.state.store(state_to_u8(state), Ordering::Release);
    }

    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    pub fn encoding(&self) -> &'static Encoding {
        *self
            .inner
            .encoding
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn set_encoding(&self, encoding: &'static Encoding) {
        *self
            .inner
            .encoding
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = encoding;
    }

    /// Encoding for read strings, only available while connected
    pub fn text_encoding(&self) -> Option<&'static Encoding> {
        self.is_connected().then(|| self.encoding())
    }
}

impl Default for SessionStatus {
    fn default() -> Self {
        Self::new(encoding_rs::UTF_8)
    }
}

impl fmt::Debug for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionStatus")
            .field("state", &self.state())
            .field("encoding", &self.encoding().name())
            .finish()
    }
}

pub fn encoding_for_label(label: &str) -> Result<&'static Encoding, SessionError> {
    Encoding::for_label(label.trim().as_bytes())
        .ok_or_else(|| SessionError::UnknownEncoding(label.to_string()))
}

fn state_to_u8(state: ConnectionState) -> u8 {
    match state {
        ConnectionState::Disconnected => 0,
        ConnectionState::Connecting => 1,
        ConnectionState::Connected => 2,
        ConnectionState::Disconnecting => 3,
    }
}

fn state_from_u8(value: u8) -> ConnectionState {
    match value {
        1 => ConnectionState::Connecting,
        2 => ConnectionState::Connected,
        3 => ConnectionState::Disconnecting,
        _ => ConnectionState::Disconnected,
    }
}
