use std::sync::Arc;

use dataman_config::session::SessionConfig;
use dataman_core::session::open_session;
use dataman_core::{DeviceSession, SessionError, SessionStatus, SystemDiscoverer};
use dataman_replay::{ReplayDiscoverer, ReplaySession};
use dataman_types::{ConnectionState, DeviceEvent};
use kanal::Sender;
use tokio_util::sync::CancellationToken;

use crate::state::AppState;

/// Discover a reader, connect to it and keep the session open until
/// cancelled. Failures are logged and leave the session disconnected; there is
/// no retry.
pub async fn session_io(
    state: Arc<AppState>,
    device_tx: Sender<DeviceEvent>,
    cancel: CancellationToken,
) -> anyhow::Result<()> {
    let config = {
        let config = state.config.read().await;
        config.session.clone()
    };

    let status = state.session.clone();
    let opened =
        tokio::task::spawn_blocking(move || connect_first_system(&config, status, device_tx))
            .await?;

    let mut session = match opened {
        Ok(session) => session,
        Err(e) => {
            tracing::error!("Failed to connect: {e}");
            state.session.set_state(ConnectionState::Disconnected);
            return Ok(());
        }
    };

    cancel.cancelled().await;

    tracing::info!("Closing reader session");
    tokio::task::spawn_blocking(move || session.disconnect()).await?;

    Ok(())
}

fn connect_first_system(
    config: &SessionConfig,
    status: SessionStatus,
    device_tx: Sender<DeviceEvent>,
) -> Result<Box<dyn DeviceSession>, SessionError> {
    let discoverer = ReplayDiscoverer::new(vec![config.replay_dir.clone()], config.baud_rate);

    let system = discoverer
        .discover()?
        .into_iter()
        .next()
        .ok_or_else(|| SessionError::Discovery("no reader found".to_string()))?;

    let mut session = ReplaySession::from_config(system, config, status, device_tx)?;
    open_session(&mut session, config.result_types_mask())?;

    Ok(Box::new(session))
}
