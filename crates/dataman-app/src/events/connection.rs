use dataman_types::{AppEvent, ConnectionState};
use kanal::AsyncSender;

pub async fn handle_connection_change(
    connected: bool,
    app_to_ui_tx: &AsyncSender<AppEvent>,
) -> anyhow::Result<()> {
    let state = if connected {
        tracing::info!("System connected");
        ConnectionState::Connected
    } else {
        tracing::info!("System disconnected");
        ConnectionState::Disconnected
    };

    // The display may already be gone while the session shuts down
    if app_to_ui_tx
        .send(AppEvent::ConnectionChanged(state))
        .await
        .is_err()
    {
        tracing::debug!("Display closed, dropping connection update");
    }

    Ok(())
}
