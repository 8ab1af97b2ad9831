use dataman_types::{AppEvent, DeviceEvent};
use kanal::{AsyncReceiver, AsyncSender};
use tokio_util::sync::CancellationToken;

pub mod complex_result;
pub mod connection;
pub mod dropped_result;

use complex_result::handle_complex_result;
use connection::handle_connection_change;
use dropped_result::handle_dropped_result;

/// Backend loop. Receives session events and forwards them to the display.
pub async fn event_loop(
    device_rx: AsyncReceiver<DeviceEvent>,
    app_to_ui_tx: AsyncSender<AppEvent>,
    cancel: CancellationToken,
) -> anyhow::Result<()> {
    tracing::info!("[EVENT_LOOP] Waiting for reader events");

    loop {
        let event = tokio::select! {
            _ = cancel.cancelled() => {
                tracing::debug!("[EVENT_LOOP] Cancelled");
                break;
            }
            event = device_rx.recv() => event?,
        };

        // The display may have stopped reading
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::debug!("[EVENT_LOOP] Cancelled while forwarding");
                break;
            }
            result = handle_events(&app_to_ui_tx, event) => result?,
        }
    }

    Ok(())
}

async fn handle_events(
    app_to_ui_tx: &AsyncSender<AppEvent>,
    event: DeviceEvent,
) -> anyhow::Result<()> {
    match event {
        DeviceEvent::Connected => {
            handle_connection_change(true, app_to_ui_tx).await?;
        }
        DeviceEvent::Disconnected => {
            handle_connection_change(false, app_to_ui_tx).await?;
        }
        DeviceEvent::ComplexResultCompleted(result) => {
            handle_complex_result(result, app_to_ui_tx).await?;
        }
        DeviceEvent::SimpleResultDropped(result) => {
            handle_dropped_result(result, app_to_ui_tx).await?;
        }
    }

    Ok(())
}
