use dataman_types::{AppEvent, SharedComplexResult};
use kanal::AsyncSender;

/// Hands a completed result to the display thread. The shared record is
/// never read here; the display copies it out under the lock.
pub async fn handle_complex_result(
    result: SharedComplexResult,
    app_to_ui_tx: &AsyncSender<AppEvent>,
) -> anyhow::Result<()> {
    tracing::debug!("Forwarding complex result");
    app_to_ui_tx.send(AppEvent::ShowComplexResult(result)).await?;
    Ok(())
}
