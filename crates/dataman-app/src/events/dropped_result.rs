use dataman_types::{AppEvent, SimpleResult};
use kanal::AsyncSender;

pub async fn handle_dropped_result(
    result: SimpleResult,
    app_to_ui_tx: &AsyncSender<AppEvent>,
) -> anyhow::Result<()> {
    tracing::warn!(
        "Partial result dropped: {}, id={}",
        result.id.result_type,
        result.id.id
    );

    app_to_ui_tx.send(AppEvent::ResultDropped(result.id)).await?;
    Ok(())
}
