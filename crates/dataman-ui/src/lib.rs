use dataman_config::ui::UiConfig;
use dataman_core::SessionStatus;
use dataman_types::AppEvent;
use kanal::AsyncReceiver;
use slint::ComponentHandle;

pub mod consumer;
pub mod sink;

pub use consumer::{ResultConsumer, headless_loop};
pub use sink::{HeadlessSink, SlintSink};

slint::include_modules!();

/// Open the result window and run the Slint event loop on the calling thread.
///
/// Backend events are consumed by a local task on the same thread, so every
/// display mutation happens where the window lives.
pub fn run_window(
    app_to_ui_rx: AsyncReceiver<AppEvent>,
    config: &UiConfig,
    session: SessionStatus,
) -> anyhow::Result<()> {
    let window = ResultWindow::new()?;
    window.set_image_width(config.display_width as f32);
    window.set_image_height(config.display_height as f32);

    let window_weak = window.as_weak();
    let mut consumer = ResultConsumer::new(config.display_size(), session);

    slint::spawn_local(async move {
        let mut sink = SlintSink::new(window_weak);
        while let Ok(event) = app_to_ui_rx.recv().await {
            if consumer.handle(event, &mut sink).is_break() {
                break;
            }
        }

        tracing::debug!("[SLINT] Event stream closed");
        slint::quit_event_loop().ok();
    })?;

    window.run()?;

    Ok(())
}
