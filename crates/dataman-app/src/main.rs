use std::sync::Arc;

use dataman_config::Config;
use dataman_types::AppEvent;
use tokio::signal;

mod controller;
mod events;
mod io;
mod logging;
mod state;

use self::controller::AppController;
use self::logging::init_logging;
use self::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = Config::new();
    init_logging(config.log_json);

    tracing::info!("Starting DataMan result viewer");
    match serde_json::to_string_pretty(&config) {
        Ok(json) => tracing::debug!("Configuration:\n{json}"),
        Err(e) => tracing::warn!("Failed to serialize configuration: {e}"),
    }

    let ui_config = config.ui.clone();
    let state = Arc::new(AppState::new(config));
    let controller = AppController::new(state.clone()).await;
    let mut tasks = controller.spawn_tasks();

    // Ctrl+C closes the display, which ends the run below
    let ui_tx = controller.ui_sender();
    tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            tracing::info!("Shutdown requested");
            let _ = ui_tx.send(AppEvent::Shutdown).await;
        }
    });

    let ui_rx = controller.ui_receiver();
    let session = state.session.clone();
    let display = if ui_config.headless {
        dataman_ui::headless_loop(ui_rx, ui_config, session).await
    } else {
        // The window owns the main thread until it is closed
        tokio::task::block_in_place(|| dataman_ui::run_window(ui_rx, &ui_config, session))
    };

    if let Err(e) = &display {
        tracing::error!("Display exited: {e}");
    }

    controller.shutdown();
    while let Some(result) = tasks.join_next().await {
        match result {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::error!("Task failed: {e}"),
            Err(e) => tracing::error!("Task panicked: {e}"),
        }
    }

    tracing::info!("Stopped");
    display
}
