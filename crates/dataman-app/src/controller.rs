use std::sync::Arc;

use dataman_types::{AppEvent, DeviceEvent};
use kanal::{AsyncReceiver, AsyncSender, Sender};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::events::event_loop;
use crate::io::session_io;
use crate::state::AppState;

/// Centralized channel management
pub struct ChannelSet {
    /// Session thread -> backend. The sending side is synchronous because
    /// sessions deliver from their own threads.
    pub device: (Sender<DeviceEvent>, AsyncReceiver<DeviceEvent>),
    pub app_to_ui: (AsyncSender<AppEvent>, AsyncReceiver<AppEvent>),
}

impl ChannelSet {
    pub fn new(device_capacity: usize, display_capacity: usize) -> Self {
        let (device_tx, device_rx) = kanal::bounded(device_capacity);

        Self {
            device: (device_tx, device_rx.to_async()),
            app_to_ui: kanal::bounded_async(display_capacity),
        }
    }
}

/// Application controller for task spawning and lifecycle
pub struct AppController {
    channels: ChannelSet,
    state: Arc<AppState>,
    cancel_token: CancellationToken,
}

impl AppController {
    pub async fn new(state: Arc<AppState>) -> Self {
        let channels = {
            let config = state.config.read().await;
            ChannelSet::new(
                config.device_channel_capacity,
                config.display_channel_capacity,
            )
        };

        Self {
            channels,
            state,
            cancel_token: CancellationToken::new(),
        }
    }

    pub fn spawn_tasks(&self) -> JoinSet<anyhow::Result<()>> {
        let mut tasks = JoinSet::new();

        // Event loop
        tasks.spawn(event_loop(
            self.channels.device.1.clone(),
            self.channels.app_to_ui.0.clone(),
            self.cancel_token.child_token(),
        ));

        // Reader session
        tasks.spawn(session_io(
            self.state.clone(),
            self.channels.device.0.clone(),
            self.cancel_token.child_token(),
        ));

        tasks
    }

    /// Receiving end for the display thread
    pub fn ui_receiver(&self) -> AsyncReceiver<AppEvent> {
        self.channels.app_to_ui.1.clone()
    }

    pub fn ui_sender(&self) -> AsyncSender<AppEvent> {
        self.channels.app_to_ui.0.clone()
    }

    pub fn shutdown(&self) {
        self.cancel_token.cancel();
    }
}
