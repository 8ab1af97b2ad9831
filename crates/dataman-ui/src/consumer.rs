use std::ops::ControlFlow;

use dataman_config::ui::UiConfig;
use dataman_core::{DisplaySink, DisplayState, ResultAssembler, ResultSnapshot, SessionStatus};
use dataman_types::AppEvent;
use kanal::AsyncReceiver;

use crate::sink::HeadlessSink;

/// Display-side handler for backend events. Owned by the thread that renders.
pub struct ResultConsumer {
    assembler: ResultAssembler,
    session: SessionStatus,
    display: DisplayState,
}

impl ResultConsumer {
    pub fn new(display_size: (u32, u32), session: SessionStatus) -> Self {
        Self {
            assembler: ResultAssembler::new(display_size),
            session,
            display: DisplayState::new(),
        }
    }

    pub fn display(&self) -> &DisplayState {
        &self.display
    }

    pub fn handle(&mut self, event: AppEvent, sink: &mut dyn DisplaySink) -> ControlFlow<()> {
        match event {
            AppEvent::ShowComplexResult(shared) => {
                let snapshot = ResultSnapshot::capture(&shared);
                drop(shared);

                let assembled = self.assembler.assemble(&snapshot, &self.session);
                if !self.display.apply(assembled, sink) {
                    tracing::debug!("Nothing to display for result {}", snapshot.result_id);
                }
            }
            AppEvent::ConnectionChanged(state) => {
                sink.show_status(&format!("Reader {state}"));
            }
            AppEvent::ResultDropped(id) => {
                sink.show_status(&format!(
                    "Partial result dropped: {}, id={}",
                    id.result_type, id.id
                ));
            }
            AppEvent::Shutdown => return ControlFlow::Break(()),
        }

        ControlFlow::Continue(())
    }
}

/// Consume backend events without a window
pub async fn headless_loop(
    app_to_ui_rx: AsyncReceiver<AppEvent>,
    config: UiConfig,
    session: SessionStatus,
) -> anyhow::Result<()> {
    let mut consumer = ResultConsumer::new(config.display_size(), session);
    let mut sink = HeadlessSink::new(config.snapshot_path.clone());

    tracing::info!("Running headless, display region {:?}", config.display_size());
    while let Ok(event) = app_to_ui_rx.recv().await {
        if consumer.handle(event, &mut sink).is_break() {
            break;
        }
    }

    tracing::info!(
        "Display loop stopped after {} frames",
        consumer.display().frames()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;
    use std::time::Duration;

    use dataman_types::{
        ComplexResult, ConnectionState, ResultId, ResultType, SimpleResult,
    };
    use image::{ImageFormat, Rgba, RgbaImage};
    use tokio::time::timeout;

    use super::*;

    #[derive(Default)]
    struct RecordingSink {
        images: Vec<(u32, u32)>,
        texts: Vec<String>,
        statuses: Vec<String>,
    }

    impl DisplaySink for RecordingSink {
        fn show_image(&mut self, image: &RgbaImage) {
            self.images.push(image.dimensions());
        }

        fn show_text(&mut self, text: &str) {
            self.texts.push(text.to_string());
        }

        fn show_status(&mut self, status: &str) {
            self.statuses.push(status.to_string());
        }
    }

    fn png(width: u32, height: u32) -> Vec<u8> {
        let mut bytes = Vec::new();
        RgbaImage::from_pixel(width, height, Rgba([200, 200, 200, 255]))
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        bytes
    }

    fn connected() -> SessionStatus {
        let status = SessionStatus::default();
        status.set_state(ConnectionState::Connected);
        status
    }

    #[test]
    fn test_complex_result_reaches_sink() {
        let mut consumer = ResultConsumer::new((64, 48), connected());
        let mut sink = RecordingSink::default();

        let shared = ComplexResult::new(vec![
            SimpleResult::new(ResultType::Image, 1, png(128, 96)),
            SimpleResult::new(
                ResultType::ReadXml,
                1,
                "<result><general><full_string>ABC123</full_string></general></result>",
            ),
        ])
        .into_shared();

        let flow = consumer.handle(AppEvent::ShowComplexResult(shared.clone()), &mut sink);

        assert!(flow.is_continue());
        assert_eq!(sink.images, vec![(64, 48)]);
        assert_eq!(sink.texts, vec!["ABC123"]);
        // the producer's copy is untouched and unlocked
        assert_eq!(shared.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_status_events() {
        let mut consumer = ResultConsumer::new((64, 48), connected());
        let mut sink = RecordingSink::default();

        consumer.handle(
            AppEvent::ConnectionChanged(ConnectionState::Connected),
            &mut sink,
        );
        consumer.handle(
            AppEvent::ResultDropped(ResultId::new(ResultType::Image, 4)),
            &mut sink,
        );

        assert_eq!(
            sink.statuses,
            vec!["Reader Connected", "Partial result dropped: Image, id=4"]
        );
        assert!(consumer.handle(AppEvent::Shutdown, &mut sink).is_break());
    }

    #[tokio::test]
    async fn test_headless_loop_processes_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let snapshot_path = dir.path().join("last.png");
        let (tx, rx) = kanal::unbounded_async::<AppEvent>();

        let config = UiConfig {
            display_width: 32,
            display_height: 32,
            headless: true,
            snapshot_path: Some(snapshot_path.clone()),
        };
        let handle = tokio::spawn(headless_loop(rx, config, connected()));

        for width in [16, 64] {
            let shared =
                ComplexResult::new(vec![SimpleResult::new(ResultType::Image, 1, png(width, 8))])
                    .into_shared();
            tx.send(AppEvent::ShowComplexResult(shared)).await.unwrap();
        }
        tx.send(AppEvent::Shutdown).await.unwrap();

        let result = timeout(Duration::from_secs(5), handle).await;
        assert!(matches!(result, Ok(Ok(Ok(())))), "display loop did not stop");

        let last = image::open(&snapshot_path).unwrap();
        assert_eq!((last.width(), last.height()), (32, 4));
    }
}
