use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use dataman_config::session::SessionConfig;
use dataman_core::{DeviceSession, SessionError, SessionStatus};
use dataman_types::{ComplexResult, ConnectionState, DeviceEvent, ResultTypes, SystemInfo};
use kanal::Sender;

use crate::cycle::{Cycle, load_cycles};

const STOP_POLL: Duration = Duration::from_millis(20);

#[derive(Debug, Clone, Copy)]
pub struct ReplayOptions {
    /// Delay before each replayed trigger cycle
    pub trigger_interval: Duration,
    /// Start over once every cycle was played
    pub repeat: bool,
    /// Result kinds the recorded reader sends before any subscription
    pub result_types: ResultTypes,
}

impl From<&SessionConfig> for ReplayOptions {
    fn from(config: &SessionConfig) -> Self {
        Self {
            trigger_interval: Duration::from_millis(config.trigger_interval_ms),
            repeat: config.replay_repeat,
            result_types: config.result_types_mask(),
        }
    }
}

/// Session playing back recorded trigger cycles from the directory named by
/// the system's port
pub struct ReplaySession {
    system: SystemInfo,
    status: SessionStatus,
    events: Sender<DeviceEvent>,
    options: ReplayOptions,
    requested: Arc<AtomicU32>,
    stop: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl ReplaySession {
    pub fn new(
        system: SystemInfo,
        status: SessionStatus,
        events: Sender<DeviceEvent>,
        options: ReplayOptions,
    ) -> Self {
        Self {
            system,
            status,
            events,
            options,
            requested: Arc::new(AtomicU32::new(options.result_types.bits())),
            stop: Arc::new(AtomicBool::new(false)),
            worker: None,
        }
    }

    pub fn from_config(
        system: SystemInfo,
        config: &SessionConfig,
        status: SessionStatus,
        events: Sender<DeviceEvent>,
    ) -> Result<Self, SessionError> {
        let encoding = dataman_core::session::encoding_for_label(&config.text_encoding)?;
        status.set_encoding(encoding);
        Ok(Self::new(system, status, events, config.into()))
    }

    fn replay_dir(&self) -> PathBuf {
        PathBuf::from(&self.system.port_name)
    }
}

impl DeviceSession for ReplaySession {
    fn system(&self) -> &SystemInfo {
        &self.system
    }

    fn status(&self) -> &SessionStatus {
        &self.status
    }

    fn connect(&mut self) -> Result<(), SessionError> {
        if self.worker.is_some() {
            return Ok(());
        }

        self.status.set_state(ConnectionState::Connecting);

        let dir = self.replay_dir();
        if !dir.is_dir() {
            self.status.set_state(ConnectionState::Disconnected);
            return Err(SessionError::ConnectionFailed(format!(
                "{} is not a directory",
                dir.display()
            )));
        }

        let cycles = match load_cycles(&dir) {
            Ok(cycles) => cycles,
            Err(e) => {
                self.status.set_state(ConnectionState::Disconnected);
                return Err(e.into());
            }
        };
        if cycles.is_empty() {
            tracing::warn!("Replay directory {} holds no results", dir.display());
        }

        self.stop.store(false, Ordering::Release);
        self.status.set_state(ConnectionState::Connected);
        self.events
            .send(DeviceEvent::Connected)
            .map_err(|_| SessionError::ChannelClosed)?;

        let producer = Producer {
            cycles,
            options: self.options,
            requested: self.requested.clone(),
            stop: self.stop.clone(),
            events: self.events.clone(),
        };

        match std::thread::Builder::new()
            .name("dataman-replay".to_string())
            .spawn(move || producer.run())
        {
            Ok(worker) => {
                self.worker = Some(worker);
                Ok(())
            }
            Err(e) => {
                self.status.set_state(ConnectionState::Disconnected);
                Err(e.into())
            }
        }
    }

    fn set_result_types(&mut self, types: ResultTypes) -> Result<(), SessionError> {
        if !self.status.is_connected() {
            return Err(SessionError::NotConnected);
        }

        self.requested.store(types.bits(), Ordering::Release);
        tracing::debug!("Result types set to {types}");
        Ok(())
    }

    fn disconnect(&mut self) {
        let Some(worker) = self.worker.take() else {
            return;
        };

        self.status.set_state(ConnectionState::Disconnecting);
        self.stop.store(true, Ordering::Release);
        if worker.join().is_err() {
            tracing::error!("Replay thread panicked");
        }

        self.status.set_state(ConnectionState::Disconnected);
        // Nobody may be draining the channel any more
        if !matches!(self.events.try_send(DeviceEvent::Disconnected), Ok(true)) {
            tracing::debug!("Disconnect event not delivered");
        }
    }
}

impl Drop for ReplaySession {
    fn drop(&mut self) {
        self.disconnect();
    }
}

/// State owned by the replay thread
struct Producer {
    cycles: Vec<Cycle>,
    options: ReplayOptions,
    requested: Arc<AtomicU32>,
    stop: Arc<AtomicBool>,
    events: Sender<DeviceEvent>,
}

impl Producer {
    fn run(self) {
        let mut next_id: i32 = 1;

        loop {
            for cycle in &self.cycles {
                if !self.wait(self.options.trigger_interval) {
                    return;
                }

                if !self.emit(cycle, next_id) {
                    tracing::debug!("Delivery stopped, ending replay");
                    return;
                }
                next_id = next_id.wrapping_add(1);
            }

            if !self.options.repeat || self.cycles.is_empty() {
                tracing::info!("Replay finished after {} cycles", next_id - 1);
                return;
            }
        }
    }

    /// Sleep for `duration`; false once a stop was requested
    fn wait(&self, duration: Duration) -> bool {
        let deadline = Instant::now() + duration;
        loop {
            if self.stop.load(Ordering::Acquire) {
                return false;
            }
            let now = Instant::now();
            if now >= deadline {
                return true;
            }
            std::thread::sleep(STOP_POLL.min(deadline - now));
        }
    }

    /// Send an event, waiting while the channel is full. False once a stop
    /// was requested or the receiver is gone.
    fn deliver(&self, event: DeviceEvent) -> bool {
        let mut pending = Some(event);
        loop {
            match self.events.try_send_option(&mut pending) {
                Ok(true) => return true,
                Ok(false) => {
                    if self.stop.load(Ordering::Acquire) {
                        return false;
                    }
                    std::thread::sleep(STOP_POLL);
                }
                Err(_) => return false,
            }
        }
    }

    /// Deliver one cycle. A cycle missing any requested kind never completes,
    /// so its items are reported as dropped. False when delivery stopped.
    fn emit(&self, cycle: &Cycle, id: i32) -> bool {
        let requested = ResultTypes::from_bits_truncate(self.requested.load(Ordering::Acquire));
        let complex = ComplexResult::new(cycle.results(id, |t| requested.has(t)));

        if complex.is_empty() {
            tracing::debug!("Cycle {} carries no requested results", cycle.name);
            return true;
        }

        if complex.result_types().contains(requested) {
            return self.deliver(DeviceEvent::ComplexResultCompleted(complex.into_shared()));
        }

        tracing::debug!(
            "Cycle {} incomplete: got {}, requested {}",
            cycle.name,
            complex.result_types(),
            requested
        );
        complex
            .simple_results
            .into_iter()
            .all(|result| self.deliver(DeviceEvent::SimpleResultDropped(result)))
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use dataman_types::ResultType;

    use super::*;

    fn fixture() -> tempfile::TempDir {
        let root = tempfile::tempdir().unwrap();
        let complete = root.path().join("001");
        let partial = root.path().join("002");
        fs::create_dir_all(&complete).unwrap();
        fs::create_dir_all(&partial).unwrap();

        fs::write(complete.join("a.png"), b"png bytes").unwrap();
        fs::write(complete.join("b.xml"), "<result/>").unwrap();
        fs::write(partial.join("b.xml"), "<result/>").unwrap();
        root
    }

    fn session(root: &tempfile::TempDir, events: Sender<DeviceEvent>) -> ReplaySession {
        let system = SystemInfo {
            name: "replay".to_string(),
            port_name: root.path().display().to_string(),
            baud_rate: 115_200,
        };
        ReplaySession::new(
            system,
            SessionStatus::default(),
            events,
            ReplayOptions {
                trigger_interval: Duration::from_millis(1),
                repeat: false,
                result_types: ResultTypes::READ_XML | ResultTypes::IMAGE,
            },
        )
    }

    #[test]
    fn test_replay_delivers_complete_and_dropped() {
        let root = fixture();
        let (tx, rx) = kanal::unbounded();
        let mut session = session(&root, tx);

        session.connect().unwrap();
        session
            .set_result_types(ResultTypes::READ_XML | ResultTypes::IMAGE)
            .unwrap();
        assert!(session.status().is_connected());

        assert!(matches!(rx.recv().unwrap(), DeviceEvent::Connected));

        match rx.recv().unwrap() {
            DeviceEvent::ComplexResultCompleted(shared) => {
                let complex = shared.lock().unwrap();
                assert_eq!(complex.len(), 2);
                assert_eq!(complex.simple_results[0].id.result_type, ResultType::Image);
                assert_eq!(complex.simple_results[0].id.id, 1);
            }
            other => panic!("unexpected event {other:?}"),
        }

        match rx.recv().unwrap() {
            DeviceEvent::SimpleResultDropped(result) => {
                assert_eq!(result.id.result_type, ResultType::ReadXml);
                assert_eq!(result.id.id, 2);
            }
            other => panic!("unexpected event {other:?}"),
        }

        session.disconnect();
        assert_eq!(session.status().state(), ConnectionState::Disconnected);
        assert!(matches!(rx.recv().unwrap(), DeviceEvent::Disconnected));
    }

    #[test]
    fn test_disconnect_with_undrained_channel() {
        let root = fixture();
        let (tx, rx) = kanal::bounded(4);
        let mut session = ReplaySession::new(
            SystemInfo {
                name: "replay".to_string(),
                port_name: root.path().display().to_string(),
                baud_rate: 115_200,
            },
            SessionStatus::default(),
            tx,
            ReplayOptions {
                trigger_interval: Duration::ZERO,
                repeat: true,
                result_types: ResultTypes::READ_XML | ResultTypes::IMAGE,
            },
        );

        session.connect().unwrap();
        // let the producer fill the channel and block on it
        std::thread::sleep(Duration::from_millis(200));
        assert!(rx.len() >= 4);

        let handle = std::thread::spawn(move || {
            session.disconnect();
            session.status().state()
        });

        let deadline = Instant::now() + Duration::from_secs(3);
        while !handle.is_finished() {
            assert!(Instant::now() < deadline, "disconnect did not return");
            std::thread::sleep(Duration::from_millis(10));
        }
        assert_eq!(handle.join().unwrap(), ConnectionState::Disconnected);
        drop(rx);
    }

    #[test]
    fn test_cycles_without_requested_results_are_skipped() {
        let root = fixture();
        let (tx, rx) = kanal::unbounded();
        let mut session = session(&root, tx);
        session.options.result_types = ResultTypes::READ_STRING;
        session.requested.store(ResultTypes::READ_STRING.bits(), Ordering::Release);

        session.connect().unwrap();
        assert!(matches!(rx.recv().unwrap(), DeviceEvent::Connected));

        std::thread::sleep(Duration::from_millis(100));
        assert!(rx.try_recv().unwrap().is_none());

        session.disconnect();
        assert!(matches!(rx.recv().unwrap(), DeviceEvent::Disconnected));
    }

    #[test]
    fn test_connect_to_missing_directory_fails() {
        let root = tempfile::tempdir().unwrap();
        let missing = root.path().join("missing");
        let (tx, _rx) = kanal::unbounded();
        let mut session = ReplaySession::new(
            SystemInfo {
                name: "missing".to_string(),
                port_name: missing.display().to_string(),
                baud_rate: 9600,
            },
            SessionStatus::default(),
            tx,
            ReplayOptions {
                trigger_interval: Duration::from_millis(1),
                repeat: false,
                result_types: ResultTypes::READ_XML | ResultTypes::IMAGE,
            },
        );

        assert!(matches!(
            session.connect(),
            Err(SessionError::ConnectionFailed(_))
        ));
        assert_eq!(session.status().state(), ConnectionState::Disconnected);
    }

    #[test]
    fn test_subscribe_requires_connection() {
        let root = fixture();
        let (tx, _rx) = kanal::unbounded();
        let mut session = session(&root, tx);

        assert!(matches!(
            session.set_result_types(ResultTypes::IMAGE),
            Err(SessionError::NotConnected)
        ));
    }

    #[test]
    fn test_from_config_rejects_unknown_encoding() {
        let (tx, _rx) = kanal::unbounded();
        let config = SessionConfig {
            text_encoding: "no-such-encoding".to_string(),
            ..Default::default()
        };

        let result = ReplaySession::from_config(
            SystemInfo {
                name: "replay".to_string(),
                port_name: "replay".to_string(),
                baud_rate: 9600,
            },
            &config,
            SessionStatus::default(),
            tx,
        );

        assert!(matches!(result, Err(SessionError::UnknownEncoding(_))));
    }
}
