use crate::types::{CaptureConfig, SessionEvent};
use crate::{BridgeError, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// The capture-session surface of the sensor SDK.
///
/// The SDK's session object is an external collaborator; the bridge only
/// needs these four calls. `start_monitoring`/`start_streaming` report
/// success the way the SDK does, as a plain bool.
pub trait CaptureSession: Send {
    fn start_monitoring(&mut self, config: &CaptureConfig) -> bool;
    fn start_streaming(&mut self) -> bool;
    fn stop_streaming(&mut self);
    fn serial_number(&self) -> String;
}

/// Where the controller currently sits in the streaming lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Stopped,
    Monitoring,
    Streaming,
    /// A stream start failed; a retry is armed for the next Ready event.
    AwaitingRetry,
}

/// Start/stop/retry state machine around the capture session.
///
/// Shared between the host thread (`setup`/`start`/`stop`) and the SDK
/// callback thread (`handle_event`), so streaming state lives in atomics
/// and the session object behind its own mutex. Asynchronous faults are
/// logged and folded into the streaming flag; they are never fatal, and
/// `start()`/`stop()` remain callable after any event.
pub struct SessionController<S: CaptureSession> {
    session: Mutex<S>,
    monitoring: AtomicBool,
    is_streaming: AtomicBool,
    stream_on_ready: AtomicBool,
}

impl<S: CaptureSession> SessionController<S> {
    pub fn new(session: S) -> Self {
        Self {
            session: Mutex::new(session),
            monitoring: AtomicBool::new(false),
            is_streaming: AtomicBool::new(false),
            stream_on_ready: AtomicBool::new(false),
        }
    }

    fn session(&self) -> MutexGuard<'_, S> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Begin monitoring the sensor.
    ///
    /// The SDK's success/failure result is propagated to the caller, not
    /// just logged.
    pub fn setup(&self, config: &CaptureConfig) -> Result<()> {
        let serial = self.serial();
        if self.session().start_monitoring(config) {
            self.monitoring.store(true, Ordering::Release);
            log::info!("Sensor {} initialized.", serial);
            Ok(())
        } else {
            log::error!("Sensor {} failed to initialize.", serial);
            Err(BridgeError::Initialization { serial })
        }
    }

    /// Attempt to begin streaming.
    ///
    /// On failure the first attempt arms a retry for the next Ready event;
    /// later failures while the retry is pending return the error without
    /// re-arming or re-logging.
    pub fn start(&self) -> Result<()> {
        let serial = self.serial();
        let streaming = self.session().start_streaming();
        self.is_streaming.store(streaming, Ordering::Release);

        if streaming {
            return Ok(());
        }
        if !self.stream_on_ready.swap(true, Ordering::AcqRel) {
            log::warn!(
                "Sensor {} didn't start, will retry on Ready signal (call stop() to cancel)...",
                serial
            );
        }
        Err(BridgeError::StreamStart { serial })
    }

    /// Stop streaming and cancel any pending retry.
    pub fn stop(&self) {
        self.session().stop_streaming();
        self.monitoring.store(false, Ordering::Release);
        self.is_streaming.store(false, Ordering::Release);
        self.stream_on_ready.store(false, Ordering::Release);
    }

    /// Process a session event from the SDK callback thread.
    pub fn handle_event(&self, event: SessionEvent) {
        let serial = self.serial();
        match event {
            SessionEvent::Booting => {
                log::debug!("Sensor {} is booting...", serial);
            }
            SessionEvent::Ready => {
                log::info!("Sensor {} is ready.", serial);
                if self.stream_on_ready.load(Ordering::Acquire) {
                    log::info!("Sensor {} is starting...", serial);
                    if let Err(err) = self.start() {
                        log::debug!("Deferred start failed, retry stays armed: {}", err);
                    }
                }
            }
            SessionEvent::Connected => {
                log::debug!("Sensor {} is connected.", serial);
            }
            SessionEvent::Streaming => {
                log::debug!("Sensor {} is streaming.", serial);
                self.is_streaming.store(true, Ordering::Release);
            }
            SessionEvent::Disconnected => {
                log::error!("Sensor {} - disconnected!", serial);
                self.is_streaming.store(false, Ordering::Release);
            }
            SessionEvent::Error => {
                log::error!("Sensor {} - capture error!", serial);
            }
            SessionEvent::Unknown(tag) => {
                log::warn!("Sensor {} - unhandled capture session event {}", serial, tag);
            }
        }
    }

    pub fn is_streaming(&self) -> bool {
        self.is_streaming.load(Ordering::Acquire)
    }

    pub fn retry_pending(&self) -> bool {
        self.stream_on_ready.load(Ordering::Acquire)
    }

    pub fn state(&self) -> SessionState {
        if self.is_streaming() {
            SessionState::Streaming
        } else if self.retry_pending() {
            SessionState::AwaitingRetry
        } else if self.monitoring.load(Ordering::Acquire) {
            SessionState::Monitoring
        } else {
            SessionState::Stopped
        }
    }

    pub fn serial(&self) -> String {
        self.session().serial_number()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_log;
    use std::collections::VecDeque;
    use std::sync::Arc;

    #[derive(Default)]
    struct MockInner {
        monitor_ok: bool,
        stream_results: VecDeque<bool>,
        stream_calls: usize,
        stop_calls: usize,
        serial: String,
    }

    #[derive(Clone)]
    struct MockSession(Arc<Mutex<MockInner>>);

    impl MockSession {
        fn new(serial: &str, monitor_ok: bool, stream_results: &[bool]) -> Self {
            Self(Arc::new(Mutex::new(MockInner {
                monitor_ok,
                stream_results: stream_results.iter().copied().collect(),
                serial: serial.to_string(),
                ..MockInner::default()
            })))
        }

        fn inner(&self) -> MutexGuard<'_, MockInner> {
            self.0.lock().unwrap()
        }
    }

    impl CaptureSession for MockSession {
        fn start_monitoring(&mut self, _config: &CaptureConfig) -> bool {
            self.inner().monitor_ok
        }

        fn start_streaming(&mut self) -> bool {
            let mut inner = self.inner();
            inner.stream_calls += 1;
            inner.stream_results.pop_front().unwrap_or(false)
        }

        fn stop_streaming(&mut self) {
            self.inner().stop_calls += 1;
        }

        fn serial_number(&self) -> String {
            self.inner().serial.clone()
        }
    }

    #[test]
    fn setup_propagates_sdk_result() {
        let good = SessionController::new(MockSession::new("A", true, &[]));
        assert!(good.setup(&CaptureConfig::default()).is_ok());
        assert_eq!(good.state(), SessionState::Monitoring);

        let bad = SessionController::new(MockSession::new("B", false, &[]));
        assert!(bad.setup(&CaptureConfig::default()).is_err());
        assert_eq!(bad.state(), SessionState::Stopped);
    }

    #[test]
    fn start_success_enters_streaming() {
        let ctrl = SessionController::new(MockSession::new("C", true, &[true]));
        assert!(ctrl.start().is_ok());
        assert!(ctrl.is_streaming());
        assert!(!ctrl.retry_pending());
        assert_eq!(ctrl.state(), SessionState::Streaming);
    }

    #[test]
    fn start_failure_arms_retry_once() {
        test_log::install();
        let mock = MockSession::new("RETRY-ONCE", true, &[false, false]);
        let ctrl = SessionController::new(mock.clone());

        assert!(ctrl.start().is_err());
        assert!(ctrl.retry_pending());
        assert!(!ctrl.is_streaming());
        assert_eq!(ctrl.state(), SessionState::AwaitingRetry);

        // Second failure keeps the retry armed without re-logging.
        assert!(ctrl.start().is_err());
        assert!(ctrl.retry_pending());
        assert!(!ctrl.is_streaming());
        assert_eq!(mock.inner().stream_calls, 2);

        let warns = test_log::take_matching("RETRY-ONCE")
            .into_iter()
            .filter(|(level, msg)| *level == log::Level::Warn && msg.contains("will retry"))
            .count();
        assert_eq!(warns, 1);
    }

    #[test]
    fn ready_event_triggers_armed_retry() {
        let mock = MockSession::new("D", true, &[false, true]);
        let ctrl = SessionController::new(mock.clone());

        assert!(ctrl.start().is_err());
        ctrl.handle_event(SessionEvent::Ready);

        assert!(ctrl.is_streaming());
        assert_eq!(mock.inner().stream_calls, 2);
    }

    #[test]
    fn stop_cancels_pending_retry() {
        let mock = MockSession::new("E", true, &[false, true]);
        let ctrl = SessionController::new(mock.clone());

        assert!(ctrl.start().is_err());
        ctrl.stop();
        assert_eq!(ctrl.state(), SessionState::Stopped);

        // Ready after stop() must not restart streaming.
        ctrl.handle_event(SessionEvent::Ready);
        assert!(!ctrl.is_streaming());
        assert_eq!(mock.inner().stream_calls, 1);
        assert_eq!(mock.inner().stop_calls, 1);
    }

    #[test]
    fn streaming_and_disconnect_events_force_flag() {
        let ctrl = SessionController::new(MockSession::new("F", true, &[]));

        ctrl.handle_event(SessionEvent::Streaming);
        assert!(ctrl.is_streaming());

        ctrl.handle_event(SessionEvent::Disconnected);
        assert!(!ctrl.is_streaming());
    }

    #[test]
    fn informational_events_change_nothing() {
        let ctrl = SessionController::new(MockSession::new("G", true, &[]));
        for event in [
            SessionEvent::Booting,
            SessionEvent::Connected,
            SessionEvent::Error,
            SessionEvent::Unknown(99),
        ] {
            ctrl.handle_event(event);
            assert_eq!(ctrl.state(), SessionState::Stopped);
        }
    }
}
