//! BDD test world: bootstrap state plus a `someipd` instance and control
//! client for end-to-end steps.

use std::cell::RefCell;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use control_channel::{
    ClientError, ClientFactory, ControlClient, PROTOCOL_CONFIG, SocketClient, SocketClientFactory,
};

use crate::bootstrap::{BootstrapError, ConfigLoader, Daemon, StaticConfigLoader, bootstrap_with};
use crate::health::HealthReporter;
use crate::shutdown::ShutdownToken;
use crate::someipd::{CommandProcessor, LoggingProcessor, SomeipdError, run_someipd_with};

use super::config_loader::{FailingConfigLoader, TestConfigLoader};
use super::reporter::RecordingHealthReporter;

struct RunningSomeipd {
    shutdown: ShutdownToken,
    handle: JoinHandle<Result<(), SomeipdError>>,
}

/// Scenario world shared across BDD steps.
pub struct TestWorld {
    pub loader: TestConfigLoader,
    use_failing_loader: bool,
    pub reporter: Arc<RecordingHealthReporter>,
    pub processor: Arc<LoggingProcessor>,
    daemon: Option<Daemon>,
    bootstrap_error: Option<BootstrapError>,
    someipd: Option<RunningSomeipd>,
    someipd_result: Option<Result<(), SomeipdError>>,
    client: Option<SocketClient>,
    pub results: Vec<Result<Vec<u8>, ClientError>>,
}

impl TestWorld {
    /// Builds a world with a successful configuration loader.
    #[must_use]
    pub fn new() -> Self {
        Self {
            loader: TestConfigLoader::new(),
            use_failing_loader: false,
            reporter: Arc::new(RecordingHealthReporter::default()),
            processor: Arc::new(LoggingProcessor::default()),
            daemon: None,
            bootstrap_error: None,
            someipd: None,
            someipd_result: None,
            client: None,
            results: Vec::new(),
        }
    }

    /// Installs a loader that always fails.
    pub fn use_failing_loader(&mut self) {
        self.use_failing_loader = true;
        self.reset_results();
    }

    /// Installs a loader that succeeds.
    pub fn use_successful_loader(&mut self) {
        self.use_failing_loader = false;
        self.reset_results();
    }

    /// Runs the bootstrap sequence once.
    pub fn bootstrap(&mut self) {
        if self.daemon.is_some() || self.bootstrap_error.is_some() {
            return;
        }
        let loader: &dyn ConfigLoader = if self.use_failing_loader {
            &FailingConfigLoader
        } else {
            &self.loader
        };
        let reporter: Arc<dyn HealthReporter> = self.reporter.clone();
        match bootstrap_with(loader, reporter) {
            Ok(daemon) => self.daemon = Some(daemon),
            Err(error) => self.bootstrap_error = Some(error),
        }
    }

    /// Returns whether bootstrap produced an error.
    #[must_use]
    pub fn bootstrap_error(&self) -> Option<&BootstrapError> {
        self.bootstrap_error.as_ref()
    }

    /// Returns the bootstrapped daemon, if any.
    #[must_use]
    pub fn daemon(&self) -> Option<&Daemon> {
        self.daemon.as_ref()
    }

    /// Starts `someipd` on a background thread and waits for its socket.
    pub fn start_someipd(&mut self) {
        let loader = StaticConfigLoader::new(self.loader.config());
        let reporter: Arc<dyn HealthReporter> = self.reporter.clone();
        let processor: Arc<dyn CommandProcessor> = self.processor.clone();
        let shutdown = ShutdownToken::new();
        let signal = shutdown.clone();
        let handle =
            thread::spawn(move || run_someipd_with(&loader, reporter, processor, &signal));
        self.someipd = Some(RunningSomeipd { shutdown, handle });

        let socket = self.loader.path("control.sock");
        let deadline = Instant::now() + Duration::from_secs(2);
        while !socket.exists() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(10));
        }
        assert!(socket.exists(), "someipd did not create {socket}");
    }

    /// Stops `someipd` and records its exit result.
    pub fn stop_someipd(&mut self) {
        self.client = None;
        if let Some(RunningSomeipd { shutdown, handle }) = self.someipd.take() {
            shutdown.cancel();
            self.someipd_result = Some(handle.join().expect("someipd thread panicked"));
        }
    }

    /// Exit result of a stopped `someipd`.
    #[must_use]
    pub fn someipd_result(&self) -> Option<&Result<(), SomeipdError>> {
        self.someipd_result.as_ref()
    }

    /// Connects a control client to the test endpoint.
    pub fn connect_client(&mut self) {
        let mut client =
            SocketClientFactory::new(self.loader.endpoint()).create(&PROTOCOL_CONFIG);
        client.start().expect("control client should connect");
        self.client = Some(client);
    }

    /// Sends `message` through the connected client and records the outcome.
    pub fn send(&mut self, message: &[u8]) {
        let client = self.client.as_mut().expect("control client not connected");
        self.results.push(client.send_wait_reply(message));
    }

    fn reset_results(&mut self) {
        self.daemon = None;
        self.bootstrap_error = None;
    }
}

impl Default for TestWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for TestWorld {
    fn drop(&mut self) {
        self.client = None;
        if let Some(RunningSomeipd { shutdown, handle }) = self.someipd.take() {
            shutdown.cancel();
            let _ = handle.join();
        }
    }
}

/// Fresh world for a scenario.
pub fn world() -> RefCell<TestWorld> {
    RefCell::new(TestWorld::new())
}
