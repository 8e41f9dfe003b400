//! Backend lifecycle: launching, initialization and readiness monitoring.

mod readiness;

pub use readiness::{Readiness, ReadinessState};

use crate::classifier::Classifier;
use crate::config::{BackendConfig, ProcessConfig};
use crate::error::{Error, Result};
use std::process::Stdio;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

/// Supervisor timing and process settings.
#[derive(Debug, Clone)]
pub struct SupervisorSettings {
    /// Startup readiness window.
    pub ready_timeout: Duration,
    /// Interval between probes.
    pub poll_interval: Duration,
    /// Allowance for an owned process to exit on stop.
    pub shutdown_timeout: Duration,
    /// Backend process to launch, if any.
    pub process: Option<ProcessConfig>,
}

impl From<&BackendConfig> for SupervisorSettings {
    fn from(config: &BackendConfig) -> Self {
        Self {
            ready_timeout: config.ready_timeout(),
            poll_interval: config.poll_interval(),
            shutdown_timeout: config.shutdown_timeout(),
            process: config.process.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Startup {
    Ready,
    TimedOut,
    ProcessExited,
}

/// Owns the classifier backend's lifecycle and publishes its readiness.
pub struct ClassifierSupervisor {
    classifier: Arc<dyn Classifier>,
    readiness: Readiness,
    settings: SupervisorSettings,
    child: tokio::sync::Mutex<Option<Child>>,
    monitor: Mutex<Option<JoinHandle<()>>>,
}

impl ClassifierSupervisor {
    /// Create a supervisor. Nothing runs until [`Self::start`].
    pub fn new(classifier: Arc<dyn Classifier>, settings: SupervisorSettings) -> Arc<Self> {
        Arc::new(Self {
            classifier,
            readiness: Readiness::new(),
            settings,
            child: tokio::sync::Mutex::new(None),
            monitor: Mutex::new(None),
        })
    }

    /// Readiness handle shared with request handlers.
    pub fn readiness(&self) -> Readiness {
        self.readiness.clone()
    }

    /// Non-blocking readiness check.
    pub fn is_ready(&self) -> bool {
        self.readiness.is_ready()
    }

    /// Launch the owned backend process, if configured, and start the
    /// background monitor. Returns without waiting for readiness.
    pub async fn start(self: &Arc<Self>) -> Result<()> {
        if let Some(process) = &self.settings.process {
            let child = spawn_process(process).inspect_err(|e| {
                self.readiness.set_failed(e.to_string());
            })?;
            info!(
                "Started backend process '{}' (pid {})",
                process.command,
                child.id().map_or_else(|| "?".to_string(), |id| id.to_string())
            );
            *self.child.lock().await = Some(child);
        }

        let supervisor = Arc::clone(self);
        let handle = tokio::spawn(async move { supervisor.monitor().await });
        *self.monitor.lock().unwrap_or_else(PoisonError::into_inner) = Some(handle);
        Ok(())
    }

    /// Probe until the backend answers or `timeout` elapses. Marks the
    /// backend ready on success, or failed if the owned process exits
    /// first.
    pub async fn wait_until_ready(&self, timeout: Duration) -> bool {
        self.await_startup(timeout).await == Startup::Ready
    }

    async fn await_startup(&self, timeout: Duration) -> Startup {
        let deadline = Instant::now() + timeout;

        loop {
            if let Some(reason) = self.owned_process_exit().await {
                error!("{reason}");
                self.readiness.set_failed(reason);
                return Startup::ProcessExited;
            }

            if self.classifier.probe().await {
                self.readiness.set_ready();
                return Startup::Ready;
            }

            let now = Instant::now();
            if now >= deadline {
                return Startup::TimedOut;
            }
            tokio::time::sleep(self.settings.poll_interval.min(deadline - now)).await;
        }
    }

    /// Stop monitoring and terminate the owned backend process.
    pub async fn stop(&self) {
        if let Some(handle) = self
            .monitor
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            handle.abort();
        }

        let Some(mut child) = self.child.lock().await.take() else {
            return;
        };

        if let Err(e) = child.start_kill() {
            warn!("Failed to signal backend process: {e}");
        }

        match tokio::time::timeout(self.settings.shutdown_timeout, child.wait()).await {
            Ok(Ok(status)) => info!("Backend process stopped ({status})"),
            Ok(Err(e)) => warn!("Failed to wait for backend process: {e}"),
            Err(_) => warn!(
                "Backend process did not exit within {}s",
                self.settings.shutdown_timeout.as_secs()
            ),
        }
    }

    async fn monitor(self: Arc<Self>) {
        info!("Initializing {} classifier", self.classifier.kind());
        if let Err(e) = self.classifier.initialize().await {
            error!("Classifier initialization failed: {e}");
            self.readiness.set_failed(e.to_string());
            return;
        }

        match self.await_startup(self.settings.ready_timeout).await {
            Startup::Ready => info!("Classifier backend is ready"),
            Startup::ProcessExited => return,
            Startup::TimedOut => {
                let reason = format!(
                    "backend not ready within {}s",
                    self.settings.ready_timeout.as_secs()
                );
                warn!("{reason}, continuing to poll");
                self.readiness.set_failed(reason);
            }
        }

        let mut ticker = tokio::time::interval(self.settings.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.tick().await;

        loop {
            ticker.tick().await;

            if let Some(reason) = self.owned_process_exit().await {
                error!("{reason}");
                self.readiness.set_failed(reason);
                return;
            }

            let alive = self.classifier.probe().await;
            match (alive, self.readiness.state()) {
                (true, ReadinessState::Ready) | (false, ReadinessState::Failed) => {}
                (true, _) => {
                    info!("Classifier backend is ready");
                    self.readiness.set_ready();
                }
                (false, _) => {
                    warn!("Classifier backend stopped answering");
                    self.readiness.set_failed("backend stopped answering health probes");
                }
            }
        }
    }

    /// Exit description if the owned process has terminated.
    async fn owned_process_exit(&self) -> Option<String> {
        let mut guard = self.child.lock().await;
        let child = guard.as_mut()?;

        match child.try_wait() {
            Ok(Some(status)) => {
                guard.take();
                Some(format!("backend process exited ({status})"))
            }
            Ok(None) => None,
            Err(e) => {
                debug!("Could not poll backend process: {e}");
                None
            }
        }
    }
}

fn spawn_process(process: &ProcessConfig) -> Result<Child> {
    let mut command = Command::new(&process.command);
    command
        .args(&process.args)
        .envs(&process.env)
        .stdin(Stdio::null())
        .kill_on_drop(true);

    if let Some(dir) = &process.working_dir {
        command.current_dir(dir);
    }

    command.spawn().map_err(|source| Error::BackendSpawn {
        command: process.command.clone(),
        source,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::analysis::{LocationHint, RawDetection};
    use crate::classifier::ClassifierKind;
    use async_trait::async_trait;
    use std::collections::{BTreeMap, HashSet};
    use std::path::Path;
    use std::sync::atomic::{AtomicBool, Ordering};

    struct Toggle {
        alive: AtomicBool,
        fail_init: bool,
    }

    #[async_trait]
    impl Classifier for Toggle {
        fn kind(&self) -> ClassifierKind {
            ClassifierKind::Remote
        }

        async fn initialize(&self) -> Result<()> {
            if self.fail_init {
                return Err(Error::ClassifierBuild {
                    reason: "bad model".to_string(),
                });
            }
            Ok(())
        }

        async fn probe(&self) -> bool {
            self.alive.load(Ordering::SeqCst)
        }

        async fn classify(
            &self,
            _audio: &Path,
            _location: Option<&LocationHint>,
        ) -> Result<Vec<RawDetection>> {
            Ok(Vec::new())
        }

        async fn expected_species(&self, _: f64, _: f64, _: u32) -> Result<HashSet<String>> {
            Ok(HashSet::new())
        }
    }

    fn settings(ready_timeout_ms: u64) -> SupervisorSettings {
        SupervisorSettings {
            ready_timeout: Duration::from_millis(ready_timeout_ms),
            poll_interval: Duration::from_millis(10),
            shutdown_timeout: Duration::from_secs(5),
            process: None,
        }
    }

    fn toggle(alive: bool, fail_init: bool) -> Arc<Toggle> {
        Arc::new(Toggle {
            alive: AtomicBool::new(alive),
            fail_init,
        })
    }

    #[tokio::test]
    async fn test_becomes_ready() {
        let supervisor = ClassifierSupervisor::new(toggle(true, false), settings(1000));
        supervisor.start().await.unwrap();
        assert!(supervisor.readiness().wait_ready(Duration::from_secs(5)).await);
        supervisor.stop().await;
    }

    #[tokio::test]
    async fn test_wait_until_ready_times_out() {
        let supervisor = ClassifierSupervisor::new(toggle(false, false), settings(50));
        assert!(!supervisor.wait_until_ready(Duration::from_millis(50)).await);
        assert!(!supervisor.is_ready());
    }

    #[tokio::test]
    async fn test_late_backend_flips_to_ready() {
        let classifier = toggle(false, false);
        let supervisor = ClassifierSupervisor::new(classifier.clone(), settings(20));
        supervisor.start().await.unwrap();

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(supervisor.readiness().state(), ReadinessState::Failed);

        classifier.alive.store(true, Ordering::SeqCst);
        assert!(supervisor.readiness().wait_ready(Duration::from_secs(5)).await);
        supervisor.stop().await;
    }

    #[tokio::test]
    async fn test_backend_going_away_flips_to_failed() {
        let classifier = toggle(true, false);
        let supervisor = ClassifierSupervisor::new(classifier.clone(), settings(1000));
        supervisor.start().await.unwrap();
        assert!(supervisor.readiness().wait_ready(Duration::from_secs(5)).await);

        classifier.alive.store(false, Ordering::SeqCst);
        let deadline = Instant::now() + Duration::from_secs(5);
        while supervisor.readiness().state() != ReadinessState::Failed
            && Instant::now() < deadline
        {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(supervisor.readiness().state(), ReadinessState::Failed);
        supervisor.stop().await;
    }

    #[tokio::test]
    async fn test_initialize_failure_is_terminal() {
        let supervisor = ClassifierSupervisor::new(toggle(true, true), settings(1000));
        supervisor.start().await.unwrap();

        let deadline = Instant::now() + Duration::from_secs(5);
        while supervisor.readiness().state() != ReadinessState::Failed
            && Instant::now() < deadline
        {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(supervisor.readiness().state(), ReadinessState::Failed);
        assert!(supervisor.readiness().last_error().unwrap().contains("bad model"));
        supervisor.stop().await;
    }

    #[tokio::test]
    async fn test_spawn_failure_reported() {
        let mut s = settings(1000);
        s.process = Some(ProcessConfig {
            command: "/nonexistent/birdnet-server".to_string(),
            args: Vec::new(),
            working_dir: None,
            env: BTreeMap::new(),
        });
        let supervisor = ClassifierSupervisor::new(toggle(true, false), s);
        let result = supervisor.start().await;
        assert!(matches!(result, Err(Error::BackendSpawn { .. })));
        assert_eq!(supervisor.readiness().state(), ReadinessState::Failed);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_owned_process_exit_flips_to_failed() {
        let mut s = settings(1000);
        s.process = Some(ProcessConfig {
            command: "sh".to_string(),
            args: vec!["-c".to_string(), "exit 3".to_string()],
            working_dir: None,
            env: BTreeMap::new(),
        });
        let supervisor = ClassifierSupervisor::new(toggle(true, false), s);
        supervisor.start().await.unwrap();

        let deadline = Instant::now() + Duration::from_secs(5);
        while !supervisor
            .readiness()
            .last_error()
            .is_some_and(|e| e.contains("exited"))
            && Instant::now() < deadline
        {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(supervisor.readiness().state(), ReadinessState::Failed);
        supervisor.stop().await;
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_process_exit_during_startup_fails_fast() {
        let mut s = settings(60_000);
        s.process = Some(ProcessConfig {
            command: "sh".to_string(),
            args: vec!["-c".to_string(), "exit 3".to_string()],
            working_dir: None,
            env: BTreeMap::new(),
        });
        let supervisor = ClassifierSupervisor::new(toggle(false, false), s);
        supervisor.start().await.unwrap();

        let deadline = Instant::now() + Duration::from_secs(5);
        while supervisor.readiness().state() != ReadinessState::Failed
            && Instant::now() < deadline
        {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(supervisor.readiness().state(), ReadinessState::Failed);
        assert!(supervisor.readiness().last_error().unwrap().contains("exited"));
        assert!(!supervisor.wait_until_ready(Duration::from_millis(50)).await);
        supervisor.stop().await;
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_stop_kills_owned_process() {
        let mut s = settings(1000);
        s.process = Some(ProcessConfig {
            command: "sleep".to_string(),
            args: vec!["30".to_string()],
            working_dir: None,
            env: BTreeMap::new(),
        });
        let supervisor = ClassifierSupervisor::new(toggle(true, false), s);
        supervisor.start().await.unwrap();

        let started = Instant::now();
        supervisor.stop().await;
        assert!(started.elapsed() < Duration::from_secs(5));
        assert!(supervisor.child.lock().await.is_none());
    }
}
