use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use chrono::Utc;
use serde::Serialize;
use tokio::process::Child;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;

use crate::classify::{classify, LineMarker};
use crate::error::{Result, SupervisorError};
use crate::events::{EventHub, OverlayEvent};
use crate::process::{self, LivenessProbe, OutputChunk, OutputStream, OverlayCommand, SysinfoProbe};

/// How long output is still drained after the process exited.
const OUTPUT_DRAIN_TIMEOUT: Duration = Duration::from_millis(250);

/// Lower bound for [`SupervisorConfig::liveness_interval`].
pub const MIN_LIVENESS_INTERVAL: Duration = Duration::from_millis(100);

/// Lifecycle state of the overlay process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum OverlayState {
    Idle,
    Starting,
    Running,
    Stopping,
    Stopped,
    Error,
}

impl OverlayState {
    /// Starting or Stopping.
    pub fn is_transitioning(self) -> bool {
        matches!(self, OverlayState::Starting | OverlayState::Stopping)
    }

    /// Whether a process handle exists in this state.
    pub fn has_process(self) -> bool {
        matches!(
            self,
            OverlayState::Starting | OverlayState::Running | OverlayState::Stopping
        )
    }
}

impl std::fmt::Display for OverlayState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            OverlayState::Idle => "idle",
            OverlayState::Starting => "starting",
            OverlayState::Running => "running",
            OverlayState::Stopping => "stopping",
            OverlayState::Stopped => "stopped",
            OverlayState::Error => "error",
        };
        f.write_str(name)
    }
}

/// Timing and buffer settings.
#[derive(Debug, Clone)]
pub struct SupervisorConfig {
    /// How long `start` waits for the ready marker.
    pub ready_timeout: Duration,
    /// How long `stop` waits after the cooperative signal.
    pub grace_period: Duration,
    /// How long to wait for the process to disappear after a forced kill.
    pub kill_timeout: Duration,
    /// Interval of the liveness check while Running. Raised to
    /// [`MIN_LIVENESS_INTERVAL`] when shorter.
    pub liveness_interval: Duration,
    /// Number of output lines kept for diagnostics.
    pub log_history: usize,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            ready_timeout: Duration::from_secs(15),
            grace_period: Duration::from_secs(5),
            kill_timeout: Duration::from_secs(5),
            liveness_interval: Duration::from_secs(3),
            log_history: 500,
        }
    }
}

/// Snapshot of the supervisor for late subscribers and status queries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SupervisorStatus {
    pub state: OverlayState,
    pub pid: Option<u32>,
    pub generation: u64,
    /// The game was injected and the overlay waits for it to exit.
    pub waiting_for_exit: bool,
    pub last_log_line: Option<String>,
    pub last_error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    Started { pid: Option<u32>, generation: u64 },
    AlreadyRunning { pid: Option<u32>, generation: u64 },
}

impl StartOutcome {
    pub fn generation(&self) -> u64 {
        match self {
            StartOutcome::Started { generation, .. }
            | StartOutcome::AlreadyRunning { generation, .. } => *generation,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    /// The process exited within the grace period.
    Stopped,
    /// The process had to be killed, either after the grace period or
    /// because the platform cannot ask it to exit (Windows).
    ForceKilled,
    /// Nothing was running.
    NotRunning,
}

enum Control {
    Terminate,
    Kill,
}

/// Why a stopping process was killed instead of exiting on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KillReason {
    GraceExpired,
    /// The platform has no cooperative termination signal.
    NoTermSignal,
}

enum StartSignal {
    Ready,
    Exited(Option<i32>),
}

struct ProcessHandle {
    generation: u64,
    pid: Option<u32>,
    control: mpsc::UnboundedSender<Control>,
}

impl ProcessHandle {
    fn send(&self, control: Control) {
        // The monitor is gone only after the process exited.
        let _ = self.control.send(control);
    }
}

struct Core {
    state: OverlayState,
    generation: u64,
    process: Option<ProcessHandle>,
    pending_start: Option<oneshot::Sender<StartSignal>>,
    /// Resolved with whether the process had to be killed.
    pending_stop: Option<oneshot::Sender<bool>>,
    kill_reason: Option<KillReason>,
    start_timed_out: bool,
    waiting_for_exit: bool,
    last_error: Option<String>,
    last_log_line: Option<String>,
    log_history: VecDeque<String>,
    liveness: Option<JoinHandle<()>>,
}

impl Core {
    fn new() -> Self {
        Self {
            state: OverlayState::Idle,
            generation: 0,
            process: None,
            pending_start: None,
            pending_stop: None,
            kill_reason: None,
            start_timed_out: false,
            waiting_for_exit: false,
            last_error: None,
            last_log_line: None,
            log_history: VecDeque::new(),
            liveness: None,
        }
    }

    fn current_process(&self, generation: u64) -> Option<&ProcessHandle> {
        self.process.as_ref().filter(|p| p.generation == generation)
    }

    fn pid(&self) -> Option<u32> {
        self.process.as_ref().and_then(|p| p.pid)
    }

    fn status(&self) -> SupervisorStatus {
        SupervisorStatus {
            state: self.state,
            pid: self.pid(),
            generation: self.generation,
            waiting_for_exit: self.waiting_for_exit,
            last_log_line: self.last_log_line.clone(),
            last_error: self.last_error.clone(),
        }
    }
}

struct Shared {
    core: Mutex<Core>,
    status: watch::Sender<SupervisorStatus>,
    events: Arc<EventHub>,
    probe: Box<dyn LivenessProbe>,
    config: SupervisorConfig,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Core> {
        self.core.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish_status(&self, core: &Core) {
        self.status.send_replace(core.status());
    }

    fn emit_stopped(
        &self,
        exit_error: bool,
        exit_code: Option<i32>,
        message: Option<String>,
        pid: Option<u32>,
    ) {
        self.events.publish(OverlayEvent::OverlayStopped {
            exit_error,
            exit_code,
            message,
            pid,
            time: Utc::now(),
        });
    }

    fn handle_output(&self, generation: u64, chunk: OutputChunk) {
        let lines = classify(&chunk.text);
        if lines.is_empty() {
            return;
        }

        let mut core = self.lock();
        let current = core.current_process(generation).is_some();
        let pid = core.current_process(generation).and_then(|p| p.pid);

        for line in lines {
            tracing::debug!(pid, stream = ?chunk.stream, "{}", line.text);

            if current {
                if core.log_history.len() >= self.config.log_history {
                    core.log_history.pop_front();
                }
                if self.config.log_history > 0 {
                    core.log_history.push_back(line.text.clone());
                }
                core.last_log_line = Some(line.text.clone());
            }

            let time = Utc::now();
            self.events.publish(match chunk.stream {
                OutputStream::Stdout => OverlayEvent::StdoutLine {
                    content: line.text,
                    time,
                },
                OutputStream::Stderr => OverlayEvent::StderrLine {
                    content: line.text,
                    time,
                },
            });

            if !current {
                continue;
            }

            match (line.marker, core.state) {
                // A start that already timed out no longer accepts the marker.
                (Some(LineMarker::Ready), OverlayState::Starting)
                    if core.pending_start.is_some() =>
                {
                    core.state = OverlayState::Running;
                    core.waiting_for_exit = false;
                    tracing::info!(pid, generation, "Overlay is running");
                    self.events.publish(OverlayEvent::OverlayStarted {
                        pid,
                        generation,
                        time: Utc::now(),
                    });
                    self.publish_status(&core);
                    if let Some(pending) = core.pending_start.take() {
                        let _ = pending.send(StartSignal::Ready);
                    }
                }
                (Some(LineMarker::Ready), OverlayState::Running) => core.waiting_for_exit = false,
                (Some(LineMarker::Exiting), OverlayState::Running) => core.waiting_for_exit = true,
                _ => {}
            }
        }

        self.publish_status(&core);
    }

    fn handle_exit(&self, generation: u64, exit: std::io::Result<std::process::ExitStatus>) {
        let exit_code = match &exit {
            Ok(status) => status.code(),
            Err(e) => {
                tracing::warn!(generation, error = %e, "Failed to wait for overlay process");
                None
            }
        };

        let mut core = self.lock();
        let Some(handle) = core.process.take_if_generation(generation) else {
            tracing::debug!(generation, ?exit_code, "Ignoring exit of retired overlay process");
            return;
        };

        let state = core.state;
        let (next, exit_error, message) = match state {
            OverlayState::Starting if core.start_timed_out => (
                OverlayState::Error,
                true,
                Some("Timeout waiting for overlay confirmation".to_string()),
            ),
            OverlayState::Starting => (
                OverlayState::Error,
                true,
                Some(SupervisorError::ExitedBeforeReady { exit_code }.to_string()),
            ),
            OverlayState::Stopping if core.kill_reason == Some(KillReason::GraceExpired) => (
                OverlayState::Stopped,
                true,
                Some("Overlay did not exit in time and was killed".to_string()),
            ),
            OverlayState::Stopping if core.kill_reason == Some(KillReason::NoTermSignal) => (
                OverlayState::Stopped,
                false,
                Some("Overlay was killed, no termination signal on this platform".to_string()),
            ),
            OverlayState::Stopping => (OverlayState::Stopped, false, None),
            _ => (
                OverlayState::Error,
                true,
                Some(format!(
                    "Overlay exited unexpectedly{}",
                    exit_code.map(|c| format!(" (exit code {c})")).unwrap_or_default()
                )),
            ),
        };

        if exit_error {
            tracing::warn!(pid = handle.pid, generation, ?exit_code, "Overlay stopped with error");
        } else {
            tracing::info!(pid = handle.pid, generation, ?exit_code, "Overlay stopped");
        }

        core.state = next;
        core.waiting_for_exit = false;
        core.last_error = if exit_error { message.clone() } else { None };
        self.emit_stopped(exit_error, exit_code, message, handle.pid);
        self.publish_status(&core);

        if let Some(pending) = core.pending_start.take() {
            let _ = pending.send(StartSignal::Exited(exit_code));
        }
        if let Some(pending) = core.pending_stop.take() {
            let _ = pending.send(core.kill_reason.is_some());
        }
    }

    /// Records that the stop of `generation` falls back to a kill right away.
    fn note_forced_stop(&self, generation: u64) {
        let mut core = self.lock();
        if core.state == OverlayState::Stopping && core.current_process(generation).is_some() {
            core.kill_reason = Some(KillReason::NoTermSignal);
        }
    }

    /// Gives up on the process of `generation` without waiting for its exit.
    fn force_retire(&self, generation: u64, reason: &str) {
        let mut core = self.lock();
        let Some(handle) = core.process.take_if_generation(generation) else {
            return;
        };
        handle.send(Control::Kill);

        tracing::error!(pid = handle.pid, generation, "{reason}");
        core.state = if core.state == OverlayState::Stopping {
            OverlayState::Stopped
        } else {
            OverlayState::Error
        };
        core.waiting_for_exit = false;
        core.last_error = Some(reason.to_string());
        self.emit_stopped(true, None, Some(reason.to_string()), handle.pid);
        self.publish_status(&core);

        core.pending_start = None;
        if let Some(pending) = core.pending_stop.take() {
            let _ = pending.send(true);
        }
    }

    fn check_liveness(&self) {
        let (generation, pid) = {
            let core = self.lock();
            if core.state != OverlayState::Running {
                return;
            }
            match core.process.as_ref() {
                Some(ProcessHandle {
                    generation,
                    pid: Some(pid),
                    ..
                }) => (*generation, *pid),
                _ => return,
            }
        };

        if self.probe.is_alive(pid) {
            return;
        }

        let mut core = self.lock();
        if core.state != OverlayState::Running {
            return;
        }
        let Some(handle) = core.process.take_if_generation(generation) else {
            return;
        };
        handle.send(Control::Kill);

        let message = "Overlay process is no longer running".to_string();
        tracing::warn!(pid, generation, "{message}");
        core.state = OverlayState::Error;
        core.waiting_for_exit = false;
        core.last_error = Some(message.clone());

        self.emit_stopped(true, None, Some(message), Some(pid));
        self.publish_status(&core);
    }
}

trait TakeIfGeneration {
    fn take_if_generation(&mut self, generation: u64) -> Option<ProcessHandle>;
}

impl TakeIfGeneration for Option<ProcessHandle> {
    fn take_if_generation(&mut self, generation: u64) -> Option<ProcessHandle> {
        if self.as_ref().is_some_and(|p| p.generation == generation) {
            self.take()
        } else {
            None
        }
    }
}

/// Owner of the single overlay process slot.
///
/// Cloning is cheap; clones share the same process and state.
#[derive(Clone)]
pub struct Supervisor {
    shared: Arc<Shared>,
}

impl std::fmt::Debug for Supervisor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Supervisor")
            .field("status", &self.status())
            .finish_non_exhaustive()
    }
}

impl Supervisor {
    pub fn new(config: SupervisorConfig) -> Self {
        Self::with_probe(config, SysinfoProbe)
    }

    pub fn with_probe(mut config: SupervisorConfig, probe: impl LivenessProbe + 'static) -> Self {
        if config.liveness_interval < MIN_LIVENESS_INTERVAL {
            tracing::warn!(
                interval = ?config.liveness_interval,
                "Liveness interval too short, using {:?}",
                MIN_LIVENESS_INTERVAL
            );
            config.liveness_interval = MIN_LIVENESS_INTERVAL;
        }

        let core = Core::new();
        let (status, _) = watch::channel(core.status());

        Self {
            shared: Arc::new(Shared {
                core: Mutex::new(core),
                status,
                events: Arc::new(EventHub::new()),
                probe: Box::new(probe),
                config,
            }),
        }
    }

    pub fn config(&self) -> &SupervisorConfig {
        &self.shared.config
    }

    pub fn state(&self) -> OverlayState {
        self.shared.lock().state
    }

    pub fn status(&self) -> SupervisorStatus {
        self.shared.lock().status()
    }

    /// Receiver that always holds the latest [`SupervisorStatus`].
    pub fn watch(&self) -> watch::Receiver<SupervisorStatus> {
        self.shared.status.subscribe()
    }

    pub fn events(&self) -> Arc<EventHub> {
        Arc::clone(&self.shared.events)
    }

    /// Recent output lines, oldest first.
    pub fn log_history(&self) -> Vec<String> {
        self.shared.lock().log_history.iter().cloned().collect()
    }

    /// Launches the overlay and waits until it reports ready.
    ///
    /// Valid from Idle, Stopped and Error. Returns
    /// [`StartOutcome::AlreadyRunning`] when Running and
    /// [`SupervisorError::TransitionConflict`] while Starting or Stopping.
    pub async fn start(&self, command: OverlayCommand) -> Result<StartOutcome> {
        let (mut ready, generation) = {
            let mut core = self.shared.lock();
            let state = core.state;
            match state {
                OverlayState::Starting | OverlayState::Stopping => {
                    return Err(SupervisorError::TransitionConflict { state });
                }
                OverlayState::Running => {
                    return Ok(StartOutcome::AlreadyRunning {
                        pid: core.pid(),
                        generation: core.generation,
                    });
                }
                OverlayState::Idle | OverlayState::Stopped | OverlayState::Error => {}
            }

            tracing::info!(%command, "Starting overlay");
            let spawned = match process::spawn(&command) {
                Ok(spawned) => spawned,
                Err(source) => {
                    let error = SupervisorError::SpawnFailed {
                        program: command.program.to_string(),
                        source,
                    };
                    tracing::error!(error = %error, "Failed to start overlay");
                    core.state = OverlayState::Error;
                    core.last_error = Some(error.to_string());
                    self.shared.emit_stopped(true, None, Some(error.to_string()), None);
                    self.shared.publish_status(&core);
                    return Err(error);
                }
            };

            core.generation += 1;
            let generation = core.generation;
            let (control_tx, control_rx) = mpsc::unbounded_channel();
            let (ready_tx, ready_rx) = oneshot::channel();

            core.state = OverlayState::Starting;
            core.process = Some(ProcessHandle {
                generation,
                pid: spawned.pid,
                control: control_tx,
            });
            core.pending_start = Some(ready_tx);
            core.pending_stop = None;
            core.kill_reason = None;
            core.start_timed_out = false;
            core.waiting_for_exit = false;
            core.last_error = None;
            core.log_history.clear();

            tracing::debug!(pid = spawned.pid, generation, "Overlay process spawned");
            tokio::spawn(monitor(
                Arc::downgrade(&self.shared),
                generation,
                spawned.child,
                spawned.output,
                control_rx,
            ));

            if core.liveness.is_none() {
                core.liveness = Some(tokio::spawn(liveness_loop(
                    Arc::downgrade(&self.shared),
                    self.shared.config.liveness_interval,
                )));
            }

            self.shared.publish_status(&core);
            (ready_rx, generation)
        };

        let ready_timeout = self.shared.config.ready_timeout;
        if let Ok(signal) = tokio::time::timeout(ready_timeout, &mut ready).await {
            return self.resolve_start(generation, signal.ok());
        }

        let mut exited = {
            let mut core = self.shared.lock();
            if core.pending_start.is_none() || core.current_process(generation).is_none() {
                // Resolved while the timeout fired.
                drop(core);
                return self.resolve_start(generation, ready.try_recv().ok());
            }

            tracing::warn!(
                generation,
                ?ready_timeout,
                "Overlay did not confirm start in time, killing it"
            );
            core.start_timed_out = true;
            core.pending_start = None;
            let (exit_tx, exit_rx) = oneshot::channel();
            core.pending_stop = Some(exit_tx);
            if let Some(handle) = core.current_process(generation) {
                handle.send(Control::Kill);
            }
            exit_rx
        };

        if tokio::time::timeout(self.shared.config.kill_timeout, &mut exited)
            .await
            .is_err()
        {
            self.shared
                .force_retire(generation, "Overlay did not exit after being killed");
        }

        Err(SupervisorError::Timeout {
            after: ready_timeout,
        })
    }

    fn resolve_start(&self, generation: u64, signal: Option<StartSignal>) -> Result<StartOutcome> {
        match signal {
            Some(StartSignal::Ready) => Ok(StartOutcome::Started {
                pid: self.status().pid,
                generation,
            }),
            Some(StartSignal::Exited(exit_code)) => {
                Err(SupervisorError::ExitedBeforeReady { exit_code })
            }
            None => Err(SupervisorError::ExitedBeforeReady { exit_code: None }),
        }
    }

    /// Stops the overlay, escalating to a kill after the grace period.
    ///
    /// Valid from Running. Returns [`StopOutcome::NotRunning`] when there is
    /// no process and [`SupervisorError::TransitionConflict`] while Starting
    /// or Stopping.
    pub async fn stop(&self) -> Result<StopOutcome> {
        let (mut exited, generation) = {
            let mut core = self.shared.lock();
            let state = core.state;
            match state {
                OverlayState::Starting | OverlayState::Stopping => {
                    return Err(SupervisorError::TransitionConflict { state });
                }
                OverlayState::Idle | OverlayState::Stopped | OverlayState::Error => {
                    return Ok(StopOutcome::NotRunning);
                }
                OverlayState::Running => {}
            }

            let Some(handle) = core.process.as_ref() else {
                return Ok(StopOutcome::NotRunning);
            };
            let generation = handle.generation;
            tracing::info!(pid = handle.pid, generation, "Stopping overlay");
            handle.send(Control::Terminate);

            let (exit_tx, exit_rx) = oneshot::channel();
            core.pending_stop = Some(exit_tx);
            core.kill_reason = None;
            core.state = OverlayState::Stopping;
            self.shared.publish_status(&core);
            (exit_rx, generation)
        };

        match tokio::time::timeout(self.shared.config.grace_period, &mut exited).await {
            Ok(Ok(true)) => return Ok(StopOutcome::ForceKilled),
            Ok(_) => return Ok(StopOutcome::Stopped),
            Err(_) => {}
        }

        {
            let mut core = self.shared.lock();
            let still_stopping =
                core.state == OverlayState::Stopping && core.current_process(generation).is_some();
            if !still_stopping {
                return Ok(StopOutcome::Stopped);
            }
            tracing::warn!(generation, "Overlay did not exit within the grace period, killing it");
            core.kill_reason = Some(KillReason::GraceExpired);
            if let Some(handle) = core.current_process(generation) {
                handle.send(Control::Kill);
            }
        }

        if tokio::time::timeout(self.shared.config.kill_timeout, &mut exited)
            .await
            .is_err()
        {
            self.shared
                .force_retire(generation, "Overlay did not exit after being killed");
        }

        Ok(StopOutcome::ForceKilled)
    }

    /// Tears the overlay down for application exit.
    ///
    /// A Running overlay is stopped gracefully; one that is still starting
    /// is killed. The liveness task is stopped either way.
    pub async fn shutdown(&self) {
        let liveness = self.shared.lock().liveness.take();
        if let Some(liveness) = liveness {
            liveness.abort();
        }

        let state = self.state();
        match state {
            OverlayState::Running => {
                if let Err(e) = self.stop().await {
                    tracing::warn!(error = %e, "Failed to stop overlay during shutdown");
                }
            }
            OverlayState::Starting | OverlayState::Stopping => {
                let generation = {
                    let core = self.shared.lock();
                    match core.process.as_ref() {
                        Some(handle) => {
                            handle.send(Control::Kill);
                            handle.generation
                        }
                        None => return,
                    }
                };

                let mut status = self.watch();
                let gone = matches!(
                    tokio::time::timeout(
                        self.shared.config.kill_timeout,
                        status.wait_for(|s| !s.state.has_process()),
                    )
                    .await,
                    Ok(Ok(_))
                );
                if !gone {
                    self.shared
                        .force_retire(generation, "Overlay did not exit during shutdown");
                }
            }
            OverlayState::Idle | OverlayState::Stopped | OverlayState::Error => {}
        }
    }
}

/// Owns the child for one generation: forwards output, applies control
/// requests and reports the exit.
async fn monitor(
    shared: Weak<Shared>,
    generation: u64,
    mut child: Child,
    mut output: mpsc::Receiver<OutputChunk>,
    mut control: mpsc::UnboundedReceiver<Control>,
) {
    let pid = child.id();
    let mut output_open = true;
    let mut control_open = true;

    let exit = loop {
        tokio::select! {
            exit = child.wait() => break exit,
            chunk = output.recv(), if output_open => match chunk {
                Some(chunk) => match shared.upgrade() {
                    Some(shared) => shared.handle_output(generation, chunk),
                    None => {
                        let _ = child.start_kill();
                    }
                },
                None => output_open = false,
            },
            request = control.recv(), if control_open => match request {
                Some(Control::Terminate) => {
                    let terminated = pid.is_some_and(process::request_terminate);
                    if !terminated {
                        tracing::debug!(pid, "Cooperative termination unavailable, killing");
                        if let Some(shared) = shared.upgrade() {
                            shared.note_forced_stop(generation);
                        }
                        let _ = child.start_kill();
                    }
                }
                Some(Control::Kill) => {
                    let _ = child.start_kill();
                }
                None => {
                    // Handle retired or supervisor dropped.
                    control_open = false;
                    let _ = child.start_kill();
                }
            },
        }
    };

    if output_open {
        let _ = tokio::time::timeout(OUTPUT_DRAIN_TIMEOUT, async {
            while let Some(chunk) = output.recv().await {
                if let Some(shared) = shared.upgrade() {
                    shared.handle_output(generation, chunk);
                }
            }
        })
        .await;
    }

    if let Some(shared) = shared.upgrade() {
        shared.handle_exit(generation, exit);
    }
}

async fn liveness_loop(shared: Weak<Shared>, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    ticker.tick().await;

    loop {
        ticker.tick().await;
        let Some(shared) = shared.upgrade() else {
            break;
        };
        shared.check_liveness();
    }
}
