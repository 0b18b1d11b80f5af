#![cfg(unix)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use ltk_overlay_supervisor::{
    EventKind, LivenessProbe, OverlayCommand, OverlayEvent, OverlayState, StartOutcome,
    StopOutcome, Supervisor, SupervisorConfig, SupervisorError, SupervisorStatus,
};

const READY: &str = "echo 'Status: Waiting for league match to start'";

fn script(body: &str) -> OverlayCommand {
    OverlayCommand::new("sh").arg("-c").arg(body)
}

fn ready_then_sleep() -> OverlayCommand {
    script(&format!("{READY}; exec sleep 30"))
}

fn fast_config() -> SupervisorConfig {
    SupervisorConfig {
        ready_timeout: Duration::from_secs(5),
        grace_period: Duration::from_millis(500),
        kill_timeout: Duration::from_secs(2),
        liveness_interval: Duration::from_secs(60),
        log_history: 16,
    }
}

async fn wait_for_status<F>(supervisor: &Supervisor, predicate: F) -> SupervisorStatus
where
    F: FnMut(&SupervisorStatus) -> bool,
{
    let mut watch = supervisor.watch();
    let status = tokio::time::timeout(Duration::from_secs(5), watch.wait_for(predicate))
        .await
        .expect("status did not change in time")
        .expect("status channel closed");
    status.clone()
}

#[tokio::test]
async fn start_reaches_running_and_emits_started() {
    let supervisor = Supervisor::new(fast_config());
    let mut events = supervisor.events().subscribe(&[EventKind::OverlayStarted]);

    let outcome = supervisor.start(ready_then_sleep()).await.unwrap();

    assert!(matches!(outcome, StartOutcome::Started { generation: 1, .. }));
    let status = supervisor.status();
    assert_eq!(status.state, OverlayState::Running);
    assert!(status.pid.is_some());
    assert_eq!(
        status.last_log_line.as_deref(),
        Some("Status: Waiting for league match to start")
    );
    assert!(matches!(
        events.try_recv(),
        Some(OverlayEvent::OverlayStarted { generation: 1, .. })
    ));

    assert_eq!(
        supervisor.start(ready_then_sleep()).await.unwrap(),
        StartOutcome::AlreadyRunning {
            pid: status.pid,
            generation: 1
        }
    );

    assert_eq!(supervisor.stop().await.unwrap(), StopOutcome::Stopped);
}

#[tokio::test]
async fn graceful_stop_reports_clean_exit() {
    let supervisor = Supervisor::new(fast_config());
    let mut events = supervisor.events().subscribe(&[EventKind::OverlayStopped]);
    supervisor.start(ready_then_sleep()).await.unwrap();

    assert_eq!(supervisor.stop().await.unwrap(), StopOutcome::Stopped);

    let status = supervisor.status();
    assert_eq!(status.state, OverlayState::Stopped);
    assert_eq!(status.pid, None);
    assert!(matches!(
        events.try_recv(),
        Some(OverlayEvent::OverlayStopped {
            exit_error: false,
            ..
        })
    ));
}

#[tokio::test]
async fn stubborn_process_is_force_killed() {
    let supervisor = Supervisor::new(fast_config());
    let mut events = supervisor.events().subscribe(&[EventKind::OverlayStopped]);
    supervisor
        .start(script(&format!(
            "trap '' TERM; {READY}; while true; do sleep 0.1; done"
        )))
        .await
        .unwrap();

    assert_eq!(supervisor.stop().await.unwrap(), StopOutcome::ForceKilled);

    assert_eq!(supervisor.state(), OverlayState::Stopped);
    assert!(matches!(
        events.try_recv(),
        Some(OverlayEvent::OverlayStopped {
            exit_error: true,
            ..
        })
    ));
}

#[tokio::test]
async fn exit_before_ready_is_an_error() {
    let supervisor = Supervisor::new(fast_config());

    let result = supervisor.start(script("echo booting; exit 3")).await;

    assert!(matches!(
        result,
        Err(SupervisorError::ExitedBeforeReady { exit_code: Some(3) })
    ));
    assert_eq!(supervisor.state(), OverlayState::Error);
    assert_eq!(supervisor.status().pid, None);
}

#[tokio::test]
async fn missing_ready_marker_times_out() {
    let supervisor = Supervisor::new(SupervisorConfig {
        ready_timeout: Duration::from_millis(300),
        ..fast_config()
    });
    let mut events = supervisor.events().subscribe(&[EventKind::OverlayStopped]);

    let result = supervisor.start(script("exec sleep 30")).await;

    assert!(matches!(result, Err(SupervisorError::Timeout { .. })));
    assert!(result.unwrap_err().is_retryable());
    assert_eq!(supervisor.state(), OverlayState::Error);
    match events.try_recv() {
        Some(OverlayEvent::OverlayStopped {
            exit_error, message, ..
        }) => {
            assert!(exit_error);
            assert_eq!(message.as_deref(), Some("Timeout waiting for overlay confirmation"));
        }
        other => panic!("unexpected event {other:?}"),
    }
}

#[tokio::test]
async fn ready_marker_after_timeout_is_ignored() {
    let supervisor = Supervisor::new(SupervisorConfig {
        ready_timeout: Duration::from_millis(200),
        ..fast_config()
    });
    let mut events = supervisor
        .events()
        .subscribe(&[EventKind::OverlayStarted, EventKind::OverlayStopped]);

    // The background subshell keeps stdout open, so its ready line arrives
    // after the timeout while the killed process is still being drained.
    let result = supervisor
        .start(script(&format!("(sleep 0.3; {READY}) & exec sleep 30")))
        .await;

    assert!(matches!(result, Err(SupervisorError::Timeout { .. })));
    assert_eq!(supervisor.state(), OverlayState::Error);
    match events.try_recv() {
        Some(OverlayEvent::OverlayStopped { message, .. }) => {
            assert_eq!(message.as_deref(), Some("Timeout waiting for overlay confirmation"));
        }
        other => panic!("unexpected event {other:?}"),
    }
    assert!(events.try_recv().is_none());
}

#[tokio::test]
async fn unexpected_exit_while_running_is_an_error() {
    let supervisor = Supervisor::new(fast_config());
    supervisor
        .start(script(&format!("{READY}; sleep 0.3; exit 1")))
        .await
        .unwrap();

    let status = wait_for_status(&supervisor, |s| s.state == OverlayState::Error).await;
    assert_eq!(status.pid, None);
    assert!(status.last_error.is_some());

    // Error is always a valid start state.
    supervisor.start(ready_then_sleep()).await.unwrap();
    assert_eq!(supervisor.state(), OverlayState::Running);
    supervisor.stop().await.unwrap();
}

#[tokio::test]
async fn concurrent_starts_admit_exactly_one() {
    let supervisor = Supervisor::new(fast_config());

    let (first, second) = tokio::join!(
        supervisor.start(ready_then_sleep()),
        supervisor.start(ready_then_sleep())
    );

    let results = [first, second];
    let started = results.iter().filter(|r| r.is_ok()).count();
    let conflicts = results
        .iter()
        .filter(|r| matches!(r, Err(SupervisorError::TransitionConflict { .. })))
        .count();
    assert_eq!((started, conflicts), (1, 1));
    assert_eq!(supervisor.state(), OverlayState::Running);
    assert_eq!(supervisor.status().generation, 1);

    let (first, second) = tokio::join!(supervisor.stop(), supervisor.stop());
    let results = [first, second];
    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert_eq!(
        results
            .iter()
            .filter(|r| matches!(r, Err(SupervisorError::TransitionConflict { .. })))
            .count(),
        1
    );

    let status = supervisor.status();
    assert_eq!(status.state, OverlayState::Stopped);
    assert_eq!(status.pid, None);
}

#[tokio::test]
async fn interleaved_start_stop_settles_in_one_terminal_state() {
    let supervisor = Supervisor::new(fast_config());

    for _ in 0..3 {
        let a = supervisor.clone();
        let b = supervisor.clone();
        let c = supervisor.clone();
        let _ = tokio::join!(
            async move { a.start(ready_then_sleep()).await },
            async move { b.stop().await },
            async move { c.start(ready_then_sleep()).await },
        );

        let status = supervisor.status();
        assert!(
            matches!(
                status.state,
                OverlayState::Running | OverlayState::Stopped | OverlayState::Error
            ),
            "unexpected state {:?}",
            status.state
        );
        assert_eq!(status.pid.is_some(), status.state.has_process());
    }

    supervisor.shutdown().await;
    assert!(!supervisor.state().has_process());
}

#[tokio::test]
async fn exiting_marker_sets_waiting_for_exit() {
    let supervisor = Supervisor::new(fast_config());
    supervisor
        .start(script(&format!(
            "{READY}; sleep 0.2; echo 'Status: Waiting for exit'; exec sleep 30"
        )))
        .await
        .unwrap();

    let status = wait_for_status(&supervisor, |s| s.waiting_for_exit).await;
    assert_eq!(status.state, OverlayState::Running);

    supervisor.stop().await.unwrap();
    assert!(!supervisor.status().waiting_for_exit);
}

#[tokio::test]
async fn output_lines_are_classified_and_ordered() {
    let supervisor = Supervisor::new(fast_config());
    let mut lines = supervisor.events().subscribe(&[EventKind::StdoutLine]);

    supervisor
        .start(script(&format!(
            "echo '[DLL] info: hook'; \
             echo 'redirected wad: DATA/FINAL/Champions/Ahri.wad.client'; \
             echo ''; {READY}; exec sleep 30"
        )))
        .await
        .unwrap();

    let mut received = Vec::new();
    while let Some(OverlayEvent::StdoutLine { content, .. }) = lines.try_recv() {
        received.push(content);
    }
    assert_eq!(
        received,
        vec![
            "Hunted wad: Ahri.wad.client".to_string(),
            "Status: Waiting for league match to start".to_string(),
        ]
    );
    assert_eq!(supervisor.log_history(), received);

    supervisor.stop().await.unwrap();
}

struct SwitchProbe(Arc<AtomicBool>);

impl LivenessProbe for SwitchProbe {
    fn is_alive(&self, _pid: u32) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[tokio::test]
async fn liveness_check_detects_silent_death() {
    let alive = Arc::new(AtomicBool::new(true));
    let supervisor = Supervisor::with_probe(
        SupervisorConfig {
            liveness_interval: Duration::from_millis(50),
            ..fast_config()
        },
        SwitchProbe(Arc::clone(&alive)),
    );
    let mut events = supervisor.events().subscribe(&[EventKind::OverlayStopped]);
    supervisor.start(ready_then_sleep()).await.unwrap();

    alive.store(false, Ordering::SeqCst);
    let status = wait_for_status(&supervisor, |s| s.state == OverlayState::Error).await;

    assert_eq!(status.pid, None);
    assert_eq!(
        status.last_error.as_deref(),
        Some("Overlay process is no longer running")
    );
    let event = tokio::time::timeout(Duration::from_secs(2), events.recv())
        .await
        .unwrap();
    assert!(matches!(
        event,
        Some(OverlayEvent::OverlayStopped {
            exit_error: true,
            ..
        })
    ));
}

#[tokio::test]
async fn zero_liveness_interval_still_polls() {
    let alive = Arc::new(AtomicBool::new(true));
    let supervisor = Supervisor::with_probe(
        SupervisorConfig {
            liveness_interval: Duration::ZERO,
            ..fast_config()
        },
        SwitchProbe(Arc::clone(&alive)),
    );
    supervisor.start(ready_then_sleep()).await.unwrap();

    alive.store(false, Ordering::SeqCst);
    let status = wait_for_status(&supervisor, |s| s.state == OverlayState::Error).await;

    assert_eq!(
        status.last_error.as_deref(),
        Some("Overlay process is no longer running")
    );
}

#[tokio::test]
async fn shutdown_stops_running_overlay() {
    let supervisor = Supervisor::new(fast_config());
    supervisor.start(ready_then_sleep()).await.unwrap();

    supervisor.shutdown().await;

    assert_eq!(supervisor.state(), OverlayState::Stopped);
    assert_eq!(supervisor.stop().await.unwrap(), StopOutcome::NotRunning);
}
