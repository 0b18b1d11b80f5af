//! Supervisor for the long-running mod overlay process.
//!
//! The overlay process is the external tool that injects mod archives into
//! the game at runtime. This crate owns its lifecycle:
//!
//! - [`Supervisor`] drives the `Idle → Starting → Running → Stopping → Stopped`
//!   state machine (plus `Error`) and guarantees at most one transition is in
//!   flight. Concurrent `start`/`stop` calls are rejected with
//!   [`SupervisorError::TransitionConflict`] instead of being queued.
//! - [`classify`] turns raw process output into status lines and detects the
//!   ready/exiting markers that drive transitions.
//! - [`EventHub`] fans lifecycle and output events out to subscribers in
//!   emission order.
//!
//! # Example
//!
//! ```no_run
//! use ltk_overlay_supervisor::{EventKind, OverlayCommand, Supervisor, SupervisorConfig};
//!
//! # async fn run() -> Result<(), ltk_overlay_supervisor::SupervisorError> {
//! let supervisor = Supervisor::new(SupervisorConfig::default());
//! let mut events = supervisor.events().subscribe(&EventKind::ALL);
//!
//! let command = OverlayCommand::new("mod-tools")
//!     .arg("runoverlay")
//!     .arg("profiles/Default")
//!     .arg("--game:C:/Riot Games/League of Legends/Game")
//!     .arg("configless");
//!
//! supervisor.start(command).await?;
//! while let Some(event) = events.recv().await {
//!     println!("{event:?}");
//! }
//! # Ok(())
//! # }
//! ```

pub mod classify;
pub mod error;
pub mod events;
pub mod process;
mod supervisor;

pub use classify::{classify, ClassifiedLine, LineMarker, EXITING_MARKER, READY_MARKER};
pub use error::{Result, SupervisorError};
pub use events::{EventHub, EventKind, OverlayEvent, Subscription, SubscriptionId};
pub use process::{kill_orphans, LivenessProbe, OutputStream, OverlayCommand, SysinfoProbe};
pub use supervisor::{
    OverlayState, StartOutcome, StopOutcome, Supervisor, SupervisorConfig, SupervisorStatus,
    MIN_LIVENESS_INTERVAL,
};
