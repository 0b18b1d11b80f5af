//! Install/uninstall orchestration for skin mods.
//!
//! [`SkinManager`] ties the [`Registry`](ltk_skin_registry::Registry), the
//! overlay [`Supervisor`](ltk_overlay_supervisor::Supervisor) and the external
//! mod tool together. Every mutating operation runs as one unit of work and
//! is rejected with [`ManagerError::TransitionConflict`] while another one is
//! in flight.
//!
//! Installing a skin:
//!
//! 1. consumes a credit through the [`CreditLedger`] port
//! 2. stops the overlay
//! 3. places the archive under its deterministic file name
//! 4. imports it with the [`ModFormatTool`]
//! 5. records it in the registry and saves
//! 6. rebuilds the overlay profile and starts the overlay again
//!
//! Uninstalling deletes the archives, saves the registry and rebuilds the
//! profile, but leaves the overlay stopped.

pub mod archive;
pub mod credits;
pub mod error;
pub mod game_path;
pub mod layout;
pub mod manager;
pub mod tool;

pub use archive::{ArchiveSource, Removal};
pub use credits::{
    CreditDecision, CreditError, CreditLedger, CreditSource, FileCreditLedger, UnlimitedCredits,
};
pub use error::{ErrorCode, ErrorResponse, ManagerError, Result};
pub use layout::DataLayout;
pub use manager::{
    CleanupReport, DisplayMeta, InstallReport, InstallRequest, ManagerConfig,
    SkinManager, UninstallReport,
};
pub use tool::{ModFormatTool, ModTools, ToolError};
