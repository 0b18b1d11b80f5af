//! Durable registry of installed skin mods.
//!
//! The registry maps a champion identifier to the single skin (or chroma)
//! archive currently installed for it. It is the source of truth for the
//! mod list the overlay process is launched with.
//!
//! - [`Registry`] is a plain owned map with pure `upsert`/`remove` operations.
//!   Callers persist it explicitly with [`Registry::save`] as part of a larger
//!   unit of work.
//! - Persistence goes through the [`RegistryStore`] port. [`JsonFileStore`]
//!   writes a JSON array atomically (temp file + rename); [`MemoryStore`]
//!   keeps records in memory.
//! - [`Registry::reconcile_with_disk`] brings the registry and the install
//!   directory back in sync after a crash.
//!
//! # Example
//!
//! ```no_run
//! use ltk_skin_registry::{archive_file_name, InstalledModRecord, JsonFileStore, Registry};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let store = JsonFileStore::new("data/installed.json");
//! let mut registry = Registry::load(Box::new(store))?;
//! registry.reconcile_with_disk("data/installed".as_ref())?;
//!
//! let file_name = archive_file_name("Blood Moon Aatrox", None, "fantome");
//! registry.upsert(InstalledModRecord::new("Aatrox", "266003", file_name, "Blood Moon Aatrox"));
//! registry.save()?;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod naming;
pub mod record;
pub mod registry;
pub mod store;

pub use error::{RegistryError, Result};
pub use naming::{archive_file_name, is_temp_file, temp_file_name, TEMP_SUFFIX};
pub use record::InstalledModRecord;
pub use registry::{ReconcileReport, Registry};
pub use store::{JsonFileStore, MemoryStore, RegistryStore};
