//! Quarantine storage.
//!
//! - [`placement`]: destination directory and collision-free names
//! - [`record`]: `.restore_info` sidecar format
//! - [`manager`]: quarantine, restore, list and purge

pub mod manager;
pub mod placement;
pub mod record;

pub use manager::{
    move_file, PurgeSummary, QuarantineError, QuarantineListing, QuarantineManager,
    QuarantineOutcome, QuarantineRecord, QuarantinedFile, RestoreError, RestoredFile,
};
pub use placement::{relative_path, unique_destination, CLOUD_FOLDERS};
pub use record::{is_sidecar, sidecar_path, RecordError, RestoreInfo, SIDECAR_EXTENSION};
