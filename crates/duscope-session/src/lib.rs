/// duscope Session: headless interactive state shared by frontends.
///
/// Business logic lives in `duscope-core`; this crate owns the scanned tree,
/// the folder being viewed, and the background scan and delete workers.
pub mod state;

pub use state::{ListingRow, ScanStart, Session, SessionError, SessionPhase};
