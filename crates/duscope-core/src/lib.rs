/// duscope Core: scanning, aggregation, deletion and data model.
///
/// This crate contains all business logic with zero UI dependencies.
/// Frontends (the bundled line shell, a TUI, a GUI) drive it through the
/// `duscope-session` crate or directly.
///
/// # Modules
///
/// - [`model`]: Arena-allocated scan tree, remote paths and size formatting.
/// - [`fs`]: The `FilesystemClient` seam plus local and in-memory clients.
/// - [`resolver`]: Scan-root self-correction to the nearest existing ancestor.
/// - [`scanner`]: Background tree scanning with name filters, progress and cancellation.
/// - [`delete`]: Trash-first deletion with a confirmed permanent fallback.
/// - [`analysis`]: Post-scan analysis (largest files).
/// - [`report`]: JSON/CSV export of a scanned tree.
pub mod analysis;
pub mod delete;
pub mod fs;
pub mod model;
pub mod report;
pub mod resolver;
pub mod scanner;
