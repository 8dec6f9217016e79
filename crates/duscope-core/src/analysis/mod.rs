/// Post-scan analysis over a finished tree.
pub mod top_files;

pub use top_files::{top_files, LargestFile};
