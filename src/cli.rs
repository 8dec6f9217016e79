use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "duscope",
    about = "Disk usage analyser for hierarchical file stores, with trash-first deletion",
    version
)]
pub struct Cli {
    /// Directory to scan. A missing path is corrected to its nearest
    /// existing ancestor after confirmation.
    pub path: String,

    /// Local directory the store is rooted at
    #[arg(long, default_value = "/")]
    pub base: PathBuf,

    /// Trash directory; without it deletions fall back to permanent removal
    #[arg(long)]
    pub trash: Option<PathBuf>,

    /// Skip files and directories whose name matches (repeatable)
    #[arg(long, value_name = "GLOB")]
    pub exclude: Vec<String>,

    /// Only count files whose name matches (repeatable)
    #[arg(long, value_name = "GLOB")]
    pub include: Vec<String>,

    /// Accept a corrected scan root without asking
    #[arg(long, short)]
    pub yes: bool,

    /// Write the scan report as JSON
    #[arg(long, value_name = "FILE")]
    pub export_json: Option<PathBuf>,

    /// Write the scan report as CSV
    #[arg(long, value_name = "FILE")]
    pub export_csv: Option<PathBuf>,

    /// Number of largest files to report
    #[arg(long, default_value_t = 20)]
    pub top: usize,

    /// Debug logging
    #[arg(long, short)]
    pub verbose: bool,
}
