/// Scan report export (JSON and CSV).
///
/// A report is a flat, serialisable snapshot of a tree: one row per entry in
/// pre-order (directories first, larger entries first), plus totals and the
/// largest files.
use crate::analysis::top_files;
use crate::model::{FileTree, NodeIndex};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::io::Write;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("JSON export failed: {0}")]
    Json(#[from] serde_json::Error),
    #[error("CSV export failed: {0}")]
    Csv(#[from] csv::Error),
    #[error("I/O error during export: {0}")]
    Io(#[from] std::io::Error),
}

/// One entry of the report.
#[derive(Debug, Clone, Serialize)]
pub struct ReportRow {
    pub path: String,
    pub kind: &'static str,
    pub size: u64,
    pub percent_of_parent: f32,
    pub accessible: bool,
    pub depth: u16,
    /// Last modification time reported by the store, if any.
    pub modified: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportFile {
    pub path: String,
    pub size: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScanReport {
    pub root: String,
    pub scanned_at: DateTime<Utc>,
    pub total_size: u64,
    pub entries: usize,
    pub files: u64,
    pub unreadable: u64,
    pub largest_files: Vec<ReportFile>,
    pub rows: Vec<ReportRow>,
}

impl ScanReport {
    /// Snapshot `tree`, keeping the `top_n` largest files.
    pub fn build(tree: &FileTree, top_n: usize) -> Self {
        let mut rows = Vec::with_capacity(tree.len());
        let mut stack: Vec<(NodeIndex, u16)> = vec![(tree.root, 0)];
        while let Some((idx, depth)) = stack.pop() {
            let node = tree.node(idx);
            // Entries without a store address are left out with their subtree.
            let Some(path) = tree.full_path(idx) else {
                continue;
            };
            rows.push(ReportRow {
                path: path.to_string(),
                kind: if node.is_dir { "directory" } else { "file" },
                size: node.size,
                percent_of_parent: node.percent_of_parent,
                accessible: node.is_accessible(),
                depth,
                modified: node.modified.map(DateTime::<Utc>::from),
            });
            // Reverse so the largest child is popped first.
            for child in tree.children_sorted_by_size(idx).into_iter().rev() {
                stack.push((child, depth + 1));
            }
        }

        Self {
            root: tree.root_path.to_string(),
            scanned_at: Utc::now(),
            total_size: tree.total_size,
            entries: tree.len(),
            files: tree.node(tree.root).descendant_count,
            unreadable: tree.error_count(),
            largest_files: top_files(tree, top_n)
                .into_iter()
                .map(|f| ReportFile {
                    path: f.path.to_string(),
                    size: f.size,
                })
                .collect(),
            rows,
        }
    }

    /// Write the whole report as pretty-printed JSON.
    pub fn write_json<W: Write>(&self, writer: W) -> Result<(), ReportError> {
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    /// Write the rows as CSV with a header line.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<(), ReportError> {
        let mut csv = csv::Writer::from_writer(writer);
        for row in &self.rows {
            csv.serialize(row)?;
        }
        csv.flush()?;
        Ok(())
    }
}
