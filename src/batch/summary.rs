// src/batch/summary.rs

use super::definitions::{BatchFile, FileStatus, JobPhase};
use serde::Serialize;

/// Per-status counts of a batch's files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct BatchSummary {
    pub total: usize,
    pub success_count: usize,
    pub fail_count: usize,
    /// Pending or still processing.
    pub pending_count: usize,
}

impl BatchSummary {
    pub fn from_files(files: &[BatchFile]) -> Self {
        let count = |status: FileStatus| files.iter().filter(|f| f.status == status).count();
        let success_count = count(FileStatus::Completed);
        let fail_count = count(FileStatus::Error);
        Self {
            total: files.len(),
            success_count,
            fail_count,
            pending_count: files.len() - success_count - fail_count,
        }
    }

    /// Final phase for a batch that stopped with these counts. Files that
    /// never reached a terminal status count as failures.
    pub fn outcome(&self) -> JobPhase {
        let unfinished = self.fail_count + self.pending_count;
        if unfinished == 0 {
            JobPhase::Completed
        } else if self.success_count == 0 {
            JobPhase::Failed
        } else {
            JobPhase::PartiallyFailed
        }
    }

    pub fn headline(&self) -> String {
        let mut line = format!(
            "{} files: {} succeeded, {} failed",
            self.total, self.success_count, self.fail_count
        );
        if self.pending_count > 0 {
            line.push_str(&format!(", {} unfinished", self.pending_count));
        }
        line
    }
}
