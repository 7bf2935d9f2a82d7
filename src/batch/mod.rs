// src/batch/mod.rs

pub mod definitions;
pub mod error;
pub mod orchestrator;
pub mod poller;
pub mod state;
pub mod summary;
pub mod upload;

pub use definitions::{BatchFile, BatchJob, FileStatus, JobPhase, ProcessMode, SubmittedEdit};
pub use error::{BatchError, BatchResult};
pub use orchestrator::{BatchOrchestrator, OrchestratorConfig, SingleFile};
pub use poller::{PollConfig, PollEvent, PollHandle};
pub use state::{reduce, JobEvent};
pub use summary::BatchSummary;
pub use upload::{PendingUpload, UploadDraft};
