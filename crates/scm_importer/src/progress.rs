//! Progress events emitted while an import runs.
//!
//! The library never prints. Front ends subscribe with a [`ProgressCallback`]
//! and render events as spinners or log lines.

use std::time::Duration;

/// Progress events emitted during an import.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ImportProgress {
    /// About to exchange the API key for an access token.
    Authenticating { token_url: String },

    /// Access token obtained.
    Authenticated,

    /// Looking up the target project by name.
    ResolvingProject { name: String },

    /// A project with the exact name already exists.
    ProjectFound { name: String, project_id: String },

    /// No project matched, so one was created.
    ProjectCreated { name: String, project_id: String },

    /// The existing project is already SCM-linked; nothing left to do.
    AlreadyLinked { name: String, project_id: String },

    /// Conversion request accepted.
    ConversionStarted {
        process_id: String,
        message: Option<String>,
    },

    /// One status query answered.
    StatusChecked { attempt: u32, status: String },

    /// Conversion still running; sleeping before the next query.
    Waiting { attempt: u32, interval: Duration },

    /// Conversion failed; checking whether another project owns the repository.
    CheckingRepoOwner { repo_url: String },

    /// Conversion reached `OK`.
    ConversionSucceeded { project_name: String },
}

/// Callback type for progress reporting.
pub type ProgressCallback = Box<dyn Fn(ImportProgress) + Send + Sync>;

/// Emit a progress event if a callback is provided.
#[inline]
pub fn emit(on_progress: Option<&ProgressCallback>, event: ImportProgress) {
    if let Some(cb) = on_progress {
        cb(event);
    }
}
