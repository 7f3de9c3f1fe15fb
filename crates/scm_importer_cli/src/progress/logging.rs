use scm_importer::ImportProgress;

/// Logging reporter using tracing for structured output.
pub struct LoggingReporter;

impl LoggingReporter {
    pub fn new() -> Self {
        Self
    }

    pub fn handle(&self, event: ImportProgress) {
        match event {
            ImportProgress::Authenticating { token_url } => {
                tracing::debug!(token_url = %token_url, "Authenticating");
            }

            ImportProgress::Authenticated => {
                tracing::debug!("Authenticated");
            }

            ImportProgress::ResolvingProject { name } => {
                tracing::debug!(name = %name, "Resolving project");
            }

            ImportProgress::ProjectFound { name, project_id } => {
                tracing::info!(name = %name, project_id = %project_id, "Using existing project");
            }

            ImportProgress::ProjectCreated { name, project_id } => {
                tracing::info!(name = %name, project_id = %project_id, "Created project");
            }

            ImportProgress::AlreadyLinked { name, project_id } => {
                tracing::info!(name = %name, project_id = %project_id, "Already an SCM project");
            }

            ImportProgress::ConversionStarted {
                process_id,
                message,
            } => {
                tracing::info!(process_id = %process_id, message = ?message, "Conversion started");
            }

            ImportProgress::StatusChecked { attempt, status } => {
                tracing::debug!(attempt, status = %status, "Conversion status");
            }

            ImportProgress::Waiting { attempt, interval } => {
                tracing::debug!(attempt, ?interval, "Conversion in progress, waiting");
            }

            ImportProgress::CheckingRepoOwner { repo_url } => {
                tracing::info!(repo_url = %repo_url, "Conversion failed, checking repository owner");
            }

            ImportProgress::ConversionSucceeded { project_name } => {
                tracing::info!(project = %project_name, "Conversion succeeded");
            }

            _ => {}
        }
    }
}

impl Default for LoggingReporter {
    fn default() -> Self {
        Self::new()
    }
}
