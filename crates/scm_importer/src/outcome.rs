//! Turning a terminal conversion status into success or a precise failure.

use crate::conversion::{ConversionState, ConversionStatus};
use crate::error::ImportError;
use crate::progress::{ImportProgress, ProgressCallback, emit};
use crate::project::ProjectResolver;

/// Classifies terminal conversion statuses.
///
/// A failed conversion is most often caused by the repository already being
/// linked to another project, so on failure the classifier asks the platform
/// who owns the repository before settling on a generic error.
pub struct OutcomeClassifier<'a> {
    projects: ProjectResolver<'a>,
    on_progress: Option<&'a ProgressCallback>,
}

impl<'a> OutcomeClassifier<'a> {
    pub fn new(projects: ProjectResolver<'a>, on_progress: Option<&'a ProgressCallback>) -> Self {
        Self {
            projects,
            on_progress,
        }
    }

    pub async fn classify(
        &self,
        status: &ConversionStatus,
        project_name: &str,
        repo_url: &str,
    ) -> Result<(), ImportError> {
        let failed_as = match &status.state {
            ConversionState::Ok => {
                emit(
                    self.on_progress,
                    ImportProgress::ConversionSucceeded {
                        project_name: project_name.to_string(),
                    },
                );
                return Ok(());
            }
            ConversionState::Failed(s) => s.clone(),
            // Not terminal; treat like any other unexpected status.
            ConversionState::InProgress => status.state.as_str().to_string(),
        };

        emit(
            self.on_progress,
            ImportProgress::CheckingRepoOwner {
                repo_url: repo_url.to_string(),
            },
        );

        let owner = match self.projects.find_owner_of_repo(repo_url).await {
            Ok(owner) => owner,
            Err(e) => {
                tracing::warn!(repo_url, error = %e, "Could not look up repository owner");
                None
            }
        };

        match owner {
            Some(project) => Err(ImportError::Conflict {
                repo_url: repo_url.to_string(),
                project,
            }),
            None => Err(ImportError::GenericConversion {
                status: failed_as,
                summary: status.summary.clone().unwrap_or_default(),
            }),
        }
    }
}
