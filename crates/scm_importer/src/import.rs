//! The import flow: authenticate, resolve the project, convert it and wait.

use std::sync::Arc;

use crate::auth::{self, AuthSettings};
use crate::context::ApiContext;
use crate::conversion::ConversionInitiator;
use crate::error::Result;
use crate::http::reqwest_transport::{DEFAULT_TIMEOUT, ReqwestTransport};
use crate::http::{HttpError, HttpTransport};
use crate::outcome::OutcomeClassifier;
use crate::poll::{PollConfig, StatusPoller};
use crate::progress::{ImportProgress, ProgressCallback, emit};
use crate::project::{ProjectResolver, Resolved};
use crate::scm::ScmType;

/// Everything needed to onboard one repository.
#[derive(Clone)]
pub struct ImportRequest {
    pub auth: AuthSettings,
    /// Long-lived platform API key, exchanged once for an access token.
    pub api_key: String,
    pub repo_url: String,
    pub scm_token: String,
    pub scm_org: String,
    pub project_name: String,
    pub groups: Vec<String>,
    pub tags: Vec<String>,
}

impl std::fmt::Debug for ImportRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImportRequest")
            .field("auth", &self.auth)
            .field("api_key", &"[REDACTED]")
            .field("repo_url", &self.repo_url)
            .field("scm_token", &"[REDACTED]")
            .field("scm_org", &self.scm_org)
            .field("project_name", &self.project_name)
            .field("groups", &self.groups)
            .field("tags", &self.tags)
            .finish()
    }
}

/// How a successful run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportOutcome {
    /// The conversion finished with `OK`.
    Converted { project_id: String, created: bool },
    /// The project was already SCM-linked; no conversion was started.
    AlreadyLinked { project_id: String },
}

impl ImportOutcome {
    #[must_use]
    pub fn exit_code(&self) -> u8 {
        0
    }
}

/// Runs imports over a shared transport.
pub struct Importer {
    transport: Arc<dyn HttpTransport>,
    poll: PollConfig,
    on_progress: Option<Arc<ProgressCallback>>,
}

impl Importer {
    pub fn new(transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            transport,
            poll: PollConfig::default(),
            on_progress: None,
        }
    }

    /// Importer over a reqwest client with the default request timeout.
    pub fn with_reqwest() -> std::result::Result<Self, HttpError> {
        let transport = ReqwestTransport::with_timeout(DEFAULT_TIMEOUT)?;
        Ok(Self::new(Arc::new(transport)))
    }

    #[must_use]
    pub fn with_poll_config(mut self, poll: PollConfig) -> Self {
        self.poll = poll;
        self
    }

    #[must_use]
    pub fn with_progress(mut self, on_progress: Arc<ProgressCallback>) -> Self {
        self.on_progress = Some(on_progress);
        self
    }

    fn progress(&self) -> Option<&ProgressCallback> {
        self.on_progress.as_deref()
    }

    /// Onboard `request.repo_url` as an SCM project.
    pub async fn run(&self, request: &ImportRequest) -> Result<ImportOutcome> {
        let on_progress = self.progress();

        // Reject unsupported hosts before touching the network.
        let scm_type = ScmType::from_repo_url(&request.repo_url)?;
        tracing::debug!(repo_url = %request.repo_url, scm_type = %scm_type, "Repository host supported");

        emit(
            on_progress,
            ImportProgress::Authenticating {
                token_url: request.auth.token_url()?,
            },
        );
        let token = auth::authenticate(self.transport.as_ref(), &request.auth, &request.api_key).await?;
        emit(on_progress, ImportProgress::Authenticated);

        let ctx = ApiContext::new(&request.auth.base_url, token, Arc::clone(&self.transport));
        let projects = ProjectResolver::new(&ctx);
        let name = request.project_name.as_str();

        emit(
            on_progress,
            ImportProgress::ResolvingProject {
                name: name.to_string(),
            },
        );
        let resolved = projects
            .resolve(name, &request.repo_url, &request.groups, &request.tags)
            .await?;

        match &resolved {
            Resolved::Existing(id) => {
                emit(
                    on_progress,
                    ImportProgress::ProjectFound {
                        name: name.to_string(),
                        project_id: id.clone(),
                    },
                );
                if projects.is_scm_linked(id).await? {
                    tracing::info!(name, project_id = %id, "Project is already an SCM project");
                    emit(
                        on_progress,
                        ImportProgress::AlreadyLinked {
                            name: name.to_string(),
                            project_id: id.clone(),
                        },
                    );
                    return Ok(ImportOutcome::AlreadyLinked {
                        project_id: id.clone(),
                    });
                }
            }
            Resolved::Created(id) => emit(
                on_progress,
                ImportProgress::ProjectCreated {
                    name: name.to_string(),
                    project_id: id.clone(),
                },
            ),
        }

        let conversions = ConversionInitiator::new(&ctx);
        let process = conversions
            .start(
                resolved.id(),
                &request.repo_url,
                &request.scm_token,
                &request.scm_org,
            )
            .await?;
        emit(
            on_progress,
            ImportProgress::ConversionStarted {
                process_id: process.process_id.clone(),
                message: process.message.clone(),
            },
        );

        let status = StatusPoller::new(conversions, self.poll, on_progress)
            .wait_for_terminal(&process.process_id)
            .await?;

        OutcomeClassifier::new(projects, on_progress)
            .classify(&status, name, &request.repo_url)
            .await?;

        tracing::info!(name, project_id = %resolved.id(), "SCM project created");
        Ok(ImportOutcome::Converted {
            project_id: resolved.id().to_string(),
            created: resolved.was_created(),
        })
    }
}
