//! Starting and querying project-to-SCM conversions.

use serde::{Deserialize, Serialize};

use crate::context::ApiContext;
use crate::error::{ApiError, ImportError};
use crate::scm::ScmType;

const CONVERSION_PATH: &str = "/api/repos-manager/project-conversion";
const STATUS_PATH: &str = "/api/repos-manager/conversion/status";

/// Status string of a conversion that is still running.
pub const IN_PROGRESS: &str = "IN_PROGRESS";

/// Status string of a successful conversion.
pub const OK: &str = "OK";

/// One project/repository pair in a conversion request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionTarget {
    pub cx_project_id: String,
    pub scm_repository_url: String,
}

/// Body of `POST /api/repos-manager/project-conversion`.
#[derive(Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionRequest {
    pub scm_type: ScmType,
    pub scm_on_prem_url: Option<String>,
    pub org_identity: String,
    pub token: String,
    pub webhook_enabled: bool,
    #[serde(rename = "autoScanCxProjectAfterConversion")]
    pub auto_scan_after_conversion: bool,
    pub projects: Vec<ConversionTarget>,
}

impl ConversionRequest {
    /// Request for a single project: webhooks on, no scan after conversion.
    pub fn single(
        scm_type: ScmType,
        project_id: &str,
        repo_url: &str,
        scm_token: &str,
        scm_org: &str,
    ) -> Self {
        Self {
            scm_type,
            scm_on_prem_url: None,
            org_identity: scm_org.to_string(),
            token: scm_token.to_string(),
            webhook_enabled: true,
            auto_scan_after_conversion: false,
            projects: vec![ConversionTarget {
                cx_project_id: project_id.to_string(),
                scm_repository_url: repo_url.to_string(),
            }],
        }
    }
}

impl std::fmt::Debug for ConversionRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConversionRequest")
            .field("scm_type", &self.scm_type)
            .field("scm_on_prem_url", &self.scm_on_prem_url)
            .field("org_identity", &self.org_identity)
            .field("token", &"[REDACTED]")
            .field("webhook_enabled", &self.webhook_enabled)
            .field("auto_scan_after_conversion", &self.auto_scan_after_conversion)
            .field("projects", &self.projects)
            .finish()
    }
}

/// A conversion accepted by the platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionProcess {
    pub process_id: String,
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StartResponse {
    #[serde(default)]
    process_id: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// Where a conversion stands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversionState {
    InProgress,
    Ok,
    /// Any other status string ends the conversion as failed.
    Failed(String),
}

impl ConversionState {
    pub fn from_status(status: Option<&str>) -> Self {
        match status {
            Some(IN_PROGRESS) => Self::InProgress,
            Some(OK) => Self::Ok,
            Some(other) => Self::Failed(other.to_string()),
            None => Self::Failed("UNKNOWN".to_string()),
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::InProgress)
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::InProgress => IN_PROGRESS,
            Self::Ok => OK,
            Self::Failed(s) => s.as_str(),
        }
    }
}

/// Answer to one status query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionStatus {
    pub state: ConversionState,
    pub summary: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatusResponse {
    #[serde(default)]
    migration_status: Option<String>,
    #[serde(default)]
    summary: Option<serde_json::Value>,
}

impl From<StatusResponse> for ConversionStatus {
    fn from(resp: StatusResponse) -> Self {
        let summary = match resp.summary {
            None | Some(serde_json::Value::Null) => None,
            Some(serde_json::Value::String(s)) => Some(s),
            Some(other) => Some(other.to_string()),
        };
        Self {
            state: ConversionState::from_status(resp.migration_status.as_deref()),
            summary,
        }
    }
}

/// Starts conversions and reports their status.
#[derive(Debug, Clone, Copy)]
pub struct ConversionInitiator<'a> {
    ctx: &'a ApiContext,
}

impl<'a> ConversionInitiator<'a> {
    pub fn new(ctx: &'a ApiContext) -> Self {
        Self { ctx }
    }

    /// Ask the platform to link `project_id` to `repo_url`.
    ///
    /// The host is classified first; an unsupported host fails without any
    /// request being sent.
    pub async fn start(
        &self,
        project_id: &str,
        repo_url: &str,
        scm_token: &str,
        scm_org: &str,
    ) -> Result<ConversionProcess, ImportError> {
        let scm_type = ScmType::from_repo_url(repo_url)?;
        tracing::debug!(project_id, repo_url, scm_type = %scm_type, "Converting project");

        let request = ConversionRequest::single(scm_type, project_id, repo_url, scm_token, scm_org);
        let response: StartResponse = self
            .ctx
            .post_json(self.ctx.url(CONVERSION_PATH), &request)
            .await
            .map_err(ImportError::ConversionStart)?;

        let process_id = response
            .process_id
            .filter(|id| !id.is_empty())
            .ok_or(ImportError::ConversionStart(ApiError::MissingField(
                "processId",
            )))?;

        tracing::info!(process_id = %process_id, "Started conversion process");
        Ok(ConversionProcess {
            process_id,
            message: response.message,
        })
    }

    /// Current status of a conversion process.
    pub async fn status(&self, process_id: &str) -> Result<ConversionStatus, ImportError> {
        let url = format!(
            "{}?processId={}",
            self.ctx.url(STATUS_PATH),
            urlencoding::encode(process_id)
        );
        let response: StatusResponse = self.ctx.get_json(url).await.map_err(ImportError::Status)?;
        Ok(response.into())
    }
}
