//! Error types for the import flow.

use std::time::Duration;

use thiserror::Error;

use crate::http::HttpError;

/// Failure of a single platform request.
///
/// Components wrap this into the [`ImportError`] variant that names the step
/// that failed, so the raw response body travels up to the user.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request never produced a response.
    #[error("HTTP error: {0}")]
    Http(#[from] HttpError),

    /// The platform answered with a non-success status.
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// The response body could not be decoded.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The response decoded but lacked a required field.
    #[error("response did not contain '{0}'")]
    MissingField(&'static str),
}

impl ApiError {
    /// HTTP status of an error response, if the platform answered at all.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Errors that end an import run.
///
/// Every variant is fatal; [`ImportError::exit_code`] maps them to the process
/// exit status.
#[derive(Debug, Error)]
pub enum ImportError {
    /// Malformed or unsupported platform base URL.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Token exchange failed or returned no access token.
    #[error("Authentication against {token_url} failed: {source}")]
    Auth {
        token_url: String,
        #[source]
        source: ApiError,
    },

    /// Listing or reading projects failed.
    #[error("Project lookup failed: {0}")]
    Lookup(#[source] ApiError),

    /// Project creation was rejected or returned no id.
    #[error("Failed to create project {name}: {source}")]
    Create {
        name: String,
        #[source]
        source: ApiError,
    },

    /// The repository host is not one the platform can convert.
    #[error("Unsupported SCM type or invalid repository URL: {0}")]
    UnsupportedScm(String),

    /// The conversion request was rejected or returned no process id.
    #[error("Failed to start project conversion: {0}")]
    ConversionStart(#[source] ApiError),

    /// Querying conversion status failed.
    #[error("Failed to check conversion status: {0}")]
    Status(#[source] ApiError),

    /// Conversion failed because another project already owns the repository.
    #[error(
        "SCM project conversion failed! The repository {repo_url} is already in use by project {project}."
    )]
    Conflict { repo_url: String, project: String },

    /// Conversion failed and no owning project could be identified.
    #[error("SCM project conversion failed due to unknown error ({status})! {summary}")]
    GenericConversion { status: String, summary: String },

    /// Conversion did not reach a terminal state before the poll deadline.
    #[error("Conversion process {process_id} still in progress after {elapsed:?}")]
    Timeout {
        process_id: String,
        elapsed: Duration,
    },
}

impl ImportError {
    /// Process exit status for this error.
    #[must_use]
    pub fn exit_code(&self) -> u8 {
        1
    }

    /// Short label for structured logs.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            ImportError::Config(_) => "config",
            ImportError::Auth { .. } => "auth",
            ImportError::Lookup(_) => "lookup",
            ImportError::Create { .. } => "create",
            ImportError::UnsupportedScm(_) => "unsupported_scm",
            ImportError::ConversionStart(_) => "conversion_start",
            ImportError::Status(_) => "status",
            ImportError::Conflict { .. } => "conflict",
            ImportError::GenericConversion { .. } => "conversion_failed",
            ImportError::Timeout { .. } => "timeout",
        }
    }
}

/// Result type for import operations.
pub type Result<T> = std::result::Result<T, ImportError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_error_exits_with_one() {
        let errors = [
            ImportError::Config("bad".into()),
            ImportError::UnsupportedScm("https://example.com/a/b".into()),
            ImportError::Lookup(ApiError::MissingField("projects")),
            ImportError::Conflict {
                repo_url: "https://github.com/acme/widget".into(),
                project: "OtherProject".into(),
            },
            ImportError::Timeout {
                process_id: "p-1".into(),
                elapsed: Duration::from_secs(5),
            },
        ];
        for err in errors {
            assert_eq!(err.exit_code(), 1, "{}", err.kind());
        }
    }

    #[test]
    fn test_create_error_includes_response_body() {
        let err = ImportError::Create {
            name: "widget".into(),
            source: ApiError::Api {
                status: 400,
                message: r#"{"message":"name taken"}"#.into(),
            },
        };
        let text = err.to_string();
        assert!(text.contains("widget"));
        assert!(text.contains("400"));
        assert!(text.contains("name taken"));
    }

    #[test]
    fn test_conflict_message_names_owner() {
        let err = ImportError::Conflict {
            repo_url: "https://github.com/acme/widget".into(),
            project: "OtherProject".into(),
        };
        assert!(err.to_string().contains("already in use by project OtherProject"));
    }

    #[test]
    fn test_api_error_status() {
        let api = ApiError::Api {
            status: 409,
            message: String::new(),
        };
        assert_eq!(api.status(), Some(409));
        assert_eq!(ApiError::MissingField("id").status(), None);
        assert_eq!(
            ApiError::MissingField("processId").to_string(),
            "response did not contain 'processId'"
        );
    }
}
