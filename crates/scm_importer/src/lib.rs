//! SCM Importer - onboard a hosted repository as an SCM-linked platform project.
//!
//! One run walks a fixed sequence: exchange the API key for an access token,
//! find or create the target project, ask the platform to convert it into an
//! SCM project, then poll the conversion until it finishes. A failed
//! conversion is checked against the projects that already claim the
//! repository so the caller can tell a conflict from any other failure.
//!
//! # Example
//!
//! ```ignore
//! use scm_importer::{AuthSettings, ImportRequest, Importer};
//!
//! let request = ImportRequest {
//!     auth: AuthSettings::new("https://us.ast.checkmarx.net", "acme"),
//!     api_key,
//!     repo_url: "https://github.com/acme/widget".into(),
//!     scm_token,
//!     scm_org: "acme".into(),
//!     project_name: "widget".into(),
//!     groups: vec![],
//!     tags: vec![],
//! };
//!
//! let outcome = Importer::with_reqwest()?.run(&request).await?;
//! ```

pub mod auth;
pub mod context;
pub mod conversion;
pub mod error;
pub mod http;
pub mod import;
pub mod outcome;
pub mod poll;
pub mod progress;
pub mod project;
pub mod repo_list;
pub mod scm;

pub use auth::{AccessToken, AuthSettings, authenticate};
pub use context::ApiContext;
pub use conversion::{ConversionInitiator, ConversionProcess, ConversionState, ConversionStatus};
pub use error::{ApiError, ImportError};
pub use http::reqwest_transport::ReqwestTransport;
pub use http::{HttpError, HttpMethod, HttpRequest, HttpResponse, HttpTransport};
pub use import::{ImportOutcome, ImportRequest, Importer};
pub use outcome::OutcomeClassifier;
pub use poll::{DEFAULT_POLL_INTERVAL, PollConfig, StatusPoller};
pub use progress::{ImportProgress, ProgressCallback};
pub use project::{ProjectResolver, Resolved};
pub use repo_list::read_repo_urls;
pub use scm::ScmType;
