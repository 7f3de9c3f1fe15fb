//! SCM provider classification.

use serde::Serialize;
use url::Url;

use crate::error::ImportError;

/// Hosting providers the platform can link a project to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScmType {
    GitHub,
    GitLab,
    Bitbucket,
    Azure,
}

/// Host fragment → provider, checked in order.
const SCM_HOSTS: [(&str, ScmType); 4] = [
    ("github.com", ScmType::GitHub),
    ("gitlab.com", ScmType::GitLab),
    ("bitbucket.org", ScmType::Bitbucket),
    ("azure.com", ScmType::Azure),
];

impl ScmType {
    /// Classify a repository URL by its host.
    ///
    /// Matches on host substring, so `dev.azure.com` is Azure and
    /// `github.com:443` is GitHub. Anything else, including URLs that do not
    /// parse, is [`ImportError::UnsupportedScm`].
    pub fn from_repo_url(repo_url: &str) -> Result<Self, ImportError> {
        let host = Url::parse(repo_url.trim())
            .ok()
            .and_then(|u| u.host_str().map(str::to_ascii_lowercase))
            .ok_or_else(|| ImportError::UnsupportedScm(repo_url.to_string()))?;

        SCM_HOSTS
            .iter()
            .find(|(fragment, _)| host.contains(fragment))
            .map(|(_, scm)| *scm)
            .ok_or_else(|| ImportError::UnsupportedScm(repo_url.to_string()))
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ScmType::GitHub => "github",
            ScmType::GitLab => "gitlab",
            ScmType::Bitbucket => "bitbucket",
            ScmType::Azure => "azure",
        }
    }
}

impl std::fmt::Display for ScmType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
