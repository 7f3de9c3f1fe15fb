//! Project API data types.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Origin label stamped on projects this tool creates.
pub const ORIGIN: &str = "SCM Importer";

/// Marker tag added to every project this tool creates.
pub const MARKER_TAG: &str = "SCM Importer";

/// Criticality assigned to new projects.
pub const DEFAULT_CRITICALITY: u8 = 3;

/// Response of `GET /api/projects/`.
///
/// The platform returns `"projects": null` rather than an empty list when
/// nothing matches.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProjectList {
    #[serde(default)]
    pub projects: Option<Vec<ProjectSummary>>,
}

impl ProjectList {
    pub fn iter(&self) -> impl Iterator<Item = &ProjectSummary> {
        self.projects.iter().flatten()
    }
}

/// A project as listed by the platform. Only the fields the importer reads.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectSummary {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub repo_url: Option<String>,
    /// Set once a conversion has linked this project to its repository.
    #[serde(default, rename = "imported_proj_name")]
    pub imported_proj_name: Option<String>,
}

impl ProjectSummary {
    /// Whether this project has completed SCM onboarding.
    pub fn is_onboarded(&self) -> bool {
        self.imported_proj_name
            .as_deref()
            .is_some_and(|name| !name.is_empty())
    }
}

/// Body of `POST /api/projects/`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProjectRequest {
    pub name: String,
    pub groups: Vec<String>,
    pub tags: BTreeMap<String, String>,
    pub repo_url: String,
    pub origin: String,
    pub criticality: u8,
}

impl CreateProjectRequest {
    /// Build a creation body. User tags become keys with empty values; the
    /// marker tag is always present.
    pub fn new(name: &str, repo_url: &str, groups: &[String], tags: &[String]) -> Self {
        let mut tag_map: BTreeMap<String, String> = tags
            .iter()
            .map(|t| t.trim())
            .filter(|t| !t.is_empty())
            .map(|t| (t.to_string(), String::new()))
            .collect();
        tag_map.insert(MARKER_TAG.to_string(), String::new());

        Self {
            name: name.to_string(),
            groups: groups
                .iter()
                .map(|g| g.trim().to_string())
                .filter(|g| !g.is_empty())
                .collect(),
            tags: tag_map,
            repo_url: repo_url.to_string(),
            origin: ORIGIN.to_string(),
            criticality: DEFAULT_CRITICALITY,
        }
    }
}

/// How the target project was obtained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolved {
    /// A project with that exact name already existed.
    Existing(String),
    /// The importer created it.
    Created(String),
}

impl Resolved {
    pub fn id(&self) -> &str {
        match self {
            Resolved::Existing(id) | Resolved::Created(id) => id,
        }
    }

    pub fn was_created(&self) -> bool {
        matches!(self, Resolved::Created(_))
    }
}
