//! Project lookup and creation.
//!
//! Resolution is find-or-create: look the project up by exact name and create
//! it only on a miss. That is best-effort idempotency. Two runs racing on the
//! same name can both miss and both create; the only guard is the platform
//! itself, and when it rejects a create with `409 Conflict` the resolver looks
//! the name up once more instead of failing.

mod types;

pub use types::{
    CreateProjectRequest, DEFAULT_CRITICALITY, MARKER_TAG, ORIGIN, ProjectList, ProjectSummary,
    Resolved,
};

use crate::context::ApiContext;
use crate::error::{ApiError, ImportError};

const PROJECTS_PATH: &str = "/api/projects/";

/// Project operations against the platform.
#[derive(Debug, Clone, Copy)]
pub struct ProjectResolver<'a> {
    ctx: &'a ApiContext,
}

impl<'a> ProjectResolver<'a> {
    pub fn new(ctx: &'a ApiContext) -> Self {
        Self { ctx }
    }

    fn list_url(&self, param: &str, value: &str) -> String {
        format!(
            "{}?{}={}",
            self.ctx.url(PROJECTS_PATH),
            param,
            urlencoding::encode(value)
        )
    }

    async fn list(&self, param: &str, value: &str) -> Result<ProjectList, ImportError> {
        self.ctx
            .get_json(self.list_url(param, value))
            .await
            .map_err(ImportError::Lookup)
    }

    /// Id of the project whose name equals `name` exactly.
    ///
    /// The platform's `name` filter also matches substrings, so the result is
    /// filtered again locally.
    pub async fn find_by_name(&self, name: &str) -> Result<Option<String>, ImportError> {
        tracing::debug!(name, "Checking if project exists");
        let list = self.list("name", name).await?;

        let found = list
            .iter()
            .find(|p| p.name == name)
            .and_then(|p| p.id.clone());

        match &found {
            Some(id) => tracing::debug!(name, project_id = %id, "Project found"),
            None => tracing::debug!(name, "No project found"),
        }
        Ok(found)
    }

    /// Create a project and return its id.
    pub async fn create(
        &self,
        name: &str,
        repo_url: &str,
        groups: &[String],
        tags: &[String],
    ) -> Result<String, ImportError> {
        tracing::debug!(name, repo_url, "Creating project");
        let body = CreateProjectRequest::new(name, repo_url, groups, tags);

        let fail = |source: ApiError| ImportError::Create {
            name: name.to_string(),
            source,
        };

        let created: serde_json::Value = self
            .ctx
            .post_json(self.ctx.url(PROJECTS_PATH), &body)
            .await
            .map_err(fail)?;

        let id = created
            .get("id")
            .and_then(|v| v.as_str())
            .filter(|id| !id.is_empty())
            .ok_or_else(|| fail(ApiError::MissingField("id")))?;

        tracing::info!(name, project_id = %id, "Project created");
        Ok(id.to_string())
    }

    /// Whether the project is already linked to a repository.
    ///
    /// Linked projects carry a `repoId` in their detail record; its value is
    /// irrelevant.
    pub async fn is_scm_linked(&self, project_id: &str) -> Result<bool, ImportError> {
        let url = self.ctx.url(&format!(
            "{}{}",
            PROJECTS_PATH,
            urlencoding::encode(project_id)
        ));
        let detail: serde_json::Value = self
            .ctx
            .get_json(url)
            .await
            .map_err(ImportError::Lookup)?;

        Ok(detail
            .as_object()
            .is_some_and(|fields| fields.contains_key("repoId")))
    }

    /// Name of the onboarded project that already claims `repo_url`, if any.
    pub async fn find_owner_of_repo(&self, repo_url: &str) -> Result<Option<String>, ImportError> {
        tracing::debug!(repo_url, "Checking for a project already using the repository");
        let list = self.list("repo-url", repo_url).await?;

        let owner = list
            .iter()
            .find(|p| p.repo_url.as_deref() == Some(repo_url) && p.is_onboarded())
            .map(|p| p.name.clone());

        if owner.is_none() {
            tracing::debug!(repo_url, "No onboarded project uses the repository");
        }
        Ok(owner)
    }

    /// Find the project by name, creating it on a miss.
    pub async fn resolve(
        &self,
        name: &str,
        repo_url: &str,
        groups: &[String],
        tags: &[String],
    ) -> Result<Resolved, ImportError> {
        if let Some(id) = self.find_by_name(name).await? {
            return Ok(Resolved::Existing(id));
        }

        match self.create(name, repo_url, groups, tags).await {
            Ok(id) => Ok(Resolved::Created(id)),
            Err(ImportError::Create { name: n, source }) if source.status() == Some(409) => {
                tracing::warn!(name, "Project created concurrently, resolving by name again");
                match self.find_by_name(name).await? {
                    Some(id) => Ok(Resolved::Existing(id)),
                    None => Err(ImportError::Create { name: n, source }),
                }
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::AccessToken;
    use crate::http::{HttpMethod, HttpResponse, MockTransport};
    use std::sync::Arc;

    const BASE: &str = "https://us.ast.checkmarx.net";

    fn ctx(transport: &MockTransport) -> ApiContext {
        ApiContext::new(BASE, AccessToken::new("tok"), Arc::new(transport.clone()))
    }

    fn by_name(name: &str) -> String {
        format!("{BASE}/api/projects/?name={}", urlencoding::encode(name))
    }

    fn by_repo(repo: &str) -> String {
        format!("{BASE}/api/projects/?repo-url={}", urlencoding::encode(repo))
    }

    // ========== find_by_name ==========

    #[tokio::test]
    async fn test_find_by_name_exact_match_only() {
        let transport = MockTransport::new();
        transport.push_json(
            HttpMethod::Get,
            by_name("widget"),
            200,
            serde_json::json!({"projects": [
                {"id": "p1", "name": "widget-legacy"},
                {"id": "p2", "name": "widget"},
                {"id": "p3", "name": "Widget"}
            ]}),
        );

        let ctx = ctx(&transport);
        let id = ProjectResolver::new(&ctx)
            .find_by_name("widget")
            .await
            .unwrap();
        assert_eq!(id.as_deref(), Some("p2"));
    }

    #[tokio::test]
    async fn test_find_by_name_substring_is_not_a_match() {
        let transport = MockTransport::new();
        transport.push_json(
            HttpMethod::Get,
            by_name("widget"),
            200,
            serde_json::json!({"projects": [{"id": "p1", "name": "widget-legacy"}]}),
        );

        let ctx = ctx(&transport);
        let id = ProjectResolver::new(&ctx)
            .find_by_name("widget")
            .await
            .unwrap();
        assert!(id.is_none());
    }

    #[tokio::test]
    async fn test_find_by_name_ignores_unexpected_metadata_types() {
        let transport = MockTransport::new();
        transport.push_json(
            HttpMethod::Get,
            by_name("widget"),
            200,
            serde_json::json!({"totalCount": "1", "projects": [{
                "id": "p1",
                "name": "widget",
                "groups": "core",
                "tags": ["team"],
                "criticality": "high"
            }]}),
        );

        let ctx = ctx(&transport);
        let id = ProjectResolver::new(&ctx)
            .find_by_name("widget")
            .await
            .unwrap();
        assert_eq!(id.as_deref(), Some("p1"));
    }

    #[tokio::test]
    async fn test_find_by_name_null_projects() {
        let transport = MockTransport::new();
        transport.push_json(
            HttpMethod::Get,
            by_name("my widget"),
            200,
            serde_json::json!({"totalCount": 0, "projects": null}),
        );

        let ctx = ctx(&transport);
        let id = ProjectResolver::new(&ctx)
            .find_by_name("my widget")
            .await
            .unwrap();
        assert!(id.is_none());
        assert!(transport.requests()[0].url.ends_with("?name=my%20widget"));
    }

    #[tokio::test]
    async fn test_find_by_name_http_failure_is_lookup_error() {
        let transport = MockTransport::new();
        transport.push_response(
            HttpMethod::Get,
            by_name("widget"),
            HttpResponse {
                status: 401,
                headers: Vec::new(),
                body: b"expired".to_vec(),
            },
        );

        let ctx = ctx(&transport);
        let err = ProjectResolver::new(&ctx)
            .find_by_name("widget")
            .await
            .expect_err("401 should fail");
        assert!(matches!(err, ImportError::Lookup(ref e) if e.status() == Some(401)));
    }

    // ========== create ==========

    #[tokio::test]
    async fn test_create_returns_id() {
        let transport = MockTransport::new();
        transport.push_json(
            HttpMethod::Post,
            format!("{BASE}/api/projects/"),
            201,
            serde_json::json!({"id": "new-id", "name": "widget"}),
        );

        let ctx = ctx(&transport);
        let id = ProjectResolver::new(&ctx)
            .create("widget", "https://github.com/acme/widget", &["g".into()], &[])
            .await
            .unwrap();
        assert_eq!(id, "new-id");

        let body: serde_json::Value =
            serde_json::from_slice(&transport.requests()[0].body).unwrap();
        assert_eq!(body["origin"], "SCM Importer");
        assert_eq!(body["criticality"], 3);
        assert_eq!(body["groups"], serde_json::json!(["g"]));
    }

    #[tokio::test]
    async fn test_create_missing_id() {
        let transport = MockTransport::new();
        transport.push_json(
            HttpMethod::Post,
            format!("{BASE}/api/projects/"),
            201,
            serde_json::json!({"name": "widget"}),
        );

        let ctx = ctx(&transport);
        let err = ProjectResolver::new(&ctx)
            .create("widget", "https://github.com/acme/widget", &[], &[])
            .await
            .expect_err("missing id");
        assert!(matches!(
            err,
            ImportError::Create {
                source: ApiError::MissingField("id"),
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_create_rejected_keeps_body() {
        let transport = MockTransport::new();
        transport.push_response(
            HttpMethod::Post,
            format!("{BASE}/api/projects/"),
            HttpResponse {
                status: 400,
                headers: Vec::new(),
                body: br#"{"code":208,"message":"invalid group"}"#.to_vec(),
            },
        );

        let ctx = ctx(&transport);
        let err = ProjectResolver::new(&ctx)
            .create("widget", "https://github.com/acme/widget", &["nope".into()], &[])
            .await
            .expect_err("400 should fail");
        assert!(err.to_string().contains("invalid group"));
    }

    // ========== is_scm_linked ==========

    #[tokio::test]
    async fn test_is_scm_linked() {
        let transport = MockTransport::new();
        let url = format!("{BASE}/api/projects/p1");
        transport.push_json(
            HttpMethod::Get,
            url.clone(),
            200,
            serde_json::json!({"id": "p1", "repoId": 42}),
        );
        transport.push_json(
            HttpMethod::Get,
            url.clone(),
            200,
            serde_json::json!({"id": "p1", "repoId": null}),
        );
        transport.push_json(HttpMethod::Get, url, 200, serde_json::json!({"id": "p1"}));

        let ctx = ctx(&transport);
        let resolver = ProjectResolver::new(&ctx);
        assert!(resolver.is_scm_linked("p1").await.unwrap());
        assert!(resolver.is_scm_linked("p1").await.unwrap());
        assert!(!resolver.is_scm_linked("p1").await.unwrap());
    }

    // ========== find_owner_of_repo ==========

    #[tokio::test]
    async fn test_find_owner_requires_exact_url_and_onboarding() {
        let repo = "https://github.com/acme/widget";
        let transport = MockTransport::new();
        transport.push_json(
            HttpMethod::Get,
            by_repo(repo),
            200,
            serde_json::json!({"projects": [
                {"id": "a", "name": "Fork", "repoUrl": "https://github.com/acme/widget2", "imported_proj_name": "acme/widget2"},
                {"id": "b", "name": "Plain", "repoUrl": repo, "imported_proj_name": ""},
                {"id": "c", "name": "OtherProject", "repoUrl": repo, "imported_proj_name": "acme/widget"}
            ]}),
        );

        let ctx = ctx(&transport);
        let owner = ProjectResolver::new(&ctx)
            .find_owner_of_repo(repo)
            .await
            .unwrap();
        assert_eq!(owner.as_deref(), Some("OtherProject"));
    }

    #[tokio::test]
    async fn test_find_owner_none() {
        let repo = "https://github.com/acme/widget";
        let transport = MockTransport::new();
        transport.push_json(
            HttpMethod::Get,
            by_repo(repo),
            200,
            serde_json::json!({"projects": [{"id": "b", "name": "Plain", "repoUrl": repo}]}),
        );

        let ctx = ctx(&transport);
        let owner = ProjectResolver::new(&ctx)
            .find_owner_of_repo(repo)
            .await
            .unwrap();
        assert!(owner.is_none());
    }

    // ========== resolve ==========

    #[tokio::test]
    async fn test_resolve_existing_does_not_create() {
        let transport = MockTransport::new();
        transport.push_json(
            HttpMethod::Get,
            by_name("widget"),
            200,
            serde_json::json!({"projects": [{"id": "p1", "name": "widget"}]}),
        );

        let ctx = ctx(&transport);
        let resolved = ProjectResolver::new(&ctx)
            .resolve("widget", "https://github.com/acme/widget", &[], &[])
            .await
            .unwrap();
        assert_eq!(resolved, Resolved::Existing("p1".into()));
        assert_eq!(
            transport.count(HttpMethod::Post, &format!("{BASE}/api/projects/")),
            0
        );
    }

    #[tokio::test]
    async fn test_resolve_creates_on_miss() {
        let transport = MockTransport::new();
        transport.push_json(
            HttpMethod::Get,
            by_name("widget"),
            200,
            serde_json::json!({"projects": []}),
        );
        transport.push_json(
            HttpMethod::Post,
            format!("{BASE}/api/projects/"),
            201,
            serde_json::json!({"id": "p9"}),
        );

        let ctx = ctx(&transport);
        let resolved = ProjectResolver::new(&ctx)
            .resolve("widget", "https://github.com/acme/widget", &[], &[])
            .await
            .unwrap();
        assert_eq!(resolved, Resolved::Created("p9".into()));
    }

    #[tokio::test]
    async fn test_resolve_conflict_on_create_re_resolves() {
        let transport = MockTransport::new();
        transport.push_json(
            HttpMethod::Get,
            by_name("widget"),
            200,
            serde_json::json!({"projects": null}),
        );
        transport.push_response(
            HttpMethod::Post,
            format!("{BASE}/api/projects/"),
            HttpResponse {
                status: 409,
                headers: Vec::new(),
                body: b"project already exists".to_vec(),
            },
        );
        transport.push_json(
            HttpMethod::Get,
            by_name("widget"),
            200,
            serde_json::json!({"projects": [{"id": "raced", "name": "widget"}]}),
        );

        let ctx = ctx(&transport);
        let resolved = ProjectResolver::new(&ctx)
            .resolve("widget", "https://github.com/acme/widget", &[], &[])
            .await
            .unwrap();
        assert_eq!(resolved, Resolved::Existing("raced".into()));
    }

    #[tokio::test]
    async fn test_resolve_conflict_without_match_keeps_create_error() {
        let transport = MockTransport::new();
        for _ in 0..2 {
            transport.push_json(
                HttpMethod::Get,
                by_name("widget"),
                200,
                serde_json::json!({"projects": null}),
            );
        }
        transport.push_response(
            HttpMethod::Post,
            format!("{BASE}/api/projects/"),
            HttpResponse {
                status: 409,
                headers: Vec::new(),
                body: b"conflict".to_vec(),
            },
        );

        let ctx = ctx(&transport);
        let err = ProjectResolver::new(&ctx)
            .resolve("widget", "https://github.com/acme/widget", &[], &[])
            .await
            .expect_err("still missing after conflict");
        assert!(matches!(err, ImportError::Create { ref source, .. } if source.status() == Some(409)));
    }
}
