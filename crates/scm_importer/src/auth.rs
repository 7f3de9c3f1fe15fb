//! Refresh-token exchange against the platform's identity provider.
//!
//! The platform issues long-lived API keys that are really OpenID Connect
//! refresh tokens. Each run trades the key for a short-lived access token at a
//! realm-scoped token endpoint on the identity host. The identity host is
//! derived from the platform host by naming convention (`ast.` → `iam.`)
//! unless the caller supplies it explicitly.

use serde::Deserialize;

use crate::error::{ApiError, ImportError};
use crate::http::{HttpRequest, HttpTransport};

/// Domain suffix every regional platform host carries.
pub const PLATFORM_DOMAIN: &str = "ast.checkmarx.net";

/// Matching identity-provider domain suffix.
pub const IAM_DOMAIN: &str = "iam.checkmarx.net";

/// OAuth client the platform expects refresh grants from.
pub const CLIENT_ID: &str = "ast-app";

/// Short-lived bearer token for platform calls.
///
/// Never printed: `Debug` shows `[REDACTED]`.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// The raw token, for building `Authorization` headers.
    pub fn secret(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AccessToken([REDACTED])")
    }
}

/// Where to authenticate: platform host, optional identity host override and
/// tenant realm.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthSettings {
    pub base_url: String,
    pub iam_base_url: Option<String>,
    pub tenant: String,
}

impl AuthSettings {
    pub fn new(base_url: impl Into<String>, tenant: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            iam_base_url: None,
            tenant: tenant.into(),
        }
    }

    #[must_use]
    pub fn with_iam_base_url(mut self, iam_base_url: impl Into<String>) -> Self {
        self.iam_base_url = Some(iam_base_url.into());
        self
    }

    /// Identity host to use, honouring the override.
    pub fn iam_base_url(&self) -> Result<String, ImportError> {
        derive_iam_base_url(&self.base_url, self.iam_base_url.as_deref())
    }

    /// Realm-scoped OpenID Connect token endpoint.
    pub fn token_url(&self) -> Result<String, ImportError> {
        Ok(token_endpoint(&self.iam_base_url()?, &self.tenant))
    }
}

/// Resolve the identity-provider base URL.
///
/// An explicit override is used verbatim (minus trailing slashes). Otherwise
/// the platform domain inside `base_url` is swapped for the identity domain;
/// a base URL without the platform domain cannot be derived from and is a
/// configuration error.
pub fn derive_iam_base_url(
    base_url: &str,
    iam_override: Option<&str>,
) -> Result<String, ImportError> {
    if let Some(iam) = iam_override.filter(|s| !s.trim().is_empty()) {
        return Ok(iam.trim_end_matches('/').to_string());
    }

    if !base_url.contains(PLATFORM_DOMAIN) {
        return Err(ImportError::Config(format!(
            "cannot derive identity URL from '{}': expected a host under {} \
             (pass an explicit identity base URL instead)",
            base_url, PLATFORM_DOMAIN
        )));
    }

    Ok(base_url
        .replace(PLATFORM_DOMAIN, IAM_DOMAIN)
        .trim_end_matches('/')
        .to_string())
}

/// Build the token endpoint for a tenant realm.
pub fn token_endpoint(iam_base_url: &str, tenant: &str) -> String {
    format!(
        "{}/auth/realms/{}/protocol/openid-connect/token",
        iam_base_url.trim_end_matches('/'),
        tenant
    )
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    access_token: Option<String>,
}

/// Exchange `api_key` for an access token.
///
/// One attempt, no retry. The key goes out twice, as a bearer header and as
/// the `refresh_token` form field, because the identity provider wants both.
pub async fn authenticate(
    transport: &dyn HttpTransport,
    settings: &AuthSettings,
    api_key: &str,
) -> Result<AccessToken, ImportError> {
    let token_url = settings.token_url()?;
    tracing::debug!(token_url = %token_url, "Authenticating");

    let fail = |source: ApiError| ImportError::Auth {
        token_url: token_url.clone(),
        source,
    };

    let request = HttpRequest::post(token_url.as_str())
        .header("Content-Type", "application/x-www-form-urlencoded")
        .header("Authorization", format!("Bearer {}", api_key))
        .form(&[
            ("grant_type", "refresh_token"),
            ("client_id", CLIENT_ID),
            ("refresh_token", api_key),
        ]);

    let response = transport
        .send(request)
        .await
        .map_err(|e| fail(ApiError::Http(e)))?;

    if !response.is_success() {
        return Err(fail(ApiError::Api {
            status: response.status,
            message: response.text(),
        }));
    }

    let body: TokenResponse =
        serde_json::from_slice(&response.body).map_err(|e| fail(ApiError::Json(e)))?;

    match body.access_token {
        Some(token) if !token.is_empty() => {
            tracing::debug!("Successfully authenticated");
            Ok(AccessToken::new(token))
        }
        _ => Err(fail(ApiError::MissingField("access_token"))),
    }
}
