//! Authenticated request context shared by every platform component.

use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::auth::AccessToken;
use crate::error::ApiError;
use crate::http::{HttpRequest, HttpResponse, HttpTransport};

/// Media type the platform API expects for both requests and responses.
pub const API_MEDIA_TYPE: &str = "application/json; version=1.0";

/// Everything a component needs to talk to the platform: where, as whom, and
/// over which transport.
///
/// Built once after authentication and borrowed by each component for the rest
/// of the run.
#[derive(Clone)]
pub struct ApiContext {
    transport: Arc<dyn HttpTransport>,
    base_url: String,
    token: AccessToken,
}

impl ApiContext {
    pub fn new(base_url: &str, token: AccessToken, transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            transport,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        }
    }

    /// Absolute URL for an API path (which must start with `/`).
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorize(&self, request: HttpRequest) -> HttpRequest {
        request
            .header("Accept", API_MEDIA_TYPE)
            .header("Authorization", format!("Bearer {}", self.token.secret()))
            .header("CorrelationId", "")
    }

    /// Send a request and fail on any non-2xx status, keeping the body.
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        tracing::debug!(method = request.method.as_str(), url = %request.url, "Platform request");
        let response = self.transport.send(request).await?;
        if !response.is_success() {
            return Err(ApiError::Api {
                status: response.status,
                message: response.text(),
            });
        }
        Ok(response)
    }

    /// Authenticated GET, decoding the JSON body.
    pub async fn get_json<T: DeserializeOwned>(&self, url: String) -> Result<T, ApiError> {
        let response = self.execute(self.authorize(HttpRequest::get(url))).await?;
        Ok(serde_json::from_slice(&response.body)?)
    }

    /// Authenticated POST of a JSON body, decoding the JSON response.
    pub async fn post_json<B, T>(&self, url: String, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = self
            .authorize(HttpRequest::post(url))
            .header("Content-Type", API_MEDIA_TYPE)
            .json(body)?;
        let response = self.execute(request).await?;
        Ok(serde_json::from_slice(&response.body)?)
    }
}

impl std::fmt::Debug for ApiContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiContext")
            .field("base_url", &self.base_url)
            .field("token", &self.token)
            .finish_non_exhaustive()
    }
}
