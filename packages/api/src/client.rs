use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;
use store::Resource;
use tracing::{debug, warn};

use crate::auth::{AuthResponse, LoginRequest, RegisterRequest};
use crate::error::{ApiError, ApiResult, ErrorBody};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Header material for a request: always the JSON content type, plus the
/// bearer credential when a token is given.
pub fn request_headers(token: Option<&str>) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    if let Some(token) = token {
        match HeaderValue::from_str(&format!("Bearer {token}")) {
            Ok(mut value) => {
                value.set_sensitive(true);
                headers.insert(AUTHORIZATION, value);
            }
            Err(e) => warn!(error = %e, "token is not a valid header value"),
        }
    }
    headers
}

/// Thin typed wrapper over the REST backend.
#[derive(Clone, Debug)]
pub struct ApiClient {
    http: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> ApiResult<Self> {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> ApiResult<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(ApiError::Network)?;
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(Self { http, base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn item_path<R: Resource>(id: &str) -> String {
        format!(
            "{}/{}",
            R::KIND.collection_path(),
            urlencoding::encode(id)
        )
    }

    pub async fn login(&self, request: &LoginRequest) -> ApiResult<AuthResponse> {
        let response = self
            .send(Method::POST, "auth/login", &request_headers(None), Some(request))
            .await?;
        decode(response).await
    }

    pub async fn register(&self, request: &RegisterRequest) -> ApiResult<AuthResponse> {
        let response = self
            .send(
                Method::POST,
                "auth/register",
                &request_headers(None),
                Some(request),
            )
            .await?;
        decode(response).await
    }

    /// `GET {collection}`: the full collection for the authenticated user.
    pub async fn list<R: Resource>(&self, headers: &HeaderMap) -> ApiResult<Vec<R>> {
        let response = self
            .send::<()>(Method::GET, R::KIND.collection_path(), headers, None)
            .await?;
        decode(response).await
    }

    /// `POST {collection}`. The response body is not used; callers re-fetch.
    pub async fn create<R: Resource>(
        &self,
        headers: &HeaderMap,
        payload: &R::Payload,
    ) -> ApiResult<()> {
        self.send(Method::POST, R::KIND.collection_path(), headers, Some(payload))
            .await?;
        Ok(())
    }

    /// `PUT {collection}/{id}`.
    pub async fn update<R: Resource>(
        &self,
        headers: &HeaderMap,
        id: &str,
        payload: &R::Payload,
    ) -> ApiResult<()> {
        self.send(Method::PUT, &Self::item_path::<R>(id), headers, Some(payload))
            .await?;
        Ok(())
    }

    /// `PATCH {collection}/{id}/favorite` with `{"isFavorite": ..}`.
    pub async fn set_favorite<R: Resource>(
        &self,
        headers: &HeaderMap,
        id: &str,
        is_favorite: bool,
    ) -> ApiResult<()> {
        let path = format!("{}/favorite", Self::item_path::<R>(id));
        let body = json!({ "isFavorite": is_favorite });
        self.send(Method::PATCH, &path, headers, Some(&body)).await?;
        Ok(())
    }

    /// `DELETE {collection}/{id}`.
    pub async fn delete<R: Resource>(&self, headers: &HeaderMap, id: &str) -> ApiResult<()> {
        self.send::<()>(Method::DELETE, &Self::item_path::<R>(id), headers, None)
            .await?;
        Ok(())
    }

    async fn send<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        headers: &HeaderMap,
        body: Option<&B>,
    ) -> ApiResult<Response> {
        let url = self.url(path);
        debug!(%method, %url, "sending request");

        let mut request = self.http.request(method, &url).headers(headers.clone());
        if let Some(body) = body {
            request = request.json(body);
        }
        let response = request.send().await.map_err(ApiError::Network)?;
        classify(response).await
    }
}

/// Map a raw response onto the closed error set. 2xx passes through.
async fn classify(response: Response) -> ApiResult<Response> {
    let status = response.status();
    if status == StatusCode::TOO_MANY_REQUESTS {
        return Err(ApiError::RateLimited);
    }
    if status.is_success() {
        return Ok(response);
    }

    let message = response
        .json::<ErrorBody>()
        .await
        .ok()
        .and_then(ErrorBody::into_message);
    debug!(status = status.as_u16(), ?message, "request failed");
    Err(ApiError::RequestFailed {
        status: status.as_u16(),
        message,
    })
}

async fn decode<T: DeserializeOwned>(response: Response) -> ApiResult<T> {
    response
        .json::<T>()
        .await
        .map_err(|e| ApiError::InvalidResponse(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_headers_without_token() {
        let headers = request_headers(None);
        assert_eq!(headers.get(CONTENT_TYPE).unwrap(), "application/json");
        assert!(headers.get(AUTHORIZATION).is_none());
    }

    #[test]
    fn test_headers_with_token() {
        let headers = request_headers(Some("abc"));
        assert_eq!(headers.get(AUTHORIZATION).unwrap(), "Bearer abc");
        assert_eq!(headers.len(), 2);
    }

    #[test]
    fn test_url_joining() {
        let client = ApiClient::new("http://localhost:8080/api/").unwrap();
        assert_eq!(client.base_url(), "http://localhost:8080/api");
        assert_eq!(client.url("notes"), "http://localhost:8080/api/notes");
        assert_eq!(
            ApiClient::item_path::<store::Note>("a b"),
            "notes/a%20b"
        );
    }
}
