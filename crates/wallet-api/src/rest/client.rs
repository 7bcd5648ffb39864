// REST API HTTP client
//
// Wraps `reqwest::Client` with URL construction, bearer attachment,
// the 401 refresh-then-retry interceptor, and `{success, data, message}`
// envelope unwrapping. Endpoint groups (auth, users, categories,
// transactions) are inherent methods in separate files to keep this
// module focused on transport mechanics.

use std::sync::Arc;

use reqwest::{Method, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, trace, warn};
use url::Url;

use crate::auth::{CredentialProvider, RefreshPolicy};
use crate::error::{Error, FieldMessage};
use crate::rest::models::ApiEnvelope;
use crate::transport::TransportConfig;

const BODY_PREVIEW_CHARS: usize = 200;

/// A request description that can be dispatched more than once.
///
/// The interceptor replays it after a refresh, so the body is kept as an
/// owned JSON value rather than a streaming body.
#[derive(Debug, Clone)]
pub(crate) struct ApiRequest {
    method: Method,
    url: Url,
    query: Vec<(&'static str, String)>,
    body: Option<serde_json::Value>,
    /// Attach the bearer credential and take part in 401 refresh.
    authenticated: bool,
}

impl ApiRequest {
    pub(crate) fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            query: Vec::new(),
            body: None,
            authenticated: true,
        }
    }

    pub(crate) fn query(mut self, query: Vec<(&'static str, String)>) -> Self {
        self.query = query;
        self
    }

    pub(crate) fn json(mut self, body: &(impl Serialize + ?Sized)) -> Result<Self, Error> {
        self.body = Some(serde_json::to_value(body)?);
        Ok(self)
    }

    /// Send without credentials and never refresh (auth endpoints).
    pub(crate) fn anonymous(mut self) -> Self {
        self.authenticated = false;
        self
    }
}

/// Raw HTTP client for the wallet backend.
///
/// All typed methods return the unwrapped `data` payload; the envelope is
/// stripped before the caller sees it. Credentials are read from the
/// injected [`CredentialProvider`] on every call, so a login or refresh
/// performed elsewhere is picked up immediately.
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
    credentials: Arc<dyn CredentialProvider>,
    refresh_policy: RefreshPolicy,
    /// Serializes refreshes under [`RefreshPolicy::SingleFlight`].
    refresh_lock: tokio::sync::Mutex<()>,
}

impl ApiClient {
    /// Create a client from a `TransportConfig`.
    ///
    /// `base_url` is the API root, e.g. `http://localhost:3000/api`.
    pub fn new(
        base_url: Url,
        credentials: Arc<dyn CredentialProvider>,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self::with_client(http, base_url, credentials))
    }

    /// Create a client with a pre-built `reqwest::Client`.
    pub fn with_client(
        http: reqwest::Client,
        base_url: Url,
        credentials: Arc<dyn CredentialProvider>,
    ) -> Self {
        Self {
            http,
            base_url,
            credentials,
            refresh_policy: RefreshPolicy::default(),
            refresh_lock: tokio::sync::Mutex::new(()),
        }
    }

    pub fn with_refresh_policy(mut self, policy: RefreshPolicy) -> Self {
        self.refresh_policy = policy;
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn refresh_policy(&self) -> RefreshPolicy {
        self.refresh_policy
    }

    // ── URL builders ─────────────────────────────────────────────────

    /// Build `{base}/{segments...}`, percent-encoding each segment.
    pub(crate) fn endpoint(&self, segments: &[&str]) -> Result<Url, Error> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| Error::InvalidUrl(url::ParseError::RelativeUrlWithCannotBeABaseBase))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    // ── Request helpers ──────────────────────────────────────────────

    pub(crate) async fn get<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        query: Vec<(&'static str, String)>,
    ) -> Result<T, Error> {
        let request = ApiRequest::new(Method::GET, self.endpoint(segments)?).query(query);
        let resp = self.send(&request).await?;
        parse_envelope(resp).await
    }

    pub(crate) async fn post<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        body: &(impl Serialize + ?Sized),
    ) -> Result<T, Error> {
        let request = ApiRequest::new(Method::POST, self.endpoint(segments)?).json(body)?;
        let resp = self.send(&request).await?;
        parse_envelope(resp).await
    }

    pub(crate) async fn put<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        body: &(impl Serialize + ?Sized),
    ) -> Result<T, Error> {
        let request = ApiRequest::new(Method::PUT, self.endpoint(segments)?).json(body)?;
        let resp = self.send(&request).await?;
        parse_envelope(resp).await
    }

    /// Send a request whose response carries no payload we need.
    pub(crate) async fn execute(&self, request: ApiRequest) -> Result<(), Error> {
        let resp = self.send(&request).await?;
        expect_success(resp).await
    }

    // ── Interceptor ──────────────────────────────────────────────────

    /// Dispatch `request`, refreshing the credential at most once on 401.
    ///
    /// The replayed request is never refreshed again: a second 401 is
    /// returned to the caller as-is.
    pub(crate) async fn send(&self, request: &ApiRequest) -> Result<reqwest::Response, Error> {
        let token = if request.authenticated {
            self.credentials.access_token()
        } else {
            None
        };

        let resp = self.dispatch(request, token.as_ref()).await?;
        if !request.authenticated || resp.status() != StatusCode::UNAUTHORIZED {
            return Ok(resp);
        }

        debug!(url = %request.url, "received 401, attempting token refresh");
        let fresh = self.refresh_after_unauthorized(token.as_ref()).await?;
        self.dispatch(request, Some(&fresh)).await
    }

    /// One HTTP round trip, no interceptor.
    pub(crate) async fn dispatch(
        &self,
        request: &ApiRequest,
        token: Option<&SecretString>,
    ) -> Result<reqwest::Response, Error> {
        debug!("{} {}", request.method, request.url);

        let mut builder = self
            .http
            .request(request.method.clone(), request.url.clone());
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(ref body) = request.body {
            builder = builder.json(body);
        }
        if let Some(token) = token {
            builder = builder.bearer_auth(token.expose_secret());
        }

        builder.send().await.map_err(Error::Transport)
    }

    async fn refresh_after_unauthorized(
        &self,
        rejected: Option<&SecretString>,
    ) -> Result<SecretString, Error> {
        match self.refresh_policy {
            RefreshPolicy::PerRequest => self.renew_session().await,
            RefreshPolicy::SingleFlight => {
                let _guard = self.refresh_lock.lock().await;
                // Someone refreshed while we waited: reuse their token.
                if let Some(current) = self.credentials.access_token() {
                    let superseded = rejected
                        .is_none_or(|old| old.expose_secret() != current.expose_secret());
                    if superseded {
                        trace!("token already refreshed by a concurrent request");
                        return Ok(current);
                    }
                }
                self.renew_session().await
            }
        }
    }

    /// Exchange the stored refresh token. Any failure expires the session.
    async fn renew_session(&self) -> Result<SecretString, Error> {
        let Some(refresh_token) = self.credentials.refresh_token() else {
            warn!("no refresh token stored, expiring session");
            self.credentials.expire();
            return Err(Error::SessionExpired);
        };

        match self.refresh_token(&refresh_token).await {
            Ok(tokens) => {
                let access = tokens.access.clone();
                self.credentials.store_refreshed(tokens);
                debug!("token refresh successful");
                Ok(access)
            }
            Err(e) => {
                warn!(error = %e, "token refresh failed, expiring session");
                self.credentials.expire();
                Err(Error::SessionExpired)
            }
        }
    }
}

// ── Response parsing ────────────────────────────────────────────────

/// Unwrap `{ success, data, message }`, mapping non-2xx statuses onto the
/// error taxonomy.
pub(crate) async fn parse_envelope<T: DeserializeOwned>(
    resp: reqwest::Response,
) -> Result<T, Error> {
    let status = resp.status();
    let body = resp.text().await.map_err(Error::Transport)?;

    if !status.is_success() {
        return Err(error_from_status(status, &body));
    }

    let envelope: ApiEnvelope<T> = serde_json::from_str(&body).map_err(|e| {
        let preview = preview(&body);
        Error::Deserialization {
            message: format!("{e} (body preview: {preview:?})"),
            body: body.clone(),
        }
    })?;

    if !envelope.success {
        return Err(Error::Server {
            status: status.as_u16(),
            message: envelope.message.unwrap_or_default(),
            body: String::new(),
        });
    }

    envelope.data.ok_or_else(|| Error::Deserialization {
        message: "response envelope has no data".into(),
        body,
    })
}

/// Check the status of a payload-less response (e.g. DELETE, 204).
pub(crate) async fn expect_success(resp: reqwest::Response) -> Result<(), Error> {
    let status = resp.status();
    let body = resp.text().await.map_err(Error::Transport)?;

    if !status.is_success() {
        return Err(error_from_status(status, &body));
    }

    // A 200 may still carry `success: false`.
    if let Ok(envelope) = serde_json::from_str::<ApiEnvelope<serde_json::Value>>(&body) {
        if !envelope.success {
            return Err(Error::Server {
                status: status.as_u16(),
                message: envelope.message.unwrap_or_default(),
                body: String::new(),
            });
        }
    }
    Ok(())
}

/// Map a non-success status + body onto an [`Error`] variant, keeping the
/// server's `message` when the body is JSON and has one.
///
/// Anything else leaves `message` empty; the raw body is only logged and,
/// for [`Error::Server`], kept as a truncated preview.
pub(crate) fn error_from_status(status: StatusCode, body: &str) -> Error {
    let parsed = serde_json::from_str::<serde_json::Value>(body).ok();
    let message = parsed
        .as_ref()
        .and_then(|v| v.get("message").or_else(|| v.get("error")))
        .and_then(serde_json::Value::as_str)
        .map(str::to_owned);
    if message.is_none() && !body.is_empty() {
        debug!(%status, body = %preview(body), "error response without a JSON message");
    }
    let message = message.unwrap_or_default();

    match status {
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
            let fields = parsed
                .as_ref()
                .and_then(|v| v.get("errors"))
                .and_then(|e| serde_json::from_value::<Vec<FieldMessage>>(e.clone()).ok())
                .unwrap_or_default();
            Error::Validation { message, fields }
        }
        StatusCode::UNAUTHORIZED => Error::Unauthorized { message },
        StatusCode::FORBIDDEN => Error::Forbidden { message },
        StatusCode::NOT_FOUND => Error::NotFound { message },
        StatusCode::CONFLICT => Error::Conflict { message },
        _ => Error::Server {
            status: status.as_u16(),
            body: if parsed.is_some() {
                String::new()
            } else {
                preview(body)
            },
            message,
        },
    }
}

fn preview(body: &str) -> String {
    body.chars().take(BODY_PREVIEW_CHARS).collect()
}
