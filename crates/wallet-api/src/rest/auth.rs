// Authentication endpoints
//
// All three calls are anonymous: they carry no bearer credential and
// never enter the 401 refresh path, so a rejected refresh cannot recurse.

use reqwest::{Method, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde_json::json;
use tracing::debug;

use crate::auth::TokenPair;
use crate::error::Error;
use crate::rest::client::{ApiClient, ApiRequest, error_from_status, parse_envelope};
use crate::rest::models::{AuthResponse, LoginCredentials, RegisterData, TokenResponse};

impl ApiClient {
    /// Exchange email + password for a user and token pair.
    ///
    /// `POST /auth/login`. A 401 here means the credentials were wrong,
    /// not that a session expired.
    pub async fn login(&self, credentials: &LoginCredentials) -> Result<AuthResponse, Error> {
        debug!(email = %credentials.email, "logging in");
        let body = json!({
            "email": credentials.email,
            "password": credentials.password.expose_secret(),
        });
        let request = ApiRequest::new(Method::POST, self.endpoint(&["auth", "login"])?)
            .json(&body)?
            .anonymous();

        let resp = self.send(&request).await?;
        if resp.status() == StatusCode::UNAUTHORIZED {
            let body = resp.text().await.unwrap_or_default();
            let message = error_from_status(StatusCode::UNAUTHORIZED, &body)
                .server_message()
                .unwrap_or_default()
                .to_owned();
            return Err(Error::InvalidCredentials { message });
        }
        parse_envelope(resp).await
    }

    /// Create an account and sign in.
    ///
    /// `POST /auth/register`. An empty CPF is left out of the body.
    pub async fn register(&self, data: &RegisterData) -> Result<AuthResponse, Error> {
        debug!(email = %data.email, "registering account");
        let mut body = json!({
            "name": data.name,
            "email": data.email,
            "password": data.password.expose_secret(),
        });
        if let Some(cpf) = data.cpf.as_deref().filter(|c| !c.trim().is_empty()) {
            body["cpf"] = json!(cpf);
        }
        let request = ApiRequest::new(Method::POST, self.endpoint(&["auth", "register"])?)
            .json(&body)?
            .anonymous();

        let resp = self.send(&request).await?;
        parse_envelope(resp).await
    }

    /// Exchange a refresh token for a new pair.
    ///
    /// `POST /auth/refresh-token`. Any client-error status maps to
    /// [`Error::RefreshExpired`].
    pub async fn refresh_token(&self, refresh_token: &SecretString) -> Result<TokenPair, Error> {
        debug!("refreshing access token");
        let body = json!({ "refreshToken": refresh_token.expose_secret() });
        let request = ApiRequest::new(Method::POST, self.endpoint(&["auth", "refresh-token"])?)
            .json(&body)?
            .anonymous();

        // Straight to the wire: the interceptor itself calls this method.
        let resp = self.dispatch(&request, None).await?;
        let tokens: TokenResponse = parse_envelope(resp).await.map_err(|e| match e {
            Error::Validation { message, .. }
            | Error::Unauthorized { message }
            | Error::Forbidden { message }
            | Error::NotFound { message } => Error::RefreshExpired { message },
            other => other,
        })?;
        Ok(TokenPair::new(tokens.token, tokens.refresh_token))
    }
}
