// User profile endpoints

use reqwest::Method;
use secrecy::ExposeSecret;
use serde_json::json;
use tracing::debug;

use crate::error::Error;
use crate::rest::client::{ApiClient, ApiRequest};
use crate::rest::models::{PasswordChange, ProfileUpdate, User};

impl ApiClient {
    /// `GET /users/profile`
    pub async fn get_profile(&self) -> Result<User, Error> {
        self.get(&["users", "profile"], Vec::new()).await
    }

    /// `PUT /users/profile`, returning the updated user.
    pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<User, Error> {
        debug!("updating profile");
        self.put(&["users", "profile"], update).await
    }

    /// `PUT /users/password`
    pub async fn update_password(&self, change: &PasswordChange) -> Result<(), Error> {
        debug!("changing password");
        let body = json!({
            "currentPassword": change.current_password.expose_secret(),
            "newPassword": change.new_password.expose_secret(),
        });
        let request =
            ApiRequest::new(Method::PUT, self.endpoint(&["users", "password"])?).json(&body)?;
        self.execute(request).await
    }

    /// `DELETE /users/account`
    pub async fn delete_account(&self) -> Result<(), Error> {
        debug!("deleting account");
        let request = ApiRequest::new(Method::DELETE, self.endpoint(&["users", "account"])?);
        self.execute(request).await
    }
}
