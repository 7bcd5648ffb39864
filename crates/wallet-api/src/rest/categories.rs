// Category endpoints

use reqwest::Method;
use serde_json::json;
use tracing::debug;

use crate::error::Error;
use crate::rest::client::{ApiClient, ApiRequest};
use crate::rest::models::{Category, CategoryUpdate, NewCategory, TransactionType};

impl ApiClient {
    /// List categories, optionally restricted to one transaction type.
    ///
    /// `GET /categories?type=income|expense`
    pub async fn list_categories(
        &self,
        kind: Option<TransactionType>,
    ) -> Result<Vec<Category>, Error> {
        let query = kind
            .map(|k| vec![("type", k.to_string())])
            .unwrap_or_default();
        self.get(&["categories"], query).await
    }

    /// `GET /categories/{id}`
    pub async fn get_category(&self, id: &str) -> Result<Category, Error> {
        self.get(&["categories", id], Vec::new()).await
    }

    /// `POST /categories`
    pub async fn create_category(&self, category: &NewCategory) -> Result<Category, Error> {
        debug!(name = %category.name, "creating category");
        self.post(&["categories"], category).await
    }

    /// `PUT /categories/{id}`
    pub async fn update_category(
        &self,
        id: &str,
        update: &CategoryUpdate,
    ) -> Result<Category, Error> {
        debug!(id, "updating category");
        self.put(&["categories", id], update).await
    }

    /// `DELETE /categories/{id}`
    pub async fn delete_category(&self, id: &str) -> Result<(), Error> {
        debug!(id, "deleting category");
        let request = ApiRequest::new(Method::DELETE, self.endpoint(&["categories", id])?);
        self.execute(request).await
    }

    /// `PATCH /categories/{id}/activate`
    pub async fn activate_category(&self, id: &str) -> Result<(), Error> {
        debug!(id, "activating category");
        let request =
            ApiRequest::new(Method::PATCH, self.endpoint(&["categories", id, "activate"])?);
        self.execute(request).await
    }

    /// `PATCH /categories/{id}/deactivate`
    pub async fn deactivate_category(&self, id: &str) -> Result<(), Error> {
        debug!(id, "deactivating category");
        let request =
            ApiRequest::new(Method::PATCH, self.endpoint(&["categories", id, "deactivate"])?);
        self.execute(request).await
    }

    /// Persist a new display order.
    ///
    /// `PUT /categories/reorder` with `{"categoryIds": [...]}`
    pub async fn reorder_categories(&self, ids: &[String]) -> Result<(), Error> {
        debug!(count = ids.len(), "reordering categories");
        let request = ApiRequest::new(Method::PUT, self.endpoint(&["categories", "reorder"])?)
            .json(&json!({ "categoryIds": ids }))?;
        self.execute(request).await
    }
}
