// Transaction endpoints
//
// Balance and summary are computed by the backend; the client only
// relays them.

use chrono::NaiveDate;
use reqwest::Method;
use tracing::debug;

use crate::error::Error;
use crate::rest::client::{ApiClient, ApiRequest};
use crate::rest::models::{
    Balance, NewTransaction, Transaction, TransactionFilters, TransactionSummary,
    TransactionUpdate, date_range_query,
};

impl ApiClient {
    /// `GET /transactions?startDate&endDate&type`
    pub async fn list_transactions(
        &self,
        filters: &TransactionFilters,
    ) -> Result<Vec<Transaction>, Error> {
        self.get(&["transactions"], filters.to_query()).await
    }

    /// `GET /transactions/{id}`
    pub async fn get_transaction(&self, id: &str) -> Result<Transaction, Error> {
        self.get(&["transactions", id], Vec::new()).await
    }

    /// `POST /transactions`
    pub async fn create_transaction(&self, tx: &NewTransaction) -> Result<Transaction, Error> {
        debug!(kind = %tx.kind, amount = tx.amount, "creating transaction");
        self.post(&["transactions"], tx).await
    }

    /// `PUT /transactions/{id}`
    pub async fn update_transaction(
        &self,
        id: &str,
        update: &TransactionUpdate,
    ) -> Result<Transaction, Error> {
        debug!(id, "updating transaction");
        self.put(&["transactions", id], update).await
    }

    /// `DELETE /transactions/{id}`
    pub async fn delete_transaction(&self, id: &str) -> Result<(), Error> {
        debug!(id, "deleting transaction");
        let request = ApiRequest::new(Method::DELETE, self.endpoint(&["transactions", id])?);
        self.execute(request).await
    }

    /// `GET /transactions/balance`
    pub async fn balance(&self) -> Result<Balance, Error> {
        self.get(&["transactions", "balance"], Vec::new()).await
    }

    /// `GET /transactions/summary?startDate&endDate`
    pub async fn summary(
        &self,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<TransactionSummary, Error> {
        self.get(&["transactions", "summary"], date_range_query(start, end))
            .await
    }
}
