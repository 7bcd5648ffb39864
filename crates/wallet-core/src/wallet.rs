// ── Wallet ──
//
// Application root. Owns the API client, the session, the query cache,
// the navigator and the notification channel, and exposes every backend
// operation as a typed query or mutation. Queries go through the cache;
// mutations invalidate the keys they affect and announce their outcome.

use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::NaiveDate;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info};
use wallet_api::{
    ApiClient, Balance, Category, CategoryUpdate, CredentialProvider, LoginCredentials,
    NewCategory, NewTransaction, PasswordChange, ProfileUpdate, RegisterData, TlsMode,
    Transaction, TransactionFilters, TransactionSummary, TransactionType, TransactionUpdate,
    TransportConfig, User,
};

use crate::cache::{QueryCache, QueryKey};
use crate::config::{ClientConfig, SessionStore, TlsVerification};
use crate::error::CoreError;
use crate::keys;
use crate::navigation::{Navigator, Route};
use crate::notify::{Notification, Notifier, messages};
use crate::session::{FileStorage, MemoryStorage, Session, SessionEvent, SessionManager, SessionStorage};
use crate::validation::{CategoryForm, TransactionForm};

/// The main entry point for front ends.
///
/// Cheaply cloneable via `Arc<WalletInner>`.
#[derive(Clone)]
pub struct Wallet {
    inner: Arc<WalletInner>,
}

struct WalletInner {
    config: ClientConfig,
    api: Arc<ApiClient>,
    session: Arc<SessionManager>,
    cache: Arc<QueryCache>,
    navigator: Arc<Navigator>,
    notifier: Notifier,
    watcher: Mutex<Option<JoinHandle<()>>>,
}

impl Drop for WalletInner {
    fn drop(&mut self) {
        let watcher = self.watcher.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Some(handle) = watcher.take() {
            handle.abort();
        }
    }
}

impl Wallet {
    /// Build a wallet from configuration. Does not touch the network;
    /// call [`restore()`](Self::restore) or [`login()`](Self::login).
    pub fn new(config: ClientConfig) -> Result<Self, CoreError> {
        let storage: Arc<dyn SessionStorage> = match &config.session_store {
            SessionStore::Memory => Arc::new(MemoryStorage::new()),
            SessionStore::File(path) => Arc::new(FileStorage::new(path.clone())),
        };
        Self::with_storage(config, storage)
    }

    /// Build a wallet around caller-provided session storage.
    pub fn with_storage(
        config: ClientConfig,
        storage: Arc<dyn SessionStorage>,
    ) -> Result<Self, CoreError> {
        let session = Arc::new(SessionManager::new(storage));
        let credentials: Arc<dyn CredentialProvider> = session.clone();
        let api = ApiClient::new(config.api_url.clone(), credentials, &build_transport(&config))?
            .with_refresh_policy(config.refresh_policy);
        let cache = Arc::new(QueryCache::new(config.retry).with_capacity(config.cache_capacity));
        let navigator = Arc::new(Navigator::new(Arc::clone(&session)));

        let wallet = Self {
            inner: Arc::new(WalletInner {
                config,
                api: Arc::new(api),
                session,
                cache,
                navigator,
                notifier: Notifier::new(),
                watcher: Mutex::new(None),
            }),
        };
        wallet.spawn_session_watcher();
        Ok(wallet)
    }

    // ── Accessors ────────────────────────────────────────────────────

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    pub fn api(&self) -> &ApiClient {
        &self.inner.api
    }

    pub fn session(&self) -> &Arc<SessionManager> {
        &self.inner.session
    }

    pub fn cache(&self) -> &Arc<QueryCache> {
        &self.inner.cache
    }

    pub fn navigator(&self) -> &Arc<Navigator> {
        &self.inner.navigator
    }

    /// Receive mutation outcomes from now on.
    pub fn notifications(&self) -> broadcast::Receiver<Notification> {
        self.inner.notifier.subscribe()
    }

    // ── Session ──────────────────────────────────────────────────────

    /// Load the stored session, if any, and open the view it allows.
    pub async fn restore(&self) -> Result<Option<Session>, CoreError> {
        let restored = self.inner.session.restore(&self.inner.api).await?;
        let route = self.inner.navigator.current();
        self.inner.navigator.navigate(route);
        Ok(restored)
    }

    pub async fn login(&self, credentials: &LoginCredentials) -> Result<Session, CoreError> {
        self.inner.cache.clear();
        let result = self.inner.session.login(&self.inner.api, credentials).await;
        if result.is_ok() {
            self.inner.navigator.navigate(Route::Dashboard);
        }
        self.inner
            .notifier
            .outcome(result, messages::LOGIN_OK, messages::LOGIN_FAILED)
    }

    pub async fn register(&self, data: &RegisterData) -> Result<Session, CoreError> {
        self.inner.cache.clear();
        let result = self.inner.session.register(&self.inner.api, data).await;
        if result.is_ok() {
            self.inner.navigator.navigate(Route::Dashboard);
        }
        self.inner
            .notifier
            .outcome(result, messages::REGISTER_OK, messages::REGISTER_FAILED)
    }

    /// Sign out and forget every cached resource. Idempotent.
    pub fn logout(&self) {
        self.inner.session.logout();
        self.inner.cache.clear();
        self.inner.navigator.navigate(Route::Login);
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub async fn transactions(
        &self,
        filters: &TransactionFilters,
    ) -> Result<Vec<Transaction>, CoreError> {
        let owned = filters.clone();
        self.fetch(keys::transaction_list(filters), move |api| {
            let filters = owned.clone();
            async move { api.list_transactions(&filters).await }
        })
        .await
    }

    pub async fn transaction(&self, id: &str) -> Result<Transaction, CoreError> {
        require_id(id)?;
        let owned = id.to_owned();
        self.fetch(keys::transaction(id), move |api| {
            let id = owned.clone();
            async move { api.get_transaction(&id).await }
        })
        .await
    }

    pub async fn balance(&self) -> Result<Balance, CoreError> {
        self.fetch(keys::balance(), |api| async move { api.balance().await })
            .await
    }

    pub async fn summary(
        &self,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<TransactionSummary, CoreError> {
        self.fetch(keys::summary(start, end), move |api| async move {
            api.summary(start, end).await
        })
        .await
    }

    pub async fn categories(
        &self,
        kind: Option<TransactionType>,
    ) -> Result<Vec<Category>, CoreError> {
        self.fetch(keys::category_list(kind), move |api| async move {
            api.list_categories(kind).await
        })
        .await
    }

    pub async fn category(&self, id: &str) -> Result<Category, CoreError> {
        require_id(id)?;
        let owned = id.to_owned();
        self.fetch(keys::category(id), move |api| {
            let id = owned.clone();
            async move { api.get_category(&id).await }
        })
        .await
    }

    pub async fn profile(&self) -> Result<User, CoreError> {
        self.fetch(keys::profile(), |api| async move { api.get_profile().await })
            .await
    }

    // ── Transaction mutations ────────────────────────────────────────

    pub async fn create_transaction(&self, tx: &NewTransaction) -> Result<Transaction, CoreError> {
        let result = self
            .mutate(
                self.inner.api.create_transaction(tx),
                &keys::transaction_writes(),
            )
            .await;
        self.inner.notifier.outcome(
            result,
            messages::TRANSACTION_CREATED,
            messages::TRANSACTION_CREATE_FAILED,
        )
    }

    /// Validate the new-transaction form and submit it.
    pub async fn submit_transaction(&self, form: &TransactionForm) -> Result<Transaction, CoreError> {
        let tx = form.validate()?;
        self.create_transaction(&tx).await
    }

    pub async fn update_transaction(
        &self,
        id: &str,
        update: &TransactionUpdate,
    ) -> Result<Transaction, CoreError> {
        require_id(id)?;
        let result = self
            .mutate(
                self.inner.api.update_transaction(id, update),
                &transaction_writes_for(id),
            )
            .await;
        self.inner.notifier.outcome(
            result,
            messages::TRANSACTION_UPDATED,
            messages::TRANSACTION_UPDATE_FAILED,
        )
    }

    pub async fn delete_transaction(&self, id: &str) -> Result<(), CoreError> {
        require_id(id)?;
        let result = self
            .mutate(
                self.inner.api.delete_transaction(id),
                &transaction_writes_for(id),
            )
            .await;
        self.inner.notifier.outcome(
            result,
            messages::TRANSACTION_DELETED,
            messages::TRANSACTION_DELETE_FAILED,
        )
    }

    // ── Category mutations ───────────────────────────────────────────

    pub async fn create_category(&self, category: &NewCategory) -> Result<Category, CoreError> {
        let result = self
            .mutate(
                self.inner.api.create_category(category),
                &[keys::categories()],
            )
            .await;
        self.inner.notifier.outcome(
            result,
            messages::CATEGORY_CREATED,
            messages::CATEGORY_CREATE_FAILED,
        )
    }

    /// Validate the category form against the custom-category limit and
    /// submit it.
    pub async fn submit_category(&self, form: &CategoryForm) -> Result<Category, CoreError> {
        let custom = self
            .categories(None)
            .await?
            .iter()
            .filter(|c| !c.is_default)
            .count();
        let category = form.validate_new(custom)?;
        self.create_category(&category).await
    }

    pub async fn update_category(
        &self,
        id: &str,
        update: &CategoryUpdate,
    ) -> Result<Category, CoreError> {
        require_id(id)?;
        let result = self
            .mutate(
                self.inner.api.update_category(id, update),
                &category_writes_for(id),
            )
            .await;
        self.inner.notifier.outcome(
            result,
            messages::CATEGORY_UPDATED,
            messages::CATEGORY_UPDATE_FAILED,
        )
    }

    pub async fn delete_category(&self, id: &str) -> Result<(), CoreError> {
        require_id(id)?;
        let result = self
            .mutate(
                self.inner.api.delete_category(id),
                &category_writes_for(id),
            )
            .await;
        self.inner.notifier.outcome(
            result,
            messages::CATEGORY_DELETED,
            messages::CATEGORY_DELETE_FAILED,
        )
    }

    pub async fn activate_category(&self, id: &str) -> Result<(), CoreError> {
        require_id(id)?;
        let result = self
            .mutate(
                self.inner.api.activate_category(id),
                &category_writes_for(id),
            )
            .await;
        self.inner.notifier.outcome(
            result,
            messages::CATEGORY_ACTIVATED,
            messages::CATEGORY_ACTIVATE_FAILED,
        )
    }

    pub async fn deactivate_category(&self, id: &str) -> Result<(), CoreError> {
        require_id(id)?;
        let result = self
            .mutate(
                self.inner.api.deactivate_category(id),
                &category_writes_for(id),
            )
            .await;
        self.inner.notifier.outcome(
            result,
            messages::CATEGORY_DEACTIVATED,
            messages::CATEGORY_DEACTIVATE_FAILED,
        )
    }

    /// Persist a new display order, given every category id in order.
    pub async fn reorder_categories(&self, ids: &[String]) -> Result<(), CoreError> {
        if ids.iter().any(|id| id.trim().is_empty()) {
            return Err(CoreError::validation("category ids must not be empty"));
        }
        let result = self
            .mutate(
                self.inner.api.reorder_categories(ids),
                &[keys::categories()],
            )
            .await;
        self.inner.notifier.outcome(
            result,
            messages::CATEGORIES_REORDERED,
            messages::CATEGORIES_REORDER_FAILED,
        )
    }

    // ── Account mutations ────────────────────────────────────────────

    /// Update the profile and the session's user snapshot.
    pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<User, CoreError> {
        let result = async {
            let user = self.inner.api.update_profile(update).await?;
            self.inner.session.update_user(user.clone())?;
            self.inner.cache.set_data(&keys::profile(), user.clone());
            Ok(user)
        }
        .await;
        self.inner.notifier.outcome(
            result,
            messages::PROFILE_UPDATED,
            messages::PROFILE_UPDATE_FAILED,
        )
    }

    pub async fn change_password(&self, change: &PasswordChange) -> Result<(), CoreError> {
        let result = self
            .inner
            .api
            .update_password(change)
            .await
            .map_err(CoreError::from);
        self.inner.notifier.outcome(
            result,
            messages::PASSWORD_UPDATED,
            messages::PASSWORD_UPDATE_FAILED,
        )
    }

    /// Delete the account, then sign out.
    pub async fn delete_account(&self) -> Result<(), CoreError> {
        let result = self
            .inner
            .api
            .delete_account()
            .await
            .map_err(CoreError::from);
        if result.is_ok() {
            info!("account deleted");
            self.logout();
        }
        self.inner.notifier.outcome(
            result,
            messages::ACCOUNT_DELETED,
            messages::ACCOUNT_DELETE_FAILED,
        )
    }

    // ── Internals ────────────────────────────────────────────────────

    /// Cached read of `key` through `call`.
    async fn fetch<T, F, Fut>(&self, key: QueryKey, call: F) -> Result<T, CoreError>
    where
        T: Clone + Send + Sync + 'static,
        F: Fn(Arc<ApiClient>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, wallet_api::Error>> + Send + 'static,
    {
        let api = Arc::clone(&self.inner.api);
        self.inner
            .cache
            .query(&key, move || {
                let request = call(Arc::clone(&api));
                async move { request.await.map_err(CoreError::from) }
            })
            .await
    }

    async fn mutate<T>(
        &self,
        request: impl Future<Output = Result<T, wallet_api::Error>>,
        invalidates: &[QueryKey],
    ) -> Result<T, CoreError> {
        self.inner
            .cache
            .mutate(async { request.await.map_err(CoreError::from) }, invalidates)
            .await
    }

    /// Forward session transitions to the navigator and drop cached data
    /// when the session expires underneath us.
    fn spawn_session_watcher(&self) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            debug!("no tokio runtime, session watcher not started");
            return;
        };
        let mut events = self.inner.session.events();
        let cache = Arc::clone(&self.inner.cache);
        let navigator = Arc::clone(&self.inner.navigator);

        let handle = runtime.spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => {
                        if event == SessionEvent::Expired {
                            cache.clear();
                        }
                        navigator.on_session_event(event);
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        debug!(skipped, "session watcher lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });
        *self
            .inner
            .watcher
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(handle);
    }
}

fn build_transport(config: &ClientConfig) -> TransportConfig {
    let tls = match &config.tls {
        TlsVerification::SystemDefaults => TlsMode::System,
        TlsVerification::CustomCa(path) => TlsMode::CustomCa(path.clone()),
        TlsVerification::DangerAcceptInvalid => TlsMode::DangerAcceptInvalid,
    };
    TransportConfig {
        tls,
        timeout: config.timeout,
    }
}

fn require_id(id: &str) -> Result<(), CoreError> {
    if id.trim().is_empty() {
        return Err(CoreError::validation("id must not be empty"));
    }
    Ok(())
}

fn transaction_writes_for(id: &str) -> Vec<QueryKey> {
    let mut keys = keys::transaction_writes();
    keys.push(keys::transaction(id));
    keys
}

fn category_writes_for(id: &str) -> Vec<QueryKey> {
    vec![keys::categories(), keys::category(id)]
}
