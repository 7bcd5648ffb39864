#![allow(clippy::unwrap_used)]
// End-to-end tests for `Wallet` against a wiremock backend.

use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;
use serde_json::json;
use url::Url;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use wallet_core::format::format_signed_amount;
use wallet_core::keys;
use wallet_core::notify::messages;
use wallet_core::session::storage::{REFRESH_TOKEN_KEY, SESSION_KEYS, TOKEN_KEY, USER_KEY};
use wallet_core::{
    Balance, ClientConfig, CoreError, FileStorage, Level, LoginCredentials, MemoryStorage,
    NewTransaction, QueryState, RetryPolicy, Route, SessionEvent, SessionStorage, SessionStore,
    TransactionFilters, TransactionSummary, TransactionType, User, Wallet,
};

// ── Helpers ─────────────────────────────────────────────────────────

fn config(server: &MockServer) -> ClientConfig {
    let mut config = ClientConfig::new(Url::parse(&format!("{}/api", server.uri())).unwrap());
    config.retry = RetryPolicy::none();
    config
}

async fn setup() -> (MockServer, Arc<MemoryStorage>, Wallet) {
    let server = MockServer::start().await;
    let storage = Arc::new(MemoryStorage::new());
    let wallet = Wallet::with_storage(config(&server), storage.clone()).unwrap();
    (server, storage, wallet)
}

fn ok(data: serde_json::Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({ "success": true, "data": data }))
}

fn user_json(name: &str) -> serde_json::Value {
    json!({ "id": "u1", "email": "a@b.com", "name": name, "balance": 0, "isActive": true })
}

fn lunch_json() -> serde_json::Value {
    json!({
        "id": "t1",
        "amount": 50.0,
        "type": "expense",
        "categoryId": "food",
        "description": "Lunch",
        "date": "2024-01-01"
    })
}

async fn mount_login(server: &MockServer, token: &str, refresh: &str) {
    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .and(body_json(json!({ "email": "a@b.com", "password": "secret" })))
        .respond_with(ok(json!({
            "user": user_json("Ana"),
            "token": token,
            "refreshToken": refresh
        })))
        .mount(server)
        .await;
}

async fn login(wallet: &Wallet) {
    wallet
        .login(&LoginCredentials::new("a@b.com", "secret"))
        .await
        .unwrap();
}

async fn wait_for_route(wallet: &Wallet, route: Route) {
    let mut routes = wallet.navigator().subscribe();
    tokio::time::timeout(Duration::from_secs(2), routes.wait_for(|r| *r == route))
        .await
        .unwrap()
        .unwrap();
}

// ── Session lifecycle ───────────────────────────────────────────────

#[tokio::test]
async fn test_login_routes_to_dashboard_and_stores_exactly_the_new_pair() {
    let (server, storage, wallet) = setup().await;
    storage.set(REFRESH_TOKEN_KEY, "stale-refresh").unwrap();
    storage.set("@wallet:token", "stale-access").unwrap();
    mount_login(&server, "access-1", "refresh-1").await;
    let mut notifications = wallet.notifications();

    assert_eq!(wallet.navigator().current(), Route::Login);
    let session = wallet
        .login(&LoginCredentials::new("a@b.com", "secret"))
        .await
        .unwrap();

    assert_eq!(session.user.email, "a@b.com");
    assert_eq!(wallet.navigator().current(), Route::Dashboard);
    assert_eq!(storage.get(TOKEN_KEY).unwrap().as_deref(), Some("access-1"));
    assert_eq!(storage.get(REFRESH_TOKEN_KEY).unwrap().as_deref(), Some("refresh-1"));
    let stored: User = serde_json::from_str(&storage.get(USER_KEY).unwrap().unwrap()).unwrap();
    assert_eq!(stored.name, "Ana");

    let note = notifications.try_recv().unwrap();
    assert_eq!(note.level, Level::Success);
    assert_eq!(note.message, messages::LOGIN_OK);
}

#[tokio::test]
async fn test_failed_login_shows_server_message() {
    let (server, storage, wallet) = setup().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .respond_with(
            ResponseTemplate::new(401)
                .set_body_json(json!({ "success": false, "message": "Credenciais inválidas" })),
        )
        .expect(1)
        .mount(&server)
        .await;
    let mut notifications = wallet.notifications();

    let result = wallet
        .login(&LoginCredentials::new("a@b.com", "wrong"))
        .await;

    assert!(matches!(result, Err(CoreError::InvalidCredentials { .. })));
    assert!(!wallet.session().is_authenticated());
    assert_eq!(storage.get(TOKEN_KEY).unwrap(), None);
    let note = notifications.try_recv().unwrap();
    assert_eq!(note.level, Level::Error);
    assert_eq!(note.message, "Credenciais inválidas");
}

#[tokio::test]
async fn test_logout_is_idempotent() {
    let (server, storage, wallet) = setup().await;
    mount_login(&server, "access-1", "refresh-1").await;

    wallet.logout();
    login(&wallet).await;
    wallet.cache().set_data(&keys::balance(), Balance { balance: 10.0 });
    wallet.logout();
    wallet.logout();

    assert!(!wallet.session().is_authenticated());
    assert_eq!(wallet.navigator().current(), Route::Login);
    assert!(wallet.cache().get::<Balance>(&keys::balance()).is_none());
    for key in SESSION_KEYS {
        assert_eq!(storage.get(key).unwrap(), None);
    }
}

#[tokio::test]
async fn test_failed_refresh_expires_the_session_once() {
    let (server, storage, wallet) = setup().await;
    mount_login(&server, "access-1", "refresh-1").await;
    Mock::given(method("GET"))
        .and(path("/api/transactions/balance"))
        .and(header("authorization", "Bearer access-1"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({ "success": false })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/auth/refresh-token"))
        .and(body_json(json!({ "refreshToken": "refresh-1" })))
        .respond_with(
            ResponseTemplate::new(401)
                .set_body_json(json!({ "success": false, "message": "Refresh token inválido" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    login(&wallet).await;
    let user = wallet.session().user().unwrap();
    wallet.cache().set_data(&keys::profile(), user);
    let mut events = wallet.session().events();

    let result = wallet.balance().await;

    assert!(matches!(result, Err(CoreError::SessionExpired)));
    assert!(!wallet.session().is_authenticated());
    assert_eq!(storage.get(TOKEN_KEY).unwrap(), None);

    wait_for_route(&wallet, Route::Login).await;
    assert!(wallet.cache().get::<User>(&keys::profile()).is_none());

    let mut expired = 0;
    while let Ok(event) = events.try_recv() {
        if event == SessionEvent::Expired {
            expired += 1;
        }
    }
    assert_eq!(expired, 1);
}

#[tokio::test]
async fn test_401_refreshes_and_retries_transparently() {
    let (server, storage, wallet) = setup().await;
    mount_login(&server, "access-1", "refresh-1").await;
    Mock::given(method("GET"))
        .and(path("/api/transactions/balance"))
        .and(header("authorization", "Bearer access-1"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/auth/refresh-token"))
        .respond_with(ok(json!({ "token": "access-2", "refreshToken": "refresh-2" })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/transactions/balance"))
        .and(header("authorization", "Bearer access-2"))
        .respond_with(ok(json!({ "balance": 320.5 })))
        .expect(1)
        .mount(&server)
        .await;

    login(&wallet).await;
    let balance = wallet.balance().await.unwrap();

    assert!((balance.balance - 320.5).abs() < f64::EPSILON);
    assert!(wallet.session().is_authenticated());
    assert_eq!(storage.get(REFRESH_TOKEN_KEY).unwrap().as_deref(), Some("refresh-2"));
}

#[tokio::test]
async fn test_restore_loads_stored_session_and_refreshes_user() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let session_file = dir.path().join("session.json");
    mount_login(&server, "access-1", "refresh-1").await;
    Mock::given(method("GET"))
        .and(path("/api/users/profile"))
        .and(header("authorization", "Bearer access-1"))
        .respond_with(ok(user_json("Ana Maria")))
        .expect(1)
        .mount(&server)
        .await;

    let mut cfg = config(&server);
    cfg.session_store = SessionStore::File(session_file.clone());
    let first = Wallet::new(cfg.clone()).unwrap();
    login(&first).await;
    drop(first);

    let second = Wallet::new(cfg).unwrap();
    assert_eq!(second.navigator().current(), Route::Login);
    let restored = second.restore().await.unwrap().unwrap();

    assert_eq!(restored.user.name, "Ana Maria");
    assert_eq!(second.navigator().current(), Route::Dashboard);
    let stored = FileStorage::new(session_file).get(USER_KEY).unwrap().unwrap();
    assert!(stored.contains("Ana Maria"));
}

#[tokio::test]
async fn test_restore_without_stored_session_stays_signed_out() {
    let (_server, _storage, wallet) = setup().await;
    assert!(wallet.restore().await.unwrap().is_none());
    assert_eq!(wallet.navigator().current(), Route::Login);
}

// ── Cache behaviour ─────────────────────────────────────────────────

#[tokio::test]
async fn test_concurrent_identical_queries_make_one_call() {
    let (server, _storage, wallet) = setup().await;
    mount_login(&server, "access-1", "refresh-1").await;
    Mock::given(method("GET"))
        .and(path("/api/transactions/balance"))
        .respond_with(ok(json!({ "balance": 100.0 })).set_delay(Duration::from_millis(100)))
        .expect(1)
        .mount(&server)
        .await;

    login(&wallet).await;
    let (a, b, c) = tokio::join!(wallet.balance(), wallet.balance(), wallet.balance());

    assert_eq!(a.unwrap(), b.unwrap());
    assert!((c.unwrap().balance - 100.0).abs() < f64::EPSILON);
}

#[tokio::test]
async fn test_creating_a_transaction_refreshes_dependent_reads() {
    let (server, _storage, wallet) = setup().await;
    mount_login(&server, "access-1", "refresh-1").await;

    Mock::given(method("GET"))
        .and(path("/api/transactions"))
        .respond_with(ok(json!([])))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/transactions"))
        .respond_with(ok(json!([lunch_json()])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/transactions/balance"))
        .respond_with(ok(json!({ "balance": 100.0 })))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/transactions/balance"))
        .respond_with(ok(json!({ "balance": 50.0 })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/transactions/summary"))
        .respond_with(ok(json!({ "income": 100.0, "expense": 0.0, "balance": 100.0 })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/transactions"))
        .and(body_json(json!({
            "type": "expense",
            "amount": 50.0,
            "categoryId": "food",
            "description": "Lunch",
            "date": "2024-01-01"
        })))
        .respond_with(ok(lunch_json()))
        .expect(1)
        .mount(&server)
        .await;

    login(&wallet).await;
    let filters = TransactionFilters::default();
    assert!(wallet.transactions(&filters).await.unwrap().is_empty());
    assert!((wallet.balance().await.unwrap().balance - 100.0).abs() < f64::EPSILON);
    wallet.summary(None, None).await.unwrap();
    let mut notifications = wallet.notifications();

    wallet
        .create_transaction(&NewTransaction {
            amount: 50.0,
            kind: TransactionType::Expense,
            category_id: "food".into(),
            description: "Lunch".into(),
            date: chrono::NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        })
        .await
        .unwrap();

    assert_eq!(
        notifications.try_recv().unwrap().message,
        messages::TRANSACTION_CREATED
    );
    let summary_state: QueryState<TransactionSummary> =
        wallet.cache().state(&keys::summary(None, None));
    assert!(!summary_state.is_fresh());

    let list = wallet.transactions(&filters).await.unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(format_signed_amount(list[0].kind, list[0].amount), "- R$ 50,00");
    assert!((wallet.balance().await.unwrap().balance - 50.0).abs() < f64::EPSILON);
}

#[tokio::test]
async fn test_failed_mutation_keeps_cache_and_notifies() {
    let (server, _storage, wallet) = setup().await;
    mount_login(&server, "access-1", "refresh-1").await;
    Mock::given(method("POST"))
        .and(path("/api/categories"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .expect(1)
        .mount(&server)
        .await;

    login(&wallet).await;
    wallet.cache().set_data(&keys::balance(), Balance { balance: 10.0 });
    let mut notifications = wallet.notifications();

    let result = wallet
        .create_category(&wallet_core::NewCategory {
            name: "Mercado".into(),
            kind: TransactionType::Expense,
            color: Some("#22c55e".into()),
            icon: Some("🛒".into()),
        })
        .await;

    assert!(matches!(result, Err(CoreError::Server { status: 500, .. })));
    let note = notifications.try_recv().unwrap();
    assert_eq!(note.level, Level::Error);
    assert!(wallet.cache().get::<Balance>(&keys::balance()).is_some());
}

#[tokio::test]
async fn test_non_json_error_page_uses_the_fallback_message() {
    let (server, _storage, wallet) = setup().await;
    mount_login(&server, "access-1", "refresh-1").await;
    Mock::given(method("POST"))
        .and(path("/api/categories"))
        .respond_with(
            ResponseTemplate::new(502)
                .set_body_string("<html><body>502 Bad Gateway</body></html>"),
        )
        .expect(1)
        .mount(&server)
        .await;

    login(&wallet).await;
    let mut notifications = wallet.notifications();

    let result = wallet
        .create_category(&wallet_core::NewCategory {
            name: "Mercado".into(),
            kind: TransactionType::Expense,
            color: None,
            icon: None,
        })
        .await;

    assert!(matches!(result, Err(CoreError::Server { status: 502, .. })));
    let note = notifications.try_recv().unwrap();
    assert_eq!(note.level, Level::Error);
    assert_eq!(note.message, messages::CATEGORY_CREATE_FAILED);
}
