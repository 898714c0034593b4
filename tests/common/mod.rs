use std::collections::HashMap;
use std::env;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, bail, ensure, Context, Result};
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use diesel::connection::SimpleConnection;
use diesel::r2d2::{ConnectionManager, PooledConnection};
use diesel::PgConnection;
use employee_dialogue::auth::jwt::JwtService;
use employee_dialogue::auth::provider::{IdentityProvider, ProviderIdentity};
use employee_dialogue::config::AppConfig;
use employee_dialogue::db::{self, PgPool};
use employee_dialogue::directory::DirectoryLookup;
use employee_dialogue::identity::Identity;
use employee_dialogue::routes;
use employee_dialogue::state::AppState;
use http_body_util::BodyExt;
use once_cell::sync::Lazy;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use tokio::sync::Mutex;
use tower::util::ServiceExt;
use url::Url;
use uuid::Uuid;

static DB_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

/// Hands out whatever identity was registered for an authorization code.
#[derive(Default)]
pub struct FakeIdentityProvider {
    identities: Mutex<HashMap<String, ProviderIdentity>>,
}

impl FakeIdentityProvider {
    pub async fn register(&self, code: &str, identity: ProviderIdentity) {
        let mut guard = self.identities.lock().await;
        guard.insert(code.to_string(), identity);
    }
}

#[async_trait]
impl IdentityProvider for FakeIdentityProvider {
    fn authorize_url(&self, state: &str) -> Result<Url> {
        let mut url = Url::parse("https://login.test/authorize")?;
        url.query_pairs_mut().append_pair("state", state);
        Ok(url)
    }

    fn logout_url(&self) -> Result<Url> {
        Ok(Url::parse("https://login.test/logout?post_logout_redirect_uri=http%3A%2F%2Flocalhost%2F")?)
    }

    async fn exchange_code(&self, code: &str) -> Result<ProviderIdentity> {
        let guard = self.identities.lock().await;
        guard
            .get(code)
            .cloned()
            .ok_or_else(|| anyhow!("unknown authorization code {code}"))
    }
}

/// Directory keyed by employee display name.
#[derive(Default)]
pub struct FakeDirectory {
    managers: Mutex<HashMap<String, String>>,
    failing: Mutex<bool>,
    delay: Mutex<Option<Duration>>,
}

#[async_trait]
impl DirectoryLookup for FakeDirectory {
    async fn fetch_manager_display_name(&self, user: &Identity) -> Result<Option<String>> {
        let delay = *self.delay.lock().await;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if *self.failing.lock().await {
            bail!("directory unavailable");
        }
        let guard = self.managers.lock().await;
        Ok(guard.get(&user.name).cloned())
    }
}

pub struct TestApp {
    pub state: AppState,
    router: Router,
    provider: Arc<FakeIdentityProvider>,
    directory: Arc<FakeDirectory>,
}

impl TestApp {
    pub async fn new() -> Result<Self> {
        Self::build(true, db::DEFAULT_MAX_POOL_SIZE).await
    }

    #[allow(dead_code)]
    pub async fn allowing_multiple_entries() -> Result<Self> {
        Self::build(false, db::DEFAULT_MAX_POOL_SIZE).await
    }

    #[allow(dead_code)]
    pub async fn with_pool_size(max_size: u32) -> Result<Self> {
        Self::build(true, max_size).await
    }

    async fn build(single_entry_per_owner: bool, pool_size: u32) -> Result<Self> {
        let database_url = env::var("TEST_DATABASE_URL")
            .context("TEST_DATABASE_URL must be set for integration tests")?;

        let config = AppConfig {
            database_url: database_url.clone(),
            database_max_pool_size: pool_size,
            server_host: "127.0.0.1".to_string(),
            server_port: 0,
            session_secret: "test-secret".to_string(),
            session_issuer: "test-issuer".to_string(),
            session_audience: "test-audience".to_string(),
            session_expiry_minutes: 60,
            session_cookie_secure: false,
            cors_allowed_origin: None,
            oidc_authority: "https://login.test/tenant".to_string(),
            oidc_client_id: "test-client".to_string(),
            oidc_client_secret: String::new(),
            oidc_redirect_url: "http://localhost/api/auth/redirect".to_string(),
            oidc_scopes: "openid profile".to_string(),
            oidc_profile_url: "https://directory.test/me".to_string(),
            oidc_post_logout_redirect_url: "http://localhost/".to_string(),
            directory_base_url: "https://directory.test".to_string(),
            directory_scope: "https://directory.test/.default".to_string(),
            directory_timeout_secs: 1,
            single_entry_per_owner,
        };

        let pool = db::init_pool_with_size(&config.database_url, config.database_max_pool_size)?;
        prepare_database(&pool).await?;

        let provider = Arc::new(FakeIdentityProvider::default());
        let directory = Arc::new(FakeDirectory::default());
        let provider_for_state: Arc<dyn IdentityProvider> = provider.clone();
        let directory_for_state: Arc<dyn DirectoryLookup> = directory.clone();
        let jwt = JwtService::from_config(&config)?;
        let state = AppState::new(
            pool.clone(),
            config,
            jwt,
            provider_for_state,
            directory_for_state,
        );
        let router = routes::create_router(state.clone());

        Ok(Self {
            state,
            router,
            provider,
            directory,
        })
    }

    pub async fn cleanup(&self) -> Result<()> {
        let pool = self.state.pool.clone();
        tokio::task::spawn_blocking(move || -> Result<()> {
            let mut conn = pool
                .get()
                .map_err(|err| anyhow!("failed to get cleanup connection: {err}"))?;
            truncate_all(&mut conn)?;
            Ok(())
        })
        .await
        .context("cleanup task panicked")?
    }

    #[allow(dead_code)]
    pub async fn set_manager(&self, employee: &str, manager: &str) {
        let mut guard = self.directory.managers.lock().await;
        guard.insert(employee.to_string(), manager.to_string());
    }

    /// Every directory lookup waits this long before answering.
    #[allow(dead_code)]
    pub async fn delay_directory_lookups(&self, delay: Duration) {
        *self.directory.delay.lock().await = Some(delay);
    }

    #[allow(dead_code)]
    pub async fn fail_directory_lookups(&self) {
        *self.directory.failing.lock().await = true;
    }

    /// Registers `name` with the fake provider and returns an authorization code for it.
    pub async fn register_login(&self, name: &str, email: &str) -> String {
        let code = format!("code-{}", Uuid::new_v4());
        self.provider
            .register(
                &code,
                ProviderIdentity {
                    subject_id: format!("sub-{}", name.to_lowercase()),
                    name: name.to_string(),
                    email: email.to_string(),
                },
            )
            .await;
        code
    }

    /// Starts a login and returns the state value together with its cookie.
    pub async fn begin_login(&self) -> Result<(String, String)> {
        let response = self.get("/api/auth/login", None).await?;
        ensure!(
            response.status() == StatusCode::SEE_OTHER,
            "login start failed with status {}",
            response.status()
        );
        let cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.split(';').next())
            .map(str::to_string)
            .context("login start did not set a state cookie")?;
        let state = cookie
            .split_once('=')
            .map(|(_, value)| value.to_string())
            .context("malformed state cookie")?;
        Ok((state, cookie))
    }

    pub async fn login_token(&self, name: &str, email: &str) -> Result<String> {
        let code = self.register_login(name, email).await;
        let (state, cookie) = self.begin_login().await?;

        let response = self
            .get_with_cookie(
                &format!("/api/auth/redirect?code={code}&state={state}"),
                &cookie,
            )
            .await?;
        ensure!(
            response.status() == StatusCode::OK,
            "login failed with status {}",
            response.status()
        );

        #[derive(serde::Deserialize)]
        struct LoginResponse {
            access_token: String,
        }
        let parsed: LoginResponse = read_json(response).await?;
        Ok(parsed.access_token)
    }

    pub async fn post_json<T: Serialize + ?Sized>(
        &self,
        path: &str,
        payload: &T,
        token: Option<&str>,
    ) -> Result<hyper::Response<Body>> {
        self.send(Method::POST, path, Some(serde_json::to_vec(payload)?), token)
            .await
    }

    #[allow(dead_code)]
    pub async fn put_json<T: Serialize + ?Sized>(
        &self,
        path: &str,
        payload: &T,
        token: Option<&str>,
    ) -> Result<hyper::Response<Body>> {
        self.send(Method::PUT, path, Some(serde_json::to_vec(payload)?), token)
            .await
    }

    pub async fn get(&self, path: &str, token: Option<&str>) -> Result<hyper::Response<Body>> {
        self.send(Method::GET, path, None, token).await
    }

    #[allow(dead_code)]
    pub async fn delete(&self, path: &str, token: Option<&str>) -> Result<hyper::Response<Body>> {
        self.send(Method::DELETE, path, None, token).await
    }

    pub async fn get_with_cookie(
        &self,
        path: &str,
        cookie: &str,
    ) -> Result<hyper::Response<Body>> {
        let request = Request::builder()
            .method(Method::GET)
            .uri(path)
            .header(header::COOKIE, cookie)
            .body(Body::empty())?;
        Ok(self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("infallible response"))
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<Vec<u8>>,
        token: Option<&str>,
    ) -> Result<hyper::Response<Body>> {
        let mut builder = Request::builder().method(method).uri(path);
        if body.is_some() {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
        }
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = builder.body(body.map(Body::from).unwrap_or_else(Body::empty))?;
        Ok(self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("infallible response"))
    }

    /// A connection checked out of the app's own pool, for driving the store directly.
    #[allow(dead_code)]
    pub fn connection(&self) -> Result<PooledConnection<ConnectionManager<PgConnection>>> {
        self.state
            .pool
            .get()
            .map_err(|err| anyhow!("failed to get database connection: {err}"))
    }

    #[allow(dead_code)]
    pub async fn count_rows(&self, table: &'static str) -> Result<i64> {
        let pool = self.state.pool.clone();
        tokio::task::spawn_blocking(move || -> Result<i64> {
            use diesel::prelude::*;
            use diesel::sql_types::BigInt;

            #[derive(QueryableByName)]
            struct Count {
                #[diesel(sql_type = BigInt)]
                count: i64,
            }

            let mut conn = pool
                .get()
                .map_err(|err| anyhow!("failed to get database connection: {err}"))?;
            let row: Count = diesel::sql_query(format!("SELECT COUNT(*) AS count FROM {table}"))
                .get_result(&mut conn)
                .context("failed to count rows")?;
            Ok(row.count)
        })
        .await
        .context("count task panicked")?
    }
}

/// A self-assessment body that passes every check.
#[allow(dead_code)]
pub fn complete_self_assessment() -> Value {
    json!({
        "objective_rating": "Achieved objective",
        "objective_comment": "Shipped the billing migration.",
        "technical_rating": "Meets expectations",
        "project_rating": "Exceeds expectations",
        "methodology_rating": "Mostly in line",
        "abilities_comment": "Grew into the on-call rotation.",
        "efficiency_collaboration": "Meets expectations",
        "efficiency_ownership": "Exceeds expectations",
        "efficiency_resourcefulness": "N/A",
        "efficiency_comment": "Owned the release checklist.",
        "conduct_mutual_trust": "Meets expectations",
        "conduct_proactivity": "Meets expectations",
        "conduct_leadership": "Below expectations",
        "conduct_comment": "Want to mentor more next year.",
        "general_comments": "A good year overall.",
        "feedback_received": "Yes"
    })
}

#[allow(dead_code)]
pub fn complete_final_assessment() -> Value {
    json!({
        "manager_objective_comment": "Objective met on time.",
        "manager_abilities_comment": "Strong technical growth.",
        "manager_efficiency_comment": "Reliable delivery.",
        "manager_general_comments": "Keep it up.",
        "goals_next_period": "Lead the search rewrite."
    })
}

pub async fn acquire_db_lock() -> tokio::sync::MutexGuard<'static, ()> {
    DB_LOCK.lock().await
}

pub async fn body_to_vec(body: Body) -> Result<Vec<u8>> {
    let collected = body
        .collect()
        .await
        .map_err(|err| anyhow!("failed to read response body: {err}"))?;
    Ok(collected.to_bytes().to_vec())
}

pub async fn read_json<T: DeserializeOwned>(response: hyper::Response<Body>) -> Result<T> {
    let body = body_to_vec(response.into_body()).await?;
    Ok(serde_json::from_slice(&body)?)
}

async fn prepare_database(pool: &PgPool) -> Result<()> {
    let pool = pool.clone();
    tokio::task::spawn_blocking(move || -> Result<()> {
        let mut conn = pool
            .get()
            .map_err(|err| anyhow!("failed to acquire connection: {err}"))?;
        db::run_migrations(&mut conn)?;
        truncate_all(&mut conn)?;
        Ok(())
    })
    .await
    .context("migration task panicked")?
}

fn truncate_all(conn: &mut PgConnection) -> Result<()> {
    conn.batch_execute("TRUNCATE TABLE final_assessments, self_assessments RESTART IDENTITY CASCADE;")
        .context("failed to truncate tables")?;
    Ok(())
}
