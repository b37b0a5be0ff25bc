//! Test harness for integration testing.
//!
//! `TestHarness` wires the pipeline to the in-memory store and a live
//! subscription hub, so most tests need no external services.
//! `PgHarness` starts one shared Postgres container for the store tests that
//! exercise real row locks; those tests are `#[ignore]`d by default.

use std::sync::Arc;

use anyhow::{Context, Result};
use exception_core::common::{Actor, Role};
use exception_core::kernel::{
    BaseEventPublisher, MemoryStore, MutationRateLimiter, PgStore, PipelineSettings, ServerDeps,
    SubscriptionHub,
};
use exception_core::server::middleware::AuthUser;
use sqlx::PgPool;
use test_context::AsyncTestContext;
use testcontainers::runners::AsyncRunner;
use testcontainers::{ContainerAsync, ImageExt};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;

use super::GraphQLClient;

/// Route `tracing` output through the test writer.
/// Run tests with: RUST_LOG=debug cargo test -- --nocapture
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

// =============================================================================
// In-memory harness
// =============================================================================

/// Pipeline dependencies backed by `MemoryStore`.
///
/// # Example using test-context
///
/// ```ignore
/// use test_context::test_context;
///
/// #[test_context(TestHarness)]
/// #[tokio::test]
/// async fn my_test(ctx: &TestHarness) {
///     let response = retry_exception(request, &ctx.operator("op-1"), &ctx.deps).await;
/// }
/// ```
pub struct TestHarness {
    /// Store handle for direct inspection of rows, attempts and audit entries
    pub store: MemoryStore,
    pub hub: SubscriptionHub,
    pub deps: ServerDeps,
}

impl AsyncTestContext for TestHarness {
    async fn setup() -> Self {
        Self::new()
    }

    async fn teardown(self) {
        // Store and hub are dropped with the harness
    }
}

impl TestHarness {
    pub fn new() -> Self {
        init_tracing();
        let store = MemoryStore::new();
        let hub = SubscriptionHub::new();
        let deps = ServerDeps::in_memory(store.clone(), hub.clone());
        Self { store, hub, deps }
    }

    pub fn with_settings(mut self, settings: PipelineSettings) -> Self {
        self.deps = self.deps.with_settings(settings);
        self
    }

    pub fn with_rate_limiter(mut self, rate_limiter: MutationRateLimiter) -> Self {
        self.deps = self.deps.with_rate_limiter(rate_limiter);
        self
    }

    pub fn with_publisher(mut self, publisher: Arc<dyn BaseEventPublisher>) -> Self {
        self.deps = self.deps.with_publisher(publisher);
        self
    }

    pub fn viewer(&self, user_id: &str) -> Actor {
        Actor::new(user_id, vec![Role::Viewer])
    }

    pub fn operator(&self, user_id: &str) -> Actor {
        Actor::new(user_id, vec![Role::Operations])
    }

    pub fn admin(&self, user_id: &str) -> Actor {
        Actor::new(user_id, vec![Role::Admin])
    }

    /// GraphQL client authenticated as `user_id` with `roles`.
    pub fn graphql_as(&self, user_id: &str, roles: &[Role]) -> GraphQLClient {
        GraphQLClient::new(
            Arc::new(self.deps.clone()),
            Some(AuthUser {
                user_id: user_id.to_string(),
                roles: roles.to_vec(),
            }),
        )
    }

    /// GraphQL client without an authenticated caller.
    pub fn graphql_anonymous(&self) -> GraphQLClient {
        GraphQLClient::new(Arc::new(self.deps.clone()), None)
    }

    /// Give spawned tasks a chance to run (subscriber delivery, etc.).
    pub async fn settle(&self) {
        tokio::time::sleep(tokio::time::Duration::from_millis(20)).await;
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Postgres harness
// =============================================================================

/// Shared Postgres container, started once per test binary.
struct SharedPostgres {
    db_url: String,
    // Keep the container alive for the entire test run
    _postgres: ContainerAsync<Postgres>,
}

static SHARED_POSTGRES: OnceCell<SharedPostgres> = OnceCell::const_new();

impl SharedPostgres {
    async fn init() -> Result<Self> {
        init_tracing();

        let postgres = Postgres::default()
            .with_tag("16")
            .with_cmd(["-c", "max_connections=200"])
            .start()
            .await
            .context("Failed to start Postgres container")?;

        let pg_host = postgres.get_host().await?;
        let pg_port = postgres.get_host_port_ipv4(5432).await?;
        let db_url = format!(
            "postgresql://postgres:postgres@{}:{}/postgres",
            pg_host, pg_port
        );

        let pool = PgPool::connect(&db_url)
            .await
            .context("Failed to connect to Postgres for migrations")?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .context("Failed to run migrations")?;

        Ok(Self {
            db_url,
            _postgres: postgres,
        })
    }

    async fn get() -> &'static Self {
        SHARED_POSTGRES
            .get_or_init(|| async {
                Self::init()
                    .await
                    .expect("Failed to initialize shared Postgres container")
            })
            .await
    }
}

/// Pipeline dependencies backed by `PgStore` on the shared container.
pub struct PgHarness {
    pub db_pool: PgPool,
    pub hub: SubscriptionHub,
    pub deps: ServerDeps,
}

impl AsyncTestContext for PgHarness {
    async fn setup() -> Self {
        Self::new()
            .await
            .expect("Failed to create Postgres test harness")
    }
}

impl PgHarness {
    pub async fn new() -> Result<Self> {
        let infra = SharedPostgres::get().await;

        let db_pool = PgPool::connect(&infra.db_url)
            .await
            .context("Failed to connect to test database")?;

        let store = Arc::new(PgStore::new(db_pool.clone()));
        let hub = SubscriptionHub::new();
        let deps = ServerDeps::new(
            store.clone(),
            store,
            hub.clone(),
            MutationRateLimiter::disabled(),
            PipelineSettings::default(),
        );

        Ok(Self { db_pool, hub, deps })
    }

    pub fn operator(&self, user_id: &str) -> Actor {
        Actor::new(user_id, vec![Role::Operations])
    }

    pub fn admin(&self, user_id: &str) -> Actor {
        Actor::new(user_id, vec![Role::Admin])
    }
}
