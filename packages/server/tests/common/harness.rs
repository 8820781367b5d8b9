//! Test harness backed by in-memory dependencies.
//!
//! Every test gets a fresh `MemoryStore`, mock gateways and a spy dispatch
//! queue, so nothing leaks between tests and no database is needed.

use std::sync::Arc;

use axum::Router;
use laborhub_core::domains::auth::JwtService;
use laborhub_core::domains::users::User;
use laborhub_core::kernel::test_dependencies::{MemoryStore, TEST_JWT_ISSUER, TEST_JWT_SECRET};
use laborhub_core::kernel::{ServerDeps, TestDependencies};
use laborhub_core::server::{build_router, AppState};
use test_context::AsyncTestContext;

/// Test harness for activities and the HTTP router.
///
/// # Example using test-context
///
/// ```ignore
/// use test_context::test_context;
///
/// #[test_context(TestHarness)]
/// #[tokio::test]
/// async fn my_test(ctx: &TestHarness) {
///     let deps = ctx.server_deps();
///     // ... test code
/// }
/// ```
pub struct TestHarness {
    pub deps: TestDependencies,
    server_deps: Arc<ServerDeps>,
}

impl AsyncTestContext for TestHarness {
    async fn setup() -> Self {
        // Run tests with: RUST_LOG=debug cargo test -- --nocapture
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();

        Self::with_deps(TestDependencies::new())
    }

    async fn teardown(self) {}
}

impl TestHarness {
    pub fn with_deps(deps: TestDependencies) -> Self {
        let server_deps = deps.into_deps();
        Self { deps, server_deps }
    }

    pub fn store(&self) -> &MemoryStore {
        &self.deps.store
    }

    pub fn server_deps(&self) -> &ServerDeps {
        &self.server_deps
    }

    /// Router wired to the same dependencies as `server_deps`.
    pub fn router(&self) -> Router {
        build_router(AppState {
            deps: self.server_deps.clone(),
            db_pool: None,
        })
    }

    pub fn token_for(&self, user: &User) -> String {
        JwtService::new(TEST_JWT_SECRET, TEST_JWT_ISSUER.to_string())
            .create_token(user.id, user.company_id())
            .expect("Failed to create test token")
    }

    /// Run queued push/SMS tasks. Returns how many failed.
    pub async fn drain_dispatch(&self) -> usize {
        self.deps.drain_dispatch().await
    }
}
