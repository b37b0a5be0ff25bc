//! Kernel module - server infrastructure and dependencies.

pub mod audit;
pub mod deps;
pub mod memory_store;
pub mod pg_store;
pub mod rate_limit;
pub mod subscription_hub;
pub mod test_dependencies;
pub mod traits;

pub use audit::AuditLog;
pub use deps::{PipelineSettings, ServerDeps, BULK_HARD_LIMIT, NON_ADMIN_BULK_LIMIT};
pub use memory_store::MemoryStore;
pub use pg_store::PgStore;
pub use rate_limit::{MutationRateLimiter, RateLimitExceeded};
pub use subscription_hub::{role_permits, SubscriptionFilter, SubscriptionHub, SubscriptionStream};
pub use traits::*;
