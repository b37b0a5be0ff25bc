use std::sync::Arc;

use juniper::{FieldError, FieldResult};

use super::loaders::DataLoaders;
use crate::common::Actor;
use crate::kernel::ServerDeps;
use crate::server::middleware::AuthUser;

/// GraphQL request context
///
/// Shared dependencies plus the per-request caller and loaders.
#[derive(Clone)]
pub struct GraphQLContext {
    pub deps: Arc<ServerDeps>,
    pub auth_user: Option<AuthUser>,
    pub loaders: Arc<DataLoaders>,
}

impl juniper::Context for GraphQLContext {}

impl GraphQLContext {
    pub fn new(deps: Arc<ServerDeps>, auth_user: Option<AuthUser>) -> Self {
        let loaders = Arc::new(DataLoaders::new(deps.store.clone()));
        Self {
            deps,
            auth_user,
            loaders,
        }
    }

    /// The authenticated caller, or an "Authentication required" error
    pub fn actor(&self) -> FieldResult<Actor> {
        self.auth_user
            .as_ref()
            .map(AuthUser::actor)
            .ok_or_else(|| FieldError::new("Authentication required", juniper::Value::null()))
    }
}
