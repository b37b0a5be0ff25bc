// HTTP server setup (Axum + GraphQL + SSE)
pub mod app;
pub mod auth;
pub mod graphql;
pub mod middleware;
pub mod routes;

pub use app::*;
pub use graphql::*;
