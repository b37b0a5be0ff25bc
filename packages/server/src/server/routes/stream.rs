//! SSE streaming endpoint.
//!
//! GET /api/streams/exceptions?token=JWT&kinds=...&severities=...
//!
//! Subscribes to the SubscriptionHub with the caller's highest role and the
//! filter given in query params, then forwards each matching lifecycle event
//! as one SSE frame named after its kind.
//!
//! Auth: JWT from `?token=` (EventSource can't send custom headers), falling
//! back to the Authorization header.

use std::collections::HashSet;
use std::convert::Infallible;
use std::hash::Hash;

use axum::{
    extract::{Extension, Query},
    http::{HeaderMap, StatusCode},
    response::sse::{Event, KeepAlive, Sse},
};
use futures::stream::{self, StreamExt};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, info};

use crate::domains::exceptions::events::EventKind;
use crate::kernel::SubscriptionFilter;
use crate::server::app::AxumAppState;
use crate::server::middleware::auth_user_from_token;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamQuery {
    /// JWT token for authentication
    token: Option<String>,
    /// Comma-separated event kind names
    kinds: Option<String>,
    transaction_id: Option<String>,
    interface_types: Option<String>,
    severities: Option<String>,
    customer_ids: Option<String>,
}

impl StreamQuery {
    /// Build the subscription filter. Unknown enum names are rejected.
    pub fn filter(&self) -> Result<SubscriptionFilter, String> {
        let event_kinds = match &self.kinds {
            Some(raw) => Some(
                split(raw)
                    .map(|k| EventKind::parse(k).ok_or_else(|| format!("unknown event kind: {}", k)))
                    .collect::<Result<HashSet<_>, _>>()?,
            ),
            None => None,
        };

        Ok(SubscriptionFilter {
            event_kinds,
            transaction_id: self
                .transaction_id
                .as_ref()
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty()),
            interface_types: parse_set(self.interface_types.as_deref(), "interface type")?,
            severities: parse_set(self.severities.as_deref(), "severity")?,
            customer_ids: self
                .customer_ids
                .as_deref()
                .map(|raw| split(raw).map(str::to_string).collect()),
        })
    }
}

/// SSE stream handler.
pub async fn stream_handler(
    Extension(state): Extension<AxumAppState>,
    Query(query): Query<StreamQuery>,
    headers: HeaderMap,
) -> Result<Sse<impl futures::Stream<Item = Result<Event, Infallible>>>, (StatusCode, String)> {
    let token = query
        .token
        .clone()
        .or_else(|| extract_bearer_token(&headers))
        .ok_or((StatusCode::UNAUTHORIZED, "Authentication required".to_string()))?;

    let user = auth_user_from_token(&token, &state.jwt_service)
        .ok_or((StatusCode::UNAUTHORIZED, "Invalid token".to_string()))?;

    let role = user
        .highest_role()
        .ok_or((StatusCode::FORBIDDEN, "No recognized role".to_string()))?;

    let filter = query
        .filter()
        .map_err(|e| (StatusCode::BAD_REQUEST, e))?;

    let subscription = state.deps.hub.subscribe(Some(role), filter);
    info!(
        subscriber_id = subscription.id(),
        user = %user.user_id,
        role = role.as_str(),
        "Lifecycle stream opened"
    );

    let connected =
        stream::once(async { Ok::<_, Infallible>(Event::default().event("connected").data("ok")) });

    // Dropping the SSE body drops the subscription, which deregisters it
    let events = subscription.filter_map(|event| async move {
        debug!(kind = %event.kind, transaction_id = %event.transaction_id, "Forwarding lifecycle event");
        Event::default()
            .event(event.kind.as_str())
            .json_data(event.to_wire())
            .ok()
            .map(Ok)
    });

    Ok(Sse::new(connected.chain(events)).keep_alive(KeepAlive::default()))
}

/// Extract Bearer token from Authorization header.
fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    let auth = headers.get("authorization")?.to_str().ok()?;
    auth.strip_prefix("Bearer ").map(|t| t.to_string())
}

fn split(raw: &str) -> impl Iterator<Item = &str> {
    raw.split(',').map(str::trim).filter(|s| !s.is_empty())
}

/// Parse a comma-separated list of SCREAMING_SNAKE_CASE enum names
fn parse_set<T>(raw: Option<&str>, what: &str) -> Result<Option<HashSet<T>>, String>
where
    T: DeserializeOwned + Eq + Hash,
{
    let Some(raw) = raw else {
        return Ok(None);
    };
    split(raw)
        .map(|name| {
            serde_json::from_value(serde_json::Value::String(name.to_ascii_uppercase()))
                .map_err(|_| format!("unknown {}: {}", what, name))
        })
        .collect::<Result<HashSet<T>, String>>()
        .map(Some)
}
