use serde::{Deserialize, Serialize};

/// Roles carried by an authenticated caller.
///
/// Ordered by privilege: `Viewer < Operations < Admin`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Viewer,
    Operations,
    Admin,
}

impl Role {
    /// Parse a role claim. Accepts both `ADMIN` and `ROLE_ADMIN` spellings.
    pub fn from_claim(claim: &str) -> Option<Self> {
        let name = claim.trim();
        let name = name.strip_prefix("ROLE_").unwrap_or(name);
        match name.to_ascii_uppercase().as_str() {
            "VIEWER" => Some(Role::Viewer),
            "OPERATIONS" => Some(Role::Operations),
            "ADMIN" => Some(Role::Admin),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Viewer => "VIEWER",
            Role::Operations => "OPERATIONS",
            Role::Admin => "ADMIN",
        }
    }
}

/// Capabilities checked by the mutation pipeline and query resolvers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// Read exceptions, history, and subscribe to lifecycle events
    ViewExceptions,

    /// Initiate retries (single and bulk)
    RetryExceptions,

    /// Acknowledge exceptions (single and bulk)
    AcknowledgeExceptions,

    /// Cancel a pending retry
    CancelRetries,

    /// Resolve an exception
    ResolveExceptions,

    /// Read the mutation audit log
    ViewAuditLog,
}

impl Capability {
    /// Lowest role that grants this capability
    pub fn minimum_role(&self) -> Role {
        match self {
            Capability::ViewExceptions => Role::Viewer,
            Capability::RetryExceptions
            | Capability::AcknowledgeExceptions
            | Capability::CancelRetries
            | Capability::ViewAuditLog => Role::Operations,
            Capability::ResolveExceptions => Role::Admin,
        }
    }

    /// Human readable operation name used in denial messages
    pub fn label(&self) -> &'static str {
        match self {
            Capability::ViewExceptions => "view",
            Capability::RetryExceptions => "retry",
            Capability::AcknowledgeExceptions => "acknowledge",
            Capability::CancelRetries => "cancel_retry",
            Capability::ResolveExceptions => "resolve",
            Capability::ViewAuditLog => "audit_log",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_claim_parsing() {
        assert_eq!(Role::from_claim("ROLE_ADMIN"), Some(Role::Admin));
        assert_eq!(Role::from_claim("operations"), Some(Role::Operations));
        assert_eq!(Role::from_claim(" VIEWER "), Some(Role::Viewer));
        assert_eq!(Role::from_claim("ROLE_SUPERUSER"), None);
    }

    #[test]
    fn test_role_ordering() {
        assert!(Role::Viewer < Role::Operations);
        assert!(Role::Operations < Role::Admin);
    }
}
