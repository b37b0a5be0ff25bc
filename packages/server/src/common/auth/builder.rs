use super::{AuthError, Capability, Role};

/// An authenticated caller and the entry point for authorization checks
///
/// Usage:
/// ```rust,ignore
/// actor
///     .can(Capability::ResolveExceptions)
///     .check()?;
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    user_id: String,
    roles: Vec<Role>,
}

impl Actor {
    /// Create a new actor for authorization checks
    ///
    /// # Arguments
    /// * `user_id` - Subject of the verified token
    /// * `roles` - Roles from the verified token
    pub fn new(user_id: impl Into<String>, roles: Vec<Role>) -> Self {
        Self {
            user_id: user_id.into(),
            roles,
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn roles(&self) -> &[Role] {
        &self.roles
    }

    /// Highest role held, if any
    pub fn highest_role(&self) -> Option<Role> {
        self.roles.iter().copied().max()
    }

    pub fn is_admin(&self) -> bool {
        self.roles.contains(&Role::Admin)
    }

    /// Specify what capability the actor needs
    pub fn can(&self, capability: Capability) -> CapabilityBuilder<'_> {
        CapabilityBuilder {
            actor: self,
            capability,
        }
    }
}

/// Builder after specifying capability
pub struct CapabilityBuilder<'a> {
    actor: &'a Actor,
    capability: Capability,
}

impl CapabilityBuilder<'_> {
    /// Perform the authorization check
    pub fn check(self) -> Result<(), AuthError> {
        let required = self.capability.minimum_role();

        match self.actor.highest_role() {
            Some(role) if role >= required => Ok(()),
            _ if required == Role::Admin => Err(AuthError::AdminRequired),
            _ => Err(AuthError::PermissionDenied(
                self.capability.label().to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operations_can_retry() {
        let actor = Actor::new("ops-1", vec![Role::Operations]);
        assert!(actor.can(Capability::RetryExceptions).check().is_ok());
        assert!(actor.can(Capability::CancelRetries).check().is_ok());
    }

    #[test]
    fn test_resolve_requires_admin() {
        let ops = Actor::new("ops-1", vec![Role::Operations]);
        assert_eq!(
            ops.can(Capability::ResolveExceptions).check(),
            Err(AuthError::AdminRequired)
        );

        let admin = Actor::new("admin-1", vec![Role::Admin]);
        assert!(admin.can(Capability::ResolveExceptions).check().is_ok());
    }

    #[test]
    fn test_viewer_rejected_for_mutations() {
        let viewer = Actor::new("viewer-1", vec![Role::Viewer]);
        assert!(viewer.can(Capability::ViewExceptions).check().is_ok());
        assert!(matches!(
            viewer.can(Capability::AcknowledgeExceptions).check(),
            Err(AuthError::PermissionDenied(op)) if op == "acknowledge"
        ));
    }

    #[test]
    fn test_no_roles_rejected() {
        let nobody = Actor::new("anon", vec![]);
        assert!(nobody.can(Capability::ViewExceptions).check().is_err());
        assert_eq!(nobody.highest_role(), None);
    }
}
