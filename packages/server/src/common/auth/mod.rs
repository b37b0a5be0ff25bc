/// Authorization module for the exception collector
///
/// Provides a fluent API for authorization checks in action code:
///
/// ```rust,ignore
/// use crate::common::auth::{Actor, Capability};
///
/// actor.can(Capability::RetryExceptions).check()?;
/// ```
///
/// Roles arrive already verified (bearer token claims); this module only
/// decides whether a set of roles grants a capability.

mod builder;
mod capability;
mod errors;

pub use builder::{Actor, CapabilityBuilder};
pub use capability::{Capability, Role};
pub use errors::AuthError;
