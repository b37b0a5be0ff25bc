pub mod audit_entry;
pub mod exception;
pub mod retry_attempt;
pub mod status_change;

pub use audit_entry::*;
pub use exception::*;
pub use retry_attempt::*;
pub use status_change::*;
