// HTTP routes
pub mod events;
pub mod graphql;
pub mod health;
pub mod stream;

pub use events::*;
pub use graphql::*;
pub use health::*;
pub use stream::*;
