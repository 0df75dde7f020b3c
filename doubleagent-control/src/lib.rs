pub mod error;
pub mod idempotency;
pub mod middleware;
pub mod plane;
pub mod state;

pub use error::ApiError;
pub use idempotency::{CachedResponse, IdempotencyCache};
pub use middleware::idempotency_layer;
pub use state::ServiceState;
