pub mod config;
pub mod error;
pub mod resource;

pub use config::RuntimeConfig;
pub use error::DoubleAgentError;
pub use resource::{Resource, ResourceId, ResourceType};

/// Header a client sets to select a namespace. Omitted => [`DEFAULT_NAMESPACE`].
pub const NAMESPACE_HEADER: &str = "x-doubleagent-namespace";

/// Reserved namespace used when the caller sends no namespace header.
pub const DEFAULT_NAMESPACE: &str = "default";

/// Default header name clients use to make a POST idempotent.
pub const DEFAULT_REQUEST_ID_HEADER: &str = "x-request-id";
