pub mod errors;
pub mod id;
pub mod types;

pub use errors::{ConfigError, PodiumError};
pub use id::{new_correlation_id, new_id};
pub use types::Role;

pub type Result<T> = std::result::Result<T, PodiumError>;
