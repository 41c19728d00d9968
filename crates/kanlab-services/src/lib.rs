pub mod error;
pub mod gitlab;
pub mod types;

pub use error::GitLabError;
pub use gitlab::GitLabClient;
pub use kanlab_core::BoardFailurePolicy;
pub use types::*;
