pub mod config;
pub mod error;

pub use config::{
    BoardFailurePolicy, BoardsConfig, Config, CredentialSource, GitLabConfig, HttpConfig,
    ValidationResult,
};
pub use error::{AppError, AuthError, ConfigError, NetworkError, ReqwestErrorExt};

use anyhow::Result;

/// Initialize logging for the process.
///
/// Honours `RUST_LOG`, falling back to `info`. Calling this more than once is
/// harmless; later calls keep the first subscriber.
pub fn init() -> Result<()> {
    let installed = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .try_init()
        .is_ok();

    if installed {
        tracing::info!("Kanlab core initialized");
    }
    Ok(())
}
