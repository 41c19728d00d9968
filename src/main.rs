use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use kanlab_auth::{
    CredentialProvider, DisabledCredentials, FileCredentialStore, KeyringCredentialStore,
    StoredCredentials,
};
use kanlab_core::{AppError, Config, CredentialSource};
use kanlab_services::{GitLabClient, ProjectId};
use serde::Serialize;

#[derive(Parser)]
#[command(name = "kanlab")]
#[command(about = "GitLab issues, labels and boards from the command line", long_about = None)]
struct Cli {
    /// Never read credentials or touch the network
    #[arg(long, global = true)]
    offline: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(flatten)]
    Api(ApiCommand),
    /// Save instance URL and token to the configured credential store
    Login {
        #[arg(long)]
        url: Option<String>,
        #[arg(long)]
        token: String,
    },
    /// Remove stored credentials
    Logout,
}

/// Commands that talk to GitLab
#[derive(Subcommand)]
enum ApiCommand {
    /// List projects you are a member of
    Projects,
    /// List a project's issues
    Issues { project: ProjectId },
    /// Replace an issue's labels
    Labels {
        project: ProjectId,
        iid: u64,
        labels: Vec<String>,
    },
    /// List the columns of the project's first board
    BoardLists { project: ProjectId },
}

#[tokio::main]
async fn main() -> Result<()> {
    kanlab_core::init()?;

    let cli = Cli::parse();
    let config = load_config(cli.offline)?;

    match cli.command {
        Commands::Login { url, token } => login(&config, url, token),
        Commands::Logout => logout(&config),
        Commands::Api(command) => {
            let credentials: Arc<dyn CredentialProvider> = if cli.offline {
                Arc::new(DisabledCredentials)
            } else {
                kanlab_auth::provider_for(config.gitlab.credential_source)?
            };
            tracing::debug!(provider = credentials.name(), "GitLab client ready");
            let client = GitLabClient::with_http_config(credentials, &config.http)
                .map_err(report)?
                .with_board_policy(config.boards.failure_policy);
            run(&client, command).await
        }
    }
}

/// Offline runs never touch the config directory; they use defaults.
fn load_config(offline: bool) -> Result<Config> {
    if offline {
        return Ok(Config::default());
    }
    let (config, _) = Config::load_validated()?;
    Ok(config)
}

async fn run(client: &GitLabClient, command: ApiCommand) -> Result<()> {
    match command {
        ApiCommand::Projects => print_json(&client.get_projects().await.map_err(report)?),
        ApiCommand::Issues { project } => {
            print_json(&client.get_project_issues(project).await.map_err(report)?)
        }
        ApiCommand::Labels {
            project,
            iid,
            labels,
        } => print_json(
            &client
                .update_issue_labels(project, iid, &labels)
                .await
                .map_err(report)?,
        ),
        ApiCommand::BoardLists { project } => {
            print_json(&client.get_project_board_lists(project).await.map_err(report)?)
        }
    }
}

fn login(config: &Config, url: Option<String>, token: String) -> Result<()> {
    let url = url
        .or_else(|| config.gitlab.url.clone())
        .context("No GitLab URL given; pass --url or set gitlab.url in config")?;

    match config.gitlab.credential_source {
        CredentialSource::File => {
            let store = FileCredentialStore::default_location()?;
            store
                .store(&StoredCredentials {
                    url: Some(url),
                    token: Some(token),
                })
                .map_err(report)?;
            println!("Credentials saved to {}", store.path().display());
        }
        CredentialSource::Keyring => {
            KeyringCredentialStore::default()
                .store(&url, &token)
                .map_err(report)?;
            println!("Credentials saved to the system keyring");
        }
        source => anyhow::bail!("Credential source {:?} is read-only", source),
    }
    Ok(())
}

fn logout(config: &Config) -> Result<()> {
    match config.gitlab.credential_source {
        CredentialSource::File => FileCredentialStore::default_location()?
            .clear()
            .map_err(report)?,
        CredentialSource::Keyring => KeyringCredentialStore::default()
            .clear()
            .map_err(report)?,
        source => anyhow::bail!("Credential source {:?} is read-only", source),
    }
    println!("Credentials removed");
    Ok(())
}

/// Print the short message for `err` and hand back the full error.
fn report(err: impl Into<AppError>) -> anyhow::Error {
    let err: AppError = err.into();
    eprintln!("{}", err.user_message());
    anyhow::Error::new(err)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
