//! Steward CLI - fleet maintenance for GitLab.

mod commands;
mod config;
mod progress;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use console::Term;
use tracing_subscriber::EnvFilter;

use crate::commands::summary::OutputFormat;

#[derive(Parser)]
#[command(name = "steward")]
#[command(version)]
#[command(about = "Bulk maintenance for a fleet of GitLab projects")]
#[command(
    long_about = "Steward applies a branch-protection convention, cleanup policies and push \
mirrors across every project a token can see, and revokes a departing user's group \
memberships. Fleet commands run one task per project or group and report failures \
without stopping the run."
)]
#[command(after_long_help = r#"EXAMPLES
    Apply branch policies to every project, 8 at a time:
        $ steward gitlab bulk --concurrency 8

    Also restrict tag creation to maintainers:
        $ steward gitlab bulk --protect-tags -y

    Recreate push mirrors against the configured mirror group:
        $ steward gitlab mirroring

    Remove a user from every group:
        $ steward gitlab deprovision jdoe

    Apply the cleanup policy to one project:
        $ steward gitlab cleanup-policy 1234

    Bootstrap a new project with the staging/develop layout:
        $ steward gitlab create-project --name Payments --path payments --namespace-id 77

    Create a root group seeded with the tagged default members:
        $ steward gitlab create-group "Data Platform" --visibility internal

    Create a subgroup under the configured parent group:
        $ steward gitlab create-subgroup "Billing API"

    Show a project's variables grouped by environment scope:
        $ steward gitlab list-envs 1234

    Delete every variable scoped to staging:
        $ steward gitlab delete-envs 1234 --env staging

    Generate shell completions:
        $ steward completions bash > ~/.local/share/bash-completion/completions/steward

CONFIGURATION
    Steward reads configuration from:
      1. ~/.config/steward/config.toml (or $XDG_CONFIG_HOME/steward/config.toml)
      2. ./steward.toml
      3. Environment variables (STEWARD_* prefix, nested keys joined with __)
      4. .env file in current directory

ENVIRONMENT VARIABLES
    STEWARD_GITLAB__API_URL                       API base URL (default: https://gitlab.com/api/v4)
    STEWARD_GITLAB__TOKEN                         GitLab personal access token
    STEWARD_GITLAB__PER_PAGE                      Page size for listings
    STEWARD_GITLAB__GROUP_ID                      Default parent for create-subgroup
    STEWARD_GITLAB__EXCLUSIONS__CLEANUP_POLICIES  Comma-separated project ids
    STEWARD_GITLAB__MIRROR__USERNAME              Push-mirror username
    STEWARD_GITLAB__MIRROR__TOKEN                 Push-mirror token
    STEWARD_GITLAB__MIRROR__GROUP_PATH            Push-mirror host and group path
    STEWARD_FLEET__CONCURRENCY                    Default in-flight cap (0 = unbounded)
"#)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// GitLab operations
    Gitlab {
        #[command(subcommand)]
        action: GitlabAction,
    },
    /// Generate shell completion scripts
    Completions {
        /// Shell to generate completions for
        shell: clap_complete::Shell,
    },
    /// Generate man page(s)
    Man {
        /// Write the page and every page below it into this directory
        /// (prints a single page to stdout if not specified)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Command path to document, e.g. `gitlab bulk` (whole CLI if omitted)
        command: Vec<String>,
    },
}

#[derive(Subcommand)]
enum GitlabAction {
    /// Apply the branch-protection convention to every project
    ///
    /// Sets the default branch, protects main/staging/develop according to
    /// which of them exist, and applies the cleanup policy unless the
    /// project is excluded.
    Bulk {
        /// Maximum projects processed at once (default from config; 0 = unbounded)
        #[arg(short = 'c', long)]
        concurrency: Option<usize>,

        /// Also restrict tag creation to maintainers
        #[arg(long)]
        protect_tags: bool,

        /// Skip confirmation prompt
        #[arg(short = 'y', long)]
        yes: bool,

        /// Output format for the run summary
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        output: OutputFormat,
    },
    /// Recreate every project's enabled push mirror against the mirror group
    Mirroring {
        /// Skip confirmation prompt
        #[arg(short = 'y', long)]
        yes: bool,

        /// Output format for the run summary
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        output: OutputFormat,
    },
    /// Remove a user from every group
    Deprovision {
        /// Exact username (case-insensitive)
        username: String,

        /// Maximum groups processed at once (default from config; 0 = unbounded)
        #[arg(short = 'c', long)]
        concurrency: Option<usize>,

        /// Skip confirmation prompt
        #[arg(short = 'y', long)]
        yes: bool,

        /// Output format for the run summary
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        output: OutputFormat,
    },
    /// Apply the container-registry cleanup policy
    ///
    /// Targets a single project when an id is given, otherwise every
    /// project. Excluded projects are left untouched.
    CleanupPolicy {
        /// Project id (all projects if omitted)
        project_id: Option<u64>,

        /// Maximum projects processed at once (default from config; 0 = unbounded)
        #[arg(short = 'c', long)]
        concurrency: Option<usize>,

        /// Output format for the run summary
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        output: OutputFormat,
    },
    /// Create a project with the main/staging/develop layout
    CreateProject {
        /// Display name
        #[arg(long)]
        name: String,

        /// URL path
        #[arg(long)]
        path: String,

        /// Id of the group that will own the project
        #[arg(long)]
        namespace_id: u64,

        /// Default branch
        #[arg(long, default_value = "main")]
        default_branch: String,

        /// private, internal or public (inherited from the group if omitted)
        #[arg(long)]
        visibility: Option<String>,

        /// Enable shared runners
        #[arg(long)]
        shared_runners: bool,

        /// Add a push mirror using the configured mirror target
        #[arg(long)]
        mirror: bool,
    },
    /// Create a root group and add the tagged default members
    ///
    /// Users whose admin note is one of default_group_member,
    /// default_group_member_developer, default_group_member_maintainer or
    /// default_group_member_owner are added at the matching access level.
    CreateGroup {
        /// Display name
        name: String,

        /// URL path (derived from the name if omitted)
        #[arg(short, long)]
        path: Option<String>,

        /// Group visibility
        #[arg(
            short = 'i',
            long,
            default_value = "private",
            value_parser = ["private", "internal", "public"]
        )]
        visibility: String,
    },
    /// Create a subgroup that inherits its parent's visibility
    CreateSubgroup {
        /// Display name
        name: String,

        /// URL path (derived from the name if omitted)
        #[arg(short, long)]
        path: Option<String>,

        /// Parent group id (default from gitlab.group_id)
        #[arg(short = 's', long)]
        parent: Option<u64>,
    },
    /// List a project's CI/CD variables grouped by environment scope
    ListEnvs {
        /// Project id
        project_id: u64,

        /// Environment scope to show (`*` or `all` for every scope)
        #[arg(short, long, default_value = "*")]
        env: String,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        output: OutputFormat,
    },
    /// Delete a project's CI/CD variables in one environment scope
    DeleteEnvs {
        /// Project id
        project_id: u64,

        /// Environment scope to clear (`*` or `all` for every variable)
        #[arg(short, long, default_value = "*")]
        env: String,

        /// Skip confirmation prompt
        #[arg(short = 'y', long)]
        yes: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    // Structured logging only when progress bars are not drawn. Logs go to
    // stderr so `--output json` stays parseable on stdout.
    if !Term::stdout().is_term() {
        let env_filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("steward=info,steward_cli=info"));

        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .init();
    }

    let cli = Cli::parse();

    match cli.command {
        Commands::Gitlab { action } => {
            // Configuration is only needed for API commands
            let config = config::Config::load();
            commands::gitlab::handle_gitlab(action, &config).await?;
        }
        Commands::Completions { shell } => {
            commands::meta::handle_completions(shell)?;
        }
        Commands::Man { output, command } => {
            commands::meta::handle_man(output, &command)?;
        }
    }

    Ok(())
}
