//! SCM Importer CLI - onboard a repository as an SCM project from the command line.

mod commands;
mod config;
mod progress;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use console::{Term, style};
use tracing_subscriber::EnvFilter;

use crate::commands::import::ImportArgs;

pub(crate) const BIN_NAME: &str = "scm-importer";

#[derive(Parser)]
#[command(name = "scm-importer")]
#[command(version)]
#[command(about = "Import a Git repository as an SCM project")]
#[command(
    long_about = "SCM Importer authenticates against the application-security platform, \
finds or creates the named project, converts it into an SCM project linked to the \
repository and waits for the conversion to finish."
)]
#[command(after_long_help = r#"EXAMPLES
    Import a GitHub repository:
        $ scm-importer import --base-url https://us.ast.checkmarx.net --tenant-name acme \
            --api-key $API_KEY --repo-url https://github.com/acme/widget \
            --scm-token $GITHUB_TOKEN --scm-org acme --project-name widget

    Give up if the conversion takes longer than ten minutes:
        $ scm-importer import ... --timeout-secs 600

    Generate shell completions:
        $ scm-importer completions bash > ~/.local/share/bash-completion/completions/scm-importer

CONFIGURATION
    SCM Importer reads configuration from:
      1. ~/.config/scm-importer/config.toml (or $XDG_CONFIG_HOME/scm-importer/config.toml)
      2. ./scm-importer.toml
      3. Environment variables (SCM_IMPORTER_* prefix, sections split by __)
      4. .env file in current directory

ENVIRONMENT VARIABLES
    SCM_IMPORTER_PLATFORM__BASE_URL       Region base URL
    SCM_IMPORTER_PLATFORM__IAM_BASE_URL   Identity-provider base URL
    SCM_IMPORTER_PLATFORM__TENANT_NAME    Tenant name
    SCM_IMPORTER_PLATFORM__API_KEY        Platform API key
    SCM_IMPORTER_SCM__TOKEN               SCM personal access token
    SCM_IMPORTER_SCM__ORG                 SCM organization
    SCM_IMPORTER_POLL__INTERVAL_SECS      Seconds between status checks (default: 1)
    SCM_IMPORTER_POLL__TIMEOUT_SECS       Conversion deadline in seconds (default: none)
"#)]
struct Cli {
    /// Enable debug output
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import a repository as an SCM project
    Import(ImportArgs),
    /// Generate shell completion scripts
    Completions {
        /// Shell to generate completions for
        shell: clap_complete::Shell,
    },
    /// Generate man page(s)
    Man {
        /// Output directory for man pages (prints to stdout if not specified)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// Default log filter when `RUST_LOG` is unset.
///
/// On a terminal the spinner carries progress, so only warnings are logged.
fn default_filter(debug: bool, is_term: bool) -> &'static str {
    if debug {
        "scm_importer=debug,scm_importer_cli=debug"
    } else if is_term {
        "warn"
    } else {
        "info"
    }
}

fn init_tracing(debug: bool) {
    let stderr = Term::stderr();
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::new(default_filter(debug, stderr.is_term())),
    };

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(cli.debug);

    let result = match cli.command {
        Commands::Completions { shell } => {
            commands::meta::handle_completions(shell).map(|()| ExitCode::SUCCESS)
        }
        Commands::Man { output } => commands::meta::handle_man(output).map(|()| ExitCode::SUCCESS),
        Commands::Import(args) => {
            let config = config::Config::load();
            commands::import::handle_import(args, &config).await
        }
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            ExitCode::FAILURE
        }
    }
}
