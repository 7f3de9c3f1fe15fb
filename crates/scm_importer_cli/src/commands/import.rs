use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use console::style;
use scm_importer::{AuthSettings, ImportError, ImportOutcome, ImportRequest, Importer, PollConfig};

use crate::config::Config;
use crate::progress::ProgressReporter;

/// Options for the `import` subcommand.
///
/// Connection settings and secrets may also come from the config file or
/// `SCM_IMPORTER_*` environment variables; flags win.
#[derive(Debug, Clone, Default, clap::Args)]
pub(crate) struct ImportArgs {
    /// Region base URL of the platform (e.g. https://us.ast.checkmarx.net)
    #[arg(long, alias = "base_url")]
    pub base_url: Option<String>,

    /// Region identity-provider base URL (derived from --base-url if omitted)
    #[arg(long, alias = "iam_base_url")]
    pub iam_base_url: Option<String>,

    /// Tenant name
    #[arg(long, alias = "tenant_name")]
    pub tenant_name: Option<String>,

    /// API key used to obtain an access token
    #[arg(long, alias = "api_key")]
    pub api_key: Option<String>,

    /// Repository URL to import
    #[arg(long, alias = "repo_url")]
    pub repo_url: String,

    /// Personal access token for the source-control provider
    #[arg(long, alias = "scm_token")]
    pub scm_token: Option<String>,

    /// Organization that owns the repository
    #[arg(long, alias = "scm_org")]
    pub scm_org: Option<String>,

    /// Name of the platform project to use or create
    #[arg(long, alias = "project_name")]
    pub project_name: String,

    /// Comma-separated groups for a newly created project
    #[arg(long, value_delimiter = ',')]
    pub groups: Vec<String>,

    /// Comma-separated tags for a newly created project
    #[arg(long, value_delimiter = ',')]
    pub tags: Vec<String>,

    /// Seconds between conversion status checks (default from config or 1)
    #[arg(long)]
    pub poll_interval_secs: Option<u64>,

    /// Give up if the conversion has not finished after this many seconds
    #[arg(long)]
    pub timeout_secs: Option<u64>,
}

fn required(
    flag: Option<String>,
    configured: &Option<String>,
    name: &str,
    key: &str,
) -> Result<String, ImportError> {
    flag.or_else(|| configured.clone())
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| {
            ImportError::Config(format!(
                "missing --{name} (or `{key}` in the config file / SCM_IMPORTER_{} env var)",
                key.replace('.', "__").to_uppercase()
            ))
        })
}

/// Merge flags over configuration into a request and poll settings.
pub(crate) fn build_request(
    args: ImportArgs,
    config: &Config,
) -> Result<(ImportRequest, PollConfig), ImportError> {
    let base_url = required(args.base_url, &config.platform.base_url, "base-url", "platform.base_url")?;
    let tenant = required(
        args.tenant_name,
        &config.platform.tenant_name,
        "tenant-name",
        "platform.tenant_name",
    )?;
    let api_key = required(args.api_key, &config.platform.api_key, "api-key", "platform.api_key")?;
    let scm_token = required(args.scm_token, &config.scm.token, "scm-token", "scm.token")?;
    let scm_org = required(args.scm_org, &config.scm.org, "scm-org", "scm.org")?;

    let mut auth = AuthSettings::new(base_url, tenant);
    if let Some(iam) = args.iam_base_url.or_else(|| config.platform.iam_base_url.clone()) {
        auth = auth.with_iam_base_url(iam);
    }

    let mut poll = config.poll.to_poll_config();
    if let Some(secs) = args.poll_interval_secs {
        poll.interval = Duration::from_secs(secs);
    }
    if let Some(secs) = args.timeout_secs {
        poll.timeout = Some(Duration::from_secs(secs));
    }

    let request = ImportRequest {
        auth,
        api_key,
        repo_url: args.repo_url,
        scm_token,
        scm_org,
        project_name: args.project_name,
        groups: args.groups,
        tags: args.tags,
    };
    Ok((request, poll))
}

fn report_success(outcome: &ImportOutcome, project_name: &str) {
    match outcome {
        ImportOutcome::Converted { .. } => {
            println!(
                "{} SCM project created for {}.",
                style("✓").green().bold(),
                style(project_name).cyan()
            );
        }
        ImportOutcome::AlreadyLinked { .. } => {
            println!(
                "{} Project {} already exists as an SCM project!",
                style("✓").green().bold(),
                style(project_name).cyan()
            );
        }
    }
}

fn report_failure(err: &ImportError) {
    tracing::debug!(kind = err.kind(), error = ?err, "Import failed");
    eprintln!("{} {}", style("Error:").red().bold(), err);
}

pub(crate) async fn handle_import(
    args: ImportArgs,
    config: &Config,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let (request, poll) = match build_request(args, config) {
        Ok(built) => built,
        Err(e) => {
            report_failure(&e);
            return Ok(ExitCode::from(e.exit_code()));
        }
    };
    tracing::debug!(?request, ?poll, "Starting import");

    let reporter = Arc::new(ProgressReporter::new());
    let importer = Importer::with_reqwest()?
        .with_poll_config(poll)
        .with_progress(reporter.as_callback());

    let result = importer.run(&request).await;
    reporter.finish();

    match result {
        Ok(outcome) => {
            report_success(&outcome, &request.project_name);
            Ok(ExitCode::from(outcome.exit_code()))
        }
        Err(e) => {
            report_failure(&e);
            Ok(ExitCode::from(e.exit_code()))
        }
    }
}
