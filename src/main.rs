use std::io::Read;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result, WrapErr};
use tracing_subscriber::EnvFilter;

use verdict_core::{VerdictConfig, VerdictError, CONFIG_FILE_NAME};
use verdict_review::pipeline::{ReviewOutcome, ReviewPipeline};
use verdict_review::response::{AgentResponse, SNAPSHOT_CHARS};
use verdict_review::trigger::TriggerContext;

#[derive(Parser)]
#[command(
    name = "verdict",
    version,
    about = "Pull-request reviews from a remote review agent",
    long_about = "Verdict sends the changed files of a pull request to a remote review agent\n\
                   and posts the agent's verdict as a comment on the pull request.\n\n\
                   Examples:\n  \
                     verdict                              Review the PR from the current GitHub Actions event\n  \
                     verdict review --pr owner/repo#42    Review a pull request by reference\n  \
                     verdict review --dry-run             Print the verdict instead of posting it\n  \
                     verdict extract --file reply.json    Show what would be posted for a saved agent reply\n  \
                     verdict init                         Write a .verdict.toml template"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Path to configuration file (default: .verdict.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging (overridden by RUST_LOG)
    #[arg(long, short, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Review a pull request and post the agent's verdict (default)
    #[command(long_about = "Review a pull request and post the agent's verdict.\n\n\
        Without --pr, the pull request is read from the GitHub Actions event file\n\
        (GITHUB_EVENT_PATH). Events that are not pull-request events exit successfully\n\
        without contacting GitHub or the agent.\n\n\
        Examples:\n  verdict review\n  verdict review --pr octocat/hello-world#42 --dry-run")]
    Review(ReviewArgs),
    /// Extract the verdict from a saved agent response
    #[command(long_about = "Extract the verdict from a saved agent response.\n\n\
        Reads a /run response body from a file or stdin and prints the text that\n\
        would be posted as the PR comment.\n\n\
        Examples:\n  verdict extract --file reply.json\n  curl ... | verdict extract")]
    Extract {
        /// Read the response from file instead of stdin
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// Create a .verdict.toml configuration template
    Init,
}

#[derive(clap::Args, Default)]
struct ReviewArgs {
    /// Review this PR instead of the Actions event (format: owner/repo#123)
    #[arg(long)]
    pr: Option<String>,
    /// Event payload file (default: $GITHUB_EVENT_PATH)
    #[arg(long)]
    event: Option<PathBuf>,
    /// Print the verdict instead of posting it
    #[arg(long)]
    dry_run: bool,
    /// Agent base URL (overrides AGENT_URL and the config file)
    #[arg(long)]
    agent_url: Option<String>,
    /// Agent auth token sent as x-agent-auth (overrides AGENT_AUTH_TOKEN)
    #[arg(long)]
    agent_auth_token: Option<String>,
    /// GitHub token (overrides GITHUB_TOKEN)
    #[arg(long)]
    github_token: Option<String>,
}

const DEFAULT_CONFIG: &str = r#"# Verdict configuration

[agent]
# Base URL of the review agent (or set AGENT_URL)
# endpoint = "http://localhost:8000"
# app_name = "adk_agent"
# user_id = "github-action"
# Fail when /run answers with a non-2xx status
# strict_status = true
# timeout_secs = 300
# The auth token is read from AGENT_AUTH_TOKEN

[github]
# GitHub Enterprise API URL (or set GITHUB_API_URL)
# api_url = "https://github.example.com/api/v3"
# per_page = 100
"#;

#[tokio::main]
async fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .build(),
        )
    }))
    .expect("miette handler");
    human_panic::setup_panic!();

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = run(cli).await;
    if let Err(report) = &result {
        if std::env::var("GITHUB_ACTIONS").is_ok_and(|v| v == "true") {
            println!("::error::{}", workflow_message(&report.to_string()));
        }
    }
    result
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| default_level.into()),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        None => review(cli.config.as_deref(), ReviewArgs::default()).await,
        Some(Command::Review(args)) => review(cli.config.as_deref(), args).await,
        Some(Command::Extract { file }) => {
            let body = match file {
                Some(path) => std::fs::read_to_string(&path)
                    .into_diagnostic()
                    .wrap_err_with(|| format!("failed to read {}", path.display()))?,
                None => {
                    let mut buf = String::new();
                    std::io::stdin()
                        .read_to_string(&mut buf)
                        .into_diagnostic()
                        .wrap_err("failed to read agent response from stdin")?;
                    buf
                }
            };
            let response = AgentResponse::from_body(&body);
            let text = response
                .extract_text()
                .ok_or_else(|| VerdictError::NoReviewableContent {
                    snapshot: response.snapshot(SNAPSHOT_CHARS),
                })?;
            println!("{text}");
            Ok(())
        }
        Some(Command::Init) => {
            let path = Path::new(CONFIG_FILE_NAME);
            if path.exists() {
                miette::bail!("{CONFIG_FILE_NAME} already exists");
            }
            std::fs::write(path, DEFAULT_CONFIG).into_diagnostic()?;
            println!("Created {CONFIG_FILE_NAME} with default configuration");
            Ok(())
        }
    }
}

async fn review(config_path: Option<&Path>, args: ReviewArgs) -> Result<()> {
    let cwd = std::env::current_dir().into_diagnostic()?;
    let mut config = VerdictConfig::load(config_path, &cwd)
        .wrap_err("failed to load configuration")?
        .with_env(|key| std::env::var(key).ok());
    if let Some(url) = args.agent_url {
        config.agent.endpoint = Some(url);
    }
    if let Some(token) = args.agent_auth_token {
        config.agent.auth_token = Some(token);
    }
    if let Some(token) = args.github_token {
        config.github.token = Some(token);
    }

    let pipeline = ReviewPipeline::new(config)?.dry_run(args.dry_run);

    let repository = std::env::var("GITHUB_REPOSITORY").ok();
    let trigger = match (args.pr, args.event) {
        (Some(pr_ref), _) => pipeline.trigger_for_reference(&pr_ref).await?,
        (None, Some(path)) => TriggerContext::from_event_file(&path, repository.as_deref())
            .wrap_err_with(|| format!("failed to read event file {}", path.display()))?,
        (None, None) => match std::env::var_os("GITHUB_EVENT_PATH") {
            Some(path) => {
                let path = PathBuf::from(path);
                TriggerContext::from_event_file(&path, repository.as_deref())
                    .wrap_err_with(|| format!("failed to read event file {}", path.display()))?
            }
            None => TriggerContext::default(),
        },
    };

    match pipeline.run(&trigger).await? {
        ReviewOutcome::DryRun { text } => println!("{text}"),
        outcome => eprintln!("{outcome}"),
    }
    Ok(())
}

/// Flatten a message for a `::error::` workflow command, which ends at the
/// first newline.
fn workflow_message(message: &str) -> String {
    message
        .replace('%', "%25")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}
