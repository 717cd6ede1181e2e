use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;

use anyhow::{Context, anyhow};
use clap::{Parser, Subcommand, ValueEnum};
use serde_json::json;
use student_dashboard::card::dashboard_card;
use student_dashboard::config::{load_config_file, load_config_from_env};
use student_dashboard::controller::DashboardSettings;
use student_dashboard::{
    Account, AdapterError, CardFacts, ConfigError, DashboardConfig, DashboardController,
    ErrorKind, GraphClient, HostContextProvider, HttpClient, ReqwestClient, SilentTokenClient,
    StaticHostContext,
};
use tokio::runtime::Builder;
use tracing::debug;

const REFRESH_TOKEN_ENV: &str = "DASHBOARD_REFRESH_TOKEN";
const LOG_ENV: &str = "STUDENT_DASHBOARD_LOG";

#[derive(Parser)]
#[command(name = "student-dashboard")]
#[command(about = "Drive the student well-being dashboard outside the Teams client", long_about = None)]
struct Cli {
    /// Log adapter calls and state transitions to stderr.
    #[arg(long, short, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Check a config file (or the DASHBOARD_* environment) and print it normalized.
    ValidateConfig {
        #[arg(long, value_name = "CONFIG_JSON")]
        config: Option<PathBuf>,
    },
    /// Run the mount sequence and print the resulting view.
    Render {
        #[arg(long, value_name = "CONFIG_JSON")]
        config: Option<PathBuf>,
        #[arg(long, value_name = "CONTEXT_JSON")]
        context: PathBuf,
        #[arg(long, value_name = "ACCOUNT_JSON")]
        account: Option<PathBuf>,
        #[arg(long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },
    /// Submit a weekly reflection to a class assignment.
    Reflect {
        #[arg(long, value_name = "CONFIG_JSON")]
        config: Option<PathBuf>,
        #[arg(long, value_name = "CONTEXT_JSON")]
        context: PathBuf,
        #[arg(long, value_name = "ACCOUNT_JSON")]
        account: Option<PathBuf>,
        /// Defaults to the team group id from the host context.
        #[arg(long)]
        class_id: Option<String>,
        #[arg(long)]
        assignment_id: String,
        #[arg(long)]
        text: String,
    },
    /// Post the well-being facts card to a channel.
    Share {
        #[arg(long, value_name = "CONFIG_JSON")]
        config: Option<PathBuf>,
        #[arg(long, value_name = "CONTEXT_JSON")]
        context: PathBuf,
        #[arg(long, value_name = "ACCOUNT_JSON")]
        account: Option<PathBuf>,
        #[arg(long)]
        team_id: Option<String>,
        #[arg(long)]
        channel_id: Option<String>,
        #[arg(long, default_value_t = 0)]
        meditation_minutes: u32,
        #[arg(long)]
        reflection_complete: bool,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Format {
    Text,
    Json,
    Card,
}

fn main() {
    let cli = Cli::parse();
    if let Err(err) = init_tracing(cli.verbose) {
        eprintln!("warning: {err}");
    }
    let exit_code = match run(cli) {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("error: {err}");
            err.exit_code()
        }
    };
    process::exit(exit_code);
}

fn init_tracing(verbose: bool) -> anyhow::Result<()> {
    let level = if verbose { "debug" } else { "warn" };
    let filter = tracing_subscriber::EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init()
        .map_err(|error| anyhow!("failed to initialize tracing subscriber: {error}"))
}

fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Command::ValidateConfig { config } => handle_validate_config(config),
        Command::Render {
            config,
            context,
            account,
            format,
        } => {
            let cfg = load_config(config.as_deref())?;
            let mut controller = build_controller(&cfg, &context, account.as_deref())?;
            block_on(async {
                controller.mount().await;
            })?;
            print_view(&controller, format)
        }
        Command::Reflect {
            config,
            context,
            account,
            class_id,
            assignment_id,
            text,
        } => {
            let cfg = load_config(config.as_deref())?;
            let mut controller = build_controller(&cfg, &context, account.as_deref())?;
            controller.update_reflection(text);
            let submission = block_on(async {
                controller.mount().await;
                let class_id = match class_id {
                    Some(id) => id,
                    None => controller
                        .context()
                        .map_err(CliError::Adapter)?
                        .group_id()
                        .map(str::to_string)
                        .ok_or_else(|| CliError::Usage("class id required".into()))?,
                };
                controller
                    .submit_reflection(&class_id, &assignment_id)
                    .await
                    .map_err(CliError::Adapter)
            })??;
            println!(
                "{}",
                json!({"ok": true, "submission": {
                    "id": submission.id,
                    "status": submission.status,
                }})
            );
            Ok(())
        }
        Command::Share {
            config,
            context,
            account,
            team_id,
            channel_id,
            meditation_minutes,
            reflection_complete,
        } => {
            let cfg = load_config(config.as_deref())?;
            let mut controller = build_controller(&cfg, &context, account.as_deref())?;
            let facts = CardFacts {
                meditation_minutes,
                reflection_complete,
            };
            let message_id = block_on(async {
                controller.mount().await;
                let ctx = controller.context().map_err(CliError::Adapter)?;
                let team_id = team_id
                    .or_else(|| ctx.group_id().map(str::to_string))
                    .ok_or_else(|| CliError::Usage("team id required".into()))?;
                let channel_id = channel_id
                    .or_else(|| ctx.channel_id().map(str::to_string))
                    .ok_or_else(|| CliError::Usage("channel id required".into()))?;
                Ok::<_, CliError>(
                    controller
                        .share_progress(&team_id, &channel_id, facts)
                        .await,
                )
            })??;
            match message_id {
                Some(id) => {
                    println!("{}", json!({"ok": true, "message_id": id}));
                    Ok(())
                }
                None => Err(CliError::NotPosted),
            }
        }
    }
}

fn handle_validate_config(path: Option<PathBuf>) -> Result<(), CliError> {
    match load_config(path.as_deref()) {
        Ok(cfg) => {
            println!(
                "{}",
                serde_json::to_string_pretty(&json!({"ok": true, "config": cfg}))
                    .unwrap_or_default()
            );
            Ok(())
        }
        Err(err) => {
            println!(
                "{}",
                serde_json::to_string_pretty(&json!({"ok": false, "error": err.to_string()}))
                    .unwrap_or_default()
            );
            Err(err)
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<DashboardConfig, CliError> {
    match path {
        Some(path) => load_config_file(path),
        None => load_config_from_env(),
    }
    .map_err(CliError::Config)
}

fn load_host(path: &Path) -> StaticHostContext {
    StaticHostContext::from_file(path)
        .unwrap_or_else(|err| StaticHostContext::unavailable(err.to_string()))
}

fn load_account(path: Option<&Path>) -> Result<Option<Account>, CliError> {
    if let Some(path) = path {
        let raw = fs::read(path)
            .with_context(|| format!("reading {}", path.display()))
            .map_err(|err| CliError::Input(path.to_path_buf(), err))?;
        let account = serde_json::from_slice::<Account>(&raw)
            .context("parsing account")
            .map_err(|err| CliError::Input(path.to_path_buf(), err))?;
        return Ok(Some(account));
    }
    Ok(std::env::var(REFRESH_TOKEN_ENV)
        .ok()
        .filter(|token| !token.trim().is_empty())
        .map(|refresh_token| Account {
            home_account_id: "env".to_string(),
            username: "env".to_string(),
            refresh_token: Some(refresh_token),
        }))
}

fn build_controller(
    cfg: &DashboardConfig,
    context: &Path,
    account: Option<&Path>,
) -> Result<DashboardController, CliError> {
    debug!(
        container = ?cfg.container,
        graph = %cfg.graph_base_url,
        context = %context.display(),
        "building dashboard controller"
    );
    let http: Arc<dyn HttpClient> = Arc::new(ReqwestClient::new());
    let tokens = SilentTokenClient::new(cfg, http.clone());
    if let Some(account) = load_account(account)? {
        tokens.add_account(account);
    }
    let host: Arc<dyn HostContextProvider> = Arc::new(load_host(context));
    Ok(DashboardController::new(
        host,
        Arc::new(tokens),
        GraphClient::from_config(cfg, http),
        DashboardSettings::from(cfg),
    ))
}

fn print_view(controller: &DashboardController, format: Format) -> Result<(), CliError> {
    let view = controller.view();
    match format {
        Format::Text => print!("{view}"),
        Format::Json => println!(
            "{}",
            serde_json::to_string_pretty(&view).map_err(|err| CliError::Output(err.into()))?
        ),
        Format::Card => match dashboard_card(&view) {
            Some(card) => println!(
                "{}",
                serde_json::to_string_pretty(&card).map_err(|err| CliError::Output(err.into()))?
            ),
            None => print!("{view}"),
        },
    }
    Ok(())
}

fn block_on<F: std::future::Future>(future: F) -> Result<F::Output, CliError> {
    let runtime = Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(CliError::Runtime)?;
    Ok(runtime.block_on(future))
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Config(ConfigError),
    #[error("input file failed ({}): {:#}", .0.display(), .1)]
    Input(PathBuf, #[source] anyhow::Error),
    #[error("{0}")]
    Usage(String),
    #[error(transparent)]
    Adapter(AdapterError),
    #[error("channel card was not posted")]
    NotPosted,
    #[error("failed to write output: {0}")]
    Output(#[source] anyhow::Error),
    #[error("failed to start async runtime: {0}")]
    Runtime(#[source] io::Error),
}

impl CliError {
    fn exit_code(&self) -> i32 {
        match self {
            CliError::Config(_) => 2,
            CliError::Usage(_) => 2,
            CliError::Input(_, _) => 1,
            CliError::Adapter(err) => match err.kind() {
                ErrorKind::Validation => 2,
                ErrorKind::NoSession => 3,
                ErrorKind::HostUnavailable => 6,
                ErrorKind::Network | ErrorKind::Malformed | ErrorKind::Cancelled => 4,
            },
            CliError::NotPosted => 4,
            CliError::Output(_) => 5,
            CliError::Runtime(_) => 5,
        }
    }
}
