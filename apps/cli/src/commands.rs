//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use deliverybot_chat::DiscordClient;
use deliverybot_checker::{ProdChecker, ProdStatus};
use deliverybot_core::pipeline::{
    CollectConfig, CollectDeps, DeliveryReport, MessageOutcome, ProgressReporter,
};
use deliverybot_core::{RepoMaterializer, Roster, collect_deliveries};
use deliverybot_shared::{
    AppConfig, ChallengeCode, expand_home, init_config, load_config, resolve_token,
    validate_for_collect,
};
use deliverybot_storage::Storage;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// deliverybot: gather challenge deliveries from the class chat.
#[derive(Parser)]
#[command(
    name = "deliverybot",
    version,
    about = "Collect challenge deliveries from the class chat into local repositories.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Clone every delivery posted for a challenge and report who is missing.
    Collect {
        /// Challenge code, e.g. w1ch2 or w3chwe.
        #[arg(short, long)]
        challenge: ChallengeCode,

        /// Run prod URLs through the HTML validator.
        #[arg(long)]
        validate: bool,

        /// Roster file (defaults to [roster] path from the config).
        #[arg(long)]
        roster: Option<PathBuf>,

        /// Record deliveries in this database (defaults to [database] path).
        #[arg(long)]
        db: Option<PathBuf>,
    },

    /// List projects recorded for a challenge.
    Projects {
        /// Challenge code, e.g. w1ch2.
        #[arg(short, long)]
        challenge: ChallengeCode,

        /// Database to read (defaults to [database] path).
        #[arg(long)]
        db: Option<PathBuf>,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "deliverybot=info",
        1 => "deliverybot=debug",
        _ => "deliverybot=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Collect {
            challenge,
            validate,
            roster,
            db,
        } => cmd_collect(challenge, validate, roster.as_deref(), db.as_deref()).await,
        Command::Projects { challenge, db } => cmd_projects(challenge, db.as_deref()).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show().await,
        },
    }
}

/// `--db` flag first, then the configured path.
fn database_path(config: &AppConfig, flag: Option<&Path>) -> Option<PathBuf> {
    flag.map(Path::to_path_buf)
        .or_else(|| config.database.path.as_deref().map(expand_home))
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_collect(
    challenge: ChallengeCode,
    validate: bool,
    roster_path: Option<&Path>,
    db: Option<&Path>,
) -> Result<()> {
    let config = load_config()?;
    validate_for_collect(&config)?;
    let token = resolve_token(&config)?;

    let roster_path = roster_path
        .map(Path::to_path_buf)
        .unwrap_or_else(|| expand_home(&config.roster.path));
    let roster = Roster::load(&roster_path)?;

    let root = expand_home(&config.paths.bootcamp_path).join(&config.paths.bootcamp);
    let materializer = RepoMaterializer::new(&root, config.paths.git_cmd.clone());
    let checker = ProdChecker::new(&config.checker)?;
    let source = DiscordClient::new(
        config.discord.api_base.clone(),
        token,
        config.discord.guild_id.clone(),
    )?;

    let storage = match database_path(&config, db) {
        Some(path) => Some(Storage::open(&path).await?),
        None => None,
    };

    let collect_config = CollectConfig {
        challenge,
        validate,
        message_limit: config.discord.message_limit,
        forwarder_name: config.discord.forwarder_name.clone(),
    };
    let deps = CollectDeps {
        source: &source,
        materializer: &materializer,
        checker: &checker,
        storage: storage.as_ref(),
    };

    info!(
        %challenge,
        validate,
        root = %root.display(),
        students = roster.len(),
        "collecting deliveries"
    );

    let reporter = CliProgress::new();
    let report = collect_deliveries(&collect_config, &deps, roster, &reporter).await?;

    print_report(&report);
    Ok(())
}

fn print_report(report: &DeliveryReport) {
    println!();
    println!(
        "  {} ({} / {})",
        report.challenge, report.location.category.name, report.location.channel.name
    );
    println!();

    for outcome in &report.outcomes {
        match outcome {
            MessageOutcome::Delivered(delivery) => {
                println!("  + {}", delivery.attribution.folder);
                for (url, folder, result) in &delivery.repos {
                    println!("      repo  {folder:<24} {result:?}  {url}");
                }
                for check in &delivery.prod_checks {
                    let status = match &check.status {
                        ProdStatus::Ok(code) => format!("{code}"),
                        ProdStatus::NotFound => "404".to_string(),
                        ProdStatus::Unexpected(code) => format!("{code}!"),
                        ProdStatus::Unreachable(_) => "down".to_string(),
                    };
                    match (&check.validation, &check.validation_error) {
                        (Some(v), _) => println!(
                            "      prod  {status:<4} {} ({} errors, {} warnings)",
                            check.url, v.errors, v.warnings
                        ),
                        (None, Some(e)) => println!(
                            "      prod  {status:<4} {} (validation failed: {e})",
                            check.url
                        ),
                        (None, None) => println!("      prod  {status:<4} {}", check.url),
                    }
                    if let ProdStatus::Unreachable(reason) = &check.status {
                        println!("            {reason}");
                    }
                }
            }
            MessageOutcome::Duplicate { nickname } => {
                println!("  = {nickname} (already delivered)");
            }
            MessageOutcome::Failed {
                message_id,
                nickname,
                error,
            } => {
                let who = nickname.as_deref().unwrap_or(message_id.as_str());
                println!("  ! {who}: {error}");
            }
        }
    }

    println!();
    println!("  Delivered:  {}/{}", report.delivered, report.roster_size);
    println!("  Duplicates: {}", report.duplicates());
    println!("  Failures:   {}", report.failures().count());
    if !report.unlisted.is_empty() {
        println!("  Unlisted:   {}", report.unlisted.join(", "));
    }
    println!("  Time:       {:.1}s", report.elapsed.as_secs_f64());

    if report.missing.is_empty() {
        println!();
        println!("  Everyone delivered!");
    } else {
        println!();
        println!("  Missing ({}):", report.missing.len());
        for student in &report.missing {
            println!("    - {student}");
        }
    }
    println!();
}

async fn cmd_projects(challenge: ChallengeCode, db: Option<&Path>) -> Result<()> {
    let config = load_config()?;
    let path = database_path(&config, db)
        .ok_or_else(|| eyre!("no database configured: pass --db or set [database] path"))?;

    let storage = Storage::open_readonly(&path).await?;
    let Some(record) = storage.get_challenge(&challenge.to_string()).await? else {
        println!("No deliveries recorded for {challenge}.");
        return Ok(());
    };

    let projects = storage.list_projects_by_challenge(&record.id).await?;
    info!(%challenge, count = projects.len(), "listing projects");

    println!();
    println!("  {challenge}: {} project(s)", projects.len());
    for project in &projects {
        println!();
        println!("  {} (posted by {})", project.name, project.student);
        for url in &project.repo_urls {
            println!("    repo  {url}");
        }
        for url in &project.prod_urls {
            println!("    prod  {url}");
        }
    }
    println!();

    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);
        spinner.set_style(style);
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn message_processed(&self, current: usize, total: usize, outcome: &MessageOutcome) {
        let who = match outcome {
            MessageOutcome::Delivered(d) => d.attribution.folder.as_str(),
            MessageOutcome::Duplicate { nickname } => nickname.as_str(),
            MessageOutcome::Failed { nickname, .. } => nickname.as_deref().unwrap_or("?"),
        };
        self.spinner
            .set_message(format!("Processing [{current}/{total}] {who}"));
    }

    fn done(&self, _report: &DeliveryReport) {
        self.spinner.finish_and_clear();
    }
}

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}
