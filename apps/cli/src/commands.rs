//! CLI command definitions, routing, and tracing setup.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Report, Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use sitelinks_core::{ProgressReporter, WorkflowConfig, WorkflowOutcome, run_workflow};
use sitelinks_platform::{HttpPlatform, PlatformOptions};
use sitelinks_shared::{
    AppConfig, CampaignId, Device, WorkflowStage, config_file_path, init_config, load_config,
    load_config_from, validate_credentials,
};
use tracing::info;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// sitelinks — attach sitelink extensions to a campaign through a feed.
#[derive(Parser)]
#[command(
    name = "sitelinks",
    version,
    about = "Create a sitelinks feed and attach it to an ads campaign.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file to use instead of ~/.sitelinks/sitelinks.toml.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Device filter for the matching function.
#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub(crate) enum DeviceArg {
    Mobile,
    Desktop,
    /// Serve on every device.
    Any,
}

impl DeviceArg {
    fn to_device(self) -> Option<Device> {
        match self {
            Self::Mobile => Some(Device::Mobile),
            Self::Desktop => Some(Device::Desktop),
            Self::Any => None,
        }
    }
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Create the feed, its items and mapping, and attach it to a campaign.
    Run {
        /// Campaign to attach the sitelinks to.
        #[arg(long)]
        campaign_id: i64,

        /// Device filter (defaults to the config's workflow.device).
        #[arg(long)]
        device: Option<DeviceArg>,

        /// Feed name prefix (defaults to the config's workflow.feed_name_prefix).
        #[arg(long)]
        feed_name_prefix: Option<String>,
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
        0 => "sitelinks=info",
        1 => "sitelinks=debug",
        _ => "sitelinks=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt().json().with_env_filter(env_filter).init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    };

    match cli.command {
        Command::Run {
            campaign_id,
            device,
            feed_name_prefix,
        } => cmd_run(&config, campaign_id, device, feed_name_prefix).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(&config),
        },
    }
}

async fn cmd_run(
    config: &AppConfig,
    campaign_id: i64,
    device: Option<DeviceArg>,
    feed_name_prefix: Option<String>,
) -> Result<()> {
    if campaign_id <= 0 {
        return Err(eyre!("campaign id must be positive, got {campaign_id}"));
    }

    // Validate credentials before doing anything
    let credentials = validate_credentials(config)?;
    let platform = HttpPlatform::new(PlatformOptions::from_config(config, credentials)?)?;

    let mut workflow = WorkflowConfig::from_app_config(config, CampaignId(campaign_id));
    if let Some(device) = device {
        workflow.device = device.to_device();
    }
    if let Some(prefix) = feed_name_prefix {
        workflow.feed_name_prefix = prefix;
    }

    info!(
        campaign_id,
        sitelinks = workflow.sitelinks.len(),
        device = ?workflow.device,
        "attaching sitelinks"
    );

    let reporter = CliProgress::new();

    let outcome = match run_workflow(&platform, &workflow, &reporter).await {
        Ok(outcome) => outcome,
        Err(e) => {
            reporter.spinner.abandon();
            let stage = e
                .stage()
                .map(|s| s.to_string())
                .unwrap_or_else(|| "input validation".into());
            return Err(Report::new(e).wrap_err(format!("sitelinks workflow failed during {stage}")));
        }
    };

    // Print summary
    let feed = outcome.mapped.populated().defined().feed();
    println!();
    println!("  Sitelinks attached!");
    println!("  Campaign: {}", outcome.campaign_feed.campaign_id);
    println!("  Feed:     {} ({})", feed.id, feed.name);
    println!(
        "  Items:    {}",
        outcome
            .item_ids()
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    );
    println!("  Mapping:  {}", outcome.mapped.mapping().feed_mapping_id);
    println!(
        "  Function: {}",
        outcome.campaign_feed.matching_function.function_string
    );
    println!("  Time:     {:.1}s", outcome.elapsed.as_secs_f64());
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
    fn stage(&self, stage: WorkflowStage) {
        let message = match stage {
            WorkflowStage::Definition => "Creating feed",
            WorkflowStage::Population => "Adding sitelink items",
            WorkflowStage::Mapping => "Mapping feed to sitelinks placeholder",
            WorkflowStage::Association => "Attaching feed to campaign",
        };
        self.spinner.set_message(message);
    }

    fn done(&self, _outcome: &WorkflowOutcome) {
        self.spinner.finish_and_clear();
    }
}

fn cmd_config_init() -> Result<()> {
    let path = config_file_path()?;
    if path.exists() {
        println!("Config already exists at {}", path.display());
        return Ok(());
    }
    let path = init_config()?;
    println!("Created config at {}", path.display());
    println!("Set api.client_customer_id there, then export the token env vars it names.");
    Ok(())
}

fn cmd_config_show(config: &AppConfig) -> Result<()> {
    let rendered = toml::to_string_pretty(config)?;
    println!("{rendered}");
    Ok(())
}
