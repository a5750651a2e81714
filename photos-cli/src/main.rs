mod commands;
mod report;

use anyhow::Result;
use clap::{Parser, Subcommand};
use photos_core::config::{
    default_browser_binary, default_browser_profile, ApiConfig, AuthConfig, BrowserConfig,
    DeletionConfig, DeletionStrategy, RunConfig, DEFAULT_API_BASE_URL, DEFAULT_CONCURRENCY,
    DEFAULT_WEBDRIVER_URL,
};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "photos")]
#[command(about = "List Google Photos albums and remove the empty ones", long_about = None)]
struct Cli {
    /// OAuth token file written by the consent flow
    #[arg(long, global = true, env = "PHOTOS_TOKEN_FILE", default_value = "token.json")]
    token_file: PathBuf,

    /// Photos Library API base URL
    #[arg(long, global = true, env = "PHOTOS_API_BASE_URL", default_value = DEFAULT_API_BASE_URL)]
    api_base_url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List every album with its item count
    List,

    /// Remove albums that contain no media items
    DeleteEmpty {
        /// `ui` drives the web page (read-only token), `api` calls albums:remove
        #[arg(long, env = "PHOTOS_DELETE_STRATEGY", default_value = "ui")]
        strategy: DeletionStrategy,

        /// Firefox executable
        #[arg(long, env = "PHOTOS_BROWSER_BINARY")]
        browser_binary: Option<PathBuf>,

        /// Firefox profile directory already signed in to Google Photos
        #[arg(long, env = "PHOTOS_BROWSER_PROFILE")]
        browser_profile: Option<PathBuf>,

        /// WebDriver (geckodriver) endpoint
        #[arg(long, env = "PHOTOS_WEBDRIVER_URL", default_value = DEFAULT_WEBDRIVER_URL)]
        webdriver_url: String,

        /// Number of albums deleted in parallel
        #[arg(short = 'j', long, env = "PHOTOS_CONCURRENCY", default_value_t = DEFAULT_CONCURRENCY)]
        concurrency: usize,

        /// Seconds before a single deletion is abandoned; must exceed the 90s browser session bound
        #[arg(long, default_value_t = 180)]
        task_timeout: u64,

        /// Use the profile directory in place instead of a private copy per session (requires -j 1)
        #[arg(long)]
        shared_profile: bool,

        /// Only show which albums would be removed
        #[arg(long)]
        dry_run: bool,
    },
}

impl Cli {
    fn run_config(&self) -> RunConfig {
        let mut config = RunConfig {
            api: ApiConfig {
                base_url: self.api_base_url.clone(),
                ..ApiConfig::default()
            },
            auth: AuthConfig {
                token_file: self.token_file.clone(),
            },
            ..RunConfig::default()
        };

        if let Commands::DeleteEmpty {
            strategy,
            browser_binary,
            browser_profile,
            webdriver_url,
            concurrency,
            task_timeout,
            shared_profile,
            dry_run,
        } = &self.command
        {
            config.browser = BrowserConfig {
                binary: browser_binary.clone().unwrap_or_else(default_browser_binary),
                profile: browser_profile.clone().or_else(default_browser_profile),
                isolate_profile: !shared_profile,
                webdriver_url: webdriver_url.clone(),
                ..BrowserConfig::default()
            };
            config.deletion = DeletionConfig {
                strategy: *strategy,
                concurrency: *concurrency,
                task_timeout: Duration::from_secs(*task_timeout),
                dry_run: *dry_run,
            };
        }

        config
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "photos_cli=info,photos_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = cli.run_config();

    match cli.command {
        Commands::List => {
            commands::list::execute(config).await?;
        }
        Commands::DeleteEmpty { .. } => {
            commands::delete_empty::execute(config).await?;
        }
    }

    Ok(())
}
