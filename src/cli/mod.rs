//! Command-line interface parsing and handling
//!
//! Each data command builds an [`AsyncResource`] around one service call,
//! starts it, and prints the settled state. `follow` keeps the resource
//! polling until interrupted.

pub mod follow;
pub mod output;
pub mod settings;

use std::error::Error;
use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;

use chrono::NaiveDate;
use clap::{Args as ClapArgs, Parser, Subcommand};
use tracing::debug;

use crate::api::models::{AnalysisRequest, AnalysisTask, ChatQuery, DateRange};
use crate::api::{ApiError, Envelope};
use crate::core::config::Config;
use crate::core::resource::AsyncResource;
use crate::services::Services;
use crate::utils::logging;
use output::Printer;

#[derive(Parser, Debug)]
#[command(name = "chatlens")]
#[command(about = "Query a live-stream chat analytics backend from the terminal")]
#[command(
    long_about = "chatlens talks to a chat analytics API and prints channels, chat logs, \
per-user chat-type distributions, watched streamers and word statistics.\n\n\
Responses in any of the backend's known shapes are normalized before printing; \
unrecognized shapes print as empty results rather than failing.\n\n\
Environment Variables:\n\
  CHATLENS_API_URL        API base URL (default http://localhost:3000)\n\
  CHATLENS_ANALYSIS_URL   Absolute URL of the word analysis function\n\
  CHATLENS_TIMEOUT_SECS   Request timeout in seconds (default 10)\n\
  RUST_LOG                Log filter, overrides --verbose"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,

    /// Use this config file instead of the default location
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Log requests and normalizer decisions to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Print normalized results as JSON
    #[arg(long, global = true)]
    pub json: bool,
}

#[derive(ClapArgs, Debug, Clone, Default, PartialEq)]
pub struct RangeArgs {
    /// First day of the range (YYYY-MM-DD)
    #[arg(long, value_name = "DATE")]
    pub start: Option<NaiveDate>,
    /// Last day of the range (YYYY-MM-DD)
    #[arg(long, value_name = "DATE")]
    pub end: Option<NaiveDate>,
}

impl RangeArgs {
    pub fn to_range(&self) -> Result<DateRange, String> {
        let range = DateRange::new(self.start, self.end);
        if range.is_inverted() {
            return Err("--start must not be after --end".to_string());
        }
        Ok(range)
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List channels
    Channels,
    /// Search chat messages
    Chats {
        /// Channel id
        #[arg(long)]
        channel: Option<String>,
        /// Hashed user id
        #[arg(long)]
        user: Option<String>,
        #[arg(long)]
        nickname: Option<String>,
        #[arg(long = "chat-type")]
        chat_type: Option<String>,
        /// Text to search for
        #[arg(long)]
        message: Option<String>,
        /// Lower bound on message time, passed through as given
        #[arg(long)]
        from: Option<String>,
        /// Upper bound on message time, passed through as given
        #[arg(long)]
        to: Option<String>,
        #[arg(long)]
        limit: Option<u32>,
    },
    /// Chat-type distribution for one user
    ChatTypes {
        /// Hashed user id
        user: String,
        #[command(flatten)]
        range: RangeArgs,
    },
    /// Streamers a user watched most
    Watched {
        /// Hashed user id
        user: String,
        #[command(flatten)]
        range: RangeArgs,
        /// Number of streamers to return
        #[arg(long)]
        top: Option<u32>,
    },
    /// Word statistics for one user (needs an analysis URL)
    Words {
        /// Hashed user id
        user: String,
        #[command(flatten)]
        range: RangeArgs,
        /// Number of frequent words
        #[arg(long)]
        top: Option<u32>,
        /// Number of word cloud entries
        #[arg(long = "max-items")]
        max_items: Option<u32>,
        /// Keep emotes in the statistics
        #[arg(long = "include-emotes")]
        include_emotes: bool,
        /// Restrict to these tasks (wordCloud, frequentWords)
        #[arg(long = "task", value_parser = parse_task)]
        tasks: Vec<AnalysisTask>,
    },
    /// Print new chat messages as they arrive
    Follow {
        /// Channel id
        #[arg(long)]
        channel: Option<String>,
        /// Seconds between refreshes (defaults to poll_interval_secs)
        #[arg(long, value_name = "SECS")]
        interval: Option<u64>,
    },
    /// Inspect or change the config file
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum ConfigCommands {
    /// Print the effective configuration
    Show,
    /// Print the config file location
    Path,
    /// Set a key (api_base_url, analysis_url, timeout_secs, poll_interval_secs,
    /// user_agent, header.<Name>)
    Set { key: String, value: String },
    /// Remove a key
    Unset { key: String },
}

fn parse_task(value: &str) -> Result<AnalysisTask, String> {
    AnalysisTask::parse(value)
        .ok_or_else(|| format!("unknown task '{value}' (expected wordCloud or frequentWords)"))
}

pub fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    logging::init(args.verbose);
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async_main(args))
}

async fn async_main(args: Args) -> Result<(), Box<dyn Error>> {
    let config_path = match args.config.clone() {
        Some(path) => path,
        None => Config::default_config_path()?,
    };
    let printer = Printer::new(args.json);

    if let Commands::Config { command } = &args.command {
        return match command {
            ConfigCommands::Show => {
                let config = Config::load_effective(&config_path)?;
                settings::show(&config, &config_path)
            }
            ConfigCommands::Path => {
                println!("{}", config_path.display());
                Ok(())
            }
            ConfigCommands::Set { key, value } => settings::set(&config_path, key, value),
            ConfigCommands::Unset { key } => settings::unset(&config_path, key),
        };
    }

    let config = Config::load_effective(&config_path)?;
    debug!(base_url = config.api_base_url(), "Loaded configuration");
    let services = Services::from_config(&config)?;

    match args.command {
        Commands::Channels => {
            let channels = run_once((), move |()| {
                let services = services.clone();
                async move { services.channels().await }
            })
            .await?;
            printer.print(&channels, |c| output::render_channels(c))?;
        }
        Commands::Chats {
            channel,
            user,
            nickname,
            chat_type,
            message,
            from,
            to,
            limit,
        } => {
            let query = ChatQuery {
                channel_id: channel,
                user_id_hash: user,
                nickname,
                chat_type,
                message,
                from,
                to,
                limit,
                ..ChatQuery::default()
            };
            let chats = run_once(query, move |query: ChatQuery| {
                let services = services.clone();
                async move { services.chats(&query).await }
            })
            .await?;
            printer.print(&chats, |c| output::render_chats(c))?;
        }
        Commands::ChatTypes { user, range } => {
            let range = range.to_range()?;
            let types = run_once((user, range), move |(user, range): (String, DateRange)| {
                let services = services.clone();
                async move { services.chat_types(&user, &range).await }
            })
            .await?;
            printer.print(&types, |t| output::render_chat_types(t))?;
        }
        Commands::Watched { user, range, top } => {
            let range = range.to_range()?;
            let watched = run_once((user, range), move |(user, range): (String, DateRange)| {
                let services = services.clone();
                async move { services.watched_streamers(&user, &range, top).await }
            })
            .await?;
            printer.print(&watched, |w| output::render_watched(w))?;
        }
        Commands::Words {
            user,
            range,
            top,
            max_items,
            include_emotes,
            tasks,
        } => {
            let range = range.to_range()?;
            let request = analysis_request(user, range, top, max_items, include_emotes, tasks);
            let report = run_once(request, move |request: AnalysisRequest| {
                let services = services.clone();
                async move { services.analyze(&request).await }
            })
            .await?;
            printer.print(&report, output::render_report)?;
        }
        Commands::Follow { channel, interval } => {
            let interval = interval
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs)
                .unwrap_or_else(|| config.poll_interval());
            let query = ChatQuery {
                channel_id: channel,
                ..ChatQuery::default()
            };
            follow::follow(services, query, interval, printer).await?;
        }
        Commands::Config { .. } => {}
    }
    Ok(())
}

pub fn analysis_request(
    user: String,
    range: DateRange,
    top: Option<u32>,
    max_items: Option<u32>,
    include_emotes: bool,
    tasks: Vec<AnalysisTask>,
) -> AnalysisRequest {
    let mut request = AnalysisRequest::new(user, range);
    if let Some(top) = top {
        request.top_n = top;
    }
    if let Some(max_items) = max_items {
        request.max_items = max_items;
    }
    request.exclude_emotes = !include_emotes;
    if !tasks.is_empty() {
        let mut unique = Vec::with_capacity(tasks.len());
        for task in tasks {
            if !unique.contains(&task) {
                unique.push(task);
            }
        }
        request.tasks = unique;
    }
    request
}

/// Starts a one-shot resource and returns its data, or the stored error.
async fn run_once<T, D, F, Fut>(dependencies: D, producer: F) -> Result<T, ApiError>
where
    T: Clone + Send + Sync + 'static,
    D: Clone + PartialEq + Send + 'static,
    F: Fn(D) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Envelope<T>, ApiError>> + Send + 'static,
{
    let resource = AsyncResource::new(dependencies, producer);
    let state = resource.start().await;
    resource.teardown();
    match (state.data, state.error) {
        (_, Some(error)) => Err(error),
        (Some(data), None) => Ok(data),
        (None, None) => Err(ApiError::transport("Request finished without data")),
    }
}
