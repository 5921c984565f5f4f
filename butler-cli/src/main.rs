//! Butler CLI - trigger builds, wait for them and follow their console.

mod commands;

use anyhow::Result;
use butler_client::ConsoleFormat;
use butler_core::observability::{LogFormat, TracingConfig, TracingConfigBuilder, init_tracing};
use clap::{Parser, Subcommand};
use commands::ServerArgs;

/// Butler - command-line client for a Jenkins-compatible build server.
#[derive(Parser)]
#[command(name = "butler")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(flatten)]
    server: ServerArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Trigger a build and wait for it to start
    Build {
        /// Full job name, folders separated by '/'
        job: String,

        /// Build parameter as KEY=VALUE (repeatable)
        #[arg(short = 'p', long = "param", value_parser = commands::build::parse_param)]
        params: Vec<(String, String)>,

        /// Return once the build is queued
        #[arg(long)]
        no_wait: bool,

        /// Stream the console output until the build finishes
        #[arg(short, long)]
        follow: bool,

        /// Console format when following (text or html)
        #[arg(long, default_value = "text")]
        format: ConsoleFormat,

        /// Seconds between queue polls (defaults to --poll-interval-ms)
        #[arg(long)]
        poll_secs: Option<u64>,

        /// Give up waiting for the build to start after this many seconds
        #[arg(long)]
        start_timeout: Option<u64>,
    },

    /// Wait for a queued entry to start its build
    Wait {
        /// Queue id or queue entry URL
        entry: String,

        /// Give up after this many seconds
        #[arg(long)]
        timeout: Option<u64>,
    },

    /// Print the console output of a build
    Logs {
        /// Full job name
        job: String,

        /// Build number (defaults to the last build)
        number: Option<u64>,

        /// Keep streaming while the build runs
        #[arg(short, long)]
        follow: bool,

        /// Console format (text or html)
        #[arg(long, default_value = "text")]
        format: ConsoleFormat,
    },

    /// Inspect and manage jobs
    Jobs {
        #[command(subcommand)]
        action: JobsAction,
    },

    /// Inspect and manage the build queue
    Queue {
        #[command(subcommand)]
        action: QueueAction,
    },

    /// Inspect and manage build agents
    Nodes {
        #[command(subcommand)]
        action: NodesAction,
    },

    /// Show client and server version information
    Version,
}

#[derive(Subcommand)]
enum JobsAction {
    /// List jobs
    List {
        /// Folder to list (defaults to the server root)
        #[arg(long, default_value = "")]
        folder: String,

        /// Nested folder levels to descend
        #[arg(long, default_value = "0")]
        depth: usize,
    },

    /// Allow a job to be built
    Enable {
        /// Full job name
        job: String,
    },

    /// Prevent new builds of a job
    Disable {
        /// Full job name
        job: String,
    },

    /// Print a job's config.xml
    Config {
        /// Full job name
        job: String,
    },
}

#[derive(Subcommand)]
enum QueueAction {
    /// List queued entries
    List,

    /// Cancel a queued entry
    Cancel {
        /// Queue id
        id: u64,
    },
}

#[derive(Subcommand)]
enum NodesAction {
    /// List nodes
    List,

    /// List busy executors and the builds they run
    Busy,

    /// Bring a node back online
    Enable {
        /// Node display name
        name: String,
    },

    /// Take a node offline
    Disable {
        /// Node display name
        name: String,

        /// Message shown to users
        #[arg(short, long, default_value = "")]
        message: String,
    },
}

fn setup_logging(verbosity: u8) -> Result<butler_core::observability::TracingGuard> {
    let mut builder = TracingConfigBuilder::from_config(TracingConfig::from_env());

    if std::env::var_os("BUTLER_LOG_FORMAT").is_none() {
        let format = if std::io::IsTerminal::is_terminal(&std::io::stderr()) {
            LogFormat::Pretty
        } else {
            LogFormat::Compact
        };
        builder = builder.log_format(format);
    }

    init_tracing(builder.verbosity(verbosity).build())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let _tracing_guard = setup_logging(cli.verbose)?;
    let cancel = commands::cancel_on_ctrl_c();

    match cli.command {
        Commands::Build {
            job,
            params,
            no_wait,
            follow,
            format,
            poll_secs,
            start_timeout,
        } => {
            let options = commands::build::BuildOptions {
                params,
                wait: !no_wait,
                follow,
                format,
                poll_secs,
                start_timeout,
            };
            commands::build::run(&cli.server, &job, options, &cancel).await
        }
        Commands::Wait { entry, timeout } => {
            commands::build::wait(&cli.server, &entry, timeout, &cancel).await
        }
        Commands::Logs {
            job,
            number,
            follow,
            format,
        } => commands::logs::run(&cli.server, &job, number, follow, format, &cancel).await,
        Commands::Jobs { action } => match action {
            JobsAction::List { folder, depth } => {
                commands::jobs::list(&cli.server, &folder, depth).await
            }
            JobsAction::Enable { job } => commands::jobs::enable(&cli.server, &job).await,
            JobsAction::Disable { job } => commands::jobs::disable(&cli.server, &job).await,
            JobsAction::Config { job } => commands::jobs::config(&cli.server, &job).await,
        },
        Commands::Queue { action } => match action {
            QueueAction::List => commands::queue::list(&cli.server).await,
            QueueAction::Cancel { id } => commands::queue::cancel(&cli.server, id).await,
        },
        Commands::Nodes { action } => match action {
            NodesAction::List => commands::nodes::list(&cli.server).await,
            NodesAction::Busy => commands::nodes::busy(&cli.server).await,
            NodesAction::Enable { name } => commands::nodes::enable(&cli.server, &name).await,
            NodesAction::Disable { name, message } => {
                commands::nodes::disable(&cli.server, &name, &message).await
            }
        },
        Commands::Version => commands::version::run(&cli.server).await,
    }
}
