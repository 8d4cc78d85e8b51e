//! threadvault CLI - save, search and update conversation threads.

use clap::{Parser, Subcommand};
use std::io;
use std::process::ExitCode;
use threadvault::cli;
use threadvault::config::load_config;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

/// Get the version string.
///
/// - Release builds (on a git tag): "0.1.0"
/// - Development builds: "0.1.0-dev (abc1234)"
fn version() -> &'static str {
    const VERSION: &str = env!("CARGO_PKG_VERSION");
    const GIT_HASH: &str = env!("THREADVAULT_GIT_HASH");
    const IS_RELEASE: &str = env!("THREADVAULT_IS_RELEASE");

    static VERSION_STRING: std::sync::OnceLock<String> = std::sync::OnceLock::new();

    VERSION_STRING.get_or_init(|| {
        if IS_RELEASE == "true" {
            VERSION.to_string()
        } else {
            format!("{VERSION}-dev ({GIT_HASH})")
        }
    })
}

#[derive(Parser)]
#[command(name = "threadvault")]
#[command(author, version = version(), about = "Conversation thread storage and search", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the tool server (JSON-RPC over stdin/stdout).
    Serve,

    /// List saved conversations, newest first.
    List {
        /// Maximum number of conversations to show.
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Print a conversation by id or exact title.
    Show {
        /// Conversation id or title.
        id: String,

        /// Output format (json or markdown). Defaults to markdown.
        #[arg(short, long)]
        format: Option<String>,
    },

    /// Search saved conversations.
    Search {
        /// Free text matched against title, summary and messages.
        query: Option<String>,

        /// Required tag; repeat for several.
        #[arg(short, long = "tag")]
        tags: Vec<String>,

        /// Only conversations from this application.
        #[arg(long)]
        source_app: Option<String>,

        /// Maximum number of results.
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Delete a conversation by id.
    Delete {
        /// Conversation id.
        id: String,
    },
}

/// Log to stderr; stdout carries protocol frames when serving.
fn init_tracing() {
    let env_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(io::stderr)
        .compact()
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing();

    let result = load_config().and_then(|config| match cli.command {
        Commands::Serve => cli::serve::run(&config),
        Commands::List { limit } => cli::list::run(&config, limit),
        Commands::Show { id, format } => cli::show::run(&config, &id, format.as_deref()),
        Commands::Search {
            query,
            tags,
            source_app,
            limit,
        } => cli::search::run(&config, query, tags, source_app, limit),
        Commands::Delete { id } => cli::delete::run(&config, &id),
    });

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("threadvault: error: {e}");
            ExitCode::FAILURE
        }
    }
}
