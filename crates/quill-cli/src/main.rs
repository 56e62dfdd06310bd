use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::debug;

use quill_api::ClientConfig;
use quill_types::{NotificationId, PostId};

mod commands;

use commands::App;

#[derive(Parser, Debug)]
#[command(name = "quill", version, about = "Command-line client for the Quill blog")]
struct Args {
    /// Backend base URL. Overrides QUILL_API_URL.
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Directory holding the persisted session. Overrides QUILL_STATE_DIR.
    #[arg(long, global = true)]
    state_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Sign in and remember the session.
    Login {
        email: String,
        #[arg(env = "QUILL_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Create an account, then sign in with it.
    Register {
        username: String,
        email: String,
        #[arg(env = "QUILL_PASSWORD", hide_env_values = true)]
        password: String,
    },
    Logout,
    /// Show the signed-in user.
    Whoami,
    /// List every post.
    Feed,
    #[command(subcommand)]
    Post(PostCommand),
    /// Show a profile and its posts. Defaults to your own.
    Profile { username: Option<String> },
    /// Like the post, or unlike it if you already do.
    Like { post_id: PostId },
    /// Who liked a post.
    Likers { post_id: PostId },
    #[command(subcommand)]
    Notifications(NotificationCommand),
}

#[derive(Subcommand, Debug)]
pub enum PostCommand {
    New { title: String, content: String },
    Show { id: PostId },
    Delete { id: PostId },
}

#[derive(Subcommand, Debug)]
pub enum NotificationCommand {
    /// Print notifications and the unread badge without acknowledging them.
    List,
    /// Follow one notification's link and mark it read.
    Read {
        id: NotificationId,
        /// Follow the liker's profile instead of the post.
        #[arg(long)]
        liker: bool,
    },
    /// Show the dropdown and acknowledge everything unread.
    Open,
    /// Delete all notifications.
    Clear,
    /// Poll for new notifications until interrupted.
    Watch {
        /// Seconds between polls. Overrides QUILL_POLL_INTERVAL_SECS.
        #[arg(long)]
        interval: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Logs go to stderr; stdout is command output.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn,quill=info".into()),
        )
        .init();

    let args = Args::parse();

    let mut config = ClientConfig::from_env()?;
    if let Some(api_url) = args.api_url {
        config.api_url = api_url;
    }
    if let Some(state_dir) = args.state_dir {
        config.state_dir = state_dir;
    }
    debug!(api_url = %config.api_url, state_dir = %config.state_dir.display(), "Loaded config");

    let mut app = App::new(config)?;
    app.run(args.command).await
}
