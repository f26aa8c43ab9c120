//! FitShare CLI - post and read the end-to-end encrypted activity feed

mod commands;

use clap::{Parser, Subcommand};
use fitshare_client::Config;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "fitshare")]
#[command(about = "End-to-end encrypted activity feed client for FitShare")]
#[command(version)]
struct Args {
    /// Backend API URL
    #[arg(long, global = true, default_value = "http://localhost:8080", env = "FITSHARE_ENDPOINT")]
    endpoint: String,

    /// Access token from the login flow
    #[arg(long, global = true, env = "FITSHARE_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// FitShare user id of the logged-in user
    #[arg(short, long, global = true, env = "FITSHARE_USER")]
    user: Option<String>,

    /// Directory holding the local key and device databases
    #[arg(long, global = true, env = "FITSHARE_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Do not persist keys (for testing, the device is provisioned again next run)
    #[arg(long, global = true, env = "FITSHARE_MEMORY_STORE")]
    memory_store: bool,

    /// RSA modulus size for newly provisioned device keys
    #[arg(long, global = true, default_value_t = fitshare_crypto::DEFAULT_KEY_BITS, env = "FITSHARE_KEY_BITS")]
    key_bits: usize,

    /// Enable debug logging
    #[arg(short, long, global = true, env = "FITSHARE_DEBUG")]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Set up (or reuse) this device's key pair
    Provision,

    /// Publish an activity to yourself and all friends
    Post {
        /// RUNNING, CYCLING, WALKING, TENNIS or SWIMMING
        #[arg(short, long)]
        category: String,

        /// Free text
        #[arg(long, default_value = "")]
        content: String,

        /// Calories burned
        #[arg(long, default_value_t = 0)]
        kcal: u32,

        /// Duration as HH:MM
        #[arg(long, default_value = "00:00")]
        time: String,

        /// Distance in kilometres
        #[arg(long, default_value_t = 0.0)]
        distance: f64,
    },

    /// Show the decrypted feed
    Feed {
        /// Show your own posts instead of your friends'
        #[arg(long)]
        published: bool,

        /// Print raw JSON
        #[arg(long)]
        json: bool,
    },
}

impl Args {
    fn client_config(&self) -> Config {
        let mut config = Config::new(&self.endpoint).with_key_bits(self.key_bits);
        if let Some(token) = &self.token {
            config = config.with_token(token);
        }
        if !self.memory_store {
            if let Some(dir) = &self.data_dir {
                config = config.with_data_dir(dir);
            }
        }
        config
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let log_level = if args.debug { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            format!("fitshare_cli={0},fitshare_client={0}", log_level).into()
        }))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if args.memory_store {
        tracing::warn!("Using in-memory key storage - this device will NOT stay provisioned!");
    }

    let Some(user) = args.user.clone() else {
        anyhow::bail!("no user given, pass --user or set FITSHARE_USER");
    };

    let session = commands::Session::login(args.client_config(), &user).await?;
    match args.command {
        Command::Provision => commands::provision(&session),
        Command::Post {
            category,
            content,
            kcal,
            time,
            distance,
        } => commands::post(&session, &category, content, kcal, &time, distance).await,
        Command::Feed { published, json } => commands::feed(&session, published, json).await,
    }
}
