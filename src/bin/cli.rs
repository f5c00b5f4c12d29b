use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use lockbox_sync::api::auth_api::Credentials;
use lockbox_sync::render::{format_text, select};
use lockbox_sync::utils::data::save_top_plays_to_csv;
use lockbox_sync::{build_dashboard, ClientConfig, PollOutcome};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "cli")]
#[command(about = "LockBox AI picks from the terminal", long_about = None)]
struct Cli {
    /// Backend base URL (overrides LOCKBOX_API_BASE_URL)
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Seconds between polls in watch mode
    #[arg(long, global = true)]
    interval: Option<u64>,

    /// Per-request timeout in seconds
    #[arg(long, global = true)]
    timeout: Option<u64>,

    /// Only fetch picks for this sport, e.g. nfl
    #[arg(long, global = true)]
    sport: Option<String>,

    /// Use the signed-in picks feed
    #[arg(long, global = true)]
    protected: bool,

    /// Where the login session is kept
    #[arg(long, global = true)]
    session_file: Option<PathBuf>,

    /// Keep the last snapshot in this JSON file between runs
    #[arg(long, global = true)]
    cache: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Fetch every endpoint once and print the dashboard
    Once {
        /// Print the view as JSON instead of text
        #[arg(long)]
        json: bool,
        /// Also write the top plays to this CSV file
        #[arg(long)]
        save_csv: Option<PathBuf>,
    },
    /// Poll on the interval and reprint on every change (Ctrl+C to stop)
    Watch,
    /// Sign in and store the session
    Login(AuthArgs),
    /// Create an account and store the session
    Signup(AuthArgs),
    /// Forget the stored session
    Logout,
}

#[derive(Args, Debug)]
struct AuthArgs {
    #[arg(long)]
    email: String,
    /// Falls back to LOCKBOX_PASSWORD
    #[arg(long)]
    password: Option<String>,
}

impl Cli {
    fn config(&self) -> Result<ClientConfig> {
        let mut config = ClientConfig::from_env()?;
        if let Some(base_url) = &self.base_url {
            config.base_url = base_url.clone();
        }
        if let Some(secs) = self.interval {
            config.poll_interval = Duration::from_secs(secs);
        }
        if let Some(secs) = self.timeout {
            config.request_timeout = Duration::from_secs(secs);
        }
        if let Some(sport) = &self.sport {
            config.sport = Some(sport.clone());
        }
        if self.protected {
            config.protected_picks = true;
        }
        if let Some(path) = &self.session_file {
            config.session_file = path.clone();
        }
        if let Some(path) = &self.cache {
            config.snapshot_cache = Some(path.clone());
        }
        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("lockbox_sync=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let dashboard = build_dashboard(cli.config()?)?;

    match cli.command {
        Commands::Once { json, save_csv } => {
            let outcome = dashboard.scheduler.poll_now().await;
            tracing::debug!(?outcome, "poll finished");
            dashboard.save_snapshot()?;

            let view = select(&dashboard.scheduler.store().current());
            if json {
                println!("{}", serde_json::to_string_pretty(&view)?);
            } else {
                println!("{}", format_text(&view));
            }

            if let Some(path) = save_csv {
                match dashboard.scheduler.store().snapshot() {
                    Some(snapshot) if !snapshot.top_plays.is_empty() => {
                        save_top_plays_to_csv(&snapshot.top_plays, &path)?;
                        println!("Saved top plays to {}", path.display());
                    }
                    _ => println!("No plays to save."),
                }
            }

            if matches!(outcome, PollOutcome::Failed { .. }) && !view.has_data() {
                bail!("every endpoint failed");
            }
        }
        Commands::Watch => {
            let scheduler = &dashboard.scheduler;
            let mut updates = scheduler.store().subscribe();
            println!(
                "Polling {} every {}s. Press Ctrl+C to stop\n",
                dashboard.client.base_url(),
                scheduler.interval().as_secs()
            );
            scheduler.activate();

            loop {
                tokio::select! {
                    changed = updates.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        let state = updates.borrow_and_update().clone();
                        if !state.loading {
                            println!("{}", format_text(&select(&state)));
                            if let Err(e) = dashboard.save_snapshot() {
                                tracing::warn!(error = %e, "could not write snapshot cache");
                            }
                        }
                    }
                    _ = tokio::signal::ctrl_c() => {
                        println!("\nStopping...");
                        break;
                    }
                }
            }
            scheduler.deactivate();
        }
        Commands::Login(args) => {
            let credentials = credentials(args)?;
            let session = dashboard
                .client
                .login(&credentials)
                .await
                .context("Invalid email or password")?;
            println!(
                "Signed in as {}. Session saved to {}",
                session.user.map(|u| u.email).unwrap_or(credentials.email),
                dashboard.tokens.path().display()
            );
        }
        Commands::Signup(args) => {
            let credentials = credentials(args)?;
            let session = dashboard
                .client
                .signup(&credentials)
                .await
                .context("Email already registered or invalid input")?;
            println!(
                "Account created for {}. Session saved to {}",
                session.user.map(|u| u.email).unwrap_or(credentials.email),
                dashboard.tokens.path().display()
            );
        }
        Commands::Logout => {
            dashboard.client.logout()?;
            println!("Signed out.");
        }
    }

    Ok(())
}

fn credentials(args: AuthArgs) -> Result<Credentials> {
    let password = match args.password {
        Some(password) => password,
        None => std::env::var("LOCKBOX_PASSWORD")
            .context("Pass --password or set LOCKBOX_PASSWORD")?,
    };
    if args.email.trim().is_empty() || password.is_empty() {
        bail!("Email and password are required");
    }
    Ok(Credentials {
        email: args.email.trim().to_string(),
        password,
    })
}
