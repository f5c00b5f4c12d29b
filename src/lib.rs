pub mod api;
pub mod config;
pub mod models;
pub mod render;
pub mod sync;
pub mod utils;

pub use api::*;
pub use config::ClientConfig;
pub use models::*;
pub use render::{format_text, select, DashboardView, RenderState};
pub use sync::*;

use anyhow::Result;
use api::auth_api::TokenStore;
use api::lockbox_api::LockboxApiClient;
use std::sync::Arc;
use tracing::{info, warn};
use utils::data::{load_from_cache, save_to_cache};

/// Everything a front end needs to run the dashboard
pub struct Dashboard {
    pub client: Arc<LockboxApiClient>,
    pub tokens: Arc<TokenStore>,
    pub scheduler: PollScheduler<Arc<LockboxApiClient>>,
    pub config: ClientConfig,
}

/// Wire the HTTP client, session store and scheduler together from a config
pub fn build_dashboard(config: ClientConfig) -> Result<Dashboard> {
    let tokens = Arc::new(TokenStore::load(&config.session_file));
    let client = Arc::new(LockboxApiClient::from_config(&config).with_tokens(tokens.clone()));

    // A cached snapshot is shown until the first cycle lands
    let store = match &config.snapshot_cache {
        Some(path) if path.exists() => match load_from_cache::<Snapshot>(path) {
            Ok(snapshot) => {
                info!(path = %path.display(), seq = snapshot.seq, "seeded from cached snapshot");
                SnapshotStore::seeded(snapshot)
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "ignoring unreadable snapshot cache");
                SnapshotStore::new()
            }
        },
        _ => SnapshotStore::new(),
    };

    let scheduler = PollScheduler::new(
        client.clone(),
        config.endpoints(),
        config.poll_interval,
        store,
    );

    Ok(Dashboard {
        client,
        tokens,
        scheduler,
        config,
    })
}

impl Dashboard {
    /// Write the current snapshot to the configured cache file, if any
    pub fn save_snapshot(&self) -> Result<()> {
        if let (Some(path), Some(snapshot)) = (
            &self.config.snapshot_cache,
            self.scheduler.store().snapshot(),
        ) {
            save_to_cache(snapshot.as_ref(), path)?;
        }
        Ok(())
    }
}
