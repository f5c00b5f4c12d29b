use askama::Template;
use axum::{
    extract::State,
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        Html, IntoResponse, Response,
    },
    routing::get,
    Json, Router,
};
use clap::Parser;
use futures::{Stream, StreamExt};
use lockbox_sync::render::{select, DashboardView, RenderState};
use lockbox_sync::{build_dashboard, ClientConfig, Dashboard};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;
use tower::ServiceBuilder;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

// Custom filters for formatting
mod filters {
    use lockbox_sync::render::SectionStatus;

    pub fn section_class(status: &SectionStatus) -> ::askama::Result<&'static str> {
        Ok(match status {
            SectionStatus::Hidden => "hidden",
            SectionStatus::Fresh => "fresh",
            SectionStatus::Stale => "stale",
            SectionStatus::Unavailable => "unavailable",
        })
    }

    pub fn live_badge(live: &bool) -> ::askama::Result<&'static str> {
        Ok(if *live { "badge live" } else { "badge" })
    }
}

#[derive(Parser, Debug)]
#[command(name = "web")]
#[command(about = "Serve the LockBox AI dashboard", long_about = None)]
struct Args {
    /// Address to listen on
    #[arg(long, default_value = "127.0.0.1:3000")]
    addr: String,

    /// Backend base URL (overrides LOCKBOX_API_BASE_URL)
    #[arg(long)]
    base_url: Option<String>,

    /// Seconds between polls
    #[arg(long)]
    interval: Option<u64>,
}

#[derive(Template)]
#[template(path = "dashboard.html")]
struct DashboardTemplate {
    view: DashboardView,
    loading: bool,
    error_no_data: bool,
    no_data: bool,
}

impl From<DashboardView> for DashboardTemplate {
    fn from(view: DashboardView) -> Self {
        Self {
            loading: view.state == RenderState::Loading,
            error_no_data: view.state == RenderState::ErrorNoData,
            no_data: view.state == RenderState::NoData,
            view,
        }
    }
}

struct HtmlTemplate<T>(T);

impl<T> IntoResponse for HtmlTemplate<T>
where
    T: Template,
{
    fn into_response(self) -> Response {
        match self.0.render() {
            Ok(html) => Html(html).into_response(),
            Err(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to render template: {}", err),
            )
                .into_response(),
        }
    }
}

type SharedDashboard = Arc<Dashboard>;

#[derive(Clone)]
struct AppState {
    dashboard: SharedDashboard,
    /// Flips to true once Ctrl+C arrives so open event streams end
    shutdown: watch::Receiver<bool>,
}

async fn home(State(state): State<AppState>) -> impl IntoResponse {
    let view = select(&state.dashboard.scheduler.store().current());
    HtmlTemplate(DashboardTemplate::from(view))
}

async fn view(State(state): State<AppState>) -> Json<DashboardView> {
    Json(select(&state.dashboard.scheduler.store().current()))
}

/// Pushes a fresh view every time the store publishes
async fn events(State(state): State<AppState>) -> Sse<impl Stream<Item = Result<Event, axum::Error>>> {
    let mut shutdown = state.shutdown.clone();
    let stream = WatchStream::new(state.dashboard.scheduler.store().subscribe())
        .map(|view_state| Event::default().event("view").json_data(select(&view_state)))
        .take_until(async move {
            let _ = shutdown.wait_for(|stopping| *stopping).await;
        });
    Sse::new(stream).keep_alive(KeepAlive::default())
}

/// Keeps the snapshot cache in step with the store
fn spawn_snapshot_writer(dashboard: SharedDashboard) {
    if dashboard.config.snapshot_cache.is_none() {
        return;
    }
    let mut updates = dashboard.scheduler.store().subscribe();
    tokio::spawn(async move {
        while updates.changed().await.is_ok() {
            let fresh = !updates.borrow_and_update().loading;
            if fresh {
                if let Err(e) = dashboard.save_snapshot() {
                    warn!(error = %e, "could not write snapshot cache");
                }
            }
        }
    });
}

async fn shutdown_signal(dashboard: SharedDashboard, stopping: watch::Sender<bool>) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
    dashboard.scheduler.deactivate();
    let _ = stopping.send(true);
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenv::dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("lockbox_sync=info,tower_http=info")),
        )
        .init();

    let args = Args::parse();
    let mut config = ClientConfig::from_env()?;
    if let Some(base_url) = args.base_url {
        config.base_url = base_url;
    }
    if let Some(secs) = args.interval {
        config.poll_interval = Duration::from_secs(secs);
    }
    config.validate()?;

    let dashboard: SharedDashboard = Arc::new(build_dashboard(config)?);
    println!(
        "Polling {} every {}s",
        dashboard.client.base_url(),
        dashboard.scheduler.interval().as_secs()
    );

    spawn_snapshot_writer(dashboard.clone());
    dashboard.scheduler.activate();

    let (stopping, shutdown) = watch::channel(false);
    let state = AppState {
        dashboard: dashboard.clone(),
        shutdown,
    };

    // Build router with routes
    let app = Router::new()
        .nest_service("/static", ServeDir::new("static"))
        .route("/", get(home))
        .route("/api/view", get(view))
        .route("/events", get(events))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(&args.addr).await?;
    info!(addr = %listener.local_addr()?, "web server listening");
    println!("\nStarting web server at http://{}", args.addr);
    println!("Press Ctrl+C to stop\n");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(dashboard.clone(), stopping))
        .await?;

    dashboard.save_snapshot()?;
    println!("Stopped.");
    Ok(())
}
