use axum::{
    extract::State,
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use formpilot::engine::StartStatus;
use formpilot::{types::*, AppState};

fn parse_port_from_args() -> Option<u16> {
    let mut args = std::env::args().peekable();
    while let Some(a) = args.next() {
        if a == "--port" {
            if let Some(v) = args.next() {
                if let Ok(p) = v.parse::<u16>() {
                    return Some(p);
                }
            }
        } else if let Some(rest) = a.strip_prefix("--port=") {
            if let Ok(p) = rest.parse::<u16>() {
                return Some(p);
            }
        }
    }
    None
}

fn port_from_env() -> Option<u16> {
    for k in ["FORMPILOT_PORT", "PORT"] {
        if let Ok(v) = std::env::var(k) {
            if let Ok(p) = v.trim().parse::<u16>() {
                return Some(p);
            }
        }
    }
    None
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,tower_http=warn"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    info!("Starting formpilot");

    if !formpilot::browser::native_browser_available() {
        warn!("no Chromium-family browser found; autofill runs will fail until CHROME_EXECUTABLE is set");
    }

    let state = AppState::new();

    // Autostart: persisted flag + recognized hostname marker, no command
    // needed. Runs in the background so the server comes up regardless.
    if state.store.autofill_on_load() {
        match state.config.resolve_target_url() {
            Some(url) if state.config.is_recognized_host(&url) => {
                info!("autostart: flag set and {} carries the host marker", url);
                let engine = state.engine.clone();
                tokio::spawn(async move {
                    if let Err(e) = engine.start(Some(url)).await {
                        warn!("autostart run failed: {}", e);
                    }
                });
            }
            Some(url) => {
                info!("autostart: flag set but {} is not a recognized host — skipping", url);
            }
            None => {
                info!("autostart: flag set but no target URL configured — skipping");
            }
        }
    }

    let app = Router::new()
        .route("/", get(health_check))
        .route("/health", get(health_check))
        .route("/command", post(command_handler))
        .route("/profile", get(profile_summary_handler).post(save_profile_handler))
        .route("/settings", get(get_settings_handler).post(save_settings_handler))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state.clone());

    let port: u16 = parse_port_from_args().or_else(port_from_env).unwrap_or(5600);
    let bind_addr = format!("127.0.0.1:{}", port);
    let listener = match tokio::net::TcpListener::bind(&bind_addr).await {
        Ok(l) => l,
        Err(e) if e.kind() == std::io::ErrorKind::AddrInUse => {
            anyhow::bail!(
                "Address already in use: {}. Stop the existing process or run with --port {} (or set PORT/FORMPILOT_PORT).",
                bind_addr,
                port.saturating_add(1)
            )
        }
        Err(e) => return Err(e.into()),
    };
    info!("formpilot listening on http://{}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(state.clone()))
        .await?;

    Ok(())
}

async fn shutdown_signal(state: AppState) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = signal(SignalKind::terminate()).ok();
        let mut sigint = signal(SignalKind::interrupt()).ok();

        tokio::select! {
            _ = tokio::signal::ctrl_c() => {},
            _ = async {
                if let Some(ref mut s) = sigterm {
                    s.recv().await;
                } else {
                    futures::future::pending::<()>().await;
                }
            } => {},
            _ = async {
                if let Some(ref mut s) = sigint {
                    s.recv().await;
                } else {
                    futures::future::pending::<()>().await;
                }
            } => {},
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }

    state.engine.shutdown().await;
}

async fn health_check(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "formpilot",
        "version": env!("CARGO_PKG_VERSION"),
        "running": state.engine.is_running(),
    }))
}

/// The start command. Responds asynchronously — only once the bounded flow
/// has completed or thrown. A start while a run is in flight is acknowledged
/// as "already_running", not an error.
async fn command_handler(
    State(state): State<AppState>,
    Json(request): Json<CommandRequest>,
) -> Result<Json<CommandResponse>, (StatusCode, Json<ErrorResponse>)> {
    if request.command_type != START_AUTOFILL {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: format!("unknown command type: {}", request.command_type),
            }),
        ));
    }

    let finished = || chrono::Utc::now().to_rfc3339();
    match state.engine.start(request.url).await {
        Ok(StartStatus::Completed(outcome)) => Ok(Json(CommandResponse {
            success: true,
            status: "completed".to_string(),
            error: None,
            iterations: outcome.iterations,
            submitted: outcome.submitted,
            finished_at: finished(),
        })),
        Ok(StartStatus::AlreadyRunning) => Ok(Json(CommandResponse {
            success: false,
            status: "already_running".to_string(),
            error: None,
            iterations: 0,
            submitted: false,
            finished_at: finished(),
        })),
        Err(e) => {
            error!("autofill run failed: {}", e);
            Ok(Json(CommandResponse {
                success: false,
                status: "failed".to_string(),
                error: Some(e.to_string()),
                iterations: 0,
                submitted: false,
                finished_at: finished(),
            }))
        }
    }
}

async fn profile_summary_handler(State(state): State<AppState>) -> Json<ProfileSummary> {
    match state.store.load_profile() {
        Some(profile) => Json(profile.summary()),
        None => Json(ProfileSummary::default()),
    }
}

async fn save_profile_handler(
    State(state): State<AppState>,
    Json(request): Json<SaveProfileRequest>,
) -> Json<serde_json::Value> {
    state.store.save_profile(request.profile);
    info!("profile blob saved");
    Json(serde_json::json!({ "saved": true }))
}

async fn get_settings_handler(State(state): State<AppState>) -> Json<SettingsResponse> {
    Json(SettingsResponse {
        autofill_on_load: state.store.autofill_on_load(),
    })
}

async fn save_settings_handler(
    State(state): State<AppState>,
    Json(request): Json<SettingsRequest>,
) -> Json<SettingsResponse> {
    state.store.set_autofill_on_load(request.autofill_on_load);
    Json(SettingsResponse {
        autofill_on_load: request.autofill_on_load,
    })
}
