use push_hook_runner::api::build_router;
use push_hook_runner::logging::{FileLogger, setup_logging};
use push_hook_runner::store::{reload_channel, run_reload_loop};
use push_hook_runner::{AppState, ConfigStore, DEFAULT_CONFIG_PATH, ProcessRunner};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// How long running deliveries may keep going after the listener stops.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(300);

/// Config path: first argument, then `HOOK_CONFIG`, then the default.
fn config_path() -> String {
    std::env::args()
        .nth(1)
        .or_else(|| std::env::var("HOOK_CONFIG").ok())
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string())
}

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();

    let config_path = config_path();

    // Nothing to serve without a valid config; logging is not set up yet.
    let store = match ConfigStore::load(&config_path).await {
        Ok(store) => Arc::new(store),
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };
    let startup = store.current();

    let _log_guard = match FileLogger::new(&startup.config.log_file).and_then(|l| setup_logging(&l))
    {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to open log file: {}", e);
            std::process::exit(1);
        }
    };

    let (trigger, requests) = reload_channel();
    tokio::spawn(run_reload_loop(Arc::clone(&store), requests));

    #[cfg(unix)]
    tokio::spawn(async move {
        if let Err(e) = push_hook_runner::store::forward_hangup_signals(trigger).await {
            error!("Failed to install SIGHUP handler, reload via signal disabled: {}", e);
        }
    });
    #[cfg(not(unix))]
    drop(trigger);

    let state = Arc::new(AppState::new(Arc::clone(&store), Arc::new(ProcessRunner::new())));
    let app = build_router(Arc::clone(&state));

    let bind_address = startup.config.listen_address();
    info!("Using config at {:?}", config_path);
    info!(
        "Loaded {} repositories: {:?}",
        startup.config.repositories.len(),
        startup.config.repository_names()
    );
    drop(startup);

    let listener = match tokio::net::TcpListener::bind(bind_address.as_str()).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind {}: {}", bind_address, e);
            std::process::exit(1);
        }
    };
    info!("Listening on {}", bind_address);

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!("Server error: {}", e);
    }

    let in_flight = state.deliveries_in_flight();
    if in_flight > 0 {
        info!("Waiting for {} running deliveries to finish", in_flight);
    }
    if !state.wait_for_deliveries(SHUTDOWN_GRACE).await {
        warn!(
            "{} deliveries still running after {:?}, exiting anyway",
            state.deliveries_in_flight(),
            SHUTDOWN_GRACE
        );
    }
    info!("Server stopped");
}

/// Resolves on Ctrl-C, or SIGTERM on Unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to install Ctrl-C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received SIGINT, shutting down"),
        () = terminate => info!("Received SIGTERM, shutting down"),
    }
}
