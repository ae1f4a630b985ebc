mod clients;
mod config;
mod error;
mod helpers;
mod models;
mod routes;

use std::path::PathBuf;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::signal;
use tracing::info;

use clients::binder::QueryBinder;
use clients::cache::SwrCache;
use clients::SearchClient;
use models::search::QueryResult;

#[derive(Clone)]
pub struct AppState {
    pub binder: QueryBinder,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("pods_console=info,tower_http=info")),
        )
        .init();

    let config_path = std::env::args()
        .skip(1)
        .zip(std::env::args().skip(2))
        .find_map(|(k, v)| {
            if k == "-config" || k == "--config" {
                Some(v)
            } else {
                None
            }
        })
        .or_else(|| std::env::args().nth(1).filter(|a| !a.starts_with('-')))
        .unwrap_or_else(|| "/etc/pods-console/config.yaml".to_string());

    let cfg = config::Config::load(&PathBuf::from(&config_path)).unwrap_or_else(|e| {
        eprintln!("error loading config: {}", e);
        std::process::exit(1);
    });

    let search = SearchClient::new(
        cfg.search.base_url.clone(),
        cfg.search.api_token.clone(),
        cfg.search_timeout(),
    )
    .unwrap_or_else(|e| {
        eprintln!("error building search client: {}", e);
        std::process::exit(1);
    });
    info!(base_url = %search.base_url, "search backend configured");

    let cache: Arc<SwrCache<Arc<QueryResult>>> = Arc::new(SwrCache::new(cfg.cache_policy()));
    let state = AppState {
        binder: QueryBinder::new(Arc::new(search), cache),
    };

    let router = routes::build_router(state);

    let listen_addr = cfg.listen_addr();
    let listener = TcpListener::bind(&listen_addr).await.unwrap_or_else(|e| {
        eprintln!("failed to bind {}: {}", listen_addr, e);
        std::process::exit(1);
    });

    info!("pods-console listening on {}", listen_addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .unwrap_or_else(|e| {
            eprintln!("server error: {}", e);
            std::process::exit(1);
        });
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("failed to listen for ctrl+c: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutting down");
}
