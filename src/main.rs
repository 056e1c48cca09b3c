use std::sync::Arc;

use crate::endpoints::*;
use axum::{
    Router,
    routing::{get, post},
};
use config::Config;
use data::Data;
use http::{HeaderValue, Method, header};
use ingest::narration::{MerchantAliasTable, NarrationParser};
use services::classifier::Classifier;
use state::AppState;
use tokio::{net::TcpListener, signal};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub mod auth_middleware;
pub mod config;
pub mod data;
pub mod endpoints;
pub mod error;
pub mod ingest;
mod services;
pub mod state;

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("{}=debug", env!("CARGO_CRATE_NAME")).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Arc::new(Config::new().expect("config"));
    let data = Data::new(&config).await.expect("data");
    let classifier = Classifier::new(&config);

    // the alias table is loaded once at startup and injected read-only
    let narration = Arc::new(NarrationParser::new(MerchantAliasTable::default()));

    let state = AppState {
        config: config.clone(),
        data,
        classifier,
        narration,
    };

    let transactions = Router::new()
        .route("/import", post(transactions::import::import))
        .route("/query", post(transactions::query::query));

    let routes = Router::new()
        .nest("/v1/transactions", transactions)
        .route("/@me", get(me::get_me))
        .route("/openapi.json", get(openapi));

    // dev login in debug mode
    #[cfg(debug_assertions)]
    let routes = routes.route("/auth/___dev_login___", post(auth::___dev_login___));

    let routes = routes
        .layer(TraceLayer::new_for_http())
        .layer(cors(&config))
        .with_state(state);

    let api = Router::new().nest("/api", routes);

    let listener = TcpListener::bind("127.0.0.1:8000").await.unwrap();
    tracing::debug!("listening on {}", listener.local_addr().unwrap());
    axum::serve(listener, api)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .unwrap();
}

fn cors(config: &Config) -> CorsLayer {
    CorsLayer::new()
        .allow_methods([
            Method::OPTIONS,
            Method::HEAD,
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            header::ACCEPT,
            header::ACCEPT_ENCODING,
            header::ACCEPT_LANGUAGE,
        ])
        .allow_origin(
            config
                .front_base_url
                .parse::<HeaderValue>()
                .expect("allow origin value"),
        )
        .allow_credentials(true)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("error installing ctrl+c handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("error installing signal handler")
            .recv()
            .await;
    };

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
