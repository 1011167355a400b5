use anyhow::Result;
use cinematch_core::persist::{load_engine, IndexPaths};
use cinematch_core::EngineHandle;
use clap::Parser;
use cinematch_server::config::Args;
use cinematch_server::tmdb::TmdbClient;
use cinematch_server::{build_app, AppState};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let args = Args::parse();

    let tmdb = TmdbClient::new(&args.tmdb_base_url, &args.tmdb_api_key, args.tmdb_timeout())?;
    let engine = EngineHandle::new();

    // Serve immediately; content recommendations answer 503 until the artifacts are in.
    let loader = engine.clone();
    let index = args.index.clone();
    let policy = args.collision_policy();
    tokio::task::spawn_blocking(move || match load_engine(&IndexPaths::new(&index), policy) {
        Ok(loaded) => loader.publish(loaded),
        Err(e) => tracing::error!(index = %index, error = %e, "failed to load recommendation artifacts"),
    });

    let app = build_app(AppState { engine, tmdb });
    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "server listening");
    axum::serve(listener, app).await?;
    Ok(())
}
