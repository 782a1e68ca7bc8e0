mod core;
mod features;
mod modules;
mod shared;

use crate::core::config::Config;
use crate::core::router::{build_router, AppServices};
use crate::features::generate::{AccessGate, GenerationService};
use crate::features::usage::UsageLimiter;
use crate::modules::provider::{GeminiClient, ImageProvider};
use crate::modules::usage_store::{MemoryUsageStore, RedisUsageStore, UsageStore};
use crate::shared::clock::SystemClock;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> anyhow::Result<()> {
    // Build Tokio runtime with configurable worker threads
    let worker_threads = std::env::var("TOKIO_WORKER_THREADS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|p| p.get())
                .unwrap_or(4)
        });

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(worker_threads)
        .max_blocking_threads(worker_threads * 4)
        .enable_all()
        .build()?;

    runtime.block_on(async_main(worker_threads))
}

async fn async_main(worker_threads: usize) -> anyhow::Result<()> {
    // Load .env file BEFORE initializing logger so RUST_LOG is available
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env().map_err(|e| anyhow::anyhow!(e))?;

    tracing::info!(
        "System info: tokio_worker_threads={}, pid={}",
        worker_threads,
        std::process::id()
    );
    tracing::info!("Configuration loaded successfully");

    // Usage store: Redis when configured, otherwise in-process
    let store: Arc<dyn UsageStore> = match &config.usage.redis_url {
        Some(url) => Arc::new(
            RedisUsageStore::connect(url)
                .await
                .map_err(|e| anyhow::anyhow!("Failed to initialize usage store: {}", e))?,
        ),
        None => {
            tracing::warn!(
                "REDIS_URL not set; usage counts are kept in memory and reset on restart"
            );
            Arc::new(MemoryUsageStore::new())
        }
    };

    let limiter = Arc::new(UsageLimiter::new(
        store,
        config.usage.clone(),
        Arc::new(SystemClock),
    ));
    tracing::info!(
        "Usage limiter initialized: daily_limit={}, utc_offset={}, backend={}",
        limiter.daily_limit(),
        config.usage.utc_offset,
        limiter.backend()
    );

    let gemini = GeminiClient::new(config.provider.clone())
        .map_err(|e| anyhow::anyhow!("Failed to create provider client: {}", e))?;
    if gemini.is_configured() {
        tracing::info!("Provider client initialized (model: {})", gemini.model());
    } else {
        // Requests still reach the gate; generation answers 500 until a key is set
        tracing::warn!("GEMINI_API_KEY is not set; generation requests will fail");
    }
    let provider: Arc<dyn ImageProvider> = Arc::new(gemini);

    let generation = Arc::new(GenerationService::new(
        AccessGate::new(&config.access),
        Arc::clone(&limiter),
        provider,
    ));
    tracing::info!("Generation service initialized");

    let app = build_router(
        AppServices {
            generation,
            limiter,
        },
        &config,
    );

    // Start server
    let addr = config.app.server_address();
    let socket_addr: SocketAddr = addr
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid address: {}", e))?;

    // Use socket2 for TCP listener configuration
    let socket = socket2::Socket::new(
        socket2::Domain::for_address(socket_addr),
        socket2::Type::STREAM,
        Some(socket2::Protocol::TCP),
    )?;

    socket.set_reuse_address(true)?;
    socket.set_nodelay(true)?;

    socket.set_recv_buffer_size(256 * 1024)?;
    socket.set_send_buffer_size(256 * 1024)?;

    #[cfg(target_os = "linux")]
    {
        let keepalive = socket2::TcpKeepalive::new()
            .with_time(std::time::Duration::from_secs(60))
            .with_interval(std::time::Duration::from_secs(10))
            .with_retries(3);
        socket.set_tcp_keepalive(&keepalive)?;
    }
    #[cfg(not(target_os = "linux"))]
    {
        let keepalive = socket2::TcpKeepalive::new().with_time(std::time::Duration::from_secs(60));
        socket.set_tcp_keepalive(&keepalive)?;
    }

    socket.set_nonblocking(true)?;
    socket.bind(&socket_addr.into())?;
    socket.listen(1024)?;

    let listener = tokio::net::TcpListener::from_std(socket.into())?;
    tracing::info!("Server listening on {}", format!("http://{}", addr));
    tracing::info!(
        "Swagger UI available at {}",
        format!("http://{}/swagger-ui/", addr)
    );

    // Connect info feeds the client identity fallback when no proxy header is present
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
