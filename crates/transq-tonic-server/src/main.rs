#![doc = include_str!("../README.md")]

mod server;

use clap::Parser;
use server::{
    config::{CliArgs, ServerConfig},
    dispatch::dispatcher::Dispatcher,
    lifecycle::{DaemonLifecycle, ShutdownReason},
    pool::{WorkerContext, manager::WorkerPool},
    service::gateway::serve_with_incoming,
    telemetry::init_telemetry,
    translate::Backend,
};
use std::sync::Arc;
use tokio::{net::TcpListener, time::timeout};
use tokio_stream::wrappers::TcpListenerStream;
use transq::{JobQueue, RateLimiter};

// Using mimalloc for better performance under contention, especially in musl
// environments.
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load from .env
    let _ = dotenvy::dotenv();
    let args = CliArgs::parse();
    let config = ServerConfig::try_from(args)?;

    let providers = init_telemetry()?;

    let queue = Arc::new(JobQueue::new());
    let lifecycle = DaemonLifecycle::new(Arc::clone(&queue));

    let backend = Backend::from_config(&config.backend)?;
    log_startup_info(&config, backend.name());

    let ctx = Arc::new(WorkerContext {
        queue: Arc::clone(&queue),
        limiter: RateLimiter::new(config.queries_per_sec),
        translator: backend,
    });
    let pool = Arc::new(WorkerPool::spawn(
        config.num_workers,
        ctx,
        config.shutdown_timeout,
    ));
    #[cfg(feature = "tracing")]
    tracing::debug!("Worker pool ready with {} workers", pool.size());

    let dispatcher = Dispatcher::new(
        Arc::clone(&queue),
        Arc::clone(&pool),
        lifecycle.clone(),
        config.idle_timeout,
    );
    let dispatcher_state = dispatcher.subscribe();
    let dispatcher = tokio::spawn(dispatcher.run());

    let served = serve(&config, queue, lifecycle.clone()).await;

    // Covers the server exiting on its own, e.g. a transport error.
    lifecycle.initiate_shutdown(ShutdownReason::Signal);

    match timeout(config.shutdown_timeout, dispatcher).await {
        Ok(Ok(Ok(()))) => {}
        Ok(Ok(Err(_e))) => {
            #[cfg(feature = "tracing")]
            tracing::error!("Dispatcher failed: {_e}");
        }
        Ok(Err(_e)) => {
            #[cfg(feature = "tracing")]
            tracing::error!("Dispatcher task panicked: {_e}");
        }
        Err(_) => {
            #[cfg(feature = "tracing")]
            tracing::warn!("Dispatcher did not stop within {:?}", config.shutdown_timeout);
        }
    }

    #[cfg(feature = "tracing")]
    tracing::debug!("Dispatcher exited in state {:?}", *dispatcher_state.borrow());
    #[cfg(not(feature = "tracing"))]
    drop(dispatcher_state);

    if let Err(_e) = pool.shutdown().await {
        #[cfg(feature = "tracing")]
        tracing::error!("Error during worker pool shutdown: {_e}");
    }

    #[cfg(feature = "tracing")]
    tracing::info!("Translation daemon stopped");

    providers.shutdown();
    served
}

async fn serve(
    config: &ServerConfig,
    queue: Arc<JobQueue>,
    lifecycle: DaemonLifecycle,
) -> anyhow::Result<()> {
    let listener = TcpListener::bind(config.server_addr).await?;
    serve_with_incoming(TcpListenerStream::new(listener), queue, lifecycle).await
}

fn log_startup_info(_config: &ServerConfig, _backend: &str) {
    if cfg!(debug_assertions) {
        #[cfg(feature = "tracing")]
        tracing::info!(
            "Starting translation daemon on {} with {} backend and full config: {:#?}",
            _config.server_addr,
            _backend,
            _config
        );
    } else {
        #[cfg(feature = "tracing")]
        tracing::info!(
            "Starting translation daemon on {} with {} backend, {} workers, {} queries/sec",
            _config.server_addr,
            _backend,
            _config.num_workers,
            _config.queries_per_sec
        );
    }
}
