//! The assembled gRPC server: queue service plus health, reflection,
//! gRPC-web and compression, running until the daemon stops.

use crate::server::{
    lifecycle::{DaemonLifecycle, ShutdownReason},
    service::handler::TranslationQueueService,
};
use futures::Stream;
use std::sync::Arc;
use tokio::{
    io::{AsyncRead, AsyncWrite},
    signal,
};
use tonic::{
    codec::CompressionEncoding,
    transport::{Server, server::Connected},
};
use tonic_health::server::HealthReporter;
use tonic_reflection::server::Builder;
use tonic_web::GrpcWebLayer;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use transq::JobQueue;
use transq_tonic_core::proto::{
    FILE_DESCRIPTOR_SET, translation_queue_server::TranslationQueueServer,
};

/// Serves the gateway on `incoming` until shutdown is initiated, by a signal
/// or by the dispatcher's idle timeout.
///
/// # Errors
///
/// Fails if the reflection service cannot be built or the transport errors.
pub async fn serve_with_incoming<I, IO, IE>(
    incoming: I,
    queue: Arc<JobQueue>,
    lifecycle: DaemonLifecycle,
) -> anyhow::Result<()>
where
    I: Stream<Item = Result<IO, IE>>,
    IO: AsyncRead + AsyncWrite + Connected + Unpin + Send + 'static,
    IE: Into<tower::BoxError>,
{
    let (health_reporter, health_service) = tonic_health::server::health_reporter();
    health_reporter
        .set_serving::<TranslationQueueServer<TranslationQueueService>>()
        .await;

    let reflection = Builder::configure()
        .register_encoded_file_descriptor_set(FILE_DESCRIPTOR_SET)
        .build_v1()?;

    let service = TranslationQueueService::new(queue, lifecycle.clone());

    Server::builder()
        .accept_http1(true)
        .http2_adaptive_window(Some(true))
        .layer(
            ServiceBuilder::new()
                .layer(
                    CorsLayer::new()
                        .allow_origin(Any)
                        .allow_methods(Any)
                        .allow_headers(Any),
                )
                .layer(GrpcWebLayer::new()),
        )
        .add_service(health_service)
        .add_service(reflection)
        .add_service(build_queue_service(service))
        .serve_with_incoming_shutdown(incoming, shutdown_signal(lifecycle, health_reporter))
        .await?;

    #[cfg(feature = "tracing")]
    tracing::info!("RPC gateway shut down");
    Ok(())
}

fn build_queue_service(
    service: TranslationQueueService,
) -> TranslationQueueServer<TranslationQueueService> {
    TranslationQueueServer::new(service)
        .send_compressed(CompressionEncoding::Zstd)
        .send_compressed(CompressionEncoding::Gzip)
        .send_compressed(CompressionEncoding::Deflate)
        .accept_compressed(CompressionEncoding::Zstd)
        .accept_compressed(CompressionEncoding::Gzip)
        .accept_compressed(CompressionEncoding::Deflate)
}

/// Resolves when the daemon should stop serving: on Ctrl+C, on SIGTERM, or
/// once shutdown was initiated elsewhere (idle timeout).
async fn shutdown_signal(lifecycle: DaemonLifecycle, health_reporter: HealthReporter) {
    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(_e) => {
                #[cfg(feature = "tracing")]
                tracing::warn!("Failed to install SIGTERM handler: {_e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let ctrl_c = async {
        if let Err(_e) = signal::ctrl_c().await {
            #[cfg(feature = "tracing")]
            tracing::warn!("Failed to install Ctrl+C handler: {_e}");
            std::future::pending::<()>().await;
        }
    };

    tokio::select! {
        () = ctrl_c => {
            #[cfg(feature = "tracing")]
            tracing::info!("Received Ctrl+C signal");
            lifecycle.initiate_shutdown(ShutdownReason::Signal);
        },
        () = terminate => {
            #[cfg(feature = "tracing")]
            tracing::info!("Received SIGTERM signal");
            lifecycle.initiate_shutdown(ShutdownReason::Signal);
        },
        () = lifecycle.stopped() => {},
    }

    #[cfg(feature = "tracing")]
    tracing::info!("Shutdown initiated, terminating gracefully...");

    health_reporter
        .set_not_serving::<TranslationQueueServer<TranslationQueueService>>()
        .await;
}
