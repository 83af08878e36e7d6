//! Server-side components of the `transq` translation daemon.
//!
//! ## Submodules
//!
//! - [`config`] - CLI/environment configuration.
//! - [`dispatch`] - The dispatch loop and per-job fan-out/fan-in.
//! - [`lifecycle`] - Shared run state and the once-only shutdown path.
//! - [`pool`] - Worker tasks sharing one work channel.
//! - [`service`] - The `TranslationQueue` gRPC service.
//! - [`telemetry`] - Tracing and metrics initialization.
//! - [`translate`] - Translation backends.

pub mod config;
pub mod dispatch;
pub mod lifecycle;
pub mod pool;
pub mod service;
pub mod telemetry;
pub mod translate;
