//! RPC gateway for the translation daemon.
//!
//! - [`handler`] - `TranslationQueue` service entry point
//!   ([`TranslationQueueService`](handler::TranslationQueueService)).
//! - [`gateway`] - the assembled server and its shutdown signal.

pub mod gateway;
pub mod handler;
