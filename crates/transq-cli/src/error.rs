//! Failures reported by the `transq` client.

use std::path::PathBuf;

#[derive(thiserror::Error, Debug)]
pub enum CliError {
    #[error("Input file not found: {}", path.display())]
    FileNotFound { path: PathBuf },

    #[error("Failed to read {}: {reason}", path.display())]
    ReadInput { path: PathBuf, reason: String },

    #[error("{} has no non-blank lines to translate", path.display())]
    NoLines { path: PathBuf },

    #[error("Unsupported language '{code}', expected one of: {supported}")]
    UnsupportedLanguage { code: String, supported: String },

    #[error("Invalid daemon address '{addr}': {reason}")]
    InvalidAddress { addr: String, reason: String },

    #[error(
        "Could not reach the translation daemon at {addr}: {reason}\n\
         Start it first with `transq-daemon`."
    )]
    DaemonUnreachable { addr: String, reason: String },

    #[error("Daemon rejected the request: {0}")]
    Rpc(tonic::Status),

    #[error("Timed out after {waited_secs}s with {received} of {expected} translations")]
    WaitTimeout {
        received: usize,
        expected: usize,
        waited_secs: u64,
    },
}
