//! Error types for the queueing and throttling layer.

pub type Result<T> = core::result::Result<T, Error>;

/// Errors raised by [`JobQueue`](crate::JobQueue), [`Job`](crate::Job)
/// construction and [`Stopwatch`](crate::Stopwatch) misuse.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// The queue has been torn down and accepts no further jobs.
    #[error("job queue is closed")]
    QueueClosed,

    /// A job was submitted without any translatable line.
    #[error("job must contain at least one line")]
    EmptyJob,

    /// The requested target language is outside the supported set.
    #[error("language {code:?} is not supported (expected one of: {})", crate::Language::supported_codes().join(", "))]
    UnsupportedLanguage { code: String },

    /// [`Stopwatch::start`](crate::Stopwatch::start) was called on a running
    /// stopwatch.
    #[error("timer is running, use stop() to stop it")]
    TimerAlreadyStarted,

    /// [`Stopwatch::stop`](crate::Stopwatch::stop) was called on a stopwatch
    /// that was never started.
    #[error("timer is not running, use start() to start it")]
    TimerNotStarted,
}
